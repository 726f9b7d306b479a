//! The canonical sales record and the immutable table that holds them.
//!
//! Every [`CanonicalRecord`] carries a value for every field regardless of
//! which concepts the source dataset contained, so report code never needs to
//! ask whether a column exists.

use std::{borrow::Cow, fmt, str::FromStr};

use anyhow::{Result, anyhow};
use chrono::NaiveDateTime;
use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};

use crate::data::{format_timestamp, present};

/// Placeholder for missing categorical values.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeGroup {
    Under18,
    From18To24,
    From25To34,
    From35To44,
    From45To54,
    From55To64,
    Over65,
    Unknown,
}

impl AgeGroup {
    /// Buckets in ascending age order, `Unknown` last.
    pub const ALL: [AgeGroup; 8] = [
        AgeGroup::Under18,
        AgeGroup::From18To24,
        AgeGroup::From25To34,
        AgeGroup::From35To44,
        AgeGroup::From45To54,
        AgeGroup::From55To64,
        AgeGroup::Over65,
        AgeGroup::Unknown,
    ];

    /// Every age below 18, including zero and negative garbage, lands in the
    /// `13-17` bucket. NaN is treated like a missing age.
    pub fn from_age(age: Option<f64>) -> Self {
        let Some(age) = age.filter(|a| !a.is_nan()) else {
            return AgeGroup::Unknown;
        };
        if age < 18.0 {
            AgeGroup::Under18
        } else if age < 25.0 {
            AgeGroup::From18To24
        } else if age < 35.0 {
            AgeGroup::From25To34
        } else if age < 45.0 {
            AgeGroup::From35To44
        } else if age < 55.0 {
            AgeGroup::From45To54
        } else if age < 65.0 {
            AgeGroup::From55To64
        } else {
            AgeGroup::Over65
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Under18 => "13-17",
            AgeGroup::From18To24 => "18-24",
            AgeGroup::From25To34 => "25-34",
            AgeGroup::From35To44 => "35-44",
            AgeGroup::From45To54 => "45-54",
            AgeGroup::From55To64 => "55-64",
            AgeGroup::Over65 => "65+",
            AgeGroup::Unknown => UNKNOWN,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        AgeGroup::ALL.into_iter().find(|g| g.label() == label.trim())
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub sales_amount: f64,
    pub quantity: f64,
    pub transaction: String,
    pub department: String,
    pub store_format: String,
    pub category: String,
    pub product: String,
    pub campaign: String,
    pub channel: String,
    pub promo_code: String,
    pub gender: String,
    pub age: Option<f64>,
    pub age_group: AgeGroup,
    pub nationality: String,
    pub city: String,
    pub zone: String,
    pub date: Option<NaiveDateTime>,
    pub customer_type: String,
    pub promo_used: bool,
}

/// True when the promo code names an actual code.
pub fn promo_used(promo_code: &str) -> bool {
    present(promo_code).is_some_and(|code| code != UNKNOWN)
}

/// Canonical columns in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    SalesAmount,
    Quantity,
    Transaction,
    Department,
    StoreFormat,
    Category,
    Product,
    Campaign,
    Channel,
    PromoCode,
    Gender,
    Age,
    AgeGroup,
    Nationality,
    City,
    Zone,
    Date,
    CustomerType,
    PromoUsed,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 19] = [
        CanonicalField::SalesAmount,
        CanonicalField::Quantity,
        CanonicalField::Transaction,
        CanonicalField::Department,
        CanonicalField::StoreFormat,
        CanonicalField::Category,
        CanonicalField::Product,
        CanonicalField::Campaign,
        CanonicalField::Channel,
        CanonicalField::PromoCode,
        CanonicalField::Gender,
        CanonicalField::Age,
        CanonicalField::AgeGroup,
        CanonicalField::Nationality,
        CanonicalField::City,
        CanonicalField::Zone,
        CanonicalField::Date,
        CanonicalField::CustomerType,
        CanonicalField::PromoUsed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::SalesAmount => "SalesAmount",
            CanonicalField::Quantity => "Quantity",
            CanonicalField::Transaction => "Transaction",
            CanonicalField::Department => "Department",
            CanonicalField::StoreFormat => "Store_Format",
            CanonicalField::Category => "Category",
            CanonicalField::Product => "Product",
            CanonicalField::Campaign => "Campaign",
            CanonicalField::Channel => "Channel",
            CanonicalField::PromoCode => "PromoCode",
            CanonicalField::Gender => "Gender",
            CanonicalField::Age => "Age",
            CanonicalField::AgeGroup => "AgeGroup",
            CanonicalField::Nationality => "Nationality",
            CanonicalField::City => "City",
            CanonicalField::Zone => "Zone",
            CanonicalField::Date => "Date",
            CanonicalField::CustomerType => "CustomerType",
            CanonicalField::PromoUsed => "PromoUsed",
        }
    }

    pub fn headers() -> Vec<String> {
        Self::ALL.iter().map(|f| f.name().to_string()).collect()
    }

    /// Fields whose values are labels rather than measures or timestamps.
    pub fn is_dimension(self) -> bool {
        !matches!(
            self,
            CanonicalField::SalesAmount
                | CanonicalField::Quantity
                | CanonicalField::Age
                | CanonicalField::Date
        )
    }

    /// Text form of the field for one record. Used both for grouping and for
    /// export, so it must read back through the normalizer unchanged.
    pub fn render<'a>(self, record: &'a CanonicalRecord) -> Cow<'a, str> {
        match self {
            CanonicalField::SalesAmount => Cow::Owned(record.sales_amount.to_string()),
            CanonicalField::Quantity => Cow::Owned(record.quantity.to_string()),
            CanonicalField::Transaction => Cow::Borrowed(&record.transaction),
            CanonicalField::Department => Cow::Borrowed(&record.department),
            CanonicalField::StoreFormat => Cow::Borrowed(&record.store_format),
            CanonicalField::Category => Cow::Borrowed(&record.category),
            CanonicalField::Product => Cow::Borrowed(&record.product),
            CanonicalField::Campaign => Cow::Borrowed(&record.campaign),
            CanonicalField::Channel => Cow::Borrowed(&record.channel),
            CanonicalField::PromoCode => Cow::Borrowed(&record.promo_code),
            CanonicalField::Gender => Cow::Borrowed(&record.gender),
            CanonicalField::Age => match record.age {
                Some(age) => Cow::Owned(age.to_string()),
                None => Cow::Borrowed(""),
            },
            CanonicalField::AgeGroup => Cow::Borrowed(record.age_group.label()),
            CanonicalField::Nationality => Cow::Borrowed(&record.nationality),
            CanonicalField::City => Cow::Borrowed(&record.city),
            CanonicalField::Zone => Cow::Borrowed(&record.zone),
            CanonicalField::Date => match &record.date {
                Some(date) => Cow::Owned(format_timestamp(date)),
                None => Cow::Borrowed(""),
            },
            CanonicalField::CustomerType => Cow::Borrowed(&record.customer_type),
            CanonicalField::PromoUsed => Cow::Borrowed(if record.promo_used {
                "true"
            } else {
                "false"
            }),
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CanonicalField {
    type Err = anyhow::Error;

    /// Accepts canonical names in any casing style: `Store_Format`,
    /// `store-format`, `StoreFormat`, `storeformat` are all equivalent.
    fn from_str(value: &str) -> Result<Self> {
        let wanted = value.trim().to_snake_case();
        let compact = wanted.replace('_', "");
        CanonicalField::ALL
            .into_iter()
            .find(|field| {
                let name = field.name().to_snake_case();
                name == wanted || name.replace('_', "") == compact
            })
            .ok_or_else(|| {
                anyhow!(
                    "Unknown field '{value}'. Expected one of: {}",
                    CanonicalField::headers().join(", ")
                )
            })
    }
}

/// The normalized dataset. Built once per load and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalTable {
    records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn new(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A view over every record.
    pub fn view(&self) -> Subset<'_> {
        Subset::new(self.records.iter().collect())
    }
}

/// Borrowed, read-only selection of canonical records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subset<'a> {
    rows: Vec<&'a CanonicalRecord>,
}

impl<'a> Subset<'a> {
    pub fn new(rows: Vec<&'a CanonicalRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[&'a CanonicalRecord] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a CanonicalRecord> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn take(&self, limit: usize) -> Subset<'a> {
        Subset::new(self.rows.iter().copied().take(limit).collect())
    }
}

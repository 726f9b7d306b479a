//! Semantic roles and the ordered synonym table used to recognise them.
//!
//! The synonym table is plain data: every role owns an ordered list of
//! lowercase substrings, and [`crate::resolver::resolve`] walks that list in
//! order. The built-in table can be overridden per role from a YAML file:
//!
//! ```yaml
//! amount: [net_sales, amount]
//! city: [branch_city, city]
//! ```

use std::{collections::BTreeMap, fmt, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    Amount,
    Quantity,
    Department,
    StoreFormat,
    Category,
    Product,
    Campaign,
    Channel,
    PromoCode,
    Gender,
    Age,
    Nationality,
    City,
    Zone,
    Transaction,
    Date,
    CustomerType,
}

impl SemanticRole {
    pub const ALL: [SemanticRole; 17] = [
        SemanticRole::Amount,
        SemanticRole::Quantity,
        SemanticRole::Department,
        SemanticRole::StoreFormat,
        SemanticRole::Category,
        SemanticRole::Product,
        SemanticRole::Campaign,
        SemanticRole::Channel,
        SemanticRole::PromoCode,
        SemanticRole::Gender,
        SemanticRole::Age,
        SemanticRole::Nationality,
        SemanticRole::City,
        SemanticRole::Zone,
        SemanticRole::Transaction,
        SemanticRole::Date,
        SemanticRole::CustomerType,
    ];

    /// Name of the canonical column this role feeds.
    pub fn canonical_name(self) -> &'static str {
        match self {
            SemanticRole::Amount => "SalesAmount",
            SemanticRole::Quantity => "Quantity",
            SemanticRole::Department => "Department",
            SemanticRole::StoreFormat => "Store_Format",
            SemanticRole::Category => "Category",
            SemanticRole::Product => "Product",
            SemanticRole::Campaign => "Campaign",
            SemanticRole::Channel => "Channel",
            SemanticRole::PromoCode => "PromoCode",
            SemanticRole::Gender => "Gender",
            SemanticRole::Age => "Age",
            SemanticRole::Nationality => "Nationality",
            SemanticRole::City => "City",
            SemanticRole::Zone => "Zone",
            SemanticRole::Transaction => "Transaction",
            SemanticRole::Date => "Date",
            SemanticRole::CustomerType => "CustomerType",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            SemanticRole::Amount => "amount",
            SemanticRole::Quantity => "quantity",
            SemanticRole::Department => "department",
            SemanticRole::StoreFormat => "store_format",
            SemanticRole::Category => "category",
            SemanticRole::Product => "product",
            SemanticRole::Campaign => "campaign",
            SemanticRole::Channel => "channel",
            SemanticRole::PromoCode => "promo_code",
            SemanticRole::Gender => "gender",
            SemanticRole::Age => "age",
            SemanticRole::Nationality => "nationality",
            SemanticRole::City => "city",
            SemanticRole::Zone => "zone",
            SemanticRole::Transaction => "transaction",
            SemanticRole::Date => "date",
            SemanticRole::CustomerType => "customer_type",
        }
    }

    fn default_synonyms(self) -> &'static [&'static str] {
        match self {
            SemanticRole::Amount => &["amount", "sales", "revenue", "total", "paid", "value"],
            SemanticRole::Quantity => &["qty", "quantity", "units"],
            SemanticRole::Department => &["department", "dept"],
            SemanticRole::StoreFormat => &[
                "store_format",
                "store format",
                "format",
                "storetype",
                "store_type",
            ],
            SemanticRole::Category => &["category", "cat", "sub_category", "subcat"],
            SemanticRole::Product => &["product", "sku", "item", "product_name", "brand"],
            SemanticRole::Campaign => &["campaign", "ad_campaign", "campaign_name"],
            SemanticRole::Channel => &["channel", "ad_channel", "media_channel"],
            SemanticRole::PromoCode => &["promo", "voucher", "coupon", "promo_code", "discount"],
            SemanticRole::Gender => &["gender"],
            SemanticRole::Age => &["age", "customer_age", "age_group"],
            SemanticRole::Nationality => &["nation", "national", "country", "nationality"],
            SemanticRole::City => &["city", "location"],
            SemanticRole::Zone => &["zone", "area", "district"],
            SemanticRole::Transaction => &[
                "invoice",
                "transaction",
                "order",
                "receipt",
                "bill",
                "txn",
            ],
            SemanticRole::Date => &["date", "transaction_date", "purchase_date"],
            SemanticRole::CustomerType => &["customer_type", "new_repeat", "customer_status"],
        }
    }
}

impl fmt::Display for SemanticRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Ordered synonym lists, one per role, in [`SemanticRole::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    entries: Vec<(SemanticRole, Vec<String>)>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        let entries = SemanticRole::ALL
            .iter()
            .map(|role| {
                let synonyms = role
                    .default_synonyms()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                (*role, synonyms)
            })
            .collect();
        Self { entries }
    }
}

impl SynonymTable {
    pub fn synonyms(&self, role: SemanticRole) -> &[String] {
        self.entries
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, list)| list.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (SemanticRole, &[String])> + '_ {
        self.entries
            .iter()
            .map(|(role, list)| (*role, list.as_slice()))
    }

    /// Replaces the synonym list of each role present in `overrides`.
    /// Synonyms are lowercased and blank entries dropped.
    pub fn with_overrides(mut self, overrides: BTreeMap<SemanticRole, Vec<String>>) -> Self {
        for (role, synonyms) in overrides {
            let cleaned = synonyms
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>();
            if let Some(entry) = self.entries.iter_mut().find(|(r, _)| *r == role) {
                entry.1 = cleaned;
            }
        }
        self
    }

    /// Loads overrides from YAML on top of the built-in table.
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening synonym file {path:?}"))?;
        let overrides: BTreeMap<SemanticRole, Vec<String>> =
            serde_yaml::from_reader(BufReader::new(file))
                .with_context(|| format!("Parsing synonym YAML {path:?}"))?;
        Ok(Self::default().with_overrides(overrides))
    }
}

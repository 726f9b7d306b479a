//! Raw table plus column mapping to canonical table.
//!
//! Default-fill policy:
//!
//! | Field            | unmapped        | mapped, missing or uncoercible |
//! |------------------|-----------------|--------------------------------|
//! | `SalesAmount`    | `1.0`           | `0.0`                          |
//! | `Quantity`       | `1.0`           | `1.0`                          |
//! | `Transaction`    | row position    | row position                   |
//! | `Age`, `Date`    | null            | null                           |
//! | text fields      | `"Unknown"`     | `"Unknown"`                    |
//!
//! An unmapped amount counts every row as one unit of sales; a mapped amount
//! that fails to parse contributes nothing.

use log::{debug, info};

use crate::{
    canonical::{AgeGroup, CanonicalRecord, CanonicalTable, UNKNOWN, promo_used},
    data::{parse_number, parse_timestamp, present},
    raw::RawTable,
    resolver::ColumnMapping,
    roles::SemanticRole,
};

pub const UNMAPPED_SALES_AMOUNT: f64 = 1.0;
pub const INVALID_SALES_AMOUNT: f64 = 0.0;
pub const DEFAULT_QUANTITY: f64 = 1.0;

/// Column positions for each role, resolved once per table.
struct Plan {
    columns: Vec<(SemanticRole, Option<usize>)>,
}

impl Plan {
    fn new(raw: &RawTable, mapping: &ColumnMapping) -> Self {
        let columns = SemanticRole::ALL
            .iter()
            .map(|role| {
                let index = mapping.get(*role).and_then(|name| {
                    let index = raw.column_index(name);
                    if index.is_none() {
                        debug!("Column '{name}' for role '{role}' is absent; treating as unmapped");
                    }
                    index
                });
                (*role, index)
            })
            .collect();
        Self { columns }
    }

    fn index(&self, role: SemanticRole) -> Option<usize> {
        self.columns
            .iter()
            .find(|(r, _)| *r == role)
            .and_then(|(_, idx)| *idx)
    }
}

/// Builds the canonical table. Pure: the same inputs always produce the same
/// table, and no input row can make it fail.
pub fn normalize(raw: &RawTable, mapping: &ColumnMapping) -> CanonicalTable {
    let plan = Plan::new(raw, mapping);
    let records = raw
        .rows()
        .iter()
        .enumerate()
        .map(|(position, row)| normalize_row(&plan, row, position))
        .collect::<Vec<_>>();
    let unmapped = plan.columns.iter().filter(|(_, idx)| idx.is_none()).count();
    info!(
        "Normalized {} row(s); {} of {} role(s) filled from defaults",
        records.len(),
        unmapped,
        SemanticRole::ALL.len()
    );
    CanonicalTable::new(records)
}

fn normalize_row(plan: &Plan, row: &[String], position: usize) -> CanonicalRecord {
    let cell = |role: SemanticRole| {
        plan.index(role)
            .map(|idx| row.get(idx).map(String::as_str).unwrap_or(""))
    };
    let text = |role: SemanticRole| {
        cell(role)
            .and_then(present)
            .unwrap_or(UNKNOWN)
            .to_string()
    };

    let sales_amount = match cell(SemanticRole::Amount) {
        Some(raw) => parse_number(raw).unwrap_or(INVALID_SALES_AMOUNT),
        None => UNMAPPED_SALES_AMOUNT,
    };
    let quantity = cell(SemanticRole::Quantity)
        .and_then(parse_number)
        .unwrap_or(DEFAULT_QUANTITY);
    let transaction = cell(SemanticRole::Transaction)
        .and_then(present)
        .map(str::to_string)
        .unwrap_or_else(|| position.to_string());
    let age = cell(SemanticRole::Age).and_then(parse_number);
    let date = cell(SemanticRole::Date).and_then(parse_timestamp);
    let promo_code = text(SemanticRole::PromoCode);

    CanonicalRecord {
        sales_amount,
        quantity,
        transaction,
        department: text(SemanticRole::Department),
        store_format: text(SemanticRole::StoreFormat),
        category: text(SemanticRole::Category),
        product: text(SemanticRole::Product),
        campaign: text(SemanticRole::Campaign),
        channel: text(SemanticRole::Channel),
        promo_used: promo_used(&promo_code),
        promo_code,
        gender: text(SemanticRole::Gender),
        age,
        age_group: AgeGroup::from_age(age),
        nationality: text(SemanticRole::Nationality),
        city: text(SemanticRole::City),
        zone: text(SemanticRole::Zone),
        date,
        customer_type: text(SemanticRole::CustomerType),
    }
}

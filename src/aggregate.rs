//! Grouped sales summaries and whole-subset KPIs.
//!
//! Two different averages are exposed:
//!
//! - [`average_line_value`] is the mean `SalesAmount` per row.
//! - [`average_transaction_value`] sums rows per `Transaction` first and then
//!   averages those basket totals.
//!
//! [`AggregateRow::avg_line_value`] is the per-group form of the first.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
};

use clap::ValueEnum;
use serde::Serialize;

use crate::canonical::{AgeGroup, CanonicalField, Subset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "snake_case")]
pub enum SortMetric {
    #[default]
    TotalSales,
    TotalQuantity,
    TransactionCount,
    RowCount,
    AvgLineValue,
    SalesPerTransaction,
    RevenuePerUnit,
    PromoRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    pub group_by: Vec<CanonicalField>,
    pub top_n: Option<usize>,
    pub sort_by: SortMetric,
    pub order: SortOrder,
}

impl AggregateQuery {
    pub fn new(group_by: Vec<CanonicalField>) -> Self {
        Self {
            group_by,
            top_n: None,
            sort_by: SortMetric::default(),
            order: SortOrder::default(),
        }
    }

    pub fn top(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    pub fn sort_by(mut self, metric: SortMetric) -> Self {
        self.sort_by = metric;
        self
    }

    /// Ascending order, used for underperformer views.
    pub fn ascending(mut self) -> Self {
        self.order = SortOrder::Ascending;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub keys: Vec<String>,
    pub total_sales: f64,
    pub total_quantity: f64,
    pub transaction_count: usize,
    pub row_count: usize,
    pub promo_rows: usize,
    pub avg_line_value: f64,
}

impl AggregateRow {
    /// Group sales divided by distinct transactions (zero transactions count as one).
    pub fn sales_per_transaction(&self) -> f64 {
        self.total_sales / self.transaction_count.max(1) as f64
    }

    /// Group sales divided by units sold (zero quantity counts as one).
    pub fn revenue_per_unit(&self) -> f64 {
        let quantity = if self.total_quantity == 0.0 {
            1.0
        } else {
            self.total_quantity
        };
        self.total_sales / quantity
    }

    /// Share of rows in the group that used a promo code, in `[0, 1]`.
    pub fn promo_rate(&self) -> f64 {
        if self.row_count == 0 {
            0.0
        } else {
            self.promo_rows as f64 / self.row_count as f64
        }
    }

    pub fn metric(&self, metric: SortMetric) -> f64 {
        match metric {
            SortMetric::TotalSales => self.total_sales,
            SortMetric::TotalQuantity => self.total_quantity,
            SortMetric::TransactionCount => self.transaction_count as f64,
            SortMetric::RowCount => self.row_count as f64,
            SortMetric::AvgLineValue => self.avg_line_value,
            SortMetric::SalesPerTransaction => self.sales_per_transaction(),
            SortMetric::RevenuePerUnit => self.revenue_per_unit(),
            SortMetric::PromoRate => self.promo_rate(),
        }
    }
}

#[derive(Default)]
struct GroupAccumulator<'a> {
    total_sales: f64,
    total_quantity: f64,
    transactions: HashSet<&'a str>,
    row_count: usize,
    promo_rows: usize,
}

impl GroupAccumulator<'_> {
    fn finish(self, keys: Vec<String>) -> AggregateRow {
        AggregateRow {
            keys,
            total_sales: self.total_sales,
            total_quantity: self.total_quantity,
            transaction_count: self.transactions.len(),
            row_count: self.row_count,
            promo_rows: self.promo_rows,
            avg_line_value: self.total_sales / self.row_count as f64,
        }
    }
}

/// Groups `rows` by the query's key tuple and summarises each group.
///
/// Groups are ordered by the chosen metric; equal metrics keep ascending key
/// order in both directions. An empty subset produces no rows.
pub fn aggregate(rows: &Subset<'_>, query: &AggregateQuery) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<Vec<String>, GroupAccumulator<'_>> = BTreeMap::new();
    for record in rows.iter() {
        let keys = query
            .group_by
            .iter()
            .map(|field| field.render(record).into_owned())
            .collect::<Vec<_>>();
        let group = groups.entry(keys).or_default();
        group.total_sales += record.sales_amount;
        group.total_quantity += record.quantity;
        group.transactions.insert(record.transaction.as_str());
        group.row_count += 1;
        if record.promo_used {
            group.promo_rows += 1;
        }
    }

    let mut result = groups
        .into_iter()
        .map(|(keys, group)| group.finish(keys))
        .collect::<Vec<_>>();
    // Stable sort: BTreeMap order survives among equal metrics.
    result.sort_by(|a, b| {
        let ordering = a.metric(query.sort_by).total_cmp(&b.metric(query.sort_by));
        match query.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
    if let Some(n) = query.top_n {
        result.truncate(n);
    }
    result
}

/// Mean `SalesAmount` per row; zero for an empty subset.
pub fn average_line_value(rows: &Subset<'_>) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    total_sales(rows) / rows.len() as f64
}

/// Mean of per-transaction sales totals; zero for an empty subset.
pub fn average_transaction_value(rows: &Subset<'_>) -> f64 {
    let mut baskets: BTreeMap<&str, f64> = BTreeMap::new();
    for record in rows.iter() {
        *baskets.entry(record.transaction.as_str()).or_insert(0.0) += record.sales_amount;
    }
    if baskets.is_empty() {
        return 0.0;
    }
    baskets.values().sum::<f64>() / baskets.len() as f64
}

pub fn total_sales(rows: &Subset<'_>) -> f64 {
    rows.iter().map(|r| r.sales_amount).sum()
}

pub fn transaction_count(rows: &Subset<'_>) -> usize {
    rows.iter()
        .map(|r| r.transaction.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Headline figures for a subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub row_count: usize,
    pub total_sales: f64,
    pub total_quantity: f64,
    pub transaction_count: usize,
    pub average_transaction_value: f64,
    pub average_line_value: f64,
    /// Percentage of rows with a promo code, `0..=100`.
    pub promo_usage_percent: f64,
}

pub fn summarize(rows: &Subset<'_>) -> Summary {
    let promo_rows = rows.iter().filter(|r| r.promo_used).count();
    let promo_usage_percent = if rows.is_empty() {
        0.0
    } else {
        promo_rows as f64 / rows.len() as f64 * 100.0
    };
    Summary {
        row_count: rows.len(),
        total_sales: total_sales(rows),
        total_quantity: rows.iter().map(|r| r.quantity).sum(),
        transaction_count: transaction_count(rows),
        average_transaction_value: average_transaction_value(rows),
        average_line_value: average_line_value(rows),
        promo_usage_percent,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub value: String,
    pub count: usize,
    pub percent: f64,
}

/// Row counts per value of `field`. Age groups are listed in bucket order;
/// other fields by descending count, then value.
pub fn distribution(rows: &Subset<'_>, field: CanonicalField, top: Option<usize>) -> Vec<DistributionRow> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in rows.iter() {
        *counts.entry(field.render(record).into_owned()).or_insert(0) += 1;
    }
    let total = rows.len();
    let mut items = counts.into_iter().collect::<Vec<_>>();
    if field == CanonicalField::AgeGroup {
        items.sort_by(|a, b| compare_age_labels(&a.0, &b.0));
    } else {
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    }
    if let Some(n) = top {
        items.truncate(n);
    }
    items
        .into_iter()
        .map(|(value, count)| DistributionRow {
            value,
            count,
            percent: count as f64 / total as f64 * 100.0,
        })
        .collect()
}

fn compare_age_labels(a: &str, b: &str) -> Ordering {
    match (AgeGroup::from_label(a), AgeGroup::from_label(b)) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => a.cmp(b),
    }
}

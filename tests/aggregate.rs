mod common;

use proptest::prelude::*;
use sales_lens::{
    aggregate::{
        AggregateQuery, SortMetric, aggregate, average_line_value, average_transaction_value,
        distribution, summarize,
    },
    canonical::{CanonicalField, CanonicalRecord, CanonicalTable},
    filter::{FilterSpec, Selection, apply_filters},
    normalize::normalize,
    raw::RawTable,
    resolver::ColumnMapping,
};

use common::sample_table;

fn keys(rows: &[sales_lens::aggregate::AggregateRow]) -> Vec<String> {
    rows.iter().map(|r| r.keys.join("/")).collect()
}

#[test]
fn city_report_ranks_by_total_sales() {
    let table = sample_table();
    let rows = aggregate(&table.view(), &AggregateQuery::new(vec![CanonicalField::City]));
    assert_eq!(keys(&rows), ["Dubai", "Abu Dhabi", "Sharjah"]);
    assert_eq!(rows[0].total_sales, 100.0);
    assert_eq!(rows[0].transaction_count, 3);
    assert_eq!(rows[0].row_count, 4);
    assert_eq!(rows[1].total_sales, 33.0);
    assert_eq!(rows[2].total_sales, 9.0);
}

#[test]
fn ascending_top_n_lists_underperformers() {
    let table = sample_table();
    let query = AggregateQuery::new(vec![CanonicalField::City])
        .top(2)
        .ascending();
    let rows = aggregate(&table.view(), &query);
    assert_eq!(keys(&rows), ["Sharjah", "Abu Dhabi"]);
}

#[test]
fn alternate_metrics_reorder_groups() {
    let table = sample_table();
    let query = AggregateQuery::new(vec![CanonicalField::StoreFormat])
        .sort_by(SortMetric::TotalQuantity);
    let rows = aggregate(&table.view(), &query);
    // Hyper: 2+1+2+1+4, Express: 3+1+1.
    assert_eq!(keys(&rows), ["Hyper", "Express"]);
    assert_eq!(rows[0].total_quantity, 10.0);
    assert_eq!(rows[1].total_quantity, 5.0);

    let query = AggregateQuery::new(vec![CanonicalField::StoreFormat])
        .sort_by(SortMetric::AvgLineValue);
    let rows = aggregate(&table.view(), &query);
    // Express: 59 / 3 beats Hyper: 83 / 5.
    assert_eq!(keys(&rows), ["Express", "Hyper"]);
}

#[test]
fn averages_distinguish_lines_from_baskets() {
    let table = sample_table();
    let view = table.view();
    assert_eq!(average_line_value(&view), 17.75);
    assert!((average_transaction_value(&view) - 142.0 / 7.0).abs() < 1e-9);
}

#[test]
fn summary_reports_headline_figures() {
    let table = sample_table();
    let summary = summarize(&table.view());
    assert_eq!(summary.row_count, 8);
    assert_eq!(summary.total_sales, 142.0);
    assert_eq!(summary.total_quantity, 15.0);
    assert_eq!(summary.transaction_count, 7);
    assert_eq!(summary.promo_usage_percent, 37.5);
}

#[test]
fn age_distribution_uses_bucket_order() {
    let table = sample_table();
    let rows = distribution(&table.view(), CanonicalField::AgeGroup, None);
    let listed = rows
        .iter()
        .map(|r| (r.value.as_str(), r.count))
        .collect::<Vec<_>>();
    assert_eq!(
        listed,
        [("18-24", 1), ("25-34", 3), ("45-54", 2), ("65+", 1), ("Unknown", 1)]
    );
}

#[test]
fn department_distribution_orders_by_count() {
    let table = sample_table();
    let rows = distribution(&table.view(), CanonicalField::Department, Some(2));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].value, "Fresh");
    assert_eq!(rows[0].count, 4);
    assert_eq!(rows[0].percent, 50.0);
    // Bakery and Grocery tie on two rows; the name breaks the tie.
    assert_eq!(rows[1].value, "Bakery");
}

#[test]
fn filtered_subset_with_no_rows_gives_empty_report() {
    let table = sample_table();
    let spec = FilterSpec::new().with_city(Selection::parse("Ajman"));
    let subset = apply_filters(&table.view(), &spec);
    assert!(aggregate(&subset, &AggregateQuery::new(vec![CanonicalField::City])).is_empty());
    assert_eq!(summarize(&subset).total_sales, 0.0);
}

fn record(city: &str, department: &str, txn: u8, cents: u32) -> CanonicalRecord {
    let blank = RawTable::new(Vec::new(), vec![Vec::new()]);
    let mut base = normalize(&blank, &ColumnMapping::default()).records()[0].clone();
    base.city = city.to_string();
    base.department = department.to_string();
    base.transaction = txn.to_string();
    base.sales_amount = f64::from(cents) / 100.0;
    base
}

fn records() -> impl Strategy<Value = Vec<CanonicalRecord>> {
    proptest::collection::vec(
        (
            prop_oneof![Just("Dubai"), Just("Sharjah"), Just("Ajman")],
            prop_oneof![Just("Fresh"), Just("Bakery")],
            0u8..6,
            0u32..100_000,
        )
            .prop_map(|(city, dept, txn, cents)| record(city, dept, txn, cents)),
        0..40,
    )
}

proptest! {
    #[test]
    fn group_totals_add_up_to_the_subset_total(
        records in records(),
        two_keys in any::<bool>(),
    ) {
        let table = CanonicalTable::new(records);
        let group_by = if two_keys {
            vec![CanonicalField::City, CanonicalField::Department]
        } else {
            vec![CanonicalField::City]
        };
        let rows = aggregate(&table.view(), &AggregateQuery::new(group_by));
        let grouped: f64 = rows.iter().map(|r| r.total_sales).sum();
        let total: f64 = table.records().iter().map(|r| r.sales_amount).sum();
        prop_assert!((grouped - total).abs() < 1e-6);
        prop_assert_eq!(rows.iter().map(|r| r.row_count).sum::<usize>(), table.len());
        for pair in rows.windows(2) {
            prop_assert!(pair[0].total_sales >= pair[1].total_sales);
        }
    }
}

mod common;

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use serde_json::Value;

use common::{TestWorkspace, fixture_path};

fn sales_lens() -> Command {
    Command::cargo_bin("sales-lens").expect("binary exists")
}

fn sample() -> String {
    fixture_path("sales_sample.csv").to_str().unwrap().to_string()
}

#[test]
fn detect_prints_and_saves_the_mapping() {
    let workspace = TestWorkspace::new();
    let mapping_path = workspace.path().join("mapping.yaml");
    sales_lens()
        .args(["detect", "-i", &sample(), "-o", mapping_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Net Sales"))
        .stdout(contains("Branch City"))
        .stdout(contains("Store_Format"));

    let saved = fs::read_to_string(&mapping_path).expect("read mapping");
    assert!(saved.contains("amount: Net Sales"));
    assert!(saved.contains("zone: null"));
}

#[test]
fn saved_mapping_drives_later_commands() {
    let workspace = TestWorkspace::new();
    let mapping = workspace.write(
        "mapping.yaml",
        "amount: Qty\ncity: Branch City\ntransaction: Invoice No\n",
    );
    sales_lens()
        .args([
            "report",
            "-i",
            &sample(),
            "--mapping",
            mapping.to_str().unwrap(),
            "--group-by",
            "City",
            "--format",
            "csv",
        ])
        .assert()
        .success()
        .stdout(contains("Dubai,8,"));
}

#[test]
fn stale_mapping_is_resolved_again_with_a_warning() {
    let workspace = TestWorkspace::new();
    let mapping = workspace.write("mapping.yaml", "city: Region\n");
    sales_lens()
        .args([
            "summary",
            "-i",
            &sample(),
            "--mapping",
            mapping.to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stderr(contains("does not fit this input"))
        .stdout(contains("\"total_sales\": 142.0"));
}

#[test]
fn report_ranks_cities_as_csv() {
    let output = sales_lens()
        .args(["report", "-i", &sample(), "--group-by", "City", "--format", "csv"])
        .output()
        .expect("run report");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(
        lines[0],
        "City,TotalSales,TotalQuantity,Transactions,Rows,AvgLineValue,SalesPerTransaction,\
         RevenuePerUnit,PromoRate"
    );
    assert!(lines[1].starts_with("Dubai,100,8,3,4,25,"));
    assert!(lines[2].starts_with("Abu Dhabi,33,"));
    assert!(lines[3].starts_with("Sharjah,9,"));
}

#[test]
fn report_applies_filters_top_and_ascending() {
    sales_lens()
        .args([
            "report",
            "-i",
            &sample(),
            "--group-by",
            "department",
            "--store-format",
            "Hyper",
            "--top",
            "1",
            "--ascending",
            "--format",
            "csv",
        ])
        .assert()
        .success()
        .stdout(contains("Grocery,0,"))
        .stdout(contains("Fresh").not());
}

#[test]
fn report_json_includes_derived_metrics() {
    let output = sales_lens()
        .args([
            "report",
            "-i",
            &sample(),
            "--group-by",
            "City,Store_Format",
            "--sort",
            "row-count",
            "--format",
            "json",
        ])
        .output()
        .expect("run report");
    assert!(output.status.success());
    let document: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(document["group_by"], serde_json::json!(["City", "Store_Format"]));
    let first = &document["rows"][0];
    assert_eq!(first["keys"], serde_json::json!(["Dubai", "Hyper"]));
    assert_eq!(first["row_count"], 3);
    assert_eq!(first["total_sales"], 65.0);
    assert!(first.get("sales_per_transaction").is_some());
}

#[test]
fn summary_table_lists_kpis() {
    sales_lens()
        .args(["summary", "-i", &sample(), "--from", "2024-01-01", "--to", "2024-01-31"])
        .assert()
        .success()
        .stdout(contains("TotalSales"))
        .stdout(contains("34"))
        .stdout(contains("PromoUsagePercent"));
}

#[test]
fn normalize_writes_filtered_canonical_csv() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("dubai.csv");
    sales_lens()
        .args([
            "normalize",
            "-i",
            &sample(),
            "--city",
            "Dubai",
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();
    let contents = fs::read_to_string(&output).expect("read output");
    let lines = contents.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("SalesAmount,Quantity,Transaction,"));
    assert!(lines[1].starts_with("20.5,2,INV-1,Fresh,Hyper,"));
}

#[test]
fn normalize_to_stdout_honours_limit_and_delimiter() {
    let output = sales_lens()
        .args([
            "normalize",
            "-i",
            &sample(),
            "--limit",
            "2",
            "--output-delimiter",
            "|",
        ])
        .output()
        .expect("run normalize");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.starts_with("SalesAmount|Quantity|"));
}

#[test]
fn distribution_lists_age_buckets_in_order() {
    let output = sales_lens()
        .args(["distribution", "-i", &sample(), "--field", "AgeGroup", "--format", "csv"])
        .output()
        .expect("run distribution");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let values = stdout
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(values, ["18-24", "25-34", "45-54", "65+", "Unknown"]);
}

#[test]
fn values_lists_filter_choices() {
    sales_lens()
        .args(["values", "-i", &sample(), "--field", "City"])
        .assert()
        .success()
        .stdout("All\nAbu Dhabi\nDubai\nSharjah\n");
}

#[test]
fn synonym_override_file_changes_resolution() {
    sales_lens()
        .args([
            "detect",
            "-i",
            &sample(),
            "--synonyms",
            fixture_path("synonyms.yaml").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("Branch City"));
}

#[test]
fn missing_input_fails() {
    sales_lens()
        .args(["summary", "-i", "does-not-exist.csv"])
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn malformed_input_fails_before_reporting() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("ragged.csv", "amount,city\n1,Dubai\n2,Dubai,extra\n");
    sales_lens()
        .args(["report", "-i", input.to_str().unwrap(), "--group-by", "City"])
        .assert()
        .failure()
        .stderr(contains("malformed CSV at record 3"));
}

#[test]
fn unknown_filter_field_is_rejected() {
    sales_lens()
        .args(["summary", "-i", &sample(), "--filter", "Region=North"])
        .assert()
        .failure()
        .stderr(contains("Unknown field 'Region'"));
}

#[test]
fn empty_filter_result_is_not_an_error() {
    sales_lens()
        .args(["report", "-i", &sample(), "--group-by", "City", "--city", "Ajman"])
        .assert()
        .success()
        .stderr(contains("No rows match"));
}

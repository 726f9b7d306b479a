//! Report commands: grouped rankings, KPI summaries, distributions and filter
//! choices, rendered as a terminal table, CSV or JSON.

use std::io::{self, Write};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::{
    aggregate::{
        AggregateQuery, AggregateRow, DistributionRow, Summary, aggregate, distribution, summarize,
    },
    cli::{DistributionArgs, OutputFormat, ReportArgs, SummaryArgs, ValuesArgs},
    data::format_number,
    filter::choices,
    io_utils,
    pipeline::Pipeline,
    table,
};

const METRIC_HEADERS: [&str; 8] = [
    "TotalSales",
    "TotalQuantity",
    "Transactions",
    "Rows",
    "AvgLineValue",
    "SalesPerTransaction",
    "RevenuePerUnit",
    "PromoRate",
];

#[derive(Debug, Serialize)]
struct ReportEntry<'a> {
    #[serde(flatten)]
    row: &'a AggregateRow,
    sales_per_transaction: f64,
    revenue_per_unit: f64,
    promo_rate: f64,
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    group_by: Vec<&'static str>,
    rows: Vec<ReportEntry<'a>>,
}

pub fn execute_report(args: &ReportArgs) -> Result<()> {
    let pipeline = Pipeline::open(&args.input)?;
    let subset = pipeline.filtered(&args.filters)?;
    if subset.is_empty() {
        warn!("No rows match the selected filters");
    }
    for field in args.group_by.iter().filter(|f| !f.is_dimension()) {
        warn!("Grouping by measure field {field}; expect one group per distinct value");
    }
    let mut query = AggregateQuery::new(args.group_by.clone()).sort_by(args.sort);
    if let Some(n) = args.top {
        query = query.top(n);
    }
    if args.ascending {
        query = query.ascending();
    }
    let rows = aggregate(&subset, &query);
    info!(
        "Grouped {} row(s) into {} group(s) by {}",
        subset.len(),
        rows.len(),
        args.group_by.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
    );

    let mut headers = args
        .group_by
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<_>>();
    headers.extend(METRIC_HEADERS.iter().map(|h| h.to_string()));

    match args.format {
        OutputFormat::Table => {
            let body = rows
                .iter()
                .map(|row| report_cells(row, format_number))
                .collect::<Vec<_>>();
            table::print_table(&headers, &body);
        }
        OutputFormat::Csv => {
            let body = rows
                .iter()
                .map(|row| report_cells(row, |v| v.to_string()))
                .collect::<Vec<_>>();
            write_csv(&headers, &body)?;
        }
        OutputFormat::Json => {
            let document = ReportDocument {
                group_by: args.group_by.iter().map(|f| f.name()).collect(),
                rows: rows
                    .iter()
                    .map(|row| ReportEntry {
                        row,
                        sales_per_transaction: row.sales_per_transaction(),
                        revenue_per_unit: row.revenue_per_unit(),
                        promo_rate: row.promo_rate(),
                    })
                    .collect(),
            };
            write_json(&document)?;
        }
    }
    Ok(())
}

fn report_cells(row: &AggregateRow, number: impl Fn(f64) -> String) -> Vec<String> {
    let mut cells = row.keys.clone();
    cells.extend([
        number(row.total_sales),
        number(row.total_quantity),
        row.transaction_count.to_string(),
        row.row_count.to_string(),
        number(row.avg_line_value),
        number(row.sales_per_transaction()),
        number(row.revenue_per_unit()),
        number(row.promo_rate()),
    ]);
    cells
}

pub fn execute_summary(args: &SummaryArgs) -> Result<()> {
    let pipeline = Pipeline::open(&args.input)?;
    let subset = pipeline.filtered(&args.filters)?;
    if subset.is_empty() {
        warn!("No rows match the selected filters");
    }
    let summary = summarize(&subset);
    match args.format {
        OutputFormat::Json => write_json(&summary)?,
        OutputFormat::Table => {
            let headers = vec!["Metric".to_string(), "Value".to_string()];
            table::print_table(&headers, &summary_cells(&summary, format_number));
        }
        OutputFormat::Csv => {
            let headers = vec!["Metric".to_string(), "Value".to_string()];
            write_csv(&headers, &summary_cells(&summary, |v| v.to_string()))?;
        }
    }
    Ok(())
}

fn summary_cells(summary: &Summary, number: impl Fn(f64) -> String) -> Vec<Vec<String>> {
    [
        ("Rows", summary.row_count.to_string()),
        ("TotalSales", number(summary.total_sales)),
        ("TotalQuantity", number(summary.total_quantity)),
        ("Transactions", summary.transaction_count.to_string()),
        ("AvgTransactionValue", number(summary.average_transaction_value)),
        ("AvgLineValue", number(summary.average_line_value)),
        ("PromoUsagePercent", number(summary.promo_usage_percent)),
    ]
    .into_iter()
    .map(|(label, value)| vec![label.to_string(), value])
    .collect()
}

pub fn execute_distribution(args: &DistributionArgs) -> Result<()> {
    let pipeline = Pipeline::open(&args.input)?;
    let subset = pipeline.filtered(&args.filters)?;
    if subset.is_empty() {
        warn!("No rows match the selected filters");
    }
    let rows = distribution(&subset, args.field, args.top);
    let headers = vec![
        args.field.name().to_string(),
        "Count".to_string(),
        "Percent".to_string(),
    ];
    match args.format {
        OutputFormat::Json => write_json(&rows)?,
        OutputFormat::Table => {
            table::print_table(&headers, &distribution_cells(&rows, |v| format!("{v:.2}%")))
        }
        OutputFormat::Csv => write_csv(&headers, &distribution_cells(&rows, |v| v.to_string()))?,
    }
    Ok(())
}

fn distribution_cells(rows: &[DistributionRow], percent: impl Fn(f64) -> String) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| vec![row.value.clone(), row.count.to_string(), percent(row.percent)])
        .collect()
}

pub fn execute_values(args: &ValuesArgs) -> Result<()> {
    let pipeline = Pipeline::open(&args.input)?;
    if !args.field.is_dimension() {
        warn!(
            "{} is a measure; listing its distinct values anyway",
            args.field
        );
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for value in choices(pipeline.table(), args.field) {
        writeln!(handle, "{value}").context("Writing values")?;
    }
    Ok(())
}

fn write_csv(headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = io_utils::csv_writer(io::stdout().lock(), b',');
    writer.write_record(headers).context("Writing CSV headers")?;
    for row in rows {
        writer.write_record(row).context("Writing CSV row")?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}

fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value).context("Serializing JSON output")?;
    writeln!(handle).context("Writing JSON output")?;
    Ok(())
}

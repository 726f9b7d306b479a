use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{aggregate::SortMetric, canonical::CanonicalField};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Map arbitrary retail sales exports onto one canonical schema and report on them",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show which source column feeds each semantic role
    Detect(DetectArgs),
    /// Write the (filtered) canonical table as CSV
    Normalize(NormalizeArgs),
    /// Group the filtered rows and rank the groups by a sales metric
    Report(ReportArgs),
    /// Headline KPIs for the filtered rows
    Summary(SummaryArgs),
    /// Row counts and shares for each value of one field
    Distribution(DistributionArgs),
    /// List the filter choices available for a field
    Values(ValuesArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input CSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML file overriding the synonym list of one or more roles
    #[arg(long)]
    pub synonyms: Option<PathBuf>,
    /// Saved column mapping (as written by `detect --output`)
    #[arg(long)]
    pub mapping: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Keep only rows from this city (`All` disables the filter)
    #[arg(long)]
    pub city: Option<String>,
    /// Keep only rows from this store format (`All` disables the filter)
    #[arg(long = "store-format")]
    pub store_format: Option<String>,
    /// First day of the date window, inclusive
    #[arg(long)]
    pub from: Option<String>,
    /// Last day of the date window, inclusive
    #[arg(long)]
    pub to: Option<String>,
    /// Additional equality filters such as `Department=Fresh Food`
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Save the resolved mapping as YAML
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Limit number of rows emitted
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Comma-separated canonical fields to group by
    #[arg(
        short = 'g',
        long = "group-by",
        value_delimiter = ',',
        required = true,
        value_parser = parse_field
    )]
    pub group_by: Vec<CanonicalField>,
    /// Keep only the first N groups after sorting
    #[arg(long)]
    pub top: Option<usize>,
    /// Metric used to rank groups
    #[arg(long, value_enum, default_value = "total-sales")]
    pub sort: SortMetric,
    /// Rank from lowest to highest
    #[arg(long)]
    pub ascending: bool,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct DistributionArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Canonical field to count
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    pub field: CanonicalField,
    /// Maximum distinct values to display (all when omitted)
    #[arg(long)]
    pub top: Option<usize>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ValuesArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Canonical field to list
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    pub field: CanonicalField,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

pub fn parse_field(value: &str) -> Result<CanonicalField, String> {
    value.parse::<CanonicalField>().map_err(|err| err.to_string())
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

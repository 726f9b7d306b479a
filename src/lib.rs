pub mod aggregate;
pub mod canonical;
pub mod cli;
pub mod data;
pub mod export;
pub mod filter;
pub mod io_utils;
pub mod normalize;
pub mod pipeline;
pub mod raw;
pub mod report;
pub mod resolver;
pub mod roles;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    pipeline::ResolvedInput,
    roles::SemanticRole,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_lens", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect(args) => handle_detect(&args),
        Commands::Normalize(args) => export::execute(&args),
        Commands::Report(args) => report::execute_report(&args),
        Commands::Summary(args) => report::execute_summary(&args),
        Commands::Distribution(args) => report::execute_distribution(&args),
        Commands::Values(args) => report::execute_values(&args),
    }
}

fn handle_detect(args: &cli::DetectArgs) -> Result<()> {
    let input = ResolvedInput::load(&args.input)?;
    let headers = vec![
        "Role".to_string(),
        "Column".to_string(),
        "Canonical".to_string(),
    ];
    let rows = SemanticRole::ALL
        .iter()
        .map(|role| {
            vec![
                role.key().to_string(),
                input.mapping.get(*role).unwrap_or("-").to_string(),
                role.canonical_name().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);

    if let Some(path) = &args.output {
        input
            .mapping
            .save(path)
            .with_context(|| format!("Writing mapping to {path:?}"))?;
        info!("Column mapping written to {path:?}");
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

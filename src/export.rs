//! Canonical table export and read-back.
//!
//! Exported files carry the canonical headers, so they can be fed straight
//! back through the loader and normalizer.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{info, warn};

use crate::{
    canonical::{CanonicalField, CanonicalTable, Subset},
    cli::NormalizeArgs,
    io_utils,
    normalize::normalize,
    pipeline::Pipeline,
    raw::{LoadError, RawTable},
    resolver::ColumnMapping,
};

/// Writes `rows` as delimited text with a header row, one column per
/// canonical field.
pub fn write_canonical<W: Write>(writer: &mut csv::Writer<W>, rows: &Subset<'_>) -> Result<()> {
    writer
        .write_record(CanonicalField::headers())
        .context("Writing canonical headers")?;
    for record in rows.iter() {
        writer
            .write_record(
                CanonicalField::ALL
                    .iter()
                    .map(|field| field.render(record).into_owned()),
            )
            .context("Writing canonical row")?;
    }
    writer.flush().context("Flushing canonical output")?;
    Ok(())
}

/// Reads a previously exported table. Columns are matched by exact canonical
/// name rather than by synonym.
pub fn read_canonical<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<CanonicalTable, LoadError> {
    let raw = RawTable::from_reader(reader, delimiter, encoding)?;
    let mapping = ColumnMapping::canonical(raw.headers());
    Ok(normalize(&raw, &mapping))
}

pub fn execute(args: &NormalizeArgs) -> Result<()> {
    let pipeline = Pipeline::open(&args.input)?;
    let filtered = pipeline.filtered(&args.filters)?;
    if filtered.is_empty() {
        warn!("No rows match the selected filters; writing headers only");
    }
    let rows = match args.limit {
        Some(limit) => filtered.take(limit),
        None => filtered,
    };

    let output_path = args.output.as_deref();
    let delimiter = io_utils::resolve_output_delimiter(
        output_path,
        args.output_delimiter,
        pipeline.delimiter(),
    );
    let mut writer = io_utils::open_csv_writer(output_path, delimiter)?;
    write_canonical(&mut writer, &rows)?;
    info!(
        "Exported {} canonical row(s) to {}",
        rows.len(),
        output_path
            .filter(|p| !io_utils::is_dash(p))
            .map(|p| format!("{p:?}"))
            .unwrap_or_else(|| "stdout".to_string())
    );
    Ok(())
}

//! Shared command plumbing: load the input, settle the column mapping,
//! normalize once and build the filter for the current invocation.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    canonical::{CanonicalTable, Subset},
    cli::{FilterArgs, InputArgs},
    filter::{FilterSpec, Selection, apply_filters, parse_date_range, parse_equality_filters},
    io_utils,
    normalize::normalize,
    printable_delimiter,
    raw::RawTable,
    resolver::{ColumnMapping, resolve},
    roles::{SemanticRole, SynonymTable},
};

/// Raw input plus the mapping that will be applied to it.
#[derive(Debug)]
pub struct ResolvedInput {
    pub raw: RawTable,
    pub mapping: ColumnMapping,
    pub delimiter: u8,
}

impl ResolvedInput {
    pub fn load(args: &InputArgs) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
        let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
        info!(
            "Reading '{}' with delimiter '{}' and encoding {}",
            args.input.display(),
            printable_delimiter(delimiter),
            encoding.name()
        );
        let raw = RawTable::load(&args.input, delimiter, encoding)
            .with_context(|| format!("Loading {:?}", args.input))?;
        let mapping = settle_mapping(args, &raw)?;
        info!(
            "Mapped {} of {} role(s)",
            mapping.mapped().count(),
            SemanticRole::ALL.len()
        );
        Ok(Self {
            raw,
            mapping,
            delimiter,
        })
    }
}

fn settle_mapping(args: &InputArgs, raw: &RawTable) -> Result<ColumnMapping> {
    let synonyms = match &args.synonyms {
        Some(path) => SynonymTable::load(path)
            .with_context(|| format!("Loading synonyms from {path:?}"))?,
        None => SynonymTable::default(),
    };
    let Some(path) = &args.mapping else {
        return Ok(resolve(raw.headers(), &synonyms));
    };
    let saved = ColumnMapping::load(path)?;
    match saved.validate(raw.headers()) {
        Ok(()) => {
            info!("Using saved mapping from {path:?}");
            Ok(saved)
        }
        Err(err) => {
            warn!("Saved mapping {path:?} does not fit this input ({err}); resolving again");
            Ok(resolve(raw.headers(), &synonyms))
        }
    }
}

/// A loaded and normalized dataset, ready for filtering.
#[derive(Debug)]
pub struct Pipeline {
    table: CanonicalTable,
    delimiter: u8,
}

impl Pipeline {
    pub fn open(args: &InputArgs) -> Result<Self> {
        let input = ResolvedInput::load(args)?;
        let table = normalize(&input.raw, &input.mapping);
        Ok(Self {
            table,
            delimiter: input.delimiter,
        })
    }

    pub fn table(&self) -> &CanonicalTable {
        &self.table
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn filtered(&self, args: &FilterArgs) -> Result<Subset<'_>> {
        let spec = filter_spec(args)?;
        let subset = apply_filters(&self.table.view(), &spec);
        if !spec.is_unconstrained() {
            info!(
                "Filters kept {} of {} row(s)",
                subset.len(),
                self.table.len()
            );
        }
        Ok(subset)
    }
}

pub fn filter_spec(args: &FilterArgs) -> Result<FilterSpec> {
    let mut spec = FilterSpec::new();
    if let Some(city) = &args.city {
        spec = spec.with_city(Selection::parse(city));
    }
    if let Some(format) = &args.store_format {
        spec = spec.with_store_format(Selection::parse(format));
    }
    for (field, selection) in parse_equality_filters(&args.filters)? {
        spec = spec.with_equals(field, selection);
    }
    if let Some(range) = parse_date_range(args.from.as_deref(), args.to.as_deref())? {
        spec = spec.with_date_range(range);
    }
    Ok(spec)
}

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;

use crate::{
    canonical::{CanonicalField, CanonicalRecord, CanonicalTable, Subset, UNKNOWN},
    data::parse_naive_date,
};

/// Sentinel selection meaning "do not constrain this field".
pub const ALL: &str = "All";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL) {
            Selection::All
        } else {
            Selection::Only(trimmed.to_string())
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

/// Inclusive calendar-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Rows without a date never fall inside a range.
    pub fn contains(&self, date: Option<&NaiveDateTime>) -> bool {
        date.is_some_and(|d| {
            let day = d.date();
            self.start <= day && day <= self.end
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    Equals {
        field: CanonicalField,
        selection: Selection,
    },
    Within(DateRange),
}

/// Conjunction of clauses chosen for one interaction. Built once and passed
/// by value; never shared or mutated across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    clauses: Vec<FilterClause>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(self, selection: Selection) -> Self {
        self.with_equals(CanonicalField::City, selection)
    }

    pub fn with_store_format(self, selection: Selection) -> Self {
        self.with_equals(CanonicalField::StoreFormat, selection)
    }

    pub fn with_equals(mut self, field: CanonicalField, selection: Selection) -> Self {
        self.clauses.push(FilterClause::Equals { field, selection });
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.clauses.push(FilterClause::Within(range));
        self
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// True when no clause constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        self.clauses.iter().all(|clause| {
            matches!(
                clause,
                FilterClause::Equals {
                    selection: Selection::All,
                    ..
                }
            )
        })
    }

    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        self.clauses.iter().all(|clause| match clause {
            FilterClause::Equals { field, selection } => {
                selection.matches(field.render(record).as_ref())
            }
            FilterClause::Within(range) => range.contains(record.date.as_ref()),
        })
    }
}

/// Narrows `rows` to the records satisfying every clause. The input is left
/// untouched and an empty result is an ordinary outcome.
pub fn apply_filters<'a>(rows: &Subset<'a>, spec: &FilterSpec) -> Subset<'a> {
    Subset::new(rows.iter().filter(|record| spec.matches(record)).collect())
}

/// Values offered for a field: the `All` sentinel followed by the sorted
/// distinct values, leaving out the `Unknown` placeholder.
pub fn choices(table: &CanonicalTable, field: CanonicalField) -> Vec<String> {
    let values = table
        .records()
        .iter()
        .map(|record| field.render(record).into_owned())
        .filter(|value| value != UNKNOWN && !value.is_empty())
        .sorted()
        .dedup();
    std::iter::once(ALL.to_string()).chain(values).collect()
}

/// Parses `Field=Value` expressions into equality clauses.
pub fn parse_equality_filters(filters: &[String]) -> Result<Vec<(CanonicalField, Selection)>> {
    filters.iter().map(|f| parse_equality_filter(f)).collect()
}

fn parse_equality_filter(filter: &str) -> Result<(CanonicalField, Selection)> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty filter expression"));
    }
    let (left, right) = trimmed
        .split_once('=')
        .ok_or_else(|| anyhow!("Failed to parse filter expression '{trimmed}'"))?;
    let field = left
        .trim()
        .parse::<CanonicalField>()
        .with_context(|| format!("Filter '{trimmed}'"))?;
    Ok((field, Selection::parse(unquote(right.trim()))))
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Builds a date range from optional bounds; a missing bound is open.
pub fn parse_date_range(from: Option<&str>, to: Option<&str>) -> Result<Option<DateRange>> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    let start = match from {
        Some(raw) => parse_naive_date(raw.trim()).with_context(|| "Parsing --from")?,
        None => NaiveDate::MIN,
    };
    let end = match to {
        Some(raw) => parse_naive_date(raw.trim()).with_context(|| "Parsing --to")?,
        None => NaiveDate::MAX,
    };
    Ok(Some(DateRange::new(start, end)))
}

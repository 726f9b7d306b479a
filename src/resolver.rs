//! Column resolution: source headers to semantic roles.

use std::{
    collections::{BTreeMap, HashSet},
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roles::{SemanticRole, SynonymTable};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("role '{role}' is mapped to column '{column}', which is not present in the input")]
    StaleColumn { role: SemanticRole, column: String },
}

/// Role to source column assignment. Every role has an entry; unmapped roles
/// hold `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    columns: BTreeMap<SemanticRole, Option<String>>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            columns: SemanticRole::ALL.iter().map(|r| (*r, None)).collect(),
        }
    }
}

impl ColumnMapping {
    pub fn get(&self, role: SemanticRole) -> Option<&str> {
        self.columns.get(&role).and_then(|c| c.as_deref())
    }

    pub fn set(&mut self, role: SemanticRole, column: Option<String>) {
        self.columns.insert(role, column);
    }

    pub fn mapped(&self) -> impl Iterator<Item = (SemanticRole, &str)> + '_ {
        SemanticRole::ALL
            .iter()
            .filter_map(|role| self.get(*role).map(|column| (*role, column)))
    }

    pub fn unmapped(&self) -> impl Iterator<Item = SemanticRole> + '_ {
        SemanticRole::ALL
            .iter()
            .copied()
            .filter(|role| self.get(*role).is_none())
    }

    /// Maps each role to the column carrying its canonical name, if present.
    /// Used to read back an exported canonical table.
    pub fn canonical(headers: &[String]) -> Self {
        let mut mapping = Self::default();
        for role in SemanticRole::ALL {
            let name = role.canonical_name();
            if headers.iter().any(|h| h == name) {
                mapping.set(role, Some(name.to_string()));
            }
        }
        mapping
    }

    /// Checks that every mapped column exists in `headers`.
    pub fn validate(&self, headers: &[String]) -> Result<(), MappingError> {
        let known = headers.iter().map(String::as_str).collect::<HashSet<_>>();
        for (role, column) in self.mapped() {
            if !known.contains(column) {
                return Err(MappingError::StaleColumn {
                    role,
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating mapping file {path:?}"))?;
        serde_yaml::to_writer(BufWriter::new(file), self).context("Writing mapping YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening mapping file {path:?}"))?;
        let loaded: ColumnMapping = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing mapping YAML {path:?}"))?;
        // Roles omitted from the file are unmapped.
        let mut mapping = Self::default();
        for (role, column) in loaded.columns {
            mapping.set(role, column.filter(|c| !c.is_empty()));
        }
        Ok(mapping)
    }
}

/// Assigns a source column to every role it can.
///
/// For each role the synonyms are tried in order; for each synonym the
/// columns are scanned in their original order and the first column whose
/// lowercased name contains the synonym wins. One column may satisfy several
/// roles.
pub fn resolve<S: AsRef<str>>(columns: &[S], synonyms: &SynonymTable) -> ColumnMapping {
    let lowered = columns
        .iter()
        .map(|c| c.as_ref().to_lowercase())
        .collect::<Vec<_>>();
    let mut mapping = ColumnMapping::default();
    for (role, candidates) in synonyms.iter() {
        let found = candidates.iter().find_map(|synonym| {
            lowered
                .iter()
                .position(|column| column.contains(synonym.as_str()))
        });
        if let Some(idx) = found {
            let column = columns[idx].as_ref().to_string();
            debug!("Role '{role}' resolved to column '{column}'");
            mapping.set(role, Some(column));
        } else {
            debug!("Role '{role}' left unmapped");
        }
    }
    mapping
}

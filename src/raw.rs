//! Raw tabular input: headers plus text cells, no assumed schema.

use std::{io::Read, path::Path};

use encoding_rs::Encoding;
use log::info;
use thiserror::Error;

use crate::io_utils;

/// The input could not be read as a table at all. This is the only fatal
/// condition in the pipeline; it is raised before normalization starts.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("opening input {path:?}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV at record {record}")]
    Csv {
        record: usize,
        #[source]
        source: csv::Error,
    },
    #[error("decoding record {record}: {message}")]
    Decode { record: usize, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table, padding short rows with empty cells and dropping cells
    /// beyond the header count.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Builds a table from `(column, value)` rows; columns are ordered by first
    /// appearance and absent cells are left empty.
    pub fn from_pairs<K, V>(records: &[Vec<(K, V)>]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers: Vec<String> = Vec::new();
        for record in records {
            for (key, _) in record {
                if !headers.iter().any(|h| h == key.as_ref()) {
                    headers.push(key.as_ref().to_string());
                }
            }
        }
        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|header| {
                        record
                            .iter()
                            .find(|(key, _)| key.as_ref() == header)
                            .map(|(_, value)| value.as_ref().to_string())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
    }

    /// Reads a delimited table with one header row. An empty input yields a
    /// table with no columns and no rows.
    pub fn from_reader<R: Read>(
        reader: R,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self, LoadError> {
        let mut reader = io_utils::open_csv_reader(reader, delimiter);
        let header_record = reader
            .byte_headers()
            .map_err(|source| LoadError::Csv { record: 1, source })?
            .clone();
        let headers = decode(&header_record, encoding, 1)?;

        let mut rows = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record_number = idx + 2;
            let record = record.map_err(|source| LoadError::Csv {
                record: record_number,
                source,
            })?;
            rows.push(decode(&record, encoding, record_number)?);
        }
        Ok(Self::new(headers, rows))
    }

    pub fn load(
        path: &Path,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self, LoadError> {
        let input = io_utils::open_input(path).map_err(|source| LoadError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_reader(input, delimiter, encoding)?;
        info!(
            "Loaded {} row(s) across {} column(s) from {:?}",
            table.len(),
            table.headers.len(),
            path
        );
        Ok(table)
    }
}

fn decode(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    record_number: usize,
) -> Result<Vec<String>, LoadError> {
    io_utils::decode_record(record, encoding).map_err(|err| LoadError::Decode {
        record: record_number,
        message: err.to_string(),
    })
}

use std::{io::Read, path::Path};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use text_featurizer::Document;

/// Owned text fields of one input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record(Vec<Option<String>>);

impl Record {
    pub fn document(&self) -> Document<'_> {
        Document::new(self.0.iter().map(Option::as_deref))
    }
}

/// One element of a JSON batch: a single text, `null`, or one entry per column.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonRecord {
    Text(Option<String>),
    Fields(Vec<Option<String>>),
}

impl From<JsonRecord> for Record {
    fn from(record: JsonRecord) -> Self {
        match record {
            JsonRecord::Text(text) => Self(vec![text]),
            JsonRecord::Fields(fields) => Self(fields),
        }
    }
}

/// Read the whole input from `path`, or stdin when `path` is `None`.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            Ok(buffer)
        }
    }
}

/// One record per line, fields split on `delimiter`. An empty field is
/// treated as absent.
pub fn parse_lines(contents: &str, delimiter: char, columns: usize) -> Result<Vec<Record>> {
    contents
        .lines()
        .enumerate()
        .map(|(line_no, line)| {
            let fields = if columns == 1 {
                vec![line]
            } else {
                line.split(delimiter).collect()
            };
            if fields.len() != columns {
                bail!(
                    "line {}: expected {columns} fields separated by {delimiter:?}, found {}",
                    line_no + 1,
                    fields.len()
                );
            }
            Ok(Record(
                fields
                    .into_iter()
                    .map(|field| (!field.is_empty()).then(|| field.to_string()))
                    .collect(),
            ))
        })
        .collect()
}

/// A JSON array of records.
pub fn parse_json(contents: &str) -> Result<Vec<Record>> {
    let records: Vec<JsonRecord> =
        serde_json::from_str(contents).context("Failed to parse JSON array of records")?;
    Ok(records.into_iter().map(Record::from).collect())
}

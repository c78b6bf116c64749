//! Typed rows of the retrieved (input) and reranked (output) tables.
//!
//! Rows are deserialized once at the boundary. Columns beyond the fixed ones
//! (`qid`, `query`, `docno`, `score`) are kept verbatim in `fields`, so alternate
//! text columns such as `body` or `title` survive the round trip.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Column an incoming prior rank is moved to when the output gains its own `rank`.
pub const PRIOR_RANK_FIELD: &str = "rank_orig";

/// One row of a retrieved result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedRow {
    pub qid: String,
    pub query: String,
    pub docno: String,
    pub score: f64,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl RetrievedRow {
    pub fn new(
        qid: impl Into<String>,
        query: impl Into<String>,
        docno: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            qid: qid.into(),
            query: query.into(),
            docno: docno.into(),
            score,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Shorthand for the common `text` column.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_field(crate::types::TEXT_FIELD, text.into())
    }

    /// String value of an extra column, if present and textual.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// One row of the reranked table.
///
/// `rank` and `score` are `None` for rows outside the reranked prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedRow {
    pub qid: String,
    pub query: String,
    pub docno: String,
    /// First-stage retrieval score, renamed so it does not collide with `score`.
    pub score_orig: f64,
    pub rank: Option<usize>,
    pub score: Option<f64>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl RerankedRow {
    /// Build an output row from an input row and its new rank (if reranked).
    pub fn from_retrieved(row: RetrievedRow, rank: Option<usize>) -> Self {
        let RetrievedRow {
            qid,
            query,
            docno,
            score,
            mut fields,
        } = row;
        for column in OUTPUT_COLUMNS {
            shift_aside(&mut fields, column);
        }
        Self {
            qid,
            query,
            docno,
            score_orig: score,
            rank,
            score: rank.map(reciprocal_rank),
            fields,
        }
    }

    pub fn is_reranked(&self) -> bool {
        self.rank.is_some()
    }
}

/// Read a JSON Lines table, one row per non-blank line.
pub fn read_jsonl_rows<R: BufRead>(reader: R) -> Result<Vec<RetrievedRow>> {
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|source| Error::InvalidRow {
            line: index + 1,
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write reranked rows as JSON Lines.
pub fn write_jsonl_rows<W: Write>(mut writer: W, rows: &[RerankedRow]) -> Result<()> {
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Output columns an extra input column must not shadow.
const OUTPUT_COLUMNS: [&str; 2] = ["rank", "score_orig"];

/// Move `key` to `{key}_orig`, first pushing any existing `{key}_orig` one
/// suffix further, so the most recent prior value always sits at `{key}_orig`.
fn shift_aside(fields: &mut BTreeMap<String, Value>, key: &str) {
    if let Some(value) = fields.remove(key) {
        let target = format!("{key}_orig");
        shift_aside(fields, &target);
        fields.insert(target, value);
    }
}

/// Reciprocal-rank score for a 0-based rank: `1 / (rank + 1)`.
pub fn reciprocal_rank(rank: usize) -> f64 {
    1.0 / (rank as f64 + 1.0)
}

type SelectFn = dyn Fn(&RetrievedRow) -> Option<String> + Send + Sync;

/// Chooses which part of a row supplies the document text.
#[derive(Clone)]
pub enum TextSelector {
    /// Read a named column.
    Field(String),
    /// Derive the text with a caller-supplied function (e.g. title + body).
    Custom { name: String, select: Arc<SelectFn> },
}

impl TextSelector {
    pub fn field(name: impl Into<String>) -> Self {
        TextSelector::Field(name.into())
    }

    pub fn custom<F>(name: impl Into<String>, select: F) -> Self
    where
        F: Fn(&RetrievedRow) -> Option<String> + Send + Sync + 'static,
    {
        TextSelector::Custom {
            name: name.into(),
            select: Arc::new(select),
        }
    }

    /// Name reported in errors and logs.
    pub fn name(&self) -> &str {
        match self {
            TextSelector::Field(name) | TextSelector::Custom { name, .. } => name,
        }
    }

    /// Resolve the text for `row`, failing with [`Error::MissingTextField`].
    pub fn select(&self, row: &RetrievedRow) -> Result<String> {
        let text = match self {
            TextSelector::Field(name) => row.field_str(name).map(str::to_string),
            TextSelector::Custom { select, .. } => select(row),
        };
        text.ok_or_else(|| Error::MissingTextField {
            docno: row.docno.clone(),
            field: self.name().to_string(),
        })
    }
}

impl Default for TextSelector {
    fn default() -> Self {
        TextSelector::Field(crate::types::TEXT_FIELD.to_string())
    }
}

impl fmt::Debug for TextSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSelector::Field(name) => f.debug_tuple("Field").field(name).finish(),
            TextSelector::Custom { name, .. } => {
                f.debug_struct("Custom").field("name", name).finish_non_exhaustive()
            }
        }
    }
}

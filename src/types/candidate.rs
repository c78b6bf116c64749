//! Query, candidate, request and result types exchanged with the rerank engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the document payload field the engine ranks on.
pub const TEXT_FIELD: &str = "text";

/// A single search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub qid: String,
}

impl Query {
    pub fn new(text: impl Into<String>, qid: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            qid: qid.into(),
        }
    }
}

/// One retrieved document for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub docid: String,
    /// Score assigned by the first-stage retriever.
    pub score: f64,
    /// Document payload; always carries [`TEXT_FIELD`].
    pub doc: BTreeMap<String, String>,
}

impl Candidate {
    pub fn new(docid: impl Into<String>, score: f64, text: impl Into<String>) -> Self {
        let mut doc = BTreeMap::new();
        doc.insert(TEXT_FIELD.to_string(), text.into());
        Self {
            docid: docid.into(),
            score,
            doc,
        }
    }

    pub fn text(&self) -> &str {
        self.doc.get(TEXT_FIELD).map(String::as_str).unwrap_or("")
    }
}

/// The full unit of reranking work: one query and its ordered candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub query: Query,
    pub candidates: Vec<Candidate>,
}

impl Request {
    pub fn new(query: Query, candidates: Vec<Candidate>) -> Self {
        Self { query, candidates }
    }
}

/// Reordered outcome of a rerank call.
///
/// `candidates` holds only the reranked prefix, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    pub query: Query,
    pub candidates: Vec<Candidate>,
}

impl RerankResult {
    pub fn docids(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.docid.as_str())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

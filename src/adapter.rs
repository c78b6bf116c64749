//! 重排适配器：检索结果表 → 重排请求 → 列表式重排 → 合并回结果表。
//!
//! # Rerank Adapter
//!
//! [`LlmReRanker`] is the pipeline stage. It takes the rows retrieved for one
//! query, exposes the leading `top_k_candidates` of them to the listwise
//! engine, and merges the new order back onto the original rows.
//!
//! ## Output
//!
//! Every input row appears exactly once (left outer join on `docno`):
//!
//! | Column | Reranked rows | Other rows |
//! |--------|---------------|------------|
//! | `score_orig` | first-stage score | first-stage score |
//! | `rank` | 0-based new rank | `None` |
//! | `score` | `1 / (rank + 1)` | `None` |
//!
//! Reranked rows come first, ordered by new rank, followed by the remaining
//! rows in their original order.

use crate::config::LlmRerankerConfig;
use crate::engine::{ChatCompletionsAgent, ListwiseAgent, RerankOptions, Reranker};
use crate::types::{
    Candidate, Query, RerankResult, RerankedRow, Request, RetrievedRow, TextSelector,
};
use crate::{Error, ErrorContext, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// Listwise LLM reranking stage over retrieved result tables.
#[derive(Clone)]
pub struct LlmReRanker {
    config: LlmRerankerConfig,
    text: TextSelector,
    reranker: Reranker,
}

impl LlmReRanker {
    /// Load the configured chat-completions agent and wrap it in a reranker.
    pub fn new(config: LlmRerankerConfig) -> Result<Self> {
        config.validate()?;
        let agent = ChatCompletionsAgent::from_config(&config)?;
        Self::with_agent(config, Arc::new(agent))
    }

    /// Use an already constructed agent.
    pub fn with_agent(config: LlmRerankerConfig, agent: Arc<dyn ListwiseAgent>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            text: TextSelector::field(config.text_key.clone()),
            reranker: Reranker::new(agent),
            config,
        })
    }

    /// Replace the `text_key` column lookup with a custom selector.
    pub fn with_text_selector(mut self, selector: TextSelector) -> Self {
        self.text = selector;
        self
    }

    pub fn config(&self) -> &LlmRerankerConfig {
        &self.config
    }

    pub fn text_selector(&self) -> &TextSelector {
        &self.text
    }

    pub fn rerank_options(&self) -> RerankOptions {
        self.config.rerank_options()
    }

    /// Rerank the rows retrieved for a single query.
    pub async fn transform(&self, rows: Vec<RetrievedRow>) -> Result<Vec<RerankedRow>> {
        let request = self.build_request(&rows)?;
        let span = info_span!(
            "transform",
            qid = %request.query.qid,
            rows = rows.len(),
            model = self.reranker.agent().model()
        );

        async {
            let result = self.reranker.rerank(request, &self.rerank_options()).await?;
            let ranks = rank_by_docno(&result)?;
            debug!(reranked = ranks.len(), "merging reranked prefix");
            merge(rows, &ranks)
        }
        .instrument(span)
        .await
    }

    /// Rerank a table holding several queries, one query at a time.
    ///
    /// Groups keep the order in which their qid first appears; rows inside a
    /// group keep their relative order.
    pub async fn transform_grouped(&self, rows: Vec<RetrievedRow>) -> Result<Vec<RerankedRow>> {
        if rows.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<RetrievedRow>> = HashMap::new();
        for row in rows {
            if !groups.contains_key(&row.qid) {
                order.push(row.qid.clone());
            }
            groups.entry(row.qid.clone()).or_default().push(row);
        }

        let mut out = Vec::new();
        for qid in order {
            if let Some(group) = groups.remove(&qid) {
                out.extend(self.transform(group).await?);
            }
        }
        Ok(out)
    }

    fn build_request(&self, rows: &[RetrievedRow]) -> Result<Request> {
        let first = rows.first().ok_or(Error::EmptyInput)?;
        let query = Query::new(first.query.clone(), first.qid.clone());

        let mut seen = HashSet::with_capacity(rows.len());
        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            if row.qid != query.qid || row.query != query.text {
                return Err(Error::MixedQueries {
                    expected_qid: query.qid.clone(),
                    expected_query: query.text.clone(),
                    found_qid: row.qid.clone(),
                    found_query: row.query.clone(),
                });
            }
            if !seen.insert(row.docno.as_str()) {
                return Err(Error::DuplicateDocumentId {
                    docno: row.docno.clone(),
                });
            }
            let text = self.text.select(row)?;
            candidates.push(Candidate::new(row.docno.clone(), row.score, text));
        }
        Ok(Request::new(query, candidates))
    }
}

/// New 0-based rank per document id, validated against duplicates.
fn rank_by_docno(result: &RerankResult) -> Result<HashMap<String, usize>> {
    let mut ranks = HashMap::with_capacity(result.len());
    for (rank, docid) in result.docids().enumerate() {
        if ranks.insert(docid.to_string(), rank).is_some() {
            return Err(Error::engine_with_context(
                format!("document '{}' returned more than once", docid),
                ErrorContext::new().with_source("merge"),
            ));
        }
    }
    Ok(ranks)
}

fn merge(rows: Vec<RetrievedRow>, ranks: &HashMap<String, usize>) -> Result<Vec<RerankedRow>> {
    let known: HashSet<&str> = rows.iter().map(|r| r.docno.as_str()).collect();
    if let Some(stray) = ranks.keys().find(|docid| !known.contains(docid.as_str())) {
        return Err(Error::engine_with_context(
            format!("document '{}' is not in the retrieved table", stray),
            ErrorContext::new().with_source("merge"),
        ));
    }

    let mut reranked = Vec::with_capacity(ranks.len());
    let mut rest = Vec::with_capacity(rows.len().saturating_sub(ranks.len()));
    for row in rows {
        let rank = ranks.get(&row.docno).copied();
        let out = RerankedRow::from_retrieved(row, rank);
        if out.is_reranked() {
            reranked.push(out);
        } else {
            rest.push(out);
        }
    }
    reranked.sort_by_key(|r| r.rank);
    reranked.extend(rest);
    Ok(reranked)
}

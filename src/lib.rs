//! # rank-llm-rerank
//!
//! 列表式大模型重排阶段：把检索结果表交给滑动窗口列表式重排引擎，再按新顺序合并回结果表。
//!
//! Listwise LLM reranking stage for retrieval pipelines.
//!
//! ## Overview
//!
//! A first-stage retriever produces a table of rows for one query. This crate
//! takes the leading `top_k_candidates` rows, lets a listwise model (RankGPT,
//! RankVicuna, RankZephyr style) reorder them with overlapping sliding
//! windows, and merges the new order back onto the table with a
//! reciprocal-rank score.
//!
//! ## Key Features
//!
//! - **Pipeline stage**: [`LlmReRanker`] turns retrieved rows into reranked rows
//! - **Sliding windows**: [`engine::Reranker`] drives any [`engine::ListwiseAgent`]
//! - **Chat backends**: [`engine::ChatCompletionsAgent`] talks to OpenAI-compatible servers
//! - **Typed rows**: [`types::RetrievedRow`] / [`types::RerankedRow`] with serde support
//! - **Explicit errors**: empty input, missing text, duplicate ids, engine failures
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rank_llm_rerank::{LlmReRanker, LlmRerankerConfig, RetrievedRow};
//!
//! #[tokio::main]
//! async fn main() -> rank_llm_rerank::Result<()> {
//!     let config = LlmRerankerConfig::builder()
//!         .model("castorini/rank_zephyr_7b_v1_full")
//!         .top_k_candidates(20)
//!         .window_size(10)
//!         .step_size(5)
//!         .build()?;
//!     let stage = LlmReRanker::new(config)?;
//!
//!     let rows = vec![
//!         RetrievedRow::new("q1", "what is borrowing", "d1", 14.2).with_text("..."),
//!         RetrievedRow::new("q1", "what is borrowing", "d2", 13.9).with_text("..."),
//!     ];
//!     for row in stage.transform(rows).await? {
//!         println!("{} {:?} {:?}", row.docno, row.rank, row.score);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | The reranking pipeline stage |
//! | [`engine`] | Sliding-window driver, agents, prompts, permutations |
//! | [`types`] | Queries, candidates, table rows, chat messages |
//! | [`config`] | Stage configuration (YAML + env) |
//! | [`error`] | Error type and structured context |

pub mod adapter;
pub mod config;
pub mod engine;
pub mod types;

pub use adapter::LlmReRanker;
pub use config::{ConfigOverrides, LlmRerankerConfig, LlmRerankerConfigBuilder};
pub use engine::{ListwiseAgent, RerankOptions, Reranker};
pub use types::{Candidate, Query, RerankResult, RerankedRow, Request, RetrievedRow, TextSelector};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

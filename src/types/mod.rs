//! 类型模块：查询、候选文档、结果表行等核心数据类型。
//!
//! # Types Module
//!
//! Strongly typed records for everything that crosses the reranking stage.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Query`] | Query text and id |
//! | [`Candidate`] | One retrieved document with its first-stage score |
//! | [`Request`] | Query plus ordered candidates handed to the engine |
//! | [`RerankResult`] | Reordered prefix returned by the engine |
//! | [`RetrievedRow`] | One row of the retrieved table (input) |
//! | [`RerankedRow`] | One row of the reranked table (output) |
//! | [`Message`] | Chat turn used to prompt listwise agents |
//!
//! ## Example
//!
//! ```rust
//! use rank_llm_rerank::types::{Candidate, Query, Request};
//!
//! let query = Query::new("what is rust", "q1");
//! let request = Request::new(
//!     query,
//!     vec![Candidate::new("d1", 12.5, "Rust is a systems programming language.")],
//! );
//! assert_eq!(request.candidates[0].text(), "Rust is a systems programming language.");
//! ```

pub mod candidate;
pub mod message;
pub mod table;

pub use candidate::{Candidate, Query, Request, RerankResult, TEXT_FIELD};
pub use message::{Message, MessageRole};
pub use table::{read_jsonl_rows, write_jsonl_rows, RerankedRow, RetrievedRow, TextSelector};

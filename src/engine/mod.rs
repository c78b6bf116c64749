//! 列表式重排引擎：滑动窗口调度 + 列表式排序代理。
//!
//! # Listwise Rerank Engine
//!
//! The engine reorders a [`Request`]'s candidates by asking a
//! [`ListwiseAgent`] to rank small windows of them, sliding the window from
//! the back of the list to the front so strong candidates bubble upward.
//!
//! ```text
//!  candidates: [0 ............................ rank_end) ... (not reranked)
//!                                    [ window k   )
//!                           [ window k+1  )
//!                  ...  step  ...
//!  [ last window )
//! ```
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ListwiseAgent`] | Ranks one window; returns a permutation of window indices |
//! | [`Reranker`] | Sliding-window driver over an agent |
//! | [`RerankOptions`] | rank_end, window size, step, shuffle, logging |
//! | [`ChatCompletionsAgent`] | Agent backed by an OpenAI-compatible chat endpoint |
//! | [`IdentityAgent`] | Agent that keeps the incoming order |

pub mod chat;
pub mod permutation;
pub mod prompt;
pub mod reranker;
pub mod window;

pub use chat::{ChatCompletionsAgent, ChatCompletionsAgentBuilder};
pub use permutation::{apply_permutation, parse_permutation, repair_permutation};
pub use prompt::{FewShotExample, PromptBuilder};
pub use reranker::{RerankOptions, Reranker};
pub use window::window_schedule;

use crate::types::{Candidate, Query};
use crate::Result;
use async_trait::async_trait;

/// Where a window sits in the current rerank call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowContext {
    /// First candidate index covered by the window (inclusive).
    pub start: usize,
    /// Last candidate index covered by the window (exclusive).
    pub end: usize,
    /// 0-based number of the pass within the call.
    pub pass: usize,
    /// Emit prompts and responses through `tracing`.
    pub logging: bool,
}

impl WindowContext {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// A model that ranks one window of candidates listwise.
#[async_trait]
pub trait ListwiseAgent: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Model reference the agent was loaded with.
    fn model(&self) -> &str;

    /// Rank `window` by relevance to `query`.
    ///
    /// Returns 0-based indices into `window`, most relevant first. The result
    /// may be partial or contain noise; the driver drops invalid or repeated
    /// indices and appends whatever is missing in the current order.
    async fn permute(
        &self,
        query: &Query,
        window: &[Candidate],
        ctx: &WindowContext,
    ) -> Result<Vec<usize>>;
}

/// Agent that leaves every window in its incoming order.
///
/// Useful for dry runs of a pipeline where no model is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAgent;

#[async_trait]
impl ListwiseAgent for IdentityAgent {
    fn name(&self) -> &str {
        "identity"
    }

    fn model(&self) -> &str {
        "none"
    }

    async fn permute(
        &self,
        _query: &Query,
        window: &[Candidate],
        _ctx: &WindowContext,
    ) -> Result<Vec<usize>> {
        Ok((0..window.len()).collect())
    }
}

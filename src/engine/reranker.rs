//! Sliding-window reranking driver.

use super::permutation::{apply_permutation, repair_permutation};
use super::window::window_schedule;
use super::{ListwiseAgent, WindowContext};
use crate::types::{Request, RerankResult};
use crate::{Error, ErrorContext, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// Options for a single rerank call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerankOptions {
    /// First candidate index that takes part in reranking.
    pub rank_start: usize,
    /// One past the last candidate index that takes part; clamped to the list length.
    pub rank_end: usize,
    pub window_size: usize,
    pub step: usize,
    /// Shuffle `[rank_start, rank_end)` before the first window.
    pub shuffle_candidates: bool,
    /// Seed for the shuffle; `None` draws from the OS.
    pub shuffle_seed: Option<u64>,
    /// Log prompts and responses for every window.
    pub logging: bool,
}

impl Default for RerankOptions {
    fn default() -> Self {
        Self {
            rank_start: 0,
            rank_end: 100,
            window_size: 20,
            step: 10,
            shuffle_candidates: false,
            shuffle_seed: None,
            logging: false,
        }
    }
}

impl RerankOptions {
    pub fn new(rank_end: usize, window_size: usize, step: usize) -> Self {
        Self {
            rank_end,
            window_size,
            step,
            ..Self::default()
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool, seed: Option<u64>) -> Self {
        self.shuffle_candidates = shuffle;
        self.shuffle_seed = seed;
        self
    }

    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::configuration_with_context(
                "window size must be at least 1",
                ErrorContext::new().with_field_path("window_size"),
            ));
        }
        if self.step == 0 {
            return Err(Error::configuration_with_context(
                "step must be at least 1",
                ErrorContext::new().with_field_path("step"),
            ));
        }
        Ok(())
    }
}

/// Reranks requests by sliding a window over the candidate list and letting
/// a [`ListwiseAgent`] order each window.
#[derive(Clone)]
pub struct Reranker {
    agent: Arc<dyn ListwiseAgent>,
}

impl Reranker {
    pub fn new(agent: Arc<dyn ListwiseAgent>) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &dyn ListwiseAgent {
        self.agent.as_ref()
    }

    /// Rerank `request` and return the reordered `[0, rank_end)` prefix.
    ///
    /// Candidates before `rank_start` keep their position; candidates at or
    /// beyond `rank_end` are not part of the result.
    pub async fn rerank(&self, request: Request, options: &RerankOptions) -> Result<RerankResult> {
        options.validate()?;
        let Request {
            query,
            mut candidates,
        } = request;
        let rank_end = options.rank_end.min(candidates.len());
        let rank_start = options.rank_start.min(rank_end);

        let span = info_span!(
            "rerank",
            qid = %query.qid,
            agent = self.agent.name(),
            candidates = candidates.len(),
            rank_end
        );

        async {
            if options.shuffle_candidates {
                let mut rng = match options.shuffle_seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                candidates[rank_start..rank_end].shuffle(&mut rng);
            }

            let schedule = window_schedule(rank_start, rank_end, options.window_size, options.step);
            debug!(windows = schedule.len(), "sliding window schedule ready");

            for (pass, window) in schedule.into_iter().enumerate() {
                let ctx = WindowContext {
                    start: window.start,
                    end: window.end,
                    pass,
                    logging: options.logging,
                };
                let slice = &mut candidates[window.clone()];
                let raw = self
                    .agent
                    .permute(&query, slice, &ctx)
                    .await
                    .map_err(|e| {
                        Error::engine_with_context(
                            format!("agent '{}' failed: {}", self.agent.name(), e),
                            ErrorContext::new()
                                .with_field_path(format!("window[{}..{}]", window.start, window.end))
                                .with_source("sliding_window"),
                        )
                    })?;
                let order = repair_permutation(&raw, slice.len());
                debug!(pass, start = window.start, end = window.end, ?order, "window ranked");
                apply_permutation(slice, &order);
            }

            candidates.truncate(rank_end);
            Ok::<_, Error>(RerankResult { query, candidates })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IdentityAgent;
    use crate::types::{Candidate, Query};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Orders each window by ascending first-stage score and records the windows it saw.
    #[derive(Default)]
    struct AscendingScoreAgent {
        seen: Mutex<Vec<(usize, usize)>>,
    }

    #[async_trait]
    impl ListwiseAgent for AscendingScoreAgent {
        fn name(&self) -> &str {
            "ascending"
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn permute(
            &self,
            _query: &Query,
            window: &[Candidate],
            ctx: &WindowContext,
        ) -> Result<Vec<usize>> {
            self.seen.lock().unwrap().push((ctx.start, ctx.end));
            let mut order: Vec<usize> = (0..window.len()).collect();
            order.sort_by(|&a, &b| window[a].score.total_cmp(&window[b].score));
            Ok(order)
        }
    }

    struct FailingAgent;

    #[async_trait]
    impl ListwiseAgent for FailingAgent {
        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn permute(
            &self,
            _query: &Query,
            _window: &[Candidate],
            _ctx: &WindowContext,
        ) -> Result<Vec<usize>> {
            Err(Error::Remote {
                status: 503,
                message: "overloaded".into(),
            })
        }
    }

    fn request(n: usize) -> Request {
        let candidates = (0..n)
            .map(|i| Candidate::new(format!("d{i}"), (n - i) as f64, format!("text {i}")))
            .collect();
        Request::new(Query::new("query", "q1"), candidates)
    }

    fn ids(result: &RerankResult) -> Vec<&str> {
        result.docids().collect()
    }

    #[tokio::test]
    async fn test_full_sort_with_sliding_windows() {
        let agent = Arc::new(AscendingScoreAgent::default());
        let reranker = Reranker::new(agent.clone());
        let result = reranker
            .rerank(request(10), &RerankOptions::new(10, 4, 2))
            .await
            .unwrap();

        // the lowest scored documents bubble to the front window by window
        assert_eq!(&ids(&result)[..2], &["d9", "d8"]);
        assert_eq!(result.len(), 10);
        assert_eq!(
            agent.seen.lock().unwrap().clone(),
            vec![(6, 10), (4, 8), (2, 6), (0, 4)]
        );
    }

    #[tokio::test]
    async fn test_result_is_truncated_to_rank_end() {
        let reranker = Reranker::new(Arc::new(AscendingScoreAgent::default()));
        let result = reranker
            .rerank(request(5), &RerankOptions::new(3, 3, 10))
            .await
            .unwrap();
        assert_eq!(ids(&result), vec!["d2", "d1", "d0"]);
    }

    #[tokio::test]
    async fn test_rank_end_larger_than_list() {
        let reranker = Reranker::new(Arc::new(IdentityAgent));
        let result = reranker
            .rerank(request(3), &RerankOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&result), vec!["d0", "d1", "d2"]);
    }

    #[tokio::test]
    async fn test_seeded_shuffle_is_reproducible() {
        let reranker = Reranker::new(Arc::new(IdentityAgent));
        let options = RerankOptions::new(20, 20, 10).with_shuffle(true, Some(7));

        let first = reranker.rerank(request(30), &options).await.unwrap();
        let second = reranker.rerank(request(30), &options).await.unwrap();
        assert_eq!(ids(&first), ids(&second));

        let mut sorted: Vec<&str> = ids(&first);
        sorted.sort_unstable();
        let mut expected: Vec<String> = (0..20).map(|i| format!("d{i}")).collect();
        expected.sort_unstable();
        assert_eq!(sorted, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_agent_failure_becomes_engine_error() {
        let reranker = Reranker::new(Arc::new(FailingAgent));
        let err = reranker
            .rerank(request(3), &RerankOptions::new(3, 3, 1))
            .await
            .unwrap_err();
        match err {
            Error::RerankEngine { message, context } => {
                assert!(message.contains("overloaded"));
                assert_eq!(context.field_path.as_deref(), Some("window[0..3]"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_zero_step_is_rejected() {
        let reranker = Reranker::new(Arc::new(IdentityAgent));
        let err = reranker
            .rerank(request(3), &RerankOptions::new(3, 3, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}

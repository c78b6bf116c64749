//! End-to-end behaviour of the reranking stage with scripted agents.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rank_llm_rerank::engine::{IdentityAgent, WindowContext};
use rank_llm_rerank::{
    Candidate, Error, ListwiseAgent, LlmReRanker, LlmRerankerConfig, Query, RetrievedRow,
    TextSelector,
};

/// Reverses every window and records what it was shown.
#[derive(Default)]
struct ReversingAgent {
    windows: Mutex<Vec<(usize, usize, Vec<String>)>>,
}

#[async_trait]
impl ListwiseAgent for ReversingAgent {
    fn name(&self) -> &str {
        "reversing"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn permute(
        &self,
        _query: &Query,
        window: &[Candidate],
        ctx: &WindowContext,
    ) -> rank_llm_rerank::Result<Vec<usize>> {
        self.windows.lock().unwrap().push((
            ctx.start,
            ctx.end,
            window.iter().map(|c| c.docid.clone()).collect(),
        ));
        Ok((0..window.len()).rev().collect())
    }
}

/// Answers with a fixed, possibly malformed, permutation.
struct FixedAgent(Vec<usize>);

#[async_trait]
impl ListwiseAgent for FixedAgent {
    fn name(&self) -> &str {
        "fixed"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn permute(
        &self,
        _query: &Query,
        _window: &[Candidate],
        _ctx: &WindowContext,
    ) -> rank_llm_rerank::Result<Vec<usize>> {
        Ok(self.0.clone())
    }
}

fn abc() -> Vec<RetrievedRow> {
    vec![
        RetrievedRow::new("q1", "rust ownership", "A", 0.9).with_text("alpha"),
        RetrievedRow::new("q1", "rust ownership", "B", 0.8).with_text("beta"),
        RetrievedRow::new("q1", "rust ownership", "C", 0.7).with_text("gamma"),
    ]
}

fn config(top_k: usize, window: usize) -> LlmRerankerConfig {
    LlmRerankerConfig::builder()
        .top_k_candidates(top_k)
        .window_size(window)
        .build()
        .unwrap()
}

#[tokio::test]
async fn reversal_assigns_reciprocal_rank_scores() {
    let stage = LlmReRanker::with_agent(config(3, 3), Arc::new(ReversingAgent::default())).unwrap();
    let out = stage.transform(abc()).await.unwrap();

    let summary: Vec<_> = out
        .iter()
        .map(|r| (r.docno.as_str(), r.rank, r.score_orig))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("C", Some(0), 0.7),
            ("B", Some(1), 0.8),
            ("A", Some(2), 0.9),
        ]
    );
    assert_eq!(out[0].score, Some(1.0));
    assert_eq!(out[1].score, Some(0.5));
    assert!((out[2].score.unwrap() - 1.0 / 3.0).abs() < 1e-12);
}

#[tokio::test]
async fn only_the_top_k_prefix_is_reranked() {
    let agent = Arc::new(ReversingAgent::default());
    let stage = LlmReRanker::with_agent(config(1, 20), agent.clone()).unwrap();
    let out = stage.transform(abc()).await.unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(out[0].docno, "A");
    assert_eq!(out[0].rank, Some(0));
    assert_eq!(out[0].score, Some(1.0));
    for row in &out[1..] {
        assert_eq!(row.rank, None, "{} must not be ranked", row.docno);
        assert_eq!(row.score, None);
    }
    assert_eq!(out[1].docno, "B");
    assert_eq!(out[2].docno, "C");

    let windows = agent.windows.lock().unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0], (0, 1, vec!["A".to_string()]));
}

#[tokio::test]
async fn window_is_clamped_to_candidate_pool() {
    let stage = LlmReRanker::with_agent(config(2, 20), Arc::new(IdentityAgent)).unwrap();
    assert_eq!(stage.rerank_options().window_size, 2);
    assert_eq!(stage.rerank_options().rank_end, 2);
}

#[tokio::test]
async fn row_count_and_rank_invariants_hold() {
    let rows: Vec<RetrievedRow> = (0..37)
        .map(|i| {
            RetrievedRow::new("q9", "sliding windows", format!("d{i:02}"), 100.0 - i as f64)
                .with_text(format!("passage {i}"))
                .with_field("rank", i)
        })
        .collect();
    let stage = LlmReRanker::with_agent(
        LlmRerankerConfig::builder()
            .top_k_candidates(25)
            .window_size(6)
            .step_size(3)
            .build()
            .unwrap(),
        Arc::new(ReversingAgent::default()),
    )
    .unwrap();

    let out = stage.transform(rows).await.unwrap();
    assert_eq!(out.len(), 37);

    let ranked: Vec<_> = out.iter().filter(|r| r.is_reranked()).collect();
    assert_eq!(ranked.len(), 25);
    for (expected, row) in ranked.iter().enumerate() {
        assert_eq!(row.rank, Some(expected));
        assert_eq!(row.score, Some(1.0 / (expected as f64 + 1.0)));
        assert!(row.fields.contains_key("rank_orig"));
    }

    // rows past the prefix keep their retrieved order
    let tail: Vec<_> = out[25..].iter().map(|r| r.docno.as_str()).collect();
    let expected_tail: Vec<String> = (25..37).map(|i| format!("d{i:02}")).collect();
    assert_eq!(tail, expected_tail.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn noisy_permutation_is_repaired() {
    let stage =
        LlmReRanker::with_agent(config(3, 3), Arc::new(FixedAgent(vec![2, 2, 9]))).unwrap();
    let out = stage.transform(abc()).await.unwrap();
    let ids: Vec<_> = out.iter().map(|r| r.docno.as_str()).collect();
    assert_eq!(ids, vec!["C", "A", "B"]);
}

#[tokio::test]
async fn duplicate_document_ids_are_rejected() {
    let mut rows = abc();
    rows.push(RetrievedRow::new("q1", "rust ownership", "B", 0.1).with_text("beta again"));
    let agent = Arc::new(ReversingAgent::default());
    let stage = LlmReRanker::with_agent(config(10, 10), agent.clone()).unwrap();

    let err = stage.transform(rows).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateDocumentId { ref docno } if docno == "B"));
    assert!(agent.windows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_input_is_rejected() {
    let stage = LlmReRanker::with_agent(config(10, 10), Arc::new(IdentityAgent)).unwrap();
    assert!(matches!(
        stage.transform(Vec::new()).await.unwrap_err(),
        Error::EmptyInput
    ));
}

#[tokio::test]
async fn missing_text_field_is_reported() {
    let rows = vec![
        RetrievedRow::new("q1", "rust", "A", 1.0).with_text("alpha"),
        RetrievedRow::new("q1", "rust", "B", 0.5),
    ];
    let stage = LlmReRanker::with_agent(config(10, 10), Arc::new(IdentityAgent)).unwrap();
    match stage.transform(rows).await.unwrap_err() {
        Error::MissingTextField { docno, field } => {
            assert_eq!(docno, "B");
            assert_eq!(field, "text");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn custom_text_selector_feeds_the_agent() {
    struct EchoAgent(Mutex<Vec<String>>);

    #[async_trait]
    impl ListwiseAgent for EchoAgent {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn permute(
            &self,
            _query: &Query,
            window: &[Candidate],
            _ctx: &WindowContext,
        ) -> rank_llm_rerank::Result<Vec<usize>> {
            let mut seen = self.0.lock().unwrap();
            seen.extend(window.iter().map(|c| c.text().to_string()));
            Ok(Vec::new())
        }
    }

    let agent = Arc::new(EchoAgent(Mutex::new(Vec::new())));
    let stage = LlmReRanker::with_agent(config(10, 10), agent.clone())
        .unwrap()
        .with_text_selector(TextSelector::custom("title+body", |row: &RetrievedRow| {
            Some(format!("{}: {}", row.field_str("title")?, row.field_str("body")?))
        }));

    let rows = vec![RetrievedRow::new("q1", "rust", "A", 1.0)
        .with_field("title", "Traits")
        .with_field("body", "Shared behaviour.")];
    stage.transform(rows).await.unwrap();
    assert_eq!(agent.0.lock().unwrap().clone(), vec!["Traits: Shared behaviour."]);
}

//! Reranker configuration
//!
//! Defaults mirror the RankVicuna setup: top 100 candidates, windows of 20
//! sliding by 10. A config can be built in code, loaded from YAML, and then
//! overridden from `RANK_LLM_*` environment variables.

use crate::engine::prompt::{DEFAULT_MAX_PASSAGE_WORDS, DEFAULT_SYSTEM_MESSAGE};
use crate::engine::RerankOptions;
use crate::types::TEXT_FIELD;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "castorini/rank_vicuna_7b_v1";

/// Configuration for [`crate::LlmReRanker`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmRerankerConfig {
    /// Reranking model reference
    pub model: String,
    /// Number of exemplars injected ahead of each window
    pub num_few_shot_examples: usize,
    /// JSON Lines file with few-shot exemplars
    pub few_shot_path: Option<PathBuf>,
    /// How many leading rows are exposed to the reranker
    pub top_k_candidates: usize,
    /// Sliding window size, clamped to `top_k_candidates`
    pub window_size: usize,
    /// Shuffle the candidate prefix before ranking (position-bias experiments)
    pub shuffle_candidates: bool,
    /// Fixed shuffle seed for reproducible runs
    pub shuffle_seed: Option<u64>,
    /// Sliding window stride
    pub step_size: usize,
    /// Log every prompt and model response
    pub print_prompts_responses: bool,
    /// Announce the actual window length rather than `window_size` in prompts
    pub variable_passages: bool,
    pub system_message: String,
    /// Device hint carried to the agent
    pub num_gpus: usize,
    /// Row field supplying the document text
    pub text_key: String,
    /// Chat-completions base URL (falls back to `RANK_LLM_BASE_URL`)
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Passages are cut to this many words in prompts
    pub max_passage_words: usize,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmRerankerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            num_few_shot_examples: 0,
            few_shot_path: None,
            top_k_candidates: 100,
            window_size: 20,
            shuffle_candidates: false,
            shuffle_seed: None,
            step_size: 10,
            print_prompts_responses: false,
            variable_passages: true,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            num_gpus: 1,
            text_key: TEXT_FIELD.to_string(),
            base_url: None,
            api_key: None,
            max_passage_words: DEFAULT_MAX_PASSAGE_WORDS,
            max_tokens: 512,
            timeout_secs: 60,
        }
    }
}

impl LlmRerankerConfig {
    /// Create a builder for LlmRerankerConfig
    pub fn builder() -> LlmRerankerConfigBuilder {
        LlmRerankerConfigBuilder::default()
    }

    /// Parse a YAML document; missing keys take their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML config file; a relative `few_shot_path` resolves against the file's directory
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&raw)?;
        if let (Some(few_shot), Some(dir)) = (config.few_shot_path.as_ref(), path.parent()) {
            if few_shot.is_relative() {
                config.few_shot_path = Some(dir.join(few_shot));
            }
        }
        Ok(config)
    }

    /// Apply `RANK_LLM_MODEL`, `RANK_LLM_BASE_URL` and `RANK_LLM_API_KEY` overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("RANK_LLM_MODEL") {
            self.model = model;
        }
        if let Ok(url) = std::env::var("RANK_LLM_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("RANK_LLM_API_KEY") {
            self.api_key = Some(key);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("top_k_candidates", self.top_k_candidates),
            ("window_size", self.window_size),
            ("step_size", self.step_size),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(Error::configuration_with_context(
                    format!("{} must be at least 1", field),
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_source("config"),
                ));
            }
        }
        if self.model.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "model must not be empty",
                ErrorContext::new().with_field_path("model").with_source("config"),
            ));
        }
        if self.text_key.is_empty() {
            return Err(Error::configuration_with_context(
                "text_key must not be empty",
                ErrorContext::new().with_field_path("text_key").with_source("config"),
            ));
        }
        Ok(())
    }

    /// Window size actually used: never larger than the candidate pool
    pub fn effective_window_size(&self) -> usize {
        self.window_size.min(self.top_k_candidates)
    }

    /// Options passed to the engine for every transform call
    pub fn rerank_options(&self) -> RerankOptions {
        RerankOptions::new(
            self.top_k_candidates,
            self.effective_window_size(),
            self.step_size,
        )
        .with_shuffle(self.shuffle_candidates, self.shuffle_seed)
        .with_logging(self.print_prompts_responses)
    }
}

/// Builder for LlmRerankerConfig
#[derive(Debug, Clone, Default)]
pub struct LlmRerankerConfigBuilder {
    config: LlmRerankerConfig,
}

impl LlmRerankerConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn num_few_shot_examples(mut self, count: usize) -> Self {
        self.config.num_few_shot_examples = count;
        self
    }

    pub fn few_shot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.few_shot_path = Some(path.into());
        self
    }

    pub fn top_k_candidates(mut self, k: usize) -> Self {
        self.config.top_k_candidates = k;
        self
    }

    pub fn window_size(mut self, size: usize) -> Self {
        self.config.window_size = size;
        self
    }

    pub fn step_size(mut self, step: usize) -> Self {
        self.config.step_size = step;
        self
    }

    pub fn shuffle_candidates(mut self, shuffle: bool) -> Self {
        self.config.shuffle_candidates = shuffle;
        self
    }

    pub fn shuffle_seed(mut self, seed: u64) -> Self {
        self.config.shuffle_seed = Some(seed);
        self
    }

    pub fn print_prompts_responses(mut self, print: bool) -> Self {
        self.config.print_prompts_responses = print;
        self
    }

    pub fn variable_passages(mut self, variable: bool) -> Self {
        self.config.variable_passages = variable;
        self
    }

    pub fn system_message(mut self, message: impl Into<String>) -> Self {
        self.config.system_message = message.into();
        self
    }

    pub fn num_gpus(mut self, num_gpus: usize) -> Self {
        self.config.num_gpus = num_gpus;
        self
    }

    pub fn text_key(mut self, key: impl Into<String>) -> Self {
        self.config.text_key = key.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<LlmRerankerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Per-run overrides layered on top of a loaded config (command-line flags).
///
/// `None` and `false` leave the loaded value untouched; the boolean switches
/// can only turn a feature on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub top_k_candidates: Option<usize>,
    pub window_size: Option<usize>,
    pub step_size: Option<usize>,
    pub text_key: Option<String>,
    pub shuffle_candidates: bool,
    pub print_prompts_responses: bool,
}

impl ConfigOverrides {
    /// Apply the overrides and re-validate the result.
    pub fn apply(self, mut config: LlmRerankerConfig) -> Result<LlmRerankerConfig> {
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(k) = self.top_k_candidates {
            config.top_k_candidates = k;
        }
        if let Some(size) = self.window_size {
            config.window_size = size;
        }
        if let Some(step) = self.step_size {
            config.step_size = step;
        }
        if let Some(key) = self.text_key {
            config.text_key = key;
        }
        config.shuffle_candidates |= self.shuffle_candidates;
        config.print_prompts_responses |= self.print_prompts_responses;
        config.validate()?;
        Ok(config)
    }
}

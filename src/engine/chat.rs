//! Listwise agent backed by an OpenAI-compatible chat-completions endpoint
//! (vLLM, TGI, Ollama, hosted APIs).

use super::permutation::parse_permutation;
use super::prompt::{FewShotExample, PromptBuilder};
use super::{ListwiseAgent, WindowContext};
use crate::config::LlmRerankerConfig;
use crate::types::{Candidate, Message, Query};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/v1";

/// Agent that prompts a chat model for a ranking of each window.
pub struct ChatCompletionsAgent {
    http_client: reqwest::Client,
    model: String,
    base_url: String,
    endpoint_path: String,
    api_key: Option<String>,
    prompt: PromptBuilder,
    max_tokens: u32,
    num_gpus: usize,
}

impl ChatCompletionsAgent {
    pub fn builder() -> ChatCompletionsAgentBuilder {
        ChatCompletionsAgentBuilder::new()
    }

    /// Build an agent from the adapter configuration, loading few-shot
    /// exemplars if any are requested.
    pub fn from_config(config: &LlmRerankerConfig) -> Result<Self> {
        let few_shot = if config.num_few_shot_examples == 0 {
            Vec::new()
        } else {
            let path = config.few_shot_path.as_ref().ok_or_else(|| {
                Error::configuration_with_context(
                    "few-shot examples requested but no few_shot_path configured",
                    ErrorContext::new().with_field_path("few_shot_path"),
                )
            })?;
            let mut examples = FewShotExample::load_jsonl(path)?;
            if examples.len() < config.num_few_shot_examples {
                return Err(Error::configuration_with_context(
                    format!(
                        "requested {} few-shot examples but {} has only {}",
                        config.num_few_shot_examples,
                        path.display(),
                        examples.len()
                    ),
                    ErrorContext::new().with_field_path("num_few_shot_examples"),
                ));
            }
            examples.truncate(config.num_few_shot_examples);
            examples
        };

        let prompt = PromptBuilder::new(config.effective_window_size())
            .with_system_message(config.system_message.clone())
            .with_variable_passages(config.variable_passages)
            .with_max_passage_words(config.max_passage_words)
            .with_few_shot(few_shot);

        let mut builder = Self::builder()
            .model(config.model.clone())
            .prompt(prompt)
            .max_tokens(config.max_tokens)
            .timeout_secs(config.timeout_secs)
            .num_gpus(config.num_gpus);
        if let Some(url) = &config.base_url {
            builder = builder.base_url(url.clone());
        }
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key.clone());
        }
        let agent = builder.build()?;
        debug!(
            few_shot = agent.prompt.few_shot_count(),
            num_gpus = agent.num_gpus(),
            window_size = config.effective_window_size(),
            "chat agent configured"
        );
        Ok(agent)
    }

    pub fn num_gpus(&self) -> usize {
        self.num_gpus
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.endpoint_path)
    }

    async fn complete(&self, body: &serde_json::Value) -> Result<String> {
        let mut request = self
            .http_client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| {
            Error::network_with_context(
                format!("Chat completion request failed: {}", e),
                ErrorContext::new().with_source("chat_agent"),
            )
        })?;
        let status = response.status();
        let body_str = response.text().await.map_err(|e| {
            Error::network_with_context(
                format!("Failed to read chat completion response: {}", e),
                ErrorContext::new().with_source("chat_agent"),
            )
        })?;
        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                message: body_str,
            });
        }
        let json: serde_json::Value = serde_json::from_str(&body_str)?;
        json.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| Error::Remote {
                status: status.as_u16(),
                message: "Invalid chat completion response: missing choices[0].message.content"
                    .to_string(),
            })
    }
}

#[async_trait]
impl ListwiseAgent for ChatCompletionsAgent {
    fn name(&self) -> &str {
        "chat_completions"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn permute(
        &self,
        query: &Query,
        window: &[Candidate],
        ctx: &WindowContext,
    ) -> Result<Vec<usize>> {
        let messages = self.prompt.build(query, window);
        debug!(
            pass = ctx.pass,
            turns = messages.len(),
            prompt_words = messages.iter().map(Message::word_count).sum::<usize>(),
            "window prompt built"
        );
        if ctx.logging {
            for message in &messages {
                info!(pass = ctx.pass, role = ?message.role, "prompt:\n{}", message.content);
            }
        }
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.0,
            "max_tokens": self.max_tokens,
        });
        let response = self.complete(&body).await?;
        if ctx.logging {
            info!(pass = ctx.pass, "response: {}", response);
        }
        let permutation = parse_permutation(&response);
        debug!(
            start = ctx.start,
            end = ctx.end,
            parsed = permutation.len(),
            "parsed window permutation"
        );
        Ok(permutation)
    }
}

pub struct ChatCompletionsAgentBuilder {
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    endpoint_path: Option<String>,
    prompt: Option<PromptBuilder>,
    max_tokens: u32,
    timeout_secs: u64,
    num_gpus: usize,
}

impl ChatCompletionsAgentBuilder {
    pub fn new() -> Self {
        Self {
            model: None,
            api_key: None,
            base_url: None,
            endpoint_path: None,
            prompt: None,
            max_tokens: 512,
            timeout_secs: 60,
            num_gpus: 1,
        }
    }
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
    pub fn endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = Some(path.into());
        self
    }
    pub fn prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = Some(prompt);
        self
    }
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
    pub fn num_gpus(mut self, num_gpus: usize) -> Self {
        self.num_gpus = num_gpus;
        self
    }

    pub fn build(self) -> Result<ChatCompletionsAgent> {
        let model = self
            .model
            .ok_or_else(|| Error::configuration("Model must be specified"))?;
        let api_key = self
            .api_key
            .or_else(|| std::env::var("RANK_LLM_API_KEY").ok());
        let base_url = self
            .base_url
            .or_else(|| std::env::var("RANK_LLM_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let endpoint_path = self
            .endpoint_path
            .unwrap_or_else(|| "/chat/completions".to_string());
        let endpoint_path = if endpoint_path.starts_with('/') {
            endpoint_path
        } else {
            format!("/{}", endpoint_path)
        };
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;
        debug!(%model, %base_url, "chat completions agent ready");
        Ok(ChatCompletionsAgent {
            http_client,
            model,
            base_url,
            endpoint_path,
            api_key,
            prompt: self.prompt.unwrap_or_else(|| PromptBuilder::new(20)),
            max_tokens: self.max_tokens,
            num_gpus: self.num_gpus,
        })
    }
}

impl Default for ChatCompletionsAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

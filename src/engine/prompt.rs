//! Listwise ranking prompts in the RankGPT / RankVicuna format.

use crate::types::{Candidate, Message, Query};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are RankLLM, an intelligent assistant that can rank passages based on their relevancy to the query.";

pub const DEFAULT_MAX_PASSAGE_WORDS: usize = 300;

/// A worked ranking example shown to the model before the real window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub query: String,
    pub passages: Vec<String>,
    /// Expected answer, e.g. `[2] > [1] > [3]`.
    pub ranking: String,
}

impl FewShotExample {
    /// Load exemplars from a JSON Lines file, one example per line.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut examples = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let example: FewShotExample = serde_json::from_str(line).map_err(|e| {
                Error::configuration_with_context(
                    format!("Invalid few-shot example: {}", e),
                    ErrorContext::new()
                        .with_field_path(format!("{}:{}", path.display(), lineno + 1))
                        .with_source("few_shot_loader"),
                )
            })?;
            examples.push(example);
        }
        Ok(examples)
    }
}

/// Builds the chat turns for one window.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_message: String,
    few_shot: Vec<FewShotExample>,
    variable_passages: bool,
    window_size: usize,
    max_passage_words: usize,
}

impl PromptBuilder {
    pub fn new(window_size: usize) -> Self {
        Self {
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            few_shot: Vec::new(),
            variable_passages: true,
            window_size,
            max_passage_words: DEFAULT_MAX_PASSAGE_WORDS,
        }
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = message.into();
        self
    }

    pub fn with_few_shot(mut self, examples: Vec<FewShotExample>) -> Self {
        self.few_shot = examples;
        self
    }

    /// When disabled, prompts always announce `window_size` passages, even for
    /// a shorter trailing window.
    pub fn with_variable_passages(mut self, variable: bool) -> Self {
        self.variable_passages = variable;
        self
    }

    pub fn with_max_passage_words(mut self, words: usize) -> Self {
        self.max_passage_words = words;
        self
    }

    pub fn few_shot_count(&self) -> usize {
        self.few_shot.len()
    }

    pub fn build(&self, query: &Query, window: &[Candidate]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2 + 2 * self.few_shot.len());
        if !self.system_message.is_empty() {
            messages.push(Message::system(self.system_message.clone()));
        }
        for example in &self.few_shot {
            let passages: Vec<&str> = example.passages.iter().map(String::as_str).collect();
            messages.push(Message::user(self.user_turn(&example.query, &passages)));
            messages.push(Message::assistant(example.ranking.clone()));
        }
        let passages: Vec<&str> = window.iter().map(Candidate::text).collect();
        messages.push(Message::user(self.user_turn(&query.text, &passages)));
        messages
    }

    fn announced_count(&self, actual: usize) -> usize {
        if self.variable_passages {
            actual
        } else {
            self.window_size.max(actual)
        }
    }

    fn user_turn(&self, query: &str, passages: &[&str]) -> String {
        let num = self.announced_count(passages.len());
        let mut prompt = format!(
            "I will provide you with {num} passages, each indicated by a numerical identifier []. \
             Rank the passages based on their relevance to the search query: {query}.\n\n"
        );
        for (i, passage) in passages.iter().enumerate() {
            prompt.push_str(&format!(
                "[{}] {}\n",
                i + 1,
                clean_passage(passage, self.max_passage_words)
            ));
        }
        prompt.push_str(&format!(
            "\nSearch Query: {query}.\n\
             Rank the {num} passages above based on their relevance to the search query. \
             All the passages should be included and listed using identifiers, in descending order of relevance. \
             The output format should be [] > [], e.g., [4] > [2]. \
             Only respond with the ranking results, do not say any word or explain."
        ));
        prompt
    }
}

/// Strip title/content markers and cap the passage at `max_words` words.
fn clean_passage(text: &str, max_words: usize) -> String {
    let text = text.replace("Title: Content: ", "");
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

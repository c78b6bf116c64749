use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "config.window_size", "rows[3].text")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected value, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "sliding_window", "chat_agent")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the reranking stage.
///
/// Input-shape problems (`EmptyInput`, `InvalidRow`, `MissingTextField`,
/// `DuplicateDocumentId`, `MixedQueries`) are detected before the engine is called. Everything that goes
/// wrong inside the engine or the agent surfaces as `RerankEngine`, `Network` or `Remote`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Empty input: the retrieved table has no rows")]
    EmptyInput,

    #[error("Missing text field '{field}' for document '{docno}'")]
    MissingTextField { docno: String, field: String },

    #[error("Duplicate document id '{docno}' in retrieved table")]
    DuplicateDocumentId { docno: String },

    #[error(
        "Mixed queries in one table: expected qid '{expected_qid}' query '{expected_query}', \
         found qid '{found_qid}' query '{found_query}'"
    )]
    MixedQueries {
        expected_qid: String,
        expected_query: String,
        found_qid: String,
        found_query: String,
    },

    #[error("Invalid row at line {line}: {source}")]
    InvalidRow {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Rerank engine failure: {message}{}", format_context(.context))]
    RerankEngine {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {message}{}", format_context(.context))]
    Network {
        message: String,
        context: ErrorContext,
    },

    #[error("Remote error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a configuration error without context
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create an engine failure with structured context
    pub fn engine_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::RerankEngine {
            message: msg.into(),
            context,
        }
    }

    /// Create a network error with structured context
    pub fn network_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Network {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::RerankEngine { context, .. }
            | Error::Configuration { context, .. }
            | Error::Network { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether the error was raised while validating the input table,
    /// i.e. before any call into the engine.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::EmptyInput
                | Error::MissingTextField { .. }
                | Error::DuplicateDocumentId { .. }
                | Error::MixedQueries { .. }
                | Error::InvalidRow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_rendered() {
        let err = Error::engine_with_context(
            "agent returned no permutation",
            ErrorContext::new()
                .with_field_path("window[0..20]")
                .with_source("sliding_window"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("Rerank engine failure: agent returned no permutation"));
        assert!(msg.contains("field: window[0..20]"));
        assert!(msg.contains("source: sliding_window"));
        assert_eq!(
            err.context().and_then(|c| c.source.as_deref()),
            Some("sliding_window")
        );
    }

    #[test]
    fn test_input_errors_are_classified() {
        assert!(Error::EmptyInput.is_input_error());
        assert!(Error::DuplicateDocumentId {
            docno: "d1".into()
        }
        .is_input_error());
        assert!(Error::MixedQueries {
            expected_qid: "q1".into(),
            expected_query: "rust".into(),
            found_qid: "q1".into(),
            found_query: "rust async".into(),
        }
        .is_input_error());
        assert!(!Error::configuration("bad").is_input_error());
        assert!(!Error::Remote {
            status: 500,
            message: "boom".into()
        }
        .is_input_error());
    }
}

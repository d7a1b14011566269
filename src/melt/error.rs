use thiserror::Error;

/// Fatal pipeline errors. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("xml error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("input ended inside an open element (depth {depth})")]
    Truncated { depth: usize },

    #[error("document has no root element")]
    NoRoot,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single rule failing on a single record. Caught by the driver; never fatal.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("rule {rule} failed: {reason}")]
    Rule { rule: String, reason: String },

    #[error("rule {rule} panicked: {message}")]
    Panicked { rule: String, message: String },
}

impl ExtractError {
    pub fn rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtractError::Rule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

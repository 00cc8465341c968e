//! Error taxonomy for the recommendation pipeline.
//!
//! Every stage returns [`AdvisorError`]. Each variant carries a stable
//! machine-readable [`code`](AdvisorError::code) that the HTTP error contract
//! and CLI reporting use, so callers can tell "no match"
//! ([`AdvisorError::EmptyCandidates`]) apart from "pipeline failed".
//!
//! Variants that originate in model output (`Parse`, `Extraction`,
//! `FinalizeParse`) keep the raw upstream text for diagnosis.

use thiserror::Error;

/// Result alias used across the library.
pub type AdvisorResult<T> = std::result::Result<T, AdvisorError>;

#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Missing credential, unreadable catalog file, or invalid config.
    #[error("configuration error: {0}")]
    Config(String),

    /// The generation or embedding service answered with a non-success status.
    #[error("{service} service returned {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Connection failure or per-call timeout, after the retry budget.
    #[error("{service} service unreachable: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// The recovery parser found no valid JSON in the text.
    #[error("no valid JSON found in model output")]
    Parse { raw: String },

    /// Valid JSON with the wrong shape, or a grounding violation.
    #[error("schema violation: {0}")]
    Schema(String),

    /// Preference extraction did not yield a usable profile.
    #[error("preference extraction failed: {reason}")]
    Extraction { raw: String, reason: String },

    /// The finalizer response could not be parsed as JSON.
    #[error("finalizer returned unparseable output")]
    FinalizeParse { raw: String },

    /// No retrieved trim satisfies every must-have.
    #[error("no catalog trim satisfies the required features: {}", must_have.join(", "))]
    EmptyCandidates { must_have: Vec<String> },

    /// Strict ontology mode rejected a phrase with no canonical key.
    #[error("unknown feature phrase: '{0}'")]
    UnknownFeature(String),

    #[error("request deadline of {0}s exceeded")]
    DeadlineExceeded(u64),

    #[error("request cancelled")]
    Cancelled,
}

impl AdvisorError {
    /// Stable identifier for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AdvisorError::Config(_) => "config_error",
            AdvisorError::Upstream { .. } => "upstream_error",
            AdvisorError::Transport { .. } => "transport_error",
            AdvisorError::Parse { .. } => "parse_error",
            AdvisorError::Schema(_) => "schema_error",
            AdvisorError::Extraction { .. } => "extraction_error",
            AdvisorError::FinalizeParse { .. } => "finalize_parse_error",
            AdvisorError::EmptyCandidates { .. } => "empty_candidates",
            AdvisorError::UnknownFeature(_) => "unknown_feature",
            AdvisorError::DeadlineExceeded(_) => "deadline_exceeded",
            AdvisorError::Cancelled => "cancelled",
        }
    }

    /// Raw model output attached to this error, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            AdvisorError::Parse { raw }
            | AdvisorError::Extraction { raw, .. }
            | AdvisorError::FinalizeParse { raw } => Some(raw),
            _ => None,
        }
    }

    /// Whether the transport should retry the call that produced this error:
    /// rate limiting, server errors, and connection failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            AdvisorError::Upstream { status, .. } => *status == 429 || *status >= 500,
            AdvisorError::Transport { .. } => true,
            _ => false,
        }
    }
}

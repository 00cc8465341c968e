//! JSON recovery from generative-model prose.
//!
//! Models frequently wrap JSON in Markdown fences or surround it with
//! explanatory text. [`recover_json`] applies a fixed extraction procedure:
//!
//! 1. Strip a leading/trailing fence marker (```` ``` ```` with an optional
//!    `json` tag) found at a line start or line end.
//! 2. Trim whitespace.
//! 3. If the text starts with `{` or `[`, parse it directly.
//! 4. Otherwise parse the span from the first `{`/`[` to the last `}`/`]`.
//! 5. Anything else is a [`AdvisorError::Parse`] carrying the raw input.
//!
//! Malformed JSON is never repaired.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::{AdvisorError, AdvisorResult};

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^```(?:json)?\s*|\s*```$").expect("fence pattern"));

static EMBEDDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\{.*\}|\[.*\])").expect("embedded JSON pattern"));

/// Extract and parse the JSON value contained in `raw`.
pub fn recover_json(raw: &str) -> AdvisorResult<Value> {
    let unfenced = FENCE.replace_all(raw.trim(), "");
    let text = unfenced.trim();

    let candidate = if text.starts_with('{') || text.starts_with('[') {
        text
    } else {
        match EMBEDDED.find(text) {
            Some(m) => m.as_str(),
            None => return Err(parse_error(raw)),
        }
    };

    serde_json::from_str(candidate).map_err(|_| parse_error(raw))
}

fn parse_error(raw: &str) -> AdvisorError {
    AdvisorError::Parse {
        raw: raw.to_string(),
    }
}

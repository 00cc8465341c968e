//! Preference extraction: five free-text answers to a [`UserProfile`].
//!
//! One generation call per request. The response goes through the JSON
//! recovery parser and is then deserialized into a profile. Any failure in
//! either step is an [`AdvisorError::Extraction`] carrying the raw model
//! output. There is no retry here; callers may retry the whole extraction.

use tracing::debug;

use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use crate::models::{ShopperAnswers, UserProfile};
use crate::recovery::recover_json;

const EXTRACT_SYSTEM: &str = "You extract car-shopping preferences as strict JSON. \
Map obvious synonyms to canonical feature keys (e.g., 'seat warmers' -> 'heated_front_seats'). \
If unsure, omit. Output ONLY valid JSON.";

const EXTRACT_SCHEMA: &str = r#"{
  "purpose": [],
  "location_tags": [],
  "style_vibe": [],
  "must_have": [],
  "nice_to_have": [],
  "powertrain_pref": "hybrid|gas|phev|ev|no-strong-preference",
  "budget_total_usd": { "target": 0, "flex_pct": 10 },
  "notes": ""
}"#;

/// Build the extraction request for `answers`.
pub fn build_request(answers: &ShopperAnswers, model: &str, temperature: f32) -> ChatRequest {
    let user = format!(
        "User answers (free text):\n\
         Purpose: {}\n\
         Location: {}\n\
         Appearance: {}\n\
         Features: {}\n\
         Budget: {}\n\n\
         Return JSON with exactly these keys:\n{}\n",
        answers.purpose.trim(),
        answers.location.trim(),
        answers.appearance.trim(),
        answers.features.trim(),
        answers.budget.trim(),
        EXTRACT_SCHEMA
    );

    ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(EXTRACT_SYSTEM), ChatMessage::user(user)],
        temperature,
    }
}

/// Interpret raw model output as a profile.
pub fn parse_profile(raw: &str) -> AdvisorResult<UserProfile> {
    let value = recover_json(raw).map_err(|_| AdvisorError::Extraction {
        raw: raw.to_string(),
        reason: "no valid JSON in model output".to_string(),
    })?;

    if !value.is_object() {
        return Err(AdvisorError::Extraction {
            raw: raw.to_string(),
            reason: "expected a JSON object".to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| AdvisorError::Extraction {
        raw: raw.to_string(),
        reason: format!("profile has the wrong shape: {}", e),
    })
}

/// Run the extraction call. Exactly one request to `chat`.
pub async fn extract_profile(
    chat: &dyn ChatModel,
    answers: &ShopperAnswers,
    model: &str,
    temperature: f32,
) -> AdvisorResult<UserProfile> {
    let request = build_request(answers, model, temperature);
    let raw = chat.complete(&request).await?;
    debug!(chars = raw.len(), "extraction response received");
    parse_profile(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Powertrain;

    fn answers() -> ShopperAnswers {
        ShopperAnswers {
            purpose: "family and weekend road trips".into(),
            location: "Dallas suburbs, mostly highway, sometimes heavy rain".into(),
            appearance: "sleek and modern".into(),
            features: "heated seats, blind spot".into(),
            budget: "around 40k".into(),
        }
    }

    #[test]
    fn test_request_contains_answers_and_schema() {
        let req = build_request(&answers(), "openai/gpt-4o-mini", 0.1);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        let user = &req.messages[1].content;
        assert!(user.contains("Location: Dallas suburbs"));
        assert!(user.contains("Budget: around 40k"));
        assert!(user.contains("\"budget_total_usd\""));
        assert!((req.temperature - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_parse_fenced_profile() {
        let raw = "```json\n{\"purpose\":[\"family\"],\"must_have\":[\"heated seats\"],\
                   \"powertrain_pref\":\"hybrid\",\"budget_total_usd\":{\"target\":40000,\"flex_pct\":10}}\n```";
        let p = parse_profile(raw).unwrap();
        assert_eq!(p.purpose, vec!["family"]);
        assert_eq!(p.must_have, vec!["heated seats"]);
        assert_eq!(p.powertrain_pref, Powertrain::Hybrid);
        assert_eq!(p.budget.target, 40000.0);
    }

    #[test]
    fn test_prose_only_is_extraction_error() {
        let err = parse_profile("I would suggest a RAV4.").unwrap_err();
        match err {
            AdvisorError::Extraction { raw, .. } => assert_eq!(raw, "I would suggest a RAV4."),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_array_is_extraction_error() {
        let err = parse_profile("[1, 2, 3]").unwrap_err();
        assert_eq!(err.code(), "extraction_error");
    }

    #[test]
    fn test_wrong_field_type_is_extraction_error() {
        let err = parse_profile("{\"must_have\": 7}").unwrap_err();
        assert_eq!(err.code(), "extraction_error");
    }
}

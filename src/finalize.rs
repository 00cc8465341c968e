//! Grounded finalization: the model ranks the verified candidates only.
//!
//! The finalizer sends the normalized profile and the candidate trims (with
//! their true features and packages) in one generation call. The response
//! must be JSON; otherwise the request fails with
//! [`AdvisorError::FinalizeParse`] and no local fallback ranking is made.
//!
//! # Validation
//!
//! A parsed response is accepted only if:
//!
//! - it has the `{top_5, others}` shape with at most five top picks,
//! - every `fit_score` is within `[0, 100]`,
//! - no id appears twice,
//! - every id belongs to the candidate set (the grounding invariant).
//!
//! Any violation is an [`AdvisorError::Schema`]. Accepted picks have their
//! model, year and trim label taken from the catalog, and customizations
//! that name nothing offered on that trim are dropped.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::{AdvisorError, AdvisorResult};
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use crate::models::{Candidate, RecommendationResult, UserProfile, VehicleTrim};
use crate::recovery::recover_json;

/// Maximum number of top picks in a result.
pub const TOP_PICKS: usize = 5;

const FINALIZE_SYSTEM: &str = "You are a grounded vehicle recommender. You receive a user profile and \
candidate trims with their true features and packages. Recommend ONLY from the candidates, \
referencing them by their exact id. If a must-have is missing from a trim's base features but \
available via a package listed on that trim, include that package in recommended_customizations. \
Never recommend a package that is not listed on that trim or not needed for a stated must-have. \
Do not invent trims, features, or packages. Return valid JSON only.";

const FINALIZE_SCHEMA: &str = r#"{
  "top_5": [
    {
      "id": "trim-id",
      "model": "RAV4",
      "year": 2025,
      "trim": "Hybrid XLE",
      "fit_score": 0,
      "reasons": ["...", "..."],
      "recommended_customizations": ["Weather Package"]
    }
  ],
  "others": [{ "id": "...", "fit_score": 80 }]
}"#;

/// Build the finalize request over `candidates`.
pub fn build_request(
    profile: &UserProfile,
    candidates: &[Candidate],
    model: &str,
    temperature: f32,
) -> AdvisorResult<ChatRequest> {
    let profile_json = serde_json::to_string(profile)
        .map_err(|e| AdvisorError::Schema(format!("failed to encode profile: {}", e)))?;
    let candidates_json = serde_json::to_string(candidates)
        .map_err(|e| AdvisorError::Schema(format!("failed to encode candidates: {}", e)))?;

    let user = format!(
        "User profile:\n{}\n\nCandidates:\n{}\n\nReturn JSON:\n{}\n",
        profile_json, candidates_json, FINALIZE_SCHEMA
    );

    Ok(ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(FINALIZE_SYSTEM), ChatMessage::user(user)],
        temperature,
    })
}

/// Parse and validate raw finalizer output against `candidates`.
pub fn parse_result(raw: &str, candidates: &[Candidate]) -> AdvisorResult<RecommendationResult> {
    let value = recover_json(raw).map_err(|_| AdvisorError::FinalizeParse {
        raw: raw.to_string(),
    })?;

    let mut result: RecommendationResult = serde_json::from_value(value)
        .map_err(|e| AdvisorError::Schema(format!("finalizer output has the wrong shape: {}", e)))?;

    if result.top_5.len() > TOP_PICKS {
        return Err(AdvisorError::Schema(format!(
            "top_5 has {} entries, at most {} allowed",
            result.top_5.len(),
            TOP_PICKS
        )));
    }

    let scores = result
        .top_5
        .iter()
        .map(|p| (&p.id, p.fit_score))
        .chain(result.others.iter().map(|o| (&o.id, o.fit_score)));
    for (id, score) in scores {
        if !(0.0..=100.0).contains(&score) {
            return Err(AdvisorError::Schema(format!(
                "fit_score {} for {} is outside [0, 100]",
                score, id
            )));
        }
    }

    let by_id: HashMap<&str, &VehicleTrim> = candidates
        .iter()
        .map(|c| (c.trim.id.as_str(), c.trim.as_ref()))
        .collect();

    let mut seen = HashSet::new();
    for id in result.ids() {
        if !by_id.contains_key(id) {
            return Err(AdvisorError::Schema(format!(
                "recommended id '{}' is not among the candidates",
                id
            )));
        }
        if !seen.insert(id) {
            return Err(AdvisorError::Schema(format!(
                "id '{}' appears more than once",
                id
            )));
        }
    }

    for pick in &mut result.top_5 {
        let trim = by_id[pick.id.as_str()];
        pick.model = trim.model.clone();
        pick.year = trim.year;
        pick.trim = trim.trim.clone();

        let before = pick.recommended_customizations.len();
        pick.recommended_customizations
            .retain(|c| offers_customization(trim, c));
        let pruned = before - pick.recommended_customizations.len();
        if pruned > 0 {
            warn!(trim = %trim.id, pruned, "dropped customizations not offered on trim");
        }
    }

    Ok(result)
}

/// Whether `item` names a package, color, or feature available on `trim`.
fn offers_customization(trim: &VehicleTrim, item: &str) -> bool {
    let wanted = item.trim().to_lowercase();
    if wanted.is_empty() {
        return false;
    }
    let matches = |s: &str| s.trim().to_lowercase() == wanted;

    trim.packages.iter().any(|p| matches(&p.name))
        || trim.colors.iter().any(|c| matches(c))
        || trim.features.iter().any(|f| matches(f))
        || trim
            .packages
            .iter()
            .any(|p| p.adds.iter().any(|f| matches(f)))
}

/// Run the finalize call and validate its output. One request to `chat`.
pub async fn finalize(
    chat: &dyn ChatModel,
    profile: &UserProfile,
    candidates: &[Candidate],
    model: &str,
    temperature: f32,
) -> AdvisorResult<RecommendationResult> {
    let request = build_request(profile, candidates, model, temperature)?;
    let raw = chat.complete(&request).await?;
    debug!(chars = raw.len(), "finalize response received");
    parse_result(&raw, candidates)
}

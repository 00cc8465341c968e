//! Embedding retrieval over the catalog index.
//!
//! # Algorithm
//!
//! 1. Render the profile as a labelled description ([`profile_to_text`]).
//! 2. Embed the description with one call to the [`Embedder`].
//! 3. Score every index row by cosine similarity.
//! 4. Stable-sort by similarity (desc), so ties keep index order.
//! 5. Truncate to `top_k`.

use serde::Serialize;
use tracing::debug;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{AdvisorError, AdvisorResult};
use crate::models::UserProfile;

/// Immutable trim-id → vector matrix.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    ids: Vec<String>,
    rows: Vec<Vec<f32>>,
    dims: usize,
}

/// A retrieved trim id with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTrim {
    pub id: String,
    pub similarity: f32,
}

impl CatalogIndex {
    /// Build an index; every row must have exactly `dims` columns.
    pub fn new(ids: Vec<String>, rows: Vec<Vec<f32>>, dims: usize) -> AdvisorResult<Self> {
        if ids.len() != rows.len() {
            return Err(AdvisorError::Config(format!(
                "index has {} ids but {} vectors",
                ids.len(),
                rows.len()
            )));
        }
        if let Some((id, row)) = ids.iter().zip(&rows).find(|(_, r)| r.len() != dims) {
            return Err(AdvisorError::Config(format!(
                "embedding for {} has {} dimensions, expected {}",
                id,
                row.len(),
                dims
            )));
        }
        Ok(Self { ids, rows, dims })
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Rank all rows against `query` and keep the best `top_k`.
    pub fn rank(&self, query: &[f32], top_k: usize) -> AdvisorResult<Vec<ScoredTrim>> {
        if query.len() != self.dims {
            return Err(AdvisorError::Schema(format!(
                "profile embedding has {} dimensions, index has {}",
                query.len(),
                self.dims
            )));
        }

        let mut scored: Vec<ScoredTrim> = self
            .ids
            .iter()
            .zip(&self.rows)
            .map(|(id, row)| ScoredTrim {
                id: id.clone(),
                similarity: cosine_similarity(query, row),
            })
            .collect();

        // sort_by is stable: equal scores keep index order
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}

/// Render the profile as the text that gets embedded.
///
/// Non-empty fields appear in fixed order as `Label: a, b`, joined by `". "`.
/// The powertrain preference always has a value, so it is always last.
pub fn profile_to_text(profile: &UserProfile) -> String {
    let mut parts = Vec::new();
    let mut push = |label: &str, values: &[String]| {
        let values: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            parts.push(format!("{}: {}", label, values.join(", ")));
        }
    };

    push("Purpose", &profile.purpose);
    push("Location", &profile.location_tags);
    push("Style", &profile.style_vibe);
    push("Must-haves", &profile.must_have);
    push("Nice-to-have", &profile.nice_to_have);

    parts.push(format!("Powertrain: {}", profile.powertrain_pref.as_str()));

    parts.join(". ")
}

/// Embed the profile and rank the catalog. One embedding call.
pub async fn retrieve(
    embedder: &dyn Embedder,
    index: &CatalogIndex,
    profile: &UserProfile,
    top_k: usize,
) -> AdvisorResult<Vec<ScoredTrim>> {
    let text = profile_to_text(profile);
    debug!(chars = text.len(), "embedding profile description");
    let query = embedder.embed(&text).await?;
    index.rank(&query, top_k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Powertrain;

    fn index(rows: Vec<Vec<f32>>) -> CatalogIndex {
        let ids = (1..=rows.len()).map(|i| format!("row-{}", i)).collect();
        let dims = rows[0].len();
        CatalogIndex::new(ids, rows, dims).unwrap()
    }

    #[test]
    fn test_self_similarity_is_one() {
        let idx = index(vec![vec![0.3, 0.4], vec![1.0, 0.0]]);
        let ranked = idx.rank(&[0.3, 0.4], 10).unwrap();
        assert_eq!(ranked[0].id, "row-1");
        assert!((ranked[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let idx = index(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.2, 0.9, 0.1],
            vec![0.0, 0.0, 1.0],
        ]);
        let ranked = idx.rank(&[0.2, 0.9, 0.1], 10).unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].id, "row-2");
        assert!((ranked[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_insertion_order_and_truncate() {
        let idx = index(vec![vec![1.0, 0.0]; 12]);
        let ranked = idx.rank(&[2.0, 0.0], 10).unwrap();
        assert_eq!(ranked.len(), 10);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids[0], "row-1");
        assert_eq!(ids[9], "row-10");
    }

    #[test]
    fn test_zero_profile_vector_scores_zero() {
        let idx = index(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let ranked = idx.rank(&[0.0, 0.0], 10).unwrap();
        assert!(ranked.iter().all(|r| r.similarity == 0.0));
        assert_eq!(ranked[0].id, "row-1");
    }

    #[test]
    fn test_dimension_mismatch_is_schema_error() {
        let idx = index(vec![vec![1.0, 0.0]]);
        let err = idx.rank(&[1.0, 0.0, 0.0], 10).unwrap_err();
        assert_eq!(err.code(), "schema_error");
    }

    #[test]
    fn test_profile_to_text_order_and_omissions() {
        let profile = UserProfile {
            purpose: vec!["family".into(), "road trips".into()],
            location_tags: vec![],
            style_vibe: vec!["sleek".into()],
            must_have: vec!["heated_front_seats".into()],
            nice_to_have: vec![],
            powertrain_pref: Powertrain::Hybrid,
            ..Default::default()
        };
        assert_eq!(
            profile_to_text(&profile),
            "Purpose: family, road trips. Style: sleek. Must-haves: heated_front_seats. Powertrain: hybrid"
        );
    }

    #[test]
    fn test_profile_to_text_empty_profile() {
        assert_eq!(
            profile_to_text(&UserProfile::default()),
            "Powertrain: no-strong-preference"
        );
    }
}

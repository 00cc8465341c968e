//! Hard constraint filter and package advisor.
//!
//! Runs after retrieval over the top-K shortlist only, never the whole
//! catalog. A trim survives when every must-have key is either base
//! equipment or added by at least one of its packages. Survivors keep their
//! retrieval order and carry the packages that would close the gap.

use std::collections::BTreeSet;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{AdvisorError, AdvisorResult};
use crate::models::{Candidate, VehicleTrim};
use crate::retrieve::ScoredTrim;

/// Whether `trim` can provide every key in `must_have`.
pub fn satisfies(trim: &VehicleTrim, must_have: &[String]) -> bool {
    must_have.iter().all(|key| {
        trim.features.contains(key) || trim.packages.iter().any(|p| p.adds.contains(key))
    })
}

/// Packages needed for must-haves missing from base equipment, sorted.
pub fn suggest_packages(trim: &VehicleTrim, must_have: &[String]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for key in must_have {
        if trim.features.contains(key) {
            continue;
        }
        for package in &trim.packages {
            if package.adds.contains(key) {
                names.insert(package.name.clone());
            }
        }
    }
    names.into_iter().collect()
}

/// Turn retrieval hits into candidates, dropping trims that cannot satisfy
/// `must_have`.
///
/// Returns [`AdvisorError::EmptyCandidates`] when nothing survives.
pub fn build_candidates(
    catalog: &Catalog,
    retrieved: &[ScoredTrim],
    must_have: &[String],
) -> AdvisorResult<Vec<Candidate>> {
    let mut candidates = Vec::with_capacity(retrieved.len());

    for hit in retrieved {
        let Some(trim) = catalog.get(&hit.id) else {
            continue;
        };
        if !satisfies(trim, must_have) {
            debug!(trim = %trim.id, "dropped: must-haves not satisfiable");
            continue;
        }
        candidates.push(Candidate {
            trim: trim.clone(),
            similarity: hit.similarity,
            suggested_packages: suggest_packages(trim, must_have),
        });
    }

    if candidates.is_empty() {
        return Err(AdvisorError::EmptyCandidates {
            must_have: must_have.to_vec(),
        });
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Package;
    use crate::ontology::Ontology;
    use std::collections::HashMap;

    fn keys(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn trim(id: &str, features: &[&str], packages: Vec<Package>) -> VehicleTrim {
        VehicleTrim {
            id: id.to_string(),
            model: "RAV4".to_string(),
            year: 2025,
            trim: "LE".to_string(),
            features: keys(features),
            packages,
            colors: vec![],
            style_vibe: vec![],
            detail_url: String::new(),
        }
    }

    fn package(name: &str, adds: &[&str]) -> Package {
        Package {
            name: name.to_string(),
            adds: keys(adds),
        }
    }

    fn musts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn catalog(trims: Vec<VehicleTrim>) -> Catalog {
        let vectors: HashMap<String, Vec<f32>> =
            trims.iter().map(|t| (t.id.clone(), vec![1.0, 0.0])).collect();
        Catalog::from_parts(trims, Ontology::default(), vectors, 2).unwrap()
    }

    fn hits(ids: &[&str]) -> Vec<ScoredTrim> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| ScoredTrim {
                id: id.to_string(),
                similarity: 1.0 - i as f32 * 0.1,
            })
            .collect()
    }

    #[test]
    fn test_package_satisfies_missing_feature() {
        let t = trim("t1", &[], vec![package("Cold Weather", &["heated_front_seats"])]);
        let must = musts(&["heated_front_seats"]);
        assert!(satisfies(&t, &must));
        assert_eq!(suggest_packages(&t, &must), vec!["Cold Weather"]);
    }

    #[test]
    fn test_mixed_case_catalog_key_matches_after_normalizing() {
        let table: HashMap<String, String> =
            [("heated seats".to_string(), "Heated_Front_Seats".to_string())]
                .into_iter()
                .collect();
        let ont = Ontology::new(table, crate::ontology::FallbackPolicy::Permissive);
        let must = ont.normalize(&["Heated Seats"]).unwrap();

        let t = trim("t1", &["Heated_Front_Seats"], vec![]);
        assert!(satisfies(&t, &must));
    }

    #[test]
    fn test_base_feature_needs_no_package() {
        let t = trim(
            "t1",
            &["heated_front_seats"],
            vec![package("Cold Weather", &["heated_front_seats"])],
        );
        let must = musts(&["heated_front_seats"]);
        assert!(satisfies(&t, &must));
        assert!(suggest_packages(&t, &must).is_empty());
    }

    #[test]
    fn test_suggestions_deduplicated_and_sorted() {
        let t = trim(
            "t1",
            &[],
            vec![
                package("Weather", &["heated_front_seats", "heated_steering_wheel"]),
                package("Premium", &["heated_front_seats", "panoramic_roof"]),
            ],
        );
        let must = musts(&["heated_front_seats", "heated_steering_wheel", "panoramic_roof"]);
        assert_eq!(suggest_packages(&t, &must), vec!["Premium", "Weather"]);
    }

    #[test]
    fn test_one_missing_key_rejects() {
        let t = trim("t1", &["blind_spot_monitor"], vec![]);
        assert!(!satisfies(&t, &musts(&["blind_spot_monitor", "panoramic_roof"])));
        assert!(satisfies(&t, &[]));
    }

    #[test]
    fn test_build_keeps_retrieval_order() {
        let cat = catalog(vec![
            trim("a", &["panoramic_roof"], vec![]),
            trim("b", &[], vec![]),
            trim("c", &[], vec![package("Premium", &["panoramic_roof"])]),
        ]);
        let out = build_candidates(&cat, &hits(&["c", "b", "a"]), &musts(&["panoramic_roof"]))
            .unwrap();
        let ids: Vec<&str> = out.iter().map(|c| c.trim.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(out[0].suggested_packages, vec!["Premium"]);
        assert!(out.iter().all(|c| satisfies(&c.trim, &musts(&["panoramic_roof"]))));
    }

    #[test]
    fn test_nothing_survives_is_empty_candidates() {
        let cat = catalog(vec![trim("a", &[], vec![package("Tech", &["wireless_carplay"])])]);
        let err = build_candidates(&cat, &hits(&["a"]), &musts(&["panoramic_roof"])).unwrap_err();
        assert!(matches!(err, AdvisorError::EmptyCandidates { .. }));
    }
}

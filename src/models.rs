//! Core data models used throughout the advisor.
//!
//! These types represent the shopper profile, catalog trims, retrieval
//! candidates, and the final recommendation that flow through the pipeline.
//! Field names match the JSON shapes exchanged with the generation service
//! and the catalog files.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The five free-text quiz answers a shopper submits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopperAnswers {
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub appearance: String,
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub budget: String,
}

/// Powertrain preference extracted from the shopper's answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Powertrain {
    #[serde(rename = "hybrid")]
    Hybrid,
    #[serde(rename = "gas")]
    Gas,
    #[serde(rename = "phev")]
    Phev,
    #[serde(rename = "ev")]
    Ev,
    #[default]
    #[serde(rename = "no-strong-preference")]
    NoStrongPreference,
}

impl Powertrain {
    /// Lenient parse: anything unrecognised means no strong preference.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "hybrid" => Powertrain::Hybrid,
            "gas" | "gasoline" => Powertrain::Gas,
            "phev" | "plug-in hybrid" => Powertrain::Phev,
            "ev" | "electric" => Powertrain::Ev,
            _ => Powertrain::NoStrongPreference,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Powertrain::Hybrid => "hybrid",
            Powertrain::Gas => "gas",
            Powertrain::Phev => "phev",
            Powertrain::Ev => "ev",
            Powertrain::NoStrongPreference => "no-strong-preference",
        }
    }
}

impl<'de> Deserialize<'de> for Powertrain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Powertrain::parse).unwrap_or_default())
    }
}

/// Total budget in USD with a tolerance band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, deserialize_with = "number_or_zero")]
    pub target: f64,
    #[serde(default = "default_flex_pct", deserialize_with = "flex_or_default")]
    pub flex_pct: f64,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            target: 0.0,
            flex_pct: default_flex_pct(),
        }
    }
}

fn default_flex_pct() -> f64 {
    10.0
}

fn number_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn flex_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_flex_pct))
}

fn budget_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Budget, D::Error> {
    Ok(Option::<Budget>::deserialize(deserializer)?.unwrap_or_default())
}

/// Structured shopper preferences.
///
/// Produced by the extractor; `must_have` and `nice_to_have` are rewritten
/// to canonical keys by the ontology normalizer and never change afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub purpose: Vec<String>,
    #[serde(default)]
    pub location_tags: Vec<String>,
    #[serde(default)]
    pub style_vibe: Vec<String>,
    #[serde(default)]
    pub must_have: Vec<String>,
    #[serde(default)]
    pub nice_to_have: Vec<String>,
    #[serde(default)]
    pub powertrain_pref: Powertrain,
    #[serde(rename = "budget_total_usd", default, deserialize_with = "budget_or_default")]
    pub budget: Budget,
    #[serde(default)]
    pub notes: String,
}

/// An optional equipment bundle on a trim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub adds: BTreeSet<String>,
}

/// A catalog entry: one model/year/trim configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTrim {
    pub id: String,
    pub model: String,
    pub year: i32,
    pub trim: String,
    #[serde(default)]
    pub features: BTreeSet<String>,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub style_vibe: Vec<String>,
    #[serde(default)]
    pub detail_url: String,
}

/// A retrieved trim that survived the constraint filter.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub trim: Arc<VehicleTrim>,
    /// Cosine similarity to the profile embedding, in `[-1, 1]`.
    pub similarity: f32,
    /// Packages needed to cover must-haves missing from base equipment.
    pub suggested_packages: Vec<String>,
}

/// One of the top recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPick {
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub trim: String,
    pub fit_score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub recommended_customizations: Vec<String>,
}

/// A lower-ranked candidate with only its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherPick {
    pub id: String,
    pub fit_score: f64,
}

/// Final grounded recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub top_5: Vec<TopPick>,
    #[serde(default)]
    pub others: Vec<OtherPick>,
}

impl RecommendationResult {
    /// Every trim id referenced by the result, top picks first.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.top_5
            .iter()
            .map(|p| p.id.as_str())
            .chain(self.others.iter().map(|o| o.id.as_str()))
    }
}

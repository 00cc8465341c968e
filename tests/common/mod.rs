//! Shared fixtures for integration tests: a three-trim catalog and
//! in-memory chat/embedding clients.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trim_advisor::catalog::Catalog;
use trim_advisor::embedding::Embedder;
use trim_advisor::error::{AdvisorError, AdvisorResult};
use trim_advisor::llm::{ChatModel, ChatRequest};
use trim_advisor::models::{Package, VehicleTrim};
use trim_advisor::ontology::{FallbackPolicy, Ontology};
use trim_advisor::pipeline::{Advisor, PipelineSettings};

pub const PROFILE_HEATED_BLIND_SPOT: &str = r#"Here is the profile:
```json
{
  "purpose": ["family road trips"],
  "location_tags": ["snowy winters"],
  "style_vibe": ["rugged"],
  "must_have": ["Heated Seats", "blind spot"],
  "nice_to_have": ["wireless carplay"],
  "powertrain_pref": "hybrid",
  "budget_total_usd": {"target": 40000, "flex_pct": 10},
  "notes": ""
}
```"#;

pub const PROFILE_SUNROOF: &str = r#"{
  "must_have": ["sunroof"],
  "powertrain_pref": null,
  "budget_total_usd": null
}"#;

pub const FINAL_GROUNDED: &str = r#"{
  "top_5": [
    {
      "id": "rav4-xle",
      "model": "RAV9",
      "year": 1999,
      "trim": "Imaginary",
      "fit_score": 92,
      "reasons": ["Hybrid", "Cold Weather package adds heated seats"],
      "recommended_customizations": ["Cold Weather", "Rocket Boosters"]
    },
    {
      "id": "camry-se",
      "fit_score": 81,
      "reasons": ["Heated seats standard"],
      "recommended_customizations": []
    }
  ],
  "others": []
}"#;

pub const FINAL_HALLUCINATED: &str = r#"{
  "top_5": [{"id": "tesla-model-y", "fit_score": 99, "reasons": [], "recommended_customizations": []}],
  "others": []
}"#;

fn trim(id: &str, model: &str, features: &[&str], packages: Vec<Package>) -> VehicleTrim {
    VehicleTrim {
        id: id.to_string(),
        model: model.to_string(),
        year: 2025,
        trim: "XLE".to_string(),
        features: features.iter().map(|s| s.to_string()).collect(),
        packages,
        colors: vec!["Lunar Rock".to_string()],
        style_vibe: vec![],
        detail_url: String::new(),
    }
}

pub fn trims() -> Vec<VehicleTrim> {
    vec![
        trim(
            "rav4-xle",
            "RAV4",
            &["blind_spot_monitor"],
            vec![Package {
                name: "Cold Weather".to_string(),
                adds: ["heated_front_seats".to_string()].into_iter().collect(),
            }],
        ),
        trim(
            "camry-se",
            "Camry",
            &["heated_front_seats", "blind_spot_monitor"],
            vec![],
        ),
        trim("corolla-le", "Corolla", &[], vec![]),
    ]
}

pub fn ontology_table() -> HashMap<String, String> {
    [
        ("heated seats", "heated_front_seats"),
        ("blind spot", "blind_spot_monitor"),
        ("sunroof", "panoramic_roof"),
        ("wireless carplay", "wireless_carplay"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn vectors() -> HashMap<String, Vec<f32>> {
    [
        ("rav4-xle", vec![1.0, 0.0, 0.0]),
        ("camry-se", vec![0.0, 1.0, 0.0]),
        ("corolla-le", vec![0.0, 0.0, 1.0]),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub fn catalog(policy: FallbackPolicy) -> Arc<Catalog> {
    Arc::new(
        Catalog::from_parts(trims(), Ontology::new(ontology_table(), policy), vectors(), 3)
            .unwrap(),
    )
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        extract_model: "test-extract".to_string(),
        extract_temperature: 0.1,
        finalize_model: "test-finalize".to_string(),
        finalize_temperature: 0.2,
        top_k: 3,
        finalize_limit: 10,
        request_timeout: Duration::from_secs(5),
    }
}

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedChat {
    responses: Mutex<VecDeque<String>>,
    pub requests: Mutex<Vec<ChatRequest>>,
    pub delay: Option<Duration>,
}

impl ScriptedChat {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    /// Like [`ScriptedChat::new`], but every call sleeps for `delay` first.
    pub fn with_delay(responses: &[&str], delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(responses)
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, request: &ChatRequest) -> AdvisorResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AdvisorError::Transport {
                service: "generation",
                message: "script exhausted".to_string(),
            })
    }
}

/// Always returns the same vector.
pub struct FixedEmbedder {
    vector: Vec<f32>,
    pub calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dims(&self) -> usize {
        self.vector.len()
    }

    async fn embed(&self, _text: &str) -> AdvisorResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }
}

pub fn advisor(
    policy: FallbackPolicy,
    chat: Arc<ScriptedChat>,
    embedder: Arc<FixedEmbedder>,
) -> Advisor {
    Advisor::new(catalog(policy), chat, embedder, settings())
}

//! The recommendation pipeline.
//!
//! ```text
//! answers ─▶ extract ─▶ normalize ─▶ retrieve ─▶ filter/advise ─▶ finalize ─▶ result
//!            (chat)                  (embed)                        (chat)
//! ```
//!
//! Stages run strictly in sequence; the only shared state is the read-only
//! [`Catalog`]. Transports are trait objects so tests can swap them out.
//! The whole run is bounded by `[pipeline].request_timeout_secs`, and a
//! [`CancelToken`] is checked between stages.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Instrument};

use crate::catalog::Catalog;
use crate::config::{Config, Credentials};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{AdvisorError, AdvisorResult};
use crate::extract::extract_profile;
use crate::filter::build_candidates;
use crate::finalize::finalize;
use crate::llm::{ChatModel, OpenAIChat};
use crate::models::{Candidate, RecommendationResult, ShopperAnswers, UserProfile};
use crate::retrieve::retrieve;

/// Cooperative cancellation flag, checked between pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> AdvisorResult<()> {
        if self.is_cancelled() {
            Err(AdvisorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Per-request tuning taken from [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub extract_model: String,
    pub extract_temperature: f32,
    pub finalize_model: String,
    pub finalize_temperature: f32,
    pub top_k: usize,
    pub finalize_limit: usize,
    pub request_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            extract_model: config.llm.extract_model.clone(),
            extract_temperature: config.llm.extract_temperature,
            finalize_model: config.llm.finalize_model.clone(),
            finalize_temperature: config.llm.finalize_temperature,
            top_k: config.retrieval.top_k,
            finalize_limit: config.retrieval.finalize_limit,
            request_timeout: Duration::from_secs(config.pipeline.request_timeout_secs),
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub profile: UserProfile,
    pub candidates: Vec<Candidate>,
    pub result: RecommendationResult,
}

/// Owns the catalog and both upstream clients; cheap to share via `Arc`.
pub struct Advisor {
    catalog: Arc<Catalog>,
    chat: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
    settings: PipelineSettings,
}

impl Advisor {
    pub fn new(
        catalog: Arc<Catalog>,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            catalog,
            chat,
            embedder,
            settings,
        }
    }

    /// Wire up the HTTP-backed clients. Fails at startup if the API key is
    /// missing or the embedding model's dimensionality disagrees with the
    /// index.
    pub fn from_config(config: &Config, catalog: Arc<Catalog>) -> AdvisorResult<Self> {
        let credentials = Credentials::from_env(&config.llm)?;
        let chat = OpenAIChat::new(&config.llm, &credentials)?;
        let embedder = OpenAIEmbedder::new(&config.embedding, &config.llm, &credentials)?;

        if embedder.dims() != catalog.index.dims() {
            return Err(AdvisorError::Config(format!(
                "embedding.dims is {} but the catalog index has {}",
                embedder.dims(),
                catalog.index.dims()
            )));
        }

        Ok(Self::new(
            catalog,
            Arc::new(chat),
            Arc::new(embedder),
            PipelineSettings::from_config(config),
        ))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run the full pipeline once, bounded by the request deadline.
    pub async fn recommend(
        &self,
        answers: &ShopperAnswers,
        cancel: &CancelToken,
    ) -> AdvisorResult<Recommendation> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("recommend", %request_id);
        let deadline = self.settings.request_timeout;

        match tokio::time::timeout(deadline, self.run(answers, cancel).instrument(span)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AdvisorError::DeadlineExceeded(deadline.as_secs())),
        }
    }

    async fn run(
        &self,
        answers: &ShopperAnswers,
        cancel: &CancelToken,
    ) -> AdvisorResult<Recommendation> {
        let s = &self.settings;

        cancel.check()?;
        let mut profile = extract_profile(
            self.chat.as_ref(),
            answers,
            &s.extract_model,
            s.extract_temperature,
        )
        .await?;
        info!(
            must_have = profile.must_have.len(),
            nice_to_have = profile.nice_to_have.len(),
            "preferences extracted"
        );

        let ontology = &self.catalog.ontology;
        profile.must_have = ontology.normalize(&profile.must_have)?;
        profile.nice_to_have = ontology.normalize(&profile.nice_to_have)?;

        cancel.check()?;
        let retrieved = retrieve(
            self.embedder.as_ref(),
            &self.catalog.index,
            &profile,
            s.top_k,
        )
        .await?;
        info!(retrieved = retrieved.len(), "catalog ranked");

        cancel.check()?;
        let mut candidates = build_candidates(&self.catalog, &retrieved, &profile.must_have)?;
        candidates.truncate(s.finalize_limit);
        info!(candidates = candidates.len(), "constraints applied");

        cancel.check()?;

        let result = finalize(
            self.chat.as_ref(),
            &profile,
            &candidates,
            &s.finalize_model,
            s.finalize_temperature,
        )
        .await?;
        info!(
            top = result.top_5.len(),
            others = result.others.len(),
            "recommendation finalized"
        );

        Ok(Recommendation {
            profile,
            candidates,
            result,
        })
    }
}

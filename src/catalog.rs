//! Read-only catalog state: trims, feature ontology, and embedding index.
//!
//! Loaded once at process start by [`load_catalog`] and shared behind an
//! `Arc` for the lifetime of the process. Nothing here is mutated after
//! loading, so concurrent requests read it without locking.
//!
//! # Files
//!
//! | Config key | Shape |
//! |------------|-------|
//! | `catalog.vehicles` | `[{id, model, year, trim, features, packages, ...}]` |
//! | `catalog.ontology` | `{"phrase": "canonical_key", ...}` |
//! | `catalog.vectors`  | `{"trim-id": [f32, ...], ...}` |
//!
//! Index rows follow the order of the vehicles file, which is the
//! tie-break order used by retrieval.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AdvisorError, AdvisorResult};
use crate::models::VehicleTrim;
use crate::ontology::{FallbackPolicy, Ontology};
use crate::retrieve::CatalogIndex;

#[derive(Debug)]
pub struct Catalog {
    trims: Vec<Arc<VehicleTrim>>,
    by_id: HashMap<String, Arc<VehicleTrim>>,
    pub ontology: Ontology,
    pub index: CatalogIndex,
}

impl Catalog {
    /// Assemble a catalog from already-parsed parts.
    ///
    /// Fails with [`AdvisorError::Config`] on duplicate trim ids, index
    /// entries for unknown trims, or vectors whose length is not `dims`.
    pub fn from_parts(
        trims: Vec<VehicleTrim>,
        ontology: Ontology,
        vectors: HashMap<String, Vec<f32>>,
        dims: usize,
    ) -> AdvisorResult<Self> {
        let mut by_id = HashMap::with_capacity(trims.len());
        let mut ordered = Vec::with_capacity(trims.len());
        for trim in trims {
            let trim = Arc::new(trim);
            if by_id.insert(trim.id.clone(), trim.clone()).is_some() {
                return Err(AdvisorError::Config(format!(
                    "duplicate trim id in catalog: {}",
                    trim.id
                )));
            }
            ordered.push(trim);
        }

        if let Some(orphan) = vectors.keys().find(|id| !by_id.contains_key(*id)) {
            return Err(AdvisorError::Config(format!(
                "embedding index references unknown trim id: {}",
                orphan
            )));
        }

        let mut ids = Vec::with_capacity(vectors.len());
        let mut rows = Vec::with_capacity(vectors.len());
        for trim in &ordered {
            match vectors.get(&trim.id) {
                Some(v) => {
                    ids.push(trim.id.clone());
                    rows.push(v.clone());
                }
                None => warn!(trim = %trim.id, "trim has no embedding; it will never be retrieved"),
            }
        }
        let index = CatalogIndex::new(ids, rows, dims)?;

        Ok(Self {
            trims: ordered,
            by_id,
            ontology,
            index,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Arc<VehicleTrim>> {
        self.by_id.get(id)
    }

    pub fn trims(&self) -> &[Arc<VehicleTrim>] {
        &self.trims
    }

    pub fn len(&self) -> usize {
        self.trims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trims.is_empty()
    }
}

/// Load the three catalog files named in `config`.
pub fn load_catalog(config: &Config) -> AdvisorResult<Catalog> {
    let trims: Vec<VehicleTrim> = read_json(&config.catalog.vehicles)?;
    let table: HashMap<String, String> = read_json(&config.catalog.ontology)?;
    let vectors: HashMap<String, Vec<f32>> = read_json(&config.catalog.vectors)?;

    let policy = if config.ontology.strict {
        FallbackPolicy::Strict
    } else {
        FallbackPolicy::Permissive
    };

    let catalog = Catalog::from_parts(
        trims,
        Ontology::new(table, policy),
        vectors,
        config.embedding.dims,
    )?;

    info!(
        trims = catalog.len(),
        indexed = catalog.index.len(),
        phrases = catalog.ontology.len(),
        dims = catalog.index.dims(),
        "catalog loaded"
    );

    Ok(catalog)
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> AdvisorResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AdvisorError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| AdvisorError::Config(format!("failed to parse {}: {}", path.display(), e)))
}

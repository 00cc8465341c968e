//! `advisor index build`: the offline batch job that precomputes trim
//! embeddings.
//!
//! Reads `[catalog].docs` (`[{"id": "...", "doc": "..."}]`), embeds each
//! document with the configured model, and writes the `{id: vector}` object
//! to `[catalog].vectors`. The retriever must use the same embedding model,
//! so the model name and dimensionality are checked against config before
//! anything is written.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::catalog::read_json;
use crate::config::{Config, Credentials};
use crate::embedding::{Embedder, OpenAIEmbedder};

/// One trim description to embed.
#[derive(Debug, Clone, Deserialize)]
pub struct TrimDoc {
    pub id: String,
    pub doc: String,
}

/// Summary of a build run.
#[derive(Debug, Default, PartialEq)]
pub struct BuildStats {
    pub total: usize,
    pub embedded: usize,
    pub skipped: usize,
}

pub async fn run_index_build(config: &Config, dry_run: bool) -> Result<()> {
    let docs_path = config
        .catalog
        .docs
        .as_ref()
        .context("catalog.docs must be set to build the embedding index")?;
    let docs: Vec<TrimDoc> = read_json(docs_path)?;

    if dry_run {
        println!("index build (dry-run)");
        println!("  documents: {}", docs.len());
        println!("  model: {}", config.embedding.model);
        return Ok(());
    }

    let credentials = Credentials::from_env(&config.llm)?;
    let embedder = OpenAIEmbedder::new(&config.embedding, &config.llm, &credentials)?;

    let (vectors, stats) = build_vectors(&embedder, &docs).await?;
    write_vectors(&config.catalog.vectors, &vectors)?;

    println!("index build");
    println!("  total documents: {}", stats.total);
    println!("  embedded: {}", stats.embedded);
    println!("  skipped (empty): {}", stats.skipped);
    println!("  wrote: {}", config.catalog.vectors.display());

    Ok(())
}

/// Embed every non-empty document, one call per document.
///
/// Any upstream failure aborts the build so a partial index is never
/// written.
pub async fn build_vectors(
    embedder: &dyn Embedder,
    docs: &[TrimDoc],
) -> Result<(BTreeMap<String, Vec<f32>>, BuildStats)> {
    let mut vectors = BTreeMap::new();
    let mut stats = BuildStats {
        total: docs.len(),
        ..Default::default()
    };

    for doc in docs {
        if doc.doc.trim().is_empty() {
            warn!(trim = %doc.id, "empty document; skipping");
            stats.skipped += 1;
            continue;
        }
        if vectors.contains_key(&doc.id) {
            bail!("duplicate trim id in docs: {}", doc.id);
        }

        info!(trim = %doc.id, "embedding");
        let vector = embedder
            .embed(&doc.doc)
            .await
            .with_context(|| format!("embedding failed for {}", doc.id))?;
        if vector.len() != embedder.dims() {
            bail!(
                "model {} returned {} dimensions for {}, expected {}",
                embedder.model_name(),
                vector.len(),
                doc.id,
                embedder.dims()
            );
        }
        vectors.insert(doc.id.clone(), vector);
        stats.embedded += 1;
    }

    Ok((vectors, stats))
}

fn write_vectors(path: &Path, vectors: &BTreeMap<String, Vec<f32>>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string(vectors)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write vectors to {}", path.display()))?;
    Ok(())
}

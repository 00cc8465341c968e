//! `advisor check`: validate config and catalog files without any network
//! calls.

use anyhow::Result;
use std::collections::{BTreeSet, HashMap};

use crate::catalog::{load_catalog, read_json, Catalog};
use crate::config::Config;

/// Catalog health figures printed by `advisor check`.
#[derive(Debug, PartialEq)]
pub struct CatalogReport {
    pub trims: usize,
    pub indexed: usize,
    pub dims: usize,
    pub phrases: usize,
    pub unindexed: Vec<String>,
    /// Canonical keys that no trim offers, base or via a package.
    pub unreachable_keys: Vec<String>,
}

pub fn report(catalog: &Catalog, canonical_keys: &BTreeSet<String>) -> CatalogReport {
    let indexed: BTreeSet<&str> = catalog.index.ids().iter().map(String::as_str).collect();
    let unindexed = catalog
        .trims()
        .iter()
        .filter(|t| !indexed.contains(t.id.as_str()))
        .map(|t| t.id.clone())
        .collect();

    let mut offered = BTreeSet::new();
    for trim in catalog.trims() {
        offered.extend(trim.features.iter().cloned());
        for package in &trim.packages {
            offered.extend(package.adds.iter().cloned());
        }
    }
    let unreachable_keys = canonical_keys.difference(&offered).cloned().collect();

    CatalogReport {
        trims: catalog.len(),
        indexed: catalog.index.len(),
        dims: catalog.index.dims(),
        phrases: catalog.ontology.len(),
        unindexed,
        unreachable_keys,
    }
}

pub fn run_check(config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;
    let table: HashMap<String, String> = read_json(&config.catalog.ontology)?;
    let keys: BTreeSet<String> = table.into_values().map(|k| k.trim().to_string()).collect();

    let r = report(&catalog, &keys);

    println!("{:<20} VALUE", "CATALOG");
    println!("{:<20} {}", "trims", r.trims);
    println!("{:<20} {}", "indexed", r.indexed);
    println!("{:<20} {}", "dims", r.dims);
    println!("{:<20} {}", "ontology phrases", r.phrases);
    println!(
        "{:<20} {}",
        "ontology mode",
        if config.ontology.strict { "strict" } else { "permissive" }
    );

    if !r.unindexed.is_empty() {
        println!("warning: trims without embeddings: {}", r.unindexed.join(", "));
    }
    if !r.unreachable_keys.is_empty() {
        println!(
            "warning: canonical keys no trim offers: {}",
            r.unreachable_keys.join(", ")
        );
    }
    println!("ok");

    Ok(())
}

//! # Trim Advisor
//!
//! Grounded vehicle-trim recommendations from free-text shopper preferences.
//!
//! Five quiz answers go in; a ranked, grounded set of catalog trims comes
//! out. A generative model extracts structured preferences, an ontology
//! canonicalizes feature names, embeddings rank the catalog, a hard filter
//! enforces must-haves, and a second model pass ranks only the surviving
//! candidates. The final output is validated so it can never reference a
//! trim outside the verified candidate set.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ Extract  │──▶│ Normalize │──▶│ Retrieve │──▶│  Filter  │──▶│ Finalize │
//! │  (LLM)   │   │ ontology  │   │ (embed)  │   │ +advise  │   │  (LLM)   │
//! └──────────┘   └───────────┘   └──────────┘   └──────────┘   └────┬─────┘
//!                                                                    │
//!                                        ┌───────────────────────────┤
//!                                        ▼                           ▼
//!                                   ┌──────────┐               ┌──────────┐
//!                                   │   CLI    │               │   HTTP   │
//!                                   │(advisor) │               │  (axum)  │
//!                                   └──────────┘               └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENROUTER_API_KEY=...
//! advisor check                      # validate catalog files
//! advisor index build                # precompute trim embeddings
//! advisor recommend --purpose "family road trips" --features "heated seats"
//! advisor serve                      # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`catalog`] | Read-only trims, ontology and index |
//! | [`recovery`] | JSON recovery from model prose |
//! | [`transport`] | JSON-over-HTTP with timeout and retry |
//! | [`llm`] | Generation service client |
//! | [`embedding`] | Embedding service client and cosine similarity |
//! | [`extract`] | Preference extraction |
//! | [`ontology`] | Feature phrase normalization |
//! | [`retrieve`] | Embedding retrieval |
//! | [`filter`] | Constraint filter and package advisor |
//! | [`finalize`] | Grounded finalization |
//! | [`pipeline`] | Staged request pipeline |
//! | [`server`] | HTTP server |
//! | [`check`] | `advisor check` catalog report |
//! | [`embed_cmd`] | `advisor index build` batch job |

pub mod catalog;
pub mod check;
pub mod config;
pub mod embed_cmd;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod filter;
pub mod finalize;
pub mod llm;
pub mod models;
pub mod ontology;
pub mod pipeline;
pub mod recovery;
pub mod retrieve;
pub mod server;
pub mod transport;

//! # Feedback Taxonomy
//!
//! Data model and versioning for the classification taxonomy.
//!
//! ## Features
//!
//! - **Typed taxonomy** of departments, keywords and problems
//! - **Deterministic versioning** via per-category content hashes
//! - **Drift detection** against a persisted baseline
//! - **Semantic enrichment** of labels ahead of embedding generation

mod enrich;
mod error;
mod types;
mod version;

pub use enrich::{NoEnrichment, SynonymEnricher, TextEnricher};
pub use error::{Result, TaxonomyError};
pub use types::{ItemKind, ItemStatus, Taxonomy, TaxonomyItem};
pub use version::{
    category_hash, compute_version, CategoryDelta, ChangeReport, EmbeddingsStatus,
    MemoryVersionStore, StoredVersionInfo, TaxonomyVersion, VersionStore, VersionTracker,
};

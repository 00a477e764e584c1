//! # Feedback Embeddings
//!
//! Embedding generation, caching and similarity search for the
//! classification pipeline.
//!
//! ## Features
//!
//! - **Provider seam**: [`EmbeddingProvider`] async trait, injected by
//!   handle so tests run against [`StubEmbeddingProvider`]
//! - **Content-addressed cache** with TTL and oldest-30% eviction
//! - **Batched generation** in fixed-size chunks, order-preserving
//! - **Cosine similarity** ranking over taxonomy-sized candidate sets
//!
//! ## Architecture
//!
//! ```text
//! text ──> normalize ──> sha256 key ──> EmbeddingCache
//!                                          │  miss
//!                                          └──> EmbeddingProvider
//! query vector + candidate vectors ──> similarity::top_k
//! ```

mod cache;
mod error;
mod provider;
pub mod similarity;

pub use cache::{CacheConfig, CacheStats, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, StubEmbeddingProvider};

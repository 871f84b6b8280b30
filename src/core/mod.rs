//! Core functionality: describing images, embedding text and ranking the catalog

/// Persisted catalog embeddings keyed by content fingerprint.
#[cfg(feature = "hashing")]
pub mod cache;
/// The catalog and its lazily built embedding table.
pub mod catalog;
/// Text embedding providers.
pub mod embeddings;
/// Static suggestions attached to failed analyses.
pub mod fallback;
/// The end-to-end recommendation pipeline.
pub mod recommend;
/// Cosine similarity and top-K ranking.
pub mod similarity;
/// Vision model client and response parsing.
pub mod vision;

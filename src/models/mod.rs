//! Data types shared by the pipeline and the HTTP layer

/// Image analysis, vocabulary and response types.
pub mod analysis;
/// Catalog items.
pub mod catalog;

#![doc(html_root_url = "https://docs.rs/stylematch/0.1.0")]
#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

//! # StyleMatch
//!
//! A Rust library and service that looks at a photo of clothing, asks a
//! vision model for complementary items, and matches each suggestion against
//! a product catalog by embedding similarity.
//!
//! ## Features
//!
//! - **Image Analysis**: Validate JPEG/PNG/WebP/GIF input and have a vision
//!   model suggest items, a category and a gender from a closed vocabulary
//! - **Embeddings**: Embed suggestions and catalog descriptions through any
//!   OpenAI-compatible `/embeddings` endpoint
//! - **Matching**: Cosine similarity with a threshold and top-K per suggestion
//! - **Embedding Cache**: Persist catalog embeddings keyed by a SHA3 content
//!   fingerprint so restarts do not re-embed the catalog
//! - **Web API**: HTTP server with multipart and base64 analyze endpoints
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! stylematch = { version = "0.1", features = ["full"] }
//! ```
//!
//! Basic usage:
//! ```rust,no_run
//! use stylematch::{AppState, Config, ImageInput, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let state = AppState::new(Config::from_env()?)?;
//!     let image = ImageInput::from_bytes(std::fs::read("outfit.jpg")?)?;
//!     let response = stylematch::analyze(&state, &image, None).await;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```

// Internal modules
pub mod api;
pub mod core;
/// Defines the application's error types and result aliases.
pub mod error;
pub mod models;
mod state;
mod utils;

/// Build-time information generated by `build.rs`.
#[allow(missing_docs, dead_code, unreachable_pub)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

// Public API exports
pub use crate::{
    core::{
        catalog::{Catalog, CatalogIndex},
        recommend::{MatchSettings, Pipeline},
    },
    error::{AppError, ErrorKind, Result, ResultExt},
    models::{
        analysis::{AnalysisResponse, ImageAnalysis, MatchResult, Vocabulary},
        catalog::CatalogItem,
    },
    state::{AppState, Config},
    utils::ImageInput,
};

#[cfg(feature = "web")]
pub use crate::api::{create_router, health_check};

/// Initialize the application with default settings
///
/// This function sets up logging. `tracing` events from the HTTP layer are
/// forwarded through the same logger.
/// It should be called early in the application startup process.
///
/// # Errors
///
/// Returns an error if a logger has already been installed.
///
/// # Example
///
/// ```no_run
/// use stylematch::init;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     init()?;
///     // Application code here
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    // Initialize logging with sensible defaults
    let env = env_logger::Env::default()
        .default_filter_or("info")
        .default_write_style_or("auto");

    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .map_err(|e| AppError::Config(format!("failed to initialize logging: {}", e)))?;

    log::info!("Initializing StyleMatch {}", built_info::PKG_VERSION);
    Ok(())
}

/// Analyze one image with the state's catalog
///
/// This is a convenience function that picks the pipeline for `api_key`
/// (falling back to the server key) and runs it. Failures, including a
/// missing key, are reported inside the returned response.
pub async fn analyze(state: &AppState, image: &ImageInput, api_key: Option<&str>) -> AnalysisResponse {
    match state.pipeline_for(api_key) {
        Ok(pipeline) => pipeline.analyze(image, &state.catalog).await,
        Err(e) => {
            log::warn!("Cannot analyze image: {}", e);
            AnalysisResponse::failure(&e)
        }
    }
}

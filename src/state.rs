use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::core::catalog::{Catalog, CatalogIndex};
use crate::core::embeddings::{OpenAiEmbedder, DEFAULT_EMBEDDING_MODEL};
use crate::core::recommend::{MatchSettings, Pipeline, DEFAULT_MAX_CONCURRENCY};
use crate::core::vision::{OpenAiVision, DEFAULT_VISION_MODEL};
use crate::error::{AppError, Result};
use crate::models::analysis::Vocabulary;

/// Default OpenAI-compatible API root.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Configuration for the application
#[derive(Clone, Debug)]
pub struct Config {
    /// Server-side API key; requests may bring their own
    pub api_key: Option<String>,
    /// Root URL of the OpenAI-compatible API
    pub api_base: String,
    /// Chat model used to describe images
    pub vision_model: String,
    /// Embedding model for suggestions and catalog descriptions
    pub embedding_model: String,
    /// Expected embedding length, checked on every response when set
    pub embedding_dimensions: Option<usize>,
    /// Vocabulary, threshold and top-K
    pub matching: MatchSettings,
    /// Bound on concurrent outbound model calls
    pub max_concurrency: usize,
    /// Timeout for each outbound HTTP call
    pub request_timeout: Duration,
    /// JSON catalog file; the built-in catalog is used when unset
    pub catalog_path: Option<PathBuf>,
    /// Where catalog embeddings are persisted between runs
    pub embedding_cache_path: Option<PathBuf>,
    /// Attach static suggestions to failed analyses
    pub fallback_on_error: bool,
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Maximum request body size in bytes
    pub max_upload_size: usize,
    /// Allowed file extensions for uploads
    pub allowed_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: None,
            matching: MatchSettings::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout: Duration::from_secs(60),
            catalog_path: None,
            embedding_cache_path: None,
            fallback_on_error: false,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_upload_size: 5 * 1024 * 1024, // 5MB
            allowed_extensions: vec!["jpg", "jpeg", "png", "webp", "gif"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Config {
    /// Build configuration from the process environment (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.api_key = get("OPENAI_API_KEY");
        if let Some(base) = get("STYLEMATCH_API_BASE") {
            config.api_base = base;
        }
        if let Some(model) = get("STYLEMATCH_VISION_MODEL") {
            config.vision_model = model;
        }
        if let Some(model) = get("STYLEMATCH_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        config.embedding_dimensions = parse_var(&get, "STYLEMATCH_EMBEDDING_DIM")?;
        if let Some(threshold) = parse_var(&get, "STYLEMATCH_THRESHOLD")? {
            config.matching.threshold = threshold;
        }
        if let Some(top_k) = parse_var(&get, "STYLEMATCH_TOP_K")? {
            config.matching.top_k = top_k;
        }
        if let Some(categories) = get("STYLEMATCH_CATEGORIES") {
            config.matching.vocabulary = Vocabulary::with_categories(
                categories
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty()),
            );
        }
        if let Some(max) = parse_var(&get, "STYLEMATCH_MAX_CONCURRENCY")? {
            config.max_concurrency = max;
        }
        if let Some(secs) = parse_var(&get, "STYLEMATCH_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        config.catalog_path = get("STYLEMATCH_CATALOG").map(PathBuf::from);
        config.embedding_cache_path = get("STYLEMATCH_EMBEDDING_CACHE").map(PathBuf::from);
        if let Some(fallback) = parse_var(&get, "STYLEMATCH_FALLBACK")? {
            config.fallback_on_error = fallback;
        }
        if let Some(addr) = parse_var(&get, "STYLEMATCH_BIND")? {
            config.bind_addr = addr;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let vocabulary = &self.matching.vocabulary;
        if vocabulary.categories.is_empty() || vocabulary.genders.is_empty() {
            return Err(AppError::Config(
                "category and gender vocabularies must not be empty".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.matching.threshold) {
            return Err(AppError::Config(format!(
                "similarity threshold {} is outside [-1, 1]",
                self.matching.threshold
            )));
        }
        if self.max_concurrency == 0 {
            return Err(AppError::Config("max concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| AppError::Config(format!("invalid {}='{}': {}", key, raw, e)))
        })
        .transpose()
}

/// Application state that can be shared across handlers
#[derive(Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Catalog and its process-wide embedding table
    pub catalog: Arc<CatalogIndex>,
    http: reqwest::Client,
    limiter: Arc<Semaphore>,
    pipeline: Option<Arc<Pipeline>>,
}

impl AppState {
    /// Create the application state from configuration
    ///
    /// Loads the catalog and, when a server-side API key is configured,
    /// builds the default pipeline.
    pub fn new(config: Config) -> Result<Arc<Self>> {
        config.validate()?;

        let catalog = match &config.catalog_path {
            Some(path) => Catalog::from_json_file(path)?,
            None => Catalog::builtin(),
        };
        let mut index = CatalogIndex::new(catalog);
        if let Some(path) = &config.embedding_cache_path {
            index = index.with_cache_path(path);
        }

        let http = OpenAiEmbedder::http_client(config.request_timeout)?;
        let limiter = Arc::new(Semaphore::new(config.max_concurrency));

        let mut state = Self {
            config,
            catalog: Arc::new(index),
            http,
            limiter,
            pipeline: None,
        };
        if let Some(key) = state.config.api_key.clone() {
            state.pipeline = Some(Arc::new(state.openai_pipeline(&key)));
        } else {
            log::warn!("OPENAI_API_KEY is not set; requests must supply an apiKey");
        }

        Ok(Arc::new(state))
    }

    /// Create state around an existing pipeline and catalog
    pub fn with_pipeline(config: Config, pipeline: Pipeline, catalog: CatalogIndex) -> Arc<Self> {
        let limiter = Arc::clone(pipeline.limiter());
        Arc::new(Self {
            config,
            catalog: Arc::new(catalog),
            http: reqwest::Client::new(),
            limiter,
            pipeline: Some(Arc::new(pipeline)),
        })
    }

    /// The pipeline to use for a request.
    ///
    /// A request key gets its own OpenAI clients sharing the process-wide
    /// limiter; otherwise the server pipeline is used.
    pub fn pipeline_for(&self, api_key: Option<&str>) -> Result<Arc<Pipeline>> {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Ok(Arc::new(self.openai_pipeline(key))),
            None => self.pipeline.clone().ok_or_else(|| {
                AppError::InvalidInput(
                    "no API key configured on the server and none supplied".to_string(),
                )
            }),
        }
    }

    /// The server pipeline, if an API key is configured
    pub fn default_pipeline(&self) -> Option<&Arc<Pipeline>> {
        self.pipeline.as_ref()
    }

    fn openai_pipeline(&self, api_key: &str) -> Pipeline {
        let config = &self.config;
        let vision = OpenAiVision::new(
            self.http.clone(),
            &config.api_base,
            api_key,
            &config.vision_model,
        );
        let embedder = OpenAiEmbedder::new(
            self.http.clone(),
            &config.api_base,
            api_key,
            &config.embedding_model,
            config.embedding_dimensions,
        );

        Pipeline::new(
            Arc::new(vision),
            Arc::new(embedder),
            Arc::clone(&self.limiter),
            config.matching.clone(),
        )
    }
}

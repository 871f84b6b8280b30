use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::core::catalog::CatalogIndex;
use crate::core::embeddings::{embed_texts, Embedder};
use crate::core::similarity::{rank, DEFAULT_THRESHOLD, DEFAULT_TOP_K};
use crate::core::vision::{describe, VisionModel};
use crate::error::{AppError, Result};
use crate::models::analysis::{AnalysisResponse, ImageAnalysis, MatchResult, Vocabulary};
use crate::utils::ImageInput;

/// Default bound on concurrent outbound model calls.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// How suggestions are validated and matched.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    /// Allowed categories and genders
    pub vocabulary: Vocabulary,
    /// Minimum cosine similarity for a match
    pub threshold: f32,
    /// Maximum matches per suggestion
    pub top_k: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            threshold: DEFAULT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Describe → embed → rank, for one image at a time.
///
/// A pipeline is cheap to build; the limiter is meant to be shared by every
/// pipeline in the process so the bound on upstream calls is global.
pub struct Pipeline {
    vision: Arc<dyn VisionModel>,
    embedder: Arc<dyn Embedder>,
    limiter: Arc<Semaphore>,
    settings: MatchSettings,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("embedding_model", &self.embedder.model_name())
            .field("available_permits", &self.limiter.available_permits())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Pipeline {
    /// Create a pipeline from its collaborators
    pub fn new(
        vision: Arc<dyn VisionModel>,
        embedder: Arc<dyn Embedder>,
        limiter: Arc<Semaphore>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            vision,
            embedder,
            limiter,
            settings,
        }
    }

    /// Matching settings
    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// The embedder, e.g. for warming a [`CatalogIndex`]
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// The shared concurrency limiter
    pub fn limiter(&self) -> &Arc<Semaphore> {
        &self.limiter
    }

    /// Run the pipeline, returning the analysis and one match set per
    /// suggested item, in suggestion order.
    ///
    /// Any failure fails the whole run.
    pub async fn assemble(
        &self,
        image: &ImageInput,
        catalog: &CatalogIndex,
    ) -> Result<(ImageAnalysis, Vec<MatchResult>)> {
        let analysis = {
            let _permit = self
                .limiter
                .acquire()
                .await
                .map_err(|e| AppError::Internal(format!("concurrency limiter closed: {}", e)))?;
            describe(self.vision.as_ref(), image, &self.settings.vocabulary).await?
        };

        let embedder = self.embedder.as_ref();
        let (item_vectors, table) = tokio::try_join!(
            embed_texts(embedder, analysis.items(), &self.limiter),
            catalog.embedded(embedder, &self.limiter),
        )?;

        let recommendations = analysis
            .items()
            .iter()
            .zip(item_vectors)
            .map(|(item, vector)| {
                let matches = rank(
                    &vector,
                    table.items(),
                    self.settings.threshold,
                    self.settings.top_k,
                );
                log::debug!("{} catalog matches for '{}'", matches.len(), item);
                MatchResult {
                    recommended_item: item.clone(),
                    matches,
                }
            })
            .collect();

        Ok((analysis, recommendations))
    }

    /// Run the pipeline and fold the outcome into an [`AnalysisResponse`]
    pub async fn analyze(&self, image: &ImageInput, catalog: &CatalogIndex) -> AnalysisResponse {
        let request_id = Uuid::new_v4();
        let (width, height) = image.dimensions();
        log::info!(
            "[{}] Analyzing {} image ({}x{}, {} bytes)",
            request_id,
            image.mime(),
            width,
            height,
            image.bytes().len()
        );

        let result = self.assemble(image, catalog).await;
        match &result {
            Ok((_, recommendations)) => log::info!(
                "[{}] Analysis complete: {} suggestions, {} matched",
                request_id,
                recommendations.len(),
                recommendations.iter().filter(|r| !r.matches.is_empty()).count()
            ),
            Err(e) => log::error!("[{}] Analysis failed: {}", request_id, e),
        }

        AnalysisResponse::from_result(result)
    }
}

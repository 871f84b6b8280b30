use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{OnceCell, Semaphore};

use crate::core::embeddings::{embed_texts, Embedder};
use crate::core::similarity::EmbeddedItem;
use crate::error::{AppError, Result};
use crate::models::catalog::CatalogItem;

#[cfg(feature = "hashing")]
use crate::core::cache::EmbeddingCache;

/// The candidate set of items that can be recommended.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Create a catalog, rejecting duplicate ids
    pub fn new(items: Vec<CatalogItem>) -> Result<Self> {
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate catalog item id '{}'",
                    item.id
                )));
            }
        }
        Ok(Self { items })
    }

    /// The small fixed catalog shipped with the service
    pub fn builtin() -> Self {
        let items = vec![
            CatalogItem::new(
                "1",
                "Classic White Button-Down Shirt",
                "Shirts",
                "White",
                "Classic",
                "Unisex",
                "Timeless white cotton shirt perfect for professional and casual looks",
            ),
            CatalogItem::new(
                "2",
                "Dark Wash Skinny Jeans",
                "Jeans",
                "Dark Blue",
                "Skinny",
                "Women",
                "Flattering dark wash jeans with stretch for comfort and style",
            ),
            CatalogItem::new(
                "3",
                "Black Leather Ankle Boots",
                "Boots",
                "Black",
                "Ankle",
                "Women",
                "Versatile black leather boots suitable for multiple occasions",
            ),
            CatalogItem::new(
                "4",
                "Cashmere V-Neck Sweater",
                "Tops",
                "Beige",
                "V-Neck",
                "Women",
                "Luxurious cashmere sweater in neutral beige tone",
            ),
            CatalogItem::new(
                "5",
                "Tailored Navy Blazer",
                "Blazers",
                "Navy",
                "Tailored",
                "Unisex",
                "Professional navy blazer perfect for business attire",
            ),
            CatalogItem::new(
                "6",
                "White Canvas Sneakers",
                "Sneakers",
                "White",
                "Classic",
                "Unisex",
                "Clean white canvas sneakers for casual everyday wear",
            ),
        ];
        Self { items }
    }

    /// Load a JSON array of catalog items
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read catalog {}: {}", path.display(), e))
        })?;
        let items: Vec<CatalogItem> = serde_json::from_str(&content)?;
        log::info!("Loaded {} catalog items from {}", items.len(), path.display());
        Self::new(items)
    }

    /// All items, in catalog order
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Catalog items paired with description embeddings from one model.
#[derive(Debug, Clone)]
pub struct EmbeddedCatalog {
    model: String,
    items: Vec<EmbeddedItem>,
}

impl EmbeddedCatalog {
    /// Model the vectors came from
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embedded items, in catalog order
    pub fn items(&self) -> &[EmbeddedItem] {
        &self.items
    }
}

/// A catalog plus its lazily computed, process-wide embedding table.
#[derive(Debug)]
pub struct CatalogIndex {
    catalog: Catalog,
    cache_path: Option<PathBuf>,
    embedded: OnceCell<Arc<EmbeddedCatalog>>,
}

impl CatalogIndex {
    /// Wrap a catalog
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            cache_path: None,
            embedded: OnceCell::new(),
        }
    }

    /// Persist catalog embeddings at `path` between runs
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// The underlying catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether the embedding table has been computed
    pub fn is_ready(&self) -> bool {
        self.embedded.initialized()
    }

    /// Get the embedding table, computing it on first use.
    ///
    /// Concurrent callers wait on a single computation. If it fails, the
    /// error is returned and the next call tries again.
    pub async fn embedded(
        &self,
        embedder: &dyn Embedder,
        limiter: &Semaphore,
    ) -> Result<Arc<EmbeddedCatalog>> {
        let table = self
            .embedded
            .get_or_try_init(|| self.build(embedder, limiter))
            .await?;

        if table.model != embedder.model_name() {
            return Err(AppError::Config(format!(
                "catalog was embedded with {} but the request uses {}",
                table.model,
                embedder.model_name()
            )));
        }
        Ok(Arc::clone(table))
    }

    async fn build(
        &self,
        embedder: &dyn Embedder,
        limiter: &Semaphore,
    ) -> Result<Arc<EmbeddedCatalog>> {
        let items = self.catalog.items();
        let model = embedder.model_name().to_string();

        #[cfg(feature = "hashing")]
        let mut cache = self
            .cache_path
            .as_deref()
            .map(|path| EmbeddingCache::load_or_empty(path, &model));
        #[cfg(not(feature = "hashing"))]
        if self.cache_path.is_some() {
            log::warn!("Embedding cache requested but the `hashing` feature is disabled");
        }

        let mut vectors: Vec<Option<Vec<f32>>> = items
            .iter()
            .map(|item| {
                if let Some(vector) = &item.embedding {
                    return Some(vector.clone());
                }
                #[cfg(feature = "hashing")]
                if let Some(cache) = &cache {
                    return cache.lookup(item).map(<[f32]>::to_vec);
                }
                None
            })
            .collect();

        let pending: Vec<usize> = (0..items.len()).filter(|&i| vectors[i].is_none()).collect();
        log::info!(
            "Embedding catalog with {}: {} items, {} to compute",
            model,
            items.len(),
            pending.len()
        );

        if !pending.is_empty() {
            let descriptions: Vec<String> = pending
                .iter()
                .map(|&i| items[i].description.clone())
                .collect();
            let computed = embed_texts(embedder, &descriptions, limiter).await?;

            for (&i, vector) in pending.iter().zip(computed) {
                #[cfg(feature = "hashing")]
                if let Some(cache) = cache.as_mut() {
                    cache.insert(&items[i], vector.clone());
                }
                vectors[i] = Some(vector);
            }
        }

        #[cfg(feature = "hashing")]
        if let (Some(cache), Some(path)) = (cache.as_mut(), self.cache_path.as_deref()) {
            cache.retain_items(items);
            if let Err(e) = cache.save(path) {
                log::warn!("Failed to persist embedding cache: {}", e);
            }
        }

        let items = items
            .iter()
            .zip(vectors)
            .map(|(item, vector)| EmbeddedItem {
                item: item.without_embedding(),
                vector: vector.unwrap_or_default(),
            })
            .collect();

        Ok(Arc::new(EmbeddedCatalog { model, items }))
    }
}

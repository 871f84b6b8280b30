use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{Result, ResultExt};
use crate::models::catalog::CatalogItem;

/// Computes the fingerprint of a description embedded with `model`
pub fn fingerprint(model: &str, description: &str) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(description.as_bytes());
    hex::encode(hasher.finalize())
}

/// A stored catalog embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEmbedding {
    /// [`fingerprint`] of the model and description the vector came from
    pub fingerprint: String,
    /// The embedding
    pub vector: Vec<f32>,
}

/// Catalog embeddings persisted between runs, keyed by item id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingCache {
    /// Model every entry was produced with
    pub model: String,
    /// Last write time
    pub updated_at: DateTime<Utc>,
    /// Entries by catalog item id
    pub entries: HashMap<String, CachedEmbedding>,
}

impl EmbeddingCache {
    /// Create an empty cache for `model`
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            updated_at: Utc::now(),
            entries: HashMap::new(),
        }
    }

    /// Load the cache at `path` for `model`.
    ///
    /// A missing or unreadable file, or one written for a different model,
    /// yields an empty cache.
    pub fn load_or_empty(path: &Path, model: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Cannot read embedding cache {}: {}", path.display(), e);
                }
                return Self::new(model);
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(cache) if cache.model == model => {
                log::debug!(
                    "Loaded {} cached embeddings from {}",
                    cache.entries.len(),
                    path.display()
                );
                cache
            }
            Ok(cache) => {
                log::info!(
                    "Embedding cache was built with {}, not {}; recomputing",
                    cache.model,
                    model
                );
                Self::new(model)
            }
            Err(e) => {
                log::warn!("Ignoring corrupt embedding cache {}: {}", path.display(), e);
                Self::new(model)
            }
        }
    }

    /// Vector for `item` if its description has not changed
    pub fn lookup(&self, item: &CatalogItem) -> Option<&[f32]> {
        let expected = fingerprint(&self.model, &item.description);
        self.entries
            .get(&item.id)
            .filter(|entry| entry.fingerprint == expected)
            .map(|entry| entry.vector.as_slice())
    }

    /// Record the vector for `item`
    pub fn insert(&mut self, item: &CatalogItem, vector: Vec<f32>) {
        let fingerprint = fingerprint(&self.model, &item.description);
        self.entries
            .insert(item.id.clone(), CachedEmbedding { fingerprint, vector });
    }

    /// Drop entries for ids not in `items`
    pub fn retain_items(&mut self, items: &[CatalogItem]) {
        self.entries
            .retain(|id, _| items.iter().any(|item| &item.id == id));
    }

    /// Write the cache to `path`
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Utc::now();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing embedding cache {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn item(id: &str, description: &str) -> CatalogItem {
        CatalogItem::new(id, id, "Tops", "Red", "Casual", "Women", description)
    }

    #[test]
    fn test_fingerprint_depends_on_model_and_description() {
        let base = fingerprint("m1", "red top");
        assert_eq!(base.len(), 64);
        assert_eq!(base, fingerprint("m1", "red top"));
        assert_ne!(base, fingerprint("m2", "red top"));
        assert_ne!(base, fingerprint("m1", "blue top"));
    }

    #[test]
    fn test_lookup_misses_after_description_change() {
        let mut cache = EmbeddingCache::new("m1");
        cache.insert(&item("1", "red top"), vec![1.0, 2.0]);

        assert_eq!(cache.lookup(&item("1", "red top")), Some(&[1.0, 2.0][..]));
        assert_eq!(cache.lookup(&item("1", "crimson top")), None);
        assert_eq!(cache.lookup(&item("2", "red top")), None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("nested/embeddings.json");

        let mut cache = EmbeddingCache::new("m1");
        cache.insert(&item("1", "red top"), vec![0.5]);
        cache.save(file.path()).unwrap();
        file.assert(predicates::str::contains("\"model\":\"m1\""));

        let reloaded = EmbeddingCache::load_or_empty(file.path(), "m1");
        assert_eq!(reloaded.lookup(&item("1", "red top")), Some(&[0.5][..]));

        let other_model = EmbeddingCache::load_or_empty(file.path(), "m2");
        assert!(other_model.entries.is_empty());
    }

    #[test]
    fn test_corrupt_or_missing_file_is_empty() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("embeddings.json");
        assert!(EmbeddingCache::load_or_empty(file.path(), "m").entries.is_empty());

        file.write_str("{not json").unwrap();
        assert!(EmbeddingCache::load_or_empty(file.path(), "m").entries.is_empty());
    }

    #[test]
    fn test_retain_items() {
        let mut cache = EmbeddingCache::new("m");
        cache.insert(&item("1", "a"), vec![1.0]);
        cache.insert(&item("2", "b"), vec![2.0]);
        cache.retain_items(&[item("2", "b")]);
        assert_eq!(cache.entries.len(), 1);
        assert!(cache.entries.contains_key("2"));
    }
}

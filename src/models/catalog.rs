use serde::{Deserialize, Serialize};

/// A product that can be recommended as a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Catalog category (e.g. "Boots")
    pub category: String,
    /// Primary color
    pub color: String,
    /// Style keyword
    pub style: String,
    /// Target gender
    pub gender: String,
    /// Free-text description; this is what gets embedded
    pub description: String,
    /// Embedding of `description`, when precomputed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl CatalogItem {
    /// Create an item without an embedding
    pub fn new(
        id: &str,
        name: &str,
        category: &str,
        color: &str,
        style: &str,
        gender: &str,
        description: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            color: color.to_string(),
            style: style.to_string(),
            gender: gender.to_string(),
            description: description.to_string(),
            embedding: None,
        }
    }

    /// Copy of this item with the embedding removed, for output
    pub fn without_embedding(&self) -> Self {
        Self {
            embedding: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_not_serialized_when_stripped() {
        let mut item = CatalogItem::new("1", "Shirt", "Shirts", "White", "Classic", "Unisex", "A shirt");
        item.embedding = Some(vec![0.1, 0.2]);

        let json = serde_json::to_value(item.without_embedding()).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["id"], "1");
    }

    #[test]
    fn test_embedding_is_optional_when_deserializing() {
        let item: CatalogItem = serde_json::from_str(
            r#"{"id":"9","name":"Belt","category":"Accessories","color":"Brown",
                "style":"Classic","gender":"Men","description":"Leather belt"}"#,
        )
        .unwrap();
        assert!(item.embedding.is_none());
    }
}

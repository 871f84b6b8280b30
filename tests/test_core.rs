use std::io::{Cursor, Write};
use std::sync::Arc;

use assert_fs::prelude::*;
use async_trait::async_trait;
use image::RgbImage;
use tokio::sync::Semaphore;

use stylematch::core::embeddings::Embedder;
use stylematch::core::similarity::{rank, EmbeddedItem};
use stylematch::core::vision::VisionModel;
use stylematch::{
    AppError, AppState, Catalog, CatalogIndex, CatalogItem, Config, ErrorKind, ImageInput,
    MatchSettings, Pipeline, Result, Vocabulary,
};

fn sample_png() -> Vec<u8> {
    // Create a simple test image (2x2 pixels)
    let width = 2;
    let height = 2;
    let mut imgbuf = RgbImage::new(width, height);
    for (x, y, pixel) in imgbuf.enumerate_pixels_mut() {
        *pixel = image::Rgb([
            (x as f32 * 255.0 / width as f32) as u8,
            (y as f32 * 255.0 / height as f32) as u8,
            128,
        ]);
    }

    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(imgbuf)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

struct CannedVision(String);

#[async_trait]
impl VisionModel for CannedVision {
    async fn complete(&self, _image: &ImageInput, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// One axis per colour word; anything else embeds to the zero vector.
struct ColourEmbedder;

#[async_trait]
impl Embedder for ColourEmbedder {
    fn model_name(&self) -> &str {
        "colour"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_lowercase();
        Ok(["red", "blue", "green"]
            .iter()
            .map(|word| if text.contains(word) { 1.0 } else { 0.0 })
            .collect())
    }
}

fn colour_catalog() -> Catalog {
    Catalog::new(vec![
        CatalogItem::new("r", "Red Tee", "Tops", "Red", "Casual", "Unisex", "A red cotton tee"),
        CatalogItem::new("b", "Blue Jeans", "Jeans", "Blue", "Casual", "Unisex", "Blue denim"),
        CatalogItem::new("g", "Green Cap", "Accessories", "Green", "Sporty", "Unisex", "A green cap"),
    ])
    .unwrap()
}

fn pipeline(answer: &str) -> Pipeline {
    Pipeline::new(
        Arc::new(CannedVision(answer.to_string())),
        Arc::new(ColourEmbedder),
        Arc::new(Semaphore::new(4)),
        MatchSettings::default(),
    )
}

#[test]
fn test_rank_threshold_and_order() {
    let item = |id: &str| CatalogItem::new(id, id, "Tops", "Black", "Casual", "Unisex", id);
    let candidates = vec![
        EmbeddedItem { item: item("A"), vector: vec![1.0, 0.0] },
        EmbeddedItem { item: item("B"), vector: vec![0.0, 1.0] },
        EmbeddedItem { item: item("C"), vector: vec![0.9, 0.1] },
    ];

    let ranked = rank(&[1.0, 0.0], &candidates, 0.5, 2);
    let ids: Vec<&str> = ranked.iter().map(|i| i.id.as_str()).collect();

    assert_eq!(ids, vec!["A", "C"]);
}

#[tokio::test]
async fn test_pipeline_matches_each_suggestion() {
    let image = ImageInput::from_bytes(sample_png()).unwrap();
    let catalog = CatalogIndex::new(colour_catalog());
    let answer = "```json\n{\"items\": [\"Red scarf\", \"Purple hat\"], \"category\": \"shirts\", \"gender\": \"Women\"}\n```";

    let response = pipeline(answer).analyze(&image, &catalog).await;

    assert!(response.success);
    let analysis = response.analysis.as_ref().unwrap();
    assert_eq!(analysis.category(), "Shirts");
    assert_eq!(response.recommendations.len(), 2);
    assert_eq!(response.recommendations[0].recommended_item, "Red scarf");
    assert_eq!(response.recommendations[0].matches.len(), 1);
    assert_eq!(response.recommendations[0].matches[0].id, "r");
    assert!(response.recommendations[0].matches[0].embedding.is_none());
    assert_eq!(response.recommendations[1].recommended_item, "Purple hat");
    assert!(response.recommendations[1].matches.is_empty());
    assert!(catalog.is_ready());
}

#[tokio::test]
async fn test_pipeline_rejects_unknown_category() {
    let image = ImageInput::from_bytes(sample_png()).unwrap();
    let catalog = CatalogIndex::new(colour_catalog());
    let answer = r#"{"items": ["Red scarf"], "category": "Shoes", "gender": "Women"}"#;
    let settings = MatchSettings {
        vocabulary: Vocabulary::with_categories(["Sneakers", "Boots"]),
        ..MatchSettings::default()
    };
    let pipeline = Pipeline::new(
        Arc::new(CannedVision(answer.to_string())),
        Arc::new(ColourEmbedder),
        Arc::new(Semaphore::new(4)),
        settings,
    );

    let response = pipeline.analyze(&image, &catalog).await;

    assert!(!response.success);
    assert!(response.recommendations.is_empty());
    assert_eq!(response.error_kind, Some(ErrorKind::Validation));
}

#[test]
fn test_analyze_without_any_key() {
    let state = AppState::new(Config::default()).unwrap();
    let image = ImageInput::from_bytes(sample_png()).unwrap();

    let response = tokio_test::block_on(stylematch::analyze(&state, &image, None));

    assert!(!response.success);
    assert_eq!(response.error_kind, Some(ErrorKind::InvalidInput));
}

#[test]
fn test_catalog_from_json_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("catalog.json");
    let items: Vec<CatalogItem> = colour_catalog().items().to_vec();
    file.write_str(&serde_json::to_string(&items).unwrap()).unwrap();

    let catalog = Catalog::from_json_file(file.path()).unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.items()[1].name, "Blue Jeans");
}

#[test]
fn test_catalog_rejects_duplicate_ids() {
    let temp = assert_fs::TempDir::new().unwrap();
    let path = temp.path().join("dupes.json");
    let item = r#"{"id": "1", "name": "Tee", "category": "Tops", "color": "Red", "style": "Casual", "gender": "Unisex", "description": "A tee"}"#;
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "[{}, {}]", item, item).unwrap();
    drop(file);

    let err = Catalog::from_json_file(&path).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn test_config_from_lookup() {
    let config = Config::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        "STYLEMATCH_TOP_K" => Some("5".to_string()),
        "STYLEMATCH_CATEGORIES" => Some("Hats, Scarves".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.matching.top_k, 5);
    assert_eq!(config.matching.vocabulary.categories, vec!["Hats", "Scarves"]);

    let bad = Config::from_lookup(|key| (key == "STYLEMATCH_THRESHOLD").then(|| "high".to_string()));
    assert!(matches!(bad, Err(AppError::Config(_))));
}

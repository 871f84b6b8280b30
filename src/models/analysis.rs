use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind, Result};
use crate::models::catalog::CatalogItem;

/// Categories the vision model may choose from unless configured otherwise.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Shirts", "Jeans", "Dresses", "Skirts", "Jackets", "Blazers",
    "Tops", "Pants", "Shoes", "Sneakers", "Boots", "Sandals",
    "Accessories", "Bags", "Watches", "Sunglasses",
];

/// Genders the vision model may choose from.
pub const DEFAULT_GENDERS: &[&str] = &["Men", "Women", "Boys", "Girls", "Unisex"];

/// The closed sets a vision result is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Allowed clothing categories
    pub categories: Vec<String>,
    /// Allowed genders
    pub genders: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            genders: DEFAULT_GENDERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Vocabulary {
    /// Create a vocabulary with the given categories and the default genders
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Look up a category, returning the configured spelling
    pub fn canonical_category(&self, raw: &str) -> Option<&str> {
        find_member(&self.categories, raw)
    }

    /// Look up a gender, returning the configured spelling
    pub fn canonical_gender(&self, raw: &str) -> Option<&str> {
        find_member(&self.genders, raw)
    }
}

fn find_member<'a>(set: &'a [String], raw: &str) -> Option<&'a str> {
    let raw = raw.trim();
    set.iter()
        .find(|member| member.eq_ignore_ascii_case(raw))
        .map(String::as_str)
}

/// What the vision model made of the uploaded garment.
///
/// Only constructed through [`ImageAnalysis::new`], which enforces a
/// non-empty item list and vocabulary membership.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAnalysis {
    items: Vec<String>,
    category: String,
    gender: String,
}

impl ImageAnalysis {
    /// Validate raw model fields against `vocabulary`.
    ///
    /// Blank item titles are dropped. Category and gender are matched
    /// case-insensitively and stored in their configured spelling.
    pub fn new(
        items: Vec<String>,
        category: &str,
        gender: &str,
        vocabulary: &Vocabulary,
    ) -> Result<Self> {
        let items: Vec<String> = items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        if items.is_empty() {
            return Err(AppError::Validation(
                "model suggested no complementary items".to_string(),
            ));
        }

        let category = vocabulary.canonical_category(category).ok_or_else(|| {
            AppError::Validation(format!(
                "category '{}' is not one of {:?}",
                category, vocabulary.categories
            ))
        })?;

        let gender = vocabulary.canonical_gender(gender).ok_or_else(|| {
            AppError::Validation(format!(
                "gender '{}' is not one of {:?}",
                gender, vocabulary.genders
            ))
        })?;

        Ok(Self {
            items,
            category: category.to_string(),
            gender: gender.to_string(),
        })
    }

    /// Suggested complementary items, in model order
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Category of the photographed garment
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Gender of the photographed garment
    pub fn gender(&self) -> &str {
        &self.gender
    }
}

/// Catalog matches for one suggested item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// The suggestion these matches belong to
    pub recommended_item: String,
    /// Matching catalog items, most similar first
    pub matches: Vec<CatalogItem>,
}

/// Outcome of a full analysis run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    /// The validated analysis, absent on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ImageAnalysis>,
    /// One entry per analysis item on success, empty on failure
    pub recommendations: Vec<MatchResult>,
    /// Whether the pipeline completed
    pub success: bool,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl AnalysisResponse {
    /// Build a successful response
    pub fn success(analysis: ImageAnalysis, recommendations: Vec<MatchResult>) -> Self {
        debug_assert_eq!(analysis.items().len(), recommendations.len());
        Self {
            analysis: Some(analysis),
            recommendations,
            success: true,
            error: None,
            error_kind: None,
        }
    }

    /// Build a failed response from an error
    pub fn failure(err: &AppError) -> Self {
        Self {
            analysis: None,
            recommendations: Vec::new(),
            success: false,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }

    /// Convert a pipeline result into a response
    pub fn from_result(result: Result<(ImageAnalysis, Vec<MatchResult>)>) -> Self {
        match result {
            Ok((analysis, recommendations)) => Self::success(analysis, recommendations),
            Err(err) => Self::failure(&err),
        }
    }
}

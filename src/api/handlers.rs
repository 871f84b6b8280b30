use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, Result},
    utils::{validate_file_extension, ImageInput},
    AppState,
};

use super::responses::{AnalyzeReply, ApiResponse};

/// JSON body of `POST /api/analyze/base64`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Base64 image, optionally as a data URL
    pub image: String,
    /// Per-request API key
    #[serde(default)]
    pub api_key: Option<String>,
}

pub(crate) async fn analyze_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<AnalyzeReply> {
    let mut image = None;
    let mut api_key = None;

    // Process the multipart form data
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .ok_or_else(|| AppError::UploadError("No filename provided".to_string()))?
                    .to_string();

                if !validate_file_extension(&file_name, &state.config.allowed_extensions) {
                    return Err(AppError::UploadError(format!(
                        "Unsupported file type: {}",
                        file_name
                    )));
                }

                let content = field.bytes().await?;
                check_size(content.len(), state.config.max_upload_size)?;
                log::debug!("Received upload {} ({} bytes)", file_name, content.len());
                image = Some(ImageInput::from_bytes(content)?);
            }
            "apiKey" => api_key = Some(field.text().await?),
            _ => {}
        }
    }

    let image = image.ok_or_else(|| AppError::UploadError("No file provided".to_string()))?;
    run_analysis(&state, &image, api_key.as_deref()).await
}

pub(crate) async fn analyze_base64(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<AnalyzeReply> {
    let image = ImageInput::from_base64(&request.image)?;
    check_size(image.bytes().len(), state.config.max_upload_size)?;
    run_analysis(&state, &image, request.api_key.as_deref()).await
}

pub(crate) async fn list_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let items: Vec<_> = state
        .catalog
        .catalog()
        .items()
        .iter()
        .map(|item| item.without_embedding())
        .collect();

    ApiResponse::success(items)
}

async fn run_analysis(
    state: &AppState,
    image: &ImageInput,
    api_key: Option<&str>,
) -> Result<AnalyzeReply> {
    let pipeline = state.pipeline_for(api_key)?;
    let response = pipeline.analyze(image, &state.catalog).await;
    Ok(AnalyzeReply::new(response, state.config.fallback_on_error))
}

fn check_size(len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(AppError::UploadError(format!(
            "Image is {} bytes; the limit is {}",
            len, max
        )));
    }
    Ok(())
}

//! Text and image generation routes

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use contentforge_core::generate::{ImageRequest, TextRequest};
use serde::Serialize;
use tracing::info;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_url: String,
}

pub async fn generate_text(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<TextResponse>, ApiError> {
    let Json(request) = payload?;
    let output = state.generator.text(&request).await?;

    info!(
        provider = %output.provider,
        chars = output.text.chars().count(),
        "Text generated"
    );
    Ok(Json(TextResponse { text: output.text }))
}

pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, ApiError> {
    let Json(request) = payload?;
    let output = state.generator.image(&request).await?;

    info!(
        provider = %output.provider,
        mime_type = %output.image.mime_type,
        bytes = output.image.bytes.len(),
        "Image generated"
    );
    Ok(Json(ImageResponse {
        image_url: output.image.data_url(),
    }))
}

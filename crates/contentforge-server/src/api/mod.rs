//! HTTP routes

pub mod auth;
pub mod error;
pub mod generate;
pub mod generations;

use axum::Json;
use axum::extract::State;
use contentforge_core::prompt::{TemplateCatalog, catalog};
use serde_json::{Value, json};

use crate::state::AppState;

pub use error::ApiError;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let registry = state.generator.registry();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.store.backend(),
        "providers": {
            "text": registry.text_kinds(),
            "image": registry.image_kinds(),
        },
    }))
}

pub async fn templates() -> Json<TemplateCatalog> {
    Json(catalog())
}

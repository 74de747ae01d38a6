//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use fluffy_bites_core::{Catalog, Product};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Full catalog document, exactly as loaded at startup.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<Catalog> {
    Json(state.catalog().catalog().clone())
}

/// Single product by id.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    state
        .catalog()
        .catalog()
        .product(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

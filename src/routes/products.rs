use crate::{models::product::ProductListQuery, state::AppState};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_products))
}

/// Proxy the external product catalog, reshaping each product to the
/// fields the frontend needs. Upstream failures come back as 500 with
/// a structured body naming the cause.
/// GET /api/v1/products
pub async fn list_products(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> impl IntoResponse {
    match app_state.product_service.fetch_products(&query).await {
        Ok(page) => {
            debug!("Catalog proxy returned {} products", page.data.len());
            (StatusCode::OK, Json(serde_json::to_value(page).unwrap_or_default()))
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(e.to_body())),
    }
}

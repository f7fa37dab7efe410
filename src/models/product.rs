use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reshaped catalog entry: only the fields the portal frontend needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub img: Option<String>,
    pub img_variants: Vec<ImageVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageVariant {
    pub id: Option<i64>,
    pub img: Option<String>,
    pub title: Option<String>,
}

/// Reshaped upstream page: filtered products plus the upstream
/// pagination `meta` passed through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPage {
    pub data: Vec<ProductSummary>,
    pub meta: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

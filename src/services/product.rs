use crate::{
    config::Config,
    error::{AppError, Result},
    models::product::{CatalogPage, ImageVariant, ProductListQuery, ProductSummary},
};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const CATALOG_ERROR: &str = "Error al consultar la API de productos";

/// Failure modes of the upstream catalog call; each carries the
/// structured body returned to the caller with HTTP 500.
#[derive(Debug)]
pub enum CatalogError {
    UpstreamStatus { status_code: u16, detail: String },
    Timeout,
    Connection,
    Other(String),
}

impl CatalogError {
    pub fn to_body(&self) -> Value {
        match self {
            CatalogError::UpstreamStatus { status_code, detail } => json!({
                "error": CATALOG_ERROR,
                "status_code": status_code,
                "detail": detail,
            }),
            CatalogError::Timeout => json!({
                "error": CATALOG_ERROR,
                "detail": "Timeout - La API externa no respondió a tiempo",
            }),
            CatalogError::Connection => json!({
                "error": CATALOG_ERROR,
                "detail": "No se pudo conectar con la API externa",
            }),
            CatalogError::Other(detail) => json!({
                "error": CATALOG_ERROR,
                "detail": detail,
            }),
        }
    }
}

/// Read-only proxy over the external Strapi product catalog.
#[derive(Clone)]
pub struct ProductService {
    http_client: Client,
    base_url: String,
}

impl ProductService {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.catalog_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.catalog_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Forward pagination to the upstream catalog and reshape the page.
    pub async fn fetch_products(
        &self,
        query: &ProductListQuery,
    ) -> std::result::Result<CatalogPage, CatalogError> {
        let url = format!("{}/api/products", self.base_url);

        // Fixed relation-expansion parameters expected by the upstream
        let mut params: Vec<(String, String)> = vec![
            ("populate[0]".to_string(), "product_color.images".to_string()),
            ("populate[1]".to_string(), "product_features".to_string()),
            ("populate[2]".to_string(), "product_tecnology".to_string()),
        ];
        if let Some(page) = &query.page {
            params.push(("pagination[page]".to_string(), page.clone()));
        }
        if let Some(page_size) = &query.page_size {
            params.push(("pagination[pageSize]".to_string(), page_size.clone()));
        }

        debug!("Fetching products from {}", url);

        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Catalog upstream returned status {}", status);
            return Err(CatalogError::UpstreamStatus {
                status_code: status.as_u16(),
                detail,
            });
        }

        let upstream: Value = response
            .json()
            .await
            .map_err(|e| CatalogError::Other(e.to_string()))?;

        Ok(reshape_catalog(&upstream))
    }
}

fn classify_request_error(e: reqwest::Error) -> CatalogError {
    if e.is_timeout() {
        CatalogError::Timeout
    } else if e.is_connect() {
        CatalogError::Connection
    } else {
        CatalogError::Other(e.to_string())
    }
}

/// Filter the upstream page down to the fields the frontend needs:
/// the first color's image as `img`, its image list as `img_variants`.
pub fn reshape_catalog(upstream: &Value) -> CatalogPage {
    let mut products = Vec::new();

    for product in upstream
        .get("data")
        .and_then(Value::as_array)
        .unwrap_or(&Vec::new())
    {
        let first_color = product
            .get("product_color")
            .and_then(Value::as_array)
            .and_then(|colors| colors.first());

        let main_image = first_color
            .and_then(|color| color.get("img"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let image_variants = first_color
            .and_then(|color| color.get("images"))
            .and_then(Value::as_array)
            .map(|images| {
                images
                    .iter()
                    .map(|img| ImageVariant {
                        id: img.get("id").and_then(Value::as_i64),
                        img: img.get("img").and_then(Value::as_str).map(str::to_string),
                        title: img.get("title").and_then(Value::as_str).map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        products.push(ProductSummary {
            id: product.get("id").and_then(Value::as_i64),
            title: product.get("title").and_then(Value::as_str).map(str::to_string),
            description: product
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            img: main_image,
            img_variants: image_variants,
        });
    }

    CatalogPage {
        data: products,
        meta: upstream.get("meta").cloned().unwrap_or_else(|| json!({})),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reshape_picks_first_color_image() {
        let upstream = json!({
            "data": [{
                "id": 141,
                "title": "POS N82",
                "description": "POS integral",
                "product_color": [
                    {
                        "img": "https://cdn.example.com/gris.png",
                        "images": [
                            {"id": 215, "img": "https://cdn.example.com/g5.png", "title": null},
                            {"id": 216, "img": "https://cdn.example.com/gris.png", "title": null}
                        ]
                    },
                    {"img": "https://cdn.example.com/azul.png", "images": []}
                ]
            }],
            "meta": {"pagination": {"page": 1, "pageSize": 25, "pageCount": 1, "total": 1}}
        });

        let page = reshape_catalog(&upstream);
        assert_eq!(page.data.len(), 1);

        let product = &page.data[0];
        assert_eq!(product.id, Some(141));
        assert_eq!(product.img.as_deref(), Some("https://cdn.example.com/gris.png"));
        assert_eq!(product.img_variants.len(), 2);
        assert_eq!(product.img_variants[0].id, Some(215));
        assert_eq!(page.meta["pagination"]["total"], 1);
    }

    #[test]
    fn test_reshape_handles_missing_colors() {
        let upstream = json!({
            "data": [{"id": 7, "title": "Sin color", "description": "x"}],
            "meta": {}
        });

        let page = reshape_catalog(&upstream);
        assert_eq!(page.data[0].img, None);
        assert!(page.data[0].img_variants.is_empty());
    }

    #[test]
    fn test_reshape_tolerates_empty_payload() {
        let page = reshape_catalog(&json!({}));
        assert!(page.data.is_empty());
        assert_eq!(page.meta, json!({}));
    }

    #[test]
    fn test_upstream_error_body_shape() {
        let err = CatalogError::UpstreamStatus {
            status_code: 503,
            detail: "Service Unavailable".to_string(),
        };
        let body = err.to_body();
        assert_eq!(body["status_code"], 503);
        assert_eq!(body["detail"], "Service Unavailable");
        assert_eq!(body["error"], CATALOG_ERROR);
    }
}

use portal_api::config::Config;
use portal_api::models::product::ProductListQuery;
use portal_api::services::product::{CatalogError, ProductService};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        database_url: "postgres://localhost/test".to_string(),
        database_max_connections: 1,
        jwt_secret: "test-secret".to_string(),
        jwt_expiry_hours: 1,
        push_gateway_url: "http://localhost/push".to_string(),
        push_gateway_key: "test-key".to_string(),
        push_timeout_secs: 2,
        catalog_base_url: base_url.to_string(),
        catalog_timeout_secs: 2,
        cors_allowed_origins: "*".to_string(),
    }
}

fn empty_query() -> ProductListQuery {
    ProductListQuery {
        page: None,
        page_size: None,
    }
}

#[tokio::test]
async fn reshapes_upstream_products_and_passes_meta_through() {
    let server = MockServer::start().await;

    let upstream = json!({
        "data": [{
            "id": 141,
            "title": "POS N82",
            "description": "POS integral con impresora",
            "product_color": [
                {
                    "img": "https://cdn.example.com/gris.png",
                    "images": [
                        {"id": 215, "img": "https://cdn.example.com/g5.png", "title": "Frontal"},
                        {"id": 216, "img": "https://cdn.example.com/gris.png", "title": null}
                    ]
                },
                {"img": "https://cdn.example.com/azul.png", "images": []}
            ]
        }],
        "meta": {"pagination": {"page": 2, "pageSize": 10, "pageCount": 3, "total": 25}}
    });

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("populate[0]", "product_color.images"))
        .and(query_param("populate[1]", "product_features"))
        .and(query_param("populate[2]", "product_tecnology"))
        .and(query_param("pagination[page]", "2"))
        .and(query_param("pagination[pageSize]", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream))
        .expect(1)
        .mount(&server)
        .await;

    let service = ProductService::new(&test_config(&server.uri())).unwrap();
    let query = ProductListQuery {
        page: Some("2".to_string()),
        page_size: Some("10".to_string()),
    };

    let page = service.fetch_products(&query).await.unwrap();

    assert_eq!(page.data.len(), 1);
    let product = &page.data[0];
    assert_eq!(product.id, Some(141));
    assert_eq!(product.title.as_deref(), Some("POS N82"));
    assert_eq!(product.img.as_deref(), Some("https://cdn.example.com/gris.png"));
    assert_eq!(product.img_variants.len(), 2);
    assert_eq!(product.img_variants[0].title.as_deref(), Some("Frontal"));
    assert_eq!(page.meta["pagination"]["total"], 25);
}

#[tokio::test]
async fn upstream_error_status_carries_body_as_detail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let service = ProductService::new(&test_config(&server.uri())).unwrap();
    let err = service.fetch_products(&empty_query()).await.unwrap_err();

    match &err {
        CatalogError::UpstreamStatus { status_code, detail } => {
            assert_eq!(*status_code, 503);
            assert_eq!(detail, "Service Unavailable");
        }
        other => panic!("expected UpstreamStatus, got {:?}", other),
    }

    let body = err.to_body();
    assert_eq!(body["error"], "Error al consultar la API de productos");
    assert_eq!(body["status_code"], 503);
    assert_eq!(body["detail"], "Service Unavailable");
}

#[tokio::test]
async fn connection_failure_is_reported_as_such() {
    // port 9 (discard) refuses connections on any sane CI host
    let service = ProductService::new(&test_config("http://127.0.0.1:9")).unwrap();
    let err = service.fetch_products(&empty_query()).await.unwrap_err();

    let body = err.to_body();
    assert_eq!(body["error"], "Error al consultar la API de productos");
    assert!(body["detail"].as_str().unwrap().contains("conectar"));
}

#[tokio::test]
async fn timeout_produces_timeout_detail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [], "meta": {}}))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.catalog_timeout_secs = 1;
    let service = ProductService::new(&config).unwrap();

    let err = service.fetch_products(&empty_query()).await.unwrap_err();
    let body = err.to_body();
    assert!(body["detail"].as_str().unwrap().contains("Timeout"));
}

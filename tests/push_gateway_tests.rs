use portal_api::config::Config;
use portal_api::services::push::{FcmGateway, PushGateway, PushMessage};
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(gateway_url: &str) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        database_url: "postgres://localhost/test".to_string(),
        database_max_connections: 1,
        jwt_secret: "test-secret".to_string(),
        jwt_expiry_hours: 1,
        push_gateway_url: gateway_url.to_string(),
        push_gateway_key: "server-key-123".to_string(),
        push_timeout_secs: 2,
        catalog_base_url: "http://localhost/catalog".to_string(),
        catalog_timeout_secs: 2,
        cors_allowed_origins: "*".to_string(),
    }
}

fn sample_message() -> PushMessage {
    let mut data: Map<String, Value> = Map::new();
    data.insert("action".to_string(), json!("open_app"));
    data.insert("url".to_string(), json!("https://portal.example.com"));
    PushMessage {
        title: "Nuevo proyecto".to_string(),
        body: "Revisa el avance del proyecto".to_string(),
        data,
    }
}

#[tokio::test]
async fn sends_batch_with_provider_key_and_payload_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(header("Authorization", "key=server-key-123"))
        .and(body_partial_json(json!({
            "registration_ids": ["tok-1", "tok-2"],
            "notification": {
                "title": "Nuevo proyecto",
                "body": "Revisa el avance del proyecto",
            },
            "data": {
                "action": "open_app",
                "url": "https://portal.example.com",
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = FcmGateway::new(&test_config(&format!("{}/fcm/send", server.uri()))).unwrap();

    let tokens = vec!["tok-1".to_string(), "tok-2".to_string()];
    gateway.send(&tokens, &sample_message()).await.unwrap();
}

#[tokio::test]
async fn provider_error_status_fails_the_whole_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let gateway = FcmGateway::new(&test_config(&format!("{}/fcm/send", server.uri()))).unwrap();

    let tokens = vec!["tok-1".to_string()];
    let err = gateway.send(&tokens, &sample_message()).await.unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn unreachable_provider_is_an_error() {
    let gateway = FcmGateway::new(&test_config("http://127.0.0.1:9/fcm/send")).unwrap();

    let tokens = vec!["tok-1".to_string()];
    let result = gateway.send(&tokens, &sample_message()).await;
    assert!(result.is_err());
}

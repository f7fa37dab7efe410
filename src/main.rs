use std::sync::Arc;
use axum::{
    routing::{Router, get},
    http::{Method, HeaderValue},
    middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    compression::CompressionLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing::{info, error};

use portal_api::{
    config::Config,
    state::AppState,
    routes,
    services::{
        Database,
        AuthService,
        UserService,
        ProjectService,
        ProductService,
        DeviceService,
        NotificationService,
        push::FcmGateway,
    },
    utils::middleware::auth_middleware,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("LOG_LEVEL").unwrap_or_else(|_| "portal_api=debug,tower_http=debug".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting portal-api service...");

    // Load configuration
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // Initialize database connection
    let db = match Database::new(&config).await {
        Ok(db) => {
            db.verify_connection().await?;
            info!("Database connection established successfully");
            db
        }
        Err(e) => {
            error!("Failed to create database connection: {}", e);
            return Err(anyhow::anyhow!("Database initialization failed"));
        }
    };

    db.run_migrations().await?;

    // Initialize all services
    let db = Arc::new(db);
    let push_gateway = Arc::new(FcmGateway::new(&config)?);
    let auth_service = AuthService::new(db.clone(), &config)?;
    let user_service = UserService::new(db.clone());
    let project_service = ProjectService::new(db.clone());
    let product_service = ProductService::new(&config)?;
    let device_service = DeviceService::new(db.clone());
    let notification_service = NotificationService::new(
        db.clone(),
        device_service.clone(),
        push_gateway,
    );

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        db: (*db).clone(),
        auth_service,
        user_service,
        project_service,
        product_service,
        device_service,
        notification_service,
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(
            config.cors_allowed_origins
                .split(',')
                .map(|origin| origin.parse::<HeaderValue>().unwrap())
                .collect::<Vec<_>>(),
        );

    // Build application routes under the /api/v1/ prefix
    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/v1/auth", routes::auth::router())
        .nest("/api/v1/users", routes::users::router())
        .nest("/api/v1/projects", routes::projects::router())
        .nest("/api/v1/products", routes::products::router())
        .nest("/api/v1/fcm/devices", routes::devices::router())
        .nest("/api/v1/notifications", routes::notifications::router())
        .layer(middleware::from_fn_with_state(app_state.clone(), auth_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Start the server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "portal-api is running!"
}

use crate::{
    config::Config,
    services::{
        database::Database,
        auth::AuthService,
        user::UserService,
        project::ProjectService,
        product::ProductService,
        device::DeviceService,
        notification::NotificationService,
    },
};

/// Shared application state: configuration plus one service per resource.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,

    /// Database connection pool
    pub db: Database,

    /// JWT authentication service
    pub auth_service: AuthService,

    /// User account service
    pub user_service: UserService,

    /// Project tracking service
    pub project_service: ProjectService,

    /// External product catalog proxy
    pub product_service: ProductService,

    /// Push device registry
    pub device_service: DeviceService,

    /// Notification dispatch service
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn is_production(&self) -> bool {
        self.config.is_production()
    }

    pub fn is_development(&self) -> bool {
        self.config.is_development()
    }
}

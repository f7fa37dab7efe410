pub mod auth;
pub mod database;
pub mod device;
pub mod notification;
pub mod product;
pub mod project;
pub mod push;
pub mod user;

pub use auth::AuthService;
pub use database::Database;
pub use device::DeviceService;
pub use notification::NotificationService;
pub use product::ProductService;
pub use project::ProjectService;
pub use user::UserService;

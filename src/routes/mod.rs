pub mod auth;
pub mod devices;
pub mod notifications;
pub mod products;
pub mod projects;
pub mod users;

pub mod user;
pub mod project;
pub mod device;
pub mod notification;
pub mod product;

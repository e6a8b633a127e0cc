//! 用户资源

pub mod handler;
pub mod model;
pub mod service;

pub use model::User;
pub use service::UserService;

//! 产品资源

pub mod handler;
pub mod model;
pub mod service;

pub use model::Product;
pub use service::ProductService;

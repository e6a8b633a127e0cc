//! # Axum OpenAPI Store
//!
//! 基于内存存储的用户/产品 REST API：
//! - 请求和响应按 OpenAPI schema 文档校验
//! - `/api-docs` 提供交互式文档
//! - 分层结构：app（路由与业务）、core（错误、中间件、存储）、infrastructure（配置、日志、schema）

pub mod app;
pub mod core;
pub mod infrastructure;

pub use app::{build_router, AppState};
pub use infrastructure::config::AppConfig;
pub use infrastructure::schema::SchemaDocument;

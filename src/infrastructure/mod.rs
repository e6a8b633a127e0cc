//! 基础设施层：配置、日志、schema 文档

pub mod config;
pub mod logger;
pub mod schema;

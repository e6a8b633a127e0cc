//! 配置加载
//!
//! 查找顺序：环境变量 `APP_CONFIG` 指定的文件、`config.toml`、
//! `./config/config.toml`；都不存在时使用默认配置。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务配置
    pub http: HttpConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// schema 文档与校验配置
    pub openapi: OpenApiConfig,
    /// 存储配置
    pub storage: StorageConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// 绑定地址
    pub bind_address: String,
    /// 端口
    pub port: u16,
    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
    /// 请求体最大字节数
    pub body_limit_bytes: usize,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenApiConfig {
    pub schema_path: PathBuf,
    /// 文档页面路径，该前缀下不做校验
    pub docs_path: String,
    pub validate_requests: bool,
    pub validate_responses: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 启动时写入示例用户和示例产品
    pub seed_sample_data: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            timeout_seconds: 30,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from("openapi.yaml"),
            docs_path: "/api-docs".to_string(),
            validate_requests: true,
            validate_responses: true,
        }
    }
}

impl HttpConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl AppConfig {
    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Validation("HTTP端口必须大于0".to_string()));
        }
        if self.http.bind_address.is_empty() {
            return Err(ConfigError::Validation("绑定地址不能为空".to_string()));
        }
        if self.http.body_limit_bytes == 0 {
            return Err(ConfigError::Validation("请求体上限必须大于0".to_string()));
        }
        if self.openapi.schema_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("schema 文档路径不能为空".to_string()));
        }
        if !self.openapi.docs_path.starts_with('/') || self.openapi.docs_path.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "文档路径必须以 / 开头且不能是根路径: {}",
                self.openapi.docs_path
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("文件读取错误: {0}")]
    FileRead(String),
    #[error("配置解析错误: {0}")]
    Parse(String),
    #[error("配置验证错误: {0}")]
    Validation(String),
}

/// 从文件或默认值加载并验证配置
///
/// 此时日志系统尚未初始化，返回值中带上实际使用的文件路径供调用方记录。
pub fn load_config() -> Result<(AppConfig, Option<PathBuf>), ConfigError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(explicit) = std::env::var("APP_CONFIG") {
        let explicit = PathBuf::from(explicit);
        if !explicit.exists() {
            return Err(ConfigError::FileRead(format!(
                "APP_CONFIG 指定的文件不存在: {}",
                explicit.display()
            )));
        }
        candidates.push(explicit);
    }
    candidates.push(PathBuf::from("config.toml"));
    candidates.push(PathBuf::from("./config/config.toml"));

    for path in candidates {
        if path.exists() {
            let config = AppConfig::load_from_file(&path)?;
            config.validate()?;
            return Ok((config, Some(path)));
        }
    }

    Ok((AppConfig::default(), None))
}

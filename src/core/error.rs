//! 核心错误处理模块
//!
//! 所有失败最终都转换为 JSON 响应：
//! - 资源不存在：`{ "error": "..." }`
//! - 校验失败/未处理错误：`{ "message": "...", "errors": [...] }`

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::store::StoreError;

/// 单条校验违规信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// 违规位置，例如 `/body`、`/params/userId`、`/response`
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// 核心错误类型
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// 资源不存在（也用于空集合列表）
    #[error("{0}")]
    NotFound(String),
    /// 请求或响应不符合 schema 文档
    #[error("{message}")]
    Validation {
        status: StatusCode,
        message: String,
        errors: Vec<Violation>,
    },
    #[error("{0}")]
    Internal(String),
}

/// 响应扩展：标记由错误处理器生成的响应
#[derive(Debug, Clone, Copy)]
pub struct ErrorRendered;

/// 资源不存在时的响应体
#[derive(Serialize)]
pub struct NotFoundResponse {
    pub error: String,
}

/// 错误处理器的统一响应体
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Violation>>,
}

impl CoreError {
    pub fn bad_request(message: impl Into<String>, errors: Vec<Violation>) -> Self {
        CoreError::Validation {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            errors,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Validation { status, .. } => *status,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::NotFound(err.to_string())
    }
}

impl From<JsonRejection> for CoreError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        let detail = rejection.body_text();
        CoreError::Validation {
            status,
            message: detail.clone(),
            errors: vec![Violation::new("/body", detail)],
        }
    }
}

impl From<PathRejection> for CoreError {
    fn from(rejection: PathRejection) -> Self {
        let detail = rejection.body_text();
        CoreError::bad_request(detail.clone(), vec![Violation::new("/params", detail)])
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = match self {
            CoreError::NotFound(error) => (status, Json(NotFoundResponse { error })).into_response(),
            CoreError::Validation {
                message, errors, ..
            } => {
                tracing::warn!(%status, %message, "校验失败");
                let body = ErrorResponse {
                    message,
                    errors: Some(errors),
                };
                (status, Json(body)).into_response()
            }
            CoreError::Internal(message) => {
                tracing::error!(%message, "内部错误");
                let body = ErrorResponse {
                    message,
                    errors: None,
                };
                (status, Json(body)).into_response()
            }
        };
        response.extensions_mut().insert(ErrorRendered);
        response
    }
}

//! 核心中间件模块

use std::{error::Error as _, sync::Arc, time::Instant};

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{CoreError, ErrorRendered, Violation};
use crate::infrastructure::schema::{Operation, RouteMatch, SchemaDocument};

/// 请求日志中间件
pub async fn request_logging_middleware(mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        req.headers_mut().insert("x-request-id", value);
    }

    let mut response = next.run(req).await;
    let status = response.status();
    let duration = start.elapsed();

    info!(
        "{} {} - {} - {}ms - request_id: {}",
        method,
        uri,
        status,
        duration.as_millis(),
        request_id
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// 校验中间件状态
#[derive(Clone)]
pub struct ValidationState {
    pub document: Arc<SchemaDocument>,
    /// 该前缀下的请求不做校验
    pub docs_path: String,
    pub validate_requests: bool,
    pub validate_responses: bool,
    pub body_limit: usize,
}

impl ValidationState {
    fn is_docs_path(&self, path: &str) -> bool {
        path == self.docs_path
            || path
                .strip_prefix(self.docs_path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// OpenAPI 校验中间件
///
/// 处理器之前校验路径参数和请求体，之后校验响应体。任一失败都以
/// [`CoreError::Validation`] 返回，由错误处理器统一输出。错误处理器
/// 生成的响应若状态码未在文档中声明，则原样返回。
pub async fn openapi_validation_middleware(
    State(state): State<ValidationState>,
    req: Request,
    next: Next,
) -> Result<Response, CoreError> {
    let path = req.uri().path().to_string();
    if state.is_docs_path(&path) {
        return Ok(next.run(req).await);
    }

    let method = req.method().clone();
    let operation = match state.document.find(&method, &path) {
        RouteMatch::Found { operation, params } => {
            if state.validate_requests {
                let violations = operation.validate_params(&params);
                if !violations.is_empty() {
                    return Err(CoreError::bad_request(summarize(&violations), violations));
                }
            }
            Some(operation)
        }
        RouteMatch::MethodNotAllowed if state.validate_requests => {
            let message = format!("{} method not allowed", method);
            return Err(CoreError::Validation {
                status: StatusCode::METHOD_NOT_ALLOWED,
                errors: vec![Violation::new(path, message.clone())],
                message,
            });
        }
        RouteMatch::NotFound if state.validate_requests => {
            return Err(CoreError::Validation {
                status: StatusCode::NOT_FOUND,
                message: "not found".to_string(),
                errors: vec![Violation::new(path, "not found")],
            });
        }
        _ => None,
    };

    let Some(operation) = operation else {
        return Ok(next.run(req).await);
    };
    debug!(
        "匹配操作 {}",
        operation.operation_id.as_deref().unwrap_or(&operation.path)
    );

    let req = if state.validate_requests {
        check_request_body(operation, req, state.body_limit).await?
    } else {
        req
    };

    let response = next.run(req).await;
    if !state.validate_responses {
        return Ok(response);
    }
    check_response(operation, response).await
}

async fn check_request_body(
    operation: &Operation,
    req: Request,
    limit: usize,
) -> Result<Request, CoreError> {
    let Some(spec) = operation.request_body() else {
        return Ok(req);
    };
    if !spec.expects_json() {
        return Ok(req);
    }

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, limit).await.map_err(|e| {
        let status = if exceeds_limit(&e) {
            StatusCode::PAYLOAD_TOO_LARGE
        } else {
            StatusCode::BAD_REQUEST
        };
        CoreError::Validation {
            status,
            message: "request body could not be read".to_string(),
            errors: vec![Violation::new("/body", e.to_string())],
        }
    })?;

    if bytes.is_empty() {
        if spec.required {
            return Err(CoreError::bad_request(
                "request/body is required",
                vec![Violation::new("/body", "request body is required")],
            ));
        }
        return Ok(Request::from_parts(parts, Body::from(bytes)));
    }

    if !is_json(&parts.headers) {
        return Err(CoreError::Validation {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "unsupported media type".to_string(),
            errors: vec![Violation::new(
                "/body",
                "content-type must be application/json",
            )],
        });
    }

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
        CoreError::bad_request(
            "request body is not valid JSON",
            vec![Violation::new("/body", e.to_string())],
        )
    })?;

    let violations = spec.validate(&value);
    if !violations.is_empty() {
        return Err(CoreError::bad_request(summarize(&violations), violations));
    }

    debug!("请求体校验通过: {} {}", operation.method, operation.path);
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

async fn check_response(operation: &Operation, response: Response) -> Result<Response, CoreError> {
    if response.extensions().get::<ErrorRendered>().is_some()
        && !operation.declares(response.status())
    {
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| CoreError::Internal(format!("failed to read response body: {}", e)))?;

    let value = serde_json::from_slice::<Value>(&bytes).ok();
    let violations = operation.validate_response(parts.status, value.as_ref());
    if !violations.is_empty() {
        return Err(CoreError::Validation {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: summarize(&violations),
            errors: violations,
        });
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

/// 读取失败是否由请求体超过上限引起
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if inner.is::<LengthLimitError>() {
            return true;
        }
        source = inner.source();
    }
    false
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("{} {}", v.path, v.message))
        .collect::<Vec<_>>()
        .join(", ")
}

//! 根路径与问候接口

use axum::response::Json;

use crate::core::response::MessageResponse;

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Root path!"))
}

pub async fn hello() -> Json<MessageResponse> {
    Json(MessageResponse::new("Hello from /hello"))
}

//! 用户处理器

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::Json,
};

use super::model::{CreateUserRequest, UpdateUserRequest, User};
use crate::{app::AppState, core::error::CoreError};

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), CoreError> {
    let Json(request) = payload?;
    let user = state.user_service.create_user(request);
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, CoreError> {
    Ok(Json(state.user_service.list_users()?))
}

pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<User>, CoreError> {
    let Path(id) = id?;
    Ok(Json(state.user_service.get_user(id)?))
}

pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, CoreError> {
    let Path(id) = id?;
    let Json(request) = payload?;
    Ok(Json(state.user_service.update_user(id, request)?))
}

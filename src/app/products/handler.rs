//! 产品处理器

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::Json,
};

use super::model::{CreateProductRequest, Product, UpdateProductRequest};
use crate::{app::AppState, core::error::CoreError};

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), CoreError> {
    let Json(request) = payload?;
    let product = state.product_service.create_product(request);
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Product>, CoreError> {
    let Path(id) = id?;
    Ok(Json(state.product_service.get_product(id)?))
}

pub async fn update_product(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<Product>, CoreError> {
    let Path(id) = id?;
    let Json(request) = payload?;
    Ok(Json(state.product_service.update_product(id, request)?))
}

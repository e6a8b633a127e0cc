//! 应用层：路由、处理器、业务服务

pub mod docs;
pub mod home;
pub mod products;
pub mod users;

use std::{any::Any, sync::Arc, time::Duration};

use axum::{
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    core::{
        error::{CoreError, Violation},
        middleware::{openapi_validation_middleware, request_logging_middleware, ValidationState},
    },
    infrastructure::{config::AppConfig, schema::SchemaDocument},
};
use products::ProductService;
use users::UserService;

/// 应用状态，由组合根持有并注入处理器
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub product_service: ProductService,
    pub document: Arc<SchemaDocument>,
    pub docs_path: String,
}

impl AppState {
    /// 使用进程内存储构建状态
    pub fn new(config: &AppConfig, document: SchemaDocument) -> Self {
        let seed = config.storage.seed_sample_data;
        Self {
            user_service: UserService::in_memory(seed),
            product_service: ProductService::in_memory(seed),
            document: Arc::new(document),
            docs_path: config.openapi.docs_path.clone(),
        }
    }
}

/// 构建完整路由
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let validation = ValidationState {
        document: Arc::clone(&state.document),
        docs_path: state.docs_path.clone(),
        validate_requests: config.openapi.validate_requests,
        validate_responses: config.openapi.validate_responses,
        body_limit: config.http.body_limit_bytes,
    };

    let docs_path = state.docs_path.trim_end_matches('/').to_string();

    let router = Router::new()
        .route("/", get(home::root))
        .route("/hello", get(home::hello))
        .route("/users", post(users::handler::create_user))
        .route("/users/all", get(users::handler::list_users))
        .route(
            "/users/:userId",
            get(users::handler::get_user).put(users::handler::update_user),
        )
        .route("/products", post(products::handler::create_product))
        .route(
            "/products/:productId",
            get(products::handler::get_product).put(products::handler::update_product),
        )
        .route(&docs_path, get(docs::swagger_ui))
        .route(&docs::spec_url(&docs_path), get(docs::openapi_json))
        .fallback(fallback);

    guarded(router, validation)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods(cors::Any)
                .allow_headers(cors::Any),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.http.timeout_seconds,
        )))
        .with_state(state)
}

/// 校验层在内，panic 捕获在外：panic 产生的 500 不再经过响应校验
fn guarded<S>(router: Router<S>, validation: ValidationState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn_with_state(
            validation,
            openapi_validation_middleware,
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
}

async fn fallback(uri: axum::http::Uri) -> CoreError {
    CoreError::Validation {
        status: axum::http::StatusCode::NOT_FOUND,
        message: "not found".to_string(),
        errors: vec![Violation::new(uri.path(), "not found")],
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(%detail, "处理器发生 panic");
    CoreError::Internal("Internal Server Error".to_string()).into_response()
}

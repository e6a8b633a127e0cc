use anyhow::Context;
use axum_openapi_store::{
    build_router,
    infrastructure::{config::load_config, logger::Logger},
    AppState, SchemaDocument,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// 单线程运行时：请求处理串行执行
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let (config, source) = load_config()?;
    Logger::init(&config.logging.level)?;

    match source {
        Some(path) => info!("从配置文件加载: {}", path.display()),
        None => info!("未找到配置文件，使用默认配置"),
    }

    let document = SchemaDocument::load(&config.openapi.schema_path).with_context(|| {
        format!(
            "无法加载 schema 文档 {}",
            config.openapi.schema_path.display()
        )
    })?;
    info!(
        "📄 已加载 schema 文档 {}（{}），共 {} 个操作",
        config.openapi.schema_path.display(),
        document.title(),
        document.operations().len()
    );

    let state = AppState::new(&config, document);
    let app = build_router(state, &config);

    let addr = config.http.socket_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法绑定到 {}", addr))?;

    info!("🚀 服务器运行在 http://{}", addr);
    info!("📖 API 文档: http://{}{}", addr, config.openapi.docs_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务器运行失败")?;

    info!("服务器已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("无法监听关闭信号: {}", e);
        std::future::pending::<()>().await;
    }
    info!("收到关闭信号，正在停止...");
}

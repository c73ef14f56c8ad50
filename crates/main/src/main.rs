//! 主应用程序入口
//!
//! 启动在线状态 Hub 服务。

use std::sync::Arc;

use config::AppConfig;
use tracing_subscriber::EnvFilter;
use web_api::{cors_layer, router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // 初始化日志：RUST_LOG 优先，否则使用配置的级别
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = config.validate_security() {
        tracing::warn!(error = %err, "JWT 配置不适用于生产环境");
    }

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
    let state = AppState::in_memory(jwt_service, &config.hub);

    let app = router(state).layer(cors_layer(&config.server.cors_origins));

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!(address = %bind_address, "在线状态服务启动");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("在线状态服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

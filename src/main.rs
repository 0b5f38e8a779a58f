use rfp_matcher::service::pricing::margin_from_f64;
use rfp_matcher::{
    build_router, AppConfig, AppState, CatalogStore, ChatCompletionOracle, MatchSettings,
    MatcherService, RfpStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式 (yyyy-MM-dd HH:mm:ss)，RUST_LOG 可覆盖级别
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    let oracle = Arc::new(ChatCompletionOracle::new(config.oracle.clone())?);
    info!("Reasoning oracle: {} at {}", config.oracle.model, config.oracle.base_url);

    let matcher = Arc::new(MatcherService::new(
        oracle,
        Arc::new(CatalogStore::new()),
        Arc::new(RfpStore::new()),
        MatchSettings::from_config(&config),
    ));

    let default_margin = margin_from_f64(config.matching.default_margin_percent)
        .ok_or("matching.default_margin_percent must be a finite number")?;
    let app = build_router(AppState::new(matcher, default_margin));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/skus/upload-csv      - replace catalog from CSV");
    info!("  POST /api/rfp/analyze          - extract RFP fields and line items");
    info!("  POST /api/rfp/:id/match        - match line items to SKUs");
    info!("  POST /api/rfp/:id/generate     - priced proposal");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

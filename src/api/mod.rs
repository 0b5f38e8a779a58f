pub mod handlers;

pub use handlers::*;

use crate::service::MatcherService;
use axum::{
    routing::{get, post},
    Router,
};
use bigdecimal::BigDecimal;
use std::sync::Arc;
use tower::ServiceBuilder;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<MatcherService>,
    pub default_margin: BigDecimal,
}

impl AppState {
    pub fn new(matcher: Arc<MatcherService>, default_margin: BigDecimal) -> Self {
        Self {
            matcher,
            default_margin,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/skus", get(list_catalog))
        .route("/api/skus/upload-csv", post(upload_catalog))
        .route("/api/rfp/analyze", post(analyze_rfp))
        .route("/api/rfp/:id", get(get_rfp))
        .route("/api/rfp/:id/match", post(match_rfp))
        .route("/api/rfp/:id/generate", post(generate_proposal))
        .route("/api/rfp/:id/proposal.csv", get(proposal_csv))
        .layer(ServiceBuilder::new())
        .with_state(state)
}

use crate::oracle::OracleError;
use crate::store::CatalogCsvError;
use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// 对外暴露的错误
///
/// 单条明细的 oracle 失败不会出现在这里，会在 adapter 中降级为"未匹配"。
#[derive(Debug, Error)]
pub enum AppError {
    #[error("RFP not found: {0}")]
    RfpNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("RFP extraction failed: {0}")]
    Extraction(String),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Catalog CSV rejected: {0}")]
    CatalogCsv(#[from] CatalogCsvError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RfpNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::CatalogCsv(_) => StatusCode::BAD_REQUEST,
            AppError::Extraction(_) | AppError::Oracle(_) => StatusCode::BAD_GATEWAY,
            AppError::Csv(_) | AppError::Config(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "message": format!("Error: {}", self),
        }));
        (status, body).into_response()
    }
}

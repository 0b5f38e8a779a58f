use super::AppState;
use crate::error::{AppError, Result};
use crate::models::{CatalogEntry, Proposal, RfpRecord};
use crate::service::pricing::margin_from_f64;
use crate::service::MatchStats;
use crate::store::{export_proposal_csv, parse_catalog_csv};
use axum::{
    body::Bytes,
    extract::{FromRequest, Json, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bigdecimal::BigDecimal;
use serde::{de, Deserialize, Deserializer, Serialize};

/// multipart 中承载目录文件的字段名
const CATALOG_FILE_FIELD: &str = "file";

/// 请求体: RFP 原文
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub rfp_text: Option<String>,
}

/// 请求体/查询参数: 定价利润率
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginRequest {
    #[serde(default, deserialize_with = "margin_number")]
    pub margin_percent: Option<f64>,
}

/// 数字或数字字符串；其他类型直接报错，不静默回退到默认值
fn margin_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Margin {
        Number(f64),
        Text(String),
    }

    match Option::<Margin>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Margin::Number(n)) => Ok(Some(n)),
        Some(Margin::Text(t)) if t.trim().is_empty() => Ok(None),
        Some(Margin::Text(t)) => t
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("marginPercent is not a number: {:?}", t))),
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogUploadResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
}

/// 匹配响应（含统计信息）
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub success: bool,
    pub message: String,
    pub stats: MatchStats,
    pub rfp: RfpRecord,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 上传 CSV 替换整个 SKU 目录
///
/// 支持 multipart 表单（`file` 字段）或原始 CSV 请求体
/// （`text/*`、`application/octet-stream` 或未带 content type）。
pub async fn upload_catalog(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<CatalogUploadResponse>)> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let body = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        read_catalog_field(multipart).await?
    } else if content_type.is_empty()
        || content_type.starts_with("text/")
        || content_type.starts_with("application/octet-stream")
    {
        Bytes::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
    } else {
        return Err(AppError::BadRequest(format!(
            "Unsupported content type for catalog upload: {}",
            content_type
        )));
    };

    if body.is_empty() {
        return Err(AppError::BadRequest("No file uploaded".to_string()));
    }

    let entries = parse_catalog_csv(body.as_ref())?;
    let count = state.matcher.catalog().replace(entries);

    let response = CatalogUploadResponse {
        success: true,
        message: format!("Successfully loaded {} SKUs", count),
        count,
    };
    Ok((StatusCode::OK, Json(response)))
}

async fn read_catalog_field(mut multipart: Multipart) -> Result<Bytes> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() == Some(CATALOG_FILE_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()));
        }
    }
    Err(AppError::BadRequest("No file uploaded".to_string()))
}

/// 当前目录快照
pub async fn list_catalog(State(state): State<AppState>) -> Json<Vec<CatalogEntry>> {
    let snapshot = state.matcher.catalog().snapshot();
    Json(snapshot.as_ref().clone())
}

/// 解析 RFP 原文，生成并保存带明细的记录
pub async fn analyze_rfp(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<RfpRecord>> {
    let text = req
        .rfp_text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("No RFP text provided".to_string()))?;

    let record = state.matcher.analyze(&text).await?;
    Ok(Json(record))
}

pub async fn get_rfp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RfpRecord>> {
    state
        .matcher
        .rfps()
        .get(&id)
        .map(Json)
        .ok_or(AppError::RfpNotFound(id))
}

/// 将 RFP 的全部明细与目录匹配
pub async fn match_rfp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MatchResponse>> {
    let (rfp, stats) = state.matcher.match_rfp(&id).await?;
    let response = MatchResponse {
        success: true,
        message: format!(
            "Matched {} of {} line items",
            stats.matched_items, stats.total_items
        ),
        stats,
        rfp,
    };
    Ok(Json(response))
}

/// 为已匹配明细定价并生成报价单
///
/// 请求体为空时使用默认利润率；请求体存在但不是合法的
/// `MarginRequest` 时返回 400。
pub async fn generate_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Proposal>> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        MarginRequest::default()
    } else {
        serde_json::from_slice::<MarginRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid margin request: {}", e)))?
    };
    let margin = resolve_margin(&state, req.margin_percent)?;
    let proposal = state.matcher.generate_proposal(&id, &margin).await?;
    Ok(Json(proposal))
}

/// 以 CSV 导出已定价的报价明细
pub async fn proposal_csv(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(req): Query<MarginRequest>,
) -> Result<Response> {
    let margin = resolve_margin(&state, req.margin_percent)?;
    let proposal = state.matcher.generate_proposal(&id, &margin).await?;

    let mut out = Vec::new();
    export_proposal_csv(&proposal, &mut out)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        out,
    )
        .into_response())
}

fn resolve_margin(state: &AppState, requested: Option<f64>) -> Result<BigDecimal> {
    match requested {
        Some(margin) => margin_from_f64(margin)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid margin percent: {}", margin))),
        None => Ok(state.default_margin.clone()),
    }
}

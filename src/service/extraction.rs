use crate::error::{AppError, Result};
use crate::models::line_item::lenient_quantity;
use crate::models::{LineItemRequest, RfpDetails};
use crate::oracle::{complete_with_policy, parse_json_payload, prompts, CallPolicy, ReasoningOracle};
use bigdecimal::BigDecimal;
use serde::Deserialize;

/// oracle 抽取的明细（尚未分配 ID）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLine {
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: Option<BigDecimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 裸数组，或包在对象里的数组
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExtractedLines {
    List(Vec<ExtractedLine>),
    Wrapped {
        #[serde(alias = "lineItems", alias = "line_items")]
        items: Vec<ExtractedLine>,
    },
}

impl ExtractedLines {
    fn into_vec(self) -> Vec<ExtractedLine> {
        match self {
            ExtractedLines::List(items) | ExtractedLines::Wrapped { items } => items,
        }
    }
}

/// 从 RFP 原文中抽取采购方、截止日期、摘要和要求
///
/// 与明细匹配不同，失败时整个请求失败：没有概要信息就无法保存记录。
pub async fn analyze_rfp(
    oracle: &dyn ReasoningOracle,
    rfp_text: &str,
    policy: &CallPolicy,
) -> Result<RfpDetails> {
    let raw = complete_with_policy(oracle, &prompts::analyze_request(rfp_text), policy).await?;
    parse_json_payload::<RfpDetails>(&raw).map_err(|e| {
        tracing::warn!("RFP analysis from {} unparseable: {}", oracle.model_name(), e);
        AppError::Extraction(e.to_string())
    })
}

/// 抽取需求明细；任何失败都返回空列表
pub async fn extract_line_items(
    oracle: &dyn ReasoningOracle,
    rfp_text: &str,
    policy: &CallPolicy,
) -> Vec<ExtractedLine> {
    let request = prompts::extract_request(rfp_text);
    let raw = match complete_with_policy(oracle, &request, policy).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Line item extraction via {} failed: {}", oracle.model_name(), e);
            return Vec::new();
        }
    };

    match parse_json_payload::<ExtractedLines>(&raw) {
        Ok(lines) => lines
            .into_vec()
            .into_iter()
            .filter(|line| !line.description.trim().is_empty())
            .collect(),
        Err(e) => {
            tracing::warn!("Line item extraction from {} unparseable: {}", oracle.model_name(), e);
            Vec::new()
        }
    }
}

/// 为抽取的明细分配 `{rfp_id}-L{index}` 形式的 ID
pub fn into_requests(rfp_id: &str, lines: Vec<ExtractedLine>) -> Vec<LineItemRequest> {
    lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| LineItemRequest {
            id: format!("{}-L{}", rfp_id, index),
            description: line.description.trim().to_string(),
            quantity: line.quantity,
            unit: line.unit.filter(|u| !u.trim().is_empty()),
            notes: line.notes.filter(|n| !n.trim().is_empty()),
        })
        .collect()
}

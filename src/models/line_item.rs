use super::CatalogEntry;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// 从 RFP 中抽取的需求明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub id: String,
    pub description: String,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: Option<BigDecimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LineItemRequest {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            quantity: None,
            unit: None,
            notes: None,
        }
    }

    pub fn with_quantity(mut self, quantity: BigDecimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// 候选筛选使用的查询文本
    pub fn query_text(&self) -> String {
        match &self.notes {
            Some(notes) if !notes.trim().is_empty() => format!("{} {}", self.description, notes),
            _ => self.description.clone(),
        }
    }
}

/// 带匹配与定价结果的明细
///
/// 定价字段由 `matched_entry` 推导，每次重新匹配都会清空。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLineItem {
    #[serde(flatten)]
    pub request: LineItemRequest,
    pub matched_entry: Option<CatalogEntry>,
    pub confidence: Option<u8>,
    pub rationale: Option<String>,
    pub unit_price: Option<BigDecimal>,
    pub total_price: Option<BigDecimal>,
}

impl ResolvedLineItem {
    /// 刚抽取的明细，尚未匹配和定价
    pub fn pending(request: LineItemRequest) -> Self {
        Self {
            request,
            matched_entry: None,
            confidence: None,
            rationale: None,
            unit_price: None,
            total_price: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_entry.is_some()
    }
}

/// 接受 JSON 数字、数字字符串或 null；其他视为未知
pub fn lenient_quantity<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }))
}

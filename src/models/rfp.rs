use super::ResolvedLineItem;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// oracle 从 RFP 原文中抽取的概要字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RfpDetails {
    pub name: Option<String>,
    pub buyer_name: Option<String>,
    pub deadline: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(deserialize_with = "null_as_default")]
    pub key_requirements: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub disqualifying_conditions: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 已保存的 RFP 及其明细
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RfpRecord {
    pub id: String,
    #[serde(flatten)]
    pub details: RfpDetails,
    pub raw_text: String,
    pub line_items: Vec<ResolvedLineItem>,
    pub created_at: DateTime<Utc>,
}

/// 交给文档生成的报价单
///
/// 所有金额均为最终值，渲染端不得重新计算。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub rfp_id: String,
    pub buyer_name: Option<String>,
    pub deadline: Option<String>,
    pub summary: String,
    pub key_requirements: Vec<String>,
    pub margin_percent: BigDecimal,
    pub line_items: Vec<ResolvedLineItem>,
    pub subtotal: BigDecimal,
    pub unmatched_count: usize,
}

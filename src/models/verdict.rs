use serde::{Deserialize, Serialize};

/// 未选中 SKU 时置信度上限
pub const NO_MATCH_CONFIDENCE_CAP: u8 = 20;

pub const UNPARSEABLE_RATIONALE: &str = "oracle failed to produce a parseable verdict";
pub const NO_CANDIDATES_RATIONALE: &str = "no catalog candidates available";

/// 单条明细的 oracle 判定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchVerdict {
    pub chosen_code: Option<String>,
    pub confidence: u8,
    pub rationale: String,
}

impl MatchVerdict {
    pub fn no_match(confidence: u8, rationale: impl Into<String>) -> Self {
        Self {
            chosen_code: None,
            confidence: confidence.min(NO_MATCH_CONFIDENCE_CAP),
            rationale: rationale.into(),
        }
    }

    /// oracle 输出完全无法使用时的兜底结果
    pub fn unparseable() -> Self {
        Self::no_match(0, UNPARSEABLE_RATIONALE)
    }

    pub fn no_candidates() -> Self {
        Self::no_match(0, NO_CANDIDATES_RATIONALE)
    }
}

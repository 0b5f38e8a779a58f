use crate::models::MatchVerdict;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json(.*?)```").expect("valid json fence pattern"));
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid fence pattern"));

const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no parseable JSON payload in oracle output: {preview:?}")]
pub struct ParseFailure {
    pub preview: String,
}

impl ParseFailure {
    fn from_raw(raw: &str) -> Self {
        Self {
            preview: raw.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// 从 oracle 自由文本中提取类型为 `T` 的 JSON
///
/// 依次尝试: 整个响应、第一个 ```json 代码块、其余所有代码块
/// （跳过开头的语言标签行）。
pub fn parse_json_payload<T: DeserializeOwned>(raw: &str) -> Result<T, ParseFailure> {
    if let Ok(value) = serde_json::from_str::<T>(raw.trim()) {
        return Ok(value);
    }

    if let Some(body) = JSON_FENCE.captures(raw).and_then(|c| c.get(1)) {
        match serde_json::from_str::<T>(body.as_str().trim()) {
            Ok(value) => return Ok(value),
            Err(e) => tracing::debug!("json fence did not parse: {}", e),
        }
    }

    for captures in ANY_FENCE.captures_iter(raw) {
        let Some(body) = captures.get(1) else {
            continue;
        };
        let body = body.as_str();
        if let Ok(value) = serde_json::from_str::<T>(body.trim()) {
            return Ok(value);
        }
        if let Some((label, rest)) = body.split_once('\n') {
            if !label.contains('{') && !label.contains('[') {
                if let Ok(value) = serde_json::from_str::<T>(rest.trim()) {
                    return Ok(value);
                }
            }
        }
    }

    Err(ParseFailure::from_raw(raw))
}

/// 所选编码字段名，按优先级排列
const CODE_KEYS: &[&str] = &[
    "chosenSkuCode",
    "chosenCode",
    "chosen_sku_code",
    "chosen_code",
    "skuCode",
];

/// oracle 原始判定: 字段类型宽松的 JSON 对象
///
/// 只接受对象。可同时出现多个编码字段，按 `CODE_KEYS` 顺序取第一个。
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct RawVerdict(Map<String, Value>);

impl RawVerdict {
    fn into_verdict(self) -> MatchVerdict {
        let fields = self.0;

        let chosen_code = match CODE_KEYS.iter().find_map(|key| fields.get(*key)) {
            Some(Value::String(code)) => Some(code.trim().to_string()).filter(|c| !c.is_empty()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let confidence = fields.get("confidence").map(confidence_from).unwrap_or(0);

        let rationale = match fields.get("rationale") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        match chosen_code {
            Some(code) => MatchVerdict {
                chosen_code: Some(code),
                confidence,
                rationale,
            },
            None => MatchVerdict::no_match(confidence, rationale),
        }
    }
}

/// 整数、浮点或数字字符串，四舍五入并限制在 0..=100
fn confidence_from(value: &Value) -> u8 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

/// 解析 oracle 的匹配判定
///
/// 未选中编码的判定，置信度不超过
/// [`NO_MATCH_CONFIDENCE_CAP`](crate::models::verdict::NO_MATCH_CONFIDENCE_CAP)
pub fn parse_verdict(raw: &str) -> Result<MatchVerdict, ParseFailure> {
    parse_json_payload::<RawVerdict>(raw).map(RawVerdict::into_verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::verdict::{NO_MATCH_CONFIDENCE_CAP, UNPARSEABLE_RATIONALE};

    #[test]
    fn test_direct_json() {
        let verdict =
            parse_verdict(r#"{"chosenSkuCode":"W1","confidence":88,"rationale":"exact pack size"}"#)
                .unwrap();
        assert_eq!(verdict.chosen_code.as_deref(), Some("W1"));
        assert_eq!(verdict.confidence, 88);
        assert_eq!(verdict.rationale, "exact pack size");
    }

    #[test]
    fn test_json_fence_with_chatter() {
        let raw = "Sure! ```json\n{\"chosenSkuCode\":\"A1\",\"confidence\":70,\"rationale\":\"pack size matches\"}\n```";
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(
            verdict,
            MatchVerdict {
                chosen_code: Some("A1".to_string()),
                confidence: 70,
                rationale: "pack size matches".to_string(),
            }
        );
    }

    #[test]
    fn test_unlabelled_and_other_label_fences() {
        let raw = "Here you go:\n```\n{\"chosenCode\":\"B2\",\"confidence\":\"55\"}\n```\nthanks";
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.chosen_code.as_deref(), Some("B2"));
        assert_eq!(verdict.confidence, 55);

        let raw = "```javascript\n{\"chosen_sku_code\":\"C3\",\"confidence\":61.6}\n```";
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.chosen_code.as_deref(), Some("C3"));
        assert_eq!(verdict.confidence, 62);
    }

    #[test]
    fn test_bad_json_fence_falls_through_to_next_fence() {
        let raw = "```json\n{not json}\n```\nretry:\n```\n{\"chosenSkuCode\":\"D4\",\"confidence\":40}\n```";
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.chosen_code.as_deref(), Some("D4"));
    }

    #[test]
    fn test_garbage_is_a_parse_failure() {
        assert!(parse_verdict("I could not decide, sorry.").is_err());
        assert!(parse_verdict("").is_err());
        assert!(parse_verdict("```\nstill not json\n```").is_err());
        assert_eq!(MatchVerdict::unparseable().rationale, UNPARSEABLE_RATIONALE);
        assert_eq!(MatchVerdict::unparseable().confidence, 0);
    }

    #[test]
    fn test_null_choice_caps_confidence() {
        let verdict =
            parse_verdict(r#"{"chosenSkuCode":null,"confidence":90,"rationale":"nothing fits"}"#)
                .unwrap();
        assert_eq!(verdict.chosen_code, None);
        assert_eq!(verdict.confidence, NO_MATCH_CONFIDENCE_CAP);

        let verdict = parse_verdict(r#"{"chosenSkuCode":"  ","confidence":5}"#).unwrap();
        assert_eq!(verdict.chosen_code, None);
        assert_eq!(verdict.confidence, 5);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let verdict = parse_verdict(r#"{"chosenSkuCode":"A1","confidence":250}"#).unwrap();
        assert_eq!(verdict.confidence, 100);
        let verdict = parse_verdict(r#"{"chosenSkuCode":"A1","confidence":-3}"#).unwrap();
        assert_eq!(verdict.confidence, 0);
        let verdict = parse_verdict(r#"{"chosenSkuCode":"A1","confidence":"80%"}"#).unwrap();
        assert_eq!(verdict.confidence, 80);
        let verdict = parse_verdict(r#"{"chosenSkuCode":"A1"}"#).unwrap();
        assert_eq!(verdict.confidence, 0);
    }

    #[test]
    fn test_repeated_code_keys_take_priority_order() {
        let verdict = parse_verdict(
            r#"{"chosenSkuCode":"A1","skuCode":"A1","confidence":75,"rationale":"both keys"}"#,
        )
        .unwrap();
        assert_eq!(verdict.chosen_code.as_deref(), Some("A1"));
        assert_eq!(verdict.confidence, 75);

        let verdict =
            parse_verdict(r#"{"skuCode":"B2","chosenCode":"A1","confidence":60}"#).unwrap();
        assert_eq!(verdict.chosen_code.as_deref(), Some("A1"));
    }

    #[test]
    fn test_verdict_must_be_an_object() {
        assert!(parse_verdict(r#"["A1",99,"positional"]"#).is_err());
        assert!(parse_verdict(r#"```json
["A1", 99]
```"#).is_err());
        assert!(parse_verdict("42").is_err());
    }

    #[test]
    fn test_payload_helper_for_arrays() {
        let raw = "```json\n[{\"description\":\"gloves\"}]\n```";
        let items: Vec<Value> = parse_json_payload(raw).unwrap();
        assert_eq!(items.len(), 1);
    }
}

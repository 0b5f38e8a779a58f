use super::{parse_verdict, prompts, OracleError, OracleRequest, ReasoningOracle};
use crate::config::MatchingConfig;
use crate::models::{CatalogEntry, LineItemRequest, MatchVerdict};
use std::time::Duration;

/// 单次 oracle 调用的超时与重试配置
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl CallPolicy {
    pub fn new(timeout: Duration, max_retries: u32, backoff: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            backoff,
        }
    }

    pub fn from_config(timeout_secs: u64, matching: &MatchingConfig) -> Self {
        Self::new(
            Duration::from_secs(timeout_secs),
            matching.max_retries,
            Duration::from_millis(matching.retry_backoff_ms),
        )
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 2, Duration::from_millis(250))
    }
}

/// 带超时调用 oracle，临时性错误按指数退避重试
pub async fn complete_with_policy(
    oracle: &dyn ReasoningOracle,
    request: &OracleRequest,
    policy: &CallPolicy,
) -> Result<String, OracleError> {
    let mut attempt: u32 = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout, oracle.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(policy.timeout)),
        };

        match result {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.backoff * 2u32.saturating_pow(attempt);
                attempt += 1;
                tracing::warn!(
                    "Oracle call failed ({}), retry {}/{} in {:?}",
                    e,
                    attempt,
                    policy.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 让 oracle 在候选集中为明细选择 SKU
///
/// 不会返回错误：候选为空、调用失败或输出无法解析时，
/// 仅该明细得到"未匹配"结果。
/// 结果不可信，调用方仍需校验所选编码是否在 `candidates` 中。
pub async fn match_line_item(
    oracle: &dyn ReasoningOracle,
    item: &LineItemRequest,
    candidates: &[CatalogEntry],
    policy: &CallPolicy,
) -> MatchVerdict {
    if candidates.is_empty() {
        return MatchVerdict::no_candidates();
    }

    let request = prompts::match_request(item, candidates);
    let raw = match complete_with_policy(oracle, &request, policy).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(
                "Line item {}: oracle {} call failed: {}",
                item.id,
                oracle.model_name(),
                e
            );
            return MatchVerdict::unparseable();
        }
    };

    tracing::debug!(
        "Line item {}: raw verdict from {}: {:?}",
        item.id,
        oracle.model_name(),
        raw
    );

    match parse_verdict(&raw) {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::warn!("Line item {}: {} ({})", item.id, e, oracle.model_name());
            MatchVerdict::unparseable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::verdict::{NO_CANDIDATES_RATIONALE, UNPARSEABLE_RATIONALE};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 按顺序回放预设结果，用完后重复最后一个
    struct ScriptedOracle {
        script: Mutex<Vec<Result<String, OracleError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new(script: Vec<Result<String, OracleError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReasoningOracle for ScriptedOracle {
        async fn complete(&self, _request: &OracleRequest) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                match &script[0] {
                    Ok(text) => Ok(text.clone()),
                    Err(_) => Err(OracleError::Unavailable("scripted".to_string())),
                }
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl ReasoningOracle for SlowOracle {
        async fn complete(&self, _request: &OracleRequest) -> Result<String, OracleError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(r#"{"chosenSkuCode":"A1","confidence":99}"#.to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    fn quick_policy(max_retries: u32) -> CallPolicy {
        CallPolicy::new(Duration::from_secs(5), max_retries, Duration::from_millis(1))
    }

    fn candidates() -> Vec<CatalogEntry> {
        vec![CatalogEntry::new("A1", "Still water").with_pack_size("500ml")]
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_the_oracle() {
        let oracle = ScriptedOracle::new(vec![Ok("{}".to_string())]);
        let item = LineItemRequest::new("r-L0", "water");
        let verdict = match_line_item(&oracle, &item, &[], &quick_policy(0)).await;
        assert_eq!(verdict.chosen_code, None);
        assert_eq!(verdict.confidence, 0);
        assert_eq!(verdict.rationale, NO_CANDIDATES_RATIONALE);
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_garbage_output_degrades_to_no_match() {
        let oracle = ScriptedOracle::new(vec![Ok("the second one, probably".to_string())]);
        let item = LineItemRequest::new("r-L0", "water");
        let verdict = match_line_item(&oracle, &item, &candidates(), &quick_policy(0)).await;
        assert_eq!(verdict, MatchVerdict::unparseable());
        assert_eq!(verdict.rationale, UNPARSEABLE_RATIONALE);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let oracle = ScriptedOracle::new(vec![
            Err(OracleError::Unavailable("connection reset".to_string())),
            Ok(r#"{"chosenSkuCode":"A1","confidence":75,"rationale":"same pack"}"#.to_string()),
        ]);
        let item = LineItemRequest::new("r-L0", "water");
        let verdict = match_line_item(&oracle, &item, &candidates(), &quick_policy(2)).await;
        assert_eq!(verdict.chosen_code.as_deref(), Some("A1"));
        assert_eq!(verdict.confidence, 75);
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let oracle = ScriptedOracle::new(vec![Err(OracleError::Unavailable("down".to_string()))]);
        let item = LineItemRequest::new("r-L0", "water");
        let verdict = match_line_item(&oracle, &item, &candidates(), &quick_policy(2)).await;
        assert_eq!(verdict, MatchVerdict::unparseable());
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let oracle = ScriptedOracle::new(vec![
            Err(OracleError::Status {
                status: 401,
                body: "bad key".to_string(),
            }),
            Ok(r#"{"chosenSkuCode":"A1","confidence":75}"#.to_string()),
        ]);
        let item = LineItemRequest::new("r-L0", "water");
        let verdict = match_line_item(&oracle, &item, &candidates(), &quick_policy(3)).await;
        assert_eq!(verdict, MatchVerdict::unparseable());
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_parse_failure() {
        let item = LineItemRequest::new("r-L0", "water");
        let policy = CallPolicy::new(Duration::from_secs(2), 0, Duration::from_millis(1));
        let verdict = match_line_item(&SlowOracle, &item, &candidates(), &policy).await;
        assert_eq!(verdict, MatchVerdict::unparseable());
    }
}

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::{
    CatalogEntry, LineItemRequest, MatchVerdict, Proposal, ResolvedLineItem, RfpRecord,
};
use crate::oracle::{match_line_item, CallPolicy, ReasoningOracle};
use crate::service::candidates::select_candidates;
use crate::service::extraction;
use crate::service::pricing::enrich_all;
use crate::store::{CatalogStore, RfpStore};
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

/// 单批匹配参数
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub candidate_limit: usize,
    pub max_concurrency: usize,
    pub call_policy: CallPolicy,
}

impl MatchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            candidate_limit: config.matching.candidate_limit,
            max_concurrency: config.matching.max_concurrency,
            call_policy: CallPolicy::from_config(config.oracle.timeout_secs, &config.matching),
        }
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            candidate_limit: 5,
            max_concurrency: 8,
            call_policy: CallPolicy::default(),
        }
    }
}

/// 匹配统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub total_items: usize,
    pub matched_items: usize,
    pub unmatched_items: usize,
    pub catalog_size: usize,
}

impl MatchStats {
    fn from_items(items: &[ResolvedLineItem], catalog_size: usize) -> Self {
        let matched_items = items.iter().filter(|i| i.is_matched()).count();
        Self {
            total_items: items.len(),
            matched_items,
            unmatched_items: items.len() - matched_items,
            catalog_size,
        }
    }
}

/// 用提供给 oracle 的候选集校验其判定
///
/// 不在 `candidates` 中的编码一律不可信：明细保持未匹配，置信度置 0。
/// 定价字段保持为空。
pub fn resolve_verdict(
    request: LineItemRequest,
    verdict: MatchVerdict,
    candidates: &[CatalogEntry],
) -> ResolvedLineItem {
    let mut resolved = ResolvedLineItem::pending(request);

    let Some(code) = verdict.chosen_code else {
        resolved.confidence = Some(verdict.confidence);
        resolved.rationale = Some(verdict.rationale);
        return resolved;
    };

    match candidates.iter().find(|c| c.code == code) {
        Some(entry) => {
            resolved.matched_entry = Some(entry.clone());
            resolved.confidence = Some(verdict.confidence);
            resolved.rationale = Some(verdict.rationale);
        }
        None => {
            tracing::warn!(
                "Line item {}: oracle chose {} which was not among {} candidates",
                resolved.request.id,
                code,
                candidates.len()
            );
            resolved.confidence = Some(0);
            resolved.rationale = Some(format!(
                "oracle referenced SKU {} outside the candidate set",
                code
            ));
        }
    }

    resolved
}

/// 匹配服务
pub struct MatcherService {
    oracle: Arc<dyn ReasoningOracle>,
    catalog: Arc<CatalogStore>,
    rfps: Arc<RfpStore>,
    settings: MatchSettings,
}

impl MatcherService {
    pub fn new(
        oracle: Arc<dyn ReasoningOracle>,
        catalog: Arc<CatalogStore>,
        rfps: Arc<RfpStore>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            oracle,
            catalog,
            rfps,
            settings,
        }
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn rfps(&self) -> &RfpStore {
        &self.rfps
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// 在目录快照上匹配单条明细
    pub async fn match_one(
        &self,
        item: &LineItemRequest,
        catalog: &[CatalogEntry],
    ) -> ResolvedLineItem {
        let candidates =
            select_candidates(&item.query_text(), catalog, self.settings.candidate_limit);
        let verdict = match_line_item(
            self.oracle.as_ref(),
            item,
            &candidates,
            &self.settings.call_policy,
        )
        .await;
        resolve_verdict(item.clone(), verdict, &candidates)
    }

    /// 并发、独立地匹配所有明细
    ///
    /// 同时最多 `max_concurrency` 个 oracle 调用，结果按输入顺序返回；
    /// 单条失败只降级为"未匹配"，不影响其他明细。
    pub async fn match_all(
        &self,
        items: &[LineItemRequest],
        catalog: &[CatalogEntry],
    ) -> Vec<ResolvedLineItem> {
        let concurrency = self.settings.max_concurrency.max(1);

        // 按下标取明细，避免 future 捕获高阶生命周期借用
        let mut results: Vec<(usize, ResolvedLineItem)> = stream::iter(0..items.len())
            .map(|idx| {
                let item = &items[idx];
                async move { (idx, self.match_one(item, catalog).await) }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, item)| item).collect()
    }

    /// 调用 oracle 解析 RFP 原文并保存新记录
    pub async fn analyze(&self, rfp_text: &str) -> Result<RfpRecord> {
        if rfp_text.trim().is_empty() {
            return Err(AppError::BadRequest("No RFP text provided".to_string()));
        }

        let policy = &self.settings.call_policy;
        let (details, lines) = tokio::join!(
            extraction::analyze_rfp(self.oracle.as_ref(), rfp_text, policy),
            extraction::extract_line_items(self.oracle.as_ref(), rfp_text, policy),
        );
        let details = details?;

        let id = uuid::Uuid::new_v4().to_string();
        let line_items = extraction::into_requests(&id, lines)
            .into_iter()
            .map(ResolvedLineItem::pending)
            .collect::<Vec<_>>();

        tracing::info!("RFP {} analyzed: {} line items", id, line_items.len());

        let record = RfpRecord {
            id,
            details,
            raw_text: rfp_text.to_string(),
            line_items,
            created_at: Utc::now(),
        };
        self.rfps.insert(record.clone());
        Ok(record)
    }

    /// 基于同一份目录快照匹配已保存 RFP 的全部明细
    pub async fn match_rfp(&self, rfp_id: &str) -> Result<(RfpRecord, MatchStats)> {
        let mut record = self
            .rfps
            .get(rfp_id)
            .ok_or_else(|| AppError::RfpNotFound(rfp_id.to_string()))?;

        // 整批共用一份快照，目录重载只影响之后的批次
        let catalog = self.catalog.snapshot();
        let requests: Vec<LineItemRequest> =
            record.line_items.iter().map(|li| li.request.clone()).collect();

        tracing::info!(
            "RFP {}: matching {} line items against {} SKUs",
            rfp_id,
            requests.len(),
            catalog.len()
        );

        let resolved = self.match_all(&requests, &catalog).await;
        let stats = MatchStats::from_items(&resolved, catalog.len());

        if !self.rfps.update_line_items(rfp_id, resolved.clone()) {
            return Err(AppError::RfpNotFound(rfp_id.to_string()));
        }
        record.line_items = resolved;

        tracing::info!(
            "RFP {}: matched {}/{} line items",
            rfp_id,
            stats.matched_items,
            stats.total_items
        );

        Ok((record, stats))
    }

    /// 为已保存 RFP 的已匹配明细定价
    ///
    /// 已匹配条目按编码在当前目录中重新查找，价格始终跟随最新成本。
    pub async fn generate_proposal(
        &self,
        rfp_id: &str,
        margin_percent: &BigDecimal,
    ) -> Result<Proposal> {
        let record = self
            .rfps
            .get(rfp_id)
            .ok_or_else(|| AppError::RfpNotFound(rfp_id.to_string()))?;

        let catalog = self.catalog.snapshot();
        let refreshed: Vec<ResolvedLineItem> = record
            .line_items
            .iter()
            .map(|item| refresh_entry(item, &catalog))
            .collect();

        let line_items = enrich_all(&refreshed, margin_percent);
        let subtotal = line_items
            .iter()
            .filter_map(|item| item.total_price.as_ref())
            .fold(BigDecimal::zero(), |acc, total| acc + total);
        let unmatched_count = line_items.iter().filter(|item| !item.is_matched()).count();

        tracing::info!(
            "RFP {}: proposal at {}% margin, subtotal {}, {} unmatched",
            rfp_id,
            margin_percent,
            subtotal,
            unmatched_count
        );

        Ok(Proposal {
            rfp_id: record.id,
            buyer_name: record.details.buyer_name,
            deadline: record.details.deadline,
            summary: record.details.summary,
            key_requirements: record.details.key_requirements,
            margin_percent: margin_percent.clone(),
            line_items,
            subtotal,
            unmatched_count,
        })
    }
}

/// 用当前目录中的版本替换已匹配条目
fn refresh_entry(item: &ResolvedLineItem, catalog: &[CatalogEntry]) -> ResolvedLineItem {
    let mut refreshed = item.clone();
    let Some(entry) = &item.matched_entry else {
        return refreshed;
    };

    match catalog.iter().find(|c| c.code == entry.code) {
        Some(current) => refreshed.matched_entry = Some(current.clone()),
        None => {
            tracing::warn!(
                "Line item {}: SKU {} is no longer in the catalog",
                item.request.id,
                entry.code
            );
            refreshed.matched_entry = None;
            refreshed.confidence = Some(0);
            refreshed.rationale = Some(format!("SKU {} is no longer in the catalog", entry.code));
        }
    }
    refreshed
}

use crate::models::CatalogEntry;
use crate::service::tokenizer::tokenize;
use indexmap::IndexSet;
use rayon::prelude::*;

/// 目录条目及其词重合得分
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate<'a> {
    pub entry: &'a CatalogEntry,
    pub score: usize,
}

/// 对全部目录条目打分，按得分从高到低
///
/// 得分 = 条目 名称/描述/类别/规格 中命中的不同查询 token 数。
/// 同分保持目录顺序。
pub fn score_candidates<'a>(query: &str, catalog: &'a [CatalogEntry]) -> Vec<ScoredCandidate<'a>> {
    let query_tokens = tokenize(query);
    let mut scored = score_against(&query_tokens, catalog);
    // 稳定排序：同分保持目录顺序
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// 为单条明细筛选最多 `limit` 个候选
///
/// 0 分条目也会补足列表，让 oracle 总有可以明确拒绝的候选。
/// 查询无 token 时直接返回目录前若干条，不打分。
pub fn select_candidates(query: &str, catalog: &[CatalogEntry], limit: usize) -> Vec<CatalogEntry> {
    if catalog.is_empty() || limit == 0 {
        return Vec::new();
    }

    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return catalog.iter().take(limit).cloned().collect();
    }

    let mut scored = score_against(&query_tokens, catalog);
    scored.sort_by(|a, b| b.score.cmp(&a.score));

    if tracing::enabled!(tracing::Level::DEBUG) {
        let top: Vec<String> = scored
            .iter()
            .take(limit)
            .map(|c| format!("{}={}", c.entry.code, c.score))
            .collect();
        tracing::debug!("Candidates for {:?}: [{}]", query, top.join(", "));
    }

    scored
        .into_iter()
        .take(limit)
        .map(|c| c.entry.clone())
        .collect()
}

fn score_against<'a>(
    query_tokens: &IndexSet<String>,
    catalog: &'a [CatalogEntry],
) -> Vec<ScoredCandidate<'a>> {
    // 并行 collect 保持目录顺序
    catalog
        .par_iter()
        .map(|entry| {
            let entry_tokens = tokenize(&entry.search_text());
            let score = query_tokens
                .iter()
                .filter(|token| entry_tokens.contains(*token))
                .count();
            ScoredCandidate { entry, score }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn catalog() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::new("C1", "Copy paper")
                .with_category("Office")
                .with_pack_size("500 sheets"),
            CatalogEntry::new("W1", "Still water")
                .with_description("PET bottle")
                .with_pack_size("500ml"),
            CatalogEntry::new("W2", "Still water")
                .with_description("Glass bottle")
                .with_pack_size("750ml"),
            CatalogEntry::new("G1", "Nitrile gloves")
                .with_category("Safety")
                .with_pack_size("100 pcs"),
            CatalogEntry::new("W3", "Sparkling water")
                .with_description("PET bottle")
                .with_pack_size("500ml"),
        ]
    }

    fn codes(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.code.as_str()).collect()
    }

    #[test]
    fn test_best_overlap_first() {
        let selected = select_candidates("Still water 500ml PET bottles", &catalog(), 3);
        // W1: still, water, 500ml, pet = 4; W3: water, 500ml, pet = 3; W2: still, water = 2
        assert_eq!(codes(&selected), vec!["W1", "W3", "W2"]);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let selected = select_candidates("water", &catalog(), 5);
        assert_eq!(codes(&selected), vec!["W1", "W2", "W3", "C1", "G1"]);
    }

    #[test]
    fn test_zero_score_entries_fill_the_limit() {
        let catalog = catalog();
        let selected = select_candidates("gloves", &catalog, 3);
        assert_eq!(codes(&selected), vec!["G1", "C1", "W1"]);

        let scored = score_candidates("gloves", &catalog);
        assert_eq!(scored[0].score, 1);
        assert!(scored[1..].iter().all(|c| c.score == 0));
    }

    #[test]
    fn test_empty_query_returns_catalog_head() {
        let selected = select_candidates("--- ???", &catalog(), 2);
        assert_eq!(codes(&selected), vec!["C1", "W1"]);
    }

    #[test]
    fn test_empty_catalog() {
        assert!(select_candidates("water", &[], 5).is_empty());
        assert!(select_candidates("", &[], 5).is_empty());
    }

    #[test]
    fn test_repeated_selection_is_identical() {
        let catalog = catalog();
        let first = select_candidates("bottle 500ml", &catalog, 4);
        let second = select_candidates("bottle 500ml", &catalog, 4);
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn prop_selection_respects_limit(query in "[a-z0-9 ]{0,30}", limit in 0usize..10) {
            let catalog = catalog();
            let selected = select_candidates(&query, &catalog, limit);
            prop_assert_eq!(selected.len(), limit.min(catalog.len()));
        }
    }
}

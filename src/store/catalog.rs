use crate::models::CatalogEntry;
use indexmap::IndexSet;
use std::sync::{Arc, PoisonError, RwLock};

/// 全局 SKU 目录，每次重载整体替换
///
/// 读取方拿到 `Arc` 快照；重载只替换指针，不影响已发出的快照。
#[derive(Debug, Default)]
pub struct CatalogStore {
    entries: RwLock<Arc<Vec<CatalogEntry>>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        let store = Self::new();
        store.replace(entries);
        store
    }

    /// 整批匹配使用的不可变视图
    pub fn snapshot(&self) -> Arc<Vec<CatalogEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 替换为新目录，返回条目数
    pub fn replace(&self, entries: Vec<CatalogEntry>) -> usize {
        let duplicates = duplicate_codes(&entries);
        if !duplicates.is_empty() {
            tracing::warn!(
                "Catalog has {} duplicate SKU codes, first occurrence wins: {:?}",
                duplicates.len(),
                duplicates
            );
        }

        let count = entries.len();
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(entries);
        tracing::info!("Catalog replaced: {} SKUs", count);
        count
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn duplicate_codes(entries: &[CatalogEntry]) -> Vec<String> {
    let mut seen: IndexSet<&str> = IndexSet::new();
    let mut duplicates: IndexSet<&str> = IndexSet::new();
    for entry in entries {
        if !seen.insert(entry.code.as_str()) {
            duplicates.insert(entry.code.as_str());
        }
    }
    duplicates.into_iter().map(str::to_string).collect()
}

use crate::models::{ResolvedLineItem, RfpRecord};
use dashmap::DashMap;

/// 内存中的 RFP 记录，按 ID 索引
#[derive(Debug, Default)]
pub struct RfpStore {
    records: DashMap<String, RfpRecord>,
}

impl RfpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: RfpRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// 返回副本，避免跨 await 持有 map 锁
    pub fn get(&self, id: &str) -> Option<RfpRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// 替换已有记录的明细；记录不存在时返回 false
    pub fn update_line_items(&self, id: &str, line_items: Vec<ResolvedLineItem>) -> bool {
        match self.records.get_mut(id) {
            Some(mut record) => {
                record.line_items = line_items;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

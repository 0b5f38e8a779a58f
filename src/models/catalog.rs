use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

/// 目录条目 (SKU)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub pack_size: String,
    pub unit_cost: BigDecimal,
}

impl CatalogEntry {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.into(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            pack_size: String::new(),
            unit_cost: BigDecimal::zero(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_pack_size(mut self, pack_size: impl Into<String>) -> Self {
        self.pack_size = pack_size.into();
        self
    }

    pub fn with_unit_cost(mut self, unit_cost: BigDecimal) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    /// 候选筛选打分使用的文本
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.name, self.description, self.category, self.pack_size
        )
    }
}

/// 提供给 oracle 的候选视图（不含成本）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView<'a> {
    pub sku_code: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub pack_size: &'a str,
}

impl<'a> From<&'a CatalogEntry> for CandidateView<'a> {
    fn from(entry: &'a CatalogEntry) -> Self {
        Self {
            sku_code: &entry.code,
            name: &entry.name,
            description: &entry.description,
            category: &entry.category,
            pack_size: &entry.pack_size,
        }
    }
}

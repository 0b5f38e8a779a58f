use crate::models::ResolvedLineItem;
use bigdecimal::{BigDecimal, Zero};
use std::str::FromStr;

pub const PRICE_SCALE: i64 = 2;

/// 保留 `scale` 位小数，四舍五入（远离零）
pub fn round_half_up(value: &BigDecimal, scale: i64) -> BigDecimal {
    let factor = BigDecimal::new(1.into(), -scale);
    let half = BigDecimal::new(5.into(), 1);
    let shifted = value.abs() * &factor + half;
    let (digits, _) = shifted.with_scale(0).into_bigint_and_exponent();
    let rounded = BigDecimal::new(digits, scale);
    if value < &BigDecimal::zero() {
        -rounded
    } else {
        rounded
    }
}

/// 由配置/请求中的浮点数得到利润率（最短十进制表示）
pub fn margin_from_f64(margin_percent: f64) -> Option<BigDecimal> {
    if !margin_percent.is_finite() {
        return None;
    }
    BigDecimal::from_str(&margin_percent.to_string()).ok()
}

/// 计算总价用的数量：缺失或非正数按 1 计
pub fn effective_quantity(item: &ResolvedLineItem) -> BigDecimal {
    match &item.request.quantity {
        Some(q) if q > &BigDecimal::zero() => q.clone(),
        _ => BigDecimal::from(1),
    }
}

/// 根据已匹配条目重新计算单价和总价
///
/// 价格每次都从头计算，同一利润率重复执行结果一致。
/// 总价基于四舍五入后的单价计算。
pub fn enrich(item: &ResolvedLineItem, margin_percent: &BigDecimal) -> ResolvedLineItem {
    let mut enriched = item.clone();

    let Some(entry) = &item.matched_entry else {
        enriched.unit_price = None;
        enriched.total_price = None;
        return enriched;
    };

    let markup = BigDecimal::from(1) + margin_percent.clone() / BigDecimal::from(100);
    let unit_price = round_half_up(&(&entry.unit_cost * &markup), PRICE_SCALE);
    let total_price = round_half_up(&(&unit_price * &effective_quantity(item)), PRICE_SCALE);

    enriched.unit_price = Some(unit_price);
    enriched.total_price = Some(total_price);
    enriched
}

/// 整批使用同一利润率
pub fn enrich_all(
    items: &[ResolvedLineItem],
    margin_percent: &BigDecimal,
) -> Vec<ResolvedLineItem> {
    items.iter().map(|item| enrich(item, margin_percent)).collect()
}

use crate::models::{CatalogEntry, Proposal};
use bigdecimal::{BigDecimal, Zero};
use csv::StringRecord;
use std::io::{Read, Write};
use std::str::FromStr;
use thiserror::Error;

/// 各字段可接受的表头写法，归一化后比较
/// （小写、仅字母数字），按优先级排列
const CODE_HEADERS: &[&str] = &["skucode", "code", "sku", "id"];
const NAME_HEADERS: &[&str] = &["name", "productname"];
const DESCRIPTION_HEADERS: &[&str] = &["description"];
const CATEGORY_HEADERS: &[&str] = &["category"];
const PACK_SIZE_HEADERS: &[&str] = &["packsize", "pack"];
const COST_HEADERS: &[&str] = &["basecost", "unitcost", "cost"];

const UNKNOWN_CODE: &str = "UNKNOWN";

#[derive(Debug, Error)]
pub enum CatalogCsvError {
    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("no SKU code column (skuCode, SKU Code, code, sku or id), headers: {0}")]
    MissingCodeColumn(String),
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// 各目录字段对应的列位置
struct CatalogColumns {
    code: Vec<usize>,
    name: Vec<usize>,
    description: Vec<usize>,
    category: Vec<usize>,
    pack_size: Vec<usize>,
    cost: Vec<usize>,
}

impl CatalogColumns {
    fn locate(headers: &StringRecord) -> Self {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |aliases: &[&str]| -> Vec<usize> {
            aliases
                .iter()
                .filter_map(|alias| normalized.iter().position(|h| h == alias))
                .collect()
        };
        Self {
            code: find(CODE_HEADERS),
            name: find(NAME_HEADERS),
            description: find(DESCRIPTION_HEADERS),
            category: find(CATEGORY_HEADERS),
            pack_size: find(PACK_SIZE_HEADERS),
            cost: find(COST_HEADERS),
        }
    }

    /// 候选列中第一个非空值
    fn value<'r>(record: &'r StringRecord, columns: &[usize]) -> Option<&'r str> {
        columns
            .iter()
            .filter_map(|&idx| record.get(idx))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    fn entry(&self, record: &StringRecord) -> CatalogEntry {
        let text = |columns: &[usize]| Self::value(record, columns).unwrap_or_default().to_string();

        let code = Self::value(record, &self.code).unwrap_or(UNKNOWN_CODE);
        let unit_cost = Self::value(record, &self.cost)
            .and_then(parse_cost)
            .unwrap_or_else(BigDecimal::zero);

        CatalogEntry::new(code, text(&self.name))
            .with_description(text(&self.description))
            .with_category(text(&self.category))
            .with_pack_size(text(&self.pack_size))
            .with_unit_cost(unit_cost)
    }
}

/// 非负成本；忽略货币符号和千分位分隔符
fn parse_cost(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
    BigDecimal::from_str(&cleaned)
        .ok()
        .filter(|cost| cost >= &BigDecimal::zero())
}

/// 解析表头命名宽松的目录 CSV
///
/// 表头中没有任何 SKU 编码列时直接拒绝。
/// 其余缺失字段默认为空字符串（编码为 `UNKNOWN`），无效成本为 0。
/// 无法解码的行记录警告后跳过。
pub fn parse_catalog_csv<R: Read>(reader: R) -> Result<Vec<CatalogEntry>, CatalogCsvError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = CatalogColumns::locate(&headers);
    if columns.code.is_empty() {
        let found = headers.iter().collect::<Vec<_>>().join(", ");
        return Err(CatalogCsvError::MissingCodeColumn(found));
    }

    let mut entries = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        match record {
            Ok(record) => entries.push(columns.entry(&record)),
            // +2: 表头行 + 行号从 1 开始
            Err(e) => tracing::warn!("Skipping malformed catalog row {}: {}", idx + 2, e),
        }
    }

    Ok(entries)
}

fn option_to_csv<T: ToString>(val: &Option<T>) -> String {
    val.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// 导出已定价报价明细到 CSV
pub fn export_proposal_csv<W: Write>(proposal: &Proposal, writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);

    writer.write_record([
        "lineId",
        "description",
        "quantity",
        "unit",
        "skuCode",
        "skuName",
        "confidence",
        "unitPrice",
        "totalPrice",
    ])?;

    for item in &proposal.line_items {
        let entry = item.matched_entry.as_ref();
        writer.write_record(&[
            item.request.id.clone(),
            item.request.description.clone(),
            option_to_csv(&item.request.quantity),
            option_to_csv(&item.request.unit),
            entry.map(|e| e.code.clone()).unwrap_or_default(),
            entry.map(|e| e.name.clone()).unwrap_or_default(),
            option_to_csv(&item.confidence),
            option_to_csv(&item.unit_price),
            option_to_csv(&item.total_price),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineItemRequest, ResolvedLineItem};

    #[test]
    fn test_loose_headers() {
        let csv = "SKU Code,Product Name,Description,Category,Pack Size,Base Cost\n\
                   W1,Still water,PET bottle,Beverages,500ml,0.45\n\
                   G1,Nitrile gloves,Powder free,Safety,100 pcs,\"$1,250.00\"\n";
        let entries = parse_catalog_csv(csv.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code, "W1");
        assert_eq!(entries[0].name, "Still water");
        assert_eq!(entries[0].pack_size, "500ml");
        assert_eq!(entries[0].unit_cost, BigDecimal::from_str("0.45").unwrap());
        assert_eq!(entries[1].unit_cost, BigDecimal::from(1250));
    }

    #[test]
    fn test_camel_case_headers_and_fallback_code() {
        let csv = "id,skuCode,name,baseCost\nrow-1,,Paper,3\nrow-2,P2,Pens,2.5\n";
        let entries = parse_catalog_csv(csv.as_bytes()).unwrap();
        assert_eq!(entries[0].code, "row-1");
        assert_eq!(entries[1].code, "P2");
        assert_eq!(entries[1].unit_cost, BigDecimal::from_str("2.5").unwrap());
    }

    #[test]
    fn test_malformed_fields_default() {
        let csv = "code,name,cost\n,Mystery,abc\n,Refund,-5\n,Short\n";
        let entries = parse_catalog_csv(csv.as_bytes()).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.code == UNKNOWN_CODE));
        assert!(entries.iter().all(|e| e.unit_cost == BigDecimal::zero()));
        assert_eq!(entries[2].name, "Short");
        assert_eq!(entries[2].description, "");
    }

    #[test]
    fn test_missing_code_column_rejected() {
        let csv = "name,cost\nMystery,3\n";
        let err = parse_catalog_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogCsvError::MissingCodeColumn(ref h) if h == "name, cost"));

        // 把 multipart 报文当作 CSV 读取时，boundary 行会成为表头
        let framed = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\nskuCode,name\r\nW1,Water\r\n--X-BOUNDARY--\r\n";
        assert!(parse_catalog_csv(framed.as_bytes()).is_err());
    }

    #[test]
    fn test_export_proposal_csv() {
        let mut matched = ResolvedLineItem::pending(
            LineItemRequest::new("r-L0", "Still water").with_quantity(BigDecimal::from(3)),
        );
        matched.matched_entry = Some(CatalogEntry::new("W1", "Still water"));
        matched.confidence = Some(90);
        matched.unit_price = Some(BigDecimal::from_str("12.00").unwrap());
        matched.total_price = Some(BigDecimal::from_str("36.00").unwrap());
        let unmatched = ResolvedLineItem::pending(LineItemRequest::new("r-L1", "Unicorn"));

        let proposal = Proposal {
            rfp_id: "r".to_string(),
            buyer_name: None,
            deadline: None,
            summary: String::new(),
            key_requirements: Vec::new(),
            margin_percent: BigDecimal::from(20),
            line_items: vec![matched, unmatched],
            subtotal: BigDecimal::from_str("36.00").unwrap(),
            unmatched_count: 1,
        };

        let mut out = Vec::new();
        export_proposal_csv(&proposal, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "r-L0,Still water,3,,W1,Still water,90,12.00,36.00");
        assert_eq!(lines[2], "r-L1,Unicorn,,,,,,,");
    }
}

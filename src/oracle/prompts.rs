use super::OracleRequest;
use crate::models::{CandidateView, CatalogEntry, LineItemRequest};

/// 每条明细匹配时发给 oracle 的匹配规则
pub const MATCH_INSTRUCTIONS: &str = r#"You are a sales engineer matching RFP line items to a product catalog.
Task: pick the best matching SKU for the requested line item from the provided candidates ONLY.

Matching policy:
1. Pack size must match the request. If the pack size differs, confidence must not exceed 40.
2. Product type (what the item semantically is) is the strongest signal.
3. A container type mismatch (e.g. bottle vs can, glass vs PET, box vs bag) reduces confidence.
4. Category is a secondary, corroborating signal only.
5. When several candidates satisfy both pack size and product type, prefer the most specific one.
6. If no candidate is a reasonable match, answer with "chosenSkuCode": null and confidence of 20 or less.
Never invent a SKU code that is not in the candidate list.

Return strict JSON and nothing else:
{
    "chosenSkuCode": string | null,
    "confidence": number,
    "rationale": string
}
confidence is an integer from 0 to 100; rationale is one short sentence."#;

pub const ANALYZE_INSTRUCTIONS: &str = r#"You are an expert RFP analyzer.
Analyze the provided RFP text and extract the following fields in strict JSON format:
{
    "name": string | null,
    "buyerName": string | null,
    "deadline": string | null,
    "summary": string,
    "keyRequirements": string[],
    "disqualifyingConditions": string[]
}
Return ONLY VALID JSON. Do not add conversational text."#;

pub const EXTRACT_INSTRUCTIONS: &str = r#"You are an expert RFP extraction tool.
Extract the list of line items (products or services requested) from the RFP text.
Return a strict JSON array of objects:
[
    {
        "description": string,
        "quantity": number | null,
        "unit": string | null,
        "notes": string | null
    }
]
Focus on specific SKUs, products, or services. Ignore general legal boilerplate.
Return ONLY VALID JSON."#;

/// 单条明细 + 候选集的 oracle 请求
pub fn match_request(item: &LineItemRequest, candidates: &[CatalogEntry]) -> OracleRequest {
    let views: Vec<CandidateView<'_>> = candidates.iter().map(CandidateView::from).collect();
    let candidates_json = serde_json::to_string_pretty(&views).unwrap_or_else(|_| "[]".to_string());

    let quantity = item
        .quantity
        .as_ref()
        .map(|q| q.to_string())
        .unwrap_or_else(|| "unspecified".to_string());

    let context = format!(
        "Line Item Requested:\nDescription: {}\nQuantity: {}\nUnit: {}\nNotes: {}\n\nCandidate SKUs:\n{}",
        item.description,
        quantity,
        item.unit.as_deref().unwrap_or("unspecified"),
        item.notes.as_deref().unwrap_or("none"),
        candidates_json,
    );

    OracleRequest::new(MATCH_INSTRUCTIONS, context)
}

pub fn analyze_request(rfp_text: &str) -> OracleRequest {
    OracleRequest::new(ANALYZE_INSTRUCTIONS, format!("RFP Text:\n{}", rfp_text))
}

pub fn extract_request(rfp_text: &str) -> OracleRequest {
    OracleRequest::new(EXTRACT_INSTRUCTIONS, format!("RFP Text:\n{}", rfp_text))
}

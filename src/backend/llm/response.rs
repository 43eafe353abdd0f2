//! Parsing of LLM answers into page elements.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{ChartData, Element, Origin, Region};
use crate::text::TextCleaner;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("valid regex"))
}

/// Parse a model answer into elements attributed to `backend`.
///
/// Accepted shapes: `{"elements": [...]}`, `{"content": [...]}`,
/// `{"pages": [{"content": [...]}]}` or a bare array. Items of unknown type
/// are skipped.
pub fn parse_response(raw: &str, backend: &str) -> Result<Vec<Element>> {
    let body = extract_json(raw)
        .ok_or_else(|| Error::LlmResponse(format!("no JSON found in: {}", preview(raw))))?;
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::LlmResponse(format!("{}: {}", e, preview(body))))?;

    let items = element_items(&value)
        .ok_or_else(|| Error::LlmResponse("expected an element list".to_string()))?;

    let elements: Vec<Element> = items
        .iter()
        .filter_map(|item| parse_element(item, backend))
        .collect();
    log::debug!("LLM response: {} of {} items usable", elements.len(), items.len());
    Ok(elements)
}

/// The JSON part of an answer: fenced block, or the outermost braces/brackets.
fn extract_json(raw: &str) -> Option<&str> {
    if let Some(inner) = fence_regex().captures(raw).and_then(|c| c.get(1)) {
        return Some(inner.as_str());
    }
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }
    let start = trimmed.find(['{', '['])?;
    let end = trimmed.rfind(['}', ']'])?;
    (end > start).then(|| &trimmed[start..=end])
}

fn element_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("elements").or_else(|| map.get("content")) {
                return Some(items.clone());
            }
            if let Some(Value::Array(pages)) = map.get("pages") {
                return Some(
                    pages
                        .iter()
                        .filter_map(|p| p.get("content").or_else(|| p.get("elements")))
                        .filter_map(Value::as_array)
                        .flatten()
                        .cloned()
                        .collect(),
                );
            }
            None
        }
        _ => None,
    }
}

fn parse_element(item: &Value, backend: &str) -> Option<Element> {
    let kind = item.get("type").and_then(Value::as_str).unwrap_or("text");
    let cleaner = TextCleaner::global();

    let element = match kind.to_ascii_lowercase().as_str() {
        "text" | "paragraph" | "heading" | "title" | "list" => {
            let content = item.get("content").or_else(|| item.get("text"))?;
            let text = match content {
                Value::Array(lines) => lines.iter().map(cell_text).collect::<Vec<_>>().join("\n"),
                other => cell_text(other),
            };
            Element::text(Origin::Llm, backend, cleaner.clean_block(&text))
        }
        "table" => {
            let rows = ["content", "table_data", "rows"]
                .iter()
                .find_map(|key| item.get(*key).and_then(grid))?;
            Element::table(Origin::Llm, backend, rows)
        }
        "chart" => {
            let data = ["data", "content", "rows"]
                .iter()
                .find_map(|key| item.get(*key).and_then(grid))
                .unwrap_or_default();
            Element::chart(Origin::Llm, backend, ChartData { image: None, data })
        }
        other => {
            log::debug!("Skipping LLM element of type '{}'", other);
            return None;
        }
    };

    Some(match item.get("region").or_else(|| item.get("bbox")).and_then(region) {
        Some(r) => element.with_region(r),
        None => element,
    })
}

fn grid(value: &Value) -> Option<Vec<Vec<String>>> {
    let rows = value.as_array()?;
    Some(
        rows.iter()
            .map(|row| match row {
                Value::Array(cells) => cells.iter().map(cell_text).collect(),
                Value::Object(map) => map.values().map(cell_text).collect(),
                other => vec![cell_text(other)],
            })
            .collect(),
    )
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => TextCleaner::global().clean_inline(s),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn region(value: &Value) -> Option<Region> {
    let coords: Vec<f32> = match value {
        Value::Array(items) => items.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect(),
        Value::Object(map) => ["x0", "y0", "x1", "y1"]
            .iter()
            .filter_map(|k| map.get(*k).and_then(Value::as_f64).map(|f| f as f32))
            .collect(),
        _ => return None,
    };
    (coords.len() == 4).then(|| Region::new(coords[0], coords[1], coords[2], coords[3]))
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}

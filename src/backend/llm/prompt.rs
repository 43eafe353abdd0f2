//! Prompts for LLM page structuring.

use crate::backend::PageContent;

/// Longest excerpt of an existing element shown to the model.
const ELEMENT_EXCERPT_CHARS: usize = 200;

/// Longest raw page text sent to the model.
const PAGE_TEXT_CHARS: usize = 6000;

pub const SYSTEM_PROMPT: &str = r#"
You are a document layout assistant. You receive one page of a PDF: its size,
any content already extracted from it, its raw text and, when available, an
image of the page. Your ONLY job is to recover content that is still missing
and return it as structured JSON.

RULES:
1. Return ONLY content that is visibly present on the page.
2. Do NOT repeat content listed under "Already extracted".
3. Preserve values verbatim: numbers, dates, names, units.
4. Use reading order: top to bottom, left to right.
5. Regions are [x0, y0, x1, y1] in page points, origin at the TOP-LEFT corner.
   Omit "region" when unsure.

OUTPUT FORMAT (JSON only, no prose, no code fences):
{
  "elements": [
    {"type": "text", "content": "paragraph text", "region": [x0, y0, x1, y1]},
    {"type": "table", "content": [["header 1", "header 2"], ["cell", "cell"]]},
    {"type": "chart", "data": [["label", "value"]]}
  ]
}
Return {"elements": []} when nothing is missing.
"#;

/// Build the user prompt for one page.
pub fn build_page_prompt(page: &PageContent) -> String {
    let mut prompt = format!(
        "Page {} ({:.0} x {:.0} points).\n",
        page.page_number, page.width, page.height
    );

    if page.elements.is_empty() {
        prompt.push_str("\nAlready extracted: nothing.\n");
    } else {
        prompt.push_str("\nAlready extracted (do not repeat):\n");
        for element in &page.elements {
            let region = element
                .region
                .map(|r| format!(" [{:.0}, {:.0}, {:.0}, {:.0}]", r.x0, r.y0, r.x1, r.y1))
                .unwrap_or_default();
            prompt.push_str(&format!(
                "- {} ({}){}: {}\n",
                element.kind.as_str(),
                element.origin.as_str(),
                region,
                truncate(&element.plain_text().replace('\n', " "), ELEMENT_EXCERPT_CHARS)
            ));
        }
    }

    let text = page.text.trim();
    if text.is_empty() {
        prompt.push_str("\nRaw page text: none (the page may be scanned).\n");
    } else {
        prompt.push_str(&format!(
            "\n<page_text>\n{}\n</page_text>\n",
            truncate(text, PAGE_TEXT_CHARS)
        ));
    }

    if page.image.is_some() {
        prompt.push_str("\nAn image of the page is attached.\n");
    }

    prompt.push_str("\nReturn the missing content as JSON.");
    prompt
}

/// Cut `text` to at most `max` characters on a char boundary.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

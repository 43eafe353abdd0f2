//! Assembly of page results into the output document.

use crate::model::{ConversionStats, DocumentInfo, Element, ExtractionResult, HierarchicalDocument, PageNode};

/// Elements whose tops are within this many points share a row.
const ROW_TOLERANCE: f32 = 4.0;

/// Build the document from per-page results, in page order.
pub fn assemble(info: DocumentInfo, mut results: Vec<ExtractionResult>) -> HierarchicalDocument {
    results.sort_by_key(|r| r.page.number);

    let pages: Vec<PageNode> = results
        .into_iter()
        .map(|result| PageNode {
            page_number: result.page.number,
            width: result.page.width,
            height: result.page.height,
            classification: result.classification,
            complete: result.complete,
            issues: result.issues,
            llm_invoked: result.llm_invoked,
            elements: reading_order(result.elements.into_iter().filter(|e| !e.is_empty()).collect()),
        })
        .collect();

    let stats = ConversionStats::from_pages(&pages);
    HierarchicalDocument {
        info,
        complete: pages.iter().all(|p| p.complete),
        pages,
        stats,
    }
}

/// Sort elements top-to-bottom, then left-to-right within a row.
///
/// Elements without a region keep their relative order after the positioned ones.
pub fn reading_order(elements: Vec<Element>) -> Vec<Element> {
    let (mut positioned, unpositioned): (Vec<Element>, Vec<Element>) =
        elements.into_iter().partition(|e| e.region.is_some());

    positioned.sort_by(|a, b| top(a).total_cmp(&top(b)));

    let mut rows: Vec<Vec<Element>> = Vec::new();
    for element in positioned {
        match rows.last_mut() {
            Some(row) if (top(&element) - top(&row[0])).abs() <= ROW_TOLERANCE => row.push(element),
            _ => rows.push(vec![element]),
        }
    }

    let mut ordered = Vec::new();
    for mut row in rows {
        row.sort_by(|a, b| left(a).total_cmp(&left(b)));
        ordered.extend(row);
    }
    ordered.extend(unpositioned);
    ordered
}

fn top(e: &Element) -> f32 {
    e.region.map(|r| r.y0).unwrap_or(f32::MAX)
}

fn left(e: &Element) -> f32 {
    e.region.map(|r| r.x0).unwrap_or(f32::MAX)
}

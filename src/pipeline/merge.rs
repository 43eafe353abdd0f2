//! Merging element batches under origin precedence.
//!
//! The first non-empty element for a piece of content wins: a later element
//! that conflicts with an existing non-empty element of equal or higher
//! precedence (rule > ocr > llm) is dropped. Conflicting empty elements are
//! replaced. Only elements of the same class conflict: text blocks, grids
//! (tables and charts) and images each compete among themselves.

use crate::model::{Element, ElementKind};

/// Share of the smaller region two elements must overlap to conflict.
pub const OVERLAP_THRESHOLD: f32 = 0.5;

/// Counts from one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub accepted: usize,
    pub dropped: usize,
    pub replaced: usize,
}

/// Kinds that describe content the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Text,
    Grid,
    Image,
}

fn class(kind: ElementKind) -> Class {
    match kind {
        ElementKind::Text => Class::Text,
        ElementKind::Table | ElementKind::Chart => Class::Grid,
        ElementKind::Image => Class::Image,
    }
}

/// Whether two elements describe the same content.
///
/// A table read from a page overlaps the text blocks OCR found in the same
/// area, and an image overlaps what was read from it; neither pair conflicts.
pub fn conflicts(a: &Element, b: &Element) -> bool {
    if class(a.kind) != class(b.kind) {
        return false;
    }
    match (&a.region, &b.region) {
        (Some(ra), Some(rb)) => ra.overlap_ratio(rb) >= OVERLAP_THRESHOLD,
        _ => a.kind == b.kind,
    }
}

/// Merge `incoming` into `existing`.
///
/// Incoming elements are only compared with elements present before this
/// call, never with each other.
pub fn merge(existing: &mut Vec<Element>, incoming: Vec<Element>) -> MergeStats {
    let prior = std::mem::take(existing);
    let mut keep = vec![true; prior.len()];
    let mut accepted = Vec::new();
    let mut stats = MergeStats::default();

    for element in incoming {
        if element.is_empty() {
            stats.dropped += 1;
            continue;
        }

        let conflicting: Vec<usize> = prior
            .iter()
            .enumerate()
            .filter(|(i, e)| keep[*i] && conflicts(e, &element))
            .map(|(i, _)| i)
            .collect();

        let outranked = conflicting
            .iter()
            .any(|&i| !prior[i].is_empty() && prior[i].origin <= element.origin);
        if outranked {
            stats.dropped += 1;
            continue;
        }

        for i in conflicting {
            keep[i] = false;
            stats.replaced += 1;
        }
        accepted.push(element);
        stats.accepted += 1;
    }

    existing.extend(
        prior
            .into_iter()
            .zip(keep)
            .filter_map(|(e, keep)| keep.then_some(e)),
    );
    existing.extend(accepted);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageRef, Origin, Region};

    fn text_at(origin: Origin, s: &str, region: Region) -> Element {
        Element::text(origin, origin.as_str(), s).with_region(region)
    }

    #[test]
    fn test_rule_text_beats_ocr_text() {
        let region = Region::new(72.0, 100.0, 400.0, 140.0);
        let mut elements = vec![text_at(Origin::Rule, "Native text", region)];
        let stats = merge(
            &mut elements,
            vec![text_at(Origin::Ocr, "Nat1ve text", Region::new(70.0, 98.0, 402.0, 141.0))],
        );

        assert_eq!(stats.dropped, 1);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].origin, Origin::Rule);
    }

    #[test]
    fn test_llm_fills_gap() {
        let mut elements = vec![text_at(Origin::Rule, "Header", Region::new(72.0, 40.0, 300.0, 60.0))];
        let stats = merge(
            &mut elements,
            vec![text_at(Origin::Llm, "Footer", Region::new(72.0, 700.0, 300.0, 720.0))],
        );
        assert_eq!(stats.accepted, 1);
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn test_regionless_same_kind_conflicts() {
        let mut elements = vec![Element::table(Origin::Ocr, "tesseract", vec![vec!["a".to_string()]])];
        merge(
            &mut elements,
            vec![
                Element::table(Origin::Llm, "llm", vec![vec!["b".to_string()]]),
                Element::text(Origin::Llm, "llm", "summary"),
            ],
        );
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].as_grid().unwrap()[0][0], "a");
        assert_eq!(elements[1].as_text(), Some("summary"));
    }

    #[test]
    fn test_empty_existing_is_replaced() {
        let region = Region::new(0.0, 0.0, 100.0, 100.0);
        let empty_table = Element::table(Origin::Rule, "lopdf", vec![vec![String::new()]]).with_region(region);
        let mut elements = vec![empty_table];
        let filled = Element::table(Origin::Llm, "llm", vec![vec!["42".to_string()]]).with_region(region);

        let stats = merge(&mut elements, vec![filled]);
        assert_eq!(stats.replaced, 1);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].origin, Origin::Llm);
    }

    #[test]
    fn test_incoming_empty_discarded() {
        let mut elements = Vec::new();
        let stats = merge(&mut elements, vec![Element::text(Origin::Ocr, "tesseract", "  ")]);
        assert_eq!(stats.dropped, 1);
        assert!(elements.is_empty());
    }

    #[test]
    fn test_image_does_not_block_its_content() {
        let region = Region::new(100.0, 100.0, 400.0, 300.0);
        let image = Element::image(Origin::Rule, "lopdf", ImageRef::new("p1_Im1", "image/png", vec![1]))
            .with_region(region);
        let mut elements = vec![image];
        let table = Element::table(Origin::Ocr, "tesseract", vec![vec!["x".to_string()]]).with_region(region);

        merge(&mut elements, vec![table]);
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn test_image_table_survives_ocr_text() {
        let mut elements = vec![text_at(
            Origin::Ocr,
            "Item Qty Bolt 4",
            Region::new(50.0, 60.0, 560.0, 120.0),
        )];
        let table = Element::table(
            Origin::Ocr,
            "tesseract",
            vec![vec!["Item".into(), "Qty".into()], vec!["Bolt".into(), "4".into()]],
        )
        .with_region(Region::new(60.0, 70.0, 500.0, 115.0));

        let stats = merge(&mut elements, vec![table]);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.dropped, 0);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].kind, ElementKind::Table);
    }

    #[test]
    fn test_chart_and_table_compete() {
        let region = Region::new(0.0, 0.0, 300.0, 200.0);
        let mut elements = vec![Element::table(Origin::Ocr, "tesseract", vec![vec!["10".into()]]).with_region(region)];
        let chart = Element::chart(
            Origin::Llm,
            "llm",
            crate::model::ChartData {
                image: None,
                data: vec![vec!["10".into()]],
            },
        )
        .with_region(region);

        let stats = merge(&mut elements, vec![chart]);
        assert_eq!(stats.dropped, 1);
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn test_batch_members_not_compared() {
        let region = Region::new(0.0, 0.0, 100.0, 20.0);
        let mut elements = Vec::new();
        merge(
            &mut elements,
            vec![
                text_at(Origin::Rule, "first", region),
                text_at(Origin::Rule, "second", region),
            ],
        );
        assert_eq!(elements.len(), 2);
    }
}

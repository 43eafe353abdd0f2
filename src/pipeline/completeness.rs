//! Whether an extraction pass produced usable content.

use crate::model::{Element, ElementKind, PageIssue};

/// Observations gathered while extracting that are not visible in the merged elements.
#[derive(Debug, Clone, Default)]
pub struct Signals {
    /// Blank text elements returned by backends (they are dropped on merge)
    pub blank_text: usize,
    /// Table elements reported by image analysis, empty or not
    pub expected_tables: usize,
}

/// Result of a completeness check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assessment {
    pub reasons: Vec<PageIssue>,
}

impl Assessment {
    pub fn is_complete(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Check merged page elements for usable content.
pub fn assess(elements: &[Element], signals: &Signals) -> Assessment {
    let mut reasons = Vec::new();

    let has_content = elements.iter().any(|e| {
        matches!(e.kind, ElementKind::Text | ElementKind::Table | ElementKind::Chart) && !e.is_empty()
    });
    if !has_content {
        let blank_text = signals.blank_text > 0
            || elements.iter().any(|e| e.kind == ElementKind::Text && e.is_empty());
        reasons.push(if blank_text {
            PageIssue::BlankText
        } else {
            PageIssue::NoContent
        });
    }

    if signals.expected_tables > 0 {
        let has_table = elements
            .iter()
            .any(|e| e.kind == ElementKind::Table && !e.is_empty());
        if !has_table {
            reasons.push(PageIssue::MissingTables {
                expected: signals.expected_tables,
            });
        }
    }

    Assessment { reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageRef, Origin};

    fn text(s: &str) -> Element {
        Element::text(Origin::Rule, "lopdf", s)
    }

    #[test]
    fn test_zero_elements_incomplete() {
        let assessment = assess(&[], &Signals::default());
        assert_eq!(assessment.reasons, vec![PageIssue::NoContent]);
    }

    #[test]
    fn test_text_is_complete() {
        assert!(assess(&[text("Hello world")], &Signals::default()).is_complete());
    }

    #[test]
    fn test_only_whitespace_text() {
        let assessment = assess(&[text("   \n ")], &Signals::default());
        assert_eq!(assessment.reasons, vec![PageIssue::BlankText]);

        let signals = Signals {
            blank_text: 2,
            ..Default::default()
        };
        assert_eq!(assess(&[], &signals).reasons, vec![PageIssue::BlankText]);
    }

    #[test]
    fn test_empty_table_only() {
        let table = Element::table(Origin::Rule, "lopdf", vec![vec![" ".to_string(), String::new()]]);
        assert_eq!(assess(&[table], &Signals::default()).reasons, vec![PageIssue::NoContent]);
    }

    #[test]
    fn test_images_only_incomplete() {
        let image = Element::image(Origin::Rule, "lopdf", ImageRef::new("p1_Im1", "image/png", vec![1]));
        assert!(!assess(&[image], &Signals::default()).is_complete());
    }

    #[test]
    fn test_missing_tables() {
        let signals = Signals {
            expected_tables: 1,
            ..Default::default()
        };
        let assessment = assess(&[text("Some caption")], &signals);
        assert_eq!(assessment.reasons, vec![PageIssue::MissingTables { expected: 1 }]);

        let table = Element::table(Origin::Ocr, "tesseract", vec![vec!["a".to_string()]]);
        assert!(assess(&[text("Some caption"), table], &signals).is_complete());
    }
}

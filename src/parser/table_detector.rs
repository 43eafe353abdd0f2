//! Table detection from text positions (stream mode).
//!
//! Tables are found by alignment alone: rows of two or more spans whose left
//! edges repeat across rows. No ruling lines are needed, so the same detector
//! serves native text spans and OCR word boxes.

use std::collections::{HashMap, HashSet};

use super::layout::{PdfRect, TextSpan};

/// X positions within this many points fall in the same edge bucket.
const EDGE_BUCKET: f32 = 5.0;

/// A table found among the spans.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Bounding box in the spans' coordinate space
    pub rect: PdfRect,
    /// Column left edges
    pub columns: Vec<f32>,
    /// Cell text, one inner vector per row
    pub cells: Vec<Vec<String>>,
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// Spans sharing a baseline, by index into the detector input.
#[derive(Debug, Clone)]
struct Row {
    y: f32,
    members: Vec<usize>,
}

/// Detects tables in a list of text spans.
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self {
            config: TableDetectorConfig::default(),
        }
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables in the given spans.
    ///
    /// Returns detected tables and the spans that were NOT part of tables.
    pub fn detect(&self, spans: Vec<TextSpan>) -> (Vec<DetectedTable>, Vec<TextSpan>) {
        if spans.len() < self.config.min_rows * self.config.min_columns {
            return (vec![], spans);
        }

        let rows = self.group_into_rows(&spans);
        let columns = self.detect_columns(&spans, &rows);
        log::debug!(
            "TableDetector: {} spans, {} rows, columns at {:?}",
            spans.len(),
            rows.len(),
            columns
        );
        if columns.len() < self.config.min_columns {
            return (vec![], spans);
        }

        let mut tables = Vec::new();
        let mut used: HashSet<usize> = HashSet::new();

        for (start, end) in self.find_table_regions(&spans, &rows, &columns) {
            let region = &rows[start..=end];

            // Re-detect columns for this specific table region
            let table_columns = self.detect_columns(&spans, region);
            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "TableDetector: skipping region, too many columns ({} > {})",
                    table_columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(&spans, region, &table_columns) {
                log::debug!("TableDetector: skipping region, detected as list pattern");
                continue;
            }

            let members: Vec<usize> = region.iter().flat_map(|r| r.members.iter().copied()).collect();
            let Some(rect) = PdfRect::around_spans(members.iter().map(|&i| &spans[i])) else {
                continue;
            };
            let cells = region
                .iter()
                .map(|row| self.row_cells(&spans, row, &table_columns, rect.right))
                .collect();

            used.extend(members);
            tables.push(DetectedTable {
                rect,
                columns: table_columns,
                cells,
            });
        }

        let remaining = spans
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(i))
            .map(|(_, span)| span)
            .collect();

        (tables, remaining)
    }

    /// Group spans into rows by Y position, top to bottom.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<Row> {
        let mut order: Vec<usize> = (0..spans.len()).collect();
        order.sort_by(|&a, &b| {
            spans[b]
                .y
                .total_cmp(&spans[a].y)
                .then(spans[a].x.total_cmp(&spans[b].x))
        });

        let mut rows: Vec<Row> = Vec::new();
        let mut anchor: Option<f32> = None;
        for idx in order {
            let span = &spans[idx];
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match (anchor, rows.last_mut()) {
                (Some(y), Some(row)) if (span.y - y).abs() <= tolerance => row.members.push(idx),
                _ => {
                    anchor = Some(span.y);
                    rows.push(Row {
                        y: span.y,
                        members: vec![idx],
                    });
                }
            }
        }

        for row in &mut rows {
            row.y = row.members.iter().map(|&i| spans[i].y).sum::<f32>() / row.members.len() as f32;
            row.members.sort_by(|&a, &b| spans[a].x.total_cmp(&spans[b].x));
        }
        rows
    }

    /// Column left edges shared by enough multi-span rows.
    fn detect_columns(&self, spans: &[TextSpan], rows: &[Row]) -> Vec<f32> {
        let multi_span_rows: Vec<&Row> = rows.iter().filter(|r| r.members.len() >= 2).collect();
        if multi_span_rows.len() < self.config.min_rows {
            return vec![];
        }

        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &multi_span_rows {
            // Count each bucket once per row
            let buckets: HashSet<i32> = row
                .members
                .iter()
                .map(|&i| (spans[i].x / EDGE_BUCKET).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((multi_span_rows.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(bucket, _)| bucket as f32 * EDGE_BUCKET)
            .collect();
        edges.sort_by(|a, b| a.total_cmp(b));

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Contiguous runs of aligned multi-span rows.
    fn find_table_regions(
        &self,
        spans: &[TextSpan],
        rows: &[Row],
        columns: &[f32],
    ) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = row.members.len() >= 2
                && self.alignment_score(spans, row, columns) >= self.config.min_alignment_ratio;
            match (aligned, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }
        regions
    }

    /// Share of a row's spans starting on a column edge.
    fn alignment_score(&self, spans: &[TextSpan], row: &Row, columns: &[f32]) -> f32 {
        if row.members.is_empty() || columns.is_empty() {
            return 0.0;
        }
        let aligned = row
            .members
            .iter()
            .filter(|&&i| columns.iter().any(|col| (spans[i].x - col).abs() <= EDGE_BUCKET))
            .count();
        aligned as f32 / row.members.len() as f32
    }

    /// Cell text for one row, one entry per column.
    fn row_cells(&self, spans: &[TextSpan], row: &Row, columns: &[f32], right_x: f32) -> Vec<String> {
        let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
        for &i in &row.members {
            let col = find_column_for_span(spans[i].x, columns, right_x);
            if let Some(cell) = cells.get_mut(col) {
                cell.push(spans[i].text.trim());
            }
        }
        cells.into_iter().map(|parts| parts.join(" ")).collect()
    }

    /// Check if detected table rows actually represent a numbered or bulleted list.
    ///
    /// A list like "1. Item" often yields the marker and the text as separate
    /// spans at different X positions, which looks like a two-column table.
    fn is_list_pattern(&self, spans: &[TextSpan], rows: &[Row], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullet_count = 0;
        let mut number_count = 0;
        for row in rows {
            if let Some(&first) = row.members.first() {
                let text = spans[first].text.trim();
                if is_bullet_marker(text) {
                    bullet_count += 1;
                } else if is_number_marker(text) {
                    number_count += 1;
                }
            }
        }

        let bullet_ratio = bullet_count as f32 / rows.len() as f32;
        let total_ratio = (bullet_count + number_count) as f32 / rows.len() as f32;

        // Bullet markers are almost never real table data; numbered first
        // columns only disqualify two-column layouts.
        bullet_ratio >= 0.5 || (columns.len() == 2 && total_ratio >= 0.5)
    }
}

impl Default for TableDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the column a span starting at `span_x` belongs to.
fn find_column_for_span(span_x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &col_start) in columns.iter().enumerate() {
        let col_end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        // 10pt slack for spans starting slightly before the edge
        if span_x >= col_start - 10.0 && span_x < col_end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (span_x - **a).abs().total_cmp(&(span_x - **b).abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Check if text is a bullet marker (•, -, etc.).
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "◇" | "▶" | "➤"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    } else {
        // Bare number
        return true;
    }

    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text.to_string(), x, y, 12.0, "Helvetica".to_string())
            .with_width(text.len() as f32 * 6.0)
    }

    #[test]
    fn test_group_into_rows() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("B1", 60.0, 100.0),
            make_span("A1", 10.0, 100.0),
            make_span("A2", 10.0, 85.0),
            make_span("B2", 60.0, 85.0),
        ];

        let rows = detector.group_into_rows(&spans);
        assert_eq!(rows.len(), 2);
        // Sorted left to right within the row
        assert_eq!(rows[0].members, vec![1, 0]);
        assert_eq!(rows[1].members.len(), 2);
    }

    #[test]
    fn test_detect_simple_table() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("Name", 10.0, 100.0),
            make_span("Age", 60.0, 100.0),
            make_span("Alice", 10.0, 85.0),
            make_span("30", 60.0, 85.0),
            make_span("Bob", 10.0, 70.0),
            make_span("25", 60.0, 70.0),
        ];

        let (tables, remaining) = detector.detect(spans);
        assert_eq!(tables.len(), 1);
        assert!(remaining.is_empty());

        let table = &tables[0];
        assert_eq!(table.columns.len(), 2);
        assert_eq!(
            table.cells,
            vec![
                vec!["Name".to_string(), "Age".to_string()],
                vec!["Alice".to_string(), "30".to_string()],
                vec!["Bob".to_string(), "25".to_string()],
            ]
        );
        assert_eq!(table.rect.left, 10.0);
        assert!(table.rect.top > 100.0);
    }

    #[test]
    fn test_table_keeps_surrounding_text() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("Quarterly results", 10.0, 130.0),
            make_span("Region", 10.0, 100.0),
            make_span("Sales", 120.0, 100.0),
            make_span("North", 10.0, 85.0),
            make_span("120", 120.0, 85.0),
            make_span("South", 10.0, 70.0),
            make_span("95", 120.0, 70.0),
            make_span("Figures are unaudited.", 10.0, 40.0),
        ];

        let (tables, remaining) = detector.detect(spans);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].cells.len(), 3);
        let texts: Vec<&str> = remaining.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Quarterly results", "Figures are unaudited."]);
    }

    #[test]
    fn test_no_table_single_column() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("Line 1", 10.0, 100.0),
            make_span("Line 2", 10.0, 85.0),
            make_span("Line 3", 10.0, 70.0),
            make_span("Line 4", 10.0, 55.0),
        ];

        let (tables, remaining) = detector.detect(spans);
        assert!(tables.is_empty());
        assert_eq!(remaining.len(), 4);
    }

    #[test]
    fn test_numbered_list_not_detected_as_table() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("1.", 50.0, 400.0),
            make_span("Install the package", 80.0, 400.0),
            make_span("2.", 50.0, 370.0),
            make_span("Configure the service", 80.0, 370.0),
            make_span("3.", 50.0, 340.0),
            make_span("Restart", 80.0, 340.0),
        ];

        let (tables, remaining) = detector.detect(spans);
        assert!(tables.is_empty(), "Numbered list should not be detected as a table");
        assert_eq!(remaining.len(), 6);
    }

    #[test]
    fn test_bullet_list_not_detected_as_table() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("-", 50.0, 400.0),
            make_span("Management", 80.0, 400.0),
            make_span("-", 50.0, 370.0),
            make_span("Interface/Service Option", 80.0, 370.0),
            make_span("-", 50.0, 340.0),
            make_span("Firmware", 80.0, 340.0),
        ];

        let (tables, remaining) = detector.detect(spans);
        assert!(tables.is_empty(), "Bullet list should not be detected as a table");
        assert_eq!(remaining.len(), 6);
    }

    #[test]
    fn test_find_column_for_span() {
        let columns = [10.0, 60.0, 120.0];
        assert_eq!(find_column_for_span(12.0, &columns, 200.0), 0);
        assert_eq!(find_column_for_span(58.0, &columns, 200.0), 1);
        assert_eq!(find_column_for_span(130.0, &columns, 200.0), 2);
    }

    #[test]
    fn test_list_markers() {
        assert!(is_number_marker("1."));
        assert!(is_number_marker("12."));
        assert!(is_number_marker("1 ."));
        assert!(is_number_marker("3"));
        assert!(is_number_marker("a."));
        assert!(is_number_marker("B)"));
        assert!(is_bullet_marker("•"));
        assert!(is_bullet_marker("-"));

        assert!(!is_number_marker("Name"));
        assert!(!is_number_marker(""));
        assert!(!is_bullet_marker("Alice"));
    }
}

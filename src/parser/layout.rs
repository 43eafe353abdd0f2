//! Layout analysis over PDF content streams.
//!
//! Walks a page's content stream tracking the graphics and text state,
//! producing positioned text spans and image placements in PDF user space
//! (bottom-left origin). Spans are then grouped into lines and blocks.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};

use super::backend::{decode_text_simple, resolve_dict, resolve_object};

/// Nested form XObjects deeper than this are ignored.
const MAX_FORM_DEPTH: usize = 4;

/// Average glyph advance as a fraction of the font size, used when glyph
/// widths are not consulted.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// TJ adjustments (thousandths of text space) larger than this read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A text span with position and font information.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
}

impl TextSpan {
    /// Create a span whose width is estimated from its character count.
    pub fn new(text: String, x: f32, y: f32, font_size: f32, font_name: String) -> Self {
        let width = text.chars().count() as f32 * font_size * AVG_GLYPH_WIDTH;
        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom Y coordinate (approximate descender).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }

    /// Top Y coordinate (approximate ascender).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }
}

/// Rectangle in PDF user space (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl PdfRect {
    pub fn area(&self) -> f32 {
        (self.right - self.left).max(0.0) * (self.top - self.bottom).max(0.0)
    }

    /// Bounding box of a set of spans.
    pub fn around_spans<'a>(spans: impl IntoIterator<Item = &'a TextSpan>) -> Option<Self> {
        spans.into_iter().fold(None, |acc, s| {
            let rect = PdfRect {
                left: s.x,
                bottom: s.bottom(),
                right: s.right(),
                top: s.top(),
            };
            Some(match acc {
                None => rect,
                Some(r) => PdfRect {
                    left: r.left.min(rect.left),
                    bottom: r.bottom.min(rect.bottom),
                    right: r.right.max(rect.right),
                    top: r.top.max(rect.top),
                },
            })
        })
    }
}

/// An image XObject drawn on the page.
#[derive(Debug, Clone)]
pub struct ImagePlacement {
    /// Resource name (e.g. "Im1")
    pub name: String,
    /// Object holding the image stream
    pub object: ObjectId,
    /// Where the unit square lands on the page
    pub rect: PdfRect,
}

/// Everything positioned on one page.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub spans: Vec<TextSpan>,
    pub images: Vec<ImagePlacement>,
}

impl PageLayout {
    /// All span text in content-stream order.
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translation(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands[..6].iter().filter_map(get_number).collect();
        if n.len() < 6 {
            return None;
        }
        Some(Matrix {
            a: n[0],
            b: n[1],
            c: n[2],
            d: n[3],
            e: n[4],
            f: n[5],
        })
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// Bounding box of the transformed unit square.
    fn unit_square_bounds(&self) -> PdfRect {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        let xs = corners.iter().map(|c| c.0);
        let ys = corners.iter().map(|c| c.1);
        PdfRect {
            left: xs.clone().fold(f32::INFINITY, f32::min),
            right: xs.fold(f32::NEG_INFINITY, f32::max),
            bottom: ys.clone().fold(f32::INFINITY, f32::min),
            top: ys.fold(f32::NEG_INFINITY, f32::max),
        }
    }
}

/// Text state inside a BT/ET pair.
#[derive(Debug, Clone)]
struct TextState {
    matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            leading: 0.0,
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 12.0,
        }
    }
}

impl TextState {
    fn begin(&mut self) {
        self.matrix = Matrix::IDENTITY;
        self.line_matrix = Matrix::IDENTITY;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading.abs() > f32::EPSILON {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.matrix = Matrix::translation(tx, 0.0).then(&self.matrix);
    }
}

/// Font dictionaries in scope, keyed by resource name.
type FontMap<'a> = BTreeMap<Vec<u8>, &'a Dictionary>;

/// Walk the content stream of a page.
pub fn walk_page(doc: &LopdfDocument, page_id: ObjectId) -> Result<PageLayout> {
    let fonts: FontMap = doc.get_page_fonts(page_id).unwrap_or_default();
    let resources = page_resources(doc, page_id);
    let content = page_content(doc, page_id)?;

    let mut walker = Walker {
        doc,
        layout: PageLayout::default(),
    };
    walker.walk(&content, resources, &fonts, Matrix::IDENTITY, 0)?;
    Ok(walker.layout)
}

struct Walker<'a> {
    doc: &'a LopdfDocument,
    layout: PageLayout,
}

impl<'a> Walker<'a> {
    fn walk(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        fonts: &FontMap<'a>,
        base_ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let content =
            lopdf::content::Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut ctm = base_ctm;
        let mut stack: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();
        let mut in_text = false;

        for op in content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => ctm = stack.pop().unwrap_or(base_ctm),
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "BT" => {
                    in_text = true;
                    text.begin();
                }
                "ET" => in_text = false,
                "Tf" => {
                    if let (Some(Object::Name(key)), Some(size)) =
                        (operands.first(), operands.get(1).and_then(get_number))
                    {
                        text.font_key = key.clone();
                        text.font_name = fonts
                            .get(key.as_slice())
                            .and_then(|f| f.get(b"BaseFont").ok())
                            .and_then(|o| o.as_name().ok())
                            .map(|n| String::from_utf8_lossy(n).to_string())
                            .unwrap_or_else(|| String::from_utf8_lossy(key).to_string());
                        text.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(get_number) {
                        text.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    let tx = operands.first().and_then(get_number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(get_number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        text.leading = -ty;
                    }
                    text.move_line(tx, ty);
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        text.matrix = m;
                        text.line_matrix = m;
                    }
                }
                "T*" => text.next_line(),
                "Tj" if in_text => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let decoded = self.decode(fonts, &text.font_key, bytes);
                        self.show(&mut text, &ctm, decoded, 0.0);
                    }
                }
                "TJ" if in_text => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let (decoded, adjust) = self.decode_tj(fonts, &text.font_key, items);
                        self.show(&mut text, &ctm, decoded, adjust);
                    }
                }
                "'" | "\"" => {
                    text.next_line();
                    let idx = if op.operator == "\"" { 2 } else { 0 };
                    if in_text {
                        if let Some(Object::String(bytes, _)) = operands.get(idx) {
                            let decoded = self.decode(fonts, &text.font_key, bytes);
                            self.show(&mut text, &ctm, decoded, 0.0);
                        }
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(name, resources, &ctm, depth);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Record a text-showing operation and advance the text matrix.
    fn show(&mut self, text: &mut TextState, ctm: &Matrix, decoded: String, adjust: f32) {
        let chars = decoded.chars().count() as f32;
        let advance = chars * text.font_size * AVG_GLYPH_WIDTH - adjust / 1000.0 * text.font_size;
        let render = text.matrix.then(ctm);

        if !decoded.trim().is_empty() {
            let (x, y) = render.apply(0.0, 0.0);
            let size = text.font_size * render.vertical_scale();
            let width = advance.max(0.0) * render.horizontal_scale();
            self.layout.spans.push(
                TextSpan::new(decoded, x, y, size, text.font_name.clone()).with_width(width),
            );
        }
        text.advance(advance);
    }

    fn decode(&self, fonts: &FontMap<'a>, font_key: &[u8], bytes: &[u8]) -> String {
        if let Some(font_dict) = fonts.get(font_key) {
            if let Ok(enc) = font_dict.get_font_encoding(self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }

    /// Decode a TJ array; returns the text and the summed positioning adjustment.
    fn decode_tj(&self, fonts: &FontMap<'a>, font_key: &[u8], items: &[Object]) -> (String, f32) {
        let mut combined = String::new();
        let mut adjust = 0.0;
        for item in items {
            match item {
                Object::String(bytes, _) => combined.push_str(&self.decode(fonts, font_key, bytes)),
                other => {
                    if let Some(n) = get_number(other) {
                        adjust += n;
                        if -n > TJ_SPACE_THRESHOLD
                            && !combined.is_empty()
                            && !combined.ends_with(' ')
                            && !combined.chars().last().is_some_and(is_spaceless_script_char)
                        {
                            combined.push(' ');
                        }
                    }
                }
            }
        }
        (combined, adjust)
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: &Matrix,
        depth: usize,
    ) {
        let doc = self.doc;
        let Some(xobjects) = resources.and_then(|r| resolve_dict(doc, r, b"XObject")) else {
            return;
        };
        let Ok(Object::Reference(id)) = xobjects.get(name) else {
            return;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            return;
        };

        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name().ok())
            .unwrap_or(b"");

        match subtype {
            b"Image" => self.layout.images.push(ImagePlacement {
                name: String::from_utf8_lossy(name).to_string(),
                object: *id,
                rect: ctm.unit_square_bounds(),
            }),
            b"Form" if depth < MAX_FORM_DEPTH => {
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| m.as_array().ok())
                    .and_then(|m| Matrix::from_operands(m))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = resolve_dict(doc, &stream.dict, b"Resources").or(resources);
                let fonts = form_resources
                    .map(|r| fonts_in(doc, r))
                    .unwrap_or_default();
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                if let Err(e) = self.walk(&data, form_resources, &fonts, form_matrix.then(ctm), depth + 1) {
                    log::debug!("Skipping form XObject {}: {}", String::from_utf8_lossy(name), e);
                }
            }
            _ => {}
        }
    }
}

/// Font dictionaries declared in a resource dictionary.
fn fonts_in<'a>(doc: &'a LopdfDocument, resources: &'a Dictionary) -> FontMap<'a> {
    let mut fonts = FontMap::new();
    if let Some(font_dict) = resolve_dict(doc, resources, b"Font") {
        for (key, value) in font_dict.iter() {
            if let Some(Object::Dictionary(d)) = resolve_object(doc, value) {
                fonts.insert(key.clone(), d);
            }
        }
    }
    fonts
}

/// Resources of a page, following the Parent chain for inherited entries.
pub(crate) fn page_resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    inherited(doc, page_id, b"Resources").and_then(|obj| match resolve_object(doc, obj) {
        Some(Object::Dictionary(d)) => Some(d),
        _ => None,
    })
}

/// Look up a page attribute, walking up the page tree when absent.
pub(crate) fn inherited<'a>(
    doc: &'a LopdfDocument,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Decompressed content stream of a page; pages without Contents are empty.
fn page_content(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::PdfParse(e.to_string()))?;

    let Ok(contents) = page_dict.get(b"Contents") else {
        return Ok(Vec::new());
    };

    let streams: Vec<&Object> = match resolve_object(doc, contents) {
        Some(Object::Array(arr)) => arr.iter().collect(),
        Some(other) => vec![other],
        None => return Err(Error::PdfParse("Invalid content stream".to_string())),
    };

    let mut content = Vec::new();
    for obj in streams {
        if let Some(Object::Stream(s)) = resolve_object(doc, obj) {
            let data = s
                .decompressed_content()
                .unwrap_or_else(|_| s.content.clone());
            content.extend_from_slice(&data);
            content.push(b'\n');
        }
    }
    Ok(content)
}

/// A text line composed of spans on the same baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans in this line, sorted by X position
    pub spans: Vec<TextSpan>,
    /// Y position (baseline)
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size in this line
    pub font_size: f32,
}

impl TextLine {
    /// Create a line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.total_cmp(&b.x));

        let total_chars: usize = spans.iter().map(|s| s.text.len()).sum();
        let weighted: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.len() as f32)
            .sum();
        let font_size = match (total_chars, spans.first()) {
            (0, Some(first)) => first.font_size,
            (0, None) => 0.0,
            _ => weighted / total_chars as f32,
        };

        let (x, y) = spans.first().map(|s| (s.x, s.y)).unwrap_or((0.0, 0.0));
        Self {
            spans,
            y,
            x,
            font_size,
        }
    }

    /// Right edge of the last span.
    pub fn right(&self) -> f32 {
        self.spans.iter().map(TextSpan::right).fold(self.x, f32::max)
    }

    /// Combined text, with spaces inserted where spans are visibly apart.
    pub fn text(&self) -> String {
        let mut result = String::new();
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - prev.right();
                let threshold = span.font_size * AVG_GLYPH_WIDTH * 0.2;
                let both_spaceless = prev.text.chars().last().is_some_and(is_spaceless_script_char)
                    && span.text.chars().next().is_some_and(is_spaceless_script_char);
                if gap > threshold
                    && !both_spaceless
                    && !prev.text.ends_with(' ')
                    && !span.text.starts_with(' ')
                {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }
        result
    }
}

/// Consecutive lines forming one paragraph-like block.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn rect(&self) -> Option<PdfRect> {
        PdfRect::around_spans(self.lines.iter().flat_map(|l| l.spans.iter()))
    }
}

/// Group spans into lines by baseline, splitting lines at wide horizontal gaps
/// so that side-by-side columns stay apart.
pub fn group_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut rows: Vec<Vec<TextSpan>> = Vec::new();
    let mut current_y: Option<f32> = None;
    for span in spans {
        let tolerance = span.font_size * 0.3;
        match (current_y, rows.last_mut()) {
            (Some(y), Some(row)) if (span.y - y).abs() <= tolerance => row.push(span),
            _ => {
                current_y = Some(span.y);
                rows.push(vec![span]);
            }
        }
    }

    let mut lines = Vec::new();
    for mut row in rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
        let mut segment: Vec<TextSpan> = Vec::new();
        for span in row {
            let split = segment.last().is_some_and(|prev| {
                span.x - prev.right() > (span.font_size * 3.0).max(30.0)
            });
            if split {
                lines.push(TextLine::from_spans(std::mem::take(&mut segment)));
            }
            segment.push(span);
        }
        if !segment.is_empty() {
            lines.push(TextLine::from_spans(segment));
        }
    }
    lines
}

/// Group top-to-bottom lines into blocks.
///
/// A line joins the most recent open block it overlaps horizontally when the
/// vertical gap and font size are consistent with that block.
pub fn group_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let avg_spacing = average_line_spacing(&lines);
    let mut blocks: Vec<TextBlock> = Vec::new();

    for line in lines {
        let target = blocks.iter().rposition(|block| {
            let Some(last) = block.lines.last() else {
                return false;
            };
            let overlaps = line.x < last.right() && last.x < line.right();
            let spacing = last.y - line.y;
            overlaps
                && spacing > 0.0
                && spacing <= avg_spacing * 1.5
                && (last.font_size - line.font_size).abs() <= 1.0
        });
        match target {
            Some(idx) => blocks[idx].lines.push(line),
            None => blocks.push(TextBlock { lines: vec![line] }),
        }
    }
    blocks
}

fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let mut ys: Vec<f32> = lines.iter().map(|l| l.y).collect();
    ys.sort_by(|a, b| b.total_cmp(a));
    ys.dedup_by(|a, b| (*a - *b).abs() < 0.1);

    let spacings: Vec<f32> = ys.windows(2).map(|w| w[0] - w[1]).collect();
    if spacings.is_empty() {
        let size = lines.first().map(|l| l.font_size).unwrap_or(10.0);
        return size * 1.2;
    }
    // Median resists paragraph gaps skewing the estimate.
    let mut sorted = spacings;
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted[(sorted.len() - 1) / 2]
}

/// Helper to extract number from PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Scripts written without spaces between words (Chinese, Japanese).
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        || (0x3040..=0x30FF).contains(&code)
        || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text.to_string(), x, y, 10.0, "Helvetica".to_string())
    }

    #[test]
    fn test_matrix_composition() {
        let scale = Matrix {
            a: 2.0,
            d: 2.0,
            ..Matrix::IDENTITY
        };
        let shift = Matrix::translation(10.0, 20.0);
        // Scale first, then shift.
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 22.0));
        // Shift first, then scale.
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 42.0));
    }

    #[test]
    fn test_unit_square_bounds() {
        let m = Matrix {
            a: 200.0,
            b: 0.0,
            c: 0.0,
            d: 100.0,
            e: 50.0,
            f: 600.0,
        };
        let rect = m.unit_square_bounds();
        assert_eq!(rect.left, 50.0);
        assert_eq!(rect.right, 250.0);
        assert_eq!(rect.bottom, 600.0);
        assert_eq!(rect.top, 700.0);
    }

    #[test]
    fn test_text_state_lines() {
        let mut state = TextState::default();
        state.begin();
        state.move_line(72.0, 700.0);
        state.leading = 14.0;
        state.next_line();
        assert_eq!(state.matrix.apply(0.0, 0.0), (72.0, 686.0));

        state.advance(30.0);
        assert_eq!(state.matrix.apply(0.0, 0.0), (102.0, 686.0));
        // Line matrix is untouched by glyph advance.
        state.next_line();
        assert_eq!(state.matrix.apply(0.0, 0.0), (72.0, 672.0));
    }

    #[test]
    fn test_line_text_spacing() {
        let line = TextLine::from_spans(vec![span("World", 110.0, 100.0), span("Hello", 72.0, 100.0)]);
        assert_eq!(line.text(), "Hello World");

        let adjacent = TextLine::from_spans(vec![span("ab", 72.0, 100.0), span("cd", 82.0, 100.0)]);
        assert_eq!(adjacent.text(), "abcd");
    }

    #[test]
    fn test_group_into_lines_splits_columns() {
        let spans = vec![
            span("Left column", 72.0, 700.0),
            span("Right column", 320.0, 700.0),
            span("Next", 72.0, 688.0),
        ];
        let lines = group_into_lines(spans);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text(), "Left column");
        assert_eq!(lines[1].text(), "Right column");
        assert_eq!(lines[2].text(), "Next");
    }

    #[test]
    fn test_group_into_blocks() {
        let spans = vec![
            span("First paragraph line one", 72.0, 700.0),
            span("First paragraph line two", 72.0, 688.0),
            span("Second paragraph", 72.0, 640.0),
            span("Right column text", 320.0, 700.0),
            span("Right column more", 320.0, 688.0),
        ];
        let blocks = group_into_blocks(group_into_lines(spans));
        let texts: Vec<String> = blocks.iter().map(TextBlock::text).collect();
        assert_eq!(
            texts,
            vec![
                "First paragraph line one\nFirst paragraph line two",
                "Right column text\nRight column more",
                "Second paragraph",
            ]
        );
    }

    #[test]
    fn test_rect_around_spans() {
        let spans = [span("ab", 10.0, 100.0), span("cdef", 50.0, 90.0)];
        let rect = PdfRect::around_spans(spans.iter()).unwrap();
        assert_eq!(rect.left, 10.0);
        assert_eq!(rect.right, 70.0);
        assert_eq!(rect.top, 108.0);
        assert_eq!(rect.bottom, 88.0);
        assert!(PdfRect::around_spans(std::iter::empty()).is_none());
    }
}

//! Extracted page elements.

use super::Region;
use serde::{Deserialize, Serialize};

/// Kind of content an element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Table,
    Image,
    Chart,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Text => "text",
            ElementKind::Table => "table",
            ElementKind::Image => "image",
            ElementKind::Chart => "chart",
        }
    }
}

/// Extraction technique that produced an element.
///
/// Variants are declared in precedence order: when two techniques cover the
/// same content the earlier one is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Rule,
    Ocr,
    Llm,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Rule => "rule",
            Origin::Ocr => "ocr",
            Origin::Llm => "llm",
        }
    }
}

/// Reference to image bytes extracted from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Identifier unique within the document (e.g. "p2_Im1")
    pub id: String,

    /// MIME type (e.g., "image/png")
    pub mime_type: String,

    /// Width in pixels
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub width: Option<u32>,

    /// Height in pixels
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub height: Option<u32>,

    /// File the image was exported to, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<String>,

    /// Encoded image bytes
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl ImageRef {
    pub fn new(id: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            width: None,
            height: None,
            path: None,
            data,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Pixel size, if known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/jp2" => "jp2",
            "image/tiff" => "tiff",
            _ => "bin",
        }
    }

    /// Suggested file name for export.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.extension())
    }

    /// Whether the bytes are in a format image tools can open.
    pub fn is_decodable(&self) -> bool {
        matches!(
            self.mime_type.as_str(),
            "image/jpeg" | "image/png" | "image/tiff"
        )
    }
}

/// Chart payload: the chart image (by id) and any recovered labels/values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image: Option<String>,
    pub data: Vec<Vec<String>>,
}

/// Element payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Grid(Vec<Vec<String>>),
    Chart(ChartData),
    Image(ImageRef),
}

/// One unit of extracted content on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: ElementKind,

    pub origin: Origin,

    /// Name of the backend that produced the element
    pub backend: String,

    pub content: Content,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub region: Option<Region>,

    /// Backend confidence in 0..=1, when reported
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence: Option<f32>,
}

impl Element {
    fn new(kind: ElementKind, origin: Origin, backend: &str, content: Content) -> Self {
        Self {
            kind,
            origin,
            backend: backend.to_string(),
            content,
            region: None,
            confidence: None,
        }
    }

    /// Create a text block.
    pub fn text(origin: Origin, backend: &str, text: impl Into<String>) -> Self {
        Self::new(ElementKind::Text, origin, backend, Content::Text(text.into()))
    }

    /// Create a table from rows of cell strings.
    pub fn table(origin: Origin, backend: &str, rows: Vec<Vec<String>>) -> Self {
        Self::new(ElementKind::Table, origin, backend, Content::Grid(rows))
    }

    /// Create an image element.
    pub fn image(origin: Origin, backend: &str, image: ImageRef) -> Self {
        Self::new(ElementKind::Image, origin, backend, Content::Image(image))
    }

    /// Create a chart element.
    pub fn chart(origin: Origin, backend: &str, chart: ChartData) -> Self {
        Self::new(ElementKind::Chart, origin, backend, Content::Chart(chart))
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// True when the element carries no usable content.
    pub fn is_empty(&self) -> bool {
        match &self.content {
            Content::Text(text) => text.trim().is_empty(),
            Content::Grid(rows) => grid_is_blank(rows),
            Content::Chart(chart) => chart.image.is_none() && grid_is_blank(&chart.data),
            Content::Image(image) => image.data.is_empty() && image.path.is_none(),
        }
    }

    /// Text payload, for text blocks.
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Cell rows, for tables.
    pub fn as_grid(&self) -> Option<&[Vec<String>]> {
        match &self.content {
            Content::Grid(rows) => Some(rows),
            _ => None,
        }
    }

    /// Image reference, for images.
    pub fn as_image(&self) -> Option<&ImageRef> {
        match &self.content {
            Content::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Plain-text rendering used in prompts and summaries.
    pub fn plain_text(&self) -> String {
        match &self.content {
            Content::Text(text) => text.clone(),
            Content::Grid(rows) => rows_to_text(rows),
            Content::Chart(chart) => rows_to_text(&chart.data),
            Content::Image(image) => format!("[image {}]", image.id),
        }
    }
}

fn grid_is_blank(rows: &[Vec<String>]) -> bool {
    rows.iter().flatten().all(|cell| cell.trim().is_empty())
}

fn rows_to_text(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| row.join(" | "))
        .collect::<Vec<_>>()
        .join("\n")
}

//! Document model types.
//!
//! Pages carry ordered [`Element`]s tagged with the technique that produced
//! them; the assembled [`HierarchicalDocument`] is what gets serialized.

mod document;
mod element;
mod page;
mod region;
mod stats;

pub use document::{parse_pdf_date, DocumentInfo, HierarchicalDocument, PageNode};
pub use element::{ChartData, Content, Element, ElementKind, ImageRef, Origin};
pub use page::{Classification, ExtractionResult, PageHandle, PageIssue, DEFAULT_PAGE_SIZE};
pub use region::Region;
pub use stats::ConversionStats;

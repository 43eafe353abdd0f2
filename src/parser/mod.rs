//! PDF parsing module.
//!
//! Loading, content-stream walking, image decoding and stream-mode table
//! detection on top of `lopdf`.

mod backend;
mod layout;
pub mod raster;
mod table_detector;
mod xobject;

pub use backend::{decode_text_simple, LopdfBackend};
pub(crate) use backend::{resolve_dict, resolve_object};
pub(crate) use layout::page_resources;
pub use layout::{
    group_into_blocks, group_into_lines, walk_page, ImagePlacement, PageLayout, PdfRect, TextBlock,
    TextLine, TextSpan,
};
pub use table_detector::{DetectedTable, TableDetector, TableDetectorConfig};
pub use xobject::{decode_image_stream, encode_png};

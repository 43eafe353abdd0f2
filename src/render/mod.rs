//! Output of assembled documents: JSON and extracted image files.

mod assets;
mod json;

pub use assets::export_assets;
pub use json::{to_json, JsonFormat};

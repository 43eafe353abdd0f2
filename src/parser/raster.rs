//! Full page rendering through pdfium.
//!
//! The pdfium shared library is bound once per process, from the working
//! directory or the system library path. When it is missing every render
//! reports `BackendUnavailable` and callers fall back to embedded images.

use crate::error::{Error, Result};
use crate::model::{ImageRef, PageHandle};

/// Resolution pages are rendered at.
pub const RASTER_DPI: f32 = 200.0;

/// Longest side of a rendered page, in pixels.
const MAX_SIDE: f32 = 6000.0;

const NAME: &str = "pdfium";

/// Pixel size of a page rendered at `dpi`, capped at [`MAX_SIDE`].
pub fn target_size(page: &PageHandle, dpi: f32) -> (u32, u32) {
    let mut scale = dpi / 72.0;
    let longest = page.width.max(page.height) * scale;
    if longest > MAX_SIDE {
        scale *= MAX_SIDE / longest;
    }
    let side = |points: f32| (points * scale).round().max(1.0) as u32;
    (side(page.width), side(page.height))
}

#[cfg(feature = "pdfium")]
mod imp {
    use std::sync::OnceLock;

    use pdfium_render::prelude::*;

    use super::*;
    use crate::parser::encode_png;

    static PDFIUM: OnceLock<Option<Pdfium>> = OnceLock::new();

    fn pdfium() -> Option<&'static Pdfium> {
        PDFIUM
            .get_or_init(|| {
                match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                    .or_else(|_| Pdfium::bind_to_system_library())
                {
                    Ok(bindings) => Some(Pdfium::new(bindings)),
                    Err(e) => {
                        log::debug!("pdfium not bound: {:?}", e);
                        None
                    }
                }
            })
            .as_ref()
    }

    pub fn is_available() -> bool {
        pdfium().is_some()
    }

    pub fn render_page(data: &[u8], page: &PageHandle, dpi: f32) -> Result<ImageRef> {
        let pdfium = pdfium().ok_or_else(|| Error::unavailable(NAME, "pdfium library not found"))?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(|e| Error::failure(NAME, format!("cannot open document: {:?}", e)))?;

        let index = PdfPageIndex::try_from(page.number.saturating_sub(1))
            .map_err(|_| Error::failure(NAME, format!("page {} out of range", page.number)))?;
        let pdf_page = document
            .pages()
            .get(index)
            .map_err(|e| Error::failure(NAME, format!("page {}: {:?}", page.number, e)))?;

        let (width, height) = target_size(page, dpi);
        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32)
            .render_form_data(true)
            .render_annotations(true);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| Error::failure(NAME, format!("page {}: {:?}", page.number, e)))?;

        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        let rgba = bitmap.as_rgba_bytes();
        let rgb: Vec<u8> = rgba.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect();
        let png = encode_png(&rgb, width, height, 3)?;

        log::debug!("Rendered page {} at {}x{}", page.number, width, height);
        Ok(ImageRef::new(format!("p{}_raster", page.number), "image/png", png).with_dimensions(width, height))
    }
}

#[cfg(not(feature = "pdfium"))]
mod imp {
    use super::*;

    pub fn is_available() -> bool {
        false
    }

    pub fn render_page(_data: &[u8], _page: &PageHandle, _dpi: f32) -> Result<ImageRef> {
        Err(Error::unavailable(NAME, "built without the pdfium feature"))
    }
}

pub use imp::{is_available, render_page};

//! Rule-based extraction straight from the PDF content streams.

use std::collections::HashSet;

use lopdf::Object;

use crate::error::{Error, Result};
use crate::model::{DocumentInfo, Element, Origin, PageHandle, Region};
use crate::parser::{
    decode_image_stream, group_into_blocks, group_into_lines, page_resources, raster, resolve_dict,
    resolve_object, LopdfBackend, PdfRect, TableDetector,
};
use crate::text::TextCleaner;

use super::{ImageInput, RuleBackend};

const NAME: &str = "lopdf";

fn to_region(rect: &PdfRect, page: &PageHandle) -> Region {
    Region::from_pdf_rect(rect.left, rect.bottom, rect.right, rect.top, page.height)
}

impl RuleBackend for LopdfBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn pages(&self) -> Vec<PageHandle> {
        self.page_handles()
    }

    fn info(&self) -> DocumentInfo {
        self.document_info()
    }

    fn probe_text(&self, page: &PageHandle) -> Result<String> {
        Ok(self.layout(page.number)?.text())
    }

    fn extract_native_text(&self, page: &PageHandle) -> Result<Vec<Element>> {
        let layout = self.layout(page.number)?;
        let (_, remaining) = TableDetector::new().detect(layout.spans.clone());
        let cleaner = TextCleaner::global();

        let elements: Vec<Element> = group_into_blocks(group_into_lines(remaining))
            .into_iter()
            .filter_map(|block| {
                let text = cleaner.clean_block(&block.text());
                if text.is_empty() {
                    return None;
                }
                let element = Element::text(Origin::Rule, NAME, text);
                Some(match block.rect() {
                    Some(rect) => element.with_region(to_region(&rect, page)),
                    None => element,
                })
            })
            .collect();

        log::debug!("Page {}: {} native text blocks", page.number, elements.len());
        Ok(elements)
    }

    fn extract_native_tables(&self, page: &PageHandle) -> Result<Vec<Element>> {
        let layout = self.layout(page.number)?;
        let (tables, _) = TableDetector::new().detect(layout.spans.clone());
        let cleaner = TextCleaner::global();

        let elements: Vec<Element> = tables
            .into_iter()
            .map(|table| {
                let rows = table
                    .cells
                    .iter()
                    .map(|row| row.iter().map(|cell| cleaner.clean_inline(cell)).collect())
                    .collect();
                Element::table(Origin::Rule, NAME, rows).with_region(to_region(&table.rect, page))
            })
            .collect();

        log::debug!("Page {}: {} native tables", page.number, elements.len());
        Ok(elements)
    }

    fn extract_images(&self, page: &PageHandle) -> Result<Vec<Element>> {
        let layout = self.layout(page.number)?;
        let doc = self.raw_doc();
        let mut seen_ids = HashSet::new();
        let mut elements = Vec::new();

        for (index, placement) in layout.images.iter().enumerate() {
            let stream = match doc.get_object(placement.object).and_then(Object::as_stream) {
                Ok(stream) => stream,
                Err(e) => {
                    log::debug!("Page {}: image {} unreadable: {}", page.number, placement.name, e);
                    continue;
                }
            };

            let mut id = format!("p{}_{}", page.number, placement.name);
            if !seen_ids.insert(id.clone()) {
                id = format!("{}_{}", id, index + 1);
            }

            match decode_image_stream(stream, id) {
                Ok(image) => elements.push(
                    Element::image(Origin::Rule, NAME, image).with_region(to_region(&placement.rect, page)),
                ),
                Err(e) => log::debug!("Page {}: skipping image {}: {}", page.number, placement.name, e),
            }
        }

        Ok(elements)
    }

    fn render_page(&self, page: &PageHandle) -> Result<ImageInput> {
        match raster::render_page(self.data(), page, raster::RASTER_DPI) {
            Ok(image) => return Ok(ImageInput::new(image, page.bounds())),
            Err(e) => log::debug!("Page {}: falling back to embedded images: {}", page.number, e),
        }
        self.largest_embedded_image(page)
    }
}

impl LopdfBackend {
    /// The biggest image on the page, standing in for a rendered page.
    ///
    /// A scan is usually one image covering the page; the raster region is
    /// where that image is drawn.
    fn largest_embedded_image(&self, page: &PageHandle) -> Result<ImageInput> {
        let layout = self.layout(page.number)?;
        let doc = self.raw_doc();

        let largest_placed = layout
            .images
            .iter()
            .max_by(|a, b| a.rect.area().total_cmp(&b.rect.area()));
        if let Some(placement) = largest_placed {
            let stream = doc.get_object(placement.object).and_then(Object::as_stream)?;
            let image = decode_image_stream(stream, format!("p{}_raster", page.number))?;
            return Ok(ImageInput::new(image, to_region(&placement.rect, page)));
        }

        // Image XObjects declared on the page but not drawn through a content stream
        // we could follow (e.g. inside an unreadable form).
        let page_id = self.page_id(page.number)?;
        let mut best: Option<(u64, &lopdf::Stream)> = None;
        if let Some(xobjects) = page_resources(doc, page_id).and_then(|r| resolve_dict(doc, r, b"XObject")) {
            for (_, value) in xobjects.iter() {
                let Some(Object::Stream(stream)) = resolve_object(doc, value) else {
                    continue;
                };
                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .is_ok_and(|s| s == b"Image");
                if !is_image {
                    continue;
                }
                let dim = |key: &[u8]| stream.dict.get(key).and_then(Object::as_i64).unwrap_or(0).max(0) as u64;
                let pixels = dim(b"Width").saturating_mul(dim(b"Height"));
                if best.map_or(true, |(area, _)| pixels > area) {
                    best = Some((pixels, stream));
                }
            }
        }

        match best {
            Some((_, stream)) => {
                let image = decode_image_stream(stream, format!("p{}_raster", page.number))?;
                Ok(ImageInput::new(image, page.bounds()))
            }
            None => Err(Error::unavailable(
                NAME,
                format!("page {} has no image to rasterize", page.number),
            )),
        }
    }
}

//! Document access backed by lopdf.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::detect::{detect_format_from_bytes, PdfFormat};
use crate::error::{Error, Result};
use crate::model::{parse_pdf_date, DocumentInfo, PageHandle, DEFAULT_PAGE_SIZE};

use super::layout::{inherited, walk_page, PageLayout};

/// A loaded PDF document.
///
/// Page layouts are computed on first use and cached, since classification
/// and each extraction step read the same content stream.
pub struct LopdfBackend {
    doc: LopdfDocument,
    /// File bytes from the header on, for page rendering
    data: Vec<u8>,
    format: PdfFormat,
    pages: BTreeMap<u32, ObjectId>,
    source: Option<String>,
    layouts: Mutex<HashMap<u32, Arc<PageLayout>>>,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let backend = Self::load_bytes(&data)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(backend.with_source(source))
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let format = detect_format_from_bytes(data)?;
        let body = &data[format.offset..];
        let doc = LopdfDocument::load_mem(body).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        let pages = doc.get_pages();
        Ok(Self {
            doc,
            data: body.to_vec(),
            format,
            pages,
            source: None,
            layouts: Mutex::new(HashMap::new()),
        })
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    /// Label the document (usually its file name).
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// The document bytes, starting at the `%PDF-` header.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// PDF version from the file header.
    pub fn version(&self) -> &str {
        &self.format.version
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Object id of a page (1-indexed).
    pub fn page_id(&self, number: u32) -> Result<ObjectId> {
        self.pages
            .get(&number)
            .copied()
            .ok_or(Error::PageOutOfRange(number, self.page_count()))
    }

    /// Handles for every page, in order.
    pub fn page_handles(&self) -> Vec<PageHandle> {
        self.pages
            .iter()
            .map(|(&number, &id)| {
                let (width, height) = self.page_dimensions(id);
                PageHandle::new(number, width, height)
            })
            .collect()
    }

    /// Page size from the (possibly inherited) MediaBox.
    fn page_dimensions(&self, page_id: ObjectId) -> (f32, f32) {
        let media_box = inherited(&self.doc, page_id, b"MediaBox")
            .and_then(|obj| resolve_object(&self.doc, obj))
            .and_then(|obj| obj.as_array().ok());

        if let Some(array) = media_box {
            let values: Vec<f32> = array
                .iter()
                .filter_map(|o| resolve_object(&self.doc, o))
                .filter_map(super::layout::get_number)
                .collect();
            if values.len() >= 4 {
                let width = (values[2] - values[0]).abs();
                let height = (values[3] - values[1]).abs();
                if width > 0.0 && height > 0.0 {
                    return (width, height);
                }
            }
        }
        DEFAULT_PAGE_SIZE
    }

    /// Positioned content of a page.
    pub fn layout(&self, number: u32) -> Result<Arc<PageLayout>> {
        if let Ok(cache) = self.layouts.lock() {
            if let Some(layout) = cache.get(&number) {
                return Ok(Arc::clone(layout));
            }
        }

        let layout = Arc::new(walk_page(&self.doc, self.page_id(number)?)?);
        if let Ok(mut cache) = self.layouts.lock() {
            cache.insert(number, Arc::clone(&layout));
        }
        Ok(layout)
    }

    /// Document metadata from the Info dictionary.
    pub fn document_info(&self) -> DocumentInfo {
        let mut info = DocumentInfo::with_version(self.format.version.clone());
        info.source = self.source.clone();
        info.page_count = self.page_count();
        info.encrypted = self.doc.is_encrypted();

        let info_dict = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| resolve_object(&self.doc, obj))
            .and_then(|obj| obj.as_dict().ok());

        if let Some(dict) = info_dict {
            let field = |key: &[u8]| string_entry(&self.doc, dict, key);
            info.title = field(b"Title");
            info.author = field(b"Author");
            info.subject = field(b"Subject");
            info.creator = field(b"Creator");
            info.producer = field(b"Producer");
            info.created = field(b"CreationDate").and_then(|d| parse_pdf_date(&d));
            info.modified = field(b"ModDate").and_then(|d| parse_pdf_date(&d));
        }
        info
    }
}

/// Follow a reference to the object it points at.
pub(crate) fn resolve_object<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Dictionary stored (directly or by reference) under `key`.
pub(crate) fn resolve_dict<'a>(
    doc: &'a LopdfDocument,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    let obj = dict.get(key).ok()?;
    match resolve_object(doc, obj)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

fn string_entry(doc: &LopdfDocument, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let obj = resolve_object(doc, dict.get(key).ok()?)?;
    match obj {
        Object::String(bytes, _) => {
            let text = decode_text_simple(bytes);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_load_rejects_non_pdf() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"plain text, not a pdf"),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_load_rejects_truncated_pdf() {
        let result = LopdfBackend::load_bytes(b"%PDF-1.7\n1 0 obj\n<<");
        assert!(matches!(result, Err(e) if e.is_fatal()));
    }
}

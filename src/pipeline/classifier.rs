//! Native/scanned page classification.

use std::sync::Arc;

use crate::backend::RuleBackend;
use crate::config::PipelineConfig;
use crate::error::Error;
use crate::model::{Classification, PageHandle, PageIssue};
use crate::text::meaningful_chars;

use super::timeout::call_backend;

/// Classify a page by probing its native text layer.
///
/// A page is native when the probe yields at least `min_native_chars`
/// alphanumeric characters. A failed probe classifies the page as scanned and
/// returns the issue to record.
pub fn classify(
    source: &Arc<dyn RuleBackend>,
    page: &PageHandle,
    config: &PipelineConfig,
) -> (Classification, Option<PageIssue>) {
    let backend = Arc::clone(source);
    let handle = *page;
    let probe = call_backend(source.name(), config.backend_timeout, move || {
        backend.probe_text(&handle)
    });

    match probe {
        Ok(text) => {
            let chars = meaningful_chars(&text);
            let classification = if chars >= config.min_native_chars {
                Classification::Native
            } else {
                Classification::Scanned
            };
            log::debug!(
                "Page {}: {} meaningful chars, classified {:?}",
                page.number,
                chars,
                classification
            );
            (classification, None)
        }
        Err(e) => {
            log::warn!("Page {}: text probe failed, treating as scanned: {}", page.number, e);
            let issue = PageIssue::from_error(source.name(), &Error::ClassificationProbe(e.to_string()));
            (Classification::Scanned, Some(issue))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ImageInput;
    use crate::error::Result;
    use crate::model::{DocumentInfo, Element};

    struct ProbeOnly(Option<&'static str>);

    impl RuleBackend for ProbeOnly {
        fn name(&self) -> &str {
            "probe"
        }
        fn pages(&self) -> Vec<PageHandle> {
            vec![PageHandle::new(1, 612.0, 792.0)]
        }
        fn info(&self) -> DocumentInfo {
            DocumentInfo::with_version("1.7")
        }
        fn probe_text(&self, _page: &PageHandle) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| Error::PdfParse("broken content stream".to_string()))
        }
        fn extract_native_text(&self, _page: &PageHandle) -> Result<Vec<Element>> {
            Ok(vec![])
        }
        fn extract_native_tables(&self, _page: &PageHandle) -> Result<Vec<Element>> {
            Ok(vec![])
        }
        fn extract_images(&self, _page: &PageHandle) -> Result<Vec<Element>> {
            Ok(vec![])
        }
        fn render_page(&self, _page: &PageHandle) -> Result<ImageInput> {
            Err(Error::unavailable("probe", "no raster"))
        }
    }

    fn run(probe: Option<&'static str>) -> (Classification, Option<PageIssue>) {
        let source: Arc<dyn RuleBackend> = Arc::new(ProbeOnly(probe));
        let page = PageHandle::new(1, 612.0, 792.0);
        classify(&source, &page, &PipelineConfig::default())
    }

    #[test]
    fn test_native_page() {
        let (classification, issue) = run(Some("Annual report for the fiscal year"));
        assert_eq!(classification, Classification::Native);
        assert!(issue.is_none());
    }

    #[test]
    fn test_sparse_text_is_scanned() {
        let (classification, issue) = run(Some("  - 3 -  "));
        assert_eq!(classification, Classification::Scanned);
        assert!(issue.is_none());
    }

    #[test]
    fn test_probe_failure_defaults_to_scanned() {
        let (classification, issue) = run(None);
        assert_eq!(classification, Classification::Scanned);
        let issue = issue.unwrap();
        assert!(matches!(issue, PageIssue::ClassificationProbe { ref message } if message.contains("broken")));
        assert!(!issue.is_failure());
    }
}

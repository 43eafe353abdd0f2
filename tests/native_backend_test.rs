//! Rule-based extraction on PDFs built in memory with lopdf.

use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use hybridpdf::parser::raster;
use hybridpdf::{
    Classification, ElementKind, HybridPdf, LopdfBackend, PageIssue, PipelineConfig, Region,
    RuleBackend,
};

const PAGE_HEIGHT: f32 = 842.0;

fn text_at(x: i64, y: i64, size: i64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn draw_image(x: i64, y: i64, width: i64, height: i64) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![width.into(), 0.into(), 0.into(), height.into(), x.into(), y.into()],
        ),
        Operation::new("Do", vec!["Im1".into()]),
        Operation::new("Q", vec![]),
    ]
}

/// Page 1: heading, paragraph and a 3x3 table. Page 2: a full-page image only.
fn sample_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    // 4x2 RGB, uncompressed
    let samples: Vec<u8> = (0..24).map(|i| (i * 10) as u8).collect();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 4,
            "Height" => 2,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        samples,
    ));

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => dictionary! { "Im1" => image_id },
    });

    let mut first = Vec::new();
    first.extend(text_at(72, 750, 18, "Annual Report"));
    first.extend(text_at(72, 700, 11, "Revenue grew in every region this year."));
    first.extend(text_at(72, 686, 11, "Details per department follow below."));
    for (y, row) in [
        (600, ["Name", "Dept", "Score"]),
        (585, ["Alice", "Sales", "90"]),
        (570, ["Bob", "Support", "85"]),
    ] {
        for (x, cell) in [72, 200, 330].into_iter().zip(row) {
            first.extend(text_at(x, y, 11, cell));
        }
    }
    first.extend(draw_image(72, 300, 200, 100));

    let second = draw_image(0, 0, 595, 842);

    let page_ids: Vec<ObjectId> = [first, second]
        .into_iter()
        .map(|operations| {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            })
        })
        .collect();

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
        "Count" => page_ids.len() as i64,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Annual Report"),
        "Author" => Object::string_literal("Finance Team"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn backend() -> LopdfBackend {
    LopdfBackend::load_bytes(&sample_pdf()).unwrap()
}

#[test]
fn test_pages_and_info() {
    let backend = backend();
    let pages = backend.pages();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].number, 1);
    assert_eq!(pages[0].width, 595.0);
    assert_eq!(pages[0].height, PAGE_HEIGHT);

    let info = backend.info();
    assert_eq!(info.page_count, 2);
    assert_eq!(info.title.as_deref(), Some("Annual Report"));
    assert_eq!(info.author.as_deref(), Some("Finance Team"));
    assert!(!info.encrypted);
}

#[test]
fn test_probe_text() {
    let backend = backend();
    let pages = backend.pages();
    assert!(backend.probe_text(&pages[0]).unwrap().contains("Annual Report"));
    assert!(backend.probe_text(&pages[1]).unwrap().trim().is_empty());
}

#[test]
fn test_native_text_excludes_table_cells() {
    let backend = backend();
    let page = backend.pages()[0];
    let elements = backend.extract_native_text(&page).unwrap();
    assert!(!elements.is_empty());

    let all_text: String = elements.iter().filter_map(|e| e.as_text()).collect::<Vec<_>>().join("\n");
    assert!(all_text.contains("Annual Report"));
    assert!(all_text.contains("Revenue grew"));
    assert!(!all_text.contains("Alice"));

    let heading = elements
        .iter()
        .find(|e| e.as_text().is_some_and(|t| t.contains("Annual Report")))
        .unwrap();
    let region = heading.region.unwrap();
    // Top-left origin: the heading sits near the top of the page
    assert!(region.y0 < 120.0, "region: {:?}", region);
    assert!(region.x0 >= 70.0 && region.x0 <= 74.0);
}

#[test]
fn test_native_table() {
    let backend = backend();
    let page = backend.pages()[0];
    let tables = backend.extract_native_tables(&page).unwrap();
    assert_eq!(tables.len(), 1);

    let rows = tables[0].as_grid().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["Name", "Dept", "Score"]);
    assert_eq!(rows[2], vec!["Bob", "Support", "85"]);

    let region = tables[0].region.unwrap();
    assert!(region.y0 > PAGE_HEIGHT - 620.0 && region.y1 < PAGE_HEIGHT - 550.0, "region: {:?}", region);
}

#[test]
fn test_image_extraction() {
    let backend = backend();
    let page = backend.pages()[0];
    let images = backend.extract_images(&page).unwrap();
    assert_eq!(images.len(), 1);

    let image = images[0].as_image().unwrap();
    assert_eq!(image.id, "p1_Im1");
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(image.dimensions(), Some((4, 2)));
    assert!(image.data.starts_with(&[0x89, b'P', b'N', b'G']));
    assert_eq!(images[0].region, Some(Region::new(72.0, 442.0, 272.0, 542.0)));
}

#[test]
fn test_render_page_covers_scan() {
    let backend = backend();
    let page = backend.pages()[1];
    let raster = backend.render_page(&page).unwrap();
    assert_eq!(raster.image.mime_type, "image/png");
    assert_eq!(raster.region, Region::new(0.0, 0.0, 595.0, 842.0));
}

#[test]
fn test_render_page_with_text_and_image() {
    let backend = backend();
    let page = backend.pages()[0];
    let raster = backend.render_page(&page).unwrap();
    assert!(raster.image.data.starts_with(&[0x89, b'P', b'N', b'G']));

    if raster::is_available() {
        // The whole page, text included
        assert_eq!(raster.region, page.bounds());
        assert_eq!(raster.image.dimensions(), Some(raster::target_size(&page, raster::RASTER_DPI)));
    } else {
        // Without pdfium the drawn image stands in for the page
        assert_eq!(raster.region, Region::new(72.0, 442.0, 272.0, 542.0));
        assert_eq!(raster.image.dimensions(), Some((4, 2)));
    }
}

#[test]
fn test_rule_based_pipeline() {
    let doc = HybridPdf::rule_based_only()
        .with_config(PipelineConfig::new().with_llm_fallback(false))
        .convert_bytes(&sample_pdf())
        .unwrap();

    assert_eq!(doc.page_count(), 2);

    let first = doc.page(1).unwrap();
    assert_eq!(first.classification, Classification::Native);
    assert!(first.complete, "issues: {:?}", first.issues);
    assert_eq!(first.elements.iter().filter(|e| e.kind == ElementKind::Table).count(), 1);
    assert_eq!(first.elements.iter().filter(|e| e.kind == ElementKind::Image).count(), 1);
    // Reading order: heading first
    assert!(first.elements[0].as_text().unwrap().contains("Annual Report"));

    let second = doc.page(2).unwrap();
    assert_eq!(second.classification, Classification::Scanned);
    assert!(!second.complete);
    assert!(second
        .issues
        .iter()
        .any(|i| matches!(i, PageIssue::BackendUnavailable { backend, .. } if backend == "ocr")));

    assert!(!doc.complete);
    assert_eq!(doc.stats.native_pages, 1);
    assert_eq!(doc.stats.scanned_pages, 1);
    assert_eq!(doc.info.title.as_deref(), Some("Annual Report"));
}

#[test]
fn test_convert_file_records_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, sample_pdf()).unwrap();

    let doc = HybridPdf::rule_based_only()
        .with_config(PipelineConfig::new().with_llm_fallback(false).sequential())
        .convert_file(&path)
        .unwrap();
    assert_eq!(doc.info.source.as_deref(), Some("report.pdf"));
}

#[test]
fn test_backend_shared_across_threads() {
    let source: Arc<dyn RuleBackend> = Arc::new(backend());
    let handles: Vec<_> = source
        .pages()
        .into_iter()
        .map(|page| {
            let source = Arc::clone(&source);
            std::thread::spawn(move || source.probe_text(&page).unwrap())
        })
        .collect();
    let texts: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(texts[0].contains("Annual Report"));
}

#[test]
fn test_json_and_assets_output() {
    let mut doc = HybridPdf::rule_based_only()
        .with_config(PipelineConfig::new().with_llm_fallback(false))
        .convert_bytes(&sample_pdf())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("report_assets");
    let written = hybridpdf::render::export_assets(&mut doc, &assets).unwrap();
    assert_eq!(written.len(), 2);
    assert!(assets.join("page_1_img_1.png").exists());
    // Snapshot of the scanned page
    assert!(assets.join("page_2_img_1.png").exists());

    let json = hybridpdf::render::to_json(&doc, hybridpdf::JsonFormat::Pretty).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["pages"].as_array().unwrap().len(), 2);
    assert_eq!(value["pages"][1]["classification"], "scanned");

    let image = value["pages"][0]["elements"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["type"] == "image")
        .unwrap();
    assert_eq!(image["origin"], "rule");
    assert!(image["content"]["path"].as_str().unwrap().ends_with("page_1_img_1.png"));

    let snapshot = &value["pages"][1]["elements"][0];
    assert_eq!(snapshot["type"], "image");
    assert!(snapshot["content"]["path"].as_str().unwrap().ends_with("page_2_img_1.png"));
}

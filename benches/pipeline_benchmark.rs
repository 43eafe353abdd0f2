//! Benchmarks for hybridpdf extraction performance.
//!
//! Run with: cargo bench
//!
//! Synthetic PDFs with a paragraph and an aligned table per page, converted
//! rule-based only so no external tools are involved.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hybridpdf::{Backends, HybridPdf, LopdfBackend, Pipeline, PipelineConfig, RuleBackend};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

fn text_at(x: i64, y: i64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 11.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// Creates a synthetic PDF with the given number of pages.
fn create_test_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let page_ids: Vec<ObjectId> = (1..=page_count)
        .map(|n| {
            let mut operations = text_at(72, 740, &format!("Page {} - benchmark content for hybridpdf.", n));
            for line in 0..20 {
                operations.extend(text_at(72, 700 - line * 14, "Lorem ipsum dolor sit amet, consectetur."));
            }
            for row in 0..6 {
                let y = 380 - row * 15;
                for (x, cell) in [(72, "Item"), (220, "Quantity"), (360, "Price")] {
                    operations.extend(text_at(x, y, &format!("{} {}", cell, row)));
                }
            }
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
        "Count" => page_count as i64,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Benchmark PDF format detection.
fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = create_test_pdf(1);
    let non_pdf_data = b"Not a PDF file at all, just random text content";

    c.bench_function("detect_valid_pdf", |b| {
        b.iter(|| hybridpdf::detect_format_from_bytes(black_box(&pdf_data)).unwrap());
    });

    c.bench_function("detect_non_pdf", |b| {
        b.iter(|| hybridpdf::detect_format_from_bytes(black_box(non_pdf_data)).is_err());
    });
}

/// Benchmark full rule-based conversion at various sizes.
fn bench_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion");
    let converter = HybridPdf::rule_based_only()
        .with_config(PipelineConfig::new().with_llm_fallback(false));

    for page_count in [1, 10, 50] {
        let data = create_test_pdf(page_count);
        group.bench_function(format!("{}_pages", page_count), |b| {
            b.iter(|| converter.convert_bytes(black_box(&data)).unwrap());
        });
    }

    group.finish();
}

/// Parallel against sequential page processing on an already-parsed document.
fn bench_page_scheduling(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_scheduling");
    let data = create_test_pdf(50);

    for (label, config) in [
        ("parallel", PipelineConfig::new().with_llm_fallback(false)),
        ("sequential", PipelineConfig::new().with_llm_fallback(false).sequential()),
    ] {
        let pipeline = Pipeline::new(Backends::none(), config);
        group.bench_function(label, |b| {
            b.iter(|| {
                // Fresh backend per run so layout caching does not skew results
                let source: Arc<dyn RuleBackend> = Arc::new(LopdfBackend::load_bytes(&data).unwrap());
                pipeline.run(black_box(source)).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_format_detection, bench_conversion, bench_page_scheduling);
criterion_main!(benches);

mod common;

use common::fixtures::*;
use common::{TestResult, export_pdf};
use folio::{ExportConfig, ExportPipelineBuilder, FoFormatter, TableModel, XsltEngine};
use folio_traits::{MarkupHandler, TransformEngine};
use folio_xslt::XmlTextWriter;
use std::sync::Arc;

const TABLE_STYLESHEET: &str = include_str!("../resources/table-fo.xsl");

#[test]
fn grouped_table_renders_its_subtotal() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();

    let pipeline = ExportPipelineBuilder::new().build();
    let pdf = export_pdf(&pipeline, &grouped_sales())?;

    assert!(pdf.bytes.starts_with(b"%PDF-"));
    assert_eq!(pdf.page_count(), 1);
    for text in ["Name", "Amount", "A", "10", "20", "Total", "30", "Page 1"] {
        assert_pdf_contains_text!(pdf, text);
    }
    Ok(())
}

#[test]
fn document_title_reaches_the_pdf_metadata() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = ExportConfig::default().with(ExportConfig::DOCUMENT_TITLE, "Sales by region");
    let model = three_level_sales().with_config(config);
    let pdf = export_pdf(&ExportPipelineBuilder::new().build(), &model)?;
    assert_eq!(pdf.title().as_deref(), Some("Sales by region"));
    assert_pdf_contains_text!(pdf, "Sales by region");
    Ok(())
}

#[test]
fn long_tables_repeat_the_header_on_every_page() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();

    let pdf = export_pdf(&ExportPipelineBuilder::new().build(), &text_table(3, 300))?;
    assert!(pdf.page_count() > 2, "expected several pages, got {}", pdf.page_count());
    for (index, page) in pdf.page_contents().iter().enumerate() {
        assert!(page.contains("(Col 0)"), "page {} has no header", index + 1);
        assert!(page.contains(&format!("(Page {})", index + 1)), "page {} has no footer", index + 1);
    }
    assert_pdf_contains_text!(pdf, "r299c2");
    Ok(())
}

#[test]
fn empty_tables_still_produce_a_page() -> TestResult {
    let pdf = export_pdf(&ExportPipelineBuilder::new().build(), &text_table(2, 0))?;
    assert_eq!(pdf.page_count(), 1);
    assert_pdf_contains_text!(pdf, "No data");

    let pdf = export_pdf(&ExportPipelineBuilder::new().build(), &TableModel::new(Vec::new()))?;
    assert_eq!(pdf.page_count(), 1);
    assert_pdf_contains_text!(pdf, "No columns");
    Ok(())
}

#[test]
fn inline_stylesheets_override_the_bundled_one() -> TestResult {
    let style = TABLE_STYLESHEET.replace(">Total<", ">Sum<");
    let model = with_stylesheet(grouped_sales(), &style);
    let pdf = export_pdf(&ExportPipelineBuilder::new().build(), &model)?;
    assert_pdf_contains_text!(pdf, "Sum");
    assert!(!pdf.page_contents().iter().any(|p| p.contains("(Total)")));
    Ok(())
}

#[test]
fn a_compiled_transform_is_deterministic() -> TestResult {
    let mut markup = Vec::new();
    folio::MarkupProducer::produce(&folio::XmlTotalsWriter::new(), &three_level_sales(), &mut markup)?;

    let transform = XsltEngine::new().compile(&mut TABLE_STYLESHEET.as_bytes())?;
    let run = || -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut writer = XmlTextWriter::new(Vec::new());
        transform.apply(&mut markup.as_slice(), &mut writer)?;
        writer.end_document()?;
        Ok(writer.into_inner())
    };
    let first = run()?;
    let second = run()?;
    assert!(!first.is_empty());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn exports_are_byte_identical_without_a_creation_date() -> TestResult {
    let pipeline = ExportPipelineBuilder::new().with_formatter(FoFormatter::new().with_creation_date(false)).build();
    let first = export_pdf(&pipeline, &three_level_sales())?;
    let second = export_pdf(&pipeline, &three_level_sales())?;
    assert_eq!(first.bytes, second.bytes);
    Ok(())
}

#[test]
fn transform_to_string_returns_the_page_description() -> TestResult {
    let fo = ExportPipelineBuilder::new().build().transform_to_string(&grouped_sales())?;
    let doc = roxmltree::Document::parse(&fo)?;
    assert_eq!(doc.root_element().tag_name().name(), "root");
    assert_eq!(doc.root_element().tag_name().namespace(), Some(folio_render_lopdf::FO_NS));
    assert!(doc.descendants().any(|n| n.has_tag_name((folio_render_lopdf::FO_NS, "table-row"))));
    Ok(())
}

#[test]
fn one_pipeline_serves_concurrent_exports() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();

    let pipeline = Arc::new(ExportPipelineBuilder::new().build());
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let pipeline = Arc::clone(&pipeline);
                scope.spawn(move || {
                    let model = text_table(2, 20 + i * 10);
                    let mut bytes = Vec::new();
                    pipeline.export(&model, &mut bytes).map(|()| (i, bytes))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    for result in results {
        let (i, bytes) = result.map_err(|_| "export thread panicked")??;
        let pdf = common::GeneratedPdf::from_bytes(bytes)?;
        assert_pdf_contains_text!(pdf, &format!("r{}c1", 19 + i * 10));
    }
    Ok(())
}

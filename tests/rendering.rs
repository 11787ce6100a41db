use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use fruit_invoice::fonts::FontConfig;
use fruit_invoice::generator::{self, Price, SampleItem};
use fruit_invoice::invoice::{self, InvoiceOptions, LineItems, PURPLE};
use fruit_invoice::model::ImageSource;
use fruit_invoice::{DocumentBuilder, RenderedPdf};
use image::{DynamicImage, ImageBuffer, Rgb};
use lopdf::content::{Content, Operation};
use rand::rngs::StdRng;
use rand::SeedableRng;

const HEADING_SIZE: f32 = 9.0;
const CONTENT_SIZE: f32 = 8.0;

/// Date and page number, printed at content size on every page.
const FOOTER_BLOCKS_PER_PAGE: usize = 2;
/// The two totals columns and the signature label.
const FIXED_CONTENT_BLOCKS: usize = 3;

fn fonts_available() -> bool {
    FontConfig::new().sans_available()
}

fn skip(test: &str) {
    eprintln!(
        "Skipping {test}: LiberationSans fonts missing. \
         Copy them to assets/fonts (see assets/fonts/README.md)."
    );
}

fn options() -> InvoiceOptions {
    InvoiceOptions::new().with_date(NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date"))
}

fn short_items(count: usize) -> LineItems {
    let item = SampleItem {
        name: "Kiwi".into(),
        description: "Green and tart".into(),
        price: Price::from_cents(150),
    };
    LineItems::Generated(vec![item; count])
}

fn write_logo(path: &Path) {
    let buffer = ImageBuffer::from_fn(240, 80, |x, y| {
        Rgb([(x % 256) as u8, 120, (y * 3 % 256) as u8])
    });
    DynamicImage::ImageRgb8(buffer)
        .save(path)
        .expect("write logo fixture");
}

fn assert_well_formed(bytes: &[u8], pdf: &RenderedPdf) {
    assert!(!bytes.is_empty());
    assert!(bytes.starts_with(b"%PDF-"), "missing PDF magic header");
    let document = lopdf::Document::load_mem(bytes).expect("parse rendered pdf");
    assert_eq!(document.get_pages().len(), pdf.page_count);
}

fn render(items: LineItems) -> RenderedPdf {
    let plan = invoice::invoice_plan(&options().with_items(items)).expect("plan");
    DocumentBuilder::new().render(&plan).expect("render")
}

/// Content stream operations of every page, in page order.
fn page_operations(bytes: &[u8]) -> Vec<Operation> {
    let document = lopdf::Document::load_mem(bytes).expect("parse rendered pdf");
    let mut operations = Vec::new();
    for page_id in document.get_pages().values() {
        let content = document.get_page_content(*page_id).expect("page content");
        let decoded = Content::decode(&content).expect("decode page content");
        operations.extend(decoded.operations);
    }
    operations
}

/// One `BT` .. `ET` section: its font size and the horizontal position it starts at, in points.
struct TextBlock {
    font_size: f32,
    x: Option<f32>,
}

fn text_blocks(operations: &[Operation]) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<TextBlock> = None;

    for operation in operations {
        let operand = |index: usize| {
            operation
                .operands
                .get(index)
                .and_then(|object| object.as_float().ok())
        };
        match operation.operator.as_str() {
            "BT" => {
                current = Some(TextBlock {
                    font_size: 0.0,
                    x: None,
                })
            }
            "Tf" => {
                if let Some(block) = current.as_mut() {
                    block.font_size = operand(1).unwrap_or_default();
                }
            }
            "Td" => {
                if let Some(block) = current.as_mut() {
                    block.x = block.x.or_else(|| operand(0));
                }
            }
            "ET" => blocks.extend(current.take()),
            _ => {}
        }
    }

    blocks
}

fn blocks_of_size(blocks: &[TextBlock], size: f32) -> Vec<&TextBlock> {
    blocks
        .iter()
        .filter(|block| (block.font_size - size).abs() < 0.01)
        .collect()
}

/// Number of strokes drawn while the stroke color is the table tint.
fn tinted_strokes(operations: &[Operation]) -> usize {
    let tint = [PURPLE.red, PURPLE.green, PURPLE.blue].map(|channel| f32::from(channel) / 255.0);
    let mut tinted = false;
    let mut strokes = 0;

    for operation in operations {
        match operation.operator.as_str() {
            "RG" => {
                let color: Vec<f32> = operation
                    .operands
                    .iter()
                    .filter_map(|object| object.as_float().ok())
                    .collect();
                tinted = color.len() == 3
                    && color
                        .iter()
                        .zip(tint)
                        .all(|(value, expected)| (value - expected).abs() < 0.005);
            }
            "S" if tinted => strokes += 1,
            _ => {}
        }
    }

    strokes
}

#[test]
fn assembles_invoice_with_logo() {
    if !fonts_available() {
        return skip("assembles_invoice_with_logo");
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let logo = dir.path().join("logo.jpg");
    write_logo(&logo);
    let output = dir.path().join("invoice.pdf");

    let logo = ImageSource::from_path(logo.to_string_lossy());
    let plan = invoice::invoice_plan(&options().with_logo(logo)).expect("plan");
    let pdf = DocumentBuilder::new()
        .assemble(&plan, &output)
        .expect("assemble invoice");

    let bytes = fs::read(&output).expect("read output");
    assert_eq!(bytes, pdf.bytes);
    assert_eq!(pdf.page_count, 1);
    assert_well_formed(&bytes, &pdf);
}

#[test]
fn missing_logo_still_produces_a_pdf() {
    if !fonts_available() {
        return skip("missing_logo_still_produces_a_pdf");
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("invoice.pdf");
    let missing = dir.path().join("no_such_logo.jpg");

    let logo = ImageSource::from_path(missing.to_string_lossy());
    let plan = invoice::invoice_plan(&options().with_logo(logo)).expect("plan");
    let pdf = fruit_invoice::assemble(&plan, &output).expect("assemble without logo");

    let bytes = fs::read(&output).expect("read output");
    assert_well_formed(&bytes, &pdf);
}

#[test]
fn corrupt_logo_is_tolerated() {
    if !fonts_available() {
        return skip("corrupt_logo_is_tolerated");
    }
    let logo = ImageSource::from_bytes(b"definitely not an image".to_vec());
    let plan = invoice::invoice_plan(&options().with_logo(logo)).expect("plan");
    let pdf = DocumentBuilder::new().render(&plan).expect("render");
    assert_well_formed(&pdf.bytes, &pdf);
}

#[test]
fn unwritable_directory_is_an_io_error() {
    if !fonts_available() {
        return skip("unwritable_directory_is_an_io_error");
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("missing_directory").join("invoice.pdf");

    let plan = invoice::invoice_plan(&options()).expect("plan");
    let err = DocumentBuilder::new()
        .assemble(&plan, &output)
        .expect_err("writing into a missing directory fails");

    assert!(err.is_io(), "unexpected error: {err}");
    assert!(!output.exists());
}

#[test]
fn long_generated_lists_continue_on_new_pages() {
    if !fonts_available() {
        return skip("long_generated_lists_continue_on_new_pages");
    }
    let items = generator::generate(150, &mut StdRng::seed_from_u64(11));
    let pdf = render(LineItems::Generated(items));

    assert!(
        pdf.page_count > 1,
        "expected several pages, got {}",
        pdf.page_count
    );
    assert_well_formed(&pdf.bytes, &pdf);
}

#[test]
fn static_table_prints_one_heading_and_two_rows_in_3_7_2_columns() {
    if !fonts_available() {
        return skip("static_table_prints_one_heading_and_two_rows_in_3_7_2_columns");
    }
    let pdf = render(LineItems::Static);
    assert_eq!(pdf.page_count, 1);
    let blocks = text_blocks(&page_operations(&pdf.bytes));

    let headings = blocks_of_size(&blocks, HEADING_SIZE);
    assert_eq!(headings.len(), 3);

    let content = blocks_of_size(&blocks, CONTENT_SIZE);
    let expected = 2 * 3 + FOOTER_BLOCKS_PER_PAGE + FIXED_CONTENT_BLOCKS;
    assert_eq!(content.len(), expected);

    let x: Vec<f32> = headings
        .iter()
        .map(|block| block.x.expect("heading position"))
        .collect();
    let fruit_width = x[1] - x[0];
    let description_width = x[2] - x[1];
    assert!(fruit_width > 0.0 && description_width > 0.0);
    assert!(
        (fruit_width / description_width - 3.0 / 7.0).abs() < 1e-3,
        "column starts {:?} are not in a 3:7 ratio",
        x
    );
}

#[test]
fn heading_is_printed_once_across_pages() {
    if !fonts_available() {
        return skip("heading_is_printed_once_across_pages");
    }
    let rows = 120;
    let pdf = render(short_items(rows));
    assert!(pdf.page_count > 1, "expected several pages");
    let blocks = text_blocks(&page_operations(&pdf.bytes));

    assert_eq!(blocks_of_size(&blocks, HEADING_SIZE).len(), 3);
    let expected = rows * 3 + FOOTER_BLOCKS_PER_PAGE * pdf.page_count + FIXED_CONTENT_BLOCKS;
    assert_eq!(blocks_of_size(&blocks, CONTENT_SIZE).len(), expected);
}

#[test]
fn tint_starts_with_the_first_row_and_alternates() {
    if !fonts_available() {
        return skip("tint_starts_with_the_first_row_and_alternates");
    }
    let strokes = |rows| tinted_strokes(&page_operations(&render(short_items(rows)).bytes));
    let one = strokes(1);
    let two = strokes(2);
    let three = strokes(3);

    assert!(one > 0, "first row is not tinted");
    assert_eq!(two, one);
    assert_eq!(three, 2 * one);
}

#[test]
fn missing_fonts_fail_before_writing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("invoice.pdf");
    let config = FontConfig::new().with_directory(dir.path());
    if config.sans_available() {
        return skip("missing_fonts_fail_before_writing");
    }

    let plan = invoice::invoice_plan(&options()).expect("plan");
    let err = DocumentBuilder::new()
        .with_fonts(config)
        .assemble(&plan, &output)
        .expect_err("fonts are required");

    assert!(matches!(err, fruit_invoice::InvoiceError::Fonts(_)));
    assert!(!output.exists());
}

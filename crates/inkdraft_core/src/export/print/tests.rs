use super::*;
use crate::delta::{Attributes, Delta};
use crate::render::RenderedDocument;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use std::io::Cursor;

fn rendered(delta: &Delta) -> RenderedDocument {
    RenderedDocument::from_delta(delta)
}

fn attrs(value: serde_json::Value) -> Attributes {
    serde_json::from_value(value).expect("attributes")
}

fn page_break_document() -> Delta {
    let mut delta = Delta::new();
    delta
        .insert("first page\n", Attributes::new())
        .insert_embed(
            serde_json::from_value(json!({ "page-break": true })).expect("embed"),
            Attributes::new(),
        )
        .insert("\nsecond page\n", Attributes::new());
    delta
}

/// A PNG data URL with enough detail that JPEG quality shows in the output.
fn png_data_url(width: u32, height: u32) -> String {
    let pixels = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            ((x * 37) ^ (y * 91)) as u8,
            ((x * y) % 251) as u8,
            ((x + y) * 13) as u8,
        ])
    });
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .expect("encode png");
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

fn image_document(source: &str) -> Delta {
    let mut delta = Delta::new();
    delta
        .insert("before\n", Attributes::new())
        .insert_embed(
            serde_json::from_value(json!({ "image": source })).expect("embed"),
            Attributes::new(),
        )
        .insert("\nafter\n", Attributes::new());
    delta
}

fn placed_images(pages: &[Page]) -> Vec<(f32, f32, f32, f32)> {
    pages
        .iter()
        .flat_map(|page| page.items.iter())
        .filter_map(|item| match item {
            PlacedItem::Image {
                x,
                y,
                width,
                height,
                ..
            } => Some((*x, *y, *width, *height)),
            _ => None,
        })
        .collect()
}

/// Count `/Type /Page` objects, excluding the `/Pages` tree node.
fn page_objects(pdf: &[u8]) -> usize {
    let text = String::from_utf8_lossy(pdf);
    text.matches("/Type /Page").count() - text.matches("/Type /Pages").count()
}

fn contains_literal(pdf: &[u8], text: &str) -> bool {
    let literal = format!("({})", text);
    let hex: String = text.bytes().map(|byte| format!("{:02X}", byte)).collect();
    let haystack = String::from_utf8_lossy(pdf);
    haystack.contains(&literal) || haystack.to_uppercase().contains(&format!("<{}>", hex))
}

#[test]
fn short_document_is_a_single_pdf_page() {
    let bytes = export_pdf(
        &rendered(&Delta::from_plain_text("hello world")),
        "Greeting",
        &PrintOptions::default(),
    )
    .expect("pdf");
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(page_objects(&bytes), 1);
    assert!(contains_literal(&bytes, "hello world"));
    assert!(String::from_utf8_lossy(&bytes).contains("Helvetica"));
}

#[test]
fn explicit_page_break_starts_new_page() {
    let document = rendered(&page_break_document());
    let pages = paginate(&document, &PrintOptions::default()).expect("layout");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].text(), "first page");
    assert_eq!(pages[1].text(), "second page");

    let bytes = export_pdf(&document, "Breaks", &PrintOptions::default()).expect("pdf");
    assert_eq!(page_objects(&bytes), 2);
}

#[test]
fn overflowing_content_continues_on_next_page() {
    let text = (0..120)
        .map(|line| format!("line {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    let document = rendered(&Delta::from_plain_text(&text));
    let pages = paginate(&document, &PrintOptions::default()).expect("layout");
    assert!(pages.len() >= 2, "expected overflow, got {} page", pages.len());
    assert!(pages[0].text().starts_with("line 0"));
    assert!(pages.last().expect("page").text().ends_with("line 119"));

    // Every text item stays inside the vertical margins.
    let options = PrintOptions::default();
    let (_, height) = options.page_dimensions();
    for page in &pages {
        for item in &page.items {
            if let PlacedItem::Text { y, .. } = item {
                assert!(*y >= options.margins.bottom - 1.0);
                assert!(*y <= height - options.margins.top);
            }
        }
    }
}

#[test]
fn blank_lines_overflow_onto_next_page() {
    let text = format!("{}hello", "\n".repeat(200));
    let options = PrintOptions::default();
    let pages = paginate(&rendered(&Delta::from_plain_text(&text)), &options).expect("layout");
    assert!(pages.len() >= 2, "expected overflow, got {} page", pages.len());

    let last = pages.last().expect("page");
    assert_eq!(last.text(), "hello");
    for item in &last.items {
        if let PlacedItem::Text { y, .. } = item {
            assert!(*y >= options.margins.bottom);
        }
    }
}

#[test]
fn long_paragraph_wraps_within_content_width() {
    let words = vec!["lorem"; 200].join(" ");
    let options = PrintOptions::default();
    let pages = paginate(&rendered(&Delta::from_plain_text(&words)), &options).expect("layout");
    let (width, _) = options.page_dimensions();
    let right_edge = width - options.margins.right;
    let mut lines = 0;
    for item in &pages[0].items {
        if let PlacedItem::Text { x, text, font, size, .. } = item {
            lines += 1;
            assert!(x + font.text_width(text, *size) <= right_edge + 0.01);
            assert!(!text.ends_with(' '));
        }
    }
    assert!(lines > 1);
}

#[test]
fn unbreakable_token_is_split_by_character() {
    let token = "x".repeat(400);
    let pages = paginate(
        &rendered(&Delta::from_plain_text(&token)),
        &PrintOptions::default(),
    )
    .expect("layout");
    let joined: String = pages[0]
        .items
        .iter()
        .filter_map(|item| match item {
            PlacedItem::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(joined, token);
}

#[test]
fn headings_lists_and_code_pick_fonts_and_markers() {
    let mut delta = Delta::new();
    delta
        .insert("Title", Attributes::new())
        .insert("\n", attrs(json!({ "header": 1 })))
        .insert("item", Attributes::new())
        .insert("\n", attrs(json!({ "list": "ordered" })))
        .insert("let x = 1;", Attributes::new())
        .insert("\n", attrs(json!({ "code-block": true })));
    let pages = paginate(&rendered(&delta), &PrintOptions::default()).expect("layout");
    let texts: Vec<(String, Font, f32)> = pages[0]
        .items
        .iter()
        .filter_map(|item| match item {
            PlacedItem::Text {
                text, font, size, ..
            } => Some((text.clone(), *font, *size)),
            _ => None,
        })
        .collect();
    assert_eq!(texts[0], ("Title".to_string(), Font::HelveticaBold, 24.0));
    assert_eq!(texts[1], ("1.".to_string(), Font::Helvetica, 11.0));
    assert_eq!(texts[2], ("item".to_string(), Font::Helvetica, 11.0));
    assert_eq!(texts[3], ("let x = 1;".to_string(), Font::Courier, 10.0));
}

#[test]
fn underline_and_center_alignment() {
    let mut delta = Delta::new();
    delta
        .insert("linked", attrs(json!({ "underline": true })))
        .insert("\n", attrs(json!({ "align": "center" })));
    let options = PrintOptions::default();
    let pages = paginate(&rendered(&delta), &options).expect("layout");
    assert!(pages[0]
        .items
        .iter()
        .any(|item| matches!(item, PlacedItem::Rule { .. })));
    let x = pages[0]
        .items
        .iter()
        .find_map(|item| match item {
            PlacedItem::Text { x, .. } => Some(*x),
            _ => None,
        })
        .expect("text");
    assert!(x > options.margins.left + 100.0);
}

#[test]
fn landscape_swaps_dimensions_and_options_are_validated() {
    let options = PrintOptions {
        page_size: PageSize::Letter,
        orientation: Orientation::Landscape,
        ..PrintOptions::default()
    };
    assert_eq!(options.page_dimensions(), (792.0, 612.0));
    assert!(options.validate().is_ok());

    for quality in [0.0, -0.5, 1.5, f32::NAN] {
        let invalid = PrintOptions {
            image_quality: quality,
            ..PrintOptions::default()
        };
        assert!(matches!(
            invalid.validate(),
            Err(ExportError::InvalidOptions(_))
        ));
    }

    let cramped = PrintOptions {
        margins: Margins::uniform(290.0),
        ..PrintOptions::default()
    };
    assert!(export_pdf(&RenderedDocument::default(), "x", &cramped).is_err());
    assert_eq!("Letter".parse::<PageSize>().ok(), Some(PageSize::Letter));
}

#[test]
fn empty_document_still_produces_one_page() {
    let bytes = export_pdf(&RenderedDocument::default(), "", &PrintOptions::default())
        .expect("pdf");
    assert_eq!(page_objects(&bytes), 1);
}

#[test]
fn snapshot_export_uses_current_content() {
    let snapshot = DocumentSnapshot {
        id: "doc".to_string(),
        title: "Notes".to_string(),
        content: Delta::from_plain_text("current text"),
        revision: 4,
    };
    let bytes = snapshot_to_pdf(&snapshot, &PrintOptions::default()).expect("pdf");
    assert!(contains_literal(&bytes, "current text"));
}

#[test]
fn image_embed_is_drawn_as_xobject() {
    let source = png_data_url(40, 30);
    let document = rendered(&image_document(&source));
    let options = PrintOptions::default();

    let pages = paginate(&document, &options).expect("layout");
    let images = placed_images(&pages);
    assert_eq!(images.len(), 1);
    let (x, y, width, height) = images[0];
    assert_eq!(x, options.margins.left);
    assert!((width - 30.0).abs() < 0.01);
    assert!((height - 22.5).abs() < 0.01);
    assert!(y >= options.margins.bottom);
    assert_eq!(pages[0].text(), "before after");

    let bytes = export_pdf(&document, "Pictures", &options).expect("pdf");
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/XObject"));
    assert!(text.contains("/DCTDecode"));
    assert!(text.contains("/Im1 Do"));
    assert!(!contains_literal(&bytes, "[image]"));
}

#[test]
fn wide_image_is_scaled_to_content_width() {
    let options = PrintOptions::default();
    let (page_width, _) = options.page_dimensions();
    let content_width = page_width - options.margins.left - options.margins.right;

    let pages = paginate(&rendered(&image_document(&png_data_url(1600, 400))), &options)
        .expect("layout");
    let (x, _, width, height) = placed_images(&pages)[0];
    assert!((width - content_width).abs() < 0.01);
    assert!((height - content_width / 4.0).abs() < 0.01);
    assert!(x + width <= page_width - options.margins.right + 0.01);
}

#[test]
fn image_quality_changes_embedded_bytes() {
    let document = rendered(&image_document(&png_data_url(96, 96)));
    let export = |quality: f32| {
        let options = PrintOptions {
            image_quality: quality,
            ..PrintOptions::default()
        };
        export_pdf(&document, "Pictures", &options).expect("pdf")
    };
    let low = export(0.2);
    let high = export(1.0);
    assert_ne!(low, high);
    assert!(low.len() < high.len());
}

#[test]
fn unreadable_image_falls_back_to_placeholder() {
    let pages = paginate(
        &rendered(&image_document("https://example.com/cat.png")),
        &PrintOptions::default(),
    )
    .expect("layout");
    assert!(placed_images(&pages).is_empty());
    assert_eq!(pages[0].text(), "before [image] after");
}

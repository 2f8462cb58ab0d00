//! PDF serialization of laid-out pages.
//!
//! Object layout: catalog 1, page tree 2, info 3, fonts 4..=11, then a
//! page/content pair per page starting at 12, then one image XObject per
//! distinct image.

use super::layout::{Page, PlacedItem};
use super::metrics::{encode_win_ansi, Font};
use super::raster::RasterImage;
use super::PrintOptions;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use std::sync::Arc;

const CATALOG_ID: Ref = Ref::new(1);
const PAGE_TREE_ID: Ref = Ref::new(2);
const INFO_ID: Ref = Ref::new(3);
const FIRST_FONT_ID: i32 = 4;
const FIRST_PAGE_ID: i32 = FIRST_FONT_ID + Font::ALL.len() as i32;

fn font_ref(font: Font) -> Ref {
    Ref::new(FIRST_FONT_ID + font.index() as i32)
}

fn page_refs(index: usize) -> (Ref, Ref) {
    let base = FIRST_PAGE_ID + 2 * index as i32;
    (Ref::new(base), Ref::new(base + 1))
}

struct EmbeddedImage {
    image: Arc<RasterImage>,
    id: Ref,
    name: String,
}

fn collect_images(pages: &[Page], first_id: i32) -> Vec<EmbeddedImage> {
    let mut images: Vec<EmbeddedImage> = Vec::new();
    for page in pages {
        for item in &page.items {
            let PlacedItem::Image { image, .. } = item else {
                continue;
            };
            if lookup(&images, image).is_some() {
                continue;
            }
            let index = images.len();
            images.push(EmbeddedImage {
                image: Arc::clone(image),
                id: Ref::new(first_id + index as i32),
                name: format!("Im{}", index + 1),
            });
        }
    }
    images
}

fn lookup<'a>(
    images: &'a [EmbeddedImage],
    image: &Arc<RasterImage>,
) -> Option<&'a EmbeddedImage> {
    images.iter().find(|known| Arc::ptr_eq(&known.image, image))
}

fn page_uses(page: &Page, embedded: &EmbeddedImage) -> bool {
    page.items.iter().any(|item| {
        matches!(item, PlacedItem::Image { image, .. } if Arc::ptr_eq(image, &embedded.image))
    })
}

fn page_content(page: &Page, images: &[EmbeddedImage]) -> Vec<u8> {
    let mut content = Content::new();
    for item in &page.items {
        match item {
            PlacedItem::Text {
                x,
                y,
                text,
                font,
                size,
                color,
            } => {
                let (r, g, b) = color.to_unit();
                content.set_fill_rgb(r, g, b);
                content.begin_text();
                content.set_font(Name(font.resource_name()), *size);
                content.next_line(*x, *y);
                content.show(Str(&encode_win_ansi(text)));
                content.end_text();
            }
            PlacedItem::Rule {
                x1,
                x2,
                y,
                thickness,
                color,
            } => {
                let (r, g, b) = color.to_unit();
                content.set_stroke_rgb(r, g, b);
                content.set_line_width(*thickness);
                content.move_to(*x1, *y);
                content.line_to(*x2, *y);
                content.stroke();
            }
            PlacedItem::Image {
                x,
                y,
                width,
                height,
                image,
            } => {
                let Some(embedded) = lookup(images, image) else {
                    continue;
                };
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, *x, *y]);
                content.x_object(Name(embedded.name.as_bytes()));
                content.restore_state();
            }
        }
    }
    content.finish()
}

pub(super) fn write_pdf(pages: &[Page], title: &str, options: &PrintOptions) -> Vec<u8> {
    let (width, height) = options.page_dimensions();
    let mut pdf = Pdf::new();

    pdf.catalog(CATALOG_ID).pages(PAGE_TREE_ID);
    let kids: Vec<Ref> = (0..pages.len()).map(|index| page_refs(index).0).collect();
    pdf.pages(PAGE_TREE_ID)
        .kids(kids.iter().copied())
        .count(pages.len() as i32);

    for font in Font::ALL {
        pdf.type1_font(font_ref(font))
            .base_font(Name(font.base_name()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    let images = collect_images(pages, FIRST_PAGE_ID + 2 * pages.len() as i32);

    for (index, page) in pages.iter().enumerate() {
        let (page_id, content_id) = page_refs(index);
        {
            let mut writer = pdf.page(page_id);
            writer
                .media_box(Rect::new(0.0, 0.0, width, height))
                .parent(PAGE_TREE_ID)
                .contents(content_id);
            let mut resources = writer.resources();
            {
                let mut fonts = resources.fonts();
                for font in Font::ALL {
                    fonts.pair(Name(font.resource_name()), font_ref(font));
                }
            }
            let used: Vec<&EmbeddedImage> = images
                .iter()
                .filter(|embedded| page_uses(page, embedded))
                .collect();
            if !used.is_empty() {
                let mut x_objects = resources.x_objects();
                for embedded in used {
                    x_objects.pair(Name(embedded.name.as_bytes()), embedded.id);
                }
            }
        }
        pdf.stream(content_id, &page_content(page, &images));
    }

    for embedded in &images {
        let raster = &embedded.image;
        let mut xobject = pdf.image_xobject(embedded.id, &raster.jpeg);
        xobject.filter(Filter::DctDecode);
        xobject.width(i32::try_from(raster.pixel_width).unwrap_or(i32::MAX));
        xobject.height(i32::try_from(raster.pixel_height).unwrap_or(i32::MAX));
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
    }

    let title = title.trim();
    let mut info = pdf.document_info(INFO_ID);
    if !title.is_empty() {
        info.title(TextStr(title));
    }
    info.producer(TextStr("inkdraft"));
    drop(info);

    pdf.finish()
}

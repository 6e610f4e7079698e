use std::collections::{BTreeMap, BTreeSet};

use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::error::Error;
use crate::fonts::{FontEntry, TextMetrics, register_font};
use crate::images::{Encoding, ImageStore, LoadedImage};
use crate::model::{FontWeight, PageGeometry};

use super::canvas::{BORDER_WIDTH, DrawOp, Page};

const PRODUCER: &str = concat!("cmvr-render ", env!("CARGO_PKG_VERSION"));

fn embed_image(pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref, img: &LoadedImage) -> Ref {
    let xobj_ref = alloc();
    match &img.encoding {
        Encoding::Dct { gray } => {
            let mut xobj = pdf.image_xobject(xobj_ref, &img.data);
            xobj.filter(Filter::DctDecode);
            xobj.width(img.pixel_width as i32);
            xobj.height(img.pixel_height as i32);
            if *gray {
                xobj.color_space().device_gray();
            } else {
                xobj.color_space().device_rgb();
            }
            xobj.bits_per_component(8);
        }
        Encoding::Rgba(rgba) => {
            let (w, h) = (rgba.width(), rgba.height());
            let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

            let rgb_data: Vec<u8> = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

            let smask_ref = if has_alpha {
                let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w as i32);
                mask.height(h as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(mask_ref)
            } else {
                None
            };

            let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w as i32);
            xobj.height(h as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }
    xobj_ref
}

/// Replay one page of draw ops into a content stream, flipping top-down
/// coordinates into PDF user space.
fn page_content(
    page: &Page,
    page_height: f32,
    fonts: &BTreeMap<FontWeight, FontEntry>,
    images: &BTreeMap<&str, (String, Ref)>,
) -> Result<Content, Error> {
    let mut content = Content::new();
    let mut line_width = BORDER_WIDTH;
    content.set_line_width(line_width);

    for op in &page.ops {
        match op {
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
            } => {
                if (*width - line_width).abs() > f32::EPSILON {
                    content.set_line_width(*width);
                    line_width = *width;
                }
                content.move_to(*x1, page_height - y1);
                content.line_to(*x2, page_height - y2);
                content.stroke();
            }
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                fill,
                stroke,
            } => {
                content.save_state();
                if let Some([r, g, b]) = fill {
                    content.set_fill_rgb(*r as f32 / 255.0, *g as f32 / 255.0, *b as f32 / 255.0);
                }
                content.rect(*x, page_height - y - height, *width, *height);
                match (fill.is_some(), *stroke) {
                    (true, true) => content.fill_nonzero_and_stroke(),
                    (true, false) => content.fill_nonzero(),
                    (false, true) => content.stroke(),
                    (false, false) => content.end_path(),
                };
                content.restore_state();
            }
            DrawOp::Text {
                x,
                baseline,
                text,
                style,
            } => {
                let entry = fonts.get(&style.weight).ok_or_else(|| {
                    Error::Pdf(format!("no font registered for {:?}", style.weight))
                })?;
                content.begin_text();
                content.set_font(Name(entry.pdf_name.as_bytes()), style.size);
                content.next_line(*x, page_height - baseline);
                content.show(Str(&entry.encode(text)));
                content.end_text();
            }
            DrawOp::Image {
                x,
                y,
                width,
                height,
                url,
            } => {
                let (name, _) = images
                    .get(url.as_str())
                    .ok_or_else(|| Error::Pdf(format!("image {url} was drawn but never loaded")))?;
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, *x, page_height - y - height]);
                content.x_object(Name(name.as_bytes()));
                content.restore_state();
            }
        }
    }
    Ok(content)
}

/// Serialize buffered pages. Iteration is over ordered maps only, so equal
/// input produces byte-identical output.
pub(super) fn write_pdf(
    pages: &[Page],
    geometry: &PageGeometry,
    title: &str,
    metrics: &TextMetrics,
    images: &ImageStore,
    compress: bool,
) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    // Phase 1: fonts, subset to the characters each weight actually shows
    let mut used: BTreeMap<FontWeight, BTreeSet<char>> = BTreeMap::new();
    for op in pages.iter().flat_map(|p| &p.ops) {
        if let DrawOp::Text { text, style, .. } = op {
            used.entry(style.weight).or_default().extend(text.chars());
        }
    }
    let mut fonts: BTreeMap<FontWeight, FontEntry> = BTreeMap::new();
    for (i, (weight, chars)) in used.iter().enumerate() {
        let entry = register_font(
            &mut pdf,
            metrics.face(*weight),
            format!("F{}", i + 1),
            &mut alloc,
            chars,
        )?;
        fonts.insert(*weight, entry);
    }
    let t_fonts = t0.elapsed();

    // Phase 2: one XObject per distinct URL drawn
    let drawn_urls: BTreeSet<&str> = pages
        .iter()
        .flat_map(|p| &p.ops)
        .filter_map(|op| match op {
            DrawOp::Image { url, .. } => Some(url.as_str()),
            _ => None,
        })
        .collect();
    let mut image_xobjects: BTreeMap<&str, (String, Ref)> = BTreeMap::new();
    for url in drawn_urls {
        let Some(img) = images.get(url) else {
            return Err(Error::Pdf(format!("image {url} was drawn but never loaded")));
        };
        let xobj_ref = embed_image(&mut pdf, &mut alloc, img);
        let name = format!("Im{}", image_xobjects.len() + 1);
        image_xobjects.insert(url, (name, xobj_ref));
    }
    let t_images = t0.elapsed();

    // Phase 3: page objects and content streams
    let n = pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, page) in pages.iter().enumerate() {
        let raw = page_content(page, geometry.height, &fonts, &image_xobjects)?.finish();
        if compress {
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
            pdf.stream(content_ids[i], &compressed)
                .filter(Filter::FlateDecode);
        } else {
            pdf.stream(content_ids[i], raw.as_slice());
        }
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut font_dict = resources.fonts();
            for entry in fonts.values() {
                font_dict.pair(Name(entry.pdf_name.as_bytes()), entry.font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in image_xobjects.values() {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
        resources.finish();
    }

    let info_id = alloc();
    pdf.document_info(info_id)
        .title(TextStr(title))
        .producer(TextStr(PRODUCER));

    let t_assembly = t0.elapsed();
    log::info!(
        "PDF phases: font_embed={:.1}ms, images={:.1}ms, assembly={:.1}ms ({} pages)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_assembly - t_images).as_secs_f64() * 1000.0,
        n,
    );

    Ok(pdf.finish())
}

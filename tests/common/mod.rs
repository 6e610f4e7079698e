use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use async_trait::async_trait;
use chrono::NaiveDate;

use cmvr_render::pdf::{DrawOp, FOOTER_TEXT, Page};
use cmvr_render::report::{FundEntry, FundStatus};
use cmvr_render::{CmvrReport, ImageSource, RenderConfig, Renderer};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Config with a pinned footer timestamp so output is reproducible.
pub fn fixed_config() -> RenderConfig {
    RenderConfig {
        generated_at: NaiveDate::from_ymd_opt(2025, 3, 5)
            .and_then(|d| d.and_hms_opt(14, 7, 0)),
        ..RenderConfig::default()
    }
}

/// In-memory image source: URLs not in the map behave like a 404.
#[derive(Default)]
pub struct StaticImages {
    images: BTreeMap<String, Vec<u8>>,
}

impl StaticImages {
    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait]
impl ImageSource for StaticImages {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        self.images.get(url).cloned()
    }
}

pub fn renderer(images: StaticImages) -> Renderer<StaticImages> {
    init_logging();
    Renderer::with_image_source(fixed_config(), images).expect("renderer")
}

/// Solid-colour PNG of the given pixel size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([20, 20, 120, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub fn fund_entries(prefix: &str, n: usize) -> Vec<FundEntry> {
    (0..n)
        .map(|i| FundEntry {
            permit_holder_name: Some(format!("{prefix} Holder {i} (Authorized Rep.)")),
            savings_account_number: Some(format!("00{i}-123-456")),
            amount_deposited: Some(format!("PHP {},000.00", 100 + i)),
            date_updated: Some("2025-01-15".to_string()),
        })
        .collect()
}

/// Report holding nothing but a fund status section.
pub fn fund_only_report(rcf: usize, mtf: usize, fmrdf: usize) -> CmvrReport {
    CmvrReport {
        fund_status: Some(FundStatus {
            rcf: Some(fund_entries("RCF", rcf)),
            mtf: Some(fund_entries("MTF", mtf)),
            fmrdf: Some(fund_entries("FMRDF", fmrdf)),
        }),
        ..CmvrReport::default()
    }
}

pub fn page_texts(page: &Page) -> Vec<&str> {
    page.texts().map(|(t, _)| t).collect()
}

pub fn all_texts(pages: &[Page]) -> Vec<&str> {
    pages.iter().flat_map(page_texts).collect()
}

/// Horizontal lines as `(x1, x2, y)` with x1 <= x2.
pub fn horizontal_lines(page: &Page) -> Vec<(f32, f32, f32)> {
    page.ops
        .iter()
        .filter_map(|op| match *op {
            DrawOp::Line { x1, y1, x2, y2, .. } if (y1 - y2).abs() < 0.01 => {
                Some((x1.min(x2), x1.max(x2), y1))
            }
            _ => None,
        })
        .collect()
}

/// Largest y reached by any line or rectangle on the page.
pub fn lowest_ink(page: &Page) -> f32 {
    page.ops
        .iter()
        .filter_map(|op| match *op {
            DrawOp::Line { y1, y2, .. } => Some(y1.max(y2)),
            DrawOp::Rect { y, height, .. } => Some(y + height),
            DrawOp::Image { y, height, .. } => Some(y + height),
            DrawOp::Text { .. } => None,
        })
        .fold(0.0, f32::max)
}

/// Deepest text baseline on the page, footer excluded.
pub fn lowest_body_baseline(page: &Page) -> f32 {
    page.ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Text { baseline, style, .. } if *style != FOOTER_TEXT => Some(*baseline),
            _ => None,
        })
        .fold(0.0, f32::max)
}

/// Numbers of every `{prefix}{n}` word drawn anywhere in the document.
pub fn numbered_words(pages: &[Page], prefix: &str) -> BTreeSet<usize> {
    all_texts(pages)
        .iter()
        .flat_map(|t| t.split_whitespace())
        .filter_map(|word| word.strip_prefix(prefix)?.parse().ok())
        .collect()
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.05
}

//! PDF layout engine.
//!
//! Layout runs in one synchronous pass over the document blocks, buffering
//! draw operations per page on a [`Canvas`]. A footer pass then stamps every
//! page once the total page count is known, and the writer serializes the
//! buffered pages.

mod blocks;
mod canvas;
mod footer;
mod grouped;
mod label;
pub(crate) mod layout;
mod table;
mod writer;

use chrono::NaiveDateTime;

use crate::config::RenderConfig;
use crate::error::Error;
use crate::fonts::TextMetrics;
use crate::images::ImageStore;
use crate::model::{Block, Document, PageGeometry};

pub use canvas::{BORDER_WIDTH, Canvas, Cursor, DrawOp, Page};
pub use footer::{FOOTER_OFFSET, FOOTER_TEXT, generated_on, page_label};
pub use grouped::GROUP_TITLE_TEXT;
pub use label::LABEL_TEXT;
pub use table::{
    ABSENT_STYLE, ABSENT_TEXT, CELL_PADDING_X, CELL_PADDING_Y, HEADER_FILL, HEADER_MIN_HEIGHT,
    HEADER_TEXT, IMAGE_ERROR_STYLE, IMAGE_ERROR_TEXT, TABLE_GAP, TableGeometry, header_height,
    row_height, split_parenthetical, table_geometry,
};

/// Everything the drawing code reads but never mutates.
pub(crate) struct LayoutContext<'a> {
    pub(crate) metrics: &'a TextMetrics,
    pub(crate) images: &'a ImageStore,
    pub(crate) geometry: PageGeometry,
    pub(crate) footer_reserve: f32,
}

impl LayoutContext<'_> {
    pub(crate) fn bottom_limit(&self) -> f32 {
        self.geometry.bottom_limit(self.footer_reserve)
    }

    pub(crate) fn at_page_top(&self, y: f32) -> bool {
        (y - self.geometry.margins.top).abs() < 1.0
    }
}

/// Pages after layout and footers, before serialization.
pub struct LaidOutDocument {
    pub geometry: PageGeometry,
    pub footer_reserve: f32,
    pub pages: Vec<Page>,
}

impl LaidOutDocument {
    pub fn bottom_limit(&self) -> f32 {
        self.geometry.bottom_limit(self.footer_reserve)
    }
}

/// Height the start of `blocks` needs on the page a heading above it lands
/// on. Headings chain into whatever follows them.
fn lead_height(ctx: &LayoutContext, blocks: &[Block]) -> Result<f32, Error> {
    let Some(block) = blocks.first() else {
        return Ok(0.0);
    };
    Ok(match block {
        Block::Title(_) => 0.0,
        Block::Heading { text, level } => {
            blocks::heading_height(ctx, text, *level) + lead_height(ctx, &blocks[1..])?
        }
        Block::KeyValues(pairs) => blocks::key_values_lead(ctx, pairs),
        Block::Paragraph(text) => blocks::paragraph_lead(ctx, text),
        Block::Table(spec) => table::lead_height(ctx, spec)?,
        Block::GroupedTable(spec) => grouped::lead_height(ctx, spec)?,
    })
}

/// Lay out every block and apply footers. Images must already be in `images`;
/// nothing here waits on I/O.
pub fn layout(
    doc: &Document,
    metrics: &TextMetrics,
    images: &ImageStore,
    config: &RenderConfig,
    generated_at: NaiveDateTime,
) -> Result<LaidOutDocument, Error> {
    let ctx = LayoutContext {
        metrics,
        images,
        geometry: doc.geometry,
        footer_reserve: config.footer_reserve,
    };
    let mut canvas = Canvas::new(doc.geometry);
    let mut cursor = canvas.top_left();

    for (i, block) in doc.blocks.iter().enumerate() {
        cursor = match block {
            Block::Title(text) => blocks::draw_title(&mut canvas, &ctx, text, cursor)?,
            Block::Heading { text, level } => {
                let lead = lead_height(&ctx, &doc.blocks[i + 1..])?;
                blocks::draw_heading(&mut canvas, &ctx, text, *level, lead, cursor)?
            }
            Block::KeyValues(pairs) => blocks::draw_key_values(&mut canvas, &ctx, pairs, cursor)?,
            Block::Paragraph(text) => blocks::draw_paragraph(&mut canvas, &ctx, text, cursor)?,
            Block::Table(spec) => table::draw_table(&mut canvas, &ctx, spec, cursor)?,
            Block::GroupedTable(spec) => {
                grouped::draw_grouped_table(&mut canvas, &ctx, spec, cursor)?
            }
        };
    }

    let pages = footer::apply_footers(canvas, metrics, generated_at)?;
    Ok(LaidOutDocument {
        geometry: doc.geometry,
        footer_reserve: config.footer_reserve,
        pages,
    })
}

/// Lay out and serialize a document to PDF bytes.
pub fn render(
    doc: &Document,
    metrics: &TextMetrics,
    images: &ImageStore,
    config: &RenderConfig,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let laid_out = layout(doc, metrics, images, config, generated_at)?;
    let t_layout = t0.elapsed();
    let bytes = writer::write_pdf(
        &laid_out.pages,
        &laid_out.geometry,
        &doc.title,
        metrics,
        images,
        config.compress,
    )?;
    log::info!(
        "Timing: layout={:.1}ms, write={:.1}ms, pages={}",
        t_layout.as_secs_f64() * 1000.0,
        (t0.elapsed() - t_layout).as_secs_f64() * 1000.0,
        laid_out.pages.len(),
    );
    Ok(bytes)
}

use std::sync::OnceLock;

use regex::Regex;

use crate::error::Error;
use crate::fonts::TextMetrics;
use crate::images::ImageStore;
use crate::model::{
    Alignment, Cell, ColumnKind, ColumnSpec, FontWeight, ImageCell, LabelColumn, PageGeometry,
    TABLE_TEXT, TableSpec, TextStyle,
};

use super::LayoutContext;
use super::canvas::{Canvas, Cursor};
use super::label::{LabelSession, SegmentEnd};
use super::layout::{StyledRun, TextLine, build_lines, lines_height, render_lines};

pub const CELL_PADDING_X: f32 = 4.0;
pub const CELL_PADDING_Y: f32 = 3.0;
/// Header rows are never shorter than this, even with one-line labels.
pub const HEADER_MIN_HEIGHT: f32 = 20.0;
/// Vertical gap left after a table unless the next table connects to it.
pub const TABLE_GAP: f32 = 12.0;
pub const HEADER_TEXT: TextStyle = TextStyle::bold(8.0);
pub const HEADER_FILL: [u8; 3] = [217, 217, 217];
/// Placeholder drawn where an image URL could not be fetched or decoded.
pub const IMAGE_ERROR_TEXT: &str = "ERROR URL";
pub const IMAGE_ERROR_STYLE: TextStyle = TextStyle::regular(6.0);
pub const ABSENT_TEXT: &str = "ABSENT";
pub const ABSENT_STYLE: TextStyle = TextStyle::bold(9.0);
/// Slot used for image URLs found outside an image column.
const DEFAULT_IMAGE_SLOT: (f32, f32) = (60.0, 19.0);
/// Slack for float accumulation when comparing column sums to the page.
const WIDTH_TOLERANCE: f32 = 0.5;

/// Split `"Juan Dela Cruz (MGB Rep.)"` into `("Juan Dela Cruz", " (MGB Rep.)")`.
/// The suffix keeps its surrounding whitespace so it renders exactly as
/// written. Names without a non-empty trailing parenthetical return `None`.
pub fn split_parenthetical(name: &str) -> Option<(&str, &str)> {
    static PAREN: OnceLock<Regex> = OnceLock::new();
    let re = PAREN.get_or_init(|| Regex::new(r"^(.+?)(\s*\(.+?\)\s*)$").expect("static regex"));
    let caps = re.captures(name)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Resolved horizontal layout of a table on the page.
#[derive(Clone, Debug, PartialEq)]
pub struct TableGeometry {
    pub x: f32,
    pub label_width: f32,
    pub colon_width: f32,
    /// Left edge of the first data column.
    pub data_x: f32,
    pub widths: Vec<f32>,
}

impl TableGeometry {
    pub fn data_width(&self) -> f32 {
        self.widths.iter().sum()
    }

    pub fn total_width(&self) -> f32 {
        self.label_width + self.colon_width + self.data_width()
    }
}

/// Resolve column widths against the usable page width. Columns wider than
/// the page in total are rejected rather than silently overflowing.
pub fn table_geometry(
    page: &PageGeometry,
    label: Option<&LabelColumn>,
    columns: &[ColumnSpec],
) -> Result<TableGeometry, Error> {
    let table_w = page.usable_width();
    let label_width = label.map_or(0.0, |l| l.width.resolve(table_w));
    let colon_width = label
        .and_then(|l| l.colon)
        .map_or(0.0, |c| c.resolve(table_w));
    let widths: Vec<f32> = columns.iter().map(|c| c.width.resolve(table_w)).collect();

    if let Some(bad) = widths
        .iter()
        .chain([&label_width, &colon_width])
        .find(|w| !w.is_finite() || **w < 0.0)
    {
        return Err(Error::InvalidGeometry(format!("column width {bad}")));
    }
    let total = label_width + colon_width + widths.iter().sum::<f32>();
    if total > table_w + WIDTH_TOLERANCE {
        return Err(Error::InvalidGeometry(format!(
            "table columns need {total:.1}pt but only {table_w:.1}pt is usable"
        )));
    }

    let x = page.margins.left;
    Ok(TableGeometry {
        x,
        label_width,
        colon_width,
        data_x: x + label_width + colon_width,
        widths,
    })
}

fn name_runs(name: &str) -> Vec<StyledRun> {
    let bold = TextStyle {
        weight: FontWeight::Bold,
        ..TABLE_TEXT
    };
    match split_parenthetical(name) {
        Some((primary, suffix)) => vec![
            StyledRun::new(&primary.to_uppercase(), bold),
            StyledRun::new(suffix, TABLE_TEXT),
        ],
        None => vec![StyledRun::new(&name.trim().to_uppercase(), bold)],
    }
}

pub(super) enum CellContent {
    Lines(Vec<TextLine>),
    Image { url: String, slot_w: f32, slot_h: f32 },
    Empty,
}

/// Build the content of one cell; shared by measurement and drawing so both
/// see the same runs.
pub(super) fn cell_content(
    cell: Option<&Cell>,
    column: &ColumnSpec,
    width: f32,
    metrics: &TextMetrics,
) -> CellContent {
    let inner_w = (width - 2.0 * CELL_PADDING_X).max(1.0);
    let runs = match (cell, &column.kind) {
        (None, _) | (Some(Cell::Image(ImageCell::Missing)), _) => return CellContent::Empty,
        (Some(Cell::Image(ImageCell::Absent)), _) => vec![StyledRun::new(ABSENT_TEXT, ABSENT_STYLE)],
        (Some(Cell::Image(ImageCell::Url(url))), kind) => {
            let (slot_w, slot_h) = match kind {
                ColumnKind::Image { width, height } => (*width, *height),
                _ => DEFAULT_IMAGE_SLOT,
            };
            return CellContent::Image {
                url: url.clone(),
                slot_w: slot_w.min(inner_w),
                slot_h,
            };
        }
        (Some(Cell::Text(text)), ColumnKind::Name) => name_runs(text),
        (Some(Cell::Text(text)), ColumnKind::Text(weight)) => vec![StyledRun::new(
            text,
            TextStyle {
                weight: *weight,
                ..TABLE_TEXT
            },
        )],
        (Some(Cell::Text(text)), ColumnKind::Image { .. }) => vec![StyledRun::new(text, TABLE_TEXT)],
        (Some(Cell::Rich { bold, regular }), _) => vec![
            StyledRun::new(
                bold,
                TextStyle {
                    weight: FontWeight::Bold,
                    ..TABLE_TEXT
                },
            ),
            StyledRun::new(regular, TABLE_TEXT),
        ],
    };
    CellContent::Lines(build_lines(&runs, metrics, inner_w))
}

fn content_height(content: &CellContent, metrics: &TextMetrics) -> f32 {
    match content {
        CellContent::Lines(lines) => lines_height(lines, metrics),
        CellContent::Image { slot_h, .. } => *slot_h,
        CellContent::Empty => 0.0,
    }
}

/// Height of a data row: the tallest cell (wrapped text or image slot) plus
/// vertical padding, floored at `min_height`.
pub fn row_height(
    metrics: &TextMetrics,
    columns: &[ColumnSpec],
    widths: &[f32],
    row: &[Cell],
    min_height: f32,
) -> f32 {
    let tallest = columns
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (column, &w))| content_height(&cell_content(row.get(i), column, w, metrics), metrics))
        .fold(0.0f32, f32::max);
    (tallest + 2.0 * CELL_PADDING_Y).max(min_height)
}

fn header_lines(column: &ColumnSpec, width: f32, metrics: &TextMetrics) -> Vec<TextLine> {
    let runs = [StyledRun::new(&column.header.to_uppercase(), HEADER_TEXT)];
    build_lines(&runs, metrics, (width - 2.0 * CELL_PADDING_X).max(1.0))
}

/// Header height grows with the longest wrapped label.
pub fn header_height(metrics: &TextMetrics, columns: &[ColumnSpec], widths: &[f32]) -> f32 {
    let tallest = columns
        .iter()
        .zip(widths)
        .map(|(c, &w)| lines_height(&header_lines(c, w, metrics), metrics))
        .fold(0.0f32, f32::max);
    (tallest + 2.0 * CELL_PADDING_Y).max(HEADER_MIN_HEIGHT)
}

fn column_edges(x: f32, widths: &[f32]) -> Vec<f32> {
    let mut edges = Vec::with_capacity(widths.len() + 1);
    let mut acc = x;
    edges.push(acc);
    for w in widths {
        acc += w;
        edges.push(acc);
    }
    edges
}

/// Filled header band with centered, upper-cased labels.
pub(super) fn draw_header(
    canvas: &mut Canvas,
    metrics: &TextMetrics,
    columns: &[ColumnSpec],
    geo: &TableGeometry,
    y: f32,
    height: f32,
) -> Result<(), Error> {
    let edges = column_edges(geo.data_x, &geo.widths);
    canvas.rect(geo.data_x, y, geo.data_width(), height, Some(HEADER_FILL), true)?;
    for &edge in &edges[1..edges.len().saturating_sub(1)] {
        canvas.line(edge, y, edge, y + height)?;
    }
    for (i, (column, &w)) in columns.iter().zip(&geo.widths).enumerate() {
        let lines = header_lines(column, w, metrics);
        let text_h = lines_height(&lines, metrics);
        let top = y + ((height - text_h) / 2.0).max(0.0);
        render_lines(
            canvas,
            &lines,
            Alignment::Center,
            edges[i] + CELL_PADDING_X,
            w - 2.0 * CELL_PADDING_X,
            top,
        )?;
    }
    Ok(())
}

fn draw_cell(
    canvas: &mut Canvas,
    images: &ImageStore,
    metrics: &TextMetrics,
    content: &CellContent,
    align: Alignment,
    x: f32,
    width: f32,
    y: f32,
    height: f32,
) -> Result<(), Error> {
    let inner_w = width - 2.0 * CELL_PADDING_X;
    match content {
        CellContent::Empty => Ok(()),
        CellContent::Lines(lines) => {
            let text_h = lines_height(lines, metrics);
            let top = y + ((height - text_h) / 2.0).max(0.0);
            render_lines(canvas, lines, align, x + CELL_PADDING_X, inner_w, top)
        }
        CellContent::Image {
            url,
            slot_w,
            slot_h,
        } => match images.get(url) {
            Some(image) => {
                let (w, h) = image.fit_within(*slot_w, *slot_h);
                let ix = x + (width - w) / 2.0;
                let iy = y + (height - h) / 2.0;
                canvas.image(ix, iy, w, h, url)
            }
            None => {
                let w = metrics.width_of(IMAGE_ERROR_TEXT, IMAGE_ERROR_STYLE);
                let line_h = metrics.line_height(IMAGE_ERROR_STYLE);
                let top = y + (height - line_h) / 2.0;
                canvas.text(
                    x + (width - w) / 2.0,
                    top + metrics.ascent(IMAGE_ERROR_STYLE),
                    IMAGE_ERROR_TEXT,
                    IMAGE_ERROR_STYLE,
                )
            }
        },
    }
}

fn cell_align(column: &ColumnSpec) -> Alignment {
    match column.kind {
        ColumnKind::Name => Alignment::Left,
        _ => column.align,
    }
}

/// Left, right, bottom and separator borders of a row band.
fn draw_row_borders(canvas: &mut Canvas, geo: &TableGeometry, y: f32, height: f32) -> Result<(), Error> {
    let edges = column_edges(geo.data_x, &geo.widths);
    let right = geo.data_x + geo.data_width();
    let bottom = y + height;
    canvas.line(geo.data_x, y, geo.data_x, bottom)?;
    canvas.line(right, y, right, bottom)?;
    canvas.line(geo.data_x, bottom, right, bottom)?;
    for &edge in &edges[1..edges.len().saturating_sub(1)] {
        canvas.line(edge, y, edge, bottom)?;
    }
    Ok(())
}

/// Paint one data row. Rows draw left, right, bottom and separator borders;
/// the top edge belongs to whatever sits above (header, title or previous row).
pub(super) fn draw_row(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    row: &[Cell],
    columns: &[ColumnSpec],
    geo: &TableGeometry,
    y: f32,
    height: f32,
) -> Result<(), Error> {
    let edges = column_edges(geo.data_x, &geo.widths);
    for (i, (column, &w)) in columns.iter().zip(&geo.widths).enumerate() {
        let content = cell_content(row.get(i), column, w, ctx.metrics);
        draw_cell(
            canvas,
            ctx.images,
            ctx.metrics,
            &content,
            cell_align(column),
            edges[i],
            w,
            y,
            height,
        )?;
    }
    draw_row_borders(canvas, geo, y, height)
}

/// Height of a first row that must share a page with the header above it.
/// A row taller than a page only needs room for the start of its first slice.
pub(super) fn leading_row_height(h: f32, capacity: f32, min_row_height: f32) -> f32 {
    if h > capacity {
        min_row_height.max(HEADER_MIN_HEIGHT)
    } else {
        h
    }
}

/// Header plus leading row: what a table needs at the point it starts.
pub(super) fn lead_height(ctx: &LayoutContext, spec: &TableSpec) -> Result<f32, Error> {
    let geo = table_geometry(&ctx.geometry, spec.label.as_ref(), &spec.columns)?;
    let header_h = header_height(ctx.metrics, &spec.columns, &geo.widths);
    let first_h = spec.rows.first().map_or(0.0, |row| {
        row_height(ctx.metrics, &spec.columns, &geo.widths, row, spec.min_row_height)
    });
    Ok(header_h + leading_row_height(first_h, row_capacity(ctx, header_h), spec.min_row_height))
}

/// Room left for rows on a fresh page once the header is drawn.
pub(super) fn row_capacity(ctx: &LayoutContext, header_h: f32) -> f32 {
    ctx.bottom_limit() - ctx.geometry.margins.top - header_h
}

/// Close the table's page at `y` and reopen it on a fresh page under a
/// repeated header. Returns the y below that header.
pub(super) fn continue_on_next_page(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    label: Option<&mut LabelSession<'_>>,
    columns: &[ColumnSpec],
    geo: &TableGeometry,
    header_h: f32,
    y: f32,
) -> Result<f32, Error> {
    let top = match label {
        Some(session) => {
            session.close_segment(canvas, ctx.metrics, y, SegmentEnd::PageBreak)?;
            let top = canvas.add_page().y;
            session.restart(top);
            top
        }
        None => canvas.add_page().y,
    };
    draw_header(canvas, ctx.metrics, columns, geo, top, header_h)?;
    Ok(top + header_h)
}

/// Draw a row taller than a page in slices. Each slice fills the page down
/// to the bottom limit and the wrapped lines continue under the header on
/// the next page. Images stay in the first slice. Returns the y below the
/// last slice.
pub(super) fn draw_split_row(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    row: &[Cell],
    columns: &[ColumnSpec],
    geo: &TableGeometry,
    header_h: f32,
    mut label: Option<&mut LabelSession<'_>>,
    mut y: f32,
) -> Result<f32, Error> {
    let contents: Vec<CellContent> = columns
        .iter()
        .zip(&geo.widths)
        .enumerate()
        .map(|(i, (column, &w))| cell_content(row.get(i), column, w, ctx.metrics))
        .collect();
    let edges = column_edges(geo.data_x, &geo.widths);
    let bottom = ctx.bottom_limit();
    let mut drawn = vec![0usize; contents.len()];
    let mut first_slice = true;

    loop {
        let room = bottom - y - 2.0 * CELL_PADDING_Y;
        let mut slice_h = 0.0f32;
        let mut unfinished = false;

        for (i, ((content, column), &w)) in contents.iter().zip(columns).zip(&geo.widths).enumerate() {
            match content {
                CellContent::Lines(lines) => {
                    let rest = &lines[drawn[i]..];
                    let mut take = 0;
                    let mut h = 0.0f32;
                    // At least one line per slice so the row always advances.
                    for line in rest {
                        if take > 0 && h + line.height > room {
                            break;
                        }
                        h += line.height;
                        take += 1;
                    }
                    render_lines(
                        canvas,
                        &rest[..take],
                        cell_align(column),
                        edges[i] + CELL_PADDING_X,
                        w - 2.0 * CELL_PADDING_X,
                        y + CELL_PADDING_Y,
                    )?;
                    drawn[i] += take;
                    unfinished |= drawn[i] < lines.len();
                    slice_h = slice_h.max(h);
                }
                CellContent::Image { slot_h, .. } if first_slice => {
                    let box_h = slot_h + 2.0 * CELL_PADDING_Y;
                    draw_cell(
                        canvas,
                        ctx.images,
                        ctx.metrics,
                        content,
                        cell_align(column),
                        edges[i],
                        w,
                        y,
                        box_h,
                    )?;
                    slice_h = slice_h.max(*slot_h);
                }
                _ => {}
            }
        }

        let height = if unfinished {
            bottom - y
        } else {
            slice_h + 2.0 * CELL_PADDING_Y
        };
        draw_row_borders(canvas, geo, y, height)?;
        y += height;
        if !unfinished {
            return Ok(y);
        }
        log::debug!("row taller than a page continues at page {}", canvas.page_count() + 1);
        y = continue_on_next_page(canvas, ctx, label.as_deref_mut(), columns, geo, header_h, y)?;
        first_slice = false;
    }
}

/// A connected table that moves to a new page leaves the label cell above
/// it open; close it under the label and colon columns.
pub(super) fn close_previous_label(canvas: &mut Canvas, geo: &TableGeometry, y: f32) -> Result<(), Error> {
    canvas.line(geo.x, y, geo.x + geo.label_width + geo.colon_width, y)
}

/// Stream a table onto the canvas, breaking pages between rows and repeating
/// the header on every continuation page.
pub(super) fn draw_table(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    spec: &TableSpec,
    cursor: Cursor,
) -> Result<Cursor, Error> {
    let geo = table_geometry(&ctx.geometry, spec.label.as_ref(), &spec.columns)?;
    let header_h = header_height(ctx.metrics, &spec.columns, &geo.widths);
    let heights: Vec<f32> = spec
        .rows
        .iter()
        .map(|row| row_height(ctx.metrics, &spec.columns, &geo.widths, row, spec.min_row_height))
        .collect();
    for (i, h) in heights.iter().enumerate() {
        log::trace!("row {i} height {h:.2}");
    }

    let bottom = ctx.bottom_limit();
    let capacity = row_capacity(ctx, header_h);
    let mut y = cursor.y;

    // Header and first row travel together.
    let first_h = leading_row_height(
        heights.first().copied().unwrap_or(0.0),
        capacity,
        spec.min_row_height,
    );
    if !ctx.at_page_top(y) && y + header_h + first_h > bottom {
        log::debug!("table header does not fit at y={y:.2}, moving to next page");
        if spec.connect_previous {
            close_previous_label(canvas, &geo, y)?;
        }
        y = canvas.add_page().y;
    }

    let mut label = spec
        .label
        .as_ref()
        .map(|l| LabelSession::start(&l.text, &geo, y));

    draw_header(canvas, ctx.metrics, &spec.columns, &geo, y, header_h)?;
    y += header_h;
    let mut rows_on_page = 0usize;

    for (ri, (row, &h)) in spec.rows.iter().zip(&heights).enumerate() {
        if h > capacity {
            if rows_on_page > 0 && y + leading_row_height(h, capacity, spec.min_row_height) > bottom {
                y = continue_on_next_page(
                    canvas,
                    ctx,
                    label.as_mut(),
                    &spec.columns,
                    &geo,
                    header_h,
                    y,
                )?;
            }
            log::debug!("table row {ri} (h={h:.2}) is taller than a page, splitting it");
            y = draw_split_row(
                canvas,
                ctx,
                row,
                &spec.columns,
                &geo,
                header_h,
                label.as_mut(),
                y,
            )?;
            rows_on_page = 1;
            continue;
        }
        if rows_on_page > 0 && y + h > bottom {
            log::debug!("table row {ri} (h={h:.2}) breaks at y={y:.2}");
            y = continue_on_next_page(
                canvas,
                ctx,
                label.as_mut(),
                &spec.columns,
                &geo,
                header_h,
                y,
            )?;
            rows_on_page = 0;
        }

        draw_row(canvas, ctx, row, &spec.columns, &geo, y, h)?;
        y += h;
        rows_on_page += 1;
    }

    if let Some(mut session) = label {
        let end = if spec.suppress_bottom_border {
            SegmentEnd::Open
        } else {
            SegmentEnd::Final
        };
        session.close_segment(canvas, ctx.metrics, y, end)?;
    }

    if !spec.suppress_bottom_spacing {
        y += TABLE_GAP;
    }
    Ok(Cursor { x: cursor.x, y })
}

use crate::error::Error;
use crate::model::{Alignment, KeyValue, TextStyle};

use super::LayoutContext;
use super::canvas::{Canvas, Cursor};
use super::layout::{StyledRun, TextLine, build_lines, lines_height, render_lines};

pub const TITLE_TEXT: TextStyle = TextStyle::bold(12.0);
pub const HEADING_TEXT: TextStyle = TextStyle::bold(10.0);
pub const SUBHEADING_TEXT: TextStyle = TextStyle::bold(9.0);
pub const BODY_TEXT: TextStyle = TextStyle::regular(9.0);
pub const KEY_TEXT: TextStyle = TextStyle::bold(9.0);

const TITLE_SPACE_AFTER: f32 = 14.0;
const HEADING_SPACE_BEFORE: f32 = 8.0;
const HEADING_SPACE_AFTER: f32 = 6.0;
/// Least room a heading keeps below it before it is pushed to the next page.
const KEEP_WITH_NEXT: f32 = 40.0;
/// Share of the usable width given to key labels.
const KEY_COLUMN_RATIO: f32 = 0.35;
const COLON_GAP: f32 = 10.0;
const PAIR_SPACING: f32 = 3.0;
const BLOCK_SPACE_AFTER: f32 = 8.0;

pub(super) fn draw_title(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    text: &str,
    cursor: Cursor,
) -> Result<Cursor, Error> {
    let width = ctx.geometry.usable_width();
    let lines = build_lines(&[StyledRun::new(text, TITLE_TEXT)], ctx.metrics, width);
    render_lines(canvas, &lines, Alignment::Center, cursor.x, width, cursor.y)?;
    Ok(Cursor {
        x: cursor.x,
        y: cursor.y + lines_height(&lines, ctx.metrics) + TITLE_SPACE_AFTER,
    })
}

fn heading_lines(ctx: &LayoutContext, text: &str, level: u8) -> Vec<TextLine> {
    let style = if level <= 1 {
        HEADING_TEXT
    } else {
        SUBHEADING_TEXT
    };
    build_lines(&[StyledRun::new(text, style)], ctx.metrics, ctx.geometry.usable_width())
}

/// Vertical space a heading takes below a previous block, gaps included.
pub(super) fn heading_height(ctx: &LayoutContext, text: &str, level: u8) -> f32 {
    let lines = heading_lines(ctx, text, level);
    HEADING_SPACE_BEFORE + lines_height(&lines, ctx.metrics) + HEADING_SPACE_AFTER
}

/// Draw a heading, moving it to the next page unless `lead` (the height
/// the following block needs at its start) still fits below it.
pub(super) fn draw_heading(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    text: &str,
    level: u8,
    lead: f32,
    cursor: Cursor,
) -> Result<Cursor, Error> {
    let width = ctx.geometry.usable_width();
    let lines = heading_lines(ctx, text, level);
    let height = lines_height(&lines, ctx.metrics);
    let keep = lead.max(KEEP_WITH_NEXT);

    let mut y = cursor.y;
    if !ctx.at_page_top(y) {
        y += HEADING_SPACE_BEFORE;
    }
    if !ctx.at_page_top(cursor.y) && y + height + HEADING_SPACE_AFTER + keep > ctx.bottom_limit() {
        log::debug!("heading {text:?} kept with its content on the next page");
        y = canvas.add_page().y;
    }

    render_lines(canvas, &lines, Alignment::Left, cursor.x, width, y)?;
    Ok(Cursor {
        x: cursor.x,
        y: y + height + HEADING_SPACE_AFTER,
    })
}

/// Wrapped key and value of one pair, with the height of each line row.
fn pair_lines(ctx: &LayoutContext, pair: &KeyValue) -> (Vec<TextLine>, Vec<TextLine>, Vec<f32>) {
    let width = ctx.geometry.usable_width();
    let key_w = width * KEY_COLUMN_RATIO;
    let key = build_lines(&[StyledRun::new(&pair.label, KEY_TEXT)], ctx.metrics, key_w);
    let value = build_lines(
        &[StyledRun::new(&pair.value, BODY_TEXT)],
        ctx.metrics,
        width - key_w - COLON_GAP,
    );
    let rows = (0..key.len().max(value.len()))
        .map(|i| {
            let k = key.get(i).map_or(0.0, |l| l.height);
            let v = value.get(i).map_or(0.0, |l| l.height);
            k.max(v)
        })
        .collect();
    (key, value, rows)
}

/// Height of the first pair when it is kept whole, else of its first line.
pub(super) fn key_values_lead(ctx: &LayoutContext, pairs: &[KeyValue]) -> f32 {
    let Some(pair) = pairs.first() else {
        return 0.0;
    };
    let (_, _, rows) = pair_lines(ctx, pair);
    let whole: f32 = rows.iter().sum();
    if whole <= ctx.bottom_limit() - ctx.geometry.margins.top {
        whole
    } else {
        rows.first().copied().unwrap_or(0.0)
    }
}

pub(super) fn paragraph_lead(ctx: &LayoutContext, text: &str) -> f32 {
    build_lines(&[StyledRun::new(text, BODY_TEXT)], ctx.metrics, ctx.geometry.usable_width())
        .first()
        .map_or(0.0, |line| line.height)
}

/// Label/colon/value rows. A pair is kept whole on one page when it fits on
/// one; longer pairs break between lines, with the key and colon printed on
/// the first slice only.
pub(super) fn draw_key_values(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    pairs: &[KeyValue],
    cursor: Cursor,
) -> Result<Cursor, Error> {
    let width = ctx.geometry.usable_width();
    let key_w = width * KEY_COLUMN_RATIO;
    let value_x = cursor.x + key_w + COLON_GAP;
    let value_w = width - key_w - COLON_GAP;
    let bottom = ctx.bottom_limit();
    let page_room = bottom - ctx.geometry.margins.top;
    let mut y = cursor.y;

    for pair in pairs {
        let (key_lines, value_lines, rows) = pair_lines(ctx, pair);
        let h: f32 = rows.iter().sum();

        if !ctx.at_page_top(y) && y + h > bottom && h <= page_room {
            y = canvas.add_page().y;
        }

        for (i, &row_h) in rows.iter().enumerate() {
            if !ctx.at_page_top(y) && y + row_h > bottom {
                log::debug!("key/value {:?} continues on the next page", pair.label);
                y = canvas.add_page().y;
            }
            let key = key_lines.get(i..=i).unwrap_or_default();
            let value = value_lines.get(i..=i).unwrap_or_default();
            render_lines(canvas, key, Alignment::Left, cursor.x, key_w, y)?;
            if i == 0 {
                canvas.text(cursor.x + key_w, y + ctx.metrics.ascent(KEY_TEXT), ":", KEY_TEXT)?;
            }
            render_lines(canvas, value, Alignment::Left, value_x, value_w, y)?;
            y += row_h;
        }
        y += PAIR_SPACING;
    }

    Ok(Cursor {
        x: cursor.x,
        y: y + BLOCK_SPACE_AFTER,
    })
}

/// Body text, broken between lines when it runs past the page bottom.
pub(super) fn draw_paragraph(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    text: &str,
    cursor: Cursor,
) -> Result<Cursor, Error> {
    let width = ctx.geometry.usable_width();
    let lines = build_lines(&[StyledRun::new(text, BODY_TEXT)], ctx.metrics, width);
    let mut y = cursor.y;
    for line in lines {
        if !ctx.at_page_top(y) && y + line.height > ctx.bottom_limit() {
            y = canvas.add_page().y;
        }
        let height = line.height;
        render_lines(canvas, &[line], Alignment::Left, cursor.x, width, y)?;
        y += height;
    }
    Ok(Cursor {
        x: cursor.x,
        y: y + BLOCK_SPACE_AFTER,
    })
}

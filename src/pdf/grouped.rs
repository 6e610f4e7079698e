//! Multi-group table under one merged label (the fund status section).

use crate::error::Error;
use crate::model::{Alignment, FundGroup, GroupedTableSpec, TextStyle};

use super::LayoutContext;
use super::canvas::{Canvas, Cursor};
use super::label::{LabelSession, SegmentEnd};
use super::layout::{StyledRun, build_lines, lines_height, render_lines};
use super::table::{
    CELL_PADDING_X, CELL_PADDING_Y, TABLE_GAP, TableGeometry, close_previous_label,
    continue_on_next_page, draw_header, draw_row, draw_split_row, header_height,
    leading_row_height, row_capacity, row_height, table_geometry,
};

pub const GROUP_TITLE_TEXT: TextStyle = TextStyle::bold(9.0);

fn title_height(ctx: &LayoutContext, title: &str, geo: &TableGeometry, min_height: f32) -> f32 {
    let runs = [StyledRun::new(title, GROUP_TITLE_TEXT)];
    let lines = build_lines(&runs, ctx.metrics, geo.data_width() - 2.0 * CELL_PADDING_X);
    (lines_height(&lines, ctx.metrics) + 2.0 * CELL_PADDING_Y).max(min_height)
}

/// Full-width group title row. Draws its own top edge only when it opens a
/// continuation page; otherwise the edge above already exists.
fn draw_title_row(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    title: &str,
    geo: &TableGeometry,
    y: f32,
    height: f32,
    draw_top: bool,
) -> Result<(), Error> {
    let left = geo.data_x;
    let right = geo.data_x + geo.data_width();
    if draw_top {
        canvas.line(left, y, right, y)?;
    }
    canvas.line(left, y, left, y + height)?;
    canvas.line(right, y, right, y + height)?;
    canvas.line(left, y + height, right, y + height)?;

    let inner_w = geo.data_width() - 2.0 * CELL_PADDING_X;
    let runs = [StyledRun::new(title, GROUP_TITLE_TEXT)];
    let lines = build_lines(&runs, ctx.metrics, inner_w);
    let text_h = lines_height(&lines, ctx.metrics);
    render_lines(
        canvas,
        &lines,
        Alignment::Left,
        left + CELL_PADDING_X,
        inner_w,
        y + ((height - text_h) / 2.0).max(0.0),
    )
}

fn lead_for_group(
    ctx: &LayoutContext,
    spec: &GroupedTableSpec,
    group: &FundGroup,
    geo: &TableGeometry,
    header_h: f32,
    capacity: f32,
) -> f32 {
    let first_row_h = group.rows.first().map_or(0.0, |row| {
        row_height(ctx.metrics, &spec.columns, &geo.widths, row, spec.min_row_height)
    });
    title_height(ctx, &group.title, geo, spec.min_row_height)
        + header_h
        + leading_row_height(first_row_h, capacity, spec.min_row_height)
}

/// Title, header and leading row of the first group.
pub(super) fn lead_height(ctx: &LayoutContext, spec: &GroupedTableSpec) -> Result<f32, Error> {
    let geo = table_geometry(&ctx.geometry, Some(&spec.label), &spec.columns)?;
    let header_h = header_height(ctx.metrics, &spec.columns, &geo.widths);
    let capacity = row_capacity(ctx, header_h);
    Ok(spec
        .groups
        .first()
        .map_or(0.0, |group| lead_for_group(ctx, spec, group, &geo, header_h, capacity)))
}

/// Stream every group (title row, column header, data rows) beside a single
/// label column that survives any number of page breaks.
pub(super) fn draw_grouped_table(
    canvas: &mut Canvas,
    ctx: &LayoutContext,
    spec: &GroupedTableSpec,
    cursor: Cursor,
) -> Result<Cursor, Error> {
    let geo = table_geometry(&ctx.geometry, Some(&spec.label), &spec.columns)?;
    let header_h = header_height(ctx.metrics, &spec.columns, &geo.widths);
    let capacity = row_capacity(ctx, header_h);
    let bottom = ctx.bottom_limit();
    let mut y = cursor.y;
    // Title, header and first row of a group always share a page.
    let group_lead = |group: &FundGroup| lead_for_group(ctx, spec, group, &geo, header_h, capacity);

    if let Some(first) = spec.groups.first()
        && !ctx.at_page_top(y)
        && y + group_lead(first) > bottom
    {
        log::debug!("grouped table start does not fit at y={y:.2}, moving to next page");
        if spec.connect_previous {
            close_previous_label(canvas, &geo, y)?;
        }
        y = canvas.add_page().y;
    }

    let mut session = LabelSession::start(&spec.label.text, &geo, y);
    // Whether anything of this table is already on the current page.
    let mut page_has_content = false;
    let mut rows_on_page = 0usize;

    for group in &spec.groups {
        let title_h = title_height(ctx, &group.title, &geo, spec.min_row_height);

        if page_has_content && y + group_lead(group) > bottom {
            log::debug!("group {:?} title+header moved to next page", group.title);
            session.close_segment(canvas, ctx.metrics, y, SegmentEnd::PageBreak)?;
            y = canvas.add_page().y;
            session.restart(y);
            page_has_content = false;
            rows_on_page = 0;
        }

        let opens_continuation = !page_has_content && session.is_continuation();
        draw_title_row(canvas, ctx, &group.title, &geo, y, title_h, opens_continuation)?;
        y += title_h;
        draw_header(canvas, ctx.metrics, &spec.columns, &geo, y, header_h)?;
        y += header_h;
        page_has_content = true;

        for (ri, row) in group.rows.iter().enumerate() {
            let h = row_height(ctx.metrics, &spec.columns, &geo.widths, row, spec.min_row_height);
            log::trace!("group {:?} row {ri} height {h:.2}", group.title);

            if h > capacity {
                if rows_on_page > 0 && y + leading_row_height(h, capacity, spec.min_row_height) > bottom {
                    y = continue_on_next_page(
                        canvas,
                        ctx,
                        Some(&mut session),
                        &spec.columns,
                        &geo,
                        header_h,
                        y,
                    )?;
                }
                log::debug!("row {ri} of {:?} is taller than a page, splitting it", group.title);
                y = draw_split_row(
                    canvas,
                    ctx,
                    row,
                    &spec.columns,
                    &geo,
                    header_h,
                    Some(&mut session),
                    y,
                )?;
                rows_on_page = 1;
                continue;
            }
            if rows_on_page > 0 && y + h > bottom {
                log::debug!("group {:?} row {ri} breaks at y={y:.2}", group.title);
                // Re-opened header carries its own filled top edge.
                y = continue_on_next_page(
                    canvas,
                    ctx,
                    Some(&mut session),
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
    }

    session.close_segment(canvas, ctx.metrics, y, SegmentEnd::Final)?;
    Ok(Cursor {
        x: cursor.x,
        y: y + TABLE_GAP,
    })
}

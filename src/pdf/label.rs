//! Merged label column spanning a table across page breaks.
//!
//! A labelled table draws its label cell once per page segment. The first
//! segment owns the full-width top border of the section; later segments only
//! close the label and colon cells at each break, so the bottom border of a
//! page never runs under the data columns (the rows already drew theirs).

use crate::error::Error;
use crate::fonts::TextMetrics;
use crate::model::{Alignment, TextStyle};

use super::canvas::Canvas;
use super::layout::{StyledRun, build_lines, lines_height, render_lines};
use super::table::{CELL_PADDING_X, TableGeometry};

pub const LABEL_TEXT: TextStyle = TextStyle::bold(9.0);

/// How a label segment ends on its page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SegmentEnd {
    /// Page break inside the table: bottom border under label and colon only.
    PageBreak,
    /// End of the table: bottom border across the whole table.
    Final,
    /// End of the table, border left to the table connected below.
    Open,
}

pub(super) struct LabelSession<'a> {
    text: &'a str,
    x: f32,
    label_width: f32,
    colon_width: f32,
    total_width: f32,
    segment_top: f32,
    continuation: bool,
}

impl<'a> LabelSession<'a> {
    pub(super) fn start(text: &'a str, geo: &TableGeometry, y: f32) -> Self {
        Self {
            text,
            x: geo.x,
            label_width: geo.label_width,
            colon_width: geo.colon_width,
            total_width: geo.total_width(),
            segment_top: y,
            continuation: false,
        }
    }

    pub(super) fn is_continuation(&self) -> bool {
        self.continuation
    }

    /// Begin the next segment at the top of a fresh page.
    pub(super) fn restart(&mut self, y: f32) {
        self.segment_top = y;
    }

    /// Ink the current segment: borders around label and colon cells, the
    /// label text and the colon, and the bottom border chosen by `end`.
    pub(super) fn close_segment(
        &mut self,
        canvas: &mut Canvas,
        metrics: &TextMetrics,
        end_y: f32,
        end: SegmentEnd,
    ) -> Result<(), Error> {
        let top = self.segment_top;
        let merged = self.label_width + self.colon_width;
        let x = self.x;

        let top_width = if self.continuation {
            merged
        } else {
            self.total_width
        };
        canvas.line(x, top, x + top_width, top)?;
        canvas.line(x, top, x, end_y)?;
        canvas.line(x + merged, top, x + merged, end_y)?;

        let height = end_y - top;
        let runs = [StyledRun::new(self.text, LABEL_TEXT)];
        let inner_w = (self.label_width - 2.0 * CELL_PADDING_X).max(1.0);
        let lines = build_lines(&runs, metrics, inner_w);
        let text_h = lines_height(&lines, metrics);
        let text_top = top + ((height - text_h) / 2.0).max(0.0);
        render_lines(
            canvas,
            &lines,
            Alignment::Center,
            x + CELL_PADDING_X,
            inner_w,
            text_top,
        )?;

        if self.colon_width > 0.0 {
            let colon_w = metrics.width_of(":", LABEL_TEXT);
            let line_h = metrics.line_height(LABEL_TEXT);
            let colon_top = top + ((height - line_h) / 2.0).max(0.0);
            canvas.text(
                x + self.label_width + (self.colon_width - colon_w) / 2.0,
                colon_top + metrics.ascent(LABEL_TEXT),
                ":",
                LABEL_TEXT,
            )?;
        }

        match end {
            SegmentEnd::PageBreak => canvas.line(x, end_y, x + merged, end_y)?,
            SegmentEnd::Final => canvas.line(x, end_y, x + self.total_width, end_y)?,
            SegmentEnd::Open => {}
        }

        self.continuation = true;
        Ok(())
    }
}

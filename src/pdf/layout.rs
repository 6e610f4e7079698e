use crate::error::Error;
use crate::fonts::TextMetrics;
use crate::model::{Alignment, TextStyle};

use super::canvas::Canvas;

/// A span of text drawn in one style.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StyledRun {
    pub(crate) text: String,
    pub(crate) style: TextStyle,
}

impl StyledRun {
    pub(crate) fn new(text: &str, style: TextStyle) -> Self {
        Self {
            text: text.to_string(),
            style,
        }
    }
}

pub(crate) struct WordChunk {
    pub(crate) text: String,
    pub(crate) style: TextStyle,
    pub(crate) x_offset: f32, // x relative to line start
    pub(crate) width: f32,
}

pub(crate) struct TextLine {
    pub(crate) chunks: Vec<WordChunk>,
    pub(crate) total_width: f32,
    pub(crate) height: f32,
    pub(crate) ascent: f32,
}

struct LineBuilder<'a> {
    metrics: &'a TextMetrics,
    lines: Vec<TextLine>,
    chunks: Vec<WordChunk>,
    current_x: f32,
    /// Tallest style placed on the current line, or the style of the run
    /// that opened it when the line is still empty.
    line_style: Option<TextStyle>,
}

impl<'a> LineBuilder<'a> {
    fn new(metrics: &'a TextMetrics) -> Self {
        Self {
            metrics,
            lines: Vec::new(),
            chunks: Vec::new(),
            current_x: 0.0,
            line_style: None,
        }
    }

    fn note_style(&mut self, style: TextStyle) {
        let taller = match self.line_style {
            Some(s) => self.metrics.line_height(style) > self.metrics.line_height(s),
            None => true,
        };
        if taller {
            self.line_style = Some(style);
        }
    }

    fn finish_line(&mut self, fallback: TextStyle) {
        let total_width = self
            .chunks
            .last()
            .map(|c| c.x_offset + c.width)
            .unwrap_or(0.0);
        let mut height: f32 = 0.0;
        let mut ascent: f32 = 0.0;
        for chunk in &self.chunks {
            height = height.max(self.metrics.line_height(chunk.style));
            ascent = ascent.max(self.metrics.ascent(chunk.style));
        }
        if self.chunks.is_empty() {
            let style = self.line_style.unwrap_or(fallback);
            height = self.metrics.line_height(style);
            ascent = self.metrics.ascent(style);
        }
        self.lines.push(TextLine {
            chunks: std::mem::take(&mut self.chunks),
            total_width,
            height,
            ascent,
        });
        self.current_x = 0.0;
        self.line_style = None;
    }

    /// Place one word, merging it into the previous chunk when the style matches.
    fn place(&mut self, word: &str, style: TextStyle, width: f32, space_w: f32, need_space: bool) {
        let x = if need_space {
            self.current_x + space_w
        } else {
            self.current_x
        };
        match self.chunks.last_mut() {
            Some(last) if last.style == style => {
                if need_space {
                    last.text.push(' ');
                }
                last.text.push_str(word);
                last.width = x + width - last.x_offset;
            }
            _ => self.chunks.push(WordChunk {
                text: word.to_string(),
                style,
                x_offset: x,
                width,
            }),
        }
        self.current_x = x + width;
        self.note_style(style);
    }
}

/// Split a word wider than `max_width` into pieces that each fit.
fn split_long_word(word: &str, style: TextStyle, metrics: &TextMetrics, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_w = 0.0;
    for ch in word.chars() {
        let cw = metrics.width_of(ch.encode_utf8(&mut [0; 4]), style);
        if !piece.is_empty() && piece_w + cw > max_width {
            pieces.push(std::mem::take(&mut piece));
            piece_w = 0.0;
        }
        piece.push(ch);
        piece_w += cw;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Layout runs into wrapped lines.
/// No space is inserted between runs unless the preceding text ended with
/// whitespace or the new run starts with whitespace. `\n` forces a break.
pub(crate) fn build_lines(runs: &[StyledRun], metrics: &TextMetrics, max_width: f32) -> Vec<TextLine> {
    let fallback = runs
        .first()
        .map(|r| r.style)
        .unwrap_or(TextStyle::regular(9.0));
    let mut b = LineBuilder::new(metrics);
    let mut prev_ended_with_ws = false;
    let mut prev_space_w: f32 = 0.0;

    for run in runs {
        let space_w = metrics.width_of(" ", run.style);
        if b.line_style.is_none() {
            b.line_style = Some(run.style);
        }

        for (seg_idx, segment) in run.text.split('\n').enumerate() {
            if seg_idx > 0 {
                b.finish_line(run.style);
                b.line_style = Some(run.style);
                prev_ended_with_ws = false;
            }
            let starts_with_ws = segment.starts_with(char::is_whitespace);

            for (i, word) in segment.split_whitespace().enumerate() {
                let ww = metrics.width_of(word, run.style);
                let need_space =
                    !b.chunks.is_empty() && (i > 0 || starts_with_ws || prev_ended_with_ws);
                let effective_space_w = if i > 0 || starts_with_ws {
                    space_w
                } else {
                    prev_space_w
                };
                let proposed_x = if need_space {
                    b.current_x + effective_space_w
                } else {
                    b.current_x
                };

                if proposed_x + ww <= max_width || (b.chunks.is_empty() && ww <= max_width) {
                    b.place(word, run.style, ww, effective_space_w, need_space);
                    continue;
                }
                if ww <= max_width {
                    b.finish_line(run.style);
                    b.place(word, run.style, ww, 0.0, false);
                    continue;
                }

                // Word wider than the whole line: break it across lines.
                if !b.chunks.is_empty() {
                    b.finish_line(run.style);
                }
                let pieces = split_long_word(word, run.style, metrics, max_width);
                let last = pieces.len().saturating_sub(1);
                for (p, piece) in pieces.iter().enumerate() {
                    let pw = metrics.width_of(piece, run.style);
                    b.place(piece, run.style, pw, 0.0, false);
                    if p < last {
                        b.finish_line(run.style);
                    }
                }
            }

            prev_ended_with_ws = segment.ends_with(char::is_whitespace);
        }
        prev_space_w = space_w;
    }

    if !b.chunks.is_empty() || b.lines.is_empty() || b.line_style.is_some() {
        b.finish_line(fallback);
    }
    b.lines
}

pub(crate) fn lines_height(lines: &[TextLine], _metrics: &TextMetrics) -> f32 {
    lines.iter().map(|l| l.height).sum()
}

/// Draw pre-built lines into the box starting at (`x`, `top`), aligned within `width`.
pub(crate) fn render_lines(
    canvas: &mut Canvas,
    lines: &[TextLine],
    align: Alignment,
    x: f32,
    width: f32,
    top: f32,
) -> Result<(), Error> {
    let mut y = top;
    for line in lines {
        let line_x = match align {
            Alignment::Left => x,
            Alignment::Center => x + ((width - line.total_width) / 2.0).max(0.0),
            Alignment::Right => x + (width - line.total_width).max(0.0),
        };
        let baseline = y + line.ascent;
        for chunk in &line.chunks {
            canvas.text(line_x + chunk.x_offset, baseline, &chunk.text, chunk.style)?;
        }
        y += line.height;
    }
    Ok(())
}

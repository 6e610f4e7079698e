use chrono::NaiveDateTime;

use crate::error::Error;
use crate::fonts::TextMetrics;
use crate::model::TextStyle;

use super::canvas::{Canvas, Page};

pub const FOOTER_TEXT: TextStyle = TextStyle::regular(8.0);
/// Distance of the footer line box above the bottom margin. Body content
/// must keep at least this much reserve to stay clear of the footer.
pub const FOOTER_OFFSET: f32 = 14.0;

/// `Generated on March 5, 2025 2:07 PM`
pub fn generated_on(at: NaiveDateTime) -> String {
    format!("Generated on {}", at.format("%B %-d, %Y %-I:%M %p"))
}

pub fn page_label(page: usize, total: usize) -> String {
    format!("Page {page} of {total}")
}

/// Stamp every buffered page with the generation time and "Page N of M".
/// Consumes the canvas, so a document is footed exactly once and nothing can
/// be drawn after the total page count is known.
pub(super) fn apply_footers(
    mut canvas: Canvas,
    metrics: &TextMetrics,
    generated_at: NaiveDateTime,
) -> Result<Vec<Page>, Error> {
    let geometry = canvas.geometry();
    let total = canvas.page_count();
    let top = geometry.height - geometry.margins.bottom - FOOTER_OFFSET;
    let baseline = top + metrics.ascent(FOOTER_TEXT);
    let stamp = generated_on(generated_at);
    let right_edge = geometry.width - geometry.margins.right;

    for index in 0..total {
        canvas.switch_to_page(index)?;
        canvas.text(geometry.margins.left, baseline, &stamp, FOOTER_TEXT)?;
        let label = page_label(index + 1, total);
        let w = metrics.width_of(&label, FOOTER_TEXT);
        canvas.text(right_edge - w, baseline, &label, FOOTER_TEXT)?;
    }
    log::debug!("footers applied to {total} pages");
    Ok(canvas.into_pages())
}

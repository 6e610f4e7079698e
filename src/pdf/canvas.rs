use crate::error::Error;
use crate::model::{PageGeometry, TextStyle};

/// Default stroke width for table borders, in points.
pub const BORDER_WIDTH: f32 = 0.5;

/// Drawing position in top-down page coordinates (y grows towards the page bottom).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
}

/// One buffered drawing operation. Coordinates are top-down points; the PDF
/// writer flips them into PDF user space.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<[u8; 3]>,
        stroke: bool,
    },
    Text {
        x: f32,
        baseline: f32,
        text: String,
        style: TextStyle,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        url: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = (&str, TextStyle)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, style, .. } => Some((text.as_str(), *style)),
            _ => None,
        })
    }
}

fn check_finite(values: &[f32], what: &str) -> Result<(), Error> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::InvalidGeometry(format!(
            "{what} has non-finite coordinates: {values:?}"
        )))
    }
}

fn check_size(width: f32, height: f32, what: &str) -> Result<(), Error> {
    if width < 0.0 || height < 0.0 {
        return Err(Error::InvalidGeometry(format!(
            "{what} has negative size {width}×{height}"
        )));
    }
    Ok(())
}

/// Append-only page buffer. Every page stays addressable until the footer pass
/// consumes the canvas.
pub struct Canvas {
    geometry: PageGeometry,
    pages: Vec<Page>,
    current: usize,
}

impl Canvas {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Page::default()],
            current: 0,
        }
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Top-left corner of the content area.
    pub fn top_left(&self) -> Cursor {
        Cursor {
            x: self.geometry.margins.left,
            y: self.geometry.margins.top,
        }
    }

    /// Start a new page and make it current; returns its top-left cursor.
    pub fn add_page(&mut self) -> Cursor {
        self.pages.push(Page::default());
        self.current = self.pages.len() - 1;
        log::debug!("page break → page {}", self.pages.len());
        self.top_left()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn switch_to_page(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.pages.len() {
            return Err(Error::InvalidGeometry(format!(
                "page {} does not exist ({} buffered)",
                index + 1,
                self.pages.len()
            )));
        }
        self.current = index;
        Ok(())
    }

    fn push(&mut self, op: DrawOp) {
        self.pages[self.current].ops.push(op);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Result<(), Error> {
        check_finite(&[x1, y1, x2, y2], "line")?;
        self.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width: BORDER_WIDTH,
        });
        Ok(())
    }

    pub fn rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<[u8; 3]>,
        stroke: bool,
    ) -> Result<(), Error> {
        check_finite(&[x, y, width, height], "rect")?;
        check_size(width, height, "rect")?;
        self.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill,
            stroke,
        });
        Ok(())
    }

    pub fn text(&mut self, x: f32, baseline: f32, text: &str, style: TextStyle) -> Result<(), Error> {
        check_finite(&[x, baseline, style.size], "text")?;
        if style.size <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "text {text:?} has font size {}",
                style.size
            )));
        }
        if text.is_empty() {
            return Ok(());
        }
        self.push(DrawOp::Text {
            x,
            baseline,
            text: text.to_string(),
            style,
        });
        Ok(())
    }

    pub fn image(&mut self, x: f32, y: f32, width: f32, height: f32, url: &str) -> Result<(), Error> {
        check_finite(&[x, y, width, height], "image")?;
        check_size(width, height, "image")?;
        self.push(DrawOp::Image {
            x,
            y,
            width,
            height,
            url: url.to_string(),
        });
        Ok(())
    }

    pub(crate) fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}

//! Format-neutral document model shared by the PDF and DOCX renderers.
//!
//! Report composers produce a flat list of [`Block`]s; each renderer walks the
//! same list, so both outputs carry the same sections in the same order.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
}

impl PageGeometry {
    /// 8.5" × 13" folio used by the CMVR form.
    pub const FOLIO_WIDTH: f32 = 612.0;
    pub const FOLIO_HEIGHT: f32 = 936.0;

    pub fn cmvr() -> Self {
        Self {
            width: Self::FOLIO_WIDTH,
            height: Self::FOLIO_HEIGHT,
            margins: Margins {
                top: 50.0,
                bottom: 50.0,
                left: 56.0,
                right: 46.0,
            },
        }
    }

    pub fn attendance() -> Self {
        Self {
            width: Self::FOLIO_WIDTH,
            height: Self::FOLIO_HEIGHT,
            margins: Margins {
                top: 50.0,
                bottom: 50.0,
                left: 50.0,
                right: 50.0,
            },
        }
    }

    pub fn usable_width(&self) -> f32 {
        self.width - self.margins.left - self.margins.right
    }

    /// Lowest y (top-down) at which content may still end on a page.
    pub fn bottom_limit(&self, footer_reserve: f32) -> f32 {
        self.height - self.margins.bottom - footer_reserve
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub weight: FontWeight,
    pub size: f32,
}

impl TextStyle {
    pub const fn regular(size: f32) -> Self {
        Self {
            weight: FontWeight::Regular,
            size,
        }
    }

    pub const fn bold(size: f32) -> Self {
        Self {
            weight: FontWeight::Bold,
            size,
        }
    }
}

/// Table body text: regular 9pt.
pub const TABLE_TEXT: TextStyle = TextStyle::regular(9.0);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColumnWidth {
    Points(f32),
    /// Percentage (0–100) of the table width.
    Percent(f32),
}

impl ColumnWidth {
    pub fn resolve(self, table_width: f32) -> f32 {
        match self {
            ColumnWidth::Points(pt) => pt,
            ColumnWidth::Percent(pct) => table_width * pct / 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnKind {
    /// Plain text in the given weight.
    Text(FontWeight),
    /// Person name: bold upper-cased primary part, regular parenthetical suffix.
    Name,
    /// Signature/photo slot; images are fitted into `width` × `height`.
    Image { width: f32, height: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    pub header: String,
    pub width: ColumnWidth,
    pub kind: ColumnKind,
    pub align: Alignment,
}

impl ColumnSpec {
    pub fn text(header: &str, width: ColumnWidth) -> Self {
        Self {
            header: header.to_string(),
            width,
            kind: ColumnKind::Text(FontWeight::Regular),
            align: Alignment::Center,
        }
    }

    pub fn aligned(mut self, align: Alignment) -> Self {
        self.align = align;
        self
    }

    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImageCell {
    /// Attendee was absent: the slot reads "ABSENT".
    Absent,
    Url(String),
    Missing,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    /// Bold prefix immediately followed by a regular suffix in one text run.
    Rich { bold: String, regular: String },
    Image(ImageCell),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }
}

pub type Row = Vec<Cell>;

/// Merged cell on the left of a table, spanning every row (and page) of it.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelColumn {
    pub text: String,
    pub width: ColumnWidth,
    /// Width of the ":" column drawn between the label and the data.
    pub colon: Option<ColumnWidth>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableSpec {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Row>,
    pub label: Option<LabelColumn>,
    /// Start flush against the previous table (no gap, shared border).
    pub connect_previous: bool,
    /// Leave the closing border to the table that follows.
    pub suppress_bottom_border: bool,
    /// Skip the gap that normally follows a table.
    pub suppress_bottom_spacing: bool,
    pub min_row_height: f32,
}

impl TableSpec {
    pub fn new(columns: Vec<ColumnSpec>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            label: None,
            connect_previous: false,
            suppress_bottom_border: false,
            suppress_bottom_spacing: false,
            min_row_height: MIN_ROW_HEIGHT,
        }
    }
}

/// Default row floor for text-only tables.
pub const MIN_ROW_HEIGHT: f32 = 20.0;
/// Row floor for tables that may hold signature or photo images.
pub const MIN_IMAGE_ROW_HEIGHT: f32 = 25.0;

#[derive(Clone, Debug, PartialEq)]
pub struct FundGroup {
    pub title: String,
    pub rows: Vec<Row>,
}

/// Several titled sub-tables sharing one merged label column.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupedTableSpec {
    pub label: LabelColumn,
    pub columns: Vec<ColumnSpec>,
    pub groups: Vec<FundGroup>,
    pub connect_previous: bool,
    pub min_row_height: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Title(String),
    /// Level 1 headings are the numbered top-level sections.
    Heading { text: String, level: u8 },
    KeyValues(Vec<KeyValue>),
    Paragraph(String),
    Table(TableSpec),
    GroupedTable(GroupedTableSpec),
}

pub struct Document {
    pub title: String,
    pub geometry: PageGeometry,
    pub blocks: Vec<Block>,
}

impl Document {
    /// Every image URL referenced by a table cell, in document order, deduplicated.
    pub fn image_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        let rows = self.blocks.iter().flat_map(|block| -> Vec<&Row> {
            match block {
                Block::Table(t) => t.rows.iter().collect(),
                Block::GroupedTable(g) => g.groups.iter().flat_map(|grp| grp.rows.iter()).collect(),
                _ => Vec::new(),
            }
        });
        for row in rows {
            for cell in row {
                if let Cell::Image(ImageCell::Url(url)) = cell
                    && !urls.contains(url)
                {
                    urls.push(url.clone());
                }
            }
        }
        urls
    }
}

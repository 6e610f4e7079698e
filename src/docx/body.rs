//! WordprocessingML for the shared block list.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::Error;
use crate::images::{ImageFormat, ImageStore};
use crate::model::{
    Alignment, Block, Cell, ColumnKind, ColumnSpec, ColumnWidth, FontWeight, GroupedTableSpec,
    ImageCell, KeyValue, LabelColumn, TableSpec,
};
use crate::pdf::{ABSENT_TEXT, IMAGE_ERROR_TEXT, split_parenthetical};

/// Points to EMU (drawing extents).
const EMU_PER_PT: f32 = 12700.0;
const TWIPS_PER_PT: f32 = 20.0;
const HEADER_SHADING: &str = "D9D9D9";
/// Right-hand edge of the key column in key/value blocks, as a share of the text width.
const KEY_COLUMN_RATIO: f32 = 0.35;

pub(super) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Clone, Copy)]
struct RunStyle {
    bold: bool,
    size: f32,
}

const BODY: RunStyle = RunStyle {
    bold: false,
    size: 9.0,
};
const BODY_BOLD: RunStyle = RunStyle {
    bold: true,
    size: 9.0,
};

fn run(text: &str, style: RunStyle) -> String {
    let mut out = String::from("<w:r><w:rPr>");
    if style.bold {
        out.push_str("<w:b/>");
    }
    let half_points = (style.size * 2.0).round() as u32;
    let _ = write!(out, "<w:sz w:val=\"{half_points}\"/><w:szCs w:val=\"{half_points}\"/></w:rPr>");
    for (i, segment) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        let _ = write!(out, "<w:t xml:space=\"preserve\">{}</w:t>", escape(segment));
    }
    out.push_str("</w:r>");
    out
}

fn jc(align: Alignment) -> &'static str {
    match align {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
    }
}

fn paragraph(runs: &str, align: Alignment, keep_next: bool, space_after_pt: f32) -> String {
    let keep = if keep_next { "<w:keepNext/>" } else { "" };
    format!(
        "<w:p><w:pPr>{keep}<w:spacing w:before=\"0\" w:after=\"{}\"/><w:jc w:val=\"{}\"/></w:pPr>{runs}</w:p>",
        (space_after_pt * TWIPS_PER_PT).round() as u32,
        jc(align),
    )
}

fn twips(width: ColumnWidth, table_twips: u32) -> u32 {
    match width {
        ColumnWidth::Points(pt) => (pt * TWIPS_PER_PT).round() as u32,
        ColumnWidth::Percent(pct) => (table_twips as f32 * pct / 100.0).round() as u32,
    }
}

struct MediaPart {
    rel_id: String,
    file_name: String,
}

/// Accumulates `word/document.xml` body content and the media it references.
pub(super) struct BodyWriter<'a> {
    images: &'a ImageStore,
    text_twips: u32,
    pub(super) xml: String,
    media: BTreeMap<String, MediaPart>,
    next_drawing_id: u32,
}

/// Media to store in the package: `(rel_id, file_name, bytes)`.
pub(super) type MediaEntry<'a> = (String, String, &'a [u8]);

impl<'a> BodyWriter<'a> {
    pub(super) fn new(images: &'a ImageStore, text_twips: u32) -> Self {
        Self {
            images,
            text_twips,
            xml: String::new(),
            media: BTreeMap::new(),
            next_drawing_id: 1,
        }
    }

    pub(super) fn media(&self) -> Vec<MediaEntry<'a>> {
        let images = self.images;
        self.media
            .iter()
            .filter_map(|(url, part)| {
                images
                    .get(url)
                    .map(|img| (part.rel_id.clone(), part.file_name.clone(), img.data.as_slice()))
            })
            .collect()
    }

    pub(super) fn write_block(&mut self, block: &Block) -> Result<(), Error> {
        match block {
            Block::Title(text) => {
                let r = run(text, RunStyle { bold: true, size: 12.0 });
                self.xml.push_str(&paragraph(&r, Alignment::Center, false, 14.0));
            }
            Block::Heading { text, level } => {
                let size = if *level <= 1 { 10.0 } else { 9.0 };
                let r = run(text, RunStyle { bold: true, size });
                self.xml.push_str(&paragraph(&r, Alignment::Left, true, 6.0));
            }
            Block::Paragraph(text) => {
                self.xml.push_str(&paragraph(&run(text, BODY), Alignment::Left, false, 8.0));
            }
            Block::KeyValues(pairs) => self.write_key_values(pairs),
            Block::Table(spec) => self.write_table(spec)?,
            Block::GroupedTable(spec) => self.write_grouped_table(spec)?,
        }
        Ok(())
    }

    fn write_key_values(&mut self, pairs: &[KeyValue]) {
        let key_w = (self.text_twips as f32 * KEY_COLUMN_RATIO).round() as u32;
        let colon_w = 200;
        let value_w = self.text_twips.saturating_sub(key_w + colon_w);
        let _ = write!(
            self.xml,
            "<w:tbl><w:tblPr><w:tblW w:w=\"{}\" w:type=\"dxa\"/><w:tblLayout w:type=\"fixed\"/>\
             <w:tblBorders><w:top w:val=\"nil\"/><w:left w:val=\"nil\"/><w:bottom w:val=\"nil\"/>\
             <w:right w:val=\"nil\"/><w:insideH w:val=\"nil\"/><w:insideV w:val=\"nil\"/></w:tblBorders>\
             </w:tblPr><w:tblGrid><w:gridCol w:w=\"{key_w}\"/><w:gridCol w:w=\"{colon_w}\"/>\
             <w:gridCol w:w=\"{value_w}\"/></w:tblGrid>",
            self.text_twips
        );
        for pair in pairs {
            self.xml.push_str("<w:tr>");
            self.push_cell(key_w, "", &paragraph(&run(&pair.label, BODY_BOLD), Alignment::Left, false, 0.0));
            self.push_cell(colon_w, "", &paragraph(&run(":", BODY_BOLD), Alignment::Left, false, 0.0));
            self.push_cell(value_w, "", &paragraph(&run(&pair.value, BODY), Alignment::Left, false, 0.0));
            self.xml.push_str("</w:tr>");
        }
        self.xml.push_str("</w:tbl>");
        self.xml.push_str(&paragraph("", Alignment::Left, false, 4.0));
    }

    fn push_cell(&mut self, width: u32, extra_props: &str, content: &str) {
        let _ = write!(
            self.xml,
            "<w:tc><w:tcPr><w:tcW w:w=\"{width}\" w:type=\"dxa\"/>{extra_props}<w:vAlign w:val=\"center\"/></w:tcPr>{content}</w:tc>"
        );
    }

    fn table_open(&mut self, grid: &[u32], bottom_border: bool) {
        let total: u32 = grid.iter().sum();
        let bottom = if bottom_border {
            "<w:bottom w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>"
        } else {
            "<w:bottom w:val=\"nil\"/>"
        };
        let _ = write!(
            self.xml,
            "<w:tbl><w:tblPr><w:tblW w:w=\"{total}\" w:type=\"dxa\"/><w:tblLayout w:type=\"fixed\"/>\
             <w:tblBorders><w:top w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>\
             <w:left w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>{bottom}\
             <w:right w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>\
             <w:insideH w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>\
             <w:insideV w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/></w:tblBorders>\
             <w:tblCellMar><w:left w:w=\"80\" w:type=\"dxa\"/><w:right w:w=\"80\" w:type=\"dxa\"/></w:tblCellMar>\
             </w:tblPr><w:tblGrid>"
        );
        for w in grid {
            let _ = write!(self.xml, "<w:gridCol w:w=\"{w}\"/>");
        }
        self.xml.push_str("</w:tblGrid>");
    }

    fn table_close(&mut self, spacing: bool) {
        self.xml.push_str("</w:tbl>");
        // A paragraph must separate tables; a zero-height one keeps chained tables flush.
        let after = if spacing { 8.0 } else { 0.0 };
        self.xml.push_str(&format!(
            "<w:p><w:pPr><w:spacing w:before=\"0\" w:after=\"{}\" w:line=\"20\" w:lineRule=\"exact\"/></w:pPr></w:p>",
            (after * TWIPS_PER_PT) as u32
        ));
    }

    fn widths(&self, label: Option<&LabelColumn>, columns: &[ColumnSpec]) -> Result<(u32, u32, Vec<u32>), Error> {
        let label_w = label.map_or(0, |l| twips(l.width, self.text_twips));
        let colon_w = label.and_then(|l| l.colon).map_or(0, |c| twips(c, self.text_twips));
        let data: Vec<u32> = columns.iter().map(|c| twips(c.width, self.text_twips)).collect();
        let total = label_w + colon_w + data.iter().sum::<u32>();
        // Rounding may add a twip per column.
        if total > self.text_twips + columns.len() as u32 + 2 {
            return Err(Error::InvalidGeometry(format!(
                "table columns need {total} twips but only {} are usable",
                self.text_twips
            )));
        }
        Ok((label_w, colon_w, data))
    }

    fn label_cells(&mut self, label: &LabelColumn, label_w: u32, colon_w: u32, restart: bool) {
        let merge = if restart {
            "<w:vMerge w:val=\"restart\"/>"
        } else {
            "<w:vMerge/>"
        };
        let (text, colon) = if restart {
            (
                paragraph(&run(&label.text, BODY_BOLD), Alignment::Center, false, 0.0),
                paragraph(&run(":", BODY_BOLD), Alignment::Center, false, 0.0),
            )
        } else {
            (
                paragraph("", Alignment::Left, false, 0.0),
                paragraph("", Alignment::Left, false, 0.0),
            )
        };
        self.push_cell(label_w, merge, &text);
        if colon_w > 0 {
            self.push_cell(colon_w, merge, &colon);
        }
    }

    fn header_cells(&mut self, columns: &[ColumnSpec], widths: &[u32]) {
        let shading = format!("<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{HEADER_SHADING}\"/>");
        for (column, &w) in columns.iter().zip(widths) {
            let r = run(&column.header.to_uppercase(), RunStyle { bold: true, size: 8.0 });
            self.push_cell(w, &shading, &paragraph(&r, Alignment::Center, false, 0.0));
        }
    }

    fn data_cells(&mut self, row: &[Cell], columns: &[ColumnSpec], widths: &[u32]) {
        for (i, (column, &w)) in columns.iter().zip(widths).enumerate() {
            let content = self.cell_paragraph(row.get(i), column);
            self.push_cell(w, "", &content);
        }
    }

    fn row_open(&mut self, min_height_pt: f32, repeat_header: bool) {
        let header = if repeat_header { "<w:tblHeader/>" } else { "" };
        let _ = write!(
            self.xml,
            "<w:tr><w:trPr><w:cantSplit/>{header}<w:trHeight w:val=\"{}\" w:hRule=\"atLeast\"/></w:trPr>",
            (min_height_pt * TWIPS_PER_PT).round() as u32
        );
    }

    fn write_table(&mut self, spec: &TableSpec) -> Result<(), Error> {
        let (label_w, colon_w, data) = self.widths(spec.label.as_ref(), &spec.columns)?;
        let mut grid = Vec::new();
        if let Some(label) = &spec.label {
            grid.push(label_w);
            if label.colon.is_some() {
                grid.push(colon_w);
            }
        }
        grid.extend(&data);
        self.table_open(&grid, !spec.suppress_bottom_border);

        self.row_open(crate::pdf::HEADER_MIN_HEIGHT, true);
        if let Some(label) = &spec.label {
            self.label_cells(label, label_w, colon_w, true);
        }
        self.header_cells(&spec.columns, &data);
        self.xml.push_str("</w:tr>");

        for row in &spec.rows {
            self.row_open(spec.min_row_height, false);
            if let Some(label) = &spec.label {
                self.label_cells(label, label_w, colon_w, false);
            }
            self.data_cells(row, &spec.columns, &data);
            self.xml.push_str("</w:tr>");
        }
        self.table_close(!spec.suppress_bottom_spacing);
        Ok(())
    }

    fn write_grouped_table(&mut self, spec: &GroupedTableSpec) -> Result<(), Error> {
        let (label_w, colon_w, data) = self.widths(Some(&spec.label), &spec.columns)?;
        let mut grid = vec![label_w];
        if spec.label.colon.is_some() {
            grid.push(colon_w);
        }
        grid.extend(&data);
        self.table_open(&grid, true);

        let data_total: u32 = data.iter().sum();
        let mut first = true;
        for group in &spec.groups {
            self.row_open(spec.min_row_height, false);
            self.label_cells(&spec.label, label_w, colon_w, first);
            first = false;
            let span = format!("<w:gridSpan w:val=\"{}\"/>", data.len().max(1));
            let title = paragraph(&run(&group.title, BODY_BOLD), Alignment::Left, false, 0.0);
            self.push_cell(data_total, &span, &title);
            self.xml.push_str("</w:tr>");

            self.row_open(crate::pdf::HEADER_MIN_HEIGHT, false);
            self.label_cells(&spec.label, label_w, colon_w, false);
            self.header_cells(&spec.columns, &data);
            self.xml.push_str("</w:tr>");

            for row in &group.rows {
                self.row_open(spec.min_row_height, false);
                self.label_cells(&spec.label, label_w, colon_w, false);
                self.data_cells(row, &spec.columns, &data);
                self.xml.push_str("</w:tr>");
            }
        }
        self.table_close(true);
        Ok(())
    }

    fn cell_paragraph(&mut self, cell: Option<&Cell>, column: &ColumnSpec) -> String {
        let align = match column.kind {
            ColumnKind::Name => Alignment::Left,
            _ => column.align,
        };
        let runs = match (cell, &column.kind) {
            (None, _) | (Some(Cell::Image(ImageCell::Missing)), _) => String::new(),
            (Some(Cell::Image(ImageCell::Absent)), _) => run(ABSENT_TEXT, BODY_BOLD),
            (Some(Cell::Image(ImageCell::Url(url))), kind) => {
                let (slot_w, slot_h) = match kind {
                    ColumnKind::Image { width, height } => (*width, *height),
                    _ => (60.0, 19.0),
                };
                self.drawing(url, slot_w, slot_h)
            }
            (Some(Cell::Text(text)), ColumnKind::Name) => match split_parenthetical(text) {
                Some((primary, suffix)) => {
                    run(&primary.to_uppercase(), BODY_BOLD) + &run(suffix, BODY)
                }
                None => run(&text.trim().to_uppercase(), BODY_BOLD),
            },
            (Some(Cell::Text(text)), ColumnKind::Text(FontWeight::Bold)) => run(text, BODY_BOLD),
            (Some(Cell::Text(text)), _) => run(text, BODY),
            (Some(Cell::Rich { bold, regular }), _) => run(bold, BODY_BOLD) + &run(regular, BODY),
        };
        paragraph(&runs, align, false, 0.0)
    }

    /// Inline picture run for `url`, or the error placeholder when it never loaded.
    fn drawing(&mut self, url: &str, slot_w: f32, slot_h: f32) -> String {
        let images = self.images;
        let Some(image) = images.get(url) else {
            return run(IMAGE_ERROR_TEXT, RunStyle { bold: false, size: 6.0 });
        };
        let (w, h) = image.fit_within(slot_w, slot_h);
        let next_index = self.media.len() + 1;
        let part = self.media.entry(url.to_string()).or_insert_with(|| {
            let ext = match image.format {
                ImageFormat::Jpeg => "jpeg",
                ImageFormat::Png => "png",
            };
            MediaPart {
                rel_id: format!("rIdImg{next_index}"),
                file_name: format!("image{next_index}.{ext}"),
            }
        });
        let rel_id = part.rel_id.clone();
        let id = self.next_drawing_id;
        self.next_drawing_id += 1;
        let cx = (w * EMU_PER_PT).round() as u64;
        let cy = (h * EMU_PER_PT).round() as u64;
        format!(
            "<w:r><w:drawing><wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
             <wp:extent cx=\"{cx}\" cy=\"{cy}\"/><wp:docPr id=\"{id}\" name=\"Picture {id}\"/>\
             <a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
             <a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
             <pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
             <pic:nvPicPr><pic:cNvPr id=\"{id}\" name=\"Picture {id}\"/><pic:cNvPicPr/></pic:nvPicPr>\
             <pic:blipFill><a:blip r:embed=\"{rel_id}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
             <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
             <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>\
             </a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"
        )
    }
}

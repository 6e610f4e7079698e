use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Name, Pdf, Rect, Ref, Str};
use ttf_parser::Face;

use crate::config::FontConfig;
use crate::error::Error;
use crate::model::{FontWeight, TextStyle};

/// Helvetica AFM advance widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold AFM advance widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Unicode blocks measured up front for TrueType faces.
const MEASURED_RANGES: [(u32, u32); 4] = [
    (0x0020, 0x024F),
    (0x2000, 0x206F),
    (0x20A0, 0x20CF),
    (0x2100, 0x214F),
];

pub(crate) enum FaceSource {
    /// One of the standard 14 PDF fonts, referenced by base name.
    Standard(&'static str),
    TrueType {
        data: Vec<u8>,
        face_index: u32,
        name: String,
    },
}

/// Immutable metrics of one face. Measuring never touches a document.
pub struct FontFace {
    pub(crate) source: FaceSource,
    widths_1000: Vec<f32>,
    char_widths_1000: Option<HashMap<char, f32>>,
    fallback_width_1000: f32,
    ascender_ratio: f32,
    line_h_ratio: f32,
}

/// Approximate widths for WinAnsi bytes 127..=255, which the form rarely uses.
fn winansi_upper_half(b: u8) -> f32 {
    match b {
        0xA0 => 278.0,
        0x85 | 0x89 => 1000.0,
        0x91 | 0x92 | 0x82 => 222.0,
        0x95 => 350.0,
        0x96 => 556.0,
        0x97 => 1000.0,
        _ => 556.0,
    }
}

fn standard_widths(ascii: &[u16; 95]) -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| {
            if b <= 126 {
                ascii[(b - 32) as usize] as f32
            } else {
                winansi_upper_half(b)
            }
        })
        .collect()
}

impl FontFace {
    pub fn helvetica() -> Self {
        Self {
            source: FaceSource::Standard("Helvetica"),
            widths_1000: standard_widths(&HELVETICA_ASCII),
            char_widths_1000: None,
            fallback_width_1000: 556.0,
            ascender_ratio: 0.718,
            line_h_ratio: 1.156,
        }
    }

    pub fn helvetica_bold() -> Self {
        Self {
            source: FaceSource::Standard("Helvetica-Bold"),
            widths_1000: standard_widths(&HELVETICA_BOLD_ASCII),
            char_widths_1000: None,
            fallback_width_1000: 611.0,
            ascender_ratio: 0.718,
            line_h_ratio: 1.156,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", e, path.display()),
            ))
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("EmbeddedFont")
            .to_string();
        Self::from_bytes(data, 0, name)
    }

    pub fn from_bytes(data: Vec<u8>, face_index: u32, name: String) -> Result<Self, Error> {
        let face = Face::parse(&data, face_index)
            .map_err(|e| Error::Font(format!("cannot parse {name}: {e}")))?;
        let scale = 1000.0 / face.units_per_em() as f32;
        let advance = |ch: char| {
            let gid = face.glyph_index(ch)?;
            Some(face.glyph_hor_advance(gid)? as f32 * scale)
        };

        let widths_1000 = (32u8..=255u8)
            .map(|byte| advance(winansi_to_char(byte)).unwrap_or(0.0))
            .collect();
        let char_widths_1000 = MEASURED_RANGES
            .iter()
            .flat_map(|&(start, end)| (start..=end).filter_map(char::from_u32))
            .filter_map(|ch| Some((ch, advance(ch)?)))
            .collect();
        let fallback_width_1000 = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .map_or(500.0, |adv| adv as f32 * scale);

        let em = 1000.0 / scale;
        let ascender = face.ascender() as f32;
        let extent = ascender - face.descender() as f32 + face.line_gap() as f32;

        Ok(Self {
            source: FaceSource::TrueType {
                data,
                face_index,
                name,
            },
            widths_1000,
            char_widths_1000: Some(char_widths_1000),
            fallback_width_1000,
            ascender_ratio: ascender / em,
            line_h_ratio: extent / em,
        })
    }

    /// Width of a single character in 1000-units. TrueType faces use the
    /// per-char table; standard faces go through WinAnsi.
    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        if let Some(ref map) = self.char_widths_1000 {
            if let Some(&w) = map.get(&ch) {
                return w;
            }
            return self.fallback_width_1000;
        }
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            self.widths_1000[(byte - 32) as usize]
        } else {
            self.fallback_width_1000
        }
    }

    pub(crate) fn word_width(&self, word: &str, font_size: f32) -> f32 {
        word.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }
}

/// The text-measurement primitive used by every sizing decision.
pub struct TextMetrics {
    regular: FontFace,
    bold: FontFace,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self::standard()
    }
}

impl TextMetrics {
    pub fn standard() -> Self {
        Self {
            regular: FontFace::helvetica(),
            bold: FontFace::helvetica_bold(),
        }
    }

    pub fn new(regular: FontFace, bold: FontFace) -> Self {
        Self { regular, bold }
    }

    /// Configured TrueType faces where given, Helvetica otherwise.
    pub fn from_config(config: &FontConfig) -> Result<Self, Error> {
        let regular = match &config.regular {
            Some(path) => FontFace::from_file(path)?,
            None => FontFace::helvetica(),
        };
        let bold = match &config.bold {
            Some(path) => FontFace::from_file(path)?,
            None => FontFace::helvetica_bold(),
        };
        Ok(Self { regular, bold })
    }

    pub fn face(&self, weight: FontWeight) -> &FontFace {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }

    pub fn width_of(&self, text: &str, style: TextStyle) -> f32 {
        self.face(style.weight).word_width(text, style.size)
    }

    pub fn line_height(&self, style: TextStyle) -> f32 {
        style.size * self.face(style.weight).line_h_ratio
    }

    /// Distance from the top of a line box to its baseline.
    pub fn ascent(&self, style: TextStyle) -> f32 {
        let face = self.face(style.weight);
        let half_leading = (face.line_h_ratio - 1.0).max(0.0) * style.size / 2.0;
        half_leading + style.size * face.ascender_ratio
    }

    /// Height of `text` wrapped to `width`.
    pub fn height_of_wrapped(&self, text: &str, width: f32, style: TextStyle) -> f32 {
        let runs = [crate::pdf::layout::StyledRun::new(text, style)];
        let lines = crate::pdf::layout::build_lines(&runs, self, width);
        crate::pdf::layout::lines_height(&lines, self)
    }
}

/// WinAnsi bytes in 0x80..=0x9F that do not map to the same code point.
#[rustfmt::skip]
const WINANSI_REMAPPED: [(u8, char); 27] = [
    (0x80, '\u{20AC}'), (0x82, '\u{201A}'), (0x83, '\u{0192}'), (0x84, '\u{201E}'),
    (0x85, '\u{2026}'), (0x86, '\u{2020}'), (0x87, '\u{2021}'), (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'), (0x8A, '\u{0160}'), (0x8B, '\u{2039}'), (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'), (0x91, '\u{2018}'), (0x92, '\u{2019}'), (0x93, '\u{201C}'),
    (0x94, '\u{201D}'), (0x95, '\u{2022}'), (0x96, '\u{2013}'), (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'), (0x99, '\u{2122}'), (0x9A, '\u{0161}'), (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'), (0x9E, '\u{017E}'), (0x9F, '\u{0178}'),
];

fn winansi_to_char(byte: u8) -> char {
    WINANSI_REMAPPED
        .iter()
        .find(|&&(b, _)| b == byte)
        .map_or(byte as char, |&(_, ch)| ch)
}

/// WinAnsi byte for `c`, or 0 when the code page has no such character.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F | 0x00A0..=0x00FF => c as u8,
        _ => WINANSI_REMAPPED
            .iter()
            .find(|&&(_, ch)| ch == c)
            .map_or(0, |&(b, _)| b),
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes; unmappable chars are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(char_to_winansi)
        .filter(|&b| b >= 32)
        .collect()
}

/// Encode UTF-8 text as big-endian 2-byte glyph IDs for CIDFont content streams.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &BTreeMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.push((gid >> 8) as u8);
        out.push((gid & 0xFF) as u8);
    }
    out
}

/// A face as registered in one PDF file.
pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    char_to_gid: Option<BTreeMap<char, u16>>,
}

impl FontEntry {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

/// Glyphs of one face renumbered densely for the embedded subset.
struct GlyphSubset {
    char_to_gid: BTreeMap<char, u16>,
    /// Advance widths in 1000-units, ascending by subset glyph id.
    widths: Vec<(u16, f32)>,
    data: Vec<u8>,
}

impl GlyphSubset {
    fn build(face: &Face, font_data: &[u8], face_index: u32, name: &str, used: &BTreeSet<char>) -> Self {
        let scale = 1000.0 / face.units_per_em() as f32;
        let mut remapper = subsetter::GlyphRemapper::new();
        let mut char_to_gid = BTreeMap::new();
        let mut widths = Vec::new();
        // BTreeSet order keeps the numbering identical between runs.
        for &ch in used {
            let Some(gid) = face.glyph_index(ch) else {
                continue;
            };
            let new_gid = remapper.remap(gid.0);
            char_to_gid.insert(ch, new_gid);
            let advance = face.glyph_hor_advance(gid).unwrap_or(0);
            widths.push((new_gid, advance as f32 * scale));
        }
        widths.sort_by_key(|&(gid, _)| gid);
        widths.dedup_by_key(|&mut (gid, _)| gid);

        let data = subsetter::subset(font_data, face_index, &remapper).unwrap_or_else(|e| {
            log::warn!("cannot subset {name} ({e}), embedding the whole face");
            font_data.to_vec()
        });
        Self {
            char_to_gid,
            widths,
            data,
        }
    }

    /// Widths grouped into runs of consecutive glyph ids.
    fn width_runs(&self) -> Vec<(u16, Vec<f32>)> {
        let mut runs: Vec<(u16, Vec<f32>)> = Vec::new();
        for &(gid, width) in &self.widths {
            match runs.last_mut() {
                Some((start, ws)) if usize::from(*start) + ws.len() == usize::from(gid) => ws.push(width),
                _ => runs.push((gid, vec![width])),
            }
        }
        runs
    }
}

fn identity_system_info() -> SystemInfo<'static> {
    SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    }
}

/// PostScript-safe base font name.
fn base_font_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// Write a TrueType face as a Type0 font over a CIDFontType2 descendant
/// with Identity-H encoding, embedding only the glyphs in `used_chars`.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    name: &str,
    font_data: &[u8],
    face_index: u32,
    used_chars: &BTreeSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Result<BTreeMap<char, u16>, Error> {
    let face = Face::parse(font_data, face_index)
        .map_err(|e| Error::Font(format!("cannot parse {name}: {e}")))?;
    let subset = GlyphSubset::build(&face, font_data, face_index, name, used_chars);
    let base_font = base_font_name(name);
    let scale = 1000.0 / face.units_per_em() as f32;

    let file_ref = alloc();
    let length1 = i32::try_from(subset.data.len())
        .map_err(|_| Error::Font(format!("{name} is too large to embed")))?;
    pdf.stream(file_ref, &subset.data)
        .pair(Name(b"Length1"), length1);

    let descriptor_ref = alloc();
    let bbox = face.global_bounding_box();
    pdf.font_descriptor(descriptor_ref)
        .name(Name(base_font.as_bytes()))
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(
            bbox.x_min as f32 * scale,
            bbox.y_min as f32 * scale,
            bbox.x_max as f32 * scale,
            bbox.y_max as f32 * scale,
        ))
        .italic_angle(0.0)
        .ascent(face.ascender() as f32 * scale)
        .descent(face.descender() as f32 * scale)
        .cap_height(face.capital_height().map_or(700.0, |h| h as f32 * scale))
        .stem_v(80.0)
        .font_file2(file_ref);

    let cid_ref = alloc();
    {
        let mut cid = pdf.cid_font(cid_ref);
        cid.subtype(CidFontType::Type2)
            .base_font(Name(base_font.as_bytes()))
            .system_info(identity_system_info())
            .font_descriptor(descriptor_ref)
            .default_width(0.0)
            .cid_to_gid_map_predefined(Name(b"Identity"));
        let runs = subset.width_runs();
        if !runs.is_empty() {
            let mut widths = cid.widths();
            for (start, ws) in runs {
                widths.consecutive(start, ws);
            }
        }
    }

    let cmap_ref = alloc();
    let cmap_name = format!("{base_font}-UTF16");
    let mut cmap = UnicodeCmap::new(Name(cmap_name.as_bytes()), identity_system_info());
    for (&ch, &gid) in &subset.char_to_gid {
        cmap.pair(gid, ch);
    }
    pdf.stream(cmap_ref, cmap.finish().as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(base_font.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_ref)
        .to_unicode(cmap_ref);

    log::debug!(
        "embedded {base_font}: {} glyphs, {} bytes",
        subset.char_to_gid.len(),
        subset.data.len()
    );
    Ok(subset.char_to_gid)
}

pub(crate) fn register_font(
    pdf: &mut Pdf,
    face: &FontFace,
    pdf_name: String,
    alloc: &mut impl FnMut() -> Ref,
    used_chars: &BTreeSet<char>,
) -> Result<FontEntry, Error> {
    let t0 = std::time::Instant::now();
    let font_ref = alloc();

    let char_to_gid = match &face.source {
        FaceSource::Standard(base) => {
            pdf.type1_font(font_ref)
                .base_font(Name(base.as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
            None
        }
        FaceSource::TrueType {
            data,
            face_index,
            name,
        } => Some(embed_truetype(
            pdf,
            font_ref,
            name,
            data,
            *face_index,
            used_chars,
            alloc,
        )?),
    };

    log::debug!(
        "register_font: {pdf_name} ({} chars) → {:.1}ms",
        used_chars.len(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );

    Ok(FontEntry {
        pdf_name,
        font_ref,
        char_to_gid,
    })
}

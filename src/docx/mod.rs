//! DOCX output: a minimal OOXML package built from the same block list as the PDF.

mod body;

use std::io::Write;

use chrono::NaiveDateTime;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::Error;
use crate::images::ImageStore;
use crate::model::Document;
use crate::pdf::generated_on;

use body::{BodyWriter, escape};

/// Folio page in twips, with the form's margins.
pub const PAGE_WIDTH_TWIPS: u32 = 12240;
pub const PAGE_HEIGHT_TWIPS: u32 = 18720;
pub const MARGIN_TOP_TWIPS: u32 = 1134;
pub const MARGIN_LEFT_TWIPS: u32 = 1134;
pub const MARGIN_BOTTOM_TWIPS: u32 = 1418;
pub const MARGIN_RIGHT_TWIPS: u32 = 1021;

const FOOTER_REL_ID: &str = "rIdFooter1";

const NS: &str = "xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
                  xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
                  xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\"";

fn content_types() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
     <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
     <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
     <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
     <Default Extension=\"png\" ContentType=\"image/png\"/>\
     <Default Extension=\"jpeg\" ContentType=\"image/jpeg\"/>\
     <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
     <Override PartName=\"/word/footer1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml\"/>\
     </Types>"
        .to_string()
}

fn package_rels() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
     <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
     <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
     </Relationships>"
        .to_string()
}

fn document_rels(media: &[body::MediaEntry<'_>]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    out.push_str(&format!(
        "<Relationship Id=\"{FOOTER_REL_ID}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer\" Target=\"footer1.xml\"/>"
    ));
    for (rel_id, file_name, _) in media {
        out.push_str(&format!(
            "<Relationship Id=\"{rel_id}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" Target=\"media/{file_name}\"/>"
        ));
    }
    out.push_str("</Relationships>");
    out
}

fn field(instruction: &str, placeholder: &str) -> String {
    format!(
        "<w:r><w:rPr><w:sz w:val=\"16\"/></w:rPr><w:fldChar w:fldCharType=\"begin\"/></w:r>\
         <w:r><w:rPr><w:sz w:val=\"16\"/></w:rPr><w:instrText xml:space=\"preserve\"> {instruction} </w:instrText></w:r>\
         <w:r><w:rPr><w:sz w:val=\"16\"/></w:rPr><w:fldChar w:fldCharType=\"separate\"/></w:r>\
         <w:r><w:rPr><w:sz w:val=\"16\"/></w:rPr><w:t>{placeholder}</w:t></w:r>\
         <w:r><w:rPr><w:sz w:val=\"16\"/></w:rPr><w:fldChar w:fldCharType=\"end\"/></w:r>"
    )
}

/// Left "Generated on …", right-aligned "Page N of M" via PAGE/NUMPAGES fields.
fn footer_xml(generated_at: NaiveDateTime) -> String {
    let text_width = PAGE_WIDTH_TWIPS - MARGIN_LEFT_TWIPS - MARGIN_RIGHT_TWIPS;
    let text = |s: &str| {
        format!(
            "<w:r><w:rPr><w:sz w:val=\"16\"/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r>",
            escape(s)
        )
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:ftr {NS}><w:p><w:pPr><w:tabs><w:tab w:val=\"right\" w:pos=\"{text_width}\"/></w:tabs></w:pPr>\
         {}<w:r><w:tab/></w:r>{}{}{}{}</w:p></w:ftr>",
        text(&generated_on(generated_at)),
        text("Page "),
        field("PAGE", "1"),
        text(" of "),
        field("NUMPAGES", "1"),
    )
}

fn document_xml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document {NS}><w:body>{body}\
         <w:sectPr><w:footerReference w:type=\"default\" r:id=\"{FOOTER_REL_ID}\"/>\
         <w:pgSz w:w=\"{PAGE_WIDTH_TWIPS}\" w:h=\"{PAGE_HEIGHT_TWIPS}\"/>\
         <w:pgMar w:top=\"{MARGIN_TOP_TWIPS}\" w:right=\"{MARGIN_RIGHT_TWIPS}\" w:bottom=\"{MARGIN_BOTTOM_TWIPS}\" \
         w:left=\"{MARGIN_LEFT_TWIPS}\" w:header=\"567\" w:footer=\"567\" w:gutter=\"0\"/>\
         </w:sectPr></w:body></w:document>"
    )
}

/// Serialize `doc` as a .docx package. Zip timestamps are fixed so equal
/// input gives equal bytes.
pub fn render(doc: &Document, images: &ImageStore, generated_at: NaiveDateTime) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let text_twips = PAGE_WIDTH_TWIPS - MARGIN_LEFT_TWIPS - MARGIN_RIGHT_TWIPS;
    let mut body = BodyWriter::new(images, text_twips);
    for block in &doc.blocks {
        body.write_block(block)?;
    }
    let media = body.media();

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));

    let parts: [(&str, String); 5] = [
        ("[Content_Types].xml", content_types()),
        ("_rels/.rels", package_rels()),
        ("word/_rels/document.xml.rels", document_rels(&media)),
        ("word/document.xml", document_xml(&body.xml)),
        ("word/footer1.xml", footer_xml(generated_at)),
    ];
    for (name, xml) in &parts {
        zip.start_file(*name, options)?;
        zip.write_all(xml.as_bytes())?;
    }
    for (_, file_name, data) in &media {
        zip.start_file(format!("word/media/{file_name}"), options)?;
        zip.write_all(data)?;
    }

    let bytes = zip.finish()?.into_inner();
    log::info!(
        "DOCX written: {} blocks, {} images, {} bytes in {:.1}ms",
        doc.blocks.len(),
        media.len(),
        bytes.len(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(bytes)
}

mod common;

use std::io::{Cursor, Read};

use cmvr_render::compose::{SECTION_COMPLIANCE, SECTION_EXECUTIVE_SUMMARY, SECTION_WASTE};
use cmvr_render::docx::{
    MARGIN_BOTTOM_TWIPS, MARGIN_LEFT_TWIPS, MARGIN_RIGHT_TWIPS, MARGIN_TOP_TWIPS,
    PAGE_HEIGHT_TWIPS, PAGE_WIDTH_TWIPS,
};
use cmvr_render::report::{
    AttendanceReport, AttendanceStatus, Attendee, ComplianceRow, ComplianceSection,
};
use cmvr_render::CmvrReport;

const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("zip");
    let mut file = archive.by_name(name).expect(name);
    let mut xml = String::new();
    file.read_to_string(&mut xml).expect("utf-8");
    xml
}

fn texts(xml: &str) -> Vec<String> {
    let doc = roxmltree::Document::parse(xml).expect("xml");
    doc.descendants()
        .filter(|n| n.has_tag_name((W, "t")))
        .filter_map(|n| n.text().map(str::to_string))
        .collect()
}

fn report() -> CmvrReport {
    CmvrReport {
        compliance_monitoring: Some(vec![ComplianceSection {
            title: Some("ECC Conditions".into()),
            rows: vec![ComplianceRow {
                requirement: Some("Maintain siltation ponds".into()),
                complied: Some("Yes".into()),
                remarks: Some("Desilted in February".into()),
            }],
        }]),
        fund_status: Some(cmvr_render::report::FundStatus {
            rcf: Some(common::fund_entries("RCF", 2)),
            ..Default::default()
        }),
        ..CmvrReport::default()
    }
}

#[tokio::test]
async fn sections_appear_in_pdf_order() {
    let renderer = common::renderer(common::StaticImages::default());
    let bytes = renderer.cmvr_docx(&report()).await.expect("docx");
    let words = texts(&part(&bytes, "word/document.xml"));

    let position = |needle: &str| {
        words
            .iter()
            .position(|t| t == needle)
            .unwrap_or_else(|| panic!("{needle} missing"))
    };
    let summary = position(SECTION_EXECUTIVE_SUMMARY);
    let compliance = position(SECTION_COMPLIANCE);
    let waste = position(SECTION_WASTE);
    assert!(summary < compliance && compliance < waste);
    assert!(words.iter().any(|t| t == "Maintain siltation ponds"));
}

#[tokio::test]
async fn page_setup_matches_the_folio_form() {
    let renderer = common::renderer(common::StaticImages::default());
    let bytes = renderer.cmvr_docx(&report()).await.expect("docx");
    let xml = part(&bytes, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).expect("xml");

    let size = doc
        .descendants()
        .find(|n| n.has_tag_name((W, "pgSz")))
        .expect("pgSz");
    assert_eq!(size.attribute((W, "w")), Some(PAGE_WIDTH_TWIPS.to_string().as_str()));
    assert_eq!(size.attribute((W, "h")), Some(PAGE_HEIGHT_TWIPS.to_string().as_str()));

    let margins = doc
        .descendants()
        .find(|n| n.has_tag_name((W, "pgMar")))
        .expect("pgMar");
    for (attr, value) in [
        ("top", MARGIN_TOP_TWIPS),
        ("left", MARGIN_LEFT_TWIPS),
        ("bottom", MARGIN_BOTTOM_TWIPS),
        ("right", MARGIN_RIGHT_TWIPS),
    ] {
        assert_eq!(margins.attribute((W, attr)), Some(value.to_string().as_str()), "{attr}");
    }

    // Header rows repeat on every page the table spans.
    assert!(doc.descendants().any(|n| n.has_tag_name((W, "tblHeader"))));
}

#[tokio::test]
async fn footer_carries_timestamp_and_page_fields() {
    let renderer = common::renderer(common::StaticImages::default());
    let bytes = renderer.cmvr_docx(&report()).await.expect("docx");
    let footer = part(&bytes, "word/footer1.xml");

    assert!(texts(&footer).iter().any(|t| t == "Generated on March 5, 2025 2:07 PM"));
    let doc = roxmltree::Document::parse(&footer).expect("xml");
    let fields: Vec<String> = doc
        .descendants()
        .filter(|n| n.has_tag_name((W, "instrText")))
        .filter_map(|n| n.text().map(|t| t.trim().to_string()))
        .collect();
    assert_eq!(fields, ["PAGE", "NUMPAGES"]);
}

#[tokio::test]
async fn attendance_docx_embeds_images_and_markers() {
    let url = "https://files.example.test/sig.png";
    let renderer = common::renderer(common::StaticImages::default().with(url, common::png_bytes(60, 20)));
    let report = AttendanceReport {
        title: None,
        attendees: vec![
            Attendee {
                name: Some("Ana Reyes".into()),
                attendance_status: Some(AttendanceStatus::InPerson),
                signature_url: Some(url.into()),
                ..Attendee::default()
            },
            Attendee {
                name: Some("Pedro Penduko".into()),
                attendance_status: Some(AttendanceStatus::Absent),
                ..Attendee::default()
            },
        ],
        ..AttendanceReport::default()
    };
    let bytes = renderer.attendance_docx(&report).await.expect("docx");

    let words = texts(&part(&bytes, "word/document.xml"));
    assert_eq!(words.iter().filter(|t| *t == "ABSENT").count(), 2);

    let rels = part(&bytes, "word/_rels/document.xml.rels");
    assert!(rels.contains("media/image1.png"));
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).expect("zip");
    assert!(archive.by_name("word/media/image1.png").is_ok());
}

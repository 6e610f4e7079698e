mod common;

use cmvr_render::{OutputFormat, ReportKind};

fn sample_json() -> String {
    serde_json::json!({
        "generalInfo": {
            "companyName": "Sample Mining Corp.",
            "projectName": "Nickel Ore Extraction",
            "location": { "municipality": "Claver", "province": "Surigao del Norte" },
            "quarter": "Q1",
            "year": 2025
        },
        "ecc": [
            { "permitHolderName": "Sample Mining Corp. (Proponent)", "permitNumber": "ECC-R13-0001", "dateOfIssuance": "2010-04-12" }
        ],
        "fundStatus": {
            "rcf": [ { "permitHolderName": "Sample Mining Corp.", "amountDeposited": "PHP 5,000,000.00" } ],
            "mtf": []
        },
        "executiveSummary": {
            "items": [ { "label": "EPEP Commitments", "complied": true, "remarks": "On track" } ]
        },
        "wasteManagement": {
            "entries": [
                {
                    "typeOfWaste": "Used oil",
                    "specification": { "Container": "Drum", "Storage": "Hazwaste shed" },
                    "currentRecord": ["40 L", "2 filters"]
                }
            ]
        }
    })
    .to_string()
}

#[tokio::test]
async fn pdf_output_is_byte_identical_across_runs() {
    let renderer = common::renderer(common::StaticImages::default());
    let json = sample_json();
    let first = renderer
        .generate(ReportKind::Cmvr, json.as_bytes(), OutputFormat::Pdf)
        .await
        .expect("first");
    let second = renderer
        .generate(ReportKind::Cmvr, json.as_bytes(), OutputFormat::Pdf)
        .await
        .expect("second");
    assert!(first.starts_with(b"%PDF-"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn docx_output_is_byte_identical_across_runs() {
    let renderer = common::renderer(common::StaticImages::default());
    let json = sample_json();
    let first = renderer
        .generate(ReportKind::Cmvr, json.as_bytes(), OutputFormat::Docx)
        .await
        .expect("first");
    let second = renderer
        .generate(ReportKind::Cmvr, json.as_bytes(), OutputFormat::Docx)
        .await
        .expect("second");
    assert!(first.starts_with(b"PK"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn malformed_json_is_an_error() {
    let renderer = common::renderer(common::StaticImages::default());
    let result = renderer
        .generate(ReportKind::Attendance, b"{ not json", OutputFormat::Pdf)
        .await;
    assert!(matches!(result, Err(cmvr_render::Error::Json(_))));
}

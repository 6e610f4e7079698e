//! Report → [`Document`] composition. Each section composer null-checks its own
//! slice of the report; top-level headings are emitted regardless.

use crate::model::{
    Alignment, Block, Cell, ColumnKind, ColumnSpec, ColumnWidth, Document, FontWeight, FundGroup,
    GroupedTableSpec, ImageCell, KeyValue, LabelColumn, MIN_IMAGE_ROW_HEIGHT, MIN_ROW_HEIGHT,
    PageGeometry, Row, TableSpec,
};
use crate::report::{
    AttendanceReport, AttendanceStatus, Attendee, CmvrReport, FieldValue, FundEntry, FundStatus,
    PermitEntry, QualityAssessment,
};

pub const CMVR_TITLE: &str = "COMPLIANCE MONITORING AND VALIDATION REPORT";
pub const ATTENDANCE_TITLE: &str = "ATTENDANCE SHEET";
pub const FUND_STATUS_LABEL: &str = "RCF/ MTF and FMRDF Status";

pub const SECTION_EXECUTIVE_SUMMARY: &str = "I. EXECUTIVE SUMMARY OF COMPLIANCE";
pub const SECTION_PROCESS_DOCUMENTATION: &str =
    "II. PROCESS DOCUMENTATION OF ACTIVITIES UNDERTAKEN";
pub const SECTION_COMPLIANCE: &str = "III. COMPLIANCE MONITORING REPORT AND DISCUSSIONS";
pub const SECTION_AIR: &str = "IV. AIR QUALITY IMPACT ASSESSMENT";
pub const SECTION_WATER: &str = "V. WATER QUALITY IMPACT ASSESSMENT";
pub const SECTION_NOISE: &str = "VI. NOISE QUALITY IMPACT ASSESSMENT";
pub const SECTION_WASTE: &str = "VII. SOLID AND HAZARDOUS WASTE MANAGEMENT";

const LABEL_WIDTH: ColumnWidth = ColumnWidth::Percent(20.0);
const COLON_WIDTH: ColumnWidth = ColumnWidth::Percent(3.0);

/// Trimmed value, or "-" for missing/blank input.
fn or_dash(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("-")
        .to_string()
}

fn kv(label: &str, value: String) -> KeyValue {
    KeyValue {
        label: label.to_string(),
        value,
    }
}

fn heading(text: &str) -> Block {
    Block::Heading {
        text: text.to_string(),
        level: 1,
    }
}

fn subheading(text: &str) -> Block {
    Block::Heading {
        text: text.to_string(),
        level: 2,
    }
}

fn labelled(text: &str) -> LabelColumn {
    LabelColumn {
        text: text.to_string(),
        width: LABEL_WIDTH,
        colon: Some(COLON_WIDTH),
    }
}

pub fn compose_cmvr(report: &CmvrReport) -> Document {
    let mut blocks = vec![Block::Title(CMVR_TITLE.to_string())];

    if let Some(info) = &report.general_info {
        let period = match (&info.quarter, info.year) {
            (Some(q), Some(y)) if !q.trim().is_empty() => format!("{} {}", q.trim(), y),
            (Some(q), None) if !q.trim().is_empty() => q.trim().to_string(),
            (_, Some(y)) => y.to_string(),
            _ => "-".to_string(),
        };
        blocks.push(Block::KeyValues(vec![
            kv("Company Name", or_dash(&info.company_name)),
            kv("Project Name", or_dash(&info.project_name)),
            kv("Project Current Name", or_dash(&info.project_current_name)),
            kv(
                "Location",
                info.location
                    .as_ref()
                    .and_then(|l| l.display())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            kv("Project Area", or_dash(&info.project_area)),
            kv("Type of Project", or_dash(&info.type_of_project)),
            kv("Quarter / Year", period),
            kv(
                "Date of Compliance Monitoring and Validation",
                or_dash(&info.date_of_compliance_monitoring),
            ),
            kv("Monitoring Period Covered", or_dash(&info.monitoring_period)),
            kv("Date of CMR Submission", or_dash(&info.date_of_cmr_submission)),
        ]));
    }

    let mut chained: Vec<Block> = Vec::new();
    for (label, number_header, entries) in [
        ("ECC", "ECC Number", &report.ecc),
        ("ISAG/MPP", "ISAG/MPP Number", &report.isag),
        ("EPEP", "EPEP Number", &report.epep),
    ] {
        if let Some(entries) = entries {
            chained.push(Block::Table(permit_table(label, number_header, entries)));
        }
    }
    if let Some(funds) = &report.fund_status
        && let Some(grouped) = fund_status_table(funds)
    {
        chained.push(Block::GroupedTable(grouped));
    }
    connect_chain(&mut chained);
    blocks.extend(chained);

    blocks.push(heading(SECTION_EXECUTIVE_SUMMARY));
    if let Some(summary) = &report.executive_summary {
        if !summary.items.is_empty() {
            let rows = summary
                .items
                .iter()
                .map(|item| {
                    vec![
                        Cell::text(or_dash(&item.label)),
                        Cell::text(match item.complied {
                            Some(true) => "Yes",
                            Some(false) => "No",
                            None => "-",
                        }),
                        Cell::text(or_dash(&item.remarks)),
                    ]
                })
                .collect();
            blocks.push(Block::Table(TableSpec::new(
                vec![
                    ColumnSpec::text("Compliance Item", ColumnWidth::Percent(50.0))
                        .aligned(Alignment::Left),
                    ColumnSpec::text("Complied", ColumnWidth::Percent(15.0)),
                    ColumnSpec::text("Remarks", ColumnWidth::Percent(35.0)),
                ],
                rows,
            )));
        }
        if let Some(others) = summary.others.as_deref().filter(|s| !s.trim().is_empty()) {
            blocks.push(Block::KeyValues(vec![kv("Others", others.trim().to_string())]));
        }
    }

    blocks.push(heading(SECTION_PROCESS_DOCUMENTATION));
    if let Some(process) = &report.process_documentation {
        blocks.push(Block::KeyValues(vec![
            kv("Date Conducted", or_dash(&process.date_conducted)),
            kv("Methodology", or_dash(&process.methodology)),
        ]));
        if !process.activities.is_empty() {
            let rows = process
                .activities
                .iter()
                .map(|a| {
                    let members = if a.mmt_members_involved.is_empty() {
                        "-".to_string()
                    } else {
                        a.mmt_members_involved.join("\n")
                    };
                    vec![
                        Cell::text(or_dash(&a.name)),
                        Cell::text(or_dash(&a.date)),
                        Cell::text(members),
                        Cell::text(or_dash(&a.remarks)),
                    ]
                })
                .collect();
            blocks.push(Block::Table(TableSpec::new(
                vec![
                    ColumnSpec::text("Activity", ColumnWidth::Percent(30.0))
                        .aligned(Alignment::Left),
                    ColumnSpec::text("Date", ColumnWidth::Percent(15.0)),
                    ColumnSpec::text("MMT Members Involved", ColumnWidth::Percent(30.0)),
                    ColumnSpec::text("Remarks", ColumnWidth::Percent(25.0)),
                ],
                rows,
            )));
        }
    }

    blocks.push(heading(SECTION_COMPLIANCE));
    for section in report.compliance_monitoring.iter().flatten() {
        let title = section
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Compliance Requirements");
        blocks.push(subheading(title));
        if section.rows.is_empty() {
            continue;
        }
        let rows = section
            .rows
            .iter()
            .map(|r| {
                vec![
                    Cell::text(or_dash(&r.requirement)),
                    Cell::text(or_dash(&r.complied)),
                    Cell::text(or_dash(&r.remarks)),
                ]
            })
            .collect();
        blocks.push(Block::Table(TableSpec::new(
            vec![
                ColumnSpec::text("Requirement", ColumnWidth::Percent(55.0))
                    .aligned(Alignment::Left),
                ColumnSpec::text("Complied", ColumnWidth::Percent(15.0)),
                ColumnSpec::text("Remarks", ColumnWidth::Percent(30.0)),
            ],
            rows,
        )));
    }

    for (title, assessment) in [
        (SECTION_AIR, &report.air_quality),
        (SECTION_WATER, &report.water_quality),
        (SECTION_NOISE, &report.noise_quality),
    ] {
        blocks.push(heading(title));
        if let Some(assessment) = assessment {
            blocks.extend(quality_blocks(assessment));
        }
    }

    blocks.push(heading(SECTION_WASTE));
    if let Some(waste) = &report.waste_management {
        if !waste.entries.is_empty() {
            let field = |v: &Option<FieldValue>| {
                v.as_ref()
                    .map(FieldValue::render)
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "-".to_string())
            };
            let rows = waste
                .entries
                .iter()
                .map(|e| {
                    vec![
                        Cell::text(or_dash(&e.type_of_waste)),
                        Cell::text(field(&e.specification)),
                        Cell::text(field(&e.previous_record)),
                        Cell::text(field(&e.current_record)),
                        Cell::text(or_dash(&e.remarks)),
                    ]
                })
                .collect();
            blocks.push(Block::Table(TableSpec::new(
                vec![
                    ColumnSpec::text("Type of Waste", ColumnWidth::Percent(20.0))
                        .aligned(Alignment::Left),
                    ColumnSpec::text("Specification", ColumnWidth::Percent(22.0))
                        .aligned(Alignment::Left),
                    ColumnSpec::text("Previous Record", ColumnWidth::Percent(20.0)),
                    ColumnSpec::text("Current Record", ColumnWidth::Percent(20.0)),
                    ColumnSpec::text("Remarks", ColumnWidth::Percent(18.0)),
                ],
                rows,
            )));
        }
        if let Some(notes) = waste.notes.as_deref().filter(|s| !s.trim().is_empty()) {
            blocks.push(Block::Paragraph(notes.trim().to_string()));
        }
    }

    Document {
        title: CMVR_TITLE.to_string(),
        geometry: PageGeometry::cmvr(),
        blocks,
    }
}

fn permit_table(label: &str, number_header: &str, entries: &[PermitEntry]) -> TableSpec {
    let rows: Vec<Row> = if entries.is_empty() {
        vec![vec![Cell::text("N/A"), Cell::text("-"), Cell::text("-")]]
    } else {
        entries
            .iter()
            .map(|e| {
                vec![
                    Cell::text(or_dash(&e.permit_holder_name)),
                    Cell::text(or_dash(&e.permit_number)),
                    Cell::text(or_dash(&e.date_of_issuance)),
                ]
            })
            .collect()
    };
    let mut table = TableSpec::new(
        vec![
            ColumnSpec::text("Name of Permit Holder", ColumnWidth::Percent(31.0))
                .aligned(Alignment::Left),
            ColumnSpec::text(number_header, ColumnWidth::Percent(23.0)),
            ColumnSpec::text("Date of Issuance", ColumnWidth::Percent(23.0)),
        ],
        rows,
    );
    table.label = Some(labelled(label));
    table
}

fn fund_rows(entries: &[FundEntry]) -> Vec<Row> {
    if entries.is_empty() {
        return vec![vec![
            Cell::text("N/A"),
            Cell::text("-"),
            Cell::text("-"),
            Cell::text("-"),
        ]];
    }
    entries
        .iter()
        .map(|e| {
            vec![
                Cell::text(or_dash(&e.permit_holder_name)),
                Cell::text(or_dash(&e.savings_account_number)),
                Cell::text(or_dash(&e.amount_deposited)),
                Cell::text(or_dash(&e.date_updated)),
            ]
        })
        .collect()
}

pub fn fund_status_table(funds: &FundStatus) -> Option<GroupedTableSpec> {
    let groups: Vec<FundGroup> = [
        ("Rehabilitation Cash Fund (RCF)", &funds.rcf),
        ("Monitoring Trust Fund (MTF)", &funds.mtf),
        (
            "Final Mine Rehabilitation and Decommissioning Fund (FMRDF)",
            &funds.fmrdf,
        ),
    ]
    .into_iter()
    .filter_map(|(title, entries)| {
        entries.as_ref().map(|e| FundGroup {
            title: title.to_string(),
            rows: fund_rows(e),
        })
    })
    .collect();

    if groups.is_empty() {
        return None;
    }

    Some(GroupedTableSpec {
        label: labelled(FUND_STATUS_LABEL),
        columns: vec![
            ColumnSpec::text("Name of Permit Holder", ColumnWidth::Percent(31.0))
                .kind(ColumnKind::Name)
                .aligned(Alignment::Left),
            ColumnSpec::text("Savings Account Number", ColumnWidth::Percent(16.0)),
            ColumnSpec::text("Amount Deposited", ColumnWidth::Percent(15.0)),
            ColumnSpec::text("Date Updated", ColumnWidth::Percent(15.0)),
        ],
        groups,
        connect_previous: false,
        min_row_height: MIN_ROW_HEIGHT,
    })
}

/// Adjacent labelled tables render as one block: no gap, shared border.
fn connect_chain(chain: &mut [Block]) {
    let len = chain.len();
    for i in 0..len {
        let has_next = i + 1 < len;
        match &mut chain[i] {
            Block::Table(t) => {
                t.connect_previous = i > 0;
                t.suppress_bottom_spacing = has_next;
                t.suppress_bottom_border = has_next;
            }
            Block::GroupedTable(g) => g.connect_previous = i > 0,
            _ => {}
        }
    }
}

fn quality_blocks(assessment: &QualityAssessment) -> Vec<Block> {
    let mut blocks = Vec::new();
    if !assessment.parameters.is_empty() {
        let rows = assessment
            .parameters
            .iter()
            .map(|p| {
                vec![
                    Cell::text(or_dash(&p.name)),
                    Cell::text(or_dash(&p.station)),
                    Cell::text(or_dash(&p.current_result)),
                    Cell::text(or_dash(&p.previous_result)),
                    Cell::text(or_dash(&p.limit)),
                    Cell::text(or_dash(&p.remarks)),
                ]
            })
            .collect();
        blocks.push(Block::Table(TableSpec::new(
            vec![
                ColumnSpec::text("Parameter", ColumnWidth::Percent(20.0))
                    .aligned(Alignment::Left),
                ColumnSpec::text("Station", ColumnWidth::Percent(16.0)),
                ColumnSpec::text("Current Quarter", ColumnWidth::Percent(16.0)),
                ColumnSpec::text("Previous Quarter", ColumnWidth::Percent(16.0)),
                ColumnSpec::text("Limit", ColumnWidth::Percent(14.0)),
                ColumnSpec::text("Remarks", ColumnWidth::Percent(18.0)),
            ],
            rows,
        )));
    }
    if let Some(overall) = assessment
        .overall_assessment
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        blocks.push(Block::KeyValues(vec![kv(
            "Overall Assessment",
            overall.trim().to_string(),
        )]));
    }
    blocks
}

fn image_slot(attendee: &Attendee, url: &Option<String>) -> Cell {
    if attendee.attendance_status == Some(AttendanceStatus::Absent) {
        return Cell::Image(ImageCell::Absent);
    }
    match url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => Cell::Image(ImageCell::Url(u.to_string())),
        None => Cell::Image(ImageCell::Missing),
    }
}

pub fn compose_attendance(report: &AttendanceReport) -> Document {
    let title = report
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| ATTENDANCE_TITLE.to_string());

    let mut blocks = vec![Block::Title(title.clone())];
    blocks.push(Block::KeyValues(vec![
        kv("Date", or_dash(&report.meeting_date)),
        kv("Venue", or_dash(&report.venue)),
        kv("Agenda", or_dash(&report.agenda)),
    ]));

    let rows: Vec<Row> = report
        .attendees
        .iter()
        .map(|a| {
            vec![
                Cell::text(or_dash(&a.name)),
                Cell::text(or_dash(&a.agency)),
                Cell::text(or_dash(&a.position)),
                Cell::text(
                    a.attendance_status
                        .as_ref()
                        .map(|s| s.label().to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                image_slot(a, &a.signature_url),
                image_slot(a, &a.photo_url),
            ]
        })
        .collect();

    let mut table = TableSpec::new(
        vec![
            ColumnSpec::text("Name", ColumnWidth::Percent(24.0))
                .kind(ColumnKind::Name)
                .aligned(Alignment::Left),
            ColumnSpec::text("Agency/Office", ColumnWidth::Percent(17.0)),
            ColumnSpec::text("Position", ColumnWidth::Percent(15.0)),
            ColumnSpec::text("Attendance", ColumnWidth::Percent(12.0))
                .kind(ColumnKind::Text(FontWeight::Bold)),
            ColumnSpec::text("Signature", ColumnWidth::Percent(17.0)).kind(ColumnKind::Image {
                width: 60.0,
                height: 19.0,
            }),
            ColumnSpec::text("Photo", ColumnWidth::Percent(15.0)).kind(ColumnKind::Image {
                width: 40.0,
                height: 19.0,
            }),
        ],
        rows,
    );
    table.min_row_height = MIN_IMAGE_ROW_HEIGHT;
    blocks.push(Block::Table(table));

    Document {
        title,
        geometry: PageGeometry::attendance(),
        blocks,
    }
}

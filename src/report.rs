//! Report JSON as submitted by the CMVR backend. Every field is optional;
//! absent sections render as empty (or not at all), never as errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CmvrReport {
    pub general_info: Option<GeneralInfo>,
    pub ecc: Option<Vec<PermitEntry>>,
    pub isag: Option<Vec<PermitEntry>>,
    pub epep: Option<Vec<PermitEntry>>,
    pub fund_status: Option<FundStatus>,
    pub executive_summary: Option<ExecutiveSummary>,
    pub process_documentation: Option<ProcessDocumentation>,
    pub compliance_monitoring: Option<Vec<ComplianceSection>>,
    pub air_quality: Option<QualityAssessment>,
    pub water_quality: Option<QualityAssessment>,
    pub noise_quality: Option<QualityAssessment>,
    pub waste_management: Option<WasteManagement>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub barangay: Option<String>,
    pub municipality: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
}

impl Location {
    pub fn display(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.barangay, &self.municipality, &self.province, &self.region]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralInfo {
    pub company_name: Option<String>,
    pub project_name: Option<String>,
    pub project_current_name: Option<String>,
    pub location: Option<Location>,
    pub project_area: Option<String>,
    pub type_of_project: Option<String>,
    pub quarter: Option<String>,
    pub year: Option<i32>,
    pub date_of_compliance_monitoring: Option<String>,
    pub monitoring_period: Option<String>,
    pub date_of_cmr_submission: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermitEntry {
    pub permit_holder_name: Option<String>,
    pub permit_number: Option<String>,
    pub date_of_issuance: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FundEntry {
    pub permit_holder_name: Option<String>,
    pub savings_account_number: Option<String>,
    pub amount_deposited: Option<String>,
    pub date_updated: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FundStatus {
    pub rcf: Option<Vec<FundEntry>>,
    pub mtf: Option<Vec<FundEntry>>,
    pub fmrdf: Option<Vec<FundEntry>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryItem {
    pub label: Option<String>,
    pub complied: Option<bool>,
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutiveSummary {
    pub items: Vec<SummaryItem>,
    pub others: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    pub name: Option<String>,
    pub date: Option<String>,
    pub mmt_members_involved: Vec<String>,
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessDocumentation {
    pub date_conducted: Option<String>,
    pub methodology: Option<String>,
    pub activities: Vec<Activity>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplianceRow {
    pub requirement: Option<String>,
    pub complied: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplianceSection {
    pub title: Option<String>,
    pub rows: Vec<ComplianceRow>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityParameter {
    pub name: Option<String>,
    pub station: Option<String>,
    pub current_result: Option<String>,
    pub previous_result: Option<String>,
    pub limit: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityAssessment {
    pub parameters: Vec<QualityParameter>,
    pub overall_assessment: Option<String>,
}

/// Waste-table values arrive as a bare string, a keyed object or a list.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    KeyedValues(BTreeMap<String, String>),
    Items(Vec<String>),
}

impl FieldValue {
    pub fn render(&self) -> String {
        match self {
            FieldValue::Scalar(s) => s.clone(),
            FieldValue::KeyedValues(map) => map
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n"),
            FieldValue::Items(items) => items.join("\n"),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WasteEntry {
    pub type_of_waste: Option<String>,
    pub specification: Option<FieldValue>,
    pub previous_record: Option<FieldValue>,
    pub current_record: Option<FieldValue>,
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WasteManagement {
    pub entries: Vec<WasteEntry>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    InPerson,
    Online,
    Absent,
    #[serde(untagged)]
    Other(String),
}

impl AttendanceStatus {
    pub fn label(&self) -> &str {
        match self {
            AttendanceStatus::InPerson => "In Person",
            AttendanceStatus::Online => "Online",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Other(s) => s,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attendee {
    pub name: Option<String>,
    pub agency: Option<String>,
    pub position: Option<String>,
    pub attendance_status: Option<AttendanceStatus>,
    pub signature_url: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceReport {
    pub title: Option<String>,
    pub meeting_date: Option<String>,
    pub venue: Option<String>,
    pub agenda: Option<String>,
    pub attendees: Vec<Attendee>,
}

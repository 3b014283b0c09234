//! Static registry of institute categories and exam namespaces.
//!
//! Maps each category to its summary table and defines which attributes are
//! allowed into summary rows.

use serde::{Deserialize, Serialize};

use crate::db::Row;
use crate::errors::AppError;

/// Detail table shared by every institute category.
pub const COLLEGE_DETAIL_TABLE: &str = "colleges";

/// Key column of summary tables.
pub const SUMMARY_KEY: &str = "id";
/// Key column of detail tables.
pub const DETAIL_KEY: &str = "uuid";

pub const ANNOUNCEMENT_TABLE: &str = "announcements";
pub const ANNOUNCEMENT_BUCKET: &str = "announce";

/// Attributes that may appear in an institute summary row.
pub const SUMMARY_FIELDS: [&str; 10] = [
    "Name",
    "Tier",
    "Type",
    "Website",
    "NIRF 2024",
    "B.Tech Seats",
    "Establishment",
    "InstituteName",
    "Institute Code",
    "B.Tech Programmes",
];

/// Institute category; decides which summary table holds a college.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InstituteCategory {
    Iit,
    Iiit,
    Nit,
    Gfti,
}

impl InstituteCategory {
    pub const ALL: [InstituteCategory; 4] = [
        InstituteCategory::Iit,
        InstituteCategory::Iiit,
        InstituteCategory::Nit,
        InstituteCategory::Gfti,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstituteCategory::Iit => "iit",
            InstituteCategory::Iiit => "iiit",
            InstituteCategory::Nit => "nit",
            InstituteCategory::Gfti => "gfti",
        }
    }

    /// Case-insensitive lookup; accepts the short code or the tier name.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "iit" | "primary-tier" => Some(InstituteCategory::Iit),
            "iiit" | "information-technology-tier" => Some(InstituteCategory::Iiit),
            "nit" | "network-tier" => Some(InstituteCategory::Nit),
            "gfti" | "grant-funded-tier" => Some(InstituteCategory::Gfti),
            _ => None,
        }
    }

    /// Like `from_token`, failing with `UnknownCategory`.
    pub fn parse(token: &str) -> Result<Self, AppError> {
        Self::from_token(token).ok_or_else(|| AppError::UnknownCategory(token.to_string()))
    }

    pub fn summary_table(&self) -> &'static str {
        match self {
            InstituteCategory::Iit => "IITs",
            InstituteCategory::Iiit => "IIITs",
            InstituteCategory::Nit => "NITs",
            InstituteCategory::Gfti => "GFTS",
        }
    }
}

/// Keep only allow-listed summary attributes.
pub fn project_summary(payload: &Row) -> Row {
    payload
        .iter()
        .filter(|(key, _)| SUMMARY_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Exam partition. Both namespaces have their own summary/detail table pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExamNamespace {
    Standalone,
    CollegeSpecific,
}

impl ExamNamespace {
    pub fn summary_table(&self) -> &'static str {
        match self {
            ExamNamespace::Standalone => "exams_name",
            ExamNamespace::CollegeSpecific => "college_specific_exams",
        }
    }

    pub fn detail_table(&self) -> &'static str {
        match self {
            ExamNamespace::Standalone => "exams",
            ExamNamespace::CollegeSpecific => "collegespecificexams",
        }
    }
}

/// Probe order for `/exams/{id}` reads, updates and deletes.
pub const EXAM_LOOKUP_ORDER: [ExamNamespace; 2] =
    [ExamNamespace::Standalone, ExamNamespace::CollegeSpecific];

/// Probe order for `/college-exams/{id}` reads, updates and deletes.
pub const COLLEGE_EXAM_LOOKUP_ORDER: [ExamNamespace; 2] =
    [ExamNamespace::CollegeSpecific, ExamNamespace::Standalone];

//! Institution (college) models.

use serde::{Deserialize, Serialize};

use crate::db::Row;

/// Request body for creating a college.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollegeRequest {
    /// Category token; falls back to `full_data.Type`
    #[serde(default, rename = "type")]
    pub category: Option<String>,
    /// Display name; falls back to `full_data.Name`
    #[serde(default)]
    pub college_name: Option<String>,
    pub full_data: Row,
    /// Summary attributes; derived from `full_data` when absent
    #[serde(default)]
    pub basic_data: Option<Row>,
}

/// Request body for updating a college.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCollegeRequest {
    #[serde(default)]
    pub college_name: Option<String>,
    pub full_data: Row,
    #[serde(default)]
    pub basic_data: Option<Row>,
}

/// Query string for listing colleges.
#[derive(Debug, Clone, Deserialize)]
pub struct ListCollegesQuery {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollegeCreated {
    pub uuid: String,
    #[serde(rename = "type")]
    pub category: String,
    pub name: String,
}

/// Both halves of a college record.
#[derive(Debug, Clone, Serialize)]
pub struct CollegeRecord {
    pub uuid: String,
    pub college_name: String,
    pub institute_type: String,
    pub table_name: String,
    pub full_data: Row,
    pub basic_data: Row,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollegeUpdated {
    pub uuid: String,
    #[serde(rename = "type")]
    pub category: String,
    pub name: String,
    pub tables_updated: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollegeDeleted {
    pub uuid: String,
    #[serde(rename = "type")]
    pub category: String,
    pub tables_deleted_from: Vec<String>,
    pub rows_removed: usize,
}

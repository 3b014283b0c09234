//! Examination models.

use serde::{Deserialize, Serialize};

use crate::db::Row;
use crate::registry::ExamNamespace;

/// Request body for creating or updating an exam.
#[derive(Debug, Clone, Deserialize)]
pub struct ExamPayload {
    #[serde(default)]
    pub basic_data: Option<Row>,
    #[serde(default)]
    pub full_details: Option<Row>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamCreated {
    pub uuid: String,
    pub namespace: ExamNamespace,
}

/// An exam located by identity.
#[derive(Debug, Clone, Serialize)]
pub struct ExamRecord {
    pub id: String,
    pub uuid: String,
    pub namespace: ExamNamespace,
    pub basic_data: Row,
    pub full_details: Row,
    /// `basic_data` overlaid with `full_details`
    pub data: Row,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamUpdated {
    pub uuid: String,
    pub namespace: ExamNamespace,
    pub tables_updated: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamDeleted {
    pub uuid: String,
    pub namespace: ExamNamespace,
    pub tables_deleted_from: Vec<String>,
}

/// Summary rows of one exam namespace.
#[derive(Debug, Clone, Serialize)]
pub struct ExamList {
    pub count: usize,
    pub data: Vec<Row>,
}

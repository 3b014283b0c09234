//! Announcement model.

use serde::{Deserialize, Serialize};

/// A stored announcement. `data_json` holds serialized JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub data_json: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    pub created_at: String,
}

/// Request body for creating an announcement.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAnnouncementRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    /// Data URL: `data:<mime>;base64,<payload>`
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub data_json: Option<serde_json::Value>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
}

/// Request body for updating an announcement. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAnnouncementRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub data_json: Option<serde_json::Value>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
}

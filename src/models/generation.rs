//! Content generation request.

use serde::Deserialize;

/// Request body for drafting exam detail content.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, alias = "exam_name")]
    pub topic_name: Option<String>,
    #[serde(default, alias = "raw_content")]
    pub raw_text: Option<String>,
}

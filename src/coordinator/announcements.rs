//! Announcement operations. Single-table records with optional image upload.

use base64::{engine::general_purpose, Engine as _};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::Coordinator;
use crate::db::{Query, Row};
use crate::errors::AppError;
use crate::models::{Announcement, CreateAnnouncementRequest, UpdateAnnouncementRequest};
use crate::registry::{ANNOUNCEMENT_BUCKET, ANNOUNCEMENT_TABLE};

/// Image decoded from a `data:<mime>;base64,<payload>` URL.
#[derive(Debug)]
pub struct DecodedImage {
    pub content_type: String,
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Decode an inline image data URL.
pub fn decode_data_url(data_url: &str) -> Result<DecodedImage, AppError> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| AppError::BadRequest("image must be a data URL".to_string()))?;

    let content_type = header
        .split(';')
        .next()
        .and_then(|scheme| scheme.split_once(':'))
        .map(|(_, mime)| mime.trim())
        .filter(|mime| mime.contains('/'))
        .ok_or_else(|| AppError::BadRequest("image data URL has no MIME type".to_string()))?;

    // "image/svg+xml" -> "svg"
    let extension = content_type
        .rsplit('/')
        .next()
        .and_then(|subtype| subtype.split('+').next())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .ok_or_else(|| {
            AppError::BadRequest(format!("unsupported image type '{}'", content_type))
        })?;

    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::BadRequest(format!("image payload is not valid base64: {}", e)))?;

    Ok(DecodedImage {
        content_type: content_type.to_string(),
        extension: extension.to_ascii_lowercase(),
        bytes,
    })
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_announcement(row: Row) -> Result<Announcement, AppError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| {
        tracing::error!(error = %e, "Stored announcement is malformed");
        AppError::Upstream(format!("Stored announcement is malformed: {}", e))
    })
}

/// `data_json` is persisted as JSON text; `null` means absent.
fn encode_data_json(value: Option<&Value>) -> Option<String> {
    value.filter(|v| !v.is_null()).map(Value::to_string)
}

impl Coordinator {
    async fn upload_image(&self, image: DecodedImage) -> Result<String, AppError> {
        let short_id = Uuid::new_v4().simple().to_string();
        let file_name = format!("announcement_{}.{}", &short_id[..8], image.extension);
        let size = image.bytes.len();

        let url = self
            .store
            .upload_blob(
                ANNOUNCEMENT_BUCKET,
                &file_name,
                image.bytes,
                &image.content_type,
            )
            .await?;

        tracing::info!(file = %file_name, size, "Announcement image uploaded");
        Ok(url)
    }

    pub async fn create_announcement(
        &self,
        request: CreateAnnouncementRequest,
    ) -> Result<Announcement, AppError> {
        if request.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }

        let image = request
            .image_base64
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(decode_data_url)
            .transpose()?;
        let image_url = match image {
            Some(image) => Some(self.upload_image(image).await?),
            None => None,
        };

        let announcement = Announcement {
            id: Uuid::new_v4().to_string(),
            title: request.title,
            content: request.content,
            data_json: encode_data_json(request.data_json.as_ref()),
            image_url,
            priority: request.priority,
            scheduled_at: request.scheduled_at,
            created_at: now_timestamp(),
        };

        let row = match serde_json::to_value(&announcement)? {
            Value::Object(row) => row,
            _ => Row::new(),
        };
        if let Err(err) = self.store.insert(ANNOUNCEMENT_TABLE, row).await {
            if let Some(url) = &announcement.image_url {
                tracing::error!(
                    id = %announcement.id,
                    image_url = %url,
                    "Announcement insert failed, uploaded image is orphaned"
                );
            }
            return Err(err.into());
        }

        tracing::info!(id = %announcement.id, "Announcement created");
        Ok(announcement)
    }

    /// All announcements, newest first.
    pub async fn list_announcements(&self) -> Result<Vec<Announcement>, AppError> {
        let rows = self
            .store
            .select(ANNOUNCEMENT_TABLE, &Query::new().order_desc("created_at"))
            .await?;
        rows.into_iter().map(parse_announcement).collect()
    }

    /// Patch the supplied fields only.
    pub async fn update_announcement(
        &self,
        id: &str,
        request: UpdateAnnouncementRequest,
    ) -> Result<Announcement, AppError> {
        let mut patch = Row::new();

        if let Some(title) = request.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("title cannot be empty".to_string()));
            }
            patch.insert("title".to_string(), Value::String(title));
        }
        if let Some(content) = request.content {
            patch.insert("content".to_string(), Value::String(content));
        }
        if let Some(data_json) = request.data_json.as_ref() {
            let encoded = encode_data_json(Some(data_json)).map_or(Value::Null, Value::String);
            patch.insert("data_json".to_string(), encoded);
        }
        if let Some(priority) = request.priority {
            patch.insert("priority".to_string(), Value::from(priority));
        }
        if let Some(scheduled_at) = request.scheduled_at {
            patch.insert("scheduled_at".to_string(), Value::String(scheduled_at));
        }

        let image = request
            .image_base64
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(decode_data_url)
            .transpose()?;

        if patch.is_empty() && image.is_none() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }

        let query = Query::by("id", id);
        if self.store.select_one(ANNOUNCEMENT_TABLE, &query).await?.is_none() {
            return Err(AppError::NotFound(format!("Announcement {} not found", id)));
        }

        if let Some(image) = image {
            let url = self.upload_image(image).await?;
            patch.insert("image_url".to_string(), Value::String(url));
        }

        let updated = self
            .store
            .update(ANNOUNCEMENT_TABLE, &query, patch)
            .await?;

        let row = updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Announcement {} not found", id)))?;

        tracing::info!(id, "Announcement updated");
        parse_announcement(row)
    }

    /// Remove an announcement. Deleting an absent id is not an error.
    pub async fn delete_announcement(&self, id: &str) -> Result<usize, AppError> {
        let removed = self
            .store
            .delete(ANNOUNCEMENT_TABLE, &Query::by("id", id))
            .await?;
        tracing::info!(id, removed = removed.len(), "Announcement deleted");
        Ok(removed.len())
    }
}

//! Exam operations across the two exam namespaces.

use serde_json::json;
use uuid::Uuid;

use super::{object_field, string_field, Coordinator, Half};
use crate::db::{Query, Row};
use crate::errors::AppError;
use crate::models::{ExamCreated, ExamDeleted, ExamList, ExamPayload, ExamRecord, ExamUpdated};
use crate::registry::{ExamNamespace, DETAIL_KEY, SUMMARY_KEY};

fn summary_half(namespace: ExamNamespace) -> Half<'static> {
    Half::new(namespace.summary_table(), SUMMARY_KEY)
}

fn detail_half(namespace: ExamNamespace) -> Half<'static> {
    Half::new(namespace.detail_table(), DETAIL_KEY)
}

/// Validated exam payload.
struct ExamRows {
    name: String,
    basic: Row,
    details: Row,
}

impl ExamRows {
    fn from_payload(payload: ExamPayload, details_required: bool) -> Result<Self, AppError> {
        let basic = payload
            .basic_data
            .ok_or_else(|| AppError::Validation("basic_data is required".to_string()))?;
        let name = string_field(&basic, "Name")
            .ok_or_else(|| AppError::Validation("Name is required in basic_data".to_string()))?;
        let details = match payload.full_details {
            Some(details) => details,
            None if details_required => {
                return Err(AppError::Validation("full_details is required".to_string()))
            }
            None => Row::new(),
        };
        Ok(Self {
            name,
            basic,
            details,
        })
    }
}

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

impl Coordinator {
    pub async fn create_exam(
        &self,
        namespace: ExamNamespace,
        payload: ExamPayload,
    ) -> Result<ExamCreated, AppError> {
        let exam = ExamRows::from_payload(payload, false)?;
        let uuid = Uuid::new_v4().to_string();

        let detail_row = row(json!({
            DETAIL_KEY: uuid,
            "name": exam.name,
            "details": exam.details,
        }));
        let summary_row = row(json!({
            SUMMARY_KEY: uuid,
            "data": exam.basic,
        }));

        self.dual_insert(
            &uuid,
            (detail_half(namespace), detail_row),
            (summary_half(namespace), summary_row),
        )
        .await?;

        tracing::info!(uuid = %uuid, ?namespace, name = %exam.name, "Exam created");

        Ok(ExamCreated { uuid, namespace })
    }

    /// Find which namespace holds `identity`, probing summary tables in `order`.
    pub async fn locate_exam(
        &self,
        identity: &str,
        order: &[ExamNamespace],
    ) -> Result<(ExamNamespace, Row), AppError> {
        for namespace in order {
            let table = namespace.summary_table();
            tracing::debug!(identity, table, "Probing exam namespace");

            if let Some(summary) = self
                .store
                .select_one(table, &Query::by(SUMMARY_KEY, identity))
                .await?
            {
                return Ok((*namespace, summary));
            }
        }

        let probed: Vec<_> = order.iter().map(|n| n.summary_table()).collect();
        Err(AppError::NotFound(format!(
            "Exam {} not found in {}",
            identity,
            probed.join(" or ")
        )))
    }

    pub async fn get_exam(
        &self,
        identity: &str,
        order: &[ExamNamespace],
    ) -> Result<ExamRecord, AppError> {
        let (namespace, summary) = self.locate_exam(identity, order).await?;

        let detail = self
            .store
            .select_one(namespace.detail_table(), &Query::by(DETAIL_KEY, identity))
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Exam {} has no detail row in {}",
                    identity,
                    namespace.detail_table()
                ))
            })?;

        let basic_data = object_field(&summary, "data");
        let full_details = object_field(&detail, "details");
        let mut data = basic_data.clone();
        data.extend(full_details.clone());

        Ok(ExamRecord {
            id: identity.to_string(),
            uuid: identity.to_string(),
            namespace,
            basic_data,
            full_details,
            data,
        })
    }

    pub async fn update_exam(
        &self,
        identity: &str,
        order: &[ExamNamespace],
        payload: ExamPayload,
    ) -> Result<ExamUpdated, AppError> {
        let exam = ExamRows::from_payload(payload, true)?;

        let _guard = self.locks.acquire(identity).await;
        let (namespace, _) = self.locate_exam(identity, order).await?;

        let detail_patch = row(json!({
            "name": exam.name,
            "details": exam.details,
        }));
        let summary_patch = row(json!({ "data": exam.basic }));

        let tables_updated = self
            .dual_update(
                identity,
                (detail_half(namespace), detail_patch),
                (summary_half(namespace), summary_patch),
            )
            .await?;

        tracing::info!(identity, ?namespace, "Exam updated");

        Ok(ExamUpdated {
            uuid: identity.to_string(),
            namespace,
            tables_updated,
        })
    }

    pub async fn delete_exam(
        &self,
        identity: &str,
        order: &[ExamNamespace],
    ) -> Result<ExamDeleted, AppError> {
        let _guard = self.locks.acquire(identity).await;
        let (namespace, _) = self.locate_exam(identity, order).await?;

        let rows_removed = self
            .dual_delete(identity, summary_half(namespace), detail_half(namespace))
            .await?;
        tracing::info!(identity, ?namespace, rows_removed, "Exam deleted");

        Ok(ExamDeleted {
            uuid: identity.to_string(),
            namespace,
            tables_deleted_from: vec![
                namespace.summary_table().to_string(),
                namespace.detail_table().to_string(),
            ],
        })
    }

    /// Summary rows of one namespace.
    pub async fn list_exams(&self, namespace: ExamNamespace) -> Result<ExamList, AppError> {
        let data = self
            .store
            .select(namespace.summary_table(), &Query::new())
            .await?;
        Ok(ExamList {
            count: data.len(),
            data,
        })
    }
}

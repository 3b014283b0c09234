//! College (institution) operations.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use uuid::Uuid;

use super::{blank_to_none, object_field, string_field, Coordinator, Half};
use crate::db::{Query, Row};
use crate::errors::AppError;
use crate::models::{
    CollegeCreated, CollegeDeleted, CollegeRecord, CollegeUpdated, CreateCollegeRequest,
    UpdateCollegeRequest,
};
use crate::registry::{
    project_summary, InstituteCategory, COLLEGE_DETAIL_TABLE, DETAIL_KEY, SUMMARY_KEY,
};

fn detail_half() -> Half<'static> {
    Half::new(COLLEGE_DETAIL_TABLE, DETAIL_KEY)
}

fn summary_half(category: InstituteCategory) -> Half<'static> {
    Half::new(category.summary_table(), SUMMARY_KEY)
}

fn display_type(category: InstituteCategory) -> String {
    category.as_str().to_uppercase()
}

/// Which halves of an institution record exist under a given category.
#[derive(Debug, PartialEq, Eq)]
enum Stored {
    Both,
    Neither,
    SummaryOnly,
}

impl Coordinator {
    /// Check the pair for `uuid` against `category` without writing.
    /// A detail row filed under another category, or lacking its summary in
    /// `category`'s table, is `NotFound`.
    async fn stored_college(
        &self,
        uuid: &str,
        category: InstituteCategory,
    ) -> Result<Stored, AppError> {
        let detail = self
            .store
            .select_one(COLLEGE_DETAIL_TABLE, &Query::by(DETAIL_KEY, uuid))
            .await?;
        let has_summary = self
            .store
            .select_one(category.summary_table(), &Query::by(SUMMARY_KEY, uuid))
            .await?
            .is_some();

        let detail = match (detail, has_summary) {
            (None, false) => return Ok(Stored::Neither),
            (None, true) => return Ok(Stored::SummaryOnly),
            (Some(detail), _) => detail,
        };

        let filed_under = string_field(&detail, "category")
            .as_deref()
            .and_then(InstituteCategory::from_token);
        if filed_under.is_some_and(|filed| filed != category) || !has_summary {
            tracing::debug!(
                uuid,
                path_category = category.as_str(),
                filed_under = filed_under.map(|c| c.as_str()),
                "College is not filed under the requested category"
            );
            return Err(AppError::NotFound(format!(
                "College {} not found in {} table",
                uuid,
                category.summary_table()
            )));
        }
        Ok(Stored::Both)
    }

    pub async fn create_college(
        &self,
        request: CreateCollegeRequest,
    ) -> Result<CollegeCreated, AppError> {
        let token = blank_to_none(request.category)
            .or_else(|| string_field(&request.full_data, "Type"))
            .ok_or_else(|| AppError::Validation("type is required".to_string()))?;
        let category = InstituteCategory::parse(&token)?;

        let name = blank_to_none(request.college_name)
            .or_else(|| string_field(&request.full_data, "Name"))
            .ok_or_else(|| AppError::Validation("college_name is required".to_string()))?;

        let summary = project_summary(request.basic_data.as_ref().unwrap_or(&request.full_data));
        let uuid = Uuid::new_v4().to_string();

        let detail_row = row(json!({
            DETAIL_KEY: uuid,
            "college_name": name,
            "category": category.as_str(),
            "data": request.full_data,
        }));
        let summary_row = row(json!({
            SUMMARY_KEY: uuid,
            "data": summary,
        }));

        self.dual_insert(
            &uuid,
            (detail_half(), detail_row),
            (summary_half(category), summary_row),
        )
        .await?;

        tracing::info!(uuid = %uuid, category = category.as_str(), name = %name, "College created");

        Ok(CollegeCreated {
            uuid,
            category: display_type(category),
            name,
        })
    }

    pub async fn get_college(
        &self,
        uuid: &str,
        category_token: &str,
    ) -> Result<CollegeRecord, AppError> {
        let category = InstituteCategory::parse(category_token)?;

        let detail = self
            .store
            .select_one(COLLEGE_DETAIL_TABLE, &Query::by(DETAIL_KEY, uuid))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("College {} not found", uuid)))?;

        let summary = self
            .store
            .select_one(category.summary_table(), &Query::by(SUMMARY_KEY, uuid))
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "College {} not found in {} table",
                    uuid,
                    category.summary_table()
                ))
            })?;

        Ok(CollegeRecord {
            uuid: uuid.to_string(),
            college_name: string_field(&detail, "college_name").unwrap_or_default(),
            institute_type: display_type(category),
            table_name: category.summary_table().to_string(),
            full_data: object_field(&detail, "data"),
            basic_data: object_field(&summary, "data"),
        })
    }

    pub async fn update_college(
        &self,
        uuid: &str,
        category_token: &str,
        request: UpdateCollegeRequest,
    ) -> Result<CollegeUpdated, AppError> {
        let category = InstituteCategory::parse(category_token)?;

        let name = string_field(&request.full_data, "Name")
            .or_else(|| blank_to_none(request.college_name))
            .ok_or_else(|| AppError::Validation("full_data.Name is required".to_string()))?;

        if let Some(declared) = string_field(&request.full_data, "Type")
            .as_deref()
            .and_then(InstituteCategory::from_token)
        {
            if declared != category {
                tracing::warn!(
                    uuid,
                    path_category = category.as_str(),
                    declared_category = declared.as_str(),
                    "Payload Type disagrees with path category; keeping path category"
                );
            }
        }

        let summary = project_summary(request.basic_data.as_ref().unwrap_or(&request.full_data));

        let detail_patch = row(json!({
            "college_name": name,
            "data": request.full_data,
        }));
        let summary_patch = row(json!({ "data": summary }));

        let _guard = self.locks.acquire(uuid).await;
        if self.stored_college(uuid, category).await? != Stored::Both {
            return Err(AppError::NotFound(format!("College {} not found", uuid)));
        }
        let tables_updated = self
            .dual_update(
                uuid,
                (detail_half(), detail_patch),
                (summary_half(category), summary_patch),
            )
            .await?;

        tracing::info!(uuid, category = category.as_str(), "College updated");

        Ok(CollegeUpdated {
            uuid: uuid.to_string(),
            category: display_type(category),
            name,
            tables_updated,
        })
    }

    pub async fn delete_college(
        &self,
        uuid: &str,
        category_token: &str,
    ) -> Result<CollegeDeleted, AppError> {
        let category = InstituteCategory::parse(category_token)?;

        let _guard = self.locks.acquire(uuid).await;
        let rows_removed = match self.stored_college(uuid, category).await? {
            Stored::Neither => 0,
            Stored::Both | Stored::SummaryOnly => {
                self.dual_delete(uuid, summary_half(category), detail_half())
                    .await?
            }
        };

        if rows_removed == 0 {
            tracing::debug!(uuid, "College delete matched no rows");
        } else {
            tracing::info!(uuid, rows_removed, "College deleted");
        }

        Ok(CollegeDeleted {
            uuid: uuid.to_string(),
            category: display_type(category),
            tables_deleted_from: vec![
                category.summary_table().to_string(),
                COLLEGE_DETAIL_TABLE.to_string(),
            ],
            rows_removed,
        })
    }

    /// Summary rows of one category.
    pub async fn list_colleges(&self, category_token: &str) -> Result<Vec<Row>, AppError> {
        let category = InstituteCategory::parse(category_token)?;
        Ok(self
            .store
            .select(category.summary_table(), &Query::new())
            .await?)
    }

    /// Summary rows of every category, keyed by category token.
    pub async fn list_all_colleges(&self) -> Result<BTreeMap<String, Vec<Row>>, AppError> {
        let mut all = BTreeMap::new();
        for category in InstituteCategory::ALL {
            let rows = self
                .store
                .select(category.summary_table(), &Query::new())
                .await?;
            all.insert(category.as_str().to_string(), rows);
        }
        Ok(all)
    }
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{coordinator, row as object};
    use super::*;
    use crate::db::{StoreOp, TableStore};

    fn create_request(category: &str, full_data: Value) -> CreateCollegeRequest {
        CreateCollegeRequest {
            category: Some(category.to_string()),
            college_name: None,
            full_data: object(full_data),
            basic_data: None,
        }
    }

    fn full_data() -> Value {
        json!({
            "Name": "Example Institute of Technology",
            "Type": "IIT",
            "Tier": "1",
            "NIRF 2024": 4,
            "Hostel": {"Rooms": 1200},
            "Placements": {"Median": "20 LPA"}
        })
    }

    #[tokio::test]
    async fn test_create_writes_detail_and_projected_summary() {
        let (store, coordinator) = coordinator();

        let created = coordinator
            .create_college(create_request("iit", full_data()))
            .await
            .unwrap();

        assert_eq!(created.category, "IIT");
        assert_eq!(created.name, "Example Institute of Technology");

        let detail = &store.rows("colleges")[0];
        assert_eq!(detail["uuid"], created.uuid.as_str());
        assert_eq!(detail["data"]["Hostel"]["Rooms"], 1200);

        let summary = &store.rows("IITs")[0];
        assert_eq!(summary["id"], created.uuid.as_str());
        let keys: Vec<_> = summary["data"].as_object().unwrap().keys().cloned().collect();
        for key in &keys {
            assert!(crate::registry::SUMMARY_FIELDS.contains(&key.as_str()));
        }
        assert!(!keys.contains(&"Hostel".to_string()));
        assert!(!keys.contains(&"Placements".to_string()));
    }

    #[tokio::test]
    async fn test_create_prefers_explicit_basic_data() {
        let (store, coordinator) = coordinator();
        let mut request = create_request("nit", full_data());
        request.basic_data = Some(object(json!({"Name": "Short", "Secret": "x"})));

        coordinator.create_college(request).await.unwrap();

        let summary = &store.rows("NITs")[0]["data"];
        assert_eq!(summary["Name"], "Short");
        assert!(summary.get("Secret").is_none());
    }

    #[tokio::test]
    async fn test_unknown_category_touches_no_table() {
        let (store, coordinator) = coordinator();

        let err = coordinator
            .create_college(create_request("xyz", full_data()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownCategory(_)));

        let err = coordinator.get_college("u1", "xyz").await.unwrap_err();
        assert!(matches!(err, AppError::UnknownCategory(_)));
        let err = coordinator.delete_college("u1", "xyz").await.unwrap_err();
        assert!(matches!(err, AppError::UnknownCategory(_)));
        let err = coordinator
            .update_college(
                "u1",
                "xyz",
                UpdateCollegeRequest {
                    college_name: None,
                    full_data: object(full_data()),
                    basic_data: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownCategory(_)));
        let err = coordinator.list_colleges("xyz").await.unwrap_err();
        assert!(matches!(err, AppError::UnknownCategory(_)));

        assert!(store.log().is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let (store, coordinator) = coordinator();

        let err = coordinator
            .create_college(create_request("iit", json!({"Tier": "1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.log().is_empty());
    }

    #[tokio::test]
    async fn test_summary_failure_rolls_back_detail() {
        let (store, coordinator) = coordinator();
        store.fail_next(StoreOp::Insert, "IITs", 1);

        match coordinator
            .create_college(create_request("iit", full_data()))
            .await
        {
            Err(AppError::PartialWrite {
                written,
                failed,
                rolled_back,
                ..
            }) => {
                assert_eq!(written, vec!["colleges"]);
                assert_eq!(failed, vec!["IITs"]);
                assert!(rolled_back);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(store.rows("colleges").is_empty());
    }

    #[tokio::test]
    async fn test_get_update_delete_round() {
        let (store, coordinator) = coordinator();
        let created = coordinator
            .create_college(create_request("IIT", full_data()))
            .await
            .unwrap();

        let record = coordinator.get_college(&created.uuid, "iit").await.unwrap();
        assert_eq!(record.table_name, "IITs");
        assert_eq!(record.institute_type, "IIT");
        assert_eq!(record.full_data["Tier"], "1");
        assert_eq!(record.basic_data["NIRF 2024"], 4);

        let mut changed = full_data();
        changed["Name"] = json!("Renamed Institute");
        changed["NIRF 2024"] = json!(3);
        let updated = coordinator
            .update_college(
                &created.uuid,
                "iit",
                UpdateCollegeRequest {
                    college_name: None,
                    full_data: object(changed),
                    basic_data: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed Institute");
        assert_eq!(updated.tables_updated, vec!["colleges", "IITs"]);

        let detail = &store.rows("colleges")[0];
        assert_eq!(detail["college_name"], "Renamed Institute");
        assert_eq!(store.rows("IITs")[0]["data"]["NIRF 2024"], 3);

        let deleted = coordinator.delete_college(&created.uuid, "iit").await.unwrap();
        assert_eq!(deleted.rows_removed, 2);
        let again = coordinator.delete_college(&created.uuid, "iit").await.unwrap();
        assert_eq!(again.rows_removed, 0);

        let err = coordinator.get_college(&created.uuid, "iit").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_with_wrong_category_names_summary_table() {
        let (_store, coordinator) = coordinator();
        let created = coordinator
            .create_college(create_request("iit", full_data()))
            .await
            .unwrap();

        match coordinator.get_college(&created.uuid, "nit").await {
            Err(AppError::NotFound(msg)) => assert!(msg.contains("NITs")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_unknown_identity_is_not_found() {
        let (_store, coordinator) = coordinator();

        let err = coordinator
            .update_college(
                "missing",
                "gfti",
                UpdateCollegeRequest {
                    college_name: None,
                    full_data: object(full_data()),
                    basic_data: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_under_wrong_category_keeps_both_halves() {
        let (store, coordinator) = coordinator();
        let created = coordinator
            .create_college(create_request("iit", full_data()))
            .await
            .unwrap();

        let err = coordinator
            .delete_college(&created.uuid, "nit")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(store.rows("colleges").len(), 1);
        assert_eq!(store.rows("IITs").len(), 1);
        assert!(!store
            .log()
            .iter()
            .any(|(op, _)| *op == StoreOp::Delete));
        coordinator.get_college(&created.uuid, "iit").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_under_wrong_category_writes_nothing() {
        let (store, coordinator) = coordinator();
        let created = coordinator
            .create_college(create_request("iit", full_data()))
            .await
            .unwrap();

        let mut changed = full_data();
        changed["Name"] = json!("Hijacked");
        let err = coordinator
            .update_college(
                &created.uuid,
                "nit",
                UpdateCollegeRequest {
                    college_name: None,
                    full_data: object(changed),
                    basic_data: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(!store
            .log()
            .iter()
            .any(|(op, _)| *op == StoreOp::Update));
        assert_eq!(
            store.rows("colleges")[0]["college_name"],
            "Example Institute of Technology"
        );
    }

    #[tokio::test]
    async fn test_delete_clears_orphan_summary() {
        let (store, coordinator) = coordinator();
        store
            .insert("NITs", object(json!({"id": "stray", "data": {}})))
            .await
            .unwrap();

        let deleted = coordinator.delete_college("stray", "nit").await.unwrap();
        assert_eq!(deleted.rows_removed, 1);
        assert!(store.rows("NITs").is_empty());
    }

    #[tokio::test]
    async fn test_list_all_groups_by_category() {
        let (store, coordinator) = coordinator();
        coordinator
            .create_college(create_request("iit", full_data()))
            .await
            .unwrap();
        coordinator
            .create_college(create_request("gfti", full_data()))
            .await
            .unwrap();
        store
            .insert("IIITs", object(json!({"id": "legacy", "data": {}})))
            .await
            .unwrap();

        let all = coordinator.list_all_colleges().await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all["iit"].len(), 1);
        assert_eq!(all["iiit"].len(), 1);
        assert_eq!(all["nit"].len(), 0);
        assert_eq!(all["gfti"].len(), 1);

        assert_eq!(coordinator.list_colleges("GFTI").await.unwrap().len(), 1);
    }
}

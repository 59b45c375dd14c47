//! Complaint helper repository.

use std::sync::Arc;

use crate::entities::{
    Complaint, ComplaintHelper, User, complaint,
    complaint_helper::{self, HelperStatus},
    user,
};
use civic_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, sea_query::OnConflict,
};

/// Repository for NGO engagements on complaints.
#[derive(Clone)]
pub struct ComplaintHelperRepository {
    db: Arc<DatabaseConnection>,
}

impl ComplaintHelperRepository {
    /// Create a new complaint helper repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert the (complaint, NGO) relation, or reset an existing one back to
    /// `HELPING` with the new message.
    pub async fn upsert(
        &self,
        model: complaint_helper::ActiveModel,
    ) -> AppResult<complaint_helper::Model> {
        ComplaintHelper::insert(model)
            .on_conflict(
                OnConflict::columns([
                    complaint_helper::Column::ComplaintId,
                    complaint_helper::Column::NgoId,
                ])
                .update_columns([
                    complaint_helper::Column::Status,
                    complaint_helper::Column::Message,
                    complaint_helper::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the relation for a pair. Returns the number of rows removed.
    pub async fn delete_for_pair(&self, complaint_id: &str, ngo_id: &str) -> AppResult<u64> {
        let result = ComplaintHelper::delete_many()
            .filter(complaint_helper::Column::ComplaintId.eq(complaint_id))
            .filter(complaint_helper::Column::NgoId.eq(ngo_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Find a relation by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<complaint_helper::Model>> {
        ComplaintHelper::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a relation by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<complaint_helper::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Helper record {id} not found")))
    }

    /// Relations for one complaint with the NGO user attached, newest first.
    pub async fn find_by_complaint_with_ngo(
        &self,
        complaint_id: &str,
    ) -> AppResult<Vec<(complaint_helper::Model, Option<user::Model>)>> {
        ComplaintHelper::find()
            .filter(complaint_helper::Column::ComplaintId.eq(complaint_id))
            .find_also_related(User)
            .order_by_desc(complaint_helper::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Relations for a set of complaints with the NGO user attached.
    pub async fn find_by_complaints_with_ngo(
        &self,
        complaint_ids: &[String],
    ) -> AppResult<Vec<(complaint_helper::Model, Option<user::Model>)>> {
        if complaint_ids.is_empty() {
            return Ok(vec![]);
        }

        ComplaintHelper::find()
            .filter(complaint_helper::Column::ComplaintId.is_in(complaint_ids.to_vec()))
            .find_also_related(User)
            .order_by_desc(complaint_helper::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Relations for a set of complaints.
    pub async fn find_by_complaints(
        &self,
        complaint_ids: &[String],
    ) -> AppResult<Vec<complaint_helper::Model>> {
        if complaint_ids.is_empty() {
            return Ok(vec![]);
        }

        ComplaintHelper::find()
            .filter(complaint_helper::Column::ComplaintId.is_in(complaint_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Relations held by one NGO with the complaint attached, newest first.
    pub async fn find_by_ngo_with_complaint(
        &self,
        ngo_id: &str,
    ) -> AppResult<Vec<(complaint_helper::Model, Option<complaint::Model>)>> {
        ComplaintHelper::find()
            .filter(complaint_helper::Column::NgoId.eq(ngo_id))
            .find_also_related(Complaint)
            .order_by_desc(complaint_helper::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the status of a relation.
    pub async fn update_status(
        &self,
        model: complaint_helper::Model,
        status: HelperStatus,
    ) -> AppResult<complaint_helper::Model> {
        let mut active: complaint_helper::ActiveModel = model.into();
        active.status = Set(status);
        active.updated_at = Set(chrono::Utc::now().into());

        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_helper(id: &str, complaint_id: &str, ngo_id: &str) -> complaint_helper::Model {
        complaint_helper::Model {
            id: id.to_string(),
            complaint_id: complaint_id.to_string(),
            ngo_id: ngo_id.to_string(),
            status: HelperStatus::Helping,
            message: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_upsert_returns_row() {
        let helper = create_test_helper("h1", "c1", "ngo1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[helper.clone()]])
                .into_connection(),
        );

        let repo = ComplaintHelperRepository::new(Arc::clone(&db));
        let model = complaint_helper::ActiveModel {
            id: Set("h1".to_string()),
            complaint_id: Set("c1".to_string()),
            ngo_id: Set("ngo1".to_string()),
            status: Set(HelperStatus::Helping),
            message: Set(None),
            created_at: Set(helper.created_at),
            updated_at: Set(helper.updated_at),
        };
        let result = repo.upsert(model).await.unwrap();
        drop(repo);

        assert_eq!(result.id, "h1");

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = &log[0].statements()[0].sql;
        assert!(sql.contains("ON CONFLICT"));
    }

    #[tokio::test]
    async fn test_delete_for_missing_pair_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = ComplaintHelperRepository::new(db);
        let removed = repo.delete_for_pair("c1", "ngo1").await.unwrap();

        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<complaint_helper::Model>::new()])
                .into_connection(),
        );

        let repo = ComplaintHelperRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}

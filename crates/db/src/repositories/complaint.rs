//! Complaint repository.

use std::sync::Arc;

use crate::entities::{Complaint, complaint};
use chrono::{DateTime, FixedOffset};
use civic_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Complaint repository for database operations.
#[derive(Clone)]
pub struct ComplaintRepository {
    db: Arc<DatabaseConnection>,
}

impl ComplaintRepository {
    /// Create a new complaint repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new complaint.
    pub async fn create(&self, model: complaint::ActiveModel) -> AppResult<complaint::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a complaint by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<complaint::Model>> {
        Complaint::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a complaint by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<complaint::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {id} not found")))
    }

    /// Complaints filed by one reporter, newest first.
    pub async fn find_by_reporter(&self, reporter_id: &str) -> AppResult<Vec<complaint::Model>> {
        Complaint::find()
            .filter(complaint::Column::ReportedById.eq(reporter_id))
            .order_by_desc(complaint::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every complaint, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<complaint::Model>> {
        Complaint::find()
            .order_by_desc(complaint::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Complaints created inside an optional window, newest first.
    pub async fn find_created_between(
        &self,
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
    ) -> AppResult<Vec<complaint::Model>> {
        let mut query = Complaint::find().order_by_desc(complaint::Column::CreatedAt);

        if let Some(start) = start {
            query = query.filter(complaint::Column::CreatedAt.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(complaint::Column::CreatedAt.lte(end));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Complaints that carry both coordinates, newest first.
    pub async fn find_located(&self) -> AppResult<Vec<complaint::Model>> {
        Complaint::find()
            .filter(complaint::Column::Latitude.is_not_null())
            .filter(complaint::Column::Longitude.is_not_null())
            .order_by_desc(complaint::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of complaints filed per reporter.
    pub async fn count_by_reporter(&self) -> AppResult<Vec<(String, i64)>> {
        Complaint::find()
            .select_only()
            .column(complaint::Column::ReportedById)
            .column_as(complaint::Column::Id.count(), "count")
            .group_by(complaint::Column::ReportedById)
            .into_tuple::<(String, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a complaint.
    pub async fn update(&self, model: complaint::ActiveModel) -> AppResult<complaint::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::complaint::{ComplaintStatus, Priority};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_complaint(id: &str, reporter_id: &str) -> complaint::Model {
        complaint::Model {
            id: id.to_string(),
            complaint_code: "CR20240101123456".to_string(),
            title: "Pothole on Main St".to_string(),
            description: "Deep pothole".to_string(),
            category: "Pothole".to_string(),
            priority: Priority::High,
            status: ComplaintStatus::Pending,
            address: None,
            latitude: Some(28.61),
            longitude: Some(77.20),
            image_url: None,
            assigned_dept: None,
            reported_by_id: reporter_id.to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_reporter() {
        let c1 = create_test_complaint("c1", "citizen1");
        let c2 = create_test_complaint("c2", "citizen1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c1, c2]])
                .into_connection(),
        );

        let repo = ComplaintRepository::new(db);
        let result = repo.find_by_reporter("citizen1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|c| c.reported_by_id == "citizen1"));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<complaint::Model>::new()])
                .into_connection(),
        );

        let repo = ComplaintRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_reporter_filters_on_reporter_column() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<complaint::Model>::new()])
                .into_connection(),
        );

        let repo = ComplaintRepository::new(Arc::clone(&db));
        repo.find_by_reporter("citizen1").await.unwrap();
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let sql = &log[0].statements()[0].sql;
        assert!(sql.contains(r#""complaint"."reported_by_id" = $1"#));
    }
}

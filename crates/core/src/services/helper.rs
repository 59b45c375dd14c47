//! NGO helper relations.

use std::str::FromStr;

use civic_common::{AppError, AppResult, IdGenerator};
use civic_db::{
    entities::{
        complaint,
        complaint_helper::{self, HelperStatus},
        user,
    },
    repositories::{ComplaintHelperRepository, ComplaintRepository, UserRepository},
};
use sea_orm::Set;

use crate::{
    access::{Caller, Operation},
    services::report::HelperWithNgo,
};

/// What an NGO wants to do with its offer of help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpAction {
    Add,
    Remove,
}

impl FromStr for HelpAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            _ => Err(AppError::Validation(
                "Invalid action. Use 'add' or 'remove'".to_string(),
            )),
        }
    }
}

/// Result of a help request.
#[derive(Debug, Clone)]
pub enum HelpOutcome {
    /// The relation now exists with status `HELPING`.
    Added(complaint_helper::Model),
    /// Any relation for the pair is gone.
    Removed,
}

/// A helper relation joined with the report it concerns.
#[derive(Debug, Clone)]
pub struct HelpingEntry {
    pub helper: complaint_helper::Model,
    pub report: Option<complaint::Model>,
}

/// Helper relation service.
#[derive(Clone)]
pub struct HelperService {
    helper_repo: ComplaintHelperRepository,
    complaint_repo: ComplaintRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl HelperService {
    /// Create a new helper service.
    #[must_use]
    pub const fn new(
        helper_repo: ComplaintHelperRepository,
        complaint_repo: ComplaintRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            helper_repo,
            complaint_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Offer or withdraw help on a report.
    ///
    /// The NGO role is verified against the stored account, not the token,
    /// before `action` is read. Adding twice leaves a single relation;
    /// removing a missing one is a no-op.
    pub async fn request_help(
        &self,
        caller: &Caller,
        report_id: &str,
        action: &str,
        message: Option<String>,
    ) -> AppResult<HelpOutcome> {
        let ngo = self
            .user_repo
            .find_by_id(&caller.id)
            .await?
            .ok_or_else(|| AppError::Forbidden("Only NGO users can help with reports".to_string()))?;
        Caller::from(&ngo).authorize(Operation::RequestHelp)?;
        let action: HelpAction = action.parse()?;

        self.complaint_repo.get_by_id(report_id).await?;

        match action {
            HelpAction::Add => {
                let now = chrono::Utc::now();
                let model = complaint_helper::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    complaint_id: Set(report_id.to_string()),
                    ngo_id: Set(ngo.id.clone()),
                    status: Set(HelperStatus::Helping),
                    message: Set(message.filter(|m| !m.trim().is_empty())),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };

                let helper = self.helper_repo.upsert(model).await?;
                tracing::info!(report_id = %report_id, ngo_id = %ngo.id, "NGO helping");
                Ok(HelpOutcome::Added(helper))
            }
            HelpAction::Remove => {
                let removed = self.helper_repo.delete_for_pair(report_id, &ngo.id).await?;
                tracing::info!(report_id = %report_id, ngo_id = %ngo.id, removed, "NGO withdrew help");
                Ok(HelpOutcome::Removed)
            }
        }
    }

    /// Helpers on one report with NGO contact details, newest first.
    pub async fn list_for_report(
        &self,
        caller: &Caller,
        report_id: &str,
    ) -> AppResult<Vec<HelperWithNgo>> {
        caller.authorize(Operation::ListHelpersForReport)?;
        self.complaint_repo.get_by_id(report_id).await?;

        Ok(self
            .helper_repo
            .find_by_complaint_with_ngo(report_id)
            .await?
            .into_iter()
            .map(|(helper, ngo)| HelperWithNgo { helper, ngo })
            .collect())
    }

    /// Reports the calling NGO is helping with, newest first.
    pub async fn list_my_helping(&self, caller: &Caller) -> AppResult<Vec<HelpingEntry>> {
        caller.authorize(Operation::ListMyHelping)?;

        Ok(self
            .helper_repo
            .find_by_ngo_with_complaint(&caller.id)
            .await?
            .into_iter()
            .map(|(helper, report)| HelpingEntry { helper, report })
            .collect())
    }

    /// Set a helper relation's status.
    pub async fn update_status(
        &self,
        caller: &Caller,
        helper_id: &str,
        status: &str,
    ) -> AppResult<HelperWithNgo> {
        caller.authorize(Operation::UpdateHelperStatus)?;
        let status: HelperStatus = status.parse()?;

        let helper = self.helper_repo.get_by_id(helper_id).await?;
        let helper = self.helper_repo.update_status(helper, status).await?;
        let ngo: Option<user::Model> = self.user_repo.find_by_id(&helper.ngo_id).await?;

        tracing::info!(helper_id = %helper_id, status = status.as_str(), "Helper status changed");
        Ok(HelperWithNgo { helper, ngo })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use civic_db::entities::{complaint::ComplaintStatus, complaint::Priority, user::UserRole};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::sync::Arc;

    fn create_test_user(id: &str, role: UserRole) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Green Hands".to_string(),
            email: format!("{id}@example.org"),
            password_hash: "hash".to_string(),
            phone: Some("555-0100".to_string()),
            address: None,
            role,
            organization: Some("Green Hands Trust".to_string()),
            service_area: Some("Ward 7".to_string()),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_report(id: &str) -> complaint::Model {
        complaint::Model {
            id: id.to_string(),
            complaint_code: "CR20250101123456".to_string(),
            title: "Pothole on Main St".to_string(),
            description: "Deep".to_string(),
            category: "Pothole".to_string(),
            priority: Priority::High,
            status: ComplaintStatus::Pending,
            address: None,
            latitude: None,
            longitude: None,
            image_url: None,
            assigned_dept: None,
            reported_by_id: "citizen".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_helper(id: &str, report_id: &str, ngo_id: &str) -> complaint_helper::Model {
        complaint_helper::Model {
            id: id.to_string(),
            complaint_id: report_id.to_string(),
            ngo_id: ngo_id.to_string(),
            status: HelperStatus::Helping,
            message: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_service(
        helper_db: MockDatabase,
        complaint_db: MockDatabase,
        user_db: MockDatabase,
    ) -> HelperService {
        HelperService::new(
            ComplaintHelperRepository::new(Arc::new(helper_db.into_connection())),
            ComplaintRepository::new(Arc::new(complaint_db.into_connection())),
            UserRepository::new(Arc::new(user_db.into_connection())),
        )
    }

    fn ngo_caller() -> Caller {
        Caller::new("ngo1".to_string(), UserRole::Ngo)
    }

    #[test]
    fn test_parse_action() {
        assert_eq!("add".parse::<HelpAction>().unwrap(), HelpAction::Add);
        assert_eq!("remove".parse::<HelpAction>().unwrap(), HelpAction::Remove);
        assert!(matches!(
            "toggle".parse::<HelpAction>(),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_request_help_rechecks_stored_role() {
        // Token says NGO, but the account was stored as a citizen.
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("ngo1", UserRole::Citizen)]]);
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            user_db,
        );

        let result = service
            .request_help(&ngo_caller(), "r1", "add", None)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_request_help_missing_report_not_found() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("ngo1", UserRole::Ngo)]]);
        let complaint_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<complaint::Model>::new()]);
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            complaint_db,
            user_db,
        );

        let result = service
            .request_help(&ngo_caller(), "missing", "add", None)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_request_help_checks_role_before_action() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("c1", UserRole::Citizen)]]);
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            user_db,
        );
        let caller = Caller::new("c1".to_string(), UserRole::Citizen);

        let result = service.request_help(&caller, "r1", "maybe", None).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_request_help_rejects_unknown_action_for_ngo() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("ngo1", UserRole::Ngo)]]);
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            user_db,
        );

        let result = service.request_help(&ngo_caller(), "r1", "maybe", None).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_twice_upserts_on_pair() {
        let ngo = create_test_user("ngo1", UserRole::Ngo);
        let report = create_test_report("r1");
        let helper = create_test_helper("h1", "r1", "ngo1");

        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[ngo.clone()]])
            .append_query_results([[ngo]]);
        let complaint_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[report.clone()]])
            .append_query_results([[report]]);
        let helper_conn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[helper.clone()]])
                .append_query_results([[helper]])
                .into_connection(),
        );
        let service = HelperService::new(
            ComplaintHelperRepository::new(Arc::clone(&helper_conn)),
            ComplaintRepository::new(Arc::new(complaint_db.into_connection())),
            UserRepository::new(Arc::new(user_db.into_connection())),
        );

        for message in [None, Some("We can bring gravel".to_string())] {
            let outcome = service
                .request_help(&ngo_caller(), "r1", "add", message)
                .await
                .unwrap();
            assert!(matches!(outcome, HelpOutcome::Added(_)));
        }
        drop(service);

        let log = Arc::try_unwrap(helper_conn).unwrap().into_transaction_log();
        let statements: Vec<_> = log.iter().flat_map(|t| t.statements().to_vec()).collect();
        assert_eq!(statements.len(), 2);
        for statement in &statements {
            assert!(statement.sql.starts_with(r#"INSERT INTO "complaint_helper""#));
            assert!(
                statement
                    .sql
                    .contains(r#"ON CONFLICT ("complaint_id", "ngo_id") DO UPDATE SET"#)
            );
            let values = statement.values.as_ref().unwrap();
            assert!(values.0.contains(&Value::from("HELPING")));
            assert!(values.0.contains(&Value::from("r1")));
            assert!(values.0.contains(&Value::from("ngo1")));
        }
        assert!(
            statements[1]
                .values
                .as_ref()
                .unwrap()
                .0
                .contains(&Value::from("We can bring gravel"))
        );
    }

    #[tokio::test]
    async fn test_remove_without_relation_is_noop() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("ngo1", UserRole::Ngo)]]);
        let complaint_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_report("r1")]]);
        let helper_db = MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ]);
        let service = create_test_service(helper_db, complaint_db, user_db);

        let outcome = service
            .request_help(&ngo_caller(), "r1", "remove", None)
            .await
            .unwrap();

        assert!(matches!(outcome, HelpOutcome::Removed));
    }

    #[tokio::test]
    async fn test_list_for_report_after_remove_is_empty() {
        let complaint_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_report("r1")]]);
        let helper_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<complaint_helper::Model>::new()]);
        let service = create_test_service(
            helper_db,
            complaint_db,
            MockDatabase::new(DatabaseBackend::Postgres),
        );
        let admin = Caller::new("admin".to_string(), UserRole::Admin);

        let helpers = service.list_for_report(&admin, "r1").await.unwrap();

        assert!(helpers.is_empty());
    }

    #[tokio::test]
    async fn test_update_status_rejects_unknown_status() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );
        let admin = Caller::new("admin".to_string(), UserRole::Admin);

        let result = service.update_status(&admin, "h1", "ARCHIVED").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_status_unknown_helper_not_found() {
        let helper_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<complaint_helper::Model>::new()]);
        let service = create_test_service(
            helper_db,
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );
        let admin = Caller::new("admin".to_string(), UserRole::Admin);

        let result = service.update_status(&admin, "missing", "CONTACTED").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}

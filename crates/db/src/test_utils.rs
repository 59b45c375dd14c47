//! Throwaway Postgres databases for repository tests.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::{
    migrations::Migrator,
    repositories::{ComplaintHelperRepository, ComplaintRepository, UserRepository},
};

/// Where the test server lives. Read from `TEST_DB_*`.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Role allowed to create databases.
    pub username: String,
    /// Password for `username`.
    pub password: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        let var = |name: &str, fallback: &str| {
            std::env::var(name).unwrap_or_else(|_| fallback.to_string())
        };
        Self {
            host: var("TEST_DB_HOST", "localhost"),
            port: var("TEST_DB_PORT", "5433").parse().unwrap_or(5433),
            username: var("TEST_DB_USER", "civic_test"),
            password: var("TEST_DB_PASSWORD", "civic_test"),
        }
    }
}

impl TestDbConfig {
    /// URL of `database` on the test server.
    #[must_use]
    pub fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A freshly migrated civic schema in its own database.
pub struct TestStore {
    conn: Arc<DatabaseConnection>,
    config: TestDbConfig,
    name: String,
}

impl TestStore {
    /// Create `civic_test_<random>` and run every migration on it.
    pub async fn create() -> Result<Self, DbErr> {
        let config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("civic_test_{}", &suffix[..8]);

        let admin = Database::connect(config.url_for("postgres")).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{name}\""),
            ))
            .await?;
        admin.close().await?;

        let conn = Database::connect(config.url_for(&name)).await?;
        Migrator::up(&conn, None).await?;
        info!(database = %name, "Created civic test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
            name,
        })
    }

    #[must_use]
    pub fn users(&self) -> UserRepository {
        UserRepository::new(Arc::clone(&self.conn))
    }

    #[must_use]
    pub fn complaints(&self) -> ComplaintRepository {
        ComplaintRepository::new(Arc::clone(&self.conn))
    }

    #[must_use]
    pub fn helpers(&self) -> ComplaintHelperRepository {
        ComplaintHelperRepository::new(Arc::clone(&self.conn))
    }

    /// Drop the database. Repositories handed out earlier must be gone.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        if let Ok(conn) = Arc::try_unwrap(self.conn) {
            conn.close().await?;
        }

        let admin = Database::connect(self.config.url_for("postgres")).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.name),
            ))
            .await?;
        admin.close().await?;

        info!(database = %self.name, "Dropped civic test database");
        Ok(())
    }
}

//! Database Test Utilities
//!
//! Provides a PostgreSQL testcontainer with the catalogue schema applied and
//! settings pointing at it.

use infra_db::{Database, DatabaseSettings, PoolConfig};
use sqlx::{Connection, PgConnection};
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

/// Default PostgreSQL image for testing
const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "diecastor_test";

const SCHEMA: &str = include_str!("../../../migrations/20260124_000001_initial_schema.sql");

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Settings for a local database with the test credentials
pub fn local_settings(port: u16) -> DatabaseSettings {
    DatabaseSettings::new("localhost", port, POSTGRES_USER, POSTGRES_PASSWORD, POSTGRES_DB)
}

/// A wrapper around a PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub settings: DatabaseSettings,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container and applies the schema
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or the schema fails to apply
    pub async fn new() -> TestResult<Self> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432.tcp()).await?;
        let mut settings = local_settings(port);
        settings.host = container.get_host().await?.to_string();

        let test_db = Self {
            _container: container,
            settings,
        };
        test_db.init_schema().await?;

        Ok(test_db)
    }

    async fn init_schema(&self) -> TestResult<()> {
        let mut conn = self.connect().await?;
        sqlx::raw_sql(SCHEMA).execute(&mut conn).await?;
        conn.close().await?;
        Ok(())
    }

    /// Opens a connection outside any pool, for checks independent of the
    /// layer under test
    pub async fn connect(&self) -> TestResult<PgConnection> {
        Ok(PgConnection::connect_with(&self.settings.connect_options()).await?)
    }

    /// Builds a connection manager against the container
    pub fn database(&self, pool: PoolConfig) -> TestResult<Database> {
        Ok(Database::new(self.settings.clone().with_pool(pool))?)
    }

    /// Counts the rows of `table` on a fresh connection
    pub async fn count_rows(&self, table: &str) -> TestResult<i64> {
        let mut conn = self.connect().await?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok(count)
    }
}

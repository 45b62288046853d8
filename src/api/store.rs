//! Database access through the stored routines in `sql/schema.sql`.
//!
//! Handlers only see the [`UserStore`] trait; [`PgUserStore`] is the
//! PostgreSQL implementation used by the server.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgPool, Row};
use tracing::{info_span, Instrument, Span};
use utoipa::ToSchema;
use uuid::Uuid;

/// Public view of a user; never carries the password hash or admin flag.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub uuid: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub elo: Option<i32>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert the user and its role in one transaction.
    /// Returns the status output of the routine (`true` when it reported 1).
    async fn insert_user_and_role(
        &self,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
        is_admin: bool,
    ) -> Result<bool>;

    /// Stored password hash for `email`, `None` if no such user.
    async fn hashed_password(&self, email: &str) -> Result<Option<String>>;

    async fn update_last_login(&self, email: &str) -> Result<()>;

    async fn profile(&self, uuid: Uuid) -> Result<Option<Profile>>;

    async fn name(&self, uuid: Uuid) -> Result<Option<String>>;

    /// Returns `false` when no user matched `uuid`.
    async fn update_elo(&self, uuid: Uuid, elo: i32) -> Result<bool>;

    /// Round trip to the database, used by `/health`.
    async fn ping(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_user_and_role(
        &self,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
        is_admin: bool,
    ) -> Result<bool> {
        let query = "CALL insert_user_and_role($1, $2, $3, $4, NULL)";
        let row = sqlx::query(query)
            .bind(email)
            .bind(password_hash)
            .bind(name)
            .bind(i16::from(is_admin))
            .fetch_one(&self.pool)
            .instrument(query_span("CALL", query))
            .await
            .context("failed to call insert_user_and_role")?;

        let status: Option<i32> = row
            .try_get("status")
            .context("insert_user_and_role returned no status")?;

        Ok(status == Some(1))
    }

    async fn hashed_password(&self, email: &str) -> Result<Option<String>> {
        let query = "CALL get_hashed_password($1, NULL)";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_one(&self.pool)
            .instrument(query_span("CALL", query))
            .await
            .context("failed to call get_hashed_password")?;

        row.try_get("hashed_password")
            .context("get_hashed_password returned no hashed_password")
    }

    async fn update_last_login(&self, email: &str) -> Result<()> {
        let query = "CALL update_last_login($1)";
        sqlx::query(query)
            .bind(email)
            .execute(&self.pool)
            .instrument(query_span("CALL", query))
            .await
            .context("failed to call update_last_login")?;

        Ok(())
    }

    async fn profile(&self, uuid: Uuid) -> Result<Option<Profile>> {
        let query = "SELECT uuid, email, name, dob, elo FROM get_profile($1)";
        let row = sqlx::query(query)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to call get_profile")?;

        row.map(|row| -> Result<Profile> {
            Ok(Profile {
                uuid: row.try_get("uuid")?,
                email: row.try_get("email")?,
                name: row.try_get("name")?,
                dob: row.try_get("dob")?,
                elo: row.try_get("elo")?,
            })
        })
        .transpose()
    }

    async fn name(&self, uuid: Uuid) -> Result<Option<String>> {
        let query = "SELECT get_name($1) AS name";
        let row = sqlx::query(query)
            .bind(uuid)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to call get_name")?;

        row.try_get("name").context("get_name returned no name")
    }

    async fn update_elo(&self, uuid: Uuid, elo: i32) -> Result<bool> {
        let query = "CALL update_elo($1, $2, NULL)";
        let row = sqlx::query(query)
            .bind(uuid)
            .bind(elo)
            .fetch_one(&self.pool)
            .instrument(query_span("CALL", query))
            .await
            .context("failed to call update_elo")?;

        let updated: Option<i32> = row
            .try_get("updated")
            .context("update_elo returned no row count")?;

        Ok(updated.unwrap_or(0) > 0)
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}

/// These run against a disposable PostgreSQL database named by
/// `USERAUTH_TEST_DSN` and are skipped when it is unset.
#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{postgres::PgPoolOptions, PgConnection};

    const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));
    const SCHEMA_LOCK: i64 = 0x7573_6572_6175_7468;

    async fn test_store() -> Result<Option<PgUserStore>> {
        let Ok(dsn) = std::env::var("USERAUTH_TEST_DSN") else {
            eprintln!("USERAUTH_TEST_DSN missing; skipping database test");
            return Ok(None);
        };

        // tests run in parallel; only one may replace the routines at a time
        let mut connection = PgConnection::connect(&dsn)
            .await
            .context("failed to connect for schema setup")?;
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(SCHEMA_LOCK)
            .execute(&mut connection)
            .await?;
        let applied = sqlx::raw_sql(SCHEMA_SQL)
            .execute(&mut connection)
            .await
            .context("failed to apply schema");
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(SCHEMA_LOCK)
            .execute(&mut connection)
            .await?;
        applied?;

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&dsn)
            .await
            .context("failed to connect test pool")?;

        Ok(Some(PgUserStore::new(pool)))
    }

    fn unique_email() -> String {
        format!("{}@example.com", Uuid::new_v4().simple())
    }

    async fn uuid_of(store: &PgUserStore, email: &str) -> Result<Uuid> {
        sqlx::query("SELECT uuid FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&store.pool)
            .await?
            .try_get("uuid")
            .context("missing uuid")
    }

    #[tokio::test]
    async fn insert_reports_duplicate_email() -> Result<()> {
        let Some(store) = test_store().await? else {
            return Ok(());
        };
        let email = unique_email();

        assert!(store.insert_user_and_role(&email, "$hash", None, true).await?);
        assert!(!store.insert_user_and_role(&email, "$other", None, false).await?);

        let row = sqlx::query(
            "SELECT r.is_admin, u.password FROM roles r JOIN users u ON u.uuid = r.user_uuid WHERE u.email = $1",
        )
        .bind(&email)
        .fetch_one(&store.pool)
        .await?;
        assert_eq!(row.try_get::<i16, _>("is_admin")?, 1);
        assert_eq!(row.try_get::<String, _>("password")?, "$hash");
        Ok(())
    }

    #[tokio::test]
    async fn hashed_password_lookup() -> Result<()> {
        let Some(store) = test_store().await? else {
            return Ok(());
        };
        let email = unique_email();

        assert_eq!(store.hashed_password(&email).await?, None);

        store.insert_user_and_role(&email, "$argon2id$stub", None, false).await?;
        assert_eq!(
            store.hashed_password(&email).await?.as_deref(),
            Some("$argon2id$stub")
        );

        store.update_last_login(&email).await?;
        let last_login: Option<chrono::DateTime<chrono::Utc>> =
            sqlx::query("SELECT last_login FROM users WHERE email = $1")
                .bind(&email)
                .fetch_one(&store.pool)
                .await?
                .try_get("last_login")?;
        assert!(last_login.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn profile_name_and_elo() -> Result<()> {
        let Some(store) = test_store().await? else {
            return Ok(());
        };
        let email = unique_email();
        store.insert_user_and_role(&email, "$hash", Some("Nia"), false).await?;
        let uuid = uuid_of(&store, &email).await?;

        let profile = store
            .profile(uuid)
            .await?
            .ok_or_else(|| anyhow::anyhow!("profile missing"))?;
        assert_eq!(profile.email, email);
        assert_eq!(profile.name.as_deref(), Some("Nia"));
        assert_eq!(profile.elo, Some(1200));
        assert_eq!(store.name(uuid).await?.as_deref(), Some("Nia"));

        assert!(store.update_elo(uuid, 1450).await?);
        assert_eq!(store.profile(uuid).await?.and_then(|p| p.elo), Some(1450));

        let missing = Uuid::new_v4();
        assert_eq!(store.profile(missing).await?, None);
        assert_eq!(store.name(missing).await?, None);
        assert!(!store.update_elo(missing, 1000).await?);

        store.ping().await
    }
}

//! PostgreSQL Tenant Store
//!
//! Connection pooling with deadpool-postgres and a [`TenantStore`]
//! implementation over a single `atrium_tenants` table. Theme, feature and
//! contact settings live in JSONB columns. The normalized bare domain is kept
//! in its own unique column so conflicting domain claims are rejected by the
//! database as well as by [`PgTenantStore::upsert`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use atrium_core::{
    hostname, AtriumResult, ContactInfo, FeatureFlags, StoreError, TenantRecord, ThemeSettings,
};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts};
use tokio_postgres::types::Json;
use tokio_postgres::{NoTls, Row};

use atrium_storage::TenantStore;

use crate::error::{ApiError, ApiResult};
use crate::telemetry::METRICS;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait timeout when checking out a connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "atrium".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("ATRIUM_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("ATRIUM_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("ATRIUM_DB_NAME").unwrap_or_else(|_| "atrium".to_string()),
            user: std::env::var("ATRIUM_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("ATRIUM_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("ATRIUM_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("ATRIUM_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig {
            max_size: self.max_size,
            timeouts: Timeouts {
                wait: Some(self.timeout),
                ..Timeouts::default()
            },
            ..PoolConfig::default()
        });

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS atrium_tenants (
    id          TEXT PRIMARY KEY,
    slug        TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    domain      TEXT,
    bare_domain TEXT UNIQUE,
    theme       JSONB NOT NULL DEFAULT '{}'::jsonb,
    features    JSONB NOT NULL DEFAULT '{}'::jsonb,
    contact     JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
)
"#;

const COLUMNS: &str =
    "id, slug, name, domain, theme, features, contact, created_at, updated_at";

// ============================================================================
// TENANT STORE
// ============================================================================

/// [`TenantStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgTenantStore {
    pool: Pool,
}

fn unavailable(err: deadpool_postgres::PoolError) -> StoreError {
    tracing::warn!(error = %err, "Tenant store connection unavailable");
    StoreError::Unavailable {
        reason: err.to_string(),
    }
}

fn query_failed(err: tokio_postgres::Error) -> StoreError {
    tracing::error!(error = ?err, "Tenant store query failed");
    StoreError::QueryFailed {
        reason: err.to_string(),
    }
}

fn record_from_row(row: &Row) -> Result<TenantRecord, tokio_postgres::Error> {
    let theme: Json<ThemeSettings> = row.try_get("theme")?;
    let features: Json<FeatureFlags> = row.try_get("features")?;
    let contact: Json<ContactInfo> = row.try_get("contact")?;
    Ok(TenantRecord {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        domain: row.try_get("domain")?,
        theme: theme.0,
        features: features.0,
        contact: contact.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl PgTenantStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Create the tenants table if it does not exist.
    pub async fn ensure_schema(&self) -> AtriumResult<()> {
        let conn = self.pool.get().await.map_err(unavailable)?;
        conn.batch_execute(SCHEMA).await.map_err(query_failed)?;
        Ok(())
    }

    async fn timed<T, F>(&self, operation: &str, fut: F) -> AtriumResult<T>
    where
        F: std::future::Future<Output = AtriumResult<T>>,
    {
        let start = Instant::now();
        let result = fut.await;
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_db_operation(
                operation,
                "tenant",
                result.is_ok(),
                start.elapsed().as_secs_f64(),
            );
        }
        result
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn list_domain_tenants(&self) -> AtriumResult<Vec<TenantRecord>> {
        self.timed("list_domain", async {
            let conn = self.pool.get().await.map_err(unavailable)?;
            let sql = format!(
                "SELECT {} FROM atrium_tenants \
                 WHERE domain IS NOT NULL AND btrim(domain) <> '' \
                 ORDER BY created_at, id",
                COLUMNS
            );
            let rows = conn.query(sql.as_str(), &[]).await.map_err(query_failed)?;
            let records = rows
                .iter()
                .map(record_from_row)
                .collect::<Result<Vec<_>, _>>()
                .map_err(query_failed)?;
            Ok(records)
        })
        .await
    }

    async fn get_by_slug(&self, slug: &str) -> AtriumResult<Option<TenantRecord>> {
        self.timed("get_by_slug", async {
            let conn = self.pool.get().await.map_err(unavailable)?;
            let sql = format!("SELECT {} FROM atrium_tenants WHERE slug = $1", COLUMNS);
            let row = conn
                .query_opt(sql.as_str(), &[&slug])
                .await
                .map_err(query_failed)?;
            let record = row
                .as_ref()
                .map(record_from_row)
                .transpose()
                .map_err(query_failed)?;
            Ok(record)
        })
        .await
    }

    async fn upsert(&self, record: TenantRecord) -> AtriumResult<TenantRecord> {
        self.timed("upsert", async {
            let mut conn = self.pool.get().await.map_err(unavailable)?;
            let tx = conn.transaction().await.map_err(query_failed)?;

            let bare = record
                .domain
                .as_deref()
                .map(hostname::bare_domain)
                .filter(|d| !d.is_empty());

            if let Some(bare) = &bare {
                let claimed = tx
                    .query_opt(
                        "SELECT id FROM atrium_tenants WHERE bare_domain = $1 AND id <> $2",
                        &[bare, &record.id],
                    )
                    .await
                    .map_err(query_failed)?;
                if let Some(row) = claimed {
                    return Err(StoreError::DomainConflict {
                        domain: bare.clone(),
                        existing_id: row.try_get(0).map_err(query_failed)?,
                    }
                    .into());
                }
            }

            let slug_owner = tx
                .query_opt(
                    "SELECT id FROM atrium_tenants WHERE slug = $1 AND id <> $2",
                    &[&record.slug, &record.id],
                )
                .await
                .map_err(query_failed)?;
            if let Some(row) = slug_owner {
                return Err(StoreError::SlugConflict {
                    slug: record.slug.clone(),
                    existing_id: row.try_get(0).map_err(query_failed)?,
                }
                .into());
            }

            let updated_at = chrono::Utc::now();
            let row = tx
                .query_one(
                    "INSERT INTO atrium_tenants \
                     (id, slug, name, domain, bare_domain, theme, features, contact, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                     ON CONFLICT (id) DO UPDATE SET \
                       slug = EXCLUDED.slug, name = EXCLUDED.name, domain = EXCLUDED.domain, \
                       bare_domain = EXCLUDED.bare_domain, theme = EXCLUDED.theme, \
                       features = EXCLUDED.features, contact = EXCLUDED.contact, \
                       updated_at = EXCLUDED.updated_at \
                     RETURNING created_at",
                    &[
                        &record.id,
                        &record.slug,
                        &record.name,
                        &record.domain,
                        &bare,
                        &Json(&record.theme),
                        &Json(&record.features),
                        &Json(&record.contact),
                        &record.created_at,
                        &updated_at,
                    ],
                )
                .await
                .map_err(query_failed)?;
            let created_at = row.try_get(0).map_err(query_failed)?;
            tx.commit().await.map_err(query_failed)?;

            Ok(TenantRecord {
                created_at,
                updated_at,
                ..record
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "atrium");
        assert_eq!(config.max_size, 16);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_create_pool_is_lazy() {
        // deadpool connects on first checkout, so pool creation needs no server.
        let pool = DbConfig::default().create_pool().expect("pool config is valid");
        assert_eq!(pool.status().size, 0);
    }
}

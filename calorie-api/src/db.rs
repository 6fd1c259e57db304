//! PostgreSQL Store Module
//!
//! Connection pooling via deadpool-postgres and the [`FoodStore`]
//! implementation over the `food_items` table. Every statement is
//! parameterized; create is the only operation that uses a transaction.

use async_trait::async_trait;
use calorie_core::{fallback, FoodId, FoodItem, NewFoodItem};
use calorie_storage::{FoodStore, StoreConnector, StoreError, StoreResult};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

use crate::credentials::{CredentialResolver, DbCredentials};

// ============================================================================
// SQL
// ============================================================================

const FOOD_COLUMNS: &str =
    "id, name, calories, protein::float8 AS protein, carbs::float8 AS carbs, fat::float8 AS fat";

const CREATE_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS food_items (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(btrim(name)) > 0),
    calories INTEGER NOT NULL CHECK (calories >= 0),
    protein NUMERIC(7, 2),
    carbs NUMERIC(7, 2),
    fat NUMERIC(7, 2)
);
ALTER TABLE food_items ADD COLUMN IF NOT EXISTS protein NUMERIC(7, 2);
ALTER TABLE food_items ADD COLUMN IF NOT EXISTS carbs NUMERIC(7, 2);
ALTER TABLE food_items ADD COLUMN IF NOT EXISTS fat NUMERIC(7, 2);
CREATE INDEX IF NOT EXISTS food_items_name_lower_idx ON food_items (LOWER(name));
";

// SHARE ROW EXCLUSIVE conflicts with itself, so concurrent creates queue
// here and each one sees the previous max(id).
const LOCK_FOR_CREATE_SQL: &str = "LOCK TABLE food_items IN SHARE ROW EXCLUSIVE MODE";

/// Escape LIKE metacharacters so the term matches literally under `ESCAPE '\'`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,

    /// PostgreSQL port
    pub port: u16,

    /// Database name
    pub dbname: String,

    /// Database user
    pub user: String,

    pub password: Option<String>,

    /// Maximum pool size
    pub max_size: usize,

    /// Bound on establishing a connection and on waiting for a pooled one
    pub timeout: Duration,

    /// Managed-secret JSON document overriding the values above
    pub secret_file: Option<PathBuf>,

    /// Create the table and index on connect
    pub bootstrap: bool,

    /// Copy the fallback catalog into an empty table on connect
    pub seed: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "calories".to_string(),
            user: "postgres".to_string(),
            password: None,
            max_size: 4,
            timeout: Duration::from_secs(5),
            secret_file: None,
            bootstrap: true,
            seed: false,
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// Reads `CALORIE_DB_HOST`, `CALORIE_DB_PORT`, `CALORIE_DB_NAME`,
    /// `CALORIE_DB_USER`, `CALORIE_DB_PASSWORD`, `CALORIE_DB_POOL_SIZE`,
    /// `CALORIE_DB_TIMEOUT` (seconds), `CALORIE_DB_SECRET_FILE`,
    /// `CALORIE_DB_BOOTSTRAP` and `CALORIE_DB_SEED`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(default)
        };

        Self {
            host: lookup("CALORIE_DB_HOST").unwrap_or(defaults.host),
            port: lookup("CALORIE_DB_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: lookup("CALORIE_DB_NAME").unwrap_or(defaults.dbname),
            user: lookup("CALORIE_DB_USER").unwrap_or(defaults.user),
            password: lookup("CALORIE_DB_PASSWORD"),
            max_size: lookup("CALORIE_DB_POOL_SIZE")
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_size),
            timeout: lookup("CALORIE_DB_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            secret_file: lookup("CALORIE_DB_SECRET_FILE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            bootstrap: flag("CALORIE_DB_BOOTSTRAP", defaults.bootstrap),
            seed: flag("CALORIE_DB_SEED", defaults.seed),
        }
    }

    /// Build a pool for the resolved credentials. No connection is opened.
    pub fn create_pool(&self, credentials: &DbCredentials) -> StoreResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(credentials.host.clone());
        cfg.port = Some(credentials.port);
        cfg.dbname = Some(credentials.dbname.clone());
        cfg.user = Some(credentials.user.clone());
        cfg.password = Some(credentials.password.clone());
        cfg.connect_timeout = Some(self.timeout);
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        pool_config.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_config);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::config(format!("failed to create pool: {}", e)))
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn pool_error(err: deadpool_postgres::PoolError) -> StoreError {
    tracing::error!("Connection pool error: {:?}", err);
    StoreError::unavailable(err.to_string())
}

fn statement_error(err: tokio_postgres::Error) -> StoreError {
    tracing::error!("Database error: {:?}", err);
    if err.is_closed() {
        StoreError::unavailable(err.to_string())
    } else {
        StoreError::query(err.to_string())
    }
}

fn row_to_item(row: &Row) -> StoreResult<FoodItem> {
    let read = |e: tokio_postgres::Error| StoreError::query(format!("unexpected row shape: {}", e));
    Ok(FoodItem {
        id: row.try_get("id").map_err(read)?,
        name: row.try_get("name").map_err(read)?,
        calories: row.try_get("calories").map_err(read)?,
        protein: row.try_get("protein").map_err(read)?,
        carbs: row.try_get("carbs").map_err(read)?,
        fat: row.try_get("fat").map_err(read)?,
    })
}

fn rows_to_items(rows: &[Row]) -> StoreResult<Vec<FoodItem>> {
    rows.iter().map(row_to_item).collect()
}

// ============================================================================
// STORE
// ============================================================================

/// [`FoodStore`] over a deadpool-postgres pool.
#[derive(Clone)]
pub struct PgFoodStore {
    pool: Pool,
}

impl PgFoodStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn conn(&self) -> StoreResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Create the table and index if they do not exist.
    pub async fn bootstrap(&self) -> StoreResult<()> {
        let conn = self.conn().await?;
        conn.batch_execute(CREATE_TABLE_SQL)
            .await
            .map_err(statement_error)?;
        tracing::info!("food_items schema ready");
        Ok(())
    }

    /// Insert the fallback catalog when the table is empty.
    ///
    /// Returns the number of rows written.
    pub async fn seed_if_empty(&self) -> StoreResult<usize> {
        let conn = self.conn().await?;
        let row = conn
            .query_one("SELECT COUNT(*) FROM food_items", &[])
            .await
            .map_err(statement_error)?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| StoreError::query(e.to_string()))?;
        if count > 0 {
            return Ok(0);
        }

        let insert = conn
            .prepare(
                "INSERT INTO food_items (id, name, calories, protein, carbs, fat) \
                 VALUES ($1::int4, $2::text, $3::int4, $4::float8, $5::float8, $6::float8) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .await
            .map_err(statement_error)?;

        let mut written = 0;
        for item in fallback::catalog() {
            written += conn
                .execute(
                    &insert,
                    &[
                        &item.id,
                        &item.name,
                        &item.calories,
                        &item.protein,
                        &item.carbs,
                        &item.fat,
                    ],
                )
                .await
                .map_err(statement_error)? as usize;
        }
        tracing::info!(rows = written, "Seeded food_items from fallback catalog");
        Ok(written)
    }
}

#[async_trait]
impl FoodStore for PgFoodStore {
    async fn list_all(&self) -> StoreResult<Vec<FoodItem>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                &format!("SELECT {} FROM food_items ORDER BY id ASC", FOOD_COLUMNS),
                &[],
            )
            .await
            .map_err(statement_error)?;
        rows_to_items(&rows)
    }

    async fn get_by_id(&self, id: FoodId) -> StoreResult<Option<FoodItem>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {} FROM food_items WHERE id = $1", FOOD_COLUMNS),
                &[&id],
            )
            .await
            .map_err(statement_error)?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn search_by_name(&self, term: &str) -> StoreResult<Vec<FoodItem>> {
        let conn = self.conn().await?;
        let pattern = like_pattern(term);
        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM food_items \
                     WHERE LOWER(name) LIKE LOWER($1) ESCAPE '\\' \
                     ORDER BY id ASC",
                    FOOD_COLUMNS
                ),
                &[&pattern],
            )
            .await
            .map_err(statement_error)?;
        rows_to_items(&rows)
    }

    async fn create(&self, item: &NewFoodItem) -> StoreResult<FoodItem> {
        let mut conn = self.conn().await?;
        let client: &mut tokio_postgres::Client = &mut conn;
        let tx = client.transaction().await.map_err(statement_error)?;

        tx.batch_execute(LOCK_FOR_CREATE_SQL)
            .await
            .map_err(statement_error)?;
        let row = tx
            .query_one(
                &format!(
                    "INSERT INTO food_items (id, name, calories, protein, carbs, fat) \
                     SELECT COALESCE(MAX(id), 0) + 1, $1::text, $2::int4, \
                            $3::float8, $4::float8, $5::float8 \
                     FROM food_items \
                     RETURNING {}",
                    FOOD_COLUMNS
                ),
                &[&item.name, &item.calories, &item.protein, &item.carbs, &item.fat],
            )
            .await
            .map_err(statement_error)?;
        let created = row_to_item(&row)?;

        tx.commit().await.map_err(statement_error)?;
        Ok(created)
    }

    async fn update(&self, id: FoodId, item: &NewFoodItem) -> StoreResult<Option<FoodItem>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                &format!(
                    "UPDATE food_items \
                     SET name = $2, calories = $3, \
                         protein = $4::float8, carbs = $5::float8, fat = $6::float8 \
                     WHERE id = $1 \
                     RETURNING {}",
                    FOOD_COLUMNS
                ),
                &[
                    &id,
                    &item.name,
                    &item.calories,
                    &item.protein,
                    &item.carbs,
                    &item.fat,
                ],
            )
            .await
            .map_err(statement_error)?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn ping(&self) -> StoreResult<()> {
        let conn = self.conn().await?;
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(statement_error)?;
        Ok(())
    }
}

// ============================================================================
// CONNECTOR
// ============================================================================

/// Opens [`PgFoodStore`]s for a [`calorie_storage::StoreHandle`].
#[derive(Debug)]
pub struct PgConnector {
    config: DbConfig,
    credentials: CredentialResolver,
}

impl PgConnector {
    pub fn new(config: DbConfig) -> Self {
        Self {
            credentials: CredentialResolver::new(config.clone()),
            config,
        }
    }
}

#[async_trait]
impl StoreConnector for PgConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn FoodStore>> {
        let credentials = self.credentials.resolve().await.map_err(|e| {
            tracing::error!("Credential resolution failed: {}", e);
            StoreError::config(e.to_string())
        })?;

        let pool = self.config.create_pool(credentials)?;
        let store = PgFoodStore::new(pool);

        // The pool is lazy; checking one connection out is the real connect.
        store.ping().await?;
        tracing::info!(
            host = %credentials.host,
            dbname = %credentials.dbname,
            "Connected to PostgreSQL"
        );

        if self.config.bootstrap {
            store.bootstrap().await?;
        }
        if self.config.seed {
            store.seed_if_empty().await?;
        }

        Ok(Arc::new(store))
    }
}

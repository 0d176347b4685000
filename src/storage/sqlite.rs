//! SQLite storage backend implementation
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers (websocket commands, REST) do not block the monitor loop's inserts
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! ## Limitations
//!
//! - **Percentiles**: SQLite has no `PERCENTILE_CONT`, so summaries fetch the
//!   window's rows and aggregate them in Rust
//! - **Distributed**: Single-machine only

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, MeasurementQuery, MeasurementStore, TimeWindow};
use super::error::{StorageError, StorageResult};
use super::schema::{HostSummary, StoredMeasurement};
use crate::Measurement;

const SELECT_COLUMNS: &str =
    "id, timestamp, target_host, response_time_ms, packet_loss, error_message, created_at";

/// SQLite storage backend
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) the database and run migrations
    ///
    /// Failing here is fatal for the hub: the monitor is never started
    /// without a working store.
    ///
    /// ```no_run
    /// # use ping_monitor::storage::sqlite::SqliteStore;
    /// # async fn example() -> anyhow::Result<()> {
    /// let store = SqliteStore::new("./ping_metrics.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        info!("SQLite connection pool created");

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn measurement_from_row(row: &SqliteRow) -> Measurement {
        let packet_loss: bool = row.get("packet_loss");
        Measurement {
            target: row.get("target_host"),
            latency_ms: row.get("response_time_ms"),
            reachable: !packet_loss,
            error: row.get("error_message"),
            timestamp: Self::millis_to_timestamp(row.get("timestamp")),
        }
    }

    fn stored_from_row(row: &SqliteRow) -> StoredMeasurement {
        StoredMeasurement {
            id: row.get("id"),
            measurement: Self::measurement_from_row(row),
            created_at: Self::millis_to_timestamp(row.get("created_at")),
        }
    }
}

#[async_trait]
impl MeasurementStore for SqliteStore {
    #[instrument(skip(self, measurement), fields(target = %measurement.target))]
    async fn insert(&self, measurement: &Measurement) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO ping_metrics (
                timestamp, target_host, response_time_ms, packet_loss, error_message, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Self::timestamp_to_millis(&measurement.timestamp))
        .bind(&measurement.target)
        .bind(measurement.latency_ms)
        .bind(!measurement.reachable)
        .bind(&measurement.error)
        .bind(Self::timestamp_to_millis(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    #[instrument(skip(self), fields(host = ?query.host))]
    async fn query(&self, query: MeasurementQuery) -> StorageResult<Vec<StoredMeasurement>> {
        let since = Self::timestamp_to_millis(&query.window.start(Utc::now()));
        let host_clause = if query.host.is_some() {
            "AND target_host = ?"
        } else {
            ""
        };

        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM ping_metrics
            WHERE timestamp >= ? {host_clause}
            ORDER BY timestamp DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        );

        let mut statement = sqlx::query(&sql).bind(since);
        if let Some(host) = &query.host {
            statement = statement.bind(host);
        }

        let rows = statement
            .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(query.offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let results: Vec<StoredMeasurement> = rows.iter().map(Self::stored_from_row).collect();
        debug!("query returned {} measurements", results.len());
        Ok(results)
    }

    async fn get(&self, id: i64) -> StorageResult<Option<StoredMeasurement>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM ping_metrics WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(row.as_ref().map(Self::stored_from_row))
    }

    #[instrument(skip(self))]
    async fn latest_per_host(&self) -> StorageResult<BTreeMap<String, StoredMeasurement>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.timestamp, m.target_host, m.response_time_ms,
                   m.packet_loss, m.error_message, m.created_at
            FROM ping_metrics m
            JOIN (
                SELECT target_host, MAX(timestamp) AS latest
                FROM ping_metrics
                GROUP BY target_host
            ) l ON m.target_host = l.target_host AND m.timestamp = l.latest
            ORDER BY m.target_host, m.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let mut latest = BTreeMap::new();
        for row in &rows {
            let stored = Self::stored_from_row(row);
            // rows sharing the newest timestamp: keep the highest id
            latest
                .entry(stored.measurement.target.clone())
                .or_insert(stored);
        }

        debug!("retrieved latest measurements for {} hosts", latest.len());
        Ok(latest)
    }

    #[instrument(skip(self))]
    async fn aggregate(&self, host: &str, window: TimeWindow) -> StorageResult<HostSummary> {
        let since = Self::timestamp_to_millis(&window.start(Utc::now()));
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM ping_metrics WHERE target_host = ? AND timestamp >= ?"
        );

        let rows = sqlx::query(&sql)
            .bind(host)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let measurements: Vec<Measurement> = rows.iter().map(Self::measurement_from_row).collect();
        Ok(HostSummary::from_measurements(host, window, &measurements))
    }

    async fn distinct_hosts(&self) -> StorageResult<Vec<String>> {
        let hosts: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT target_host FROM ping_metrics ORDER BY target_host")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(hosts)
    }

    async fn count(&self, host: Option<&str>, window: Option<TimeWindow>) -> StorageResult<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM ping_metrics WHERE 1=1");
        if window.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if host.is_some() {
            sql.push_str(" AND target_host = ?");
        }

        let mut statement = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(window) = window {
            statement = statement.bind(Self::timestamp_to_millis(&window.start(Utc::now())));
        }
        if let Some(host) = host {
            statement = statement.bind(host);
        }

        let count = statement
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn cleanup_before(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        info!("cleaning up measurements older than {}", before);

        let result = sqlx::query("DELETE FROM ping_metrics WHERE timestamp < ?")
            .bind(Self::timestamp_to_millis(&before))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let deleted = result.rows_affected() as usize;
        info!("deleted {} old measurements", deleted);

        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}

//! QueryStore — sqlx/SQLite persistence for the `weather_queries` table.
//!
//! The store is a thin, `Clone`-able facade over a connection pool. The
//! schema is created on open; `created_at` is defaulted by SQLite.

use std::path::Path;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// A completed aggregation, ready to persist.
#[derive(Debug, Clone)]
pub struct NewWeatherQuery {
    pub location: String,
    pub service_1_temperature: f64,
    pub service_2_temperature: f64,
    pub request_count: i64,
}

/// A persisted row of `weather_queries`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WeatherQuery {
    pub id: i64,
    pub location: String,
    pub service_1_temperature: f64,
    pub service_2_temperature: f64,
    pub request_count: i64,
    pub created_at: String,
}

/// Thread-safe query store backed by SQLite.
#[derive(Clone)]
pub struct QueryStore {
    pool: SqlitePool,
}

impl QueryStore {
    /// Open (or create) the database at the given path.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(StoreError::Open)?;
        let store = Self { pool };
        store.ensure_schema().await?;
        debug!(?path, "query store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub async fn open_in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        // A single connection keeps the in-memory database alive for the
        // store's lifetime.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StoreError::Open)?;
        let store = Self { pool };
        store.ensure_schema().await?;
        debug!("in-memory query store opened");
        Ok(store)
    }

    /// Create the `weather_queries` table if it doesn't exist yet.
    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS weather_queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                service_1_temperature REAL NOT NULL,
                service_2_temperature REAL NOT NULL,
                request_count INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::Schema)?;
        Ok(())
    }

    /// Insert one aggregation record and return its row id.
    pub async fn insert_query(&self, record: &NewWeatherQuery) -> StoreResult<i64> {
        let result = sqlx::query(
            "INSERT INTO weather_queries
                (location, service_1_temperature, service_2_temperature, request_count)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&record.location)
        .bind(record.service_1_temperature)
        .bind(record.service_2_temperature)
        .bind(record.request_count)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Query)?;
        Ok(result.last_insert_rowid())
    }

    /// Close the underlying pool. Every operation after this fails.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// List all persisted records, newest first.
    pub async fn recent_queries(&self) -> StoreResult<Vec<WeatherQuery>> {
        sqlx::query_as::<_, WeatherQuery>(
            "SELECT id, location, service_1_temperature, service_2_temperature,
                    request_count, created_at
             FROM weather_queries
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(location: &str, request_count: i64) -> NewWeatherQuery {
        NewWeatherQuery {
            location: location.to_string(),
            service_1_temperature: 20.0,
            service_2_temperature: 22.0,
            request_count,
        }
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let store = QueryStore::open_in_memory().await.unwrap();
        assert!(store.recent_queries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let store = QueryStore::open_in_memory().await.unwrap();
        let id = store.insert_query(&record("Istanbul", 10)).await.unwrap();
        assert!(id > 0);

        let rows = store.recent_queries().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location, "Istanbul");
        assert_eq!(rows[0].service_1_temperature, 20.0);
        assert_eq!(rows[0].service_2_temperature, 22.0);
        assert_eq!(rows[0].request_count, 10);
        assert!(!rows[0].created_at.is_empty());
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let store = QueryStore::open_in_memory().await.unwrap();
        store.insert_query(&record("Istanbul", 10)).await.unwrap();
        store.insert_query(&record("Ankara", 3)).await.unwrap();
        store.insert_query(&record("Izmir", 1)).await.unwrap();

        let rows = store.recent_queries().await.unwrap();
        let locations: Vec<&str> = rows.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec!["Izmir", "Ankara", "Istanbul"]);
    }

    #[tokio::test]
    async fn closed_store_reports_query_errors() {
        let store = QueryStore::open_in_memory().await.unwrap();
        store.close().await;
        assert!(store.recent_queries().await.is_err());
        assert!(store.insert_query(&record("Istanbul", 1)).await.is_err());
    }

    #[tokio::test]
    async fn schema_setup_is_idempotent() {
        let store = QueryStore::open_in_memory().await.unwrap();
        store.ensure_schema().await.unwrap();
        store.insert_query(&record("Istanbul", 1)).await.unwrap();
        assert_eq!(store.recent_queries().await.unwrap().len(), 1);
    }
}

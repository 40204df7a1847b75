//! nimbus-store — persistence for completed aggregations.
//!
//! One SQLite table, `weather_queries`, holds a row per successful batch.
//! Writes go through the fire-and-forget [`Persistor`]: the fan-out
//! submits a record and moves on, a background [`PersistWriter`] performs
//! the insert, and a failed write is logged without ever reaching a
//! client.
//!
//! # Architecture
//!
//! ```text
//! Persistor::submit(record)          ← called by the fan-out, non-blocking
//!   └── unbounded channel
//!         └── PersistWriter::run()   ← background insert loop
//!               └── QueryStore      ← sqlx SQLite pool
//! ```

pub mod error;
pub mod persistor;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use persistor::{PersistWriter, Persistor};
pub use store::{NewWeatherQuery, QueryStore, WeatherQuery};

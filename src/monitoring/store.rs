// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Reading log
//!
//! Append-only log of temperature readings, queryable by recency and by time
//! range. [`SqliteReadingLog`] stores it in the `temperature_readings` table:
//!
//! ```sql
//! CREATE TABLE temperature_readings (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     timestamp TEXT NOT NULL,
//!     temperature REAL NOT NULL,
//!     anomaly BOOLEAN DEFAULT FALSE,
//!     rate_of_change REAL DEFAULT 0
//! );
//! CREATE INDEX idx_timestamp ON temperature_readings(timestamp DESC);
//! ```
//!
//! Timestamps are local wall-clock `YYYY-MM-DD HH:MM:SS` strings, so string
//! comparison in SQL matches chronological order. Each insert is a single
//! statement and therefore atomic: concurrent readers see a whole row or none.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use thiserror::Error;

use crate::utility::timestamp;

/// Errors raised by the reading log
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid timestamp '{value}' in reading log: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// One temperature sample. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reading {
    /// Local wall-clock time, second resolution
    #[serde(with = "timestamp::local_seconds")]
    #[schemars(with = "String")]
    pub timestamp: NaiveDateTime,
    /// Temperature in °C
    pub temperature: f32,
    /// Whether the rate of change exceeded the threshold
    pub anomaly: bool,
    /// Rate of change since the previous sample in °C/s
    pub rate_of_change: f64,
}

/// Summary of the readings in a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Statistics {
    pub count: usize,
    pub min: f32,
    pub max: f32,
    #[serde(rename = "avg")]
    pub mean: f64,
    /// Sample standard deviation, 0 with a single reading
    pub stdev: f64,
    #[serde(rename = "anomalies")]
    pub anomaly_count: usize,
}

impl Statistics {
    /// Summarize `readings`, or `None` when there are none
    pub fn from_readings(readings: &[Reading]) -> Option<Self> {
        let first = readings.first()?;
        let count = readings.len();

        let mut min = first.temperature;
        let mut max = first.temperature;
        let mut sum = 0.0;
        let mut anomaly_count = 0;
        for reading in readings {
            min = min.min(reading.temperature);
            max = max.max(reading.temperature);
            sum += f64::from(reading.temperature);
            if reading.anomaly {
                anomaly_count += 1;
            }
        }
        let mean = sum / count as f64;

        let stdev = if count > 1 {
            let squares: f64 = readings
                .iter()
                .map(|r| (f64::from(r.temperature) - mean).powi(2))
                .sum();
            (squares / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            min,
            max,
            mean,
            stdev,
            anomaly_count,
        })
    }
}

/// Persistent, append-only log of readings
#[async_trait]
pub trait ReadingLog: Send + Sync + 'static {
    /// Append one reading
    async fn append(&self, reading: &Reading) -> Result<(), StoreError>;

    /// The `n` most recent readings, oldest first
    async fn latest(&self, n: u32) -> Result<Vec<Reading>, StoreError>;

    /// Every reading at or after `since`, oldest first
    async fn in_range(&self, since: NaiveDateTime) -> Result<Vec<Reading>, StoreError>;

    /// Statistics over every reading at or after `since`, `None` when there are none
    async fn aggregate(&self, since: NaiveDateTime) -> Result<Option<Statistics>, StoreError> {
        let readings = self.in_range(since).await?;
        Ok(Statistics::from_readings(&readings))
    }

    /// The most recent reading
    async fn current(&self) -> Result<Option<Reading>, StoreError> {
        Ok(self.latest(1).await?.pop())
    }
}

type ReadingRow = (String, f64, bool, f64);

fn to_reading((ts, temperature, anomaly, rate_of_change): ReadingRow) -> Result<Reading, StoreError> {
    let timestamp =
        timestamp::parse(&ts).map_err(|source| StoreError::Timestamp { value: ts, source })?;
    Ok(Reading {
        timestamp,
        temperature: temperature as f32,
        anomaly,
        rate_of_change,
    })
}

/// Reading log stored in a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteReadingLog {
    pool: Pool<Sqlite>,
}

impl SqliteReadingLog {
    /// Open (creating if needed) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;
        info!("Reading log opened at {}", path.display());
        Self::with_pool(pool).await
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self, StoreError> {
        // Each in-memory connection is its own database, so keep exactly one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    /// Use an existing pool, creating the schema if needed
    pub async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS temperature_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                temperature REAL NOT NULL,
                anomaly BOOLEAN DEFAULT FALSE,
                rate_of_change REAL DEFAULT 0
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_timestamp ON temperature_readings(timestamp DESC)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl ReadingLog for SqliteReadingLog {
    async fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO temperature_readings (timestamp, temperature, anomaly, rate_of_change) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(timestamp::format(&reading.timestamp))
        .bind(f64::from(reading.temperature))
        .bind(reading.anomaly)
        .bind(reading.rate_of_change)
        .execute(&self.pool)
        .await?;
        debug!(
            "Stored reading {:.2}°C at {}",
            reading.temperature, reading.timestamp
        );
        Ok(())
    }

    async fn latest(&self, n: u32) -> Result<Vec<Reading>, StoreError> {
        let rows: Vec<ReadingRow> = sqlx::query_as(
            "SELECT timestamp, temperature, anomaly, rate_of_change \
             FROM temperature_readings \
             ORDER BY timestamp DESC, id DESC \
             LIMIT ?",
        )
        .bind(i64::from(n))
        .fetch_all(&self.pool)
        .await?;

        let mut readings = rows
            .into_iter()
            .map(to_reading)
            .collect::<Result<Vec<_>, _>>()?;
        readings.reverse();
        Ok(readings)
    }

    async fn in_range(&self, since: NaiveDateTime) -> Result<Vec<Reading>, StoreError> {
        let rows: Vec<ReadingRow> = sqlx::query_as(
            "SELECT timestamp, temperature, anomaly, rate_of_change \
             FROM temperature_readings \
             WHERE timestamp >= ? \
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(timestamp::format(&since))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(to_reading).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(ts: &str, temperature: f32, anomaly: bool) -> Reading {
        Reading {
            timestamp: timestamp::parse(ts).unwrap(),
            temperature,
            anomaly,
            rate_of_change: 0.0,
        }
    }

    #[test]
    fn test_statistics_single_sample() {
        let stats = Statistics::from_readings(&[reading("2025-01-01 00:00:00", 21.5, false)])
            .unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.stdev, 0.0);
        assert_eq!(stats.min, 21.5);
        assert_eq!(stats.max, 21.5);
    }

    #[test]
    fn test_statistics_sample_stdev() {
        let readings = [
            reading("2025-01-01 00:00:00", 2.0, false),
            reading("2025-01-01 00:00:05", 4.0, true),
            reading("2025-01-01 00:00:10", 4.0, false),
            reading("2025-01-01 00:00:15", 4.0, false),
            reading("2025-01-01 00:00:20", 5.0, false),
            reading("2025-01-01 00:00:25", 5.0, true),
            reading("2025-01-01 00:00:30", 7.0, false),
            reading("2025-01-01 00:00:35", 9.0, false),
        ];
        let stats = Statistics::from_readings(&readings).unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.mean, 5.0);
        // sum of squares 32, n - 1 = 7
        assert!((stats.stdev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.anomaly_count, 2);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_statistics_empty() {
        assert!(Statistics::from_readings(&[]).is_none());
    }

    #[test]
    fn test_statistics_field_names() {
        let stats = Statistics::from_readings(&[reading("2025-01-01 00:00:00", 20.0, true)])
            .unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["avg"], 20.0);
        assert_eq!(json["anomalies"], 1);
    }

    #[tokio::test]
    async fn test_latest_is_chronological() {
        let log = SqliteReadingLog::in_memory().await.unwrap();
        log.append(&reading("2025-01-01 10:00:00", 20.0, false))
            .await
            .unwrap();
        log.append(&reading("2025-01-01 10:00:05", 21.0, false))
            .await
            .unwrap();
        log.append(&reading("2025-01-01 10:00:10", 22.0, false))
            .await
            .unwrap();

        let latest = log.latest(3).await.unwrap();
        let temps: Vec<f32> = latest.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![20.0, 21.0, 22.0]);

        let last_two = log.latest(2).await.unwrap();
        assert_eq!(last_two[0].temperature, 21.0);
        assert_eq!(log.current().await.unwrap().unwrap().temperature, 22.0);
    }

    #[tokio::test]
    async fn test_in_range_and_aggregate() {
        let log = SqliteReadingLog::in_memory().await.unwrap();
        log.append(&reading("2025-01-01 08:00:00", 10.0, false))
            .await
            .unwrap();
        log.append(&reading("2025-01-01 12:00:00", 20.0, true))
            .await
            .unwrap();

        let since = timestamp::parse("2025-01-01 11:00:00").unwrap();
        let recent = log.in_range(since).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].anomaly);

        let stats = log.aggregate(since).await.unwrap().unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.stdev, 0.0);

        let future = timestamp::parse("2030-01-01 00:00:00").unwrap();
        assert!(log.aggregate(future).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_log() {
        let log = SqliteReadingLog::in_memory().await.unwrap();
        assert!(log.current().await.unwrap().is_none());
        assert!(log.latest(10).await.unwrap().is_empty());
    }
}

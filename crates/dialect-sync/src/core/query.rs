//! What a querier reads and how it bounds each poll.
//!
//! [`QuerySource`] names the table or user query. [`QueryMode`] decides the
//! WHERE clause and its parameters, and [`SourceOffset`] is the watermark
//! that moves forward as rows are read.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::identifier::TableId;
use super::schema::Record;
use super::value::SqlValue;
use crate::error::{Result, SyncError};

/// Table or user query. Exactly one is present by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuerySource {
    Table(TableId),
    Query(String),
}

impl QuerySource {
    /// Build from the two optional config values.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` unless exactly one of `table` and `query`
    /// is present.
    pub fn from_parts(table: Option<TableId>, query: Option<String>) -> Result<Self> {
        match (table, query) {
            (Some(t), None) => Ok(QuerySource::Table(t)),
            (None, Some(q)) if !q.trim().is_empty() => Ok(QuerySource::Query(q)),
            (None, Some(_)) => Err(SyncError::Config("Query text cannot be empty".into())),
            (Some(_), Some(_)) => Err(SyncError::Config(
                "Only one of table and query may be set".into(),
            )),
            (None, None) => Err(SyncError::Config(
                "One of table and query must be set".into(),
            )),
        }
    }

    /// Display name used for ordering and logging.
    pub fn name(&self) -> String {
        match self {
            QuerySource::Table(t) => t.to_string(),
            QuerySource::Query(q) => q.clone(),
        }
    }
}

/// Incremental query mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
    /// Read everything on each poll.
    Bulk,
    /// Rows with a strictly larger id than the last one seen.
    Incrementing { column: String },
    /// Rows whose timestamp (first non-null of `columns`) lies between the
    /// last one seen and `now - delay`.
    Timestamp {
        columns: Vec<String>,
        delay: Duration,
    },
    /// Timestamp ordering with an incrementing id to break ties.
    TimestampIncrementing {
        columns: Vec<String>,
        incrementing: String,
        delay: Duration,
    },
}

impl QueryMode {
    pub fn name(&self) -> &'static str {
        match self {
            QueryMode::Bulk => "bulk",
            QueryMode::Incrementing { .. } => "incrementing",
            QueryMode::Timestamp { .. } => "timestamp",
            QueryMode::TimestampIncrementing { .. } => "timestamp+incrementing",
        }
    }

    /// Statement parameters for the next poll, in placeholder order.
    pub fn bind_params(&self, offset: &SourceOffset, now: NaiveDateTime) -> Vec<SqlValue<'static>> {
        match self {
            QueryMode::Bulk => Vec::new(),
            QueryMode::Incrementing { .. } => vec![SqlValue::I64(offset.incrementing_or_default())],
            QueryMode::Timestamp { delay, .. } => vec![
                SqlValue::DateTime(offset.timestamp_or_default()),
                SqlValue::DateTime(end_of_window(now, *delay)),
            ],
            QueryMode::TimestampIncrementing { delay, .. } => {
                let ts = offset.timestamp_or_default();
                vec![
                    SqlValue::DateTime(end_of_window(now, *delay)),
                    SqlValue::DateTime(ts),
                    SqlValue::I64(offset.incrementing_or_default()),
                    SqlValue::DateTime(ts),
                ]
            }
        }
    }

    /// Move the offset past `record`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Precondition` if a mode column is missing from the
    /// record or holds a value that cannot serve as an offset.
    pub fn advance(&self, offset: &mut SourceOffset, record: &Record) -> Result<()> {
        match self {
            QueryMode::Bulk => Ok(()),
            QueryMode::Incrementing { column } => {
                offset.incrementing = Some(extract_incrementing(record, column)?);
                Ok(())
            }
            QueryMode::Timestamp { columns, .. } => {
                offset.timestamp = Some(extract_timestamp(record, columns)?);
                Ok(())
            }
            QueryMode::TimestampIncrementing {
                columns,
                incrementing,
                ..
            } => {
                offset.timestamp = Some(extract_timestamp(record, columns)?);
                offset.incrementing = Some(extract_incrementing(record, incrementing)?);
                Ok(())
            }
        }
    }
}

fn end_of_window(now: NaiveDateTime, delay: Duration) -> NaiveDateTime {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(now)
}

fn extract_incrementing(record: &Record, column: &str) -> Result<i64> {
    let value = record.get(column).ok_or_else(|| {
        SyncError::precondition(format!("Incrementing column '{}' not in result", column))
    })?;
    value.as_i64().ok_or_else(|| {
        SyncError::precondition(format!(
            "Incrementing column '{}' holds a non-integer value",
            column
        ))
    })
}

fn extract_timestamp(record: &Record, columns: &[String]) -> Result<NaiveDateTime> {
    for column in columns {
        let value = record.get(column).ok_or_else(|| {
            SyncError::precondition(format!("Timestamp column '{}' not in result", column))
        })?;
        if let Some(ts) = value.as_datetime() {
            return Ok(ts);
        }
    }
    Err(SyncError::precondition(format!(
        "All timestamp columns are null or non-temporal: {}",
        columns.join(", ")
    )))
}

/// Watermark of what has been read so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOffset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incrementing: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

impl SourceOffset {
    pub fn incrementing_or_default(&self) -> i64 {
        self.incrementing.unwrap_or(-1)
    }

    pub fn timestamp_or_default(&self) -> NaiveDateTime {
        self.timestamp.unwrap_or_else(epoch)
    }
}

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

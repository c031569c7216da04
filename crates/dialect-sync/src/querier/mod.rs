//! Incremental table and query polling.
//!
//! A [`TableQuerier`] owns one connection, one prepared statement and at most
//! one open cursor. Each poll cycle runs
//! `Idle → Preparing → Executing → Streaming → Closing → Idle`:
//!
//! - [`TableQuerier::maybe_start_query`] prepares (or reuses) the statement
//!   and opens a cursor, unless one is already open.
//! - [`TableQuerier::next_record`] reads from the open cursor and moves the
//!   offset forward.
//! - [`TableQuerier::close`] tears down the cursor and schema and records the
//!   poll time.
//!
//! The prepared statement survives across cycles. It is rebuilt once when the
//! dialect recognises a stale-plan error, and released at shutdown.
//!
//! Queriers order by `(last_update, name)` so that [`PollQueue`] always
//! hands out the least recently polled one.

mod convert;
mod queue;

pub use convert::{column_type, row_to_record, schema_from_metadata, SourceRecord};
pub use queue::PollQueue;

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::core::catalog::{DialectRegistry, ResolvedDialect};
use crate::core::query::{QueryMode, QuerySource, SourceOffset};
use crate::core::schema::RecordSchema;
use crate::core::traits::{Connection, Dialect, ResultCursor};
use crate::core::value::SqlValue;
use crate::error::{Result, SyncError};

/// Poll-cycle state of a querier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerierState {
    Idle,
    Preparing,
    Executing,
    Streaming,
    Closing,
}

/// Incremental poller for one table or user query.
pub struct TableQuerier<C: Connection> {
    conn: C,
    resolved: Arc<ResolvedDialect>,
    source: QuerySource,
    mode: QueryMode,
    name: String,
    statement: Option<C::Statement>,
    cursor: Option<C::Cursor>,
    schema: Option<Arc<RecordSchema>>,
    offset: SourceOffset,
    /// Milliseconds since the epoch of the last completed poll.
    last_update: i64,
    state: QuerierState,
    statements_prepared: u64,
}

impl<C: Connection> TableQuerier<C> {
    /// Create a querier over an already resolved dialect.
    ///
    /// Table names are truncated to the connection's identifier limit.
    pub fn new(
        conn: C,
        resolved: Arc<ResolvedDialect>,
        source: QuerySource,
        mode: QueryMode,
        offset: SourceOffset,
    ) -> Self {
        let source = match source {
            QuerySource::Table(t) => QuerySource::Table(t.truncated(resolved.max_identifier_length)),
            q @ QuerySource::Query(_) => q,
        };
        let name = source.name();
        Self {
            conn,
            resolved,
            source,
            mode,
            name,
            statement: None,
            cursor: None,
            schema: None,
            offset,
            last_update: 0,
            state: QuerierState::Idle,
            statements_prepared: 0,
        }
    }

    /// Resolve the dialect through `registry`, then create the querier.
    ///
    /// # Errors
    ///
    /// Propagates a failure to identify the database product.
    pub async fn connect(
        registry: &DialectRegistry,
        mut conn: C,
        source: QuerySource,
        mode: QueryMode,
        offset: SourceOffset,
    ) -> Result<Self> {
        let resolved = registry.resolve(&mut conn).await?;
        Ok(Self::new(conn, resolved, source, mode, offset))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    pub fn mode(&self) -> &QueryMode {
        &self.mode
    }

    pub fn state(&self) -> QuerierState {
        self.state
    }

    pub fn offset(&self) -> &SourceOffset {
        &self.offset
    }

    pub fn dialect(&self) -> &ResolvedDialect {
        &self.resolved
    }

    /// Watermark of the last completed poll, in epoch milliseconds.
    pub fn last_update(&self) -> i64 {
        self.last_update
    }

    /// Schema of the open cursor, if any.
    pub fn schema(&self) -> Option<&Arc<RecordSchema>> {
        self.schema.as_ref()
    }

    pub fn has_open_cursor(&self) -> bool {
        self.cursor.is_some()
    }

    /// Number of times a statement has been prepared, rebuilds included.
    pub fn statements_prepared(&self) -> u64 {
        self.statements_prepared
    }

    /// Open a cursor for this poll cycle unless one is already open.
    ///
    /// Returns `true` when a new cursor was opened. A stale-plan error is
    /// answered by rebuilding the statement once; a second failure of any
    /// kind is returned as is.
    ///
    /// # Errors
    ///
    /// Propagates execution failures and `SyncError::UnsupportedType` when the
    /// result has a column with no canonical type.
    pub async fn maybe_start_query(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if self.cursor.is_some() {
            return Ok(false);
        }

        self.state = QuerierState::Preparing;
        let params = self.mode.bind_params(&self.offset, now.naive_utc());
        let cursor = match self.execute_query(&params).await {
            Ok(cursor) => cursor,
            Err(e) if self.resolved.dialect.is_stale_statement_error(&e) => {
                info!("Prepared statement for {} is stale, rebuilding: {}", self.name, e);
                self.discard_statement().await;
                self.state = QuerierState::Preparing;
                match self.execute_query(&params).await {
                    Ok(cursor) => cursor,
                    Err(e) => {
                        self.state = QuerierState::Idle;
                        return Err(e);
                    }
                }
            }
            Err(e) => {
                self.state = QuerierState::Idle;
                return Err(e);
            }
        };

        match schema_from_metadata(&self.resolved.dialect, &self.name, cursor.columns()) {
            Ok(schema) => {
                self.schema = Some(Arc::new(schema));
                self.cursor = Some(cursor);
                self.state = QuerierState::Streaming;
                Ok(true)
            }
            Err(e) => {
                let mut cursor = cursor;
                if let Err(close_err) = cursor.close().await {
                    warn!("Failed to close cursor for {}: {}", self.name, close_err);
                }
                self.state = QuerierState::Idle;
                Err(e)
            }
        }
    }

    async fn execute_query(&mut self, params: &[SqlValue<'_>]) -> Result<C::Cursor> {
        if self.statement.is_none() {
            let sql = self.resolved.dialect.build_select(&self.source, &self.mode);
            debug!("Preparing {} query for {}: {}", self.mode.name(), self.name, sql);
            let statement = self.conn.prepare(&sql).await?;
            self.statements_prepared += 1;
            self.statement = Some(statement);
        }

        self.state = QuerierState::Executing;
        let statement = self
            .statement
            .as_ref()
            .ok_or_else(|| SyncError::precondition("statement missing after prepare"))?;
        self.conn.query(statement, params).await
    }

    async fn discard_statement(&mut self) {
        if let Some(statement) = self.statement.take() {
            if let Err(e) = self.conn.close_statement(statement).await {
                warn!("Failed to close statement for {}: {}", self.name, e);
            }
        }
    }

    /// Read the next record from the open cursor.
    ///
    /// Returns `Ok(None)` when the cursor is exhausted. On any error the
    /// cursor is released before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Precondition` when no cursor is open.
    pub async fn next_record(&mut self) -> Result<Option<SourceRecord>> {
        let (Some(cursor), Some(schema)) = (self.cursor.as_mut(), self.schema.as_ref()) else {
            return Err(SyncError::precondition(format!(
                "next_record called on {} with no open cursor",
                self.name
            )));
        };

        let result = match cursor.next_row().await {
            Ok(Some(values)) => row_to_record(schema, values).and_then(|record| {
                self.mode.advance(&mut self.offset, &record)?;
                Ok(Some(record))
            }),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(record)) => Ok(Some(SourceRecord {
                source: self.name.clone(),
                record,
                offset: self.offset.clone(),
            })),
            Ok(None) => Ok(None),
            Err(e) => {
                self.release_cursor().await;
                self.state = QuerierState::Idle;
                Err(e)
            }
        }
    }

    async fn release_cursor(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            if let Err(e) = cursor.close().await {
                warn!("Failed to close cursor for {}: {}", self.name, e);
            }
        }
        self.schema = None;
    }

    /// End the poll cycle. Safe to call with no open cursor.
    ///
    /// The watermark never moves backwards.
    ///
    /// # Errors
    ///
    /// Returns a failure to close the cursor, after the querier has been
    /// reset anyway.
    pub async fn close(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.state = QuerierState::Closing;
        let result = match self.cursor.take() {
            Some(mut cursor) => cursor.close().await,
            None => Ok(()),
        };
        self.schema = None;
        self.last_update = self.last_update.max(now.timestamp_millis());
        self.state = QuerierState::Idle;
        result
    }

    /// Run one poll: open a cursor if needed and read up to `max_rows`.
    ///
    /// The cycle is closed when the cursor runs dry or fails, so the next
    /// call starts a fresh query; otherwise reading resumes where it stopped.
    ///
    /// # Errors
    ///
    /// Propagates query and conversion failures.
    pub async fn poll(&mut self, now: DateTime<Utc>, max_rows: usize) -> Result<Vec<SourceRecord>> {
        if let Err(e) = self.maybe_start_query(now).await {
            self.close_after_error(now).await;
            return Err(e);
        }

        let mut records = Vec::new();
        while records.len() < max_rows {
            match self.next_record().await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {
                    self.close(now).await?;
                    break;
                }
                Err(e) => {
                    self.close_after_error(now).await;
                    return Err(e);
                }
            }
        }
        debug!("Polled {} records from {}", records.len(), self.name);
        Ok(records)
    }

    /// Close the cycle after a failed read; the read error is what the
    /// caller sees, so a release failure is only logged.
    async fn close_after_error(&mut self, now: DateTime<Utc>) {
        if let Err(e) = self.close(now).await {
            warn!("Failed to close cursor for {}: {}", self.name, e);
        }
    }

    /// Release the cursor and the prepared statement, from any state.
    ///
    /// # Errors
    ///
    /// Returns the first release failure; both releases are attempted.
    pub async fn shutdown(mut self) -> Result<()> {
        let cursor_result = match self.cursor.take() {
            Some(mut cursor) => cursor.close().await,
            None => Ok(()),
        };
        self.schema = None;
        let statement_result = match self.statement.take() {
            Some(statement) => self.conn.close_statement(statement).await,
            None => Ok(()),
        };
        self.state = QuerierState::Idle;
        debug!("Shut down querier for {}", self.name);
        cursor_result.and(statement_result)
    }

    fn sort_key(&self) -> (i64, &str) {
        (self.last_update, &self.name)
    }
}

impl<C: Connection> std::fmt::Debug for TableQuerier<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableQuerier")
            .field("name", &self.name)
            .field("mode", &self.mode.name())
            .field("state", &self.state)
            .field("last_update", &self.last_update)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<C: Connection> PartialEq for TableQuerier<C> {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl<C: Connection> Eq for TableQuerier<C> {}

impl<C: Connection> PartialOrd for TableQuerier<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C: Connection> Ord for TableQuerier<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

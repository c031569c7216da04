//! Scripted in-memory connection for driving the querier without a database.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dialect_sync::core::traits::ProductInfo;
use dialect_sync::{ColumnMetadata, Connection, ResultCursor, Result, SqlValue, SyncError};

pub const STALE_PLAN: &str = "cached plan must not change result type";

/// What the identifier-length probe answers.
#[derive(Debug, Clone, Copy)]
pub enum Probe {
    Value(i64),
    Empty,
    Fail,
}

/// One scripted row: values, or an error message raised while reading it.
pub type ScriptRow = std::result::Result<Vec<SqlValue<'static>>, String>;

/// Outcome of one `query` call.
pub type ScriptQuery = std::result::Result<Vec<ScriptRow>, String>;

/// Everything the connection was asked to do.
#[derive(Debug, Default)]
pub struct CallLog {
    pub product_calls: usize,
    pub probe_calls: usize,
    pub prepared: Vec<String>,
    pub statements_closed: usize,
    pub queries: Vec<Vec<SqlValue<'static>>>,
    pub executed: Vec<Vec<SqlValue<'static>>>,
    pub cursors_closed: usize,
}

pub struct ScriptedConnection {
    pub key: String,
    pub product: String,
    pub probe: Probe,
    pub columns: Vec<ColumnMetadata>,
    pub script: VecDeque<ScriptQuery>,
    pub log: Arc<Mutex<CallLog>>,
    pub cursor_close_fails: bool,
    next_statement: u64,
}

impl ScriptedConnection {
    pub fn new(key: &str, product: &str) -> Self {
        Self {
            key: key.to_string(),
            product: product.to_string(),
            probe: Probe::Empty,
            columns: Vec::new(),
            script: VecDeque::new(),
            log: Arc::new(Mutex::new(CallLog::default())),
            cursor_close_fails: false,
            next_statement: 0,
        }
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnMetadata>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_failing_cursor_close(mut self) -> Self {
        self.cursor_close_fails = true;
        self
    }

    pub fn then(mut self, outcome: ScriptQuery) -> Self {
        self.script.push_back(outcome);
        self
    }

    pub fn log(&self) -> Arc<Mutex<CallLog>> {
        Arc::clone(&self.log)
    }
}

fn db_error(message: String) -> SyncError {
    SyncError::Database {
        message,
        code: Some("0A000".into()),
    }
}

#[derive(Debug)]
pub struct ScriptedStatement {
    pub id: u64,
    pub sql: String,
}

pub struct ScriptedCursor {
    columns: Vec<ColumnMetadata>,
    rows: VecDeque<ScriptRow>,
    log: Arc<Mutex<CallLog>>,
    close_fails: bool,
}

#[async_trait]
impl Connection for ScriptedConnection {
    type Statement = ScriptedStatement;
    type Cursor = ScriptedCursor;

    fn connection_key(&self) -> &str {
        &self.key
    }

    async fn product_info(&mut self) -> Result<ProductInfo> {
        self.log.lock().unwrap().product_calls += 1;
        Ok(ProductInfo {
            name: self.product.clone(),
            version: "1.0".into(),
        })
    }

    async fn prepare(&mut self, sql: &str) -> Result<ScriptedStatement> {
        self.log.lock().unwrap().prepared.push(sql.to_string());
        self.next_statement += 1;
        Ok(ScriptedStatement {
            id: self.next_statement,
            sql: sql.to_string(),
        })
    }

    async fn query(
        &mut self,
        _statement: &ScriptedStatement,
        params: &[SqlValue<'_>],
    ) -> Result<ScriptedCursor> {
        self.log
            .lock()
            .unwrap()
            .queries
            .push(params.iter().cloned().map(SqlValue::into_owned).collect());
        match self.script.pop_front().unwrap_or_else(|| Ok(Vec::new())) {
            Ok(rows) => Ok(ScriptedCursor {
                columns: self.columns.clone(),
                rows: rows.into(),
                log: Arc::clone(&self.log),
                close_fails: self.cursor_close_fails,
            }),
            Err(message) => Err(db_error(message)),
        }
    }

    async fn execute(
        &mut self,
        _statement: &ScriptedStatement,
        params: &[SqlValue<'_>],
    ) -> Result<u64> {
        self.log
            .lock()
            .unwrap()
            .executed
            .push(params.iter().cloned().map(SqlValue::into_owned).collect());
        Ok(1)
    }

    async fn query_scalar(&mut self, _sql: &str) -> Result<Option<i64>> {
        self.log.lock().unwrap().probe_calls += 1;
        match self.probe {
            Probe::Value(v) => Ok(Some(v)),
            Probe::Empty => Ok(None),
            Probe::Fail => Err(db_error("permission denied for probe".into())),
        }
    }

    async fn close_statement(&mut self, _statement: ScriptedStatement) -> Result<()> {
        self.log.lock().unwrap().statements_closed += 1;
        Ok(())
    }
}

#[async_trait]
impl ResultCursor for ScriptedCursor {
    fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Vec<SqlValue<'static>>>> {
        match self.rows.pop_front() {
            None => Ok(None),
            Some(Ok(values)) => Ok(Some(values)),
            Some(Err(message)) => Err(db_error(message)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().cursors_closed += 1;
        if self.close_fails {
            return Err(db_error("connection reset while closing portal".into()));
        }
        Ok(())
    }
}

//! Live PostgreSQL connection over `tokio-postgres`.

use std::error::Error as StdError;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use futures::StreamExt;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::{Client, NoTls, Row, RowStream, Statement};
use tracing::{debug, warn};

use crate::config::sanitize_url;
use crate::core::schema::{ColumnMetadata, Nullability, SqlTypeCode};
use crate::core::traits::{Connection, ProductInfo, ResultCursor};
use crate::core::value::{SqlNullType, SqlValue};
use crate::error::{Result, SyncError};

/// A single PostgreSQL connection owned by one querier.
pub struct PgConnection {
    client: Client,
    key: String,
    driver: JoinHandle<()>,
}

impl PgConnection {
    /// Connect with a `postgres://` URL or key/value connection string.
    pub async fn connect(url: &str) -> Result<Self> {
        let key = sanitize_url(url);
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
        let task_key = key.clone();
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection {} closed with error: {}", task_key, e);
            }
        });
        debug!("Connected to {}", key);
        Ok(Self {
            client,
            key,
            driver,
        })
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[async_trait]
impl Connection for PgConnection {
    type Statement = Statement;
    type Cursor = PgCursor;

    fn connection_key(&self) -> &str {
        &self.key
    }

    async fn product_info(&mut self) -> Result<ProductInfo> {
        let row = self.client.query_one("SELECT version()", &[]).await?;
        let banner: String = row.try_get(0)?;
        Ok(parse_version_banner(&banner))
    }

    async fn prepare(&mut self, sql: &str) -> Result<Statement> {
        Ok(self.client.prepare(sql).await?)
    }

    async fn query(&mut self, statement: &Statement, params: &[SqlValue<'_>]) -> Result<PgCursor> {
        let params = bind(statement, params)?;
        let columns: Vec<ColumnMetadata> = statement
            .columns()
            .iter()
            .map(|c| ColumnMetadata::new(c.name(), type_code(c.type_()), Nullability::Unknown))
            .collect();
        let types: Vec<Type> = statement.columns().iter().map(|c| c.type_().clone()).collect();
        let stream = self
            .client
            .query_raw(statement, params.iter().map(|p| p as &(dyn ToSql + Sync)))
            .await?;
        Ok(PgCursor {
            columns,
            types,
            stream: Box::pin(stream),
        })
    }

    async fn execute(&mut self, statement: &Statement, params: &[SqlValue<'_>]) -> Result<u64> {
        let params = bind(statement, params)?;
        Ok(self
            .client
            .execute_raw(statement, params.iter().map(|p| p as &(dyn ToSql + Sync)))
            .await?)
    }

    async fn query_scalar(&mut self, sql: &str) -> Result<Option<i64>> {
        let rows = self.client.query(sql, &[]).await?;
        match rows.first() {
            Some(row) if !row.is_empty() => scalar_i64(row),
            _ => Ok(None),
        }
    }
}

/// Open PostgreSQL result stream.
pub struct PgCursor {
    columns: Vec<ColumnMetadata>,
    types: Vec<Type>,
    stream: Pin<Box<RowStream>>,
}

#[async_trait]
impl ResultCursor for PgCursor {
    fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Vec<SqlValue<'static>>>> {
        match self.stream.next().await {
            None => Ok(None),
            Some(row) => {
                let row = row?;
                let values = self
                    .types
                    .iter()
                    .enumerate()
                    .map(|(idx, ty)| decode_value(&row, idx, ty))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(values))
            }
        }
    }
}

fn bind<'a>(statement: &Statement, params: &'a [SqlValue<'a>]) -> Result<Vec<PgParam<'a>>> {
    if statement.params().len() != params.len() {
        return Err(SyncError::precondition(format!(
            "Statement expects {} parameters, got {}",
            statement.params().len(),
            params.len()
        )));
    }
    Ok(params.iter().map(PgParam).collect())
}

/// "PostgreSQL 16.2 on x86_64-pc-linux-gnu, ..." → ("PostgreSQL", "16.2").
fn parse_version_banner(banner: &str) -> ProductInfo {
    let mut parts = banner.split_whitespace();
    let name = parts.next().unwrap_or("PostgreSQL").to_string();
    let version = parts
        .next()
        .unwrap_or_default()
        .trim_end_matches(',')
        .to_string();
    ProductInfo { name, version }
}

/// Map a PostgreSQL type to its canonical type family.
pub(crate) fn type_code(ty: &Type) -> SqlTypeCode {
    match *ty {
        Type::BOOL => SqlTypeCode::Boolean,
        Type::CHAR => SqlTypeCode::TinyInt,
        Type::INT2 => SqlTypeCode::SmallInt,
        Type::INT4 => SqlTypeCode::Integer,
        Type::INT8 => SqlTypeCode::BigInt,
        Type::FLOAT4 => SqlTypeCode::Real,
        Type::FLOAT8 => SqlTypeCode::Double,
        Type::NUMERIC => SqlTypeCode::Numeric,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => SqlTypeCode::Char,
        // JSON documents are read as their text form.
        Type::JSON | Type::JSONB => SqlTypeCode::Char,
        Type::BYTEA => SqlTypeCode::Binary,
        Type::DATE => SqlTypeCode::Date,
        Type::TIME => SqlTypeCode::Time,
        Type::TIMESTAMP => SqlTypeCode::Timestamp,
        Type::TIMESTAMPTZ => SqlTypeCode::TimestampTz,
        _ => SqlTypeCode::Other(ty.name().to_string()),
    }
}

/// Decode one cell. NULLs keep a type hint; types without a canonical
/// counterpart are an error.
fn decode_value(row: &Row, idx: usize, ty: &Type) -> Result<SqlValue<'static>> {
    fn cell<'r, T, F>(row: &'r Row, idx: usize, null: SqlNullType, wrap: F) -> Result<SqlValue<'static>>
    where
        T: tokio_postgres::types::FromSql<'r>,
        F: FnOnce(T) -> SqlValue<'static>,
    {
        Ok(row
            .try_get::<_, Option<T>>(idx)?
            .map_or(SqlValue::Null(null), wrap))
    }

    match *ty {
        Type::BOOL => cell::<bool, _>(row, idx, SqlNullType::Bool, SqlValue::Bool),
        Type::CHAR => cell::<i8, _>(row, idx, SqlNullType::I8, SqlValue::I8),
        Type::INT2 => cell::<i16, _>(row, idx, SqlNullType::I16, SqlValue::I16),
        Type::INT4 => cell::<i32, _>(row, idx, SqlNullType::I32, SqlValue::I32),
        Type::INT8 => cell::<i64, _>(row, idx, SqlNullType::I64, SqlValue::I64),
        Type::FLOAT4 => cell::<f32, _>(row, idx, SqlNullType::F32, SqlValue::F32),
        Type::FLOAT8 => cell::<f64, _>(row, idx, SqlNullType::F64, SqlValue::F64),
        Type::NUMERIC => cell::<Decimal, _>(row, idx, SqlNullType::Decimal, SqlValue::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            cell::<String, _>(row, idx, SqlNullType::String, SqlValue::text_owned)
        }
        Type::JSON | Type::JSONB => {
            cell::<serde_json::Value, _>(row, idx, SqlNullType::String, |v| {
                SqlValue::text_owned(v.to_string())
            })
        }
        Type::BYTEA => cell::<Vec<u8>, _>(row, idx, SqlNullType::Bytes, SqlValue::bytes_owned),
        Type::DATE => cell::<NaiveDate, _>(row, idx, SqlNullType::Date, SqlValue::Date),
        Type::TIME => cell::<NaiveTime, _>(row, idx, SqlNullType::Time, SqlValue::Time),
        Type::TIMESTAMP => {
            cell::<NaiveDateTime, _>(row, idx, SqlNullType::DateTime, SqlValue::DateTime)
        }
        Type::TIMESTAMPTZ => cell::<chrono::DateTime<Utc>, _>(row, idx, SqlNullType::DateTime, |v| {
            SqlValue::DateTime(v.naive_utc())
        }),
        _ => Err(SyncError::unsupported(
            row.columns()
                .get(idx)
                .map_or("?", |c| c.name()),
            ty.name(),
        )),
    }
}

fn scalar_i64(row: &Row) -> Result<Option<i64>> {
    let ty = row.columns()[0].type_().clone();
    Ok(match ty {
        Type::INT2 => row.try_get::<_, Option<i16>>(0)?.map(i64::from),
        Type::INT4 => row.try_get::<_, Option<i32>>(0)?.map(i64::from),
        Type::INT8 => row.try_get::<_, Option<i64>>(0)?,
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(0)?
            .and_then(|d| d.to_i64()),
        _ => {
            return Err(SyncError::unsupported(row.columns()[0].name(), ty.name()));
        }
    })
}

/// Parameter wrapper that coerces a value to the statement's declared type.
#[derive(Debug)]
struct PgParam<'a>(&'a SqlValue<'a>);

type BoxError = Box<dyn StdError + Sync + Send>;

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        _ => v.to_sql(ty, out),
    }
}

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self.0 {
            SqlValue::Null(_) => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql(ty, out),
            SqlValue::I8(v) => int_to_sql(i64::from(*v), ty, out),
            SqlValue::I16(v) => int_to_sql(i64::from(*v), ty, out),
            SqlValue::I32(v) => int_to_sql(i64::from(*v), ty, out),
            SqlValue::I64(v) => int_to_sql(*v, ty, out),
            SqlValue::F32(v) if *ty == Type::FLOAT8 => f64::from(*v).to_sql(ty, out),
            SqlValue::F32(v) => v.to_sql(ty, out),
            SqlValue::F64(v) if *ty == Type::FLOAT4 => (*v as f32).to_sql(ty, out),
            SqlValue::F64(v) => v.to_sql(ty, out),
            SqlValue::Text(s) => {
                let text: &str = s;
                text.to_sql(ty, out)
            }
            SqlValue::Bytes(b) => {
                let bytes: &[u8] = b;
                bytes.to_sql(ty, out)
            }
            SqlValue::Decimal(d) => d.to_sql(ty, out),
            SqlValue::DateTime(dt) if *ty == Type::TIMESTAMPTZ => {
                Utc.from_utc_datetime(dt).to_sql(ty, out)
            }
            SqlValue::DateTime(dt) => dt.to_sql(ty, out),
            SqlValue::Date(d) => d.to_sql(ty, out),
            SqlValue::Time(t) => t.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

//! Generic row materialization for upsert-based ingestion.
//!
//! A [`BatchPlan`] is built once per ingest cycle from the ordered column
//! list and the target dialect. It owns the upsert text and the binding
//! order (key columns, then non-key columns) and is passed explicitly to
//! every conversion call.
//!
//! Duplicate keys within a batch are handled by a [`RowReduction`] policy
//! supplied by the caller; [`UpdateMode`] provides the common ones.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::identifier::TableId;
use crate::core::schema::{partition_columns, ColumnSpec, Record, RecordSchema};
use crate::core::traits::{Connection, Dialect, UpsertKind, UpsertStatement};
use crate::core::value::{SqlNullType, SqlValue};
use crate::error::{Result, SyncError};

/// One parameter row, bound in plan order.
pub type ParamRow = Vec<SqlValue<'static>>;

/// Immutable plan for writing records to one table.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    table: TableId,
    columns: Vec<ColumnSpec>,
    /// Indices into `columns`, keys first.
    bind_order: Vec<usize>,
    key_count: usize,
    upsert: UpsertStatement,
}

impl BatchPlan {
    /// Build the plan for `columns` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Precondition` when the generated statement does
    /// not bind exactly one placeholder per column.
    pub fn new<D: Dialect + ?Sized>(dialect: &D, table: TableId, columns: Vec<ColumnSpec>) -> Result<Self> {
        let (keys, non_keys) = partition_columns(&columns);
        let upsert = dialect.build_upsert(&table, &keys, &non_keys)?;
        let key_count = keys.len();

        let bind_order: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_primary_key)
            .chain(columns.iter().enumerate().filter(|(_, c)| !c.is_primary_key))
            .map(|(i, _)| i)
            .collect();

        if upsert.param_count != bind_order.len() {
            return Err(SyncError::precondition(format!(
                "Upsert for {} binds {} parameters for {} columns",
                table,
                upsert.param_count,
                bind_order.len()
            )));
        }

        Ok(Self {
            table,
            columns,
            bind_order,
            key_count,
            upsert,
        })
    }

    /// Build the plan from a record schema and the names of its key fields.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if a key field is not in the schema.
    pub fn from_schema<D: Dialect + ?Sized>(
        dialect: &D,
        table: TableId,
        schema: &RecordSchema,
        key_fields: &[String],
    ) -> Result<Self> {
        Self::new(dialect, table, schema.column_specs(key_fields)?)
    }

    pub fn table(&self) -> &TableId {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn upsert(&self) -> &UpsertStatement {
        &self.upsert
    }

    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Column names in binding order.
    pub fn bind_names(&self) -> impl Iterator<Item = &str> {
        self.bind_order.iter().map(|&i| self.columns[i].name.as_str())
    }

    /// Key prefix of a materialized row.
    pub fn key_of<'r>(&self, row: &'r [SqlValue<'static>]) -> &'r [SqlValue<'static>] {
        &row[..self.key_count.min(row.len())]
    }

    /// Parameter row for one record.
    ///
    /// A column the record lacks takes its default, or a typed NULL if the
    /// column is optional.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Precondition` for a missing required column or a
    /// NULL in a required column.
    pub fn materialize(&self, record: &Record) -> Result<ParamRow> {
        self.bind_order
            .iter()
            .map(|&i| {
                let column = &self.columns[i];
                let value = match record.get(&column.name) {
                    Some(v) if !v.is_null() => return Ok(v.clone()),
                    Some(v) => Some(v),
                    None => None,
                };
                if let Some(default) = &column.default_value {
                    return Ok(default.clone());
                }
                if column.is_optional {
                    return Ok(value.cloned().unwrap_or_else(|| {
                        SqlValue::Null(SqlNullType::for_column_type(&column.column_type))
                    }));
                }
                Err(SyncError::precondition(format!(
                    "Record for {} has no value for required column '{}'",
                    self.table, column.name
                )))
            })
            .collect()
    }

    /// ALTER statements adding plan columns missing from `existing`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Precondition` if a missing column is required and
    /// has no default, since existing rows could not satisfy it.
    pub fn alter_for_missing<D: Dialect + ?Sized>(
        &self,
        dialect: &D,
        existing: &[String],
    ) -> Result<Vec<String>> {
        let missing: Vec<ColumnSpec> = self
            .columns
            .iter()
            .filter(|c| !existing.iter().any(|e| e == &c.name))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(c) = missing
            .iter()
            .find(|c| !c.is_optional && c.default_value.is_none())
        {
            return Err(SyncError::precondition(format!(
                "Cannot add required column '{}' without a default to {}",
                c.name, self.table
            )));
        }
        dialect.build_alter_table(&self.table, &missing)
    }
}

/// Policy for rows that share a key within one batch.
pub trait RowReduction: Send + Sync {
    fn reduce(&self, plan: &BatchPlan, rows: Vec<ParamRow>) -> Vec<ParamRow>;
}

/// Built-in reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Write every row.
    #[default]
    All,
    /// Keep the first row seen for each key.
    FirstRowOnly,
    /// Keep the last row seen for each key.
    LastRowOnly,
}

impl RowReduction for UpdateMode {
    fn reduce(&self, plan: &BatchPlan, rows: Vec<ParamRow>) -> Vec<ParamRow> {
        if plan.key_count() == 0 {
            return rows;
        }
        match self {
            UpdateMode::All => rows,
            UpdateMode::FirstRowOnly => keep_first(plan, rows),
            UpdateMode::LastRowOnly => {
                let mut kept = keep_first(plan, rows.into_iter().rev().collect());
                kept.reverse();
                kept
            }
        }
    }
}

/// Key prefix usable as a set member.
#[derive(PartialEq, Hash)]
struct RowKey<'r>(&'r [SqlValue<'static>]);

// A NaN key never matches another row, so every such row is kept.
impl Eq for RowKey<'_> {}

fn keep_first(plan: &BatchPlan, rows: Vec<ParamRow>) -> Vec<ParamRow> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(rows.len());
        rows.iter().map(|row| seen.insert(RowKey(plan.key_of(row)))).collect()
    };
    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, first)| first.then_some(row))
        .collect()
}

/// Write `records` with the plan's upsert and return the affected row count.
///
/// The statement is prepared once for the batch.
///
/// # Errors
///
/// Propagates materialization and execution failures unchanged.
pub async fn write_batch<C>(
    conn: &mut C,
    plan: &BatchPlan,
    records: &[Record],
    reduction: &dyn RowReduction,
) -> Result<u64>
where
    C: Connection + ?Sized,
{
    if records.is_empty() {
        return Ok(0);
    }

    let rows = records
        .iter()
        .map(|r| plan.materialize(r))
        .collect::<Result<Vec<_>>>()?;
    let rows = reduction.reduce(plan, rows);

    let statement = conn.prepare(&plan.upsert().sql).await?;
    let mut affected = 0u64;
    let mut result = Ok(());
    for row in &rows {
        match conn.execute(&statement, row).await {
            Ok(n) => affected += n,
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }
    conn.close_statement(statement).await?;
    result?;

    debug!(
        "Wrote {} rows ({} affected) to {}{}",
        rows.len(),
        affected,
        plan.table(),
        if plan.upsert().kind == UpsertKind::InsertOnly {
            " as plain inserts"
        } else {
            ""
        }
    );
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::canonical::{ColumnType, PrimitiveKind};
    use crate::core::schema::FieldSchema;
    use crate::drivers::PostgresDialect;

    fn int() -> ColumnType {
        ColumnType::primitive(PrimitiveKind::Int32)
    }

    fn text() -> ColumnType {
        ColumnType::primitive(PrimitiveKind::String)
    }

    fn plan() -> BatchPlan {
        // Key declared second to check that binding puts keys first.
        BatchPlan::new(
            &PostgresDialect::default(),
            TableId::table("people"),
            vec![
                ColumnSpec::new("name", text()).optional(),
                ColumnSpec::new("id", int()).primary_key(),
                ColumnSpec::new("age", int()).with_default(0),
            ],
        )
        .unwrap()
    }

    fn record(fields: &[(&str, ColumnType)], values: Vec<SqlValue<'static>>) -> Record {
        let schema = RecordSchema::new(
            None,
            fields
                .iter()
                .map(|(n, t)| FieldSchema::new(*n, t.clone(), true))
                .collect(),
        );
        Record {
            schema: Arc::new(schema),
            values,
        }
    }

    #[test]
    fn test_bind_order_is_keys_first() {
        let p = plan();
        assert_eq!(p.bind_names().collect::<Vec<_>>(), vec!["id", "name", "age"]);
        assert_eq!(p.upsert().param_count, 3);
        assert!(p.upsert().sql.starts_with("INSERT INTO \"people\" (\"id\",\"name\",\"age\")"));
    }

    #[test]
    fn test_materialize_fills_defaults_and_nulls() {
        let p = plan();
        let r = record(&[("id", int())], vec![SqlValue::I32(7)]);
        let row = p.materialize(&r).unwrap();
        assert_eq!(row[0], SqlValue::I32(7));
        assert_eq!(row[1], SqlValue::Null(SqlNullType::String));
        assert_eq!(row[2], SqlValue::I32(0));
    }

    #[test]
    fn test_materialize_requires_key() {
        let p = plan();
        let r = record(&[("name", text())], vec![SqlValue::from("x")]);
        assert!(matches!(p.materialize(&r), Err(SyncError::Precondition(_))));
    }

    #[test]
    fn test_update_modes() {
        let p = plan();
        let rows = vec![
            vec![SqlValue::I32(1), SqlValue::from("a"), SqlValue::I32(0)],
            vec![SqlValue::I32(2), SqlValue::from("b"), SqlValue::I32(0)],
            vec![SqlValue::I32(1), SqlValue::from("c"), SqlValue::I32(0)],
        ];

        assert_eq!(UpdateMode::All.reduce(&p, rows.clone()).len(), 3);

        let first = UpdateMode::FirstRowOnly.reduce(&p, rows.clone());
        assert_eq!(first.len(), 2);
        assert_eq!(first[0][1], SqlValue::from("a"));

        let last = UpdateMode::LastRowOnly.reduce(&p, rows);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0][0], SqlValue::I32(2));
        assert_eq!(last[1][1], SqlValue::from("c"));
    }

    #[test]
    fn test_first_row_only_on_large_batch() {
        let p = plan();
        let rows: Vec<ParamRow> = (0..10_000)
            .map(|i| vec![SqlValue::I32(i % 100), SqlValue::from(format!("v{}", i)), SqlValue::I32(i)])
            .collect();

        let first = UpdateMode::FirstRowOnly.reduce(&p, rows.clone());
        assert_eq!(first.len(), 100);
        assert_eq!(first[7][2], SqlValue::I32(7));

        let last = UpdateMode::LastRowOnly.reduce(&p, rows);
        assert_eq!(last.len(), 100);
        assert_eq!(last[0][2], SqlValue::I32(9_900));
        assert_eq!(last[99][2], SqlValue::I32(9_999));
    }

    #[test]
    fn test_alter_for_missing() {
        let p = plan();
        assert!(p
            .alter_for_missing(&PostgresDialect::default(), &["id".into(), "name".into(), "age".into()])
            .unwrap()
            .is_empty());

        let stmts = p
            .alter_for_missing(&PostgresDialect::default(), &["id".into()])
            .unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains("ADD \"name\" TEXT NULL"));
        assert!(stmts[0].contains("ADD \"age\" INT DEFAULT 0"));

        let required = BatchPlan::new(
            &PostgresDialect::default(),
            TableId::table("t"),
            vec![ColumnSpec::new("id", int()).primary_key(), ColumnSpec::new("x", int())],
        )
        .unwrap();
        assert!(required
            .alter_for_missing(&PostgresDialect::default(), &["id".into()])
            .is_err());
    }
}

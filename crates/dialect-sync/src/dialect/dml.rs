//! UPSERT, INSERT and polling SELECT generation.
//!
//! Every statement built here binds its placeholders in a fixed order: key
//! columns first, then non-key columns. Callers materialize parameter rows
//! in the same order (see `ingest::BatchPlan`).

use tracing::warn;

use crate::core::identifier::TableId;
use crate::core::query::{QueryMode, QuerySource};
use crate::core::schema::ColumnSpec;
use crate::core::traits::{Dialect, UpsertKind, UpsertStatement};
use crate::error::{Result, SyncError};

use super::typemap::base_type_name;
use super::{MergeFlavor, UpsertStrategy};

/// Build an upsert in the given strategy.
pub fn upsert<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableId,
    keys: &[&ColumnSpec],
    non_keys: &[&ColumnSpec],
    strategy: UpsertStrategy,
) -> Result<UpsertStatement> {
    if keys.is_empty() && non_keys.is_empty() {
        return Err(SyncError::precondition(format!(
            "Upsert into {} needs at least one column",
            table
        )));
    }
    if let Some(dup) = non_keys
        .iter()
        .find(|n| keys.iter().any(|k| k.name == n.name))
    {
        return Err(SyncError::precondition(format!(
            "Column '{}' is listed as both key and non-key",
            dup.name
        )));
    }

    let param_count = keys.len() + non_keys.len();

    if keys.is_empty() {
        warn!(
            "{}: no key columns for {}, writing plain INSERT without upsert semantics",
            dialect.name(),
            table
        );
        return Ok(UpsertStatement {
            sql: insert(dialect, table, non_keys),
            kind: UpsertKind::InsertOnly,
            param_count,
        });
    }

    let sql = match strategy {
        UpsertStrategy::OnConflict => on_conflict(dialect, table, keys, non_keys),
        UpsertStrategy::OnDuplicateKey => on_duplicate_key(dialect, table, keys, non_keys),
        UpsertStrategy::Merge(flavor) => merge(dialect, table, keys, non_keys, flavor),
        UpsertStrategy::NativeUpsert => native_upsert(dialect, table, keys, non_keys),
    };

    Ok(UpsertStatement {
        sql,
        kind: UpsertKind::Upsert,
        param_count,
    })
}

/// `INSERT INTO t (a,b) VALUES (?,?)`.
pub fn insert<D: Dialect + ?Sized>(dialect: &D, table: &TableId, columns: &[&ColumnSpec]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_table(table),
        quoted_list(dialect, columns.iter().copied(), ","),
        placeholders(dialect, columns.len())
    )
}

fn on_conflict<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableId,
    keys: &[&ColumnSpec],
    non_keys: &[&ColumnSpec],
) -> String {
    let all = keys.iter().chain(non_keys.iter()).copied();
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({})",
        dialect.quote_table(table),
        quoted_list(dialect, all, ","),
        placeholders(dialect, keys.len() + non_keys.len()),
        quoted_list(dialect, keys.iter().copied(), ",")
    );
    if non_keys.is_empty() {
        sql.push_str(" DO NOTHING");
    } else {
        let updates: Vec<String> = non_keys
            .iter()
            .map(|c| {
                let q = dialect.quote_identifier(&c.name);
                format!("{}=EXCLUDED.{}", q, q)
            })
            .collect();
        sql.push_str(" DO UPDATE SET ");
        sql.push_str(&updates.join(","));
    }
    sql
}

fn on_duplicate_key<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableId,
    keys: &[&ColumnSpec],
    non_keys: &[&ColumnSpec],
) -> String {
    let all = keys.iter().chain(non_keys.iter()).copied();
    // All-key rows still need an update list; refreshing the keys is a no-op.
    let refreshed = if non_keys.is_empty() { keys } else { non_keys };
    let updates: Vec<String> = refreshed
        .iter()
        .map(|c| {
            let q = dialect.quote_identifier(&c.name);
            format!("{}=VALUES({})", q, q)
        })
        .collect();
    format!(
        "INSERT INTO {}({}) VALUES({}) ON DUPLICATE KEY UPDATE {}",
        dialect.quote_table(table),
        quoted_list(dialect, all, ","),
        placeholders(dialect, keys.len() + non_keys.len()),
        updates.join(",")
    )
}

fn merge<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableId,
    keys: &[&ColumnSpec],
    non_keys: &[&ColumnSpec],
    flavor: MergeFlavor,
) -> String {
    let bound: Vec<&ColumnSpec> = keys.iter().chain(non_keys.iter()).copied().collect();

    let selected: Vec<String> = bound
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let placeholder = dialect.param_placeholder(i + 1);
            let name = dialect.quote_identifier(&c.name);
            match flavor {
                MergeFlavor::TypedCasts => format!(
                    "{}::{} AS {}",
                    placeholder,
                    base_type_name(&dialect.sql_type(&c.column_type)),
                    name
                ),
                MergeFlavor::Ansi | MergeFlavor::SqlServer => format!("{} AS {}", placeholder, name),
            }
        })
        .collect();

    let matches: Vec<String> = keys
        .iter()
        .map(|c| {
            let q = dialect.quote_identifier(&c.name);
            format!("target.{}=incoming.{}", q, q)
        })
        .collect();

    // Every column is refreshed on a match, keys included.
    let written: Vec<&ColumnSpec> = match flavor {
        MergeFlavor::TypedCasts => non_keys.iter().chain(keys.iter()).copied().collect(),
        MergeFlavor::Ansi | MergeFlavor::SqlServer => bound.clone(),
    };
    let sets: Vec<String> = written
        .iter()
        .map(|c| {
            let q = dialect.quote_identifier(&c.name);
            format!("{}=incoming.{}", q, q)
        })
        .collect();
    let values: Vec<String> = written
        .iter()
        .map(|c| format!("incoming.{}", dialect.quote_identifier(&c.name)))
        .collect();

    let target = match flavor {
        MergeFlavor::SqlServer => format!("{} WITH (HOLDLOCK)", dialect.quote_table(table)),
        MergeFlavor::Ansi | MergeFlavor::TypedCasts => dialect.quote_table(table),
    };
    let terminator = match flavor {
        MergeFlavor::Ansi => "",
        MergeFlavor::SqlServer | MergeFlavor::TypedCasts => ";",
    };

    format!(
        "MERGE INTO {} AS target USING (SELECT {}) AS incoming ON ({}) \
         WHEN MATCHED THEN UPDATE SET {} \
         WHEN NOT MATCHED THEN INSERT ({}) VALUES ({}){}",
        target,
        selected.join(", "),
        matches.join(" AND "),
        sets.join(","),
        quoted_list(dialect, written.iter().copied(), ", "),
        values.join(","),
        terminator
    )
}

fn native_upsert<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableId,
    keys: &[&ColumnSpec],
    non_keys: &[&ColumnSpec],
) -> String {
    let all = keys.iter().chain(non_keys.iter()).copied();
    format!(
        "UPSERT {}({}) VALUES({}) WITH PRIMARY KEY",
        dialect.quote_table(table),
        quoted_list(dialect, all, ","),
        placeholders(dialect, keys.len() + non_keys.len())
    )
}

/// Parameterized SELECT for one poll in `mode`.
///
/// A user query gets the mode's WHERE clause appended verbatim.
pub fn select<D: Dialect + ?Sized>(dialect: &D, source: &QuerySource, mode: &QueryMode) -> String {
    let base = match source {
        QuerySource::Table(t) => format!("SELECT * FROM {}", dialect.quote_table(t)),
        QuerySource::Query(q) => q.trim_end().trim_end_matches(';').to_string(),
    };
    let p = |i: usize| dialect.param_placeholder(i);

    match mode {
        QueryMode::Bulk => base,
        QueryMode::Incrementing { column } => {
            let inc = dialect.quote_identifier(column);
            format!("{} WHERE {} > {} ORDER BY {} ASC", base, inc, p(1), inc)
        }
        QueryMode::Timestamp { columns, .. } => {
            let ts = timestamp_expression(dialect, columns);
            format!(
                "{} WHERE {} > {} AND {} < {} ORDER BY {} ASC",
                base,
                ts,
                p(1),
                ts,
                p(2),
                ts
            )
        }
        QueryMode::TimestampIncrementing {
            columns,
            incrementing,
            ..
        } => {
            let ts = timestamp_expression(dialect, columns);
            let inc = dialect.quote_identifier(incrementing);
            format!(
                "{base} WHERE {ts} < {} AND (({ts} = {} AND {inc} > {}) OR {ts} > {}) ORDER BY {ts},{inc} ASC",
                p(1),
                p(2),
                p(3),
                p(4),
            )
        }
    }
}

fn timestamp_expression<D: Dialect + ?Sized>(dialect: &D, columns: &[String]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| dialect.quote_identifier(c)).collect();
    if quoted.len() == 1 {
        quoted.join("")
    } else {
        format!("COALESCE({})", quoted.join(","))
    }
}

fn quoted_list<'a, D, I>(dialect: &D, columns: I, separator: &str) -> String
where
    D: Dialect + ?Sized,
    I: Iterator<Item = &'a ColumnSpec>,
{
    columns
        .map(|c| dialect.quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(separator)
}

fn placeholders<D: Dialect + ?Sized>(dialect: &D, count: usize) -> String {
    (1..=count)
        .map(|i| dialect.param_placeholder(i))
        .collect::<Vec<_>>()
        .join(",")
}

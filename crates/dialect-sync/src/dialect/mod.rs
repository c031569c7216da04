//! Dialect descriptors and the shared SQL generation engine.
//!
//! Each database family is described by a static [`DialectDescriptor`]: quote
//! characters, placeholder style, how it spells upserts and ALTER TABLE, and
//! how the registry recognizes it. The generators in [`ddl`] and [`dml`] read
//! the descriptor, so a dialect only has to supply its type names.
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = DialectRegistry::with_builtins(DialectSettings::default());
//! let resolved = registry.resolve(&mut conn).await?;
//! let sql = resolved.dialect.build_create_table(&table, &columns)?;
//! ```

pub mod ddl;
pub mod dml;
pub mod typemap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::canonical::NUMERIC_TYPE_SCALE_HIGH;
use crate::core::identifier::{MaxIdentifierLength, QuoteChars, QuoteMethod};
use crate::core::traits::{Connection, Dialect};

/// How a dialect writes "insert or update by key".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStrategy {
    /// `INSERT ... ON CONFLICT (keys) DO UPDATE SET c=EXCLUDED.c`
    OnConflict,
    /// `INSERT ... ON DUPLICATE KEY UPDATE c=VALUES(c)`
    OnDuplicateKey,
    /// `MERGE INTO t AS target USING (SELECT ...) AS incoming ON (...)`
    Merge(MergeFlavor),
    /// `UPSERT t(cols) VALUES(...) WITH PRIMARY KEY`
    NativeUpsert,
}

/// Variations on the MERGE form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFlavor {
    /// Plain ANSI MERGE; keys first in SET and INSERT.
    Ansi,
    /// `WITH (HOLDLOCK)` on the target and a terminating `;`.
    SqlServer,
    /// Placeholders cast to the column type (`?::INT`); non-key columns
    /// first in SET and INSERT, statement ends with `;`.
    TypedCasts,
}

/// How ALTER TABLE adds several columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterStyle {
    /// One full `ALTER TABLE t ADD c ...` per column.
    StatementPerColumn,
    /// One statement, `ADD c1 ...,\nADD c2 ...`.
    MultiAdd,
    /// One statement, `ADD(c1 ...,c2 ...)`.
    AddList,
}

/// How boolean literals are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanLiteral {
    Keyword,
    Numeric,
}

/// Parameter placeholder syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    Question,
    Dollar,
    AtP,
}

/// Immutable facts about one database family.
#[derive(Debug)]
pub struct DialectDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    /// Extra names accepted by lookups, e.g. `pg`.
    pub aliases: &'static [&'static str],
    pub quote: QuoteChars,
    /// Product names reported by the database (case-insensitive).
    pub product_names: &'static [&'static str],
    /// URL schemes, without `://`.
    pub url_schemes: &'static [&'static str],
    /// Tie-breaker when several dialects match equally well.
    pub priority: u8,
    pub upsert: UpsertStrategy,
    pub alter: AlterStyle,
    pub boolean_literal: BooleanLiteral,
    pub placeholder: PlaceholderStyle,
    /// Replacement for the `CREATE TABLE` keyword, if any.
    pub create_table_keyword: Option<&'static str>,
    /// Statement whose integer result is the maximum identifier length.
    pub max_identifier_probe: Option<&'static str>,
    /// Documented limit for dialects without a probe.
    pub known_max_identifier_length: Option<usize>,
    /// Error text meaning a prepared plan no longer matches its result shape.
    pub stale_statement_signature: Option<&'static str>,
}

impl DialectDescriptor {
    /// Whether `name` is this dialect's name or one of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Per-connection settings shared by every dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectSettings {
    pub quote_identifiers: QuoteMethod,
    /// Scale used when a discovered numeric scale is unset or ambiguous.
    pub numeric_scale_high: i32,
    /// Length for bounded character types, where a dialect needs one.
    pub string_length: Option<u32>,
}

impl Default for DialectSettings {
    fn default() -> Self {
        Self {
            quote_identifiers: QuoteMethod::Always,
            numeric_scale_high: NUMERIC_TYPE_SCALE_HIGH,
            string_length: None,
        }
    }
}

/// Ask a live connection for its maximum identifier length.
///
/// Never fails: a missing probe, a probe error, an empty result and an
/// out-of-range value all fall back to the dialect's documented limit or to
/// [`MaxIdentifierLength::Unbounded`].
pub async fn compute_max_identifier_length<D, C>(dialect: &D, conn: &mut C) -> MaxIdentifierLength
where
    D: Dialect + ?Sized,
    C: Connection + ?Sized,
{
    let Some(probe) = dialect.descriptor().max_identifier_probe else {
        return dialect.interpret_max_identifier_length(None);
    };

    match conn.query_scalar(probe).await {
        Ok(Some(value)) => {
            let max = MaxIdentifierLength::from_probe(value);
            debug!("{}: max identifier length {:?}", dialect.name(), max);
            max
        }
        Ok(None) => {
            warn!(
                "{}: identifier length probe returned no rows, not truncating",
                dialect.name()
            );
            MaxIdentifierLength::Unbounded
        }
        Err(e) => {
            warn!(
                "{}: unable to compute max identifier length, not truncating: {}",
                dialect.name(),
                e
            );
            MaxIdentifierLength::Unbounded
        }
    }
}

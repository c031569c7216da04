//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`generic`]: ANSI SQL fallback
//! - [`postgres`]: PostgreSQL dialect and live connection
//! - [`mssql`]: Microsoft SQL Server dialect
//! - [`mysql`]: MySQL/MariaDB dialect
//! - [`vertica`]: Vertica dialect
//! - [`hana`]: SAP HANA dialect
//!
//! # Static dispatch
//!
//! The dialect set is closed. [`DialectImpl`] holds one variant per database
//! family and forwards the `Dialect` hooks with a match instead of a vtable,
//! so adding a family without mapping it is a compile error.
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` with a `DESCRIPTOR` and a dialect struct
//! 2. Add a variant to [`DialectKind`] and [`DialectImpl`]
//! 3. Add the kind to [`DialectKind::ALL`] so the registry scores it

pub mod generic;
pub mod hana;
pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod vertica;

pub use generic::GenericDialect;
pub use hana::HanaDialect;
pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use postgres::{PgConnection, PostgresDialect};
pub use vertica::VerticaDialect;

use crate::core::canonical::{LogicalType, PrimitiveKind};
use crate::core::identifier::MaxIdentifierLength;
use crate::core::traits::{Connection, Dialect};
use crate::dialect::{compute_max_identifier_length, DialectDescriptor, DialectSettings};
use crate::error::{Result, SyncError};

/// The registered database families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    Generic,
    Postgres,
    SqlServer,
    MySql,
    Vertica,
    Hana,
}

impl DialectKind {
    pub const ALL: [DialectKind; 6] = [
        DialectKind::Generic,
        DialectKind::Postgres,
        DialectKind::SqlServer,
        DialectKind::MySql,
        DialectKind::Vertica,
        DialectKind::Hana,
    ];

    pub fn descriptor(&self) -> &'static DialectDescriptor {
        match self {
            DialectKind::Generic => &generic::DESCRIPTOR,
            DialectKind::Postgres => &postgres::DESCRIPTOR,
            DialectKind::SqlServer => &mssql::DESCRIPTOR,
            DialectKind::MySql => &mysql::DESCRIPTOR,
            DialectKind::Vertica => &vertica::DESCRIPTOR,
            DialectKind::Hana => &hana::DESCRIPTOR,
        }
    }

    /// Look a kind up by name or alias (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.descriptor().answers_to(name))
    }
}

/// Enum-based static dispatch for dialects.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Generic(GenericDialect),
    Postgres(PostgresDialect),
    SqlServer(MssqlDialect),
    MySql(MysqlDialect),
    Vertica(VerticaDialect),
    Hana(HanaDialect),
}

impl Dialect for DialectImpl {
    fn descriptor(&self) -> &'static DialectDescriptor {
        match self {
            DialectImpl::Generic(d) => d.descriptor(),
            DialectImpl::Postgres(d) => d.descriptor(),
            DialectImpl::SqlServer(d) => d.descriptor(),
            DialectImpl::MySql(d) => d.descriptor(),
            DialectImpl::Vertica(d) => d.descriptor(),
            DialectImpl::Hana(d) => d.descriptor(),
        }
    }

    fn settings(&self) -> &DialectSettings {
        match self {
            DialectImpl::Generic(d) => d.settings(),
            DialectImpl::Postgres(d) => d.settings(),
            DialectImpl::SqlServer(d) => d.settings(),
            DialectImpl::MySql(d) => d.settings(),
            DialectImpl::Vertica(d) => d.settings(),
            DialectImpl::Hana(d) => d.settings(),
        }
    }

    fn map_logical(&self, logical: &LogicalType) -> Option<String> {
        match self {
            DialectImpl::Generic(d) => d.map_logical(logical),
            DialectImpl::Postgres(d) => d.map_logical(logical),
            DialectImpl::SqlServer(d) => d.map_logical(logical),
            DialectImpl::MySql(d) => d.map_logical(logical),
            DialectImpl::Vertica(d) => d.map_logical(logical),
            DialectImpl::Hana(d) => d.map_logical(logical),
        }
    }

    fn map_primitive(&self, kind: PrimitiveKind) -> String {
        match self {
            DialectImpl::Generic(d) => d.map_primitive(kind),
            DialectImpl::Postgres(d) => d.map_primitive(kind),
            DialectImpl::SqlServer(d) => d.map_primitive(kind),
            DialectImpl::MySql(d) => d.map_primitive(kind),
            DialectImpl::Vertica(d) => d.map_primitive(kind),
            DialectImpl::Hana(d) => d.map_primitive(kind),
        }
    }
}

impl DialectImpl {
    /// Create the dialect for a kind with the given settings.
    pub fn new(kind: DialectKind, settings: DialectSettings) -> Self {
        match kind {
            DialectKind::Generic => DialectImpl::Generic(GenericDialect::new(settings)),
            DialectKind::Postgres => DialectImpl::Postgres(PostgresDialect::new(settings)),
            DialectKind::SqlServer => DialectImpl::SqlServer(MssqlDialect::new(settings)),
            DialectKind::MySql => DialectImpl::MySql(MysqlDialect::new(settings)),
            DialectKind::Vertica => DialectImpl::Vertica(VerticaDialect::new(settings)),
            DialectKind::Hana => DialectImpl::Hana(HanaDialect::new(settings)),
        }
    }

    /// Create a dialect implementation from a dialect name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a registered dialect or alias.
    pub fn from_name(name: &str, settings: DialectSettings) -> Result<Self> {
        match DialectKind::from_name(name) {
            Some(kind) => Ok(Self::new(kind, settings)),
            None => Err(SyncError::Config(format!(
                "Unknown dialect: '{}'. Supported dialects: {}",
                name,
                DialectKind::ALL
                    .iter()
                    .map(|k| k.descriptor().name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    pub fn kind(&self) -> DialectKind {
        match self {
            DialectImpl::Generic(_) => DialectKind::Generic,
            DialectImpl::Postgres(_) => DialectKind::Postgres,
            DialectImpl::SqlServer(_) => DialectKind::SqlServer,
            DialectImpl::MySql(_) => DialectKind::MySql,
            DialectImpl::Vertica(_) => DialectKind::Vertica,
            DialectImpl::Hana(_) => DialectKind::Hana,
        }
    }

    /// Probe the connection for its identifier length limit. Never fails.
    pub async fn compute_max_identifier_length<C>(&self, conn: &mut C) -> MaxIdentifierLength
    where
        C: Connection + ?Sized,
    {
        compute_max_identifier_length(self, conn).await
    }
}

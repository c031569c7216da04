//! Microsoft SQL Server dialect.

mod dialect;

pub use dialect::MssqlDialect;
pub(crate) use dialect::DESCRIPTOR;

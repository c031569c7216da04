//! Vertica dialect.

mod dialect;

pub use dialect::VerticaDialect;
pub(crate) use dialect::DESCRIPTOR;

//! SAP HANA dialect.

mod dialect;

pub use dialect::HanaDialect;
pub(crate) use dialect::DESCRIPTOR;

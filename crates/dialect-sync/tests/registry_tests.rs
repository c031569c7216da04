//! Dialect resolution, identifier probing and per-connection caching.

mod common;

use std::sync::Arc;

use common::{Probe, ScriptedConnection};
use dialect_sync::{DialectKind, DialectRegistry, DialectSettings, MaxIdentifierLength};

#[tokio::test]
async fn test_probe_answer_sets_limit() {
    let registry = DialectRegistry::default();
    let mut conn = ScriptedConnection::new("pg://one", "PostgreSQL").with_probe(Probe::Value(63));
    let resolved = registry.resolve(&mut conn).await.unwrap();
    assert_eq!(resolved.dialect.kind(), DialectKind::Postgres);
    assert_eq!(resolved.max_identifier_length, MaxIdentifierLength::Limit(63));
    assert_eq!(resolved.product.name, "PostgreSQL");
}

#[tokio::test]
async fn test_probe_failure_degrades_to_unbounded() {
    let registry = DialectRegistry::default();
    let mut conn = ScriptedConnection::new("pg://two", "PostgreSQL").with_probe(Probe::Fail);
    let resolved = registry.resolve(&mut conn).await.unwrap();
    assert_eq!(resolved.max_identifier_length, MaxIdentifierLength::Unbounded);

    let mut conn = ScriptedConnection::new("pg://three", "PostgreSQL").with_probe(Probe::Empty);
    let resolved = registry.resolve(&mut conn).await.unwrap();
    assert_eq!(resolved.max_identifier_length, MaxIdentifierLength::Unbounded);
}

#[tokio::test]
async fn test_overflow_probe_is_unbounded() {
    let registry = DialectRegistry::default();
    let mut conn = ScriptedConnection::new("pg://four", "PostgreSQL")
        .with_probe(Probe::Value(i64::from(i32::MAX)));
    let resolved = registry.resolve(&mut conn).await.unwrap();
    assert_eq!(resolved.max_identifier_length, MaxIdentifierLength::Unbounded);
}

#[tokio::test]
async fn test_dialect_without_probe_uses_known_limit() {
    let registry = DialectRegistry::default();
    let mut conn = ScriptedConnection::new("sqlserver://db", "Microsoft SQL Server")
        .with_probe(Probe::Fail);
    let log = conn.log();
    let resolved = registry.resolve(&mut conn).await.unwrap();
    assert_eq!(resolved.dialect.kind(), DialectKind::SqlServer);
    assert_eq!(resolved.max_identifier_length, MaxIdentifierLength::Limit(128));
    assert_eq!(log.lock().unwrap().probe_calls, 0);
}

#[tokio::test]
async fn test_resolution_is_cached_per_connection_key() {
    let registry = DialectRegistry::default();
    let mut first = ScriptedConnection::new("pg://shared", "PostgreSQL").with_probe(Probe::Value(63));
    let mut second = ScriptedConnection::new("pg://shared", "PostgreSQL").with_probe(Probe::Value(10));
    let second_log = second.log();

    let a = registry.resolve(&mut first).await.unwrap();
    let b = registry.resolve(&mut second).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(b.max_identifier_length, MaxIdentifierLength::Limit(63));
    assert_eq!(second_log.lock().unwrap().product_calls, 0);
    assert_eq!(second_log.lock().unwrap().probe_calls, 0);
}

#[tokio::test]
async fn test_unknown_product_is_generic() {
    let registry = DialectRegistry::default();
    let mut conn = ScriptedConnection::new("jdbc:informix-sqli://db", "Informix Dynamic Server");
    let resolved = registry.resolve(&mut conn).await.unwrap();
    assert_eq!(resolved.dialect.kind(), DialectKind::Generic);
    assert_eq!(resolved.max_identifier_length, MaxIdentifierLength::Unbounded);
}

#[tokio::test]
async fn test_override_wins_over_product() {
    let registry = DialectRegistry::with_builtins(DialectSettings::default())
        .override_name("hana")
        .unwrap();
    let mut conn = ScriptedConnection::new("pg://five", "PostgreSQL");
    let resolved = registry.resolve(&mut conn).await.unwrap();
    assert_eq!(resolved.dialect.kind(), DialectKind::Hana);
    assert_eq!(resolved.max_identifier_length, MaxIdentifierLength::Limit(127));
}

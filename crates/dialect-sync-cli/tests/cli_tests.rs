//! CLI integration tests for dialect-sync.
//!
//! These tests cover argument parsing, statement rendering and exit codes
//! for configuration errors. Nothing here needs a live database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the dialect-sync binary.
fn cmd() -> Command {
    Command::cargo_bin("dialect-sync").unwrap()
}

fn schema_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name: orders").unwrap();
    writeln!(file, "fields:").unwrap();
    writeln!(file, "  - name: id").unwrap();
    writeln!(file, "    type: int32").unwrap();
    writeln!(file, "    key: true").unwrap();
    writeln!(file, "  - name: name").unwrap();
    writeln!(file, "    type: string").unwrap();
    writeln!(file, "    optional: true").unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dialects"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("poll"));
}

#[test]
fn test_render_subcommand_help() {
    cmd()
        .args(["render", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--table"))
        .stdout(predicate::str::contains("--dialect"))
        .stdout(predicate::str::contains("--existing"));
}

#[test]
fn test_poll_subcommand_help() {
    cmd()
        .args(["poll", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--once"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dialect-sync"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// =============================================================================
// Dialects
// =============================================================================

#[test]
fn test_dialects_lists_builtins() {
    cmd()
        .arg("dialects")
        .assert()
        .success()
        .stdout(predicate::str::contains("generic"))
        .stdout(predicate::str::contains("postgres"))
        .stdout(predicate::str::contains("sqlserver"))
        .stdout(predicate::str::contains("hana"));
}

#[test]
fn test_dialects_json_output() {
    let output = cmd()
        .args(["--output-json", "dialects"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 6);
    assert!(names.contains(&"vertica"));
}

// =============================================================================
// Render
// =============================================================================

#[test]
fn test_render_generic_create_table() {
    let file = schema_file();
    cmd()
        .args(["render", "--table", "t", "--schema"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "CREATE TABLE \"t\" (\n\"id\" INT NOT NULL,\n\"name\" STRING NULL,\nPRIMARY KEY(\"id\"));",
        ));
}

#[test]
fn test_render_postgres_upsert() {
    let file = schema_file();
    cmd()
        .args(["render", "--table", "orders", "--dialect", "pg", "--schema"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ON CONFLICT"))
        .stdout(predicate::str::contains("$2"));
}

#[test]
fn test_render_alter_for_missing_optional_column() {
    let file = schema_file();
    cmd()
        .args(["render", "--table", "t", "--existing", "id", "--schema"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ALTER TABLE"))
        .stdout(predicate::str::contains("\"name\""));
}

#[test]
fn test_render_alter_for_required_column_exits_with_code_4() {
    let file = schema_file();
    cmd()
        .args(["render", "--table", "t", "--existing", "name", "--schema"])
        .arg(file.path())
        .assert()
        .failure()
        .code(4); // precondition
}

#[test]
fn test_render_unknown_dialect_exits_with_code_1() {
    let file = schema_file();
    cmd()
        .args(["render", "--table", "t", "--dialect", "informix", "--schema"])
        .arg(file.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown dialect"));
}

#[test]
fn test_render_unknown_type_exits_with_code_3() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "fields:").unwrap();
    writeln!(file, "  - name: id").unwrap();
    writeln!(file, "    type: uuid").unwrap();
    cmd()
        .args(["render", "--table", "t", "--schema"])
        .arg(file.path())
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_render_json_output() {
    let file = schema_file();
    let output = cmd()
        .args(["--output-json", "render", "--table", "t", "--dialect", "mysql", "--schema"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["dialect"], "mysql");
    assert_eq!(parsed["upsert_kind"], "Upsert");
    assert_eq!(parsed["params"], serde_json::json!(["id", "name"]));
}

// =============================================================================
// Exit Code Tests (Configuration Errors)
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    cmd()
        .args(["-c", "/nonexistent/config.yaml", "poll", "--once"])
        .assert()
        .failure()
        .code(7); // file not found
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();
    cmd()
        .arg("-c")
        .arg(file.path())
        .args(["poll", "--once"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_tables_and_query_together_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connection:").unwrap();
    writeln!(file, "  url: postgres://localhost/db").unwrap();
    writeln!(file, "source:").unwrap();
    writeln!(file, "  tables: [orders]").unwrap();
    writeln!(file, "  query: SELECT * FROM orders").unwrap();
    cmd()
        .arg("-c")
        .arg(file.path())
        .args(["poll", "--once"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_unknown_verbosity_exits_with_code_1() {
    cmd()
        .args(["--verbosity", "loud", "dialects"])
        .assert()
        .failure()
        .code(1);
}

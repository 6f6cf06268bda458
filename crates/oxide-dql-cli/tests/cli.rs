//! Tests that drive the `oxide-dql` binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::NamedTempFile;

const CATALOG: &str = r#"{
    "default_catalog": "SHOP",
    "current_schema": "PUBLIC",
    "schemas": [
        {
            "name": "PUBLIC",
            "tables": [
                {"name": "USERS", "columns": [
                    {"name": "ID", "data_type": "Integer", "nullable": false},
                    {"name": "NAME", "data_type": {"Varchar": 100}}
                ]},
                {"name": "ORDERS", "columns": [
                    {"name": "ID", "data_type": "Integer"},
                    {"name": "USER_ID", "data_type": "Integer"},
                    {"name": "TOTAL", "data_type": {"Decimal": {"precision": 10, "scale": 2}}}
                ]}
            ],
            "sequences": [{"name": "ORDER_SEQ"}]
        }
    ]
}"#;

fn catalog_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CATALOG.as_bytes()).unwrap();
    file
}

fn run(args: &[&str], catalog: &NamedTempFile) -> Output {
    Command::new(env!("CARGO_BIN_EXE_oxide-dql"))
        .arg("--catalog")
        .arg(catalog.path())
        .args(args)
        .env_remove("OXIDE_DQL_CATALOG")
        .output()
        .unwrap()
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn query_reports_columns_and_dependencies() {
    let catalog = catalog_file();
    let output = run(
        &[
            "query",
            "SELECT u.name, NEXT VALUE FOR order_seq FROM users u WHERE u.id = ?",
        ],
        &catalog,
    );
    let report = json(&output);
    assert_eq!(report["columns"][0], "NAME");
    assert_eq!(report["parameters"].as_array().unwrap().len(), 1);
    assert_eq!(report["sequences"][0], "PUBLIC.ORDER_SEQ");
    let objects: Vec<&str> = report["schema_objects"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(objects.contains(&"PUBLIC.USERS"), "{objects:?}");
    assert!(report.get("tree").is_none());
}

#[test]
fn tree_flag_includes_compiled_tree() {
    let catalog = catalog_file();
    let output = run(
        &[
            "query",
            "--tree",
            "SELECT id FROM users WHERE id IN (SELECT user_id FROM orders)",
        ],
        &catalog,
    );
    let report = json(&output);
    assert_eq!(report["tree"]["subqueries"].as_array().unwrap().len(), 1);
    assert_eq!(report["materialization_order"], serde_json::json!([0]));
}

#[test]
fn sql_is_read_from_stdin() {
    let catalog = catalog_file();
    let mut child = Command::new(env!("CARGO_BIN_EXE_oxide-dql"))
        .arg("--catalog")
        .arg(catalog.path())
        .arg("query")
        .env_remove("OXIDE_DQL_CATALOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"SELECT total FROM orders;\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let report = json(&output);
    assert_eq!(report["columns"][0], "TOTAL");
}

#[test]
fn dialect_flag_changes_accepted_syntax() {
    let catalog = catalog_file();
    let sql = "SELECT id FROM users LIMIT 5";
    assert!(run(&["query", sql], &catalog).status.success());

    let output = run(&["--dialect", "oracle", "query", sql], &catalog);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LIMIT"), "{stderr}");
}

#[test]
fn expression_leaves_free_columns_unbound() {
    let catalog = catalog_file();
    let report = json(&run(&["expression", "price * 2 > ?"], &catalog));
    assert!(report.get("columns").is_none());
    assert_eq!(report["parameters"].as_array().unwrap().len(), 1);
}

#[test]
fn unknown_table_fails() {
    let catalog = catalog_file();
    let output = run(&["query", "SELECT * FROM missing"], &catalog);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Table not found"), "{stderr}");
}

#[test]
fn malformed_catalog_fails() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"{not json").unwrap();
    let output = run(&["query", "SELECT 1 FROM users"], &file);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid catalog document"), "{stderr}");
}

#[test]
fn tokens_lists_one_line_per_token() {
    let catalog = catalog_file();
    let output = run(&["tokens", "SELECT a, 'x' FROM t"], &catalog);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 6);
}

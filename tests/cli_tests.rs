use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::write(&path, content).expect("write file");
    path
}

#[test]
fn projects_records_from_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = write_file(
        temp.path(),
        "people.json",
        r#"[{"fc": "Alice", "birthYear": 1900, "x": 1}, {"fc": "Bob", "birthYear": 1850}]"#,
    );

    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.arg("-c").arg(".[] | {fc, birthYear}").arg(&input);

    cmd.assert().success().stdout(
        "{\"fc\":\"Alice\",\"birthYear\":1900}\n{\"fc\":\"Bob\",\"birthYear\":1850}\n",
    );
}

#[test]
fn pretty_output_is_default() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.arg(".").write_stdin(r#"{"a":[1]}"#);

    cmd.assert()
        .success()
        .stdout("{\n  \"a\": [\n    1\n  ]\n}\n");
}

#[test]
fn indent_option() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args([".", "--indent", "4", "--input", "[1]"]);

    cmd.assert().success().stdout("[\n    1\n]\n");
}

#[test]
fn reads_ndjson_from_stdin() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.arg(".n").write_stdin("{\"n\": 1}\n{\"n\": 2}\n");

    cmd.assert().success().stdout("1\n2\n");
}

#[test]
fn concatenates_files_in_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let first = write_file(temp.path(), "a.json", "1\n");
    let second = write_file(temp.path(), "b.json", "2\n");

    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args(["-c", "-s", "."]).arg(&first).arg(&second);

    cmd.assert().success().stdout("[1,2]\n");
}

#[test]
fn null_input_ignores_stdin() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args(["-n", "1 + 2"]).write_stdin("not json");

    cmd.assert().success().stdout("3\n");
}

#[test]
fn no_output_is_success() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args([".[] | select(. > 10)", "-e", "[1, 2, 3]"]);

    cmd.assert().code(0).stdout("");
}

#[test]
fn filter_parse_error_exits_2() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args([".[", "-e", "[]"]);

    cmd.assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("parse error at offset 2"));
}

#[test]
fn type_error_exits_3_and_continues() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.arg(".a").write_stdin("{\"a\": 1}\n[2]\n{\"a\": 3}\n");

    cmd.assert()
        .code(3)
        .stdout("1\n3\n")
        .stderr(predicate::str::contains("cannot index array"));
}

#[test]
fn malformed_json_exits_3_and_resyncs() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.arg(".").arg("-c").write_stdin("[1]\n[2,\n[3]\n");

    // `[2,` swallows the next line as its element, then fails at end of input
    cmd.assert()
        .code(3)
        .stdout("[1]\n")
        .stderr(predicate::str::contains("syntax error at byte"));
}

#[test]
fn fail_fast_stops_at_first_error() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args(["--fail-fast", "-c", "."]).write_stdin("1\n}\n2\n");

    cmd.assert()
        .code(3)
        .stdout("1\n")
        .stderr(predicate::str::contains("syntax error at byte 2"));
}

#[test]
fn resync_without_fail_fast() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args(["-c", "."]).write_stdin("1\n}\n2\n");

    cmd.assert().code(3).stdout("1\n2\n");
}

#[test]
fn missing_file_exits_1() {
    let temp = tempfile::tempdir().expect("tempdir");

    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.arg(".").arg(temp.path().join("absent.json"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("could not open"));
}

#[test]
fn indent_out_of_range_is_rejected() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args([".", "--indent", "9", "-n"]);

    cmd.assert().failure();
}

#[test]
fn deeply_nested_filter_exits_2() {
    let filter = format!("{}.{}", "(".repeat(30_000), ")".repeat(30_000));

    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.arg("-n").arg(filter);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("filter nesting exceeds maximum depth"));
}

#[test]
fn input_and_files_conflict() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = write_file(temp.path(), "a.json", "1\n");

    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args([".", "-e", "2"]).arg(&input);

    cmd.assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn same_line_documents_survive_a_bad_token() {
    let mut cmd = cargo_bin_cmd!("jqlite");
    cmd.args(["-c", "."]).write_stdin("1 x 2\n3\n");

    cmd.assert()
        .code(3)
        .stdout("1\n2\n3\n")
        .stderr(predicate::str::contains("syntax error at byte 2"));
}

//! End-to-end tests driving the `coda` binary.
//!
//! Covers the full pipeline: legacy import → merge → resample → reliability
//! → validation, with every step reading and writing the same project file.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn coda_binary() -> String {
    env!("CARGO_BIN_EXE_coda").to_string()
}

/// Runs `coda` isolated from the user's config and environment.
fn coda(home: &Path, args: &[&str]) -> Output {
    Command::new(coda_binary())
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("CODA_PROJECT_PATH")
        .args(args)
        .output()
        .expect("failed to run coda")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "coda should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

const LEGACY: &str = "\
# two coders, one trial column
variable\ttrial\tn
0\t600\t1
variable\tpri\tlook
6\t60\tl
120\t180\tr
variable\trel\tlook
6\t60\tl
120\t180\tl
";

fn imported_project(temp: &TempDir) -> String {
    let legacy = temp.path().join("export.txt");
    std::fs::write(&legacy, LEGACY).unwrap();
    let project = temp.path().join("study.coda");
    let project = project.to_str().unwrap().to_string();

    let out = stdout(&coda(
        temp.path(),
        &["--project", &project, "import-legacy", legacy.to_str().unwrap()],
    ));
    assert!(out.starts_with("Imported 3 columns"), "{out}");
    project
}

#[test]
fn test_import_then_list_columns() {
    let temp = TempDir::new().unwrap();
    let project = imported_project(&temp);

    let out = stdout(&coda(temp.path(), &["-p", &project, "columns", "--json"]));
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let names: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["trial", "pri", "rel"]);
    assert_eq!(parsed[1]["onset"], 100);
    assert_eq!(parsed[1]["offset"], 3000);
}

#[test]
fn test_merge_and_resample_store_columns() {
    let temp = TempDir::new().unwrap();
    let project = imported_project(&temp);

    let out = stdout(&coda(
        temp.path(),
        &["-p", &project, "merge", "--name", "both", "pri", "rel"],
    ));
    assert!(out.starts_with("Created column both"), "{out}");

    let out = stdout(&coda(
        temp.path(),
        &["-p", &project, "resample", "trial", "--step", "2500"],
    ));
    assert_eq!(out, "Created column trial_resampled with 5 cells (2500 ms step)\n");

    let out = stdout(&coda(temp.path(), &["-p", &project, "columns", "--json"]));
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 5);
}

#[test]
fn test_kappa_and_continuous_check() {
    let temp = TempDir::new().unwrap();
    let project = imported_project(&temp);

    let out = stdout(&coda(
        temp.path(),
        &["-p", &project, "kappa", "pri", "rel", "--json"],
    ));
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["matched_cells"], 2);
    assert_eq!(parsed["tables"]["look"]["values"], serde_json::json!(["l", "r"]));

    let out = stdout(&coda(
        temp.path(),
        &["-p", &project, "check-rel", "pri", "rel", "--continuous", "--compare", "look"],
    ));
    assert!(out.starts_with("1 disagreements covering 1000 ms"), "{out}");
}

#[test]
fn test_validate_reports_rows() {
    let temp = TempDir::new().unwrap();
    let project = imported_project(&temp);

    let out = stdout(&coda(
        temp.path(),
        &["-p", &project, "validate", "pri", "rel", "--one-of", "look=l", "--json"],
    ));
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
    assert_eq!(parsed[0]["column"], "pri");
    assert_eq!(parsed[0]["ordinal"], 2);
}

#[test]
fn test_project_path_from_env_and_missing_project() {
    let temp = TempDir::new().unwrap();
    let project = imported_project(&temp);

    let out = Command::new(coda_binary())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("CODA_PROJECT_PATH", &project)
        .args(["columns"])
        .output()
        .unwrap();
    assert!(stdout(&out).contains("trial"));

    let missing = coda(temp.path(), &["columns"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("no project file given"));
}

#[test]
fn test_bad_legacy_file_fails_with_line_number() {
    let temp = TempDir::new().unwrap();
    let legacy = temp.path().join("bad.txt");
    std::fs::write(&legacy, "variable\tlook\tdir\n1\t2\n").unwrap();
    let project = temp.path().join("study.coda");

    let out = coda(
        temp.path(),
        &[
            "-p",
            project.to_str().unwrap(),
            "import-legacy",
            legacy.to_str().unwrap(),
        ],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("line 2"));
    assert!(!project.exists());
}

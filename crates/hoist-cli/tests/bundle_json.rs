//! Integration tests for `hoist bundle --json` output.

use std::path::Path;
use std::process::{Command, Output};

fn hoist(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hoist"))
        .arg("--cwd")
        .arg(cwd)
        .args(args)
        .output()
        .expect("Failed to run hoist")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim().starts_with('{'), "stdout should begin with '{{': {stdout}");
    serde_json::from_str(&stdout).expect("stdout should be valid JSON")
}

#[test]
fn test_bundle_json_success_with_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.js"), "import { x } from './x';\nconsole.log(x);").unwrap();
    std::fs::write(dir.path().join("x.js"), "export const x = 1;").unwrap();

    let output = hoist(dir.path(), &["--json", "bundle", "main.js"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["modules"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["code"], "const x = 1;\nconsole.log(x);\n");
    assert!(json.get("error").is_none());
}

#[test]
fn test_bundle_json_failure_reports_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.js"), "import { missing } from './x';").unwrap();
    std::fs::write(dir.path().join("x.js"), "export const x = 1;").unwrap();

    let output = hoist(dir.path(), &["--json", "bundle", "main.js"]);
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "BUNDLE_MISSING_EXPORT");
    assert!(json["error"]["message"].as_str().unwrap().contains("missing"));
    assert!(json["error"]["path"].as_str().unwrap().ends_with("main.js"));
}

#[test]
fn test_bundle_writes_outfile_and_map() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.js"), "const message = 'hi';\nconsole.log(message);").unwrap();

    let output = hoist(
        dir.path(),
        &["--json", "bundle", "main.js", "--sourcemap", "-o", "dist/out.js"],
    );
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert!(json.get("code").is_none());

    let code = std::fs::read_to_string(dir.path().join("dist/out.js")).unwrap();
    assert!(code.ends_with("//# sourceMappingURL=out.js.map\n"));
    let map: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("dist/out.js.map")).unwrap()).unwrap();
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "out.js");
    assert_eq!(map["sources"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_bundle_prints_code_without_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.js"), "var x = 3;").unwrap();

    let output = hoist(dir.path(), &["bundle", "main.js"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "var x = 3;\n");
}

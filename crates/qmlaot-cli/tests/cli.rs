//! Runs the `qmlaot` binary against documents written to a temp dir

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;

const TYPES: &str = r#"{
    "module": "QtQuick",
    "components": [
        {
            "name": "QQuickItem", "prototype": "QObject", "exports": ["Item"],
            "properties": [{"name": "width", "type": "double"}]
        },
        {
            "name": "QQuickNeedy", "prototype": "QQuickItem", "exports": ["Needy"],
            "properties": [{"name": "model", "type": "QString", "required": true}]
        }
    ]
}"#;

const INT: &str = r#"{"stored": "int", "kind": "type", "name": "int"}"#;

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        Self::with_children(&[])
    }

    /// An `Item` root holding one child object per entry, one per line
    /// starting at line 3.
    fn with_children(children: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("types.json"), TYPES).unwrap();

        let mut source = String::from("import QtQuick\nItem {\n");
        let mut members = Vec::new();
        for (line, type_name) in children.iter().enumerate() {
            let start = source.len() + 4;
            source.push_str(&format!("    {} {{}}\n", type_name));
            members.push(format!(
                r#"{{"kind": "object", "type_name": "{}", "location": {{"start": {}, "end": {}, "line": {}, "column": 5}}}}"#,
                type_name,
                start,
                start + type_name.len() + 3,
                line + 3
            ));
        }
        source.push_str("}\n");
        fs::write(dir.path().join("Main.qml"), source).unwrap();

        let document = format!(
            r#"{{
                "file_path": "Main.qml",
                "imports": [{{"uri": "QtQuick", "location": {{"start": 0, "end": 14, "line": 1, "column": 1}}}}],
                "root": {{
                    "type_name": "Item",
                    "location": {{"start": 15, "end": 19, "line": 2, "column": 1}},
                    "members": [{}]
                }}
            }}"#,
            members.join(", ")
        );
        fs::write(dir.path().join("Main.json"), document).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) {
        fs::write(self.path(name), content).unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_qmlaot"))
            .args(args)
            .current_dir(self.dir.path())
            .env("NO_COLOR", "1")
            .env("QMLAOT_LOG", "off")
            .output()
            .unwrap()
    }
}

fn json_diagnostics(output: &Output) -> Vec<Value> {
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    value.as_array().cloned().unwrap()
}

fn functions(good_and_bad: bool) -> String {
    let good = format!(
        r#"{{
            "name": "answer", "return_type": "int",
            "instructions": [{{"offset": 0, "op": "LoadInt", "value": 42}}, {{"offset": 2, "op": "Ret"}}],
            "annotations": {{
                "0": {{"changed": {{"register": "acc", "content": {}}}}},
                "2": {{"registers": {{"acc": {}}}}}
            }}
        }}"#,
        INT, INT
    );
    let bad = r#"{
        "name": "dynamic", "return_type": "int",
        "instructions": [{"offset": 0, "op": "LoadName", "name": 0}],
        "lines": [[0, 2]]
    }"#;
    if good_and_bad {
        format!(r#"{{"strings": ["x"], "functions": [{}, {}]}}"#, good, bad)
    } else {
        format!(r#"{{"functions": [{}]}}"#, good)
    }
}

#[test]
fn test_check_clean_document() {
    let project = Project::new();
    let output = project.run(&["check", "Main.json", "--types", "types.json", "--format", "json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let diagnostics = json_diagnostics(&output);
    assert!(diagnostics.iter().all(|d| d["severity"] != "error"));
}

#[test]
fn test_check_reports_errors() {
    let project = Project::with_children(&["Needy"]);
    let output = project.run(&["check", "Main.json", "--types", "types.json", "--format", "json"]);
    assert!(!output.status.success());
    let diagnostics = json_diagnostics(&output);
    let required = diagnostics.iter().find(|d| d["code"] == "Q1012").unwrap();
    assert_eq!(required["severity"], "error");
    assert_eq!(required["labels"][0]["file"], "Main.qml");
    assert_eq!(required["labels"][0]["start_line"], 3);
}

#[test]
fn test_check_pretty_output() {
    let project = Project::with_children(&["Needy"]);
    let output = project.run(&["check", "Main.json", "--types", "types.json", "--no-color"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[Q1012]"));
    assert!(stderr.contains("Main.qml: 1 error"));
}

#[test]
fn test_manifest_downgrades_severity() {
    let project = Project::with_children(&["Needy"]);
    project.write("qmlaot.toml", "[diagnostics]\nrequired = \"warning\"\n");
    let output = project.run(&["check", "Main.json", "--types", "types.json", "--format", "json"]);
    assert!(output.status.success());
    let diagnostics = json_diagnostics(&output);
    let required = diagnostics.iter().find(|d| d["code"] == "Q1012").unwrap();
    assert_eq!(required["severity"], "warning");
}

#[test]
fn test_invalid_manifest_fails() {
    let project = Project::new();
    project.write("qmlaot.toml", "[diagnostics]\nrequired = \"loud\"\n");
    let output = project.run(&["check", "Main.json", "--types", "types.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid [diagnostics] entries"));
}

#[test]
fn test_compile_writes_unit() {
    let project = Project::new();
    project.write("functions.json", &functions(false));
    let output = project.run(&[
        "compile",
        "Main.json",
        "--types",
        "types.json",
        "--functions",
        "functions.json",
        "--output",
        "Main.cpp",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let code = fs::read_to_string(project.path("Main.cpp")).unwrap();
    assert!(code.starts_with("// Main.qml\n"));
    assert!(code.contains("namespace _Main_qml {"));
    assert!(code.contains("r2 = 42;\nreturn r2;\n"));
}

#[test]
fn test_compile_reports_rejections() {
    let project = Project::new();
    project.write("functions.json", &functions(true));
    project.write("qmlaot.toml", "[compiler]\nsource-comments = false\n");
    let output = project.run(&[
        "compile",
        "Main.json",
        "--types",
        "types.json",
        "--functions",
        "functions.json",
        "--output",
        "Main.cpp",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let diagnostics = json_diagnostics(&output);
    let rejected = diagnostics.iter().find(|d| d["code"] == "Q2001").unwrap();
    assert_eq!(rejected["message"], "dynamic: Cannot generate efficient code for LoadName");
    assert_eq!(rejected["labels"][0]["start_line"], 2);

    let code = fs::read_to_string(project.path("Main.cpp")).unwrap();
    assert!(code.contains("{ 0, QMetaType::fromType<int>()"));
    assert!(!code.contains("{ 1, "));
}

#[test]
fn test_compile_to_stdout() {
    let project = Project::new();
    project.write("functions.json", &functions(false));
    let output = project.run(&["compile", "Main.json", "--types", "types.json", "--functions", "functions.json"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("aotBuiltFunctions[] = {"));
}

#[test]
fn test_missing_document_fails() {
    let project = Project::new();
    let output = project.run(&["check", "Nope.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read document"));
}

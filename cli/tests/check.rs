use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create workspace"),
        }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap_or_else(|err| panic!("failed to write {name}: {err}"));
        path
    }

    fn store(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    fn splice(&self, args: &[&str], paths: &[&Path]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_splice"))
            .args(args)
            .arg("--store")
            .arg(self.store())
            .args(paths)
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .output()
            .unwrap_or_else(|err| panic!("failed to run splice: {err}"))
    }
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "splice failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const CORE: &str = r#"{
    definition: "core",
    instances: [{ name: "clock", type: "SystemClock" }],
}"#;

const APP: &str = r#"{
    definition: "app",
    root: true,
    imports: ["core"],
    instances: [
        { name: "greeter", type: "Greeter", depends: [{ name: "clock", type: "Clock" }] },
    ],
}"#;

const TYPES: &str = r#"{ SystemClock: ["Clock"] }"#;

#[test]
fn check_stores_verified_definitions() {
    let ws = Workspace::new();
    let core = ws.write("core.json5", CORE);
    let app = ws.write("app.json5", APP);
    let types = ws.write("types.json5", TYPES);

    let output = ws.splice(&["check", "--types", types.to_str().unwrap()], &[&core, &app]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("verified 2 definition(s)"));
    assert!(ws.store().join("core.json").is_file());
    assert!(ws.store().join("app.json").is_file());
}

#[test]
fn check_reuses_stored_dependencies() {
    let ws = Workspace::new();
    let core = ws.write("core.json5", CORE);
    let app = ws.write("app.json5", APP);
    let types = ws.write("types.json5", TYPES);

    assert_success(&ws.splice(&["check"], &[&core]));
    let output = ws.splice(&["check", "--types", types.to_str().unwrap()], &[&app]);
    assert_success(&output);
    assert!(ws.store().join("app.json").is_file());
}

#[test]
fn type_mismatch_fails_without_storing() {
    let ws = Workspace::new();
    let core = ws.write("core.json5", CORE);
    let app = ws.write("app.json5", APP);

    let output = ws.splice(&["check"], &[&core, &app]);
    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("splice::unmatched_types"), "{stderr}");
    assert!(stderr.contains("verification failed"), "{stderr}");
    assert!(ws.store().join("core.json").is_file());
    assert!(!ws.store().join("app.json").exists());
}

#[test]
fn missing_import_is_reported() {
    let ws = Workspace::new();
    let app = ws.write("app.json5", APP);

    let output = ws.splice(&["check"], &[&app]);
    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("splice::missing_import"), "{stderr}");
    assert!(stderr.contains("core"), "{stderr}");
}

#[test]
fn import_cycle_is_reported() {
    let ws = Workspace::new();
    let a = ws.write("a.json5", r#"{ definition: "a", imports: ["b"] }"#);
    let b = ws.write("b.json5", r#"{ definition: "b", imports: ["a"] }"#);

    let output = ws.splice(&["check"], &[&a, &b]);
    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("splice::cycle_in_definition_sources"), "{stderr}");
}

#[test]
fn malformed_source_names_the_path() {
    let ws = Workspace::new();
    let broken = ws.write("broken.json5", r#"{ definition: "x", instances: [{ name: 1, type: "T" }] }"#);

    let output = ws.splice(&["check"], &[&broken]);
    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("instances[0].name"), "{stderr}");
}

#[test]
fn show_prints_the_stored_record() {
    let ws = Workspace::new();
    let core = ws.write("core.json5", CORE);
    assert_success(&ws.splice(&["check"], &[&core]));

    let output = Command::new(env!("CARGO_BIN_EXE_splice"))
        .arg("show")
        .arg("--store")
        .arg(ws.store())
        .arg("core")
        .output()
        .unwrap_or_else(|err| panic!("failed to run splice: {err}"));
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"schema\": \"splice.definition\""), "{stdout}");
    assert!(stdout.contains("\"clock\""), "{stdout}");
}

#[test]
fn show_fails_for_unknown_identity() {
    let ws = Workspace::new();
    let output = Command::new(env!("CARGO_BIN_EXE_splice"))
        .arg("show")
        .arg("--store")
        .arg(ws.store())
        .arg("nothing")
        .output()
        .unwrap_or_else(|err| panic!("failed to run splice: {err}"));
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no analyzed definition named `nothing`"));
}

use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn write_config(&self, contents: &str) {
        let path = self.xdg_config.join("flowscope/config.toml");
        fs::create_dir_all(path.parent().expect("missing config parent"))
            .expect("failed to create config directory");
        fs::write(path, contents).expect("failed to write config");
    }
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../flowscope-core/tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("flowscope"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute flowscope: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "flowscope {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn dir_is_populated(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

#[test]
fn plan_prints_json_for_saved_history() {
    let env = CliTestEnv::new();
    let activities = fixture("approval/activities.json");
    let tasks = fixture("approval/tasks.json");
    let args = [
        "plan",
        "--activities",
        &activities,
        "--tasks",
        &tasks,
        "--cursor",
        "3",
        "--format",
        "json",
    ];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let doc: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(doc["cursor"], 3);
    assert_eq!(doc["traceLength"], 3);
    assert_eq!(doc["plan"]["node_states"]["start"], "DONE");
    assert_eq!(doc["plan"]["node_states"]["task1"], "ACTIVE");
    assert_eq!(doc["plan"]["edge_states"]["flow1"], "NORMAL_DONE");
    assert_eq!(doc["plan"]["badges"]["task1"], 2);
    assert_eq!(doc["plan"]["labels"]["task1"], "Approve Request");
}

#[test]
fn plan_text_output_follows_cursor() {
    let env = CliTestEnv::new();
    let activities = fixture("approval/activities.json");
    let args = ["plan", "--activities", &activities, "--cursor", "1"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Step 1 of 3"), "unexpected stdout:\n{stdout}");
    assert!(stdout.contains("Active: start"));
    assert!(!stdout.contains("flow1"));
}

#[test]
fn steps_lists_trace_with_loop_marker() {
    let env = CliTestEnv::new();
    let activities = fixture("rework/activities.json");
    let tasks = fixture("rework/tasks.json");
    let graph = fixture("rework/graph.json");
    let args = [
        "steps",
        "--activities",
        &activities,
        "--tasks",
        &tasks,
        "--graph",
        &graph,
    ];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let loop_line = stdout
        .lines()
        .find(|line| line.contains(" f3 "))
        .expect("f3 should be listed");
    assert!(loop_line.contains("(loop)"));
    assert!(stdout.contains("Review claim (second pass)"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Escalate claim"),
        "expected unresolved task warning, got:\n{stderr}"
    );
}

#[test]
fn malformed_history_fails_with_input_named() {
    let env = CliTestEnv::new();
    let activities = fixture("malformed/activities.json");
    let args = ["plan", "--activities", &activities];

    let output = run_bin(&env, &args);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("malformed activity history"),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn fetch_requires_engine_config() {
    let env = CliTestEnv::new();
    let args = ["fetch", "--instance", "42"];

    let output = run_bin(&env, &args);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no workflow engine configured"),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn fetch_reports_unreachable_engine() {
    let env = CliTestEnv::new();
    env.write_config(
        r#"
[engine]
base_url = "http://127.0.0.1:9"
timeout_secs = 2
max_retries = 0
"#,
    );
    let args = ["fetch", "--instance", "42"];

    let output = run_bin(&env, &args);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to load process instance 42"),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn verbose_writes_log_to_state_dir() {
    let env = CliTestEnv::new();
    let activities = fixture("approval/activities.json");
    let args = ["--verbose", "plan", "--activities", &activities];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    assert!(dir_is_populated(&env.xdg_state.join("flowscope")));
}

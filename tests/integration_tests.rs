//! Integration tests for the stagecraft CLI.
//!
//! Runs use the in-process producer unless a test installs its own worker
//! script, so nothing here needs an external agent.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a stagecraft Command with an in-process worker
fn stagecraft() -> Command {
    let mut cmd = cargo_bin_cmd!("stagecraft");
    cmd.env("STAGECRAFT_WORKER_CMD", "")
        .env_remove("STAGECRAFT_MAX_RETRIES")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a temporary project directory
fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Helper to initialize a stagecraft project in a temp directory
fn init_project(dir: &TempDir) {
    stagecraft()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_stagecraft_help() {
        stagecraft()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("stages"));
    }

    #[test]
    fn test_stagecraft_version() {
        stagecraft().arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        stagecraft().arg("launch").assert().failure();
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized stagecraft project"));

        assert!(dir.path().join(".stagecraft").is_dir());
        assert!(dir.path().join(".stagecraft/features").is_dir());
        let config = fs::read_to_string(dir.path().join(".stagecraft/stagecraft.toml")).unwrap();
        assert!(config.contains("[pipeline]"));
        assert!(config.contains("max_retries"));
    }

    #[test]
    fn test_init_twice_keeps_config() {
        let dir = create_temp_project();
        init_project(&dir);

        let config_path = dir.path().join(".stagecraft/stagecraft.toml");
        fs::write(&config_path, "[pipeline]\nmax_retries = 7\n").unwrap();

        stagecraft()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));

        let config = fs::read_to_string(&config_path).unwrap();
        assert!(config.contains("max_retries = 7"));
    }
}

// =============================================================================
// Stage Table
// =============================================================================

mod stages {
    use super::*;

    #[test]
    fn test_stages_lists_every_stage_in_order() {
        let output = stagecraft().arg("stages").assert().success();
        let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();

        let names = [
            "requirements_gathering",
            "architecture_design",
            "ui_ux_design",
            "task_breakdown",
            "implementation",
            "code_review",
            "testing",
            "security_review",
            "documentation",
            "deployment",
        ];
        let positions: Vec<usize> = names
            .iter()
            .map(|name| stdout.find(name).unwrap_or_else(|| panic!("missing {}", name)))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(stdout.contains("primary:"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_without_file_uses_defaults() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No stagecraft.toml found"))
            .stdout(predicate::str::contains("max_retries = 2"))
            .stdout(predicate::str::contains("in-process producer"));
    }

    #[test]
    fn test_config_show_reads_file() {
        let dir = create_temp_project();
        init_project(&dir);
        fs::write(
            dir.path().join(".stagecraft/stagecraft.toml"),
            "[pipeline]\nmax_retries = 1\ninfer_skips = true\n",
        )
        .unwrap();

        stagecraft()
            .current_dir(dir.path())
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("Config file:"))
            .stdout(predicate::str::contains("max_retries = 1"))
            .stdout(predicate::str::contains("infer_skips = true"));
    }

    #[test]
    fn test_config_env_override() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .env("STAGECRAFT_MAX_RETRIES", "4")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("max_retries = 4"));
    }

    #[test]
    fn test_config_validate_clean() {
        let dir = create_temp_project();
        init_project(&dir);

        stagecraft()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid"));
    }

    #[test]
    fn test_config_validate_reports_unknown_role() {
        let dir = create_temp_project();
        init_project(&dir);
        fs::write(
            dir.path().join(".stagecraft/stagecraft.toml"),
            "[pipeline]\ndisabled_roles = [\"astronaut\"]\n",
        )
        .unwrap();

        stagecraft()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Unknown role 'astronaut'"));
    }

    #[test]
    fn test_invalid_toml_fails() {
        let dir = create_temp_project();
        init_project(&dir);
        fs::write(
            dir.path().join(".stagecraft/stagecraft.toml"),
            "[pipeline\nmax_retries = ",
        )
        .unwrap();

        stagecraft()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Pipeline Runs
// =============================================================================

mod run {
    use super::*;

    #[test]
    fn test_run_in_process_completes() {
        let dir = create_temp_project();
        init_project(&dir);

        stagecraft()
            .current_dir(dir.path())
            .args([
                "run",
                "--name",
                "Invoices",
                "--description",
                "Generate monthly invoices",
                "--feature-id",
                "feat-1",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("worker: in_process"))
            .stdout(predicate::str::contains("Pipeline completed"))
            .stdout(predicate::str::contains("feat-1"));

        let features = dir.path().join(".stagecraft/features");
        let snapshot = fs::read_to_string(features.join("feat-1.json")).unwrap();
        let feature: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(feature["status"], "completed");
        assert_eq!(feature["current_stage"], "completed");

        let log = fs::read_to_string(features.join("feat-1.stages.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 10);
    }

    #[test]
    fn test_run_with_skips_reports_skipped_stages() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .args([
                "run",
                "--name",
                "Reports",
                "--skip",
                "ui_ux_design,Security Review,implementation",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "skipped:   ui_ux_design, security_review",
            ))
            .stdout(predicate::str::contains("implementation"));
    }

    #[test]
    fn test_run_from_stage() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .args(["run", "--name", "Reports", "--from", "testing"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "skipped:   requirements_gathering, architecture_design, ui_ux_design, task_breakdown, implementation, code_review",
            ));
    }

    #[test]
    fn test_run_resumes_stored_feature() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .args(["run", "--name", "Search", "--feature-id", "feat-2"])
            .assert()
            .success();

        stagecraft()
            .current_dir(dir.path())
            .args(["run", "--feature-id", "feat-2", "--from", "deployment"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Running Search (feat-2)"));
    }

    #[test]
    fn test_run_refuses_to_overwrite_corrupt_feature() {
        let dir = create_temp_project();
        let features = dir.path().join(".stagecraft/features");
        fs::create_dir_all(&features).unwrap();
        let snapshot = features.join("feat-7.json");
        fs::write(&snapshot, "{\"id\": \"feat-7\", truncated").unwrap();

        stagecraft()
            .current_dir(dir.path())
            .args([
                "run",
                "--feature-id",
                "feat-7",
                "--name",
                "Other",
                "--from",
                "deployment",
            ])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Running").not())
            .stderr(predicate::str::contains("Failed to load feature feat-7"));

        let content = fs::read_to_string(&snapshot).unwrap();
        assert_eq!(content, "{\"id\": \"feat-7\", truncated");
    }

    #[test]
    fn test_run_rejects_path_like_feature_id() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .args(["run", "--feature-id", "../escape", "--name", "X"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid feature id"));

        assert!(!dir.path().join(".stagecraft/escape.json").exists());
    }

    #[test]
    fn test_run_without_name_fails() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--name is required"));
    }

    #[test]
    fn test_run_with_unknown_skip_fails() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .args(["run", "--name", "X", "--skip", "launch"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid --skip list"));
    }

    #[test]
    fn test_run_with_unknown_from_fails() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .args(["run", "--name", "X", "--from", "launch"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid --from stage"));
    }

    #[test]
    fn test_run_infers_skips_from_description() {
        let dir = create_temp_project();

        stagecraft()
            .current_dir(dir.path())
            .args([
                "run",
                "--name",
                "Warmup",
                "--description",
                "Headless internal tool for cache warmup",
                "--infer-skips",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "skipped:   ui_ux_design, documentation, deployment",
            ));
    }
}

// =============================================================================
// External Workers
// =============================================================================

#[cfg(unix)]
mod external_worker {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_external_worker_stream_output() {
        let dir = create_temp_project();
        let script = write_script(
            &dir,
            "worker.sh",
            r#"cat > /dev/null
echo '{"type":"result","subtype":"success","result":"done","is_error":false,"usage":{"input_tokens":3,"output_tokens":4}}'"#,
        );

        stagecraft()
            .current_dir(dir.path())
            .env("STAGECRAFT_WORKER_CMD", &script)
            .args(["run", "--name", "Ext", "--from", "deployment"])
            .assert()
            .success()
            .stdout(predicate::str::contains("worker: external"))
            .stdout(predicate::str::contains("Pipeline completed"))
            .stdout(predicate::str::contains("tokens: 14"));
    }

    #[test]
    fn test_failing_external_worker_halts_run() {
        let dir = create_temp_project();
        let script = write_script(&dir, "broken.sh", "cat > /dev/null\necho boom >&2\nexit 3");

        stagecraft()
            .current_dir(dir.path())
            .env("STAGECRAFT_WORKER_CMD", &script)
            .args(["run", "--name", "Ext", "--max-retries", "0"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Pipeline halted"))
            .stdout(predicate::str::contains("failed:    requirements_gathering"))
            .stdout(predicate::str::contains("boom"));
    }
}

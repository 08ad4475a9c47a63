//! Tests for the whole clone step.

use std::path::{Path, PathBuf};

use git_clone_checkout::{
    CheckoutConfig, CommandRunner, ErrorTag, GitCommand, GitResult, NoPatchSource, StepOptions,
    run_step,
};
use tempfile::TempDir;

use super::support::RecordingRunner;

const REPO_URL: &str = "https://github.com/acme/app.git";

fn config(dir: &Path) -> CheckoutConfig {
    CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        clone_into_dir: dir.join("app"),
        commit: "76a934ae".to_string(),
        update_submodules: false,
        ..Default::default()
    }
}

fn options(dir: &Path) -> StepOptions {
    StepOptions {
        env_export_file: Some(dir.join("exports")),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fresh_clone() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = config(temp_dir.path());
    let runner = RecordingRunner::new()
        .with_output("log -1 --format=%H", "76a934ae0f1b")
        .with_output("log -1 --format=%s", "Fix the build")
        .with_output("rev-list HEAD --count", "42");

    run_step(&cfg, &options(temp_dir.path()), &runner, &NoPatchSource)
        .await
        .unwrap();

    assert!(cfg.clone_into_dir.is_dir());
    let commands = runner.commands();
    assert_eq!(
        commands[..4],
        [
            "init".to_string(),
            format!("remote add origin {REPO_URL}"),
            "fetch --no-tags --no-recurse-submodules origin".to_string(),
            "checkout 76a934ae".to_string(),
        ]
    );
    assert_eq!(commands[4], "log -1 --format=%H");
    assert_eq!(commands.last().unwrap(), "rev-list HEAD --count");
    assert_eq!(commands.len(), 12);

    let exports = std::fs::read_to_string(temp_dir.path().join("exports")).unwrap();
    assert!(exports.starts_with("GIT_CLONE_COMMIT_HASH=76a934ae0f1b\n"));
    assert!(exports.contains("GIT_CLONE_COMMIT_MESSAGE_SUBJECT=Fix the build\n"));
    assert!(exports.ends_with("GIT_CLONE_COMMIT_COUNT=42\n"));
}

#[tokio::test]
async fn test_sparse_checkout_and_submodules() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = CheckoutConfig {
        sparse_directories: vec!["src".to_string(), "docs".to_string()],
        update_submodules: true,
        limit_submodule_update_depth: true,
        ..config(temp_dir.path())
    };
    let runner = RecordingRunner::new();

    run_step(&cfg, &StepOptions::default(), &runner, &NoPatchSource)
        .await
        .unwrap();

    let commands = runner.commands();
    assert_eq!(
        commands[2..6],
        [
            "sparse-checkout init --cone".to_string(),
            "sparse-checkout set src docs".to_string(),
            "fetch --filter=tree:0 --no-tags --recurse-submodules origin".to_string(),
            "checkout 76a934ae".to_string(),
        ]
    );
    assert_eq!(
        commands[6],
        "submodule update --init --recursive --depth=1 --jobs=10"
    );
}

#[tokio::test]
async fn test_long_subject_is_trimmed() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = config(temp_dir.path());
    let opts = StepOptions {
        env_bytes_limit_kb: 1,
        ..options(temp_dir.path())
    };
    let subject = "x".repeat(2000);
    let runner = RecordingRunner::new().with_output("log -1 --format=%s", &subject);

    run_step(&cfg, &opts, &runner, &NoPatchSource).await.unwrap();

    let exports = std::fs::read_to_string(temp_dir.path().join("exports")).unwrap();
    let expected = format!(
        "GIT_CLONE_COMMIT_MESSAGE_SUBJECT={}...\n",
        "x".repeat(1024 - 3)
    );
    assert!(exports.contains(&expected));
}

#[tokio::test]
async fn test_no_exports_without_checkout_arg() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = CheckoutConfig {
        commit: String::new(),
        ..config(temp_dir.path())
    };
    let runner = RecordingRunner::new();

    run_step(&cfg, &options(temp_dir.path()), &runner, &NoPatchSource)
        .await
        .unwrap();

    assert_eq!(
        runner.commands(),
        ["init".to_string(), format!("remote add origin {REPO_URL}")]
    );
    assert!(!temp_dir.path().join("exports").exists());
}

#[tokio::test]
async fn test_init_failure() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = config(temp_dir.path());
    let runner = RecordingRunner::new().fail_on("init");

    let err = run_step(&cfg, &StepOptions::default(), &runner, &NoPatchSource)
        .await
        .unwrap_err();

    assert_eq!(err.tag(), ErrorTag::InitGitFailed);
    assert_eq!(err.tag().as_str(), "init_git_failed");
}

#[tokio::test]
async fn test_count_failure() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = config(temp_dir.path());
    let runner = RecordingRunner::new().fail_on("rev-list");

    let err = run_step(&cfg, &StepOptions::default(), &runner, &NoPatchSource)
        .await
        .unwrap_err();

    assert_eq!(err.tag(), ErrorTag::CountCommitsFailed);
}

#[tokio::test]
async fn test_existing_origin_with_reset() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = CheckoutConfig {
        reset_repository: true,
        commit: String::new(),
        ..config(temp_dir.path())
    };
    std::fs::create_dir_all(cfg.clone_into_dir.join(".git")).unwrap();
    let runner = RecordingRunner::new().with_output("remote -v", &remote_listing(REPO_URL));

    run_step(&cfg, &StepOptions::default(), &runner, &NoPatchSource)
        .await
        .unwrap();

    assert_eq!(
        runner.commands(),
        [
            "remote -v",
            "reset --hard HEAD",
            "clean -x -d -f",
            "submodule foreach git reset --hard HEAD",
            "submodule foreach git clean -x -d -f",
            "init",
        ]
    );
}

#[tokio::test]
async fn test_existing_origin_without_reset() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = config(temp_dir.path());
    std::fs::create_dir_all(cfg.clone_into_dir.join(".git")).unwrap();
    let runner = RecordingRunner::new().with_output("remote -v", &remote_listing(REPO_URL));

    run_step(&cfg, &StepOptions::default(), &runner, &NoPatchSource)
        .await
        .unwrap();

    let commands = runner.commands();
    assert_eq!(
        commands[..4],
        [
            "remote -v",
            "init",
            "fetch --no-tags --no-recurse-submodules origin",
            "checkout 76a934ae",
        ]
    );
    assert!(!commands.iter().any(|c| c.starts_with("remote add")));
    assert!(!commands.iter().any(|c| c.starts_with("reset")));
}

#[tokio::test]
async fn test_existing_repository_with_foreign_remote() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = config(temp_dir.path());
    std::fs::create_dir_all(cfg.clone_into_dir.join(".git")).unwrap();
    let runner = RecordingRunner::new()
        .with_output("remote -v", &remote_listing("https://github.com/other/app.git"));

    let err = run_step(&cfg, &StepOptions::default(), &runner, &NoPatchSource)
        .await
        .unwrap_err();

    assert_eq!(err.tag(), ErrorTag::CheckOriginPresentFailed);
    assert_eq!(err.tag().as_str(), "check_origin_present_failed");
    assert_eq!(runner.commands(), ["remote -v"]);
}

#[tokio::test]
async fn test_commit_count_export_failure() {
    let temp_dir = TempDir::new().unwrap();
    let cfg = config(temp_dir.path());
    let opts = options(temp_dir.path());
    let runner = ExportsBreakOnCount {
        inner: RecordingRunner::new().with_output("rev-list HEAD --count", "42"),
        export_file: temp_dir.path().join("exports"),
    };

    let err = run_step(&cfg, &opts, &runner, &NoPatchSource)
        .await
        .unwrap_err();

    assert_eq!(err.tag(), ErrorTag::ExportEnvsCommitCountFailed);
    assert_eq!(err.summary(), "Exporting commit count env failed");
}

fn remote_listing(url: &str) -> String {
    format!("origin\t{url} (fetch)\norigin\t{url} (push)")
}

/// Replaces the export file with a directory once commits are counted, so
/// only the last export can fail.
struct ExportsBreakOnCount {
    inner: RecordingRunner,
    export_file: PathBuf,
}

impl CommandRunner for ExportsBreakOnCount {
    async fn run(&self, command: &GitCommand) -> GitResult<String> {
        if command.args().first().map(String::as_str) == Some("rev-list") {
            std::fs::remove_file(&self.export_file).unwrap();
            std::fs::create_dir(&self.export_file).unwrap();
        }
        self.inner.run(command).await
    }
}

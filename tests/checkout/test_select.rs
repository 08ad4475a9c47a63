//! Tests for checkout method selection.

use std::path::PathBuf;

use git_clone_checkout::{CheckoutConfig, CheckoutMethod, NoPatchSource, select_checkout_method};

use super::support::MockPatchSource;

const REPO_URL: &str = "https://github.com/acme/git-clone-test.git";
const PUBLIC_FORK_URL: &str = "https://github.com/acme/other-repo.git";
const PRIVATE_FORK_URL: &str = "git@github.com:acme/other-repo.git";

/// Every flag off, like an empty step input.
fn base() -> CheckoutConfig {
    CheckoutConfig {
        should_merge_pr: false,
        manual_merge: false,
        ..Default::default()
    }
}

async fn select(cfg: &CheckoutConfig) -> CheckoutMethod {
    select_checkout_method(cfg, &NoPatchSource).await.0
}

async fn select_with_diff(cfg: &CheckoutConfig) -> (CheckoutMethod, Option<PathBuf>) {
    select_checkout_method(cfg, &MockPatchSource::with_diff("dummy_path")).await
}

#[tokio::test]
async fn test_plain_none() {
    assert_eq!(select(&base()).await, CheckoutMethod::None);
}

#[tokio::test]
async fn test_plain_priority() {
    let commit = CheckoutConfig {
        commit: "76a934a".to_string(),
        ..base()
    };
    assert_eq!(select(&commit).await, CheckoutMethod::Commit);

    let commit_and_branch = CheckoutConfig {
        commit: "76a934ae".to_string(),
        branch: "hcnarb".to_string(),
        ..base()
    };
    assert_eq!(select(&commit_and_branch).await, CheckoutMethod::Commit);

    let branch = CheckoutConfig {
        branch: "hcnarb".to_string(),
        ..base()
    };
    assert_eq!(select(&branch).await, CheckoutMethod::Branch);

    let tag = CheckoutConfig {
        tag: "gat".to_string(),
        ..base()
    };
    assert_eq!(select(&tag).await, CheckoutMethod::Tag);

    let tag_and_branch = CheckoutConfig {
        tag: "gat".to_string(),
        branch: "hcnarb".to_string(),
        ..base()
    };
    assert_eq!(select(&tag_and_branch).await, CheckoutMethod::Tag);

    let everything = CheckoutConfig {
        commit: "76a934ae".to_string(),
        tag: "gat".to_string(),
        branch: "hcnarb".to_string(),
        ..base()
    };
    assert_eq!(select(&everything).await, CheckoutMethod::Commit);
}

#[tokio::test]
async fn test_plain_mode_ignores_diff() {
    let cfg = CheckoutConfig {
        commit: "76a934ae".to_string(),
        build_url: "dummy_url".to_string(),
        ..base()
    };
    assert_eq!(select_with_diff(&cfg).await, (CheckoutMethod::Commit, None));
}

#[tokio::test]
async fn test_pr_manual_merge_no_fork() {
    let cfg = CheckoutConfig {
        commit: "76a934ae".to_string(),
        branch: "test/commit-messages".to_string(),
        pr_merge_branch: "pull/7/merge".to_string(),
        pr_dest_branch: "master".to_string(),
        pr_id: 7,
        clone_depth: 1,
        manual_merge: true,
        should_merge_pr: true,
        ..base()
    };
    assert_eq!(select(&cfg).await, CheckoutMethod::PrManualMerge);

    let without_id = CheckoutConfig {
        pr_merge_branch: String::new(),
        pr_id: 0,
        ..cfg
    };
    assert_eq!(select(&without_id).await, CheckoutMethod::PrManualMerge);
}

#[tokio::test]
async fn test_pr_manual_merge_public_fork() {
    let cfg = CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        pr_source_repository_url: PUBLIC_FORK_URL.to_string(),
        branch: "test/commit-messages".to_string(),
        pr_dest_branch: "master".to_string(),
        commit: "76a934ae".to_string(),
        manual_merge: true,
        should_merge_pr: true,
        ..base()
    };
    assert_eq!(select(&cfg).await, CheckoutMethod::PrManualMerge);
}

#[tokio::test]
async fn test_pr_same_repo_different_scheme_is_not_a_fork() {
    let cfg = CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        pr_source_repository_url: "git@github.com:acme/git-clone-test.git".to_string(),
        branch: "test/commit-messages".to_string(),
        pr_dest_branch: "master".to_string(),
        pr_merge_branch: "pull/7/merge".to_string(),
        pr_id: 7,
        commit: "76a934ae".to_string(),
        manual_merge: true,
        should_merge_pr: true,
        ..base()
    };
    assert_eq!(select(&cfg).await, CheckoutMethod::PrManualMerge);
}

#[tokio::test]
async fn test_pr_merge_branch() {
    let cfg = CheckoutConfig {
        pr_dest_branch: "master".to_string(),
        pr_merge_branch: "pull/5/merge".to_string(),
        should_merge_pr: true,
        ..base()
    };
    assert_eq!(select(&cfg).await, CheckoutMethod::PrMergeBranch);
}

#[tokio::test]
async fn test_pr_diff_file() {
    let cfg = CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        pr_dest_branch: "master".to_string(),
        pr_id: 7,
        commit: "76a934ae".to_string(),
        should_merge_pr: true,
        build_url: "dummy_url".to_string(),
        ..base()
    };
    assert_eq!(
        select_with_diff(&cfg).await,
        (CheckoutMethod::PrDiffFile, Some(PathBuf::from("dummy_path")))
    );
}

#[tokio::test]
async fn test_pr_diff_unavailable_falls_back_to_manual_merge() {
    let cfg = CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        pr_dest_branch: "master".to_string(),
        pr_id: 7,
        commit: "76a934ae".to_string(),
        should_merge_pr: true,
        build_url: "dummy_url".to_string(),
        ..base()
    };
    let selected = select_checkout_method(&cfg, &MockPatchSource::default()).await;
    assert_eq!(selected, (CheckoutMethod::PrManualMerge, None));
}

#[tokio::test]
async fn test_pr_diff_needs_build_url() {
    let cfg = CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        pr_dest_branch: "master".to_string(),
        pr_id: 7,
        commit: "76a934ae".to_string(),
        should_merge_pr: true,
        ..base()
    };
    assert_eq!(select_with_diff(&cfg).await, (CheckoutMethod::PrManualMerge, None));
}

#[tokio::test]
async fn test_private_fork_overrides_manual_merge() {
    let with_merge_branch = CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        pr_source_repository_url: PRIVATE_FORK_URL.to_string(),
        branch: "test/commit-messages".to_string(),
        pr_dest_branch: "master".to_string(),
        pr_merge_branch: "pull/7/merge".to_string(),
        pr_id: 7,
        commit: "76a934ae".to_string(),
        manual_merge: true,
        should_merge_pr: true,
        ..base()
    };
    assert_eq!(select(&with_merge_branch).await, CheckoutMethod::PrMergeBranch);

    let with_diff = CheckoutConfig {
        pr_merge_branch: String::new(),
        pr_id: 0,
        build_url: "dummy_url".to_string(),
        ..with_merge_branch.clone()
    };
    assert_eq!(select_with_diff(&with_diff).await.0, CheckoutMethod::PrDiffFile);

    let neither = CheckoutConfig {
        pr_merge_branch: String::new(),
        ..with_merge_branch
    };
    assert_eq!(select(&neither).await, CheckoutMethod::PrManualMerge);
}

#[tokio::test]
async fn test_no_merge_head_branch() {
    let cfg = CheckoutConfig {
        commit: "76a934ae".to_string(),
        branch: "test/commit-messages".to_string(),
        pr_merge_branch: "pull/7/merge".to_string(),
        pr_head_branch: "pull/7/head".to_string(),
        pr_dest_branch: "master".to_string(),
        clone_depth: 1,
        manual_merge: true,
        should_merge_pr: false,
        ..base()
    };
    assert_eq!(select(&cfg).await, CheckoutMethod::HeadBranchCommit);
}

#[tokio::test]
async fn test_no_merge_no_fork() {
    let cfg = CheckoutConfig {
        commit: "76a934ae".to_string(),
        branch: "test/commit-messages".to_string(),
        pr_dest_branch: "master".to_string(),
        clone_depth: 1,
        manual_merge: true,
        ..base()
    };
    assert_eq!(select(&cfg).await, CheckoutMethod::Commit);

    let with_diff = CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        commit: "76a934ae".to_string(),
        pr_dest_branch: "master".to_string(),
        pr_id: 7,
        build_url: "dummy_url".to_string(),
        ..base()
    };
    assert_eq!(select_with_diff(&with_diff).await, (CheckoutMethod::Commit, None));
}

#[tokio::test]
async fn test_no_merge_public_fork() {
    let cfg = CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        pr_source_repository_url: PUBLIC_FORK_URL.to_string(),
        branch: "test/commit-messages".to_string(),
        pr_dest_branch: "master".to_string(),
        commit: "76a934ae".to_string(),
        manual_merge: true,
        ..base()
    };
    assert_eq!(select(&cfg).await, CheckoutMethod::ForkCommit);
}

#[tokio::test]
async fn test_no_merge_private_fork() {
    let cfg = CheckoutConfig {
        repository_url: REPO_URL.to_string(),
        pr_source_repository_url: PRIVATE_FORK_URL.to_string(),
        branch: "test/commit-messages".to_string(),
        pr_dest_branch: "master".to_string(),
        pr_id: 7,
        commit: "76a934ae".to_string(),
        manual_merge: true,
        build_url: "dummy_url".to_string(),
        ..base()
    };
    assert_eq!(
        select_with_diff(&cfg).await,
        (CheckoutMethod::PrDiffFile, Some(PathBuf::from("dummy_path")))
    );

    // without a diff the fork is fetched directly, which may lack credentials
    assert_eq!(select(&cfg).await, CheckoutMethod::ForkCommit);
}

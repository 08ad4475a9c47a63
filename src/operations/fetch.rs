//! Fetch, checkout and merge steps shared by the checkout strategies

use log::{info, warn};

use super::remote::{REFS_HEADS_PREFIX, list_branches};
use super::{CommandRunner, FallbackRetry, GitCommand, ORIGIN_REMOTE};
use crate::{ErrorTag, GitError, StepError};

/// How much to fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// History depth; 0 fetches the full history
    pub depth: u32,
    /// Fetch tags as well (`--tags` / `--no-tags`)
    pub tags: bool,
    /// Recurse into submodules while fetching
    pub fetch_submodules: bool,
    /// Blob-less fetch (`--filter=tree:0`); only valid with full depth
    pub filter_tree: bool,
}

impl FetchOptions {
    pub fn new(depth: u32, tags: bool, fetch_submodules: bool) -> Self {
        Self {
            depth,
            tags,
            fetch_submodules,
            filter_tree: false,
        }
    }

    /// Enable tree filtering, which forces a full-depth fetch.
    pub fn with_tree_filter(mut self) -> Self {
        self.filter_tree = true;
        self.depth = 0;
        self
    }

    pub fn is_full_depth(&self) -> bool {
        self.depth == 0
    }

    fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.depth != 0 {
            args.push(format!("--depth={}", self.depth));
        }
        if self.filter_tree {
            args.push("--filter=tree:0".to_string());
        }
        args.push(tags_flag(self.tags).to_string());
        args.push(submodules_flag(self.fetch_submodules).to_string());
        args
    }
}

pub(crate) fn tags_flag(tags: bool) -> &'static str {
    if tags { "--tags" } else { "--no-tags" }
}

pub(crate) fn submodules_flag(fetch_submodules: bool) -> &'static str {
    if fetch_submodules {
        "--recurse-submodules"
    } else {
        "--no-recurse-submodules"
    }
}

/// `git fetch <options> <remote> [<refspec>]`
pub async fn fetch<R: CommandRunner>(
    runner: &R,
    remote: &str,
    refspec: Option<&str>,
    opts: &FetchOptions,
) -> Result<(), StepError> {
    let mut args = opts.args();
    args.push(remote.to_string());
    if let Some(refspec) = refspec.filter(|r| !r.is_empty()) {
        args.push(refspec.to_string());
    }

    runner
        .run(&GitCommand::fetch(args))
        .await
        .map(|_| ())
        .map_err(|e| StepError::new(ErrorTag::FetchFailed, e, "Fetching repository has failed"))
}

/// Fetch a branch and leave it checked out at its remote tip.
///
/// On failure, the error is enriched with the branches available on
/// `origin` when the requested one is not among them.
pub async fn fetch_initial_branch<R: CommandRunner>(
    runner: &R,
    remote: &str,
    branch_ref: &str,
    opts: &FetchOptions,
) -> Result<(), StepError> {
    let branch = branch_ref.strip_prefix(REFS_HEADS_PREFIX).unwrap_or(branch_ref);

    if let Err(err) = fetch(runner, remote, Some(branch_ref), opts).await {
        return Err(with_branch_suggestions(runner, err, branch).await);
    }

    if let Err(err) = checkout_with_retry(runner, branch, None).await {
        return Err(with_branch_suggestions(runner, err, branch).await);
    }

    // fetch followed by merge of the remote-tracking branch is a pull
    let remote_branch = format!("{remote}/{branch}");
    runner
        .run(&GitCommand::merge(&remote_branch))
        .await
        .map(|_| ())
        .map_err(|e| StepError::new(ErrorTag::CheckoutFailed, e, "Updating branch has failed"))
}

async fn with_branch_suggestions<R: CommandRunner>(
    runner: &R,
    err: StepError,
    branch: &str,
) -> StepError {
    let branches_by_remote = match list_branches(runner).await {
        Ok(branches) => branches,
        Err(list_err) => {
            info!("Could not list remote branches: {list_err}");
            return err;
        }
    };

    let branches = branches_by_remote
        .get(ORIGIN_REMOTE)
        .cloned()
        .unwrap_or_default();
    if branches.iter().any(|b| b == branch) {
        return err;
    }

    err.with_branch_suggestions(branches)
}

/// `git checkout <arg>`, retried once after `fallback` when it fails.
pub async fn checkout_with_retry<R: CommandRunner>(
    runner: &R,
    arg: &str,
    fallback: Option<&FallbackRetry>,
) -> Result<(), StepError> {
    run_with_retry(runner, &GitCommand::checkout(arg), fallback, |e| {
        StepError::new(ErrorTag::CheckoutFailed, e, "Checkout has failed")
    })
    .await
}

/// `git merge <arg>`, retried once after `fallback` when it fails.
pub async fn merge_with_retry<R: CommandRunner>(
    runner: &R,
    arg: &str,
    fallback: Option<&FallbackRetry>,
) -> Result<(), StepError> {
    run_with_retry(runner, &GitCommand::merge(arg), fallback, |e| {
        StepError::new(ErrorTag::CheckoutFailed, e, "Merge has failed")
    })
    .await
}

async fn run_with_retry<R, F>(
    runner: &R,
    command: &GitCommand,
    fallback: Option<&FallbackRetry>,
    wrap: F,
) -> Result<(), StepError>
where
    R: CommandRunner,
    F: Fn(GitError) -> StepError,
{
    let Err(err) = runner.run(command).await else {
        return Ok(());
    };
    let Some(fallback) = fallback else {
        return Err(wrap(err));
    };

    warn!("`{command}` failed, retrying with the full history: {err}");
    fallback.apply(runner).await?;

    runner.run(command).await.map(|_| ()).map_err(wrap)
}

/// Detach HEAD so merge results are a standalone commit.
pub async fn detach_head<R: CommandRunner>(runner: &R) -> Result<(), StepError> {
    runner
        .run(&GitCommand::detach())
        .await
        .map(|_| ())
        .map_err(|e| StepError::new(ErrorTag::CheckoutFailed, e, "Detaching HEAD has failed"))
}

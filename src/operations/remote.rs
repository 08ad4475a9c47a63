//! Remote repository naming and identity
//!
//! Repository URLs are compared with a prefix heuristic
//! (https, scp-like `git@host:path` and `ssh://`), not a full URL parser.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::command::JOBS_FLAG;
use super::{CommandRunner, GitCommand};
use crate::GitResult;

/// Name of the remote pointing at the target repository
pub const ORIGIN_REMOTE: &str = "origin";
/// Name of the remote added for pull requests opened from a fork
pub const FORK_REMOTE: &str = "fork";

pub const REFS_PREFIX: &str = "refs/";
pub const REFS_HEADS_PREFIX: &str = "refs/heads/";

static MERGE_BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^pull/(.*)/merge$").expect("valid merge branch pattern"));

/// Reduce a repository URL to `host/owner/repository`.
///
/// Supported formats:
/// - `https://[user[:password]@]hostname/owner/repository.git`
/// - `git@hostname:owner/repository.git`
/// - `ssh://git@hostname[:port]/owner/repository.git`
///
/// Anything else reduces to `/`.
pub fn repository_identity(url: &str) -> String {
    let (host, repo) = if let Some(rest) = url.strip_prefix("https://") {
        let (host, repo) = rest.split_once('/').unwrap_or((rest, ""));
        let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
        (host, repo)
    } else if url.starts_with("git@") {
        let rest = after_user(url);
        rest.split_once(':').unwrap_or((rest, ""))
    } else if url.starts_with("ssh://") {
        let rest = after_user(url);
        match (rest.find(':'), rest.find('/')) {
            (Some(colon), Some(slash)) => (&rest[..colon], &rest[slash + 1..]),
            (Some(colon), None) => (&rest[..colon], ""),
            (None, _) => rest.split_once('/').unwrap_or((rest, "")),
        }
    } else {
        ("", "")
    };

    format!("{host}/{}", repo.strip_suffix(".git").unwrap_or(repo))
}

fn after_user(url: &str) -> &str {
    url.find('@').map_or(url, |idx| &url[idx + 1..])
}

/// A pull request comes from a fork when its source repository is set and
/// differs from the target repository.
pub fn is_fork(repo_url: &str, pr_repo_url: &str) -> bool {
    !pr_repo_url.is_empty() && repository_identity(repo_url) != repository_identity(pr_repo_url)
}

/// SSH-style URLs are taken as a sign of a private repository.
///
/// This only looks at the URL prefix; the actual visibility of the
/// repository is never checked.
pub fn is_private(repo_url: &str) -> bool {
    repo_url.starts_with("git@") || repo_url.starts_with("ssh://")
}

/// Refspec fetching a provider merge branch.
///
/// `pull/<n>/merge` becomes `refs/pull/<n>/head:pull/<n>`, anything else is
/// fetched as a plain branch.
pub fn fetch_arg(merge_branch: &str) -> String {
    if MERGE_BRANCH_RE.is_match(merge_branch) {
        return MERGE_BRANCH_RE
            .replace(merge_branch, "refs/pull/$1/head:pull/$1")
            .into_owned();
    }
    format!("{REFS_HEADS_PREFIX}{merge_branch}:{merge_branch}")
}

/// Local ref to merge after fetching with [`fetch_arg`].
pub fn merge_arg(merge_branch: &str) -> String {
    merge_branch
        .strip_suffix("/merge")
        .unwrap_or(merge_branch)
        .to_string()
}

/// Fetch everything and list remote-tracking branches grouped by remote.
pub async fn list_branches<R: CommandRunner>(
    runner: &R,
) -> GitResult<BTreeMap<String, Vec<String>>> {
    runner.run(&GitCommand::fetch([JOBS_FLAG])).await?;
    let output = runner.run(&GitCommand::branch(&["-r"])).await?;
    Ok(parse_branch_list(&output))
}

fn parse_branch_list(output: &str) -> BTreeMap<String, Vec<String>> {
    let mut branches_by_remote: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for line in output.lines() {
        let line = line.trim_matches(' ');
        if let Some((remote, branch)) = line.split_once('/') {
            branches_by_remote
                .entry(remote.to_string())
                .or_default()
                .push(branch.to_string());
        }
    }
    branches_by_remote
}

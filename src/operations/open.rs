//! Inspection of an already existing clone directory

use std::path::Path;

use super::{CommandRunner, GitCommand};
use crate::{GitError, GitResult};

/// What was found in the clone directory before the checkout starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginState {
    /// No `.git` directory; the repository still needs `init` and `origin`.
    Absent,
    /// A repository whose remotes already point at the target URL.
    Present,
}

/// Check whether `dir` already holds a clone of `repo_url`.
///
/// An existing repository whose `git remote -v` listing does not mention
/// `repo_url` is an error: the step refuses to reuse a directory cloned
/// from elsewhere.
pub async fn check_origin<R: CommandRunner>(
    runner: &R,
    dir: &Path,
    repo_url: &str,
) -> GitResult<OriginState> {
    let git_dir = dir.join(".git");
    match tokio::fs::metadata(&git_dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(OriginState::Absent),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(OriginState::Absent),
        Err(e) => return Err(GitError::Io(e)),
    }

    let remotes = runner.run(&GitCommand::remote_list()).await?;
    if remotes.contains(repo_url) {
        Ok(OriginState::Present)
    } else {
        Err(GitError::InvalidInput(format!(
            ".git folder exists in the directory ({}), but using a different remote",
            dir.display()
        )))
    }
}

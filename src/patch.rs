//! Pull request diff files
//!
//! Some CI providers expose the diff of a pull request next to the build.
//! Applying that diff on top of the destination branch yields the merge
//! result without fetching the source branch, which matters for private
//! forks the build has no credentials for.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;

use crate::{GitError, GitResult};

/// Produces a local diff file for a build.
pub trait PatchSource {
    fn diff_path(
        &self,
        build_url: &str,
        build_api_token: &str,
    ) -> impl Future<Output = GitResult<PathBuf>>;
}

/// Downloads `<build_url>/diff.txt` into a temporary file that outlives
/// the process.
#[derive(Debug, Clone)]
pub struct HttpPatchSource {
    client: Client,
}

impl HttpPatchSource {
    pub fn new() -> GitResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { client })
    }

    fn diff_url(build_url: &str) -> String {
        format!("{}/diff.txt", build_url.trim_end_matches('/'))
    }
}

impl PatchSource for HttpPatchSource {
    async fn diff_path(&self, build_url: &str, build_api_token: &str) -> GitResult<PathBuf> {
        let url = Self::diff_url(build_url);
        let response = self
            .client
            .get(&url)
            .query(&[("api_token", build_api_token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GitError::InvalidInput(format!(
                "diff file request to {url} failed with status {status}"
            )));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(GitError::InvalidInput(format!("diff file at {url} is empty")));
        }

        tokio::task::spawn_blocking(move || {
            let mut file = tempfile::Builder::new()
                .prefix("pr-")
                .suffix(".diff")
                .tempfile()?;
            file.write_all(&body)?;
            let (_, path) = file.keep().map_err(|e| GitError::Io(e.error))?;
            Ok::<_, GitError>(path)
        })
        .await
        .map_err(|e| GitError::InvalidInput(format!("Task join error: {e}")))?
    }
}

/// Used when no diff can be provided; every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPatchSource;

impl PatchSource for NoPatchSource {
    async fn diff_path(&self, _build_url: &str, _build_api_token: &str) -> GitResult<PathBuf> {
        Err(GitError::InvalidInput(
            "no diff file source configured".to_string(),
        ))
    }
}

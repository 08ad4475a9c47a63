//! Unshallow fallbacks for checkouts that need more history
//!
//! A shallow fetch is sometimes not enough: the requested commit may sit
//! below the fetched depth, or a merge may need a common ancestor that was
//! cut off. A fallback fetches the full history once so the failed step can
//! be run again.

use log::warn;

use super::fetch::{submodules_flag, tags_flag};
use super::{CommandRunner, GitCommand, reset_repo};
use crate::{ErrorTag, StepError};

/// The part of the fetch options that still applies to a full-depth refetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnshallowFetchOptions {
    pub tags: bool,
    pub fetch_submodules: bool,
}

/// How to recover from a failed checkout or merge after a shallow fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackRetry {
    /// Fetch the missing history, then retry.
    SimpleUnshallow(UnshallowFetchOptions),
    /// Discard a half-done merge first, then fetch the missing history.
    ResetUnshallow(UnshallowFetchOptions),
}

impl FallbackRetry {
    pub fn options(&self) -> UnshallowFetchOptions {
        match self {
            FallbackRetry::SimpleUnshallow(opts) | FallbackRetry::ResetUnshallow(opts) => *opts,
        }
    }

    /// Bring the repository into a state where the failed step can run again.
    pub async fn apply<R: CommandRunner>(&self, runner: &R) -> Result<(), StepError> {
        if let FallbackRetry::ResetUnshallow(_) = self {
            reset_repo(runner).await.map_err(|e| {
                StepError::new(ErrorTag::CheckoutFailed, e, "Resetting repository has failed")
            })?;
        }

        unshallow(runner, &self.options()).await
    }
}

async fn unshallow<R: CommandRunner>(
    runner: &R,
    opts: &UnshallowFetchOptions,
) -> Result<(), StepError> {
    warn!("Fetching the full history (unshallow)");

    let command = GitCommand::fetch([
        "--unshallow",
        tags_flag(opts.tags),
        submodules_flag(opts.fetch_submodules),
    ]);
    runner
        .run(&command)
        .await
        .map(|_| ())
        .map_err(|e| StepError::new(ErrorTag::FetchFailed, e, "Fetching full history has failed"))
}

//! Whole-repository housekeeping: reset, sparse checkout and submodules

use super::command::JOBS_FLAG;
use super::{CommandRunner, GitCommand};
use crate::{ErrorTag, GitResult, StepError};

/// Throw away local changes and untracked files, in submodules too.
pub async fn reset_repo<R: CommandRunner>(runner: &R) -> GitResult<()> {
    let reset = GitCommand::reset("--hard", "HEAD");
    let clean = GitCommand::clean(&["-x", "-d", "-f"]);

    runner.run(&reset).await?;
    runner.run(&clean).await?;
    runner.run(&GitCommand::submodule_foreach(&reset)).await?;
    runner.run(&GitCommand::submodule_foreach(&clean)).await?;
    Ok(())
}

/// Restrict the working tree to `dirs` (cone mode). No-op without dirs.
pub async fn setup_sparse_checkout<R: CommandRunner>(
    runner: &R,
    dirs: &[String],
) -> Result<(), StepError> {
    if dirs.is_empty() {
        return Ok(());
    }

    runner
        .run(&GitCommand::sparse_checkout_init(true))
        .await
        .map_err(|e| {
            StepError::new(
                ErrorTag::SparseCheckoutFailed,
                e,
                "Initializing sparse-checkout config has failed",
            )
        })?;

    runner
        .run(&GitCommand::sparse_checkout_set(dirs))
        .await
        .map_err(|e| {
            StepError::new(
                ErrorTag::SparseCheckoutFailed,
                e,
                "Updating sparse-checkout config has failed",
            )
        })?;

    Ok(())
}

/// `git submodule update --init --recursive`, optionally one commit deep.
pub async fn update_submodules<R: CommandRunner>(
    runner: &R,
    limit_depth: bool,
) -> Result<(), StepError> {
    runner
        .run(&GitCommand::submodule_update(limit_depth, &[JOBS_FLAG]))
        .await
        .map(|_| ())
        .map_err(|e| {
            StepError::new(
                ErrorTag::UpdateSubmoduleFailed,
                e,
                "Updating submodules has failed",
            )
        })
}

//! The clone step end to end
//!
//! Prepares the clone directory (reusing an existing clone of the same
//! repository), checks out the requested state, updates submodules and
//! exports details of the resulting commit.

use log::info;

use crate::checkout::checkout_state;
use crate::export::{EnvExporter, trim_value};
use crate::operations::{
    CommandRunner, GitCommand, ORIGIN_REMOTE, OriginState, check_origin, reset_repo,
    setup_sparse_checkout, update_submodules,
};
use crate::patch::PatchSource;
use crate::{CheckoutConfig, ErrorTag, StepError, StepOptions};

/// `git log -1` formats and the variables they are exported as.
const COMMIT_EXPORTS: [(&str, &str); 7] = [
    ("%H", "GIT_CLONE_COMMIT_HASH"),
    ("%s", "GIT_CLONE_COMMIT_MESSAGE_SUBJECT"),
    ("%b", "GIT_CLONE_COMMIT_MESSAGE_BODY"),
    ("%an", "GIT_CLONE_COMMIT_AUTHOR_NAME"),
    ("%ae", "GIT_CLONE_COMMIT_AUTHOR_EMAIL"),
    ("%cn", "GIT_CLONE_COMMIT_COMMITER_NAME"),
    ("%ce", "GIT_CLONE_COMMIT_COMMITER_EMAIL"),
];

const TRIMMED_EXPORTS: [&str; 2] = [
    "GIT_CLONE_COMMIT_MESSAGE_SUBJECT",
    "GIT_CLONE_COMMIT_MESSAGE_BODY",
];

/// Run the clone step in `cfg.clone_into_dir`.
///
/// `runner` must execute commands inside that directory.
pub async fn run_step<R, P>(
    cfg: &CheckoutConfig,
    opts: &StepOptions,
    runner: &R,
    patch: &P,
) -> Result<(), StepError>
where
    R: CommandRunner,
    P: PatchSource,
{
    tokio::fs::create_dir_all(&cfg.clone_into_dir)
        .await
        .map_err(|e| {
            StepError::new(
                ErrorTag::CreateDirectoryFailed,
                e,
                "Creating new git project directory failed",
            )
        })?;

    let origin = check_origin(runner, &cfg.clone_into_dir, &cfg.repository_url)
        .await
        .map_err(|e| {
            StepError::new(
                ErrorTag::CheckOriginPresentFailed,
                e,
                "Checking whether origin is present failed",
            )
        })?;

    if origin == OriginState::Present && cfg.reset_repository {
        reset_repo(runner).await.map_err(|e| {
            StepError::new(
                ErrorTag::ResetRepositoryFailed,
                e,
                "Resetting repository failed",
            )
        })?;
    }

    runner
        .run(&GitCommand::init())
        .await
        .map_err(|e| StepError::new(ErrorTag::InitGitFailed, e, "Initializing git has failed"))?;

    if origin == OriginState::Absent {
        runner
            .run(&GitCommand::remote_add(ORIGIN_REMOTE, &cfg.repository_url))
            .await
            .map_err(|e| {
                StepError::new(
                    ErrorTag::AddRemoteFailed,
                    e,
                    format!("Adding remote repository failed ({})", cfg.repository_url),
                )
            })?;
    }

    setup_sparse_checkout(runner, &cfg.sparse_directories).await?;

    checkout_state(runner, cfg, patch).await?;

    if cfg.update_submodules {
        update_submodules(runner, cfg.limit_submodule_update_depth).await?;
    }

    if cfg.checkout_arg().is_some() {
        let exporter = EnvExporter::new(opts.env_export_file.clone());
        export_commit_details(runner, &exporter, opts.max_env_length()).await?;
    }

    Ok(())
}

async fn export_commit_details<R: CommandRunner>(
    runner: &R,
    exporter: &EnvExporter,
    max_env_length: usize,
) -> Result<(), StepError> {
    info!("Exporting git logs");

    let export_failed =
        |e: crate::GitError| StepError::new(ErrorTag::ExportEnvsFailed, e, "Exporting envs failed");

    for (format, key) in COMMIT_EXPORTS {
        let mut value = runner
            .run(&GitCommand::log(format))
            .await
            .map_err(export_failed)?;
        if TRIMMED_EXPORTS.contains(&key) {
            value = trim_value(key, &value, max_env_length);
        }
        exporter.export(key, &value).await.map_err(export_failed)?;
    }

    let count = runner
        .run(&GitCommand::rev_list("HEAD", &["--count"]))
        .await
        .map_err(|e| StepError::new(ErrorTag::CountCommitsFailed, e, "Counting commits failed"))?;
    exporter
        .export("GIT_CLONE_COMMIT_COUNT", &count)
        .await
        .map_err(|e| {
            StepError::new(
                ErrorTag::ExportEnvsCommitCountFailed,
                e,
                "Exporting commit count env failed",
            )
        })?;

    Ok(())
}

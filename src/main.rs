// Git clone step binary
//
// Reads the step configuration from `--config <FILE>` or from the step
// inputs (flags or environment variables), then checks out the requested
// state into `clone_into_dir`.

use anyhow::Result;
use clap::Parser;
use log::error;

use git_clone_checkout::{CliRunner, HttpPatchSource, StepArgs, run_step};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (cfg, opts) = StepArgs::parse().into_parts()?;

    let runner = CliRunner::new(&cfg.clone_into_dir).timeout_secs(opts.command_timeout_secs);
    let patch = HttpPatchSource::new()?;

    if let Err(err) = run_step(&cfg, &opts, &runner, &patch).await {
        error!("[{}] {}", err.tag(), err.summary());
        error!("{}", err.cause());
        if let Some(branches) = err.branch_suggestions() {
            error!("Available branches on origin: {}", branches.join(", "));
        }
        return Err(err.into());
    }

    Ok(())
}

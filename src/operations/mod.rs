//! Git operations module
//!
//! Building blocks the checkout strategies are made of: the command
//! capability, fetch/checkout/merge helpers with fallback retry, remote URL
//! heuristics and whole-repository housekeeping.

pub mod command;
pub mod fallback;
pub mod fetch;
pub mod open;
pub mod remote;
pub mod repo;
pub mod runner;

// Re-export operation functions
pub use command::GitCommand;
pub use fallback::{FallbackRetry, UnshallowFetchOptions};
pub use fetch::{
    FetchOptions, checkout_with_retry, detach_head, fetch, fetch_initial_branch,
    merge_with_retry,
};
pub use open::{OriginState, check_origin};
pub use remote::{
    FORK_REMOTE, ORIGIN_REMOTE, REFS_HEADS_PREFIX, REFS_PREFIX, fetch_arg, is_fork, is_private,
    list_branches, merge_arg, repository_identity,
};
pub use repo::{reset_repo, setup_sparse_checkout, update_submodules};
pub use runner::{CliRunner, CommandRunner};

//! Git command lines
//!
//! A [`GitCommand`] is only an argument vector; running it is the job of a
//! [`CommandRunner`](super::CommandRunner). Keeping the two apart lets tests
//! record and script every command a strategy issues.

use std::fmt;
use std::path::Path;

/// Number of parallel jobs for fetches and submodule updates
pub const JOBS_FLAG: &str = "--jobs=10";

/// Arguments of a single `git` invocation (without the leading `git`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    args: Vec<String>,
}

impl GitCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// `git init`
    pub fn init() -> Self {
        Self::new(["init"])
    }

    /// `git remote add <name> <url>`
    pub fn remote_add(name: &str, url: &str) -> Self {
        Self::new(["remote", "add", name, url])
    }

    /// `git remote -v`
    pub fn remote_list() -> Self {
        Self::new(["remote", "-v"])
    }

    /// `git fetch <opts...>`; the caller orders options before remote and refspec.
    pub fn fetch<I, S>(opts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = vec!["fetch".to_string()];
        args.extend(opts.into_iter().map(Into::into));
        Self { args }
    }

    /// `git checkout <arg>`
    pub fn checkout(arg: &str) -> Self {
        Self::new(["checkout", arg])
    }

    /// `git checkout --detach`
    pub fn detach() -> Self {
        Self::new(["checkout", "--detach"])
    }

    /// `git merge <arg>`
    pub fn merge(arg: &str) -> Self {
        Self::new(["merge", arg])
    }

    /// `git reset <mode> <arg>`, e.g. `reset --hard HEAD`
    pub fn reset(mode: &str, arg: &str) -> Self {
        Self::new(["reset", mode, arg])
    }

    /// `git clean <flags...>`
    pub fn clean(flags: &[&str]) -> Self {
        let mut args = vec!["clean".to_string()];
        args.extend(flags.iter().map(|f| (*f).to_string()));
        Self { args }
    }

    /// `git apply --index <patch>`
    pub fn apply(patch: &Path) -> Self {
        Self::new([
            "apply".to_string(),
            "--index".to_string(),
            patch.to_string_lossy().into_owned(),
        ])
    }

    /// `git log -1 --format=<format>`
    pub fn log(format: &str) -> Self {
        Self::new(["log".to_string(), "-1".to_string(), format!("--format={format}")])
    }

    /// `git rev-list <rev> <flags...>`
    pub fn rev_list(rev: &str, flags: &[&str]) -> Self {
        let mut args = vec!["rev-list".to_string(), rev.to_string()];
        args.extend(flags.iter().map(|f| (*f).to_string()));
        Self { args }
    }

    /// `git branch <flags...>`
    pub fn branch(flags: &[&str]) -> Self {
        let mut args = vec!["branch".to_string()];
        args.extend(flags.iter().map(|f| (*f).to_string()));
        Self { args }
    }

    /// `git submodule update --init --recursive [--depth=1] <opts...>`
    pub fn submodule_update(limit_depth: bool, opts: &[&str]) -> Self {
        let mut args: Vec<String> = ["submodule", "update", "--init", "--recursive"]
            .iter()
            .map(|a| (*a).to_string())
            .collect();
        if limit_depth {
            args.push("--depth=1".to_string());
        }
        args.extend(opts.iter().map(|o| (*o).to_string()));
        Self { args }
    }

    /// `git submodule foreach "<git command>"`
    pub fn submodule_foreach(action: &GitCommand) -> Self {
        Self::new([
            "submodule".to_string(),
            "foreach".to_string(),
            action.to_string(),
        ])
    }

    /// `git sparse-checkout init [--cone]`
    pub fn sparse_checkout_init(cone: bool) -> Self {
        if cone {
            Self::new(["sparse-checkout", "init", "--cone"])
        } else {
            Self::new(["sparse-checkout", "init"])
        }
    }

    /// `git sparse-checkout set <dirs...>`
    pub fn sparse_checkout_set(dirs: &[String]) -> Self {
        let mut args = vec!["sparse-checkout".to_string(), "set".to_string()];
        args.extend(dirs.iter().cloned());
        Self { args }
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("git")?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

//! Environment exports
//!
//! Values describing the checked out commit are handed to later CI steps as
//! `KEY=value` lines appended to an export file. Multiline values use the
//! `KEY<<DELIMITER` heredoc form.

use std::path::PathBuf;

use log::{info, warn};
use tokio::io::AsyncWriteExt;

use crate::GitResult;

const TRIM_ENDING: &str = "...";
const HEREDOC_DELIMITER: &str = "__GIT_CLONE_EOF__";

/// Exports values by logging them and, when configured, appending them to a
/// file.
#[derive(Debug, Clone, Default)]
pub struct EnvExporter {
    file: Option<PathBuf>,
}

impl EnvExporter {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    pub async fn export(&self, key: &str, value: &str) -> GitResult<()> {
        info!("=> {key}\n   value: {value}");

        let Some(path) = &self.file else {
            return Ok(());
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(format_line(key, value).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn format_line(key: &str, value: &str) -> String {
    if value.contains('\n') {
        format!("{key}<<{HEREDOC_DELIMITER}\n{value}\n{HEREDOC_DELIMITER}\n")
    } else {
        format!("{key}={value}\n")
    }
}

/// Cut `value` to at most `max_len` bytes, marking the cut with `...`.
pub fn trim_value(key: &str, value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }

    warn!("Value {key} is bigger than maximum env variable size, trimming");
    let mut end = max_len.saturating_sub(TRIM_ENDING.len());
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRIM_ENDING}", &value[..end])
}

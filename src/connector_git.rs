//! `git` command plumbing.
//!
//! Shallow clones of git-URL sources and discovery of the repository the
//! process runs in. Commands run through [`run_command`], which turns a
//! non-zero exit into [`HarvestError::CommandFailed`] carrying stderr.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::HarvestError;

/// Run a prepared command and return its stdout.
pub async fn run_command(mut cmd: Command, display: &str) -> Result<Vec<u8>> {
    let output = cmd
        .output()
        .await
        .with_context(|| format!("Failed to execute '{}'. Is it installed?", display))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(HarvestError::CommandFailed {
            command: display.to_string(),
            stderr,
        }
        .into());
    }

    Ok(output.stdout)
}

/// `git clone --depth 1 <url> <dest>`.
pub async fn git_clone_shallow(git: &str, url: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create clone directory: {}", parent.display()))?;
    }

    let mut cmd = Command::new(git);
    cmd.args(["clone", "--depth", "1"]);
    cmd.arg(url);
    cmd.arg(dest);

    run_command(cmd, "git clone").await?;
    Ok(())
}

/// `git rev-parse --show-toplevel`, run in `dir` (or the current directory).
pub async fn git_repo_root(git: &str, dir: Option<&Path>) -> Result<PathBuf> {
    let mut cmd = Command::new(git);
    cmd.args(["rev-parse", "--show-toplevel"]);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let stdout = run_command(cmd, "git rev-parse").await?;
    let root = String::from_utf8_lossy(&stdout).trim().to_string();
    if root.is_empty() {
        anyhow::bail!("git rev-parse returned an empty repository root");
    }
    Ok(PathBuf::from(root))
}

//! Source diff between two analysed versions
//!
//! Runs `git diff` in the analysed project's clone and hands the raw text to
//! the diff view unchanged.
//!
//! Uses git CLI directly (no libgit2) for portability.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Execute a git command in a specific directory and return stdout as is
fn git_raw_at(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .context("failed to invoke git")?;

    if !output.status.success() {
        anyhow::bail!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Check that `repo_path` is inside a git work tree
pub fn is_repository(repo_path: &Path) -> bool {
    git_raw_at(repo_path, &["rev-parse", "--git-dir"]).is_ok()
}

/// Unified diff between two revisions of the repository at `repo_path`
///
/// # Errors
///
/// Returns error if:
/// - `repo_path` is not a git repository
/// - Either revision cannot be resolved
pub fn diff_revisions(repo_path: &Path, from: &str, to: &str) -> Result<String> {
    if !is_repository(repo_path) {
        anyhow::bail!("not a git repository: {}", repo_path.display());
    }
    // `--` keeps revisions from ever being read as paths
    git_raw_at(repo_path, &["--no-pager", "diff", from, to, "--"])
        .with_context(|| format!("failed to diff {} against {}", from, to))
}

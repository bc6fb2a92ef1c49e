//! Thin async wrappers around the `git` binary.

use std::path::Path;

use tokio::process::Command;

use crate::execution::{CollaboratorError, CollaboratorResult};

async fn run_git(dir: Option<&Path>, args: &[&str]) -> CollaboratorResult<String> {
    let mut cmd = Command::new("git");
    cmd.args(args).kill_on_drop(true);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| CollaboratorError::Unavailable(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CollaboratorError::Unavailable(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Clone `url` into the (empty) directory `dest`.
pub async fn clone_into(url: &str, dest: &Path) -> CollaboratorResult<()> {
    let dest = dest.to_string_lossy();
    run_git(None, &["clone", "--quiet", url, &dest]).await?;
    Ok(())
}

/// `git log --oneline --reverse`, oldest commit first.
pub async fn log_oneline(repo: &Path) -> CollaboratorResult<Vec<String>> {
    let out = run_git(Some(repo), &["log", "--oneline", "--reverse"]).await?;
    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working-copy synchronisation.

use dcc_adapters::{run_with_timeout, GIT_SYNC_TIMEOUT};
use dcc_store::Project;
use std::path::Path;
use tokio::process::Command;

use crate::error::ExecError;

/// Bring the project's working directory to exactly `commit`.
///
/// Clones on first use; when the checked-out commit differs, fetches and
/// force-resets to a pristine tree. Projects with an empty URL are
/// pre-provisioned working directories and are left alone.
pub async fn sync_working_copy(
    project: &Project,
    commit: &str,
    dir: &Path,
) -> Result<(), ExecError> {
    if project.url.is_empty() {
        std::fs::create_dir_all(dir)?;
        return Ok(());
    }

    if !dir.join(".git").exists() {
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut cmd = git_command(None);
        cmd.args(["clone", "--branch", &project.branch, &project.url])
            .arg(dir);
        run_git(cmd, "git clone").await?;
    }

    let head = {
        let mut cmd = git_command(Some(dir));
        cmd.args(["rev-parse", "HEAD"]);
        run_git(cmd, "git rev-parse").await?
    };
    if head.trim() == commit {
        return Ok(());
    }

    tracing::info!(project = %project.name, %commit, "resetting working copy");
    let mut fetch = git_command(Some(dir));
    fetch.args(["fetch", "--quiet", "origin"]);
    run_git(fetch, "git fetch").await?;

    let mut checkout = git_command(Some(dir));
    checkout.args(["checkout", "--force", "--quiet", commit]);
    run_git(checkout, "git checkout").await?;

    let mut clean = git_command(Some(dir));
    clean.args(["clean", "-d", "--force", "--quiet"]);
    run_git(clean, "git clean").await?;
    Ok(())
}

fn git_command(dir: Option<&Path>) -> Command {
    let mut cmd = Command::new("git");
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    cmd.env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    cmd
}

async fn run_git(cmd: Command, label: &str) -> Result<String, ExecError> {
    let output = run_with_timeout(cmd, GIT_SYNC_TIMEOUT, label)
        .await
        .map_err(|e| ExecError::Sync(e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExecError::Sync(format!("{label} failed: {}", stderr.trim())));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process task execution with streamed log capture.

use dcc_core::BucketId;
use dcc_store::{with_reconnect, Store};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use crate::error::ExecError;
use crate::logtail::LogTail;

/// Abort signal: the one child outcome that earns a retry.
const SIGABRT: i32 = 6;

/// One task to run: a display name and the shell command behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    pub command: String,
}

impl TaskSpec {
    /// For plain tasks the command is its own name.
    pub fn command(command: impl Into<String>) -> Self {
        let command = command.into();
        Self { name: command.clone(), command }
    }

    pub fn named(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self { name: name.into(), command: command.into() }
    }
}

/// Final outcome of one task (after any abort retry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    Failed { reason: String },
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }
}

/// Outcome of a single child run.
enum Reaped {
    Success,
    Aborted,
    Failed { reason: String },
}

/// Runs one task at a time as a `sh -c` child with a dedicated log file.
///
/// The child shares no memory with the worker; its stdout and stderr are
/// teed into the log file, which is tail-read on every reap poll and
/// appended to the bucket's fragments. The file is deleted after reap.
pub struct TaskRunner<S: Store> {
    store: S,
    log_dir: PathBuf,
    poll_interval: Duration,
    reconnect_delay: Duration,
}

impl<S: Store> TaskRunner<S> {
    pub fn new(
        store: S,
        log_dir: impl Into<PathBuf>,
        poll_interval: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        Self { store, log_dir: log_dir.into(), poll_interval, reconnect_delay }
    }

    /// Run a task to completion.
    ///
    /// A child killed by the abort signal is run exactly once more with the
    /// same semantics; the second outcome is final.
    pub async fn run(
        &self,
        bucket_id: &BucketId,
        cwd: &Path,
        env: &BTreeMap<String, String>,
        task: &TaskSpec,
    ) -> Result<TaskStatus, ExecError> {
        match self.run_once(bucket_id, cwd, env, task).await? {
            Reaped::Success => Ok(TaskStatus::Success),
            Reaped::Failed { reason } => Ok(TaskStatus::Failed { reason }),
            Reaped::Aborted => {
                tracing::warn!(task = %task.name, "child aborted, retrying once");
                self.append(bucket_id, &format!("task {} aborted, running it once more\n", task.name))
                    .await?;
                match self.run_once(bucket_id, cwd, env, task).await? {
                    Reaped::Success => Ok(TaskStatus::Success),
                    Reaped::Aborted => {
                        Ok(TaskStatus::Failed { reason: "aborted again after retry".to_string() })
                    }
                    Reaped::Failed { reason } => Ok(TaskStatus::Failed { reason }),
                }
            }
        }
    }

    /// Append a log fragment on the bucket (reconnect-retried).
    pub async fn append(&self, bucket_id: &BucketId, content: &str) -> Result<(), ExecError> {
        with_reconnect(&self.store, self.reconnect_delay, || async {
            self.store.append_fragment(bucket_id, content).await?;
            Ok::<(), ExecError>(())
        })
        .await
    }

    async fn run_once(
        &self,
        bucket_id: &BucketId,
        cwd: &Path,
        env: &BTreeMap<String, String>,
        task: &TaskSpec,
    ) -> Result<Reaped, ExecError> {
        std::fs::create_dir_all(&self.log_dir)?;
        let log_path = self.log_dir.join(format!("task-{}.log", nanoid::nanoid!(10)));
        let log_file = std::fs::File::create(&log_path)?;
        let stderr_file = log_file.try_clone()?;

        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&task.command)
            .current_dir(cwd)
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(stderr_file))
            .kill_on_drop(true)
            .spawn()?;

        let mut tail = LogTail::new(&log_path);
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            self.drain(bucket_id, &mut tail).await?;
            tokio::time::sleep(self.poll_interval).await;
        };
        // Pick up whatever was written after the last poll.
        self.drain(bucket_id, &mut tail).await?;

        if let Err(e) = std::fs::remove_file(&log_path) {
            tracing::warn!(path = %log_path.display(), error = %e, "log file removal failed");
        }

        Ok(classify(status))
    }

    async fn drain(&self, bucket_id: &BucketId, tail: &mut LogTail) -> Result<(), ExecError> {
        let chunk = tail.read_new()?;
        if !chunk.is_empty() {
            self.append(bucket_id, &chunk).await?;
        }
        Ok(())
    }
}

fn classify(status: std::process::ExitStatus) -> Reaped {
    if status.success() {
        return Reaped::Success;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            if signal == SIGABRT {
                return Reaped::Aborted;
            }
            return Reaped::Failed { reason: format!("killed by signal {signal}") };
        }
    }
    match status.code() {
        Some(code) => Reaped::Failed { reason: format!("exited with {code}") },
        None => Reaped::Failed { reason: "exited abnormally".to_string() },
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

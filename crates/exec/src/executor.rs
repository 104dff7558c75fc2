// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-bucket build execution.

use dcc_adapters::{ChatAdapter, MailAdapter};
use dcc_core::{BucketId, BucketState, BuildId, Clock};
use dcc_store::{
    close_build_if_done, with_reconnect, Bucket, Build, LogFragment, Project, Store,
    RECONNECT_DELAY,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::envelope::{Envelope, ErrorContext};
use crate::environment::current_scrubbed_env;
use crate::error::ExecError;
use crate::git;
use crate::notify::Notifier;
use crate::task::{TaskRunner, TaskSpec, TaskStatus};

/// Executor settings.
pub struct ExecConfig {
    /// Per-project working directories live under here.
    pub work_root: PathBuf,
    /// Per-bucket task log files live under here.
    pub log_root: PathBuf,
    /// Reap/tail polling interval of the task runner.
    pub poll_interval: Duration,
    /// Wall clock for one whole bucket.
    pub bucket_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl ExecConfig {
    pub fn new(work_root: impl Into<PathBuf>, log_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
            log_root: log_root.into(),
            poll_interval: Duration::from_secs(10),
            bucket_timeout: Duration::from_secs(7200),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    dcc_core::setters! {
        poll_interval: Duration,
        bucket_timeout: Duration,
        reconnect_delay: Duration,
    }
}

/// Per-build state a worker memoises so sibling buckets of the same build
/// skip work that already happened on this machine.
#[derive(Default)]
struct Memo {
    build_id: Option<BuildId>,
    prepared_groups: HashSet<String>,
    bundled_versions: HashSet<String>,
    succeeded_before_all: HashSet<String>,
}

/// Runs assigned buckets, one at a time.
pub struct BuildExecutor<S: Store, M: MailAdapter, H: ChatAdapter, C: Clock> {
    store: S,
    notifier: Notifier<M, H>,
    envelope: Envelope<S, M, C>,
    clock: C,
    config: ExecConfig,
    /// Read by the liveness endpoint while a bucket is owned.
    current: Arc<Mutex<Option<BucketId>>>,
    memo: Mutex<Memo>,
}

impl<S, M, H, C> BuildExecutor<S, M, H, C>
where
    S: Store,
    M: MailAdapter,
    H: ChatAdapter,
    C: Clock,
{
    pub fn new(
        store: S,
        notifier: Notifier<M, H>,
        envelope: Envelope<S, M, C>,
        clock: C,
        config: ExecConfig,
        current: Arc<Mutex<Option<BucketId>>>,
    ) -> Self {
        Self {
            store,
            notifier,
            envelope,
            clock,
            config,
            current,
            memo: Mutex::new(Memo::default()),
        }
    }

    /// Run one assigned bucket to a terminal state.
    ///
    /// Any error or wall-clock expiry leaves the bucket `ProcessingFailed`
    /// through the envelope; this function itself never fails.
    pub async fn run_bucket(&self, bucket_id: &BucketId) {
        *self.current.lock() = Some(bucket_id.clone());

        let outcome =
            match tokio::time::timeout(self.config.bucket_timeout, self.process(bucket_id)).await
            {
                Ok(result) => result,
                // The in-flight child is killed when the future is dropped.
                Err(_) => Err(ExecError::Timeout(self.config.bucket_timeout)),
            };
        if let Err(error) = outcome {
            self.envelope.report(&ErrorContext::Bucket(bucket_id.clone()), &error).await;
        }

        if let Err(e) = std::fs::remove_dir_all(self.bucket_log_dir(bucket_id)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(bucket = %bucket_id, error = %e, "log dir cleanup failed");
            }
        }
        *self.current.lock() = None;
    }

    async fn process(&self, bucket_id: &BucketId) -> Result<(), ExecError> {
        let delay = self.config.reconnect_delay;
        let bucket = with_reconnect(&self.store, delay, || self.load_bucket(bucket_id)).await?;
        let build = with_reconnect(&self.store, delay, || self.load_build(&bucket.build_id)).await?;
        let project =
            with_reconnect(&self.store, delay, || self.load_project(&build.project_name)).await?;
        tracing::info!(
            bucket = %bucket.name,
            project = %project.name,
            build = build.number,
            commit = %build.commit,
            "processing bucket"
        );

        let dir = self.config.work_root.join(&project.name);
        git::sync_working_copy(&project, &build.commit, &dir).await?;

        let env = current_scrubbed_env();
        let runner = TaskRunner::new(
            self.store.clone(),
            self.bucket_log_dir(bucket_id),
            self.config.poll_interval,
            delay,
        );

        self.prepare(&runner, &project, &build, &bucket, &dir, &env).await?;

        let pending_before_all: Vec<String> = {
            let memo = self.memo.lock();
            project
                .tasks
                .before_all_tasks
                .iter()
                .filter(|t| !memo.succeeded_before_all.contains(*t))
                .cloned()
                .collect()
        };

        let mut green = true;
        for task in &pending_before_all {
            if !self.run_task(&runner, bucket_id, &dir, &env, task).await? {
                green = false;
                break;
            }
        }
        // The whole list succeeded: sibling buckets of this build skip it.
        if green && !pending_before_all.is_empty() {
            self.memo.lock().succeeded_before_all.extend(pending_before_all.iter().cloned());
        }

        if green {
            for task in &project.tasks.before_bucket_tasks {
                if !self.run_task(&runner, bucket_id, &dir, &env, task).await? {
                    green = false;
                    break;
                }
            }
        }
        if green {
            for task in &project.bucket_tasks(&bucket.name) {
                if !self.run_task(&runner, bucket_id, &dir, &env, task).await? {
                    green = false;
                    break;
                }
            }
        }

        // "after" tasks always run and do not short-circuit each other.
        let mut after_green = true;
        for task in &project.tasks.after_bucket_tasks {
            if !self.run_task(&runner, bucket_id, &dir, &env, task).await? {
                after_green = false;
            }
        }

        self.finalize(bucket_id, &build, &project, green && after_green).await
    }

    /// Once-per-build and once-per-group setup, memoised per worker.
    async fn prepare(
        &self,
        runner: &TaskRunner<S>,
        project: &Project,
        build: &Build,
        bucket: &Bucket,
        dir: &std::path::Path,
        env: &std::collections::BTreeMap<String, String>,
    ) -> Result<(), ExecError> {
        let fresh_build = {
            let mut memo = self.memo.lock();
            if memo.build_id.as_ref() != Some(&build.id) {
                *memo = Memo { build_id: Some(build.id.clone()), ..Memo::default() };
                true
            } else {
                false
            }
        };
        if fresh_build {
            if let Some(code) = &project.tasks.before_all_code {
                self.run_hook(runner, &bucket.id, dir, env, "before_all hook", code).await?;
            }
        }

        let version = project.runtime_version(&bucket.name).unwrap_or("default").to_string();
        let version_bundled = self.memo.lock().bundled_versions.contains(&version);
        if !version_bundled {
            if dir.join("Gemfile").exists() {
                self.run_hook(runner, &bucket.id, dir, env, "bundle install", "bundle install")
                    .await?;
            }
            self.memo.lock().bundled_versions.insert(version);
        }

        let group = project.bucket_group(&bucket.name);
        let group_prepared = self.memo.lock().prepared_groups.contains(&group);
        if !group_prepared {
            if let Some(code) = &project.tasks.before_each_bucket_group_code {
                self.run_hook(runner, &bucket.id, dir, env, "bucket group hook", code).await?;
            }
            self.memo.lock().prepared_groups.insert(group);
        }
        Ok(())
    }

    /// A failing hook is an infrastructure problem, not a red build.
    async fn run_hook(
        &self,
        runner: &TaskRunner<S>,
        bucket_id: &BucketId,
        dir: &std::path::Path,
        env: &std::collections::BTreeMap<String, String>,
        name: &str,
        command: &str,
    ) -> Result<(), ExecError> {
        runner.append(bucket_id, &format!("$ {command}\n")).await?;
        match runner.run(bucket_id, dir, env, &TaskSpec::named(name, command)).await? {
            TaskStatus::Success => Ok(()),
            TaskStatus::Failed { reason } => Err(ExecError::Prepare(format!("{name}: {reason}"))),
        }
    }

    async fn run_task(
        &self,
        runner: &TaskRunner<S>,
        bucket_id: &BucketId,
        dir: &std::path::Path,
        env: &std::collections::BTreeMap<String, String>,
        command: &str,
    ) -> Result<bool, ExecError> {
        runner.append(bucket_id, &format!("$ {command}\n")).await?;
        match runner.run(bucket_id, dir, env, &TaskSpec::command(command)).await? {
            TaskStatus::Success => Ok(true),
            TaskStatus::Failed { reason } => {
                runner.append(bucket_id, &format!("task {command} failed: {reason}\n")).await?;
                Ok(false)
            }
        }
    }

    async fn finalize(
        &self,
        bucket_id: &BucketId,
        build: &Build,
        project: &Project,
        green: bool,
    ) -> Result<(), ExecError> {
        let delay = self.config.reconnect_delay;
        let fragments =
            with_reconnect(&self.store, delay, || self.load_fragments(bucket_id)).await?;
        let log: String = fragments.iter().map(|f| f.content.as_str()).collect();

        let mut bucket = with_reconnect(&self.store, delay, || self.load_bucket(bucket_id)).await?;
        bucket.log = log;
        bucket.error_log.clear();
        bucket.state = if green { BucketState::Success } else { BucketState::Failed };
        if !green {
            bucket.error_log = bucket.log.clone();
        }
        bucket.finished_at = Some(self.clock.epoch_ms());
        with_reconnect(&self.store, delay, || self.save_bucket(&bucket)).await?;
        with_reconnect(&self.store, delay, || self.drop_fragments(bucket_id)).await?;
        self.finish_build_if_done(&build.id).await?;
        tracing::info!(bucket = %bucket.name, state = %bucket.state, "bucket finished");

        // Notifications fire only after the record is durable.
        if green {
            if self.was_repaired(project, build, &bucket).await? {
                self.notifier.bucket_repaired(project, build, &bucket).await;
            }
        } else {
            self.notifier.bucket_failed(project, build, &bucket).await;
        }
        Ok(())
    }

    /// A green bucket repairs the build when its predecessor in the
    /// previous build exists and did not succeed.
    async fn was_repaired(
        &self,
        project: &Project,
        build: &Build,
        bucket: &Bucket,
    ) -> Result<bool, ExecError> {
        let delay = self.config.reconnect_delay;
        let prior = with_reconnect(&self.store, delay, || async {
            Ok::<_, ExecError>(self.store.last_build(&project.name, Some(build.number)).await?)
        })
        .await?;
        let Some(prior) = prior else {
            return Ok(false);
        };
        let siblings = with_reconnect(&self.store, delay, || async {
            Ok::<_, ExecError>(self.store.buckets_of_build(&prior.id).await?)
        })
        .await?;
        Ok(siblings
            .iter()
            .any(|b| b.name == bucket.name && b.state != BucketState::Success))
    }

    async fn finish_build_if_done(&self, build_id: &BuildId) -> Result<(), ExecError> {
        with_reconnect(&self.store, self.config.reconnect_delay, || async {
            close_build_if_done(&self.store, build_id, self.clock.epoch_ms()).await?;
            Ok::<(), ExecError>(())
        })
        .await
    }

    fn bucket_log_dir(&self, bucket_id: &BucketId) -> PathBuf {
        self.config.log_root.join(bucket_id.as_str())
    }

    async fn load_bucket(&self, id: &BucketId) -> Result<Bucket, ExecError> {
        Ok(self.store.bucket(id).await?)
    }

    async fn load_build(&self, id: &BuildId) -> Result<Build, ExecError> {
        Ok(self.store.build(id).await?)
    }

    async fn load_project(&self, name: &str) -> Result<Project, ExecError> {
        Ok(self.store.project(name).await?)
    }

    async fn load_fragments(&self, id: &BucketId) -> Result<Vec<LogFragment>, ExecError> {
        Ok(self.store.fragments_of_bucket(id).await?)
    }

    async fn save_bucket(&self, bucket: &Bucket) -> Result<(), ExecError> {
        Ok(self.store.update_bucket(bucket).await?)
    }

    async fn drop_fragments(&self, id: &BucketId) -> Result<(), ExecError> {
        Ok(self.store.delete_fragments(id).await?)
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent records: projects, builds, buckets, log fragments.

use dcc_core::{BucketId, BucketState, BuildId, FragmentId, WorkerUri};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Task configuration of a project.
///
/// A task is a shell command; the build-step runner contract is only that
/// the command exits 0 on success. `buckets_tasks` names the independent
/// work slices; the other lists run around each bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTasks {
    /// Hook run once per build before anything else.
    pub before_all_code: Option<String>,
    /// Hook run once per bucket group per build.
    pub before_each_bucket_group_code: Option<String>,
    /// Tasks that need to succeed only once per build across all buckets.
    pub before_all_tasks: Vec<String>,
    /// Tasks run before each bucket's own tasks.
    pub before_bucket_tasks: Vec<String>,
    /// Tasks run after each bucket, regardless of earlier failures.
    pub after_bucket_tasks: Vec<String>,
    /// Bucket name → tasks of that bucket.
    pub buckets_tasks: BTreeMap<String, Vec<String>>,
    /// Bucket name → bucket group. Buckets without an entry form their own group.
    pub bucket_groups: BTreeMap<String, String>,
    /// Bucket name → language runtime version to prepare.
    pub runtime_versions: BTreeMap<String, String>,
}

/// A source-controlled project watched by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique name.
    pub name: String,
    /// Source URL. Empty for pre-provisioned working directories.
    pub url: String,
    pub branch: String,
    /// Latest known commit, maintained externally.
    pub current_commit: Option<String>,
    /// Commit consumed by the most recent build.
    pub built_commit: Option<String>,
    /// Force a build on the next scan even without a new commit.
    pub forced: bool,
    /// Most recent scan failure, for the operator's eyes.
    pub last_system_error: Option<String>,
    pub tasks: ProjectTasks,
}

impl Project {
    pub fn new(name: impl Into<String>, url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            branch: branch.into(),
            current_commit: None,
            built_commit: None,
            forced: false,
            last_system_error: None,
            tasks: ProjectTasks::default(),
        }
    }

    /// True when a new build should be created: commit moved, or forced.
    pub fn wants_build(&self) -> bool {
        if self.forced {
            return true;
        }
        match &self.current_commit {
            Some(commit) => self.built_commit.as_ref() != Some(commit),
            None => false,
        }
    }

    /// Mark the current commit as consumed and clear any force flag.
    pub fn update_state(&mut self) {
        self.built_commit = self.current_commit.clone();
        self.forced = false;
    }

    /// Names of the configured buckets, in stable order.
    pub fn bucket_names(&self) -> Vec<String> {
        self.tasks.buckets_tasks.keys().cloned().collect()
    }

    /// Group a bucket belongs to; buckets without explicit grouping stand alone.
    pub fn bucket_group(&self, bucket_name: &str) -> String {
        self.tasks
            .bucket_groups
            .get(bucket_name)
            .cloned()
            .unwrap_or_else(|| bucket_name.to_string())
    }

    /// Runtime version to prepare for a bucket, if any.
    pub fn runtime_version(&self, bucket_name: &str) -> Option<&str> {
        self.tasks.runtime_versions.get(bucket_name).map(String::as_str)
    }

    /// Tasks of one bucket.
    pub fn bucket_tasks(&self, bucket_name: &str) -> Vec<String> {
        self.tasks.buckets_tasks.get(bucket_name).cloned().unwrap_or_default()
    }
}

/// One run of a project at a fixed commit, split into buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub project_name: String,
    /// Monotonically increasing per project.
    pub number: u32,
    pub commit: String,
    /// Leader that created the build.
    pub leader_uri: WorkerUri,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
}

impl Build {
    pub fn new(
        project_name: impl Into<String>,
        number: u32,
        commit: impl Into<String>,
        leader_uri: WorkerUri,
    ) -> Self {
        Self {
            id: BuildId::new(),
            project_name: project_name.into(),
            number,
            commit: commit.into(),
            leader_uri,
            started_at: None,
            finished_at: None,
        }
    }
}

/// A unit of work: one named slice of a build's task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: BucketId,
    pub build_id: BuildId,
    /// Selects the task list out of the project configuration.
    pub name: String,
    pub state: BucketState,
    pub worker_uri: Option<WorkerUri>,
    pub worker_hostname: Option<String>,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
    /// Concatenated task output, written on completion.
    pub log: String,
    pub error_log: String,
}

impl Bucket {
    /// Mark the bucket as not evaluated to completion.
    ///
    /// The log gains a trailing block headed by the failure banner so a
    /// reader can tell an infrastructure failure from a clean task failure.
    pub fn record_processing_failure(&mut self, subject: &str, detail: &str) {
        self.state = BucketState::ProcessingFailed;
        if !self.log.is_empty() && !self.log.ends_with('\n') {
            self.log.push('\n');
        }
        self.log.push_str("------ Processing failed ------\n");
        self.log.push_str(subject);
        self.log.push('\n');
        if !detail.is_empty() {
            self.log.push_str(detail);
            self.log.push('\n');
        }
    }

    pub fn new(build_id: BuildId, name: impl Into<String>) -> Self {
        Self {
            id: BucketId::new(),
            build_id,
            name: name.into(),
            state: BucketState::Queued,
            worker_uri: None,
            worker_hostname: None,
            started_at: None,
            finished_at: None,
            log: String::new(),
            error_log: String::new(),
        }
    }
}

dcc_core::builder! {
    pub struct BucketBuilder => Bucket {
        into {
            build_id: BuildId = "bld-test",
            name: String = "default",
        }
        set {
            state: BucketState = BucketState::Queued,
            log: String = String::new(),
            error_log: String = String::new(),
        }
        computed {
            id: BucketId = BucketId::new(),
            worker_uri: Option<WorkerUri> = None,
            worker_hostname: Option<String> = None,
            started_at: Option<u64> = None,
            finished_at: Option<u64> = None,
        }
    }
}

/// Append-only chunk of task output, ordered by `seq` within a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFragment {
    pub id: FragmentId,
    pub bucket_id: BucketId,
    pub seq: u64,
    pub content: String,
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;

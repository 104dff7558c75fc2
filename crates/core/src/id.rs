// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed identifiers and coordination key naming.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

crate::define_id! {
    /// Unique identifier for a build.
    pub struct BuildId("bld-");
}

crate::define_id! {
    /// Unique identifier for a bucket (one named slice of a build).
    pub struct BucketId("bkt-");
}

crate::define_id! {
    /// Unique identifier for a log fragment.
    pub struct FragmentId("frg-");
}

/// URI under which a peer is reachable (`host:port`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerUri(pub String);

impl WorkerUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WorkerUri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkerUri {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for WorkerUri {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WorkerUri {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for WorkerUri {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Name of a worker group (a pool of peers sharing one lock key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupName(pub String);

impl GroupName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GroupName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Coordination key under which a group's leader lease is published.
pub fn group_key(group: &GroupName) -> String {
    format!("{}:leader", group.0)
}

/// Tag under which a peer announces itself for discovery.
pub fn discovery_tag(group: &GroupName) -> String {
    format!("dcc:{}:uri", group.0)
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

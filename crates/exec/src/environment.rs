// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-environment scrubbing.
//!
//! Task children must not inherit the worker's own language-runtime
//! manager setup. The scrub is a pure transform over an environment
//! snapshot handed to the child; the worker's process environment is
//! never mutated.

use std::collections::BTreeMap;

/// Variables dropped outright.
const SCRUBBED_VARS: &[&str] =
    &["GEM_PATH", "GEM_HOME", "RUBYOPT", "RUBYLIB", "RAILS_ENV"];

/// Variable families dropped by prefix: dependency-manager state and
/// runtime-manager state (`*_VERSION`, `*_DIR`, roots, shims).
const SCRUBBED_PREFIXES: &[&str] = &["BUNDLE_", "RBENV_", "RVM_"];

/// Compute the environment a task child receives.
pub fn scrubbed_env(env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let rbenv_root = env.get("RBENV_ROOT").cloned();
    env.iter()
        .filter(|(key, _)| {
            !SCRUBBED_VARS.contains(&key.as_str())
                && !SCRUBBED_PREFIXES.iter().any(|p| key.starts_with(p))
        })
        .map(|(key, value)| {
            if key == "PATH" {
                (key.clone(), strip_runtime_shims(value, rbenv_root.as_deref()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

/// Drop `$PATH` entries living under `$RBENV_ROOT/versions/`.
pub fn strip_runtime_shims(path: &str, rbenv_root: Option<&str>) -> String {
    let Some(root) = rbenv_root else {
        return path.to_string();
    };
    let prefix = format!("{}/versions/", root.trim_end_matches('/'));
    path.split(':')
        .filter(|entry| !entry.starts_with(&prefix))
        .collect::<Vec<_>>()
        .join(":")
}

/// Scrubbed snapshot of the worker's own environment.
pub fn current_scrubbed_env() -> BTreeMap<String, String> {
    scrubbed_env(&std::env::vars().collect())
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;

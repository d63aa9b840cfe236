// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency resolution: topological order and wave grouping.
//!
//! Kahn's algorithm over in-degrees. Within a wave the order is
//! name-sorted so plans are reproducible across runs.

use indexmap::IndexMap;
use thiserror::Error;

use crate::process::ProcessConfig;

/// Errors from dependency resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("process '{process}' depends on unknown process '{dependency}'")]
    UnknownDependency { process: String, dependency: String },

    #[error("dependency cycle involving: {}", names.join(", "))]
    CycleDetected { names: Vec<String> },
}

/// Result of resolving the process graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartPlan {
    /// Linear start order; every process appears after all its dependencies.
    pub order: Vec<String>,
    /// Wave grouping: all members of wave k have their dependencies in
    /// waves 0..k-1 and may start concurrently.
    pub waves: Vec<Vec<String>>,
}

impl StartPlan {
    /// Stop order is the reverse of the start order.
    pub fn stop_order(&self) -> Vec<String> {
        self.order.iter().rev().cloned().collect()
    }
}

/// Resolve the graph into a start plan.
pub fn resolve(processes: &IndexMap<String, ProcessConfig>) -> Result<StartPlan, ResolveError> {
    // Reject unknown dependency targets before running Kahn.
    for (name, cfg) in processes {
        for dep in &cfg.dependencies {
            if !processes.contains_key(dep) {
                return Err(ResolveError::UnknownDependency {
                    process: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    // in-degree = number of dependencies not yet scheduled
    let mut in_degree: IndexMap<&str, usize> = processes
        .iter()
        .map(|(name, cfg)| (name.as_str(), cfg.dependencies.len()))
        .collect();

    let mut order = Vec::with_capacity(processes.len());
    let mut waves: Vec<Vec<String>> = Vec::new();
    let mut remaining: usize = processes.len();

    while remaining > 0 {
        let mut wave: Vec<String> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| (*name).to_string())
            .collect();

        if wave.is_empty() {
            let mut names: Vec<String> =
                in_degree.keys().map(|n| (*n).to_string()).collect();
            names.sort();
            return Err(ResolveError::CycleDetected { names });
        }

        // Deterministic order inside a wave.
        wave.sort();

        for name in &wave {
            in_degree.shift_remove(name.as_str());
        }
        for (dependent, deg) in in_degree.iter_mut() {
            let cfg = &processes[*dependent];
            let satisfied =
                cfg.dependencies.iter().filter(|d| wave.contains(d)).count();
            *deg = deg.saturating_sub(satisfied);
        }

        remaining -= wave.len();
        order.extend(wave.iter().cloned());
        waves.push(wave);
    }

    Ok(StartPlan { order, waves })
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

//! Subject resolution.
//!
//! Turns a remediation's target into concrete subject instances. Problems
//! never abort a pass: they are returned alongside whatever subjects were
//! found.

use crate::core::{Collaborators, ExtensionInfo, ProcessInfo, RemediationError, ServiceInfo};
use crate::remediation::FileTarget;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Subjects found for one remediation, plus any problems hit on the way.
#[derive(Debug)]
pub(crate) struct Resolution<T> {
    pub subjects: Vec<T>,
    pub errors: Vec<RemediationError>,
    pub deadline_exceeded: bool,
}

impl<T> Resolution<T> {
    fn found(subjects: Vec<T>) -> Self {
        Self {
            subjects,
            errors: Vec::new(),
            deadline_exceeded: false,
        }
    }

    fn failed(error: RemediationError) -> Self {
        Self {
            subjects: Vec::new(),
            errors: vec![error],
            deadline_exceeded: false,
        }
    }
}

/// Bounds for one resolution.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchLimits {
    pub default_depth: usize,
    pub started: Instant,
    pub deadline: Option<Instant>,
}

impl SearchLimits {
    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Resolves the files a file remediation applies to.
pub(crate) fn resolve_files(
    target: &FileTarget,
    collaborators: &Collaborators,
    limits: &SearchLimits,
) -> Resolution<PathBuf> {
    match target {
        FileTarget::SinglePath { path } => Resolution::found(vec![path.clone()]),
        FileTarget::DirectorySearch {
            dir,
            patterns,
            max_depth,
        } => match dir {
            Some(dir) => search_directory(
                dir,
                patterns,
                max_depth.unwrap_or(limits.default_depth),
                collaborators,
                limits,
            ),
            None => Resolution::failed(RemediationError::configuration(
                "directory search has no search directory",
            )),
        },
        FileTarget::Predicate { query } => {
            tracing::debug!(query = %query, "Predicate search requested");
            Resolution::failed(RemediationError::configuration(
                "predicate search is not implemented",
            ))
        }
    }
}

fn search_directory(
    dir: &Path,
    patterns: &[String],
    max_depth: usize,
    collaborators: &Collaborators,
    limits: &SearchLimits,
) -> Resolution<PathBuf> {
    if patterns.is_empty() {
        tracing::warn!(dir = %dir.display(), "Directory search declares no patterns");
        return Resolution::failed(RemediationError::configuration(
            "directory search has no patterns",
        ));
    }
    if max_depth == 0 {
        tracing::warn!(dir = %dir.display(), "Directory search has max_depth 0");
        return Resolution::failed(RemediationError::configuration(
            "directory search max_depth must be at least 1",
        ));
    }

    let mut resolution = Resolution::found(Vec::new());

    let compiled: Vec<Regex> = patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Skipping search pattern that failed to compile");
                resolution
                    .errors
                    .push(RemediationError::compile(pattern.as_str(), e.to_string()));
                None
            }
        })
        .collect();

    if compiled.is_empty() {
        tracing::warn!(dir = %dir.display(), "No search pattern compiled, nothing to search for");
        return resolution;
    }

    let entries = match collaborators.walker().enumerate(dir) {
        Ok(entries) => entries,
        Err(e) => {
            resolution.errors.push(RemediationError::configuration(format!(
                "search directory {} unavailable: {}",
                dir.display(),
                e
            )));
            return resolution;
        }
    };

    for relative in entries {
        if limits.expired() {
            let elapsed = limits.started.elapsed();
            tracing::warn!(
                dir = %dir.display(),
                elapsed_ms = elapsed.as_millis() as u64,
                found = resolution.subjects.len(),
                "Deadline reached, stopping directory search"
            );
            resolution.deadline_exceeded = true;
            resolution
                .errors
                .push(RemediationError::DeadlineExceeded { elapsed });
            break;
        }

        if relative.components().count() > max_depth {
            continue;
        }

        let full = dir.join(&relative);
        let text = full.to_string_lossy();
        if let Some(index) = compiled.iter().position(|re| re.is_match(&text)) {
            tracing::trace!(path = %text, pattern = index, "Search entry matched");
            resolution.subjects.push(full);
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        max_depth,
        found = resolution.subjects.len(),
        "Directory search finished"
    );
    resolution
}

/// Resolves running processes.
pub(crate) fn resolve_processes(collaborators: &Collaborators) -> Resolution<ProcessInfo> {
    match collaborators.process_inspector() {
        Some(inspector) => match inspector.running_processes() {
            Ok(processes) => Resolution::found(processes),
            Err(e) => Resolution::failed(RemediationError::lookup("process table", e.to_string())),
        },
        None => Resolution::failed(RemediationError::configuration(
            "no process inspector configured",
        )),
    }
}

/// Resolves loaded services.
pub(crate) fn resolve_services(collaborators: &Collaborators) -> Resolution<ServiceInfo> {
    match collaborators.service_inspector() {
        Some(inspector) => match inspector.loaded_services() {
            Ok(services) => Resolution::found(services),
            Err(e) => Resolution::failed(RemediationError::lookup("service list", e.to_string())),
        },
        None => Resolution::failed(RemediationError::configuration(
            "no service inspector configured",
        )),
    }
}

/// Resolves registered browser extensions.
pub(crate) fn resolve_extensions(collaborators: &Collaborators) -> Resolution<ExtensionInfo> {
    match collaborators.extension_inspector() {
        Some(inspector) => match inspector.registered_extensions() {
            Ok(extensions) => Resolution::found(extensions),
            Err(e) => {
                Resolution::failed(RemediationError::lookup("extension list", e.to_string()))
            }
        },
        None => Resolution::failed(RemediationError::configuration(
            "no extension inspector configured",
        )),
    }
}

//! Remediation declarations.
//!
//! A remediation pairs a subject-resolution rule with a condition list,
//! action flags and follow-up remediations. Declarations are immutable
//! once built and are evaluated fresh on every assessment pass.

use crate::condition::{
    ExtensionCondition, FileCondition, IntoConditions, ProcessCondition, ServiceCondition,
};
use crate::core::SubjectKind;
use crate::remediation::composer::IntoRemediations;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// How the subjects of a file remediation are found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FileTarget {
    /// Exactly one path.
    SinglePath {
        /// The path to assess.
        path: PathBuf,
    },
    /// Entries below a directory whose full path matches any pattern.
    DirectorySearch {
        /// Directory to enumerate. Required.
        dir: Option<PathBuf>,
        /// Regular expressions tested in declared order.
        patterns: Vec<String>,
        /// Maximum number of relative path components.
        max_depth: Option<usize>,
    },
    /// A metadata predicate query. Not supported.
    Predicate {
        /// The query text.
        query: String,
    },
}

impl fmt::Display for FileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePath { path } => write!(f, "{}", path.display()),
            Self::DirectorySearch { dir, patterns, .. } => match dir {
                Some(dir) => write!(f, "{} [{}]", dir.display(), patterns.join(", ")),
                None => write!(f, "<no directory> [{}]", patterns.join(", ")),
            },
            Self::Predicate { query } => write!(f, "predicate({query})"),
        }
    }
}

/// Action flags for process remediations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFlags {
    /// Also delete the process's executable.
    pub delete_executable: bool,
    /// Allow acting on platform binaries.
    pub include_platform: bool,
}

/// Action flags for service remediations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFlags {
    /// Unload the service without deleting anything.
    pub unload_only: bool,
    /// Also delete the bundle containing the executable.
    pub delete_bundle_too: bool,
}

/// Flags common to every remediation kind.
#[derive(Debug, Clone, Default)]
struct Header {
    tag: Option<String>,
    report_only: bool,
    follow_ups: Vec<Remediation>,
}

/// Builder methods shared by every remediation kind.
macro_rules! common_builders {
    ($condition:ty) => {
        /// Sets the label used in reports.
        pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
            self.header.tag = Some(tag.into());
            self
        }

        /// Sets report-only mode.
        pub fn with_report_only(mut self, report_only: bool) -> Self {
            self.header.report_only = report_only;
            self
        }

        /// Appends a condition declaration.
        pub fn with_conditions(mut self, conditions: impl IntoConditions<$condition>) -> Self {
            conditions.into_conditions(&mut self.conditions);
            self
        }

        /// Appends follow-up remediations.
        pub fn with_follow_ups(mut self, follow_ups: impl IntoRemediations) -> Self {
            follow_ups.into_remediations(&mut self.header.follow_ups);
            self
        }

        /// Returns the label, if any.
        pub fn tag(&self) -> Option<&str> {
            self.header.tag.as_deref()
        }

        /// Returns whether destructive actions are suppressed.
        pub fn is_report_only(&self) -> bool {
            self.header.report_only
        }

        /// Returns the condition list.
        pub fn conditions(&self) -> &[$condition] {
            &self.conditions
        }

        /// Returns the follow-up remediations.
        pub fn follow_ups(&self) -> &[Remediation] {
            &self.header.follow_ups
        }
    };
}

/// A remediation over files.
///
/// # Examples
///
/// ```rust
/// use remediate::condition::FileCondition;
/// use remediate::remediation::FileRemediation;
///
/// let remediation = FileRemediation::search("/tmp", ["[0-9]{5,10}"])
///     .with_max_depth(1)
///     .with_conditions(FileCondition::min_size(24))
///     .with_report_only(true);
///
/// assert_eq!(remediation.conditions().len(), 1);
/// assert!(remediation.is_report_only());
/// ```
#[derive(Debug, Clone)]
pub struct FileRemediation {
    header: Header,
    target: FileTarget,
    conditions: Vec<FileCondition>,
}

impl FileRemediation {
    fn from_target(target: FileTarget) -> Self {
        Self {
            header: Header::default(),
            target,
            conditions: Vec::new(),
        }
    }

    /// Targets exactly one path.
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self::from_target(FileTarget::SinglePath { path: path.into() })
    }

    /// Searches a directory for entries matching any pattern.
    pub fn search<I, S>(dir: impl Into<PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_target(FileTarget::DirectorySearch {
            dir: Some(dir.into()),
            patterns: patterns.into_iter().map(Into::into).collect(),
            max_depth: None,
        })
    }

    /// Searches with patterns but no directory. Assessing it reports a
    /// configuration error; useful when the directory comes from config.
    pub fn search_without_dir<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_target(FileTarget::DirectorySearch {
            dir: None,
            patterns: patterns.into_iter().map(Into::into).collect(),
            max_depth: None,
        })
    }

    /// Targets files selected by a predicate query. Not supported.
    pub fn predicate(query: impl Into<String>) -> Self {
        Self::from_target(FileTarget::Predicate {
            query: query.into(),
        })
    }

    /// Sets the maximum search depth. Ignored for other targets.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        if let FileTarget::DirectorySearch { max_depth, .. } = &mut self.target {
            *max_depth = Some(depth);
        }
        self
    }

    /// Returns how subjects are found.
    pub fn target(&self) -> &FileTarget {
        &self.target
    }

    common_builders!(FileCondition);
}

/// A remediation over running processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRemediation {
    header: Header,
    flags: ProcessFlags,
    conditions: Vec<ProcessCondition>,
}

impl ProcessRemediation {
    /// Creates a process remediation with no conditions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also delete the executable when acting.
    pub fn with_delete_executable(mut self, enabled: bool) -> Self {
        self.flags.delete_executable = enabled;
        self
    }

    /// Allow acting on platform binaries.
    pub fn with_include_platform(mut self, enabled: bool) -> Self {
        self.flags.include_platform = enabled;
        self
    }

    /// Returns the action flags.
    pub fn flags(&self) -> &ProcessFlags {
        &self.flags
    }

    common_builders!(ProcessCondition);
}

/// A remediation over loaded background services.
#[derive(Debug, Clone, Default)]
pub struct ServiceRemediation {
    header: Header,
    flags: ServiceFlags,
    conditions: Vec<ServiceCondition>,
}

impl ServiceRemediation {
    /// Creates a service remediation with no conditions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only unload the service.
    pub fn with_unload_only(mut self, enabled: bool) -> Self {
        self.flags.unload_only = enabled;
        self
    }

    /// Also delete the executable's bundle.
    pub fn with_delete_bundle_too(mut self, enabled: bool) -> Self {
        self.flags.delete_bundle_too = enabled;
        self
    }

    /// Returns the action flags.
    pub fn flags(&self) -> &ServiceFlags {
        &self.flags
    }

    common_builders!(ServiceCondition);
}

/// A remediation over browser extensions.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRemediation {
    header: Header,
    conditions: Vec<ExtensionCondition>,
}

impl ExtensionRemediation {
    /// Creates an extension remediation with no conditions.
    pub fn new() -> Self {
        Self::default()
    }

    common_builders!(ExtensionCondition);
}

/// A remediation of any subject kind.
#[derive(Debug, Clone)]
pub enum Remediation {
    /// Acts on files.
    File(FileRemediation),
    /// Acts on processes.
    Process(ProcessRemediation),
    /// Acts on services.
    Service(ServiceRemediation),
    /// Acts on browser extensions.
    Extension(ExtensionRemediation),
}

impl Remediation {
    fn header(&self) -> &Header {
        match self {
            Self::File(r) => &r.header,
            Self::Process(r) => &r.header,
            Self::Service(r) => &r.header,
            Self::Extension(r) => &r.header,
        }
    }

    /// Returns the subject kind.
    pub fn kind(&self) -> SubjectKind {
        match self {
            Self::File(_) => SubjectKind::File,
            Self::Process(_) => SubjectKind::Process,
            Self::Service(_) => SubjectKind::Service,
            Self::Extension(_) => SubjectKind::Extension,
        }
    }

    /// Returns the label, if any.
    pub fn tag(&self) -> Option<&str> {
        self.header().tag.as_deref()
    }

    /// Returns whether destructive actions are suppressed.
    pub fn is_report_only(&self) -> bool {
        self.header().report_only
    }

    /// Returns the follow-up remediations.
    pub fn follow_ups(&self) -> &[Remediation] {
        &self.header().follow_ups
    }

    /// Returns the number of conditions.
    pub fn condition_count(&self) -> usize {
        match self {
            Self::File(r) => r.conditions.len(),
            Self::Process(r) => r.conditions.len(),
            Self::Service(r) => r.conditions.len(),
            Self::Extension(r) => r.conditions.len(),
        }
    }

    /// Returns the kind-specific action flags by name.
    pub fn kind_flags(&self) -> BTreeMap<&'static str, bool> {
        match self {
            Self::File(_) | Self::Extension(_) => BTreeMap::new(),
            Self::Process(r) => BTreeMap::from([
                ("delete_executable", r.flags.delete_executable),
                ("include_platform", r.flags.include_platform),
            ]),
            Self::Service(r) => BTreeMap::from([
                ("unload_only", r.flags.unload_only),
                ("delete_bundle_too", r.flags.delete_bundle_too),
            ]),
        }
    }

    /// Label used in logs: the tag, or the kind when untagged.
    pub fn display_name(&self) -> String {
        match self.tag() {
            Some(tag) => tag.to_string(),
            None => format!("<untagged {}>", self.kind()),
        }
    }
}

impl From<FileRemediation> for Remediation {
    fn from(r: FileRemediation) -> Self {
        Self::File(r)
    }
}

impl From<ProcessRemediation> for Remediation {
    fn from(r: ProcessRemediation) -> Self {
        Self::Process(r)
    }
}

impl From<ServiceRemediation> for Remediation {
    fn from(r: ServiceRemediation) -> Self {
        Self::Service(r)
    }
}

impl From<ExtensionRemediation> for Remediation {
    fn from(r: ExtensionRemediation) -> Self {
        Self::Extension(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn test_file_targets() {
        let single = FileRemediation::single("/tmp/eicar.com");
        assert!(matches!(single.target(), FileTarget::SinglePath { .. }));

        let search = FileRemediation::search("/tmp", ["a", "b"]).with_max_depth(2);
        assert_eq!(
            search.target(),
            &FileTarget::DirectorySearch {
                dir: Some(PathBuf::from("/tmp")),
                patterns: vec!["a".into(), "b".into()],
                max_depth: Some(2),
            }
        );

        let predicate = FileRemediation::predicate("kMDItemFSName == 'x'").with_max_depth(3);
        assert!(matches!(predicate.target(), FileTarget::Predicate { .. }));
    }

    #[test]
    fn test_kind_flags() {
        let process: Remediation = ProcessRemediation::new()
            .with_delete_executable(true)
            .into();
        let flags = process.kind_flags();
        assert_eq!(flags.get("delete_executable"), Some(&true));
        assert_eq!(flags.get("include_platform"), Some(&false));

        let service: Remediation = ServiceRemediation::new()
            .with_unload_only(true)
            .with_delete_bundle_too(true)
            .into();
        assert_eq!(service.kind_flags().len(), 2);
        assert!(service.kind_flags().values().all(|v| *v));

        let file: Remediation = FileRemediation::single("/x").into();
        assert!(file.kind_flags().is_empty());
    }

    #[test]
    fn test_header_accessors() {
        let remediation: Remediation = ServiceRemediation::new()
            .with_tag("updater")
            .with_report_only(true)
            .with_conditions(vec![
                ServiceCondition::argument_count(3),
                ServiceCondition::executable_path(Value::Wildcard),
            ])
            .with_follow_ups(FileRemediation::single("/tmp/updater"))
            .into();

        assert_eq!(remediation.kind(), SubjectKind::Service);
        assert_eq!(remediation.tag(), Some("updater"));
        assert!(remediation.is_report_only());
        assert_eq!(remediation.condition_count(), 2);
        assert_eq!(remediation.follow_ups().len(), 1);
        assert_eq!(remediation.follow_ups()[0].kind(), SubjectKind::File);
    }

    #[test]
    fn test_display_name() {
        let untagged: Remediation = ExtensionRemediation::new().into();
        assert_eq!(untagged.display_name(), "<untagged extension>");
    }

    #[test]
    fn test_flags_serde() {
        let json = serde_json::to_value(ServiceFlags {
            unload_only: true,
            delete_bundle_too: false,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"unload_only": true, "delete_bundle_too": false}));
    }
}

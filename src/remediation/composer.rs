//! Flattening of remediation declarations into a [`RemediationSet`].

use crate::condition::{FileCondition, IntoConditions};
use crate::remediation::model::{
    ExtensionRemediation, FileRemediation, ProcessRemediation, Remediation, ServiceRemediation,
};

use std::path::PathBuf;

/// Anything that can contribute remediations to a set.
///
/// Grouping declarations such as [`FileGroup`] expand here, at
/// composition time.
pub trait IntoRemediations {
    /// Appends this declaration's remediations to `out`.
    fn into_remediations(self, out: &mut Vec<Remediation>);
}

impl IntoRemediations for Remediation {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        out.push(self);
    }
}

impl IntoRemediations for FileRemediation {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        out.push(Remediation::File(self));
    }
}

impl IntoRemediations for ProcessRemediation {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        out.push(Remediation::Process(self));
    }
}

impl IntoRemediations for ServiceRemediation {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        out.push(Remediation::Service(self));
    }
}

impl IntoRemediations for ExtensionRemediation {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        out.push(Remediation::Extension(self));
    }
}

impl<T: IntoRemediations> IntoRemediations for Option<T> {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        if let Some(inner) = self {
            inner.into_remediations(out);
        }
    }
}

impl<T: IntoRemediations> IntoRemediations for Vec<T> {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        for item in self {
            item.into_remediations(out);
        }
    }
}

impl<T: IntoRemediations, const N: usize> IntoRemediations for [T; N] {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        for item in self {
            item.into_remediations(out);
        }
    }
}

impl IntoRemediations for RemediationSet {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        out.extend(self.remediations);
    }
}

/// A list of paths sharing one condition list, tag and report-only flag.
///
/// Expands into one single-path [`FileRemediation`] per path, in path
/// order.
///
/// # Examples
///
/// ```rust
/// use remediate::condition::FileCondition;
/// use remediate::remediation::{FileGroup, RemediationSet};
///
/// let set = RemediationSet::builder()
///     .with(
///         FileGroup::new(["/tmp/a.bin", "/tmp/b.bin"])
///             .with_tag("dropper")
///             .with_conditions(FileCondition::min_size(1024)),
///     )
///     .build();
///
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileGroup {
    paths: Vec<PathBuf>,
    tag: Option<String>,
    report_only: bool,
    conditions: Vec<FileCondition>,
}

impl FileGroup {
    /// Creates a group over the given paths.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the label shared by every expanded remediation.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets report-only mode for every expanded remediation.
    pub fn with_report_only(mut self, report_only: bool) -> Self {
        self.report_only = report_only;
        self
    }

    /// Appends conditions shared by every expanded remediation.
    pub fn with_conditions(mut self, conditions: impl IntoConditions<FileCondition>) -> Self {
        conditions.into_conditions(&mut self.conditions);
        self
    }
}

impl IntoRemediations for FileGroup {
    fn into_remediations(self, out: &mut Vec<Remediation>) {
        for path in self.paths {
            let mut remediation = FileRemediation::single(path)
                .with_report_only(self.report_only)
                .with_conditions(self.conditions.clone());
            if let Some(tag) = &self.tag {
                remediation = remediation.with_tag(tag.clone());
            }
            out.push(Remediation::File(remediation));
        }
    }
}

/// The ordered output of one declarative block. Order is evaluation order.
#[derive(Debug, Clone, Default)]
pub struct RemediationSet {
    remediations: Vec<Remediation>,
}

impl RemediationSet {
    /// Creates a new builder.
    pub fn builder() -> RemediationSetBuilder {
        RemediationSetBuilder::new()
    }

    /// Returns the number of top-level remediations.
    pub fn len(&self) -> usize {
        self.remediations.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.remediations.is_empty()
    }

    /// Returns the number of remediations including nested follow-ups.
    pub fn total_count(&self) -> usize {
        fn count(remediations: &[Remediation]) -> usize {
            remediations
                .iter()
                .map(|r| 1 + count(r.follow_ups()))
                .sum()
        }
        count(&self.remediations)
    }

    /// Iterates over the top-level remediations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Remediation> {
        self.remediations.iter()
    }

    /// Returns the top-level remediations.
    pub fn as_slice(&self) -> &[Remediation] {
        &self.remediations
    }
}

impl<'a> IntoIterator for &'a RemediationSet {
    type Item = &'a Remediation;
    type IntoIter = std::slice::Iter<'a, Remediation>;

    fn into_iter(self) -> Self::IntoIter {
        self.remediations.iter()
    }
}

impl IntoIterator for RemediationSet {
    type Item = Remediation;
    type IntoIter = std::vec::IntoIter<Remediation>;

    fn into_iter(self) -> Self::IntoIter {
        self.remediations.into_iter()
    }
}

/// Builder that flattens remediation declarations.
#[derive(Debug, Default)]
pub struct RemediationSetBuilder {
    remediations: Vec<Remediation>,
}

impl RemediationSetBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one remediation of any kind.
    pub fn add(mut self, remediation: impl Into<Remediation>) -> Self {
        self.remediations.push(remediation.into());
        self
    }

    /// Appends the remediation if present.
    pub fn add_optional<R: Into<Remediation>>(mut self, remediation: Option<R>) -> Self {
        self.remediations.extend(remediation.map(Into::into));
        self
    }

    /// Appends every remediation, preserving order.
    pub fn add_all<I, R>(mut self, remediations: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Remediation>,
    {
        self.remediations
            .extend(remediations.into_iter().map(Into::into));
        self
    }

    /// Appends any remediation declaration, expanding groups.
    pub fn with(mut self, declaration: impl IntoRemediations) -> Self {
        declaration.into_remediations(&mut self.remediations);
        self
    }

    /// Builds the set.
    pub fn build(self) -> RemediationSet {
        tracing::debug!(count = self.remediations.len(), "Remediation set composed");
        RemediationSet {
            remediations: self.remediations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SubjectKind;
    use crate::remediation::FileTarget;

    fn tags(set: &RemediationSet) -> Vec<Option<&str>> {
        set.iter().map(Remediation::tag).collect()
    }

    #[test]
    fn test_builder_flattens_in_order() {
        let absent: Option<ProcessRemediation> = None;
        let set = RemediationSet::builder()
            .add(FileRemediation::single("/a").with_tag("a"))
            .add_optional(Some(ServiceRemediation::new().with_tag("b")))
            .add_optional(absent)
            .with(vec![
                Remediation::from(ProcessRemediation::new().with_tag("c")),
                Remediation::from(ExtensionRemediation::new().with_tag("d")),
            ])
            .add_all([FileRemediation::single("/e").with_tag("e")])
            .build();

        assert_eq!(tags(&set), [Some("a"), Some("b"), Some("c"), Some("d"), Some("e")]);
        assert_eq!(set.as_slice()[1].kind(), SubjectKind::Service);
    }

    #[test]
    fn test_file_group_expands_per_path() {
        let set = RemediationSet::builder()
            .with(
                FileGroup::new(["/one", "/two", "/three"])
                    .with_tag("group")
                    .with_report_only(true)
                    .with_conditions([FileCondition::min_size(1), FileCondition::macho(true)]),
            )
            .build();

        assert_eq!(set.len(), 3);
        let paths: Vec<_> = set
            .iter()
            .map(|r| match r {
                Remediation::File(f) => match f.target() {
                    FileTarget::SinglePath { path } => path.display().to_string(),
                    other => panic!("unexpected target {other:?}"),
                },
                other => panic!("unexpected kind {other:?}"),
            })
            .collect();
        assert_eq!(paths, ["/one", "/two", "/three"]);
        assert!(set.iter().all(|r| r.is_report_only() && r.condition_count() == 2));
        assert!(set.iter().all(|r| r.tag() == Some("group")));
    }

    #[test]
    fn test_empty_group_expands_to_nothing() {
        let set = RemediationSet::builder()
            .with(FileGroup::new(Vec::<PathBuf>::new()))
            .build();
        assert!(set.is_empty());
    }

    #[test]
    fn test_nested_sets_and_total_count() {
        let inner = RemediationSet::builder()
            .add(
                ProcessRemediation::new()
                    .with_follow_ups([FileRemediation::single("/x"), FileRemediation::single("/y")]),
            )
            .build();
        let set = RemediationSet::builder()
            .with(inner)
            .add(FileRemediation::single("/z"))
            .build();

        assert_eq!(set.len(), 2);
        assert_eq!(set.total_count(), 4);
    }
}

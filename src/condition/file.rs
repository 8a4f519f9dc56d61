//! Conditions over a file path.

use crate::condition::{evaluate_all, lookup_or_false, scan_path, signature_flag, Condition};
use crate::core::{Collaborators, MatcherHandle, Value};

use std::path::Path;
use std::sync::Arc;

/// Leading magic numbers of thin and universal Mach-O binaries.
const MACHO_MAGICS: [&str; 6] = [
    "feedface", "feedfacf", "cefaedfe", "cffaedfe", "cafebabe", "bebafeca",
];

/// A condition over a file on disk.
///
/// # Examples
///
/// ```rust
/// use remediate::condition::{evaluate_all, FileCondition};
/// use remediate::core::{Collaborators, Value};
/// use std::path::Path;
///
/// let conditions = vec![
///     FileCondition::path(Value::suffix(".plist")),
///     FileCondition::min_size(1024),
/// ];
///
/// // The path check fails, so the size is never looked up.
/// let matched = evaluate_all(&conditions, Path::new("/tmp/a.txt"), &Collaborators::new());
/// assert!(!matched);
/// ```
#[derive(Debug, Clone)]
pub enum FileCondition {
    /// File is strictly larger than the given size in bytes.
    MinSize(u64),
    /// File is strictly smaller than the given size in bytes.
    MaxSize(u64),
    /// The path text matches.
    Path(Value),
    /// The MIME type matches.
    Mime(Value),
    /// The hex of the leading magic bytes matches.
    Magic(Value),
    /// Whether the file is a Mach-O binary.
    MachO(bool),
    /// The compiled rules match the file contents.
    Pattern(Arc<MatcherHandle>),
    /// The SHA-256 of the contents equals the hex digest.
    Sha256(String),
    /// Whether the file is notarized.
    Notarized(bool),
    /// The code directory hash equals the hex digest.
    CdHash(String),
}

impl FileCondition {
    /// Creates a `MinSize` condition.
    pub fn min_size(bytes: u64) -> Self {
        Self::MinSize(bytes)
    }

    /// Creates a `MaxSize` condition.
    pub fn max_size(bytes: u64) -> Self {
        Self::MaxSize(bytes)
    }

    /// Creates a `Path` condition.
    pub fn path(value: Value) -> Self {
        Self::Path(value)
    }

    /// Creates a `Mime` condition.
    pub fn mime(value: Value) -> Self {
        Self::Mime(value)
    }

    /// Creates a `Magic` condition.
    pub fn magic(value: Value) -> Self {
        Self::Magic(value)
    }

    /// Creates a `MachO` condition.
    pub fn macho(is_macho: bool) -> Self {
        Self::MachO(is_macho)
    }

    /// Creates a `Pattern` condition that owns the handle.
    pub fn pattern(handle: MatcherHandle) -> Self {
        Self::Pattern(Arc::new(handle))
    }

    /// Creates a `Pattern` condition sharing a handle with other conditions.
    pub fn shared_pattern(handle: Arc<MatcherHandle>) -> Self {
        Self::Pattern(handle)
    }

    /// Creates a `Sha256` condition.
    pub fn sha256(hex: impl Into<String>) -> Self {
        Self::Sha256(hex.into())
    }

    /// Creates a `Notarized` condition.
    pub fn notarized(is_notarized: bool) -> Self {
        Self::Notarized(is_notarized)
    }

    /// Creates a `CdHash` condition.
    pub fn cdhash(hex: impl Into<String>) -> Self {
        Self::CdHash(hex.into())
    }
}

impl Condition for FileCondition {
    type Subject = Path;

    fn evaluate(&self, path: &Path, collaborators: &Collaborators) -> bool {
        let metadata = collaborators.metadata();
        let result = match self {
            Self::MinSize(min) => lookup_or_false(metadata.size(path), path, "size")
                .map(|size| *min < size)
                .unwrap_or(false),
            Self::MaxSize(max) => lookup_or_false(metadata.size(path), path, "size")
                .map(|size| size < *max)
                .unwrap_or(false),
            Self::Path(value) => value.matches(&*path.to_string_lossy()),
            Self::Mime(value) => lookup_or_false(metadata.mime_type(path), path, "mime_type")
                .map(|mime| value.matches(&mime))
                .unwrap_or(false),
            Self::Magic(value) => lookup_or_false(metadata.magic(path), path, "magic")
                .map(|magic| value.matches(&magic))
                .unwrap_or(false),
            Self::MachO(expected) => lookup_or_false(metadata.magic(path), path, "magic")
                .map(|magic| MACHO_MAGICS.contains(&magic.as_str()) == *expected)
                .unwrap_or(false),
            Self::Pattern(handle) => scan_path(handle, path, collaborators),
            Self::Sha256(expected) => lookup_or_false(metadata.sha256(path), path, "sha256")
                .map(|digest| digest.eq_ignore_ascii_case(expected))
                .unwrap_or(false),
            Self::Notarized(expected) => {
                signature_flag(collaborators, path, "notarized", *expected, |s, p| {
                    s.is_notarized(p)
                })
            }
            Self::CdHash(expected) => match collaborators.signature_inspector() {
                Some(inspector) => {
                    lookup_or_false(inspector.code_directory_hash(path), path, "cdhash")
                        .map(|hash| hash.eq_ignore_ascii_case(expected))
                        .unwrap_or(false)
                }
                None => false,
            },
        };

        tracing::trace!(path = %path.display(), condition = ?self, result, "File condition evaluated");
        result
    }
}

/// Evaluates nested file conditions against an optional path.
pub(crate) fn evaluate_nested(
    conditions: &[FileCondition],
    path: Option<&Path>,
    collaborators: &Collaborators,
) -> bool {
    match path {
        Some(path) => evaluate_all(conditions, path, collaborators),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MockMatcher, MockSignatureInspector};
    use crate::core::PatternMatcher;
    use std::io::Write;

    fn file_with(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_min_size_is_strict() {
        let file = file_with(&[0u8; 68]);
        let ctx = Collaborators::new();

        assert!(FileCondition::min_size(67).evaluate(file.path(), &ctx));
        assert!(!FileCondition::min_size(68).evaluate(file.path(), &ctx));
    }

    #[test]
    fn test_max_size_is_strict() {
        let file = file_with(&[0u8; 10]);
        let ctx = Collaborators::new();

        assert!(FileCondition::max_size(11).evaluate(file.path(), &ctx));
        assert!(!FileCondition::max_size(10).evaluate(file.path(), &ctx));
    }

    #[test]
    fn test_size_lookup_failure_is_false() {
        let ctx = Collaborators::new();
        let missing = Path::new("/definitely/not/a/file");

        assert!(!FileCondition::min_size(0).evaluate(missing, &ctx));
        assert!(!FileCondition::max_size(u64::MAX).evaluate(missing, &ctx));
        assert!(!FileCondition::sha256("00").evaluate(missing, &ctx));
    }

    #[test]
    fn test_path_condition() {
        let ctx = Collaborators::new();
        let condition = FileCondition::path(Value::prefix("/Library/LaunchAgents/"));

        assert!(condition.evaluate(Path::new("/Library/LaunchAgents/com.evil.plist"), &ctx));
        assert!(!condition.evaluate(Path::new("/tmp/com.evil.plist"), &ctx));
    }

    #[test]
    fn test_sha256_is_case_insensitive() {
        let file = file_with(b"");
        let ctx = Collaborators::new();
        let condition = FileCondition::sha256(
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855",
        );
        assert!(condition.evaluate(file.path(), &ctx));
    }

    #[test]
    fn test_macho_detection() {
        let macho = file_with(&[0xcf, 0xfa, 0xed, 0xfe, 0x07, 0x00]);
        let text = file_with(b"#!/bin/sh\n");
        let ctx = Collaborators::new();

        assert!(FileCondition::macho(true).evaluate(macho.path(), &ctx));
        assert!(!FileCondition::macho(true).evaluate(text.path(), &ctx));
        assert!(FileCondition::macho(false).evaluate(text.path(), &ctx));
    }

    #[test]
    fn test_pattern_condition_scans_contents() {
        let file = file_with(b"payload: EVIL-MARKER");
        let ctx = Collaborators::new();
        let matcher = MockMatcher::new().with_match_on(b"EVIL-MARKER".to_vec());
        let condition = FileCondition::pattern(matcher.compile("marker").unwrap());

        assert!(condition.evaluate(file.path(), &ctx));
        assert_eq!(matcher.scan_count(), 1);
    }

    #[test]
    fn test_pattern_scan_error_is_false() {
        let ctx = Collaborators::new();
        let matcher = MockMatcher::new().with_match_on(b"x".to_vec());
        let condition = FileCondition::pattern(matcher.compile("x").unwrap());

        assert!(!condition.evaluate(Path::new("/definitely/not/a/file"), &ctx));
    }

    #[test]
    fn test_signature_conditions_need_inspector() {
        let file = file_with(b"binary");
        let condition = FileCondition::notarized(false);

        assert!(!condition.evaluate(file.path(), &Collaborators::new()));

        let ctx = Collaborators::new()
            .with_signature_inspector(MockSignatureInspector::new().with_notarized(false));
        assert!(condition.evaluate(file.path(), &ctx));
        assert!(!FileCondition::notarized(true).evaluate(file.path(), &ctx));
    }

    #[test]
    fn test_cdhash_condition() {
        let file = file_with(b"binary");
        let ctx = Collaborators::new().with_signature_inspector(
            MockSignatureInspector::new().with_cdhash("ABCDEF0123"),
        );

        assert!(FileCondition::cdhash("abcdef0123").evaluate(file.path(), &ctx));
        assert!(!FileCondition::cdhash("ffff").evaluate(file.path(), &ctx));
    }

    #[test]
    fn test_short_circuit_skips_scan() {
        let file = file_with(&[0u8; 50]);
        let ctx = Collaborators::new();
        let matcher = MockMatcher::new().with_default_result(true);

        let conditions = vec![
            FileCondition::min_size(68),
            FileCondition::pattern(matcher.compile("rule").unwrap()),
        ];

        assert!(!evaluate_all(&conditions, file.path(), &ctx));
        assert_eq!(matcher.scan_count(), 0);
    }

    #[test]
    fn test_empty_list_matches() {
        let ctx = Collaborators::new();
        assert!(evaluate_all::<FileCondition>(&[], Path::new("/anything"), &ctx));
    }
}

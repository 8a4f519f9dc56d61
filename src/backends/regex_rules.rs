//! Regular-expression rule matcher.
//!
//! Rule text is one byte-oriented regular expression per line. Blank lines
//! and lines starting with `#` are ignored. A file matches when any rule
//! finds a match anywhere in its contents.

use crate::core::{CompiledRules, MatcherError, MatcherHandle, MatcherResult, PatternMatcher};

use regex::bytes::{RegexSet, RegexSetBuilder};
use std::path::Path;

/// [`PatternMatcher`] compiling rule text with the `regex` crate.
///
/// # Examples
///
/// ```rust
/// use remediate::backends::RegexRuleMatcher;
/// use remediate::core::PatternMatcher;
///
/// let matcher = RegexRuleMatcher::new();
/// let handle = matcher.compile("# droppers\nEVIL-[0-9]+\n").unwrap();
/// assert!(handle.scan_bytes(b"payload EVIL-42").unwrap());
/// assert!(matcher.compile("(unclosed").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RegexRuleMatcher {
    size_limit: usize,
    max_scan_size: u64,
}

impl Default for RegexRuleMatcher {
    fn default() -> Self {
        Self {
            size_limit: 10 * 1024 * 1024,
            max_scan_size: 100 * 1024 * 1024, // 100 MB
        }
    }
}

impl RegexRuleMatcher {
    /// Creates a matcher with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compiled program size limit.
    pub fn with_size_limit(mut self, bytes: usize) -> Self {
        self.size_limit = bytes;
        self
    }

    /// Sets the largest file that will be scanned.
    pub fn with_max_scan_size(mut self, bytes: u64) -> Self {
        self.max_scan_size = bytes;
        self
    }
}

impl PatternMatcher for RegexRuleMatcher {
    fn name(&self) -> &str {
        "regex"
    }

    fn compile(&self, rule_text: &str) -> MatcherResult<MatcherHandle> {
        let rules: Vec<&str> = rule_text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        if rules.is_empty() {
            return Err(MatcherError::compile("rule text contains no rules"));
        }

        let set = RegexSetBuilder::new(&rules)
            .size_limit(self.size_limit)
            .build()
            .map_err(|e| MatcherError::compile(e.to_string()))?;

        tracing::debug!(rules = rules.len(), "Compiled regex rules");

        let description = format!("regex({} rules)", rules.len());
        Ok(MatcherHandle::new(
            description,
            RegexRules {
                set,
                max_scan_size: self.max_scan_size,
            },
        ))
    }
}

#[derive(Debug)]
struct RegexRules {
    set: RegexSet,
    max_scan_size: u64,
}

impl CompiledRules for RegexRules {
    fn scan_bytes(&self, data: &[u8]) -> MatcherResult<bool> {
        Ok(self.set.is_match(data))
    }

    fn scan_path(&self, path: &Path) -> MatcherResult<bool> {
        let size = std::fs::metadata(path)?.len();
        if size > self.max_scan_size {
            return Err(MatcherError::scan(format!(
                "{} bytes exceeds scan limit of {}",
                size, self.max_scan_size
            )));
        }
        let data = std::fs::read(path)?;
        self.scan_bytes(&data)
    }
}

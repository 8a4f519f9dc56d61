//! Collaborator backend implementations.
//!
//! ## Available Backends
//!
//! - [`fs`] - metadata lookups, directory walking and file deletion over `std::fs`
//! - [`regex_rules`] - a [`PatternMatcher`] compiling line-oriented regex rules
//! - [`mock`] - scripted and call-counting collaborators for testing
//!
//! ## Implementing a Custom Backend
//!
//! To plug in a different pattern engine, implement [`PatternMatcher`] and
//! wrap its compiled state in a [`MatcherHandle`]:
//!
//! ```rust
//! use remediate::core::{CompiledRules, MatcherHandle, MatcherResult, PatternMatcher};
//!
//! #[derive(Debug)]
//! struct Needle(Vec<u8>);
//!
//! impl CompiledRules for Needle {
//!     fn scan_bytes(&self, data: &[u8]) -> MatcherResult<bool> {
//!         Ok(data.windows(self.0.len()).any(|w| w == self.0.as_slice()))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct NeedleMatcher;
//!
//! impl PatternMatcher for NeedleMatcher {
//!     fn name(&self) -> &str {
//!         "needle"
//!     }
//!
//!     fn compile(&self, rule_text: &str) -> MatcherResult<MatcherHandle> {
//!         Ok(MatcherHandle::new(rule_text, Needle(rule_text.as_bytes().to_vec())))
//!     }
//! }
//!
//! let handle = NeedleMatcher.compile("evil").unwrap();
//! assert!(handle.scan_bytes(b"some evil bytes").unwrap());
//! ```
//!
//! [`PatternMatcher`]: crate::core::PatternMatcher
//! [`MatcherHandle`]: crate::core::MatcherHandle

pub mod fs;
pub mod mock;
pub mod regex_rules;

// Re-exports
pub use fs::{FsActionExecutor, FsMetadataProvider, WalkDirWalker};
pub use mock::{
    MockExtensionInspector, MockMatcher, MockProcessInspector, MockServiceInspector,
    MockSignatureInspector, RecordedAction, RecordingExecutor, RecordingReporter,
};
pub use regex_rules::RegexRuleMatcher;

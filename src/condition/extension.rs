//! Conditions over a registered browser extension.

use crate::condition::{scan_path, Condition};
use crate::core::{Collaborators, ExtensionInfo, MatcherHandle, Value};

use std::sync::Arc;

/// A condition over a registered browser extension.
#[derive(Debug, Clone)]
pub enum ExtensionCondition {
    /// The bundle identifier matches.
    Identifier(Value),
    /// The compiled rules match the extension's native binary.
    BinaryPattern(Arc<MatcherHandle>),
    /// The compiled rules match any bundled script.
    JavaScriptPattern(Arc<MatcherHandle>),
}

impl ExtensionCondition {
    /// Creates an `Identifier` condition.
    pub fn identifier(value: Value) -> Self {
        Self::Identifier(value)
    }

    /// Creates a `BinaryPattern` condition that owns the handle.
    pub fn binary_pattern(handle: MatcherHandle) -> Self {
        Self::BinaryPattern(Arc::new(handle))
    }

    /// Creates a `JavaScriptPattern` condition that owns the handle.
    pub fn javascript_pattern(handle: MatcherHandle) -> Self {
        Self::JavaScriptPattern(Arc::new(handle))
    }
}

impl Condition for ExtensionCondition {
    type Subject = ExtensionInfo;

    fn evaluate(&self, extension: &ExtensionInfo, collaborators: &Collaborators) -> bool {
        let result = match self {
            Self::Identifier(value) => value.matches(&extension.identifier),
            Self::BinaryPattern(handle) => extension
                .binary
                .as_deref()
                .map(|path| scan_path(handle, path, collaborators))
                .unwrap_or(false),
            Self::JavaScriptPattern(handle) => extension
                .scripts
                .iter()
                .any(|script| scan_path(handle, script, collaborators)),
        };

        tracing::trace!(extension = %extension.identifier, condition = ?self, result, "Extension condition evaluated");
        result
    }
}

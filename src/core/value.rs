//! Matching literals used as the comparison operand inside conditions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

/// A matching literal.
///
/// Values are immutable once constructed. Each variant has its own matching
/// rule, see [`Value::matches`].
///
/// # Examples
///
/// ```rust
/// use remediate::core::Value;
///
/// assert!(Value::prefix("com.apple.").matches("com.apple.Safari"));
/// assert!(Value::pattern("[0-9]{5}").matches("/tmp/build-123456"));
/// assert!(Value::Int(3).matches("3"));
/// assert!(Value::Wildcard.matches(""));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Case-sensitive string equality.
    Exact(String),
    /// Regular expression search (unanchored).
    Pattern(RegexPattern),
    /// Boolean equality against a coerced candidate.
    Bool(bool),
    /// Integer equality against a coerced candidate.
    Int(i64),
    /// Exact membership in a set of strings.
    StringGroup(Vec<String>),
    /// Equality membership in a set of integers.
    IntGroup(Vec<i64>),
    /// Any pattern in the group finds a match.
    PatternGroup(Vec<RegexPattern>),
    /// Candidate starts with the string.
    Prefix(String),
    /// Candidate ends with the string.
    Suffix(String),
    /// Candidate contains the string.
    Contains(String),
    /// Always matches.
    Wildcard,
}

/// Regular expression source text, compiled on first use and cached.
///
/// Serializes as the plain source string. Text that fails to compile is
/// logged once and never matches.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RegexPattern {
    source: String,
    compiled: OnceLock<Option<Regex>>,
}

impl RegexPattern {
    /// Creates a pattern from source text.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }
    }

    /// Returns the source text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the pattern finds a match anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex().is_some_and(|re| re.is_match(text))
    }

    fn regex(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| match Regex::new(&self.source) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = %self.source, error = %e, "Invalid pattern in value; treating as no match");
                    None
                }
            })
            .as_ref()
    }
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexPattern").field(&self.source).finish()
    }
}

impl fmt::Display for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RegexPattern {}

impl From<String> for RegexPattern {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl From<&str> for RegexPattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<RegexPattern> for String {
    fn from(pattern: RegexPattern) -> Self {
        pattern.source
    }
}

/// The thing a [`Value`] is matched against.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    /// Text, e.g. a path or a process name.
    Text(&'a str),
    /// A boolean attribute.
    Bool(bool),
    /// An integer attribute.
    Int(i64),
    /// A structured property value (e.g. from a service definition).
    Json(&'a serde_json::Value),
}

impl<'a> Candidate<'a> {
    /// Returns the textual form used by string-style variants.
    pub fn text(&self) -> Option<Cow<'a, str>> {
        match *self {
            Self::Text(s) => Some(Cow::Borrowed(s)),
            Self::Bool(b) => Some(Cow::Owned(b.to_string())),
            Self::Int(i) => Some(Cow::Owned(i.to_string())),
            Self::Json(serde_json::Value::String(s)) => Some(Cow::Borrowed(s.as_str())),
            Self::Json(serde_json::Value::Bool(b)) => Some(Cow::Owned(b.to_string())),
            Self::Json(serde_json::Value::Number(n)) => Some(Cow::Owned(n.to_string())),
            Self::Json(_) => None,
        }
    }

    /// Coerces the candidate to a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            Self::Int(i) => Some(i != 0),
            Self::Text(s) => parse_bool(s),
            Self::Json(serde_json::Value::Bool(b)) => Some(*b),
            Self::Json(serde_json::Value::String(s)) => parse_bool(s),
            Self::Json(serde_json::Value::Number(n)) => n.as_i64().map(|i| i != 0),
            Self::Json(_) => None,
        }
    }

    /// Coerces the candidate to an integer.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            Self::Bool(b) => Some(i64::from(b)),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Json(serde_json::Value::Number(n)) => n.as_i64(),
            Self::Json(serde_json::Value::String(s)) => s.trim().parse().ok(),
            Self::Json(_) => None,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "TRUE" | "True" | "YES" | "yes" | "1" => Some(true),
        "false" | "FALSE" | "False" | "NO" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl<'a> From<&'a str> for Candidate<'a> {
    fn from(s: &'a str) -> Self {
        Self::Text(s)
    }
}

impl<'a> From<&'a String> for Candidate<'a> {
    fn from(s: &'a String) -> Self {
        Self::Text(s.as_str())
    }
}

impl From<bool> for Candidate<'_> {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Candidate<'_> {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl<'a> From<&'a serde_json::Value> for Candidate<'a> {
    fn from(v: &'a serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl Value {
    /// Creates an `Exact` value.
    pub fn exact(s: impl Into<String>) -> Self {
        Self::Exact(s.into())
    }

    /// Creates a `Pattern` value.
    pub fn pattern(p: impl Into<String>) -> Self {
        Self::Pattern(RegexPattern::new(p))
    }

    /// Creates a `Prefix` value.
    pub fn prefix(s: impl Into<String>) -> Self {
        Self::Prefix(s.into())
    }

    /// Creates a `Suffix` value.
    pub fn suffix(s: impl Into<String>) -> Self {
        Self::Suffix(s.into())
    }

    /// Creates a `Contains` value.
    pub fn contains(s: impl Into<String>) -> Self {
        Self::Contains(s.into())
    }

    /// Creates a `StringGroup` value.
    pub fn string_group<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::StringGroup(items.into_iter().map(Into::into).collect())
    }

    /// Creates a `PatternGroup` value.
    pub fn pattern_group<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PatternGroup(items.into_iter().map(RegexPattern::new).collect())
    }

    /// Matches this value against a candidate.
    pub fn matches<'a>(&self, candidate: impl Into<Candidate<'a>>) -> bool {
        let candidate = candidate.into();
        match self {
            Self::Wildcard => true,
            Self::Bool(expected) => candidate.as_bool() == Some(*expected),
            Self::Int(expected) => candidate.as_int() == Some(*expected),
            Self::IntGroup(group) => candidate
                .as_int()
                .map(|i| group.contains(&i))
                .unwrap_or(false),
            _ => match candidate.text() {
                Some(text) => self.matches_text(&text),
                None => false,
            },
        }
    }

    fn matches_text(&self, text: &str) -> bool {
        match self {
            Self::Exact(s) => text == s,
            Self::Pattern(p) => p.is_match(text),
            Self::Prefix(s) => text.starts_with(s.as_str()),
            Self::Suffix(s) => text.ends_with(s.as_str()),
            Self::Contains(s) => text.contains(s.as_str()),
            Self::StringGroup(group) => group.iter().any(|s| s == text),
            Self::PatternGroup(group) => group.iter().any(|p| p.is_match(text)),
            Self::Wildcard => true,
            Self::Bool(_) | Self::Int(_) | Self::IntGroup(_) => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "exact({s})"),
            Self::Pattern(p) => write!(f, "pattern({p})"),
            Self::Bool(b) => write!(f, "bool({b})"),
            Self::Int(i) => write!(f, "int({i})"),
            Self::StringGroup(g) => write!(f, "string_group({})", g.join(", ")),
            Self::IntGroup(g) => {
                let items: Vec<String> = g.iter().map(i64::to_string).collect();
                write!(f, "int_group({})", items.join(", "))
            }
            Self::PatternGroup(g) => {
                let items: Vec<&str> = g.iter().map(RegexPattern::as_str).collect();
                write!(f, "pattern_group({})", items.join(", "))
            }
            Self::Prefix(s) => write!(f, "prefix({s})"),
            Self::Suffix(s) => write!(f, "suffix({s})"),
            Self::Contains(s) => write!(f, "contains({s})"),
            Self::Wildcard => write!(f, "*"),
        }
    }
}

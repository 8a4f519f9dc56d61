//! Flattening of condition declarations into one ordered list.

use crate::condition::{ExtensionCondition, FileCondition, ProcessCondition, ServiceCondition};

/// Anything that can contribute conditions of kind `C` to a list.
///
/// Implemented for single conditions, `Option`, `Vec`, arrays and
/// [`ConditionSet`]. Contributions are appended in declared order.
pub trait IntoConditions<C> {
    /// Appends this declaration's conditions to `out`.
    fn into_conditions(self, out: &mut Vec<C>);
}

impl IntoConditions<FileCondition> for FileCondition {
    fn into_conditions(self, out: &mut Vec<FileCondition>) {
        out.push(self);
    }
}

impl IntoConditions<ProcessCondition> for ProcessCondition {
    fn into_conditions(self, out: &mut Vec<ProcessCondition>) {
        out.push(self);
    }
}

impl IntoConditions<ServiceCondition> for ServiceCondition {
    fn into_conditions(self, out: &mut Vec<ServiceCondition>) {
        out.push(self);
    }
}

impl IntoConditions<ExtensionCondition> for ExtensionCondition {
    fn into_conditions(self, out: &mut Vec<ExtensionCondition>) {
        out.push(self);
    }
}

impl<C, T: IntoConditions<C>> IntoConditions<C> for Option<T> {
    fn into_conditions(self, out: &mut Vec<C>) {
        if let Some(inner) = self {
            inner.into_conditions(out);
        }
    }
}

impl<C, T: IntoConditions<C>> IntoConditions<C> for Vec<T> {
    fn into_conditions(self, out: &mut Vec<C>) {
        for item in self {
            item.into_conditions(out);
        }
    }
}

impl<C, T: IntoConditions<C>, const N: usize> IntoConditions<C> for [T; N] {
    fn into_conditions(self, out: &mut Vec<C>) {
        for item in self {
            item.into_conditions(out);
        }
    }
}

impl<C> IntoConditions<C> for ConditionSet<C> {
    fn into_conditions(self, out: &mut Vec<C>) {
        out.extend(self.conditions);
    }
}

/// Builder that flattens condition declarations of one subject kind.
///
/// The resulting list is a logical AND evaluated left to right.
///
/// # Examples
///
/// ```rust
/// use remediate::condition::{ConditionSet, FileCondition};
/// use remediate::core::Value;
///
/// let optional: Option<FileCondition> = None;
/// let conditions = ConditionSet::new()
///     .add(FileCondition::min_size(24))
///     .add_optional(optional)
///     .with(vec![
///         FileCondition::path(Value::suffix(".bin")),
///         FileCondition::macho(false),
///     ])
///     .build();
///
/// assert_eq!(conditions.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ConditionSet<C> {
    conditions: Vec<C>,
}

impl<C> Default for ConditionSet<C> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }
}

impl<C> ConditionSet<C> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one condition.
    pub fn add(mut self, condition: C) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Appends the condition if present.
    pub fn add_optional(mut self, condition: Option<C>) -> Self {
        self.conditions.extend(condition);
        self
    }

    /// Appends every condition, preserving order.
    pub fn add_all<I: IntoIterator<Item = C>>(mut self, conditions: I) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// Appends any condition declaration.
    pub fn with(mut self, declaration: impl IntoConditions<C>) -> Self {
        declaration.into_conditions(&mut self.conditions);
        self
    }

    /// Returns the number of conditions declared so far.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Returns `true` if nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns the flat ordered list.
    pub fn build(self) -> Vec<C> {
        self.conditions
    }
}

/// Flattens a single declaration into a list.
pub fn flatten<C>(declaration: impl IntoConditions<C>) -> Vec<C> {
    let mut out = Vec::new();
    declaration.into_conditions(&mut out);
    out
}

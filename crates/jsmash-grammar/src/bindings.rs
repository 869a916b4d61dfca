//! Identifier bindings visible at a point in the descent.

use std::fmt;

/// Ordered identifier names in scope.
///
/// Extension returns a new value; the receiver is never modified, so names
/// introduced in one subtree cannot leak into a sibling or the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    names: Vec<String>,
}

impl Bindings {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from names, in order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// A copy of this context with `name` appended.
    pub fn with(&self, name: impl Into<String>) -> Self {
        let mut names = self.names.clone();
        names.push(name.into());
        Self { names }
    }

    /// A copy of this context with every name in `extra` appended.
    pub fn with_all<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = self.names.clone();
        names.extend(extra.into_iter().map(Into::into));
        Self { names }
    }

    /// Whether `name` is in scope.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Names in the order they were introduced.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of names in scope.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}

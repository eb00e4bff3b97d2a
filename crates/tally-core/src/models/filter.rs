//! Name-keyed selection of modules and tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Selection for a single filter entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    /// `true` selects everything below the key, `false` excludes it
    Flag(bool),

    /// Selects only the named children
    Only(Filter),
}

/// Nested filter restricting which modules and tests execute.
///
/// Keys at the top level are module names; a nested filter under a module
/// key selects tests by name. Parses from JSON such as
/// `{"math": true, "strings": {"concat": true}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(BTreeMap<String, Selection>);

impl Filter {
    /// Creates an empty filter, which selects nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects everything under `name`.
    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), Selection::Flag(true));
        self
    }

    /// Excludes `name` explicitly.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), Selection::Flag(false));
        self
    }

    /// Selects only the children of `name` matched by `nested`.
    pub fn nested(mut self, name: impl Into<String>, nested: Filter) -> Self {
        self.0.insert(name.into(), Selection::Only(nested));
        self
    }

    /// Parses a filter from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether `name` is selected at this level.
    pub fn selects(&self, name: &str) -> bool {
        matches!(
            self.0.get(name),
            Some(Selection::Flag(true)) | Some(Selection::Only(_))
        )
    }

    /// Filter to apply to the children of `name`.
    ///
    /// Returns `None` when every child is selected.
    pub fn descend(&self, name: &str) -> Option<&Filter> {
        match self.0.get(name) {
            Some(Selection::Only(nested)) => Some(nested),
            _ => None,
        }
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the filter has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

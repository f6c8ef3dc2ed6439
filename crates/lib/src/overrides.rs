//! Assembly reference overrides.
//!
//! An override maps an assembly name, as written in a `<Reference Include="...">`
//! item, to the path that should end up in its `<HintPath>`. Overrides are
//! supplied on the command line as `name=path` pairs and collected into an
//! [`OverrideTable`] before any project file is touched.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Usage hint appended to override parse errors.
pub const REFERENCE_EXAMPLE: &str = "Example: --reference MyCompany.MyProject.MyModule=../MyDir/MyProject.dll";

/// Errors that can occur while building the override table.
#[derive(Debug, Error)]
pub enum OverrideError {
  /// The pair has no `=` separating the name from the path.
  #[error(
    "could not find the equals sign (=) in reference {input:?}; expected a pair of assembly name and its path separated by an equals sign"
  )]
  MissingSeparator { input: String },

  /// The pair starts with `=`.
  #[error("reference {input:?} has an empty assembly name; expected <assemblyName>=<assemblyPath>")]
  EmptyName { input: String },

  /// The same assembly name was given twice.
  #[error("reference {name}={path} already defined as {name}={existing}; references must not be duplicated")]
  DuplicateReference {
    name: String,
    path: String,
    existing: String,
  },
}

/// A single `name=path` override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
  /// Assembly name, matched exactly against the `Include` attribute.
  pub name: String,
  /// Path written verbatim into `<HintPath>`.
  pub path: String,
}

impl Override {
  pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      path: path.into(),
    }
  }
}

impl FromStr for Override {
  type Err = OverrideError;

  /// Split at the first `=`; the path itself may contain further `=` signs.
  fn from_str(input: &str) -> Result<Self, Self::Err> {
    let (name, path) = input.split_once('=').ok_or_else(|| OverrideError::MissingSeparator {
      input: input.to_string(),
    })?;

    if name.is_empty() {
      return Err(OverrideError::EmptyName {
        input: input.to_string(),
      });
    }

    Ok(Self::new(name, path))
  }
}

impl fmt::Display for Override {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}={}", self.name, self.path)
  }
}

/// Overrides keyed by assembly name.
///
/// Built once, then read-only. Insertion order is remembered so that reports
/// list overrides in the order the caller supplied them.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
  entries: Vec<Override>,
  index: HashMap<String, usize>,
}

impl OverrideTable {
  /// Create an empty table.
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a table from overrides in the order given.
  ///
  /// # Errors
  ///
  /// Returns [`OverrideError::DuplicateReference`] for the first name that
  /// appears twice.
  pub fn from_overrides<I>(overrides: I) -> Result<Self, OverrideError>
  where
    I: IntoIterator<Item = Override>,
  {
    let mut table = Self::new();
    for entry in overrides {
      table.insert(entry.name, entry.path)?;
    }
    Ok(table)
  }

  /// Add an override. Fails if `name` is already present.
  pub fn insert(&mut self, name: impl Into<String>, path: impl Into<String>) -> Result<(), OverrideError> {
    let name = name.into();
    let path = path.into();

    match self.index.entry(name) {
      Entry::Occupied(slot) => Err(OverrideError::DuplicateReference {
        name: slot.key().clone(),
        path,
        existing: self.entries[*slot.get()].path.clone(),
      }),
      Entry::Vacant(slot) => {
        let name = slot.key().clone();
        slot.insert(self.entries.len());
        self.entries.push(Override { name, path });
        Ok(())
      }
    }
  }

  /// Get the override path for an assembly name.
  pub fn lookup(&self, name: &str) -> Option<&str> {
    self.index.get(name).map(|&i| self.entries[i].path.as_str())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Start a fresh unused-name accumulator holding every name in the table.
  pub fn unused(&self) -> UnusedSet {
    UnusedSet {
      order: self.entries.iter().map(|e| e.name.clone()).collect(),
      remaining: self.index.keys().cloned().collect(),
    }
  }
}

/// Override names not yet matched by any reference.
///
/// Shrinks as project files are patched. Iteration follows the order of the
/// table it was created from.
#[derive(Debug, Clone, Default)]
pub struct UnusedSet {
  order: Vec<String>,
  remaining: HashSet<String>,
}

impl UnusedSet {
  /// Mark `name` as used. Returns `true` if it was still unused.
  pub fn remove(&mut self, name: &str) -> bool {
    self.remaining.remove(name)
  }

  pub fn len(&self) -> usize {
    self.remaining.len()
  }

  pub fn is_empty(&self) -> bool {
    self.remaining.is_empty()
  }

  /// Consume the set, returning the remaining names in table order.
  pub fn into_names(self) -> Vec<String> {
    let Self { order, remaining } = self;
    order.into_iter().filter(|name| remaining.contains(name)).collect()
  }
}

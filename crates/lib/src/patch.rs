//! Reference patching engine.
//!
//! For every `<Reference Include="Name">` item whose name has an override, the
//! engine makes sure the item has exactly one `<HintPath>` child holding the
//! override path: an existing hint is rewritten, a missing one is appended.
//! Items without an override are left byte-for-byte as they were.
//!
//! A run patches its targets one after another, threading a single
//! [`UnusedSet`] through all of them. The first target that cannot be loaded
//! aborts the run; targets written before it stay patched.

use std::path::{Path, PathBuf};

use quick_xml::escape::partial_escape;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::{DocumentError, Element, XmlDocument};
use crate::overrides::{OverrideError, OverrideTable, UnusedSet};
use crate::solution::{SolutionError, resolve_targets};

/// Local name of reference items.
pub const REFERENCE: &str = "Reference";
/// Attribute holding the assembly name of a reference.
pub const INCLUDE: &str = "Include";
/// Local name of the hint child.
pub const HINT_PATH: &str = "HintPath";

/// Any error that aborts a patch run.
#[derive(Debug, Error)]
pub enum PatchError {
  #[error(transparent)]
  Override(#[from] OverrideError),

  #[error(transparent)]
  Solution(#[from] SolutionError),

  #[error(transparent)]
  Document(#[from] DocumentError),
}

/// Where a reference keeps its hint path.
#[derive(Debug, Clone, Copy)]
pub enum HintSlot<'a> {
  /// The first `<HintPath>` child.
  Existing(&'a Element),
  /// No `<HintPath>` child yet.
  Missing,
}

impl<'a> HintSlot<'a> {
  pub fn of(reference: &'a Element) -> Self {
    match reference.child(HINT_PATH) {
      Some(hint) => HintSlot::Existing(hint),
      None => HintSlot::Missing,
    }
  }
}

/// What happened to a matched reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HintChange {
  /// A new `<HintPath>` was added.
  Inserted,
  /// An existing `<HintPath>` was rewritten.
  Updated,
  /// The existing `<HintPath>` already held the override path.
  Unchanged,
}

/// A reference that matched an override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchedReference {
  pub name: String,
  pub path: String,
  pub change: HintChange,
}

/// Outcome of patching one project file.
#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
  pub target: PathBuf,
  pub references: Vec<PatchedReference>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub targets: Vec<PatchReport>,
  /// Override names that matched no reference in any target, in the order
  /// they were supplied.
  pub unused: Vec<String>,
}

/// Reference items of a document paired with their `Include` value, at any
/// depth, in document order.
pub fn reference_declarations<'a>(document: &'a XmlDocument) -> impl Iterator<Item = (&'a Element, &'a str)> {
  document
    .elements()
    .filter(|e| e.local_name() == REFERENCE)
    .filter_map(|e| e.attribute(INCLUDE).map(|name| (e, name)))
}

/// Apply `overrides` to an in-memory document.
///
/// Every matched name is removed from `unused`. The document tree is rebuilt
/// afterwards, so it reflects the patched source.
pub fn patch_document(
  document: &mut XmlDocument,
  overrides: &OverrideTable,
  unused: &mut UnusedSet,
) -> Result<Vec<PatchedReference>, DocumentError> {
  let mut edits = Vec::new();
  let mut patched = Vec::new();

  for (reference, name) in reference_declarations(document) {
    let Some(path) = overrides.lookup(name) else {
      continue;
    };
    let text = partial_escape(path);

    let change = match HintSlot::of(reference) {
      HintSlot::Existing(hint) if document.text_of(hint) == Some(&*text) => HintChange::Unchanged,
      HintSlot::Existing(hint) => {
        edits.push(document.set_text(hint, &text));
        HintChange::Updated
      }
      HintSlot::Missing => {
        edits.push(document.append_child(reference, &hint_path_name(reference), &text));
        HintChange::Inserted
      }
    };

    debug!(reference = name, path, ?change, "patched reference");
    unused.remove(name);
    patched.push(PatchedReference {
      name: name.to_string(),
      path: path.to_string(),
      change,
    });
  }

  document.apply(edits)?;
  Ok(patched)
}

/// Patch the project file at `path` in place.
///
/// The file is written back even when nothing matched; its bytes are then
/// unchanged.
pub fn patch(path: &Path, overrides: &OverrideTable, unused: &mut UnusedSet) -> Result<PatchReport, DocumentError> {
  let mut document = XmlDocument::load(path)?;
  let references = patch_document(&mut document, overrides, unused)?;
  document.save()?;

  info!(path = %path.display(), matched = references.len(), "project file written");
  Ok(PatchReport {
    target: path.to_path_buf(),
    references,
  })
}

/// Patch every project file in `targets`, in order.
///
/// Stops at the first failing target.
pub fn patch_all(targets: &[PathBuf], overrides: &OverrideTable) -> Result<RunReport, PatchError> {
  let mut unused = overrides.unused();
  let mut reports = Vec::with_capacity(targets.len());

  for target in targets {
    reports.push(patch(target, overrides, &mut unused)?);
  }

  Ok(RunReport {
    targets: reports,
    unused: unused.into_names(),
  })
}

/// Resolve `input` (a project or a solution) and patch every project in it.
pub fn run(input: &Path, overrides: &OverrideTable) -> Result<RunReport, PatchError> {
  let targets = resolve_targets(input)?;
  info!(input = %input.display(), targets = targets.len(), overrides = overrides.len(), "patching");
  patch_all(&targets, overrides)
}

/// `HintPath`, carrying the reference's namespace prefix if it has one.
fn hint_path_name(reference: &Element) -> String {
  match reference.prefix() {
    Some(prefix) => format!("{prefix}:{HINT_PATH}"),
    None => HINT_PATH.to_string(),
  }
}

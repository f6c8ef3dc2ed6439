//! Implementation of the patch command.
//!
//! Builds the override table, patches the project (or every project of a
//! solution) and reports overrides that never matched a reference.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use tracing::debug;

use csproj_patcher_lib::overrides::{Override, OverrideTable};
use csproj_patcher_lib::patch::{RunReport, run};

use crate::output::{OutputFormat, change_symbol, print_info, print_json, print_success, print_warning, symbols};

/// Execute the patch command.
///
/// Duplicate override names are rejected before any file is read. Unused
/// overrides are reported as warnings and never fail the command.
///
/// # Errors
///
/// Returns an error if an override is duplicated, the solution cannot be read,
/// or a project file is missing or not valid XML.
pub fn cmd_patch(project_file: &Path, references: Vec<Override>, format: OutputFormat) -> Result<()> {
  let overrides = OverrideTable::from_overrides(references).context("Invalid --reference arguments")?;
  debug!(count = overrides.len(), "override table built");

  let report = run(project_file, &overrides).with_context(|| format!("Failed to patch {}", project_file.display()))?;

  if format.is_json() {
    return print_json(&report);
  }

  print_report(&report);
  Ok(())
}

fn print_report(report: &RunReport) {
  for target in &report.targets {
    if target.references.is_empty() {
      print_info(&format!("No matching references in {}", target.target.display()));
      continue;
    }

    print_success(&format!("Patched {}", target.target.display()));
    for reference in &target.references {
      println!(
        "  {} {} {} {}",
        change_symbol(reference.change),
        reference.name.if_supports_color(Stream::Stdout, |s| s.cyan()),
        symbols::ARROW,
        reference.path
      );
    }
  }

  for name in &report.unused {
    print_warning(&format!(
      "Reference \"{name}\" was not found in any of the project files. Make sure there are no typos."
    ));
  }
}

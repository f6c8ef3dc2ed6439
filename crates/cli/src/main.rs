mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use csproj_patcher_lib::overrides::{Override, REFERENCE_EXAMPLE};

use crate::output::OutputFormat;

const LONG_ABOUT: &str = "\
Command line tool for patching C# project files.

Searches the project for <Reference> items with an \"Include\" attribute and
replaces their <HintPath> with the given path if one already exists, or adds a
new <HintPath> if it doesn't.

The project file can be either a dotnet project file (.csproj) or a Visual
Studio solution file (.sln). When a solution file is given, every project
belonging to the solution is patched.";

const AFTER_HELP: &str = "\
Example:
  csproj-patcher --projectFile directory/app.csproj \\
    --reference UnityEngine.UI=../../Unity/Editor/Data/UnityExtensions/Unity/GUISystem/UnityEngine.UI.dll";

/// Point assembly references of C# projects at externally supplied paths
#[derive(Parser)]
#[command(name = "csproj-patcher")]
#[command(author, version, about, long_about = LONG_ABOUT, after_help = AFTER_HELP)]
struct Cli {
  /// Project (.csproj) or solution (.sln) file to patch
  #[arg(long = "projectFile", visible_alias = "project-file", value_name = "FILE")]
  project_file: PathBuf,

  /// Assembly name and the path its <HintPath> should hold (repeatable)
  #[arg(long = "reference", value_name = "NAME=PATH", value_parser = parse_reference)]
  references: Vec<Override>,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,
}

fn parse_reference(input: &str) -> Result<Override, String> {
  input.parse().map_err(|e| format!("{e}\n{REFERENCE_EXAMPLE}"))
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  // Initialize logging
  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  cmd::cmd_patch(&cli.project_file, cli.references, cli.format)
}

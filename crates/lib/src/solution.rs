//! Visual Studio solution files and target resolution.
//!
//! Only the parts of the `.sln` format needed to find member projects are
//! understood: the header line and the `Project(...) = ...` / `EndProject`
//! blocks. Everything else (sections, global configuration) is skipped.

use std::fs;
use std::io;
use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// First line of every solution file, up to the format version.
pub const SOLUTION_HEADER: &str = "Microsoft Visual Studio Solution File";

/// Project type GUID of solution folders, which are not files on disk.
pub const SOLUTION_FOLDER_TYPE: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

/// Errors that can occur when reading a solution file.
#[derive(Debug, Error)]
pub enum SolutionError {
  #[error("solution file {} could not be found", path.display())]
  NotFound { path: PathBuf },

  #[error("failed to read solution file {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("solution file {} could not be parsed (line {line}): {reason}", path.display())]
  Parse {
    path: PathBuf,
    line: usize,
    reason: String,
  },
}

/// A `Project(...)` entry of a solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionProject {
  /// Project type GUID without braces.
  pub type_guid: String,
  pub name: String,
  /// Path relative to the solution directory, as written in the file.
  pub file_path: String,
  pub guid: String,
}

impl SolutionProject {
  pub fn is_solution_folder(&self) -> bool {
    self.type_guid.eq_ignore_ascii_case(SOLUTION_FOLDER_TYPE)
  }
}

/// The project list of a `.sln` file.
#[derive(Debug, Clone, Default)]
pub struct SolutionFile {
  /// Every entry, solution folders included, in file order.
  pub projects: Vec<SolutionProject>,
}

impl SolutionFile {
  /// Read and parse the solution at `path`.
  pub fn read(path: &Path) -> Result<Self, SolutionError> {
    let source = match fs::read_to_string(path) {
      Ok(source) => source,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        return Err(SolutionError::NotFound {
          path: path.to_path_buf(),
        });
      }
      Err(e) => {
        return Err(SolutionError::Read {
          path: path.to_path_buf(),
          source: e,
        });
      }
    };

    Self::parse(&source).map_err(|(line, reason)| SolutionError::Parse {
      path: path.to_path_buf(),
      line,
      reason,
    })
  }

  /// Parse solution text. Errors carry the 1-based line number.
  pub fn parse(source: &str) -> Result<Self, (usize, String)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lines = source.lines().enumerate().map(|(i, line)| (i + 1, line.trim()));

    match lines.find(|(_, line)| !line.is_empty()) {
      Some((_, line)) if line.starts_with(SOLUTION_HEADER) => {}
      Some((number, _)) => return Err((number, format!("expected \"{SOLUTION_HEADER}\" header"))),
      None => return Err((1, "file is empty".to_string())),
    }

    let mut projects = Vec::new();
    let mut current: Option<(usize, SolutionProject)> = None;

    for (number, line) in lines {
      if line.starts_with("Project(") {
        if let Some((start, _)) = current {
          return Err((number, format!("project started on line {start} is missing EndProject")));
        }
        let project = parse_project_line(line).map_err(|reason| (number, reason))?;
        current = Some((number, project));
      } else if line == "EndProject" {
        let (_, project) = current
          .take()
          .ok_or_else(|| (number, "EndProject without a matching Project".to_string()))?;
        projects.push(project);
      }
    }

    if let Some((start, _)) = current {
      return Err((start, "project is missing EndProject".to_string()));
    }

    Ok(Self { projects })
  }

  /// Entries that refer to project files, skipping solution folders.
  pub fn project_files(&self) -> impl Iterator<Item = &SolutionProject> {
    self.projects.iter().filter(|p| !p.is_solution_folder())
  }
}

/// Parse `Project("{TYPE}") = "Name", "Path", "{GUID}"`.
fn parse_project_line(line: &str) -> Result<SolutionProject, String> {
  let rest = line.strip_prefix("Project(").ok_or("expected Project(")?;
  let (type_guid, rest) = quoted(rest)?;
  let rest = expect(rest, ')')?;
  let rest = expect(rest, '=')?;
  let (name, rest) = quoted(rest)?;
  let rest = expect(rest, ',')?;
  let (file_path, rest) = quoted(rest)?;
  let rest = expect(rest, ',')?;
  let (guid, rest) = quoted(rest)?;

  if !rest.trim().is_empty() {
    return Err(format!("unexpected trailing text {:?}", rest.trim()));
  }

  Ok(SolutionProject {
    type_guid: strip_braces(type_guid).to_string(),
    name: name.to_string(),
    file_path: file_path.to_string(),
    guid: strip_braces(guid).to_string(),
  })
}

fn quoted(s: &str) -> Result<(&str, &str), String> {
  let s = s.trim_start();
  let s = s
    .strip_prefix('"')
    .ok_or_else(|| format!("expected '\"' before {s:?}"))?;
  let end = s.find('"').ok_or("unterminated string")?;
  Ok((&s[..end], &s[end + 1..]))
}

fn expect(s: &str, c: char) -> Result<&str, String> {
  s.trim_start()
    .strip_prefix(c)
    .ok_or_else(|| format!("expected '{c}'"))
}

fn strip_braces(guid: &str) -> &str {
  guid.trim_start_matches('{').trim_end_matches('}')
}

/// Whether `path` names a solution file.
pub fn is_solution(path: &Path) -> bool {
  path.extension().is_some_and(|ext| ext == "sln")
}

/// Join a solution-relative project path onto `dir`.
///
/// Solution files use `\` regardless of platform, so it is rewritten to the
/// host separator first. An absolute member path replaces `dir`.
pub fn member_path(dir: &Path, relative: &str) -> PathBuf {
  dir.join(relative.replace('\\', MAIN_SEPARATOR_STR))
}

/// Expand the command line input into the project files to patch.
///
/// A solution yields its member projects in declaration order, resolved
/// against the solution's directory. Any other path is returned as-is.
pub fn resolve_targets(input: &Path) -> Result<Vec<PathBuf>, SolutionError> {
  if !is_solution(input) {
    return Ok(vec![input.to_path_buf()]);
  }

  let solution = SolutionFile::read(input)?;
  let dir = input.parent().unwrap_or(Path::new(""));
  let targets: Vec<PathBuf> = solution
    .project_files()
    .map(|p| member_path(dir, &p.file_path))
    .collect();

  debug!(
    solution = %input.display(),
    projects = targets.len(),
    skipped = solution.projects.len() - targets.len(),
    "resolved solution members"
  );
  Ok(targets)
}

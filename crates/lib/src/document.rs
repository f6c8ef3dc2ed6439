//! Span-preserving XML documents.
//!
//! Project files are hand-edited and checked into version control, so a patch
//! must not reformat them. [`XmlDocument`] parses the source with `quick-xml`
//! into a lightweight element tree where every element remembers the byte
//! ranges it occupies. Edits are expressed as replacements of those ranges and
//! spliced into the original text, leaving every other byte untouched.
//!
//! A UTF-8 byte order mark is stripped before parsing and restored on save.

use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::debug;

const BOM: char = '\u{feff}';

/// Errors that can occur while loading or saving a document.
#[derive(Debug, Error)]
pub enum DocumentError {
  #[error("project file {} could not be found", path.display())]
  NotFound { path: PathBuf },

  #[error("failed to read project file {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("project file {} could not be parsed as valid XML: {reason}", path.display())]
  Parse { path: PathBuf, reason: String },

  #[error("failed to write project file {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },
}

/// An element in the document tree.
#[derive(Debug, Clone)]
pub struct Element {
  name: String,
  attributes: Vec<(String, String)>,
  /// Whole element, start tag through end tag.
  span: Range<usize>,
  start_tag: Range<usize>,
  /// Between the start and end tags; `None` for `<Empty/>` elements.
  content: Option<Range<usize>>,
  children: Vec<Element>,
}

impl Element {
  /// Qualified name as written, e.g. `Reference` or `msb:Reference`.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Name without its namespace prefix.
  pub fn local_name(&self) -> &str {
    self.name.rsplit_once(':').map_or(self.name.as_str(), |(_, local)| local)
  }

  /// Namespace prefix, if the name has one.
  pub fn prefix(&self) -> Option<&str> {
    self.name.split_once(':').map(|(prefix, _)| prefix)
  }

  /// Unescaped value of an attribute.
  pub fn attribute(&self, key: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  /// First direct child with the given local name.
  pub fn child(&self, local_name: &str) -> Option<&Element> {
    self.children.iter().find(|c| c.local_name() == local_name)
  }

  /// Whether the element was written as `<Name/>`.
  pub fn is_empty_tag(&self) -> bool {
    self.content.is_none()
  }

  /// This element and everything below it, depth-first in document order.
  pub fn descendants(&self) -> Descendants<'_> {
    Descendants { stack: vec![self] }
  }

  fn open(tag: &BytesStart<'_>, start_tag: Range<usize>) -> Result<Self, Malformed> {
    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in tag.attributes() {
      let attr = attr.map_err(|e| Malformed::new(start_tag.start, e.to_string()))?;
      let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
      let value = attr
        .unescape_value()
        .map_err(|e| Malformed::new(start_tag.start, e.to_string()))?
        .into_owned();
      attributes.push((key, value));
    }

    Ok(Self {
      name,
      attributes,
      span: start_tag.clone(),
      start_tag,
      content: None,
      children: Vec::new(),
    })
  }
}

/// Lazy depth-first walk over an element subtree.
///
/// Holds only a stack of borrowed elements; calling
/// [`XmlDocument::elements`] again starts a new walk.
pub struct Descendants<'a> {
  stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
  type Item = &'a Element;

  fn next(&mut self) -> Option<Self::Item> {
    let element = self.stack.pop()?;
    self.stack.extend(element.children.iter().rev());
    Some(element)
  }
}

/// A pending replacement of a byte range in the document source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
  range: Range<usize>,
  replacement: String,
}

impl Edit {
  pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
    Self {
      range,
      replacement: replacement.into(),
    }
  }

  pub fn insert(at: usize, text: impl Into<String>) -> Self {
    Self::replace(at..at, text)
  }
}

/// An XML file held in memory together with its element tree.
#[derive(Debug)]
pub struct XmlDocument {
  path: PathBuf,
  bom: bool,
  source: String,
  root: Element,
}

impl XmlDocument {
  /// Load and parse the document at `path`.
  ///
  /// # Errors
  ///
  /// - [`DocumentError::NotFound`] if the file does not exist
  /// - [`DocumentError::Read`] for any other I/O failure
  /// - [`DocumentError::Parse`] if the content is not UTF-8 or not well-formed XML
  pub fn load(path: &Path) -> Result<Self, DocumentError> {
    let bytes = match fs::read(path) {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        return Err(DocumentError::NotFound {
          path: path.to_path_buf(),
        });
      }
      Err(e) => {
        return Err(DocumentError::Read {
          path: path.to_path_buf(),
          source: e,
        });
      }
    };

    let source = String::from_utf8(bytes).map_err(|e| DocumentError::Parse {
      path: path.to_path_buf(),
      reason: format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
    })?;

    debug!(path = %path.display(), bytes = source.len(), "loaded project file");
    Self::parse(path, source)
  }

  /// Parse `source` as the content of the file at `path`.
  pub fn parse(path: impl Into<PathBuf>, source: String) -> Result<Self, DocumentError> {
    let path = path.into();
    let (bom, source) = if source.starts_with(BOM) {
      (true, source[BOM.len_utf8()..].to_string())
    } else {
      (false, source)
    };

    let root = parse_tree(&source).map_err(|m| m.into_error(&path, &source))?;

    Ok(Self {
      path,
      bom,
      source,
      root,
    })
  }

  pub fn root(&self) -> &Element {
    &self.root
  }

  /// Every element in the document, depth-first in document order.
  pub fn elements(&self) -> Descendants<'_> {
    self.root.descendants()
  }

  /// Raw text between an element's tags, still escaped.
  pub fn text_of(&self, element: &Element) -> Option<&str> {
    element.content.as_ref().map(|r| &self.source[r.clone()])
  }

  /// Raw source of the whole element.
  pub fn source_of(&self, element: &Element) -> &str {
    &self.source[element.span.clone()]
  }

  /// Full file content, byte order mark included.
  pub fn contents(&self) -> String {
    if self.bom {
      format!("{BOM}{}", self.source)
    } else {
      self.source.clone()
    }
  }

  /// Edit that replaces everything inside `element` with `text`.
  ///
  /// `text` must already be escaped. An `<Empty/>` element is expanded into a
  /// start and end tag pair.
  pub fn set_text(&self, element: &Element, text: &str) -> Edit {
    match &element.content {
      Some(content) => Edit::replace(content.clone(), text),
      None => Edit::replace(
        element.span.clone(),
        format!("{}>{text}</{}>", self.open_tag(element), element.name),
      ),
    }
  }

  /// Edit that appends `<name>text</name>` as the last child of `parent`.
  ///
  /// When the parent's closing tag sits on its own line the new child gets a
  /// line of its own, indented like its siblings.
  pub fn append_child(&self, parent: &Element, name: &str, text: &str) -> Edit {
    let child = format!("<{name}>{text}</{name}>");

    let Some(content) = &parent.content else {
      return Edit::replace(
        parent.span.clone(),
        format!("{}>{child}</{}>", self.open_tag(parent), parent.name),
      );
    };

    let inner = &self.source[content.clone()];
    match inner.rfind('\n') {
      Some(newline) if inner[newline + 1..].trim().is_empty() => {
        let eol = if inner[..newline].ends_with('\r') { "\r\n" } else { "\n" };
        let indent = sibling_indent(inner).unwrap_or_else(|| format!("{}  ", &inner[newline + 1..]));
        Edit::insert(content.start + newline + 1, format!("{indent}{child}{eol}"))
      }
      _ => Edit::insert(content.end, child),
    }
  }

  /// Splice `edits` into the source and rebuild the tree.
  ///
  /// Edits are applied in source order. An edit that starts inside the range
  /// of an earlier one is dropped, since the earlier edit already replaced
  /// that text. Returns the number of edits applied.
  pub fn apply(&mut self, mut edits: Vec<Edit>) -> Result<usize, DocumentError> {
    if edits.is_empty() {
      return Ok(0);
    }

    edits.sort_by(|a, b| a.range.start.cmp(&b.range.start).then(b.range.end.cmp(&a.range.end)));
    let mut kept: Vec<Edit> = Vec::with_capacity(edits.len());
    for edit in edits {
      if kept.last().is_some_and(|prev| edit.range.start < prev.range.end) {
        continue;
      }
      kept.push(edit);
    }

    for edit in kept.iter().rev() {
      self.source.replace_range(edit.range.clone(), &edit.replacement);
    }

    self.root = parse_tree(&self.source).map_err(|m| m.into_error(&self.path, &self.source))?;
    Ok(kept.len())
  }

  /// Write the document back to the path it was loaded from.
  pub fn save(&self) -> Result<(), DocumentError> {
    fs::write(&self.path, self.contents()).map_err(|e| DocumentError::Write {
      path: self.path.clone(),
      source: e,
    })
  }

  /// Start tag of an `<Empty/>` element without its closing `/>`.
  ///
  /// Whitespace before the `/>` is kept, so `<A x="1" />` opens as `<A x="1" >`.
  fn open_tag(&self, element: &Element) -> &str {
    let tag = &self.source[element.start_tag.clone()];
    tag.strip_suffix("/>").unwrap_or(tag)
  }
}

/// Leading whitespace of the first non-blank line after the start tag.
fn sibling_indent(inner: &str) -> Option<String> {
  inner
    .split('\n')
    .skip(1)
    .find(|line| !line.trim().is_empty())
    .map(|line| line[..line.len() - line.trim_start().len()].to_string())
}

/// Well-formedness failure at a byte offset.
#[derive(Debug)]
struct Malformed {
  offset: usize,
  reason: String,
}

impl Malformed {
  fn new(offset: usize, reason: impl Into<String>) -> Self {
    Self {
      offset,
      reason: reason.into(),
    }
  }

  fn into_error(self, path: &Path, source: &str) -> DocumentError {
    let end = self.offset.min(source.len());
    let line = source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1;
    DocumentError::Parse {
      path: path.to_path_buf(),
      reason: format!("{} (line {line})", self.reason),
    }
  }
}

fn parse_tree(source: &str) -> Result<Element, Malformed> {
  let mut reader = Reader::from_str(source);
  let mut open: Vec<Element> = Vec::new();
  let mut root: Option<Element> = None;

  loop {
    let event = reader
      .read_event()
      .map_err(|e| Malformed::new(reader.error_position() as usize, e.to_string()))?;
    // Markup events leave the reader just past their closing `>`.
    let end = reader.buffer_position() as usize;

    match event {
      Event::Start(tag) => {
        let start = end.saturating_sub(tag.len() + 2);
        if open.is_empty() && root.is_some() {
          return Err(Malformed::new(start, "multiple root elements"));
        }
        open.push(Element::open(&tag, start..end)?);
      }
      Event::Empty(tag) => {
        let start = end.saturating_sub(tag.len() + 3);
        let element = Element::open(&tag, start..end)?;
        attach(&mut open, &mut root, element)?;
      }
      Event::End(_) => {
        let start = source[..end].rfind("</").unwrap_or(end);
        let mut element = open
          .pop()
          .ok_or_else(|| Malformed::new(start, "end tag without a matching start tag"))?;
        element.content = Some(element.start_tag.end..start);
        element.span = element.start_tag.start..end;
        attach(&mut open, &mut root, element)?;
      }
      Event::Text(text) if open.is_empty() => {
        if !text.iter().all(u8::is_ascii_whitespace) {
          return Err(Malformed::new(end, "text outside the root element"));
        }
      }
      Event::CData(_) if open.is_empty() => {
        return Err(Malformed::new(end, "CDATA outside the root element"));
      }
      Event::Eof => break,
      _ => {}
    }
  }

  if let Some(element) = open.last() {
    return Err(Malformed::new(
      element.start_tag.start,
      format!("element <{}> is never closed", element.name),
    ));
  }

  root.ok_or_else(|| Malformed::new(source.len(), "no root element"))
}

fn attach(open: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), Malformed> {
  if let Some(parent) = open.last_mut() {
    parent.children.push(element);
    return Ok(());
  }
  if root.is_some() {
    return Err(Malformed::new(element.span.start, "multiple root elements"));
  }
  *root = Some(element);
  Ok(())
}

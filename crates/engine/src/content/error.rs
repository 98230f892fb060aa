use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    MissingField,
    InvalidValue,
    DuplicateName,
}

#[derive(Debug, Clone)]
pub struct ContentLoadError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentLoadError {}

pub(crate) fn read_error(path: &Path, source: std::io::Error) -> ContentLoadError {
    ContentLoadError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    }
}

pub(crate) fn parse_document<'input>(
    file_path: &Path,
    raw: &'input str,
) -> Result<Document<'input>, ContentLoadError> {
    Document::parse(raw).map_err(|error| ContentLoadError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

/// Shared attribute readers that report the element position on failure.
pub(crate) struct NodeReader<'a, 'input> {
    pub file_path: &'a Path,
    pub doc: &'a Document<'input>,
}

impl<'a, 'input> NodeReader<'a, 'input> {
    pub fn error(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentLoadError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentLoadError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    pub fn required<'n>(
        &self,
        node: Node<'n, '_>,
        attribute: &str,
    ) -> Result<&'n str, ContentLoadError> {
        match node.attribute(attribute).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.error(
                ContentErrorCode::MissingField,
                format!(
                    "missing attribute '{attribute}' on <{}>",
                    node.tag_name().name()
                ),
                node,
            )),
        }
    }

    pub fn parse_required<T: std::str::FromStr>(
        &self,
        node: Node<'_, '_>,
        attribute: &str,
    ) -> Result<T, ContentLoadError> {
        let raw = self.required(node, attribute)?;
        self.parse_value(node, attribute, raw)
    }

    pub fn parse_optional<T: std::str::FromStr>(
        &self,
        node: Node<'_, '_>,
        attribute: &str,
    ) -> Result<Option<T>, ContentLoadError> {
        match node.attribute(attribute).map(str::trim) {
            Some(raw) if !raw.is_empty() => self.parse_value(node, attribute, raw).map(Some),
            _ => Ok(None),
        }
    }

    fn parse_value<T: std::str::FromStr>(
        &self,
        node: Node<'_, '_>,
        attribute: &str,
        raw: &str,
    ) -> Result<T, ContentLoadError> {
        raw.parse::<T>().map_err(|_| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("attribute '{attribute}' has invalid value '{raw}'"),
                node,
            )
        })
    }
}

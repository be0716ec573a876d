use std::fs;
use std::path::Path;

use log::debug;

use crate::domain::{ArticleRecord, Series};
use crate::error::IndexError;
use crate::fs::document_id;
use crate::value::FrontValue;

pub const DELIMITER: &str = "---";

/// A non-empty frontmatter mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    entries: Vec<(String, FrontValue)>,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&FrontValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Like [`Frontmatter::get`], but an explicit `null` counts as absent.
    fn field(&self, key: &str) -> Option<FrontValue> {
        self.get(key).filter(|v| !v.is_null()).cloned()
    }
}

/// Returns the raw text between the opening and closing delimiter lines.
///
/// The first line must be the delimiter (surrounding whitespace ignored).
/// An unterminated block runs to the end of the document.
pub fn extract_frontmatter(text: &str) -> Option<String> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim() != DELIMITER {
        return None;
    }
    Some(lines.take_while(|line| line.trim() != DELIMITER).collect())
}

/// Parses a raw frontmatter block.
///
/// Blocks that are blank or hold an empty value yield `None`, the same as a
/// document without frontmatter.
pub fn parse_frontmatter(path: &Path, block: &str) -> Result<Option<Frontmatter>, IndexError> {
    if block.trim().is_empty() {
        return Ok(None);
    }

    let value: FrontValue =
        serde_yaml::from_str(block).map_err(|source| IndexError::Frontmatter {
            path: path.to_path_buf(),
            source,
        })?;

    match value {
        value if !value.is_truthy() => Ok(None),
        FrontValue::Mapping(entries) => Ok(Some(Frontmatter { entries })),
        _ => Err(IndexError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Builds the index record for one document.
pub fn article_from_frontmatter(fm: &Frontmatter, document: &Path, id: String) -> ArticleRecord {
    let title = fm
        .get("title")
        .filter(|v| v.is_truthy())
        .map(|v| v.to_string())
        .unwrap_or_else(|| {
            document
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

    let series = match fm.get("series") {
        Some(series @ FrontValue::Mapping(_)) => Some(Series {
            name: series.get("name").filter(|v| !v.is_null()).cloned(),
            episode: series.get("episode").filter(|v| !v.is_null()).cloned(),
        }),
        _ => None,
    };

    ArticleRecord {
        title,
        date: fm.field("date").map(|v| v.resolve_date().to_string()),
        category: fm.field("category"),
        tag: fm.field("tag"),
        series,
        order: fm.field("order"),
        summary: fm.field("summary"),
        path: id,
    }
}

/// Reads one document and turns it into a record, or `None` when it has no
/// frontmatter.
pub fn index_document(
    root: &Path,
    document: &Path,
    extension: &str,
) -> Result<Option<ArticleRecord>, IndexError> {
    debug!("Reading {}", document.display());

    let text = fs::read_to_string(document).map_err(|source| IndexError::Read {
        path: document.to_path_buf(),
        source,
    })?;

    let Some(block) = extract_frontmatter(&text) else {
        debug!("No frontmatter, skipping {}", document.display());
        return Ok(None);
    };
    let Some(fm) = parse_frontmatter(document, &block)? else {
        debug!("Empty frontmatter, skipping {}", document.display());
        return Ok(None);
    };

    let id = document_id(root, document, extension);
    Ok(Some(article_from_frontmatter(&fm, document, id)))
}

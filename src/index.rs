use std::fs;
use std::path::Path;

use log::info;

use crate::domain::ArticleRecord;
use crate::error::IndexError;

/// Renders the index as pretty-printed JSON. Non-ASCII text is kept
/// verbatim and there is no trailing newline.
pub fn render_index(index: &[ArticleRecord]) -> Result<String, IndexError> {
    Ok(serde_json::to_string_pretty(index)?)
}

/// Overwrites `output` with the rendered index.
///
/// The parent directory must already exist; it is not created here.
pub fn write_index(index: &[ArticleRecord], output: &Path) -> Result<(), IndexError> {
    let json = render_index(index)?;
    fs::write(output, json).map_err(|source| IndexError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    info!("Wrote {} articles to {}", index.len(), output.display());
    Ok(())
}

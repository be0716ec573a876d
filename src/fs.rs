use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Walks `root` for files ending in `.{extension}`.
///
/// Entries are sorted by file name within each directory so repeated runs
/// see the same order. Hidden files and directories are not visited.
pub fn documents(
    root: &Path,
    extension: &str,
) -> impl Iterator<Item = Result<PathBuf, walkdir::Error>> + use<> {
    let extension = extension.to_owned();
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() && has_extension(entry.path(), &extension) => {
                Some(Ok(entry.into_path()))
            }
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension() == Some(OsStr::new(extension))
}

/// The index identifier of a document: its location relative to the parent
/// of `root`, `/`-separated, without the trailing extension, with a leading
/// slash. `docs/articles/howto/intro.md` under `docs/articles` becomes
/// `/articles/howto/intro`.
pub fn document_id(root: &Path, document: &Path, extension: &str) -> String {
    let base = root.parent().unwrap_or(root);
    let relative = document.strip_prefix(base).unwrap_or(document);

    let mut id = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            id.push('/');
            id.push_str(&part.to_string_lossy());
        }
    }

    let suffix = format!(".{extension}");
    if let Some(len) = id.strip_suffix(&suffix).map(str::len) {
        id.truncate(len);
    }
    if id.is_empty() {
        id.push('/');
    }
    id
}

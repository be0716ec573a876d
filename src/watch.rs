use std::sync::mpsc::channel;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use notify::event::{ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::IndexError;
use crate::fs::has_extension;
use crate::{build_and_write, Args};

/// Quiet period after a change before rebuilding; editors tend to save in
/// bursts.
const DEBOUNCE: Duration = Duration::from_millis(300);

/// Whether `event` should trigger a rebuild of the index.
///
/// Removing or renaming a directory takes its articles with it, so those
/// events count even though the path carries no document extension.
pub fn is_relevant_event(event: &Event, extension: &str) -> bool {
    let moves_tree = match event.kind {
        EventKind::Remove(RemoveKind::Folder) => return true,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => true,
        EventKind::Create(_) | EventKind::Modify(_) => false,
        _ => return false,
    };
    event
        .paths
        .iter()
        .any(|p| has_extension(p, extension) || (moves_tree && p.extension().is_none()))
}

/// Rebuilds the whole index on every relevant change under the articles
/// directory. Only returns if the watcher cannot be set up.
pub fn watch(args: &Args) -> Result<(), IndexError> {
    let (tx, rx) = channel();
    let extension = args.extension.clone();
    let mut watcher: RecommendedWatcher = Watcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) if is_relevant_event(&event, &extension) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(err) => warn!("Watch error: {err}"),
        },
        notify::Config::default(),
    )?;
    watcher.watch(&args.articles_dir, RecursiveMode::Recursive)?;

    info!("Watching {} for changes", args.articles_dir.display());

    while rx.recv().is_ok() {
        thread::sleep(DEBOUNCE);
        while rx.try_recv().is_ok() {}

        match build_and_write(args) {
            Ok(report) => info!("Rebuilt index with {} articles", report.index.len()),
            Err(err) => error!("Rebuild failed: {}", err.chain()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RenameMode};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn document_changes_are_relevant() {
        for kind in [
            EventKind::Create(CreateKind::File),
            EventKind::Modify(ModifyKind::Any),
            EventKind::Remove(RemoveKind::File),
        ] {
            assert!(is_relevant_event(&event(kind, "docs/articles/a.md"), "md"));
        }
    }

    #[test]
    fn other_files_are_ignored() {
        let ev = event(EventKind::Modify(ModifyKind::Any), "docs/articles/a.png");
        assert!(!is_relevant_event(&ev, "md"));
    }

    #[test]
    fn reads_are_ignored() {
        let ev = event(EventKind::Access(AccessKind::Any), "docs/articles/a.md");
        assert!(!is_relevant_event(&ev, "md"));
    }

    #[test]
    fn removing_a_directory_is_relevant() {
        let ev = event(EventKind::Remove(RemoveKind::Folder), "docs/articles/series");
        assert!(is_relevant_event(&ev, "md"));
        let dotted = event(EventKind::Remove(RemoveKind::Folder), "docs/articles/v1.2");
        assert!(is_relevant_event(&dotted, "md"));
        let unknown = event(EventKind::Remove(RemoveKind::Any), "docs/articles/series");
        assert!(is_relevant_event(&unknown, "md"));
    }

    #[test]
    fn renaming_a_directory_is_relevant() {
        for mode in [RenameMode::From, RenameMode::To, RenameMode::Both] {
            let ev = event(
                EventKind::Modify(ModifyKind::Name(mode)),
                "docs/articles/series",
            );
            assert!(is_relevant_event(&ev, "md"), "{mode:?}");
        }
    }

    #[test]
    fn writes_to_extensionless_files_are_ignored() {
        let ev = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "docs/articles/README",
        );
        assert!(!is_relevant_event(&ev, "md"));
        let created = event(EventKind::Create(CreateKind::Folder), "docs/articles/new");
        assert!(!is_relevant_event(&created, "md"));
    }
}

//! File watching for the preview server.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A site document changed or was created
    DocumentChanged(PathBuf),

    /// A file was deleted
    Deleted(PathBuf),

    /// Any other file changed
    Modified(PathBuf),
}

/// Watches files and directories for changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `paths` and return a channel of debounced events.
    ///
    /// Watching a file watches its parent directory, since editors often
    /// replace files instead of writing them in place.
    pub fn new(paths: &[PathBuf]) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            let target = if path.is_file() {
                path.parent().unwrap_or(path)
            } else {
                path.as_path()
            };
            if target.exists() {
                watcher
                    .watch(target, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            }
        }

        std::thread::spawn(move || {
            let debounce = Duration::from_millis(100);
            let mut last_event: Option<Instant> = None;

            while let Ok(event) = sync_rx.recv() {
                let now = Instant::now();
                if last_event.is_some_and(|last| now.duration_since(last) < debounce) {
                    continue;
                }
                last_event = Some(now);

                for path in event.paths {
                    if let Some(e) = classify_event(&path, &event.kind) {
                        if async_tx.blocking_send(e).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn classify_event(path: &Path, kind: &notify::EventKind) -> Option<WatchEvent> {
    use notify::EventKind;

    let is_document = path.extension().and_then(|e| e.to_str()) == Some("json");

    match kind {
        EventKind::Remove(_) => Some(WatchEvent::Deleted(path.to_path_buf())),
        EventKind::Create(_) | EventKind::Modify(_) if is_document => {
            Some(WatchEvent::DocumentChanged(path.to_path_buf()))
        }
        EventKind::Create(_) | EventKind::Modify(_) => Some(WatchEvent::Modified(path.to_path_buf())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn classifies_documents() {
        use notify::event::{CreateKind, ModifyKind, RemoveKind};
        use notify::EventKind;

        let doc = Path::new("site.json");
        assert_eq!(
            classify_event(doc, &EventKind::Modify(ModifyKind::Any)),
            Some(WatchEvent::DocumentChanged(doc.to_path_buf()))
        );
        assert_eq!(
            classify_event(Path::new("notes.txt"), &EventKind::Create(CreateKind::File)),
            Some(WatchEvent::Modified(PathBuf::from("notes.txt")))
        );
        assert_eq!(
            classify_event(doc, &EventKind::Remove(RemoveKind::File)),
            Some(WatchEvent::Deleted(doc.to_path_buf()))
        );
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let doc = temp.path().join("site.json");

        let (watcher, mut rx) = FileWatcher::new(&[temp.path().to_path_buf()]).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&doc, r#"{"title": "Hi"}"#).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;
        drop(watcher);

        assert!(event.is_ok(), "timeout waiting for file watch event");
        assert!(event.unwrap().is_some(), "channel should not be closed");
    }
}

//! Out-of-band side effects of a successful save.
//!
//! Saves broadcast a `DocumentUpdated` event and hand the file to the
//! indexer on a spawned task. Both are fire-and-forget: the save response
//! has already been decided when either runs, and neither is awaited.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;

#[derive(Clone, Debug)]
pub struct DocumentUpdated {
    pub login: String,
    pub path: String,
}

/// Receives saved files for asynchronous re-indexing.
pub trait Indexer: Send + Sync + 'static {
    fn index(&self, path: &Path);
}

/// Default indexer: records the request and nothing else.
pub struct LogIndexer;

impl Indexer for LogIndexer {
    fn index(&self, path: &Path) {
        tracing::info!(path = %path.display(), "re-index scheduled");
    }
}

pub struct SaveHooks {
    sender: broadcast::Sender<DocumentUpdated>,
    indexer: Arc<dyn Indexer>,
}

impl SaveHooks {
    pub fn new(indexer: Arc<dyn Indexer>) -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender, indexer }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentUpdated> {
        self.sender.subscribe()
    }

    pub fn document_updated(&self, login: &str, relative: &str, absolute: PathBuf) {
        let _ = self.sender.send(DocumentUpdated {
            login: login.to_string(),
            path: relative.to_string(),
        });
        let indexer = self.indexer.clone();
        tokio::spawn(async move {
            indexer.index(&absolute);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingIndexer {
        paths: Mutex<Vec<PathBuf>>,
        notify: tokio::sync::mpsc::UnboundedSender<()>,
    }

    impl Indexer for RecordingIndexer {
        fn index(&self, path: &Path) {
            self.paths.lock().unwrap().push(path.to_path_buf());
            let _ = self.notify.send(());
        }
    }

    #[tokio::test]
    async fn test_save_hooks_broadcast_and_index() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let indexer = Arc::new(RecordingIndexer {
            paths: Mutex::new(Vec::new()),
            notify: tx,
        });
        let hooks = SaveHooks::new(indexer.clone());
        let mut events = hooks.subscribe();

        hooks.document_updated("bob", "file1.xml", PathBuf::from("/srv/accounts/bob/file1.xml"));

        let event = events.recv().await.unwrap();
        assert_eq!(event.login, "bob");
        assert_eq!(event.path, "file1.xml");

        rx.recv().await.unwrap();
        assert_eq!(
            indexer.paths.lock().unwrap().clone(),
            vec![PathBuf::from("/srv/accounts/bob/file1.xml")]
        );
    }

    #[tokio::test]
    async fn test_no_subscriber_is_fine() {
        let hooks = SaveHooks::new(Arc::new(LogIndexer));
        hooks.document_updated("bob", "file1.xml", PathBuf::from("/f"));
    }
}

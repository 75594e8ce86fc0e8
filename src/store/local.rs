use super::journal;
use super::{Record, Store, StoreError};
use crate::key::generate_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Authoritative in-process store: a concurrent key→url map backed by an
/// append-only journal.
///
/// The map is guarded by a reader/writer lock; lookups share the lock,
/// insertions take it exclusively for the map mutation only. Durable writes
/// go through a bounded queue drained by one owned writer task, so disk order
/// matches mutation order without holding the lock across I/O.
///
/// Durability is weak by choice: `put` returns once the record is enqueued,
/// and a crash between enqueue and append loses that record.
pub struct LocalStore {
    urls: RwLock<HashMap<String, String>>,
    save: RwLock<Option<mpsc::Sender<Record>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Open the journal at `path`, replay it into memory, then start the
    /// writer task. Serving begins only after replay completes.
    ///
    /// A journal with a corrupt tail loads the valid prefix and starts
    /// degraded; a journal that cannot be opened for appending is fatal.
    pub async fn open(path: impl AsRef<Path>, queue_depth: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let replay = journal::replay(&path).await?;
        let mut urls = HashMap::with_capacity(replay.records.len());
        for record in &replay.records {
            match urls.get(&record.key) {
                Some(existing) if existing == &record.url => {}
                Some(_) => {
                    // The journal only ever receives accepted bindings, so a
                    // conflicting rebind means the file is damaged. Keep the
                    // prefix up to this point, like a decode failure.
                    tracing::warn!(key = %record.key, "conflicting rebind in journal, ignoring remainder");
                    break;
                }
                None => {
                    urls.insert(record.key.clone(), record.url.clone());
                }
            }
        }
        if let Some(line) = replay.halted_at {
            tracing::warn!(
                loaded = urls.len(),
                halted_at = line,
                journal = %path.display(),
                "journal partially replayed, serving loaded prefix"
            );
        } else {
            tracing::info!(loaded = urls.len(), journal = %path.display(), "journal replayed");
        }

        let file = journal::open_append(&path).await?;
        let (tx, rx) = mpsc::channel(queue_depth);
        let writer = tokio::spawn(journal::save_loop(file, rx));

        Ok(Self {
            urls: RwLock::new(urls),
            save: RwLock::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
            path: Some(path),
        })
    }

    /// An in-memory store with no journal. Used by the proxy as its cache,
    /// which is never authoritative and never persisted.
    pub fn ephemeral() -> Self {
        Self {
            urls: RwLock::new(HashMap::new()),
            save: RwLock::new(None),
            writer: Mutex::new(None),
            path: None,
        }
    }

    /// Bind `key` to `url` if the key is free.
    ///
    /// Returns `Ok(true)` for a new binding, `Ok(false)` when the identical
    /// pair is already present (repeat of an accepted write, not a conflict),
    /// and `AlreadyExists` when the key is held by a different url.
    pub async fn set(&self, key: &str, url: &str) -> Result<bool, StoreError> {
        let mut urls = self.urls.write().await;
        match urls.get(key) {
            Some(existing) if existing == url => Ok(false),
            Some(_) => Err(StoreError::AlreadyExists(key.to_string())),
            None => {
                urls.insert(key.to_string(), url.to_string());
                Ok(true)
            }
        }
    }

    /// Number of distinct keys currently held.
    pub async fn count(&self) -> usize {
        self.urls.read().await.len()
    }

    /// Drain pending durable writes and stop the writer task. The store stays
    /// readable; further puts fail with `QueueClosed`.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.save.write().await.take();
        if let Some(writer) = self.writer.lock().await.take() {
            writer
                .await
                .map_err(|e| StoreError::Internal(format!("journal writer task: {e}")))?;
        }
        Ok(())
    }

    /// Sender for the durability queue, or an error when this store journals
    /// but its writer has been closed. Ephemeral stores yield `None`.
    async fn saver(&self) -> Result<Option<mpsc::Sender<Record>>, StoreError> {
        match self.save.read().await.clone() {
            Some(tx) => Ok(Some(tx)),
            None if self.path.is_some() => Err(StoreError::QueueClosed),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn put(&self, url: &str) -> Result<String, StoreError> {
        let key = generate_key(url);
        let tx = self.saver().await?;
        // Same url re-derives the same key, and set short-circuits on the
        // identical pair, so repeated puts are idempotent and journal the
        // binding exactly once. AlreadyExists only escapes for a genuine
        // collision between distinct urls.
        if self.set(&key, url).await? {
            if let Some(tx) = tx {
                // A full queue makes this send wait, which is the backpressure
                // policy: callers block rather than records dropping silently.
                tx.send(Record {
                    key: key.clone(),
                    url: url.to_string(),
                })
                .await
                .map_err(|_| StoreError::QueueClosed)?;
            }
        }
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let urls = self.urls.read().await;
        urls.get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

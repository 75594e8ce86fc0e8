// Copyright PingCAP Inc. 2025.

//! Append-only journal backing the local store.
//!
//! One record per line, JSON-encoded. The file is replayed front-to-back at
//! startup and appended to by a single writer task afterwards, so on-disk
//! order always matches logical mutation order.

use super::{Record, StoreError};
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Result of replaying a journal file: the records that decoded cleanly, in
/// write order, plus whether the scan stopped short of the end of the file.
#[derive(Debug)]
pub struct Replay {
    pub records: Vec<Record>,
    /// Set when a line failed to decode. Everything before it is still valid;
    /// the store starts degraded rather than not at all.
    pub halted_at: Option<usize>,
}

/// Read every record from `path` in write order.
///
/// A missing file is an empty journal, not an error. A line that fails to
/// decode halts the scan; the prefix read so far is returned.
pub async fn replay(path: &Path) -> Result<Replay, StoreError> {
    let file = match File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Replay {
                records: Vec::new(),
                halted_at: None,
            })
        }
        Err(e) => {
            return Err(StoreError::Internal(format!(
                "open journal {}: {e}",
                path.display()
            )))
        }
    };

    let mut records = Vec::new();
    let mut halted_at = None;
    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(line = line_no + 1, error = %e, "journal read failed, replay halted");
                halted_at = Some(line_no + 1);
                break;
            }
        };
        line_no += 1;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(&line) {
            Ok(r) => records.push(r),
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "journal decode failed, replay halted");
                halted_at = Some(line_no);
                break;
            }
        }
    }

    Ok(Replay { records, halted_at })
}

/// Open the journal for appending, creating it if missing. Failure here is a
/// startup error; a store that cannot persist must not pretend otherwise.
pub async fn open_append(path: &Path) -> Result<File, StoreError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| {
            StoreError::Internal(format!("open journal {} for append: {e}", path.display()))
        })
}

/// Drain the save queue in enqueue order, appending one line per record.
///
/// Runs until every sender is dropped, then flushes and exits; `close()` on
/// the store awaits this task to guarantee pending records reach disk. Write
/// errors lose that record and are logged, matching the weak-durability
/// contract of the queue itself.
pub async fn save_loop(mut file: File, mut rx: mpsc::Receiver<Record>) {
    while let Some(record) = rx.recv().await {
        let mut line = match serde_json::to_vec(&record) {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(key = %record.key, error = %e, "journal encode failed");
                continue;
            }
        };
        line.push(b'\n');
        if let Err(e) = file.write_all(&line).await {
            tracing::error!(key = %record.key, error = %e, "journal append failed");
        }
    }
    if let Err(e) = file.flush().await {
        tracing::error!(error = %e, "journal flush on shutdown failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn journal_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("store.journal")
    }

    #[tokio::test]
    async fn replay_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let replay = replay(&journal_path(&dir)).await.unwrap();
        assert!(replay.records.is_empty());
        assert!(replay.halted_at.is_none());
    }

    #[tokio::test]
    async fn replay_preserves_write_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = journal_path(&dir);
        std::fs::write(
            &path,
            "{\"key\":\"k1\",\"url\":\"http://a.com\"}\n{\"key\":\"k2\",\"url\":\"http://b.com\"}\n",
        )
        .unwrap();

        let replay = replay(&path).await.unwrap();
        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.records[0].key, "k1");
        assert_eq!(replay.records[1].key, "k2");
        assert!(replay.halted_at.is_none());
    }

    #[tokio::test]
    async fn replay_halts_on_corrupt_line_but_keeps_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = journal_path(&dir);
        std::fs::write(
            &path,
            "{\"key\":\"k1\",\"url\":\"http://a.com\"}\nnot json at all\n{\"key\":\"k2\",\"url\":\"http://b.com\"}\n",
        )
        .unwrap();

        let replay = replay(&path).await.unwrap();
        assert_eq!(replay.records.len(), 1);
        assert_eq!(replay.records[0].key, "k1");
        assert_eq!(replay.halted_at, Some(2));
    }

    #[tokio::test]
    async fn save_loop_appends_in_enqueue_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = journal_path(&dir);

        let file = open_append(&path).await.unwrap();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(save_loop(file, rx));

        for i in 0..5 {
            tx.send(Record {
                key: format!("k{i}"),
                url: format!("http://site{i}.com"),
            })
            .await
            .unwrap();
        }
        drop(tx);
        task.await.unwrap();

        let replay = replay(&path).await.unwrap();
        let keys: Vec<_> = replay.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["k0", "k1", "k2", "k3", "k4"]);
    }
}

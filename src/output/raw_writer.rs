use std::path::PathBuf;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Spawn a background task that appends raw bytes received on `rx` to
/// `path`, truncating it first (spec.md §6: one `<tool>.txt` per plan item,
/// holding the tool's raw stdout plus a trailing stderr excerpt). Mirrors
/// the teacher's `spawn_jsonl_writer`: a channel decouples the tool runner
/// from disk I/O so a slow filesystem never blocks draining the child's
/// stdout and risking a full pipe buffer stalling the subprocess.
pub fn spawn_raw_writer(path: PathBuf, mut rx: mpsc::Receiver<Vec<u8>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match OpenOptions::new().create(true).write(true).truncate(true).open(&path).await {
            Ok(mut f) => {
                while let Some(chunk) = rx.recv().await {
                    if let Err(e) = f.write_all(&chunk).await {
                        tracing::error!(error=%e, path=%path.display(), "failed to write raw tool output");
                    }
                }
                if let Err(e) = f.flush().await {
                    tracing::error!(error=%e, path=%path.display(), "failed to flush raw output writer");
                }
            }
            Err(e) => {
                tracing::error!(error=%e, path=%path.display(), "failed to open raw output file");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_chunks_in_order_and_truncates_prior_content() {
        let dir = std::env::temp_dir().join(format!("vorch-raw-writer-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("nuclei.txt");
        tokio::fs::write(&path, b"stale content").await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_raw_writer(path.clone(), rx);
        tx.send(b"hello ".to_vec()).await.unwrap();
        tx.send(b"world".to_vec()).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents, b"hello world");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// Upper bound on a single read from the source.
pub const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("source stream closed unexpectedly: {0}")]
    StreamClosed(#[source] io::Error),
    #[error("transfer timed out after {0:?}")]
    TimedOut(Duration),
}

/// Streams `source` into `sink_path`, truncating whatever was there.
///
/// `declared_size` is only passed through to `on_progress`; the copy runs
/// until the source reports end of stream. A failure leaves the partially
/// written file in place.
pub async fn copy_to_path<R, F>(
    mut source: R,
    sink_path: &Path,
    declared_size: u64,
    mut on_progress: F,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    F: FnMut(u64, u64),
{
    let sink_err = |source: io::Error| TransferError::Io {
        path: sink_path.to_path_buf(),
        source,
    };

    if let Some(parent) = sink_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(sink_err)?;
    }
    let mut sink = tokio::fs::File::create(sink_path)
        .await
        .map_err(sink_err)?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let read = source
            .read(&mut buf)
            .await
            .map_err(TransferError::StreamClosed)?;
        if read == 0 {
            break;
        }
        sink.write_all(&buf[..read]).await.map_err(sink_err)?;
        written += read as u64;
        on_progress(written, declared_size);
    }

    sink.flush().await.map_err(sink_err)?;
    sink.sync_all().await.map_err(sink_err)?;

    if written != declared_size {
        debug!(
            path = %sink_path.display(),
            declared_size,
            written,
            "transferred size differs from declared size"
        );
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use tokio_util::io::StreamReader;

    use super::*;

    #[tokio::test]
    async fn copies_all_bytes_when_source_is_longer_than_declared() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("big.jpg");
        let payload = vec![7u8; 1200];

        let written = copy_to_path(&payload[..], &target, 1000, |_, _| {})
            .await
            .unwrap();

        assert_eq!(written, 1200);
        assert_eq!(std::fs::read(&target).unwrap(), payload);
    }

    #[tokio::test]
    async fn copies_short_source_without_error() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("short.jpg");

        let written = copy_to_path(&b"abc"[..], &target, 1000, |_, _| {})
            .await
            .unwrap();

        assert_eq!(written, 3);
        assert_eq!(std::fs::read(&target).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn truncates_existing_content() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a.jpg");
        std::fs::write(&target, b"a much longer previous content").unwrap();

        copy_to_path(&b"new"[..], &target, 3, |_, _| {}).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn reports_progress_per_bounded_chunk() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("large.bin");
        let payload = vec![1u8; CHUNK_SIZE * 2 + 10];
        let mut reports = Vec::new();

        copy_to_path(&payload[..], &target, payload.len() as u64, |so_far, total| {
            reports.push((so_far, total));
        })
        .await
        .unwrap();

        assert!(reports.len() >= 3);
        assert!(reports.windows(2).all(|pair| pair[0].0 < pair[1].0));
        let last = reports.last().copied().unwrap();
        assert_eq!(last, (payload.len() as u64, payload.len() as u64));
        let mut previous = 0;
        for (so_far, _) in &reports {
            assert!(so_far - previous <= CHUNK_SIZE as u64);
            previous = *so_far;
        }
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("2024/01/a.jpg");

        copy_to_path(&b"x"[..], &target, 1, |_, _| {}).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"x");
    }

    #[tokio::test]
    async fn broken_source_leaves_partial_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("partial.jpg");
        let chunks: Vec<io::Result<&'static [u8]>> = vec![
            Ok(&b"head"[..]),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let source = StreamReader::new(futures_util::stream::iter(chunks));

        let err = copy_to_path(source, &target, 100, |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::StreamClosed(_)));
        assert_eq!(std::fs::read(&target).unwrap(), b"head");
    }

    #[tokio::test]
    async fn unwritable_sink_is_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let target = blocker.join("a.jpg");

        let err = copy_to_path(&b"x"[..], &target, 1, |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Io { .. }));
    }
}

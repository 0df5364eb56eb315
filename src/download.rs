use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::client::VideoClient;
use crate::job::JobId;
use crate::request::SubmissionMode;
use crate::{Result, VideoError};

/// Number of trailing job id characters used in artifact names
pub const ARTIFACT_SUFFIX_LEN: usize = 8;

/// Progress step when the total size is unknown
const UNKNOWN_SIZE_REPORT_BYTES: u64 = 8 * 1024 * 1024;

/// Artifact file name: `{prefix}_{mode}_video_{last 8 id chars}.mp4`
pub fn artifact_file_name(prefix: &str, mode: SubmissionMode, job_id: &JobId) -> String {
    format!(
        "{}_{}_video_{}.mp4",
        prefix,
        mode.label(),
        job_id.suffix(ARTIFACT_SUFFIX_LEN)
    )
}

/// Result of a finished download
#[derive(Debug, Clone, PartialEq)]
pub struct FileStats {
    pub path: PathBuf,
    pub bytes_written: u64,
    pub content_length: Option<u64>,
    pub elapsed: Duration,
}

/// Running byte count against an optional declared size
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    downloaded: u64,
    total: Option<u64>,
    last_reported: u64,
}

impl DownloadProgress {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            downloaded: 0,
            total: total.filter(|t| *t > 0),
            last_reported: 0,
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Percentage complete, only when the total size is known
    pub fn percent(&self) -> Option<f64> {
        self.total
            .map(|total| (self.downloaded as f64 / total as f64 * 100.0).min(100.0))
    }

    /// Add a chunk. Returns true when a new reporting step was crossed.
    pub fn record(&mut self, bytes: u64) -> bool {
        self.downloaded += bytes;
        let step = match self.total {
            Some(total) => (total / 10).max(1),
            None => UNKNOWN_SIZE_REPORT_BYTES,
        };
        let crossed = self.downloaded / step > self.last_reported / step;
        if crossed {
            self.last_reported = self.downloaded;
        }
        crossed
    }
}

impl VideoClient {
    /// Stream the job's content to `destination`, overwriting any existing file
    pub async fn download(&self, job_id: &JobId, destination: &Path) -> Result<FileStats> {
        info!("📥 Downloading video for job {}", job_id);

        let response = self.open_content(job_id).await?;
        let content_length = response.content_length();

        write_stream(response.bytes_stream(), destination, content_length).await
    }
}

/// Write a chunk stream to `destination`, one chunk at a time.
///
/// The partial file is removed if the stream or a write fails.
pub async fn write_stream<S, B, E>(
    stream: S,
    destination: &Path,
    content_length: Option<u64>,
) -> Result<FileStats>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let started = Instant::now();

    let result = copy_chunks(stream, destination, content_length).await;
    match result {
        Ok(bytes_written) => {
            let stats = FileStats {
                path: destination.to_path_buf(),
                bytes_written,
                content_length,
                elapsed: started.elapsed(),
            };
            info!("✅ Download complete: {}", destination.display());
            info!("   - size: {} bytes in {:.2}s", bytes_written, stats.elapsed.as_secs_f64());
            Ok(stats)
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(destination).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        "Could not remove partial download {}: {}",
                        destination.display(),
                        remove_err
                    );
                }
            }
            Err(e)
        }
    }
}

async fn copy_chunks<S, B, E>(
    stream: S,
    destination: &Path,
    content_length: Option<u64>,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let write_error = |e: std::io::Error| VideoError::Download {
        status: None,
        message: format!("cannot write {}: {}", destination.display(), e),
    };

    let mut file = tokio::fs::File::create(destination).await.map_err(write_error)?;
    let mut progress = DownloadProgress::new(content_length);

    futures::pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| VideoError::Download {
            status: None,
            message: format!("stream interrupted after {} bytes: {}", progress.downloaded(), e),
        })?;
        let bytes = chunk.as_ref();
        if bytes.is_empty() {
            continue;
        }

        file.write_all(bytes).await.map_err(write_error)?;

        if progress.record(bytes.len() as u64) {
            match (progress.percent(), progress.total()) {
                (Some(percent), Some(total)) => info!(
                    "   Download progress: {:.1}% ({}/{} bytes)",
                    percent,
                    progress.downloaded(),
                    total
                ),
                _ => info!("   Downloaded {} bytes", progress.downloaded()),
            }
        }
    }

    file.flush().await.map_err(write_error)?;
    file.sync_all().await.map_err(write_error)?;

    Ok(progress.downloaded())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    fn chunks(data: &[u8], chunk_size: usize) -> Vec<std::result::Result<Vec<u8>, String>> {
        data.chunks(chunk_size).map(|c| Ok(c.to_vec())).collect()
    }

    #[test]
    fn test_artifact_file_name() {
        let id = JobId::new("video_68e4f1a2b3c4d5e6");
        assert_eq!(
            artifact_file_name("sora", SubmissionMode::Text, &id),
            "sora_text_video_b3c4d5e6.mp4"
        );
        assert_eq!(
            artifact_file_name("sora", SubmissionMode::Image, &JobId::new("abc")),
            "sora_image_video_abc.mp4"
        );
    }

    #[test]
    fn test_progress_steps() {
        let mut progress = DownloadProgress::new(Some(100));
        assert!(!progress.record(5));
        assert!(progress.record(5));
        assert_eq!(progress.percent(), Some(10.0));
        assert!(progress.record(90));
        assert_eq!(progress.percent(), Some(100.0));

        let mut unknown = DownloadProgress::new(None);
        assert!(!unknown.record(1024));
        assert_eq!(unknown.percent(), None);
        assert!(unknown.record(UNKNOWN_SIZE_REPORT_BYTES));
        assert_eq!(unknown.downloaded(), UNKNOWN_SIZE_REPORT_BYTES + 1024);
    }

    #[test]
    fn test_zero_content_length_is_unknown() {
        let progress = DownloadProgress::new(Some(0));
        assert_eq!(progress.total(), None);
    }

    #[tokio::test]
    async fn test_written_bytes_match_streamed_bytes() {
        let temp_dir = TempDir::new().unwrap();

        for size in [0usize, 1, 8192 * 3 + 17] {
            let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let path = temp_dir.path().join(format!("artifact_{}.mp4", size));

            let stats = write_stream(
                stream::iter(chunks(&data, 8192)),
                &path,
                Some(size as u64),
            )
            .await
            .unwrap();

            assert_eq!(stats.bytes_written, size as u64);
            let on_disk = tokio::fs::read(&path).await.unwrap();
            assert_eq!(on_disk, data);
        }
    }

    #[tokio::test]
    async fn test_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sora_text_video_deadbeef.mp4");
        tokio::fs::write(&path, vec![7u8; 4096]).await.unwrap();

        let stats = write_stream(stream::iter(chunks(b"new", 2)), &path, None)
            .await
            .unwrap();

        assert_eq!(stats.bytes_written, 3);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_stream_error_removes_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("partial.mp4");

        let items: Vec<std::result::Result<Vec<u8>, String>> =
            vec![Ok(vec![1, 2, 3]), Err("connection reset".to_string())];
        let result = write_stream(stream::iter(items), &path, Some(100)).await;

        match result {
            Err(VideoError::Download { message, .. }) => {
                assert!(message.contains("after 3 bytes"));
            }
            other => panic!("expected download error, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_destination() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing-dir").join("video.mp4");

        let result = write_stream(stream::iter(chunks(b"abc", 1)), &path, None).await;
        assert!(matches!(result, Err(VideoError::Download { .. })));
    }
}

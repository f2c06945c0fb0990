// The only writer of the daily log. Opens in append mode so a rollover truncation
// moves the write position back to zero without reopening.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{instrument, warn};

use crate::models::Sample;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    /// Samples that could not be serialized.
    pub skipped: usize,
}

pub struct DailyLogWriter {
    path: PathBuf,
    file: File,
    /// Held for every batch; rollover takes it to keep appends out of backup..truncate.
    write_lock: Arc<Mutex<()>>,
}

impl DailyLogWriter {
    /// Creates the file (and parent directories) when absent. A torn last line left by a
    /// crash mid-write is cut off first, so the next batch starts on a line boundary.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        trim_torn_line(&path).await?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("open daily log {}", path.display()))?;
        Ok(Self {
            path,
            file,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_lock(&self) -> Arc<Mutex<()>> {
        self.write_lock.clone()
    }

    /// Appends one line per sample and flushes. An `Err` means the log can no longer be
    /// trusted to receive data (disk full, permissions) and must stop the ingestion path.
    #[instrument(skip(self, samples), fields(operation = "append_batch", samples_count = samples.len()))]
    pub async fn append_batch(&mut self, samples: &[Sample]) -> anyhow::Result<WriteReport> {
        let mut report = WriteReport::default();
        let mut buf = String::new();
        for sample in samples {
            match sample.to_line() {
                Ok(line) => {
                    buf.push_str(&line);
                    buf.push('\n');
                    report.written += 1;
                }
                Err(e) => {
                    warn!(error = %e, kind = %sample.kind(), "sample failed to serialize; skipped");
                    report.skipped += 1;
                }
            }
        }
        if buf.is_empty() {
            return Ok(report);
        }

        let _guard = self.write_lock.lock().await;
        self.file
            .write_all(buf.as_bytes())
            .await
            .with_context(|| format!("append to {}", self.path.display()))?;
        self.file
            .flush()
            .await
            .with_context(|| format!("flush {}", self.path.display()))?;
        Ok(report)
    }
}

/// Chunk size for scanning back to the last newline.
const SCAN_CHUNK: usize = 4096;

/// Truncates `path` back to just past its last `\n`, dropping a final line that a crash
/// left without its terminator. Returns the number of bytes dropped. A missing or empty
/// file, or one already ending in `\n`, is left alone.
#[instrument(skip(path), fields(path = %path.display()))]
pub async fn trim_torn_line(path: &Path) -> anyhow::Result<u64> {
    let mut file = match OpenOptions::new().read(true).write(true).open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e).with_context(|| format!("open {}", path.display())),
    };
    let len = file
        .metadata()
        .await
        .with_context(|| format!("stat {}", path.display()))?
        .len();

    let mut buf = vec![0u8; SCAN_CHUNK];
    let mut end = len;
    let keep = loop {
        if end == 0 {
            break 0;
        }
        let start = end.saturating_sub(SCAN_CHUNK as u64);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))
            .await
            .with_context(|| format!("seek {}", path.display()))?;
        file.read_exact(chunk)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            break start + pos as u64 + 1;
        }
        end = start;
    };
    if keep == len {
        return Ok(0);
    }

    file.set_len(keep)
        .await
        .with_context(|| format!("truncate {}", path.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("sync {}", path.display()))?;
    let dropped = len - keep;
    warn!(dropped_bytes = dropped, kept_bytes = keep, "torn last line removed");
    Ok(dropped)
}

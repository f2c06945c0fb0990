// Incremental reader for a file another task is appending to.
// Only complete lines are consumed; a trailing partial line is left for the next call.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use crate::models::{RecordError, Sample};

/// Bytes from the start of the file remembered to recognise a rolled-over log that has
/// already grown past the old offset.
const HEAD_LEN: usize = 64;

/// Checkpoint for one (reader, file) pair.
#[derive(Debug, Default)]
pub struct TailState {
    offset: u64,
    head: Vec<u8>,
    records: Vec<Sample>,
    skipped_lines: u64,
    resets: u64,
}

impl TailState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte offset just past the last consumed newline.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Every sample parsed since the last reset, in file order.
    pub fn records(&self) -> &[Sample] {
        &self.records
    }

    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }

    /// How many times the file was seen truncated or replaced.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.head.clear();
        self.records.clear();
        self.resets += 1;
    }
}

fn was_rolled_over(file: &mut File, len: u64, state: &TailState) -> std::io::Result<bool> {
    if len < state.offset {
        return Ok(true);
    }
    if state.head.is_empty() {
        return Ok(false);
    }
    let mut head = vec![0u8; state.head.len()];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut head)?;
    Ok(head != state.head)
}

/// Reads every complete line appended since the last call and returns how many samples
/// were added to `state`. A missing file is "no data yet"; zero new lines is not an error.
pub fn read_new(path: &Path, state: &mut TailState) -> std::io::Result<usize> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if state.offset > 0 {
                state.reset();
            }
            return Ok(0);
        }
        Err(e) => return Err(e),
    };
    let len = file.metadata()?.len();

    if was_rolled_over(&mut file, len, state)? {
        debug!(path = %path.display(), offset = state.offset, len, "log rolled over; rereading");
        state.reset();
    }
    if len == state.offset {
        return Ok(0);
    }

    file.seek(SeekFrom::Start(state.offset))?;
    let mut buf = Vec::with_capacity((len - state.offset) as usize);
    file.read_to_end(&mut buf)?;

    // Everything after the last newline is a write still in progress.
    let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
        return Ok(0);
    };
    let complete = &buf[..=last_newline];

    let mut added = 0;
    for raw in complete.split(|&b| b == b'\n') {
        let Ok(line) = std::str::from_utf8(raw) else {
            state.skipped_lines += 1;
            warn!(path = %path.display(), "skipping non-UTF-8 line");
            continue;
        };
        match Sample::from_line(line) {
            Ok(sample) => {
                state.records.push(sample);
                added += 1;
            }
            Err(RecordError::Blank) => {}
            Err(e) => {
                state.skipped_lines += 1;
                warn!(path = %path.display(), error = %e, "skipping unparseable line");
            }
        }
    }

    if state.offset == 0 {
        state.head = complete[..complete.len().min(HEAD_LEN)].to_vec();
    }
    state.offset += complete.len() as u64;
    Ok(added)
}

// Content-hash guard for parsed copies of closed files (bulk log, rollover backup).
// Never point this at the live daily log: hashing a file mid-append is unstable.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

/// Hex SHA-256 of the file's bytes.
pub fn content_hash(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn has_changed(path: &Path, previous_hash: &str) -> std::io::Result<bool> {
    Ok(content_hash(path)? != previous_hash)
}

/// A value derived from one file, recomputed only when the file's hash moves.
#[derive(Debug)]
pub struct HashGuarded<T> {
    path: PathBuf,
    hash: Option<String>,
    value: Option<T>,
}

impl<T> HashGuarded<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            hash: None,
            value: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash the cached value was computed from.
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.hash = None;
        self.value = None;
    }

    /// Returns the cached value, reloading it first if the file changed since the last
    /// load. Returns `(value, reloaded)`.
    pub fn get_or_load<F>(&mut self, load: F) -> anyhow::Result<(&T, bool)>
    where
        F: FnOnce(&Path) -> anyhow::Result<T>,
    {
        let current = content_hash(&self.path)?;
        let fresh = self.hash.as_deref() == Some(current.as_str()) && self.value.is_some();
        if !fresh {
            debug!(path = %self.path.display(), hash = %current, "content changed; reloading");
            self.value = Some(load(&self.path)?);
            self.hash = Some(current);
        }
        match self.value.as_ref() {
            Some(v) => Ok((v, !fresh)),
            None => anyhow::bail!("cache for {} is empty after load", self.path.display()),
        }
    }
}

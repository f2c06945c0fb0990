// Daily log: JSON lines, one Sample per line, appended by one writer and tailed by readers.
// Bulk log: same format, one AggregateRecord per line, appended by rollover only.

pub mod load;
pub mod tail;
pub mod writer;

use std::path::{Path, PathBuf};

pub use load::{ParseReport, parse_aggregates, parse_samples, read_aggregates, read_samples};
pub use tail::{TailState, read_new};
pub use writer::{DailyLogWriter, WriteReport, trim_torn_line};

/// Locations of the three files one pipeline owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub daily: PathBuf,
    pub bulk: PathBuf,
    /// Verbatim copy of the daily log taken at the start of each rollover.
    pub backup: PathBuf,
}

impl LogPaths {
    /// Backup defaults to `<daily>.bak`.
    pub fn new(daily: impl Into<PathBuf>, bulk: impl Into<PathBuf>) -> Self {
        let daily = daily.into();
        let backup = default_backup_path(&daily);
        Self {
            daily,
            bulk: bulk.into(),
            backup,
        }
    }

    pub fn with_backup(mut self, backup: impl Into<PathBuf>) -> Self {
        self.backup = backup.into();
        self
    }
}

pub fn default_backup_path(daily: &Path) -> PathBuf {
    let mut name = daily.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_appends_bak_suffix() {
        let paths = LogPaths::new("data/today.jsonl", "data/bulk.jsonl");
        assert_eq!(paths.backup, PathBuf::from("data/today.jsonl.bak"));
    }
}

// Cold load: parse a whole closed file in one pass. Bad lines are counted, not fatal;
// a missing file is an error here (unlike the live tail).

use std::path::Path;

use anyhow::Context;
use tracing::{instrument, warn};

use crate::models::{AggregateRecord, RecordError, Sample};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseReport {
    pub parsed: usize,
    pub skipped: usize,
}

impl ParseReport {
    pub fn merge(self, other: ParseReport) -> ParseReport {
        ParseReport {
            parsed: self.parsed + other.parsed,
            skipped: self.skipped + other.skipped,
        }
    }
}

fn parse_lines<T>(
    text: &str,
    parse: impl Fn(&str) -> Result<T, RecordError>,
) -> (Vec<T>, ParseReport) {
    let mut out = Vec::new();
    let mut report = ParseReport::default();
    for (idx, line) in text.lines().enumerate() {
        match parse(line) {
            Ok(record) => {
                out.push(record);
                report.parsed += 1;
            }
            Err(RecordError::Blank) => {}
            Err(e) => {
                report.skipped += 1;
                warn!(line = idx + 1, error = %e, "skipping unparseable line");
            }
        }
    }
    (out, report)
}

pub fn parse_samples(text: &str) -> (Vec<Sample>, ParseReport) {
    parse_lines(text, Sample::from_line)
}

pub fn parse_aggregates(text: &str) -> (Vec<AggregateRecord>, ParseReport) {
    parse_lines(text, AggregateRecord::from_line)
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[instrument(skip(path), fields(operation = "read_samples", path = %path.display()))]
pub fn read_samples(path: &Path) -> anyhow::Result<(Vec<Sample>, ParseReport)> {
    Ok(parse_samples(&read_text(path)?))
}

#[instrument(skip(path), fields(operation = "read_aggregates", path = %path.display()))]
pub fn read_aggregates(path: &Path) -> anyhow::Result<(Vec<AggregateRecord>, ParseReport)> {
    Ok(parse_aggregates(&read_text(path)?))
}

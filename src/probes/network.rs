// Round-trip latency to one destination via the system ping binary.

use std::process::Command;

use anyhow::Context;

use super::{Probe, now_timestamp};
use crate::models::{NetworkSample, Sample};

pub struct PingProbe {
    destination: String,
    timeout_secs: u64,
}

impl PingProbe {
    pub fn new(destination: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            destination: destination.into(),
            timeout_secs,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// Round-trip time from the `time=<ms> ms` fragment of ping's output.
pub fn parse_ping_ms(output: &str) -> Option<f64> {
    let start = output.find("time=")? + "time=".len();
    let rest = &output[start..];
    let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
    rest[..end].parse().ok()
}

impl Probe for PingProbe {
    fn name(&self) -> &str {
        &self.destination
    }

    /// A non-zero exit (timeout, unreachable, unknown host) is a miss and yields NaN.
    fn poll(&mut self) -> anyhow::Result<Vec<Sample>> {
        let timestamp = now_timestamp();
        let timeout = self.timeout_secs.to_string();
        let output = Command::new("ping")
            .args(["-c", "1", "-W", timeout.as_str(), self.destination.as_str()])
            .output()
            .context("spawn ping")?;
        let ping_ms = if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            parse_ping_ms(&stdout)
                .with_context(|| format!("could not parse ping output: {:?}", stdout))?
        } else {
            f64::NAN
        };
        Ok(vec![
            NetworkSample {
                timestamp,
                destination: self.destination.clone(),
                ping_ms,
            }
            .into(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linux_output() {
        let out = "PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.\n\
                   64 bytes from 192.168.1.1: icmp_seq=1 ttl=64 time=0.412 ms\n";
        assert_eq!(parse_ping_ms(out), Some(0.412));
    }

    #[test]
    fn parses_integer_time() {
        assert_eq!(parse_ping_ms("icmp_seq=1 ttl=117 time=12 ms"), Some(12.0));
    }

    #[test]
    fn missing_time_is_none() {
        assert_eq!(parse_ping_ms("1 packets transmitted, 0 received"), None);
    }
}

// Linux-specific helpers: default gateway from /proc/net/route.

use std::net::Ipv4Addr;

/// Read the default IPv4 gateway (Linux). None elsewhere or when no default route exists.
pub(super) fn read_default_gateway() -> Option<Ipv4Addr> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/net/route").ok()?;
        parse_default_gateway(&content)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Parse the table format of /proc/net/route. The default route has destination
/// 00000000; its gateway column is a little-endian hex u32.
pub fn parse_default_gateway(content: &str) -> Option<Ipv4Addr> {
    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 || fields[1] != "00000000" {
            continue;
        }
        let raw = u32::from_str_radix(fields[2], 16).ok()?;
        if raw == 0 {
            continue;
        }
        return Some(Ipv4Addr::from(raw.to_le_bytes()));
    }
    None
}

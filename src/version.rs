// Build-time identity from Cargo.toml, logged at startup by both binaries.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// `name vversion`, as printed in the startup line.
pub fn banner() -> String {
    format!("{} v{}", NAME, VERSION)
}

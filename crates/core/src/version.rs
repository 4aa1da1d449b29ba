//! Version and wire/schema compatibility constants.

/// Crate version as published.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sync protocol version. Peers must match exactly.
pub const PROTOCOL_VERSION: i32 = 2;

/// Schema version written into the persisted skill file header.
pub const CONFIG_SCHEMA_VERSION: i32 = 2;

/// True when a peer speaking `remote` can be trusted with a sync payload.
pub fn is_compatible(remote_protocol_version: i32) -> bool {
    remote_protocol_version == PROTOCOL_VERSION
}

/// Human-readable version line for logs and `--version` output.
pub fn version_string() -> String {
    format!("v{VERSION} (proto={PROTOCOL_VERSION}, cfg={CONFIG_SCHEMA_VERSION})")
}

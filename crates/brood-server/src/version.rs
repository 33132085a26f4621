/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the full version string for logs and the health endpoint.
pub fn full_version() -> String {
    format!("brood-server {VERSION}")
}

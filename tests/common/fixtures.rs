//! Shared fixtures for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared helpers under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/fixtures.rs"]
//! mod fixtures;
//! ```

use buildbox::resources::ResourceRecordSet;

/// Address the frontend record points at before provisioning.
pub const STALE_IP: &str = "192.0.2.44";

/// Returns the frontend record matching the test configuration.
#[must_use]
pub fn frontend_record() -> ResourceRecordSet {
    ResourceRecordSet::new("dev.example.com.", "A", 300, vec![String::from(STALE_IP)])
}


//! bgmforge integration test infrastructure
//!
//! This crate holds the workspace's cross-crate tests:
//!
//! - **Round trip**: decode then encode reproduces every fixture byte for byte
//! - **Sharing**: shared regions decode once and encode once
//! - **Fork-on-edit**: edits through one reference leave the others alone
//! - **Determinism**: repeated encodes and rebuilds hash identically
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bgmforge-tests
//!
//! # With codec and engine logs
//! RUST_LOG=bgmforge_codec=debug,bgmforge_edit=debug cargo test -p bgmforge-tests
//! ```
//!
//! Fixtures are assembled byte by byte with [`fixtures::AssetBuilder`], never
//! through the encoder, so a round trip compares against an independent
//! reference.

pub mod determinism;
pub mod fixtures;

pub use determinism::{
    assert_deterministic, compute_hash, verify_determinism, DeterminismResult, DiffInfo,
};
pub use fixtures::{AssetBuilder, Fixture};

/// Route library logs to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

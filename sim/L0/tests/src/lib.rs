//! End-to-end tests for the hydrodynamic simulation crates.
//!
//! The tests live under `integration/`; run them with
//! `cargo test -p sim-integration-tests`.

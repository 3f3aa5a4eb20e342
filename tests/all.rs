//! Integration test aggregator
//!
//! Entry point for the end-to-end tests that drive the backend client and
//! the feed buffer against a mock server. Modules are declared in `suite/mod.rs`.

mod common;
mod suite;

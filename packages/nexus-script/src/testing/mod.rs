//! Test support.
//!
//! Not `#[cfg(test)]`: the integration tests under `tests/` are a separate
//! crate and drive the binary against the same mock.

mod server;

pub use server::*;

pub mod api;
pub mod cli;

// The mock server is used both by unit tests and by the integration tests
// under `tests/`, which form a separate crate, so it can't be `#[cfg(test)]`.
pub mod testing;

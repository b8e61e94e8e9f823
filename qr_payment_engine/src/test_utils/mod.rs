//! Support for integration tests: fresh throwaway databases with the schema applied.
//!
//! Gated behind the `test_utils` feature so downstream crates can pull it into their own test
//! suites without dragging the helpers into release builds.

pub mod prepare_env;

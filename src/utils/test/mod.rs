//! Test utilities
//!
//! Synthetic snapshots for unit tests, integration tests and demos.


pub use fixtures::{SyntheticSnapshot, uniform_weights};

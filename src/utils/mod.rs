//! Shared utilities
//!
//! Arrow column extraction, Parquet IO, logging helpers and synthetic test
//! data.

pub mod arrow;
pub mod io;
pub mod logging;
pub mod test;

pub use io::{load_parquet_files_parallel, read_parquet, write_parquet_atomic};

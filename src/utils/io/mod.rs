//! IO utilities for file operations

pub mod parquet;

pub use parquet::{
    DEFAULT_BATCH_SIZE, find_parquet_files, load_parquet_files_parallel, read_parquet,
    write_parquet_atomic,
};

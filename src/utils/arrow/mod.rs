//! Arrow data handling utilities
//!
//! Helpers for reading columns of a record batch as canonical types.

pub mod array_utils;
pub mod extractors;

pub use array_utils::{downcast_array, get_column};
pub use extractors::{Column, extract_booleans, extract_dates, extract_float64s, extract_strings};

//! Algorithm implementations for CRID materialization

pub mod crid;

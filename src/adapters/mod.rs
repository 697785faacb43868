//! Record batch adapters
//!
//! Adapters convert Arrow record batches into domain models (and, for the
//! output records, back again). Each adapter owns the column contract of
//! one external interface.

pub mod observation;
pub mod record;
pub mod weight;

use arrow::record_batch::RecordBatch;

use crate::error::Result;

pub use observation::{ObservationAdapter, load_observations};
pub use record::{CridRecordAdapter, crid_record_schema, read_crid_records, write_crid_records};
pub use weight::{WeightAdapter, load_weight_definitions, load_weights};

/// Converts record batches from an external source into domain models
pub trait BatchAdapter<T>: std::fmt::Debug + Send + Sync {
    /// Convert one record batch into models, in row order
    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<T>>;
}

//! CRID computation stages
//!
//! Each stage is a pure function over immutable collections:
//!
//! 1. [`composite`] pivots observations into facility-period composites
//! 2. [`peer`] computes (region, period) cohort moments and gated z-scores
//! 3. [`divergence`] derives CRID and its rolling volatility
//! 4. [`flags`] annotates each facility-period
//!
//! [`engine::CridEngine`] runs them in order.

pub mod completeness;
pub mod composite;
pub mod divergence;
pub mod engine;
pub mod flags;
pub mod peer;
pub mod stats;

pub use composite::{FacilityPeriodComposite, PivotDiagnostics, build_composites};
pub use engine::{CridEngine, CridRun};
pub use flags::{CridFlag, FlagSet};
pub use peer::{PeerCohortStats, ZScores};

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query engine over the zipcode record store.
//!
//! Translates a small fixed set of query parameters (exact code,
//! city/state, prefix, numeric ranges, coordinate + radius) into
//! validated, indexed scans. The proximity path pre-filters with a
//! conservative bounding box over the indexed `lat`/`lng` columns, then
//! applies the exact great-circle filter, sorts nearest first, and
//! paginates only after sorting.
//!
//! Every operation is a pure read. The engine holds the process-wide
//! store handle; construct it once at startup and share it.
//!
//! # Usage
//!
//! ```rust,no_run
//! # fn example() -> Result<(), zip_atlas_search::QueryError> {
//! use zip_atlas_search::SimpleSearchEngine;
//! use zip_atlas_models::{Unit, ZipcodeRecord as _};
//!
//! let engine = SimpleSearchEngine::open("data/zipcode.duckdb")?;
//! for z in engine.by_coordinates(40.75, -73.99, 5.0, Unit::Miles, 10)? {
//!     println!("{:?} {:?}", z.zipcode, z.city());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bbox;
pub mod engine;
pub mod options;

use zip_atlas_database::DbError;

pub use bbox::BoundingBox;
pub use engine::{ComprehensiveSearchEngine, SearchEngine, SimpleSearchEngine};
pub use options::{DEFAULT_RETURNS, SearchOptions, SortKey};

/// Errors from query validation or execution.
///
/// Validation failures are raised before any store access. Store and
/// codec failures pass through unchanged: queries are idempotent reads,
/// so retry policy belongs to the caller.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Latitude outside the physically valid range.
    #[error("Invalid latitude {0}: expected -90.0..=90.0")]
    InvalidLatitude(f64),

    /// Longitude outside the physically valid range.
    #[error("Invalid longitude {0}: expected -180.0..=180.0")]
    InvalidLongitude(f64),

    /// Radius not a positive, finite distance.
    #[error("Invalid radius {0}: expected a positive, finite distance")]
    InvalidRadius(f64),

    /// State abbreviation that is not two ASCII letters.
    #[error("Invalid state abbreviation: {0:?}")]
    InvalidState(String),

    /// Sort attribute that is not a sortable column.
    #[error("Unknown sort attribute: {0:?}")]
    UnknownSortKey(String),

    /// Result cap of zero; an accidental unbounded query is rejected.
    #[error("Invalid result cap {0}: expected at least 1")]
    InvalidReturns(usize),

    /// Store or row-decode failure, propagated unchanged.
    #[error(transparent)]
    Db(#[from] DbError),
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zipcode record types shared across the zip-atlas system.
//!
//! Defines the two record shapes ([`SimpleZipcode`] and
//! [`ComprehensiveZipcode`]), their identity semantics (equality and
//! ordering by `zipcode` alone), great-circle distance, and the static
//! state-abbreviation table. Records are loaded once from the store and
//! never mutated afterwards.

pub mod distance;
pub mod record;
pub mod state;

pub use distance::{Unit, haversine};
pub use record::{
    Bounds, ComparisonError, ComprehensiveZipcode, NoCoordinatesError, SimpleZipcode,
    ZipcodeRecord, ZipcodeType,
};
pub use state::state_long;

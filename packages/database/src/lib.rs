#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB`-backed record store for zipcode data.
//!
//! The store is an indexed table keyed by `zipcode` with secondary
//! indexes on `lat` and `lng` for range scans, and BLOB columns holding
//! compressed structured attributes decoded through `zip_atlas_codec` on
//! read. The dataset is populated once, offline, and read-only
//! afterwards; the query layers above never write.

pub mod load;
pub mod scan;
pub mod store;
pub mod table;

use zip_atlas_codec::CodecError;

pub use scan::Scan;
pub use table::ZipcodeTable;

/// Errors from record-store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Underlying `DuckDB` error.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// I/O error while preparing the store location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored compressed attribute failed to decode. One row is
    /// damaged; the failure names the row and column so it can be
    /// repaired offline.
    #[error("Corrupt attribute {column} on zipcode {zipcode}: {source}")]
    Corrupt {
        /// Primary key of the damaged row.
        zipcode: String,
        /// Column whose payload failed to decode.
        column: &'static str,
        /// Underlying codec failure.
        source: CodecError,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

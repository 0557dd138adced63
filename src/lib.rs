//! CSV play-record import for the DMP radio catalogue.
//!
//! Rows flow through [`row`] (parsing), [`dedup`], [`bad_data`],
//! [`artist`] and [`loader`]; [`pipeline`] wires them together for both the
//! import and the pre-analysis runs.

pub mod artist;
pub mod bad_data;
pub mod config;
pub mod dedup;
pub mod error;
pub mod export;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod row;
pub mod source;
pub mod store;
#[cfg(test)]
pub mod test_utils;

pub use error::{ImportError, Result, RowError, StoreError};

//! Redshift source connector.
//!
//! Reads full table snapshots from Amazon Redshift through the asynchronous
//! Redshift Data API: submit a statement, poll until it finishes, then stream
//! the result pages as typed records.

pub mod config;
pub mod data_api;
pub mod error;
pub mod logging;
pub mod source;
pub mod statement;

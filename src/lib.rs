//! uploadcheck - decide which local movie files are safe to upload
//!
//! Files move through independent stages (scan, resolve, search, verify,
//! classify) whose results accumulate in a versioned record store, so any
//! stage can be re-run or resumed on its own.

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod export;
pub mod language;
pub mod pipeline;
pub mod scanner;
pub mod store;
pub mod trackers;

pub use error::{Error, Result};

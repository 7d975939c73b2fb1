//! Eroteme CLI library.
//!
//! File discovery, configuration, the parallel batch runner and report
//! rendering behind the `eroteme` binary.

pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod walk;
pub mod write;

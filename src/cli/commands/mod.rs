//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod census;
pub mod common;
pub mod init;
pub mod los;
pub mod outliers;
pub mod readmit;
pub mod summary;
pub mod validate;
pub mod visits;

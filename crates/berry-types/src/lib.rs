//! Foundation types for BerryOS.
//!
//! This crate contains the pieces shared by every BerryOS crate: the
//! file-system error taxonomy, the crate-wide error type, and the TOML
//! configuration model.

pub mod config;
pub mod error;

//! Core types and errors shared by every facemark crate.
//!
//! This crate provides the foundational types used across the labeling pipeline:
//! - Byte spans into the original STEP text
//! - Face signatures supplied by the geometry kernel
//! - Label assignments, patches, and run warnings
//! - Error types for every pipeline stage

pub mod errors;
pub mod label;
pub mod signature;
pub mod types;

pub use errors::*;
pub use label::*;
pub use signature::*;
pub use types::*;

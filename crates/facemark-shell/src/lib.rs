//! Shell face enumeration and signature alignment.
//!
//! This crate recovers the kernel's face order from the entity graph and
//! matches externally computed signatures against it:
//! - [`enumerate_faces`] walks shell entities in document order
//! - [`SignatureProvider`] is the kernel-side interface
//! - [`align`] verifies counts and pairs faces with signatures

mod align;
mod enumerate;
mod provider;

pub use align::{align, AlignedFace, AlignedShell};
pub use enumerate::{enumerate_faces, EnumerateOptions, FaceEnumeration, FaceLocation, ShellFaces};
pub use provider::{SignatureList, SignatureProvider};

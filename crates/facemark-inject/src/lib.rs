//! Label injection into STEP name literals.
//!
//! Labels are written by entity id and byte span, never by searching for
//! literal text, so two faces that happen to share a name cannot be confused.
//! Injection is total: either every label is patched or the input is left
//! untouched and an [`InjectionError`](facemark_core::InjectionError) is returned.

mod patch;

pub use patch::{apply_patches, inject, plan_patches};

use facemark_core::LabelAssignment;
use facemark_parser::EntityGraph;
use facemark_shell::FaceEnumeration;

/// The names currently carried by enumerated faces, in enumeration order.
///
/// Faces with an empty name or without a name literal are left out.
pub fn existing_labels(graph: &EntityGraph, enumeration: &FaceEnumeration) -> LabelAssignment {
    enumeration
        .iter()
        .filter_map(|loc| {
            let name = graph.get(loc.entity_id)?.name()?;
            (!name.is_empty()).then(|| (loc.entity_id, name.to_string()))
        })
        .collect()
}

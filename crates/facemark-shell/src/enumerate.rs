//! Canonical face enumeration from shell entities.
//!
//! Shells are visited in document order and each shell's faces in the order
//! its face list declares them. Concatenated, that is the order the kernel
//! iterates faces in, and the only order signatures may be matched against.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use facemark_core::{EntityId, ParseError};
use facemark_parser::EntityGraph;

/// Which entity types count as shells and faces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerateOptions {
    pub shell_types: Vec<String>,
    pub face_types: Vec<String>,
}

impl Default for EnumerateOptions {
    fn default() -> Self {
        Self {
            shell_types: vec!["CLOSED_SHELL".into()],
            face_types: vec!["ADVANCED_FACE".into(), "FACE_SURFACE".into()],
        }
    }
}

impl EnumerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also enumerate `OPEN_SHELL` entities.
    pub fn with_open_shells(mut self) -> Self {
        if !self.shell_types.iter().any(|t| t == "OPEN_SHELL") {
            self.shell_types.push("OPEN_SHELL".into());
        }
        self
    }

    fn is_shell(&self, type_name: &str) -> bool {
        self.shell_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(type_name))
    }

    fn is_face(&self, type_name: &str) -> bool {
        self.face_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(type_name))
    }
}

/// The ordered faces of one shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellFaces {
    pub shell_id: EntityId,
    pub faces: Vec<EntityId>,
}

/// Per-shell face lists in shell declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FaceEnumeration {
    shells: Vec<ShellFaces>,
}

/// Where one face sits in the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceLocation {
    pub shell_index: usize,
    pub face_index: usize,
    pub entity_id: EntityId,
}

impl FaceEnumeration {
    pub fn from_shells(shells: Vec<ShellFaces>) -> Self {
        Self { shells }
    }

    pub fn shells(&self) -> &[ShellFaces] {
        &self.shells
    }

    pub fn shell_count(&self) -> usize {
        self.shells.len()
    }

    /// Total number of faces over all shells.
    pub fn len(&self) -> usize {
        self.shells.iter().map(|s| s.faces.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The global enumeration, in order.
    pub fn iter(&self) -> impl Iterator<Item = FaceLocation> + '_ {
        self.shells.iter().enumerate().flat_map(|(shell_index, shell)| {
            shell
                .faces
                .iter()
                .enumerate()
                .map(move |(face_index, &entity_id)| FaceLocation {
                    shell_index,
                    face_index,
                    entity_id,
                })
        })
    }

    /// Resolve a global enumeration index.
    pub fn locate(&self, global_index: usize) -> Option<FaceLocation> {
        let mut remaining = global_index;
        for (shell_index, shell) in self.shells.iter().enumerate() {
            if remaining < shell.faces.len() {
                return Some(FaceLocation {
                    shell_index,
                    face_index: remaining,
                    entity_id: shell.faces[remaining],
                });
            }
            remaining -= shell.faces.len();
        }
        None
    }

    /// Global index of a face given its shell and position within it.
    pub fn global_index(&self, shell_index: usize, face_index: usize) -> Option<usize> {
        let shell = self.shells.get(shell_index)?;
        if face_index >= shell.faces.len() {
            return None;
        }
        let before: usize = self.shells[..shell_index].iter().map(|s| s.faces.len()).sum();
        Some(before + face_index)
    }
}

/// Enumerate the faces of every shell in `graph`.
pub fn enumerate_faces(
    graph: &EntityGraph,
    options: &EnumerateOptions,
) -> Result<FaceEnumeration, ParseError> {
    let mut shells = Vec::new();
    let mut owner: HashMap<EntityId, EntityId> = HashMap::new();
    for entity in graph.iter().filter(|e| options.is_shell(&e.type_name)) {
        let list = entity
            .fields
            .get(1)
            .and_then(|f| f.as_list())
            .ok_or_else(|| ParseError::MalformedShell {
                shell_id: entity.id,
                reason: "second field is not a face list".into(),
            })?;

        let mut faces = Vec::with_capacity(list.len());
        for item in list {
            let face_id = item.as_reference().ok_or_else(|| ParseError::MalformedShell {
                shell_id: entity.id,
                reason: format!("face list item at {} is not a reference", item.span),
            })?;
            let face_type = graph
                .get(face_id)
                .map(|f| f.type_name.as_str())
                .unwrap_or_default();
            if !options.is_face(face_type) {
                return Err(ParseError::MalformedShell {
                    shell_id: entity.id,
                    reason: format!("#{face_id} is a {face_type}, not a face"),
                });
            }
            if let Some(previous) = owner.insert(face_id, entity.id) {
                return Err(ParseError::MalformedShell {
                    shell_id: entity.id,
                    reason: format!("#{face_id} is already listed by shell #{previous}"),
                });
            }
            faces.push(face_id);
        }

        tracing::debug!(shell = entity.id, faces = faces.len(), "enumerated shell");
        shells.push(ShellFaces {
            shell_id: entity.id,
            faces,
        });
    }

    if shells.is_empty() {
        return Err(ParseError::NoShells {
            types: options.shell_types.clone(),
        });
    }
    Ok(FaceEnumeration { shells })
}

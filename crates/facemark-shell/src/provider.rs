//! The signature provider interface.
//!
//! The geometry kernel implements [`SignatureProvider`]. It reports its face
//! count before any signature is requested, and it is responsible for
//! iterating faces in the same order as the text enumeration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use facemark_core::{ConfigError, FaceSignature, ProviderError};

/// Supplies one signature per enumerated face.
pub trait SignatureProvider: Send + Sync {
    /// Total number of faces the kernel iterates, over all shells.
    fn face_count(&self) -> usize;

    /// Signature of face `face_index` of shell `shell_index`.
    ///
    /// `global_index` is the same face's position in the concatenated
    /// enumeration, for providers that store a flat list.
    fn signature(
        &self,
        shell_index: usize,
        face_index: usize,
        global_index: usize,
    ) -> Result<FaceSignature, ProviderError>;
}

/// An in-memory provider holding signatures in kernel iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureList {
    signatures: Vec<FaceSignature>,
}

impl SignatureList {
    pub fn new(signatures: Vec<FaceSignature>) -> Self {
        Self { signatures }
    }

    /// Load a JSON array of signatures.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON array of signatures from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn as_slice(&self) -> &[FaceSignature] {
        &self.signatures
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl From<Vec<FaceSignature>> for SignatureList {
    fn from(signatures: Vec<FaceSignature>) -> Self {
        Self::new(signatures)
    }
}

impl SignatureProvider for SignatureList {
    fn face_count(&self) -> usize {
        self.signatures.len()
    }

    fn signature(
        &self,
        _shell_index: usize,
        _face_index: usize,
        global_index: usize,
    ) -> Result<FaceSignature, ProviderError> {
        self.signatures
            .get(global_index)
            .cloned()
            .ok_or(ProviderError::MissingSignature {
                index: global_index,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facemark_core::SurfaceKind;

    #[test]
    fn test_from_json() {
        let list = SignatureList::from_json(
            r#"[
                {"surface_kind": "plane", "centroid": [0.0, 0.0, 20.0], "area": 31.4},
                {"surface_kind": "cone", "centroid": [0.0, 0.0, 9.5], "area": 900.0,
                 "apex_point": [0.0, 0.0, 21.0]}
            ]"#,
        )
        .unwrap();
        assert_eq!(list.face_count(), 2);
        let cone = list.signature(0, 1, 1).unwrap();
        assert_eq!(cone.surface_kind, SurfaceKind::Cone);
        assert_eq!(cone.apex_point.map(|p| p.z), Some(21.0));
        assert!(matches!(
            list.signature(0, 2, 2),
            Err(ProviderError::MissingSignature { index: 2 })
        ));
    }

    #[test]
    fn test_bad_json() {
        let err = SignatureList::from_json(r#"[{"surface_kind": "blob"}]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}

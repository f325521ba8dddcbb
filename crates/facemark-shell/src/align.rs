//! Alignment of kernel signatures with the text enumeration.

use rayon::prelude::*;
use serde::Serialize;

use facemark_core::{AlignError, EntityId, FaceSignature};

use crate::enumerate::FaceEnumeration;
use crate::provider::SignatureProvider;

/// One face with its signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedFace {
    pub entity_id: EntityId,
    pub signature: FaceSignature,
}

/// All faces of one shell, in declared order, with their signatures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedShell {
    pub shell_index: usize,
    pub shell_id: EntityId,
    pub faces: Vec<AlignedFace>,
}

/// Pair every enumerated face with the provider's signature for it.
///
/// The provider's reported count is checked before any signature is
/// requested; a mismatch means the kernel and the text disagree about the
/// face set and nothing downstream may run.
pub fn align(
    enumeration: &FaceEnumeration,
    provider: &dyn SignatureProvider,
) -> Result<Vec<AlignedShell>, AlignError> {
    let enumerated = enumeration.len();
    let supplied = provider.face_count();
    if enumerated != supplied {
        tracing::warn!(enumerated, supplied, "face count mismatch");
        return Err(AlignError::CountMismatch {
            enumerated,
            supplied,
        });
    }

    let locations: Vec<_> = enumeration.iter().enumerate().collect();
    let fetched: Vec<Result<AlignedFace, AlignError>> = locations
        .par_iter()
        .map(|(global_index, loc)| {
            provider
                .signature(loc.shell_index, loc.face_index, *global_index)
                .map(|signature| AlignedFace {
                    entity_id: loc.entity_id,
                    signature,
                })
                .map_err(|source| AlignError::Provider {
                    shell_index: loc.shell_index,
                    face_index: loc.face_index,
                    source,
                })
        })
        .collect();

    let mut fetched = fetched.into_iter();
    let mut shells = Vec::with_capacity(enumeration.shell_count());
    for (shell_index, shell) in enumeration.shells().iter().enumerate() {
        let faces = fetched
            .by_ref()
            .take(shell.faces.len())
            .collect::<Result<Vec<_>, _>>()?;
        shells.push(AlignedShell {
            shell_index,
            shell_id: shell.shell_id,
            faces,
        });
    }
    tracing::debug!(faces = enumerated, shells = shells.len(), "aligned signatures");
    Ok(shells)
}

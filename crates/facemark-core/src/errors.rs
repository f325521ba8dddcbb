//! Error types for the labeling pipeline.
//!
//! Every stage has its own error enum; `FacemarkError` unifies them. None of
//! these are retried: each points at malformed input or an incomplete rule set.

use crate::signature::FaceSignature;
use crate::types::{EntityId, Span};
use thiserror::Error;

/// Top-level error type for a labeling run.
#[derive(Debug, Error)]
pub enum FacemarkError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Align(#[from] AlignError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Inject(#[from] InjectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors while reading the STEP text into an entity graph.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no DATA section found")]
    MissingDataSection,

    #[error("unterminated record starting at byte {offset}")]
    UnterminatedRecord { offset: usize },

    #[error("unexpected input at byte {offset}: expected {expected}, found {found:?}")]
    UnexpectedToken {
        offset: usize,
        expected: String,
        found: String,
    },

    #[error("entity #{id} is defined twice (at {first} and {second})")]
    DuplicateId { id: EntityId, first: Span, second: Span },

    #[error("entity #{from} references undefined entity #{to}")]
    UnresolvedReference { from: EntityId, to: EntityId, span: Span },

    #[error("shell #{shell_id} is malformed: {reason}")]
    MalformedShell { shell_id: EntityId, reason: String },

    #[error("no shell entities of type {} found", .types.join(" or "))]
    NoShells { types: Vec<String> },
}

/// Errors while aligning kernel signatures with the text enumeration.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error(
        "face count mismatch: STEP enumerates {enumerated} faces but the kernel supplied {supplied} signatures"
    )]
    CountMismatch { enumerated: usize, supplied: usize },

    #[error("signature provider failed for shell {shell_index}, face {face_index}: {source}")]
    Provider {
        shell_index: usize,
        face_index: usize,
        #[source]
        source: ProviderError,
    },
}

/// Errors a signature provider reports for a single face.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no signature at index {index}")]
    MissingSignature { index: usize },

    #[error("kernel error: {source}")]
    Kernel {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ProviderError {
    /// Wrap an error raised by the geometry kernel.
    pub fn kernel(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ProviderError::Kernel {
            source: source.into(),
        }
    }
}

/// Errors while classifying the faces of one shell.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(
        "shell {shell_index}: rule '{rule}' cannot order faces {} (every discriminant ties)",
        fmt_ids(.entity_ids)
    )]
    Ambiguity {
        shell_index: usize,
        rule: String,
        entity_ids: Vec<EntityId>,
        signatures: Vec<FaceSignature>,
    },

    #[error("shell {shell_index}: label '{label}' would be assigned to faces {}", fmt_ids(.entity_ids))]
    DuplicateLabel {
        shell_index: usize,
        label: String,
        entity_ids: Vec<EntityId>,
    },

    #[error("shell {shell_index}: rule '{rule}' names {expected} ranks but matched {matched} faces")]
    RankedCountMismatch {
        shell_index: usize,
        rule: String,
        expected: usize,
        matched: usize,
        entity_ids: Vec<EntityId>,
    },

    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },
}

/// Errors while patching labels into the text.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("face #{entity_id} has a label but no name literal to replace")]
    MissingNameSpan { entity_id: EntityId },

    #[error("patch for #{first} at {first_span} overlaps patch for #{second} at {second_span}")]
    Overlap {
        first: EntityId,
        first_span: Span,
        second: EntityId,
        second_span: Span,
    },

    #[error("name span {span} of #{entity_id} is outside the document")]
    SpanOutOfBounds { entity_id: EntityId, span: Span },
}

/// Errors while loading configuration or signature files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn fmt_ids(ids: &[EntityId]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_mismatch_message() {
        let err = FacemarkError::from(AlignError::CountMismatch {
            enumerated: 12,
            supplied: 11,
        });
        assert_eq!(
            err.to_string(),
            "face count mismatch: STEP enumerates 12 faces but the kernel supplied 11 signatures"
        );
    }

    #[test]
    fn test_ambiguity_names_faces() {
        let err = ClassifyError::Ambiguity {
            shell_index: 0,
            rule: "taper".into(),
            entity_ids: vec![14, 22],
            signatures: Vec::new(),
        };
        assert!(err.to_string().contains("#14, #22"));
    }
}

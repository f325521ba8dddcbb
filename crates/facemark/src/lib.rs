//! facemark: semantic face labeling for STEP B-rep exports.
//!
//! A CAD kernel exports a solid to ISO 10303-21 text with anonymous faces.
//! facemark recovers the kernel's face order from the text, pairs each face
//! with the geometric signature the kernel computed for it, classifies the
//! faces with a configurable rule set, and writes the resulting names back
//! into the faces' name literals without touching any other byte.
//!
//! # Quick Start
//!
//! ```ignore
//! use facemark::{Labeler, LabelerConfig, SignatureList};
//!
//! let config = LabelerConfig::from_path("disc.labels.json")?;
//! let signatures = SignatureList::from_path("disc.signatures.json")?;
//! let report = Labeler::from_config(&config)?
//!     .label_file("disc.step", "disc.labeled.step", &signatures)?;
//! println!("{}", report.to_json(config.pretty_report)?);
//! ```
//!
//! # Pipeline
//!
//! ```text
//! STEP text ─> EntityGraph ─> FaceEnumeration ─┐
//!                                              ├─> align ─> classify ─> inject ─> STEP text
//!               SignatureProvider (kernel) ────┘
//! ```

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::LabelerConfig;
pub use pipeline::{run, LabelOutcome, Labeler};
pub use report::LabelReport;

pub use facemark_classify::{
    Condition, Discriminant, DiscriminantKind, FacePredicate, KeyFn, LabelTemplate, Quantity, Rule,
    RuleSet, RuleSetConfig,
};
pub use facemark_core::{
    AlignError, Axis, ClassifyError, ConfigError, EntityId, FaceSignature, FacemarkError,
    InjectionError, LabelAssignment, ParseError, ProviderError, ShellContext, Span, SurfaceKind,
    Warning,
};
pub use facemark_inject::existing_labels;
pub use facemark_parser::{parse_document, EntityGraph};
pub use facemark_shell::{
    enumerate_faces, EnumerateOptions, FaceEnumeration, SignatureList, SignatureProvider,
};

/// Result type for labeling runs.
pub type Result<T> = std::result::Result<T, FacemarkError>;

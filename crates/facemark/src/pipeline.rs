//! The end-to-end labeling pipeline.

use std::path::Path;

use facemark_classify::{classify_shells, RuleSet};
use facemark_core::{ConfigError, FacemarkError};
use facemark_inject::{apply_patches, plan_patches};
use facemark_parser::parse_document;
use facemark_shell::{align, enumerate_faces, EnumerateOptions, FaceEnumeration, SignatureProvider};

use crate::config::LabelerConfig;
use crate::report::LabelReport;
use crate::Result;

/// The labeled text and its report.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelOutcome {
    pub text: String,
    pub report: LabelReport,
}

/// Parses, enumerates, aligns, classifies and injects with one rule set.
///
/// The labeler holds no per-run state; one instance can label any number of
/// documents of the same kind of part.
#[derive(Debug, Clone)]
pub struct Labeler {
    rules: RuleSet,
    options: EnumerateOptions,
}

impl Labeler {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            options: EnumerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EnumerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn from_config(config: &LabelerConfig) -> Result<Self> {
        Ok(Self::new(config.rule_set()?).with_options(config.enumerate.clone()))
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The face order a signature provider must follow for `text`.
    pub fn enumerate(&self, text: &str) -> Result<FaceEnumeration> {
        let graph = parse_document(text)?;
        Ok(enumerate_faces(&graph, &self.options)?)
    }

    /// Label every face of `text`. Nothing is returned unless every stage succeeds.
    #[tracing::instrument(skip_all, fields(rules = %self.rules.name, bytes = text.len()))]
    pub fn run(&self, text: &str, provider: &dyn SignatureProvider) -> Result<LabelOutcome> {
        self.rules.validate()?;
        let graph = parse_document(text)?;
        let enumeration = enumerate_faces(&graph, &self.options)?;
        let shells = align(&enumeration, provider)?;
        let classified = classify_shells(&shells, &self.rules)?;

        let mut report = LabelReport::from_shells(classified, enumeration.len());
        let patches = plan_patches(text, &report.labels, &graph.name_spans())?;
        report.patched = patches.len();
        let text = apply_patches(text, &patches)?;

        tracing::info!(
            shells = report.shells,
            faces = report.faces,
            labeled = report.labels.len(),
            patched = report.patched,
            warnings = report.warnings.len(),
            "labeled document"
        );
        if report.unlabeled() > 0 {
            tracing::warn!(unlabeled = report.unlabeled(), "faces left unlabeled");
        }
        Ok(LabelOutcome { text, report })
    }

    /// Label `input` into `output`. The output file is only written on success.
    pub fn label_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        provider: &dyn SignatureProvider,
    ) -> Result<LabelReport> {
        let input = input.as_ref();
        let output = output.as_ref();
        let text = std::fs::read_to_string(input).map_err(|source| io_error(input, source))?;
        let outcome = self.run(&text, provider)?;
        std::fs::write(output, outcome.text).map_err(|source| io_error(output, source))?;
        tracing::debug!(output = %output.display(), "wrote labeled document");
        Ok(outcome.report)
    }
}

/// Label `text` with `rules` using the default enumeration options.
pub fn run(text: &str, provider: &dyn SignatureProvider, rules: &RuleSet) -> Result<LabelOutcome> {
    Labeler::new(rules.clone()).run(text, provider)
}

fn io_error(path: &Path, source: std::io::Error) -> FacemarkError {
    ConfigError::Io {
        path: path.display().to_string(),
        source,
    }
    .into()
}

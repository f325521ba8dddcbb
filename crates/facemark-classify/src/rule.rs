//! Classification rules and rule sets.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use facemark_core::{ClassifyError, ConfigError};

use crate::discriminant::{Discriminant, DiscriminantKind};
use crate::predicate::{Condition, FacePredicate};

/// Placeholder replaced by a face's 1-based index within its family.
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// Default zero-padding width of family indices.
pub const DEFAULT_INDEX_WIDTH: usize = 2;

/// Default tolerance below which two discriminant keys tie.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// How a rule names the faces it matches.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelTemplate {
    /// One label; the rule must match at most one face per shell.
    Fixed(String),
    /// `template` with `{index}` replaced by the 1-based sorted position.
    /// Every label of a family is padded to the same width: at least
    /// `width` digits, more if the family count needs them.
    Indexed { template: String, width: usize },
    /// Names assigned by sorted rank; the family must match exactly this many faces.
    Ranked(Vec<String>),
    /// `template` with `{index}` replaced by the 1-based number of the
    /// reference bearing (degrees, `[0, 360)`) nearest to the face centroid.
    /// A missing face leaves a gap instead of renumbering its siblings.
    Sector {
        template: String,
        reference_angles: Vec<f64>,
        width: usize,
    },
}

/// Number of decimal digits in `n`.
fn digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

/// Shortest distance between two bearings, in degrees.
fn circular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

impl LabelTemplate {
    /// `Indexed` if `text` contains `{index}`, else `Fixed`.
    pub fn parse(text: &str) -> Self {
        if text.contains(INDEX_PLACEHOLDER) {
            LabelTemplate::Indexed {
                template: text.to_string(),
                width: DEFAULT_INDEX_WIDTH,
            }
        } else {
            LabelTemplate::Fixed(text.to_string())
        }
    }

    pub fn fixed(label: impl Into<String>) -> Self {
        LabelTemplate::Fixed(label.into())
    }

    pub fn indexed(template: impl Into<String>, width: usize) -> Self {
        LabelTemplate::Indexed {
            template: template.into(),
            width,
        }
    }

    pub fn ranked<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LabelTemplate::Ranked(names.into_iter().map(Into::into).collect())
    }

    pub fn sector(template: impl Into<String>, reference_angles: Vec<f64>) -> Self {
        LabelTemplate::Sector {
            template: template.into(),
            reference_angles,
            width: DEFAULT_INDEX_WIDTH,
        }
    }

    /// `count` sectors spaced evenly around the axis, the first at `start_deg`.
    pub fn even_sectors(template: impl Into<String>, start_deg: f64, count: usize) -> Self {
        let spacing = 360.0 / count.max(1) as f64;
        Self::sector(
            template,
            (0..count)
                .map(|i| (start_deg + i as f64 * spacing).rem_euclid(360.0))
                .collect(),
        )
    }

    /// Whether the family has to be put in a well-defined order.
    pub fn needs_order(&self) -> bool {
        matches!(self, LabelTemplate::Indexed { .. } | LabelTemplate::Ranked(_))
    }

    /// Label of the face at `position` (0-based) in a family of `family_len`.
    ///
    /// For `Sector` templates `position` is the sector number and the width
    /// follows the number of reference angles.
    pub fn render(&self, position: usize, family_len: usize) -> Option<String> {
        let indexed = |template: &str, width: usize, count: usize| {
            let width = width.max(digits(count));
            template.replace(
                INDEX_PLACEHOLDER,
                &format!("{:0width$}", position + 1, width = width),
            )
        };
        match self {
            LabelTemplate::Fixed(label) => Some(label.clone()),
            LabelTemplate::Indexed { template, width } => {
                Some(indexed(template.as_str(), *width, family_len))
            }
            LabelTemplate::Ranked(names) => names.get(position).cloned(),
            LabelTemplate::Sector {
                template,
                reference_angles,
                width,
            } => (position < reference_angles.len())
                .then(|| indexed(template.as_str(), *width, reference_angles.len())),
        }
    }

    /// Index of the reference angle nearest to `bearing_deg`. Exact ties go
    /// to the lower index. `None` unless this is a `Sector` template.
    pub fn sector_of(&self, bearing_deg: f64) -> Option<usize> {
        let LabelTemplate::Sector {
            reference_angles, ..
        } = self
        else {
            return None;
        };
        let mut best: Option<(usize, f64)> = None;
        for (i, &angle) in reference_angles.iter().enumerate() {
            let diff = circular_distance(bearing_deg, angle);
            if best.map_or(true, |(_, d)| diff < d) {
                best = Some((i, diff));
            }
        }
        best.map(|(i, _)| i)
    }

    fn validate(&self, rule: &str) -> Result<(), ClassifyError> {
        let invalid = |reason: &str| ClassifyError::InvalidRule {
            rule: rule.to_string(),
            reason: reason.to_string(),
        };
        match self {
            LabelTemplate::Fixed(label) if label.is_empty() => Err(invalid("empty label")),
            LabelTemplate::Indexed { template, .. } if !template.contains(INDEX_PLACEHOLDER) => {
                Err(invalid("indexed template has no {index} placeholder"))
            }
            LabelTemplate::Sector { template, .. } if !template.contains(INDEX_PLACEHOLDER) => {
                Err(invalid("sector template has no {index} placeholder"))
            }
            LabelTemplate::Sector {
                reference_angles, ..
            } if reference_angles.is_empty() => Err(invalid("no reference angles")),
            LabelTemplate::Sector {
                reference_angles, ..
            } if reference_angles.iter().any(|a| !a.is_finite()) => {
                Err(invalid("reference angle is not a finite number"))
            }
            LabelTemplate::Ranked(names) if names.is_empty() => Err(invalid("no ranked names")),
            LabelTemplate::Ranked(names) => {
                for (i, name) in names.iter().enumerate() {
                    if name.is_empty() {
                        return Err(invalid("empty ranked name"));
                    }
                    if names[..i].contains(name) {
                        return Err(invalid(&format!("ranked name '{name}' appears twice")));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// One classification rule.
#[derive(Clone)]
pub struct Rule {
    pub name: String,
    pub priority: i32,
    pub predicate: Arc<dyn FacePredicate>,
    pub label: LabelTemplate,
    pub discriminants: Vec<Arc<dyn Discriminant>>,
    pub tolerance: f64,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        predicate: impl FacePredicate + 'static,
        label: LabelTemplate,
    ) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            predicate: Arc::new(predicate),
            label,
            discriminants: Vec::new(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Append a tie-break discriminant; earlier ones take precedence.
    pub fn order_by(mut self, discriminant: impl Discriminant + 'static) -> Self {
        self.discriminants.push(Arc::new(discriminant));
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<(), ClassifyError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ClassifyError::InvalidRule {
                rule: self.name.clone(),
                reason: format!("tolerance {} is not a positive number", self.tolerance),
            });
        }
        self.label.validate(&self.name)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("label", &self.label)
            .field(
                "discriminants",
                &self.discriminants.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

/// An ordered set of rules with an optional fallback for unmatched faces.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub name: String,
    rules: Vec<Rule>,
    pub fallback: Option<LabelTemplate>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.push(rule);
        self
    }

    pub fn with_fallback(mut self, fallback: LabelTemplate) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Insert a rule, keeping the set sorted by descending priority.
    /// Rules of equal priority keep their insertion order.
    pub fn push(&mut self, rule: Rule) {
        let at = self
            .rules
            .iter()
            .position(|r| r.priority < rule.priority)
            .unwrap_or(self.rules.len());
        self.rules.insert(at, rule);
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn validate(&self) -> Result<(), ClassifyError> {
        for (i, rule) in self.rules.iter().enumerate() {
            rule.validate()?;
            if self.rules[..i].iter().any(|r| r.name == rule.name) {
                return Err(ClassifyError::InvalidRule {
                    rule: rule.name.clone(),
                    reason: "rule name is not unique".into(),
                });
            }
        }
        match &self.fallback {
            Some(LabelTemplate::Ranked(_) | LabelTemplate::Sector { .. }) => {
                Err(ClassifyError::InvalidRule {
                    rule: "fallback".into(),
                    reason: "fallback must be a fixed or indexed label".into(),
                })
            }
            Some(fallback) => fallback.validate("fallback"),
            None => Ok(()),
        }
    }

    /// Load a rule set from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        RuleSetConfig::from_json(json)?.try_into()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        RuleSetConfig::from_path(path)?.try_into()
    }
}

fn default_width() -> usize {
    DEFAULT_INDEX_WIDTH
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

/// A label as written in configuration: a plain string (indexed when it
/// contains `{index}`), a list of ranked names, a sector-keyed template, or
/// an explicit indexed template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelConfig {
    Text(String),
    Ranked(Vec<String>),
    // Before `Indexed`, which would otherwise accept it and drop `sectors`.
    Sector {
        template: String,
        sectors: Vec<f64>,
        #[serde(default = "default_width")]
        width: usize,
    },
    Indexed {
        template: String,
        #[serde(default = "default_width")]
        width: usize,
    },
}

impl From<LabelConfig> for LabelTemplate {
    fn from(config: LabelConfig) -> Self {
        match config {
            LabelConfig::Text(text) => LabelTemplate::parse(&text),
            LabelConfig::Ranked(names) => LabelTemplate::Ranked(names),
            LabelConfig::Sector {
                template,
                sectors,
                width,
            } => LabelTemplate::Sector {
                template,
                reference_angles: sectors,
                width,
            },
            LabelConfig::Indexed { template, width } => LabelTemplate::Indexed { template, width },
        }
    }
}

/// Declarative form of a [`Rule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Defaults to the label text.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: i32,
    pub when: Condition,
    pub label: LabelConfig,
    #[serde(default)]
    pub order_by: Vec<DiscriminantKind>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

/// Declarative form of a [`RuleSet`], as stored in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub name: String,
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub fallback: Option<LabelConfig>,
}

impl RuleSetConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

impl TryFrom<RuleSetConfig> for RuleSet {
    type Error = ConfigError;

    fn try_from(config: RuleSetConfig) -> Result<Self, Self::Error> {
        let mut set = RuleSet::new(config.name);
        for rule in config.rules {
            let name = match (&rule.name, &rule.label) {
                (Some(name), _) => name.clone(),
                (None, LabelConfig::Text(text)) => text.clone(),
                (None, LabelConfig::Indexed { template, .. })
                | (None, LabelConfig::Sector { template, .. }) => template.clone(),
                (None, LabelConfig::Ranked(names)) => names.join("|"),
            };
            let mut built = Rule::new(name, rule.when, rule.label.into())
                .with_priority(rule.priority)
                .with_tolerance(rule.tolerance);
            for kind in rule.order_by {
                built = built.order_by(kind);
            }
            set.push(built);
        }
        set.fallback = config.fallback.map(Into::into);
        set.validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facemark_core::SurfaceKind;

    #[test]
    fn test_render() {
        let shelf = LabelTemplate::parse("shelf_{index}");
        assert_eq!(shelf.render(0, 5).as_deref(), Some("shelf_01"));
        assert_eq!(
            LabelTemplate::indexed("spoke_{index}", 3).render(4, 5).as_deref(),
            Some("spoke_005")
        );
        assert_eq!(LabelTemplate::parse("top").render(3, 1).as_deref(), Some("top"));
        let tapers = LabelTemplate::ranked(["bottom_taper", "top_taper"]);
        assert_eq!(tapers.render(1, 2).as_deref(), Some("top_taper"));
        assert_eq!(tapers.render(2, 2), None);
    }

    #[test]
    fn test_render_pads_to_family_size() {
        let shelf = LabelTemplate::parse("shelf_{index}");
        assert_eq!(shelf.render(0, 100).as_deref(), Some("shelf_001"));
        assert_eq!(shelf.render(99, 100).as_deref(), Some("shelf_100"));
        assert_eq!(shelf.render(8, 99).as_deref(), Some("shelf_09"));
        assert_eq!(shelf.render(0, 1000).as_deref(), Some("shelf_0001"));
        assert_eq!(digits(0), 1);
        assert_eq!(digits(10), 2);
    }

    #[test]
    fn test_sector_lookup() {
        let holes = LabelTemplate::even_sectors("hole_{index}", 0.0, 5);
        assert_eq!(holes.sector_of(3.0), Some(0));
        assert_eq!(holes.sector_of(350.0), Some(0));
        assert_eq!(holes.sector_of(140.0), Some(2));
        assert_eq!(holes.sector_of(290.0), Some(4));
        // Halfway between two references goes to the lower index.
        assert_eq!(holes.sector_of(36.0), Some(0));
        assert_eq!(holes.render(3, 1).as_deref(), Some("hole_04"));
        assert_eq!(holes.render(5, 1), None);
        assert_eq!(LabelTemplate::parse("x_{index}").sector_of(10.0), None);
        assert!(!holes.needs_order());

        let offset = LabelTemplate::even_sectors("arm_{index}", 270.0, 4);
        assert_eq!(offset.sector_of(10.0), Some(1));
        assert_eq!(offset.sector_of(269.0), Some(0));
    }

    #[test]
    fn test_priority_order_is_stable() {
        let set = RuleSet::new("part")
            .rule(Rule::new("a", Condition::Always, LabelTemplate::fixed("a")))
            .rule(Rule::new("b", Condition::Always, LabelTemplate::fixed("b")).with_priority(5))
            .rule(Rule::new("c", Condition::Always, LabelTemplate::fixed("c")))
            .rule(Rule::new("d", Condition::Always, LabelTemplate::fixed("d")).with_priority(5));
        let names: Vec<_> = set.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_validation() {
        let bad = Rule::new("x", Condition::Always, LabelTemplate::indexed("x", 2));
        assert!(matches!(bad.validate(), Err(ClassifyError::InvalidRule { .. })));
        let dup = Rule::new("t", Condition::Always, LabelTemplate::ranked(["a", "a"]));
        assert!(dup.validate().is_err());
        let ranked_fallback = RuleSet::new("p").with_fallback(LabelTemplate::ranked(["a"]));
        assert!(ranked_fallback.validate().is_err());
        let zero_tol = Rule::new("z", Condition::Always, LabelTemplate::fixed("z")).with_tolerance(0.0);
        assert!(zero_tol.validate().is_err());
        let no_sectors = Rule::new("h", Condition::Always, LabelTemplate::sector("h_{index}", vec![]));
        assert!(no_sectors.validate().is_err());
        let nan_sector =
            Rule::new("h", Condition::Always, LabelTemplate::sector("h_{index}", vec![f64::NAN]));
        assert!(nan_sector.validate().is_err());
        let sector_fallback =
            RuleSet::new("p").with_fallback(LabelTemplate::sector("f_{index}", vec![0.0]));
        assert!(sector_fallback.validate().is_err());
    }

    #[test]
    fn test_rule_set_from_json() {
        let set = RuleSet::from_json(
            r#"{
                "name": "cylinder",
                "rules": [
                    {"when": {"surface_kind": "plane"}, "label": "cap_{index}",
                     "order_by": [{"height": {}}]},
                    {"name": "taper", "priority": 10,
                     "when": {"surface_kind": "cone"},
                     "label": ["bottom_taper", "top_taper"],
                     "order_by": [{"apex_height": {}}]},
                    {"when": {"near": {"quantity": "radius", "value": 5.0, "tolerance": 0.1}},
                     "label": {"template": "wall_{index}", "width": 3}}
                ],
                "fallback": "face_{index}"
            }"#,
        )
        .unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.rules()[0].name, "taper");
        assert_eq!(set.rules()[1].name, "cap_{index}");
        assert_eq!(set.rules()[1].discriminants.len(), 1);
        assert_eq!(set.rules()[2].label, LabelTemplate::indexed("wall_{index}", 3));
        assert_eq!(set.fallback, Some(LabelTemplate::indexed("face_{index}", 2)));
        // The rule configs hold real conditions.
        assert_eq!(
            RuleSetConfig::from_json(r#"{"rules":[{"when":{"surface_kind":"cone"},"label":"x"}]}"#)
                .unwrap()
                .rules[0]
                .when,
            Condition::kind(SurfaceKind::Cone)
        );
    }

    #[test]
    fn test_sector_label_from_json() {
        let set = RuleSet::from_json(
            r#"{"rules": [
                {"name": "hole", "when": {"surface_kind": "cylinder"},
                 "label": {"template": "bolt.hole_{index}", "sectors": [0, 72, 144, 216, 288]}},
                {"name": "wall", "when": {"surface_kind": "plane"},
                 "label": {"template": "wall_{index}"}, "order_by": ["area"]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            set.rules()[0].label,
            LabelTemplate::Sector {
                template: "bolt.hole_{index}".into(),
                reference_angles: vec![0.0, 72.0, 144.0, 216.0, 288.0],
                width: 2,
            }
        );
        assert_eq!(set.rules()[1].label, LabelTemplate::indexed("wall_{index}", 2));
    }

    #[test]
    fn test_invalid_rule_set_json() {
        let err = RuleSet::from_json(
            r#"{"rules": [{"when": "always", "label": {"template": "x", "width": 2}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = RuleSet::from_json(r#"{"rules": [{"label": "x"}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}

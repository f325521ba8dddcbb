//! Label assignments, patches, and run warnings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Span};

/// Final labels keyed by face entity id, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelAssignment {
    labels: IndexMap<EntityId, String>,
}

impl LabelAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a label, returning the previous one for this id if any.
    pub fn insert(&mut self, id: EntityId, label: impl Into<String>) -> Option<String> {
        self.labels.insert(id, label.into())
    }

    pub fn get(&self, id: EntityId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &str)> {
        self.labels.iter().map(|(id, label)| (*id, label.as_str()))
    }

    /// Append every label of `other`, keeping this assignment's order first.
    pub fn extend(&mut self, other: LabelAssignment) {
        self.labels.extend(other.labels);
    }
}

impl FromIterator<(EntityId, String)> for LabelAssignment {
    fn from_iter<T: IntoIterator<Item = (EntityId, String)>>(iter: T) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

/// A single name-literal replacement in the original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelPatch {
    pub entity_id: EntityId,
    /// Span of the quoted literal, quotes included.
    pub span: Span,
    pub new_label: String,
}

/// Non-fatal findings reported alongside the labeled output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A rule in the active rule set matched no face in a shell.
    RuleMatchedNothing { shell_index: usize, rule: String },
    /// No rule matched a face and the rule set has no fallback.
    UnmatchedFace { shell_index: usize, entity_id: EntityId },
    /// A face was labeled by the rule set's fallback template.
    FallbackLabel {
        shell_index: usize,
        entity_id: EntityId,
        label: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::RuleMatchedNothing { shell_index, rule } => {
                write!(f, "shell {shell_index}: rule '{rule}' matched no face")
            }
            Warning::UnmatchedFace { shell_index, entity_id } => {
                write!(f, "shell {shell_index}: face #{entity_id} matched no rule")
            }
            Warning::FallbackLabel {
                shell_index,
                entity_id,
                label,
            } => write!(
                f,
                "shell {shell_index}: face #{entity_id} fell back to '{label}'"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_keeps_insertion_order() {
        let mut labels = LabelAssignment::new();
        labels.insert(30, "top");
        labels.insert(10, "bottom");
        labels.insert(20, "bore");
        let ids: Vec<_> = labels.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
        assert_eq!(labels.get(10), Some("bottom"));
        assert_eq!(labels.insert(10, "base"), Some("bottom".to_string()));
    }

    #[test]
    fn test_assignment_json_is_a_map() {
        let labels: LabelAssignment = vec![(7, "rim_01".to_string())].into_iter().collect();
        let json = serde_json::to_string(&labels).unwrap();
        assert_eq!(json, r#"{"7":"rim_01"}"#);
    }
}

//! Run reports.

use indexmap::IndexMap;
use serde::Serialize;

use facemark_classify::ShellLabels;
use facemark_core::{ConfigError, LabelAssignment, Warning};

/// What a labeling run produced, alongside the patched text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelReport {
    /// Final labels in enumeration order.
    pub labels: LabelAssignment,
    pub warnings: Vec<Warning>,
    /// Faces per rule family, summed over all shells.
    pub family_counts: IndexMap<String, usize>,
    pub shells: usize,
    pub faces: usize,
    /// Labels whose text differed from the name already in the file.
    pub patched: usize,
}

impl LabelReport {
    /// Merge per-shell results, in shell order.
    pub fn from_shells(shells: Vec<ShellLabels>, faces: usize) -> Self {
        let mut report = Self {
            shells: shells.len(),
            faces,
            ..Default::default()
        };
        for shell in shells {
            report.labels.extend(shell.assignment);
            report.warnings.extend(shell.warnings);
            for (family, count) in shell.families {
                *report.family_counts.entry(family).or_default() += count;
            }
        }
        report
    }

    /// Faces left without a label.
    pub fn unlabeled(&self) -> usize {
        self.faces.saturating_sub(self.labels.len())
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, ConfigError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(index: usize, labels: &[(u64, &str)], families: &[(&str, usize)]) -> ShellLabels {
        ShellLabels {
            shell_index: index,
            shell_id: 100 + index as u64,
            assignment: labels.iter().map(|(id, l)| (*id, l.to_string())).collect(),
            warnings: Vec::new(),
            families: families.iter().map(|(f, n)| (f.to_string(), *n)).collect(),
        }
    }

    #[test]
    fn test_merge_sums_families() {
        let mut second = shell(1, &[(7, "shelf_01")], &[("shelf", 1)]);
        second.warnings.push(Warning::UnmatchedFace {
            shell_index: 1,
            entity_id: 8,
        });
        let report = LabelReport::from_shells(
            vec![shell(0, &[(3, "shelf_01"), (2, "top")], &[("shelf", 1), ("top", 1)]), second],
            4,
        );
        assert_eq!(report.shells, 2);
        assert_eq!(report.family_counts.get("shelf"), Some(&2));
        assert_eq!(report.unlabeled(), 1);
        let ids: Vec<_> = report.labels.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![3, 2, 7]);
    }

    #[test]
    fn test_json_shape() {
        let report = LabelReport::from_shells(vec![shell(0, &[(3, "top")], &[("top", 1)])], 1);
        let value: serde_json::Value = serde_json::from_str(&report.to_json(false).unwrap()).unwrap();
        assert_eq!(value["labels"]["3"], "top");
        assert_eq!(value["family_counts"]["top"], 1);
        assert!(value["warnings"].as_array().unwrap().is_empty());
    }
}

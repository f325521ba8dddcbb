//! The classification engine.
//!
//! Classification is a pure function of one shell's signatures and a rule
//! set: each face joins the family of the first rule (by priority) that
//! matches it, families are ordered by their rule's discriminants, and labels
//! are rendered from the sorted positions. Sector-keyed families skip the
//! ordering and take their index from the nearest reference bearing.

use std::cmp::Ordering;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use facemark_core::{ClassifyError, EntityId, LabelAssignment, ShellContext, Warning};
use facemark_shell::AlignedShell;

use crate::rule::{LabelTemplate, Rule, RuleSet};

/// Family name used in counts for faces labeled by the fallback template.
pub const FALLBACK_FAMILY: &str = "fallback";

/// Labels and findings for one shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellLabels {
    pub shell_index: usize,
    pub shell_id: EntityId,
    /// Labels in enumeration order.
    pub assignment: LabelAssignment,
    pub warnings: Vec<Warning>,
    /// Number of faces per matched rule, in rule order.
    pub families: IndexMap<String, usize>,
}

/// Classify every shell, in parallel. The first error in shell order wins.
pub fn classify_shells(
    shells: &[AlignedShell],
    rules: &RuleSet,
) -> Result<Vec<ShellLabels>, ClassifyError> {
    rules.validate()?;
    let results: Vec<Result<ShellLabels, ClassifyError>> = shells
        .par_iter()
        .map(|shell| classify_valid(shell, rules))
        .collect();
    results.into_iter().collect()
}

/// Classify the faces of one shell.
pub fn classify_shell(shell: &AlignedShell, rules: &RuleSet) -> Result<ShellLabels, ClassifyError> {
    rules.validate()?;
    classify_valid(shell, rules)
}

fn classify_valid(shell: &AlignedShell, rules: &RuleSet) -> Result<ShellLabels, ClassifyError> {
    let ctx = ShellContext::from_signatures(
        shell.shell_index,
        shell.shell_id,
        shell.faces.iter().map(|f| &f.signature),
    );

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); rules.len()];
    let mut unmatched = Vec::new();
    for (i, face) in shell.faces.iter().enumerate() {
        match rules
            .rules()
            .iter()
            .position(|r| r.predicate.matches(&face.signature, &ctx))
        {
            Some(r) => members[r].push(i),
            None => unmatched.push(i),
        }
    }

    let mut labels: Vec<Option<String>> = vec![None; shell.faces.len()];
    let mut warnings = Vec::new();
    let mut families = IndexMap::new();

    for (rule, family) in rules.rules().iter().zip(&members) {
        if family.is_empty() {
            warnings.push(Warning::RuleMatchedNothing {
                shell_index: shell.shell_index,
                rule: rule.name.clone(),
            });
            continue;
        }
        families.insert(rule.name.clone(), family.len());
        label_family(shell, &ctx, rule, family, &mut labels)?;
    }

    if !unmatched.is_empty() {
        match &rules.fallback {
            Some(fallback) => {
                families.insert(FALLBACK_FAMILY.to_string(), unmatched.len());
                if let LabelTemplate::Fixed(label) = fallback {
                    if unmatched.len() > 1 {
                        return Err(duplicate(shell, label, &unmatched));
                    }
                }
                for (position, &i) in unmatched.iter().enumerate() {
                    let label = fallback
                        .render(position, unmatched.len())
                        .unwrap_or_default();
                    warnings.push(Warning::FallbackLabel {
                        shell_index: shell.shell_index,
                        entity_id: shell.faces[i].entity_id,
                        label: label.clone(),
                    });
                    labels[i] = Some(label);
                }
            }
            None => warnings.extend(unmatched.iter().map(|&i| Warning::UnmatchedFace {
                shell_index: shell.shell_index,
                entity_id: shell.faces[i].entity_id,
            })),
        }
    }

    // Families are unique internally; two rules may still render the same text.
    let mut by_label: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (i, label) in labels.iter().enumerate() {
        if let Some(label) = label {
            by_label.entry(label.as_str()).or_default().push(i);
        }
    }
    if let Some((label, faces)) = by_label.iter().find(|(_, faces)| faces.len() > 1) {
        return Err(duplicate(shell, label, faces));
    }

    for warning in &warnings {
        tracing::warn!(shell = shell.shell_id, "{warning}");
    }

    let assignment: LabelAssignment = shell
        .faces
        .iter()
        .zip(labels)
        .filter_map(|(face, label)| label.map(|l| (face.entity_id, l)))
        .collect();
    tracing::debug!(
        shell = shell.shell_id,
        labeled = assignment.len(),
        faces = shell.faces.len(),
        "classified shell"
    );

    Ok(ShellLabels {
        shell_index: shell.shell_index,
        shell_id: shell.shell_id,
        assignment,
        warnings,
        families,
    })
}

fn label_family(
    shell: &AlignedShell,
    ctx: &ShellContext,
    rule: &Rule,
    family: &[usize],
    labels: &mut [Option<String>],
) -> Result<(), ClassifyError> {
    if let LabelTemplate::Fixed(label) = &rule.label {
        if family.len() > 1 {
            return Err(duplicate(shell, label, family));
        }
        labels[family[0]] = Some(label.clone());
        return Ok(());
    }

    if let LabelTemplate::Sector { .. } = &rule.label {
        return label_sectors(shell, rule, family, labels);
    }

    let ordered = order_family(shell, ctx, rule, family)?;
    if let LabelTemplate::Ranked(names) = &rule.label {
        if names.len() != ordered.len() {
            return Err(ClassifyError::RankedCountMismatch {
                shell_index: shell.shell_index,
                rule: rule.name.clone(),
                expected: names.len(),
                matched: ordered.len(),
                entity_ids: ordered.iter().map(|&i| shell.faces[i].entity_id).collect(),
            });
        }
    }
    for (position, &i) in ordered.iter().enumerate() {
        labels[i] = rule.label.render(position, ordered.len());
    }
    Ok(())
}

/// Number each face by the reference bearing nearest to its centroid.
fn label_sectors(
    shell: &AlignedShell,
    rule: &Rule,
    family: &[usize],
    labels: &mut [Option<String>],
) -> Result<(), ClassifyError> {
    let mut by_sector: IndexMap<usize, Vec<usize>> = IndexMap::new();
    for &i in family {
        let bearing = shell.faces[i].signature.bearing_deg();
        if let Some(sector) = rule.label.sector_of(bearing) {
            by_sector.entry(sector).or_default().push(i);
        }
    }
    for (&sector, faces) in &by_sector {
        let label = rule.label.render(sector, family.len()).unwrap_or_default();
        if faces.len() > 1 {
            return Err(duplicate(shell, &label, faces));
        }
        tracing::trace!(rule = %rule.name, sector, %label, "sector label");
        labels[faces[0]] = Some(label);
    }
    Ok(())
}

fn cmp_key(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

/// Whether two neighbouring sorted keys belong to the same run.
fn same_run(a: Option<f64>, b: Option<f64>, tolerance: f64) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (b - a).abs() <= tolerance,
        _ => false,
    }
}

/// Sort a family by its rule's discriminants.
///
/// Each discriminant's raw keys are sorted (missing keys first) and split
/// into runs wherever the gap between neighbours exceeds the rule's
/// tolerance. Faces are then ordered by their run numbers, one per
/// discriminant, so a later discriminant only decides between faces that
/// share a run of every earlier one. Faces that share a run of every
/// discriminant cannot be ordered and are reported rather than numbered
/// arbitrarily.
fn order_family(
    shell: &AlignedShell,
    ctx: &ShellContext,
    rule: &Rule,
    family: &[usize],
) -> Result<Vec<usize>, ClassifyError> {
    let mut runs: Vec<Vec<usize>> = vec![Vec::with_capacity(rule.discriminants.len()); family.len()];
    for discriminant in &rule.discriminants {
        let mut keyed: Vec<(Option<f64>, usize)> = family
            .iter()
            .enumerate()
            .map(|(slot, &i)| (discriminant.key(&shell.faces[i].signature, ctx), slot))
            .collect();
        keyed.sort_by(|a, b| cmp_key(a.0, b.0));

        let mut run = 0;
        for (n, &(key, slot)) in keyed.iter().enumerate() {
            if n > 0 && !same_run(keyed[n - 1].0, key, rule.tolerance) {
                run += 1;
            }
            runs[slot].push(run);
        }
    }

    let mut order: Vec<usize> = (0..family.len()).collect();
    order.sort_by(|&a, &b| runs[a].cmp(&runs[b]));

    for window in order.windows(2) {
        if runs[window[0]] == runs[window[1]] {
            let tied: Vec<usize> = order
                .iter()
                .filter(|&&slot| runs[slot] == runs[window[0]])
                .map(|&slot| family[slot])
                .collect();
            return Err(ClassifyError::Ambiguity {
                shell_index: shell.shell_index,
                rule: rule.name.clone(),
                entity_ids: tied.iter().map(|&i| shell.faces[i].entity_id).collect(),
                signatures: tied.iter().map(|&i| shell.faces[i].signature.clone()).collect(),
            });
        }
    }
    Ok(order.into_iter().map(|slot| family[slot]).collect())
}

fn duplicate(shell: &AlignedShell, label: &str, faces: &[usize]) -> ClassifyError {
    ClassifyError::DuplicateLabel {
        shell_index: shell.shell_index,
        label: label.to_string(),
        entity_ids: faces.iter().map(|&i| shell.faces[i].entity_id).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discriminant::DiscriminantKind;
    use crate::predicate::{Condition, Quantity};
    use facemark_core::{Axis, FaceSignature, SurfaceKind};
    use facemark_shell::AlignedFace;
    use glam::DVec3;
    use proptest::prelude::*;

    fn shell(sigs: Vec<(EntityId, FaceSignature)>) -> AlignedShell {
        AlignedShell {
            shell_index: 0,
            shell_id: 1,
            faces: sigs
                .into_iter()
                .map(|(entity_id, signature)| AlignedFace {
                    entity_id,
                    signature,
                })
                .collect(),
        }
    }

    fn shelf_at(deg: f64) -> FaceSignature {
        let r = deg.to_radians();
        FaceSignature::plane(DVec3::new(50.0 * r.cos(), 50.0 * r.sin(), 12.0), 40.0)
    }

    fn five_shelves() -> AlignedShell {
        shell(
            [0.0, 72.0, 144.0, 216.0, 288.0]
                .iter()
                .enumerate()
                .map(|(i, &deg)| (100 + i as EntityId, shelf_at(deg)))
                .collect(),
        )
    }

    fn shelf_rule(order: DiscriminantKind) -> RuleSet {
        RuleSet::new("disc").rule(
            Rule::new(
                "shelf",
                Condition::kind(SurfaceKind::Plane),
                LabelTemplate::parse("shelf_{index}"),
            )
            .order_by(order)
            .with_tolerance(0.01),
        )
    }

    #[test]
    fn test_five_shelves_by_signed_angle() {
        let labels = classify_shell(&five_shelves(), &shelf_rule(DiscriminantKind::Angle)).unwrap();
        // Signed angles: 216 -> -144 and 288 -> -72 sort first.
        assert_eq!(labels.assignment.get(103), Some("shelf_01"));
        assert_eq!(labels.assignment.get(104), Some("shelf_02"));
        assert_eq!(labels.assignment.get(100), Some("shelf_03"));
        assert_eq!(labels.assignment.get(101), Some("shelf_04"));
        assert_eq!(labels.assignment.get(102), Some("shelf_05"));
        assert_eq!(labels.families.get("shelf"), Some(&5));
    }

    #[test]
    fn test_five_shelves_by_bearing() {
        let labels =
            classify_shell(&five_shelves(), &shelf_rule(DiscriminantKind::Bearing)).unwrap();
        let got: Vec<_> = labels.assignment.iter().map(|(_, l)| l.to_string()).collect();
        assert_eq!(
            got,
            vec!["shelf_01", "shelf_02", "shelf_03", "shelf_04", "shelf_05"]
        );
    }

    fn nested_cones() -> AlignedShell {
        shell(vec![
            (
                30,
                FaceSignature::cone(DVec3::new(0.0, 0.0, 9.5), 900.0, DVec3::new(0.0, 0.0, 21.0)),
            ),
            (
                31,
                FaceSignature::cone(DVec3::new(0.0, 0.0, 9.5), 700.0, DVec3::new(0.0, 0.0, 14.6)),
            ),
            (32, FaceSignature::plane(DVec3::new(0.0, 0.0, 20.0), 78.5)),
        ])
    }

    #[test]
    fn test_nested_cones_ranked_by_apex() {
        let rules = RuleSet::new("cylinder")
            .rule(
                Rule::new(
                    "taper",
                    Condition::kind(SurfaceKind::Cone),
                    LabelTemplate::ranked(["bottom_taper", "top_taper"]),
                )
                .order_by(DiscriminantKind::ApexHeight { axis: Axis::Z }),
            )
            .rule(Rule::new(
                "top",
                Condition::kind(SurfaceKind::Plane),
                LabelTemplate::fixed("top"),
            ));
        let labels = classify_shell(&nested_cones(), &rules).unwrap();
        assert_eq!(labels.assignment.get(31), Some("bottom_taper"));
        assert_eq!(labels.assignment.get(30), Some("top_taper"));
        assert_eq!(labels.assignment.get(32), Some("top"));
        assert!(labels.warnings.is_empty());
    }

    #[test]
    fn test_nested_cones_by_apex_ranges() {
        // Same centroid, so only the apex separates the two tapers.
        let cone = |lo: Option<f64>, hi: Option<f64>| {
            Condition::kind(SurfaceKind::Cone).and(Condition::range(Quantity::ApexZ, lo, hi))
        };
        let rules = RuleSet::new("cylinder")
            .rule(Rule::new(
                "top_taper",
                cone(Some(18.0), None),
                LabelTemplate::fixed("top_taper"),
            ))
            .rule(Rule::new(
                "bottom_taper",
                cone(None, Some(18.0)),
                LabelTemplate::fixed("bottom_taper"),
            ));
        let labels = classify_shell(&nested_cones(), &rules).unwrap();
        assert_eq!(labels.assignment.get(30), Some("top_taper"));
        assert_eq!(labels.assignment.get(31), Some("bottom_taper"));
        assert_eq!(
            labels.warnings,
            vec![Warning::UnmatchedFace {
                shell_index: 0,
                entity_id: 32
            }]
        );
    }

    #[test]
    fn test_full_tie_is_ambiguous() {
        // Both cones have the same centroid; ordering by height cannot separate them.
        let rules = RuleSet::new("cylinder").rule(
            Rule::new(
                "taper",
                Condition::kind(SurfaceKind::Cone),
                LabelTemplate::parse("taper_{index}"),
            )
            .order_by(DiscriminantKind::Height { axis: Axis::Z })
            .order_by(DiscriminantKind::Radial { axis: Axis::Z }),
        );
        match classify_shell(&nested_cones(), &rules) {
            Err(ClassifyError::Ambiguity {
                rule,
                entity_ids,
                signatures,
                ..
            }) => {
                assert_eq!(rule, "taper");
                assert_eq!(entity_ids.len(), 2);
                assert!(entity_ids.contains(&30) && entity_ids.contains(&31));
                assert_eq!(signatures.len(), 2);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_keys_within_tolerance_tie() {
        let faces = shell(vec![(1, shelf_at(10.0)), (2, shelf_at(10.004))]);
        assert!(matches!(
            classify_shell(&faces, &shelf_rule(DiscriminantKind::Angle)),
            Err(ClassifyError::Ambiguity { .. })
        ));
    }

    fn shelf_at_height(deg: f64, z: f64) -> FaceSignature {
        let r = deg.to_radians();
        FaceSignature::plane(DVec3::new(50.0 * r.cos(), 50.0 * r.sin(), z), 40.0)
    }

    #[test]
    fn test_tie_on_first_key_falls_through() {
        // 0.00499 and 0.00501 straddle a multiple of half the tolerance.
        let faces = shell(vec![
            (1, shelf_at_height(90.0, 0.00499)),
            (2, shelf_at_height(0.0, 0.00501)),
        ]);
        let rules = RuleSet::new("disc").rule(
            Rule::new(
                "shelf",
                Condition::kind(SurfaceKind::Plane),
                LabelTemplate::parse("shelf_{index}"),
            )
            .order_by(DiscriminantKind::Height { axis: Axis::Z })
            .order_by(DiscriminantKind::Angle)
            .with_tolerance(0.01),
        );
        let labels = classify_shell(&faces, &rules).unwrap();
        assert_eq!(labels.assignment.get(2), Some("shelf_01"));
        assert_eq!(labels.assignment.get(1), Some("shelf_02"));
    }

    #[test]
    fn test_close_keys_tie_across_rounding_boundary() {
        let faces = shell(vec![
            (1, shelf_at_height(90.0, 0.00499)),
            (2, shelf_at_height(0.0, 0.00501)),
        ]);
        match classify_shell(&faces, &shelf_rule(DiscriminantKind::Height { axis: Axis::Z })) {
            Err(ClassifyError::Ambiguity { entity_ids, .. }) => assert_eq!(entity_ids, vec![1, 2]),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_keys_beyond_tolerance_are_ordered() {
        let faces = shell(vec![
            (1, shelf_at_height(0.0, 0.03)),
            (2, shelf_at_height(0.0, 0.0)),
            (3, shelf_at_height(0.0, 0.015)),
        ]);
        let labels =
            classify_shell(&faces, &shelf_rule(DiscriminantKind::Height { axis: Axis::Z })).unwrap();
        assert_eq!(labels.assignment.get(2), Some("shelf_01"));
        assert_eq!(labels.assignment.get(3), Some("shelf_02"));
        assert_eq!(labels.assignment.get(1), Some("shelf_03"));
    }

    #[test]
    fn test_large_family_shares_one_width() {
        let faces = shell(
            (0..100)
                .map(|i| (1000 + i as EntityId, shelf_at(i as f64 * 3.6)))
                .collect(),
        );
        let labels = classify_shell(&faces, &shelf_rule(DiscriminantKind::Bearing)).unwrap();
        assert_eq!(labels.assignment.len(), 100);
        assert_eq!(labels.assignment.get(1000), Some("shelf_001"));
        assert_eq!(labels.assignment.get(1009), Some("shelf_010"));
        assert_eq!(labels.assignment.get(1099), Some("shelf_100"));
        assert!(labels.assignment.iter().all(|(_, l)| l.len() == "shelf_100".len()));
    }

    fn bolt_holes(degrees: &[f64]) -> AlignedShell {
        shell(
            degrees
                .iter()
                .enumerate()
                .map(|(i, &deg)| {
                    let r = deg.to_radians();
                    let centroid = DVec3::new(55.0 * r.cos(), 55.0 * r.sin(), 3.0);
                    (200 + i as EntityId, FaceSignature::cylinder(centroid, 60.0, 5.0))
                })
                .collect(),
        )
    }

    fn hole_rule() -> RuleSet {
        RuleSet::new("spider").rule(Rule::new(
            "hole",
            Condition::kind(SurfaceKind::Cylinder),
            LabelTemplate::even_sectors("bolt.hole_{index}", 0.0, 5),
        ))
    }

    #[test]
    fn test_sector_numbering_survives_missing_face() {
        // The hole nearest 144 degrees is absent; centroids sit a little off the arms.
        let labels = classify_shell(&bolt_holes(&[357.0, 74.0, 213.0, 290.0]), &hole_rule()).unwrap();
        assert_eq!(labels.assignment.get(200), Some("bolt.hole_01"));
        assert_eq!(labels.assignment.get(201), Some("bolt.hole_02"));
        assert_eq!(labels.assignment.get(202), Some("bolt.hole_04"));
        assert_eq!(labels.assignment.get(203), Some("bolt.hole_05"));
        assert_eq!(labels.families.get("hole"), Some(&4));
    }

    #[test]
    fn test_two_faces_in_one_sector() {
        match classify_shell(&bolt_holes(&[0.0, 70.0, 74.0]), &hole_rule()) {
            Err(ClassifyError::DuplicateLabel { label, entity_ids, .. }) => {
                assert_eq!(label, "bolt.hole_02");
                assert_eq!(entity_ids, vec![201, 202]);
            }
            other => panic!("expected duplicate label, got {other:?}"),
        }
    }

    #[test]
    fn test_family_without_discriminants_is_ambiguous() {
        let rules = RuleSet::new("p").rule(Rule::new(
            "shelf",
            Condition::kind(SurfaceKind::Plane),
            LabelTemplate::parse("shelf_{index}"),
        ));
        assert!(matches!(
            classify_shell(&five_shelves(), &rules),
            Err(ClassifyError::Ambiguity { .. })
        ));
    }

    #[test]
    fn test_fixed_label_on_many_faces() {
        let rules = RuleSet::new("p").rule(Rule::new(
            "shelf",
            Condition::kind(SurfaceKind::Plane),
            LabelTemplate::fixed("shelf"),
        ));
        match classify_shell(&five_shelves(), &rules) {
            Err(ClassifyError::DuplicateLabel { label, entity_ids, .. }) => {
                assert_eq!(label, "shelf");
                assert_eq!(entity_ids, vec![100, 101, 102, 103, 104]);
            }
            other => panic!("expected duplicate label, got {other:?}"),
        }
    }

    #[test]
    fn test_two_rules_same_label() {
        let rules = RuleSet::new("p")
            .rule(Rule::new(
                "low",
                Condition::range(Quantity::ApexZ, None, Some(18.0)),
                LabelTemplate::fixed("taper"),
            ))
            .rule(Rule::new(
                "high",
                Condition::range(Quantity::ApexZ, Some(18.0), None),
                LabelTemplate::fixed("taper"),
            ));
        assert!(matches!(
            classify_shell(&nested_cones(), &rules),
            Err(ClassifyError::DuplicateLabel { .. })
        ));
    }

    #[test]
    fn test_ranked_count_mismatch() {
        let rules = RuleSet::new("p").rule(
            Rule::new(
                "taper",
                Condition::kind(SurfaceKind::Cone),
                LabelTemplate::ranked(["only_taper"]),
            )
            .order_by(DiscriminantKind::ApexHeight { axis: Axis::Z }),
        );
        assert!(matches!(
            classify_shell(&nested_cones(), &rules),
            Err(ClassifyError::RankedCountMismatch {
                expected: 1,
                matched: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_fallback_and_warnings() {
        let rules = RuleSet::new("p")
            .rule(Rule::new(
                "top",
                Condition::kind(SurfaceKind::Plane),
                LabelTemplate::fixed("top"),
            ))
            .rule(Rule::new(
                "sphere",
                Condition::kind(SurfaceKind::Sphere),
                LabelTemplate::fixed("dome"),
            ))
            .with_fallback(LabelTemplate::parse("face_{index}"));
        let labels = classify_shell(&nested_cones(), &rules).unwrap();
        assert_eq!(labels.assignment.get(30), Some("face_01"));
        assert_eq!(labels.assignment.get(31), Some("face_02"));
        assert_eq!(labels.families.get(FALLBACK_FAMILY), Some(&2));
        assert!(labels.warnings.contains(&Warning::RuleMatchedNothing {
            shell_index: 0,
            rule: "sphere".into()
        }));
        assert_eq!(
            labels
                .warnings
                .iter()
                .filter(|w| matches!(w, Warning::FallbackLabel { .. }))
                .count(),
            2
        );
        // Enumeration order is kept in the assignment.
        let ids: Vec<_> = labels.assignment.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![30, 31, 32]);
    }

    #[test]
    fn test_priority_decides_family() {
        let rules = RuleSet::new("p")
            .rule(Rule::new(
                "any_plane",
                Condition::kind(SurfaceKind::Plane),
                LabelTemplate::fixed("plane"),
            ))
            .rule(
                Rule::new(
                    "top",
                    Condition::NearTop {
                        axis: Axis::Z,
                        tolerance: 0.01,
                    },
                    LabelTemplate::fixed("top"),
                )
                .with_priority(10),
            );
        let labels = classify_shell(&nested_cones(), &rules).unwrap();
        assert_eq!(labels.assignment.get(32), Some("top"));
        assert!(labels.warnings.contains(&Warning::RuleMatchedNothing {
            shell_index: 0,
            rule: "any_plane".into()
        }));
    }

    #[test]
    fn test_shells_classified_independently() {
        let mut second = nested_cones();
        second.shell_index = 1;
        second.shell_id = 2;
        let rules = shelf_rule(DiscriminantKind::Bearing);
        let out = classify_shells(&[five_shelves(), second], &rules).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].assignment.len(), 5);
        // A single plane in the second shell restarts the family numbering.
        assert_eq!(out[1].assignment.get(32), Some("shelf_01"));
    }

    #[test]
    fn test_first_error_in_shell_order() {
        let mut second = five_shelves();
        second.shell_index = 1;
        let mut third = five_shelves();
        third.shell_index = 2;
        let rules = RuleSet::new("p").rule(Rule::new(
            "plane",
            Condition::kind(SurfaceKind::Plane),
            LabelTemplate::fixed("plane"),
        ));
        let err = classify_shells(&[nested_cones(), second, third], &rules).unwrap_err();
        assert!(matches!(err, ClassifyError::DuplicateLabel { shell_index: 1, .. }));
    }

    proptest! {
        #[test]
        fn prop_order_independent_and_unique(
            steps in proptest::collection::btree_set(0u32..36, 2..10)
                .prop_map(|s| s.into_iter().collect::<Vec<_>>())
                .prop_shuffle()
        ) {
            let faces: Vec<_> = steps
                .iter()
                .map(|&s| (s as EntityId + 1000, shelf_at(s as f64 * 10.0)))
                .collect();
            let mut reversed = faces.clone();
            reversed.reverse();
            let rules = shelf_rule(DiscriminantKind::Angle);

            let a = classify_shell(&shell(faces), &rules).unwrap();
            let b = classify_shell(&shell(reversed), &rules).unwrap();
            for (id, label) in a.assignment.iter() {
                prop_assert_eq!(b.assignment.get(id), Some(label));
            }
            let mut seen: Vec<_> = a.assignment.iter().map(|(_, l)| l.to_string()).collect();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), steps.len());
        }
    }
}

//! Face predicates: which faces a rule applies to.

use serde::{Deserialize, Serialize};

use facemark_core::{Axis, FaceSignature, ShellContext, SurfaceKind};

/// Decides whether a rule applies to a face.
///
/// Implemented by the declarative [`Condition`] and by any
/// `Fn(&FaceSignature, &ShellContext) -> bool`, so part-specific tests can be
/// added without touching the engine.
pub trait FacePredicate: Send + Sync {
    fn matches(&self, signature: &FaceSignature, context: &ShellContext) -> bool;
}

impl<F> FacePredicate for F
where
    F: Fn(&FaceSignature, &ShellContext) -> bool + Send + Sync,
{
    fn matches(&self, signature: &FaceSignature, context: &ShellContext) -> bool {
        self(signature, context)
    }
}

/// A scalar measured from a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    CentroidX,
    CentroidY,
    CentroidZ,
    /// Centroid distance from the Z axis.
    Radial,
    Radius,
    Area,
    /// Z coordinate of a cone apex.
    ApexZ,
    SpanExtent,
    /// Centroid angle in degrees, `[-180, 180)`.
    Angle,
    /// Centroid angle in degrees, `[0, 360)`.
    Bearing,
    AngularPosition,
}

impl Quantity {
    /// The measured value, or `None` when the signature lacks it.
    pub fn measure(&self, sig: &FaceSignature) -> Option<f64> {
        match self {
            Quantity::CentroidX => Some(sig.centroid.x),
            Quantity::CentroidY => Some(sig.centroid.y),
            Quantity::CentroidZ => Some(sig.centroid.z),
            Quantity::Radial => Some(Axis::Z.radial_distance(sig.centroid)),
            Quantity::Radius => sig.radius,
            Quantity::Area => Some(sig.area),
            Quantity::ApexZ => sig.apex_point.map(|p| p.z),
            Quantity::SpanExtent => sig.span_extent,
            Quantity::Angle => Some(sig.angle_deg()),
            Quantity::Bearing => Some(sig.bearing_deg()),
            Quantity::AngularPosition => sig.angular_position,
        }
    }
}

fn default_tolerance() -> f64 {
    0.01
}

/// Declarative predicate, loadable from rule configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Always,
    SurfaceKind(SurfaceKind),
    /// `|quantity - value| <= tolerance`
    Near {
        quantity: Quantity,
        value: f64,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    /// `min <= quantity <= max`, either bound optional.
    Range {
        quantity: Quantity,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Centroid within `tolerance` of the shell's highest centroid along `axis`.
    NearTop {
        #[serde(default)]
        axis: Axis,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    /// Centroid within `tolerance` of the shell's lowest centroid along `axis`.
    NearBottom {
        #[serde(default)]
        axis: Axis,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    AboveMidplane {
        #[serde(default)]
        axis: Axis,
    },
    BelowMidplane {
        #[serde(default)]
        axis: Axis,
    },
    /// Plane normal within `acos(min_dot)` of `axis`, either sense.
    NormalAlong { axis: Axis, min_dot: f64 },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn kind(kind: SurfaceKind) -> Self {
        Condition::SurfaceKind(kind)
    }

    pub fn near(quantity: Quantity, value: f64, tolerance: f64) -> Self {
        Condition::Near {
            quantity,
            value,
            tolerance,
        }
    }

    pub fn range(quantity: Quantity, min: Option<f64>, max: Option<f64>) -> Self {
        Condition::Range { quantity, min, max }
    }

    /// Both this condition and `other`.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::All(mut all) => {
                all.push(other);
                Condition::All(all)
            }
            first => Condition::All(vec![first, other]),
        }
    }
}

impl FacePredicate for Condition {
    fn matches(&self, sig: &FaceSignature, ctx: &ShellContext) -> bool {
        match self {
            Condition::Always => true,
            Condition::SurfaceKind(kind) => sig.surface_kind == *kind,
            Condition::Near {
                quantity,
                value,
                tolerance,
            } => quantity
                .measure(sig)
                .is_some_and(|v| (v - value).abs() <= *tolerance),
            Condition::Range { quantity, min, max } => quantity.measure(sig).is_some_and(|v| {
                min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi)
            }),
            Condition::NearTop { axis, tolerance } => {
                (axis.component(sig.centroid) - ctx.upper_bound(*axis)).abs() <= *tolerance
            }
            Condition::NearBottom { axis, tolerance } => {
                (axis.component(sig.centroid) - ctx.lower_bound(*axis)).abs() <= *tolerance
            }
            Condition::AboveMidplane { axis } => axis.component(sig.centroid) > ctx.midplane(*axis),
            Condition::BelowMidplane { axis } => axis.component(sig.centroid) < ctx.midplane(*axis),
            Condition::NormalAlong { axis, min_dot } => sig
                .normal
                .is_some_and(|n| n.normalize_or_zero().dot(axis.unit()).abs() >= *min_dot),
            Condition::All(all) => all.iter().all(|c| c.matches(sig, ctx)),
            Condition::Any(any) => any.iter().any(|c| c.matches(sig, ctx)),
            Condition::Not(inner) => !inner.matches(sig, ctx),
        }
    }
}

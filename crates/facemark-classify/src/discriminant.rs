//! Tie-break discriminants for ordering faces of one family.

use serde::{Deserialize, Serialize};

use facemark_core::{Axis, FaceSignature, ShellContext};

/// Produces an orderable key for a face.
///
/// Faces of an indexed family are sorted lexicographically by the keys of the
/// rule's discriminants. A face without a key sorts before every face with one.
pub trait Discriminant: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> String;

    fn key(&self, signature: &FaceSignature, context: &ShellContext) -> Option<f64>;
}

/// The built-in discriminants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscriminantKind {
    /// Centroid angle about Z, `[-180, 180)`.
    Angle,
    /// Centroid angle about Z, `[0, 360)`.
    Bearing,
    /// Centroid distance from an axis through the origin.
    Radial {
        #[serde(default)]
        axis: Axis,
    },
    /// Centroid coordinate along an axis.
    Height {
        #[serde(default)]
        axis: Axis,
    },
    /// Cone apex coordinate along an axis.
    ApexHeight {
        #[serde(default)]
        axis: Axis,
    },
    Area,
    SpanExtent,
    Radius,
    AngularPosition,
    /// The inner key, negated.
    Descending(Box<DiscriminantKind>),
}

impl DiscriminantKind {
    pub fn descending(self) -> Self {
        DiscriminantKind::Descending(Box::new(self))
    }
}

impl Discriminant for DiscriminantKind {
    fn name(&self) -> String {
        match self {
            DiscriminantKind::Angle => "angle".into(),
            DiscriminantKind::Bearing => "bearing".into(),
            DiscriminantKind::Radial { axis } => format!("radial_{axis:?}").to_lowercase(),
            DiscriminantKind::Height { axis } => format!("height_{axis:?}").to_lowercase(),
            DiscriminantKind::ApexHeight { axis } => format!("apex_{axis:?}").to_lowercase(),
            DiscriminantKind::Area => "area".into(),
            DiscriminantKind::SpanExtent => "span_extent".into(),
            DiscriminantKind::Radius => "radius".into(),
            DiscriminantKind::AngularPosition => "angular_position".into(),
            DiscriminantKind::Descending(inner) => format!("-{}", inner.name()),
        }
    }

    fn key(&self, sig: &FaceSignature, ctx: &ShellContext) -> Option<f64> {
        match self {
            DiscriminantKind::Angle => Some(sig.angle_deg()),
            DiscriminantKind::Bearing => Some(sig.bearing_deg()),
            DiscriminantKind::Radial { axis } => Some(axis.radial_distance(sig.centroid)),
            DiscriminantKind::Height { axis } => Some(axis.component(sig.centroid)),
            DiscriminantKind::ApexHeight { axis } => sig.apex_point.map(|p| axis.component(p)),
            DiscriminantKind::Area => Some(sig.area),
            DiscriminantKind::SpanExtent => sig.span_extent,
            DiscriminantKind::Radius => sig.radius,
            DiscriminantKind::AngularPosition => sig.angular_position,
            DiscriminantKind::Descending(inner) => inner.key(sig, ctx).map(|k| -k),
        }
    }
}

/// A discriminant backed by a closure.
pub struct KeyFn<F> {
    name: String,
    key: F,
}

impl<F> KeyFn<F>
where
    F: Fn(&FaceSignature, &ShellContext) -> Option<f64> + Send + Sync,
{
    pub fn new(name: impl Into<String>, key: F) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }
}

impl<F> Discriminant for KeyFn<F>
where
    F: Fn(&FaceSignature, &ShellContext) -> Option<f64> + Send + Sync,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn key(&self, signature: &FaceSignature, context: &ShellContext) -> Option<f64> {
        (self.key)(signature, context)
    }
}

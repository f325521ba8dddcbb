//! Geometric face signatures.
//!
//! Signatures are computed by the geometry kernel, one per face in the
//! kernel's iteration order. The labeling engine only consumes them.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// The analytic type of a face's underlying surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// `PLANE`
    Plane,
    /// `CYLINDRICAL_SURFACE`; the signature carries its radius and axis.
    Cylinder,
    /// `CONICAL_SURFACE`; the signature carries its apex.
    Cone,
    /// `SPHERICAL_SURFACE`
    Sphere,
    /// `TOROIDAL_SURFACE`, typically a fillet.
    Torus,
    /// Any `B_SPLINE_SURFACE` form, including lofts.
    BSplineSurface,
    /// `SURFACE_OF_REVOLUTION`
    SurfaceOfRevolution,
    /// Anything the kernel does not classify.
    Other,
}

impl SurfaceKind {
    /// The snake_case name used in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::Plane => "plane",
            SurfaceKind::Cylinder => "cylinder",
            SurfaceKind::Cone => "cone",
            SurfaceKind::Sphere => "sphere",
            SurfaceKind::Torus => "torus",
            SurfaceKind::BSplineSurface => "b_spline_surface",
            SurfaceKind::SurfaceOfRevolution => "surface_of_revolution",
            SurfaceKind::Other => "other",
        }
    }
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A principal axis of the part coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    /// Unit vector along this axis.
    pub fn unit(&self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }

    /// Component of `v` along this axis.
    pub fn component(&self, v: DVec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    /// Distance of `v` from the line through the origin along this axis.
    pub fn radial_distance(&self, v: DVec3) -> f64 {
        match self {
            Axis::X => v.y.hypot(v.z),
            Axis::Y => v.x.hypot(v.z),
            Axis::Z => v.x.hypot(v.y),
        }
    }
}

/// Geometric description of one face.
///
/// Kind-specific parameters are optional; a cylinder carries `radius` and
/// `axis_direction`, a cone additionally `apex_point`, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSignature {
    pub surface_kind: SurfaceKind,
    pub centroid: DVec3,
    pub area: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_direction: Option<DVec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apex_point: Option<DVec3>,
    /// Angular position in degrees, when the kernel reports one directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angular_position: Option<f64>,
    /// Width of the face's bounding span (e.g. Y extent of its bounding box).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_extent: Option<f64>,
    /// Plane normal, for planar faces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<DVec3>,
}

impl FaceSignature {
    /// A signature with only the mandatory fields set.
    pub fn new(surface_kind: SurfaceKind, centroid: DVec3, area: f64) -> Self {
        Self {
            surface_kind,
            centroid,
            area,
            radius: None,
            axis_direction: None,
            apex_point: None,
            angular_position: None,
            span_extent: None,
            normal: None,
        }
    }

    pub fn plane(centroid: DVec3, area: f64) -> Self {
        Self::new(SurfaceKind::Plane, centroid, area)
    }

    pub fn cylinder(centroid: DVec3, area: f64, radius: f64) -> Self {
        Self::new(SurfaceKind::Cylinder, centroid, area).with_radius(radius)
    }

    pub fn cone(centroid: DVec3, area: f64, apex: DVec3) -> Self {
        Self::new(SurfaceKind::Cone, centroid, area).with_apex(apex)
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_axis(mut self, axis: DVec3) -> Self {
        self.axis_direction = Some(axis);
        self
    }

    pub fn with_apex(mut self, apex: DVec3) -> Self {
        self.apex_point = Some(apex);
        self
    }

    pub fn with_normal(mut self, normal: DVec3) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_span_extent(mut self, extent: f64) -> Self {
        self.span_extent = Some(extent);
        self
    }

    pub fn with_angular_position(mut self, degrees: f64) -> Self {
        self.angular_position = Some(degrees);
        self
    }

    /// `atan2(centroid.y, centroid.x)` in degrees, normalized to `[-180, 180)`.
    pub fn angle_deg(&self) -> f64 {
        normalize_signed_deg(self.centroid.y.atan2(self.centroid.x).to_degrees())
    }

    /// The centroid angle in degrees, normalized to `[0, 360)`.
    pub fn bearing_deg(&self) -> f64 {
        self.angle_deg().rem_euclid(360.0)
    }
}

/// Normalize an angle in degrees to `[-180, 180)`.
pub fn normalize_signed_deg(degrees: f64) -> f64 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Per-shell facts computed from the full signature set of that shell.
///
/// Predicates that speak of "the top of the part" measure against these bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellContext {
    pub shell_index: usize,
    pub shell_id: EntityId,
    pub face_count: usize,
    /// Component-wise minimum of all face centroids.
    pub centroid_min: DVec3,
    /// Component-wise maximum of all face centroids.
    pub centroid_max: DVec3,
}

impl ShellContext {
    pub fn from_signatures<'a>(
        shell_index: usize,
        shell_id: EntityId,
        signatures: impl IntoIterator<Item = &'a FaceSignature>,
    ) -> Self {
        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        let mut count = 0;
        for sig in signatures {
            min = min.min(sig.centroid);
            max = max.max(sig.centroid);
            count += 1;
        }
        if count == 0 {
            min = DVec3::ZERO;
            max = DVec3::ZERO;
        }
        Self {
            shell_index,
            shell_id,
            face_count: count,
            centroid_min: min,
            centroid_max: max,
        }
    }

    /// Midpoint of the centroid bounds along `axis`.
    pub fn midplane(&self, axis: Axis) -> f64 {
        (axis.component(self.centroid_min) + axis.component(self.centroid_max)) / 2.0
    }

    pub fn lower_bound(&self, axis: Axis) -> f64 {
        axis.component(self.centroid_min)
    }

    pub fn upper_bound(&self, axis: Axis) -> f64 {
        axis.component(self.centroid_max)
    }
}

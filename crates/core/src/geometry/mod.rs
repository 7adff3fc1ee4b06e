//! Rotation of planar points about an axis that lies in the plane.
//!
//! Each rotated copy of a dial gets its own axis running from the shared
//! anchor towards that copy's center. Rotating about that axis keeps the
//! axis-aligned part of a point in the plane and pushes the perpendicular
//! part into a scalar `height`, which renderers use as a depth cue. Points on
//! the axis, the anchor in particular, never move.

use serde::{Deserialize, Serialize};

/// Axis lengths and angles below this are treated as zero.
pub const GEOMETRY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl std::ops::Sub for Point2D {
    type Output = Point2D;

    fn sub(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis direction of unit length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitVector2D {
    x: f64,
    y: f64,
}

impl UnitVector2D {
    /// Normalises `v`, or returns `None` when it is too short to have a
    /// direction.
    pub fn new(v: Point2D) -> Option<Self> {
        let length = v.length();
        if !length.is_finite() || length <= GEOMETRY_EPSILON {
            return None;
        }
        Some(Self {
            x: v.x / length,
            y: v.y / length,
        })
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }
}

/// Axis through `axis_point` along `axis_unit`. A missing unit vector marks
/// a degenerate axis; rotating through it is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationContext {
    pub axis_point: Option<Point2D>,
    pub axis_unit: Option<UnitVector2D>,
}

impl RotationContext {
    pub fn is_degenerate(&self) -> bool {
        self.axis_point.is_none() || self.axis_unit.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotatedPoint {
    pub x: f64,
    pub y: f64,
    /// Out-of-plane displacement. Shading only, never hit-testing.
    pub height: f64,
}

impl RotatedPoint {
    pub fn position(self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Builds the axis from `anchor` towards `copy_center`.
pub fn create_axis_rotation_context(
    anchor: Option<Point2D>,
    copy_center: Option<Point2D>,
) -> RotationContext {
    let (Some(anchor), Some(center)) = (anchor, copy_center) else {
        return RotationContext {
            axis_point: anchor,
            axis_unit: None,
        };
    };
    RotationContext {
        axis_point: Some(anchor),
        axis_unit: UnitVector2D::new(center - anchor),
    }
}

/// Rotates `point` by `angle` radians about the context's axis.
pub fn rotate_point_around_axis_on_plane(
    point: Point2D,
    context: &RotationContext,
    angle: f64,
) -> RotatedPoint {
    let unchanged = RotatedPoint {
        x: point.x,
        y: point.y,
        height: 0.0,
    };
    let (Some(axis_point), Some(u)) = (context.axis_point, context.axis_unit) else {
        return unchanged;
    };
    if !angle.is_finite() || angle.abs() <= GEOMETRY_EPSILON {
        return unchanged;
    }

    let v = point - axis_point;
    let dot = v.x * u.x + v.y * u.y;
    let cross_z = u.x * v.y - u.y * v.x;
    let (sin, cos) = angle.sin_cos();
    let axial = dot * (1.0 - cos);

    RotatedPoint {
        x: axis_point.x + v.x * cos + u.x * axial,
        y: axis_point.y + v.y * cos + u.y * axial,
        height: cross_z * sin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn context(anchor: Point2D, center: Point2D) -> RotationContext {
        create_axis_rotation_context(Some(anchor), Some(center))
    }

    #[test]
    fn anchor_stays_fixed_for_every_copy() {
        let anchor = Point2D::new(3.5, -1.25);
        let centers = [
            Point2D::new(10.0, 0.0),
            Point2D::new(-4.0, 7.0),
            Point2D::new(3.5, 20.0),
            Point2D::new(0.1, -0.3),
        ];
        for center in centers {
            let ctx = context(anchor, center);
            for step in 0..=24 {
                let angle = -PI + step as f64 * PI / 12.0;
                let rotated = rotate_point_around_axis_on_plane(anchor, &ctx, angle);
                assert_eq!(rotated.x, anchor.x);
                assert_eq!(rotated.y, anchor.y);
                assert_eq!(rotated.height, 0.0);
            }
        }
    }

    #[test]
    fn zero_angle_is_identity() {
        let ctx = context(Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0));
        let point = Point2D::new(-2.0, 5.0);
        let rotated = rotate_point_around_axis_on_plane(point, &ctx, 0.0);
        assert_eq!(rotated, RotatedPoint { x: -2.0, y: 5.0, height: 0.0 });
    }

    #[test]
    fn degenerate_axis_is_identity() {
        let anchor = Point2D::new(1.0, 1.0);
        let ctx = context(anchor, anchor);
        assert!(ctx.axis_unit.is_none());
        assert!(ctx.is_degenerate());

        let point = Point2D::new(4.0, -3.0);
        let rotated = rotate_point_around_axis_on_plane(point, &ctx, 1.2);
        assert_eq!(rotated.position(), point);
        assert_eq!(rotated.height, 0.0);
    }

    #[test]
    fn missing_inputs_produce_degenerate_context() {
        let anchor = Point2D::new(2.0, 2.0);
        let ctx = create_axis_rotation_context(Some(anchor), None);
        assert_eq!(ctx.axis_point, Some(anchor));
        assert!(ctx.axis_unit.is_none());

        let ctx = create_axis_rotation_context(None, Some(anchor));
        assert!(ctx.axis_point.is_none());
        let rotated = rotate_point_around_axis_on_plane(anchor, &ctx, 0.7);
        assert_eq!(rotated.position(), anchor);
    }

    #[test]
    fn quarter_turn_lifts_perpendicular_component() {
        // Axis along +x through the origin.
        let ctx = context(Point2D::new(0.0, 0.0), Point2D::new(5.0, 0.0));

        let on_axis = rotate_point_around_axis_on_plane(Point2D::new(2.0, 0.0), &ctx, FRAC_PI_2);
        assert!((on_axis.x - 2.0).abs() < 1e-12);
        assert!(on_axis.y.abs() < 1e-12);
        assert!(on_axis.height.abs() < 1e-12);

        let off_axis = rotate_point_around_axis_on_plane(Point2D::new(0.0, 3.0), &ctx, FRAC_PI_2);
        assert!(off_axis.x.abs() < 1e-12);
        assert!(off_axis.y.abs() < 1e-12);
        assert!((off_axis.height - 3.0).abs() < 1e-12);
    }

    #[test]
    fn half_turn_mirrors_across_axis() {
        let ctx = context(Point2D::new(1.0, 1.0), Point2D::new(1.0, 4.0));
        let rotated = rotate_point_around_axis_on_plane(Point2D::new(3.0, 2.0), &ctx, PI);

        assert!((rotated.x + 1.0).abs() < 1e-12);
        assert!((rotated.y - 2.0).abs() < 1e-12);
        assert!(rotated.height.abs() < 1e-12);
    }

    #[test]
    fn rotation_preserves_distance_from_axis() {
        let ctx = context(Point2D::new(-1.0, 2.0), Point2D::new(3.0, 5.0));
        let point = Point2D::new(4.0, -2.0);
        let axis = ctx.axis_unit.unwrap();
        let v = point - ctx.axis_point.unwrap();
        let perpendicular = (axis.x() * v.y - axis.y() * v.x).abs();

        for step in 1..12 {
            let angle = step as f64 * 0.5;
            let rotated = rotate_point_around_axis_on_plane(point, &ctx, angle);
            let w = rotated.position() - ctx.axis_point.unwrap();
            let in_plane = axis.x() * w.y - axis.y() * w.x;
            let radius = in_plane.hypot(rotated.height);
            assert!((radius - perpendicular).abs() < 1e-9);
        }
    }
}

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::geometry::{
    create_axis_rotation_context, rotate_point_around_axis_on_plane, Point2D, RotatedPoint,
    RotationContext,
};

/// Dial rotation for a cycle phase in `[0, 1)`.
pub fn dial_angle(phase: f64) -> f64 {
    phase.rem_euclid(1.0) * TAU
}

/// Brightness factor in `[0, 1]` for a point lifted by `height` on a dial
/// of the given radius. Flat points sit at 0.5.
pub fn shade(height: f64, radius: f64) -> f64 {
    if radius <= 0.0 || !height.is_finite() {
        return 0.5;
    }
    (0.5 + 0.5 * (height / radius)).clamp(0.0, 1.0)
}

/// Evenly spaced points on a circle, starting at angle zero.
pub fn dial_outline(center: Point2D, radius: f64, points: usize) -> Vec<Point2D> {
    (0..points)
        .map(|i| {
            let theta = TAU * i as f64 / points as f64;
            Point2D::new(center.x + radius * theta.cos(), center.y + radius * theta.sin())
        })
        .collect()
}

/// One rendered copy of the dial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectedCopy {
    pub center: Point2D,
    pub points: Vec<RotatedPoint>,
}

/// Copies of a shape that all hinge around one shared anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyLayout {
    pub anchor: Point2D,
    pub centers: Vec<Point2D>,
}

impl CopyLayout {
    pub fn new(anchor: Point2D, centers: Vec<Point2D>) -> Self {
        Self { anchor, centers }
    }

    /// `count` copy centers spread evenly on a ring of `radius` around the
    /// anchor.
    pub fn ring(anchor: Point2D, count: usize, radius: f64) -> Self {
        Self::new(anchor, dial_outline(anchor, radius, count))
    }

    pub fn contexts(&self) -> Vec<RotationContext> {
        self.centers
            .iter()
            .map(|center| create_axis_rotation_context(Some(self.anchor), Some(*center)))
            .collect()
    }

    /// Rotates `shape` through every copy's axis by `angle` radians.
    pub fn project(&self, shape: &[Point2D], angle: f64) -> Vec<ProjectedCopy> {
        self.centers
            .iter()
            .zip(self.contexts())
            .map(|(center, context)| ProjectedCopy {
                center: *center,
                points: shape
                    .iter()
                    .map(|point| rotate_point_around_axis_on_plane(*point, &context, angle))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_wraps_phase() {
        assert_eq!(dial_angle(0.0), 0.0);
        assert!((dial_angle(0.25) - TAU / 4.0).abs() < 1e-12);
        assert!((dial_angle(1.25) - TAU / 4.0).abs() < 1e-12);
    }

    #[test]
    fn shading_is_bounded() {
        assert_eq!(shade(0.0, 10.0), 0.5);
        assert_eq!(shade(25.0, 10.0), 1.0);
        assert_eq!(shade(-25.0, 10.0), 0.0);
        assert_eq!(shade(3.0, 0.0), 0.5);
    }

    #[test]
    fn anchor_is_shared_across_projected_copies() {
        let anchor = Point2D::new(100.0, 80.0);
        let layout = CopyLayout::ring(anchor, 5, 40.0);
        let mut shape = dial_outline(Point2D::new(110.0, 90.0), 25.0, 16);
        shape.push(anchor);

        let copies = layout.project(&shape, 1.1);
        assert_eq!(copies.len(), 5);
        for copy in &copies {
            let pivot = copy.points.last().copied().unwrap();
            assert_eq!(pivot.position(), anchor);
            assert_eq!(pivot.height, 0.0);
        }

        // Distinct axes move the other points differently.
        assert_ne!(copies[0].points[3], copies[1].points[3]);
    }

    #[test]
    fn outline_has_requested_resolution() {
        let outline = dial_outline(Point2D::new(0.0, 0.0), 2.0, 8);
        assert_eq!(outline.len(), 8);
        for point in outline {
            assert!((point.length() - 2.0).abs() < 1e-12);
        }
    }
}

//! Fundamental geometric types for model nodes and section outlines.

use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Position in three dimensional space in model units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Distance along the global X axis.
    pub x: f64,
    /// Distance along the global Y axis.
    pub y: f64,
    /// Distance along the global Z axis.
    pub z: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Drop the Z coordinate, projecting onto the section plane.
    #[must_use]
    pub fn to_plane(self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Scale every coordinate by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl From<Vector3<f64>> for Point {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Point> for Vector3<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use beamsec::point;
///
/// let origin = point(0.0, 0.0, 0.0);
/// assert_eq!(origin.x, 0.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64, z: f64) -> Point {
    Point::new(x, y, z)
}

/// Signed area of the triangle `a`, `b`, `c`; positive when counter-clockwise.
#[must_use]
pub fn signed_area(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y))
}

/// Signed area enclosed by a closed polygon (shoelace formula).
#[must_use]
pub fn polygon_area(vertices: &[Point2<f64>]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    0.5 * twice
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_to_vector_roundtrip() {
        let origin = Point::new(1.0, 2.0, 3.0);
        let vector: Vector3<f64> = origin.into();
        assert_eq!(vector, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(Point::from(vector), origin);
    }

    #[test]
    fn projection_drops_z() {
        let projected = point(4.0, -2.0, 9.0).to_plane();
        assert_eq!(projected, Point2::new(4.0, -2.0));
    }

    #[test]
    fn counter_clockwise_square_has_positive_area() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert!((polygon_area(&square) - 4.0).abs() < f64::EPSILON);
        let mut reversed = square;
        reversed.reverse();
        assert!((polygon_area(&reversed) + 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn triangle_orientation() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(0.0, 1.0);
        assert!((signed_area(&a, &b, &c) - 0.5).abs() < f64::EPSILON);
        assert!((signed_area(&a, &c, &b) + 0.5).abs() < f64::EPSILON);
    }
}

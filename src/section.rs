//! Cross-section meshing and section property integration.
//!
//! A section outline is a closed polygon in the XY plane. It is split into
//! triangles by ear clipping, cleaned of degenerate pieces, and integrated to
//! give the area, centroid and second moments of area that a beam property
//! needs. The result is written to a section definition file that a property
//! record can later be built from.

use std::fs;
use std::path::Path;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::errors::SectionError;
use crate::geometry::{polygon_area, signed_area};

/// A single meshed triangle in the section plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    /// Corner positions, counter-clockwise.
    pub vertices: [Point2<f64>; 3],
}

impl Triangle {
    /// Create a triangle from three corners.
    #[must_use]
    pub const fn new(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Signed area of the triangle.
    #[must_use]
    pub fn area(&self) -> f64 {
        let [a, b, c] = &self.vertices;
        signed_area(a, b, c)
    }

    /// Length of the longest edge.
    #[must_use]
    pub fn longest_edge(&self) -> f64 {
        let [a, b, c] = &self.vertices;
        nalgebra::distance(a, b)
            .max(nalgebra::distance(b, c))
            .max(nalgebra::distance(c, a))
    }

    /// Strict interior test; points on an edge are outside.
    fn contains(&self, p: &Point2<f64>) -> bool {
        let [a, b, c] = &self.vertices;
        signed_area(a, b, p) > 0.0 && signed_area(b, c, p) > 0.0 && signed_area(c, a, p) > 0.0
    }
}

/// Geometric properties of a cross-section about its centroid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionProperties {
    /// Cross-sectional area.
    pub area: f64,
    /// Centroid position in the section plane.
    pub centroid: [f64; 2],
    /// Second moment of area about the centroidal X axis.
    pub ixx: f64,
    /// Second moment of area about the centroidal Y axis.
    pub iyy: f64,
    /// Product of inertia about the centroidal axes.
    pub ixy: f64,
}

impl SectionProperties {
    /// Integrate a triangulated section.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::ZeroArea`] when the triangles enclose no area.
    pub fn from_triangles(triangles: &[Triangle]) -> Result<Self, SectionError> {
        let mut area = 0.0;
        let mut first_x = 0.0;
        let mut first_y = 0.0;
        let mut ixx = 0.0;
        let mut iyy = 0.0;
        let mut ixy = 0.0;
        for triangle in triangles {
            let a = triangle.area();
            let [p1, p2, p3] = triangle.vertices;
            let (x1, x2, x3) = (p1.x, p2.x, p3.x);
            let (y1, y2, y3) = (p1.y, p2.y, p3.y);
            area += a;
            first_x += a * (x1 + x2 + x3) / 3.0;
            first_y += a * (y1 + y2 + y3) / 3.0;
            ixx += a / 6.0 * (y1 * y1 + y2 * y2 + y3 * y3 + y1 * y2 + y2 * y3 + y3 * y1);
            iyy += a / 6.0 * (x1 * x1 + x2 * x2 + x3 * x3 + x1 * x2 + x2 * x3 + x3 * x1);
            ixy += a / 12.0
                * (2.0 * (x1 * y1 + x2 * y2 + x3 * y3)
                    + x1 * y2
                    + x2 * y1
                    + x1 * y3
                    + x3 * y1
                    + x2 * y3
                    + x3 * y2);
        }
        if area.abs() <= f64::EPSILON {
            return Err(SectionError::ZeroArea);
        }
        let cx = first_x / area;
        let cy = first_y / area;
        Ok(Self {
            area,
            centroid: [cx, cy],
            ixx: ixx - area * cy * cy,
            iyy: iyy - area * cx * cx,
            ixy: ixy - area * cx * cy,
        })
    }

    /// Polar second moment of area about the centroid.
    #[must_use]
    pub fn polar(&self) -> f64 {
        self.ixx + self.iyy
    }
}

/// Section definition file as written by the geometry pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionFile {
    /// Name of the section, taken from the source geometry file.
    pub name: String,
    /// Number of triangles the section was integrated over.
    pub triangles: usize,
    /// Integrated section properties.
    pub properties: SectionProperties,
}

impl SectionFile {
    /// Read a section file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::Io`] if the file cannot be read and
    /// [`SectionError::Format`] if it does not decode.
    pub fn read(path: &Path) -> Result<Self, SectionError> {
        let text = fs::read_to_string(path).map_err(|source| SectionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SectionError::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the section file to disk, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::Io`] if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), SectionError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| SectionError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(|source| SectionError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Remove consecutive vertices that lie within `tolerance` of each other,
/// including the wrap from the last vertex back to the first.
#[must_use]
pub fn merge_vertices(outline: &[Point2<f64>], tolerance: f64) -> Vec<Point2<f64>> {
    let mut merged: Vec<Point2<f64>> = Vec::with_capacity(outline.len());
    for vertex in outline {
        match merged.last() {
            Some(last) if nalgebra::distance(last, vertex) <= tolerance => {}
            _ => merged.push(*vertex),
        }
    }
    while merged.len() > 1 {
        let first = merged[0];
        match merged.last() {
            Some(last) if nalgebra::distance(last, &first) <= tolerance => {
                merged.pop();
            }
            _ => break,
        }
    }
    merged
}

/// Split a simple polygon into triangles by ear clipping.
///
/// The outline may be given in either winding; the triangles are always
/// counter-clockwise.
///
/// # Errors
///
/// Returns [`SectionError::TooFewVertices`] for fewer than three vertices and
/// [`SectionError::Triangulation`] when no ear can be found, which happens for
/// self-intersecting outlines.
///
/// # Examples
/// ```
/// use beamsec::section::triangulate;
/// use nalgebra::Point2;
///
/// let square = [
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(1.0, 1.0),
///     Point2::new(0.0, 1.0),
/// ];
/// let triangles = triangulate(&square).expect("a square is simple");
/// assert_eq!(triangles.len(), 2);
/// ```
pub fn triangulate(outline: &[Point2<f64>]) -> Result<Vec<Triangle>, SectionError> {
    if outline.len() < 3 {
        return Err(SectionError::TooFewVertices(outline.len()));
    }
    let mut ring = outline.to_vec();
    if polygon_area(&ring) < 0.0 {
        ring.reverse();
    }
    let mut triangles = Vec::with_capacity(ring.len() - 2);
    while ring.len() > 3 {
        let n = ring.len();
        let ear = (0..n)
            .find(|&i| is_ear(&ring, i))
            .ok_or(SectionError::Triangulation)?;
        triangles.push(Triangle::new(
            ring[(ear + n - 1) % n],
            ring[ear],
            ring[(ear + 1) % n],
        ));
        ring.remove(ear);
    }
    triangles.push(Triangle::new(ring[0], ring[1], ring[2]));
    Ok(triangles)
}

/// Whether the vertex at `i` can be clipped without cutting the outline.
fn is_ear(ring: &[Point2<f64>], i: usize) -> bool {
    let n = ring.len();
    let prev = (i + n - 1) % n;
    let next = (i + 1) % n;
    let candidate = Triangle::new(ring[prev], ring[i], ring[next]);
    if candidate.area() <= 0.0 {
        return false;
    }
    ring.iter()
        .enumerate()
        .filter(|(j, _)| *j != prev && *j != i && *j != next)
        .all(|(_, p)| !candidate.contains(p))
}

/// Deepest midpoint subdivision applied by [`refine`].
pub const MAX_REFINEMENT_LEVELS: u32 = 4;

/// Subdivide triangles at their edge midpoints until the longest edge is no
/// more than `target_size`.
///
/// A triangle is left alone once halving it would produce edges shorter than
/// `min_size`, or after [`MAX_REFINEMENT_LEVELS`] splits.
#[must_use]
pub fn refine(triangles: Vec<Triangle>, target_size: f64, min_size: f64) -> Vec<Triangle> {
    let mut output = Vec::with_capacity(triangles.len());
    let mut pending: Vec<(Triangle, u32)> = triangles.into_iter().map(|t| (t, 0)).collect();
    while let Some((triangle, level)) = pending.pop() {
        let longest = triangle.longest_edge();
        if level >= MAX_REFINEMENT_LEVELS || longest <= target_size || longest / 2.0 < min_size {
            output.push(triangle);
            continue;
        }
        let [a, b, c] = triangle.vertices;
        let ab = nalgebra::center(&a, &b);
        let bc = nalgebra::center(&b, &c);
        let ca = nalgebra::center(&c, &a);
        for child in [
            Triangle::new(a, ab, ca),
            Triangle::new(ab, b, bc),
            Triangle::new(ca, bc, c),
            Triangle::new(ab, bc, ca),
        ] {
            pending.push((child, level + 1));
        }
    }
    output
}

/// Drop triangles whose area does not exceed `tolerance`.
///
/// Returns the kept triangles and the number removed.
#[must_use]
pub fn remove_degenerate(triangles: Vec<Triangle>, tolerance: f64) -> (Vec<Triangle>, usize) {
    let before = triangles.len();
    let kept: Vec<Triangle> = triangles
        .into_iter()
        .filter(|triangle| triangle.area().abs() > tolerance)
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

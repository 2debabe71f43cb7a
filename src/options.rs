//! Fixed parameters handed to the engine by the geometry pipeline.

/// Options for importing a geometry file into a scratch model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportOptions {
    /// Factor applied to every imported coordinate. Default: 1.0
    pub scale: f64,

    /// Consecutive outline points closer than this are merged on import.
    /// Zero merges exact duplicates only. Default: 1e-6
    pub merge_tolerance: f64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            merge_tolerance: 1.0e-6,
        }
    }
}

/// Options for surface meshing of the imported outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshOptions {
    /// Longest edge the mesher aims for. Default: 0.5
    pub target_size: f64,

    /// Edges are never split below this length. Default: 0.1
    pub min_size: f64,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            target_size: 0.5,
            min_size: 0.1,
        }
    }
}

/// Options for cleaning a freshly generated mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanOptions {
    /// Area at or below which a triangle counts as degenerate. Default: 1e-4
    pub tolerance: f64,

    /// Whether degenerate triangles are removed. Default: true
    pub remove_degenerate: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-4,
            remove_degenerate: true,
        }
    }
}

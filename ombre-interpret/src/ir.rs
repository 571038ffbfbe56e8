//! The intermediate representation handed to the downstream rasterizer.
//!
//! The IR is a flat, serializable value: gradients carry sampled color stops,
//! meshes carry packed coordinate/color buffers plus figures whose indices
//! are element offsets into those buffers. Nothing in here refers back to the
//! source objects.

use kurbo::{Affine, Rect};
use std::fmt::{Display, Formatter};

/// Whether a gradient runs along a line or between two circles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    /// A linear gradient between two points.
    Axial,
    /// A radial gradient between two circles.
    Radial,
}

/// The color of a gradient stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopColor {
    /// An opaque 8-bit sRGB color.
    Opaque([u8; 3]),
    /// Fully transparent. Used for the synthetic boundary stops of a
    /// non-extended gradient without a background.
    Transparent,
}

impl Display for StopColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opaque([r, g, b]) => write!(f, "#{r:02X}{g:02X}{b:02X}"),
            Self::Transparent => write!(f, "transparent"),
        }
    }
}

/// A gradient color stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    /// The offset of the stop, in `[0, 1]`.
    pub offset: f32,
    /// The color of the stop.
    pub color: StopColor,
}

/// The type of a mesh shading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshType {
    /// A free-form triangle mesh (type 4).
    FreeForm,
    /// A lattice-form triangle mesh (type 5).
    LatticeForm,
    /// A Coons patch mesh (type 6).
    CoonsPatch,
    /// A tensor-product patch mesh (type 7).
    TensorPatch,
}

/// A figure of a mesh shading.
///
/// Coordinate indices are element offsets into the mesh's packed coordinate
/// buffer (stride 2); color indices are element offsets into the packed color
/// buffer (stride 3).
#[derive(Debug, Clone, PartialEq)]
pub enum Figure {
    /// Independent triangles; indices come in groups of three.
    Triangles {
        /// Coordinate offsets, three per triangle.
        coords: Vec<i32>,
        /// Color offsets, three per triangle.
        colors: Vec<i32>,
    },
    /// A row-major lattice of vertices. Each cell of the lattice renders as
    /// two triangles.
    Lattice {
        /// Coordinate offsets, row-major.
        coords: Vec<i32>,
        /// Color offsets, row-major.
        colors: Vec<i32>,
        /// The number of vertices per lattice row.
        vertices_per_row: usize,
    },
}

impl Figure {
    /// The number of triangles the figure renders as.
    pub fn triangle_count(&self) -> usize {
        match self {
            Self::Triangles { coords, .. } => coords.len() / 3,
            Self::Lattice {
                coords,
                vertices_per_row,
                ..
            } => {
                let rows = coords.len() / vertices_per_row;

                2 * rows.saturating_sub(1) * vertices_per_row.saturating_sub(1)
            }
        }
    }
}

/// A decoded shading, ready for the rasterizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Shading {
    /// An axial or radial gradient.
    RadialAxial {
        /// The kind of gradient.
        kind: GradientKind,
        /// An optional clip box, normalized.
        bbox: Option<Rect>,
        /// The sampled color stops, non-decreasing in offset.
        color_stops: Vec<ColorStop>,
        /// The starting point.
        p0: [f32; 2],
        /// The ending point.
        p1: [f32; 2],
        /// The starting circle radius (radial only).
        r0: Option<f32>,
        /// The ending circle radius (radial only).
        r1: Option<f32>,
        /// The graphics-state transform of the shading.
        matrix: Affine,
    },
    /// A triangle or patch mesh with packed buffers.
    Mesh {
        /// The type of the mesh.
        mesh_type: MeshType,
        /// Packed vertex coordinates, two entries per vertex.
        coords: Vec<f32>,
        /// Packed vertex colors, three bytes per vertex.
        colors: Vec<u8>,
        /// The figures of the mesh, in stream order.
        figures: Vec<Figure>,
        /// The bounds of the mesh as `[min_x, min_y, max_x, max_y]`.
        bounds: [f32; 4],
        /// The graphics-state transform of the shading.
        matrix: Affine,
        /// An optional clip box, normalized.
        bbox: Option<Rect>,
        /// An optional background color.
        background: Option<[u8; 3]>,
    },
    /// A placeholder for a shading that could not be decoded. Renders as
    /// nothing.
    Dummy,
}

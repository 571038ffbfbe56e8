//! Tessellation of bicubic patches into lattice figures.

use super::mesh::{Mesh, MeshFigure};
use std::sync::{Arc, Mutex, OnceLock};

/// The smallest number of chunks a patch is split into per axis. Keeps
/// neighbouring patches visually contiguous along shared edges.
const MIN_SPLIT_PATCH_CHUNKS: usize = 3;

/// The largest number of chunks per axis, capping the expansion of a patch
/// at `21 × 21` lattice vertices.
const MAX_SPLIT_PATCH_CHUNKS: usize = 20;

/// How many chunks a patch spanning the whole mesh gets per axis.
const TRIANGLE_DENSITY: usize = 20;

/// One row of a Bernstein basis table: the four cubic basis polynomials
/// evaluated at a fixed parameter.
type BasisRow = [f32; 4];

/// The Bernstein basis tables, keyed by chunk count.
///
/// Process-wide, populated lazily, never evicted; entries are immutable
/// after write.
static BASIS_CACHE: OnceLock<Mutex<Vec<Option<Arc<[BasisRow]>>>>> = OnceLock::new();

/// The Bernstein basis table for splitting into `count` chunks: `count + 1`
/// rows of `[(1-t)³, 3t(1-t)², 3t²(1-t), t³]` with `t = row / count`.
fn basis(count: usize) -> Arc<[BasisRow]> {
    let cache = BASIS_CACHE.get_or_init(|| Mutex::new(vec![None; MAX_SPLIT_PATCH_CHUNKS + 1]));
    let mut cache = cache.lock().unwrap();

    if let Some(table) = &cache[count] {
        return table.clone();
    }

    let table: Arc<[BasisRow]> = (0..=count)
        .map(|i| {
            let t = i as f32 / count as f32;
            let u = 1.0 - t;

            [u * u * u, 3.0 * t * u * u, 3.0 * t * t * u, t * t * t]
        })
        .collect();

    cache[count] = Some(table.clone());

    table
}

/// Clamp a chunk count to the supported range. Degenerate bounds produce a
/// NaN density, which falls back to the minimum.
fn split_count(value: f32) -> usize {
    let value = value.ceil();

    if value >= MAX_SPLIT_PATCH_CHUNKS as f32 {
        MAX_SPLIT_PATCH_CHUNKS
    } else if value >= MIN_SPLIT_PATCH_CHUNKS as f32 {
        value as usize
    } else {
        MIN_SPLIT_PATCH_CHUNKS
    }
}

/// Replace the patch figure at `index` with a lattice figure.
///
/// The lattice density per axis scales with the patch's share of the overall
/// mesh bounds. The four corner slots reuse the patch's corner vertex
/// indices verbatim, so that neighbouring patches keep bit-identical shared
/// corners; the corner vertices computed by the basis loop stay in the
/// buffers unreferenced.
pub(crate) fn build_figure_from_patch(mesh: &mut Mesh, index: usize) {
    let (pi, ci) = match &mesh.figures[index] {
        MeshFigure::Patch { coords, colors } => (*coords, *colors),
        _ => panic!("unexpected figure type"),
    };

    let corner = |i: usize| mesh.coords[pi[i] as usize];
    let corners = [corner(0), corner(3), corner(12), corner(15)];

    let figure_min_x = corners.iter().map(|c| c[0]).fold(f32::INFINITY, f32::min);
    let figure_max_x = corners
        .iter()
        .map(|c| c[0])
        .fold(f32::NEG_INFINITY, f32::max);
    let figure_min_y = corners.iter().map(|c| c[1]).fold(f32::INFINITY, f32::min);
    let figure_max_y = corners
        .iter()
        .map(|c| c[1])
        .fold(f32::NEG_INFINITY, f32::max);

    let [bounds_min_x, bounds_min_y, bounds_max_x, bounds_max_y] = mesh.bounds;

    let split_x = split_count(
        (figure_max_x - figure_min_x) * TRIANGLE_DENSITY as f32 / (bounds_max_x - bounds_min_x),
    );
    let split_y = split_count(
        (figure_max_y - figure_min_y) * TRIANGLE_DENSITY as f32 / (bounds_max_y - bounds_min_y),
    );

    let vertices_per_row = split_x + 1;
    let mut figure_coords = vec![0i32; (split_y + 1) * vertices_per_row];
    let mut figure_colors = vec![0i32; (split_y + 1) * vertices_per_row];

    let c0 = mesh.colors[ci[0] as usize];
    let c1 = mesh.colors[ci[1] as usize];
    let c2 = mesh.colors[ci[2] as usize];
    let c3 = mesh.colors[ci[3] as usize];

    let b_row = basis(split_y);
    let b_col = basis(split_x);

    let mut k = 0;
    for row in 0..=split_y {
        // Colors on the left and right patch edge for this row.
        let cl = interpolate_color(c0, c2, split_y - row, row, split_y);
        let cr = interpolate_color(c1, c3, split_y - row, row, split_y);

        for col in 0..=split_x {
            let mut x = 0.0f32;
            let mut y = 0.0f32;

            let mut q = 0;
            for i in 0..4 {
                for j in 0..4 {
                    let m = b_row[row][i] * b_col[col][j];
                    let p = mesh.coords[pi[q] as usize];
                    x += p[0] * m;
                    y += p[1] * m;
                    q += 1;
                }
            }

            figure_coords[k] = mesh.coords.len() as i32;
            mesh.coords.push([x, y]);
            figure_colors[k] = mesh.colors.len() as i32;
            mesh.colors
                .push(interpolate_color(cl, cr, split_x - col, col, split_x));
            k += 1;
        }
    }

    figure_coords[0] = pi[0];
    figure_colors[0] = ci[0];
    figure_coords[split_x] = pi[3];
    figure_colors[split_x] = ci[1];
    figure_coords[vertices_per_row * split_y] = pi[12];
    figure_colors[vertices_per_row * split_y] = ci[2];
    figure_coords[vertices_per_row * split_y + split_x] = pi[15];
    figure_colors[vertices_per_row * split_y + split_x] = ci[3];

    mesh.figures[index] = MeshFigure::Lattice {
        coords: figure_coords,
        colors: figure_colors,
        vertices_per_row,
    };
}

/// `(a·wa + b·wb) / n` per channel, truncated toward zero.
fn interpolate_color(a: [u8; 3], b: [u8; 3], wa: usize, wb: usize, n: usize) -> [u8; 3] {
    let channel =
        |i: usize| ((u32::from(a[i]) * wa as u32 + u32::from(b[i]) * wb as u32) / n as u32) as u8;

    [channel(0), channel(1), channel(2)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_rows_sum_to_one() {
        for count in MIN_SPLIT_PATCH_CHUNKS..=MAX_SPLIT_PATCH_CHUNKS {
            for row in basis(count).iter() {
                let sum: f32 = row.iter().sum();
                assert!((sum - 1.0).abs() < 1e-6, "count {count}: {row:?}");
            }
        }
    }

    #[test]
    fn basis_tables_are_cached() {
        assert!(Arc::ptr_eq(&basis(7), &basis(7)));
    }

    #[test]
    fn split_count_clamps_and_rejects_nan() {
        assert_eq!(split_count(0.0), 3);
        assert_eq!(split_count(7.2), 8);
        assert_eq!(split_count(1e9), 20);
        assert_eq!(split_count(f32::INFINITY), 20);
        assert_eq!(split_count(f32::NAN), 3);
    }

    #[test]
    fn color_interpolation_truncates_toward_zero() {
        // (255 * 1 + 0 * 2) / 3 = 85 exactly; (255 * 2 + 0 * 1) / 3 = 170.
        assert_eq!(
            interpolate_color([255, 0, 0], [0, 0, 0], 1, 2, 3),
            [85, 0, 0]
        );
        // (200 * 3 + 100 * 17) / 20 = 115 exactly, but (201 * 3 + 100 * 17)
        // / 20 = 115.15, which truncates.
        assert_eq!(
            interpolate_color([201, 0, 0], [100, 0, 0], 3, 17, 20),
            [115, 0, 0]
        );
    }

    /// A flat patch covering the unit square, with its 16 control points on
    /// the grid thirds and distinct corner colors.
    fn flat_patch_mesh() -> Mesh {
        let mut mesh = Mesh::default();

        // Row-major p00..p33.
        for row in 0..4 {
            for col in 0..4 {
                mesh.coords.push([col as f32 / 3.0, row as f32 / 3.0]);
            }
        }
        mesh.colors.extend([
            [255, 0, 0],
            [255, 255, 255],
            [0, 255, 0],
            [0, 0, 255],
        ]);

        let ps: [i32; 16] = std::array::from_fn(|i| i as i32);
        mesh.figures.push(MeshFigure::Patch {
            coords: ps,
            colors: [0, 1, 2, 3],
        });
        assert!(mesh.update_bounds());

        mesh
    }

    #[test]
    fn full_mesh_patch_splits_at_maximum_density() {
        let mut mesh = flat_patch_mesh();
        build_figure_from_patch(&mut mesh, 0);

        let MeshFigure::Lattice {
            coords,
            colors,
            vertices_per_row,
        } = &mesh.figures[0]
        else {
            panic!("expected a lattice figure");
        };

        assert_eq!(*vertices_per_row, 21);
        assert_eq!(coords.len(), 441);
        assert_eq!(colors.len(), 441);
        // 16 control points plus one pushed vertex per lattice node.
        assert_eq!(mesh.coords.len(), 16 + 441);
    }

    #[test]
    fn corners_reuse_the_original_vertex_indices() {
        let mut mesh = flat_patch_mesh();
        build_figure_from_patch(&mut mesh, 0);

        let MeshFigure::Lattice {
            coords,
            colors,
            vertices_per_row,
        } = &mesh.figures[0]
        else {
            panic!("expected a lattice figure");
        };

        let last_row = (coords.len() / vertices_per_row - 1) * vertices_per_row;

        assert_eq!(coords[0], 0);
        assert_eq!(coords[vertices_per_row - 1], 3);
        assert_eq!(coords[last_row], 12);
        assert_eq!(coords[last_row + vertices_per_row - 1], 15);

        assert_eq!(colors[0], 0);
        assert_eq!(colors[vertices_per_row - 1], 1);
        assert_eq!(colors[last_row], 2);
        assert_eq!(colors[last_row + vertices_per_row - 1], 3);
    }

    #[test]
    fn interior_lattice_nodes_follow_the_surface() {
        let mut mesh = flat_patch_mesh();
        build_figure_from_patch(&mut mesh, 0);

        let MeshFigure::Lattice {
            coords,
            vertices_per_row,
            ..
        } = &mesh.figures[0]
        else {
            panic!("expected a lattice figure");
        };

        // For a flat patch the surface is the identity mapping of the unit
        // square, so node (row, col) sits at (col / 20, row / 20).
        for row in 0..21 {
            for col in 0..21 {
                let idx = coords[row * vertices_per_row + col] as usize;
                let [x, y] = mesh.coords[idx];
                let expected = [col as f32 / 20.0, row as f32 / 20.0];
                assert!(
                    (x - expected[0]).abs() < 1e-5 && (y - expected[1]).abs() < 1e-5,
                    "node ({row}, {col}) at [{x}, {y}], expected {expected:?}"
                );
            }
        }
    }

    #[test]
    fn bilinear_colors_truncate_per_channel() {
        let mut mesh = flat_patch_mesh();
        build_figure_from_patch(&mut mesh, 0);

        let MeshFigure::Lattice {
            colors,
            vertices_per_row,
            ..
        } = &mesh.figures[0]
        else {
            panic!("expected a lattice figure");
        };

        // Node (0, 10) is halfway along the bottom edge between red and
        // white: channels (255, 127, 127) after truncation.
        let idx = colors[10] as usize;
        assert_eq!(mesh.colors[idx], [255, 127, 127]);
    }

    #[test]
    #[should_panic(expected = "unexpected figure type")]
    fn non_patch_figures_are_rejected() {
        let mut mesh = Mesh::default();
        mesh.coords.push([0.0, 0.0]);
        mesh.colors.push([0, 0, 0]);
        mesh.figures.push(MeshFigure::Triangles {
            coords: vec![0],
            colors: vec![0],
        });

        build_figure_from_patch(&mut mesh, 0);
    }
}

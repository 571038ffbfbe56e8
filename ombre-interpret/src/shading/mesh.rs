//! Mesh shadings: bitstream decoding and buffer packing.
//!
//! All four mesh decoders share one convention: they append vertices to the
//! growing coordinate and color lists of a [`Mesh`] and emit figures that
//! reference vertex *indices*. Indices are assigned monotonically in stream
//! order; this order is observable in the IR and must stay stable. Packing
//! happens once at the end and rewrites the indices to element offsets.

use super::patch;
use super::{Error, Result, read_bbox, read_color_space};
use crate::color::{ColorComponents, ColorSpace, ColorSpaceCache};
use crate::function::{FunctionFactory, ShadingFunction};
use crate::ir::{Figure, MeshType, Shading};
use kurbo::Affine;
use log::warn;
use ombre_syntax::bit_reader::{BitReader, BitSize};
use ombre_syntax::object::dict::keys::{
    BACKGROUND, BITS_PER_COMPONENT, BITS_PER_COORDINATE, BITS_PER_FLAG, DECODE, FUNCTION,
    VERTICES_PER_ROW,
};
use ombre_syntax::object::Stream;
use ombre_syntax::source::ByteSource;
use ombre_syntax::xref::XRef;
use smallvec::SmallVec;

/// The scale of a 32-bit fixed-point field (`2^-32`, rounded).
const SCALE_32: f32 = 2.3283064365386963e-10;

/// The decode parameters of a mesh bit stream.
pub(crate) struct DecodeContext {
    pub(crate) bits_per_coordinate: BitSize,
    pub(crate) bits_per_component: BitSize,
    /// Absent for lattice-form meshes, which carry no flags.
    pub(crate) bits_per_flag: Option<BitSize>,
    /// The x range, the y range, then one range per color component.
    pub(crate) decode: Vec<f32>,
    pub(crate) color_fn: Option<ShadingFunction>,
    pub(crate) color_space: ColorSpace,
    /// One component when a color function is present, the color space's
    /// component count otherwise.
    pub(crate) num_comps: usize,
}

/// Typed access to a mesh bit stream: flags, coordinates and colors with the
/// declared fixed-point decode ranges applied.
pub(crate) struct MeshReader<S> {
    reader: BitReader<S>,
    context: DecodeContext,
}

impl<S: ByteSource> MeshReader<S> {
    pub(crate) fn new(reader: BitReader<S>, context: DecodeContext) -> Self {
        Self { reader, context }
    }

    fn has_data(&mut self) -> Result<bool> {
        Ok(self.reader.has_data()?)
    }

    fn align(&mut self) {
        self.reader.align();
    }

    fn read_flag(&mut self) -> Result<Option<u32>> {
        let bits = self
            .context
            .bits_per_flag
            .unwrap_or_else(|| panic!("flag read in a flagless mesh"));

        Ok(self.reader.read(bits)?)
    }

    fn read_coordinate(&mut self) -> Result<Option<[f32; 2]>> {
        let bits = self.context.bits_per_coordinate;
        let scale = fixed_point_scale(bits);

        let Some(xi) = self.reader.read(bits)? else {
            return Ok(None);
        };
        let Some(yi) = self.reader.read(bits)? else {
            return Ok(None);
        };

        let decode = &self.context.decode;

        Ok(Some([
            xi as f32 * scale * (decode[1] - decode[0]) + decode[0],
            yi as f32 * scale * (decode[3] - decode[2]) + decode[2],
        ]))
    }

    fn read_components(&mut self) -> Result<Option<[u8; 3]>> {
        let bits = self.context.bits_per_component;
        let scale = fixed_point_scale(bits);

        let mut components = ColorComponents::new();
        for i in 0..self.context.num_comps {
            let Some(ci) = self.reader.read(bits)? else {
                return Ok(None);
            };

            let lo = self.context.decode[4 + 2 * i];
            let hi = self.context.decode[5 + 2 * i];
            components.push(ci as f32 * scale * (hi - lo) + lo);
        }

        let rgb = match &self.context.color_fn {
            Some(function) => {
                let native = function
                    .eval(&components)
                    .ok_or_else(|| Error::format("mesh color function evaluation failed"))?;

                self.context.color_space.to_rgb(&native)
            }
            None => self.context.color_space.to_rgb(&components),
        };

        Ok(Some(rgb))
    }
}

fn fixed_point_scale(bits: BitSize) -> f32 {
    if bits.bits() < 32 {
        1.0 / ((1u64 << bits.bits()) - 1) as f32
    } else {
        SCALE_32
    }
}

/// A mesh figure under construction. Indices are vertex indices; the packer
/// rewrites them to element offsets.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MeshFigure {
    Triangles {
        coords: Vec<i32>,
        colors: Vec<i32>,
    },
    Lattice {
        coords: Vec<i32>,
        colors: Vec<i32>,
        vertices_per_row: usize,
    },
    /// Transient: every patch is replaced by a lattice before packing.
    Patch {
        coords: [i32; 16],
        colors: [i32; 4],
    },
}

/// A mesh while it is being decoded.
#[derive(Debug, Default)]
pub(crate) struct Mesh {
    pub(crate) coords: Vec<[f32; 2]>,
    pub(crate) colors: Vec<[u8; 3]>,
    pub(crate) figures: Vec<MeshFigure>,
    /// `[min_x, min_y, max_x, max_y]` over all coordinates.
    pub(crate) bounds: [f32; 4],
}

impl Mesh {
    /// Recompute the bounds over all coordinates. Returns `false` for a mesh
    /// without any vertices.
    pub(crate) fn update_bounds(&mut self) -> bool {
        let Some(&[mut min_x, mut min_y]) = self.coords.first() else {
            return false;
        };
        let (mut max_x, mut max_y) = (min_x, min_y);

        for &[x, y] in &self.coords[1..] {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        self.bounds = [min_x, min_y, max_x, max_y];

        true
    }

    /// Flatten the vertex lists into contiguous buffers and rewrite every
    /// figure index into an element offset (stride 2 for coordinates, 3 for
    /// colors).
    fn pack(self) -> (Vec<f32>, Vec<u8>, Vec<Figure>) {
        let mut coords = Vec::with_capacity(self.coords.len() * 2);
        for [x, y] in self.coords {
            coords.push(x);
            coords.push(y);
        }

        let mut colors = Vec::with_capacity(self.colors.len() * 3);
        for color in self.colors {
            colors.extend(color);
        }

        let figures = self
            .figures
            .into_iter()
            .map(|figure| match figure {
                MeshFigure::Triangles {
                    coords: ps,
                    colors: cs,
                } => Figure::Triangles {
                    coords: to_offsets(ps, 2),
                    colors: to_offsets(cs, 3),
                },
                MeshFigure::Lattice {
                    coords: ps,
                    colors: cs,
                    vertices_per_row,
                } => Figure::Lattice {
                    coords: to_offsets(ps, 2),
                    colors: to_offsets(cs, 3),
                    vertices_per_row,
                },
                MeshFigure::Patch { .. } => panic!("patch figure survived tessellation"),
            })
            .collect();

        (coords, colors, figures)
    }
}

fn to_offsets(mut indices: Vec<i32>, stride: i32) -> Vec<i32> {
    for index in &mut indices {
        *index *= stride;
    }

    indices
}

/// Parse a mesh shading (types 4 through 7) from its stream.
pub(crate) fn parse(
    stream: Option<&Stream>,
    shading_type: u8,
    matrix: Affine,
    xref: &XRef,
    functions: &dyn FunctionFactory,
    cs_cache: &ColorSpaceCache,
) -> Result<Shading> {
    let stream = stream.ok_or_else(|| Error::format("mesh shading requires a stream"))?;
    let dict = stream.dict();

    let mesh_type = match shading_type {
        4 => MeshType::FreeForm,
        5 => MeshType::LatticeForm,
        6 => MeshType::CoonsPatch,
        7 => MeshType::TensorPatch,
        _ => unreachable!("dispatcher only routes mesh types here"),
    };

    let color_space = read_color_space(dict, xref, cs_cache)?;

    let color_fn = if dict.contains_key(FUNCTION) {
        let function = ShadingFunction::read(dict, xref, functions, &color_space)
            .ok_or_else(|| Error::format("invalid mesh color function"))?;

        Some(function)
    } else {
        None
    };

    let bits_per_coordinate = dict
        .get::<u8>(BITS_PER_COORDINATE, xref)
        .and_then(BitSize::from_u8)
        .ok_or_else(|| Error::format("missing or invalid BitsPerCoordinate"))?;
    let bits_per_component = dict
        .get::<u8>(BITS_PER_COMPONENT, xref)
        .and_then(BitSize::from_u8)
        .ok_or_else(|| Error::format("missing or invalid BitsPerComponent"))?;

    let bits_per_flag = if mesh_type == MeshType::LatticeForm {
        None
    } else {
        let raw = dict
            .get::<u8>(BITS_PER_FLAG, xref)
            .ok_or_else(|| Error::format("missing or invalid BitsPerFlag"))?;

        // The format only defines 2, 4 and 8, but any decodable width works.
        if !matches!(raw, 2 | 4 | 8) {
            warn!("unexpected BitsPerFlag width: {raw}");
        }

        let bits = BitSize::from_u8(raw)
            .ok_or_else(|| Error::format("missing or invalid BitsPerFlag"))?;

        Some(bits)
    };

    let decode = dict
        .get::<Vec<f32>>(DECODE, xref)
        .ok_or_else(|| Error::format("missing or invalid Decode array"))?;

    let num_comps = if color_fn.is_some() {
        1
    } else {
        color_space.num_components()
    };

    if decode.len() < 4 + 2 * num_comps {
        return Err(Error::format("Decode array too short for the mesh"));
    }

    let background = dict
        .get::<Vec<f32>>(BACKGROUND, xref)
        .map(|comps| color_space.to_rgb(&comps));
    let bbox = read_bbox(dict, xref);

    let context = DecodeContext {
        bits_per_coordinate,
        bits_per_component,
        bits_per_flag,
        decode,
        color_fn,
        color_space,
        num_comps,
    };

    let mut reader = MeshReader::new(BitReader::new(stream.source()), context);
    let mut mesh = Mesh::default();

    match mesh_type {
        MeshType::FreeForm => decode_type4(&mut mesh, &mut reader)?,
        MeshType::LatticeForm => {
            let vertices_per_row = dict
                .get::<u32>(VERTICES_PER_ROW, xref)
                .ok_or_else(|| Error::format("missing or invalid VerticesPerRow"))?;

            if vertices_per_row < 2 {
                return Err(Error::format("invalid VerticesPerRow in lattice mesh"));
            }

            decode_type5(&mut mesh, &mut reader, vertices_per_row as usize)?;
        }
        MeshType::CoonsPatch => decode_patches(&mut mesh, &mut reader, false)?,
        MeshType::TensorPatch => decode_patches(&mut mesh, &mut reader, true)?,
    }

    if matches!(mesh_type, MeshType::CoonsPatch | MeshType::TensorPatch) {
        // Bounds over the raw control points; the tessellator scales each
        // patch's lattice density by its share of them.
        if !mesh.update_bounds() {
            return Err(Error::format("mesh shading without any vertices"));
        }

        for i in 0..mesh.figures.len() {
            patch::build_figure_from_patch(&mut mesh, i);
        }
    }

    if !mesh.update_bounds() {
        return Err(Error::format("mesh shading without any vertices"));
    }

    let bounds = mesh.bounds;
    let (coords, colors, figures) = mesh.pack();

    Ok(Shading::Mesh {
        mesh_type,
        coords,
        colors,
        figures,
        bounds,
        matrix,
        bbox,
        background,
    })
}

/// Decode a free-form triangle mesh (type 4).
fn decode_type4<S: ByteSource>(mesh: &mut Mesh, reader: &mut MeshReader<S>) -> Result<()> {
    let mut ps: Vec<i32> = Vec::new();
    let mut vertices_left = 0u32;

    while reader.has_data()? {
        let Some(flag) = reader.read_flag()? else {
            break;
        };
        let Some(coord) = reader.read_coordinate()? else {
            break;
        };
        let Some(color) = reader.read_components()? else {
            break;
        };

        if vertices_left == 0 {
            // This vertex starts a new triangle.
            match flag {
                0 => vertices_left = 3,
                1 | 2 => {
                    let len = ps.len();
                    if len < 3 {
                        return Err(Error::format(
                            "free-form mesh continuation without a previous triangle",
                        ));
                    }

                    // Flag 1 reuses the last two vertices, flag 2 the
                    // third-last and the last.
                    let first = if flag == 1 { ps[len - 2] } else { ps[len - 3] };
                    ps.push(first);
                    ps.push(ps[len - 1]);
                    vertices_left = 1;
                }
                _ => {
                    return Err(Error::Format(format!(
                        "unknown free-form mesh flag: {flag}"
                    )));
                }
            }
        }

        ps.push(mesh.coords.len() as i32);
        mesh.coords.push(coord);
        mesh.colors.push(color);
        vertices_left -= 1;
        reader.align();
    }

    mesh.figures.push(MeshFigure::Triangles {
        coords: ps.clone(),
        colors: ps,
    });

    Ok(())
}

/// Decode a lattice-form triangle mesh (type 5). The stream carries no
/// flags, just `(coordinate, color)` pairs.
fn decode_type5<S: ByteSource>(
    mesh: &mut Mesh,
    reader: &mut MeshReader<S>,
    vertices_per_row: usize,
) -> Result<()> {
    let mut ps: Vec<i32> = Vec::new();

    while reader.has_data()? {
        let Some(coord) = reader.read_coordinate()? else {
            break;
        };
        let Some(color) = reader.read_components()? else {
            break;
        };

        ps.push(mesh.coords.len() as i32);
        mesh.coords.push(coord);
        mesh.colors.push(color);
    }

    mesh.figures.push(MeshFigure::Lattice {
        coords: ps.clone(),
        colors: ps,
        vertices_per_row,
    });

    Ok(())
}

/// Decode a Coons (type 6) or tensor-product (type 7) patch mesh.
///
/// The 16-slot index table `ps` is laid out row-major, `p00..p30` in the
/// first row up to `p03..p33`; `cs` holds the corner color indices as
/// `[c00, c30, c03, c33]`. Continuation flags inherit the previous patch's
/// top, right or bottom edge into the left column `ps[0], ps[4], ps[8],
/// ps[12]` and the matching corner colors into `cs[0], cs[2]`.
fn decode_patches<S: ByteSource>(
    mesh: &mut Mesh,
    reader: &mut MeshReader<S>,
    tensor: bool,
) -> Result<()> {
    let mut ps = [0i32; 16];
    let mut cs = [0i32; 4];
    let mut has_previous = false;

    while reader.has_data()? {
        let Some(flag) = reader.read_flag()? else {
            break;
        };

        if flag > 3 {
            return Err(Error::Format(format!("unknown patch mesh flag: {flag}")));
        }
        if flag != 0 && !has_previous {
            return Err(Error::format(
                "patch mesh continuation without a previous patch",
            ));
        }

        let fresh_coords = match (tensor, flag == 0) {
            (false, true) => 12,
            (false, false) => 8,
            (true, true) => 16,
            (true, false) => 12,
        };
        let fresh_colors = if flag == 0 { 4 } else { 2 };

        // Read the whole patch before committing it, so a truncated stream
        // never leaves half a patch in the mesh.
        let mut new_coords: SmallVec<[[f32; 2]; 16]> = SmallVec::new();
        for _ in 0..fresh_coords {
            let Some(coord) = reader.read_coordinate()? else {
                return Ok(());
            };
            new_coords.push(coord);
        }

        let mut new_colors: SmallVec<[[u8; 3]; 4]> = SmallVec::new();
        for _ in 0..fresh_colors {
            let Some(color) = reader.read_components()? else {
                return Ok(());
            };
            new_colors.push(color);
        }

        let pi = mesh.coords.len() as i32;
        let ci = mesh.colors.len() as i32;
        mesh.coords.extend(new_coords);
        mesh.colors.extend(new_colors);

        match flag {
            0 => {
                ps[12] = pi + 3;
                ps[13] = pi + 4;
                ps[14] = pi + 5;
                ps[15] = pi + 6;
                ps[8] = pi + 2;
                ps[11] = pi + 7;
                ps[4] = pi + 1;
                ps[7] = pi + 8;
                ps[0] = pi;
                ps[1] = pi + 11;
                ps[2] = pi + 10;
                ps[3] = pi + 9;

                cs[2] = ci + 1;
                cs[3] = ci + 2;
                cs[0] = ci;
                cs[1] = ci + 3;
            }
            1 => {
                // The previous top edge becomes the new left column.
                let edge = [ps[12], ps[13], ps[14], ps[15]];
                inherit_edge(&mut ps, edge, pi);
                let corners = [cs[2], cs[3]];
                inherit_corners(&mut cs, corners, ci);
            }
            2 => {
                // The previous right edge becomes the new left column.
                let edge = [ps[15], ps[11], ps[7], ps[3]];
                inherit_edge(&mut ps, edge, pi);
                let corners = [cs[3], cs[1]];
                inherit_corners(&mut cs, corners, ci);
            }
            3 => {
                // The previous bottom edge becomes the new left column.
                let edge = [ps[3], ps[2], ps[1], ps[0]];
                inherit_edge(&mut ps, edge, pi);
                let corners = [cs[1], cs[0]];
                inherit_corners(&mut cs, corners, ci);
            }
            _ => unreachable!(),
        }

        if tensor {
            // All four interior points are explicit in the stream.
            let ii = if flag == 0 { pi + 12 } else { pi + 8 };
            ps[5] = ii;
            ps[9] = ii + 1;
            ps[10] = ii + 2;
            ps[6] = ii + 3;
        } else {
            synthesize_interior_points(mesh, &mut ps);
        }

        has_previous = true;
        mesh.figures.push(MeshFigure::Patch {
            coords: ps,
            colors: cs,
        });
    }

    Ok(())
}

/// Install an inherited edge into the left column and the freshly-read
/// points into the remaining boundary slots, counterclockwise.
fn inherit_edge(ps: &mut [i32; 16], edge: [i32; 4], pi: i32) {
    ps[0] = edge[0];
    ps[4] = edge[1];
    ps[8] = edge[2];
    ps[12] = edge[3];

    ps[13] = pi;
    ps[14] = pi + 1;
    ps[15] = pi + 2;
    ps[11] = pi + 3;
    ps[7] = pi + 4;
    ps[3] = pi + 5;
    ps[2] = pi + 6;
    ps[1] = pi + 7;
}

fn inherit_corners(cs: &mut [i32; 4], corners: [i32; 2], ci: i32) {
    cs[0] = corners[0];
    cs[2] = corners[1];
    cs[3] = ci;
    cs[1] = ci + 1;
}

/// Synthesize the four interior control points of a Coons patch from its 12
/// boundary points.
///
/// The blend keeps the integer-9 denominator, and the division happens after
/// all sums; both are needed to match other decoders bit for bit.
fn synthesize_interior_points(mesh: &mut Mesh, ps: &mut [i32; 16]) {
    let (p11, p21, p12, p22) = {
        let p = |i: usize| mesh.coords[ps[i] as usize];

        (
            coons_blend(p(0), p(15), p(4), p(1), p(12), p(3), p(13), p(7)),
            coons_blend(p(3), p(12), p(7), p(2), p(15), p(0), p(14), p(4)),
            coons_blend(p(12), p(3), p(8), p(13), p(0), p(15), p(1), p(11)),
            coons_blend(p(15), p(0), p(11), p(14), p(3), p(12), p(2), p(8)),
        )
    };

    ps[5] = mesh.coords.len() as i32;
    mesh.coords.push(p11);
    ps[6] = mesh.coords.len() as i32;
    mesh.coords.push(p21);
    ps[9] = mesh.coords.len() as i32;
    mesh.coords.push(p12);
    ps[10] = mesh.coords.len() as i32;
    mesh.coords.push(p22);
}

#[allow(clippy::too_many_arguments)]
fn coons_blend(
    a: [f32; 2],
    b: [f32; 2],
    e1: [f32; 2],
    e2: [f32; 2],
    d1: [f32; 2],
    d2: [f32; 2],
    j1: [f32; 2],
    j2: [f32; 2],
) -> [f32; 2] {
    let blend = |k: usize| {
        (-4.0 * a[k] - b[k] + 6.0 * (e1[k] + e2[k]) - 2.0 * (d1[k] + d2[k])
            + 3.0 * (j1[k] + j2[k]))
            / 9.0
    };

    [blend(0), blend(1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ombre_syntax::bit_reader::BitWriter;
    use ombre_syntax::source::SliceSource;

    fn bs8() -> BitSize {
        BitSize::from_u8(8).unwrap()
    }

    fn bs16() -> BitSize {
        BitSize::from_u8(16).unwrap()
    }

    fn context(num_comps: usize, with_flags: bool) -> DecodeContext {
        let mut decode = vec![0.0, 1.0, 0.0, 1.0];
        for _ in 0..num_comps {
            decode.extend([0.0, 1.0]);
        }

        DecodeContext {
            bits_per_coordinate: bs16(),
            bits_per_component: bs8(),
            bits_per_flag: with_flags.then(bs8),
            decode,
            color_fn: None,
            color_space: if num_comps == 1 {
                ColorSpace::device_gray()
            } else {
                ColorSpace::device_rgb()
            },
            num_comps,
        }
    }

    fn mesh_reader(data: &[u8], context: DecodeContext) -> MeshReader<SliceSource<'_>> {
        MeshReader::new(BitReader::new(SliceSource::new(data)), context)
    }

    fn write_coord(writer: &mut BitWriter, x: f32, y: f32) {
        writer.write((x * 65535.0).round() as u32, bs16());
        writer.write((y * 65535.0).round() as u32, bs16());
    }

    /// A free-form vertex: flag, coordinate, one gray component.
    fn write_gray_vertex(writer: &mut BitWriter, flag: u32, x: f32, y: f32, gray: u32) {
        writer.write(flag, bs8());
        write_coord(writer, x, y);
        writer.write(gray, bs8());
    }

    #[test]
    fn reader_applies_decode_ranges() {
        let mut writer = BitWriter::new();
        write_coord(&mut writer, 0.0, 1.0);
        let data = writer.finish();

        let mut ctx = context(1, false);
        ctx.decode = vec![-1.0, 3.0, 10.0, 20.0, 0.0, 1.0];

        let mut reader = mesh_reader(&data, ctx);
        let coord = reader.read_coordinate().unwrap().unwrap();
        assert_eq!(coord, [-1.0, 20.0]);
    }

    #[test]
    fn type4_flag_one_reuses_the_last_two_vertices() {
        let mut writer = BitWriter::new();
        write_gray_vertex(&mut writer, 0, 0.0, 0.0, 0);
        write_gray_vertex(&mut writer, 0, 1.0, 0.0, 85);
        write_gray_vertex(&mut writer, 0, 0.0, 1.0, 170);
        write_gray_vertex(&mut writer, 1, 1.0, 1.0, 255);
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(1, true));
        decode_type4(&mut mesh, &mut reader).unwrap();

        assert_eq!(mesh.coords.len(), 4);
        assert_eq!(mesh.colors.len(), 4);
        assert_eq!(mesh.figures.len(), 1);

        let MeshFigure::Triangles { coords, colors } = &mesh.figures[0] else {
            panic!("expected a triangles figure");
        };

        // Two triangles: (v0, v1, v2) and (v1, v2, v3).
        assert_eq!(coords, &[0, 1, 2, 1, 2, 3]);
        assert_eq!(colors, &[0, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn type4_flag_two_reuses_the_third_last_and_last_vertex() {
        let mut writer = BitWriter::new();
        write_gray_vertex(&mut writer, 0, 0.0, 0.0, 0);
        write_gray_vertex(&mut writer, 0, 1.0, 0.0, 85);
        write_gray_vertex(&mut writer, 0, 0.0, 1.0, 170);
        write_gray_vertex(&mut writer, 2, 1.0, 1.0, 255);
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(1, true));
        decode_type4(&mut mesh, &mut reader).unwrap();

        let MeshFigure::Triangles { coords, .. } = &mesh.figures[0] else {
            panic!("expected a triangles figure");
        };

        assert_eq!(coords, &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn type4_rejects_unknown_flags() {
        let mut writer = BitWriter::new();
        write_gray_vertex(&mut writer, 7, 0.0, 0.0, 0);
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(1, true));

        assert!(matches!(
            decode_type4(&mut mesh, &mut reader),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn type5_consumes_pairs_until_exhausted() {
        let mut writer = BitWriter::new();
        for i in 0..6u32 {
            write_coord(&mut writer, (i % 3) as f32 / 2.0, (i / 3) as f32);
            writer.write(i * 40, bs8());
        }
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(1, false));
        decode_type5(&mut mesh, &mut reader, 3).unwrap();

        assert_eq!(mesh.coords.len(), 6);

        let MeshFigure::Lattice {
            coords,
            vertices_per_row,
            ..
        } = &mesh.figures[0]
        else {
            panic!("expected a lattice figure");
        };

        assert_eq!(coords, &[0, 1, 2, 3, 4, 5]);
        assert_eq!(*vertices_per_row, 3);
    }

    /// A flat unit-square Coons patch whose boundary control points sit at
    /// the thirds of each edge, with red/green/blue/white corner colors.
    fn write_unit_coons_patch(writer: &mut BitWriter) {
        writer.write(0, bs8());

        // p1..p4: left edge, bottom to top.
        write_coord(writer, 0.0, 0.0);
        write_coord(writer, 0.0, 1.0 / 3.0);
        write_coord(writer, 0.0, 2.0 / 3.0);
        write_coord(writer, 0.0, 1.0);
        // p5..p7: top edge.
        write_coord(writer, 1.0 / 3.0, 1.0);
        write_coord(writer, 2.0 / 3.0, 1.0);
        write_coord(writer, 1.0, 1.0);
        // p8..p10: right edge, top to bottom.
        write_coord(writer, 1.0, 2.0 / 3.0);
        write_coord(writer, 1.0, 1.0 / 3.0);
        write_coord(writer, 1.0, 0.0);
        // p11..p12: bottom edge, right to left.
        write_coord(writer, 2.0 / 3.0, 0.0);
        write_coord(writer, 1.0 / 3.0, 0.0);

        // Corner colors c1..c4: red, green, blue, white.
        for color in [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]] {
            for channel in color {
                writer.write(channel, bs8());
            }
        }
    }

    fn assert_close(a: [f32; 2], b: [f32; 2]) {
        assert!(
            (a[0] - b[0]).abs() < 1e-3 && (a[1] - b[1]).abs() < 1e-3,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn type6_synthesizes_interior_points() {
        let mut writer = BitWriter::new();
        write_unit_coons_patch(&mut writer);
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(3, true));
        decode_patches(&mut mesh, &mut reader, false).unwrap();

        assert_eq!(mesh.figures.len(), 1);
        // 12 boundary points plus 4 synthesized interior points.
        assert_eq!(mesh.coords.len(), 16);

        let MeshFigure::Patch { coords: ps, colors: cs } = &mesh.figures[0] else {
            panic!("expected a patch figure");
        };

        // Corners in reading order.
        assert_eq!(ps[0], 0);
        assert_eq!(ps[12], 3);
        assert_eq!(ps[15], 6);
        assert_eq!(ps[3], 9);
        assert_eq!(*cs, [0, 3, 1, 2]);

        // For a flat patch the synthesized interior points sit at the grid
        // thirds.
        let third = 1.0 / 3.0;
        assert_close(mesh.coords[ps[5] as usize], [third, third]);
        assert_close(mesh.coords[ps[6] as usize], [2.0 * third, third]);
        assert_close(mesh.coords[ps[9] as usize], [third, 2.0 * third]);
        assert_close(mesh.coords[ps[10] as usize], [2.0 * third, 2.0 * third]);
    }

    /// Write a continuation patch with 8 boundary points on the unit square
    /// above the previous one.
    fn write_continuation_patch(writer: &mut BitWriter, flag: u32) {
        writer.write(flag, bs8());

        for _ in 0..8 {
            write_coord(writer, 0.5, 1.0);
        }
        for _ in 0..2 {
            for channel in [128, 128, 128] {
                writer.write(channel, bs8());
            }
        }
    }

    #[test]
    fn type6_flag1_inherits_the_top_edge() {
        let mut writer = BitWriter::new();
        write_unit_coons_patch(&mut writer);
        write_continuation_patch(&mut writer, 1);
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(3, true));
        decode_patches(&mut mesh, &mut reader, false).unwrap();

        assert_eq!(mesh.figures.len(), 2);

        let (first_ps, first_cs) = patch_tables(&mesh.figures[0]);
        let (second_ps, second_cs) = patch_tables(&mesh.figures[1]);

        assert_eq!(second_ps[0], first_ps[12]);
        assert_eq!(second_ps[4], first_ps[13]);
        assert_eq!(second_ps[8], first_ps[14]);
        assert_eq!(second_ps[12], first_ps[15]);

        assert_eq!(second_cs[0], first_cs[2]);
        assert_eq!(second_cs[2], first_cs[3]);
    }

    #[test]
    fn type6_flag2_inherits_the_right_edge() {
        let mut writer = BitWriter::new();
        write_unit_coons_patch(&mut writer);
        write_continuation_patch(&mut writer, 2);
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(3, true));
        decode_patches(&mut mesh, &mut reader, false).unwrap();

        let (first_ps, first_cs) = patch_tables(&mesh.figures[0]);
        let (second_ps, second_cs) = patch_tables(&mesh.figures[1]);

        assert_eq!(second_ps[0], first_ps[15]);
        assert_eq!(second_ps[4], first_ps[11]);
        assert_eq!(second_ps[8], first_ps[7]);
        assert_eq!(second_ps[12], first_ps[3]);

        assert_eq!(second_cs[0], first_cs[3]);
        assert_eq!(second_cs[2], first_cs[1]);
    }

    #[test]
    fn type6_flag3_inherits_the_bottom_edge() {
        let mut writer = BitWriter::new();
        write_unit_coons_patch(&mut writer);
        write_continuation_patch(&mut writer, 3);
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(3, true));
        decode_patches(&mut mesh, &mut reader, false).unwrap();

        let (first_ps, first_cs) = patch_tables(&mesh.figures[0]);
        let (second_ps, second_cs) = patch_tables(&mesh.figures[1]);

        assert_eq!(second_ps[0], first_ps[3]);
        assert_eq!(second_ps[4], first_ps[2]);
        assert_eq!(second_ps[8], first_ps[1]);
        assert_eq!(second_ps[12], first_ps[0]);

        assert_eq!(second_cs[0], first_cs[1]);
        assert_eq!(second_cs[2], first_cs[0]);
    }

    #[test]
    fn type6_rejects_leading_continuation() {
        let mut writer = BitWriter::new();
        write_continuation_patch(&mut writer, 1);
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(3, true));

        assert!(matches!(
            decode_patches(&mut mesh, &mut reader, false),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn type7_reads_explicit_interior_points() {
        let mut writer = BitWriter::new();
        writer.write(0, bs8());
        for i in 0..16 {
            write_coord(&mut writer, i as f32 / 15.0, 0.25);
        }
        for color in [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]] {
            for channel in color {
                writer.write(channel, bs8());
            }
        }
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(3, true));
        decode_patches(&mut mesh, &mut reader, true).unwrap();

        // No synthesized points: exactly the 16 read ones.
        assert_eq!(mesh.coords.len(), 16);

        let (ps, _) = patch_tables(&mesh.figures[0]);

        // The four interior points are the last four in reading order.
        assert_eq!(ps[5], 12);
        assert_eq!(ps[9], 13);
        assert_eq!(ps[10], 14);
        assert_eq!(ps[6], 15);
    }

    #[test]
    fn indices_are_assigned_monotonically() {
        let mut writer = BitWriter::new();
        write_unit_coons_patch(&mut writer);
        write_continuation_patch(&mut writer, 1);
        let data = writer.finish();

        let mut mesh = Mesh::default();
        let mut reader = mesh_reader(&data, context(3, true));
        decode_patches(&mut mesh, &mut reader, false).unwrap();

        // 12 boundary + 4 interior points for the first patch, 8 + 4 for the
        // continuation.
        assert_eq!(mesh.coords.len(), 28);

        let (first_ps, _) = patch_tables(&mesh.figures[0]);
        let (second_ps, _) = patch_tables(&mesh.figures[1]);

        assert!(first_ps.iter().all(|&i| (i as usize) < 16));
        assert!(second_ps.iter().all(|&i| (i as usize) < 28));

        // Every freshly-read index of the continuation comes after all of
        // the first patch's indices.
        let fresh: Vec<i32> = second_ps
            .iter()
            .copied()
            .filter(|i| !first_ps.contains(i))
            .collect();
        assert!(fresh.iter().all(|&i| i >= 16));
        assert!(!fresh.is_empty());
    }

    fn patch_tables(figure: &MeshFigure) -> ([i32; 16], [i32; 4]) {
        match figure {
            MeshFigure::Patch { coords, colors } => (*coords, *colors),
            _ => panic!("expected a patch figure"),
        }
    }
}

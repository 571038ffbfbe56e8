//! Shadings: parsing, sampling and IR emission.
//!
//! The dispatcher in this module reads the top-level shading dictionary and
//! hands off to the gradient sampler (shading types 2 and 3) or the mesh
//! decoder (types 4 through 7). The result is always a complete
//! [`Shading`] value or [`Shading::Dummy`]; partially-decoded shadings are
//! never emitted.

mod mesh;
mod patch;

use crate::color::{ColorSpace, ColorSpaceCache};
use crate::function::{FunctionFactory, ShadingFunction};
use crate::handler::{Event, Feature, Handler};
use crate::ir::{ColorStop, GradientKind, Shading, StopColor};
use kurbo::{Affine, Rect};
use log::{info, warn};
use ombre_syntax::object::dict::keys::{
    BACKGROUND, BBOX, COLORSPACE, COORDS, CS, DOMAIN, EXTEND, SHADING_TYPE,
};
use ombre_syntax::object::{Dict, Object};
use ombre_syntax::source::MissingData;
use ombre_syntax::xref::XRef;
use std::fmt::{Display, Formatter};

/// The number of function samples taken across a gradient's domain.
///
/// Good enough for smooth functions; sharp color changes between samples are
/// smoothed out.
const NUMBER_OF_SAMPLES: u32 = 10;

/// The offset nudge applied to keep synthetic boundary stops strictly
/// ordered.
const SMALL_NUMBER: f32 = 1e-6;

/// An error of the shading decode path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Error {
    /// A required byte of the shading stream has not been fetched yet.
    MissingData,
    /// The shading dictionary or its bitstream is malformed.
    Format(String),
}

impl Error {
    fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}

impl From<MissingData> for Error {
    fn from(_: MissingData) -> Self {
        Self::MissingData
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingData => write!(f, "stream data not yet available"),
            Self::Format(message) => write!(f, "{message}"),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Parse a shading object into its IR.
///
/// `shading` is the dictionary of the shading, or its stream for the mesh
/// types; `matrix` is the graphics-state transform of the pattern and is
/// carried into the IR untouched.
///
/// A malformed shading degrades to [`Shading::Dummy`]: the failure is logged
/// and reported once through `handler`, and the caller keeps going. A
/// [`MissingData`] failure propagates instead, so the caller can retry the
/// parse once more bytes have been fetched.
pub fn parse_shading(
    shading: &Object,
    matrix: Affine,
    xref: &XRef,
    handler: &dyn Handler,
    functions: &dyn FunctionFactory,
    cs_cache: &ColorSpaceCache,
) -> std::result::Result<Shading, MissingData> {
    match parse_shading_impl(shading, matrix, xref, functions, cs_cache) {
        Ok(shading) => Ok(shading),
        Err(Error::MissingData) => Err(MissingData),
        Err(Error::Format(message)) => {
            warn!("unsupported shading: {message}");
            handler.send(Event::UnsupportedFeature(Feature::ShadingPattern));

            Ok(Shading::Dummy)
        }
    }
}

fn parse_shading_impl(
    shading: &Object,
    matrix: Affine,
    xref: &XRef,
    functions: &dyn FunctionFactory,
    cs_cache: &ColorSpaceCache,
) -> Result<Shading> {
    let resolved = xref
        .resolve(shading)
        .ok_or_else(|| Error::format("dangling shading reference"))?;

    let (dict, stream) = match resolved {
        Object::Stream(stream) => (stream.dict().clone(), Some(stream)),
        Object::Dict(dict) => (dict.clone(), None),
        _ => return Err(Error::format("shading must be a dictionary or a stream")),
    };

    let shading_type = dict
        .get::<u8>(SHADING_TYPE, xref)
        .ok_or_else(|| Error::format("missing or invalid ShadingType"))?;

    match shading_type {
        2 | 3 => radial_axial(
            &dict,
            shading_type == 2,
            matrix,
            xref,
            functions,
            cs_cache,
        ),
        4..=7 => mesh::parse(stream, shading_type, matrix, xref, functions, cs_cache),
        _ => Err(Error::Format(format!(
            "unsupported shading type: {shading_type}"
        ))),
    }
}

/// Read the color space of a shading, trying the abbreviated key first.
pub(crate) fn read_color_space(
    dict: &Dict,
    xref: &XRef,
    cs_cache: &ColorSpaceCache,
) -> Result<ColorSpace> {
    let obj = dict
        .get_raw(CS)
        .or_else(|| dict.get_raw(COLORSPACE))
        .ok_or_else(|| Error::format("shading without a color space"))?;

    ColorSpace::parse(obj, xref, cs_cache).ok_or_else(|| Error::format("invalid color space"))
}

/// Read and normalize the optional clip box of a shading.
pub(crate) fn read_bbox(dict: &Dict, xref: &XRef) -> Option<Rect> {
    dict.get::<[f64; 4]>(BBOX, xref)
        .map(|b| Rect::new(b[0], b[1], b[2], b[3]).abs())
}

fn radial_axial(
    dict: &Dict,
    axial: bool,
    matrix: Affine,
    xref: &XRef,
    functions: &dyn FunctionFactory,
    cs_cache: &ColorSpaceCache,
) -> Result<Shading> {
    let color_space = read_color_space(dict, xref, cs_cache)?;

    let (p0, p1, r0, r1) = if axial {
        let c = read_coords::<4>(dict, xref)?;

        ([c[0], c[1]], [c[2], c[3]], None, None)
    } else {
        let c = read_coords::<6>(dict, xref)?;

        // A radial gradient only renders faithfully when one circle contains
        // the other; everything else degrades downstream.
        let distance = (c[0] - c[3]).hypot(c[1] - c[4]);
        if c[2] <= c[5] + distance && c[5] <= c[2] + distance {
            warn!("Unsupported radial gradient.");
        }

        ([c[0], c[1]], [c[3], c[4]], Some(c[2]), Some(c[5]))
    };

    let [t0, t1] = dict.get::<[f32; 2]>(DOMAIN, xref).unwrap_or([0.0, 1.0]);
    let [extend_start, extend_end] = dict
        .get::<[bool; 2]>(EXTEND, xref)
        .unwrap_or([false, false]);

    let function = ShadingFunction::read(dict, xref, functions, &color_space)
        .ok_or_else(|| Error::format("missing or invalid shading function"))?;

    let background = dict
        .get::<Vec<f32>>(BACKGROUND, xref)
        .map(|comps| StopColor::Opaque(color_space.to_rgb(&comps)))
        .unwrap_or(StopColor::Transparent);

    let mut color_stops = Vec::new();
    let step = (t1 - t0) / NUMBER_OF_SAMPLES as f32;

    if t0 >= t1 || step <= 0.0 {
        // Acrobat seems to ignore shadings like this, so don't error out.
        info!("bad shading domain, emitting no color stops");
    } else {
        for i in 0..=NUMBER_OF_SAMPLES {
            let t = t0 + i as f32 * step;
            let components = function
                .eval(&[t])
                .ok_or_else(|| Error::format("shading function evaluation failed"))?;

            color_stops.push(ColorStop {
                offset: i as f32 / NUMBER_OF_SAMPLES as f32,
                color: StopColor::Opaque(color_space.to_rgb(&components)),
            });
        }

        if !extend_start {
            color_stops.insert(
                0,
                ColorStop {
                    offset: 0.0,
                    color: background,
                },
            );
            color_stops[1].offset += SMALL_NUMBER;
        }

        if !extend_end {
            if let Some(last) = color_stops.last_mut() {
                last.offset -= SMALL_NUMBER;
            }
            color_stops.push(ColorStop {
                offset: 1.0,
                color: background,
            });
        }
    }

    Ok(Shading::RadialAxial {
        kind: if axial {
            GradientKind::Axial
        } else {
            GradientKind::Radial
        },
        bbox: read_bbox(dict, xref),
        color_stops,
        p0,
        p1,
        r0,
        r1,
        matrix,
    })
}

fn read_coords<const N: usize>(dict: &Dict, xref: &XRef) -> Result<[f32; N]> {
    let coords = dict
        .get::<[f32; N]>(COORDS, xref)
        .filter(|c| c.iter().all(|v| v.is_finite()))
        .ok_or_else(|| Error::format("missing or invalid Coords array"))?;

    Ok(coords)
}

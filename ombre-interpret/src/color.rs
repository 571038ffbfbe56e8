//! Color spaces.
//!
//! The core only ever needs two things from a color space: its number of
//! components and a conversion from native components to 8-bit sRGB. The
//! device spaces are built in; richer spaces (ICC profiles, separations, …)
//! are supplied by the host through [`ColorSpace::new`] and the
//! [`ColorSpaceCache`].

use crate::util::OptionLog;
use ombre_syntax::object::{FromObject, Name, Object, Stream};
use ombre_syntax::xref::XRef;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

/// The components of a color, in the color space's native model.
pub type ColorComponents = SmallVec<[f32; 4]>;

/// A model converting native color components to 8-bit sRGB.
pub trait ColorModel {
    /// The number of components of the model.
    fn num_components(&self) -> usize;

    /// Convert components to 8-bit sRGB.
    fn to_rgb(&self, comps: &[f32]) -> [u8; 3];
}

/// The color space of a shading.
#[derive(Clone)]
pub struct ColorSpace(Arc<dyn ColorModel + Send + Sync>);

impl ColorSpace {
    /// Create a new color space from a model.
    pub fn new(model: impl ColorModel + Send + Sync + 'static) -> Self {
        Self(Arc::new(model))
    }

    /// The device gray color space.
    pub fn device_gray() -> Self {
        Self::new(DeviceGray)
    }

    /// The device RGB color space.
    pub fn device_rgb() -> Self {
        Self::new(DeviceRgb)
    }

    /// The device CMYK color space.
    pub fn device_cmyk() -> Self {
        Self::new(DeviceCmyk)
    }

    /// The number of components of the color space.
    pub fn num_components(&self) -> usize {
        self.0.num_components()
    }

    /// Convert native components to 8-bit sRGB.
    pub fn to_rgb(&self, comps: &[f32]) -> [u8; 3] {
        self.0.to_rgb(comps)
    }

    /// Parse a color space object.
    ///
    /// The device spaces and a few common aliases are handled directly;
    /// everything else is looked up in the cache, which the host populates
    /// with the spaces it has compiled.
    pub fn parse(obj: &Object, xref: &XRef, cache: &ColorSpaceCache) -> Option<Self> {
        match xref.resolve(obj)? {
            Object::Name(name) => Self::from_name(name, cache),
            Object::Array(items) => Self::from_array(items, xref, cache),
            _ => None.warn_none("color space must be a name or an array"),
        }
    }

    fn from_name(name: &Name, cache: &ColorSpaceCache) -> Option<Self> {
        match &**name {
            b"DeviceGray" | b"G" | b"CalGray" => Some(Self::device_gray()),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(Self::device_rgb()),
            b"DeviceCMYK" | b"CMYK" => Some(Self::device_cmyk()),
            _ => cache
                .get(name)
                .warn_none("unknown color space and no cached entry for it"),
        }
    }

    fn from_array(items: &[Object], xref: &XRef, cache: &ColorSpaceCache) -> Option<Self> {
        let family = Name::from_object(items.first()?, xref)?;

        match &*family {
            // An ICC profile always declares its channel count; approximate
            // it with the matching device space.
            b"ICCBased" => {
                let stream = Stream::from_object(items.get(1)?, xref)?;
                match stream.dict().get::<u8>(b"N", xref)? {
                    1 => Some(Self::device_gray()),
                    3 => Some(Self::device_rgb()),
                    4 => Some(Self::device_cmyk()),
                    _ => None.warn_none("ICC color space with unsupported channel count"),
                }
            }
            b"CalGray" => Some(Self::device_gray()),
            b"CalRGB" => Some(Self::device_rgb()),
            _ => cache
                .get(&family)
                .warn_none("unsupported color space family"),
        }
    }
}

impl Debug for ColorSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ColorSpace({} components)", self.num_components())
    }
}

/// A per-document cache of compiled color spaces, keyed by name.
///
/// Entries are immutable after write; the host registers the spaces it has
/// compiled so the core can look them up while parsing shadings.
#[derive(Debug, Default)]
pub struct ColorSpaceCache(Mutex<FxHashMap<Name, ColorSpace>>);

impl ColorSpaceCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a color space under the given name.
    pub fn insert(&self, name: Name, color_space: ColorSpace) {
        self.0.lock().unwrap().insert(name, color_space);
    }

    /// Look up a color space by name.
    pub fn get(&self, name: &Name) -> Option<ColorSpace> {
        self.0.lock().unwrap().get(name).cloned()
    }
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn comp(comps: &[f32], i: usize) -> f32 {
    comps.get(i).copied().unwrap_or(0.0)
}

#[derive(Debug)]
struct DeviceGray;

impl ColorModel for DeviceGray {
    fn num_components(&self) -> usize {
        1
    }

    fn to_rgb(&self, comps: &[f32]) -> [u8; 3] {
        let g = to_byte(comp(comps, 0));

        [g, g, g]
    }
}

#[derive(Debug)]
struct DeviceRgb;

impl ColorModel for DeviceRgb {
    fn num_components(&self) -> usize {
        3
    }

    fn to_rgb(&self, comps: &[f32]) -> [u8; 3] {
        [
            to_byte(comp(comps, 0)),
            to_byte(comp(comps, 1)),
            to_byte(comp(comps, 2)),
        ]
    }
}

#[derive(Debug)]
struct DeviceCmyk;

impl ColorModel for DeviceCmyk {
    fn num_components(&self) -> usize {
        4
    }

    fn to_rgb(&self, comps: &[f32]) -> [u8; 3] {
        let k = comp(comps, 3);

        [
            to_byte((1.0 - comp(comps, 0)) * (1.0 - k)),
            to_byte((1.0 - comp(comps, 1)) * (1.0 - k)),
            to_byte((1.0 - comp(comps, 2)) * (1.0 - k)),
        ]
    }
}

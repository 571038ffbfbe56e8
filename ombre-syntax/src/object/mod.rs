//! The object value model of shading dictionaries.

pub use crate::object::dict::Dict;
pub use crate::object::name::{Interner, Name};
pub use crate::object::stream::Stream;

pub mod dict;
mod name;
mod stream;

use crate::xref::{ObjRef, XRef};
use std::sync::Arc;

/// A primitive object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// The null object.
    Null,
    /// A boolean object.
    Boolean(bool),
    /// An integer number object.
    Integer(i64),
    /// A real number object.
    Real(f64),
    /// A name object.
    Name(Name),
    /// A byte string object.
    String(Arc<[u8]>),
    /// An array object.
    Array(Arc<[Object]>),
    /// A dict object.
    Dict(Dict),
    /// A stream object.
    Stream(Stream),
    /// A reference to an indirect object.
    Ref(ObjRef),
}

impl Object {
    /// Create an array object from the given items.
    pub fn array(items: impl IntoIterator<Item = Object>) -> Self {
        Self::Array(items.into_iter().collect::<Vec<_>>().into())
    }

    /// The number as an `f64`, if the object is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// The number as an `i64`, if the object is an integer or an integral
    /// real.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            _ => None,
        }
    }
}

/// A trait for types that can be extracted from an object.
pub trait FromObject: Sized {
    /// Extract the value, resolving references through the given store.
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self>;
}

impl FromObject for Object {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        xref.resolve(obj).cloned()
    }
}

impl FromObject for bool {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        match xref.resolve(obj)? {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromObject for f64 {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        xref.resolve(obj)?.as_f64()
    }
}

impl FromObject for f32 {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        xref.resolve(obj)?.as_f64().map(|n| n as f32)
    }
}

macro_rules! int_from_object {
    ($($t:ty),*) => {
        $(impl FromObject for $t {
            fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
                xref.resolve(obj)?.as_i64()?.try_into().ok()
            }
        })*
    };
}

int_from_object!(i32, i64, u8, u16, u32, usize);

impl FromObject for Name {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        match xref.resolve(obj)? {
            Object::Name(name) => Some(name.clone()),
            _ => None,
        }
    }
}

impl FromObject for Dict {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        match xref.resolve(obj)? {
            Object::Dict(dict) => Some(dict.clone()),
            Object::Stream(stream) => Some(stream.dict().clone()),
            _ => None,
        }
    }
}

impl FromObject for Stream {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        match xref.resolve(obj)? {
            Object::Stream(stream) => Some(stream.clone()),
            _ => None,
        }
    }
}

impl<T: FromObject> FromObject for Vec<T> {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        match xref.resolve(obj)? {
            Object::Array(items) => items.iter().map(|o| T::from_object(o, xref)).collect(),
            _ => None,
        }
    }
}

impl<T: FromObject, const N: usize> FromObject for [T; N] {
    fn from_object(obj: &Object, xref: &XRef) -> Option<Self> {
        match xref.resolve(obj)? {
            Object::Array(items) if items.len() == N => items
                .iter()
                .map(|o| T::from_object(o, xref))
                .collect::<Option<Vec<_>>>()?
                .try_into()
                .ok(),
            _ => None,
        }
    }
}

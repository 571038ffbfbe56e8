//! Dictionaries.

use crate::object::{FromObject, Name, Object};
use crate::xref::XRef;
use rustc_hash::FxHashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A dictionary: a mapping from names to objects.
///
/// Insertion order is irrelevant; values may be references that are resolved
/// on access. Cheap to clone.
#[derive(Clone, PartialEq)]
pub struct Dict(Arc<FxHashMap<Name, Object>>);

impl Default for Dict {
    fn default() -> Self {
        Self::empty()
    }
}

impl Dict {
    /// Create a new dictionary from the given entries.
    pub fn new(entries: impl IntoIterator<Item = (Name, Object)>) -> Self {
        Self(Arc::new(entries.into_iter().collect()))
    }

    /// Create a new empty dictionary.
    pub fn empty() -> Self {
        Self(Arc::new(FxHashMap::default()))
    }

    /// Returns the number of entries in the dictionary.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks whether the dictionary contains an entry with a specific key.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    /// Return the entry of a key as a specific type, resolving references
    /// through the given store.
    pub fn get<T>(&self, key: &[u8], xref: &XRef) -> Option<T>
    where
        T: FromObject,
    {
        T::from_object(self.get_raw(key)?, xref)
    }

    /// Return the raw entry for a specific key, without resolving references.
    pub fn get_raw(&self, key: &[u8]) -> Option<&Object> {
        self.0.get(key)
    }

    /// Returns an iterator over all keys in the dictionary.
    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.0.keys()
    }
}

impl Debug for Dict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug_struct = f.debug_struct("Dict");

        let mut sorted_keys = self.0.keys().collect::<Vec<_>>();
        sorted_keys.sort();

        for key in sorted_keys {
            debug_struct.field(&format!("{key:?}"), &self.0[&**key]);
        }

        debug_struct.finish()
    }
}

/// The dictionary keys of the shading subsystem.
pub mod keys {
    macro_rules! key {
        ($i:ident, $e:expr) => {
            pub const $i: &'static [u8] = $e;
        };
    }

    key!(BACKGROUND, b"Background");
    key!(BBOX, b"BBox");
    key!(BITS_PER_COMPONENT, b"BitsPerComponent");
    key!(BITS_PER_COORDINATE, b"BitsPerCoordinate");
    key!(BITS_PER_FLAG, b"BitsPerFlag");
    key!(COLORSPACE, b"ColorSpace");
    key!(COORDS, b"Coords");
    key!(CS, b"CS");
    key!(DECODE, b"Decode");
    key!(DOMAIN, b"Domain");
    key!(EXTEND, b"Extend");
    key!(FUNCTION, b"Function");
    key!(MATRIX, b"Matrix");
    key!(SHADING_TYPE, b"ShadingType");
    key!(VERTICES_PER_ROW, b"VerticesPerRow");
}

#[cfg(test)]
mod tests {
    use super::keys::*;
    use super::*;
    use crate::xref::ObjRef;

    #[test]
    fn typed_getters_resolve_references() {
        let xref = XRef::new([(ObjRef::new(4, 0), Object::Integer(6))]);
        let dict = Dict::new([
            (Name::new(SHADING_TYPE), Object::Ref(ObjRef::new(4, 0))),
            (Name::new(BITS_PER_FLAG), Object::Integer(8)),
        ]);

        assert_eq!(dict.get::<u8>(SHADING_TYPE, &xref), Some(6));
        assert_eq!(dict.get::<u8>(BITS_PER_FLAG, &xref), Some(8));
        assert_eq!(dict.get::<u8>(DECODE, &xref), None);
        assert!(dict.contains_key(SHADING_TYPE));
    }

    #[test]
    fn typed_getters_read_arrays() {
        let xref = XRef::dummy();
        let dict = Dict::new([(
            Name::new(DOMAIN),
            Object::Array(vec![Object::Integer(0), Object::Real(0.5)].into()),
        )]);

        assert_eq!(dict.get::<[f32; 2]>(DOMAIN, &xref), Some([0.0, 0.5]));
        // Length must match exactly.
        assert_eq!(dict.get::<[f32; 3]>(DOMAIN, &xref), None);
    }
}

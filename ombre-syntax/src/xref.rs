//! The cross-reference store used to resolve indirect object references.

use crate::object::Object;
use log::warn;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    /// The object number.
    pub num: u32,
    /// The generation number.
    pub generation: u16,
}

impl ObjRef {
    /// Create a new object reference.
    pub fn new(num: u32, generation: u16) -> Self {
        Self { num, generation }
    }
}

/// How many reference hops are followed before giving up.
///
/// Guards against reference cycles in broken files.
const MAX_REF_DEPTH: usize = 32;

/// A store of indirect objects, keyed by their references.
///
/// Cheap to clone; the underlying table is shared and immutable after
/// construction.
#[derive(Debug, Clone)]
pub struct XRef(Arc<FxHashMap<ObjRef, Object>>);

impl XRef {
    /// Create a new store from the given entries.
    pub fn new(entries: impl IntoIterator<Item = (ObjRef, Object)>) -> Self {
        Self(Arc::new(entries.into_iter().collect()))
    }

    /// Create an empty store that resolves nothing.
    pub fn dummy() -> Self {
        Self(Arc::new(FxHashMap::default()))
    }

    /// Look up the object behind a reference.
    pub fn get(&self, obj_ref: ObjRef) -> Option<&Object> {
        self.0.get(&obj_ref)
    }

    /// Resolve an object, following chains of references.
    ///
    /// Non-reference objects resolve to themselves. Returns `None` for
    /// dangling references and for cycles.
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        let mut cur = obj;

        for _ in 0..MAX_REF_DEPTH {
            match cur {
                Object::Ref(r) => cur = self.get(*r)?,
                _ => return Some(cur),
            }
        }

        warn!("giving up on a chain of object references after {MAX_REF_DEPTH} hops");

        None
    }
}

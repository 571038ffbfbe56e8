//! Name objects and their interner.

use rustc_hash::FxHashMap;
use std::borrow::Borrow;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// A name: a short byte string used as a dictionary key or symbolic value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<[u8]>);

impl Name {
    /// Create a new name from raw bytes.
    ///
    /// Prefer [`Interner::intern`] when many names are created so that
    /// repeated names share one allocation.
    pub fn new(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }

    /// Return the name as a string, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl Deref for Name {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "/{s}"),
            None => write!(f, "/{:?}", &*self.0),
        }
    }
}

/// Interns names so that repeated ones share a single allocation.
///
/// Owned by the document-parse context; entries are immutable after write and
/// never evicted. There is no cross-document sharing.
#[derive(Debug, Default)]
pub struct Interner {
    names: FxHashMap<Arc<[u8]>, Name>,
}

impl Interner {
    /// Create a new empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern the given bytes.
    pub fn intern(&mut self, bytes: &[u8]) -> Name {
        if let Some(name) = self.names.get(bytes) {
            return name.clone();
        }

        let bytes: Arc<[u8]> = bytes.into();
        let name = Name(bytes.clone());
        self.names.insert(bytes, name.clone());

        name
    }
}

//! Stream objects.

use crate::object::Dict;
use crate::source::PartialSource;
use std::sync::Arc;

/// A stream object: a dictionary together with its byte content.
///
/// The bytes may not all have been fetched yet; reading past the fetched
/// range through [`Stream::source`] fails with
/// [`MissingData`](crate::source::MissingData) until the stream is refreshed
/// with a larger prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dict: Dict,
    data: Arc<[u8]>,
    available: usize,
}

impl Stream {
    /// Create a new stream over fully-materialized data.
    pub fn new(dict: Dict, data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let available = data.len();

        Self {
            dict,
            data,
            available,
        }
    }

    /// Create a new stream of which only the first `available` bytes have
    /// been fetched.
    pub fn with_available(dict: Dict, data: impl Into<Arc<[u8]>>, available: usize) -> Self {
        let data = data.into();
        let available = available.min(data.len());

        Self {
            dict,
            data,
            available,
        }
    }

    /// The dictionary of the stream.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    /// A byte source over the stream content, starting at the beginning.
    pub fn source(&self) -> PartialSource<'_> {
        PartialSource::new(&self.data, self.available)
    }
}

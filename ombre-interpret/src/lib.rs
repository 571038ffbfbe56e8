/*!
A crate for interpreting shading patterns into a rasterizer-ready IR.

Given a shading dictionary (or stream) and a graphics-state transform, the
entry point [`parse_shading`] decodes the shading and returns a flat,
serializable [`Shading`](ir::Shading) value: sampled color stops for axial and
radial gradients, packed coordinate/color buffers plus figures for the four
mesh shading types.

The collaborators the core depends on — the indirect-object resolver, the
color-space machinery, the numeric-function factory and the byte-stream
abstraction — stay behind the seams in [`color`], [`function`] and
`ombre-syntax`; clients plug their own implementations into them.

Decoding can fail in two very different ways. A malformed shading degrades to
[`Shading::Dummy`](ir::Shading::Dummy) and a diagnostic event on the
[`Handler`](handler::Handler), so one broken shading never takes down a page.
A [`MissingData`](ombre_syntax::source::MissingData) failure means the byte
stream has not been fetched far enough yet; it propagates as an error so the
caller can retry once more bytes are available.
*/

#![forbid(unsafe_code)]

mod util;

pub mod color;
pub mod function;
pub mod handler;
pub mod ir;
pub mod shading;

pub use ombre_syntax;
pub use shading::parse_shading;

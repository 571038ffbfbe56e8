/*!
A low-level crate for reading shading objects and their bit streams.

This crate provides the value model for shading dictionaries (objects, dicts,
names, streams and the cross-reference store used to resolve indirect
references) together with a bit-level reader over byte sources that may
produce their data on demand.

Decoding a shading is the job of the `ombre-interpret` crate; everything here
is deliberately independent of what the bits mean.
*/

#![forbid(unsafe_code)]

pub mod bit_reader;
pub mod object;
pub mod source;
pub mod xref;

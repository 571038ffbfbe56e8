//! Shading functions.
//!
//! The core never interprets function objects itself; it asks the host's
//! [`FunctionFactory`] to compile them and then uses the result as a
//! black-box evaluator.

use crate::color::ColorSpace;
use crate::util::OptionLog;
use log::warn;
use ombre_syntax::object::dict::keys::FUNCTION;
use ombre_syntax::object::{Dict, Object};
use ombre_syntax::xref::XRef;
use smallvec::{SmallVec, smallvec};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// The input/output type of functions.
pub type Values = SmallVec<[f32; 4]>;

/// The evaluator behind a [`Function`].
pub trait FunctionEval {
    /// Evaluate the function on the given input tuple.
    ///
    /// Returns `None` if the input is outside the function's domain in a way
    /// the evaluator cannot recover from.
    fn eval(&self, input: &[f32]) -> Option<Values>;
}

/// A compiled domain→range mapping.
#[derive(Clone)]
pub struct Function(Arc<dyn FunctionEval + Send + Sync>);

impl Function {
    /// Create a new function from an evaluator.
    pub fn new(eval: impl FunctionEval + Send + Sync + 'static) -> Self {
        Self(Arc::new(eval))
    }

    /// Create a new function from a closure.
    pub fn from_fn(f: impl Fn(&[f32]) -> Values + Send + Sync + 'static) -> Self {
        struct Closure<F>(F);

        impl<F: Fn(&[f32]) -> Values> FunctionEval for Closure<F> {
            fn eval(&self, input: &[f32]) -> Option<Values> {
                Some((self.0)(input))
            }
        }

        Self::new(Closure(f))
    }

    /// Evaluate the function with the given input.
    pub fn eval(&self, input: &[f32]) -> Option<Values> {
        self.0.eval(input)
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Function(..)")
    }
}

/// Compiles function objects into evaluators.
///
/// Implemented by the host's numeric-function machinery.
pub trait FunctionFactory {
    /// Compile a single function object.
    fn create(&self, obj: &Object, xref: &XRef) -> Option<Function>;
}

/// The function supplied to a shading.
#[derive(Debug, Clone)]
pub enum ShadingFunction {
    /// A single function, which should be used to evaluate all components of
    /// the shading.
    Single(Function),
    /// Multiple functions, one for each color component.
    Multiple(SmallVec<[Function; 4]>),
}

impl ShadingFunction {
    /// Evaluate the shading function.
    pub fn eval(&self, input: &[f32]) -> Option<Values> {
        match self {
            Self::Single(s) => s.eval(input),
            Self::Multiple(m) => {
                // 1-in, 1-out function for each color component.

                let mut out = smallvec![];

                for func in m {
                    out.push(*func.eval(input)?.first()?);
                }

                Some(out)
            }
        }
    }

    /// Read the function entry of a shading dictionary.
    pub(crate) fn read(
        dict: &Dict,
        xref: &XRef,
        factory: &dyn FunctionFactory,
        color_space: &ColorSpace,
    ) -> Option<Self> {
        let obj = dict.get_raw(FUNCTION)?;

        match xref.resolve(obj)? {
            Object::Array(items) => {
                let funcs: Option<SmallVec<_>> =
                    items.iter().map(|o| factory.create(o, xref)).collect();
                let funcs = funcs?;

                if funcs.len() != color_space.num_components() {
                    warn!("function array of shading has wrong size");

                    return None;
                }

                Some(Self::Multiple(funcs))
            }
            obj => factory
                .create(obj, xref)
                .map(Self::Single)
                .warn_none("shading function could not be compiled"),
        }
    }
}

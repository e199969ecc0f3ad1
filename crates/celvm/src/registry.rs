//! The function registry: a name-and-overload table with strict dispatch.
//!
//! Overloads are keyed by `(name, receiver_style, argument type tags)`.
//! Registration rejects a second overload with an identical signature;
//! lookup treats a declared [`CelType::Any`] slot as a wildcard. The
//! registry is populated once, then shared read-only into every built
//! program.

use std::fmt;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{
    error::{CelError, EvalResult, RegistryError},
    value::{CelType, CelValue},
};

/// A function invoker: a slice of evaluated arguments in, a value out.
///
/// Domain failures (division by zero, bad keys) are reported as `Ok` error
/// *values*; an `Err` is a status that aborts the evaluation.
pub type CelFunction = Box<dyn Fn(&[CelValue]) -> EvalResult<CelValue> + Send + Sync>;

/// Identifies one overload: function name, receiver-vs-global style, and
/// the ordered argument type tags (the receiver counts as argument zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    name: String,
    receiver_style: bool,
    arg_types: Vec<CelType>,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, receiver_style: bool, arg_types: Vec<CelType>) -> Self {
        Self { name: name.into(), receiver_style, arg_types }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn receiver_style(&self) -> bool {
        self.receiver_style
    }

    pub fn arg_types(&self) -> &[CelType] {
        &self.arg_types
    }

    /// Whether this overload accepts a call with the given style and
    /// argument tags. A declared `Any` slot matches every tag.
    fn shape_matches(&self, receiver_style: bool, arg_types: &[CelType]) -> bool {
        self.receiver_style == receiver_style
            && self.arg_types.len() == arg_types.len()
            && self
                .arg_types
                .iter()
                .zip(arg_types)
                .all(|(declared, actual)| *declared == CelType::Any || declared == actual)
    }

    fn signature(&self) -> String {
        let style = if self.receiver_style { "receiver" } else { "global" };
        let args: Vec<&'static str> = self.arg_types.iter().map(|t| (*t).into()).collect();
        format!("{} [{style}] ({})", self.name, args.join(", "))
    }
}

struct Overload {
    descriptor: FunctionDescriptor,
    function: CelFunction,
}

/// The overload table. Writable until the first program is built against
/// it, read-only afterwards.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: AHashMap<String, Vec<Overload>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an overload. Two overloads with identical signatures are
    /// prohibited; `Any` slots participate in that identity.
    pub fn register(
        &mut self,
        descriptor: FunctionDescriptor,
        function: CelFunction,
    ) -> Result<(), RegistryError> {
        let overloads = self.functions.entry(descriptor.name.clone()).or_default();
        if overloads.iter().any(|o| {
            o.descriptor.receiver_style == descriptor.receiver_style
                && o.descriptor.arg_types == descriptor.arg_types
        }) {
            return Err(RegistryError::DuplicateOverload(descriptor.signature()));
        }
        overloads.push(Overload { descriptor, function });
        Ok(())
    }

    /// Returns the descriptors of every overload accepting the given call
    /// shape.
    pub fn find_overloads(
        &self,
        name: &str,
        receiver_style: bool,
        arg_types: &[CelType],
    ) -> Vec<&FunctionDescriptor> {
        self.functions
            .get(name)
            .into_iter()
            .flatten()
            .filter(|o| o.descriptor.shape_matches(receiver_style, arg_types))
            .map(|o| &o.descriptor)
            .collect()
    }

    /// Resolves an overload from the argument tags and invokes it.
    ///
    /// A convenience for exercising registered functions directly; the
    /// evaluator's `Invoke` step uses the same resolution.
    pub fn invoke(
        &self,
        name: &str,
        receiver_style: bool,
        args: &[CelValue],
    ) -> EvalResult<CelValue> {
        self.dispatch(name, receiver_style, args)
    }

    /// Strict dispatch: resolve the overload from the argument tags and
    /// call it. When no overload matches, the leftmost error argument
    /// propagates, then the leftmost unknown, and otherwise the result is
    /// the `no_matching_overload` error value.
    pub(crate) fn dispatch(
        &self,
        name: &str,
        receiver_style: bool,
        args: &[CelValue],
    ) -> EvalResult<CelValue> {
        let tags: SmallVec<[CelType; 4]> = args.iter().map(CelValue::type_tag).collect();
        let overload = self
            .functions
            .get(name)
            .into_iter()
            .flatten()
            .find(|o| o.descriptor.shape_matches(receiver_style, &tags));
        match overload {
            Some(o) => (o.function)(args),
            None => {
                if let Some(err) = args.iter().find(|a| a.is_error()) {
                    return Ok(err.clone());
                }
                if let Some(unknown) = args.iter().find(|a| a.is_unknown()) {
                    return Ok(unknown.clone());
                }
                Ok(CelValue::error(CelError::no_matching_overload()))
            }
        }
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

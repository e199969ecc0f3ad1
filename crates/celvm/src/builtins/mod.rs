//! The built-in function library.
//!
//! Everything here is registered through the ordinary overload table; the
//! evaluator has no special knowledge of any builtin beyond the names the
//! step builder uses for short-circuit lowering. Domain failures are
//! returned as error values so they ride the stack; an `Err` from an
//! invoker is reserved for broken invariants.

use crate::{
    error::{EvalResult, RegistryError},
    registry::{FunctionDescriptor, FunctionRegistry},
    value::{CelType, CelValue},
};

mod arithmetic;
mod comparisons;
mod containers;
mod conversions;
mod logical;
mod strings;
mod time;

// Operator names, as produced by a CEL parser.
pub const NOT: &str = "!_";
pub const NEG: &str = "-_";
pub const AND: &str = "_&&_";
pub const OR: &str = "_||_";
pub const TERNARY: &str = "_?_:_";
pub const NOT_STRICTLY_FALSE: &str = "__not_strictly_false__";
pub const EQUAL: &str = "_==_";
pub const NOT_EQUAL: &str = "_!=_";
pub const LESS: &str = "_<_";
pub const LESS_EQUAL: &str = "_<=_";
pub const GREATER: &str = "_>_";
pub const GREATER_EQUAL: &str = "_>=_";
pub const ADD: &str = "_+_";
pub const SUBTRACT: &str = "_-_";
pub const MULTIPLY: &str = "_*_";
pub const DIVIDE: &str = "_/_";
pub const MODULO: &str = "_%_";
pub const INDEX: &str = "_[_]";
pub const IN: &str = "@in";
/// Older spelling of [`IN`]; bindings are kept for stored expressions.
pub const IN_DEPRECATED: &str = "_in_";
/// Function-call spelling of [`IN`]; kept for stored expressions.
pub const IN_FUNCTION: &str = "in";

// Library function names.
pub const SIZE: &str = "size";
pub const CONTAINS: &str = "contains";
pub const STARTS_WITH: &str = "startsWith";
pub const ENDS_WITH: &str = "endsWith";
pub const MATCHES: &str = "matches";
pub const TIMESTAMP: &str = "timestamp";
pub const DURATION: &str = "duration";
pub const INT: &str = "int";
pub const STRING: &str = "string";
pub const FULL_YEAR: &str = "getFullYear";
pub const MONTH: &str = "getMonth";
pub const DAY_OF_YEAR: &str = "getDayOfYear";
pub const DAY_OF_MONTH: &str = "getDayOfMonth";
pub const DATE: &str = "getDate";
pub const DAY_OF_WEEK: &str = "getDayOfWeek";
pub const HOURS: &str = "getHours";
pub const MINUTES: &str = "getMinutes";
pub const SECONDS: &str = "getSeconds";
pub const MILLISECONDS: &str = "getMilliseconds";

/// Registers the complete standard library on the registry.
pub fn register_builtin_functions(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    logical::register(registry)?;
    comparisons::register(registry)?;
    arithmetic::register(registry)?;
    containers::register(registry)?;
    strings::register(registry)?;
    time::register(registry)?;
    conversions::register(registry)?;
    Ok(())
}

/// Registration shorthand shared by the submodules.
pub(crate) fn add(
    registry: &mut FunctionRegistry,
    name: &str,
    receiver_style: bool,
    arg_types: &[CelType],
    function: impl Fn(&[CelValue]) -> EvalResult<CelValue> + Send + Sync + 'static,
) -> Result<(), RegistryError> {
    registry.register(
        FunctionDescriptor::new(name, receiver_style, arg_types.to_vec()),
        Box::new(function),
    )
}

//! Error tiers of the evaluator.
//!
//! Three distinct kinds of failure flow through this crate:
//!
//! - [`CelError`] is a *value-level* error. It rides the operand stack like
//!   any other value, is absorbed by boolean short-circuit, and surfaces as
//!   the evaluation result. Division by zero, missing map keys, and failed
//!   overload dispatch all produce these.
//! - [`EvalError`] terminates an evaluation: stack underflow, a corrupted
//!   step list, or a function invoker reporting broken invariants.
//! - [`BuildError`] and [`RegistryError`] are produced before any program
//!   runs, by the step builder and the function registry respectively.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// The fixed taxonomy of error kinds shared by value-level and
/// evaluator-level errors.
///
/// `Unknown` is the unspecified code used by arithmetic failures; it is
/// distinct from the unknown *value* variant, which marks withheld input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Unknown,
    InvalidArgument,
    NoSuchKey,
    NoMatchingOverload,
    NoSuchField,
    Internal,
}

/// A value-level error record: an [`ErrorKind`] plus a human-readable
/// message.
///
/// These are ordinary values. Strict operators propagate them, `&&`/`||`
/// absorb them when the other operand decides the outcome, and a ternary
/// with an error condition returns the condition's error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CelError {
    kind: ErrorKind,
    message: String,
}

impl CelError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// The error produced when overload dispatch finds no candidate.
    ///
    /// The message is the bare kind name; callers match on it.
    pub fn no_matching_overload() -> Self {
        Self::new(ErrorKind::NoMatchingOverload, "no_matching_overload")
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn no_such_key(key: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NoSuchKey, format!("Key not found: {key}"))
    }

    pub fn no_such_field(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoSuchField, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CelError {}

/// Result alias for step execution and function invocation.
pub type EvalResult<T> = Result<T, EvalError>;

/// An evaluator-level failure that aborts evaluation with a status instead
/// of producing a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    kind: ErrorKind,
    message: String,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EvalError {}

/// A failure reported by the step builder; the expression is never
/// produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The AST uses a construct the core does not compile (for example a
    /// message-typed struct literal, which belongs to the reflection layer).
    Unsupported(String),
    /// The AST is structurally broken (missing comprehension variables,
    /// jump offsets out of range).
    Malformed(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported(msg) => write!(f, "unsupported expression: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed expression: {msg}"),
        }
    }
}

impl std::error::Error for BuildError {}

/// A failure reported by [`FunctionRegistry`](crate::FunctionRegistry)
/// registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An overload with an identical signature is already registered.
    DuplicateOverload(String),
    /// The registry has been shared into a built program and can no longer
    /// be mutated.
    Frozen,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateOverload(sig) => {
                write!(f, "overload already registered: {sig}")
            }
            Self::Frozen => write!(f, "registry is frozen after first use"),
        }
    }
}

impl std::error::Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(ErrorKind::NoMatchingOverload.to_string(), "no_matching_overload");
        assert_eq!(ErrorKind::InvalidArgument.to_string(), "invalid_argument");
        assert_eq!(ErrorKind::NoSuchKey.to_string(), "no_such_key");
        assert_eq!(ErrorKind::Internal.to_string(), "internal");
    }

    #[test]
    fn no_matching_overload_message_is_the_kind_name() {
        let err = CelError::no_matching_overload();
        assert_eq!(err.kind(), ErrorKind::NoMatchingOverload);
        assert_eq!(err.message(), "no_matching_overload");
    }

    #[test]
    fn no_such_key_formats_the_key() {
        let err = CelError::no_such_key(0);
        assert_eq!(err.message(), "Key not found: 0");
    }
}

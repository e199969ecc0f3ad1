#![doc = include_str!("../../../README.md")]

mod activation;
mod ast;
pub mod builtins;
mod error;
mod listener;
mod program;
mod registry;
mod value;

pub use crate::{
    activation::{Activation, PathMask, VariableActivation},
    ast::{Comprehension, Constant, Expr, ExprKind, StructEntry},
    builtins::register_builtin_functions,
    error::{BuildError, CelError, ErrorKind, EvalError, EvalResult, RegistryError},
    listener::{EvalListener, NoopListener, RecordingListener},
    program::{ExprBuilder, Program},
    registry::{CelFunction, FunctionDescriptor, FunctionRegistry},
    value::{CelList, CelMap, CelType, CelValue, MapKey, MessageValue},
};

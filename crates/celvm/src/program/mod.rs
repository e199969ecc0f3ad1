//! Compilation and execution of flat expression programs.
//!
//! The builder walks an expression tree once and lowers it into an ordered
//! step list with precomputed jump offsets; the interpreter replays that
//! list over a value stack with no recursion at runtime.
//!
//! # Module structure
//!
//! - `step` - the step type and its jump-offset operands
//! - `builder` - AST lowering, short-circuit and comprehension layout
//! - `stack` - the operand stack
//! - `vm` - the execution frame and interpreter loop

use std::sync::Arc;

use ahash::AHashMap;

pub use builder::ExprBuilder;

use crate::registry::FunctionRegistry;
use step::Step;

mod builder;
mod stack;
mod step;
mod vm;

/// A compiled expression: an immutable step list plus the registry and
/// enum table it was built against.
///
/// Programs are `Send + Sync`; concurrent evaluations each own their frame
/// and stack.
#[derive(Debug)]
pub struct Program {
    steps: Vec<Step>,
    registry: Arc<FunctionRegistry>,
    enums: Arc<AHashMap<String, i64>>,
}

impl Program {
    pub(crate) fn new(
        steps: Vec<Step>,
        registry: Arc<FunctionRegistry>,
        enums: Arc<AHashMap<String, i64>>,
    ) -> Self {
        Self { steps, registry, enums }
    }

    pub(crate) fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

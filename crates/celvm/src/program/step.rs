//! The step type: one instruction of the linearised execution plan.
//!
//! Steps are immutable once a program is built. Each carries the id of the
//! AST node it came from and a flag distinguishing AST-origin steps (which
//! publish to a trace listener) from builder-synthesized ones (which are
//! silent). Jump offsets are relative to the step *following* the jump, so
//! an offset of zero is a no-op.

use crate::value::CelValue;

/// One instruction. `expr_id` points back at the originating AST node;
/// `comes_from_ast` is false for synthesized steps.
#[derive(Debug)]
pub(crate) struct Step {
    pub kind: StepKind,
    pub expr_id: i64,
    pub comes_from_ast: bool,
}

#[derive(Debug)]
pub(crate) enum StepKind {
    /// Pushes an immediate value.
    Const(CelValue),
    /// Resolves a name: comprehension bindings, then the unknown mask,
    /// then the activation, then registered enum values.
    Ident(String),
    /// Pops the operand and pushes the named field (or, for `test_only`,
    /// its presence as a bool). `qualified_path` is the precomputed dotted
    /// path when the operand chain is pure identifiers/selects; it is
    /// intersected with the activation's unknown mask.
    Select {
        field: String,
        test_only: bool,
        qualified_path: Option<String>,
    },
    /// Dispatches `argc` stack values through the function registry.
    Invoke {
        function: String,
        receiver_style: bool,
        argc: usize,
    },
    /// Pops `size` elements and pushes a list.
    CreateList { size: usize },
    /// Pops `entries` key/value pairs and pushes a map.
    CreateMap { entries: usize },
    /// Unconditional relative jump (also the loop back-edge).
    Jump { offset: i32 },
    /// Peeks the top of stack; jumps when it is the deciding boolean for a
    /// short-circuit operator (`false` for `&&`, `true` for `||`), leaving
    /// the value in place. Everything else falls through to the merge call.
    LogicJump { jump_on: bool, offset: i32 },
    /// Pops the ternary condition: `true` falls into the then-branch,
    /// `false` jumps to the else-branch, and any non-boolean pushes the
    /// resulting error/unknown and jumps past both branches.
    TernaryJump { else_offset: i32, end_offset: i32 },
    /// Replaces a map on top of the stack with the list of its keys;
    /// a no-op for anything else.
    ListKeys,
    /// Pops the iteration range and opens an iteration frame binding
    /// `iter_var` and `accu_var`.
    IterInit { iter_var: String, accu_var: String },
    /// Pops the accumulator seed into the current iteration frame.
    AccuInit,
    /// Advances the iteration: binds the next element and falls through,
    /// jumps to `end_offset` when the range is exhausted, or pushes an
    /// error and jumps to `error_offset` when the range is not a list.
    IterNext { end_offset: i32, error_offset: i32 },
    /// Pops the loop condition. `true` continues; `false` exits when
    /// short-circuiting (and is ignored otherwise); anything else becomes
    /// the accumulator and exits, so the result subexpression surfaces it.
    LoopCond { end_offset: i32, shortcircuit: bool },
    /// Pops the loop step's value into the accumulator.
    AccuStep,
    /// Closes the iteration frame, leaving the comprehension's value on
    /// the stack.
    IterFinish,
}

impl Step {
    pub fn from_ast(expr_id: i64, kind: StepKind) -> Self {
        Self { kind, expr_id, comes_from_ast: true }
    }

    pub fn synthesized(expr_id: i64, kind: StepKind) -> Self {
        Self { kind, expr_id, comes_from_ast: false }
    }
}

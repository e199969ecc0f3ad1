//! Lowers an expression tree into the flat step list.
//!
//! The walk is post-order: by the time an operator's step executes, its
//! arguments are already on the stack. Forward jumps are emitted with
//! placeholder offsets and patched once their target position is known;
//! backward jumps (the comprehension loop edge) are computed at emit time.

use std::sync::Arc;

use ahash::AHashMap;

use crate::{
    ast::{Comprehension, Constant, Expr, ExprKind},
    builtins::{AND, OR, TERNARY},
    error::BuildError,
    program::{
        Program,
        step::{Step, StepKind},
    },
    registry::FunctionRegistry,
    value::CelValue,
};

/// A forward jump awaiting its target.
#[derive(Debug, Clone, Copy)]
struct JumpLabel(usize);

/// Which offset field of the labelled step to patch.
#[derive(Debug, Clone, Copy)]
enum JumpSlot {
    Jump,
    Logic,
    TernaryElse,
    TernaryEnd,
    NextEnd,
    NextError,
    CondEnd,
}

/// Accumulates steps during lowering and resolves jump offsets.
#[derive(Debug, Default)]
struct StepBuffer {
    steps: Vec<Step>,
}

impl StepBuffer {
    fn new() -> Self {
        Self::default()
    }

    fn pos(&self) -> usize {
        self.steps.len()
    }

    fn push_ast(&mut self, expr_id: i64, kind: StepKind) {
        self.steps.push(Step::from_ast(expr_id, kind));
    }

    fn push_synthesized(&mut self, expr_id: i64, kind: StepKind) {
        self.steps.push(Step::synthesized(expr_id, kind));
    }

    /// Emits a synthesized step containing a placeholder offset and
    /// returns a label for patching.
    fn push_jump(&mut self, expr_id: i64, kind: StepKind) -> JumpLabel {
        let label = JumpLabel(self.steps.len());
        self.steps.push(Step::synthesized(expr_id, kind));
        label
    }

    /// Emits an unconditional backward jump to a known position.
    fn push_jump_to(&mut self, expr_id: i64, target: usize) -> Result<(), BuildError> {
        let offset = relative_offset(self.steps.len(), target)?;
        self.push_synthesized(expr_id, StepKind::Jump { offset });
        Ok(())
    }

    /// Patches the labelled step's `slot` to jump to the current position.
    fn patch(&mut self, label: JumpLabel, slot: JumpSlot) -> Result<(), BuildError> {
        let offset = relative_offset(label.0, self.pos())?;
        let step = &mut self.steps[label.0];
        match (&mut step.kind, slot) {
            (StepKind::Jump { offset: o }, JumpSlot::Jump)
            | (StepKind::LogicJump { offset: o, .. }, JumpSlot::Logic)
            | (StepKind::TernaryJump { else_offset: o, .. }, JumpSlot::TernaryElse)
            | (StepKind::TernaryJump { end_offset: o, .. }, JumpSlot::TernaryEnd)
            | (StepKind::IterNext { end_offset: o, .. }, JumpSlot::NextEnd)
            | (StepKind::IterNext { error_offset: o, .. }, JumpSlot::NextError)
            | (StepKind::LoopCond { end_offset: o, .. }, JumpSlot::CondEnd) => {
                *o = offset;
                Ok(())
            }
            _ => Err(BuildError::Malformed("jump label does not match its step".to_string())),
        }
    }
}

/// Offset of `target` relative to the step following `from`.
fn relative_offset(from: usize, target: usize) -> Result<i32, BuildError> {
    let offset = target as i64 - (from as i64 + 1);
    i32::try_from(offset)
        .map_err(|_| BuildError::Malformed("jump offset out of range".to_string()))
}

/// Compiles expression trees into immutable [`Program`]s.
///
/// The builder owns the function registry until the first successful
/// `build`; from then on the registry is shared into the program and
/// further registration fails as frozen.
#[derive(Debug)]
pub struct ExprBuilder {
    registry: Arc<FunctionRegistry>,
    enums: AHashMap<String, i64>,
    shortcircuiting: bool,
}

impl ExprBuilder {
    pub fn new(registry: FunctionRegistry) -> Self {
        Self { registry: Arc::new(registry), enums: AHashMap::new(), shortcircuiting: true }
    }

    /// Toggles short-circuit lowering of `&&`, `||`, the ternary, and
    /// comprehension loop conditions. Defaults to on. Turning it off makes
    /// both operands evaluate for their side effects; results are
    /// unaffected.
    pub fn set_shortcircuiting(&mut self, on: bool) {
        self.shortcircuiting = on;
    }

    /// Registers a fully qualified enum value, e.g.
    /// `pkg.TestMessage.TestEnum.TEST_ENUM_1`. Identifier chains matching
    /// a registered name lower to the corresponding int constant.
    pub fn add_enum_value(&mut self, qualified_name: impl Into<String>, value: i64) {
        self.enums.insert(qualified_name.into(), value);
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Mutable access to the registry, until the first built program
    /// freezes it.
    pub fn registry_mut(&mut self) -> Result<&mut FunctionRegistry, crate::error::RegistryError> {
        Arc::get_mut(&mut self.registry).ok_or(crate::error::RegistryError::Frozen)
    }

    /// Lowers the expression into a program sharing this builder's
    /// registry and enum table.
    pub fn build(&self, expr: &Expr) -> Result<Program, BuildError> {
        let mut buf = StepBuffer::new();
        self.lower(expr, &mut buf)?;
        Ok(Program::new(buf.steps, Arc::clone(&self.registry), Arc::new(self.enums.clone())))
    }

    fn lower(&self, expr: &Expr, buf: &mut StepBuffer) -> Result<(), BuildError> {
        match &expr.kind {
            ExprKind::Const(constant) => {
                buf.push_ast(expr.id, StepKind::Const(const_value(constant)));
                Ok(())
            }
            ExprKind::Ident { name } => {
                buf.push_ast(expr.id, StepKind::Ident(name.clone()));
                Ok(())
            }
            ExprKind::Select { operand, field, test_only } => {
                let path = qualified_path(expr);
                if let Some(path) = &path
                    && let Some(value) = self.enums.get(path)
                {
                    buf.push_synthesized(expr.id, StepKind::Const(CelValue::Int(*value)));
                    return Ok(());
                }
                self.lower(operand, buf)?;
                buf.push_ast(
                    expr.id,
                    StepKind::Select {
                        field: field.clone(),
                        test_only: *test_only,
                        qualified_path: path,
                    },
                );
                Ok(())
            }
            ExprKind::Call { target, function, args } => {
                if self.shortcircuiting && target.is_none() {
                    match (function.as_str(), args.len()) {
                        (AND, 2) => return self.lower_logic(expr, args, AND, false, buf),
                        (OR, 2) => return self.lower_logic(expr, args, OR, true, buf),
                        (TERNARY, 3) => return self.lower_ternary(expr, args, buf),
                        _ => {}
                    }
                }
                if let Some(target) = target {
                    self.lower(target, buf)?;
                }
                for arg in args {
                    self.lower(arg, buf)?;
                }
                buf.push_ast(
                    expr.id,
                    StepKind::Invoke {
                        function: function.clone(),
                        receiver_style: target.is_some(),
                        argc: args.len() + usize::from(target.is_some()),
                    },
                );
                Ok(())
            }
            ExprKind::CreateList { elements } => {
                for element in elements {
                    self.lower(element, buf)?;
                }
                buf.push_ast(expr.id, StepKind::CreateList { size: elements.len() });
                Ok(())
            }
            ExprKind::CreateStruct { message_name, entries } => {
                if !message_name.is_empty() {
                    return Err(BuildError::Unsupported(format!(
                        "message construction for '{message_name}' requires the reflection layer"
                    )));
                }
                for entry in entries {
                    self.lower(&entry.key, buf)?;
                    self.lower(&entry.value, buf)?;
                }
                buf.push_ast(expr.id, StepKind::CreateMap { entries: entries.len() });
                Ok(())
            }
            ExprKind::Comprehension(comp) => self.lower_comprehension(expr.id, comp, buf),
        }
    }

    /// `a && b` / `a || b` with short-circuiting: the peek-jump fires only
    /// on the deciding boolean, leaving it as the result; every other
    /// left value falls through to an ordinary registry merge, so errors
    /// and unknowns are absorbed identically in both short-circuit modes.
    fn lower_logic(
        &self,
        expr: &Expr,
        args: &[Expr],
        function: &str,
        jump_on: bool,
        buf: &mut StepBuffer,
    ) -> Result<(), BuildError> {
        self.lower(&args[0], buf)?;
        let jump = buf.push_jump(expr.id, StepKind::LogicJump { jump_on, offset: 0 });
        self.lower(&args[1], buf)?;
        buf.push_ast(
            expr.id,
            StepKind::Invoke { function: function.to_string(), receiver_style: false, argc: 2 },
        );
        buf.patch(jump, JumpSlot::Logic)
    }

    fn lower_ternary(
        &self,
        expr: &Expr,
        args: &[Expr],
        buf: &mut StepBuffer,
    ) -> Result<(), BuildError> {
        self.lower(&args[0], buf)?;
        let cond = buf.push_jump(expr.id, StepKind::TernaryJump { else_offset: 0, end_offset: 0 });
        self.lower(&args[1], buf)?;
        let skip_else = buf.push_jump(expr.id, StepKind::Jump { offset: 0 });
        buf.patch(cond, JumpSlot::TernaryElse)?;
        self.lower(&args[2], buf)?;
        buf.patch(skip_else, JumpSlot::Jump)?;
        buf.patch(cond, JumpSlot::TernaryEnd)
    }

    /// The comprehension loop. Layout:
    ///
    /// ```text
    ///       [iter_range]
    ///       ListKeys
    ///       IterInit
    ///       [accu_init]
    ///       AccuInit
    /// loop: IterNext(end, error)
    ///       [loop_condition]
    ///       LoopCond(end)
    ///       [loop_step]
    ///       AccuStep
    ///       Jump(loop)
    /// end:  [result]
    /// err:  IterFinish
    /// ```
    ///
    /// The error edge skips the result subexpression so a non-iterable
    /// range leaves its error as the comprehension's value.
    fn lower_comprehension(
        &self,
        expr_id: i64,
        comp: &Comprehension,
        buf: &mut StepBuffer,
    ) -> Result<(), BuildError> {
        if comp.iter_var.is_empty() || comp.accu_var.is_empty() {
            return Err(BuildError::Malformed(
                "comprehension is missing iter_var or accu_var".to_string(),
            ));
        }
        self.lower(&comp.iter_range, buf)?;
        buf.push_synthesized(expr_id, StepKind::ListKeys);
        buf.push_synthesized(
            expr_id,
            StepKind::IterInit { iter_var: comp.iter_var.clone(), accu_var: comp.accu_var.clone() },
        );
        self.lower(&comp.accu_init, buf)?;
        buf.push_synthesized(expr_id, StepKind::AccuInit);

        let loop_start = buf.pos();
        let next = buf.push_jump(expr_id, StepKind::IterNext { end_offset: 0, error_offset: 0 });
        self.lower(&comp.loop_condition, buf)?;
        let cond = buf.push_jump(
            expr_id,
            StepKind::LoopCond { end_offset: 0, shortcircuit: self.shortcircuiting },
        );
        self.lower(&comp.loop_step, buf)?;
        buf.push_synthesized(expr_id, StepKind::AccuStep);
        buf.push_jump_to(expr_id, loop_start)?;

        buf.patch(next, JumpSlot::NextEnd)?;
        buf.patch(cond, JumpSlot::CondEnd)?;
        self.lower(&comp.result, buf)?;
        buf.patch(next, JumpSlot::NextError)?;
        buf.push_ast(expr_id, StepKind::IterFinish);
        Ok(())
    }
}

fn const_value(constant: &Constant) -> CelValue {
    match constant {
        Constant::Null => CelValue::Null,
        Constant::Bool(v) => CelValue::Bool(*v),
        Constant::Int(v) => CelValue::Int(*v),
        Constant::Uint(v) => CelValue::Uint(*v),
        Constant::Double(v) => CelValue::Double(*v),
        Constant::String(s) => CelValue::string(s.as_str()),
        Constant::Bytes(b) => CelValue::bytes(b.as_slice()),
        Constant::Duration(d) => CelValue::Duration(*d),
        Constant::Timestamp(t) => CelValue::Timestamp(*t),
    }
}

/// The dotted path of a pure identifier/select chain, used for enum
/// resolution and unknown-mask intersection. Presence tests and any other
/// operand shape yield `None`.
fn qualified_path(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident { name } => Some(name.clone()),
        ExprKind::Select { operand, field, test_only: false } => {
            let mut path = qualified_path(operand)?;
            path.push('.');
            path.push_str(field);
            Some(path)
        }
        _ => None,
    }
}

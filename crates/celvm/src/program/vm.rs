//! The interpreter loop and execution frame.
//!
//! Evaluation is single-threaded and non-suspending: the loop advances the
//! program counter, runs one step at a time, and publishes AST-origin
//! results to the trace listener. On exit the stack must hold exactly one
//! more value than at entry; anything else is an internal error.

use crate::{
    activation::Activation,
    error::{CelError, EvalError, EvalResult},
    listener::{EvalListener, NoopListener},
    program::{
        Program,
        stack::ValueStack,
        step::{Step, StepKind},
    },
    value::{CelMap, CelValue, MapKey},
};

/// Per-comprehension binding state: the range being iterated, the position
/// index, and the current values of the iteration variable and
/// accumulator. Nested comprehensions stack cleanly because init/finish
/// steps bracket the lowered region.
#[derive(Debug)]
struct IterFrame {
    iter_var: String,
    accu_var: String,
    range: CelValue,
    index: usize,
    current: CelValue,
    accu: CelValue,
}

/// What [`StepKind::IterNext`] decided to do.
enum NextAction {
    Continue,
    End,
    Error(CelValue),
}

/// The runtime state of one evaluation: program counter, operand stack,
/// iteration bindings, and the borrowed activation.
struct EvalFrame<'a> {
    pc: usize,
    stack: ValueStack,
    iter_frames: Vec<IterFrame>,
    activation: &'a dyn Activation,
}

impl EvalFrame<'_> {
    /// Resolves a comprehension binding, innermost frame first.
    /// Iteration variables shadow activation variables.
    fn find_binding(&self, name: &str) -> Option<CelValue> {
        self.iter_frames.iter().rev().find_map(|frame| {
            if frame.iter_var == name {
                Some(frame.current.clone())
            } else if frame.accu_var == name {
                Some(frame.accu.clone())
            } else {
                None
            }
        })
    }

    fn top_iter_mut(&mut self) -> EvalResult<&mut IterFrame> {
        self.iter_frames
            .last_mut()
            .ok_or_else(|| EvalError::internal("no active iteration state"))
    }
}

impl Program {
    /// Evaluates the program against the activation and returns the single
    /// resulting value. Value-level errors and unknowns are returned as
    /// values; an `Err` means the evaluator itself failed.
    pub fn evaluate(&self, activation: &dyn Activation) -> EvalResult<CelValue> {
        self.trace(activation, &mut NoopListener)
    }

    /// Evaluates while publishing intermediate values to the listener:
    /// one `(node id, value)` pair per AST node that produced one, with
    /// comprehension internals suppressed.
    pub fn trace(
        &self,
        activation: &dyn Activation,
        listener: &mut dyn EvalListener,
    ) -> EvalResult<CelValue> {
        let mut frame =
            EvalFrame { pc: 0, stack: ValueStack::new(), iter_frames: Vec::new(), activation };
        let publish = listener.enabled();

        while frame.pc < self.steps().len() {
            let idx = frame.pc;
            frame.pc += 1;
            let step = &self.steps()[idx];
            self.execute_step(idx, step, &mut frame)?;
            if publish && step.comes_from_ast && !frame.stack.is_empty() {
                listener.on_value(step.expr_id, frame.stack.peek()?)?;
            }
        }

        if frame.stack.len() != 1 {
            return Err(EvalError::internal(format!(
                "evaluation finished with {} values on the stack",
                frame.stack.len()
            )));
        }
        frame.stack.pop()
    }

    fn execute_step(&self, idx: usize, step: &Step, frame: &mut EvalFrame<'_>) -> EvalResult<()> {
        match &step.kind {
            StepKind::Const(value) => {
                frame.stack.push(value.clone());
                Ok(())
            }
            StepKind::Ident(name) => self.exec_ident(frame, name),
            StepKind::Select { field, test_only, qualified_path } => {
                exec_select(frame, field, *test_only, qualified_path.as_deref())
            }
            StepKind::Invoke { function, receiver_style, argc } => {
                let args = frame.stack.span(*argc)?;
                let result = self.registry.dispatch(function, *receiver_style, args)?;
                frame.stack.pop_n(*argc)?;
                frame.stack.push(result);
                Ok(())
            }
            StepKind::CreateList { size } => {
                let elements = frame.stack.span(*size)?;
                let result = escape_or_else(elements, || CelValue::list(elements.to_vec()));
                frame.stack.pop_n(*size)?;
                frame.stack.push(result);
                Ok(())
            }
            StepKind::CreateMap { entries } => {
                let len = entries * 2;
                let values = frame.stack.span(len)?;
                let result = escape_or_else(values, || build_map(values));
                frame.stack.pop_n(len)?;
                frame.stack.push(result);
                Ok(())
            }
            StepKind::Jump { offset } => self.jump(frame, idx, *offset),
            StepKind::LogicJump { jump_on, offset } => {
                if matches!(frame.stack.peek()?, CelValue::Bool(b) if b == jump_on) {
                    self.jump(frame, idx, *offset)?;
                }
                Ok(())
            }
            StepKind::TernaryJump { else_offset, end_offset } => {
                match frame.stack.pop()? {
                    CelValue::Bool(true) => Ok(()),
                    CelValue::Bool(false) => self.jump(frame, idx, *else_offset),
                    value @ (CelValue::Error(_) | CelValue::Unknown(_)) => {
                        frame.stack.push(value);
                        self.jump(frame, idx, *end_offset)
                    }
                    _ => {
                        frame.stack.push(CelValue::error(CelError::no_matching_overload()));
                        self.jump(frame, idx, *end_offset)
                    }
                }
            }
            StepKind::ListKeys => {
                match frame.stack.pop()? {
                    CelValue::Map(map) => frame
                        .stack
                        .push(CelValue::list(map.keys().map(MapKey::to_value).collect())),
                    other => frame.stack.push(other),
                }
                Ok(())
            }
            StepKind::IterInit { iter_var, accu_var } => {
                let range = frame.stack.pop()?;
                frame.iter_frames.push(IterFrame {
                    iter_var: iter_var.clone(),
                    accu_var: accu_var.clone(),
                    range,
                    index: 0,
                    current: CelValue::Null,
                    accu: CelValue::Null,
                });
                Ok(())
            }
            StepKind::AccuInit => {
                let seed = frame.stack.pop()?;
                frame.top_iter_mut()?.accu = seed;
                Ok(())
            }
            StepKind::IterNext { end_offset, error_offset } => {
                let action = {
                    let it = frame.top_iter_mut()?;
                    match &it.range {
                        CelValue::List(list) => match list.get(it.index) {
                            Some(element) => {
                                it.current = element.clone();
                                it.index += 1;
                                NextAction::Continue
                            }
                            None => NextAction::End,
                        },
                        CelValue::Error(_) | CelValue::Unknown(_) => {
                            NextAction::Error(it.range.clone())
                        }
                        _ => NextAction::Error(CelValue::error(CelError::no_matching_overload())),
                    }
                };
                match action {
                    NextAction::Continue => Ok(()),
                    NextAction::End => self.jump(frame, idx, *end_offset),
                    NextAction::Error(value) => {
                        frame.stack.push(value);
                        self.jump(frame, idx, *error_offset)
                    }
                }
            }
            StepKind::LoopCond { end_offset, shortcircuit } => match frame.stack.pop()? {
                CelValue::Bool(true) => Ok(()),
                CelValue::Bool(false) => {
                    if *shortcircuit {
                        self.jump(frame, idx, *end_offset)
                    } else {
                        Ok(())
                    }
                }
                other => {
                    frame.top_iter_mut()?.accu = other;
                    self.jump(frame, idx, *end_offset)
                }
            },
            StepKind::AccuStep => {
                let value = frame.stack.pop()?;
                frame.top_iter_mut()?.accu = value;
                Ok(())
            }
            StepKind::IterFinish => {
                frame
                    .iter_frames
                    .pop()
                    .map(|_| ())
                    .ok_or_else(|| EvalError::internal("no active iteration state"))
            }
        }
    }

    fn exec_ident(&self, frame: &mut EvalFrame<'_>, name: &str) -> EvalResult<()> {
        if let Some(value) = frame.find_binding(name) {
            frame.stack.push(value);
            return Ok(());
        }
        if frame.activation.unknown_paths().matches(name) {
            frame.stack.push(CelValue::unknown(name));
            return Ok(());
        }
        if let Some(value) = frame.activation.find(name) {
            frame.stack.push(value);
            return Ok(());
        }
        if let Some(value) = self.enums.get(name) {
            frame.stack.push(CelValue::Int(*value));
            return Ok(());
        }
        frame.stack.push(CelValue::error(CelError::no_such_field(format!(
            "undeclared reference to '{name}'"
        ))));
        Ok(())
    }

    fn jump(&self, frame: &mut EvalFrame<'_>, idx: usize, offset: i32) -> EvalResult<()> {
        let target = idx as i64 + 1 + i64::from(offset);
        if target < 0 || target > self.steps().len() as i64 {
            return Err(EvalError::internal(format!("jump target {target} out of range")));
        }
        frame.pc = usize::try_from(target)
            .map_err(|_| EvalError::internal("jump target out of range"))?;
        Ok(())
    }
}

fn exec_select(
    frame: &mut EvalFrame<'_>,
    field: &str,
    test_only: bool,
    qualified_path: Option<&str>,
) -> EvalResult<()> {
    let operand = frame.stack.pop()?;
    if let Some(path) = qualified_path
        && frame.activation.unknown_paths().matches(path)
    {
        frame.stack.push(CelValue::unknown(path));
        return Ok(());
    }
    let result = if test_only {
        select_test(&operand, field)
    } else {
        select_field(&operand, field)
    };
    frame.stack.push(result);
    Ok(())
}

fn select_field(operand: &CelValue, field: &str) -> CelValue {
    match operand {
        CelValue::Map(map) => match map.get(&MapKey::String(field.into())) {
            Some(value) => value.clone(),
            None => CelValue::error(CelError::no_such_key(field)),
        },
        CelValue::Message(message) => match message.field(field) {
            Some(value) => value,
            None => CelValue::error(CelError::no_such_field(format!("no such field '{field}'"))),
        },
        CelValue::Error(_) | CelValue::Unknown(_) => operand.clone(),
        other => CelValue::error(CelError::invalid_argument(format!(
            "cannot select field '{field}' from {}",
            other.type_tag()
        ))),
    }
}

fn select_test(operand: &CelValue, field: &str) -> CelValue {
    match operand {
        CelValue::Map(map) => CelValue::Bool(map.contains(&MapKey::String(field.into()))),
        CelValue::Message(message) => CelValue::Bool(message.has_field(field)),
        CelValue::Error(_) | CelValue::Unknown(_) => operand.clone(),
        other => CelValue::error(CelError::invalid_argument(format!(
            "cannot test field '{field}' on {}",
            other.type_tag()
        ))),
    }
}

/// Error and unknown values escape containers under construction: the
/// leftmost error wins, then the leftmost unknown.
fn escape_or_else(values: &[CelValue], build: impl FnOnce() -> CelValue) -> CelValue {
    if let Some(error) = values.iter().find(|v| v.is_error()) {
        return error.clone();
    }
    if let Some(unknown) = values.iter().find(|v| v.is_unknown()) {
        return unknown.clone();
    }
    build()
}

fn build_map(values: &[CelValue]) -> CelValue {
    let mut pairs = Vec::with_capacity(values.len() / 2);
    for pair in values.chunks_exact(2) {
        match MapKey::from_value(&pair[0]) {
            Ok(key) => pairs.push((key, pair[1].clone())),
            Err(error) => return CelValue::error(error),
        }
    }
    match CelMap::from_entries(pairs) {
        Ok(map) => CelValue::map(map),
        Err(error) => CelValue::error(error),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        activation::VariableActivation,
        error::ErrorKind,
        program::step::{Step, StepKind},
        registry::FunctionRegistry,
    };

    fn raw_program(steps: Vec<Step>) -> Program {
        Program::new(steps, Arc::new(FunctionRegistry::new()), Arc::new(ahash::AHashMap::new()))
    }

    #[test]
    fn unbalanced_stack_is_an_internal_error() {
        let program = raw_program(vec![
            Step::from_ast(1, StepKind::Const(CelValue::Int(1))),
            Step::from_ast(2, StepKind::Const(CelValue::Int(2))),
        ]);
        let err = program.evaluate(&VariableActivation::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn jump_targets_are_bounds_checked() {
        let program = raw_program(vec![Step::synthesized(1, StepKind::Jump { offset: 5 })]);
        let err = program.evaluate(&VariableActivation::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn unbound_identifiers_become_error_values() {
        let program = raw_program(vec![Step::from_ast(1, StepKind::Ident("nope".to_string()))]);
        let result = program.evaluate(&VariableActivation::new()).unwrap();
        let CelValue::Error(err) = result else { panic!("expected error value") };
        assert_eq!(err.kind(), ErrorKind::NoSuchField);
    }

    #[test]
    fn select_on_scalars_is_an_error_value() {
        let result = select_field(&CelValue::Int(1), "f");
        let CelValue::Error(err) = result else { panic!("expected error value") };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

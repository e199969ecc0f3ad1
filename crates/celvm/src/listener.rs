//! Evaluation tracing.
//!
//! A listener is published one value per AST node that produced one, right
//! after the node's step leaves its result on the stack. Steps synthesized
//! by the builder are silent, and a comprehension publishes only once,
//! after its result subexpression, so intermediate loop state never leaks
//! into the trace.
//!
//! [`NoopListener`] short-circuits publication entirely via
//! [`EvalListener::enabled`], so an untraced evaluation pays nothing.

use crate::{error::EvalResult, value::CelValue};

/// Receives `(node id, value)` publications during a traced evaluation.
///
/// Returning an error aborts the evaluation with that status.
pub trait EvalListener {
    /// Whether publications should be produced at all. The interpreter
    /// checks this once per step before peeking the stack.
    fn enabled(&self) -> bool {
        true
    }

    fn on_value(&mut self, expr_id: i64, value: &CelValue) -> EvalResult<()>;
}

/// A listener that receives nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl EvalListener for NoopListener {
    fn enabled(&self) -> bool {
        false
    }

    fn on_value(&mut self, _expr_id: i64, _value: &CelValue) -> EvalResult<()> {
        Ok(())
    }
}

/// Captures every publication for later inspection.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Vec<(i64, CelValue)>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[(i64, CelValue)] {
        &self.events
    }

    /// The most recent value published for the given node, if any.
    pub fn last_for(&self, expr_id: i64) -> Option<&CelValue> {
        self.events.iter().rev().find(|(id, _)| *id == expr_id).map(|(_, v)| v)
    }
}

impl EvalListener for RecordingListener {
    fn on_value(&mut self, expr_id: i64, value: &CelValue) -> EvalResult<()> {
        self.events.push((expr_id, value.clone()));
        Ok(())
    }
}

//! The expression tree consumed by the step builder.
//!
//! Parsing is out of scope for this crate; callers hand over an already
//! built [`Expr`]. Node ids are opaque 64-bit keys used only to correlate
//! trace publications with nodes.

use chrono::{DateTime, TimeDelta, Utc};

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Duration(TimeDelta),
    Timestamp(DateTime<Utc>),
}

/// One key/value entry of a map literal.
#[derive(Debug, Clone)]
pub struct StructEntry {
    pub key: Expr,
    pub value: Expr,
}

/// CEL's generic iteration macro: `all`, `exists`, `map`, `filter` and
/// folds all expand to this node.
#[derive(Debug, Clone)]
pub struct Comprehension {
    pub iter_var: String,
    pub iter_range: Expr,
    pub accu_var: String,
    pub accu_init: Expr,
    pub loop_condition: Expr,
    pub loop_step: Expr,
    pub result: Expr,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Const(Constant),
    Ident {
        name: String,
    },
    Select {
        operand: Box<Expr>,
        field: String,
        /// A `has(x.f)` presence test rather than a field read.
        test_only: bool,
    },
    Call {
        /// The receiver for `target.function(args)` calls; `None` for
        /// global calls.
        target: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    CreateList {
        elements: Vec<Expr>,
    },
    CreateStruct {
        /// Empty for map literals. A non-empty message type name requires
        /// the reflection layer and is rejected by the builder.
        message_name: String,
        entries: Vec<StructEntry>,
    },
    Comprehension(Box<Comprehension>),
}

/// An expression node: a kind plus the id used for trace correlation.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: i64,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(id: i64, kind: ExprKind) -> Self {
        Self { id, kind }
    }

    pub fn const_null(id: i64) -> Self {
        Self::new(id, ExprKind::Const(Constant::Null))
    }

    pub fn const_bool(id: i64, value: bool) -> Self {
        Self::new(id, ExprKind::Const(Constant::Bool(value)))
    }

    pub fn const_int(id: i64, value: i64) -> Self {
        Self::new(id, ExprKind::Const(Constant::Int(value)))
    }

    pub fn const_uint(id: i64, value: u64) -> Self {
        Self::new(id, ExprKind::Const(Constant::Uint(value)))
    }

    pub fn const_double(id: i64, value: f64) -> Self {
        Self::new(id, ExprKind::Const(Constant::Double(value)))
    }

    pub fn const_string(id: i64, value: impl Into<String>) -> Self {
        Self::new(id, ExprKind::Const(Constant::String(value.into())))
    }

    pub fn ident(id: i64, name: impl Into<String>) -> Self {
        Self::new(id, ExprKind::Ident { name: name.into() })
    }

    pub fn select(id: i64, operand: Expr, field: impl Into<String>) -> Self {
        Self::new(
            id,
            ExprKind::Select { operand: Box::new(operand), field: field.into(), test_only: false },
        )
    }

    pub fn select_test(id: i64, operand: Expr, field: impl Into<String>) -> Self {
        Self::new(
            id,
            ExprKind::Select { operand: Box::new(operand), field: field.into(), test_only: true },
        )
    }

    pub fn global_call(id: i64, function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(id, ExprKind::Call { target: None, function: function.into(), args })
    }

    pub fn member_call(id: i64, target: Expr, function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(
            id,
            ExprKind::Call { target: Some(Box::new(target)), function: function.into(), args },
        )
    }

    pub fn list(id: i64, elements: Vec<Expr>) -> Self {
        Self::new(id, ExprKind::CreateList { elements })
    }

    pub fn map(id: i64, entries: Vec<(Expr, Expr)>) -> Self {
        Self::new(
            id,
            ExprKind::CreateStruct {
                message_name: String::new(),
                entries: entries
                    .into_iter()
                    .map(|(key, value)| StructEntry { key, value })
                    .collect(),
            },
        )
    }

    #[expect(clippy::too_many_arguments, reason = "mirrors the seven comprehension components")]
    pub fn comprehension(
        id: i64,
        iter_var: impl Into<String>,
        iter_range: Expr,
        accu_var: impl Into<String>,
        accu_init: Expr,
        loop_condition: Expr,
        loop_step: Expr,
        result: Expr,
    ) -> Self {
        Self::new(
            id,
            ExprKind::Comprehension(Box::new(Comprehension {
                iter_var: iter_var.into(),
                iter_range,
                accu_var: accu_var.into(),
                accu_init,
                loop_condition,
                loop_step,
                result,
            })),
        )
    }
}

//! Equality and ordering over every comparable type.
//!
//! One generic registrar loop replaces per-type adapters. Comparisons are
//! defined only between identical variants; a mixed-type comparison finds
//! no overload and becomes `no_matching_overload` at dispatch. Doubles use
//! IEEE semantics, so NaN compares unequal to everything including itself.

use std::cmp::Ordering;

use super::{EQUAL, GREATER, GREATER_EQUAL, LESS, LESS_EQUAL, NOT_EQUAL, add};
use crate::{
    error::{EvalError, EvalResult, RegistryError},
    registry::FunctionRegistry,
    value::{CelType, CelValue},
};

#[derive(Debug, Clone, Copy)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

const OPS: [(&str, CmpOp); 6] = [
    (EQUAL, CmpOp::Eq),
    (NOT_EQUAL, CmpOp::Ne),
    (LESS, CmpOp::Lt),
    (LESS_EQUAL, CmpOp::Le),
    (GREATER, CmpOp::Gt),
    (GREATER_EQUAL, CmpOp::Ge),
];

const COMPARABLE: [CelType; 8] = [
    CelType::Bool,
    CelType::Int,
    CelType::Uint,
    CelType::Double,
    CelType::String,
    CelType::Bytes,
    CelType::Duration,
    CelType::Timestamp,
];

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    for tag in COMPARABLE {
        for (name, op) in OPS {
            add(registry, name, false, &[tag, tag], move |args| {
                Ok(CelValue::Bool(compare(op, &args[0], &args[1])?))
            })?;
        }
    }
    Ok(())
}

fn compare(op: CmpOp, lhs: &CelValue, rhs: &CelValue) -> EvalResult<bool> {
    let ordering = match (lhs, rhs) {
        // IEEE comparisons; NaN is unordered rather than an error.
        (CelValue::Double(a), CelValue::Double(b)) => {
            return Ok(match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
            });
        }
        (CelValue::Bool(a), CelValue::Bool(b)) => a.cmp(b),
        (CelValue::Int(a), CelValue::Int(b)) => a.cmp(b),
        (CelValue::Uint(a), CelValue::Uint(b)) => a.cmp(b),
        (CelValue::String(a), CelValue::String(b)) => a.as_bytes().cmp(b.as_bytes()),
        (CelValue::Bytes(a), CelValue::Bytes(b)) => a.as_ref().cmp(b.as_ref()),
        (CelValue::Duration(a), CelValue::Duration(b)) => a.cmp(b),
        (CelValue::Timestamp(a), CelValue::Timestamp(b)) => a.cmp(b),
        (a, b) => {
            return Err(EvalError::internal(format!(
                "comparison dispatched with mismatched types {} and {}",
                a.type_tag(),
                b.type_tag()
            )));
        }
    };
    Ok(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    })
}

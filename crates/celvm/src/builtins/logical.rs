//! Logical operators, the ternary, and the comprehension strictness
//! helper.
//!
//! `&&` and `||` carry explicit overloads for error and unknown operands:
//! the boolean side absorbs the failure when it decides the outcome, the
//! left value wins when both sides fail the same way, and an unknown beats
//! an error. These overloads serve double duty as the non-short-circuit
//! implementation and as the merge step behind the short-circuit jump, so
//! both modes agree on every input.

use super::{AND, NEG, NOT, NOT_STRICTLY_FALSE, OR, TERNARY, add};
use crate::{
    error::RegistryError,
    registry::FunctionRegistry,
    value::{CelType, CelValue},
};

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    use CelType::{Any, Bool, Double, Error, Int, Unknown};

    add(registry, NOT, false, &[Bool], |args| Ok(CelValue::Bool(!args[0].as_bool()?)))?;
    add(registry, NEG, false, &[Int], |args| {
        Ok(CelValue::Int(args[0].as_int()?.wrapping_neg()))
    })?;
    add(registry, NEG, false, &[Double], |args| Ok(CelValue::Double(-args[0].as_double()?)))?;

    // Logical AND.
    add(registry, AND, false, &[Bool, Bool], |args| {
        Ok(CelValue::Bool(args[0].as_bool()? && args[1].as_bool()?))
    })?;
    add(registry, AND, false, &[Error, Bool], |args| {
        Ok(if args[1].as_bool()? { args[0].clone() } else { CelValue::Bool(false) })
    })?;
    add(registry, AND, false, &[Bool, Error], |args| {
        Ok(if args[0].as_bool()? { args[1].clone() } else { CelValue::Bool(false) })
    })?;
    add(registry, AND, false, &[Error, Error], |args| Ok(args[0].clone()))?;
    add(registry, AND, false, &[Unknown, Bool], |args| {
        Ok(if args[1].as_bool()? { args[0].clone() } else { CelValue::Bool(false) })
    })?;
    add(registry, AND, false, &[Bool, Unknown], |args| {
        Ok(if args[0].as_bool()? { args[1].clone() } else { CelValue::Bool(false) })
    })?;
    add(registry, AND, false, &[Unknown, Unknown], |args| Ok(args[0].clone()))?;
    add(registry, AND, false, &[Unknown, Error], |args| Ok(args[0].clone()))?;
    add(registry, AND, false, &[Error, Unknown], |args| Ok(args[1].clone()))?;

    // Logical OR.
    add(registry, OR, false, &[Bool, Bool], |args| {
        Ok(CelValue::Bool(args[0].as_bool()? || args[1].as_bool()?))
    })?;
    add(registry, OR, false, &[Error, Bool], |args| {
        Ok(if args[1].as_bool()? { CelValue::Bool(true) } else { args[0].clone() })
    })?;
    add(registry, OR, false, &[Bool, Error], |args| {
        Ok(if args[0].as_bool()? { CelValue::Bool(true) } else { args[1].clone() })
    })?;
    add(registry, OR, false, &[Error, Error], |args| Ok(args[0].clone()))?;
    add(registry, OR, false, &[Unknown, Bool], |args| {
        Ok(if args[1].as_bool()? { CelValue::Bool(true) } else { args[0].clone() })
    })?;
    add(registry, OR, false, &[Bool, Unknown], |args| {
        Ok(if args[0].as_bool()? { CelValue::Bool(true) } else { args[1].clone() })
    })?;
    add(registry, OR, false, &[Unknown, Unknown], |args| Ok(args[0].clone()))?;
    add(registry, OR, false, &[Unknown, Error], |args| Ok(args[0].clone()))?;
    add(registry, OR, false, &[Error, Unknown], |args| Ok(args[1].clone()))?;

    // Ternary, used when short-circuiting is off; an error or unknown
    // condition is the result.
    add(registry, TERNARY, false, &[Bool, Any, Any], |args| {
        Ok(if args[0].as_bool()? { args[1].clone() } else { args[2].clone() })
    })?;
    add(registry, TERNARY, false, &[Error, Any, Any], |args| Ok(args[0].clone()))?;
    add(registry, TERNARY, false, &[Unknown, Any, Any], |args| Ok(args[0].clone()))?;

    // Comprehension loop conditions treat anything that is not strictly
    // `false` as a reason to keep looping.
    add(registry, NOT_STRICTLY_FALSE, false, &[Bool], |args| Ok(args[0].clone()))?;
    add(registry, NOT_STRICTLY_FALSE, false, &[Error], |_args| Ok(CelValue::Bool(true)))?;
    add(registry, NOT_STRICTLY_FALSE, false, &[Unknown], |_args| Ok(CelValue::Bool(true)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::CelError;

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        register(&mut registry).unwrap();
        registry
    }

    fn err() -> CelValue {
        CelValue::error(CelError::invalid_argument("boom"))
    }

    #[test]
    fn and_absorbs_failures_on_the_deciding_side() {
        let registry = registry();
        let f = CelValue::Bool(false);
        let t = CelValue::Bool(true);

        assert_eq!(registry.invoke(AND, false, &[err(), f.clone()]).unwrap(), f);
        assert_eq!(registry.invoke(AND, false, &[f.clone(), err()]).unwrap(), f);
        assert_eq!(registry.invoke(AND, false, &[t.clone(), err()]).unwrap(), err());
        assert_eq!(registry.invoke(AND, false, &[err(), err()]).unwrap(), err());
        assert_eq!(
            registry.invoke(AND, false, &[CelValue::unknown("u"), f.clone()]).unwrap(),
            f
        );
        assert_eq!(
            registry.invoke(AND, false, &[t, CelValue::unknown("u")]).unwrap(),
            CelValue::unknown("u")
        );
    }

    #[test]
    fn or_absorbs_failures_on_the_deciding_side() {
        let registry = registry();
        let t = CelValue::Bool(true);
        let f = CelValue::Bool(false);

        assert_eq!(registry.invoke(OR, false, &[err(), t.clone()]).unwrap(), t);
        assert_eq!(registry.invoke(OR, false, &[f.clone(), err()]).unwrap(), err());
        assert_eq!(
            registry.invoke(OR, false, &[CelValue::unknown("u"), err()]).unwrap(),
            CelValue::unknown("u")
        );
    }

    #[test]
    fn ternary_returns_the_failed_condition() {
        let registry = registry();
        let picked = registry
            .invoke(TERNARY, false, &[CelValue::Bool(false), CelValue::Int(1), CelValue::Int(2)])
            .unwrap();
        assert_eq!(picked, CelValue::Int(2));

        let from_err = registry
            .invoke(TERNARY, false, &[err(), CelValue::Int(1), CelValue::Int(2)])
            .unwrap();
        assert_eq!(from_err, err());
    }

    #[test]
    fn not_strictly_false_tolerates_failures() {
        let registry = registry();
        assert_eq!(
            registry.invoke(NOT_STRICTLY_FALSE, false, &[err()]).unwrap(),
            CelValue::Bool(true)
        );
        assert_eq!(
            registry.invoke(NOT_STRICTLY_FALSE, false, &[CelValue::Bool(false)]).unwrap(),
            CelValue::Bool(false)
        );
    }
}

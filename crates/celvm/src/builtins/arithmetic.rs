//! Arithmetic, concatenation, and timestamp/duration arithmetic.
//!
//! Integer `+ - *` wrap on overflow. Division and modulo by zero are error
//! values, not evaluator failures, so they can still be absorbed by a
//! short-circuit further up the expression.

use super::{ADD, DIVIDE, MODULO, MULTIPLY, SUBTRACT, add};
use crate::{
    error::{CelError, ErrorKind, RegistryError},
    registry::FunctionRegistry,
    value::{CelType, CelValue},
};

fn division_by_zero() -> CelValue {
    CelValue::error(CelError::new(ErrorKind::Unknown, "Division by 0"))
}

fn modulo_by_zero() -> CelValue {
    CelValue::error(CelError::new(ErrorKind::Unknown, "Modulo by 0"))
}

fn time_overflow(what: &str) -> CelValue {
    CelValue::error(CelError::new(ErrorKind::Unknown, format!("{what} out of range")))
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    use CelType::{Bytes, Double, Duration, Int, List, String, Timestamp, Uint};

    // Signed integers.
    add(registry, ADD, false, &[Int, Int], |args| {
        Ok(CelValue::Int(args[0].as_int()?.wrapping_add(args[1].as_int()?)))
    })?;
    add(registry, SUBTRACT, false, &[Int, Int], |args| {
        Ok(CelValue::Int(args[0].as_int()?.wrapping_sub(args[1].as_int()?)))
    })?;
    add(registry, MULTIPLY, false, &[Int, Int], |args| {
        Ok(CelValue::Int(args[0].as_int()?.wrapping_mul(args[1].as_int()?)))
    })?;
    add(registry, DIVIDE, false, &[Int, Int], |args| {
        let divisor = args[1].as_int()?;
        Ok(if divisor == 0 {
            division_by_zero()
        } else {
            CelValue::Int(args[0].as_int()?.wrapping_div(divisor))
        })
    })?;
    add(registry, MODULO, false, &[Int, Int], |args| {
        let divisor = args[1].as_int()?;
        Ok(if divisor == 0 {
            modulo_by_zero()
        } else {
            CelValue::Int(args[0].as_int()?.wrapping_rem(divisor))
        })
    })?;

    // Unsigned integers.
    add(registry, ADD, false, &[Uint, Uint], |args| {
        Ok(CelValue::Uint(args[0].as_uint()?.wrapping_add(args[1].as_uint()?)))
    })?;
    add(registry, SUBTRACT, false, &[Uint, Uint], |args| {
        Ok(CelValue::Uint(args[0].as_uint()?.wrapping_sub(args[1].as_uint()?)))
    })?;
    add(registry, MULTIPLY, false, &[Uint, Uint], |args| {
        Ok(CelValue::Uint(args[0].as_uint()?.wrapping_mul(args[1].as_uint()?)))
    })?;
    add(registry, DIVIDE, false, &[Uint, Uint], |args| {
        let divisor = args[1].as_uint()?;
        Ok(if divisor == 0 {
            division_by_zero()
        } else {
            CelValue::Uint(args[0].as_uint()? / divisor)
        })
    })?;
    add(registry, MODULO, false, &[Uint, Uint], |args| {
        let divisor = args[1].as_uint()?;
        Ok(if divisor == 0 {
            modulo_by_zero()
        } else {
            CelValue::Uint(args[0].as_uint()? % divisor)
        })
    })?;

    // Doubles; division yields infinities rather than errors.
    add(registry, ADD, false, &[Double, Double], |args| {
        Ok(CelValue::Double(args[0].as_double()? + args[1].as_double()?))
    })?;
    add(registry, SUBTRACT, false, &[Double, Double], |args| {
        Ok(CelValue::Double(args[0].as_double()? - args[1].as_double()?))
    })?;
    add(registry, MULTIPLY, false, &[Double, Double], |args| {
        Ok(CelValue::Double(args[0].as_double()? * args[1].as_double()?))
    })?;
    add(registry, DIVIDE, false, &[Double, Double], |args| {
        Ok(CelValue::Double(args[0].as_double()? / args[1].as_double()?))
    })?;

    // Concatenation.
    add(registry, ADD, false, &[String, String], |args| {
        let lhs = args[0].as_string()?;
        let rhs = args[1].as_string()?;
        let mut joined = std::string::String::with_capacity(lhs.len() + rhs.len());
        joined.push_str(lhs);
        joined.push_str(rhs);
        Ok(CelValue::string(joined))
    })?;
    add(registry, ADD, false, &[Bytes, Bytes], |args| {
        let mut joined = args[0].as_bytes()?.to_vec();
        joined.extend_from_slice(args[1].as_bytes()?);
        Ok(CelValue::bytes(joined))
    })?;
    add(registry, ADD, false, &[List, List], |args| {
        let lhs = args[0].as_list()?;
        let rhs = args[1].as_list()?;
        let mut joined = Vec::with_capacity(lhs.len() + rhs.len());
        joined.extend(lhs.iter().cloned());
        joined.extend(rhs.iter().cloned());
        Ok(CelValue::list(joined))
    })?;

    // Timestamp and duration arithmetic.
    add(registry, ADD, false, &[Timestamp, Duration], |args| {
        Ok(match args[0].as_timestamp()?.checked_add_signed(args[1].as_duration()?) {
            Some(t) => CelValue::Timestamp(t),
            None => time_overflow("timestamp"),
        })
    })?;
    add(registry, ADD, false, &[Duration, Timestamp], |args| {
        Ok(match args[1].as_timestamp()?.checked_add_signed(args[0].as_duration()?) {
            Some(t) => CelValue::Timestamp(t),
            None => time_overflow("timestamp"),
        })
    })?;
    add(registry, ADD, false, &[Duration, Duration], |args| {
        Ok(match args[0].as_duration()?.checked_add(&args[1].as_duration()?) {
            Some(d) => CelValue::Duration(d),
            None => time_overflow("duration"),
        })
    })?;
    add(registry, SUBTRACT, false, &[Timestamp, Duration], |args| {
        Ok(match args[0].as_timestamp()?.checked_sub_signed(args[1].as_duration()?) {
            Some(t) => CelValue::Timestamp(t),
            None => time_overflow("timestamp"),
        })
    })?;
    add(registry, SUBTRACT, false, &[Timestamp, Timestamp], |args| {
        let difference = args[0].as_timestamp()?.signed_duration_since(args[1].as_timestamp()?);
        Ok(CelValue::Duration(difference))
    })?;
    add(registry, SUBTRACT, false, &[Duration, Duration], |args| {
        Ok(match args[0].as_duration()?.checked_sub(&args[1].as_duration()?) {
            Some(d) => CelValue::Duration(d),
            None => time_overflow("duration"),
        })
    })?;
    Ok(())
}

//! Container indexing, membership, and `size`.

use super::{IN, IN_DEPRECATED, IN_FUNCTION, INDEX, SIZE, add};
use crate::{
    error::{CelError, ErrorKind, EvalError, RegistryError},
    registry::FunctionRegistry,
    value::{CelType, CelValue, MapKey},
};

fn map_key(value: &CelValue) -> Result<MapKey, EvalError> {
    // Dispatch only routes keyable tags here; a failure is a broken
    // invariant, not a user error.
    MapKey::from_value(value).map_err(|e| EvalError::internal(e.message().to_string()))
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    use CelType::{Bool, Bytes, Double, Int, List, Map, String, Uint};

    // List indexing, range checked.
    add(registry, INDEX, false, &[List, Int], |args| {
        let list = args[0].as_list()?;
        let index = args[1].as_int()?;
        let element = usize::try_from(index).ok().and_then(|i| list.get(i));
        Ok(match element {
            Some(value) => value.clone(),
            None => CelValue::error(CelError::new(
                ErrorKind::Unknown,
                format!("Index error: index={index} size={}", list.len()),
            )),
        })
    })?;

    // Map indexing over every key type; a miss is `no_such_key`.
    for key_tag in [String, Int, Uint, Bool] {
        add(registry, INDEX, false, &[Map, key_tag], |args| {
            let map = args[0].as_map()?;
            let key = map_key(&args[1])?;
            Ok(match map.get(&key) {
                Some(value) => value.clone(),
                None => CelValue::error(CelError::no_such_key(key)),
            })
        })?;
    }

    // Membership, under all three historical spellings.
    for name in [IN, IN_DEPRECATED, IN_FUNCTION] {
        for element_tag in [Bool, Int, Uint, Double, String, Bytes] {
            add(registry, name, false, &[element_tag, List], |args| {
                Ok(CelValue::Bool(args[1].as_list()?.contains(&args[0])))
            })?;
        }
        for key_tag in [String, Int, Uint] {
            add(registry, name, false, &[key_tag, Map], |args| {
                let key = map_key(&args[0])?;
                Ok(CelValue::Bool(args[1].as_map()?.contains(&key)))
            })?;
        }
    }

    // size, global and receiver form. String size counts bytes.
    for receiver_style in [true, false] {
        add(registry, SIZE, receiver_style, &[String], |args| {
            Ok(CelValue::Int(args[0].as_string()?.len() as i64))
        })?;
        add(registry, SIZE, receiver_style, &[Bytes], |args| {
            Ok(CelValue::Int(args[0].as_bytes()?.len() as i64))
        })?;
        add(registry, SIZE, receiver_style, &[List], |args| {
            Ok(CelValue::Int(args[0].as_list()?.len() as i64))
        })?;
        add(registry, SIZE, receiver_style, &[Map], |args| {
            Ok(CelValue::Int(args[0].as_map()?.len() as i64))
        })?;
    }
    Ok(())
}

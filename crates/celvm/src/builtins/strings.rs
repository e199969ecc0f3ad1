//! String predicates and regex matching.

use regex::Regex;

use super::{CONTAINS, ENDS_WITH, MATCHES, STARTS_WITH, add};
use crate::{
    error::{CelError, RegistryError},
    registry::FunctionRegistry,
    value::{CelType, CelValue},
};

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    use CelType::String;

    for receiver_style in [true, false] {
        add(registry, CONTAINS, receiver_style, &[String, String], |args| {
            Ok(CelValue::Bool(args[0].as_string()?.contains(args[1].as_string()?.as_ref())))
        })?;
        add(registry, STARTS_WITH, receiver_style, &[String, String], |args| {
            Ok(CelValue::Bool(args[0].as_string()?.starts_with(args[1].as_string()?.as_ref())))
        })?;
        add(registry, ENDS_WITH, receiver_style, &[String, String], |args| {
            Ok(CelValue::Bool(args[0].as_string()?.ends_with(args[1].as_string()?.as_ref())))
        })?;
        // The pattern is compiled on every call and must cover the whole
        // subject string.
        add(registry, MATCHES, receiver_style, &[String, String], |args| {
            let subject = args[0].as_string()?;
            let pattern = args[1].as_string()?;
            Ok(match Regex::new(&format!("^(?:{pattern})$")) {
                Ok(re) => CelValue::Bool(re.is_match(subject)),
                Err(_) => CelValue::error(CelError::invalid_argument("invalid_argument")),
            })
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        register(&mut registry).unwrap();
        registry
    }

    fn call(name: &str, subject: &str, argument: &str) -> CelValue {
        registry()
            .invoke(name, false, &[CelValue::string(subject), CelValue::string(argument)])
            .unwrap()
    }

    #[test]
    fn inclusion_predicates() {
        assert_eq!(call(STARTS_WITH, "prefixedString", "prefix"), CelValue::Bool(true));
        assert_eq!(call(STARTS_WITH, "prefixedString", "prefixedString1"), CelValue::Bool(false));
        assert_eq!(call(STARTS_WITH, "", ""), CelValue::Bool(true));
        assert_eq!(call(ENDS_WITH, "prefixedString", "String"), CelValue::Bool(true));
        assert_eq!(call(CONTAINS, "prefixedString", "fixed"), CelValue::Bool(true));
        assert_eq!(call(CONTAINS, "prefixedString", "missing"), CelValue::Bool(false));
    }

    #[test]
    fn matches_requires_a_full_match() {
        assert_eq!(call(MATCHES, "abc123", "[a-c]+[0-9]+"), CelValue::Bool(true));
        assert_eq!(call(MATCHES, "abc123x", "[a-c]+[0-9]+"), CelValue::Bool(false));
    }

    #[test]
    fn invalid_patterns_are_error_values() {
        let result = call(MATCHES, "abc", "(unclosed");
        let CelValue::Error(err) = result else { panic!("expected error value") };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn receiver_style_is_also_registered() {
        let registry = registry();
        let result = registry
            .invoke(CONTAINS, true, &[CelValue::string("haystack"), CelValue::string("hay")])
            .unwrap();
        assert_eq!(result, CelValue::Bool(true));
    }
}

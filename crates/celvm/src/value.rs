//! The tagged value algebra used throughout evaluation.
//!
//! [`CelValue`] is a tagged union over every runtime type, including a
//! first-class error value and the unknown sentinel. Scalar variants are
//! stored inline; heap-backed variants (strings, bytes, containers, errors)
//! are reference counted, so cloning a value is cheap and a compiled
//! program can be evaluated from many threads at once.

use std::{fmt, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use strum::{Display, IntoStaticStr};

use crate::error::{CelError, EvalError, EvalResult};

/// Type tags for values and registry signatures.
///
/// `Any` never tags a value; it is the signature wildcard matched by every
/// argument during overload lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CelType {
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,
    List,
    Map,
    Message,
    Error,
    Unknown,
    Any,
}

/// An opaque structured record supporting named-field extraction.
///
/// This is the core's only window into protobuf-style messages; reflection
/// lives outside the crate. `field` returns `None` when the field does not
/// exist, which the select step turns into a `no_such_field` error value.
pub trait MessageValue: fmt::Debug + Send + Sync {
    fn field(&self, name: &str) -> Option<CelValue>;

    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// The runtime value.
#[derive(Debug, Clone)]
pub enum CelValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    Duration(TimeDelta),
    Timestamp(DateTime<Utc>),
    List(Arc<CelList>),
    Map(Arc<CelMap>),
    Message(Arc<dyn MessageValue>),
    Error(Arc<CelError>),
    /// A value withheld by the activation's unknown-path mask. Carries the
    /// masked path that produced it.
    Unknown(Arc<str>),
}

impl CelValue {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::String(s.into())
    }

    pub fn bytes(b: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(b.into())
    }

    pub fn list(elements: Vec<CelValue>) -> Self {
        Self::List(Arc::new(CelList::new(elements)))
    }

    pub fn map(map: CelMap) -> Self {
        Self::Map(Arc::new(map))
    }

    pub fn message(message: impl MessageValue + 'static) -> Self {
        Self::Message(Arc::new(message))
    }

    pub fn error(error: CelError) -> Self {
        Self::Error(Arc::new(error))
    }

    pub fn unknown(path: impl Into<Arc<str>>) -> Self {
        Self::Unknown(path.into())
    }

    pub fn type_tag(&self) -> CelType {
        match self {
            Self::Null => CelType::Null,
            Self::Bool(_) => CelType::Bool,
            Self::Int(_) => CelType::Int,
            Self::Uint(_) => CelType::Uint,
            Self::Double(_) => CelType::Double,
            Self::String(_) => CelType::String,
            Self::Bytes(_) => CelType::Bytes,
            Self::Duration(_) => CelType::Duration,
            Self::Timestamp(_) => CelType::Timestamp,
            Self::List(_) => CelType::List,
            Self::Map(_) => CelType::Map,
            Self::Message(_) => CelType::Message,
            Self::Error(_) => CelType::Error,
            Self::Unknown(_) => CelType::Unknown,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    pub fn as_bool(&self) -> EvalResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(extraction_mismatch(CelType::Bool, other)),
        }
    }

    pub fn as_int(&self) -> EvalResult<i64> {
        match self {
            Self::Int(v) => Ok(*v),
            other => Err(extraction_mismatch(CelType::Int, other)),
        }
    }

    pub fn as_uint(&self) -> EvalResult<u64> {
        match self {
            Self::Uint(v) => Ok(*v),
            other => Err(extraction_mismatch(CelType::Uint, other)),
        }
    }

    pub fn as_double(&self) -> EvalResult<f64> {
        match self {
            Self::Double(v) => Ok(*v),
            other => Err(extraction_mismatch(CelType::Double, other)),
        }
    }

    pub fn as_string(&self) -> EvalResult<&Arc<str>> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(extraction_mismatch(CelType::String, other)),
        }
    }

    pub fn as_bytes(&self) -> EvalResult<&Arc<[u8]>> {
        match self {
            Self::Bytes(b) => Ok(b),
            other => Err(extraction_mismatch(CelType::Bytes, other)),
        }
    }

    pub fn as_duration(&self) -> EvalResult<TimeDelta> {
        match self {
            Self::Duration(d) => Ok(*d),
            other => Err(extraction_mismatch(CelType::Duration, other)),
        }
    }

    pub fn as_timestamp(&self) -> EvalResult<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Ok(*t),
            other => Err(extraction_mismatch(CelType::Timestamp, other)),
        }
    }

    pub fn as_list(&self) -> EvalResult<&Arc<CelList>> {
        match self {
            Self::List(l) => Ok(l),
            other => Err(extraction_mismatch(CelType::List, other)),
        }
    }

    pub fn as_map(&self) -> EvalResult<&Arc<CelMap>> {
        match self {
            Self::Map(m) => Ok(m),
            other => Err(extraction_mismatch(CelType::Map, other)),
        }
    }

    pub fn as_error(&self) -> EvalResult<&Arc<CelError>> {
        match self {
            Self::Error(e) => Ok(e),
            other => Err(extraction_mismatch(CelType::Error, other)),
        }
    }
}

fn extraction_mismatch(expected: CelType, found: &CelValue) -> EvalError {
    EvalError::invalid_argument(format!("expected {expected}, found {}", found.type_tag()))
}

/// Strict same-variant equality.
///
/// Values of different variants are never equal here; CEL's cross-type
/// equality error comes from overload dispatch, not from this impl. NaN
/// follows IEEE semantics. Messages compare by identity, since the core
/// cannot see into them.
impl PartialEq for CelValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Uint(a), Self::Uint(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Message(a), Self::Message(b)) => Arc::ptr_eq(a, b),
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Unknown(a), Self::Unknown(b)) => a == b,
            _ => false,
        }
    }
}

/// An owned sequence with length and positional lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CelList {
    elements: Vec<CelValue>,
}

impl CelList {
    pub fn new(elements: Vec<CelValue>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CelValue> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CelValue> {
        self.elements.iter()
    }

    pub fn contains(&self, value: &CelValue) -> bool {
        self.elements.iter().any(|e| e == value)
    }
}

/// The subset of values usable as map keys: bool, int, uint, string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(Arc<str>),
}

impl MapKey {
    /// Converts a value into a key, failing with `invalid_argument` for
    /// variants outside the key subset.
    pub fn from_value(value: &CelValue) -> Result<Self, CelError> {
        match value {
            CelValue::Bool(b) => Ok(Self::Bool(*b)),
            CelValue::Int(v) => Ok(Self::Int(*v)),
            CelValue::Uint(v) => Ok(Self::Uint(*v)),
            CelValue::String(s) => Ok(Self::String(s.clone())),
            other => Err(CelError::invalid_argument(format!(
                "unsupported map key type: {}",
                other.type_tag()
            ))),
        }
    }

    pub fn to_value(&self) -> CelValue {
        match self {
            Self::Bool(b) => CelValue::Bool(*b),
            Self::Int(v) => CelValue::Int(*v),
            Self::Uint(v) => CelValue::Uint(*v),
            Self::String(s) => CelValue::String(s.clone()),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// An association with typed-key lookup, preserving insertion order so key
/// listings are deterministic.
#[derive(Debug, Clone, Default)]
pub struct CelMap {
    entries: IndexMap<MapKey, CelValue, ahash::RandomState>,
}

impl CelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from key/value pairs, rejecting repeated keys.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (MapKey, CelValue)>,
    ) -> Result<Self, CelError> {
        let mut map = Self::new();
        for (key, value) in entries {
            if map.entries.insert(key.clone(), value).is_some() {
                return Err(CelError::invalid_argument(format!("repeated map key: {key}")));
            }
        }
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &MapKey) -> Option<&CelValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &MapKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.keys()
    }
}

impl PartialEq for CelMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn cross_variant_equality_is_false() {
        assert_ne!(CelValue::Int(1), CelValue::Uint(1));
        assert_ne!(CelValue::Bool(true), CelValue::Int(1));
        assert_ne!(CelValue::Null, CelValue::Int(0));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        assert_ne!(CelValue::Double(f64::NAN), CelValue::Double(f64::NAN));
    }

    #[test]
    fn typed_extraction_reports_the_mismatch() {
        let err = CelValue::Int(3).as_string().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "expected string, found int");
    }

    #[test]
    fn map_keys_reject_non_key_variants() {
        let err = MapKey::from_value(&CelValue::Double(1.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(MapKey::from_value(&CelValue::string("k")).is_ok());
    }

    #[test]
    fn map_preserves_insertion_order() {
        let map = CelMap::from_entries([
            (MapKey::Int(2), CelValue::string("b")),
            (MapKey::Int(1), CelValue::string("a")),
        ])
        .unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![MapKey::Int(2), MapKey::Int(1)]);
    }

    #[test]
    fn map_rejects_repeated_keys() {
        let err = CelMap::from_entries([
            (MapKey::Int(1), CelValue::Null),
            (MapKey::Int(1), CelValue::Null),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn list_membership_uses_strict_equality() {
        let list = CelList::new(vec![CelValue::Int(1), CelValue::string("x")]);
        assert!(list.contains(&CelValue::Int(1)));
        assert!(!list.contains(&CelValue::Uint(1)));
    }
}

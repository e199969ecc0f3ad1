//! The caller-supplied variable binding consulted during evaluation.

use ahash::AHashMap;

use crate::value::CelValue;

/// An ordered set of dotted paths declared unknown by the caller.
///
/// A mask entry matches a selection path when it equals the path or is a
/// dot-boundary prefix of it: masking `a.b` turns both `a.b` and `a.b.c`
/// into unknown values, but leaves `a.bc` alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMask {
    paths: Vec<String>,
}

impl PathMask {
    pub const fn empty() -> Self {
        Self { paths: Vec::new() }
    }

    pub fn new() -> Self {
        Self::empty()
    }

    pub fn add_path(&mut self, path: impl Into<String>) {
        self.paths.push(path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.paths.iter().any(|mask| {
            path == mask
                || (path.len() > mask.len()
                    && path.starts_with(mask.as_str())
                    && path.as_bytes()[mask.len()] == b'.')
        })
    }
}

static EMPTY_MASK: PathMask = PathMask::empty();

/// The read side of a variable binding: named lookup plus the unknown-path
/// mask. Activations are read-only for the duration of one evaluation.
pub trait Activation {
    /// Looks up a variable, returning `None` when the name is not bound.
    fn find(&self, name: &str) -> Option<CelValue>;

    /// The unknown-path mask intersected with selection chains.
    fn unknown_paths(&self) -> &PathMask {
        &EMPTY_MASK
    }
}

/// A map-backed [`Activation`] suitable for most callers.
#[derive(Debug, Default)]
pub struct VariableActivation {
    values: AHashMap<String, CelValue>,
    unknown_paths: PathMask,
}

impl VariableActivation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a variable, replacing any previous binding of the same name.
    pub fn insert_value(&mut self, name: impl Into<String>, value: CelValue) {
        self.values.insert(name.into(), value);
    }

    pub fn set_unknown_paths(&mut self, mask: PathMask) {
        self.unknown_paths = mask;
    }
}

impl Activation for VariableActivation {
    fn find(&self, name: &str) -> Option<CelValue> {
        self.values.get(name).cloned()
    }

    fn unknown_paths(&self) -> &PathMask {
        &self.unknown_paths
    }
}

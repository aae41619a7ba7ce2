//! Interned identifiers shared by the registry, the walker and the loader
//!
//! both a Namespace and a ScriptPath are backed by a DefaultAtom so cloning them while walking the
//! dependency graph or moving them through the load queue is a refcount bump

use std::fmt::{Display, Formatter};
use string_cache::DefaultAtom;

/// the logical identifier of a module, e.g. `my.app.core`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace(DefaultAtom);

impl Namespace {
    pub fn new(name: &str) -> Self {
        Self(DefaultAtom::from(name))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Namespace {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Namespace {
    fn from(name: String) -> Self {
        Self(DefaultAtom::from(name))
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// the resource locator of a namespace's source, relative to the loader's base path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptPath(DefaultAtom);

impl ScriptPath {
    pub fn new(path: &str) -> Self {
        Self(DefaultAtom::from(path))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScriptPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ScriptPath {
    fn from(path: String) -> Self {
        Self(DefaultAtom::from(path))
    }
}

impl Display for ScriptPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// how far an invalidation reaches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadMode {
    /// leave the registry alone
    None,
    /// only the requested namespace
    Single,
    /// the requested namespace and its whole static requirement closure
    All,
}

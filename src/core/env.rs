//! Child environment assembly.
//!
//! The environment handed to the launched program is a copy of the inherited
//! one with the resolved secrets applied on top. The launcher's own
//! environment is never modified.

use std::ffi::{OsStr, OsString};

use indexmap::IndexMap;

use crate::core::observe::{Event, Observer};
use crate::core::types::SecretMap;

/// Ordered `KEY=VALUE` set for the child process.
///
/// Inherited variables keep their order; an overwritten variable keeps its
/// position, new ones are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: IndexMap<OsString, OsString>,
}

impl Environment {
    /// Snapshot of the current process environment.
    pub fn inherit() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Apply secrets on top, reporting every variable that already existed.
    ///
    /// Each key ends up exactly once, holding the secret's value.
    pub fn apply_secrets(&mut self, secrets: &SecretMap, observer: &dyn Observer) {
        for (key, value) in secrets {
            if self.vars.contains_key(OsStr::new(key)) {
                observer.observe(Event::EnvOverwrite { key: key.clone() });
            }
            self.vars.insert(OsString::from(key), OsString::from(value));
        }
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

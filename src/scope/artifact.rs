//! Artifact sets and export surfaces
//!
//! An artifact set is what a module or plugin physically contains; an
//! export index is what a plugin declares visible to delegating modules.
//! A symbol is reachable through delegation only when both agree.

use std::collections::HashSet;

/// Symbols and resources physically present in one module or plugin
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    symbols: HashSet<String>,
    resources: HashSet<String>,
}

impl ArtifactSet {
    pub fn new<S, R>(symbols: S, resources: R) -> Self
    where
        S: IntoIterator<Item = String>,
        R: IntoIterator<Item = String>,
    {
        Self {
            symbols: symbols.into_iter().collect(),
            resources: resources.into_iter().collect(),
        }
    }

    /// Artifact set containing only symbols
    pub fn from_symbols<S: IntoIterator<Item = String>>(symbols: S) -> Self {
        Self::new(symbols, std::iter::empty())
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        self.symbols.contains(name)
    }

    pub fn contains_resource(&self, name: &str) -> bool {
        self.resources.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.resources.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}

/// Declared export surface of a plugin or module
///
/// Symbol prefixes match at `.` segment boundaries, resource prefixes at
/// `/` boundaries: `com.acme.api` exports `com.acme.api.Foo` but not
/// `com.acme.apix.Foo`.
#[derive(Debug, Clone, Default)]
pub struct ExportIndex {
    symbol_prefixes: Vec<String>,
    resource_prefixes: Vec<String>,
}

impl ExportIndex {
    pub fn new(symbol_prefixes: Vec<String>, resource_prefixes: Vec<String>) -> Self {
        Self {
            symbol_prefixes,
            resource_prefixes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.symbol_prefixes.is_empty() && self.resource_prefixes.is_empty()
    }

    /// Whether a symbolic name falls under a declared symbol prefix
    pub fn exports_symbol(&self, name: &str) -> bool {
        self.symbol_prefixes
            .iter()
            .any(|p| prefix_matches(p, name, '.'))
    }

    /// Whether a resource name falls under a declared resource prefix
    pub fn exports_resource(&self, name: &str) -> bool {
        self.resource_prefixes
            .iter()
            .any(|p| prefix_matches(p, name, '/'))
    }
}

/// Prefix match honoring segment boundaries. An exact match counts.
fn prefix_matches(prefix: &str, name: &str, separator: char) -> bool {
    match name.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(separator),
        None => false,
    }
}

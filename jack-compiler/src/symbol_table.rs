//! Identifier tables for code generation.
//!
//! The engine keeps two of these: a class scope (`static`/`field`) and
//! a subroutine scope (`arg`/`var`, reset at every subroutine). Lookup
//! falls through from the subroutine scope to the class scope; that
//! composition lives in the engine, not here.

use std::collections::HashMap;

/// What a declared identifier is, which fixes its VM segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Static,
    Field,
    Arg,
    Var,
}

impl Kind {
    fn slot(self) -> usize {
        match self {
            Self::Static => 0,
            Self::Field => 1,
            Self::Arg => 2,
            Self::Var => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub type_name: String,
    pub kind: Kind,
    /// Dense per-kind index within the scope, starting at 0.
    pub index: u16,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolInfo>,
    counts: [u16; 4],
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Erases the scope for the next subroutine.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.counts = [0; 4];
    }

    /// Declares an identifier, assigning the next index of its kind.
    pub fn define(&mut self, name: &str, type_name: &str, kind: Kind) {
        let index = self.counts[kind.slot()];
        self.counts[kind.slot()] += 1;
        self.entries.insert(
            name.to_string(),
            SymbolInfo {
                type_name: type_name.to_string(),
                kind,
                index,
            },
        );
    }

    /// Number of identifiers of `kind` declared in this scope.
    #[must_use]
    pub fn var_count(&self, kind: Kind) -> u16 {
        self.counts[kind.slot()]
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SymbolInfo> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

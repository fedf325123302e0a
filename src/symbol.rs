//! # Symbol
//!
//! Symbol resolvers map function names to the runtime address the search for a patch starts from

use std::collections::HashMap;

use crate::memory::Address;

/// Looks up the runtime base address of a symbol
pub trait SymbolResolver {
    /// Returns the address of `name`, or `None` if the symbol is unknown
    fn resolve(&self, name: &str) -> Option<Address>;
}

impl<F> SymbolResolver for F
where
    F: Fn(&str) -> Option<Address>,
{
    fn resolve(&self, name: &str) -> Option<Address> {
        self(name)
    }
}

/// In-memory symbol table
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Symbol name to address
    symbols: HashMap<String, Address>,
}

impl SymbolTable {
    /// Creates an empty symbol table
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a symbol, returning the previous address
    pub fn insert(&mut self, name: impl Into<String>, address: Address) -> Option<Address> {
        self.symbols.insert(name.into(), address)
    }

    /// Number of known symbols
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table knows no symbols at all
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, name: &str) -> Option<Address> {
        self.symbols.get(name).copied()
    }
}

impl<N: Into<String>> FromIterator<(N, Address)> for SymbolTable {
    fn from_iter<T: IntoIterator<Item = (N, Address)>>(iter: T) -> Self {
        Self {
            symbols: iter
                .into_iter()
                .map(|(name, address)| (name.into(), address))
                .collect(),
        }
    }
}

//! String interning for index terms.
//!
//! Every word, property name and property value that reaches the index is
//! interned once; index keys refer to strings by symbol. Symbols are stable
//! for the lifetime of a database file: they are 1-based insertion positions
//! and the persistence layer writes strings in insertion order, so a reload
//! reproduces the same symbol for every string.

use std::collections::HashMap;

/// Symbol 0 is reserved to mean "no string".
pub const NO_SYMBOL: u64 = 0;

/// An insert-only string table mapping strings to stable u64 symbols.
#[derive(Debug, Default)]
pub struct StringInterner {
    strings: Vec<String>,
    lookup: HashMap<String, u64>,
}

impl StringInterner {
    pub fn new() -> Self {
        StringInterner::default()
    }

    /// Intern a string, returning its symbol. Re-interning an existing
    /// string returns the original symbol.
    pub fn intern(&mut self, s: &str) -> u64 {
        if let Some(&symbol) = self.lookup.get(s) {
            return symbol;
        }
        self.strings.push(s.to_string());
        let symbol = self.strings.len() as u64;
        self.lookup.insert(s.to_string(), symbol);
        symbol
    }

    /// Look up a symbol without interning. Returns [`NO_SYMBOL`] for
    /// strings never seen before.
    pub fn find(&self, s: &str) -> u64 {
        self.lookup.get(s).copied().unwrap_or(NO_SYMBOL)
    }

    /// Resolve a symbol back to its string.
    pub fn resolve(&self, symbol: u64) -> Option<&str> {
        if symbol == NO_SYMBOL {
            return None;
        }
        self.strings.get(symbol as usize - 1).map(String::as_str)
    }

    /// Whether the string has been interned.
    pub fn contains(&self, s: &str) -> bool {
        self.lookup.contains_key(s)
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate strings in insertion (symbol) order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Rebuild an interner from strings in insertion order, as read back
    /// from disk.
    pub fn from_strings(strings: Vec<String>) -> Self {
        let mut lookup = HashMap::with_capacity(strings.len());
        for (i, s) in strings.iter().enumerate() {
            lookup.insert(s.clone(), i as u64 + 1);
        }
        StringInterner { strings, lookup }
    }
}

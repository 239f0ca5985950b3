//! Core data types for Sear.
//!
//! This module defines the fundamental data structures shared by the index
//! store, the query evaluator and the persistence layer:
//!
//! - **Documents**: positionally addressed, soft-deleted records
//! - **Index keys**: the sortable identity of an index entry
//! - **Search results**: `(document id, score)` pairs, lower score ranks first

use std::cmp::Ordering;
use std::fmt;

/// Positional handle of a document inside the database.
///
/// Handles are array indices: they are assigned once and never reused, so a
/// cached handle stays valid for the lifetime of the database (a liveness
/// check is still required after removals). Handle 0 is the reserved root
/// sentinel and is never returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentHandle(pub u32);

impl DocumentHandle {
    /// The invisible root sentinel document
    pub const ROOT: DocumentHandle = DocumentHandle(0);

    /// Create a new document handle
    pub fn new(id: u32) -> Self {
        DocumentHandle(id)
    }

    /// Get the raw handle value
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Get the handle widened to the result id space
    pub fn as_u64(&self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a document slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DocumentKind {
    /// Slot allocated but never filled
    Unused = 0,
    /// A live, user-visible document
    Default = 1,
    /// The reserved slot-0 sentinel
    Root = 2,
    /// Soft-deleted; the slot is kept so handles stay stable
    Removed = 3,
}

impl DocumentKind {
    /// Decode from the persisted byte representation
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DocumentKind::Unused),
            1 => Some(DocumentKind::Default),
            2 => Some(DocumentKind::Root),
            3 => Some(DocumentKind::Removed),
            _ => None,
        }
    }
}

/// A document record: a name, a lifecycle state and a freshness timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Lifecycle state of this slot
    pub kind: DocumentKind,

    /// Display name; also used for case-insensitive lookup
    pub name: String,

    /// Unix timestamp (seconds) of creation or last refresh
    pub timestamp: u64,
}

impl Document {
    /// Create a live document
    pub fn new(name: impl Into<String>, timestamp: u64) -> Self {
        Document {
            kind: DocumentKind::Default,
            name: name.into(),
            timestamp,
        }
    }

    /// Create the slot-0 root sentinel
    pub fn root(timestamp: u64) -> Self {
        Document {
            kind: DocumentKind::Root,
            name: "<root>".to_string(),
            timestamp,
        }
    }
}

/// The category of an index entry.
///
/// The numeric values participate in key ordering and in the persisted
/// format, so they are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum IndexKind {
    /// A full word extracted from text
    Word = 1,
    /// A shortened prefix of a word or property value
    Variation = 2,
    /// A numeric property value, stored raw to support range queries
    Number = 4,
    /// A string property value
    Property = 8,
}

impl IndexKind {
    /// Decode from the persisted representation
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(IndexKind::Word),
            2 => Some(IndexKind::Variation),
            4 => Some(IndexKind::Number),
            8 => Some(IndexKind::Property),
            _ => None,
        }
    }
}

/// The value slot of an index key: an interned-string symbol for words and
/// string properties, or a raw number for numeric properties.
#[derive(Debug, Clone, Copy)]
pub enum KeyValue {
    /// Interner symbol of the term or property value
    Hash(u64),
    /// Raw numeric property value
    Number(f64),
}

impl KeyValue {
    /// The 8-byte persisted representation of this value
    pub fn to_bits(self) -> u64 {
        match self {
            KeyValue::Hash(h) => h,
            KeyValue::Number(n) => n.to_bits(),
        }
    }
}

/// The sortable identity of an index entry.
///
/// Ordering is total over `(kind, crc, value)`; the score does not
/// participate in identity. `crc` is the interner symbol of the term (for
/// words) or of the property name (for properties and numbers).
#[derive(Debug, Clone, Copy)]
pub struct IndexKey {
    /// Entry category
    pub kind: IndexKind,

    /// Interner symbol of the term or property name
    pub crc: u64,

    /// Term symbol or raw number, depending on `kind`
    pub value: KeyValue,

    /// Ranking score attached to results from this entry (lower ranks first)
    pub score: i32,
}

impl IndexKey {
    pub fn new(kind: IndexKind, crc: u64, value: KeyValue, score: i32) -> Self {
        IndexKey {
            kind,
            crc,
            value,
            score,
        }
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.crc.cmp(&other.crc))
            .then_with(|| match (self.value, other.value) {
                (KeyValue::Hash(a), KeyValue::Hash(b)) => a.cmp(&b),
                (KeyValue::Number(a), KeyValue::Number(b)) => a.total_cmp(&b),
                // Mixed representations only happen across kinds, which the
                // kind comparison above has already decided.
                (KeyValue::Hash(_), KeyValue::Number(_)) => Ordering::Less,
                (KeyValue::Number(_), KeyValue::Hash(_)) => Ordering::Greater,
            })
    }
}

/// A single query match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// Document handle widened to u64
    pub id: u64,

    /// Ranking score inherited from the matched index entry (lower is better)
    pub score: i32,
}

impl SearchResult {
    pub fn new(id: u64, score: i32) -> Self {
        SearchResult { id, score }
    }
}

/// Behavior switches fixed at database construction time.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseOptions {
    /// Preserve case when indexing and querying (default: fold to lowercase)
    pub case_sensitive: bool,

    /// Skip a fixed list of common stop words while indexing
    pub skip_common_words: bool,

    /// Index shortened word prefixes to support partial matching
    pub index_variations: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        DatabaseOptions {
            case_sensitive: false,
            skip_common_words: false,
            index_variations: true,
        }
    }
}

/// Statistics about the database, for status displays.
#[derive(Debug, Clone, Default)]
pub struct DatabaseStats {
    /// Number of live documents
    pub documents: u32,

    /// Number of index entries
    pub entries: u32,

    /// Number of interned strings
    pub words: u32,

    /// Mean document count per index entry
    pub average_docs_per_entry: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_handle() {
        let handle = DocumentHandle::new(42);
        assert_eq!(handle.as_u32(), 42);
        assert_eq!(handle.as_u64(), 42u64);
        assert_eq!(format!("{}", handle), "42");
        assert_eq!(DocumentHandle::ROOT.as_u32(), 0);
    }

    #[test]
    fn test_document_kind_round_trip() {
        for kind in [
            DocumentKind::Unused,
            DocumentKind::Default,
            DocumentKind::Root,
            DocumentKind::Removed,
        ] {
            assert_eq!(DocumentKind::from_u8(kind as u8), Some(kind));
        }
        assert_eq!(DocumentKind::from_u8(9), None);
    }

    #[test]
    fn test_index_key_ordering() {
        let word = IndexKey::new(IndexKind::Word, 10, KeyValue::Hash(10), -5);
        let variation = IndexKey::new(IndexKind::Variation, 2, KeyValue::Hash(2), -4);
        let number = IndexKey::new(IndexKind::Number, 3, KeyValue::Number(1.5), 0);

        // Kind dominates, then crc, then value.
        assert!(word < variation);
        assert!(variation < number);

        let a = IndexKey::new(IndexKind::Number, 3, KeyValue::Number(1.5), 0);
        let b = IndexKey::new(IndexKind::Number, 3, KeyValue::Number(2.5), 0);
        assert!(a < b);

        // Score is not part of identity.
        let c = IndexKey::new(IndexKind::Word, 10, KeyValue::Hash(10), 99);
        assert_eq!(word, c);
    }

    #[test]
    fn test_key_value_bits() {
        assert_eq!(KeyValue::Hash(7).to_bits(), 7);
        assert_eq!(KeyValue::Number(1.5).to_bits(), 1.5f64.to_bits());
    }
}

//! Small-set storage for the document list of an index entry.
//!
//! Most index entries reference only a handful of documents, so the list
//! starts inline and spills to the heap only past [`INLINE_CAPACITY`]
//! handles. Removals shrink a spilled list back inline when it fits again.

use crate::types::DocumentHandle;

/// Handles stored inline before spilling to a heap allocation.
pub const INLINE_CAPACITY: usize = 6;

/// Document list of a single index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocSet {
    Inline {
        docs: [DocumentHandle; INLINE_CAPACITY],
        len: u8,
    },
    Heap(Vec<DocumentHandle>),
}

impl Default for DocSet {
    fn default() -> Self {
        DocSet::Inline {
            docs: [DocumentHandle::ROOT; INLINE_CAPACITY],
            len: 0,
        }
    }
}

impl DocSet {
    pub fn new() -> Self {
        DocSet::default()
    }

    /// Build a set holding a single document.
    pub fn single(doc: DocumentHandle) -> Self {
        let mut set = DocSet::new();
        set.push(doc);
        set
    }

    /// Rebuild a set from persisted handles, preserving order.
    pub fn from_handles(handles: Vec<DocumentHandle>) -> Self {
        if handles.len() <= INLINE_CAPACITY {
            let mut docs = [DocumentHandle::ROOT; INLINE_CAPACITY];
            docs[..handles.len()].copy_from_slice(&handles);
            DocSet::Inline {
                docs,
                len: handles.len() as u8,
            }
        } else {
            DocSet::Heap(handles)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DocSet::Inline { len, .. } => *len as usize,
            DocSet::Heap(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[DocumentHandle] {
        match self {
            DocSet::Inline { docs, len } => &docs[..*len as usize],
            DocSet::Heap(docs) => docs,
        }
    }

    pub fn contains(&self, doc: DocumentHandle) -> bool {
        self.as_slice().contains(&doc)
    }

    /// Append a document if not already present. Returns true if the set
    /// changed. The seventh insertion moves the set to the heap.
    pub fn push(&mut self, doc: DocumentHandle) -> bool {
        if self.contains(doc) {
            return false;
        }
        match self {
            DocSet::Inline { docs, len } => {
                let n = *len as usize;
                if n < INLINE_CAPACITY {
                    docs[n] = doc;
                    *len += 1;
                } else {
                    let mut spilled = Vec::with_capacity(INLINE_CAPACITY * 2);
                    spilled.extend_from_slice(&docs[..n]);
                    spilled.push(doc);
                    *self = DocSet::Heap(spilled);
                }
            }
            DocSet::Heap(docs) => docs.push(doc),
        }
        true
    }

    /// Remove a document if present, compacting the list. A heap list that
    /// shrinks to [`INLINE_CAPACITY`] or fewer moves back inline. Returns
    /// true if the set changed.
    pub fn remove(&mut self, doc: DocumentHandle) -> bool {
        match self {
            DocSet::Inline { docs, len } => {
                let n = *len as usize;
                let Some(pos) = docs[..n].iter().position(|&d| d == doc) else {
                    return false;
                };
                docs.copy_within(pos + 1..n, pos);
                *len -= 1;
                true
            }
            DocSet::Heap(docs) => {
                let Some(pos) = docs.iter().position(|&d| d == doc) else {
                    return false;
                };
                docs.remove(pos);
                if docs.len() <= INLINE_CAPACITY {
                    *self = DocSet::from_handles(std::mem::take(docs));
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u32) -> DocumentHandle {
        DocumentHandle::new(id)
    }

    #[test]
    fn test_push_dedup() {
        let mut set = DocSet::new();
        assert!(set.push(doc(1)));
        assert!(set.push(doc(2)));
        assert!(!set.push(doc(1)));
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice(), &[doc(1), doc(2)]);
    }

    #[test]
    fn test_spill_on_seventh_insert() {
        let mut set = DocSet::new();
        for i in 1..=6 {
            set.push(doc(i));
        }
        assert!(matches!(set, DocSet::Inline { .. }));

        set.push(doc(7));
        assert!(matches!(set, DocSet::Heap(_)));
        assert_eq!(set.len(), 7);
        let expected: Vec<_> = (1..=7).map(doc).collect();
        assert_eq!(set.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_remove_compacts_and_shrinks_inline() {
        let mut set = DocSet::new();
        for i in 1..=7 {
            set.push(doc(i));
        }
        assert!(set.remove(doc(3)));
        assert!(matches!(set, DocSet::Inline { .. }));
        assert_eq!(set.as_slice(), &[doc(1), doc(2), doc(4), doc(5), doc(6), doc(7)]);

        assert!(!set.remove(doc(3)));
        assert!(set.remove(doc(1)));
        assert_eq!(set.as_slice(), &[doc(2), doc(4), doc(5), doc(6), doc(7)]);
    }

    #[test]
    fn test_from_handles() {
        let inline = DocSet::from_handles(vec![doc(1), doc(2)]);
        assert!(matches!(inline, DocSet::Inline { .. }));
        assert_eq!(inline.as_slice(), &[doc(1), doc(2)]);

        let heap = DocSet::from_handles((1..=9).map(doc).collect());
        assert!(matches!(heap, DocSet::Heap(_)));
        assert_eq!(heap.len(), 9);
    }
}

//! The index store.
//!
//! `SearchDatabase` owns a document table, a sorted array of index entries
//! and the string interner, behind a single reader/writer lock. Indexing
//! mutates under the exclusive lock; queries evaluate under the shared lock
//! and call back into the store through the evaluator's leaf handler.
//!
//! Documents are append-only. Removal soft-deletes the slot and scrubs the
//! handle out of every index entry, so handles stay valid for the lifetime
//! of the database and can be cached by callers (with a liveness check).

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, info, warn};

use crate::docset::DocSet;
use crate::error::{QueryError, Result};
use crate::eval::{self, EvalFlags, EvalOp, LeafKind};
use crate::interner::{StringInterner, NO_SYMBOL};
use crate::normalize::{clean_text, format_word, skip_word, NormalizeFlags};
use crate::parser;
use crate::persistence;
use crate::types::{
    DatabaseOptions, DatabaseStats, Document, DocumentHandle, DocumentKind, IndexKey, IndexKind,
    KeyValue, SearchResult,
};

/// Minimum byte length of a query-time word lookup.
const MIN_QUERY_WORD_LENGTH: usize = 2;

/// One entry of the sorted index: a key and the documents matching it.
#[derive(Debug, Clone)]
pub(crate) struct IndexEntry {
    pub key: IndexKey,
    pub docs: DocSet,
}

/// Everything guarded by the database lock.
pub(crate) struct DatabaseState {
    /// Append-only document table; slot 0 is the root sentinel
    pub documents: Vec<Document>,
    /// Sorted by key
    pub entries: Vec<IndexEntry>,
    pub strings: StringInterner,
    /// Live documents (excludes the root sentinel and removed slots)
    pub document_count: u32,
    /// Unsaved changes present
    pub dirty: bool,
}

impl DatabaseState {
    fn new() -> Self {
        DatabaseState {
            documents: vec![Document::root(now_timestamp())],
            entries: Vec::new(),
            strings: StringInterner::new(),
            document_count: 0,
            dirty: false,
        }
    }
}

/// Handle of a registered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryHandle(pub u32);

struct StoredQuery {
    text: String,
    completed: bool,
    results: Vec<SearchResult>,
}

/// An embedded full-text and structured-property search engine.
pub struct SearchDatabase {
    options: DatabaseOptions,
    state: RwLock<DatabaseState>,
    // Slot 0 is reserved so query handles start at 1.
    queries: RwLock<Vec<Option<StoredQuery>>>,
}

impl Default for SearchDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchDatabase {
    pub fn new() -> Self {
        Self::with_options(DatabaseOptions::default())
    }

    pub fn with_options(options: DatabaseOptions) -> Self {
        SearchDatabase {
            options,
            state: RwLock::new(DatabaseState::new()),
            queries: RwLock::new(vec![None]),
        }
    }

    pub fn options(&self) -> DatabaseOptions {
        self.options
    }

    // Document table

    /// Append a new document. Handles are never reused, including after
    /// removal.
    pub fn add_document(&self, name: &str) -> DocumentHandle {
        let mut state = self.state.write();
        Self::add_document_locked(&mut state, name)
    }

    /// Case-insensitive lookup over live documents.
    pub fn find_document(&self, name: &str) -> Option<DocumentHandle> {
        let state = self.state.read();
        Self::find_document_locked(&state, name)
    }

    pub fn get_or_add_document(&self, name: &str) -> DocumentHandle {
        let mut state = self.state.write();
        match Self::find_document_locked(&state, name) {
            Some(handle) => handle,
            None => Self::add_document_locked(&mut state, name),
        }
    }

    pub fn is_document_valid(&self, handle: DocumentHandle) -> bool {
        let state = self.state.read();
        is_live(&state, handle)
    }

    pub fn document_name(&self, handle: DocumentHandle) -> Option<String> {
        let state = self.state.read();
        if !is_live(&state, handle) {
            return None;
        }
        Some(state.documents[handle.as_u32() as usize].name.clone())
    }

    pub fn document_timestamp(&self, handle: DocumentHandle) -> Option<u64> {
        let state = self.state.read();
        if !is_live(&state, handle) {
            return None;
        }
        Some(state.documents[handle.as_u32() as usize].timestamp)
    }

    /// Refresh a document's timestamp. Marks the database dirty only when
    /// the value actually changes.
    pub fn update_document_timestamp(&self, handle: DocumentHandle, timestamp: u64) -> bool {
        let mut state = self.state.write();
        if !is_live(&state, handle) {
            return false;
        }
        let doc = &mut state.documents[handle.as_u32() as usize];
        if doc.timestamp != timestamp {
            doc.timestamp = timestamp;
            state.dirty = true;
        }
        true
    }

    /// Soft-delete a document and scrub it from every index entry. Entries
    /// left without documents are pruned.
    pub fn remove_document(&self, handle: DocumentHandle) -> bool {
        let mut state = self.state.write();
        if !is_live(&state, handle) {
            return false;
        }
        Self::remove_document_locked(&mut state, handle);
        debug!(document = %handle, "document removed");
        true
    }

    /// Bulk soft-delete of documents whose timestamp is strictly older than
    /// the given one. Returns how many were removed.
    pub fn remove_documents_older_than(&self, timestamp: u64) -> u32 {
        let mut state = self.state.write();
        let stale: Vec<DocumentHandle> = state
            .documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.kind == DocumentKind::Default && doc.timestamp < timestamp)
            .map(|(i, _)| DocumentHandle::new(i as u32))
            .collect();
        for handle in &stale {
            Self::remove_document_locked(&mut state, *handle);
        }
        if !stale.is_empty() {
            info!(removed = stale.len(), "stale documents removed");
        }
        stale.len() as u32
    }

    fn add_document_locked(state: &mut DatabaseState, name: &str) -> DocumentHandle {
        let handle = DocumentHandle::new(state.documents.len() as u32);
        state.documents.push(Document::new(name, now_timestamp()));
        state.document_count += 1;
        state.dirty = true;
        handle
    }

    fn find_document_locked(state: &DatabaseState, name: &str) -> Option<DocumentHandle> {
        let needle = name.to_lowercase();
        state
            .documents
            .iter()
            .enumerate()
            .find(|(_, doc)| {
                doc.kind == DocumentKind::Default && doc.name.to_lowercase() == needle
            })
            .map(|(i, _)| DocumentHandle::new(i as u32))
    }

    fn remove_document_locked(state: &mut DatabaseState, handle: DocumentHandle) {
        let doc = &mut state.documents[handle.as_u32() as usize];
        doc.kind = DocumentKind::Removed;
        doc.name.clear();
        state.document_count -= 1;
        state.entries.retain_mut(|entry| {
            entry.docs.remove(handle);
            !entry.docs.is_empty()
        });
        state.dirty = true;
    }

    // Indexing

    /// Index a single word for a document: one `Word` key, plus `Variation`
    /// keys for every shortened prefix down to 3 characters when requested.
    pub fn index_word(&self, doc: DocumentHandle, word: &str, include_variations: bool) -> bool {
        let cleaned = clean_text(word);
        if skip_word(cleaned, self.options.skip_common_words) {
            return false;
        }
        let flags = NormalizeFlags {
            keep_case: self.options.case_sensitive,
            trim_plural: true,
            strip_punctuation: false,
        };
        let mut state = self.state.write();
        if !is_live(&state, doc) {
            return false;
        }
        self.index_formatted_word(&mut state, doc, cleaned, flags, include_variations)
    }

    /// Index free text: split on `,`, then `:`, then spaces, indexing each
    /// token as a word. Tokens are not plural-trimmed on this path.
    pub fn index_text(&self, doc: DocumentHandle, text: &str) -> bool {
        let flags = NormalizeFlags {
            keep_case: self.options.case_sensitive,
            trim_plural: false,
            strip_punctuation: true,
        };
        let mut state = self.state.write();
        if !is_live(&state, doc) {
            return false;
        }
        let mut indexed = false;
        for segment in clean_text(text).split(',') {
            for part in clean_text(segment).split(':') {
                for word in clean_text(part).split(' ') {
                    if word.is_empty() || skip_word(word, self.options.skip_common_words) {
                        continue;
                    }
                    indexed |= self.index_formatted_word(
                        &mut state,
                        doc,
                        word,
                        flags,
                        self.options.index_variations,
                    );
                }
            }
        }
        indexed
    }

    /// Index a literal with a score that always outranks normal word
    /// matches.
    pub fn index_exact_match(&self, doc: DocumentHandle, word: &str, case_sensitive: bool) -> bool {
        if word.is_empty() {
            return false;
        }
        let flags = NormalizeFlags {
            keep_case: case_sensitive,
            ..NormalizeFlags::default()
        };
        let formatted = format_word(word, flags);
        if formatted.is_empty() {
            return false;
        }
        let mut state = self.state.write();
        if !is_live(&state, doc) {
            return false;
        }
        let symbol = state.strings.intern(&formatted);
        let score = i32::MIN + formatted.len() as i32;
        let key = IndexKey::new(IndexKind::Word, symbol, KeyValue::Hash(symbol), score);
        insert_index(&mut state, doc, key);
        true
    }

    /// Index a string-valued property. The value gets a `Property` key plus
    /// shortened-prefix variations under the same property name.
    pub fn index_property(&self, doc: DocumentHandle, name: &str, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        if value.len() >= 3 && skip_word(value, self.options.skip_common_words) {
            return false;
        }
        let name_flags = NormalizeFlags {
            keep_case: self.options.case_sensitive,
            ..NormalizeFlags::default()
        };
        let value_flags = NormalizeFlags {
            keep_case: self.options.case_sensitive,
            trim_plural: true,
            strip_punctuation: false,
        };
        let formatted_name = format_word(name, name_flags);
        let formatted = format_word(value, value_flags);
        if formatted_name.is_empty() || formatted.is_empty() {
            return false;
        }
        let mut state = self.state.write();
        if !is_live(&state, doc) {
            return false;
        }
        let crc = state.strings.intern(&formatted_name);
        let symbol = state.strings.intern(&formatted);
        let mut score = formatted.len() as i32;
        let key = IndexKey::new(IndexKind::Property, crc, KeyValue::Hash(symbol), score);
        insert_index(&mut state, doc, key);

        if self.options.index_variations {
            for cut in prefix_cuts(&formatted) {
                let prefix = &formatted[..cut];
                if !prefix.ends_with(' ') {
                    let symbol = state.strings.intern(prefix);
                    let key =
                        IndexKey::new(IndexKind::Property, crc, KeyValue::Hash(symbol), score);
                    insert_index(&mut state, doc, key);
                }
                score += 1;
            }
        }
        true
    }

    /// Index a numeric property, stored raw to support range queries.
    pub fn index_property_number(&self, doc: DocumentHandle, name: &str, value: f64) -> bool {
        let flags = NormalizeFlags {
            keep_case: self.options.case_sensitive,
            ..NormalizeFlags::default()
        };
        let formatted_name = format_word(name, flags);
        if formatted_name.is_empty() {
            return false;
        }
        let mut state = self.state.write();
        if !is_live(&state, doc) {
            return false;
        }
        let crc = state.strings.intern(&formatted_name);
        let score = -(formatted_name.len() as i32);
        let key = IndexKey::new(IndexKind::Number, crc, KeyValue::Number(value), score);
        insert_index(&mut state, doc, key);
        true
    }

    fn index_formatted_word(
        &self,
        state: &mut DatabaseState,
        doc: DocumentHandle,
        word: &str,
        flags: NormalizeFlags,
        include_variations: bool,
    ) -> bool {
        let formatted = format_word(word, flags);
        if formatted.is_empty() {
            return false;
        }
        let symbol = state.strings.intern(&formatted);
        let mut score = -(formatted.len() as i32);
        let key = IndexKey::new(IndexKind::Word, symbol, KeyValue::Hash(symbol), score);
        insert_index(state, doc, key);

        if include_variations && self.options.index_variations {
            for cut in prefix_cuts(&formatted) {
                let prefix = &formatted[..cut];
                if !prefix.ends_with(' ') {
                    let symbol = state.strings.intern(prefix);
                    let key =
                        IndexKey::new(IndexKind::Variation, symbol, KeyValue::Hash(symbol), score);
                    insert_index(state, doc, key);
                }
                score += 1;
            }
        }
        true
    }

    // Queries

    /// Parse and evaluate a query without registering it.
    pub fn search(&self, text: &str) -> Result<Vec<SearchResult>> {
        let node = parser::parse_query(text)?;
        let state = self.state.read();
        let mut handler = |name: &str,
                           value: &str,
                           flags: EvalFlags,
                           and_set: Option<&[SearchResult]>|
         -> std::result::Result<Vec<SearchResult>, QueryError> {
            Ok(resolve_leaf(&state, self.options, name, value, flags, and_set))
        };
        Ok(eval::evaluate(&node, &mut handler)?)
    }

    /// Parse, evaluate and register a query. Evaluation is synchronous, so
    /// the returned handle is already completed.
    pub fn query(&self, text: &str) -> Result<QueryHandle> {
        let results = self.search(text)?;
        let stored = StoredQuery {
            text: text.to_string(),
            completed: true,
            results,
        };
        let mut queries = self.queries.write();
        let slot = queries
            .iter()
            .skip(1)
            .position(Option::is_none)
            .map(|i| i + 1);
        let handle = match slot {
            Some(slot) => {
                queries[slot] = Some(stored);
                QueryHandle(slot as u32)
            }
            None => {
                queries.push(Some(stored));
                QueryHandle(queries.len() as u32 - 1)
            }
        };
        Ok(handle)
    }

    pub fn query_is_completed(&self, handle: QueryHandle) -> bool {
        let queries = self.queries.read();
        queries
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
            .is_some_and(|q| q.completed)
    }

    pub fn query_text(&self, handle: QueryHandle) -> Option<String> {
        let queries = self.queries.read();
        queries
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
            .map(|q| q.text.clone())
    }

    pub fn query_results(&self, handle: QueryHandle) -> Vec<SearchResult> {
        let queries = self.queries.read();
        queries
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
            .map(|q| q.results.clone())
            .unwrap_or_default()
    }

    pub fn query_dispose(&self, handle: QueryHandle) -> bool {
        if handle.0 == 0 {
            return false;
        }
        let mut queries = self.queries.write();
        match queries.get_mut(handle.0 as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    // Introspection

    /// Number of live documents.
    pub fn document_count(&self) -> u32 {
        self.state.read().document_count
    }

    /// Number of index entries.
    pub fn index_count(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Number of interned strings.
    pub fn word_count(&self) -> usize {
        self.state.read().strings.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    /// Case-folded interner membership test. No plural trimming.
    pub fn contains_word(&self, word: &str) -> bool {
        let flags = NormalizeFlags {
            keep_case: self.options.case_sensitive,
            ..NormalizeFlags::default()
        };
        let formatted = format_word(word, flags);
        self.state.read().strings.contains(&formatted)
    }

    /// Documents behind the `Word` entry of a normalized word, optionally
    /// plus its `Variation` entry.
    pub fn word_document_count(&self, word: &str, include_variations: bool) -> usize {
        let flags = NormalizeFlags {
            keep_case: self.options.case_sensitive,
            ..NormalizeFlags::default()
        };
        let formatted = format_word(word, flags);
        let state = self.state.read();
        let symbol = state.strings.find(&formatted);
        if symbol == NO_SYMBOL {
            return 0;
        }
        let mut count = entry_doc_count(&state, IndexKind::Word, symbol);
        if include_variations && self.options.index_variations {
            count += entry_doc_count(&state, IndexKind::Variation, symbol);
        }
        count
    }

    /// Distinct property names across `Property` and `Number` entries.
    pub fn property_keywords(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names = BTreeSet::new();
        for entry in &state.entries {
            if matches!(entry.key.kind, IndexKind::Property | IndexKind::Number) {
                if let Some(name) = state.strings.resolve(entry.key.crc) {
                    names.insert(name.to_string());
                }
            }
        }
        names.into_iter().collect()
    }

    pub fn stats(&self) -> DatabaseStats {
        let state = self.state.read();
        let total_refs: usize = state.entries.iter().map(|e| e.docs.len()).sum();
        DatabaseStats {
            documents: state.document_count,
            entries: state.entries.len() as u32,
            words: state.strings.len() as u32,
            average_docs_per_entry: if state.entries.is_empty() {
                0.0
            } else {
                total_refs as f64 / state.entries.len() as f64
            },
        }
    }

    // Persistence

    /// Write the full database state. Taken under the shared lock; the
    /// dirty flag is cleared under a short exclusive upgrade afterwards.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        let state = self.state.upgradable_read();
        persistence::write_database(&state, writer)?;
        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        state.dirty = false;
        info!(
            documents = state.document_count,
            entries = state.entries.len(),
            "database saved"
        );
        Ok(())
    }

    /// Replace the full database state from a stream. All-or-nothing: on
    /// any decode failure the in-memory database is left untouched.
    pub fn load<R: Read>(&self, reader: &mut R) -> Result<()> {
        let loaded = persistence::read_database(reader)?;
        let mut state = self.state.write();
        *state = loaded;
        info!(
            documents = state.document_count,
            entries = state.entries.len(),
            "database loaded"
        );
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_path(&self, path: &Path) -> Result<()> {
        let mut reader = BufReader::new(File::open(path)?);
        self.load(&mut reader)
    }
}

fn now_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

fn is_live(state: &DatabaseState, handle: DocumentHandle) -> bool {
    handle != DocumentHandle::ROOT
        && state
            .documents
            .get(handle.as_u32() as usize)
            .is_some_and(|doc| doc.kind == DocumentKind::Default)
}

/// Byte offsets of the shortened prefixes of a word, longest first, down to
/// 3 characters.
fn prefix_cuts(word: &str) -> Vec<usize> {
    let mut cuts: Vec<usize> = word.char_indices().map(|(i, _)| i).skip(3).collect();
    cuts.reverse();
    cuts
}

/// Insert a document under a key, keeping the index sorted. On a key hit
/// the existing entry keeps its original score. Dirties the database only
/// when the entry actually changes.
fn insert_index(state: &mut DatabaseState, doc: DocumentHandle, key: IndexKey) {
    match state.entries.binary_search_by(|entry| entry.key.cmp(&key)) {
        Ok(pos) => {
            if state.entries[pos].docs.push(doc) {
                state.dirty = true;
            }
        }
        Err(pos) => {
            state.entries.insert(
                pos,
                IndexEntry {
                    key,
                    docs: DocSet::single(doc),
                },
            );
            state.dirty = true;
        }
    }
}

fn find_entry(state: &DatabaseState, kind: IndexKind, crc: u64, value: KeyValue) -> Option<usize> {
    let probe = IndexKey::new(kind, crc, value, 0);
    state
        .entries
        .binary_search_by(|entry| entry.key.cmp(&probe))
        .ok()
}

fn entry_doc_count(state: &DatabaseState, kind: IndexKind, symbol: u64) -> usize {
    find_entry(state, kind, symbol, KeyValue::Hash(symbol))
        .map(|pos| state.entries[pos].docs.len())
        .unwrap_or(0)
}

fn collect_entry(state: &DatabaseState, pos: usize, results: &mut Vec<SearchResult>) {
    let entry = &state.entries[pos];
    for doc in entry.docs.as_slice() {
        eval::insert_result(results, SearchResult::new(doc.as_u64(), entry.key.score));
    }
}

/// The evaluator's leaf handler: resolve one word/property/function leaf
/// into an id-sorted result list, applying complement and narrowing.
fn resolve_leaf(
    state: &DatabaseState,
    options: DatabaseOptions,
    name: &str,
    value: &str,
    flags: EvalFlags,
    and_set: Option<&[SearchResult]>,
) -> Vec<SearchResult> {
    let mut matched = Vec::new();
    let mut complement = flags.exclude;

    match flags.leaf {
        LeafKind::Word => {
            let exact = flags.op == EvalOp::Equal;
            lookup_word(state, options, value, exact, &mut matched);
        }
        LeafKind::Property => {
            if flags.op == EvalOp::NotEqual {
                complement = !complement;
            }
            lookup_property(state, options, name, value, flags.op, &mut matched);
        }
        LeafKind::Function => {
            warn!(function = name, "unsupported query function");
        }
    }

    if complement {
        let mut results = Vec::new();
        for (i, doc) in state.documents.iter().enumerate() {
            if doc.kind != DocumentKind::Default {
                continue;
            }
            let id = i as u64;
            if matched.binary_search_by_key(&id, |r| r.id).is_err() {
                results.push(SearchResult::new(id, 0));
            }
        }
        matched = results;
    }

    if let Some(set) = and_set {
        matched.retain_mut(|result| {
            match set.binary_search_by_key(&result.id, |r| r.id) {
                Ok(pos) => {
                    result.score = result.score.min(set[pos].score);
                    true
                }
                Err(_) => false,
            }
        });
    }

    matched
}

fn lookup_word(
    state: &DatabaseState,
    options: DatabaseOptions,
    value: &str,
    exact: bool,
    results: &mut Vec<SearchResult>,
) {
    let flags = NormalizeFlags {
        keep_case: options.case_sensitive,
        ..NormalizeFlags::default()
    };
    let formatted = format_word(value, flags);
    if formatted.len() < MIN_QUERY_WORD_LENGTH {
        return;
    }
    let symbol = state.strings.find(&formatted);
    if symbol == NO_SYMBOL {
        return;
    }
    if let Some(pos) = find_entry(state, IndexKind::Word, symbol, KeyValue::Hash(symbol)) {
        collect_entry(state, pos, results);
    }
    if !exact && options.index_variations {
        if let Some(pos) = find_entry(state, IndexKind::Variation, symbol, KeyValue::Hash(symbol)) {
            collect_entry(state, pos, results);
        }
    }
}

fn lookup_property(
    state: &DatabaseState,
    options: DatabaseOptions,
    name: &str,
    value: &str,
    op: EvalOp,
    results: &mut Vec<SearchResult>,
) {
    let flags = NormalizeFlags {
        keep_case: options.case_sensitive,
        ..NormalizeFlags::default()
    };
    let formatted_name = format_word(name, flags);
    let formatted_value = format_word(value, flags);
    let crc = state.strings.find(&formatted_name);
    if crc == NO_SYMBOL {
        return;
    }

    if let Some(number) = parse_number(&formatted_value) {
        match op {
            EvalOp::Equal | EvalOp::Contains | EvalOp::NotEqual => {
                if let Some(pos) =
                    find_entry(state, IndexKind::Number, crc, KeyValue::Number(number))
                {
                    collect_entry(state, pos, results);
                }
            }
            EvalOp::Less | EvalOp::LessEq | EvalOp::Greater | EvalOp::GreaterEq => {
                lookup_number_range(state, crc, number, op, results);
            }
            EvalOp::Eval => {}
        }
        return;
    }

    // String values only support equality-style matching; ordered
    // comparisons over strings match nothing.
    if matches!(op, EvalOp::Equal | EvalOp::Contains | EvalOp::NotEqual) {
        let symbol = state.strings.find(&formatted_value);
        if symbol == NO_SYMBOL {
            return;
        }
        if let Some(pos) = find_entry(state, IndexKind::Property, crc, KeyValue::Hash(symbol)) {
            collect_entry(state, pos, results);
        }
    }
}

/// Walk the contiguous run of `Number` entries sharing a property name and
/// collect those satisfying the comparison.
fn lookup_number_range(
    state: &DatabaseState,
    crc: u64,
    bound: f64,
    op: EvalOp,
    results: &mut Vec<SearchResult>,
) {
    let probe = IndexKey::new(
        IndexKind::Number,
        crc,
        KeyValue::Number(f64::NEG_INFINITY),
        0,
    );
    let start = state
        .entries
        .partition_point(|entry| entry.key.cmp(&probe) == std::cmp::Ordering::Less);
    for entry in &state.entries[start..] {
        if entry.key.kind != IndexKind::Number || entry.key.crc != crc {
            break;
        }
        let KeyValue::Number(number) = entry.key.value else {
            continue;
        };
        let satisfied = match op {
            EvalOp::Less => number < bound,
            EvalOp::LessEq => number <= bound,
            EvalOp::Greater => number > bound,
            EvalOp::GreaterEq => number >= bound,
            _ => false,
        };
        if satisfied {
            for doc in entry.docs.as_slice() {
                eval::insert_result(results, SearchResult::new(doc.as_u64(), entry.key.score));
            }
        }
    }
}

/// Parse a numeric property value: a plain number, or a `YYYY-MM-DD` date
/// converted to unix seconds.
fn parse_number(value: &str) -> Option<f64> {
    if let Ok(number) = value.parse::<f64>() {
        return Some(number);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().timestamp() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Six people with text, numeric properties and string properties.
    fn fixture() -> SearchDatabase {
        let db = SearchDatabase::new();
        let names = ["joe", "bob", "will", "mel", "mag", "yolland"];
        let texts = [
            "joe smith",
            "bob smith",
            "will schmidt",
            "mel cadotte",
            "mag cadotte schmidt",
            "yolland smitton",
        ];
        let ages = [40.0, 55.0, 14.0, 39.0, 10.0, 101.0];
        let heights = [1.8, 1.6, 1.79, 1.7, 1.6, 1.5];
        let weights = [80.0, 90.0, 70.0, 60.0, 40.0, 40.0];
        let jobs = ["retired", "manager", "student", "hr", "student", "retired"];
        let full_names = [
            "Jonathan", "Robert", "William", "Mélanie", "Magaly", "Yolland",
        ];

        for i in 0..names.len() {
            let doc = db.add_document(names[i]);
            assert_eq!(doc.as_u32(), i as u32 + 1);
            assert!(db.index_text(doc, texts[i]));
            assert!(db.index_property_number(doc, "age", ages[i]));
            assert!(db.index_property_number(doc, "height", heights[i]));
            assert!(db.index_property_number(doc, "weight", weights[i]));
            assert!(db.index_property(doc, "job", jobs[i]));
            assert!(db.index_property(doc, "name", full_names[i]));
        }
        db
    }

    fn search_names(db: &SearchDatabase, query: &str) -> Vec<String> {
        let mut names: Vec<String> = db
            .search(query)
            .unwrap()
            .into_iter()
            .map(|r| {
                db.document_name(DocumentHandle::new(r.id as u32))
                    .unwrap_or_default()
            })
            .collect();
        names.sort();
        names
    }

    fn assert_matches(db: &SearchDatabase, query: &str, expected: &[&str]) {
        let mut expected: Vec<&str> = expected.to_vec();
        expected.sort_unstable();
        assert_eq!(search_names(db, query), expected, "query: {query}");
    }

    #[test]
    fn test_word_queries() {
        let db = fixture();
        assert_matches(&db, "smith", &["joe", "bob"]);
        assert_matches(&db, "SMITH OR CADOTTE", &["joe", "bob", "mel", "mag"]);
        assert_matches(&db, "schmidt and CADOTTE", &["mag"]);
        assert_matches(&db, "(schmidt or CADOTTE) and (joe or will)", &["will"]);
    }

    #[test]
    fn test_prefix_variations() {
        let db = fixture();
        assert_matches(&db, "smit or pascal", &["joe", "bob", "yolland"]);
        assert_eq!(db.search("(((smit) or (pascal)) or ((will)))").unwrap().len(), 4);
        assert_matches(&db, "((schmidt) (cAdoTtE)) or (yoll smitt)", &["mag", "yolland"]);
    }

    #[test]
    fn test_negation() {
        let db = fixture();
        assert_matches(&db, "cadotte -schmidt", &["mel"]);
        assert_eq!(db.search("-cadotte or -schmidt").unwrap().len(), 5);
        assert_matches(&db, "-cadotte AND -\"schmidt\"", &["joe", "bob", "yolland"]);
    }

    #[test]
    fn test_negated_group_excludes_every_member() {
        let db = fixture();
        // The exclusion distributes over the group's conjunction: documents
        // matching either word are out.
        assert_matches(&db, "-(cadotte schmidt)", &["joe", "bob", "yolland"]);
        assert_matches(&db, "smith -(cadotte schmidt)", &["joe", "bob"]);
    }

    #[test]
    fn test_numeric_properties() {
        let db = fixture();
        assert_matches(&db, "age=40 or age:40", &["joe"]);
        assert_eq!(db.search("-age=40").unwrap().len(), 5);
        assert_matches(&db, "age<40", &["will", "mel", "mag"]);
        assert_matches(&db, "age<40 and age>=14", &["will", "mel"]);
    }

    #[test]
    fn test_mixed_properties() {
        let db = fixture();
        assert_matches(
            &db,
            "(job=retire age>14 weight>40) or (job=student)",
            &["joe", "will", "mag"],
        );
        assert_matches(&db, "-job=retire age>14", &["bob", "mel"]);
        assert_matches(&db, "age>14 -job:RET", &["bob", "mel"]);
        assert_eq!(db.search("-age>-100 name:smi").unwrap().len(), 0);
        assert_matches(&db, "name=MÉlanie cadotte age>=39", &["mel"]);
    }

    #[test]
    fn test_index_word_entry_counts() {
        let db = SearchDatabase::new();
        let doc = db.add_document("counts");
        assert!(db.index_word(doc, "hello", true));
        assert!(db.index_word(doc, "world", true));
        assert!(db.index_word(doc, "hello", true));
        // hello, hell, hel + world, worl, wor
        assert_eq!(db.index_count(), 6);
        assert_eq!(db.word_count(), 6);
    }

    #[test]
    fn test_index_text_entry_counts() {
        let db = SearchDatabase::new();
        let doc = db.add_document("counts");
        assert!(db.index_text(doc, "Apple, markets:cap value"));
        // apple(+2), markets(+4, no plural trim), cap(+0), value(+2)
        assert_eq!(db.index_count(), 12);
    }

    #[test]
    fn test_indexing_is_idempotent_per_document() {
        let db = SearchDatabase::new();
        let a = db.add_document("a");
        let b = db.add_document("b");
        db.index_word(a, "shared", false);
        db.index_word(a, "shared", false);
        db.index_word(b, "shared", false);
        assert_eq!(db.index_count(), 1);
        assert_eq!(db.word_document_count("shared", false), 2);
    }

    #[test]
    fn test_short_words_are_not_indexed() {
        let db = SearchDatabase::new();
        let doc = db.add_document("short");
        assert!(!db.index_word(doc, "ab", true));
        assert_eq!(db.index_count(), 0);
    }

    #[test]
    fn test_skip_common_words_option() {
        let db = SearchDatabase::with_options(DatabaseOptions {
            skip_common_words: true,
            ..DatabaseOptions::default()
        });
        let doc = db.add_document("doc");
        assert!(!db.index_word(doc, "the", false));
        assert!(db.index_word(doc, "search", false));
    }

    #[test]
    fn test_exact_match_outranks_words() {
        let db = SearchDatabase::new();
        let doc = db.add_document("doc");
        db.index_exact_match(doc, "market", false);
        db.index_word(doc, "market", false);
        let results = db.search("market").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, i32::MIN + "market".len() as i32);
    }

    #[test]
    fn test_remove_document() {
        let db = fixture();
        let mag = db.find_document("mag").unwrap();
        assert!(db.remove_document(mag));
        assert!(!db.is_document_valid(mag));
        assert_eq!(db.document_count(), 5);
        assert_matches(&db, "cadotte", &["mel"]);
        assert_matches(&db, "schmidt", &["will"]);
        // Handles are never reused.
        let new_doc = db.add_document("newcomer");
        assert_eq!(new_doc.as_u32(), 7);
    }

    #[test]
    fn test_remove_documents_older_than() {
        let db = SearchDatabase::new();
        let old = db.add_document("old");
        let fresh = db.add_document("fresh");
        let cutoff = db.document_timestamp(fresh).unwrap() + 10;
        db.update_document_timestamp(old, cutoff - 100);
        db.update_document_timestamp(fresh, cutoff + 100);
        assert_eq!(db.remove_documents_older_than(cutoff), 1);
        assert!(!db.is_document_valid(old));
        assert!(db.is_document_valid(fresh));
    }

    #[test]
    fn test_document_lookup() {
        let db = fixture();
        let joe = db.find_document("JOE").unwrap();
        assert_eq!(db.document_name(joe).as_deref(), Some("joe"));
        assert_eq!(db.get_or_add_document("joe"), joe);
        let count = db.document_count();
        db.get_or_add_document("someone-new");
        assert_eq!(db.document_count(), count + 1);
    }

    #[test]
    fn test_update_timestamp_dirties_only_on_change() {
        let db = SearchDatabase::new();
        let doc = db.add_document("doc");
        let ts = db.document_timestamp(doc).unwrap();
        let mut writer = Vec::new();
        db.save(&mut writer).unwrap();
        assert!(!db.is_dirty());
        assert!(db.update_document_timestamp(doc, ts));
        assert!(!db.is_dirty());
        assert!(db.update_document_timestamp(doc, ts + 1));
        assert!(db.is_dirty());
    }

    #[test]
    fn test_reindexing_identical_content_stays_clean() {
        let db = SearchDatabase::new();
        let doc = db.add_document("doc");
        db.index_word(doc, "hello", true);
        db.index_property(doc, "job", "manager");
        db.index_property_number(doc, "age", 40.0);
        let mut writer = Vec::new();
        db.save(&mut writer).unwrap();
        assert!(!db.is_dirty());

        db.index_word(doc, "hello", true);
        db.index_property(doc, "job", "manager");
        db.index_property_number(doc, "age", 40.0);
        assert!(!db.is_dirty());

        db.index_word(doc, "fresh", true);
        assert!(db.is_dirty());
    }

    #[test]
    fn test_word_introspection() {
        let db = fixture();
        assert!(db.contains_word("smith"));
        assert!(db.contains_word("SMITH"));
        assert!(!db.contains_word("pascal"));
        assert_eq!(db.word_document_count("smith", false), 2);
        assert_eq!(db.word_document_count("smit", true), 3);
    }

    #[test]
    fn test_property_keywords() {
        let db = fixture();
        assert_eq!(
            db.property_keywords(),
            vec!["age", "height", "job", "name", "weight"]
        );
    }

    #[test]
    fn test_query_registry() {
        let db = fixture();
        let handle = db.query("smith").unwrap();
        assert_eq!(handle, QueryHandle(1));
        assert!(db.query_is_completed(handle));
        assert_eq!(db.query_text(handle).as_deref(), Some("smith"));
        assert_eq!(db.query_results(handle).len(), 2);

        let second = db.query("cadotte").unwrap();
        assert_eq!(second, QueryHandle(2));
        assert!(db.query_dispose(handle));
        assert!(!db.query_dispose(handle));
        // Freed slots are reused for queries (unlike document handles).
        let third = db.query("will").unwrap();
        assert_eq!(third, QueryHandle(1));
    }

    #[test]
    fn test_invalid_query_is_an_error() {
        let db = fixture();
        assert!(db.search("(unterminated").is_err());
        assert!(db.query("(unterminated").is_err());
    }

    #[test]
    fn test_stats() {
        let db = fixture();
        let stats = db.stats();
        assert_eq!(stats.documents, 6);
        assert_eq!(stats.entries as usize, db.index_count());
        assert!(stats.average_docs_per_entry > 0.0);
    }

    #[test]
    fn test_date_valued_property_query() {
        let db = SearchDatabase::new();
        let doc = db.add_document("event");
        let day = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp() as f64;
        db.index_property_number(doc, "date", day);
        assert_eq!(db.search("date=2024-01-15").unwrap().len(), 1);
        assert_eq!(db.search("date>2024-01-01").unwrap().len(), 1);
        assert_eq!(db.search("date>2024-02-01").unwrap().len(), 0);
    }
}

//! Versioned binary persistence.
//!
//! The on-disk layout, all integers little-endian:
//!
//! 1. Header: magic `SEAR`, one version byte, four structural guard bytes
//!    (truncated `size_of` of the entry/key/document/database structures).
//!    A guard mismatch means the file was written by an incompatible build.
//! 2. Documents: `u32` count, then per document a kind byte, a
//!    `u32`-length-prefixed UTF-8 name and a `u64` timestamp.
//! 3. String table: `i32` symbol count, `u64` average string length, `u64`
//!    blob byte size, then the strings in symbol order, each
//!    `u32`-length-prefixed.
//! 4. Index entries: `u32` count, then per entry a 24-byte key
//!    (`kind:u32 | crc:u64 | value:u64 | score:i32`), a `u32` document
//!    count and that many `u32` handles.
//!
//! Decoding is all-or-nothing: a full `DatabaseState` is built off to the
//! side and only swapped in by the caller once every section decoded.

use std::io::{Read, Write};
use std::mem::size_of;

use crate::database::{DatabaseState, IndexEntry, SearchDatabase};
use crate::docset::DocSet;
use crate::error::{Result, SearError};
use crate::interner::StringInterner;
use crate::types::{Document, DocumentHandle, DocumentKind, IndexKey, IndexKind, KeyValue};

pub(crate) const MAGIC: [u8; 4] = *b"SEAR";
pub(crate) const FORMAT_VERSION: u8 = 1;

/// Cap on preallocation from counts read out of the file; a corrupt count
/// must not allocate ahead of the reads that would reject it.
const MAX_PREALLOC: usize = 4096;

fn layout_guard() -> [u8; 4] {
    [
        size_of::<IndexEntry>() as u8,
        size_of::<IndexKey>() as u8,
        size_of::<Document>() as u8,
        size_of::<SearchDatabase>() as u8,
    ]
}

/// Encode the full database state.
pub(crate) fn write_database<W: Write>(state: &DatabaseState, writer: &mut W) -> Result<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[FORMAT_VERSION])?;
    writer.write_all(&layout_guard())?;

    writer.write_all(&(state.documents.len() as u32).to_le_bytes())?;
    for doc in &state.documents {
        writer.write_all(&[doc.kind as u8])?;
        write_string(writer, &doc.name)?;
        writer.write_all(&doc.timestamp.to_le_bytes())?;
    }

    let blob_bytes: u64 = state
        .strings
        .iter()
        .map(|s| 4 + s.len() as u64)
        .sum();
    let average = if state.strings.is_empty() {
        0
    } else {
        state.strings.iter().map(|s| s.len() as u64).sum::<u64>() / state.strings.len() as u64
    };
    writer.write_all(&(state.strings.len() as i32).to_le_bytes())?;
    writer.write_all(&average.to_le_bytes())?;
    writer.write_all(&blob_bytes.to_le_bytes())?;
    for s in state.strings.iter() {
        write_string(writer, s)?;
    }

    writer.write_all(&(state.entries.len() as u32).to_le_bytes())?;
    for entry in &state.entries {
        writer.write_all(&(entry.key.kind as u32).to_le_bytes())?;
        writer.write_all(&entry.key.crc.to_le_bytes())?;
        writer.write_all(&entry.key.value.to_bits().to_le_bytes())?;
        writer.write_all(&entry.key.score.to_le_bytes())?;
        let docs = entry.docs.as_slice();
        writer.write_all(&(docs.len() as u32).to_le_bytes())?;
        for doc in docs {
            writer.write_all(&doc.as_u32().to_le_bytes())?;
        }
    }
    Ok(())
}

/// Decode a full database state. Any failure leaves nothing half-applied;
/// the caller swaps the returned state in atomically.
pub(crate) fn read_database<R: Read>(reader: &mut R) -> Result<DatabaseState> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SearError::corrupted("bad magic bytes"));
    }
    let version = read_u8(reader)?;
    if version != FORMAT_VERSION {
        return Err(SearError::VersionMismatch {
            found: version,
            expected: FORMAT_VERSION,
        });
    }
    let mut guard = [0u8; 4];
    reader.read_exact(&mut guard)?;
    if guard != layout_guard() {
        return Err(SearError::LayoutMismatch {
            reason: format!("structure sizes {guard:?} do not match this build"),
        });
    }

    let document_total = read_u32(reader)? as usize;
    if document_total == 0 {
        return Err(SearError::corrupted("missing root document"));
    }
    let mut documents = Vec::with_capacity(document_total.min(MAX_PREALLOC));
    for _ in 0..document_total {
        let kind = read_u8(reader)?;
        let kind = DocumentKind::from_u8(kind)
            .ok_or_else(|| SearError::corrupted(format!("unknown document kind {kind}")))?;
        let name = read_string(reader)?;
        let timestamp = read_u64(reader)?;
        documents.push(Document {
            kind,
            name,
            timestamp,
        });
    }

    let string_total = read_i32(reader)?;
    if string_total < 0 {
        return Err(SearError::corrupted("negative string count"));
    }
    let _average = read_u64(reader)?;
    let blob_bytes = read_u64(reader)?;
    let mut strings = Vec::with_capacity((string_total as usize).min(MAX_PREALLOC));
    let mut consumed = 0u64;
    for _ in 0..string_total {
        let s = read_string(reader)?;
        consumed += 4 + s.len() as u64;
        strings.push(s);
    }
    if consumed != blob_bytes {
        return Err(SearError::corrupted("string table size mismatch"));
    }

    let entry_total = read_u32(reader)? as usize;
    let mut entries = Vec::with_capacity(entry_total.min(MAX_PREALLOC));
    for _ in 0..entry_total {
        let kind = read_u32(reader)?;
        let kind = IndexKind::from_u32(kind)
            .ok_or_else(|| SearError::corrupted(format!("unknown index kind {kind}")))?;
        let crc = read_u64(reader)?;
        let bits = read_u64(reader)?;
        let score = read_i32(reader)?;
        let value = match kind {
            IndexKind::Number => KeyValue::Number(f64::from_bits(bits)),
            _ => KeyValue::Hash(bits),
        };
        let doc_count = read_u32(reader)? as usize;
        let mut docs = Vec::with_capacity(doc_count.min(MAX_PREALLOC));
        for _ in 0..doc_count {
            let handle = read_u32(reader)?;
            if handle as usize >= documents.len() {
                return Err(SearError::corrupted(format!(
                    "document handle {handle} out of range"
                )));
            }
            docs.push(DocumentHandle::new(handle));
        }
        entries.push(IndexEntry {
            key: IndexKey::new(kind, crc, value, score),
            docs: DocSet::from_handles(docs),
        });
    }

    let document_count = documents
        .iter()
        .filter(|doc| doc.kind == DocumentKind::Default)
        .count() as u32;

    Ok(DatabaseState {
        documents,
        entries,
        strings: StringInterner::from_strings(strings),
        document_count,
        dirty: false,
    })
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_all(&(s.len() as u32).to_le_bytes())?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_u32(reader)? as usize;
    let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC));
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(SearError::corrupted("truncated string"));
    }
    String::from_utf8(bytes).map_err(|_| SearError::corrupted("invalid UTF-8 string"))
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

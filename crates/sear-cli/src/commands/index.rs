//! Index command - ingest JSON-lines documents.
//!
//! Each input line is a JSON object. The `name` field names the document;
//! `text` is indexed as free text; every other field becomes a property
//! (numbers as numeric properties, strings and arrays of strings as string
//! properties). A `timestamp` field (unix seconds or RFC 3339) refreshes
//! the document timestamp. Re-ingesting a name replaces the previous
//! document's index entries.

use crate::app::App;
use sear_core::{Config, DocumentHandle, SearchDatabase};
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Run the index command.
pub fn run(config: Config, file: &Path) -> anyhow::Result<()> {
    let app = App::open(config)?;

    let reader: Box<dyn BufRead> = if file.as_os_str() == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        Box::new(BufReader::new(std::fs::File::open(file)?))
    };

    let mut ingested = 0usize;
    let mut skipped = 0usize;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(error) => {
                warn!(line = line_number + 1, %error, "skipping malformed line");
                skipped += 1;
                continue;
            }
        };
        match ingest_object(&app.db, &value) {
            Some(_) => ingested += 1,
            None => {
                warn!(line = line_number + 1, "skipping object without a name");
                skipped += 1;
            }
        }
    }

    app.save()?;
    info!(ingested, skipped, "ingest finished");
    println!(
        "Indexed {} documents ({} skipped), {} index entries",
        ingested,
        skipped,
        app.db.index_count()
    );
    Ok(())
}

fn ingest_object(db: &SearchDatabase, value: &serde_json::Value) -> Option<DocumentHandle> {
    let object = value.as_object()?;
    let name = object.get("name")?.as_str()?;

    // Replace rather than accumulate entries for a re-ingested document.
    if let Some(existing) = db.find_document(name) {
        db.remove_document(existing);
    }
    let doc = db.add_document(name);

    for (key, field) in object {
        match key.as_str() {
            "name" => {}
            "timestamp" => {
                if let Some(timestamp) = parse_timestamp(field) {
                    db.update_document_timestamp(doc, timestamp);
                }
            }
            "text" => {
                if let Some(text) = field.as_str() {
                    db.index_text(doc, text);
                }
            }
            _ => index_property_value(db, doc, key, field),
        }
    }
    Some(doc)
}

fn index_property_value(
    db: &SearchDatabase,
    doc: DocumentHandle,
    key: &str,
    field: &serde_json::Value,
) {
    match field {
        serde_json::Value::Number(number) => {
            if let Some(number) = number.as_f64() {
                db.index_property_number(doc, key, number);
            }
        }
        serde_json::Value::String(text) => {
            db.index_property(doc, key, text);
        }
        serde_json::Value::Array(items) => {
            for item in items {
                index_property_value(db, doc, key, item);
            }
        }
        _ => {}
    }
}

fn parse_timestamp(field: &serde_json::Value) -> Option<u64> {
    if let Some(seconds) = field.as_u64() {
        return Some(seconds);
    }
    let text = field.as_str()?;
    let parsed = chrono::DateTime::parse_from_rfc3339(text).ok()?;
    Some(parsed.timestamp().max(0) as u64)
}

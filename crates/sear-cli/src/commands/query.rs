//! Query command - evaluate a query and print matching documents.

use crate::app::App;
use crate::OutputFormat;
use sear_core::{Config, DocumentHandle};
use std::time::Instant;

/// Run the query command.
pub fn run(config: Config, query: &str, limit: usize, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::open(config)?;

    if app.db.document_count() == 0 {
        eprintln!("Database is empty. Run 'sear index' first.");
        return Ok(());
    }

    let start = Instant::now();
    let mut results = app.db.search(query)?;
    let elapsed = start.elapsed();

    // Better (lower) scores first, then stable by document id.
    results.sort_by(|a, b| a.score.cmp(&b.score).then(a.id.cmp(&b.id)));
    results.truncate(limit);

    match output {
        OutputFormat::Text => {
            for result in &results {
                let handle = DocumentHandle::new(result.id as u32);
                let name = app.db.document_name(handle).unwrap_or_default();
                println!("{}\t{}", name, result.score);
            }

            eprintln!();
            eprintln!(
                "Found {} results in {:.3}ms",
                results.len(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            let json_results: Vec<serde_json::Value> = results
                .iter()
                .map(|r| {
                    let handle = DocumentHandle::new(r.id as u32);
                    serde_json::json!({
                        "id": r.id,
                        "name": app.db.document_name(handle),
                        "score": r.score,
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&json_results)?);
        }
    }

    Ok(())
}

//! Status command - show database statistics.

use crate::app::App;
use sear_core::Config;

/// Run the status command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::open(config)?;

    let stats = app.db.stats();

    println!("Sear Database Status");
    println!("====================");
    println!();

    if stats.documents == 0 {
        println!("Database is empty. Run 'sear index' to ingest documents.");
        return Ok(());
    }

    println!("Summary:");
    println!("  Documents:         {}", stats.documents);
    println!("  Index entries:     {}", stats.entries);
    println!("  Interned words:    {}", stats.words);
    println!("  Avg docs/entry:    {:.2}", stats.average_docs_per_entry);
    println!(
        "  Unsaved changes:   {}",
        if app.db.is_dirty() { "yes" } else { "no" }
    );

    let keywords = app.db.property_keywords();
    if !keywords.is_empty() {
        println!();
        println!("Properties:");
        for keyword in &keywords {
            println!("  {}", keyword);
        }
    }

    println!();
    println!("Database file: {}", app.path.display());

    Ok(())
}

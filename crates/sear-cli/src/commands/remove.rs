//! Remove command - remove a document by name.

use crate::app::App;
use anyhow::bail;
use sear_core::Config;

/// Run the remove command.
pub fn run(config: Config, name: &str) -> anyhow::Result<()> {
    let app = App::open(config)?;

    let Some(handle) = app.db.find_document(name) else {
        bail!("no document named `{name}`");
    };
    app.db.remove_document(handle);
    app.save()?;

    println!(
        "Removed `{}`, {} documents remain",
        name,
        app.db.document_count()
    );
    Ok(())
}

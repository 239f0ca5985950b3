//! # Sear Core Library
//!
//! An embedded, in-process full-text and structured-property search engine:
//! a document inverted index paired with a boolean query language that
//! compiles query text into an AST and evaluates it against the index.
//!
//! ## Architecture
//!
//! - **Types** (`types`): documents, index keys, results, options
//! - **Interner** (`interner`): strings to stable symbols
//! - **Normalize** (`normalize`): word formatting shared by indexing and
//!   queries
//! - **Database** (`database`): the sorted index, document table and
//!   query-time lookups, behind a reader/writer lock
//! - **Parser** (`parser`): query text to token list to AST
//! - **Eval** (`eval`): AST walk with set algebra over sorted result lists
//! - **Persistence** (`persistence`): versioned binary save/load
//! - **Config** (`config`): TOML configuration
//!
//! ## Example
//!
//! ```rust
//! use sear_core::SearchDatabase;
//!
//! let db = SearchDatabase::new();
//! let doc = db.add_document("AAPL");
//! db.index_text(doc, "Apple markets cap");
//! db.index_property_number(doc, "price", 187.5);
//!
//! let results = db.search("apple and price>100").unwrap();
//! assert_eq!(results.len(), 1);
//! ```

pub mod config;
pub mod database;
pub mod docset;
pub mod error;
pub mod eval;
pub mod interner;
pub mod normalize;
pub mod parser;
mod persistence;
pub mod types;

// Re-export commonly used types
pub use config::{Config, IndexingConfig};
pub use database::{QueryHandle, SearchDatabase};
pub use error::{QueryError, QueryErrorKind, Result, SearError};
pub use eval::{EvalFlags, EvalOp, LeafKind};
pub use parser::{parse_query, tokenize, PropertyOp, QueryNode, QueryToken};
pub use types::{
    DatabaseOptions, DatabaseStats, Document, DocumentHandle, DocumentKind, SearchResult,
};

//! Partitioned inverted index over an article collection with boolean
//! AND/OR retrieval.

pub mod builder;
pub mod catalog;
pub mod codec;
pub mod collection;
pub mod error;
pub mod index;
pub mod job;
pub mod persist;
pub mod query;
pub mod router;
pub mod search;
pub mod tokenizer;

pub use catalog::IndexCatalog;
pub use error::{IndexError, Result};
pub use index::*;
pub use search::{Hit, SearchEngine, SearchResults};

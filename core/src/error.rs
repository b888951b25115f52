use crate::{ArticleOffset, PartitionId};
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the index can report, at build time or at query time.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("corrupt posting record: {0}")]
    CorruptPosting(String),

    #[error("article offsets out of order for term {term:?}: {offset} after {previous}")]
    OutOfOrderOffsets {
        term: String,
        offset: ArticleOffset,
        previous: ArticleOffset,
    },

    #[error("malformed build input: {0}")]
    MalformedInput(String),

    #[error("partition {0} is missing from the index")]
    MissingPartition(PartitionId),

    #[error("partition {0} appears more than once in the index")]
    DuplicatePartition(PartitionId),

    #[error("index declares {declared} partitions but {found} partition files were found")]
    PartitionCountMismatch { declared: u32, found: u32 },

    #[error("term {term:?} is stored in partition {found} but routes to partition {expected}")]
    MisroutedTerm {
        term: String,
        expected: PartitionId,
        found: PartitionId,
    },

    #[error("index at {0:?} has no _SUCCESS marker; its build did not finish")]
    IncompleteIndex(PathBuf),

    #[error("partition count must be at least 1, got {0}")]
    InvalidPartitionCount(u32),

    #[error("corrupt partition file {path:?}: {reason}")]
    CorruptPartition { path: PathBuf, reason: String },

    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("cannot read collection record at offset {offset}: {reason}")]
    ReadError { offset: ArticleOffset, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("manifest error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    /// Errors caused by the caller's query text rather than by the index.
    pub fn is_query_error(&self) -> bool {
        matches!(self, IndexError::MalformedQuery(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_partition() {
        let err = IndexError::MissingPartition(3);
        assert_eq!(err.to_string(), "partition 3 is missing from the index");
    }

    #[test]
    fn only_malformed_queries_are_query_errors() {
        assert!(IndexError::MalformedQuery("x".into()).is_query_error());
        assert!(!IndexError::DuplicatePartition(0).is_query_error());
    }
}

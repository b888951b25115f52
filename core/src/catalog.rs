//! The loaded, read-only set of partitions a query process serves from.

use crate::codec::{decode_posting_list, decode_sentinel};
use crate::persist::{is_complete, list_partition_files, load_meta, IndexPaths, PartitionFile};
use crate::router::PartitionRouter;
use crate::{IndexError, PartitionId, PostingList, Result};
use std::path::{Path, PathBuf};

pub struct IndexCatalog {
    partitions: Vec<PartitionFile>,
    router: PartitionRouter,
    document_count: u64,
}

impl IndexCatalog {
    /// Load every partition file found in an index directory. The directory
    /// must carry the `_SUCCESS` marker and a manifest that agrees with the
    /// partitions found.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let paths = IndexPaths::new(root);
        let files = list_partition_files(&paths.root)?;
        if !files.is_empty() && !is_complete(&paths) {
            return Err(IndexError::IncompleteIndex(paths.root));
        }
        let catalog = Self::load(files)?;
        let meta = load_meta(&paths)?;
        if meta.num_partitions != catalog.num_partitions() {
            return Err(IndexError::PartitionCountMismatch {
                declared: meta.num_partitions,
                found: catalog.num_partitions(),
            });
        }
        tracing::debug!(created_at = %meta.created_at, version = meta.version, "index manifest");
        Ok(catalog)
    }

    /// Load an explicit set of `(partition id, path)` pairs. The ids must be
    /// exactly `0..n` and every file must have been written by an `n`-way build.
    pub fn load(mut files: Vec<(PartitionId, PathBuf)>) -> Result<Self> {
        files.sort_by_key(|(id, _)| *id);
        for (expected, (id, _)) in files.iter().enumerate() {
            let expected = expected as PartitionId;
            if *id < expected {
                return Err(IndexError::DuplicatePartition(*id));
            }
            if *id > expected {
                return Err(IndexError::MissingPartition(expected));
            }
        }
        let found = files.len() as u32;
        let router = PartitionRouter::new(found).map_err(|_| IndexError::MissingPartition(0))?;

        let mut partitions = Vec::with_capacity(files.len());
        let mut document_count = 0u64;
        for (id, path) in files {
            let part = PartitionFile::open(&path)?;
            if part.partition() != id {
                return Err(IndexError::CorruptPartition {
                    path,
                    reason: format!("file is named for partition {id} but holds partition {}", part.partition()),
                });
            }
            let declared = part.num_partitions();
            if declared > found {
                return Err(IndexError::MissingPartition(found));
            }
            if declared < found {
                return Err(IndexError::PartitionCountMismatch { declared, found });
            }
            if let Some(term) = part.terms().find(|t| router.route(t) != id) {
                return Err(IndexError::MisroutedTerm {
                    term: term.to_string(),
                    expected: router.route(term),
                    found: id,
                });
            }
            document_count += decode_sentinel(part.metadata_record())?;
            partitions.push(part);
        }

        tracing::info!(partitions = found, document_count, "index catalog loaded");
        Ok(Self { partitions, router, document_count })
    }

    /// Postings for `term`; empty when the term was never indexed.
    pub fn lookup(&self, term: &str) -> Result<PostingList> {
        let partition = &self.partitions[self.router.route(term) as usize];
        match partition.read_record(term)? {
            Some(bytes) => decode_posting_list(&bytes),
            None => Ok(PostingList::new()),
        }
    }

    /// Sum of the per-partition distinct-article counts. An article indexed
    /// under terms in several partitions is counted once per partition.
    pub fn document_count(&self) -> u64 { self.document_count }

    pub fn num_partitions(&self) -> u32 { self.router.num_partitions() }

    pub fn num_terms(&self) -> usize { self.partitions.iter().map(PartitionFile::num_terms).sum() }
}

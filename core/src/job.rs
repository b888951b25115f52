//! In-process map / shuffle / reduce over a collection file.
//!
//! The map phase emits `(term, offset) -> (term frequency, article id)` for
//! every distinct term of every article. The shuffle routes each key with the
//! partition router and sorts it into `(term, offset)` order. Partitions are
//! then reduced independently in parallel and written out atomically.

use crate::builder::{reduce_partition, PartitionData, PostingKey, PostingValue};
use crate::collection::{parse_record, records};
use crate::persist::{mark_success, save_meta, write_partition, IndexPaths, MetaFile};
use crate::router::PartitionRouter;
use crate::tokenizer::{term_counts, tokenize};
use crate::{ArticleOffset, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const INDEX_VERSION: u32 = 1;

pub type MapOutput = Vec<(PostingKey, PostingValue)>;

/// One partition's shuffled input: groups ordered by key.
pub type PartitionInput = Vec<(PostingKey, Vec<PostingValue>)>;

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub articles: u64,
    pub num_partitions: u32,
    pub num_terms: u64,
    pub document_count: u64,
}

/// Emit one key/value pair per distinct term of a record.
pub fn map_article(offset: ArticleOffset, line: &str) -> Result<MapOutput> {
    let (article_id, text) = parse_record(offset, line)?;
    let tokens = tokenize(text);
    let total = tokens.len() as f32;
    Ok(term_counts(&tokens)
        .into_iter()
        .map(|(term, count)| {
            (
                PostingKey { term: term.to_string(), article_offset: offset },
                PostingValue { term_frequency: count as f32 / total, article_id },
            )
        })
        .collect())
}

/// Route, sort and group map output into one input per partition.
pub fn shuffle(pairs: MapOutput, router: &PartitionRouter) -> Vec<PartitionInput> {
    let mut buckets: Vec<MapOutput> = vec![Vec::new(); router.num_partitions() as usize];
    for (key, value) in pairs {
        buckets[router.route(&key.term) as usize].push((key, value));
    }
    buckets
        .into_par_iter()
        .map(|mut bucket| {
            bucket.sort_by(|a, b| a.0.cmp(&b.0));
            let mut groups: PartitionInput = Vec::new();
            for (key, value) in bucket {
                if let Some((last, values)) = groups.last_mut() {
                    if *last == key {
                        values.push(value);
                        continue;
                    }
                }
                groups.push((key, vec![value]));
            }
            groups
        })
        .collect()
}

/// Reduce every partition, one rayon task per partition.
pub fn reduce_all(inputs: Vec<PartitionInput>) -> Result<Vec<PartitionData>> {
    inputs
        .into_par_iter()
        .enumerate()
        .map(|(partition, groups)| reduce_partition(partition as u32, groups))
        .collect()
}

/// Build a partitioned index for `collection` into `output`, replacing any
/// previous index there. Nothing is left at `output` unless the whole build
/// succeeds.
pub fn build_index(collection: &Path, output: &Path, num_partitions: u32) -> Result<BuildSummary> {
    let router = PartitionRouter::new(num_partitions)?;

    let mut pairs = MapOutput::new();
    let mut articles = 0u64;
    for record in records(collection)? {
        let (offset, line) = record?;
        pairs.extend(map_article(offset, &line)?);
        articles += 1;
    }
    tracing::info!(articles, pairs = pairs.len(), "map phase complete");

    let partitions = reduce_all(shuffle(pairs, &router))?;

    let staging = staging_dir(output);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    let published = write_staged(&staging, &partitions, articles, num_partitions)
        .and_then(|summary| publish(&staging, output).map(|()| summary));
    let summary = match published {
        Ok(summary) => summary,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    tracing::info!(
        output = %output.display(),
        partitions = summary.num_partitions,
        terms = summary.num_terms,
        documents = summary.document_count,
        "index build complete"
    );
    Ok(summary)
}

fn staging_dir(output: &Path) -> PathBuf {
    let name = output.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "index".into());
    output.with_file_name(format!(".{name}.staging-{}", std::process::id()))
}

/// Replace whatever sits at `output` with the finished staging directory.
fn publish(staging: &Path, output: &Path) -> Result<()> {
    if output.is_dir() {
        fs::remove_dir_all(output)?;
    }
    fs::rename(staging, output)?;
    Ok(())
}

fn write_staged(dir: &Path, partitions: &[PartitionData], articles: u64, num_partitions: u32) -> Result<BuildSummary> {
    let paths = IndexPaths::new(dir);
    fs::create_dir_all(&paths.root)?;
    partitions
        .par_iter()
        .try_for_each(|data| write_partition(&paths.partition(data.partition), data, num_partitions))?;

    let summary = BuildSummary {
        articles,
        num_partitions,
        num_terms: partitions.iter().map(|p| p.terms.len() as u64).sum(),
        document_count: partitions.iter().map(|p| p.document_count).sum(),
    };
    let meta = MetaFile {
        num_partitions,
        document_count: summary.document_count,
        num_terms: summary.num_terms,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into()),
        version: INDEX_VERSION,
    };
    save_meta(&paths, &meta)?;
    mark_success(&paths)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_relative_term_frequency() {
        let out = map_article(50, "7\tdog cat dog cat").unwrap();
        assert_eq!(out.len(), 2);
        for (key, value) in &out {
            assert_eq!(key.article_offset, 50);
            assert_eq!(value.article_id, 7);
            assert_eq!(value.term_frequency, 0.5);
        }
    }

    #[test]
    fn article_without_terms_maps_to_nothing() {
        assert!(map_article(0, "3\tthe and of").unwrap().is_empty());
    }

    #[test]
    fn shuffle_groups_by_key_within_partition() {
        let router = PartitionRouter::new(3).unwrap();
        let mut pairs = MapOutput::new();
        for (offset, id, line) in [(120u64, 3u32, "cat"), (0, 1, "cat dog"), (50, 2, "dog")] {
            pairs.extend(map_article(offset, &format!("{id}\t{line}")).unwrap());
        }
        let inputs = shuffle(pairs, &router);
        assert_eq!(inputs.len(), 3);
        for (partition, groups) in inputs.iter().enumerate() {
            for (key, values) in groups {
                assert_eq!(router.route(&key.term) as usize, partition);
                assert_eq!(values.len(), 1);
            }
            assert!(groups.windows(2).all(|w| w[0].0 < w[1].0));
        }
        let cat: Vec<_> = inputs
            .iter()
            .flatten()
            .filter(|(k, _)| k.term == "cat")
            .map(|(k, _)| k.article_offset)
            .collect();
        assert_eq!(cat, vec![0, 120]);
    }
}

//! Per-partition reduce step of the index build.
//!
//! Input groups arrive ordered by term, then by ascending article offset,
//! each carrying exactly one `(term_frequency, article_id)` value. The reducer
//! turns them into one encoded posting record per term plus the partition's
//! distinct-article count.

use crate::codec::{encode_sentinel, PostingListEncoder};
use crate::{ArticleId, ArticleOffset, IndexError, PartitionId, Result};
use std::collections::HashSet;

/// Grouping key emitted by the map phase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostingKey {
    pub term: String,
    pub article_offset: ArticleOffset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostingValue {
    pub term_frequency: f32,
    pub article_id: ArticleId,
}

/// The reducer's output: sorted term records and the metadata record.
#[derive(Debug, Clone, Default)]
pub struct PartitionData {
    pub partition: PartitionId,
    pub terms: Vec<(String, Vec<u8>)>,
    pub document_count: u64,
}

impl PartitionData {
    pub fn metadata_record(&self) -> Vec<u8> { encode_sentinel(self.document_count) }

    pub fn get(&self, term: &str) -> Option<&[u8]> {
        self.terms
            .binary_search_by(|(t, _)| t.as_str().cmp(term))
            .ok()
            .map(|i| self.terms[i].1.as_slice())
    }
}

/// Accumulator owned by one partition's reduce step for its whole lifetime.
#[derive(Debug)]
pub struct PartitionReducer {
    partition: PartitionId,
    current_term: Option<String>,
    encoder: PostingListEncoder,
    articles: HashSet<ArticleId>,
    terms: Vec<(String, Vec<u8>)>,
}

impl PartitionReducer {
    pub fn new(partition: PartitionId) -> Self {
        Self {
            partition,
            current_term: None,
            encoder: PostingListEncoder::new(),
            articles: HashSet::new(),
            terms: Vec::new(),
        }
    }

    pub fn reduce<I>(&mut self, key: PostingKey, values: I) -> Result<()>
    where
        I: IntoIterator<Item = PostingValue>,
    {
        let mut values = values.into_iter();
        let value = values.next().ok_or_else(|| {
            IndexError::MalformedInput(format!(
                "no posting for term {:?} at offset {}",
                key.term, key.article_offset
            ))
        })?;
        if values.next().is_some() {
            return Err(IndexError::MalformedInput(format!(
                "more than one posting for term {:?} at offset {}",
                key.term, key.article_offset
            )));
        }

        let same_term = match self.current_term.as_deref() {
            Some(current) if current == key.term => true,
            Some(current) if current > key.term.as_str() => {
                return Err(IndexError::MalformedInput(format!(
                    "term {:?} arrived after {:?}",
                    key.term, current
                )));
            }
            _ => false,
        };
        if !same_term {
            self.flush();
            self.current_term = Some(key.term.clone());
        }

        self.encoder
            .push(key.article_offset, value.term_frequency, value.article_id)
            .map_err(|previous| IndexError::OutOfOrderOffsets {
                term: key.term,
                offset: key.article_offset,
                previous,
            })?;
        self.articles.insert(value.article_id);
        Ok(())
    }

    fn flush(&mut self) {
        if let Some(term) = self.current_term.take() {
            let record = self.encoder.take();
            self.terms.push((term, record));
        }
    }

    pub fn finish(mut self) -> PartitionData {
        self.flush();
        let data = PartitionData {
            partition: self.partition,
            terms: self.terms,
            document_count: self.articles.len() as u64,
        };
        tracing::debug!(
            partition = data.partition,
            terms = data.terms.len(),
            documents = data.document_count,
            "partition reduced"
        );
        data
    }
}

/// Run one partition's reducer over an already grouped, ordered input.
pub fn reduce_partition<G, V>(partition: PartitionId, groups: G) -> Result<PartitionData>
where
    G: IntoIterator<Item = (PostingKey, V)>,
    V: IntoIterator<Item = PostingValue>,
{
    let mut reducer = PartitionReducer::new(partition);
    for (key, values) in groups {
        reducer.reduce(key, values)?;
    }
    Ok(reducer.finish())
}

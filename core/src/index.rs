use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

pub type ArticleId = u32;
pub type ArticleOffset = u64;
pub type PartitionId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub article_id: ArticleId,
    /// Byte offset of the article's record in the collection file.
    pub article_offset: ArticleOffset,
    pub term_frequency: f32, // occurrences / article token count
}

/// All postings of one term, ascending by `article_offset`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostingList {
    pub postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self { Self::default() }

    pub fn document_frequency(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    pub fn push(&mut self, posting: Posting) { self.postings.push(posting); }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> { self.postings.iter() }
}

impl From<Vec<Posting>> for PostingList {
    fn from(postings: Vec<Posting>) -> Self { Self { postings } }
}

impl IntoIterator for PostingList {
    type Item = Posting;
    type IntoIter = std::vec::IntoIter<Posting>;
    fn into_iter(self) -> Self::IntoIter { self.postings.into_iter() }
}

/// A query-time hit. Identity and ordering come from `id` alone; offset and
/// frequency ride along so the result can be materialized.
#[derive(Debug, Clone, Copy)]
pub struct Article {
    pub offset: ArticleOffset,
    pub id: ArticleId,
    pub term_frequency: f32,
}

impl From<Posting> for Article {
    fn from(p: Posting) -> Self {
        Self { offset: p.article_offset, id: p.article_id, term_frequency: p.term_frequency }
    }
}

impl From<Article> for Posting {
    fn from(a: Article) -> Self {
        Self { article_id: a.id, article_offset: a.offset, term_frequency: a.term_frequency }
    }
}

impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for Article {}

impl Hash for Article {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state); }
}

impl PartialOrd for Article {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Article {
    fn cmp(&self, other: &Self) -> Ordering { self.id.cmp(&other.id) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn articles_compare_by_id_only() {
        let a = Article { offset: 0, id: 7, term_frequency: 0.5 };
        let b = Article { offset: 999, id: 7, term_frequency: 0.1 };
        let c = Article { offset: 0, id: 8, term_frequency: 0.5 };
        assert_eq!(a, b);
        assert!(a < c);
    }

    #[test]
    fn document_frequency_counts_postings() {
        let mut list = PostingList::new();
        list.push(Posting { article_id: 1, article_offset: 0, term_frequency: 1.0 });
        list.push(Posting { article_id: 2, article_offset: 10, term_frequency: 0.5 });
        assert_eq!(list.document_frequency(), 2);
    }
}

use crate::catalog::IndexCatalog;
use crate::collection::CollectionReader;
use crate::query::{evaluate_all, ArticleSet, PostingSource};
use crate::tokenizer::tokenize;
use crate::{ArticleId, ArticleOffset, Posting, PostingList, Result};
use std::path::Path;

/// Looks terms up after running them through the indexing analyzer. A query
/// token the analyzer splits into several words (`cat-dog`) matches only the
/// articles holding all of them.
struct AnalyzedCatalog<'a>(&'a IndexCatalog);

impl PostingSource for AnalyzedCatalog<'_> {
    fn postings(&self, term: &str) -> Result<PostingList> {
        let mut words = tokenize(term).into_iter();
        let Some(first) = words.next() else {
            return Ok(PostingList::new());
        };
        let mut postings = self.0.lookup(&first)?;
        for word in words {
            let matched = ArticleSet::from_postings(postings).intersect(&ArticleSet::from_postings(self.0.lookup(&word)?));
            postings = matched.into_vec().into_iter().map(Posting::from).collect::<Vec<_>>().into();
        }
        Ok(postings)
    }
}

#[derive(Debug)]
pub struct Hit {
    pub article_id: ArticleId,
    pub article_offset: ArticleOffset,
    pub term_frequency: f32,
    /// A failed read affects only this hit.
    pub excerpt: Result<String>,
}

#[derive(Debug)]
pub struct SearchResults {
    /// Matches before the result limit was applied.
    pub total_hits: usize,
    pub hits: Vec<Hit>,
}

pub struct SearchEngine {
    catalog: IndexCatalog,
    collection: CollectionReader,
}

impl SearchEngine {
    pub fn new(catalog: IndexCatalog, collection: CollectionReader) -> Self { Self { catalog, collection } }

    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(index: P, collection: Q) -> Result<Self> {
        Ok(Self::new(IndexCatalog::open(index)?, CollectionReader::open(collection)?))
    }

    pub fn catalog(&self) -> &IndexCatalog { &self.catalog }

    pub fn collection(&self) -> &CollectionReader { &self.collection }

    pub fn query(&self, text: &str, limit: usize) -> Result<SearchResults> {
        let mut matched = evaluate_all(text, &AnalyzedCatalog(&self.catalog))?;
        let total_hits = matched.len();
        matched.truncate(limit);

        let hits = matched
            .into_vec()
            .into_iter()
            .map(|article| {
                let excerpt = self.collection.fetch_excerpt(article.offset);
                if let Err(e) = &excerpt {
                    tracing::warn!(article_id = article.id, error = %e, "excerpt unavailable");
                }
                Hit {
                    article_id: article.id,
                    article_offset: article.offset,
                    term_frequency: article.term_frequency,
                    excerpt,
                }
            })
            .collect();
        Ok(SearchResults { total_hits, hits })
    }
}

//! Boolean query evaluation.
//!
//! Queries are whitespace-separated infix expressions, `term (AND|OR term)*`,
//! evaluated left to right with no precedence. A stack of article sets holds
//! the operands; an operator is applied as soon as its right-hand term has
//! been pushed.

use crate::catalog::IndexCatalog;
use crate::{Article, IndexError, PostingList, Result};
use std::cmp::Ordering;

/// Anything that can produce a term's posting list.
pub trait PostingSource {
    fn postings(&self, term: &str) -> Result<PostingList>;
}

impl PostingSource for IndexCatalog {
    fn postings(&self, term: &str) -> Result<PostingList> { self.lookup(term) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryToken<'a> {
    Operator(Operator),
    Term(&'a str),
}

pub fn tokenize_query(query: &str) -> impl Iterator<Item = QueryToken<'_>> {
    query.split_whitespace().map(|t| match t {
        "AND" => QueryToken::Operator(Operator::And),
        "OR" => QueryToken::Operator(Operator::Or),
        term => QueryToken::Term(term),
    })
}

/// Articles ordered ascending by id, at most one per id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleSet(Vec<Article>);

impl ArticleSet {
    pub fn new() -> Self { Self::default() }

    /// Build from postings in any order. When several postings share an
    /// article id, exactly one of them is kept.
    pub fn from_postings(list: PostingList) -> Self {
        let mut articles: Vec<Article> = list.into_iter().map(Article::from).collect();
        articles.sort();
        articles.dedup();
        Self(articles)
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, Article> { self.0.iter() }

    pub fn intersect(&self, other: &ArticleSet) -> ArticleSet {
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::with_capacity(self.len().min(other.len()));
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    out.push(self.0[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        ArticleSet(out)
    }

    pub fn union(&self, other: &ArticleSet) -> ArticleSet {
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::with_capacity(self.len() + other.len());
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                Ordering::Less => {
                    out.push(self.0[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    out.push(other.0[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    out.push(self.0[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&self.0[i..]);
        out.extend_from_slice(&other.0[j..]);
        ArticleSet(out)
    }

    pub fn truncate(&mut self, limit: usize) { self.0.truncate(limit); }

    pub fn into_vec(self) -> Vec<Article> { self.0 }
}

impl FromIterator<Article> for ArticleSet {
    fn from_iter<I: IntoIterator<Item = Article>>(iter: I) -> Self {
        let mut articles: Vec<Article> = iter.into_iter().collect();
        articles.sort();
        articles.dedup();
        Self(articles)
    }
}

/// Per-query evaluation state; dropped when the query finishes.
struct QueryStack<'s, S: ?Sized> {
    source: &'s S,
    sets: Vec<ArticleSet>,
}

impl<'s, S: PostingSource + ?Sized> QueryStack<'s, S> {
    fn push_term(&mut self, term: &str) -> Result<()> {
        let postings = self.source.postings(term)?;
        tracing::debug!(term, df = postings.document_frequency(), "term fetched");
        self.sets.push(ArticleSet::from_postings(postings));
        Ok(())
    }

    fn pop(&mut self) -> Result<ArticleSet> {
        self.sets
            .pop()
            .ok_or_else(|| IndexError::MalformedQuery("operator is missing an operand".into()))
    }

    fn apply(&mut self, op: Operator) -> Result<()> {
        let s1 = self.pop()?;
        let s2 = self.pop()?;
        self.sets.push(match op {
            Operator::And => s1.intersect(&s2),
            Operator::Or => s1.union(&s2),
        });
        Ok(())
    }
}

/// Evaluate `query` without a result cap.
pub fn evaluate_all<S: PostingSource + ?Sized>(query: &str, source: &S) -> Result<ArticleSet> {
    let mut stack = QueryStack { source, sets: Vec::new() };
    let mut pending: Option<Operator> = None;
    let mut expect_term = true;

    for token in tokenize_query(query) {
        match token {
            QueryToken::Term(term) => {
                if !expect_term {
                    return Err(IndexError::MalformedQuery(format!("expected AND or OR before {term:?}")));
                }
                stack.push_term(term)?;
                if let Some(op) = pending.take() {
                    stack.apply(op)?;
                }
                expect_term = false;
            }
            QueryToken::Operator(op) => {
                if expect_term {
                    return Err(IndexError::MalformedQuery(format!("{op:?} has no left-hand term")));
                }
                pending = Some(op);
                expect_term = true;
            }
        }
    }

    if let Some(op) = pending {
        return Err(IndexError::MalformedQuery(format!("{op:?} has no right-hand term")));
    }
    let result = stack.pop().map_err(|_| IndexError::MalformedQuery("empty query".into()))?;
    if !stack.sets.is_empty() {
        return Err(IndexError::MalformedQuery(format!("{} unconsumed operands", stack.sets.len())));
    }
    Ok(result)
}

/// Evaluate `query` and keep the first `limit` articles by ascending id.
pub fn evaluate<S: PostingSource + ?Sized>(query: &str, source: &S, limit: usize) -> Result<Vec<Article>> {
    let mut result = evaluate_all(query, source)?;
    result.truncate(limit);
    Ok(result.into_vec())
}

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{BTreeMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could","did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","it's","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn analyze_word(word: &str) -> Option<String> {
    if STOPWORDS.contains(word) {
        return None;
    }
    Some(STEMMER.stem(word).into_owned())
}

/// NFKC-normalize, lowercase, split into words, drop stopwords, stem.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    WORD.find_iter(&normalized).filter_map(|m| analyze_word(m.as_str())).collect()
}

/// Occurrence count of every term in `tokens`, ordered by term.
pub fn term_counts(tokens: &[String]) -> BTreeMap<&str, u32> {
    let mut counts = BTreeMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_and_drops_stopwords() {
        let t = tokenize("The runner was running!");
        assert_eq!(t, vec!["runner".to_string(), "run".to_string()]);
    }

    #[test]
    fn splits_joined_words_like_text() {
        assert_eq!(tokenize("Cats"), vec!["cat".to_string()]);
        assert_eq!(tokenize("cat-dog"), vec!["cat".to_string(), "dog".to_string()]);
        assert_eq!(tokenize("the-dog"), vec!["dog".to_string()]);
        assert!(tokenize("!!!").is_empty());
    }

    #[test]
    fn counts_terms() {
        let tokens = tokenize("dog cat dog");
        let counts = term_counts(&tokens);
        assert_eq!(counts.get("dog"), Some(&2));
        assert_eq!(counts.get("cat"), Some(&1));
    }
}

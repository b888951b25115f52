use wikidex::tokenizer::tokenize;

#[test]
fn it_normalizes_and_stems() {
    let words = tokenize("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Unicode normalization keeps the accented letter, lowercased
    assert!(words.iter().any(|w| w.starts_with("café")));
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"dog".to_string()));
}

#[test]
fn query_terms_meet_indexed_terms() {
    for word in tokenize("Dogs barked at cats") {
        assert_eq!(tokenize(&word.to_uppercase()), vec![word.clone()]);
    }
}

use docrag_core::Error;
use docrag_text::{tokenize, LexicalIndex};

fn build(texts: &[&str]) -> LexicalIndex {
    let docs: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();
    LexicalIndex::build(&docs).expect("build")
}

#[test]
fn unbuilt_index_refuses_queries() {
    let index = LexicalIndex::new();
    assert!(!index.is_built());
    let err = index.score(&tokenize("anything")).unwrap_err();
    assert!(matches!(err, Error::IndexNotBuilt(_)));
}

#[test]
fn one_score_per_document_in_insertion_order() {
    let index = build(&["the cat sat", "a dog barked", "cat and dog"]);
    let scores = index.score(&tokenize("cat")).expect("score");
    assert_eq!(scores.len(), 3);
    assert!(scores[0] > 0.0);
    assert_eq!(scores[1], 0.0);
    assert!(scores[2] > 0.0);
}

#[test]
fn rare_terms_outweigh_common_ones() {
    let index = build(&[
        "court ruling on appeal",
        "court ruling on bail",
        "court ruling on habeas corpus",
        "court ruling on costs",
    ]);
    let scores = index.score(&tokenize("court habeas")).expect("score");
    let best = scores.iter().copied().enumerate().max_by(|a, b| a.1.total_cmp(&b.1)).unwrap().0;
    assert_eq!(best, 2);
}

#[test]
fn shorter_documents_win_on_equal_term_frequency() {
    let index = build(&[
        "notice given by the tenant to the landlord in writing before the end of the month",
        "notice given",
    ]);
    let scores = index.score(&tokenize("notice")).expect("score");
    assert!(scores[1] > scores[0], "length normalization favours the short document: {scores:?}");
}

#[test]
fn query_is_case_insensitive() {
    let index = build(&["Termination of Contract"]);
    let upper = index.score(&["TERMINATION".to_string()]).expect("score");
    let lower = index.score(&tokenize("termination")).expect("score");
    assert_eq!(upper, lower);
    assert!(upper[0] > 0.0);
}

#[test]
fn identical_documents_tie_in_insertion_order() {
    let index = build(&["unrelated text", "lease notice", "lease notice", "lease notice"]);
    let top = index.top_k(&tokenize("lease"), 3).expect("top_k");
    let order: Vec<usize> = top.iter().map(|(i, _)| *i).collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[test]
fn empty_query_and_empty_corpus_score_nothing() {
    let index = build(&["some text"]);
    assert_eq!(index.score(&[]).expect("score"), vec![0.0]);

    let empty = LexicalIndex::build(&[]).expect("build");
    assert!(empty.is_built());
    assert!(empty.score(&tokenize("text")).expect("score").is_empty());
    assert!(empty.top_k(&tokenize("text"), 5).expect("top_k").is_empty());
}

#[test]
fn scoring_is_deterministic() {
    let index = build(&["alpha beta", "beta gamma", "gamma delta alpha"]);
    let q = tokenize("alpha gamma");
    assert_eq!(index.score(&q).unwrap(), index.score(&q).unwrap());
    let rebuilt = build(&["alpha beta", "beta gamma", "gamma delta alpha"]);
    assert_eq!(index.score(&q).unwrap(), rebuilt.score(&q).unwrap());
}

#[test]
fn top_k_omits_documents_without_matching_terms() {
    let index = build(&["the cat sat", "a dog barked", "cat and dog", "birds sing"]);
    let ranked = index.top_k(&tokenize("cat"), 4).expect("top_k");
    let positions: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
    assert_eq!(positions.len(), 2);
    assert!(positions.contains(&0) && positions.contains(&2));
}

use ragkb_core::config::SparseSettings;
use ragkb_text::SparseIndex;

fn corpus() -> Vec<&'static str> {
    vec![
        "home hemodialysis lets you dialyze at home",
        "contact us at 555-0100",
        "peritoneal dialysis uses the abdominal lining",
    ]
}

#[test]
fn keyword_hits_are_positive_and_sorted() {
    let index = SparseIndex::fit(&corpus(), SparseSettings::default());
    let hits = index.search("home dialysis options", 10);

    assert_eq!(hits.len(), 2, "contact chunk shares no terms");
    assert_eq!(hits[0].id, 0, "two mentions of 'home' outrank one 'dialysis'");
    assert_eq!(hits[1].id, 2);
    assert!(hits.iter().all(|h| h.score > 0.0));
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn out_of_vocabulary_query_scores_nothing() {
    let index = SparseIndex::fit(&corpus(), SparseSettings::default());
    assert!(index.transform("transplant waitlist").is_empty());
    assert!(index.search("transplant waitlist", 5).is_empty());
}

#[test]
fn bigrams_are_part_of_the_vocabulary() {
    let index = SparseIndex::fit(&corpus(), SparseSettings::default());
    assert!(index.contains_term("peritoneal dialysis"));
    // "at" is a stop word, so "dialyze home" is adjacent after filtering
    assert!(index.contains_term("dialyze home"));

    let unigrams = SparseIndex::fit(&corpus(), SparseSettings { use_bigrams: false, ..SparseSettings::default() });
    assert!(!unigrams.contains_term("peritoneal dialysis"));
    assert!(unigrams.vocabulary_size() < index.vocabulary_size());
}

#[test]
fn vocabulary_cap_keeps_most_frequent_terms() {
    let docs = ["dialysis dialysis dialysis kidney", "dialysis kidney diet", "diet"];
    let settings = SparseSettings { max_features: 2, use_bigrams: false, l2_normalize: true };
    let index = SparseIndex::fit(&docs, settings);
    assert_eq!(index.vocabulary_size(), 2);
    assert!(index.contains_term("dialysis"));
    // kidney and diet tie on frequency; lexicographic order keeps diet
    assert!(index.contains_term("diet"));
    assert!(!index.contains_term("kidney"));
}

#[test]
fn rows_are_unit_length_so_self_match_is_one() {
    let index = SparseIndex::fit(&corpus(), SparseSettings::default());
    let hits = index.search("peritoneal dialysis uses the abdominal lining", 1);
    assert_eq!(hits[0].id, 2);
    assert!((hits[0].score - 1.0).abs() < 1e-5, "score={}", hits[0].score);
}

#[test]
fn ties_keep_corpus_order_and_top_k_bounds() {
    let docs = ["kidney care", "kidney care", "kidney care"];
    let index = SparseIndex::fit(&docs, SparseSettings::default());
    let hits = index.search("kidney", 2);
    assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![0, 1]);
    assert!(index.search("kidney", 0).is_empty());
}

#[test]
fn stop_word_only_corpus_has_empty_vocabulary() {
    let index = SparseIndex::fit(&["the and of", "to be or not"], SparseSettings::default());
    assert_eq!(index.vocabulary_size(), 0);
    assert!(index.search("anything", 3).is_empty());
}

#[test]
fn repeated_multi_term_queries_score_bit_identically() {
    let docs = [
        "contact your kidney care team about potassium",
        "potassium rich foods include bananas and potatoes",
        "kidney disease changes how potassium is filtered",
        "contact the clinic before changing your diet",
        "low potassium diets limit potatoes and tomatoes",
        "your kidney team can contact a renal dietitian",
        "dialysis removes extra potassium from the blood",
        "contact kidney potassium",
        "phosphorus binders are taken with meals",
        "fluid limits depend on urine output",
    ];
    let index = SparseIndex::fit(&docs, SparseSettings::default());
    let query = "contact kidney potassium contact potassium";

    let bits = |hits: &[ragkb_core::SearchHit]| hits.iter().map(|h| (h.id, h.score.to_bits())).collect::<Vec<_>>();
    let first = bits(&index.search(query, 10));
    assert!(first.len() > 3);
    for _ in 0..200 {
        assert_eq!(bits(&index.search(query, 10)), first);
    }

    let row = index.transform(query);
    assert!(row.windows(2).all(|w| w[0].0 < w[1].0), "row is sorted by term id");
    for _ in 0..50 {
        let again = index.transform(query);
        assert_eq!(
            again.iter().map(|&(t, w)| (t, w.to_bits())).collect::<Vec<_>>(),
            row.iter().map(|&(t, w)| (t, w.to_bits())).collect::<Vec<_>>()
        );
    }
}

#[test]
fn refitting_the_same_corpus_gives_identical_scores() {
    let docs = ["contact kidney potassium", "kidney potassium diet", "contact the clinic about potassium"];
    let query = "potassium contact kidney diet";
    let baseline: Vec<u32> = SparseIndex::fit(&docs, SparseSettings::default())
        .search(query, 5)
        .iter()
        .map(|h| h.score.to_bits())
        .collect();
    for _ in 0..20 {
        let scores: Vec<u32> = SparseIndex::fit(&docs, SparseSettings::default())
            .search(query, 5)
            .iter()
            .map(|h| h.score.to_bits())
            .collect();
        assert_eq!(scores, baseline);
    }
}

use assert_matches::assert_matches;
use clap::ValueEnum;
use proptest::prelude::*;

use cms_workflow_factory::error::FactoryError;
use cms_workflow_factory::selection::{
    FileSelection, IndexEntry, IndexFile, IndexFormat, choose_dataset, select,
};

fn entry(uri: &str, size: u64) -> IndexEntry {
    IndexEntry {
        uri: uri.to_string(),
        size,
    }
}

#[test]
fn first_ignores_sizes() {
    let entries = vec![entry("a", 10), entry("b", 5), entry("c", 20)];
    let mut rng = rand::thread_rng();
    assert_eq!(
        select(&entries, FileSelection::First, &mut rng).unwrap(),
        "a"
    );
}

#[test]
fn smallest_and_largest_sort_by_size() {
    let entries = vec![entry("a", 10), entry("b", 5), entry("c", 20)];
    let mut rng = rand::thread_rng();
    assert_eq!(
        select(&entries, FileSelection::Smallest, &mut rng).unwrap(),
        "b"
    );
    assert_eq!(
        select(&entries, FileSelection::Largest, &mut rng).unwrap(),
        "c"
    );
}

#[test]
fn all_is_unsupported() {
    let entries = vec![entry("a", 1)];
    let mut rng = rand::thread_rng();
    let err = select(&entries, FileSelection::All, &mut rng).unwrap_err();
    assert_matches!(err, FactoryError::UnsupportedPolicy(FileSelection::All));
}

#[test]
fn text_index_ignores_policy() {
    let index = IndexFile::parse(
        IndexFormat::Txt,
        "root://eospublic.cern.ch//eos/opendata/cms/a.root\nroot://eospublic.cern.ch//eos/opendata/cms/b.root\n",
    )
    .unwrap();
    let mut rng = rand::thread_rng();
    for selection in ["first", "largest", "all", "bogus"] {
        let chosen = choose_dataset(&index, selection, &mut rng).unwrap();
        assert_eq!(
            chosen.as_deref(),
            Some("root://eospublic.cern.ch//eos/opendata/cms/a.root")
        );
    }
}

#[test]
fn text_index_does_not_skip_a_blank_first_line() {
    let index = IndexFile::parse(IndexFormat::Txt, "\nroot://eos/second.root\n").unwrap();
    let mut rng = rand::thread_rng();
    let err = choose_dataset(&index, "first", &mut rng).unwrap_err();
    assert_matches!(err, FactoryError::EmptyIndex(IndexFormat::Txt));
}

#[test]
fn empty_text_index_fails() {
    let index = IndexFile::parse(IndexFormat::Txt, "\n").unwrap();
    let mut rng = rand::thread_rng();
    let err = choose_dataset(&index, "first", &mut rng).unwrap_err();
    assert_matches!(err, FactoryError::EmptyIndex(IndexFormat::Txt));
}

#[test]
fn unknown_selection_yields_nothing() {
    let index =
        IndexFile::parse(IndexFormat::Json, r#"{"files":[{"uri":"a","size":1}]}"#).unwrap();
    let mut rng = rand::thread_rng();
    assert_eq!(choose_dataset(&index, "median", &mut rng).unwrap(), None);
}

#[test]
fn selection_names_round_trip() {
    for name in ["first", "smallest", "largest", "random", "all"] {
        let policy = FileSelection::from_str(name, false).unwrap();
        assert_eq!(policy.to_possible_value().unwrap().get_name(), name);
    }
}

fn arb_entries() -> impl Strategy<Value = Vec<IndexEntry>> {
    proptest::collection::vec(("[a-z]{1,8}", 0u64..1_000_000), 1..20).prop_map(|items| {
        items
            .into_iter()
            .map(|(uri, size)| IndexEntry { uri, size })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a single entry is both the smallest and the largest
    #[test]
    fn prop_single_entry_smallest_equals_largest(uri in "[a-z]{1,8}", size in 0u64..1000) {
        let entries = vec![entry(&uri, size)];
        let mut rng = rand::thread_rng();
        let smallest = select(&entries, FileSelection::Smallest, &mut rng).unwrap();
        let largest = select(&entries, FileSelection::Largest, &mut rng).unwrap();
        prop_assert_eq!(&smallest, &largest);
        prop_assert_eq!(smallest, uri);
    }

    /// Property: first always returns the head of the index
    #[test]
    fn prop_first_returns_head(entries in arb_entries()) {
        let mut rng = rand::thread_rng();
        let chosen = select(&entries, FileSelection::First, &mut rng).unwrap();
        prop_assert_eq!(chosen, entries[0].uri.clone());
    }

    /// Property: random never leaves the index
    #[test]
    fn prop_random_stays_in_bounds(entries in arb_entries()) {
        let mut rng = rand::thread_rng();
        let chosen = select(&entries, FileSelection::Random, &mut rng).unwrap();
        prop_assert!(entries.iter().any(|entry| entry.uri == chosen));
    }

    /// Property: smallest and largest bound every size in the index
    #[test]
    fn prop_smallest_largest_bound_sizes(entries in arb_entries()) {
        let mut rng = rand::thread_rng();
        let smallest = select(&entries, FileSelection::Smallest, &mut rng).unwrap();
        let largest = select(&entries, FileSelection::Largest, &mut rng).unwrap();
        let min = entries.iter().map(|entry| entry.size).min().unwrap();
        let max = entries.iter().map(|entry| entry.size).max().unwrap();
        prop_assert!(entries.iter().any(|entry| entry.uri == smallest && entry.size == min));
        prop_assert!(entries.iter().any(|entry| entry.uri == largest && entry.size == max));
    }
}

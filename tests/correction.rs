use cms_workflow_factory::correction::{
    global_tag_suffix, normalize_global_tag, normalize_release,
};
use proptest::prelude::*;

#[test]
fn strips_all_marker_and_derives_suffix() {
    let (tag, suffix) = normalize_global_tag("FT_53_V10::All");
    assert_eq!(tag, "FT_53_V10");
    assert_eq!(suffix, "_RUNA");
}

#[test]
fn pre_53_tags_have_no_suffix() {
    let (tag, suffix) = normalize_global_tag("FT_R_42_V10A::All");
    assert_eq!(tag, "FT_R_42_V10A");
    assert_eq!(suffix, "");
}

#[test]
fn suffix_matches_53_outside_version_context() {
    assert_eq!(global_tag_suffix("GR_R_42_V25_1530"), "_RUNA");
}

#[test]
fn release_with_leading_space() {
    assert_eq!(normalize_release(" CMSSW_5_3_32"), "5_3_32");
    assert_eq!(normalize_release("CMSSW_4_2_8"), "4_2_8");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: only the `::All` marker is removed
    #[test]
    fn prop_all_marker_removed_exactly(
        prefix in "[A-Z0-9_]{0,12}",
        suffix in "[A-Z0-9_]{0,12}",
    ) {
        let (tag, _) = normalize_global_tag(&format!("{prefix}::All{suffix}"));
        prop_assert_eq!(tag, format!("{prefix}{suffix}"));
    }

    /// Property: the suffix depends only on the presence of "53"
    #[test]
    fn prop_suffix_tracks_53(tag in "[A-Z0-9_:]{0,20}") {
        let (normalized, suffix) = normalize_global_tag(&tag);
        if normalized.contains("53") {
            prop_assert_eq!(suffix, "_RUNA");
        } else {
            prop_assert_eq!(suffix, "");
        }
    }

    /// Property: releases lose every space, then a six character prefix
    #[test]
    fn prop_release_has_no_spaces(release in "[ A-Za-z0-9_]{0,24}") {
        let normalized = normalize_release(&release);
        prop_assert!(!normalized.contains(' '));
        let compact: String = release.chars().filter(|ch| *ch != ' ').collect();
        let expected: String = compact.chars().skip(6).collect();
        prop_assert_eq!(normalized, expected);
    }
}

//! Normalization of metadata values that the portal publishes with
//! formatting artifacts.

const ALL_MARKER: &str = "::All";
const RUN_A_SERIES: &str = "53";
const RUN_A_SUFFIX: &str = "_RUNA";
const RELEASE_PREFIX_LEN: usize = 6;

/// Strips the `::All` marker and derives the conditions suffix.
pub fn normalize_global_tag(raw: &str) -> (String, String) {
    let tag = if raw.contains(ALL_MARKER) {
        raw.replace(ALL_MARKER, "")
    } else {
        raw.to_string()
    };
    let suffix = global_tag_suffix(&tag).to_string();
    (tag, suffix)
}

/// `"53"` anywhere in the tag marks the 5_3_X release series, which needs the
/// `_RUNA` conditions suffix. The match is purely textual.
pub fn global_tag_suffix(tag: &str) -> &'static str {
    if tag.contains(RUN_A_SERIES) {
        RUN_A_SUFFIX
    } else {
        ""
    }
}

/// `" CMSSW_5_3_32"` becomes `"5_3_32"`. Inputs shorter than the prefix
/// collapse to an empty string.
pub fn normalize_release(raw: &str) -> String {
    let release = if raw.contains(' ') {
        raw.replace(' ', "")
    } else {
        raw.to_string()
    };
    release.chars().skip(RELEASE_PREFIX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_without_marker_is_untouched() {
        let (tag, suffix) = normalize_global_tag("START42_V17B");
        assert_eq!(tag, "START42_V17B");
        assert_eq!(suffix, "");
    }

    #[test]
    fn short_release_collapses() {
        assert_eq!(normalize_release("CMS"), "");
        assert_eq!(normalize_release("CMSSW_"), "");
    }
}

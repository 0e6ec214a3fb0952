//! Heuristic classification of a version link's visible label into a
//! `VersionStatus` (§4.6). The selector page's own wording is the only
//! signal available; label keywords win over position when present.

use crate::store::VersionStatus;

pub fn classify_version_label(label: &str, index: usize) -> VersionStatus {
    let lower = label.to_lowercase();

    if lower.contains("current") || lower.contains("in effect") {
        return VersionStatus::Current;
    }
    if lower.contains("will read") || lower.contains("future") || lower.contains("operative on") {
        return VersionStatus::Future;
    }
    if lower.contains("repealed") || lower.contains("until") || lower.contains("former") {
        return VersionStatus::Historical;
    }

    // No recognizable keyword: the selector page conventionally lists the
    // currently-operative text first.
    if index == 0 { VersionStatus::Current } else { VersionStatus::Historical }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_wins_over_position() {
        assert_eq!(classify_version_label("Current law", 3), VersionStatus::Current);
        assert_eq!(classify_version_label("As it will read on January 1, 2030", 0), VersionStatus::Future);
        assert_eq!(classify_version_label("Former law, repealed", 0), VersionStatus::Historical);
    }

    #[test]
    fn falls_back_to_position_without_keywords() {
        assert_eq!(classify_version_label("Version A", 0), VersionStatus::Current);
        assert_eq!(classify_version_label("Version B", 1), VersionStatus::Historical);
    }
}

//! Property-based tests for the quantified invariants in §8.

use ca_code_pipeline::discovery::classify_heading;
use ca_code_pipeline::error::{FailureType, ScrapeError};
use ca_code_pipeline::store::{HierarchyTags, NodeType, Section, SectionUpdate, Version, VersionStatus};
use proptest::prelude::*;

fn blank_section() -> Section {
    let now = chrono::Utc::now();
    Section {
        code: "WIC".into(),
        section_id: "100".into(),
        url: "https://example.com/100".into(),
        content: None,
        raw_content: None,
        legislative_history: None,
        is_multi_version: false,
        version_number: None,
        is_current: None,
        versions: Vec::new(),
        hierarchy: HierarchyTags::default(),
        updated_at: now,
        created_at: now,
    }
}

fn apply_update(section: &mut Section, update: &SectionUpdate) {
    if let Some(url) = &update.url {
        section.url = url.clone();
    }
    if let Some(content) = &update.content {
        section.content = Some(content.clone());
    }
    if let Some(raw) = &update.raw_content {
        section.raw_content = Some(raw.clone());
    }
    if let Some(history) = &update.legislative_history {
        section.legislative_history = Some(history.clone());
    }
    if let Some(flag) = update.is_multi_version {
        section.is_multi_version = flag;
    }
    if let Some(v) = update.version_number {
        section.version_number = Some(v);
    }
    if let Some(c) = update.is_current {
        section.is_current = Some(c);
    }
    if let Some(versions) = &update.versions {
        section.versions = versions.clone();
    }
    if let Some(h) = &update.hierarchy {
        section.hierarchy = h.clone();
    }
}

proptest! {
    /// Invariant 1: `has_content ⇔ content ≠ null ∧ content_length > 0`.
    #[test]
    fn has_content_matches_non_empty_string(content in proptest::option::of("[a-zA-Z0-9 ]{0,40}")) {
        let mut section = blank_section();
        section.content = content.clone();
        let expected = content.as_deref().is_some_and(|c| !c.is_empty());
        prop_assert_eq!(section.has_content(), expected);
    }

    /// Invariant 2: `is_multi_version ⇔ versions ≠ ∅`.
    #[test]
    fn multi_version_invariant_tracks_versions_vec(is_multi_version in any::<bool>(), version_count in 0usize..4) {
        let mut section = blank_section();
        section.is_multi_version = is_multi_version;
        for i in 0..version_count {
            section.versions.push(Version {
                operative_date: None,
                content: None,
                legislative_history: None,
                status: VersionStatus::Current,
                source_url: format!("https://example.com/v{i}"),
            });
        }
        let holds = section.multi_version_invariant_holds();
        prop_assert_eq!(holds, is_multi_version == (version_count != 0));
    }

    /// Invariant 4: sparse merge never clobbers a previously-set field with
    /// a `None` in a later update.
    #[test]
    fn sparse_merge_never_clobbers_set_fields(
        first_content in "[a-zA-Z]{1,20}",
        first_history in "[a-zA-Z]{1,20}",
        second_has_content in any::<bool>(),
        second_has_history in any::<bool>(),
    ) {
        let mut section = blank_section();
        apply_update(&mut section, &SectionUpdate {
            content: Some(first_content.clone()),
            legislative_history: Some(first_history.clone()),
            ..Default::default()
        });

        let second = SectionUpdate {
            content: if second_has_content { Some("replacement".to_string()) } else { None },
            legislative_history: if second_has_history { Some("replacement-history".to_string()) } else { None },
            ..Default::default()
        };
        apply_update(&mut section, &second);

        if second_has_content {
            prop_assert_eq!(section.content.as_deref(), Some("replacement"));
        } else {
            prop_assert_eq!(section.content.as_deref(), Some(first_content.as_str()));
        }
        if second_has_history {
            prop_assert_eq!(section.legislative_history.as_deref(), Some("replacement-history"));
        } else {
            prop_assert_eq!(section.legislative_history.as_deref(), Some(first_history.as_str()));
        }
    }

    /// Invariant 10: every `ScrapeError` maps to exactly one `FailureType`
    /// (totality — the match in `from_scrape_error` cannot panic or fall
    /// through for any constructible variant).
    #[test]
    fn failure_classification_is_total(
        kind in 0u8..6,
        status in 400u16..600,
        timeout_secs in 1u64..120,
    ) {
        let err = match kind {
            0 => ScrapeError::Network { url: "u".into(), message: "m".into() },
            1 => ScrapeError::Timeout { url: "u".into(), timeout_secs },
            2 => ScrapeError::Api { url: "u".into(), status },
            3 => ScrapeError::RateLimited { url: "u".into() },
            4 => ScrapeError::Parse { url: "u".into(), message: "m".into() },
            _ => ScrapeError::Unsupported { url: "u".into(), message: "m".into() },
        };
        let failure_type = FailureType::from_scrape_error(&err);
        // round-trips through as_str without panicking, and is stable.
        prop_assert_eq!(FailureType::from_scrape_error(&err), failure_type);
    }
}

/// Invariant 7: node-type classification on the spec's own example headings.
#[test]
fn node_type_classification_spec_examples() {
    assert_eq!(classify_heading("CHAPTER 3. Disability of Party"), Some(NodeType::Chapter));
    assert_eq!(classify_heading("ARTICLE 4. Parties"), Some(NodeType::Article));
    assert_eq!(classify_heading("TITLE 2. OF PARTIES TO CRIME"), Some(NodeType::Title));
    assert_eq!(classify_heading("PART 1. OF COURTS OF JUSTICE"), Some(NodeType::Part));
}

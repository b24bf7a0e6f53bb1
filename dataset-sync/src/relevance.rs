//! Decides whether an object key belongs to the managed dataset set.
//!
//! Matching is a substring test of each specification `collection` against
//! the whole key, not a path-segment comparison, so a short or generic
//! collection name can match keys it was not meant for.

use dataset_sync_core::{ObjectKey, SpecificationEntry};

/// `true` for either builder key, or when any specification collection
/// occurs inside `key`.
pub fn is_managed(key: &ObjectKey, specifications: &[SpecificationEntry]) -> bool {
    if key.is_builder() {
        tracing::info!("matched builder key");
        return true;
    }

    // "" is a substring of every key.
    match specifications
        .iter()
        .find(|entry| !entry.collection.is_empty() && key.as_str().contains(&entry.collection))
    {
        Some(entry) => {
            tracing::info!(
                collection = %entry.collection,
                dataset = %entry.dataset,
                "found key in specifications"
            );
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset_sync_core::{DIGITAL_LAND_BUILDER_KEY, ENTITY_BUILDER_KEY};
    use rstest::rstest;

    fn specs() -> Vec<SpecificationEntry> {
        vec![
            SpecificationEntry::new("conservation-area", "conservation-area"),
            SpecificationEntry::new("central-activities-zone", "central-activities-zone"),
        ]
    }

    #[rstest]
    #[case(DIGITAL_LAND_BUILDER_KEY)]
    #[case(ENTITY_BUILDER_KEY)]
    fn builder_keys_are_managed_without_specifications(#[case] key: &str) {
        assert!(is_managed(&ObjectKey::from(key), &[]));
    }

    #[rstest]
    #[case("conservation-area-collection/dataset/conservation-area.sqlite3", true)]
    #[case("central-activities-zone.sqlite3", true)]
    #[case("tree-collection/dataset/tree.sqlite3", false)]
    #[case("entity-builder/dataset/other.sqlite3", false)]
    fn collection_substring_decides(#[case] key: &str, #[case] expected: bool) {
        assert_eq!(is_managed(&ObjectKey::from(key), &specs()), expected);
    }

    #[test]
    fn empty_specifications_only_admit_builder_keys() {
        assert!(!is_managed(
            &ObjectKey::from("conservation-area-collection/dataset/conservation-area.sqlite3"),
            &[]
        ));
    }

    #[test]
    fn substring_match_is_loose() {
        // "tree" also matches "street-collection/..."; kept as-is.
        let specs = vec![SpecificationEntry::new("tree", "tree")];
        assert!(is_managed(
            &ObjectKey::from("street-collection/dataset/street.sqlite3"),
            &specs
        ));
    }

    #[test]
    fn empty_collection_never_matches() {
        let specs = vec![SpecificationEntry::new("", "orphan")];
        assert!(!is_managed(&ObjectKey::from("anything.sqlite3"), &specs));
    }
}

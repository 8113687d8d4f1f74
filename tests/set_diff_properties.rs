use std::collections::HashSet;
use std::path::PathBuf;

use bundle_registry::SetDiff;
use proptest::prelude::*;

fn paths() -> impl Strategy<Value = HashSet<PathBuf>> {
    proptest::collection::hash_set("[a-e]{1,2}".prop_map(|s| PathBuf::from("/b").join(s)), 0..12)
}

proptest! {
    #[test]
    fn partitions_union_of_inputs(installed in paths(), found in paths()) {
        let diff = SetDiff::compute(&installed, &found);

        prop_assert_eq!(&diff.new, &found.difference(&installed).cloned().collect::<HashSet<_>>());
        prop_assert_eq!(&diff.dropped, &installed.difference(&found).cloned().collect::<HashSet<_>>());
        prop_assert_eq!(&diff.existing, &installed.intersection(&found).cloned().collect::<HashSet<_>>());

        prop_assert!(diff.new.is_disjoint(&diff.dropped));
        prop_assert!(diff.new.is_disjoint(&diff.existing));
        prop_assert!(diff.dropped.is_disjoint(&diff.existing));

        let union: HashSet<PathBuf> = installed.union(&found).cloned().collect();
        prop_assert_eq!(diff.len(), union.len());
    }

    #[test]
    fn identical_sets_only_have_existing(set in paths()) {
        let diff = SetDiff::compute(&set, &set);
        prop_assert!(!diff.has_membership_changes());
        prop_assert_eq!(diff.existing, set);
    }
}

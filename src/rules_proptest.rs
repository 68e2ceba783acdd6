//! Property-based tests for destination rule planning.
//!
//! These tests use proptest to generate random manifests and rule sets and
//! verify that the placement invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::rules::{plan, DestinationRule};
    use proptest::prelude::*;

    /// A rule set built from generated (kind, pattern, target) triples.
    ///
    /// `[a-z*?]` patterns are always valid shell globs, so planning never
    /// fails for these inputs.
    fn build_rules(raw: Vec<(u8, String, String)>) -> Vec<DestinationRule> {
        raw.into_iter()
            .map(|(kind, pattern, target)| match kind % 3 {
                0 => DestinationRule::Mkdir { path: target },
                1 => DestinationRule::Move { pattern, target },
                _ => DestinationRule::Copy { pattern, target },
            })
            .collect()
    }

    proptest! {
        /// Property: every manifest path lands in exactly one of
        /// {some move/copy bucket, the removal set, kept-untouched}.
        #[test]
        fn every_manifest_path_is_fully_assigned(
            manifest in proptest::collection::vec("[a-z]{1,6}(\\.[ch])?", 0..12),
            raw_rules in proptest::collection::vec(
                (any::<u8>(), "[a-z*?]{1,4}", "[a-z]{1,4}"),
                0..6,
            ),
            keep in any::<bool>(),
        ) {
            let rules = build_rules(raw_rules);
            let plan = plan(&rules, &manifest, keep).unwrap();

            for path in &manifest {
                let in_moves = plan.moves.values().flatten().any(|p| p == path);
                let in_copies = plan.copies.values().flatten().any(|p| p == path);
                let removed = plan.removals.contains(path);

                if in_moves || in_copies {
                    prop_assert!(
                        !removed,
                        "matched path '{}' must not also be removed",
                        path
                    );
                } else if keep {
                    prop_assert!(
                        !removed,
                        "keep must suppress removal of unmatched path '{}'",
                        path
                    );
                } else {
                    prop_assert!(
                        removed,
                        "unmatched path '{}' must be scheduled for removal",
                        path
                    );
                }
            }
        }

        /// Property: plans never mention paths outside the manifest.
        #[test]
        fn plan_only_references_manifest_paths(
            manifest in proptest::collection::vec("[a-z]{1,6}", 0..8),
            raw_rules in proptest::collection::vec(
                (any::<u8>(), "[a-z*]{1,3}", "[a-z]{1,3}"),
                0..5,
            ),
        ) {
            let rules = build_rules(raw_rules);
            let plan = plan(&rules, &manifest, false).unwrap();

            let known = |p: &String| manifest.contains(p);
            prop_assert!(plan.moves.values().flatten().all(known));
            prop_assert!(plan.copies.values().flatten().all(known));
            prop_assert!(plan.removals.iter().all(known));
        }

        /// Property: planning is insensitive to manifest ordering.
        #[test]
        fn plan_is_deterministic(
            manifest in proptest::collection::vec("[a-z]{1,5}", 0..10),
            raw_rules in proptest::collection::vec(
                (any::<u8>(), "[a-z*]{1,3}", "[a-z]{1,3}"),
                0..5,
            ),
            keep in any::<bool>(),
        ) {
            let rules = build_rules(raw_rules);
            let mut reversed = manifest.clone();
            reversed.reverse();

            let forward = plan(&rules, &manifest, keep).unwrap();
            let backward = plan(&rules, &reversed, keep).unwrap();
            prop_assert_eq!(forward, backward);
        }
    }
}

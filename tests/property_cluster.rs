//! Property-based tests for cluster head selection and version ordering
//!
//! Uses proptest to check that insertion order never changes which version
//! is the head or how versions are ordered.

use bead::{Bead, Cluster, FreezeTime, MetaBead, PhantomBead};
use proptest::prelude::*;

fn bead(index: usize, second: u32) -> Bead {
    Bead {
        bead_uuid: "uuid".to_string(),
        name: "name".to_string(),
        content_id: format!("content-{}", index),
        freeze_time: FreezeTime::new(format!("20160704T0000{:02}000000+0000", second)),
        kind: "kind".to_string(),
        box_name: "box".to_string(),
        inputs: Vec::new(),
    }
}

proptest! {
    #[test]
    fn prop_head_is_a_latest_version(seconds in prop::collection::vec(0u32..60, 1..20)) {
        let mut cluster = Cluster::new("name");
        for (i, s) in seconds.iter().enumerate() {
            cluster.add(bead(i, *s));
        }

        let latest = seconds.iter().max().copied().unwrap_or_default();
        let expected_time = bead(0, latest).freeze_time;
        let head = cluster.head();
        prop_assert!(!head.is_phantom());
        prop_assert_eq!(head.freeze_time(), &expected_time);

        // later insert wins ties
        let last_latest = seconds.iter().rposition(|s| *s == latest).unwrap_or_default();
        let expected_id = format!("content-{}", last_latest);
        prop_assert_eq!(head.content_id(), Some(expected_id.as_str()));
    }

    #[test]
    fn prop_ordered_versions_is_descending_and_stable(
        seconds in prop::collection::vec(0u32..10, 0..30)
    ) {
        let mut cluster = Cluster::new("name");
        for (i, s) in seconds.iter().enumerate() {
            cluster.add(bead(i, *s));
        }

        let versions = cluster.ordered_versions();
        prop_assert_eq!(versions.len(), seconds.len());
        for pair in versions.windows(2) {
            prop_assert!(pair[0].freeze_time() >= pair[1].freeze_time());
            if pair[0].freeze_time() == pair[1].freeze_time() {
                let index = |bead: &MetaBead| -> usize {
                    bead.content_id()
                        .and_then(|id| id.strip_prefix("content-"))
                        .and_then(|n| n.parse().ok())
                        .unwrap_or_default()
                };
                prop_assert!(index(&pair[0]) < index(&pair[1]));
            }
        }
    }

    #[test]
    fn prop_phantoms_never_become_head_over_real(
        real_second in 0u32..60,
        phantom_seconds in prop::collection::vec(0u32..60, 1..10)
    ) {
        let mut cluster = Cluster::new("name");
        for (i, s) in phantom_seconds.iter().enumerate() {
            let b = bead(i + 1, *s);
            cluster.add(PhantomBead {
                name: b.name,
                kind: b.kind,
                content_id: Some(b.content_id),
                freeze_time: b.freeze_time,
            });
        }
        prop_assert!(cluster.head().is_phantom());

        cluster.add(bead(0, real_second));
        prop_assert_eq!(cluster.head().content_id(), Some("content-0"));
    }
}

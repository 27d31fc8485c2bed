//! Property tests for identity allocation and record equality.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use tempfile::TempDir;
use warehub_store::dataset::{first_free_id, Table};
use warehub_store::model::Project;
use warehub_store::{Record, RecordId, Store, StoreConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn smallest_missing(ids: &BTreeSet<i64>) -> i64 {
    (0..).find(|id| !ids.contains(id)).unwrap_or(0)
}

fn backing_document(ids: &BTreeSet<i64>) -> Value {
    let mut table = Map::new();
    for id in ids {
        table.insert(
            id.to_string(),
            json!({"__type__": "Project", "value": {"name": format!("p{}", id)}}),
        );
    }
    json!({"last_commit": "2024-01-01T00:00:00.000000Z", "project": table})
}

proptest! {
    #[test]
    fn prop_first_free_id_is_smallest_gap(ids in prop::collection::btree_set(0i64..64, 0..32)) {
        let mut table = Table::new();
        for &id in &ids {
            table.insert(id, Box::new(Project::new(format!("p{}", id))));
        }
        prop_assert_eq!(first_free_id(&table), RecordId(smallest_missing(&ids)));
    }

    #[test]
    fn prop_put_fills_gaps_in_order(
        ids in prop::collection::btree_set(0i64..32, 0..16),
        extra in 1usize..8,
    ) {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, backing_document(&ids).to_string()).unwrap();
        let store = Store::new(StoreConfig { path, pretty: false });

        let mut taken = ids.clone();
        for n in 0..extra {
            let expected = smallest_missing(&taken);
            let id = store.put_one(&mut Project::new(format!("new{}", n))).unwrap();
            prop_assert_eq!(id, RecordId(expected));
            taken.insert(expected);
        }
        prop_assert_eq!(store.len::<Project>().unwrap(), ids.len() + extra);
    }

    #[test]
    fn prop_transient_equality_is_structural(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        let left = Project::new(a.clone());
        let mut right = left.clone();
        right.name = b.clone();
        prop_assert_eq!(left == right, a == b);
    }

    #[test]
    fn prop_persisted_equality_is_by_identity(name in "[a-z]{1,8}") {
        let dir = TempDir::new().unwrap();
        let store = Store::new(StoreConfig::in_dir(dir.path(), "data.json"));

        let mut first = Project::new(name.clone());
        let mut second = first.clone();
        store.put_one(&mut first).unwrap();
        store.put_one(&mut second).unwrap();

        // Same fields, different entries.
        prop_assert!(first != second);
        prop_assert!(first.id() != second.id());

        // A persisted record never equals a transient one.
        prop_assert!(first != Project::new(name));

        // Renaming a stored copy keeps it equal to the entry it came from.
        let mut copy = first.clone();
        copy.name.push('x');
        prop_assert!(copy == first);
    }
}

// Copyright 2024 The FlowGrid Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use assert_matches::assert_matches;
use flowgrid_lib::patch::PatchOp;
use flowgrid_lib::path::StorePath;
use flowgrid_lib::primitive::{Primitive, PrimitiveKind};
use flowgrid_lib::store::{diff, Store, StoreError, ValueKind};
use pretty_assertions::assert_eq;

#[test]
fn test_round_trip_all_kinds() {
    let mut store = Store::new();
    store.set(StorePath::from("/b"), true);
    store.set(StorePath::from("/u"), 7u32);
    store.set(StorePath::from("/s"), -7i32);
    store.set(StorePath::from("/f"), 0.25f32);
    store.set(StorePath::from("/str"), String::from("dsp"));

    assert_eq!(store.get::<bool>(&StorePath::from("/b")), Ok(true));
    assert_eq!(store.get::<u32>(&StorePath::from("/u")), Ok(7));
    assert_eq!(store.get::<i32>(&StorePath::from("/s")), Ok(-7));
    assert_eq!(store.get::<f32>(&StorePath::from("/f")), Ok(0.25));
    assert_eq!(
        store.get::<String>(&StorePath::from("/str")),
        Ok(String::from("dsp"))
    );

    // Another set overwrites; erase removes.
    store.set(StorePath::from("/u"), 8u32);
    assert_eq!(store.get::<u32>(&StorePath::from("/u")), Ok(8));
    assert_eq!(store.erase::<u32>(&StorePath::from("/u")), Some(8));
    assert_matches!(
        store.get::<u32>(&StorePath::from("/u")),
        Err(StoreError::NotFound { .. })
    );
}

#[test]
fn test_wrong_type() {
    let mut store = Store::new();
    store.set(StorePath::from("/x"), 1u32);
    assert_eq!(
        store.get::<String>(&StorePath::from("/x")),
        Err(StoreError::WrongType {
            path: StorePath::from("/x"),
            expected: ValueKind::Primitive(PrimitiveKind::String),
            actual: ValueKind::Primitive(PrimitiveKind::U32),
        })
    );
    // Set leaves also report their kind.
    store.insert_u32(&StorePath::from("/ids"), 3);
    assert_matches!(
        store.get::<u32>(&StorePath::from("/ids")),
        Err(StoreError::WrongType {
            actual: ValueKind::U32Set,
            ..
        })
    );
}

#[test]
fn test_snapshots_are_persistent() {
    let mut store = Store::new();
    store.set(StorePath::from("/v"), 1u32);
    store.insert_id_pair(&StorePath::from("/edges"), (1, 2));
    let snapshot = store.clone();

    store.set(StorePath::from("/v"), 2u32);
    store.erase_id_pair(&StorePath::from("/edges"), (1, 2));
    store.set(StorePath::from("/other"), true);

    assert_eq!(snapshot.get::<u32>(&StorePath::from("/v")), Ok(1));
    assert!(snapshot.has_id_pair(&StorePath::from("/edges"), (1, 2)));
    assert!(!snapshot.contains_primitive(&StorePath::from("/other")));
}

#[test]
fn test_diff_apply_law() {
    let mut a = Store::new();
    a.set(StorePath::from("/keep"), 1u32);
    a.set(StorePath::from("/drop"), String::from("bye"));
    a.set(StorePath::from("/flip"), false);
    a.insert_id_pair(&StorePath::from("/edges"), (1, 2));
    a.insert_u32(&StorePath::from("/muted"), 9);

    let mut b = a.clone();
    b.erase::<String>(&StorePath::from("/drop"));
    b.set(StorePath::from("/flip"), true);
    b.set(StorePath::from("/new"), -3i32);
    b.insert_id_pair(&StorePath::from("/edges"), (2, 3));
    b.erase_u32(&StorePath::from("/muted"), 9);
    b.insert_u32(&StorePath::from("/muted"), 4);

    let patch = diff(&a, &b, &StorePath::root());
    let mut replayed = a.clone();
    replayed.apply_patch(&patch);
    assert_eq!(replayed, b);
}

#[test]
fn test_diff_emits_per_index_vector_ops() {
    // Vectors are stored as per-index entries, so diffing two snapshots
    // yields per-index ops.
    let mut before = Store::new();
    before.set(StorePath::from("/v/0"), 10u32);
    before.set(StorePath::from("/v/1"), 11u32);
    before.set(StorePath::from("/v/2"), 12u32);

    let mut after = before.clone();
    after.set(StorePath::from("/v/1"), 99u32);
    after.erase::<u32>(&StorePath::from("/v/2"));

    let patch = diff(&before, &after, &StorePath::root());
    assert_eq!(patch.ops.len(), 2);
    assert_eq!(
        patch.ops.get(&StorePath::from("/v/1")),
        Some(&PatchOp::Replace {
            value: Primitive::U32(99),
            old: Primitive::U32(11),
        })
    );
    assert_eq!(
        patch.ops.get(&StorePath::from("/v/2")),
        Some(&PatchOp::Remove {
            old: Primitive::U32(12),
        })
    );
}

#[test]
fn test_diff_emits_per_element_set_ops() {
    let mut before = Store::new();
    before.insert_id_pair(&StorePath::from("/edges"), (1, 2));
    let mut after = before.clone();
    after.insert_id_pair(&StorePath::from("/edges"), (2, 3));
    after.erase_id_pair(&StorePath::from("/edges"), (1, 2));

    let patch = diff(&before, &after, &StorePath::root());
    assert_eq!(
        patch.ops.get(&StorePath::from("/edges/2-3")),
        Some(&PatchOp::Add {
            value: Primitive::String("2-3".into()),
        })
    );
    assert_eq!(
        patch.ops.get(&StorePath::from("/edges/1-2")),
        Some(&PatchOp::Remove {
            old: Primitive::String("1-2".into()),
        })
    );
}

#[test]
fn test_erase_primitive_tries_each_kind() {
    let mut store = Store::new();
    store.set(StorePath::from("/a"), 0.5f32);
    store.set(StorePath::from("/b"), String::from("x"));
    assert!(store.erase_primitive(&StorePath::from("/a")));
    assert!(store.erase_primitive(&StorePath::from("/b")));
    assert!(!store.erase_primitive(&StorePath::from("/a")));
}

#[test]
fn test_contains_counts_container_roots() {
    let mut store = Store::new();
    store.set(StorePath::from("/v/0"), 1u32);
    assert!(store.contains(&StorePath::from("/v")));
    assert!(!store.contains_primitive(&StorePath::from("/v")));
    store.insert_id_pair(&StorePath::from("/edges"), (1, 2));
    assert!(store.contains(&StorePath::from("/edges")));
}

#[test]
fn test_transient_commit_and_reset() {
    let mut transient = Store::new().transient();
    transient.store_mut().set(StorePath::from("/v"), 1u32);
    let (snapshot, patch) = transient.checked_commit();
    assert_eq!(patch.ops.len(), 1);
    assert_eq!(snapshot.get::<u32>(&StorePath::from("/v")), Ok(1));

    // Edits after a commit can be abandoned.
    transient.store_mut().set(StorePath::from("/v"), 2u32);
    assert!(transient.is_dirty());
    transient.reset();
    assert!(!transient.is_dirty());
    assert_eq!(transient.store().get::<u32>(&StorePath::from("/v")), Ok(1));

    // An empty commit produces an empty patch.
    let (_, patch) = transient.checked_commit();
    assert!(patch.is_empty());
}

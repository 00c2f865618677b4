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

//! The typed, path-addressed persistent store: the single source of truth
//! for the whole application state.
//!
//! A [`Store`] is a value type holding one persistent ordered map per value
//! kind. Snapshots are O(1) to copy thanks to structural sharing, so the
//! history can keep one per gesture. Batch edits go through a
//! [`TransientStore`], which pairs the last committed snapshot with the maps
//! being mutated and can produce the [`Patch`] between the two on commit.

use std::fmt::{Display, Error, Formatter};

use im::{OrdMap, OrdSet};
use thiserror::Error as ThisError;

use crate::patch::{Patch, PatchOp, PatchOps};
use crate::path::StorePath;
use crate::primitive::{Primitive, PrimitiveKind};

pub type Id = u32;
pub type IdPair = (Id, Id);
pub type IdPairSet = OrdSet<IdPair>;
pub type U32Set = OrdSet<u32>;

type Map<T> = OrdMap<StorePath, T>;

/// Everything a single path can hold: the five primitive kinds plus the two
/// set-leaf kinds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueKind {
    Primitive(PrimitiveKind),
    IdPairSet,
    U32Set,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            ValueKind::Primitive(kind) => write!(f, "{kind}"),
            ValueKind::IdPairSet => write!(f, "id-pair set"),
            ValueKind::U32Set => write!(f, "u32 set"),
        }
    }
}

#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no value at path {path}")]
    NotFound { path: StorePath },
    #[error("value at path {path} is a {actual}, expected a {expected}")]
    WrongType {
        path: StorePath,
        expected: ValueKind,
        actual: ValueKind,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// `{src}-{dst}`, used as the trailing path segment and op payload for
/// id-pair element ops.
pub fn serialize_id_pair((src, dst): IdPair) -> String {
    format!("{src}-{dst}")
}

pub fn parse_id_pair(s: &str) -> Option<IdPair> {
    let (src, dst) = s.split_once('-')?;
    Some((src.parse().ok()?, dst.parse().ok()?))
}

mod private {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for u32 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for String {}
}

/// A primitive value kind storable at a path. Sealed: the set of kinds is
/// closed by design.
pub trait StoreValue: Clone + PartialEq + Into<Primitive> + private::Sealed {
    const KIND: PrimitiveKind;

    fn map(store: &Store) -> &Map<Self>;
    fn map_mut(store: &mut Store) -> &mut Map<Self>;
    /// Conversion used when routing an untyped action payload to a typed
    /// path; integer kinds coerce into each other when the value fits.
    fn from_primitive(value: &Primitive) -> Option<Self>;
}

macro_rules! impl_store_value {
    ($type:ty, $kind:ident, $field:ident, $from:expr) => {
        impl StoreValue for $type {
            const KIND: PrimitiveKind = PrimitiveKind::$kind;

            fn map(store: &Store) -> &Map<Self> {
                &store.$field
            }
            fn map_mut(store: &mut Store) -> &mut Map<Self> {
                &mut store.$field
            }
            fn from_primitive(value: &Primitive) -> Option<Self> {
                $from(value)
            }
        }
    };
}

impl_store_value!(bool, Bool, bools, Primitive::as_bool);
impl_store_value!(u32, U32, u32s, Primitive::to_u32);
impl_store_value!(i32, S32, s32s, Primitive::to_s32);
impl_store_value!(f32, F32, f32s, Primitive::to_f32);
impl_store_value!(String, String, strings, |value: &Primitive| {
    value.as_str().map(str::to_owned)
});

/// An immutable mapping from [`StorePath`] to typed values, one persistent
/// map per kind. Cloning is O(1).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Store {
    bools: Map<bool>,
    u32s: Map<u32>,
    s32s: Map<i32>,
    f32s: Map<f32>,
    strings: Map<String>,
    id_pairs: Map<IdPairSet>,
    u32_sets: Map<U32Set>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    /// Opens a batch-edit view over this snapshot.
    pub fn transient(&self) -> TransientStore {
        TransientStore::new(self.clone())
    }

    pub fn get<T: StoreValue>(&self, path: &StorePath) -> StoreResult<T> {
        if let Some(value) = T::map(self).get(path) {
            return Ok(value.clone());
        }
        match self.kind_at(path) {
            Some(actual) => Err(StoreError::WrongType {
                path: path.clone(),
                expected: ValueKind::Primitive(T::KIND),
                actual,
            }),
            None => Err(StoreError::NotFound { path: path.clone() }),
        }
    }

    /// Non-failing lookup, for cache refresh loops that probe paths.
    pub fn find<T: StoreValue>(&self, path: &StorePath) -> Option<T> {
        T::map(self).get(path).cloned()
    }

    pub fn contains_kind<T: StoreValue>(&self, path: &StorePath) -> bool {
        T::map(self).contains_key(path)
    }

    pub fn set<T: StoreValue>(&mut self, path: StorePath, value: T) {
        T::map_mut(self).insert(path, value);
    }

    pub fn erase<T: StoreValue>(&mut self, path: &StorePath) -> Option<T> {
        T::map_mut(self).remove(path)
    }

    /// The kind currently stored at `path`, if any.
    pub fn kind_at(&self, path: &StorePath) -> Option<ValueKind> {
        if self.bools.contains_key(path) {
            Some(ValueKind::Primitive(PrimitiveKind::Bool))
        } else if self.u32s.contains_key(path) {
            Some(ValueKind::Primitive(PrimitiveKind::U32))
        } else if self.s32s.contains_key(path) {
            Some(ValueKind::Primitive(PrimitiveKind::S32))
        } else if self.f32s.contains_key(path) {
            Some(ValueKind::Primitive(PrimitiveKind::F32))
        } else if self.strings.contains_key(path) {
            Some(ValueKind::Primitive(PrimitiveKind::String))
        } else if self.id_pairs.contains_key(path) {
            Some(ValueKind::IdPairSet)
        } else if self.u32_sets.contains_key(path) {
            Some(ValueKind::U32Set)
        } else {
            None
        }
    }

    pub fn contains_primitive(&self, path: &StorePath) -> bool {
        matches!(self.kind_at(path), Some(ValueKind::Primitive(_)))
    }

    /// Whether any value lives at `path`, counting container roots: a vector
    /// stored as per-index children is "at" its base path.
    pub fn contains(&self, path: &StorePath) -> bool {
        self.kind_at(path).is_some() || self.contains_primitive(&path.join("0"))
    }

    pub fn get_primitive(&self, path: &StorePath) -> Option<Primitive> {
        if let Some(value) = self.bools.get(path) {
            return Some(Primitive::Bool(*value));
        }
        if let Some(value) = self.u32s.get(path) {
            return Some(Primitive::U32(*value));
        }
        if let Some(value) = self.s32s.get(path) {
            return Some(Primitive::S32(*value));
        }
        if let Some(value) = self.f32s.get(path) {
            return Some(Primitive::F32(*value));
        }
        self.strings
            .get(path)
            .map(|value| Primitive::String(value.clone()))
    }

    /// Tries each primitive kind in turn. Returns whether anything was
    /// removed.
    pub fn erase_primitive(&mut self, path: &StorePath) -> bool {
        self.bools.remove(path).is_some()
            || self.u32s.remove(path).is_some()
            || self.s32s.remove(path).is_some()
            || self.f32s.remove(path).is_some()
            || self.strings.remove(path).is_some()
    }

    /// Routes an untyped primitive to the map matching its kind.
    pub fn set_primitive(&mut self, path: StorePath, value: Primitive) {
        match value {
            Primitive::Bool(v) => self.set(path, v),
            Primitive::U32(v) => self.set(path, v),
            Primitive::S32(v) => self.set(path, v),
            Primitive::F32(v) => self.set(path, v),
            Primitive::String(v) => self.set(path, v),
        }
    }

    pub fn id_pairs(&self, path: &StorePath) -> IdPairSet {
        self.id_pairs.get(path).cloned().unwrap_or_default()
    }

    pub fn id_pair_count(&self, path: &StorePath) -> usize {
        self.id_pairs.get(path).map_or(0, OrdSet::len)
    }

    pub fn has_id_pair(&self, path: &StorePath, pair: IdPair) -> bool {
        self.id_pairs
            .get(path)
            .is_some_and(|pairs| pairs.contains(&pair))
    }

    pub fn insert_id_pair(&mut self, path: &StorePath, pair: IdPair) {
        let mut pairs = self.id_pairs(path);
        pairs.insert(pair);
        self.id_pairs.insert(path.clone(), pairs);
    }

    pub fn erase_id_pair(&mut self, path: &StorePath, pair: IdPair) {
        if let Some(pairs) = self.id_pairs.get(path) {
            let mut pairs = pairs.clone();
            pairs.remove(&pair);
            self.id_pairs.insert(path.clone(), pairs);
        }
    }

    pub fn clear_id_pairs(&mut self, path: &StorePath) {
        self.id_pairs.insert(path.clone(), IdPairSet::default());
    }

    pub fn u32_set(&self, path: &StorePath) -> U32Set {
        self.u32_sets.get(path).cloned().unwrap_or_default()
    }

    pub fn contains_u32(&self, path: &StorePath, value: u32) -> bool {
        self.u32_sets
            .get(path)
            .is_some_and(|set| set.contains(&value))
    }

    pub fn insert_u32(&mut self, path: &StorePath, value: u32) {
        let mut set = self.u32_set(path);
        set.insert(value);
        self.u32_sets.insert(path.clone(), set);
    }

    pub fn erase_u32(&mut self, path: &StorePath, value: u32) {
        if let Some(set) = self.u32_sets.get(path) {
            let mut set = set.clone();
            set.remove(&value);
            self.u32_sets.insert(path.clone(), set);
        }
    }

    pub fn clear_u32_set(&mut self, path: &StorePath) {
        self.u32_sets.insert(path.clone(), U32Set::default());
    }

    /// Replays a patch's ops onto this store. Set-element ops are recognized
    /// by their trailing serialized-element segment and the kind of the leaf
    /// at the parent path; everything else routes to the primitive map
    /// matching the op value's kind.
    pub fn apply_patch(&mut self, patch: &Patch) {
        for (relative, op) in &patch.ops {
            let path = patch.base.concat(relative);
            match op {
                PatchOp::Add { value } | PatchOp::Replace { value, .. } => {
                    self.apply_set_op(path, value);
                }
                PatchOp::Remove { .. } => {
                    self.apply_remove_op(&path);
                }
            }
        }
    }

    fn apply_set_op(&mut self, path: StorePath, value: &Primitive) {
        if let Some((parent, last)) = path.split() {
            if let Some(pair) = parse_id_pair(last.value()) {
                if value.as_str() == Some(last.value()) {
                    self.insert_id_pair(&parent, pair);
                    return;
                }
            }
            if self.u32_sets.contains_key(&parent) {
                if let Some(element) = value.to_u32() {
                    self.insert_u32(&parent, element);
                    return;
                }
            }
        }
        self.set_primitive(path, value.clone());
    }

    fn apply_remove_op(&mut self, path: &StorePath) {
        if self.erase_primitive(path) {
            return;
        }
        if let Some((parent, last)) = path.split() {
            if let Some(pair) = parse_id_pair(last.value()) {
                if self.has_id_pair(&parent, pair) {
                    self.erase_id_pair(&parent, pair);
                    return;
                }
            }
            if let Ok(element) = last.value().parse::<u32>() {
                if self.contains_u32(&parent, element) {
                    self.erase_u32(&parent, element);
                }
            }
        }
    }
}

/// Structural diff between two snapshots. Ops are keyed by their path
/// relative to `base_path`; paths outside `base_path` are skipped. Set
/// leaves diff per element, with the serialized element as the trailing
/// path segment.
pub fn diff(before: &Store, after: &Store, base_path: &StorePath) -> Patch {
    let mut ops = PatchOps::new();
    diff_kind(&before.bools, &after.bools, base_path, &mut ops);
    diff_kind(&before.u32s, &after.u32s, base_path, &mut ops);
    diff_kind(&before.s32s, &after.s32s, base_path, &mut ops);
    diff_kind(&before.f32s, &after.f32s, base_path, &mut ops);
    diff_kind(&before.strings, &after.strings, base_path, &mut ops);
    diff_sets(
        &before.id_pairs,
        &after.id_pairs,
        base_path,
        &mut ops,
        |&pair| {
            let serialized = serialize_id_pair(pair);
            (serialized.clone(), Primitive::String(serialized))
        },
    );
    diff_sets(
        &before.u32_sets,
        &after.u32_sets,
        base_path,
        &mut ops,
        |&element| (element.to_string(), Primitive::U32(element)),
    );
    Patch::new(ops, base_path.clone())
}

fn diff_kind<T: StoreValue>(
    before: &Map<T>,
    after: &Map<T>,
    base_path: &StorePath,
    ops: &mut PatchOps,
) {
    for item in before.diff(after) {
        match item {
            im::ordmap::DiffItem::Add(path, value) => {
                let Some(relative) = path.relative_to(base_path) else {
                    continue;
                };
                ops.insert(
                    relative,
                    PatchOp::Add {
                        value: value.clone().into(),
                    },
                );
            }
            im::ordmap::DiffItem::Update { old, new } => {
                let Some(relative) = new.0.relative_to(base_path) else {
                    continue;
                };
                ops.insert(
                    relative,
                    PatchOp::Replace {
                        value: new.1.clone().into(),
                        old: old.1.clone().into(),
                    },
                );
            }
            im::ordmap::DiffItem::Remove(path, value) => {
                let Some(relative) = path.relative_to(base_path) else {
                    continue;
                };
                ops.insert(
                    relative,
                    PatchOp::Remove {
                        old: value.clone().into(),
                    },
                );
            }
        }
    }
}

fn diff_sets<E: Ord + Clone>(
    before: &Map<OrdSet<E>>,
    after: &Map<OrdSet<E>>,
    base_path: &StorePath,
    ops: &mut PatchOps,
    serialize: impl Fn(&E) -> (String, Primitive),
) {
    let empty = OrdSet::<E>::default();
    for item in before.diff(after) {
        let (path, old_set, new_set) = match item {
            im::ordmap::DiffItem::Add(path, set) => (path, &empty, set),
            im::ordmap::DiffItem::Remove(path, set) => (path, set, &empty),
            im::ordmap::DiffItem::Update { old, new } => (new.0, old.1, new.1),
        };
        let Some(relative) = path.relative_to(base_path) else {
            continue;
        };
        for element in new_set.iter().filter(|e| !old_set.contains(*e)) {
            let (segment, value) = serialize(element);
            ops.insert(relative.join(segment), PatchOp::Add { value });
        }
        for element in old_set.iter().filter(|e| !new_set.contains(*e)) {
            let (segment, old) = serialize(element);
            ops.insert(relative.join(segment), PatchOp::Remove { old });
        }
    }
}

/// A batch-edit view: the last committed snapshot plus the maps being
/// mutated. Mutations go through [`TransientStore::store_mut`]; committing
/// promotes the working maps to the new base.
#[derive(Clone, Debug)]
pub struct TransientStore {
    base: Store,
    store: Store,
}

impl TransientStore {
    pub fn new(base: Store) -> Self {
        TransientStore {
            store: base.clone(),
            base,
        }
    }

    /// The snapshot this batch started from.
    pub fn base(&self) -> &Store {
        &self.base
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn is_dirty(&self) -> bool {
        self.base != self.store
    }

    /// Promotes the working maps to the new base and returns the new
    /// snapshot.
    pub fn commit(&mut self) -> Store {
        self.base = self.store.clone();
        self.base.clone()
    }

    /// Like [`TransientStore::commit`], also returning the patch from the
    /// old base to the new snapshot.
    pub fn checked_commit(&mut self) -> (Store, Patch) {
        let patch = diff(&self.base, &self.store, &StorePath::root());
        let snapshot = self.commit();
        (snapshot, patch)
    }

    /// Discards all edits since the last commit.
    pub fn reset(&mut self) {
        self.store = self.base.clone();
    }

    /// Rebases both the working maps and the base onto `snapshot`,
    /// discarding any pending edits (undo/redo restore).
    pub fn reset_to(&mut self, snapshot: Store) {
        self.store = snapshot.clone();
        self.base = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_round_trip() {
        let mut store = Store::new();
        let path = StorePath::from("/Style/Alpha");
        store.set(path.clone(), 0.75f32);
        assert_eq!(store.get::<f32>(&path), Ok(0.75));
        assert_eq!(
            store.get::<bool>(&path),
            Err(StoreError::WrongType {
                path: path.clone(),
                expected: ValueKind::Primitive(PrimitiveKind::Bool),
                actual: ValueKind::Primitive(PrimitiveKind::F32),
            })
        );
        store.erase::<f32>(&path);
        assert_matches!(store.get::<f32>(&path), Err(StoreError::NotFound { .. }));
    }

    #[test]
    fn test_snapshot_isolation() {
        let mut store = Store::new();
        let path = StorePath::from("/a");
        store.set(path.clone(), 1u32);
        let snapshot = store.clone();
        store.set(path.clone(), 2u32);
        assert_eq!(snapshot.get::<u32>(&path), Ok(1));
        assert_eq!(store.get::<u32>(&path), Ok(2));
    }

    #[test]
    fn test_diff_apply_law() {
        let mut before = Store::new();
        before.set(StorePath::from("/keep"), 1u32);
        before.set(StorePath::from("/drop"), String::from("bye"));
        before.set(StorePath::from("/change"), false);
        before.insert_id_pair(&StorePath::from("/edges"), (1, 2));

        let mut after = before.clone();
        after.erase::<String>(&StorePath::from("/drop"));
        after.set(StorePath::from("/change"), true);
        after.set(StorePath::from("/new"), 0.5f32);
        after.insert_id_pair(&StorePath::from("/edges"), (2, 3));
        after.erase_id_pair(&StorePath::from("/edges"), (1, 2));

        let patch = diff(&before, &after, &StorePath::root());
        let mut replayed = before.clone();
        replayed.apply_patch(&patch);
        assert_eq!(replayed, after);
    }

    #[test]
    fn test_checked_commit() {
        let mut transient = Store::new().transient();
        transient.store_mut().set(StorePath::from("/v"), 3u32);
        assert!(transient.is_dirty());
        let (snapshot, patch) = transient.checked_commit();
        assert_eq!(snapshot.get::<u32>(&StorePath::from("/v")), Ok(3));
        assert_eq!(patch.ops.len(), 1);
        assert!(!transient.is_dirty());

        transient.store_mut().set(StorePath::from("/v"), 4u32);
        transient.reset();
        assert_eq!(transient.store().get::<u32>(&StorePath::from("/v")), Ok(3));
    }
}

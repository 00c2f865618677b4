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

//! A uniformly-typed vector stored as numeric-indexed children:
//! `path/0`, `path/1`, ... Because each element is its own primitive entry,
//! structural diffs produce per-index add/remove/replace ops.

use super::{contains_element, read_element, write_element};
use crate::path::StorePath;
use crate::primitive::{Primitive, PrimitiveKind};
use crate::store::Store;

/// Cached view of a vector container, refreshed after every commit.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorValue {
    pub kind: PrimitiveKind,
    pub value: Vec<Primitive>,
}

impl VectorValue {
    pub fn new(kind: PrimitiveKind) -> Self {
        VectorValue { kind, value: vec![] }
    }

    pub fn refresh(&mut self, store: &Store, path: &StorePath) {
        self.value = read(store, path, self.kind);
    }
}

fn index_path(path: &StorePath, i: usize) -> StorePath {
    path.join(i.to_string())
}

pub fn read(store: &Store, path: &StorePath, kind: PrimitiveKind) -> Vec<Primitive> {
    let mut value = vec![];
    let mut i = 0;
    while let Some(element) = read_element(store, &index_path(path, i), kind) {
        value.push(element);
        i += 1;
    }
    value
}

pub fn set(store: &mut Store, path: &StorePath, kind: PrimitiveKind, values: &[Primitive]) {
    for (i, element) in values.iter().enumerate() {
        write_element(store, index_path(path, i), kind, element);
    }
    resize(store, path, kind, values.len());
}

pub fn set_at(
    store: &mut Store,
    path: &StorePath,
    kind: PrimitiveKind,
    i: usize,
    value: &Primitive,
) {
    write_element(store, index_path(path, i), kind, value);
}

/// Erases any entries at `size` and beyond.
pub fn resize(store: &mut Store, path: &StorePath, kind: PrimitiveKind, size: usize) {
    let mut i = size;
    while contains_element(store, &index_path(path, i), kind) {
        store.erase_primitive(&index_path(path, i));
        i += 1;
    }
}

pub fn clear(store: &mut Store, path: &StorePath, kind: PrimitiveKind) {
    resize(store, path, kind, 0);
}

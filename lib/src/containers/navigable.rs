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

//! A bounded history stack with a cursor (e.g. the node-inspection trail in
//! the graph view). Items live at `path/0..n`, the cursor at `path/Cursor`.

use crate::path::StorePath;
use crate::store::Store;

const CURSOR_SEGMENT: &str = "Cursor";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NavigableValue {
    pub value: Vec<u32>,
    pub cursor: u32,
    pub capacity: Option<usize>,
}

impl NavigableValue {
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        NavigableValue {
            capacity,
            ..NavigableValue::default()
        }
    }

    pub fn refresh(&mut self, store: &Store, path: &StorePath) {
        self.value = read_items(store, path);
        self.cursor = store.find::<u32>(&cursor_path(path)).unwrap_or(0);
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn current(&self) -> Option<u32> {
        self.value.get(self.cursor as usize).copied()
    }

    pub fn can_move_back(&self) -> bool {
        !self.value.is_empty() && self.cursor > 0
    }

    pub fn can_move_forward(&self) -> bool {
        !self.value.is_empty() && (self.cursor as usize) < self.value.len() - 1
    }
}

fn cursor_path(path: &StorePath) -> StorePath {
    path.join(CURSOR_SEGMENT)
}

fn index_path(path: &StorePath, i: usize) -> StorePath {
    path.join(i.to_string())
}

fn read_items(store: &Store, path: &StorePath) -> Vec<u32> {
    let mut items = vec![];
    let mut i = 0;
    while let Some(item) = store.find::<u32>(&index_path(path, i)) {
        items.push(item);
        i += 1;
    }
    items
}

fn write_items(store: &mut Store, path: &StorePath, items: &[u32]) {
    for (i, item) in items.iter().enumerate() {
        store.set(index_path(path, i), *item);
    }
    let mut i = items.len();
    while store.contains_kind::<u32>(&index_path(path, i)) {
        store.erase::<u32>(&index_path(path, i));
        i += 1;
    }
}

/// Truncates any forward tail past the cursor, then appends. Overflowing a
/// bounded stack drops the oldest entry.
pub fn push(store: &mut Store, path: &StorePath, id: u32, capacity: Option<usize>) {
    let mut items = read_items(store, path);
    let cursor = store.find::<u32>(&cursor_path(path)).unwrap_or(0) as usize;
    if !items.is_empty() {
        items.truncate(cursor + 1);
    }
    items.push(id);
    if let Some(capacity) = capacity {
        while items.len() > capacity {
            items.remove(0);
        }
    }
    write_items(store, path, &items);
    store.set(cursor_path(path), (items.len() - 1) as u32);
}

pub fn move_back(store: &mut Store, path: &StorePath) {
    let cursor = store.find::<u32>(&cursor_path(path)).unwrap_or(0);
    store.set(cursor_path(path), cursor.saturating_sub(1));
}

pub fn move_forward(store: &mut Store, path: &StorePath) {
    let items = read_items(store, path);
    if items.is_empty() {
        return;
    }
    let cursor = store.find::<u32>(&cursor_path(path)).unwrap_or(0);
    store.set(
        cursor_path(path),
        (cursor + 1).min((items.len() - 1) as u32),
    );
}

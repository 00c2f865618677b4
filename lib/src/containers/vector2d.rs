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

//! A two-dimensional vector stored as doubly-indexed children:
//! `path/i/j`. Inner rows may have different lengths.

use super::{contains_element, read_element, write_element};
use crate::path::StorePath;
use crate::primitive::{Primitive, PrimitiveKind};
use crate::store::Store;

#[derive(Clone, Debug, PartialEq)]
pub struct Vector2DValue {
    pub kind: PrimitiveKind,
    pub value: Vec<Vec<Primitive>>,
}

impl Vector2DValue {
    pub fn new(kind: PrimitiveKind) -> Self {
        Vector2DValue { kind, value: vec![] }
    }

    pub fn refresh(&mut self, store: &Store, path: &StorePath) {
        self.value = read(store, path, self.kind);
    }
}

fn cell_path(path: &StorePath, i: usize, j: usize) -> StorePath {
    path.join(i.to_string()).join(j.to_string())
}

pub fn read(store: &Store, path: &StorePath, kind: PrimitiveKind) -> Vec<Vec<Primitive>> {
    let mut value = vec![];
    let mut i = 0;
    while contains_element(store, &cell_path(path, i, 0), kind) {
        let mut row = vec![];
        let mut j = 0;
        while let Some(element) = read_element(store, &cell_path(path, i, j), kind) {
            row.push(element);
            j += 1;
        }
        value.push(row);
        i += 1;
    }
    value
}

pub fn set(store: &mut Store, path: &StorePath, kind: PrimitiveKind, values: &[Vec<Primitive>]) {
    for (i, row) in values.iter().enumerate() {
        for (j, element) in row.iter().enumerate() {
            write_element(store, cell_path(path, i, j), kind, element);
        }
        resize_row(store, path, kind, i, row.len());
    }
    resize(store, path, kind, values.len());
}

/// Erases any rows at `size` and beyond.
pub fn resize(store: &mut Store, path: &StorePath, kind: PrimitiveKind, size: usize) {
    let mut i = size;
    while contains_element(store, &cell_path(path, i, 0), kind) {
        resize_row(store, path, kind, i, 0);
        i += 1;
    }
}

fn resize_row(store: &mut Store, path: &StorePath, kind: PrimitiveKind, i: usize, size: usize) {
    let mut j = size;
    while contains_element(store, &cell_path(path, i, j), kind) {
        store.erase_primitive(&cell_path(path, i, j));
        j += 1;
    }
}

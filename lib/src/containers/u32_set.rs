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

//! A membership-only set of ids, stored as a single `U32Set` leaf.

use crate::path::StorePath;
use crate::store::{Store, U32Set};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct U32SetValue {
    pub value: U32Set,
}

impl U32SetValue {
    pub fn refresh(&mut self, store: &Store, path: &StorePath) {
        self.value = store.u32_set(path);
    }
}

pub fn insert(store: &mut Store, path: &StorePath, value: u32) {
    store.insert_u32(path, value);
}

pub fn erase(store: &mut Store, path: &StorePath, value: u32) {
    store.erase_u32(path, value);
}

pub fn clear(store: &mut Store, path: &StorePath) {
    store.clear_u32_set(path);
}

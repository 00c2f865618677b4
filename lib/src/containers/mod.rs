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

//! Structured store projections: containers hold collections as families of
//! primitive entries (or set leaves) under their base path.

pub mod adjacency_list;
pub mod navigable;
pub mod u32_set;
pub mod vector;
pub mod vector2d;

use crate::path::StorePath;
use crate::primitive::{Primitive, PrimitiveKind};
use crate::store::Store;

/// Writes `value` at `path`, coerced to the container's element kind.
/// Returns false (writing nothing) when the value can't represent that kind.
pub(crate) fn write_element(
    store: &mut Store,
    path: StorePath,
    kind: PrimitiveKind,
    value: &Primitive,
) -> bool {
    match kind {
        PrimitiveKind::Bool => match value.as_bool() {
            Some(v) => store.set(path, v),
            None => return false,
        },
        PrimitiveKind::U32 => match value.to_u32() {
            Some(v) => store.set(path, v),
            None => return false,
        },
        PrimitiveKind::S32 => match value.to_s32() {
            Some(v) => store.set(path, v),
            None => return false,
        },
        PrimitiveKind::F32 => match value.to_f32() {
            Some(v) => store.set(path, v),
            None => return false,
        },
        PrimitiveKind::String => match value.as_str() {
            Some(v) => store.set(path, v.to_owned()),
            None => return false,
        },
    }
    true
}

/// Reads the element at `path` as the container's element kind.
pub(crate) fn read_element(
    store: &Store,
    path: &StorePath,
    kind: PrimitiveKind,
) -> Option<Primitive> {
    match kind {
        PrimitiveKind::Bool => store.find::<bool>(path).map(Primitive::Bool),
        PrimitiveKind::U32 => store.find::<u32>(path).map(Primitive::U32),
        PrimitiveKind::S32 => store.find::<i32>(path).map(Primitive::S32),
        PrimitiveKind::F32 => store.find::<f32>(path).map(Primitive::F32),
        PrimitiveKind::String => store.find::<String>(path).map(Primitive::String),
    }
}

pub(crate) fn contains_element(store: &Store, path: &StorePath, kind: PrimitiveKind) -> bool {
    match kind {
        PrimitiveKind::Bool => store.contains_kind::<bool>(path),
        PrimitiveKind::U32 => store.contains_kind::<u32>(path),
        PrimitiveKind::S32 => store.contains_kind::<i32>(path),
        PrimitiveKind::F32 => store.contains_kind::<f32>(path),
        PrimitiveKind::String => store.contains_kind::<String>(path),
    }
}

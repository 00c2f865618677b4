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

//! The static component tree projected over the store.
//!
//! Components live in an arena keyed by [`ComponentId`]; relations are
//! id-to-id, never owning references. The tree is built once at startup and
//! is not reshaped by actions. Ids hash the parent id with the widget label,
//! so they are stable across processes and may appear in saved actions.

use std::collections::HashMap;

use indexmap::IndexMap;
use indexmap::IndexSet;
use nohash_hasher::IntMap;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::containers::adjacency_list::{self, AdjacencyListValue};
use crate::containers::navigable::{self, NavigableValue};
use crate::containers::u32_set::U32SetValue;
use crate::containers::vector::{self, VectorValue};
use crate::containers::vector2d::{self, Vector2DValue};
use crate::patch::Patch;
use crate::path::StorePath;
use crate::primitive::{Primitive, PrimitiveKind};
use crate::store::Store;
use crate::text::{LanguageId, TextBuffer};

pub type WindowFlags = u32;
pub const WINDOW_FLAGS_NONE: WindowFlags = 0;
pub const WINDOW_FLAGS_NO_SCROLLBAR: WindowFlags = 1 << 0;
pub const WINDOW_FLAGS_NO_SCROLL_WITH_MOUSE: WindowFlags = 1 << 1;

/// Stable component identity: a hash of the parent id and the widget label.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct ComponentId(pub u32);

impl nohash_hasher::IsEnabled for ComponentId {}

const FNV_OFFSET: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn generate_id(parent: ComponentId, label: &str) -> ComponentId {
    let mut hash = FNV_OFFSET ^ parent.0;
    for &byte in label.as_bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    ComponentId(hash)
}

/// `"GestureDurationSec"` -> `"Gesture duration sec"`.
pub fn pascal_to_sentence_case(pascal: &str) -> String {
    let mut result = String::new();
    for (i, ch) in pascal.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            result.push(' ');
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Component metadata strings are `"Name?Help"`: an optional display-name
/// override, then an optional help string after `?`.
fn parse_meta(meta: &str) -> (Option<String>, String) {
    match meta.split_once('?') {
        Some((name, help)) => {
            let name = if name.is_empty() {
                None
            } else {
                Some(name.to_owned())
            };
            (name, help.to_owned())
        }
        None if meta.is_empty() => (None, String::new()),
        None => (Some(meta.to_owned()), String::new()),
    }
}

/// A leaf bound to exactly one store path, caching its typed value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Bool {
        value: bool,
        default: bool,
    },
    U32 {
        value: u32,
        default: u32,
    },
    S32 {
        value: i32,
        default: i32,
    },
    F32 {
        value: f32,
        default: f32,
        min: f32,
        max: f32,
    },
    Str {
        value: String,
        default: String,
    },
    Flags {
        value: u32,
        default: u32,
    },
    Enum {
        value: u32,
        default: u32,
        options: Vec<String>,
    },
}

impl FieldValue {
    pub fn to_primitive(&self) -> Primitive {
        match self {
            FieldValue::Bool { value, .. } => Primitive::Bool(*value),
            FieldValue::U32 { value, .. }
            | FieldValue::Flags { value, .. }
            | FieldValue::Enum { value, .. } => Primitive::U32(*value),
            FieldValue::S32 { value, .. } => Primitive::S32(*value),
            FieldValue::F32 { value, .. } => Primitive::F32(*value),
            FieldValue::Str { value, .. } => Primitive::String(value.clone()),
        }
    }

    fn default_primitive(&self) -> Primitive {
        match self {
            FieldValue::Bool { default, .. } => Primitive::Bool(*default),
            FieldValue::U32 { default, .. }
            | FieldValue::Flags { default, .. }
            | FieldValue::Enum { default, .. } => Primitive::U32(*default),
            FieldValue::S32 { default, .. } => Primitive::S32(*default),
            FieldValue::F32 { default, .. } => Primitive::F32(*default),
            FieldValue::Str { default, .. } => Primitive::String(default.clone()),
        }
    }

    fn init_store(&self, store: &mut Store, path: &StorePath) {
        self.write(store, path, &self.default_primitive());
    }

    fn refresh(&mut self, store: &Store, path: &StorePath) {
        match self {
            FieldValue::Bool { value, default } => {
                *value = store.find::<bool>(path).unwrap_or(*default);
            }
            FieldValue::U32 { value, default }
            | FieldValue::Flags { value, default }
            | FieldValue::Enum {
                value, default, ..
            } => {
                *value = store.find::<u32>(path).unwrap_or(*default);
            }
            FieldValue::S32 { value, default } => {
                *value = store.find::<i32>(path).unwrap_or(*default);
            }
            FieldValue::F32 { value, default, .. } => {
                *value = store.find::<f32>(path).unwrap_or(*default);
            }
            FieldValue::Str { value, default } => {
                *value = store.find::<String>(path).unwrap_or_else(|| default.clone());
            }
        }
    }

    /// Writes `value` at `path` coerced to this field's kind. Returns false
    /// (writing nothing) when the value can't represent that kind.
    pub fn write(&self, store: &mut Store, path: &StorePath, value: &Primitive) -> bool {
        match self {
            FieldValue::Bool { .. } => match value.as_bool() {
                Some(v) => store.set(path.clone(), v),
                None => return false,
            },
            FieldValue::U32 { .. } | FieldValue::Flags { .. } | FieldValue::Enum { .. } => {
                match value.to_u32() {
                    Some(v) => store.set(path.clone(), v),
                    None => return false,
                }
            }
            FieldValue::S32 { .. } => match value.to_s32() {
                Some(v) => store.set(path.clone(), v),
                None => return false,
            },
            FieldValue::F32 { min, max, .. } => match value.to_f32() {
                Some(v) => store.set(path.clone(), v.clamp(*min, *max)),
                None => return false,
            },
            FieldValue::Str { .. } => match value.as_str() {
                Some(v) => store.set(path.clone(), v.to_owned()),
                None => return false,
            },
        }
        true
    }
}

/// Structured leaves. Each holds its cached projection of the store (or, for
/// the text buffer, the buffer engine itself, whose text lives outside the
/// store and carries its own undo history).
#[derive(Debug)]
pub enum ContainerValue {
    Vector(VectorValue),
    Vector2D(Vector2DValue),
    U32Set(U32SetValue),
    AdjacencyList(AdjacencyListValue),
    Navigable(NavigableValue),
    TextBuffer(Box<TextBuffer>),
}

impl ContainerValue {
    fn refresh(&mut self, store: &Store, path: &StorePath) {
        match self {
            ContainerValue::Vector(value) => value.refresh(store, path),
            ContainerValue::Vector2D(value) => value.refresh(store, path),
            ContainerValue::U32Set(value) => value.refresh(store, path),
            ContainerValue::AdjacencyList(value) => value.refresh(store, path),
            ContainerValue::Navigable(value) => value.refresh(store, path),
            ContainerValue::TextBuffer(buffer) => {
                // The buffer mirrors its text into a store leaf. When the
                // store side moved without the buffer (project undo/redo or
                // load), adopt the store's text; the buffer's own edits have
                // already been mirrored, so this is a no-op for them.
                if let Some(text) = store.find::<String>(path) {
                    if text != buffer.get_text() {
                        buffer.set_text(&text);
                        buffer.commit();
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum ComponentKind {
    Group,
    Field(FieldValue),
    Container(ContainerValue),
}

#[derive(Debug)]
pub struct Component {
    pub id: ComponentId,
    pub parent: Option<ComponentId>,
    pub children: Vec<ComponentId>,
    pub path_segment: String,
    pub path: StorePath,
    pub name: String,
    pub help: String,
    /// `"{name}##{segment}"`: widget identity stays stable across renames.
    pub imgui_label: String,
    pub window_flags: WindowFlags,
    pub kind: ComponentKind,
}

impl Component {
    pub fn is_leaf(&self) -> bool {
        !matches!(self.kind, ComponentKind::Group)
    }

    pub fn field(&self) -> Option<&FieldValue> {
        match &self.kind {
            ComponentKind::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn container(&self) -> Option<&ContainerValue> {
        match &self.kind {
            ComponentKind::Container(container) => Some(container),
            _ => None,
        }
    }

    pub fn text_buffer(&self) -> Option<&TextBuffer> {
        match &self.kind {
            ComponentKind::Container(ContainerValue::TextBuffer(buffer)) => Some(buffer),
            _ => None,
        }
    }

    pub fn text_buffer_mut(&mut self) -> Option<&mut TextBuffer> {
        match &mut self.kind {
            ComponentKind::Container(ContainerValue::TextBuffer(buffer)) => Some(buffer),
            _ => None,
        }
    }
}

/// Arguments shared by all component constructors.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComponentArgs<'a> {
    pub meta: &'a str,
    pub path_prefix: Option<&'a str>,
    pub window_flags: WindowFlags,
}

impl<'a> ComponentArgs<'a> {
    pub fn meta(meta: &'a str) -> Self {
        ComponentArgs {
            meta,
            ..ComponentArgs::default()
        }
    }
}

/// The arena and its indexes.
#[derive(Debug)]
pub struct ComponentTree {
    components: IntMap<ComponentId, Component>,
    id_by_path: HashMap<StorePath, ComponentId>,
    root: ComponentId,
}

impl Default for ComponentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentTree {
    pub fn new() -> Self {
        let root_id = generate_id(ComponentId(0), "");
        let root = Component {
            id: root_id,
            parent: None,
            children: vec![],
            path_segment: String::new(),
            path: StorePath::root(),
            name: String::new(),
            help: String::new(),
            imgui_label: String::new(),
            window_flags: WINDOW_FLAGS_NONE,
            kind: ComponentKind::Group,
        };
        let mut components = IntMap::default();
        components.insert(root_id, root);
        let mut id_by_path = HashMap::new();
        id_by_path.insert(StorePath::root(), root_id);
        ComponentTree {
            components,
            id_by_path,
            root: root_id,
        }
    }

    pub fn root(&self) -> ComponentId {
        self.root
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components.get_mut(&id)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    pub fn by_path(&self, path: &StorePath) -> Option<ComponentId> {
        self.id_by_path.get(path).copied()
    }

    /// The component at `path`, or its nearest ancestor that is one. Used to
    /// route per-element patch paths (`/Vector/3`) to their container.
    pub fn find_nearest(&self, path: &StorePath) -> Option<ComponentId> {
        let mut current = path.clone();
        loop {
            if let Some(id) = self.by_path(&current) {
                return Some(id);
            }
            current = current.parent()?;
        }
    }

    /// Depth-first pre-order walk.
    pub fn depth_first(&self) -> Vec<ComponentId> {
        let mut result = vec![];
        let mut to_visit = vec![self.root];
        while let Some(id) = to_visit.pop() {
            let Some(component) = self.get(id) else {
                continue;
            };
            result.push(id);
            for &child in component.children.iter().rev() {
                to_visit.push(child);
            }
        }
        result
    }

    fn add(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        kind: ComponentKind,
    ) -> ComponentId {
        let parent_component = self.components.get(&parent).expect("unknown parent id");
        let path = match args.path_prefix {
            Some(prefix) => parent_component.path.join(prefix).join(segment),
            None => parent_component.path.join(segment),
        };
        let (name_override, help) = parse_meta(args.meta);
        let name = name_override.unwrap_or_else(|| pascal_to_sentence_case(segment));
        let imgui_label = if name.is_empty() {
            String::new()
        } else {
            match args.path_prefix {
                Some(prefix) => format!("{name}##{prefix}/{segment}"),
                None => format!("{name}##{segment}"),
            }
        };
        let id = generate_id(parent_component.id, &imgui_label);
        debug_assert!(
            !self.components.contains_key(&id),
            "component id collision at {path}"
        );
        let component = Component {
            id,
            parent: Some(parent),
            children: vec![],
            path_segment: segment.to_owned(),
            path: path.clone(),
            name,
            help,
            imgui_label,
            window_flags: args.window_flags,
            kind,
        };
        self.components.insert(id, component);
        self.id_by_path.insert(path, id);
        self.components
            .get_mut(&parent)
            .unwrap()
            .children
            .push(id);
        id
    }

    /// Removes a component and its descendants from the arena, the indexes,
    /// and its parent's child list.
    pub fn remove(&mut self, id: ComponentId) {
        let Some(component) = self.components.get(&id) else {
            return;
        };
        for child in component.children.clone() {
            self.remove(child);
        }
        let Some(component) = self.components.remove(&id) else {
            return;
        };
        self.id_by_path.remove(&component.path);
        if let Some(parent) = component.parent.and_then(|p| self.components.get_mut(&p)) {
            parent.children.retain(|&child| child != id);
        }
    }

    pub fn add_group(&mut self, parent: ComponentId, segment: &str, args: ComponentArgs) -> ComponentId {
        self.add(parent, segment, args, ComponentKind::Group)
    }

    pub fn add_bool(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        default: bool,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Field(FieldValue::Bool {
                value: default,
                default,
            }),
        )
    }

    pub fn add_u32(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        default: u32,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Field(FieldValue::U32 {
                value: default,
                default,
            }),
        )
    }

    pub fn add_s32(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        default: i32,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Field(FieldValue::S32 {
                value: default,
                default,
            }),
        )
    }

    pub fn add_f32(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        default: f32,
        min: f32,
        max: f32,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Field(FieldValue::F32 {
                value: default,
                default,
                min,
                max,
            }),
        )
    }

    pub fn add_string(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        default: &str,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Field(FieldValue::Str {
                value: default.to_owned(),
                default: default.to_owned(),
            }),
        )
    }

    pub fn add_flags(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        default: u32,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Field(FieldValue::Flags {
                value: default,
                default,
            }),
        )
    }

    pub fn add_enum(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        options: Vec<String>,
        default: u32,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Field(FieldValue::Enum {
                value: default,
                default,
                options,
            }),
        )
    }

    pub fn add_vector(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        kind: PrimitiveKind,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Container(ContainerValue::Vector(VectorValue::new(kind))),
        )
    }

    pub fn add_vector2d(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        kind: PrimitiveKind,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Container(ContainerValue::Vector2D(Vector2DValue::new(kind))),
        )
    }

    pub fn add_u32_set(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Container(ContainerValue::U32Set(U32SetValue::default())),
        )
    }

    pub fn add_adjacency_list(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Container(ContainerValue::AdjacencyList(
                AdjacencyListValue::default(),
            )),
        )
    }

    pub fn add_navigable(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        capacity: Option<usize>,
    ) -> ComponentId {
        self.add(
            parent,
            segment,
            args,
            ComponentKind::Container(ContainerValue::Navigable(NavigableValue::with_capacity(
                capacity,
            ))),
        )
    }

    /// Adds a text buffer with a `LastOpenedFilePath` child field.
    pub fn add_text_buffer(
        &mut self,
        parent: ComponentId,
        segment: &str,
        args: ComponentArgs,
        text: &str,
        language_id: LanguageId,
    ) -> ComponentId {
        let id = self.add(
            parent,
            segment,
            args,
            ComponentKind::Container(ContainerValue::TextBuffer(Box::new(TextBuffer::new(
                text,
                language_id,
            )))),
        );
        self.add_string(id, "LastOpenedFilePath", ComponentArgs::default(), "");
        id
    }

    /// Writes every field's default into the store (project construction and
    /// empty-project reset).
    pub fn init_store(&self, store: &mut Store) {
        for id in self.depth_first() {
            let component = self.get(id).unwrap();
            if let ComponentKind::Field(field) = &component.kind {
                field.init_store(store, &component.path);
            }
        }
    }

    /// Refreshes every cached value from the store.
    pub fn refresh_all(&mut self, store: &Store) {
        for id in self.depth_first() {
            self.refresh_component(id, store);
        }
    }

    fn refresh_component(&mut self, id: ComponentId, store: &Store) {
        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        let path = component.path.clone();
        match &mut component.kind {
            ComponentKind::Group => {}
            ComponentKind::Field(field) => field.refresh(store, &path),
            ComponentKind::Container(container) => container.refresh(store, &path),
        }
    }

    /// Component ids affected by the patch, in patch path order, each id at
    /// most once. Ops whose path has no exact component route to the nearest
    /// component ancestor (the owning container).
    pub fn affected_ids(&self, patch: &Patch) -> Vec<ComponentId> {
        let mut affected = IndexSet::new();
        for path in patch.paths() {
            if let Some(id) = self.find_nearest(&path) {
                affected.insert(id);
            }
        }
        affected.into_iter().collect()
    }

    /// Refreshes only the components the patch touches. Returns the affected
    /// ids so the caller can fan out notifications afterwards (two-phase:
    /// caches settle before any listener runs).
    pub fn refresh_changed(&mut self, store: &Store, patch: &Patch) -> Vec<ComponentId> {
        let affected = self.affected_ids(patch);
        for &id in &affected {
            self.refresh_component(id, store);
        }
        affected
    }

    /// Flattens the tree depth-first into one object keyed by JSON pointers.
    /// Containers dump their own JSON as a string leaf, so flattening stays
    /// lossless.
    pub fn to_json(&self, store: &Store) -> JsonValue {
        let mut flat = serde_json::Map::new();
        for id in self.depth_first() {
            let component = self.get(id).unwrap();
            if let Some(leaf) = self.component_to_json(component, store) {
                flat.insert(component.path.to_internal_string(), leaf);
            }
        }
        JsonValue::Object(flat)
    }

    fn component_to_json(&self, component: &Component, store: &Store) -> Option<JsonValue> {
        match &component.kind {
            ComponentKind::Group => None,
            ComponentKind::Field(field) => {
                let mut refreshed = field.clone();
                refreshed.refresh(store, &component.path);
                serde_json::to_value(refreshed.to_primitive()).ok()
            }
            ComponentKind::Container(container) => container_to_json(container, store, &component.path),
        }
    }

    /// Routes each pointer of a (flat or nested) JSON document to the owning
    /// component, writing parsed values into `store`. Unknown pointers are
    /// logged and ignored.
    pub fn set_json(&mut self, json: &JsonValue, store: &mut Store) {
        let mut flat = serde_json::Map::new();
        flatten_json("", json, &mut flat);
        for (pointer, value) in &flat {
            let path = StorePath::from(pointer.as_str());
            let Some(id) = self.by_path(&path) else {
                warn!(%pointer, "ignoring unknown path in project json");
                continue;
            };
            self.component_set_json(id, value, store);
        }
    }

    fn component_set_json(&mut self, id: ComponentId, value: &JsonValue, store: &mut Store) {
        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        let path = component.path.clone();
        match &mut component.kind {
            ComponentKind::Group => {}
            ComponentKind::Field(field) => {
                match serde_json::from_value::<Primitive>(value.clone()) {
                    Ok(primitive) => {
                        if !field.write(store, &path, &primitive) {
                            warn!(%path, "ignoring project value of mismatched kind");
                        }
                    }
                    Err(error) => warn!(%path, %error, "ignoring unparsable project value"),
                }
            }
            ComponentKind::Container(container) => {
                container_set_json(container, value, store, &path);
            }
        }
    }
}

fn container_to_json(
    container: &ContainerValue,
    store: &Store,
    path: &StorePath,
) -> Option<JsonValue> {
    match container {
        ContainerValue::Vector(value) => {
            let elements = vector::read(store, path, value.kind);
            serde_json::to_string(&elements).ok().map(JsonValue::String)
        }
        ContainerValue::Vector2D(value) => {
            let elements = vector2d::read(store, path, value.kind);
            serde_json::to_string(&elements).ok().map(JsonValue::String)
        }
        ContainerValue::U32Set(_) => {
            let elements: Vec<u32> = store.u32_set(path).into_iter().collect();
            serde_json::to_string(&elements).ok().map(JsonValue::String)
        }
        ContainerValue::AdjacencyList(_) => {
            let pairs: Vec<(u32, u32)> = store.id_pairs(path).into_iter().collect();
            serde_json::to_string(&pairs).ok().map(JsonValue::String)
        }
        ContainerValue::Navigable(value) => {
            let mut refreshed = NavigableValue::with_capacity(value.capacity);
            refreshed.refresh(store, path);
            serde_json::to_string(&serde_json::json!({
                "cursor": refreshed.cursor,
                "items": refreshed.value,
            }))
            .ok()
            .map(JsonValue::String)
        }
        ContainerValue::TextBuffer(buffer) => Some(JsonValue::String(buffer.get_text())),
    }
}

fn container_set_json(
    container: &mut ContainerValue,
    value: &JsonValue,
    store: &mut Store,
    path: &StorePath,
) {
    match container {
        ContainerValue::Vector(vector_value) => {
            let Some(elements) = parse_dumped::<Vec<Primitive>>(value) else {
                return warn!(%path, "ignoring unparsable vector value");
            };
            vector::set(store, path, vector_value.kind, &elements);
        }
        ContainerValue::Vector2D(vector_value) => {
            let Some(elements) = parse_dumped::<Vec<Vec<Primitive>>>(value) else {
                return warn!(%path, "ignoring unparsable 2-d vector value");
            };
            vector2d::set(store, path, vector_value.kind, &elements);
        }
        ContainerValue::U32Set(_) => {
            let Some(elements) = parse_dumped::<Vec<u32>>(value) else {
                return warn!(%path, "ignoring unparsable set value");
            };
            store.clear_u32_set(path);
            for element in elements {
                store.insert_u32(path, element);
            }
        }
        ContainerValue::AdjacencyList(_) => {
            let Some(pairs) = parse_dumped::<Vec<(u32, u32)>>(value) else {
                return warn!(%path, "ignoring unparsable adjacency value");
            };
            store.clear_id_pairs(path);
            for pair in pairs {
                adjacency_list::connect(store, path, pair.0, pair.1);
            }
        }
        ContainerValue::Navigable(navigable_value) => {
            #[derive(serde::Deserialize)]
            struct Dumped {
                cursor: u32,
                items: Vec<u32>,
            }
            let Some(dumped) = parse_dumped::<Dumped>(value) else {
                return warn!(%path, "ignoring unparsable navigable value");
            };
            for item in &dumped.items {
                navigable::push(store, path, *item, navigable_value.capacity);
            }
            // Rewind to the saved cursor.
            let last = dumped.items.len().saturating_sub(1) as u32;
            for _ in dumped.cursor.min(last)..last {
                navigable::move_back(store, path);
            }
        }
        ContainerValue::TextBuffer(buffer) => {
            let Some(text) = value.as_str() else {
                return warn!(%path, "ignoring non-string text buffer value");
            };
            buffer.set_text(text);
            buffer.commit();
        }
    }
}

fn parse_dumped<T: serde::de::DeserializeOwned>(value: &JsonValue) -> Option<T> {
    let dumped = value.as_str()?;
    serde_json::from_str(dumped).ok()
}

/// Builds `/a/b` pointer keys from a nested JSON document; already-flat
/// documents pass through unchanged.
fn flatten_json(prefix: &str, value: &JsonValue, flat: &mut serde_json::Map<String, JsonValue>) {
    match value {
        JsonValue::Object(object) => {
            for (key, child) in object {
                if key.starts_with('/') && prefix.is_empty() {
                    // Flat form: keys are already full pointers.
                    flatten_json(key, child, flat);
                } else {
                    flatten_json(&format!("{prefix}/{key}"), child, flat);
                }
            }
        }
        _ => {
            flat.insert(prefix.to_owned(), value.clone());
        }
    }
}

/// Who to tell when a field changes. Listeners are components; callbacks are
/// registered per (field, listener) and fire after caches refresh.
pub type ListenerCallback = Box<dyn FnMut(ComponentId, ComponentId)>;

#[derive(Default)]
pub struct ListenerRegistry {
    by_field: IntMap<ComponentId, IndexMap<ComponentId, ListenerCallback>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<_> = self.by_field.keys().collect();
        f.debug_struct("ListenerRegistry")
            .field("fields", &fields)
            .finish()
    }
}

impl ListenerRegistry {
    pub fn register(
        &mut self,
        field: ComponentId,
        listener: ComponentId,
        callback: ListenerCallback,
    ) {
        self.by_field
            .entry(field)
            .or_default()
            .insert(listener, callback);
    }

    /// Removes `listener` from every field's listener list (component
    /// destruction).
    pub fn unregister(&mut self, listener: ComponentId) {
        for listeners in self.by_field.values_mut() {
            listeners.shift_remove(&listener);
        }
    }

    /// Fires callbacks for each changed id: changed ids in the given (patch
    /// path) order, listeners of one id in registration order. Each listener
    /// runs at most once per changed id per call.
    pub fn notify(&mut self, changed_ids: &[ComponentId]) {
        for &changed in changed_ids {
            if let Some(listeners) = self.by_field.get_mut(&changed) {
                for (&listener, callback) in listeners.iter_mut() {
                    callback(listener, changed);
                }
            }
        }
    }

    pub fn has_listeners(&self, field: ComponentId) -> bool {
        self.by_field
            .get(&field)
            .is_some_and(|listeners| !listeners.is_empty())
    }
}

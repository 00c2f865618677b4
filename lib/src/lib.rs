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

//! The FlowGrid core: a typed, path-addressed persistent store with a
//! component tree projected over it, an action/gesture/undo system, project
//! persistence, and the multi-cursor text buffer.
//!
//! The GUI, the audio graph, and the file dialogs are external consumers:
//! they read committed state and communicate by enqueueing actions on the
//! [`engine::Engine`].

#![deny(unused_must_use)]

pub mod action;
pub mod component;
pub mod containers;
pub mod engine;
pub mod history;
pub mod patch;
pub mod path;
pub mod preferences;
pub mod primitive;
pub mod project;
pub mod settings;
pub mod store;
pub mod text;

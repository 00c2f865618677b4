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

//! Actions: immutable, JSON-serializable messages describing one intended
//! state change.
//!
//! Each action carries all the information needed to apply it. Actions are
//! grouped per subsystem and unioned into [`Action`]; the JSON form is the
//! two-element array `[path, payload]`, where the path (e.g.
//! `"Primitive/Bool/Toggle"`) selects the variant. Actions whose `is_saved`
//! flag is false never enter the undo history or saved projects.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::path::StorePath;

/// Metadata every action variant exposes statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionMetadata {
    /// Unique type path, also the JSON discriminant.
    pub path: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Menu entry label; defaults to `name`.
    pub menu_label: &'static str,
    /// Whether the action may enter gestures, the undo history, and saved
    /// action-format projects.
    pub is_saved: bool,
}

/// Outcome of merging two chronologically consecutive actions.
///
/// Only pairs are considered: one could imagine idempotent cycles that are
/// detectable only from more than two actions (e.g. incrementing modulo N),
/// but those are left unmerged.
#[derive(Debug, Clone, PartialEq)]
pub enum Merged {
    /// The pair collapses into this one action.
    Merged(Action),
    /// The pair cancels out entirely (e.g. two toggles of the same value).
    Cancel,
    /// The pair doesn't merge; keep both.
    Unmerged,
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action path {0:?}")]
    UnknownPath(String),
    #[error("malformed action: {0}")]
    Malformed(String),
    #[error("malformed action payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub mod store {
    use serde::{Deserialize, Serialize};

    use crate::patch::Patch;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ApplyPatch {
        pub patch: Patch,
    }
}

pub mod primitive {
    use serde::{Deserialize, Serialize};

    use crate::path::StorePath;
    use crate::primitive::Primitive;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ToggleBool {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SetFlags {
        pub path: StorePath,
        pub value: i32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SetValue {
        pub path: StorePath,
        pub value: Primitive,
    }
}

pub mod container {
    use serde::{Deserialize, Serialize};

    use crate::path::StorePath;
    use crate::primitive::Primitive;
    use crate::store::Id;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct VectorSet {
        pub path: StorePath,
        pub value: Vec<Primitive>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct VectorSetAt {
        pub path: StorePath,
        pub i: u32,
        pub value: Primitive,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct VectorResize {
        pub path: StorePath,
        pub size: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Vector2DSet {
        pub path: StorePath,
        pub value: Vec<Vec<Primitive>>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SetInsert {
        pub path: StorePath,
        pub value: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SetErase {
        pub path: StorePath,
        pub value: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SetClear {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ToggleConnection {
        pub path: StorePath,
        pub source: Id,
        pub destination: Id,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct NavigablePush {
        pub path: StorePath,
        pub value: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct NavigableBack {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct NavigableForward {
        pub path: StorePath,
    }
}

pub mod text_buffer {
    use std::path::PathBuf;

    use serde::{Deserialize, Serialize};

    use crate::path::StorePath;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Set {
        pub path: StorePath,
        pub value: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Open {
        pub path: StorePath,
        pub file_path: PathBuf,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Save {
        pub path: StorePath,
        pub file_path: PathBuf,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ShowOpenDialog {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ShowSaveDialog {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Undo {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Redo {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Copy {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Cut {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Paste {
        pub path: StorePath,
        /// Clipboard contents, staged by the shell when translating input.
        pub text: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Delete {
        pub path: StorePath,
        pub word: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Backspace {
        pub path: StorePath,
        pub word: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct DeleteCurrentLines {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ChangeCurrentLinesIndentation {
        pub path: StorePath,
        pub increase: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MoveCurrentLines {
        pub path: StorePath,
        pub up: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ToggleLineComment {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct EnterChar {
        pub path: StorePath,
        pub value: char,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ToggleOverwrite {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MoveCursorsLines {
        pub path: StorePath,
        pub amount: i32,
        pub select: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PageCursorsLines {
        pub path: StorePath,
        pub up: bool,
        pub select: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MoveCursorsChar {
        pub path: StorePath,
        pub right: bool,
        pub select: bool,
        pub word: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MoveCursorsTop {
        pub path: StorePath,
        pub select: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MoveCursorsBottom {
        pub path: StorePath,
        pub select: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MoveCursorsStartLine {
        pub path: StorePath,
        pub select: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MoveCursorsEndLine {
        pub path: StorePath,
        pub select: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SelectAll {
        pub path: StorePath,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SelectNextOccurrence {
        pub path: StorePath,
    }
}

pub mod project {
    use std::path::PathBuf;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct OpenEmpty {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct OpenDefault {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Open {
        pub file_path: PathBuf,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SaveCurrent {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SaveDefault {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Save {
        pub file_path: PathBuf,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ShowOpenDialog {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ShowSaveDialog {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Undo {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Redo {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SetHistoryIndex {
        pub index: u32,
    }
}

pub mod windows {
    use serde::{Deserialize, Serialize};

    use crate::store::Id;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ToggleVisible {
        pub id: Id,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ToggleDebug {
        pub id: Id,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    ApplyPatch(store::ApplyPatch),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveAction {
    ToggleBool(primitive::ToggleBool),
    SetFlags(primitive::SetFlags),
    SetValue(primitive::SetValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerAction {
    VectorSet(container::VectorSet),
    VectorSetAt(container::VectorSetAt),
    VectorResize(container::VectorResize),
    Vector2DSet(container::Vector2DSet),
    SetInsert(container::SetInsert),
    SetErase(container::SetErase),
    SetClear(container::SetClear),
    ToggleConnection(container::ToggleConnection),
    NavigablePush(container::NavigablePush),
    NavigableBack(container::NavigableBack),
    NavigableForward(container::NavigableForward),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextBufferAction {
    Set(text_buffer::Set),
    Open(text_buffer::Open),
    Save(text_buffer::Save),
    ShowOpenDialog(text_buffer::ShowOpenDialog),
    ShowSaveDialog(text_buffer::ShowSaveDialog),
    Undo(text_buffer::Undo),
    Redo(text_buffer::Redo),
    Copy(text_buffer::Copy),
    Cut(text_buffer::Cut),
    Paste(text_buffer::Paste),
    Delete(text_buffer::Delete),
    Backspace(text_buffer::Backspace),
    DeleteCurrentLines(text_buffer::DeleteCurrentLines),
    ChangeCurrentLinesIndentation(text_buffer::ChangeCurrentLinesIndentation),
    MoveCurrentLines(text_buffer::MoveCurrentLines),
    ToggleLineComment(text_buffer::ToggleLineComment),
    EnterChar(text_buffer::EnterChar),
    ToggleOverwrite(text_buffer::ToggleOverwrite),
    MoveCursorsLines(text_buffer::MoveCursorsLines),
    PageCursorsLines(text_buffer::PageCursorsLines),
    MoveCursorsChar(text_buffer::MoveCursorsChar),
    MoveCursorsTop(text_buffer::MoveCursorsTop),
    MoveCursorsBottom(text_buffer::MoveCursorsBottom),
    MoveCursorsStartLine(text_buffer::MoveCursorsStartLine),
    MoveCursorsEndLine(text_buffer::MoveCursorsEndLine),
    SelectAll(text_buffer::SelectAll),
    SelectNextOccurrence(text_buffer::SelectNextOccurrence),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectAction {
    OpenEmpty(project::OpenEmpty),
    OpenDefault(project::OpenDefault),
    Open(project::Open),
    SaveCurrent(project::SaveCurrent),
    SaveDefault(project::SaveDefault),
    Save(project::Save),
    ShowOpenDialog(project::ShowOpenDialog),
    ShowSaveDialog(project::ShowSaveDialog),
    Undo(project::Undo),
    Redo(project::Redo),
    SetHistoryIndex(project::SetHistoryIndex),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowsAction {
    ToggleVisible(windows::ToggleVisible),
    ToggleDebug(windows::ToggleDebug),
}

/// The union of all subsystem actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Store(StoreAction),
    Primitive(PrimitiveAction),
    Container(ContainerAction),
    TextBuffer(TextBufferAction),
    Project(ProjectAction),
    Windows(WindowsAction),
}

impl From<StoreAction> for Action {
    fn from(action: StoreAction) -> Self {
        Action::Store(action)
    }
}
impl From<PrimitiveAction> for Action {
    fn from(action: PrimitiveAction) -> Self {
        Action::Primitive(action)
    }
}
impl From<ContainerAction> for Action {
    fn from(action: ContainerAction) -> Self {
        Action::Container(action)
    }
}
impl From<TextBufferAction> for Action {
    fn from(action: TextBufferAction) -> Self {
        Action::TextBuffer(action)
    }
}
impl From<ProjectAction> for Action {
    fn from(action: ProjectAction) -> Self {
        Action::Project(action)
    }
}
impl From<WindowsAction> for Action {
    fn from(action: WindowsAction) -> Self {
        Action::Windows(action)
    }
}

macro_rules! metadata {
    ($path:literal, $name:literal, saved) => {
        &ActionMetadata {
            path: $path,
            name: $name,
            menu_label: $name,
            is_saved: true,
        }
    };
    ($path:literal, $name:literal, unsaved) => {
        &ActionMetadata {
            path: $path,
            name: $name,
            menu_label: $name,
            is_saved: false,
        }
    };
    ($path:literal, $name:literal, $menu:literal, unsaved) => {
        &ActionMetadata {
            path: $path,
            name: $name,
            menu_label: $menu,
            is_saved: false,
        }
    };
}

impl Action {
    pub fn metadata(&self) -> &'static ActionMetadata {
        use Action::*;
        match self {
            Store(StoreAction::ApplyPatch(_)) => {
                metadata!("Store/ApplyPatch", "Apply patch", saved)
            }

            Primitive(PrimitiveAction::ToggleBool(_)) => {
                metadata!("Primitive/Bool/Toggle", "Toggle", saved)
            }
            Primitive(PrimitiveAction::SetFlags(_)) => {
                metadata!("Primitive/Flags/Set", "Set flags", saved)
            }
            Primitive(PrimitiveAction::SetValue(_)) => {
                metadata!("Primitive/Value/Set", "Set value", saved)
            }

            Container(ContainerAction::VectorSet(_)) => {
                metadata!("Container/Vector/Set", "Set vector", saved)
            }
            Container(ContainerAction::VectorSetAt(_)) => {
                metadata!("Container/Vector/SetAt", "Set vector element", saved)
            }
            Container(ContainerAction::VectorResize(_)) => {
                metadata!("Container/Vector/Resize", "Resize vector", saved)
            }
            Container(ContainerAction::Vector2DSet(_)) => {
                metadata!("Container/Vector2D/Set", "Set 2D vector", saved)
            }
            Container(ContainerAction::SetInsert(_)) => {
                metadata!("Container/Set/Insert", "Insert into set", saved)
            }
            Container(ContainerAction::SetErase(_)) => {
                metadata!("Container/Set/Erase", "Erase from set", saved)
            }
            Container(ContainerAction::SetClear(_)) => {
                metadata!("Container/Set/Clear", "Clear set", saved)
            }
            Container(ContainerAction::ToggleConnection(_)) => {
                metadata!(
                    "Container/AdjacencyList/ToggleConnection",
                    "Toggle connection",
                    saved
                )
            }
            Container(ContainerAction::NavigablePush(_)) => {
                metadata!("Container/Navigable/Push", "Push", saved)
            }
            Container(ContainerAction::NavigableBack(_)) => {
                metadata!("Container/Navigable/Back", "Back", saved)
            }
            Container(ContainerAction::NavigableForward(_)) => {
                metadata!("Container/Navigable/Forward", "Forward", saved)
            }

            TextBuffer(TextBufferAction::Set(_)) => metadata!("TextBuffer/Set", "Set text", saved),
            TextBuffer(TextBufferAction::Open(_)) => metadata!("TextBuffer/Open", "Open", saved),
            TextBuffer(TextBufferAction::Save(_)) => {
                metadata!("TextBuffer/Save", "Save", unsaved)
            }
            TextBuffer(TextBufferAction::ShowOpenDialog(_)) => {
                metadata!(
                    "TextBuffer/ShowOpenDialog",
                    "Show open dialog",
                    "Open file...",
                    unsaved
                )
            }
            TextBuffer(TextBufferAction::ShowSaveDialog(_)) => {
                metadata!(
                    "TextBuffer/ShowSaveDialog",
                    "Show save dialog",
                    "Save file as...",
                    unsaved
                )
            }
            TextBuffer(TextBufferAction::Undo(_)) => metadata!("TextBuffer/Undo", "Undo", saved),
            TextBuffer(TextBufferAction::Redo(_)) => metadata!("TextBuffer/Redo", "Redo", saved),
            TextBuffer(TextBufferAction::Copy(_)) => {
                metadata!("TextBuffer/Copy", "Copy", unsaved)
            }
            TextBuffer(TextBufferAction::Cut(_)) => metadata!("TextBuffer/Cut", "Cut", saved),
            TextBuffer(TextBufferAction::Paste(_)) => {
                metadata!("TextBuffer/Paste", "Paste", saved)
            }
            TextBuffer(TextBufferAction::Delete(_)) => {
                metadata!("TextBuffer/Delete", "Delete", saved)
            }
            TextBuffer(TextBufferAction::Backspace(_)) => {
                metadata!("TextBuffer/Backspace", "Backspace", saved)
            }
            TextBuffer(TextBufferAction::DeleteCurrentLines(_)) => {
                metadata!("TextBuffer/DeleteCurrentLines", "Delete current lines", saved)
            }
            TextBuffer(TextBufferAction::ChangeCurrentLinesIndentation(_)) => {
                metadata!(
                    "TextBuffer/ChangeCurrentLinesIndentation",
                    "Change current lines indentation",
                    saved
                )
            }
            TextBuffer(TextBufferAction::MoveCurrentLines(_)) => {
                metadata!("TextBuffer/MoveCurrentLines", "Move current lines", saved)
            }
            TextBuffer(TextBufferAction::ToggleLineComment(_)) => {
                metadata!("TextBuffer/ToggleLineComment", "Toggle line comment", saved)
            }
            TextBuffer(TextBufferAction::EnterChar(_)) => {
                metadata!("TextBuffer/EnterChar", "Enter character", saved)
            }
            TextBuffer(TextBufferAction::ToggleOverwrite(_)) => {
                metadata!("TextBuffer/ToggleOverwrite", "Toggle overwrite", saved)
            }
            TextBuffer(TextBufferAction::MoveCursorsLines(_)) => {
                metadata!("TextBuffer/MoveCursorsLines", "Move cursors lines", saved)
            }
            TextBuffer(TextBufferAction::PageCursorsLines(_)) => {
                metadata!("TextBuffer/PageCursorsLines", "Page cursors lines", saved)
            }
            TextBuffer(TextBufferAction::MoveCursorsChar(_)) => {
                metadata!("TextBuffer/MoveCursorsChar", "Move cursors char", saved)
            }
            TextBuffer(TextBufferAction::MoveCursorsTop(_)) => {
                metadata!("TextBuffer/MoveCursorsTop", "Move cursors top", saved)
            }
            TextBuffer(TextBufferAction::MoveCursorsBottom(_)) => {
                metadata!("TextBuffer/MoveCursorsBottom", "Move cursors bottom", saved)
            }
            TextBuffer(TextBufferAction::MoveCursorsStartLine(_)) => {
                metadata!(
                    "TextBuffer/MoveCursorsStartLine",
                    "Move cursors start line",
                    saved
                )
            }
            TextBuffer(TextBufferAction::MoveCursorsEndLine(_)) => {
                metadata!(
                    "TextBuffer/MoveCursorsEndLine",
                    "Move cursors end line",
                    saved
                )
            }
            TextBuffer(TextBufferAction::SelectAll(_)) => {
                metadata!("TextBuffer/SelectAll", "Select all", saved)
            }
            TextBuffer(TextBufferAction::SelectNextOccurrence(_)) => {
                metadata!(
                    "TextBuffer/SelectNextOccurrence",
                    "Select next occurrence",
                    saved
                )
            }

            Project(ProjectAction::OpenEmpty(_)) => {
                metadata!("Project/OpenEmpty", "Open empty", "New project", unsaved)
            }
            Project(ProjectAction::OpenDefault(_)) => {
                metadata!(
                    "Project/OpenDefault",
                    "Open default",
                    "Open default project",
                    unsaved
                )
            }
            Project(ProjectAction::Open(_)) => {
                metadata!("Project/Open", "Open", "Open project", unsaved)
            }
            Project(ProjectAction::SaveCurrent(_)) => {
                metadata!("Project/SaveCurrent", "Save current", "Save project", unsaved)
            }
            Project(ProjectAction::SaveDefault(_)) => {
                metadata!(
                    "Project/SaveDefault",
                    "Save default",
                    "Save default project",
                    unsaved
                )
            }
            Project(ProjectAction::Save(_)) => {
                metadata!("Project/Save", "Save", "Save project as...", unsaved)
            }
            Project(ProjectAction::ShowOpenDialog(_)) => {
                metadata!(
                    "Project/ShowOpenDialog",
                    "Show open dialog",
                    "Open project...",
                    unsaved
                )
            }
            Project(ProjectAction::ShowSaveDialog(_)) => {
                metadata!(
                    "Project/ShowSaveDialog",
                    "Show save dialog",
                    "Save project as...",
                    unsaved
                )
            }
            Project(ProjectAction::Undo(_)) => metadata!("Project/Undo", "Undo", unsaved),
            Project(ProjectAction::Redo(_)) => metadata!("Project/Redo", "Redo", unsaved),
            Project(ProjectAction::SetHistoryIndex(_)) => {
                metadata!("Project/SetHistoryIndex", "Set history index", unsaved)
            }

            Windows(WindowsAction::ToggleVisible(_)) => {
                metadata!("Windows/ToggleVisible", "Toggle visible", saved)
            }
            Windows(WindowsAction::ToggleDebug(_)) => {
                metadata!("Windows/ToggleDebug", "Toggle debug", saved)
            }
        }
    }

    pub fn path(&self) -> &'static str {
        self.metadata().path
    }

    pub fn is_saved(&self) -> bool {
        self.metadata().is_saved
    }

    /// The path of the component this action targets, for component actions.
    pub fn component_path(&self) -> Option<&StorePath> {
        use Action::*;
        match self {
            Primitive(PrimitiveAction::ToggleBool(a)) => Some(&a.path),
            Primitive(PrimitiveAction::SetFlags(a)) => Some(&a.path),
            Primitive(PrimitiveAction::SetValue(a)) => Some(&a.path),
            Container(ContainerAction::VectorSet(a)) => Some(&a.path),
            Container(ContainerAction::VectorSetAt(a)) => Some(&a.path),
            Container(ContainerAction::VectorResize(a)) => Some(&a.path),
            Container(ContainerAction::Vector2DSet(a)) => Some(&a.path),
            Container(ContainerAction::SetInsert(a)) => Some(&a.path),
            Container(ContainerAction::SetErase(a)) => Some(&a.path),
            Container(ContainerAction::SetClear(a)) => Some(&a.path),
            Container(ContainerAction::ToggleConnection(a)) => Some(&a.path),
            Container(ContainerAction::NavigablePush(a)) => Some(&a.path),
            Container(ContainerAction::NavigableBack(a)) => Some(&a.path),
            Container(ContainerAction::NavigableForward(a)) => Some(&a.path),
            TextBuffer(action) => Some(text_buffer_path(action)),
            Store(_) | Project(_) | Windows(_) => None,
        }
    }

    /// Merges `self` (earlier) with `other` (later).
    pub fn merge(&self, other: &Action) -> Merged {
        use Action::*;
        match (self, other) {
            (Store(StoreAction::ApplyPatch(a)), Store(StoreAction::ApplyPatch(b)))
                if a.patch.base == b.patch.base =>
            {
                let merged = a.patch.merge(&b.patch);
                if merged.is_empty() {
                    Merged::Cancel
                } else {
                    Merged::Merged(Action::Store(StoreAction::ApplyPatch(store::ApplyPatch {
                        patch: merged,
                    })))
                }
            }

            // Two toggles of the same value cancel out.
            (
                Primitive(PrimitiveAction::ToggleBool(a)),
                Primitive(PrimitiveAction::ToggleBool(b)),
            ) if a.path == b.path => Merged::Cancel,

            (Primitive(PrimitiveAction::SetFlags(a)), Primitive(PrimitiveAction::SetFlags(b)))
                if a.path == b.path =>
            {
                Merged::Merged(other.clone())
            }
            (Primitive(PrimitiveAction::SetValue(a)), Primitive(PrimitiveAction::SetValue(b)))
                if a.path == b.path =>
            {
                Merged::Merged(other.clone())
            }

            (
                Container(ContainerAction::VectorSet(a)),
                Container(ContainerAction::VectorSet(b)),
            ) if a.path == b.path => Merged::Merged(other.clone()),
            (
                Container(ContainerAction::VectorSetAt(a)),
                Container(ContainerAction::VectorSetAt(b)),
            ) if a.path == b.path && a.i == b.i => Merged::Merged(other.clone()),
            (
                Container(ContainerAction::VectorResize(a)),
                Container(ContainerAction::VectorResize(b)),
            ) if a.path == b.path => Merged::Merged(other.clone()),
            (
                Container(ContainerAction::Vector2DSet(a)),
                Container(ContainerAction::Vector2DSet(b)),
            ) if a.path == b.path => Merged::Merged(other.clone()),
            (Container(ContainerAction::SetClear(a)), Container(ContainerAction::SetClear(b)))
                if a.path == b.path =>
            {
                Merged::Merged(other.clone())
            }

            // Toggling the same connection twice cancels out.
            (
                Container(ContainerAction::ToggleConnection(a)),
                Container(ContainerAction::ToggleConnection(b)),
            ) if a.path == b.path && a.source == b.source && a.destination == b.destination => {
                Merged::Cancel
            }

            // A back/forward pair over the same stack cancels out.
            (
                Container(ContainerAction::NavigableBack(a)),
                Container(ContainerAction::NavigableForward(b)),
            ) if a.path == b.path => Merged::Cancel,
            (
                Container(ContainerAction::NavigableForward(a)),
                Container(ContainerAction::NavigableBack(b)),
            ) if a.path == b.path => Merged::Cancel,

            (TextBuffer(TextBufferAction::Set(a)), TextBuffer(TextBufferAction::Set(b)))
                if a.path == b.path =>
            {
                Merged::Merged(other.clone())
            }
            // An undo/redo pair over the same buffer cancels out.
            (TextBuffer(TextBufferAction::Undo(a)), TextBuffer(TextBufferAction::Redo(b)))
                if a.path == b.path =>
            {
                Merged::Cancel
            }
            (TextBuffer(TextBufferAction::Redo(a)), TextBuffer(TextBufferAction::Undo(b)))
                if a.path == b.path =>
            {
                Merged::Cancel
            }
            (
                TextBuffer(TextBufferAction::ToggleOverwrite(a)),
                TextBuffer(TextBufferAction::ToggleOverwrite(b)),
            ) if a.path == b.path => Merged::Cancel,

            // Toggling the same window twice cancels out.
            (Windows(WindowsAction::ToggleVisible(a)), Windows(WindowsAction::ToggleVisible(b)))
                if a.id == b.id =>
            {
                Merged::Cancel
            }
            (Windows(WindowsAction::ToggleDebug(a)), Windows(WindowsAction::ToggleDebug(b)))
                if a.id == b.id =>
            {
                Merged::Cancel
            }

            _ => Merged::Unmerged,
        }
    }

    /// The two-element array form `[path, payload]`.
    pub fn to_json(&self) -> JsonValue {
        let payload = self.payload_json();
        serde_json::json!([self.path(), payload])
    }

    fn payload_json(&self) -> JsonValue {
        use Action::*;
        let result = match self {
            Store(StoreAction::ApplyPatch(a)) => serde_json::to_value(a),
            Primitive(PrimitiveAction::ToggleBool(a)) => serde_json::to_value(a),
            Primitive(PrimitiveAction::SetFlags(a)) => serde_json::to_value(a),
            Primitive(PrimitiveAction::SetValue(a)) => serde_json::to_value(a),
            Container(ContainerAction::VectorSet(a)) => serde_json::to_value(a),
            Container(ContainerAction::VectorSetAt(a)) => serde_json::to_value(a),
            Container(ContainerAction::VectorResize(a)) => serde_json::to_value(a),
            Container(ContainerAction::Vector2DSet(a)) => serde_json::to_value(a),
            Container(ContainerAction::SetInsert(a)) => serde_json::to_value(a),
            Container(ContainerAction::SetErase(a)) => serde_json::to_value(a),
            Container(ContainerAction::SetClear(a)) => serde_json::to_value(a),
            Container(ContainerAction::ToggleConnection(a)) => serde_json::to_value(a),
            Container(ContainerAction::NavigablePush(a)) => serde_json::to_value(a),
            Container(ContainerAction::NavigableBack(a)) => serde_json::to_value(a),
            Container(ContainerAction::NavigableForward(a)) => serde_json::to_value(a),
            TextBuffer(action) => text_buffer_payload_json(action),
            Project(action) => project_payload_json(action),
            Windows(WindowsAction::ToggleVisible(a)) => serde_json::to_value(a),
            Windows(WindowsAction::ToggleDebug(a)) => serde_json::to_value(a),
        };
        result.unwrap_or(JsonValue::Null)
    }

    /// Reconstructs an action from its `[path, payload]` form.
    pub fn from_json(value: &JsonValue) -> Result<Action, ActionError> {
        let JsonValue::Array(parts) = value else {
            return Err(ActionError::Malformed(
                "expected a two-element array".into(),
            ));
        };
        let [path, payload] = parts.as_slice() else {
            return Err(ActionError::Malformed(
                "expected a two-element array".into(),
            ));
        };
        let Some(path) = path.as_str() else {
            return Err(ActionError::Malformed("expected a string path".into()));
        };
        let Some(constructor) = CONSTRUCTORS.get(path) else {
            return Err(ActionError::UnknownPath(path.to_owned()));
        };
        constructor(payload).map_err(ActionError::from)
    }
}

pub(crate) fn text_buffer_path(action: &TextBufferAction) -> &StorePath {
    use TextBufferAction::*;
    match action {
        Set(a) => &a.path,
        Open(a) => &a.path,
        Save(a) => &a.path,
        ShowOpenDialog(a) => &a.path,
        ShowSaveDialog(a) => &a.path,
        Undo(a) => &a.path,
        Redo(a) => &a.path,
        Copy(a) => &a.path,
        Cut(a) => &a.path,
        Paste(a) => &a.path,
        Delete(a) => &a.path,
        Backspace(a) => &a.path,
        DeleteCurrentLines(a) => &a.path,
        ChangeCurrentLinesIndentation(a) => &a.path,
        MoveCurrentLines(a) => &a.path,
        ToggleLineComment(a) => &a.path,
        EnterChar(a) => &a.path,
        ToggleOverwrite(a) => &a.path,
        MoveCursorsLines(a) => &a.path,
        PageCursorsLines(a) => &a.path,
        MoveCursorsChar(a) => &a.path,
        MoveCursorsTop(a) => &a.path,
        MoveCursorsBottom(a) => &a.path,
        MoveCursorsStartLine(a) => &a.path,
        MoveCursorsEndLine(a) => &a.path,
        SelectAll(a) => &a.path,
        SelectNextOccurrence(a) => &a.path,
    }
}

fn text_buffer_payload_json(action: &TextBufferAction) -> Result<JsonValue, serde_json::Error> {
    use TextBufferAction::*;
    match action {
        Set(a) => serde_json::to_value(a),
        Open(a) => serde_json::to_value(a),
        Save(a) => serde_json::to_value(a),
        ShowOpenDialog(a) => serde_json::to_value(a),
        ShowSaveDialog(a) => serde_json::to_value(a),
        Undo(a) => serde_json::to_value(a),
        Redo(a) => serde_json::to_value(a),
        Copy(a) => serde_json::to_value(a),
        Cut(a) => serde_json::to_value(a),
        Paste(a) => serde_json::to_value(a),
        Delete(a) => serde_json::to_value(a),
        Backspace(a) => serde_json::to_value(a),
        DeleteCurrentLines(a) => serde_json::to_value(a),
        ChangeCurrentLinesIndentation(a) => serde_json::to_value(a),
        MoveCurrentLines(a) => serde_json::to_value(a),
        ToggleLineComment(a) => serde_json::to_value(a),
        EnterChar(a) => serde_json::to_value(a),
        ToggleOverwrite(a) => serde_json::to_value(a),
        MoveCursorsLines(a) => serde_json::to_value(a),
        PageCursorsLines(a) => serde_json::to_value(a),
        MoveCursorsChar(a) => serde_json::to_value(a),
        MoveCursorsTop(a) => serde_json::to_value(a),
        MoveCursorsBottom(a) => serde_json::to_value(a),
        MoveCursorsStartLine(a) => serde_json::to_value(a),
        MoveCursorsEndLine(a) => serde_json::to_value(a),
        SelectAll(a) => serde_json::to_value(a),
        SelectNextOccurrence(a) => serde_json::to_value(a),
    }
}

fn project_payload_json(action: &ProjectAction) -> Result<JsonValue, serde_json::Error> {
    use ProjectAction::*;
    match action {
        OpenEmpty(a) => serde_json::to_value(a),
        OpenDefault(a) => serde_json::to_value(a),
        Open(a) => serde_json::to_value(a),
        SaveCurrent(a) => serde_json::to_value(a),
        SaveDefault(a) => serde_json::to_value(a),
        Save(a) => serde_json::to_value(a),
        ShowOpenDialog(a) => serde_json::to_value(a),
        ShowSaveDialog(a) => serde_json::to_value(a),
        Undo(a) => serde_json::to_value(a),
        Redo(a) => serde_json::to_value(a),
        SetHistoryIndex(a) => serde_json::to_value(a),
    }
}

type Constructor = fn(&JsonValue) -> Result<Action, serde_json::Error>;

macro_rules! constructor {
    ($group:ident, $variant:ident, $payload:ty) => {
        |payload: &JsonValue| {
            let inner: $payload = serde_json::from_value(payload.clone())?;
            Ok(Action::from($group::$variant(inner)))
        }
    };
}

/// Path-to-constructor table, built on first use.
static CONSTRUCTORS: Lazy<HashMap<&'static str, Constructor>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, Constructor> = HashMap::new();
    table.insert(
        "Store/ApplyPatch",
        constructor!(StoreAction, ApplyPatch, store::ApplyPatch),
    );

    table.insert(
        "Primitive/Bool/Toggle",
        constructor!(PrimitiveAction, ToggleBool, primitive::ToggleBool),
    );
    table.insert(
        "Primitive/Flags/Set",
        constructor!(PrimitiveAction, SetFlags, primitive::SetFlags),
    );
    table.insert(
        "Primitive/Value/Set",
        constructor!(PrimitiveAction, SetValue, primitive::SetValue),
    );

    table.insert(
        "Container/Vector/Set",
        constructor!(ContainerAction, VectorSet, container::VectorSet),
    );
    table.insert(
        "Container/Vector/SetAt",
        constructor!(ContainerAction, VectorSetAt, container::VectorSetAt),
    );
    table.insert(
        "Container/Vector/Resize",
        constructor!(ContainerAction, VectorResize, container::VectorResize),
    );
    table.insert(
        "Container/Vector2D/Set",
        constructor!(ContainerAction, Vector2DSet, container::Vector2DSet),
    );
    table.insert(
        "Container/Set/Insert",
        constructor!(ContainerAction, SetInsert, container::SetInsert),
    );
    table.insert(
        "Container/Set/Erase",
        constructor!(ContainerAction, SetErase, container::SetErase),
    );
    table.insert(
        "Container/Set/Clear",
        constructor!(ContainerAction, SetClear, container::SetClear),
    );
    table.insert(
        "Container/AdjacencyList/ToggleConnection",
        constructor!(ContainerAction, ToggleConnection, container::ToggleConnection),
    );
    table.insert(
        "Container/Navigable/Push",
        constructor!(ContainerAction, NavigablePush, container::NavigablePush),
    );
    table.insert(
        "Container/Navigable/Back",
        constructor!(ContainerAction, NavigableBack, container::NavigableBack),
    );
    table.insert(
        "Container/Navigable/Forward",
        constructor!(ContainerAction, NavigableForward, container::NavigableForward),
    );

    table.insert(
        "TextBuffer/Set",
        constructor!(TextBufferAction, Set, text_buffer::Set),
    );
    table.insert(
        "TextBuffer/Open",
        constructor!(TextBufferAction, Open, text_buffer::Open),
    );
    table.insert(
        "TextBuffer/Save",
        constructor!(TextBufferAction, Save, text_buffer::Save),
    );
    table.insert(
        "TextBuffer/ShowOpenDialog",
        constructor!(TextBufferAction, ShowOpenDialog, text_buffer::ShowOpenDialog),
    );
    table.insert(
        "TextBuffer/ShowSaveDialog",
        constructor!(TextBufferAction, ShowSaveDialog, text_buffer::ShowSaveDialog),
    );
    table.insert(
        "TextBuffer/Undo",
        constructor!(TextBufferAction, Undo, text_buffer::Undo),
    );
    table.insert(
        "TextBuffer/Redo",
        constructor!(TextBufferAction, Redo, text_buffer::Redo),
    );
    table.insert(
        "TextBuffer/Copy",
        constructor!(TextBufferAction, Copy, text_buffer::Copy),
    );
    table.insert(
        "TextBuffer/Cut",
        constructor!(TextBufferAction, Cut, text_buffer::Cut),
    );
    table.insert(
        "TextBuffer/Paste",
        constructor!(TextBufferAction, Paste, text_buffer::Paste),
    );
    table.insert(
        "TextBuffer/Delete",
        constructor!(TextBufferAction, Delete, text_buffer::Delete),
    );
    table.insert(
        "TextBuffer/Backspace",
        constructor!(TextBufferAction, Backspace, text_buffer::Backspace),
    );
    table.insert(
        "TextBuffer/DeleteCurrentLines",
        constructor!(
            TextBufferAction,
            DeleteCurrentLines,
            text_buffer::DeleteCurrentLines
        ),
    );
    table.insert(
        "TextBuffer/ChangeCurrentLinesIndentation",
        constructor!(
            TextBufferAction,
            ChangeCurrentLinesIndentation,
            text_buffer::ChangeCurrentLinesIndentation
        ),
    );
    table.insert(
        "TextBuffer/MoveCurrentLines",
        constructor!(
            TextBufferAction,
            MoveCurrentLines,
            text_buffer::MoveCurrentLines
        ),
    );
    table.insert(
        "TextBuffer/ToggleLineComment",
        constructor!(
            TextBufferAction,
            ToggleLineComment,
            text_buffer::ToggleLineComment
        ),
    );
    table.insert(
        "TextBuffer/EnterChar",
        constructor!(TextBufferAction, EnterChar, text_buffer::EnterChar),
    );
    table.insert(
        "TextBuffer/ToggleOverwrite",
        constructor!(
            TextBufferAction,
            ToggleOverwrite,
            text_buffer::ToggleOverwrite
        ),
    );
    table.insert(
        "TextBuffer/MoveCursorsLines",
        constructor!(
            TextBufferAction,
            MoveCursorsLines,
            text_buffer::MoveCursorsLines
        ),
    );
    table.insert(
        "TextBuffer/PageCursorsLines",
        constructor!(
            TextBufferAction,
            PageCursorsLines,
            text_buffer::PageCursorsLines
        ),
    );
    table.insert(
        "TextBuffer/MoveCursorsChar",
        constructor!(
            TextBufferAction,
            MoveCursorsChar,
            text_buffer::MoveCursorsChar
        ),
    );
    table.insert(
        "TextBuffer/MoveCursorsTop",
        constructor!(TextBufferAction, MoveCursorsTop, text_buffer::MoveCursorsTop),
    );
    table.insert(
        "TextBuffer/MoveCursorsBottom",
        constructor!(
            TextBufferAction,
            MoveCursorsBottom,
            text_buffer::MoveCursorsBottom
        ),
    );
    table.insert(
        "TextBuffer/MoveCursorsStartLine",
        constructor!(
            TextBufferAction,
            MoveCursorsStartLine,
            text_buffer::MoveCursorsStartLine
        ),
    );
    table.insert(
        "TextBuffer/MoveCursorsEndLine",
        constructor!(
            TextBufferAction,
            MoveCursorsEndLine,
            text_buffer::MoveCursorsEndLine
        ),
    );
    table.insert(
        "TextBuffer/SelectAll",
        constructor!(TextBufferAction, SelectAll, text_buffer::SelectAll),
    );
    table.insert(
        "TextBuffer/SelectNextOccurrence",
        constructor!(
            TextBufferAction,
            SelectNextOccurrence,
            text_buffer::SelectNextOccurrence
        ),
    );

    table.insert(
        "Project/OpenEmpty",
        constructor!(ProjectAction, OpenEmpty, project::OpenEmpty),
    );
    table.insert(
        "Project/OpenDefault",
        constructor!(ProjectAction, OpenDefault, project::OpenDefault),
    );
    table.insert(
        "Project/Open",
        constructor!(ProjectAction, Open, project::Open),
    );
    table.insert(
        "Project/SaveCurrent",
        constructor!(ProjectAction, SaveCurrent, project::SaveCurrent),
    );
    table.insert(
        "Project/SaveDefault",
        constructor!(ProjectAction, SaveDefault, project::SaveDefault),
    );
    table.insert(
        "Project/Save",
        constructor!(ProjectAction, Save, project::Save),
    );
    table.insert(
        "Project/ShowOpenDialog",
        constructor!(ProjectAction, ShowOpenDialog, project::ShowOpenDialog),
    );
    table.insert(
        "Project/ShowSaveDialog",
        constructor!(ProjectAction, ShowSaveDialog, project::ShowSaveDialog),
    );
    table.insert(
        "Project/Undo",
        constructor!(ProjectAction, Undo, project::Undo),
    );
    table.insert(
        "Project/Redo",
        constructor!(ProjectAction, Redo, project::Redo),
    );
    table.insert(
        "Project/SetHistoryIndex",
        constructor!(ProjectAction, SetHistoryIndex, project::SetHistoryIndex),
    );

    table.insert(
        "Windows/ToggleVisible",
        constructor!(WindowsAction, ToggleVisible, windows::ToggleVisible),
    );
    table.insert(
        "Windows/ToggleDebug",
        constructor!(WindowsAction, ToggleDebug, windows::ToggleDebug),
    );

    table
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;

    fn toggle(path: &str) -> Action {
        Action::Primitive(PrimitiveAction::ToggleBool(primitive::ToggleBool {
            path: StorePath::from(path),
        }))
    }

    #[test]
    fn test_json_round_trip() {
        let action = Action::Primitive(PrimitiveAction::SetValue(primitive::SetValue {
            path: StorePath::from("/Style/Alpha"),
            value: Primitive::F32(0.5),
        }));
        let json = action.to_json();
        assert_eq!(json[0], "Primitive/Value/Set");
        assert_eq!(Action::from_json(&json).unwrap(), action);

        let action = Action::TextBuffer(TextBufferAction::EnterChar(text_buffer::EnterChar {
            path: StorePath::from("/Faust/Code"),
            value: 'é',
        }));
        assert_eq!(Action::from_json(&action.to_json()).unwrap(), action);
    }

    #[test]
    fn test_from_json_unknown_path() {
        let json = serde_json::json!(["No/Such/Action", {}]);
        assert!(matches!(
            Action::from_json(&json),
            Err(ActionError::UnknownPath(_))
        ));
    }

    #[test]
    fn test_merge_rules() {
        // Same-path toggles cancel; different paths don't merge.
        assert_eq!(toggle("/a").merge(&toggle("/a")), Merged::Cancel);
        assert_eq!(toggle("/a").merge(&toggle("/b")), Merged::Unmerged);

        // Later set-value wins on the same path.
        let set = |v: f32| {
            Action::Primitive(PrimitiveAction::SetValue(primitive::SetValue {
                path: StorePath::from("/v"),
                value: Primitive::F32(v),
            }))
        };
        assert_eq!(set(1.0).merge(&set(2.0)), Merged::Merged(set(2.0)));
    }

    #[test]
    fn test_saved_flags() {
        assert!(toggle("/a").is_saved());
        assert!(!Action::Project(ProjectAction::Undo(project::Undo {})).is_saved());
        assert!(!Action::TextBuffer(TextBufferAction::Copy(text_buffer::Copy {
            path: StorePath::from("/Faust/Code"),
        }))
        .is_saved());
    }
}

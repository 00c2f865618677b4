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

//! The action reducer: the single owner of the root store, the component
//! tree, the action queue, and the gesture history.
//!
//! All mutations flow through the FIFO queue and are drained synchronously
//! at frame boundaries by [`Engine::run_queued`]. Commits are two-phase:
//! compute the patch and refresh component caches first, then fan out
//! listener notifications, so listeners always observe settled state.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::action::{
    Action, ContainerAction, PrimitiveAction, ProjectAction, StoreAction, TextBufferAction,
    WindowsAction,
};
use crate::component::{
    ComponentId, ComponentKind, ComponentTree, ContainerValue, ListenerCallback, ListenerRegistry,
};
use crate::containers::{adjacency_list, navigable, u32_set, vector, vector2d};
use crate::history::{merge_actions, ActionMoment, Gesture, History};
use crate::patch::Patch;
use crate::path::StorePath;
use crate::preferences::Preferences;
use crate::primitive::Primitive;
use crate::project::ProjectError;
use crate::settings::Settings;
use crate::store::{diff, Store, StoreError, TransientStore};
use crate::text::{language, language_for_path};

pub const INTERNAL_DIR_NAME: &str = ".flowgrid";

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("invalid action payload: {0}")]
    InvalidPayload(String),
    #[error("action targets no component: {0}")]
    UnknownComponent(StorePath),
}

/// A request for the (out-of-scope) file-dialog subsystem, staged by dialog
/// actions and polled by the shell.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDialogRequest {
    pub owner_path: StorePath,
    pub title: String,
    pub filters: String,
    pub default_file_name: String,
    pub save_mode: bool,
}

#[derive(Debug)]
struct WindowsState {
    /// The `Vector<bool>` component holding per-window visibility.
    visible_vector: ComponentId,
    window_ids: Vec<ComponentId>,
}

/// The application value: store, tree, queue, history, preferences. Exactly
/// one thread owns it and drives it to quiescence between observer reads.
pub struct Engine {
    tree: ComponentTree,
    transient: TransientStore,
    history: History,
    queue: VecDeque<(Action, DateTime<Utc>)>,
    active_gesture: Vec<ActionMoment>,
    last_action_at: Option<Instant>,
    gesturing: bool,
    listeners: ListenerRegistry,
    settings: Settings,
    preferences: Preferences,
    windows: Option<WindowsState>,
    pending_dialog: Option<FileDialogRequest>,
    clipboard: Option<String>,
    internal_dir: PathBuf,
    current_project_path: Option<PathBuf>,
    saved_history_index: usize,
    /// State-format JSON of the pristine (just-constructed) project, used by
    /// the empty-project action.
    pristine_json: JsonValue,
}

impl Engine {
    pub fn new(tree: ComponentTree, settings: Settings) -> Self {
        let internal_dir = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(INTERNAL_DIR_NAME);
        Engine::with_internal_dir(tree, settings, internal_dir)
    }

    pub fn with_internal_dir(
        mut tree: ComponentTree,
        settings: Settings,
        internal_dir: PathBuf,
    ) -> Self {
        let mut transient = TransientStore::new(Store::new());
        tree.init_store(transient.store_mut());
        for id in tree.depth_first() {
            if let Some(buffer) = tree.get_mut(id).and_then(|c| c.text_buffer_mut()) {
                buffer.set_tab_size(settings.tab_size);
            }
        }
        sync_text_buffers(&mut tree, transient.store_mut());
        let snapshot = transient.commit();
        tree.refresh_all(&snapshot);
        let pristine_json = tree.to_json(&snapshot);
        let preferences = Preferences::load(&internal_dir, settings.max_recently_opened);
        Engine {
            tree,
            transient,
            history: History::new(snapshot),
            queue: VecDeque::new(),
            active_gesture: vec![],
            last_action_at: None,
            gesturing: false,
            listeners: ListenerRegistry::default(),
            settings,
            preferences,
            windows: None,
            pending_dialog: None,
            clipboard: None,
            internal_dir,
            current_project_path: None,
            saved_history_index: 0,
            pristine_json,
        }
    }

    // Accessors

    pub fn store(&self) -> &Store {
        self.transient.store()
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    pub fn internal_dir(&self) -> &PathBuf {
        &self.internal_dir
    }

    pub fn current_project_path(&self) -> Option<&PathBuf> {
        self.current_project_path.as_ref()
    }

    pub fn take_dialog_request(&mut self) -> Option<FileDialogRequest> {
        self.pending_dialog.take()
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    pub(crate) fn pristine_json(&self) -> &JsonValue {
        &self.pristine_json
    }

    pub(crate) fn set_current_project(&mut self, path: Option<PathBuf>) {
        self.current_project_path = path;
        self.saved_history_index = self.history.index();
    }

    /// Whether the history has moved since the project was last saved.
    pub fn project_has_changes(&self) -> bool {
        self.history.index() != self.saved_history_index
    }

    /// Registers `listener` for changes to `field`'s id. The callback fires
    /// after every commit whose patch touches the field, once per commit.
    pub fn register_change_listener(
        &mut self,
        field: ComponentId,
        listener: ComponentId,
        callback: ListenerCallback,
    ) {
        self.listeners.register(field, listener, callback);
    }

    pub fn unregister_change_listener(&mut self, listener: ComponentId) {
        self.listeners.unregister(listener);
    }

    /// Wires the windows subsystem: the visibility vector and the window
    /// component ids, in display order. Writes the initial visibility row
    /// and resets the history baseline, so call this during startup wiring.
    pub fn set_window_components(
        &mut self,
        visible_vector: ComponentId,
        window_ids: Vec<ComponentId>,
    ) {
        let Some(component) = self.tree.get(visible_vector) else {
            warn!("unknown windows vector component");
            return;
        };
        let path = component.path.clone();
        let values: Vec<Primitive> = window_ids.iter().map(|_| Primitive::Bool(true)).collect();
        vector::set(
            self.transient.store_mut(),
            &path,
            crate::primitive::PrimitiveKind::Bool,
            &values,
        );
        let snapshot = self.transient.commit();
        self.tree.refresh_all(&snapshot);
        self.history.clear(snapshot.clone());
        self.pristine_json = self.tree.to_json(&snapshot);
        self.windows = Some(WindowsState {
            visible_vector,
            window_ids,
        });
    }

    pub fn is_window(&self, id: ComponentId) -> bool {
        self.windows
            .as_ref()
            .is_some_and(|windows| windows.window_ids.contains(&id))
    }

    // Queue and gesture lifecycle

    pub fn enqueue(&mut self, action: Action) {
        self.queue.push_back((action, Utc::now()));
    }

    /// Marks a UI gesture as in progress (widget activation); while set, no
    /// gesture commits on the duration timer.
    pub fn set_gesturing(&mut self, gesturing: bool) {
        self.gesturing = gesturing;
    }

    pub fn is_gesturing(&self) -> bool {
        self.gesturing
    }

    /// Drains the queue in order, applying each action into the transient
    /// store, then commits the active gesture if forced or its window
    /// closed. Rejected actions are dropped; a failed handler resets the
    /// transient store and discards the pending gesture.
    pub fn run_queued(&mut self, force_commit: bool) {
        while let Some((action, queued_at)) = self.queue.pop_front() {
            if !self.can_apply(&action) {
                debug!(path = action.path(), "dropping rejected action");
                continue;
            }
            if let Action::Project(project_action) = &action {
                // Project-level actions operate on committed state.
                let project_action = project_action.clone();
                self.commit_gesture();
                if let Err(err) = self.apply_project_action(&project_action) {
                    error!(path = action.path(), %err, "project action failed");
                }
                continue;
            }
            debug!(path = action.path(), "applying action");
            match self.apply(&action) {
                Ok(()) => {
                    self.active_gesture.push(ActionMoment { action, queued_at });
                    self.last_action_at = Some(Instant::now());
                }
                Err(err) => {
                    error!(path = action.path(), %err, "action failed; discarding gesture");
                    self.transient.reset();
                    self.active_gesture.clear();
                }
            }
        }

        let window_expired = self
            .last_action_at
            .is_some_and(|at| at.elapsed() >= self.settings.gesture_duration);
        if force_commit || (!self.gesturing && window_expired) {
            self.commit_gesture();
        }
    }

    /// Ends the active gesture: merge its actions, commit the transient
    /// edits into a snapshot + patch, refresh caches, record the gesture
    /// (when the patch is non-empty and a saved action remains), and notify.
    pub fn commit_gesture(&mut self) {
        if self.active_gesture.is_empty() && !self.transient.is_dirty() {
            return;
        }
        let actions = merge_actions(std::mem::take(&mut self.active_gesture));
        self.last_action_at = None;
        let (snapshot, patch) = self.transient.checked_commit();
        if patch.is_empty() {
            return;
        }
        let affected = self.tree.refresh_changed(&snapshot, &patch);
        if actions.iter().any(|moment| moment.action.is_saved()) {
            self.history.add_gesture(
                snapshot,
                Gesture {
                    actions,
                    commit_time: Utc::now(),
                },
                &patch,
            );
        }
        self.listeners.notify(&affected);
    }

    /// Abandons the in-progress gesture: the transient store snaps back to
    /// the last committed snapshot and pending actions are discarded.
    pub fn discard_gesture(&mut self) {
        self.transient.reset();
        self.active_gesture.clear();
        self.last_action_at = None;
    }

    // History navigation

    pub fn undo(&mut self) {
        self.commit_gesture();
        if self.history.can_undo() {
            self.restore_history_index(self.history.index() - 1);
        }
    }

    pub fn redo(&mut self) {
        self.commit_gesture();
        if self.history.can_redo() {
            self.restore_history_index(self.history.index() + 1);
        }
    }

    pub fn set_history_index(&mut self, index: usize) {
        self.commit_gesture();
        self.restore_history_index(index);
    }

    pub(crate) fn restore_history_index(&mut self, index: usize) {
        let target = self.history.store_at(index).clone();
        let patch = diff(self.transient.base(), &target, &StorePath::root());
        self.transient.reset_to(target.clone());
        self.history.set_index(index);
        let affected = self.tree.refresh_changed(&target, &patch);
        self.listeners.notify(&affected);
    }

    // Application

    /// Whether `action` may apply right now. The only sanctioned failure
    /// point: anything past this either succeeds or aborts the action.
    pub fn can_apply(&self, action: &Action) -> bool {
        match action {
            Action::Store(_) | Action::Primitive(_) | Action::Windows(_) => true,
            Action::Container(container_action) => self.can_apply_container(container_action),
            Action::TextBuffer(buffer_action) => self.can_apply_text_buffer(buffer_action),
            Action::Project(project_action) => self.can_apply_project(project_action),
        }
    }

    fn can_apply_container(&self, action: &ContainerAction) -> bool {
        match action {
            ContainerAction::NavigableBack(a) => self
                .navigable_at(&a.path)
                .is_some_and(|navigable| navigable.can_move_back()),
            ContainerAction::NavigableForward(a) => self
                .navigable_at(&a.path)
                .is_some_and(|navigable| navigable.can_move_forward()),
            _ => true,
        }
    }

    fn can_apply_text_buffer(&self, action: &TextBufferAction) -> bool {
        use TextBufferAction::*;
        let path = crate::action::text_buffer_path(action);
        let Some(buffer) = self
            .tree
            .by_path(path)
            .and_then(|id| self.tree.get(id))
            .and_then(|component| component.text_buffer())
        else {
            return false;
        };
        match action {
            Undo(_) => buffer.can_undo(),
            Redo(_) => buffer.can_redo(),
            Copy(_) => buffer.can_copy(),
            Cut(_) => buffer.can_cut(),
            Paste(a) => buffer.can_edit() && !a.text.is_empty(),
            Delete(_) | Backspace(_) | DeleteCurrentLines(_)
            | ChangeCurrentLinesIndentation(_) | MoveCurrentLines(_) | ToggleLineComment(_)
            | EnterChar(_) | Set(_) | Open(_) => buffer.can_edit(),
            _ => true,
        }
    }

    fn can_apply_project(&self, action: &ProjectAction) -> bool {
        match action {
            ProjectAction::Undo(_) => self.history.can_undo(),
            ProjectAction::Redo(_) => self.history.can_redo(),
            ProjectAction::SetHistoryIndex(a) => (a.index as usize) < self.history.len(),
            ProjectAction::SaveCurrent(_) => self.current_project_path.is_some(),
            _ => true,
        }
    }

    fn apply(&mut self, action: &Action) -> Result<(), ApplyError> {
        match action {
            Action::Store(StoreAction::ApplyPatch(a)) => {
                self.transient.store_mut().apply_patch(&a.patch);
                Ok(())
            }
            Action::Primitive(primitive_action) => self.apply_primitive(primitive_action),
            Action::Container(container_action) => self.apply_container(container_action),
            Action::TextBuffer(buffer_action) => self.apply_text_buffer(buffer_action),
            Action::Windows(windows_action) => self.apply_windows(windows_action),
            Action::Project(_) => unreachable!("project actions are routed in run_queued"),
        }
    }

    fn apply_primitive(&mut self, action: &PrimitiveAction) -> Result<(), ApplyError> {
        match action {
            PrimitiveAction::ToggleBool(a) => {
                let current: bool = self.transient.store().get(&a.path)?;
                self.transient.store_mut().set(a.path.clone(), !current);
                Ok(())
            }
            PrimitiveAction::SetFlags(a) => {
                let value = u32::try_from(a.value).map_err(|_| {
                    ApplyError::InvalidPayload(format!("negative flags value {}", a.value))
                })?;
                self.transient.store_mut().set(a.path.clone(), value);
                Ok(())
            }
            PrimitiveAction::SetValue(a) => {
                // Route through the field so the value is coerced to the
                // field's kind; fall back to the payload's own kind for
                // paths without a component.
                let field = self
                    .tree
                    .by_path(&a.path)
                    .and_then(|id| self.tree.get(id))
                    .and_then(|component| component.field().cloned());
                match field {
                    Some(field) => {
                        if !field.write(self.transient.store_mut(), &a.path, &a.value) {
                            return Err(ApplyError::InvalidPayload(format!(
                                "value of mismatched kind at {}",
                                a.path
                            )));
                        }
                    }
                    None => {
                        self.transient
                            .store_mut()
                            .set_primitive(a.path.clone(), a.value.clone());
                    }
                }
                Ok(())
            }
        }
    }

    fn apply_container(&mut self, action: &ContainerAction) -> Result<(), ApplyError> {
        use ContainerAction::*;
        match action {
            VectorSet(a) => {
                let kind = self.vector_kind(&a.path)?;
                vector::set(self.transient.store_mut(), &a.path, kind, &a.value);
            }
            VectorSetAt(a) => {
                let kind = self.vector_kind(&a.path)?;
                vector::set_at(
                    self.transient.store_mut(),
                    &a.path,
                    kind,
                    a.i as usize,
                    &a.value,
                );
            }
            VectorResize(a) => {
                let kind = self.vector_kind(&a.path)?;
                vector::resize(self.transient.store_mut(), &a.path, kind, a.size as usize);
            }
            Vector2DSet(a) => {
                let kind = self.vector2d_kind(&a.path)?;
                vector2d::set(self.transient.store_mut(), &a.path, kind, &a.value);
            }
            SetInsert(a) => u32_set::insert(self.transient.store_mut(), &a.path, a.value),
            SetErase(a) => u32_set::erase(self.transient.store_mut(), &a.path, a.value),
            SetClear(a) => u32_set::clear(self.transient.store_mut(), &a.path),
            ToggleConnection(a) => adjacency_list::toggle_connection(
                self.transient.store_mut(),
                &a.path,
                a.source,
                a.destination,
            ),
            NavigablePush(a) => {
                let capacity = self
                    .navigable_at(&a.path)
                    .ok_or_else(|| ApplyError::UnknownComponent(a.path.clone()))?
                    .capacity;
                navigable::push(self.transient.store_mut(), &a.path, a.value, capacity);
            }
            NavigableBack(a) => navigable::move_back(self.transient.store_mut(), &a.path),
            NavigableForward(a) => navigable::move_forward(self.transient.store_mut(), &a.path),
        }
        Ok(())
    }

    fn apply_text_buffer(&mut self, action: &TextBufferAction) -> Result<(), ApplyError> {
        use TextBufferAction::*;
        let path = crate::action::text_buffer_path(action).clone();
        let buffer_id = self
            .tree
            .by_path(&path)
            .ok_or_else(|| ApplyError::UnknownComponent(path.clone()))?;
        let buffer = self
            .tree
            .get_mut(buffer_id)
            .and_then(|component| component.text_buffer_mut())
            .ok_or_else(|| ApplyError::UnknownComponent(path.clone()))?;

        match action {
            Set(a) => {
                buffer.set_text(&a.value);
                buffer.commit();
            }
            Open(a) => {
                let contents = fs::read_to_string(&a.file_path)?;
                buffer.set_language(language_for_path(&a.file_path));
                buffer.set_text(&contents);
                buffer.commit();
                self.transient.store_mut().set(
                    path.join("LastOpenedFilePath"),
                    a.file_path.to_string_lossy().into_owned(),
                );
            }
            Save(a) => fs::write(&a.file_path, buffer.get_text())?,
            ShowOpenDialog(_) => {
                self.pending_dialog = Some(FileDialogRequest {
                    owner_path: path.clone(),
                    title: "Open file".into(),
                    filters: ".*".into(),
                    default_file_name: String::new(),
                    save_mode: false,
                });
            }
            ShowSaveDialog(_) => {
                let language_name = language(buffer.language_id()).name;
                let extension = language(buffer.language_id())
                    .file_extensions
                    .first()
                    .map_or(String::new(), |extension| format!(".{extension}"));
                self.pending_dialog = Some(FileDialogRequest {
                    owner_path: path.clone(),
                    title: format!("Save {language_name} file"),
                    filters: extension.clone(),
                    default_file_name: format!(
                        "my_{}_program{extension}",
                        language_name.to_lowercase()
                    ),
                    save_mode: true,
                });
            }
            Undo(_) => buffer.undo(),
            Redo(_) => buffer.redo(),
            Copy(_) => self.clipboard = Some(buffer.copy()),
            Cut(_) => self.clipboard = Some(buffer.cut()),
            Paste(a) => buffer.paste(&a.text),
            Delete(a) => buffer.delete_forward(a.word),
            Backspace(a) => buffer.backspace(a.word),
            DeleteCurrentLines(_) => buffer.delete_current_lines(),
            ChangeCurrentLinesIndentation(a) => buffer.change_current_lines_indentation(a.increase),
            MoveCurrentLines(a) => buffer.move_current_lines(a.up),
            ToggleLineComment(_) => buffer.toggle_line_comment(),
            EnterChar(a) => buffer.enter_char(a.value),
            ToggleOverwrite(_) => buffer.toggle_overwrite(),
            MoveCursorsLines(a) => buffer.move_cursors_lines(a.amount, a.select),
            PageCursorsLines(a) => buffer.page_cursors_lines(a.up, a.select),
            MoveCursorsChar(a) => buffer.move_cursors_char(a.right, a.select, a.word),
            MoveCursorsTop(a) => buffer.move_cursors_top(a.select),
            MoveCursorsBottom(a) => buffer.move_cursors_bottom(a.select),
            MoveCursorsStartLine(a) => buffer.move_cursors_start_line(a.select),
            MoveCursorsEndLine(a) => buffer.move_cursors_end_line(a.select),
            SelectAll(_) => buffer.select_all(),
            SelectNextOccurrence(_) => buffer.select_next_occurrence(true),
        }

        // Re-establish cursor invariants, then write the buffer's text
        // through to its store leaf so text edits patch and undo like any
        // other state.
        let buffer = self
            .tree
            .get_mut(buffer_id)
            .and_then(|component| component.text_buffer_mut())
            .expect("buffer vanished mid-action");
        buffer.finish_action();
        let text = buffer.get_text();
        self.transient.store_mut().set(path, text);
        Ok(())
    }

    fn apply_windows(&mut self, action: &WindowsAction) -> Result<(), ApplyError> {
        match action {
            WindowsAction::ToggleVisible(a) => self.toggle_window_visible(ComponentId(a.id)),
            WindowsAction::ToggleDebug(a) => {
                let debug_child = self
                    .tree
                    .get(ComponentId(a.id))
                    .and_then(|component| {
                        component
                            .children
                            .iter()
                            .find(|&&child| {
                                self.tree
                                    .get(child)
                                    .is_some_and(|c| c.path_segment == "Debug")
                            })
                            .copied()
                    });
                match debug_child {
                    Some(child) => self.toggle_window_visible(child),
                    None => {
                        warn!(id = a.id, "component has no debug window");
                        Ok(())
                    }
                }
            }
        }
    }

    fn toggle_window_visible(&mut self, id: ComponentId) -> Result<(), ApplyError> {
        let Some(windows) = &self.windows else {
            return Err(ApplyError::InvalidPayload("windows not wired".into()));
        };
        let Some(index) = windows.window_ids.iter().position(|&window| window == id) else {
            return Err(ApplyError::InvalidPayload(format!(
                "{id:?} is not a registered window"
            )));
        };
        let vector_path = self
            .tree
            .get(windows.visible_vector)
            .map(|component| component.path.clone())
            .ok_or_else(|| ApplyError::InvalidPayload("windows vector missing".into()))?;
        let path = vector_path.join(index.to_string());
        let current: bool = self.transient.store().get(&path)?;
        self.transient.store_mut().set(path, !current);
        Ok(())
    }

    fn apply_project_action(&mut self, action: &ProjectAction) -> Result<(), ProjectError> {
        match action {
            ProjectAction::OpenEmpty(_) => {
                self.open_empty_project();
                Ok(())
            }
            ProjectAction::OpenDefault(_) => {
                let path = self.default_project_path();
                self.open_project(&path)
            }
            ProjectAction::Open(a) => self.open_project(&a.file_path),
            ProjectAction::SaveCurrent(_) => self.save_current_project(),
            ProjectAction::SaveDefault(_) => {
                let path = self.default_project_path();
                self.save_project(&path)
            }
            ProjectAction::Save(a) => self.save_project(&a.file_path),
            ProjectAction::ShowOpenDialog(_) => {
                self.pending_dialog = Some(FileDialogRequest {
                    owner_path: StorePath::root(),
                    title: "Open project".into(),
                    filters: ".fls,.fld".into(),
                    default_file_name: String::new(),
                    save_mode: false,
                });
                Ok(())
            }
            ProjectAction::ShowSaveDialog(_) => {
                self.pending_dialog = Some(FileDialogRequest {
                    owner_path: StorePath::root(),
                    title: "Save project".into(),
                    filters: ".fls".into(),
                    default_file_name: "project.fls".into(),
                    save_mode: true,
                });
                Ok(())
            }
            ProjectAction::Undo(_) => {
                self.undo();
                Ok(())
            }
            ProjectAction::Redo(_) => {
                self.redo();
                Ok(())
            }
            ProjectAction::SetHistoryIndex(a) => {
                self.set_history_index(a.index as usize);
                Ok(())
            }
        }
    }

    // Component lookups

    fn navigable_at(&self, path: &StorePath) -> Option<&crate::containers::navigable::NavigableValue> {
        match self
            .tree
            .by_path(path)
            .and_then(|id| self.tree.get(id))
            .map(|component| &component.kind)
        {
            Some(ComponentKind::Container(ContainerValue::Navigable(navigable))) => {
                Some(navigable)
            }
            _ => None,
        }
    }

    fn vector_kind(&self, path: &StorePath) -> Result<crate::primitive::PrimitiveKind, ApplyError> {
        match self
            .tree
            .by_path(path)
            .and_then(|id| self.tree.get(id))
            .map(|component| &component.kind)
        {
            Some(ComponentKind::Container(ContainerValue::Vector(value))) => Ok(value.kind),
            _ => Err(ApplyError::UnknownComponent(path.clone())),
        }
    }

    fn vector2d_kind(
        &self,
        path: &StorePath,
    ) -> Result<crate::primitive::PrimitiveKind, ApplyError> {
        match self
            .tree
            .by_path(path)
            .and_then(|id| self.tree.get(id))
            .map(|component| &component.kind)
        {
            Some(ComponentKind::Container(ContainerValue::Vector2D(value))) => Ok(value.kind),
            _ => Err(ApplyError::UnknownComponent(path.clone())),
        }
    }

    pub(crate) fn tree_mut(&mut self) -> &mut ComponentTree {
        &mut self.tree
    }

    pub(crate) fn preferences_internal(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    /// Applies `patch` directly and commits it as its own (unsaved) change:
    /// caches refresh and listeners fire, but nothing enters the history.
    pub fn apply_patch_silent(&mut self, patch: &Patch) {
        self.transient.store_mut().apply_patch(patch);
        let (snapshot, patch) = self.transient.checked_commit();
        let affected = self.tree.refresh_changed(&snapshot, &patch);
        self.listeners.notify(&affected);
    }

    /// Replaces the whole store with a freshly loaded snapshot: the history
    /// collapses to a new baseline, caches refresh, and listeners fire for
    /// every path the swap changed.
    pub(crate) fn install_snapshot(&mut self, store: Store) {
        let patch = diff(self.transient.base(), &store, &StorePath::root());
        self.transient.reset_to(store.clone());
        self.history.clear(store.clone());
        self.tree.refresh_all(&store);
        let affected = self.tree.affected_ids(&patch);
        self.listeners.notify(&affected);
    }
}

/// Writes every text buffer's current text into its store leaf.
pub(crate) fn sync_text_buffers(tree: &mut ComponentTree, store: &mut Store) {
    for id in tree.depth_first() {
        let Some(component) = tree.get(id) else {
            continue;
        };
        if let Some(buffer) = component.text_buffer() {
            let path = component.path.clone();
            let text = buffer.get_text();
            store.set(path, text);
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("history_len", &self.history.len())
            .field("history_index", &self.history.index())
            .field("queued", &self.queue.len())
            .field("gesturing", &self.gesturing)
            .field("current_project_path", &self.current_project_path)
            .finish()
    }
}

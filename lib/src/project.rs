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

//! Project persistence.
//!
//! Two on-disk formats, dispatched by extension:
//! * `.fls` (state): the full JSON flatten of the component tree.
//! * `.fld` (action history): `{"index": u32, "gestures": [{"commit_time":
//!   iso8601, "actions": [[path, payload], ...]}, ...]}`; loading replays
//!   each gesture from the empty project, then rewinds to the saved index.
//!
//! Load failures never touch the current store.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::action::{Action, ActionError};
use crate::engine::{sync_text_buffers, Engine};
use crate::store::Store;

pub const STATE_PROJECT_EXTENSION: &str = "fls";
pub const ACTION_PROJECT_EXTENSION: &str = "fld";
pub const DEFAULT_PROJECT_FILE_NAME: &str = "default.fls";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProjectFormat {
    State,
    Action,
}

pub fn format_for_path(path: &Path) -> Option<ProjectFormat> {
    match path.extension()?.to_str()? {
        STATE_PROJECT_EXTENSION => Some(ProjectFormat::State),
        ACTION_PROJECT_EXTENSION | "flp" => Some(ProjectFormat::Action),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("unsupported project extension: {0}")]
    UnknownExtension(PathBuf),
    #[error("malformed project: {0}")]
    Malformed(String),
    #[error("no current project to save")]
    NoCurrentProject,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl From<serde_json::Error> for ProjectError {
    fn from(error: serde_json::Error) -> Self {
        ProjectError::Malformed(error.to_string())
    }
}

impl Engine {
    pub fn default_project_path(&self) -> PathBuf {
        self.internal_dir().join(DEFAULT_PROJECT_FILE_NAME)
    }

    /// Whether `path` is a project of the user's (as opposed to one of the
    /// internal `.flowgrid` files).
    pub fn is_user_project_path(&self, path: &Path) -> bool {
        !path.starts_with(self.internal_dir())
    }

    /// The current project serialized in the requested format.
    pub fn project_json(&self, format: ProjectFormat) -> JsonValue {
        match format {
            ProjectFormat::State => self.tree().to_json(self.store()),
            ProjectFormat::Action => {
                let (gestures, index) = self.history().indexed_gestures();
                serde_json::json!({
                    "index": index,
                    "gestures": gestures
                        .iter()
                        .map(|gesture| {
                            serde_json::json!({
                                "commit_time": gesture.commit_time.to_rfc3339(),
                                "actions": gesture
                                    .saved_actions()
                                    .map(|moment| moment.action.to_json())
                                    .collect::<Vec<_>>(),
                            })
                        })
                        .collect::<Vec<_>>(),
                })
            }
        }
    }

    /// Loads a project from disk, dispatching on the extension. The current
    /// store is untouched unless the whole file parses.
    pub fn open_project(&mut self, path: &Path) -> Result<(), ProjectError> {
        let format =
            format_for_path(path).ok_or_else(|| ProjectError::UnknownExtension(path.into()))?;
        let contents = fs::read_to_string(path)?;
        let json: JsonValue = serde_json::from_str(&contents)?;
        match format {
            ProjectFormat::State => {
                if !json.is_object() {
                    return Err(ProjectError::Malformed(
                        "state project must be a JSON object".into(),
                    ));
                }
                self.load_state_json(&json);
            }
            ProjectFormat::Action => self.load_action_json(&json)?,
        }
        if self.is_user_project_path(path) {
            self.preferences_internal().on_project_opened(path);
            self.set_current_project(Some(path.to_path_buf()));
        } else {
            self.set_current_project(None);
        }
        Ok(())
    }

    /// Resets to the pristine (just-constructed) project.
    pub fn open_empty_project(&mut self) {
        let json = self.pristine_json().clone();
        self.load_state_json(&json);
        self.set_current_project(None);
    }

    /// Saves in the format matching the extension. User paths become the
    /// current project and enter the recently-opened list.
    pub fn save_project(&mut self, path: &Path) -> Result<(), ProjectError> {
        self.commit_gesture();
        let format =
            format_for_path(path).ok_or_else(|| ProjectError::UnknownExtension(path.into()))?;
        let json = self.project_json(format);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(&json)?)?;
        if self.is_user_project_path(path) {
            self.preferences_internal().on_project_opened(path);
            self.set_current_project(Some(path.to_path_buf()));
        }
        Ok(())
    }

    pub fn save_current_project(&mut self) -> Result<(), ProjectError> {
        let path = self
            .current_project_path()
            .cloned()
            .ok_or(ProjectError::NoCurrentProject)?;
        self.save_project(&path)
    }

    /// Installs a state-format document: fresh defaults overlaid with the
    /// document's pointers, history cleared to that single baseline.
    pub(crate) fn load_state_json(&mut self, json: &JsonValue) {
        let mut store = Store::new();
        self.tree_mut().init_store(&mut store);
        self.tree_mut().set_json(json, &mut store);
        let tree = self.tree_mut();
        sync_text_buffers(tree, &mut store);
        self.install_snapshot(store);
    }

    /// Replays an action-format document: start from the empty project,
    /// re-commit each gesture, then rewind to the saved index. The whole
    /// document is validated before anything is applied.
    fn load_action_json(&mut self, json: &JsonValue) -> Result<(), ProjectError> {
        let index = json
            .get("index")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| ProjectError::Malformed("missing history index".into()))?;
        let gestures_json = json
            .get("gestures")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| ProjectError::Malformed("missing gestures array".into()))?;

        let mut gestures: Vec<Vec<Action>> = vec![];
        for gesture_json in gestures_json {
            let actions_json = gesture_json
                .get("actions")
                .and_then(JsonValue::as_array)
                .ok_or_else(|| ProjectError::Malformed("gesture without actions".into()))?;
            let actions = actions_json
                .iter()
                .map(Action::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            gestures.push(actions);
        }

        self.open_empty_project();
        for actions in gestures {
            for action in actions {
                self.enqueue(action);
            }
            self.run_queued(true);
        }
        let last = self.history().len() - 1;
        self.set_history_index((index as usize).min(last));
        Ok(())
    }
}

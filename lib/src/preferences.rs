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

//! Application preferences: a small JSON file in the internal directory
//! holding the bounded FIFO of recently opened project paths.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const PREFERENCES_FILE_NAME: &str = "Preferences.flp";

#[derive(Serialize, Deserialize, Default)]
struct PreferencesData {
    recently_opened: VecDeque<PathBuf>,
}

#[derive(Debug)]
pub struct Preferences {
    file_path: PathBuf,
    limit: usize,
    recently_opened: VecDeque<PathBuf>,
}

impl Preferences {
    /// Reads `Preferences.flp` from `internal_dir`, falling back to empty
    /// preferences when missing or unreadable.
    pub fn load(internal_dir: &Path, limit: usize) -> Self {
        let file_path = internal_dir.join(PREFERENCES_FILE_NAME);
        let data = match fs::read_to_string(&file_path) {
            Ok(contents) => serde_json::from_str::<PreferencesData>(&contents).unwrap_or_else(
                |error| {
                    warn!(%error, "ignoring malformed preferences file");
                    PreferencesData::default()
                },
            ),
            Err(_) => PreferencesData::default(),
        };
        let mut preferences = Preferences {
            file_path,
            limit,
            recently_opened: data.recently_opened,
        };
        preferences.recently_opened.truncate(limit);
        preferences
    }

    pub fn recently_opened(&self) -> impl Iterator<Item = &PathBuf> {
        self.recently_opened.iter()
    }

    /// Moves `path` to the front of the recent list and persists. Write
    /// failures are logged, not fatal.
    pub fn on_project_opened(&mut self, path: &Path) {
        self.recently_opened
            .retain(|recent| recent.as_path() != path);
        self.recently_opened.push_front(path.to_path_buf());
        self.recently_opened.truncate(self.limit);
        self.write();
    }

    /// Clears and re-saves default preferences.
    pub fn clear(&mut self) {
        self.recently_opened.clear();
        self.write();
    }

    fn write(&self) {
        let data = PreferencesData {
            recently_opened: self.recently_opened.clone(),
        };
        let result = self
            .file_path
            .parent()
            .map(fs::create_dir_all)
            .unwrap_or(Ok(()))
            .and_then(|()| {
                fs::write(
                    &self.file_path,
                    serde_json::to_string_pretty(&data).unwrap_or_default(),
                )
            });
        if let Err(error) = result {
            warn!(%error, "failed to write preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_list_is_bounded_fifo() {
        let dir = std::env::temp_dir().join("flowgrid-preferences-test");
        let _ = fs::remove_dir_all(&dir);
        let mut preferences = Preferences::load(&dir, 2);
        preferences.on_project_opened(Path::new("/tmp/a.fls"));
        preferences.on_project_opened(Path::new("/tmp/b.fls"));
        preferences.on_project_opened(Path::new("/tmp/c.fls"));
        // Newest first, bounded, oldest dropped.
        let recent: Vec<_> = preferences.recently_opened().collect();
        assert_eq!(
            recent,
            vec![Path::new("/tmp/c.fls"), Path::new("/tmp/b.fls")]
        );

        // Re-opening moves to the front without duplicating.
        preferences.on_project_opened(Path::new("/tmp/b.fls"));
        let recent: Vec<_> = preferences.recently_opened().collect();
        assert_eq!(
            recent,
            vec![Path::new("/tmp/b.fls"), Path::new("/tmp/c.fls")]
        );

        let reloaded = Preferences::load(&dir, 2);
        assert_eq!(
            reloaded.recently_opened().collect::<Vec<_>>(),
            vec![Path::new("/tmp/b.fls"), Path::new("/tmp/c.fls")]
        );
        let _ = fs::remove_dir_all(&dir);
    }
}

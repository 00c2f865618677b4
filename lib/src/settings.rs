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

use std::path::Path;
use std::time::Duration;

use tracing::warn;

const DEFAULT_GESTURE_DURATION_SEC: f64 = 0.5;
const DEFAULT_MAX_RECENTLY_OPENED: usize = 10;
const DEFAULT_TAB_SIZE: u32 = 4;

/// Engine settings, read from an optional TOML file. Everything has a
/// default, so no file is required.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Actions queued within this window of each other merge into a single
    /// gesture.
    pub gesture_duration: Duration,
    pub max_recently_opened: usize,
    pub tab_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            gesture_duration: Duration::from_secs_f64(DEFAULT_GESTURE_DURATION_SEC),
            max_recently_opened: DEFAULT_MAX_RECENTLY_OPENED,
            tab_size: DEFAULT_TAB_SIZE,
        }
    }
}

impl Settings {
    pub fn from_config(config: &config::Config) -> Self {
        let gesture_duration_sec = config
            .get_float("gesture-duration-sec")
            .unwrap_or(DEFAULT_GESTURE_DURATION_SEC)
            .clamp(0.0, 5.0);
        let max_recently_opened = config
            .get_int("max-recently-opened")
            .map(|value| value.max(1) as usize)
            .unwrap_or(DEFAULT_MAX_RECENTLY_OPENED);
        let tab_size = config
            .get_int("tab-size")
            .map(|value| value.clamp(1, 8) as u32)
            .unwrap_or(DEFAULT_TAB_SIZE);
        Settings {
            gesture_duration: Duration::from_secs_f64(gesture_duration_sec),
            max_recently_opened,
            tab_size,
        }
    }

    /// Loads from `path` when present; falls back to defaults (with a
    /// warning) when the file is unreadable.
    pub fn load(path: &Path) -> Self {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .build();
        match config {
            Ok(config) => Settings::from_config(&config),
            Err(error) => {
                warn!(%error, "ignoring unreadable settings file");
                Settings::default()
            }
        }
    }
}

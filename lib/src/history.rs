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

//! The linear gesture history: one store snapshot per committed gesture,
//! with a cursor for undo/redo and per-path commit-time metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::action::{Action, Merged};
use crate::patch::Patch;
use crate::path::StorePath;
use crate::store::{diff, Store};

/// An action paired with the time it was queued.
#[derive(Clone, Debug)]
pub struct ActionMoment {
    pub action: Action,
    pub queued_at: DateTime<Utc>,
}

/// A contiguous group of actions committed atomically as one undoable unit.
#[derive(Clone, Debug)]
pub struct Gesture {
    pub actions: Vec<ActionMoment>,
    pub commit_time: DateTime<Utc>,
}

impl Gesture {
    pub fn empty(commit_time: DateTime<Utc>) -> Self {
        Gesture {
            actions: vec![],
            commit_time,
        }
    }

    /// The actions that belong in saved projects and the undo history.
    pub fn saved_actions(&self) -> impl Iterator<Item = &ActionMoment> {
        self.actions
            .iter()
            .filter(|moment| moment.action.is_saved())
    }
}

/// Collapses adjacent mergeable actions. Assumes chronological order;
/// cancelling pairs drop out entirely.
pub fn merge_actions(actions: Vec<ActionMoment>) -> Vec<ActionMoment> {
    let mut result: Vec<ActionMoment> = vec![];
    for moment in actions {
        let Some(last) = result.pop() else {
            result.push(moment);
            continue;
        };
        match last.action.merge(&moment.action) {
            Merged::Merged(action) => result.push(ActionMoment {
                action,
                queued_at: moment.queued_at,
            }),
            Merged::Cancel => {}
            Merged::Unmerged => {
                result.push(last);
                result.push(moment);
            }
        }
    }
    result
}

/// Per-path commit times, persistent so each record can keep the metrics as
/// of its own commit.
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    commit_times_by_path: im::OrdMap<StorePath, im::Vector<DateTime<Utc>>>,
}

impl Metrics {
    pub fn add_patch(&mut self, patch: &Patch, commit_time: DateTime<Utc>) {
        for path in patch.paths() {
            let mut times = self
                .commit_times_by_path
                .get(&path)
                .cloned()
                .unwrap_or_default();
            times.push_back(commit_time);
            self.commit_times_by_path.insert(path, times);
        }
    }

    pub fn commit_times(&self, path: &StorePath) -> Option<&im::Vector<DateTime<Utc>>> {
        self.commit_times_by_path.get(path)
    }

    pub fn latest_commit_time(&self, path: &StorePath) -> Option<DateTime<Utc>> {
        self.commit_times(path)
            .and_then(|times| times.last().copied())
    }

    /// Input for the path-update-frequency view.
    pub fn change_count_by_path(&self) -> BTreeMap<StorePath, usize> {
        self.commit_times_by_path
            .iter()
            .map(|(path, times)| (path.clone(), times.len()))
            .collect()
    }

    pub fn changed_path_count(&self) -> usize {
        self.commit_times_by_path.len()
    }
}

#[derive(Clone, Debug)]
struct Record {
    store: Store,
    gesture: Gesture,
    metrics: Metrics,
}

/// The record vector always holds the initial store at index 0 with an empty
/// gesture; that baseline is never removed, so "empty" means size 1.
#[derive(Debug)]
pub struct History {
    records: Vec<Record>,
    index: usize,
    metrics: Metrics,
}

impl History {
    pub fn new(initial_store: Store) -> Self {
        History {
            records: vec![Record {
                store: initial_store,
                gesture: Gesture::empty(Utc::now()),
                metrics: Metrics::default(),
            }],
            index: 0,
            metrics: Metrics::default(),
        }
    }

    pub fn clear(&mut self, store: Store) {
        *self = History::new(store);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.len() - 1
    }

    pub fn current_store(&self) -> &Store {
        &self.records[self.index].store
    }

    pub fn store_at(&self, index: usize) -> &Store {
        &self.records[index].store
    }

    pub fn gesture_at(&self, index: usize) -> &Gesture {
        &self.records[index].gesture
    }

    /// Metrics as of the current record.
    pub fn metrics(&self) -> &Metrics {
        &self.records[self.index].metrics
    }

    /// The patch turning record `index - 1` into record `index`.
    pub fn create_patch(&self, index: usize) -> Patch {
        assert!(index > 0 && index < self.len(), "history index out of range");
        diff(
            &self.records[index - 1].store,
            &self.records[index].store,
            &StorePath::root(),
        )
    }

    /// Appends a record for a committed gesture, dropping any redo tail.
    /// A gesture whose patch is empty is not recorded.
    pub fn add_gesture(&mut self, snapshot: Store, gesture: Gesture, patch: &Patch) {
        if patch.is_empty() {
            return;
        }
        self.metrics.add_patch(patch, gesture.commit_time);
        self.records.truncate(self.index + 1);
        self.records.push(Record {
            store: snapshot,
            gesture,
            metrics: self.metrics.clone(),
        });
        self.index = self.len() - 1;
    }

    /// Moves the cursor; the per-path metrics rebuild from the target
    /// record. The index must be in range.
    pub fn set_index(&mut self, index: usize) {
        assert!(index < self.len(), "history index out of range");
        if index == self.index {
            return;
        }
        self.index = index;
        self.metrics = self.records[index].metrics.clone();
    }

    /// All recorded gestures except the baseline, plus the current index.
    pub fn indexed_gestures(&self) -> (Vec<&Gesture>, usize) {
        let gestures = self.records[1..]
            .iter()
            .map(|record| &record.gesture)
            .collect();
        (gestures, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{primitive, PrimitiveAction};
    use crate::primitive::Primitive;

    fn moment(action: Action) -> ActionMoment {
        ActionMoment {
            action,
            queued_at: Utc::now(),
        }
    }

    fn toggle(path: &str) -> Action {
        Action::Primitive(PrimitiveAction::ToggleBool(primitive::ToggleBool {
            path: StorePath::from(path),
        }))
    }

    fn set_value(path: &str, value: u32) -> Action {
        Action::Primitive(PrimitiveAction::SetValue(primitive::SetValue {
            path: StorePath::from(path),
            value: Primitive::U32(value),
        }))
    }

    #[test]
    fn test_merge_actions_collapses_sets() {
        let merged = merge_actions(vec![
            moment(set_value("/v", 1)),
            moment(set_value("/v", 2)),
            moment(set_value("/v", 3)),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].action, set_value("/v", 3));
    }

    #[test]
    fn test_merge_actions_cancels_toggles() {
        assert!(merge_actions(vec![moment(toggle("/a")), moment(toggle("/a"))]).is_empty());
        let kept = merge_actions(vec![moment(toggle("/a")), moment(toggle("/b"))]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_baseline_record() {
        let history = History::new(Store::new());
        assert_eq!(history.len(), 1);
        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}

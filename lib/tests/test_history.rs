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

use flowgrid_lib::action::{primitive, Action, PrimitiveAction};
use flowgrid_lib::path::StorePath;
use flowgrid_lib::primitive::Primitive;
use pretty_assertions::assert_eq;
use testutils::demo_project;

fn set_value(path: StorePath, value: f32) -> Action {
    Action::Primitive(PrimitiveAction::SetValue(primitive::SetValue {
        path,
        value: Primitive::F32(value),
    }))
}

/// Commits one gesture setting the volume to `value`.
fn commit_volume(project: &mut testutils::DemoProject, value: f32) {
    let volume = project.path_of(project.volume);
    project.engine.enqueue(set_value(volume, value));
    project.engine.run_queued(true);
}

#[test]
fn test_undo_redo_is_identity() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);

    commit_volume(&mut project, 0.5);
    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(0.5));

    project.engine.undo();
    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(1.0));
    assert_eq!(project.engine.history().index(), 0);

    project.engine.redo();
    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(0.5));
    assert_eq!(project.engine.history().index(), 1);

    // Cached field values track the restores.
    let cached = project
        .engine
        .tree()
        .get(project.volume)
        .unwrap()
        .field()
        .unwrap()
        .to_primitive();
    assert_eq!(cached, Primitive::F32(0.5));
}

#[test]
fn test_history_advances_monotonically() {
    let mut project = demo_project();
    commit_volume(&mut project, 0.2);
    assert_eq!(project.engine.history().index(), 1);
    commit_volume(&mut project, 0.4);
    assert_eq!(project.engine.history().index(), 2);
    commit_volume(&mut project, 0.6);
    assert_eq!(project.engine.history().index(), 3);
    assert_eq!(project.engine.history().len(), 4);
}

#[test]
fn test_set_index_jumps_to_arbitrary_record() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);
    for value in [0.2f32, 0.4, 0.6] {
        commit_volume(&mut project, value);
    }

    project.engine.set_history_index(1);
    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(0.2));

    project.engine.set_history_index(2);
    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(0.4));

    // Metrics rebuild from the target record: two commits of the volume
    // path are visible at index 2.
    let counts = project.engine.history().metrics().change_count_by_path();
    assert_eq!(counts.get(&volume), Some(&2));
}

#[test]
fn test_new_gesture_truncates_redo_tail() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);
    for value in [0.2f32, 0.4, 0.6] {
        commit_volume(&mut project, value);
    }

    project.engine.undo();
    project.engine.undo();
    assert_eq!(project.engine.history().index(), 1);
    assert!(project.engine.history().can_redo());

    commit_volume(&mut project, 0.9);
    assert_eq!(project.engine.history().len(), 3);
    assert_eq!(project.engine.history().index(), 2);
    assert!(!project.engine.history().can_redo());
    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(0.9));
}

#[test]
fn test_metrics_accumulate_per_path() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);
    let alpha = project.path_of(project.alpha);

    commit_volume(&mut project, 0.2);
    commit_volume(&mut project, 0.4);
    project.engine.enqueue(set_value(alpha.clone(), 0.5));
    project.engine.run_queued(true);

    let metrics = project.engine.history().metrics();
    let counts = metrics.change_count_by_path();
    assert_eq!(counts.get(&volume), Some(&2));
    assert_eq!(counts.get(&alpha), Some(&1));
    assert_eq!(metrics.changed_path_count(), 2);
    assert!(metrics.latest_commit_time(&volume).is_some());
    assert_eq!(metrics.commit_times(&volume).unwrap().len(), 2);
}

#[test]
fn test_undo_from_each_index_restores_exact_snapshot() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);
    let values = [0.2f32, 0.4, 0.6];
    for value in values {
        commit_volume(&mut project, value);
    }
    // Walk all the way back, checking each restored snapshot.
    for (index, expected) in [(2, 0.4f32), (1, 0.2), (0, 1.0)] {
        project.engine.undo();
        assert_eq!(project.engine.history().index(), index);
        assert_eq!(project.engine.store().get::<f32>(&volume), Ok(expected));
    }
    assert!(!project.engine.history().can_undo());
}

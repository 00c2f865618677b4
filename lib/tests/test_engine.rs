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

use flowgrid_lib::action::{primitive, windows, Action, PrimitiveAction, WindowsAction};
use flowgrid_lib::patch::PatchOp;
use flowgrid_lib::path::StorePath;
use flowgrid_lib::primitive::Primitive;
use pretty_assertions::assert_eq;
use testutils::demo_project;

fn toggle(path: StorePath) -> Action {
    Action::Primitive(PrimitiveAction::ToggleBool(primitive::ToggleBool { path }))
}

fn set_value(path: StorePath, value: Primitive) -> Action {
    Action::Primitive(PrimitiveAction::SetValue(primitive::SetValue {
        path,
        value,
    }))
}

/// The user-visible history count: the baseline record is not a gesture.
fn history_size(project: &testutils::DemoProject) -> usize {
    project.engine.history().len() - 1
}

#[test]
fn test_toggle_then_commit_records_one_gesture() {
    let mut project = demo_project();
    let running = project.path_of(project.running);

    project.engine.enqueue(toggle(running.clone()));
    project.engine.run_queued(true);

    assert_eq!(project.engine.store().get::<bool>(&running), Ok(false));
    assert_eq!(history_size(&project), 1);
}

#[test]
fn test_cancelling_toggles_leave_no_record() {
    // Two toggles of the same value inside one gesture merge and cancel:
    // the patch is empty, so no history record appears.
    let mut project = demo_project();
    let running = project.path_of(project.running);

    project.engine.enqueue(toggle(running.clone()));
    project.engine.run_queued(false);
    assert_eq!(project.engine.store().get::<bool>(&running), Ok(false));

    project.engine.enqueue(toggle(running.clone()));
    project.engine.run_queued(true);

    assert_eq!(project.engine.store().get::<bool>(&running), Ok(true));
    assert_eq!(history_size(&project), 0);
}

#[test]
fn test_gesture_collapse_to_single_replace() {
    // Three sets of the same field within one gesture merge into one
    // action, and the recorded patch replaces the initial value with the
    // last one.
    let mut project = demo_project();
    let volume = project.path_of(project.volume);

    for value in [0.2f32, 0.4, 0.8] {
        project
            .engine
            .enqueue(set_value(volume.clone(), Primitive::F32(value)));
        project.engine.run_queued(false);
    }
    project.engine.run_queued(true);

    assert_eq!(history_size(&project), 1);
    let gesture = project.engine.history().gesture_at(1);
    assert_eq!(gesture.actions.len(), 1);
    assert_eq!(
        gesture.actions[0].action,
        set_value(volume.clone(), Primitive::F32(0.8))
    );

    let patch = project.engine.history().create_patch(1);
    assert_eq!(
        patch.ops.get(&volume),
        Some(&PatchOp::Replace {
            value: Primitive::F32(0.8),
            old: Primitive::F32(1.0),
        })
    );
}

#[test]
fn test_rejected_action_is_dropped() {
    let mut project = demo_project();
    // Undo with an empty history is rejected by can_apply, not fatal.
    project.engine.enqueue(Action::Project(
        flowgrid_lib::action::ProjectAction::Undo(flowgrid_lib::action::project::Undo {}),
    ));
    project.engine.run_queued(true);
    assert_eq!(history_size(&project), 0);
}

#[test]
fn test_failed_action_discards_pending_gesture() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);

    project
        .engine
        .enqueue(set_value(volume.clone(), Primitive::F32(0.5)));
    // Toggling a path with no stored bool fails inside the handler; the
    // transient store resets, discarding the earlier edit of the gesture.
    project.engine.enqueue(toggle(StorePath::from("/No/Such")));
    project.engine.run_queued(true);

    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(1.0));
    assert_eq!(history_size(&project), 0);
}

#[test]
fn test_discard_gesture() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);

    project
        .engine
        .enqueue(set_value(volume.clone(), Primitive::F32(0.5)));
    project.engine.run_queued(false);
    project.engine.discard_gesture();
    project.engine.run_queued(true);

    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(1.0));
    assert_eq!(history_size(&project), 0);
}

#[test]
fn test_gesturing_holds_the_gesture_open() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);

    project.engine.set_gesturing(true);
    project
        .engine
        .enqueue(set_value(volume.clone(), Primitive::F32(0.3)));
    project.engine.run_queued(false);
    assert_eq!(history_size(&project), 0);

    // The edit is visible in the transient store before the commit.
    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(0.3));

    project.engine.set_gesturing(false);
    project.engine.run_queued(true);
    assert_eq!(history_size(&project), 1);
}

#[test]
fn test_field_values_are_clamped() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);
    project
        .engine
        .enqueue(set_value(volume.clone(), Primitive::F32(3.0)));
    project.engine.run_queued(true);
    // The volume field clamps to its 0..=1 range.
    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(1.0));
}

#[test]
fn test_windows_toggle_visible() {
    let mut project = demo_project();
    let visible = project.path_of(project.windows_visible);

    // The style window is the first registered window.
    project.engine.enqueue(Action::Windows(
        WindowsAction::ToggleVisible(windows::ToggleVisible {
            id: project.style_window.0,
        }),
    ));
    project.engine.run_queued(true);
    assert_eq!(
        project.engine.store().get::<bool>(&visible.join("0")),
        Ok(false)
    );
    assert_eq!(
        project.engine.store().get::<bool>(&visible.join("1")),
        Ok(true)
    );

    // Toggling twice within one gesture cancels out entirely.
    project.engine.enqueue(Action::Windows(
        WindowsAction::ToggleVisible(windows::ToggleVisible {
            id: project.faust_window.0,
        }),
    ));
    project.engine.run_queued(false);
    project.engine.enqueue(Action::Windows(
        WindowsAction::ToggleVisible(windows::ToggleVisible {
            id: project.faust_window.0,
        }),
    ));
    project.engine.run_queued(true);
    assert_eq!(
        project.engine.store().get::<bool>(&visible.join("1")),
        Ok(true)
    );
    assert_eq!(history_size(&project), 1);
}

#[test]
fn test_queue_applies_in_order() {
    let mut project = demo_project();
    let volume = project.path_of(project.volume);
    let alpha = project.path_of(project.alpha);

    project
        .engine
        .enqueue(set_value(volume.clone(), Primitive::F32(0.4)));
    project
        .engine
        .enqueue(set_value(alpha.clone(), Primitive::F32(0.6)));
    project
        .engine
        .enqueue(set_value(volume.clone(), Primitive::F32(0.2)));
    project.engine.run_queued(true);

    assert_eq!(project.engine.store().get::<f32>(&volume), Ok(0.2));
    assert_eq!(project.engine.store().get::<f32>(&alpha), Ok(0.6));
}

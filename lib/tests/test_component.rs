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

use std::cell::RefCell;
use std::rc::Rc;

use flowgrid_lib::action::{primitive, Action, PrimitiveAction};
use flowgrid_lib::component::ComponentId;
use flowgrid_lib::path::StorePath;
use flowgrid_lib::primitive::Primitive;
use flowgrid_lib::store::Store;
use pretty_assertions::assert_eq;
use testutils::{demo_project, demo_tree};

fn set_value(path: StorePath, value: Primitive) -> Action {
    Action::Primitive(PrimitiveAction::SetValue(primitive::SetValue {
        path,
        value,
    }))
}

#[test]
fn test_tree_indexes() {
    let (tree, ids) = demo_tree();
    let volume = tree.get(ids.volume).unwrap();
    assert_eq!(volume.path, StorePath::from("/Audio/Volume"));
    assert_eq!(tree.by_path(&volume.path), Some(ids.volume));

    // Per-element paths route to the owning container.
    assert_eq!(
        tree.find_nearest(&StorePath::from("/Style/Colors/3")),
        Some(ids.colors)
    );
    assert_eq!(
        tree.find_nearest(&StorePath::from("/Audio/Graph/Connections/1-2")),
        Some(ids.connections)
    );
    assert_eq!(tree.find_nearest(&StorePath::from("/Nowhere")), Some(tree.root()));
}

#[test]
fn test_names_and_labels() {
    let (tree, ids) = demo_tree();
    let gesture_duration = tree.get(ids.gesture_duration).unwrap();
    assert_eq!(gesture_duration.name, "Gesture duration sec");
    assert_eq!(
        gesture_duration.imgui_label,
        "Gesture duration sec##GestureDurationSec"
    );
    assert!(!gesture_duration.help.is_empty());
}

#[test]
fn test_remove_unlinks_component() {
    let (mut tree, ids) = demo_tree();
    let path = tree.get(ids.muted_nodes).unwrap().path.clone();
    tree.remove(ids.muted_nodes);
    assert_eq!(tree.by_path(&path), None);
    assert!(!tree.contains(ids.muted_nodes));
}

#[test]
fn test_json_round_trip() {
    let (tree, _ids) = demo_tree();
    let mut store = Store::new();
    tree.init_store(&mut store);
    store.set(StorePath::from("/Audio/Volume"), 0.25f32);
    store.insert_id_pair(&StorePath::from("/Audio/Graph/Connections"), (1, 2));
    store.set(StorePath::from("/Style/Colors/0"), 0xff00ffu32);

    let json = tree.to_json(&store);
    // Flat object keyed by JSON pointers.
    assert_eq!(json["/Audio/Volume"], 0.25);

    let (mut other_tree, _) = demo_tree();
    let mut other_store = Store::new();
    other_tree.init_store(&mut other_store);
    other_tree.set_json(&json, &mut other_store);
    assert_eq!(other_tree.to_json(&other_store), json);
}

#[test]
fn test_unknown_pointer_is_ignored() {
    let (mut tree, _ids) = demo_tree();
    let mut store = Store::new();
    tree.init_store(&mut store);
    let json = serde_json::json!({
        "/No/Such/Path": 1,
        "/Audio/Volume": 0.5,
    });
    tree.set_json(&json, &mut store);
    assert_eq!(store.get::<f32>(&StorePath::from("/Audio/Volume")), Ok(0.5));
    assert!(!store.contains(&StorePath::from("/No/Such/Path")));
}

#[test]
fn test_listener_fires_once_per_commit() {
    let mut project = demo_project();
    let volume_path = project.path_of(project.volume);
    let colors_path = project.path_of(project.colors);

    let log: Rc<RefCell<Vec<(ComponentId, ComponentId)>>> = Rc::new(RefCell::new(vec![]));
    let listener = ComponentId(42);
    let log_volume = log.clone();
    project.engine.register_change_listener(
        project.volume,
        listener,
        Box::new(move |listener, changed| log_volume.borrow_mut().push((listener, changed))),
    );
    let log_colors = log.clone();
    project.engine.register_change_listener(
        project.colors,
        listener,
        Box::new(move |listener, changed| log_colors.borrow_mut().push((listener, changed))),
    );

    // One gesture: two writes to the volume plus three per-index color ops.
    project
        .engine
        .enqueue(set_value(volume_path.clone(), Primitive::F32(0.5)));
    project
        .engine
        .enqueue(set_value(volume_path, Primitive::F32(0.75)));
    project.engine.enqueue(Action::Container(
        flowgrid_lib::action::ContainerAction::VectorSet(
            flowgrid_lib::action::container::VectorSet {
                path: colors_path,
                value: vec![
                    Primitive::U32(1),
                    Primitive::U32(2),
                    Primitive::U32(3),
                ],
            },
        ),
    ));
    project.engine.run_queued(true);

    // One notification per affected id, regardless of op count, in patch
    // path order (/Audio/Volume before /Style/Colors).
    assert_eq!(
        log.borrow().as_slice(),
        &[(listener, project.volume), (listener, project.colors)]
    );
}

#[test]
fn test_listener_fires_on_undo() {
    let mut project = demo_project();
    let volume_path = project.path_of(project.volume);
    let count = Rc::new(RefCell::new(0));
    let count_in = count.clone();
    project.engine.register_change_listener(
        project.volume,
        ComponentId(7),
        Box::new(move |_, _| *count_in.borrow_mut() += 1),
    );

    project
        .engine
        .enqueue(set_value(volume_path, Primitive::F32(0.5)));
    project.engine.run_queued(true);
    assert_eq!(*count.borrow(), 1);

    project.engine.undo();
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn test_field_cache_refreshes_after_commit() {
    let mut project = demo_project();
    let volume_path = project.path_of(project.volume);
    project
        .engine
        .enqueue(set_value(volume_path.clone(), Primitive::F32(0.5)));
    project.engine.run_queued(true);

    let cached = project
        .engine
        .tree()
        .get(project.volume)
        .unwrap()
        .field()
        .unwrap()
        .to_primitive();
    assert_eq!(cached, Primitive::F32(0.5));
    assert_eq!(project.engine.store().get::<f32>(&volume_path), Ok(0.5));
}

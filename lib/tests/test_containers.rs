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

use std::collections::HashSet;

use flowgrid_lib::action::{container, Action, ContainerAction};
use maplit::hashset;
use test_case::test_case;
use flowgrid_lib::component::{ComponentKind, ContainerValue};
use flowgrid_lib::containers::navigable;
use flowgrid_lib::path::StorePath;
use flowgrid_lib::primitive::Primitive;
use flowgrid_lib::store::Store;
use pretty_assertions::assert_eq;
use testutils::demo_project;

fn container_action(action: ContainerAction) -> Action {
    Action::Container(action)
}

#[test]
fn test_vector_set_and_resize() {
    let mut project = demo_project();
    let path = project.path_of(project.colors);

    project
        .engine
        .enqueue(container_action(ContainerAction::VectorSet(
            container::VectorSet {
                path: path.clone(),
                value: vec![Primitive::U32(1), Primitive::U32(2), Primitive::U32(3)],
            },
        )));
    project.engine.run_queued(true);
    assert_eq!(project.engine.store().get::<u32>(&path.join("2")), Ok(3));

    project
        .engine
        .enqueue(container_action(ContainerAction::VectorSetAt(
            container::VectorSetAt {
                path: path.clone(),
                i: 1,
                value: Primitive::U32(99),
            },
        )));
    project
        .engine
        .enqueue(container_action(ContainerAction::VectorResize(
            container::VectorResize {
                path: path.clone(),
                size: 2,
            },
        )));
    project.engine.run_queued(true);

    let cached = match &project.engine.tree().get(project.colors).unwrap().kind {
        ComponentKind::Container(ContainerValue::Vector(value)) => value.value.clone(),
        _ => panic!("colors is not a vector"),
    };
    assert_eq!(cached, vec![Primitive::U32(1), Primitive::U32(99)]);
    assert!(!project.engine.store().contains_primitive(&path.join("2")));
}

#[test]
fn test_vector2d_rows_may_differ_in_length() {
    let mut project = demo_project();
    let path = project.path_of(project.sample_rates);

    project
        .engine
        .enqueue(container_action(ContainerAction::Vector2DSet(
            container::Vector2DSet {
                path: path.clone(),
                value: vec![
                    vec![Primitive::U32(44100), Primitive::U32(48000)],
                    vec![Primitive::U32(96000)],
                ],
            },
        )));
    project.engine.run_queued(true);

    assert_eq!(
        project.engine.store().get::<u32>(&path.join("0").join("1")),
        Ok(48000)
    );
    assert_eq!(
        project.engine.store().get::<u32>(&path.join("1").join("0")),
        Ok(96000)
    );
    assert!(!project
        .engine
        .store()
        .contains_primitive(&path.join("1").join("1")));

    // Shrinking a row erases its tail.
    project
        .engine
        .enqueue(container_action(ContainerAction::Vector2DSet(
            container::Vector2DSet {
                path: path.clone(),
                value: vec![vec![Primitive::U32(22050)]],
            },
        )));
    project.engine.run_queued(true);
    assert!(!project
        .engine
        .store()
        .contains_primitive(&path.join("0").join("1")));
    assert!(!project
        .engine
        .store()
        .contains_primitive(&path.join("1").join("0")));
}

#[test]
fn test_u32_set_membership() {
    let mut project = demo_project();
    let path = project.path_of(project.muted_nodes);

    for value in [3u32, 5, 3] {
        project
            .engine
            .enqueue(container_action(ContainerAction::SetInsert(
                container::SetInsert {
                    path: path.clone(),
                    value,
                },
            )));
    }
    project.engine.run_queued(true);
    assert!(project.engine.store().contains_u32(&path, 3));
    assert!(project.engine.store().contains_u32(&path, 5));
    assert_eq!(project.engine.store().u32_set(&path).len(), 2);

    project
        .engine
        .enqueue(container_action(ContainerAction::SetErase(
            container::SetErase {
                path: path.clone(),
                value: 3,
            },
        )));
    project.engine.run_queued(true);
    assert!(!project.engine.store().contains_u32(&path, 3));

    project
        .engine
        .enqueue(container_action(ContainerAction::SetClear(
            container::SetClear { path: path.clone() },
        )));
    project.engine.run_queued(true);
    assert!(project.engine.store().u32_set(&path).is_empty());
}

#[test]
fn test_adjacency_reachability_excludes_disabled() {
    let mut project = demo_project();
    let path = project.path_of(project.connections);

    for (source, destination) in [(1, 2), (2, 3), (3, 4)] {
        project
            .engine
            .enqueue(container_action(ContainerAction::ToggleConnection(
                container::ToggleConnection {
                    path: path.clone(),
                    source,
                    destination,
                },
            )));
        project.engine.run_queued(true);
    }

    let adjacency = match &project.engine.tree().get(project.connections).unwrap().kind {
        ComponentKind::Container(ContainerValue::AdjacencyList(value)) => value.clone(),
        _ => panic!("connections is not an adjacency list"),
    };
    assert!(adjacency.is_connected(1, 2));
    assert!(!adjacency.is_connected(2, 1));
    assert!(adjacency.has_path(1, 4, &HashSet::new()));
    assert!(!adjacency.has_path(1, 4, &hashset! {3}));
    assert!(adjacency.has_path(1, 2, &hashset! {3}));

    // Toggling an existing edge disconnects it.
    project
        .engine
        .enqueue(container_action(ContainerAction::ToggleConnection(
            container::ToggleConnection {
                path: path.clone(),
                source: 2,
                destination: 3,
            },
        )));
    project.engine.run_queued(true);
    assert!(!project.engine.store().has_id_pair(&path, (2, 3)));
}

#[test]
fn test_navigable_push_back_forward() {
    let mut project = demo_project();
    let path = project.path_of(project.inspect_history);

    for id in [10u32, 20, 30] {
        project
            .engine
            .enqueue(container_action(ContainerAction::NavigablePush(
                container::NavigablePush {
                    path: path.clone(),
                    value: id,
                },
            )));
        project.engine.run_queued(true);
    }
    let current = |project: &testutils::DemoProject| {
        match &project
            .engine
            .tree()
            .get(project.inspect_history)
            .unwrap()
            .kind
        {
            ComponentKind::Container(ContainerValue::Navigable(value)) => value.clone(),
            _ => panic!("not a navigable"),
        }
    };
    assert_eq!(current(&project).current(), Some(30));

    project
        .engine
        .enqueue(container_action(ContainerAction::NavigableBack(
            container::NavigableBack { path: path.clone() },
        )));
    project.engine.run_queued(true);
    assert_eq!(current(&project).current(), Some(20));

    // Pushing truncates the forward tail.
    project
        .engine
        .enqueue(container_action(ContainerAction::NavigablePush(
            container::NavigablePush {
                path: path.clone(),
                value: 40,
            },
        )));
    project.engine.run_queued(true);
    let value = current(&project);
    assert_eq!(value.value, vec![10, 20, 40]);
    assert_eq!(value.current(), Some(40));
    assert!(!value.can_move_forward());

    // Back at the start is rejected by the engine.
    project
        .engine
        .enqueue(container_action(ContainerAction::NavigableBack(
            container::NavigableBack { path: path.clone() },
        )));
    project.engine.run_queued(true);
    project
        .engine
        .enqueue(container_action(ContainerAction::NavigableBack(
            container::NavigableBack { path: path.clone() },
        )));
    project.engine.run_queued(true);
    assert_eq!(current(&project).current(), Some(10));
    assert!(!current(&project).can_move_back());
}

#[test_case(2 ; "capacity two")]
#[test_case(3 ; "capacity three")]
fn test_navigable_capacity_drops_oldest(capacity: usize) {
    let mut store = Store::new();
    let path = StorePath::from("/trail");
    for id in [1u32, 2, 3, 4] {
        navigable::push(&mut store, &path, id, Some(capacity));
    }
    let items: Vec<u32> = (0..)
        .map_while(|i| store.find::<u32>(&path.join(i.to_string())))
        .collect();
    assert_eq!(items.len(), capacity);
    assert_eq!(items.last(), Some(&4));
    assert_eq!(items.first(), Some(&(4 - capacity as u32 + 1)));
}

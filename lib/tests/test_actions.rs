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

use assert_matches::assert_matches;
use flowgrid_lib::action::{
    container, primitive, project, store, text_buffer, windows, Action, ActionError,
    ContainerAction, Merged, PrimitiveAction, ProjectAction, StoreAction, TextBufferAction,
    WindowsAction,
};
use flowgrid_lib::patch::{Patch, PatchOp, PatchOps};
use flowgrid_lib::path::StorePath;
use flowgrid_lib::primitive::Primitive;
use pretty_assertions::assert_eq;

fn sample_actions() -> Vec<Action> {
    vec![
        Action::Store(StoreAction::ApplyPatch(store::ApplyPatch {
            patch: Patch::new(
                PatchOps::from([(
                    StorePath::from("/x"),
                    PatchOp::Add {
                        value: Primitive::U32(1),
                    },
                )]),
                StorePath::root(),
            ),
        })),
        Action::Primitive(PrimitiveAction::ToggleBool(primitive::ToggleBool {
            path: StorePath::from("/Audio/Running"),
        })),
        Action::Primitive(PrimitiveAction::SetFlags(primitive::SetFlags {
            path: StorePath::from("/Windows/Flags"),
            value: 3,
        })),
        Action::Container(ContainerAction::VectorSetAt(container::VectorSetAt {
            path: StorePath::from("/Style/Colors"),
            i: 2,
            value: Primitive::U32(0xff00ff),
        })),
        Action::Container(ContainerAction::ToggleConnection(
            container::ToggleConnection {
                path: StorePath::from("/Audio/Graph/Connections"),
                source: 1,
                destination: 2,
            },
        )),
        Action::TextBuffer(TextBufferAction::MoveCursorsChar(
            text_buffer::MoveCursorsChar {
                path: StorePath::from("/Faust/Code"),
                right: true,
                select: false,
                word: true,
            },
        )),
        Action::TextBuffer(TextBufferAction::Paste(text_buffer::Paste {
            path: StorePath::from("/Faust/Code"),
            text: "process = _;".into(),
        })),
        Action::Project(ProjectAction::SetHistoryIndex(project::SetHistoryIndex {
            index: 3,
        })),
        Action::Project(ProjectAction::Open(project::Open {
            file_path: "/tmp/song.fls".into(),
        })),
        Action::Windows(WindowsAction::ToggleVisible(windows::ToggleVisible {
            id: 0xdeadbeef,
        })),
    ]
}

#[test]
fn test_json_round_trip_across_groups() {
    for action in sample_actions() {
        let json = action.to_json();
        assert_eq!(
            Action::from_json(&json).unwrap(),
            action,
            "round trip failed for {}",
            action.path()
        );
    }
}

#[test]
fn test_action_paths_are_stable() {
    let paths: Vec<&str> = sample_actions().iter().map(|action| action.path()).collect();
    assert_eq!(
        paths,
        vec![
            "Store/ApplyPatch",
            "Primitive/Bool/Toggle",
            "Primitive/Flags/Set",
            "Container/Vector/SetAt",
            "Container/AdjacencyList/ToggleConnection",
            "TextBuffer/MoveCursorsChar",
            "TextBuffer/Paste",
            "Project/SetHistoryIndex",
            "Project/Open",
            "Windows/ToggleVisible",
        ]
    );
}

#[test]
fn test_unknown_path_is_rejected() {
    let json = serde_json::json!(["Audio/Nope", {"path": "/x"}]);
    assert_matches!(Action::from_json(&json), Err(ActionError::UnknownPath(_)));
    let json = serde_json::json!({"path": "/x"});
    assert_matches!(Action::from_json(&json), Err(ActionError::Malformed(_)));
}

#[test]
fn test_saved_subset() {
    let saved: Vec<bool> = sample_actions()
        .iter()
        .map(|action| action.is_saved())
        .collect();
    // Store, primitive, container, windows, and buffer edits are saved;
    // project-level actions and cursor-only reads are policy-dependent.
    assert!(saved[0] && saved[1] && saved[2] && saved[3] && saved[4]);
    assert!(!Action::Project(ProjectAction::Undo(project::Undo {})).is_saved());
    assert!(
        !Action::TextBuffer(TextBufferAction::Copy(text_buffer::Copy {
            path: StorePath::from("/Faust/Code"),
        }))
        .is_saved()
    );
}

#[test]
fn test_merge_same_path_wins() {
    let set = |value: i32| {
        Action::Primitive(PrimitiveAction::SetFlags(primitive::SetFlags {
            path: StorePath::from("/flags"),
            value,
        }))
    };
    assert_eq!(set(1).merge(&set(2)), Merged::Merged(set(2)));

    let other_path = Action::Primitive(PrimitiveAction::SetFlags(primitive::SetFlags {
        path: StorePath::from("/other"),
        value: 2,
    }));
    assert_eq!(set(1).merge(&other_path), Merged::Unmerged);
}

#[test]
fn test_merge_cancelling_pairs() {
    let toggle = Action::Primitive(PrimitiveAction::ToggleBool(primitive::ToggleBool {
        path: StorePath::from("/a"),
    }));
    assert_eq!(toggle.merge(&toggle), Merged::Cancel);

    let connect = Action::Container(ContainerAction::ToggleConnection(
        container::ToggleConnection {
            path: StorePath::from("/edges"),
            source: 1,
            destination: 2,
        },
    ));
    assert_eq!(connect.merge(&connect), Merged::Cancel);

    let back = Action::Container(ContainerAction::NavigableBack(container::NavigableBack {
        path: StorePath::from("/trail"),
    }));
    let forward = Action::Container(ContainerAction::NavigableForward(
        container::NavigableForward {
            path: StorePath::from("/trail"),
        },
    ));
    assert_eq!(back.merge(&forward), Merged::Cancel);
    assert_eq!(forward.merge(&back), Merged::Cancel);
}

#[test]
fn test_merge_patches() {
    let apply = |op: PatchOp| {
        Action::Store(StoreAction::ApplyPatch(store::ApplyPatch {
            patch: Patch::new(
                PatchOps::from([(StorePath::from("/x"), op)]),
                StorePath::root(),
            ),
        }))
    };
    let add = apply(PatchOp::Add {
        value: Primitive::U32(1),
    });
    let remove = apply(PatchOp::Remove {
        old: Primitive::U32(1),
    });
    // Add then remove of the same value cancels at the patch level.
    assert_eq!(add.merge(&remove), Merged::Cancel);

    let replace = apply(PatchOp::Replace {
        value: Primitive::U32(2),
        old: Primitive::U32(1),
    });
    let expected = apply(PatchOp::Add {
        value: Primitive::U32(2),
    });
    assert_eq!(add.merge(&replace), Merged::Merged(expected));

    // Adding the same value twice still transitions the path, so the
    // merged action keeps the add.
    assert_eq!(add.merge(&add), Merged::Merged(add.clone()));
    let replace_same = apply(PatchOp::Replace {
        value: Primitive::U32(1),
        old: Primitive::U32(1),
    });
    assert_eq!(add.merge(&replace_same), Merged::Merged(add.clone()));
}

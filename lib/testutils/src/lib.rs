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

use flowgrid_lib::component::{ComponentArgs, ComponentId, ComponentTree};
use flowgrid_lib::engine::Engine;
use flowgrid_lib::primitive::PrimitiveKind;
use flowgrid_lib::settings::Settings;
use flowgrid_lib::text::LanguageId;
use tempfile::TempDir;

pub const DEFAULT_FAUST_CODE: &str = "import(\"stdfaust.lib\");\nprocess = _;";

/// The canonical demo project: the tree the integration tests drive. Its
/// shape mirrors the application (settings, style, audio graph, a Faust
/// editor, windows), without any UI.
pub struct DemoProject {
    pub engine: Engine,
    // Fields
    pub gesture_duration: ComponentId,
    pub alpha: ComponentId,
    pub label_mode: ComponentId,
    pub colors: ComponentId,
    pub running: ComponentId,
    pub volume: ComponentId,
    pub sample_rates: ComponentId,
    // Containers
    pub connections: ComponentId,
    pub muted_nodes: ComponentId,
    pub inspect_history: ComponentId,
    pub code: ComponentId,
    // Windows
    pub windows_visible: ComponentId,
    pub style_window: ComponentId,
    pub faust_window: ComponentId,
    pub debug_window: ComponentId,
    // Keep the internal dir alive for the engine's lifetime.
    pub temp_dir: TempDir,
}

pub fn demo_tree() -> (ComponentTree, DemoIds) {
    let mut tree = ComponentTree::new();
    let root = tree.root();

    let settings = tree.add_group(root, "Settings", ComponentArgs::default());
    let gesture_duration = tree.add_f32(
        settings,
        "GestureDurationSec",
        ComponentArgs::meta(
            "?Merge actions occurring in short succession into a single gesture",
        ),
        0.5,
        0.0,
        5.0,
    );

    let style = tree.add_group(root, "Style", ComponentArgs::default());
    let alpha = tree.add_f32(style, "Alpha", ComponentArgs::default(), 1.0, 0.0, 1.0);
    let label_mode = tree.add_enum(
        style,
        "LabelMode",
        ComponentArgs::default(),
        vec!["Annotated".into(), "Raw".into()],
        0,
    );
    let colors = tree.add_vector(style, "Colors", ComponentArgs::default(), PrimitiveKind::U32);

    let audio = tree.add_group(root, "Audio", ComponentArgs::default());
    let running = tree.add_bool(audio, "Running", ComponentArgs::default(), true);
    let volume = tree.add_f32(audio, "Volume", ComponentArgs::default(), 1.0, 0.0, 1.0);
    let sample_rates = tree.add_vector2d(
        audio,
        "SampleRates",
        ComponentArgs::default(),
        PrimitiveKind::U32,
    );
    let graph = tree.add_group(audio, "Graph", ComponentArgs::default());
    let connections = tree.add_adjacency_list(graph, "Connections", ComponentArgs::default());
    let muted_nodes = tree.add_u32_set(graph, "MutedNodes", ComponentArgs::default());
    let inspect_history = tree.add_navigable(
        graph,
        "NodeInspectHistory",
        ComponentArgs::default(),
        Some(50),
    );

    let faust = tree.add_group(root, "Faust", ComponentArgs::default());
    let code = tree.add_text_buffer(
        faust,
        "Code",
        ComponentArgs::default(),
        DEFAULT_FAUST_CODE,
        LanguageId::Faust,
    );
    tree.add_string(faust, "Error", ComponentArgs::default(), "");

    let windows = tree.add_group(root, "Windows", ComponentArgs::default());
    let windows_visible = tree.add_vector(
        windows,
        "VisibleComponents",
        ComponentArgs::default(),
        PrimitiveKind::Bool,
    );
    let debug_window = tree.add_group(root, "Debug", ComponentArgs::default());
    tree.add_bool(debug_window, "AutoSelect", ComponentArgs::default(), true);

    let ids = DemoIds {
        gesture_duration,
        alpha,
        label_mode,
        colors,
        running,
        volume,
        sample_rates,
        connections,
        muted_nodes,
        inspect_history,
        code,
        windows_visible,
        style_window: style,
        faust_window: faust,
        debug_window,
    };
    (tree, ids)
}

pub struct DemoIds {
    pub gesture_duration: ComponentId,
    pub alpha: ComponentId,
    pub label_mode: ComponentId,
    pub colors: ComponentId,
    pub running: ComponentId,
    pub volume: ComponentId,
    pub sample_rates: ComponentId,
    pub connections: ComponentId,
    pub muted_nodes: ComponentId,
    pub inspect_history: ComponentId,
    pub code: ComponentId,
    pub windows_visible: ComponentId,
    pub style_window: ComponentId,
    pub faust_window: ComponentId,
    pub debug_window: ComponentId,
}

pub fn demo_settings() -> Settings {
    Settings {
        // Long enough that consecutive test actions land in one gesture
        // unless a test force-commits.
        gesture_duration: Duration::from_secs(60),
        ..Settings::default()
    }
}

/// A ready-to-drive engine over the demo tree, with its internal directory
/// in a temp dir and the windows subsystem wired.
pub fn demo_project() -> DemoProject {
    demo_project_with_settings(demo_settings())
}

pub fn demo_project_with_settings(settings: Settings) -> DemoProject {
    let temp_dir = new_temp_dir();
    let (tree, ids) = demo_tree();
    let internal_dir = temp_dir.path().join(".flowgrid");
    let mut engine = Engine::with_internal_dir(tree, settings, internal_dir);
    engine.set_window_components(
        ids.windows_visible,
        vec![ids.style_window, ids.faust_window, ids.debug_window],
    );
    DemoProject {
        engine,
        gesture_duration: ids.gesture_duration,
        alpha: ids.alpha,
        label_mode: ids.label_mode,
        colors: ids.colors,
        running: ids.running,
        volume: ids.volume,
        sample_rates: ids.sample_rates,
        connections: ids.connections,
        muted_nodes: ids.muted_nodes,
        inspect_history: ids.inspect_history,
        code: ids.code,
        windows_visible: ids.windows_visible,
        style_window: ids.style_window,
        faust_window: ids.faust_window,
        debug_window: ids.debug_window,
        temp_dir,
    }
}

impl DemoProject {
    /// The store path of a demo component.
    pub fn path_of(&self, id: ComponentId) -> flowgrid_lib::path::StorePath {
        self.engine.tree().get(id).unwrap().path.clone()
    }
}

pub fn new_temp_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("flowgrid-test-")
        .tempdir()
        .unwrap()
}

/// Panics if `test_dir` contains a `test_*.rs` not declared in `runner.rs`.
pub fn assert_no_forgotten_test_files(test_dir: &Path) {
    let runner = std::fs::read_to_string(test_dir.join("runner.rs")).unwrap();
    for entry in std::fs::read_dir(test_dir).unwrap() {
        let file_name = entry.unwrap().file_name();
        let file_name = file_name.to_str().unwrap();
        if let Some(stem) = file_name
            .strip_prefix("test_")
            .and_then(|name| name.strip_suffix(".rs"))
        {
            assert!(
                runner.contains(&format!("mod test_{stem};")),
                "test file {file_name} is not declared in runner.rs"
            );
        }
    }
}

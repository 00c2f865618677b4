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

//! A directed edge set between component ids, stored as a single
//! `IdPairSet` leaf. Reachability drives "connected to a sink" activation
//! in the audio graph.

use std::collections::HashSet;

use crate::path::StorePath;
use crate::store::{Id, IdPairSet, Store};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdjacencyListValue {
    pub value: IdPairSet,
}

impl AdjacencyListValue {
    pub fn refresh(&mut self, store: &Store, path: &StorePath) {
        self.value = store.id_pairs(path);
    }

    pub fn is_connected(&self, source: Id, destination: Id) -> bool {
        self.value.contains(&(source, destination))
    }

    /// Whether `to` is reachable from `from` along edges whose endpoints are
    /// not in `disabled`.
    pub fn has_path(&self, from: Id, to: Id, disabled: &HashSet<Id>) -> bool {
        has_path(&self.value, from, to, disabled)
    }
}

pub fn connect(store: &mut Store, path: &StorePath, source: Id, destination: Id) {
    if store.has_id_pair(path, (source, destination)) {
        return;
    }
    store.insert_id_pair(path, (source, destination));
}

pub fn disconnect(store: &mut Store, path: &StorePath, source: Id, destination: Id) {
    store.erase_id_pair(path, (source, destination));
}

pub fn toggle_connection(store: &mut Store, path: &StorePath, source: Id, destination: Id) {
    if store.has_id_pair(path, (source, destination)) {
        disconnect(store, path, source, destination);
    } else {
        connect(store, path, source, destination);
    }
}

pub fn clear(store: &mut Store, path: &StorePath) {
    store.clear_id_pairs(path);
}

/// Non-recursive depth-first search that handles cycles.
pub fn has_path(edges: &IdPairSet, from: Id, to: Id, disabled: &HashSet<Id>) -> bool {
    let mut visited = HashSet::new();
    let mut to_visit = vec![from];
    while let Some(current) = to_visit.pop() {
        if disabled.contains(&current) {
            continue;
        }
        if current == to {
            return true;
        }
        if visited.insert(current) {
            for &(source, destination) in edges {
                if source == current {
                    to_visit.push(destination);
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_path_excludes_disabled() {
        let edges = IdPairSet::from(vec![(1, 2), (2, 3), (3, 4)]);
        assert!(has_path(&edges, 1, 4, &HashSet::new()));
        assert!(!has_path(&edges, 1, 4, &HashSet::from([3])));
        assert!(has_path(&edges, 1, 2, &HashSet::from([3])));
        assert!(!has_path(&edges, 4, 1, &HashSet::new()));
    }

    #[test]
    fn test_has_path_handles_cycles() {
        let edges = IdPairSet::from(vec![(1, 2), (2, 1), (2, 3)]);
        assert!(has_path(&edges, 1, 3, &HashSet::new()));
        assert!(!has_path(&edges, 1, 4, &HashSet::new()));
        // A node reaches itself trivially.
        assert!(has_path(&edges, 1, 1, &HashSet::new()));
    }
}

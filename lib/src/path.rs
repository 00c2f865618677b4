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

use std::fmt::{Debug, Display, Error, Formatter};
use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A single segment of a [`StorePath`]. Non-empty and free of `/`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct PathComponent {
    value: String,
}

impl PathComponent {
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl From<&str> for PathComponent {
    fn from(value: &str) -> Self {
        assert!(!value.is_empty());
        assert!(!value.contains('/'));
        PathComponent {
            value: value.to_owned(),
        }
    }
}

impl From<String> for PathComponent {
    fn from(value: String) -> Self {
        assert!(!value.is_empty());
        assert!(!value.contains('/'));
        PathComponent { value }
    }
}

/// A hierarchical key into the store. The root path is `/`; all other paths
/// are `/`-joined sequences of non-empty components.
///
/// Paths are immutable values. They hash and order by their components, so
/// they can key both hashed and ordered maps.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorePath {
    components: Vec<PathComponent>,
}

impl Debug for StorePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{:?}", self.to_internal_string())
    }
}

impl Display for StorePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.to_internal_string())
    }
}

impl StorePath {
    pub const SEPARATOR: char = '/';

    pub fn root() -> Self {
        StorePath { components: vec![] }
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// The full string form used internally and in serialized projects:
    /// a leading `/` followed by `/`-joined components (`/` for the root).
    pub fn to_internal_string(&self) -> String {
        if self.is_root() {
            return String::from("/");
        }
        let mut result = String::new();
        for component in &self.components {
            result.push(Self::SEPARATOR);
            result.push_str(component.value());
        }
        result
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// Returns a new path with `component` appended.
    pub fn join(&self, component: impl Into<PathComponent>) -> StorePath {
        let mut components = self.components.clone();
        components.push(component.into());
        StorePath { components }
    }

    /// Returns a new path with all of `tail`'s components appended.
    pub fn concat(&self, tail: &StorePath) -> StorePath {
        let mut components = self.components.clone();
        components.extend(tail.components.iter().cloned());
        StorePath { components }
    }

    pub fn parent(&self) -> Option<StorePath> {
        match self.components.len() {
            0 => None,
            n => Some(StorePath {
                components: self.components[..n - 1].to_vec(),
            }),
        }
    }

    /// Splits into the parent path and the last component.
    pub fn split(&self) -> Option<(StorePath, &PathComponent)> {
        match self.components.len() {
            0 => None,
            n => Some((
                StorePath {
                    components: self.components[..n - 1].to_vec(),
                },
                &self.components[n - 1],
            )),
        }
    }

    pub fn last(&self) -> Option<&PathComponent> {
        self.components.last()
    }

    pub fn starts_with(&self, base: &StorePath) -> bool {
        self.components.len() >= base.components.len()
            && self.components[..base.components.len()] == base.components[..]
    }

    /// The path relative to `base`, or `None` if `base` is not an ancestor.
    /// `p.relative_to(&StorePath::root()) == Some(p)`.
    pub fn relative_to(&self, base: &StorePath) -> Option<StorePath> {
        if !self.starts_with(base) {
            return None;
        }
        Some(StorePath {
            components: self.components[base.components.len()..].to_vec(),
        })
    }
}

impl From<&str> for StorePath {
    fn from(value: &str) -> Self {
        StorePath {
            components: value
                .split(Self::SEPARATOR)
                .filter(|segment| !segment.is_empty())
                .map(PathComponent::from)
                .collect(),
        }
    }
}

impl FromStr for StorePath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StorePath::from(s))
    }
}

impl Serialize for StorePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_internal_string())
    }
}

impl<'de> Deserialize<'de> for StorePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(StorePath::from(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let root = StorePath::root();
        assert!(root.is_root());
        assert_eq!(root.to_internal_string(), "/");
        assert_eq!(root.parent(), None);
        assert_eq!(StorePath::from("/"), root);
        assert_eq!(StorePath::from(""), root);
    }

    #[test]
    fn test_join_and_split() {
        let path = StorePath::root().join("Audio").join("Graph");
        assert_eq!(path.to_internal_string(), "/Audio/Graph");
        assert_eq!(path.parent(), Some(StorePath::from("/Audio")));
        let (parent, last) = path.split().unwrap();
        assert_eq!(parent, StorePath::from("/Audio"));
        assert_eq!(last.value(), "Graph");
    }

    #[test]
    fn test_relative_to() {
        let path = StorePath::from("/Audio/Graph/Connections");
        let base = StorePath::from("/Audio");
        assert_eq!(
            path.relative_to(&base),
            Some(StorePath::from("/Graph/Connections"))
        );
        assert_eq!(path.relative_to(&StorePath::root()), Some(path.clone()));
        assert_eq!(path.relative_to(&StorePath::from("/Style")), None);
        assert!(path.starts_with(&base));
        assert!(!base.starts_with(&path));
    }

    #[test]
    fn test_ordering() {
        let mut paths = vec![
            StorePath::from("/b"),
            StorePath::from("/a/b"),
            StorePath::from("/a"),
            StorePath::root(),
        ];
        paths.sort();
        assert_eq!(
            paths,
            vec![
                StorePath::root(),
                StorePath::from("/a"),
                StorePath::from("/a/b"),
                StorePath::from("/b"),
            ]
        );
    }
}

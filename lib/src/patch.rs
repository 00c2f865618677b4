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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::StorePath;
use crate::primitive::Primitive;

/// One edit at one path. `value` is the state after the op, `old` the state
/// before it; together they make a patch invertible.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { value: Primitive },
    Remove { old: Primitive },
    Replace { value: Primitive, old: Primitive },
}

impl PatchOp {
    pub fn value(&self) -> Option<&Primitive> {
        match self {
            PatchOp::Add { value } | PatchOp::Replace { value, .. } => Some(value),
            PatchOp::Remove { .. } => None,
        }
    }

    pub fn old(&self) -> Option<&Primitive> {
        match self {
            PatchOp::Remove { old } | PatchOp::Replace { old, .. } => Some(old),
            PatchOp::Add { .. } => None,
        }
    }
}

/// Ordered by relative path, so iteration (and thus listener notification)
/// is in path order.
pub type PatchOps = BTreeMap<StorePath, PatchOp>;

/// A minimal ordered set of edits turning one store snapshot into another.
/// Applying a patch to its `before` snapshot yields exactly its `after`
/// snapshot.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Patch {
    pub ops: PatchOps,
    pub base: StorePath,
}

impl Patch {
    pub fn new(ops: PatchOps, base: StorePath) -> Self {
        Patch { ops, base }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Absolute paths of all ops, in op order.
    pub fn paths(&self) -> impl Iterator<Item = StorePath> + '_ {
        self.ops.keys().map(|relative| self.base.concat(relative))
    }

    /// Whether a listener rooted at `path` is affected by this patch.
    pub fn is_prefix_of_any_path(&self, path: &StorePath) -> bool {
        self.paths().any(|candidate| candidate.starts_with(path))
    }

    /// Merges two chronologically consecutive patches into the minimal patch
    /// representing "self, then other". For consecutive patches `p1` (a -> b)
    /// and `p2` (b -> c), applying the merged patch to `a` yields `c`.
    pub fn merge(&self, other: &Patch) -> Patch {
        assert_eq!(self.base, other.base);
        Patch {
            ops: merge_ops(&self.ops, &other.ops),
            base: self.base.clone(),
        }
    }
}

/// Merge algebra over ops at the same path.
///
/// Two consecutive patches that both add or both remove the same key can't
/// strictly happen, but the rules stay lax so that a chain of patches can be
/// merged pairwise. For example, if the first patch removes a path and the
/// second adds the same path, the pair alone can't tell whether the added
/// value matches the pre-remove value (cancelling out) or differs (a
/// replace), so both cases are handled.
pub fn merge_ops(a: &PatchOps, b: &PatchOps) -> PatchOps {
    let mut merged = a.clone();
    for (path, op) in b {
        let Some(old_op) = merged.get(path) else {
            merged.insert(path.clone(), op.clone());
            continue;
        };
        match old_op.clone() {
            PatchOp::Add { .. } => match op {
                PatchOp::Remove { .. } => {
                    merged.remove(path);
                }
                PatchOp::Add { value } | PatchOp::Replace { value, .. } => {
                    // The path still transitions from absent to present, so
                    // the merged op stays an add; the newest value wins.
                    merged.insert(
                        path.clone(),
                        PatchOp::Add {
                            value: value.clone(),
                        },
                    );
                }
            },
            PatchOp::Remove { old } => match op {
                PatchOp::Add { value } | PatchOp::Replace { value, .. } => {
                    if *value == old {
                        merged.remove(path);
                    } else {
                        merged.insert(
                            path.clone(),
                            PatchOp::Replace {
                                value: value.clone(),
                                old,
                            },
                        );
                    }
                }
                PatchOp::Remove { .. } => {
                    merged.insert(path.clone(), PatchOp::Remove { old });
                }
            },
            PatchOp::Replace { old, .. } => match op {
                PatchOp::Add { value } | PatchOp::Replace { value, .. } => {
                    merged.insert(
                        path.clone(),
                        PatchOp::Replace {
                            value: value.clone(),
                            old,
                        },
                    );
                }
                PatchOp::Remove { .. } => {
                    merged.insert(path.clone(), PatchOp::Remove { old });
                }
            },
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op_add(value: u32) -> PatchOp {
        PatchOp::Add {
            value: Primitive::U32(value),
        }
    }

    fn patch_at(path: &str, op: PatchOp) -> Patch {
        Patch::new(
            PatchOps::from([(StorePath::from(path), op)]),
            StorePath::root(),
        )
    }

    #[test]
    fn test_merge_add_then_replace() {
        let p1 = patch_at("/x", op_add(1));
        let p2 = patch_at(
            "/x",
            PatchOp::Replace {
                value: Primitive::U32(2),
                old: Primitive::U32(1),
            },
        );
        assert_eq!(p1.merge(&p2), patch_at("/x", op_add(2)));
    }

    #[test]
    fn test_merge_add_then_remove_cancels() {
        let p1 = patch_at("/x", op_add(1));
        let p2 = patch_at(
            "/x",
            PatchOp::Remove {
                old: Primitive::U32(1),
            },
        );
        assert!(p1.merge(&p2).is_empty());
    }

    #[test]
    fn test_merge_remove_then_add_same_value_cancels() {
        let p1 = patch_at(
            "/x",
            PatchOp::Remove {
                old: Primitive::U32(1),
            },
        );
        assert!(p1.merge(&patch_at("/x", op_add(1))).is_empty());
        assert_eq!(
            p1.merge(&patch_at("/x", op_add(2))),
            patch_at(
                "/x",
                PatchOp::Replace {
                    value: Primitive::U32(2),
                    old: Primitive::U32(1),
                }
            )
        );
    }

    #[test]
    fn test_merge_replace_then_remove() {
        let p1 = patch_at(
            "/x",
            PatchOp::Replace {
                value: Primitive::U32(2),
                old: Primitive::U32(1),
            },
        );
        let p2 = patch_at(
            "/x",
            PatchOp::Remove {
                old: Primitive::U32(2),
            },
        );
        assert_eq!(
            p1.merge(&p2),
            patch_at(
                "/x",
                PatchOp::Remove {
                    old: Primitive::U32(1),
                }
            )
        );
    }

    #[test]
    fn test_is_prefix_of_any_path() {
        let patch = Patch::new(
            PatchOps::from([(StorePath::from("/Audio/Graph/Connections/1-2"), op_add(1))]),
            StorePath::root(),
        );
        assert!(patch.is_prefix_of_any_path(&StorePath::from("/Audio")));
        assert!(patch.is_prefix_of_any_path(&StorePath::from("/Audio/Graph/Connections")));
        assert!(!patch.is_prefix_of_any_path(&StorePath::from("/Style")));
        assert!(patch.is_prefix_of_any_path(&StorePath::root()));
    }
}

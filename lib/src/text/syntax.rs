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

//! The contract between the buffer and an incremental syntax parser. The
//! parser itself (a tree-sitter wrapper in the application) is an external
//! collaborator; the buffer only promises byte-accurate edit reports.

use std::fmt::Debug;

use super::lines::Lines;

/// One byte-range edit, in the flat (newline-joined) text.
/// `start_byte..old_end_byte` was replaced by `start_byte..new_end_byte`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InputEdit {
    pub start_byte: u32,
    pub old_end_byte: u32,
    pub new_end_byte: u32,
}

impl InputEdit {
    pub fn new(start_byte: u32, old_end_byte: u32, new_end_byte: u32) -> Self {
        InputEdit {
            start_byte,
            old_end_byte,
            new_end_byte,
        }
    }

    /// The edit that undoes this one.
    pub fn invert(self) -> Self {
        InputEdit {
            start_byte: self.start_byte,
            old_end_byte: self.new_end_byte,
            new_end_byte: self.old_end_byte,
        }
    }
}

/// A style change point: bytes from `byte_index` up to the next transition
/// take `capture`'s style (empty capture = default style).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StyleTransition {
    pub byte_index: u32,
    pub capture: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SyntaxNode {
    pub kind: String,
    pub field_name: String,
    pub start_byte: u32,
    pub end_byte: u32,
}

/// An incremental parser fed by the buffer after every committed edit batch
/// (forward edits on commit/redo, inverted edits on undo).
pub trait SyntaxParser: Debug {
    /// Reports an edit batch along with read access to the post-edit text.
    fn apply_edits(&mut self, text: &Lines, edits: &[InputEdit]);

    /// S-expression of the current tree.
    fn s_expression(&self) -> String;

    /// Style transitions over the whole text, ordered by byte index.
    fn style_transitions(&self) -> Vec<StyleTransition>;

    /// Innermost-last ancestry of the node spanning `byte_index`.
    fn node_ancestry_at_byte(&self, byte_index: u32) -> Vec<SyntaxNode>;

    /// Byte ranges whose styling changed since the previous parse.
    fn changed_ranges(&self) -> Vec<(u32, u32)>;
}

/// Parser used when no language is attached: everything is plain text.
#[derive(Clone, Debug, Default)]
pub struct PlainTextParser;

impl SyntaxParser for PlainTextParser {
    fn apply_edits(&mut self, _text: &Lines, _edits: &[InputEdit]) {}

    fn s_expression(&self) -> String {
        String::new()
    }

    fn style_transitions(&self) -> Vec<StyleTransition> {
        vec![]
    }

    fn node_ancestry_at_byte(&self, _byte_index: u32) -> Vec<SyntaxNode> {
        vec![]
    }

    fn changed_ranges(&self) -> Vec<(u32, u32)> {
        vec![]
    }
}

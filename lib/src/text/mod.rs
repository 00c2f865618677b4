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

//! The multi-cursor text buffer: persistent line storage, cursor handling,
//! per-commit undo, and the incremental-parse edit feed.

pub mod buffer;
pub mod cursor;
pub mod language;
pub mod lines;
pub mod syntax;

pub use buffer::TextBuffer;
pub use cursor::{Cursor, Cursors};
pub use language::{language, language_for_path, Language, LanguageId};
pub use lines::{Coords, Line, LineChar, Lines};
pub use syntax::{InputEdit, PlainTextParser, StyleTransition, SyntaxNode, SyntaxParser};

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

//! The multi-cursor edit engine over persistent lines.
//!
//! Every user-visible operation snapshots the cursors, mutates the text in
//! reverse cursor order (so earlier positions stay valid), accumulates
//! byte-accurate [`InputEdit`]s, and commits: push a snapshot to the undo
//! history and feed the edit batch to the syntax parser.

use std::collections::BTreeSet;

use itertools::Itertools;

use super::cursor::{Cursor, Cursors};
use super::language::{language, LanguageId};
use super::lines::{
    fold_case, is_blank_byte, is_word_byte, lines_from_str, lines_to_string, utf8_char_length,
    Coords, Line, LineChar, Lines, LinesIter,
};
use super::syntax::{InputEdit, PlainTextParser, StyleTransition, SyntaxParser};

const DEFAULT_TAB_SIZE: u32 = 4;
const DEFAULT_PAGE_LINE_COUNT: u32 = 20;

#[derive(Clone, Debug)]
struct Snapshot {
    text: Lines,
    cursors: Cursors,
    before_cursors: Cursors,
    edits: Vec<InputEdit>,
}

#[derive(Debug)]
pub struct TextBuffer {
    text: Lines,
    cursors: Cursors,
    before_cursors: Cursors,
    edits: Vec<InputEdit>,
    // The first history record is the state after construction; it's never
    // removed.
    history: im::Vector<Snapshot>,
    history_index: usize,
    language_id: LanguageId,
    parser: Box<dyn SyntaxParser>,
    pub read_only: bool,
    pub overwrite: bool,
    pub auto_indent: bool,
    tab_size: u32,
    page_line_count: u32,
}

impl TextBuffer {
    pub fn new(text: &str, language_id: LanguageId) -> Self {
        let mut buffer = TextBuffer {
            text: Lines::unit(Line::new()),
            cursors: Cursors::default(),
            before_cursors: Cursors::default(),
            edits: vec![],
            history: im::Vector::new(),
            history_index: 0,
            language_id,
            parser: Box::new(PlainTextParser),
            read_only: false,
            overwrite: false,
            auto_indent: true,
            tab_size: DEFAULT_TAB_SIZE,
            page_line_count: DEFAULT_PAGE_LINE_COUNT,
        };
        buffer.set_text(text);
        buffer.commit();
        buffer
    }

    pub fn language_id(&self) -> LanguageId {
        self.language_id
    }

    pub fn set_language(&mut self, language_id: LanguageId) {
        self.language_id = language_id;
    }

    /// Swaps in the external parser (the plain-text no-op is installed by
    /// default) and hands it the full text as one edit.
    pub fn set_parser(&mut self, parser: Box<dyn SyntaxParser>) {
        self.parser = parser;
        let end = self.end_byte_index();
        self.parser
            .apply_edits(&self.text, &[InputEdit::new(0, end, end)]);
    }

    pub fn set_tab_size(&mut self, tab_size: u32) {
        self.tab_size = tab_size.clamp(1, 8);
    }

    /// Lines per page, driven by the view; used by page-wise cursor moves.
    pub fn set_page_line_count(&mut self, line_count: u32) {
        self.page_line_count = line_count.max(3);
    }

    pub fn is_empty(&self) -> bool {
        self.text.len() == 1 && self.text[0].is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.text.len()
    }

    pub fn line(&self, li: usize) -> &Line {
        &self.text[li]
    }

    pub fn cursors(&self) -> &Cursors {
        &self.cursors
    }

    pub fn cursor_position(&self) -> LineChar {
        self.cursors.back().lc()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_index(&self) -> usize {
        self.history_index
    }

    pub fn pending_edits(&self) -> &[InputEdit] {
        &self.edits
    }

    pub fn s_expression(&self) -> String {
        self.parser.s_expression()
    }

    pub fn style_transitions(&self) -> Vec<StyleTransition> {
        self.parser.style_transitions()
    }

    // Coordinates

    fn begin_lc() -> LineChar {
        LineChar::default()
    }

    fn end_lc(&self) -> LineChar {
        LineChar::new(
            (self.text.len() - 1) as u32,
            self.text.last().unwrap().len() as u32,
        )
    }

    pub fn end_byte_index(&self) -> u32 {
        self.to_byte_index(self.end_lc())
    }

    /// The byte offset of `lc` in the flat newline-joined text.
    pub fn to_byte_index(&self, lc: LineChar) -> u32 {
        if lc.line as usize >= self.text.len() {
            return self.end_byte_index();
        }
        let lines_before: u32 = self
            .text
            .iter()
            .take(lc.line as usize)
            .map(|line| line.len() as u32 + 1)
            .sum();
        lines_before + lc.byte
    }

    fn line_max_byte(&self, li: u32) -> u32 {
        self.text[li as usize].len() as u32
    }

    fn line_max_lc(&self, li: u32) -> LineChar {
        LineChar::new(li, self.line_max_byte(li))
    }

    fn checked_next_line_begin(&self, li: u32) -> LineChar {
        if (li as usize) < self.text.len() - 1 {
            LineChar::new(li + 1, 0)
        } else {
            self.end_lc()
        }
    }

    fn iter_at(&self, lc: LineChar) -> LinesIter<'_> {
        LinesIter::new(&self.text, lc, Self::begin_lc(), self.end_lc())
    }

    fn next_tabstop(&self, column: u32) -> u32 {
        ((column / self.tab_size) + 1) * self.tab_size
    }

    fn advance(&self, line: &Line, byte: &mut u32, column: &mut u32) {
        let ch = line[*byte as usize];
        *byte += utf8_char_length(ch);
        *column = if ch == b'\t' {
            self.next_tabstop(*column)
        } else {
            *column + 1
        };
    }

    /// Byte index reaching (at most) `column` on line `li`.
    fn char_index(&self, li: u32, column: u32) -> u32 {
        let line = &self.text[li as usize];
        let mut byte = 0;
        let mut column_i = 0;
        while (byte as usize) < line.len() && column_i < column {
            self.advance(line, &mut byte, &mut column_i);
        }
        byte
    }

    /// Column of the byte index `byte` on line `li`.
    fn column_at(&self, li: u32, byte: u32) -> u32 {
        let line = &self.text[li as usize];
        let mut byte_i = 0;
        let mut column = 0;
        while byte_i < byte && (byte_i as usize) < line.len() {
            self.advance(line, &mut byte_i, &mut column);
        }
        column
    }

    /// The on-screen grid position of `lc`, counting tab stops.
    pub fn to_coords(&self, lc: LineChar) -> Coords {
        Coords {
            line: lc.line,
            column: self.column_at(lc.line, lc.byte),
        }
    }

    pub fn to_line_char(&self, coords: Coords) -> LineChar {
        LineChar::new(coords.line, self.char_index(coords.line, coords.column))
    }

    fn num_starting_space_columns(&self, li: u32) -> u32 {
        let line = &self.text[li as usize];
        let mut byte = 0;
        let mut column = 0;
        while (byte as usize) < line.len() && is_blank_byte(line[byte as usize]) {
            self.advance(line, &mut byte, &mut column);
        }
        column
    }

    fn cursor_end_column(&mut self, i: usize) -> u32 {
        if let Some(column) = self.cursors[i].end_column_cache() {
            return column;
        }
        let end = self.cursors[i].end();
        let column = self.column_at(end.line, end.byte);
        self.cursors[i].cache_end_column(column);
        column
    }

    fn cursor_start_column(&mut self, i: usize) -> u32 {
        if let Some(column) = self.cursors[i].start_column_cache() {
            return column;
        }
        let start = self.cursors[i].start();
        let column = self.column_at(start.line, start.byte);
        self.cursors[i].cache_start_column(column);
        column
    }

    // Text access

    pub fn text_in_range(&self, start: LineChar, end: LineChar) -> String {
        if end <= start {
            return String::new();
        }
        let end_li = (end.line as usize).min(self.text.len() - 1) as u32;
        let mut bytes = vec![];
        let mut li = start.line;
        let mut bi = start.byte;
        while li < end_li || bi < end.byte {
            let line = &self.text[li as usize];
            if (bi as usize) < line.len() {
                bytes.push(line[bi as usize]);
                bi += 1;
            } else {
                li += 1;
                bi = 0;
                bytes.push(b'\n');
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn get_text(&self) -> String {
        lines_to_string(&self.text)
    }

    pub fn selected_text(&self, cursor: &Cursor) -> String {
        self.text_in_range(cursor.min(), cursor.max())
    }

    /// Replaces the whole text and resets the undo history; the pending
    /// whole-file edit is flushed by the caller's `commit`.
    pub fn set_text(&mut self, text: &str) {
        let old_end_byte = self.end_byte_index();
        self.text = lines_from_str(text);
        self.cursors = Cursors::default();
        self.before_cursors = self.cursors.clone();
        self.history = im::Vector::new();
        self.history_index = 0;
        self.edits
            .push(InputEdit::new(0, old_end_byte, self.end_byte_index()));
    }

    // History

    pub fn can_undo(&self) -> bool {
        !self.read_only && self.history_index > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.read_only
            && self.history.len() > 1
            && self.history_index < self.history.len() - 1
    }

    pub fn can_copy(&self) -> bool {
        self.cursors.any_ranged()
    }

    pub fn can_cut(&self) -> bool {
        !self.read_only && self.can_copy()
    }

    pub fn can_edit(&self) -> bool {
        !self.read_only
    }

    /// Commits a snapshot to the undo history and feeds the pending edits to
    /// the parser. Every commit must be paired with an earlier
    /// `self.before_cursors = self.cursors.clone()`.
    pub fn commit(&mut self) {
        if self.edits.is_empty() {
            return;
        }
        let edits = std::mem::take(&mut self.edits);
        let snapshot = Snapshot {
            text: self.text.clone(),
            cursors: self.cursors.clone(),
            before_cursors: self.before_cursors.clone(),
            edits: edits.clone(),
        };
        if self.history.is_empty() {
            self.history.push_back(snapshot);
            self.history_index = 0;
        } else {
            self.history = self.history.take(self.history_index + 1);
            self.history.push_back(snapshot);
            self.history_index += 1;
        }
        self.parser.apply_edits(&self.text, &edits);
    }

    /// Restores the snapshot before the current one, reinstates the pre-edit
    /// cursors, and replays the inverted edits to the parser.
    pub fn undo(&mut self) {
        if !self.can_undo() {
            return;
        }
        let current = self.history[self.history_index].clone();
        self.history_index -= 1;
        let restore = self.history[self.history_index].clone();
        self.text = restore.text;
        self.cursors = current.before_cursors;
        self.cursors.mark_edited();
        debug_assert!(self.edits.is_empty());
        let inverted: Vec<InputEdit> =
            current.edits.iter().rev().map(|edit| edit.invert()).collect();
        self.parser.apply_edits(&self.text, &inverted);
    }

    /// Restores the next snapshot and replays its forward edits (no
    /// re-parse from scratch).
    pub fn redo(&mut self) {
        if !self.can_redo() {
            return;
        }
        self.history_index += 1;
        let restore = self.history[self.history_index].clone();
        self.text = restore.text;
        self.cursors = restore.cursors;
        self.cursors.mark_edited();
        debug_assert!(self.edits.is_empty());
        self.parser.apply_edits(&self.text, &restore.edits);
    }

    // Cursor movement

    pub fn move_cursors_top(&mut self, select: bool) {
        for cursor in self.cursors.iter_mut() {
            cursor.set(LineChar::default(), !select, None);
        }
    }

    pub fn move_cursors_bottom(&mut self, select: bool) {
        let end = self.line_max_lc((self.text.len() - 1) as u32);
        for cursor in self.cursors.iter_mut() {
            cursor.set(end, !select, None);
        }
    }

    pub fn move_cursors_start_line(&mut self, select: bool) {
        for cursor in self.cursors.iter_mut() {
            let start = LineChar::new(cursor.line(), 0);
            cursor.set(start, !select, None);
        }
    }

    pub fn move_cursors_end_line(&mut self, select: bool) {
        for i in 0..self.cursors.len() {
            let end = self.line_max_lc(self.cursors[i].line());
            self.cursors[i].set(end, !select, None);
        }
    }

    pub fn move_cursors_lines(&mut self, amount: i32, select: bool) {
        self.move_cursors_lines_impl(amount, select, false, true);
    }

    fn move_cursors_lines_impl(
        &mut self,
        amount: i32,
        select: bool,
        move_start: bool,
        move_end: bool,
    ) {
        for i in 0..self.cursors.len() {
            self.move_cursor_lines(i, amount, select, move_start, move_end);
        }
    }

    pub fn page_cursors_lines(&mut self, up: bool, select: bool) {
        let amount = (self.page_line_count as i32 - 2) * if up { -1 } else { 1 };
        self.move_cursors_lines(amount, select);
    }

    fn move_cursor_lines(
        &mut self,
        i: usize,
        amount: i32,
        select: bool,
        move_start: bool,
        move_end: bool,
    ) {
        if !move_start && !move_end {
            return;
        }
        // Track the cursor's column to return to it after moving through a
        // line long enough.
        let line_count = self.text.len() as i32;
        let end_column = self.cursor_end_column(i);
        let new_end_line =
            (self.cursors[i].end().line as i32 + amount).clamp(0, line_count - 1) as u32;
        let new_end = LineChar::new(
            new_end_line,
            self.char_index(new_end_line, end_column)
                .min(self.line_max_byte(new_end_line)),
        );
        if !select {
            self.cursors[i].set(new_end, true, Some(end_column));
            return;
        }
        if !move_start {
            self.cursors[i].set(new_end, false, Some(end_column));
            return;
        }
        let start_column = self.cursor_start_column(i);
        let new_start_line =
            (self.cursors[i].start().line as i32 + amount).clamp(0, line_count - 1) as u32;
        let new_start = LineChar::new(
            new_start_line,
            self.char_index(new_start_line, start_column)
                .min(self.line_max_byte(new_start_line)),
        );
        self.cursors[i].set_range(new_start, new_end, Some(start_column), Some(end_column));
    }

    pub fn move_cursors_char(&mut self, right: bool, select: bool, is_word_mode: bool) {
        let any_selections = self.cursors.any_ranged();
        for i in 0..self.cursors.len() {
            if any_selections && !select && !is_word_mode {
                let collapsed = if right {
                    self.cursors[i].max()
                } else {
                    self.cursors[i].min()
                };
                self.cursors[i].set(collapsed, true, None);
            } else {
                self.move_cursor_char(i, right, select, is_word_mode);
            }
        }
    }

    fn move_cursor_char(&mut self, i: usize, right: bool, select: bool, is_word_mode: bool) {
        let mut iter = self.iter_at(self.cursors[i].lc());
        if (right && iter.is_end()) || (!right && iter.is_begin()) {
            return;
        }
        if right {
            iter.move_right();
        } else {
            iter.move_left();
        }
        let target = if is_word_mode {
            self.find_word_boundary(iter.lc(), !right)
        } else {
            iter.lc()
        };
        self.cursors[i].set(target, !select, None);
    }

    pub fn select_all(&mut self) {
        self.cursors.reset();
        self.move_cursors_top(false);
        self.move_cursors_bottom(true);
    }

    /// Searches from the last-added cursor's max; on a match, adds a cursor
    /// with that selection.
    pub fn select_next_occurrence(&mut self, case_sensitive: bool) {
        let last = *self.cursors.last_added();
        let Some(found) =
            self.find_next_occurrence(&self.selected_text(&last), last.max(), case_sensitive)
        else {
            return;
        };
        self.cursors.add();
        self.set_selection(found.start(), found.end(), self.cursors.len() - 1);
        self.cursors.sort_and_merge();
    }

    fn set_selection(&mut self, start: LineChar, end: LineChar, i: usize) {
        let min_lc = LineChar::default();
        let max_lc = self.line_max_lc((self.text.len() - 1) as u32);
        self.cursors[i].set_range(
            start.clamp(min_lc, max_lc),
            end.clamp(min_lc, max_lc),
            None,
            None,
        );
    }

    // Search

    /// Classifies the starting character (word / space / other) and scans
    /// within the line until the class changes.
    pub fn find_word_boundary(&self, from: LineChar, is_start: bool) -> LineChar {
        if from.line as usize >= self.text.len() {
            return from;
        }
        let line = &self.text[from.line as usize];
        let mut byte = from.byte;
        if byte as usize >= line.len() {
            return from;
        }

        let init = line[byte as usize];
        let init_is_word = is_word_byte(init);
        let init_is_space = init.is_ascii_whitespace();
        loop {
            if is_start {
                if byte == 0 {
                    break;
                }
            } else if byte as usize >= line.len() {
                break;
            }
            let current = if (byte as usize) < line.len() {
                Some(line[byte as usize])
            } else {
                None
            };
            let boundary = match current {
                None => true,
                Some(b) => {
                    (init_is_space && !b.is_ascii_whitespace())
                        || (init_is_word && !is_word_byte(b))
                        || (!init_is_word && !init_is_space && init != b)
                }
            };
            if boundary {
                if is_start {
                    byte += 1; // Undo one left step before returning.
                }
                break;
            }
            if is_start {
                byte -= 1;
            } else {
                byte += 1;
            }
        }
        LineChar::new(from.line, byte)
    }

    /// The start/end of the next occurrence of `text` at or after `start`,
    /// wrapping around, or `None` if not found. ASCII case folding when not
    /// case-sensitive.
    pub fn find_next_occurrence(
        &self,
        text: &str,
        start: LineChar,
        case_sensitive: bool,
    ) -> Option<Cursor> {
        if text.is_empty() {
            return None;
        }
        let pattern = text.as_bytes();
        let mut find_iter = self.iter_at(start);
        loop {
            let mut match_iter = find_iter.clone();
            for (i, &pattern_byte) in pattern.iter().enumerate() {
                let lc = match_iter.lc();
                let line = &self.text[lc.line as usize];
                if lc.byte as usize == line.len() {
                    if pattern_byte != b'\n' || lc.line as usize + 1 >= self.text.len() {
                        break;
                    }
                } else if fold_case(match_iter.byte(), case_sensitive)
                    != fold_case(pattern_byte, case_sensitive)
                {
                    break;
                }
                match_iter.move_right();
                if i == pattern.len() - 1 {
                    return Some(Cursor::ranged(find_iter.lc(), match_iter.lc()));
                }
            }

            find_iter.move_right();
            if find_iter.is_end() {
                find_iter.reset();
            }
            if find_iter.lc() == start {
                return None;
            }
        }
    }

    /// If the character at (or just left of) the cursor is a bracket, scans
    /// in the matching direction keeping a counter, and returns the
    /// cursor-to-match range.
    pub fn find_matching_brackets(&self, cursor: &Cursor) -> Option<Cursor> {
        const OPEN: [u8; 3] = [b'{', b'(', b'['];
        const CLOSE: [u8; 3] = [b'}', b')', b']'];

        let li = cursor.line();
        let line = &self.text[li as usize];
        if cursor.is_range() || line.is_empty() {
            return None;
        }

        let mut byte = cursor.byte_index();
        // Considered on-bracket if the cursor is to the left or right of it.
        if byte > 0 {
            let left = line[byte as usize - 1];
            if OPEN.contains(&left) || CLOSE.contains(&left) {
                byte -= 1;
            }
        }
        if byte as usize >= line.len() {
            return None;
        }

        let ch = line[byte as usize];
        let (other, forward) = if let Some(i) = OPEN.iter().position(|&b| b == ch) {
            (CLOSE[i], true)
        } else if let Some(i) = CLOSE.iter().position(|&b| b == ch) {
            (OPEN[i], false)
        } else {
            return None;
        };

        let lc = LineChar::new(li, byte);
        let mut iter = self.iter_at(lc);
        let mut match_count: u32 = 0;
        loop {
            if forward {
                if iter.is_end() {
                    return None;
                }
            } else if iter.is_begin() {
                return None;
            }
            let b = iter.byte();
            if b == ch {
                match_count += 1;
            } else if b == other {
                // The scan starts on the bracket itself, so the count is at
                // least 1 by the time a closing candidate appears.
                match_count = match_count.saturating_sub(1);
                if match_count == 0 {
                    return Some(Cursor::ranged(lc, iter.lc()));
                }
            }
            if forward {
                iter.move_right();
            } else {
                iter.move_left();
            }
        }
    }

    // Edits

    /// Inserts `text` at `at`, shifting cursors on later lines down.
    /// Returns the insertion end.
    fn insert_text(&mut self, text: Lines, at: LineChar, update_cursors: bool) -> LineChar {
        if text.is_empty() {
            return at;
        }

        let num_new_lines = (text.len() - 1) as u32;
        if (at.line as usize) < self.text.len() {
            let first_line = self.text[at.line as usize].clone();
            let mut new_first = first_line.take(at.byte as usize);
            new_first.append(text[0].clone());
            self.text.set(at.line as usize, new_first);
            if text.len() > 1 {
                let mut head = self.text.take(at.line as usize + 1);
                head.append(text.skip(1));
                head.append(self.text.skip(at.line as usize + 1));
                self.text = head;
            }
            let last_index = at.line as usize + num_new_lines as usize;
            let mut last_line = self.text[last_index].clone();
            last_line.append(first_line.skip(at.byte as usize));
            self.text.set(last_index, last_line);
        } else {
            let mut appended = self.text.clone();
            appended.append(text.clone());
            self.text = appended;
        }

        if update_cursors {
            for cursor in self.cursors.iter_mut() {
                if cursor.line() > at.line {
                    let shifted = LineChar::new(cursor.line() + num_new_lines, cursor.byte_index());
                    cursor.set_both(shifted);
                }
            }
        }

        let start_byte = self.to_byte_index(at);
        let text_byte_length: u32 =
            text.iter().map(|line| line.len() as u32).sum::<u32>() + text.len() as u32 - 1;
        self.edits.push(InputEdit::new(
            start_byte,
            start_byte,
            start_byte + text_byte_length,
        ));

        if text.len() == 1 {
            LineChar::new(at.line, at.byte + text[0].len() as u32)
        } else {
            LineChar::new(
                at.line + num_new_lines,
                text.last().unwrap().len() as u32,
            )
        }
    }

    fn insert_text_at_cursor(&mut self, text: Lines, i: usize) {
        if text.is_empty() {
            return;
        }
        let at = self.cursors[i].min();
        let end = self.insert_text(text, at, true);
        self.cursors[i].set_both(end);
    }

    /// Deletes `start..end`, shifting cursors right of / below the range so
    /// their logical position is preserved.
    fn delete_range(
        &mut self,
        start: LineChar,
        end: LineChar,
        update_cursors: bool,
        exclude_cursor: Option<usize>,
    ) {
        if end <= start {
            return;
        }

        let start_line = self.text[start.line as usize].clone();
        let end_line = self.text[end.line as usize].clone();
        let start_byte = self.to_byte_index(start);
        let old_end_byte = self.to_byte_index(end);

        if start.line == end.line {
            let mut new_line = start_line.take(start.byte as usize);
            new_line.append(end_line.skip(end.byte as usize));
            self.text.set(start.line as usize, new_line);

            if update_cursors {
                let deleted = end.byte - start.byte;
                for cursor in self.cursors.iter_mut() {
                    if !cursor.is_range() && cursor.is_right_of(start) {
                        let shifted =
                            LineChar::new(cursor.line(), cursor.byte_index() - deleted);
                        cursor.set_both(shifted);
                    }
                }
            }
        } else {
            let mut new_line = start_line.take(start.byte as usize);
            new_line.append(end_line.skip(end.byte as usize));
            self.text.set(start.line as usize, new_line);
            // Remove the lines that were folded into the start line.
            let mut head = self.text.take(start.line as usize + 1);
            head.append(self.text.skip(end.line as usize + 1));
            self.text = head;

            if update_cursors {
                let deleted_lines = end.line - start.line;
                for (c, cursor) in self.cursors.iter_mut().enumerate() {
                    if exclude_cursor == Some(c) {
                        continue;
                    }
                    if cursor.line() >= end.line {
                        let shifted =
                            LineChar::new(cursor.line() - deleted_lines, cursor.byte_index());
                        cursor.set_both(shifted);
                    }
                }
            }
        }

        self.edits
            .push(InputEdit::new(start_byte, old_end_byte, start_byte));
    }

    fn delete_selection(&mut self, i: usize) {
        if !self.cursors[i].is_range() {
            return;
        }
        let min = self.cursors[i].min();
        let max = self.cursors[i].max();
        // The cursor whose selection is being deleted keeps its own position.
        self.delete_range(min, max, true, Some(i));
        self.cursors[i].set_both(min);
    }

    fn swap_lines(&mut self, li1: u32, li2: u32) {
        if li1 == li2 || li1 as usize >= self.text.len() || li2 as usize >= self.text.len() {
            return;
        }
        let line2 = self.text[li2 as usize].clone();
        self.insert_text(
            Lines::from(vec![line2, Line::new()]),
            LineChar::new(li1, 0),
            false,
        );
        if ((li2 + 1) as usize) < self.text.len() - 1 {
            self.delete_range(
                LineChar::new(li2 + 1, 0),
                LineChar::new(li2 + 2, 0),
                false,
                None,
            );
        } else {
            // The second line is the last line: also drop the newline just
            // inserted.
            self.delete_range(
                LineChar::new(li2, self.line_max_byte(li2)),
                self.end_lc(),
                false,
                None,
            );
        }
    }

    // User-visible operations. Each pairs a `before_cursors` snapshot with a
    // `commit`.

    pub fn enter_char(&mut self, ch: char) {
        self.before_cursors = self.cursors.clone();
        for i in (0..self.cursors.len()).rev() {
            self.delete_selection(i);
        }

        // Reverse order matters when typing '\n' on one line with multiple
        // cursors.
        for i in (0..self.cursors.len()).rev() {
            let mut insert_line = Line::new();
            if ch == '\n' {
                if self.auto_indent && self.cursors[i].byte_index() != 0 {
                    // Match the indentation of the current or next line,
                    // whichever has more.
                    let li = self.cursors[i].line();
                    let indent_li = if (li as usize) < self.text.len() - 1
                        && self.num_starting_space_columns(li + 1)
                            > self.num_starting_space_columns(li)
                    {
                        li + 1
                    } else {
                        li
                    };
                    let indent_line = self.text[indent_li as usize].clone();
                    for &byte in indent_line.iter() {
                        if !is_blank_byte(byte) {
                            break;
                        }
                        insert_line.push_back(byte);
                    }
                }
            } else {
                let mut buf = [0u8; 4];
                for &byte in ch.encode_utf8(&mut buf).as_bytes() {
                    insert_line.push_back(byte);
                }
            }
            let text = if ch == '\n' {
                Lines::from(vec![Line::new(), insert_line])
            } else {
                Lines::unit(insert_line)
            };
            self.insert_text_at_cursor(text, i);
        }

        self.commit();
    }

    pub fn backspace(&mut self, is_word_mode: bool) {
        self.before_cursors = self.cursors.clone();
        if !self.cursors.any_ranged() {
            self.move_cursors_char(false, true, is_word_mode);
            // Can't backspace if any cursor is at the text start.
            if !self.cursors.all_ranged() {
                if self.cursors.any_ranged() {
                    self.move_cursors_char(true, false, false); // Restore.
                }
                return;
            }
            self.cursors.sort_and_merge();
        }
        for i in (0..self.cursors.len()).rev() {
            self.delete_selection(i);
        }
        self.commit();
    }

    pub fn delete_forward(&mut self, is_word_mode: bool) {
        self.before_cursors = self.cursors.clone();
        if !self.cursors.any_ranged() {
            self.move_cursors_char(true, true, is_word_mode);
            // Can't delete if any cursor is at the end of the last line.
            if !self.cursors.all_ranged() {
                if self.cursors.any_ranged() {
                    self.move_cursors_char(false, false, false); // Restore.
                }
                return;
            }
            self.cursors.sort_and_merge();
        }
        for i in (0..self.cursors.len()).rev() {
            self.delete_selection(i);
        }
        self.commit();
    }

    /// Swaps the affected lines with their neighbor; bails out at the ends.
    pub fn move_current_lines(&mut self, up: bool) {
        self.before_cursors = self.cursors.clone();
        let mut affected_lines = BTreeSet::new();
        let mut min_li = u32::MAX;
        let mut max_li = u32::MIN;
        for cursor in self.cursors.iter() {
            for li in cursor.min().line..=cursor.max().line {
                // Skip a line the selection only touches at its start.
                if cursor.is_range() && cursor.max() == LineChar::new(li, 0) {
                    continue;
                }
                affected_lines.insert(li);
                min_li = min_li.min(li);
                max_li = max_li.max(li);
            }
        }
        if affected_lines.is_empty()
            || (up && min_li == 0)
            || (!up && max_li as usize == self.text.len() - 1)
        {
            return;
        }

        if up {
            for &li in &affected_lines {
                self.swap_lines(li - 1, li);
            }
        } else {
            for &li in affected_lines.iter().rev() {
                self.swap_lines(li, li + 1);
            }
        }
        self.move_cursors_lines_impl(if up { -1 } else { 1 }, true, true, true);

        self.commit();
    }

    /// Adds the language's single-line comment prefix to every affected line
    /// if any lacks it; otherwise removes one leading prefix (and one
    /// following space) from each.
    pub fn toggle_line_comment(&mut self) {
        let Some(comment) = language(self.language_id).single_line_comment else {
            return;
        };
        let comment = comment.as_bytes();

        let first_non_blank = |line: &Line| -> usize {
            line.iter()
                .position(|&byte| !is_blank_byte(byte))
                .unwrap_or(line.len())
        };
        let has_comment = |line: &Line| -> bool {
            let at = first_non_blank(line);
            line.len() >= at + comment.len()
                && comment
                    .iter()
                    .enumerate()
                    .all(|(i, &byte)| line[at + i] == byte)
        };

        let mut affected_lines = BTreeSet::new();
        for cursor in self.cursors.iter() {
            for li in cursor.min().line..=cursor.max().line {
                if !(cursor.is_range() && cursor.max() == LineChar::new(li, 0))
                    && !self.text[li as usize].is_empty()
                {
                    affected_lines.insert(li);
                }
            }
        }

        let should_add_comment = affected_lines
            .iter()
            .any(|&li| !has_comment(&self.text[li as usize]));

        self.before_cursors = self.cursors.clone();
        for &li in affected_lines.iter().rev() {
            if should_add_comment {
                let mut prefix = Line::from(comment.to_vec());
                prefix.push_back(b' ');
                self.insert_text(Lines::unit(prefix), LineChar::new(li, 0), true);
            } else {
                let line = self.text[li as usize].clone();
                let start = first_non_blank(&line) as u32;
                let mut end = start + comment.len() as u32;
                if (end as usize) < line.len() && line[end as usize] == b' ' {
                    end += 1;
                }
                self.delete_range(LineChar::new(li, start), LineChar::new(li, end), true, None);
            }
        }
        self.commit();
    }

    pub fn delete_current_lines(&mut self) {
        self.before_cursors = self.cursors.clone();
        for i in (0..self.cursors.len()).rev() {
            self.delete_selection(i);
        }
        self.move_cursors_start_line(false);
        self.cursors.sort_and_merge();

        for i in (0..self.cursors.len()).rev() {
            let li = self.cursors[i].line();
            let start = if li as usize == self.text.len() - 1 && li > 0 {
                self.line_max_lc(li - 1)
            } else {
                LineChar::new(li, 0)
            };
            let end = self.checked_next_line_begin(li);
            self.delete_range(start, end, true, None);
        }
        self.commit();
    }

    /// Prepends a tab to each affected line, or deletes up to one tab-width
    /// of leading whitespace from each.
    pub fn change_current_lines_indentation(&mut self, increase: bool) {
        self.before_cursors = self.cursors.clone();
        for i in (0..self.cursors.len()).rev() {
            let (min, max, is_range) = {
                let cursor = &self.cursors[i];
                (cursor.min(), cursor.max(), cursor.is_range())
            };
            for li in min.line..=max.line {
                // Skip a line the selection only touches at its start.
                if is_range && max == LineChar::new(li, 0) {
                    continue;
                }
                if increase {
                    if !self.text[li as usize].is_empty() {
                        self.insert_text(
                            Lines::unit(Line::unit(b'\t')),
                            LineChar::new(li, 0),
                            true,
                        );
                    }
                } else {
                    let line = self.text[li as usize].clone();
                    let tab_width_byte = self.char_index(li, self.tab_size);
                    let only_blanks = (0..tab_width_byte as usize)
                        .rev()
                        .all(|ci| ci >= line.len() || is_blank_byte(line[ci]));
                    if only_blanks && tab_width_byte > 0 {
                        self.delete_range(
                            LineChar::new(li, 0),
                            LineChar::new(li, tab_width_byte),
                            true,
                            None,
                        );
                    }
                }
            }
        }
        self.commit();
    }

    /// Returns the copied text: joined ranged selections, or the current
    /// line when nothing is selected.
    pub fn copy(&self) -> String {
        if self.cursors.any_ranged() {
            self.cursors
                .iter()
                .filter(|cursor| cursor.is_range())
                .map(|cursor| self.selected_text(cursor))
                .join("\n")
        } else {
            let line = &self.text[self.cursor_position().line as usize];
            String::from_utf8_lossy(&line.iter().copied().collect::<Vec<u8>>()).into_owned()
        }
    }

    /// Copies, then deletes the selections. Returns the copied text.
    pub fn cut(&mut self) -> String {
        if !self.cursors.any_ranged() {
            return String::new();
        }
        self.before_cursors = self.cursors.clone();
        let copied = self.copy();
        for i in (0..self.cursors.len()).rev() {
            self.delete_selection(i);
        }
        self.commit();
        copied
    }

    pub fn paste(&mut self, clip_text: &str) {
        if clip_text.is_empty() {
            return;
        }
        self.before_cursors = self.cursors.clone();

        let mut insert_lines = Lines::new();
        for line in clip_text.split('\n') {
            insert_lines.push_back(Line::from(line.as_bytes().to_vec()));
        }

        for i in (0..self.cursors.len()).rev() {
            self.delete_selection(i);
        }
        if self.cursors.len() > 1 && insert_lines.len() == self.cursors.len() {
            // Paste each line at the corresponding cursor.
            for i in (0..self.cursors.len()).rev() {
                self.insert_text_at_cursor(Lines::unit(insert_lines[i].clone()), i);
            }
        } else {
            for i in (0..self.cursors.len()).rev() {
                self.insert_text_at_cursor(insert_lines.clone(), i);
            }
        }
        self.commit();
    }

    pub fn toggle_overwrite(&mut self) {
        self.overwrite = !self.overwrite;
    }

    /// Re-establishes the cursor ordering invariant after any operation.
    pub fn finish_action(&mut self) {
        self.cursors.sort_and_merge();
        self.cursors.clear_edited();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_byte_accounting() {
        let mut buffer = TextBuffer::new("abc", LanguageId::None);
        assert_eq!(buffer.get_text(), "abc");
        assert_eq!(buffer.history_len(), 1);

        buffer.move_cursors_end_line(false);
        buffer.enter_char('d');
        assert_eq!(buffer.get_text(), "abcd");
        assert_eq!(buffer.history_len(), 2);
        assert_eq!(buffer.cursor_position(), LineChar::new(0, 4));
    }

    #[test]
    fn test_undo_restores_cursors() {
        let mut buffer = TextBuffer::new("abc", LanguageId::None);
        buffer.move_cursors_end_line(false);
        buffer.enter_char('d');
        buffer.undo();
        assert_eq!(buffer.get_text(), "abc");
        assert_eq!(buffer.cursor_position(), LineChar::new(0, 3));
        assert!(buffer.pending_edits().is_empty());
        buffer.redo();
        assert_eq!(buffer.get_text(), "abcd");
        assert_eq!(buffer.cursor_position(), LineChar::new(0, 4));
    }

    #[test]
    fn test_coords_count_tab_stops() {
        // With a tab size of 4, the 'B' in "\tABC" renders at column 5.
        let buffer = TextBuffer::new("\tABC", LanguageId::None);
        assert_eq!(
            buffer.to_coords(LineChar::new(0, 2)),
            Coords { line: 0, column: 5 }
        );
        assert_eq!(
            buffer.to_line_char(Coords { line: 0, column: 5 }),
            LineChar::new(0, 2)
        );
    }

    #[test]
    fn test_word_boundary() {
        let buffer = TextBuffer::new("foo_bar baz", LanguageId::None);
        assert_eq!(
            buffer.find_word_boundary(LineChar::new(0, 3), true),
            LineChar::new(0, 0)
        );
        assert_eq!(
            buffer.find_word_boundary(LineChar::new(0, 3), false),
            LineChar::new(0, 7)
        );
        assert_eq!(
            buffer.find_word_boundary(LineChar::new(0, 8), false),
            LineChar::new(0, 11)
        );
    }
}

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

use super::lines::LineChar;

/// One (possibly ranged) insertion point. `start`/`end` are the first and
/// second position set in an interaction; use `min()`/`max()` for position
/// ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    start: LineChar,
    end: LineChar,
    // A column cache is emptied when its `LineChar` changes without the
    // caller providing an explicit column, and computed on demand when read.
    // A non-empty cache is always up to date with its `LineChar`.
    start_column: Option<u32>,
    end_column: Option<u32>,
    // Cleared every frame; keeps recently edited cursors visible.
    start_edited: bool,
    end_edited: bool,
}

impl Cursor {
    pub fn at(lc: LineChar) -> Self {
        Cursor {
            start: lc,
            end: lc,
            ..Cursor::default()
        }
    }

    pub fn ranged(start: LineChar, end: LineChar) -> Self {
        Cursor {
            start,
            end,
            ..Cursor::default()
        }
    }

    pub fn start(&self) -> LineChar {
        self.start
    }

    pub fn end(&self) -> LineChar {
        self.end
    }

    /// The interaction position. Be careful if this is a multiline cursor.
    pub fn lc(&self) -> LineChar {
        self.end
    }

    pub fn line(&self) -> u32 {
        self.end.line
    }

    pub fn byte_index(&self) -> u32 {
        self.end.byte
    }

    pub fn min(&self) -> LineChar {
        self.start.min(self.end)
    }

    pub fn max(&self) -> LineChar {
        self.start.max(self.end)
    }

    pub fn is_range(&self) -> bool {
        self.start != self.end
    }

    pub fn is_multiline(&self) -> bool {
        self.start.line != self.end.line
    }

    pub fn is_right_of(&self, lc: LineChar) -> bool {
        self.end.line == lc.line && self.end.byte > lc.byte
    }

    pub fn start_column_cache(&self) -> Option<u32> {
        self.start_column
    }

    pub fn end_column_cache(&self) -> Option<u32> {
        self.end_column
    }

    pub fn cache_start_column(&mut self, column: u32) {
        self.start_column = Some(column);
    }

    pub fn cache_end_column(&mut self, column: u32) {
        self.end_column = Some(column);
    }

    pub fn is_edited(&self) -> bool {
        self.start_edited || self.end_edited
    }

    pub fn mark_edited(&mut self) {
        self.start_edited = true;
        self.end_edited = true;
    }

    pub fn clear_edited(&mut self) {
        self.start_edited = false;
        self.end_edited = false;
    }

    pub fn set_start(&mut self, start: LineChar, column: Option<u32>) {
        self.start = start;
        self.start_column = column;
        self.start_edited = true;
    }

    pub fn set_end(&mut self, end: LineChar, column: Option<u32>) {
        self.end = end;
        self.end_column = column;
        self.end_edited = true;
    }

    /// Moves the end (and, with `set_both`, collapses the start onto it).
    pub fn set(&mut self, end: LineChar, set_both: bool, column: Option<u32>) {
        if set_both {
            self.set_start(end, column);
        }
        self.set_end(end, column);
    }

    pub fn set_both(&mut self, lc: LineChar) {
        self.set(lc, true, None);
    }

    pub fn set_range(
        &mut self,
        start: LineChar,
        end: LineChar,
        start_column: Option<u32>,
        end_column: Option<u32>,
    ) {
        self.set_start(start, start_column);
        self.set_end(end, end_column);
    }
}

/// The cursor list. Always non-empty; sorted by `min()` with overlapping
/// cursors merged after every mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursors {
    cursors: Vec<Cursor>,
    last_added_index: usize,
}

impl Default for Cursors {
    fn default() -> Self {
        Cursors {
            cursors: vec![Cursor::default()],
            last_added_index: 0,
        }
    }
}

impl Cursors {
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cursor> {
        self.cursors.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Cursor> {
        self.cursors.iter_mut()
    }

    pub fn get(&self, i: usize) -> &Cursor {
        &self.cursors[i]
    }

    pub fn get_mut(&mut self, i: usize) -> &mut Cursor {
        &mut self.cursors[i]
    }

    pub fn back(&self) -> &Cursor {
        self.cursors.last().unwrap()
    }

    pub fn back_mut(&mut self) -> &mut Cursor {
        self.cursors.last_mut().unwrap()
    }

    pub fn any_ranged(&self) -> bool {
        self.cursors.iter().any(Cursor::is_range)
    }

    pub fn all_ranged(&self) -> bool {
        self.cursors.iter().all(Cursor::is_range)
    }

    pub fn any_multiline(&self) -> bool {
        self.cursors.iter().any(Cursor::is_multiline)
    }

    pub fn any_edited(&self) -> bool {
        self.cursors.iter().any(Cursor::is_edited)
    }

    pub fn add(&mut self) {
        self.cursors.push(Cursor::default());
        self.last_added_index = self.cursors.len() - 1;
    }

    pub fn reset(&mut self) {
        self.cursors.clear();
        self.add();
    }

    pub fn mark_edited(&mut self) {
        for cursor in &mut self.cursors {
            cursor.mark_edited();
        }
    }

    pub fn clear_edited(&mut self) {
        for cursor in &mut self.cursors {
            cursor.clear_edited();
        }
    }

    pub fn last_added_index(&self) -> usize {
        if self.last_added_index >= self.cursors.len() {
            0
        } else {
            self.last_added_index
        }
    }

    pub fn last_added(&self) -> &Cursor {
        &self.cursors[self.last_added_index()]
    }

    pub fn last_added_mut(&mut self) -> &mut Cursor {
        let i = self.last_added_index();
        &mut self.cursors[i]
    }

    /// Sorts by `min()` and merges overlapping cursors. The last-added
    /// cursor's position survives the sort, so "last added" remains
    /// meaningful for select-next-occurrence.
    pub fn sort_and_merge(&mut self) {
        if self.len() <= 1 {
            return;
        }

        let last_added_lc = self.last_added().lc();
        self.cursors.sort_by_key(Cursor::min);

        let mut merged: Vec<Cursor> = vec![];
        let mut current = self.cursors[0];
        for &next in &self.cursors[1..] {
            if current.max() >= next.min() {
                // Overlap. Extend the current cursor to include the next.
                let start = current.min().min(next.min());
                let end = current.max().max(next.max());
                current.set_range(start, end, None, None);
            } else {
                merged.push(current);
                current = next;
            }
        }
        merged.push(current);
        self.cursors = merged;

        self.last_added_index = self
            .cursors
            .iter()
            .position(|cursor| cursor.lc() == last_added_lc)
            .unwrap_or(0);
    }
}

impl std::ops::Index<usize> for Cursors {
    type Output = Cursor;

    fn index(&self, i: usize) -> &Cursor {
        &self.cursors[i]
    }
}

impl std::ops::IndexMut<usize> for Cursors {
    fn index_mut(&mut self, i: usize) -> &mut Cursor {
        &mut self.cursors[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_and_merge() {
        let mut cursors = Cursors::default();
        cursors[0].set_range(LineChar::new(2, 0), LineChar::new(2, 4), None, None);
        cursors.add();
        cursors.back_mut().set_both(LineChar::new(0, 1));
        cursors.add();
        cursors
            .back_mut()
            .set_range(LineChar::new(2, 3), LineChar::new(3, 0), None, None);
        cursors.sort_and_merge();

        assert_eq!(cursors.len(), 2);
        assert_eq!(cursors[0].min(), LineChar::new(0, 1));
        assert_eq!(cursors[1].min(), LineChar::new(2, 0));
        assert_eq!(cursors[1].max(), LineChar::new(3, 0));
        // Strictly ordered and non-overlapping afterwards.
        assert!(cursors[0].max() < cursors[1].min());
    }
}

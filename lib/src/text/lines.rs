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

//! The persistent text representation: a persistent vector of lines, each a
//! persistent vector of bytes. Snapshots are O(1), which is what makes the
//! per-commit undo history affordable.

use im::Vector;

pub type Line = Vector<u8>;
pub type Lines = Vector<Line>;

/// A position addressed by line index and byte index within the line.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct LineChar {
    pub line: u32,
    pub byte: u32,
}

impl LineChar {
    pub fn new(line: u32, byte: u32) -> Self {
        LineChar { line, byte }
    }
}

/// A position from the user's point of view on a uniform character grid.
/// Tabs occupy 1..=tab_size columns, enough to reach the next tab stop: with
/// a tab size of 4, `Coords { line: 1, column: 5 }` addresses the `B` in
/// `"\tABC"` since the line renders as `"    ABC"`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Coords {
    pub line: u32,
    pub column: u32,
}

// https://en.wikipedia.org/wiki/UTF-8
// Assumes a standalone character (<128) or the leading byte of a UTF-8
// sequence (any non-10xxxxxx byte).
pub fn utf8_char_length(byte: u8) -> u32 {
    if (byte & 0xFE) == 0xFC {
        6
    } else if (byte & 0xFC) == 0xF8 {
        5
    } else if (byte & 0xF8) == 0xF0 {
        4
    } else if (byte & 0xF0) == 0xE0 {
        3
    } else if (byte & 0xE0) == 0xC0 {
        2
    } else {
        1
    }
}

pub fn is_continuation_byte(byte: u8) -> bool {
    (byte & 0xC0) == 0x80
}

pub fn is_word_byte(byte: u8) -> bool {
    utf8_char_length(byte) > 1 || byte.is_ascii_alphanumeric() || byte == b'_'
}

pub fn is_blank_byte(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

pub fn fold_case(byte: u8, case_sensitive: bool) -> u8 {
    if case_sensitive {
        byte
    } else {
        byte.to_ascii_lowercase()
    }
}

/// Splits a string into persistent lines, dropping carriage returns. Always
/// yields at least one (possibly empty) line.
pub fn lines_from_str(text: &str) -> Lines {
    let mut lines = Lines::new();
    let mut current = Line::new();
    for byte in text.bytes() {
        match byte {
            b'\r' => {}
            b'\n' => {
                lines.push_back(current);
                current = Line::new();
            }
            _ => current.push_back(byte),
        }
    }
    lines.push_back(current);
    lines
}

pub fn lines_to_string(lines: &Lines) -> String {
    let mut bytes = vec![];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            bytes.push(b'\n');
        }
        bytes.extend(line.iter());
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// A bidirectional character-coordinate walker over [`Lines`], bounded by
/// `begin`/`end`. Steps move by whole UTF-8 characters, never landing on a
/// continuation byte.
#[derive(Clone)]
pub struct LinesIter<'a> {
    text: &'a Lines,
    lc: LineChar,
    begin: LineChar,
    end: LineChar,
}

impl<'a> LinesIter<'a> {
    pub fn new(text: &'a Lines, lc: LineChar, begin: LineChar, end: LineChar) -> Self {
        LinesIter {
            text,
            lc,
            begin,
            end,
        }
    }

    pub fn lc(&self) -> LineChar {
        self.lc
    }

    /// The byte at the current position, or `\0` at a line end.
    pub fn byte(&self) -> u8 {
        let line = &self.text[self.lc.line as usize];
        if (self.lc.byte as usize) < line.len() {
            line[self.lc.byte as usize]
        } else {
            0
        }
    }

    pub fn is_begin(&self) -> bool {
        self.lc == self.begin
    }

    pub fn is_end(&self) -> bool {
        self.lc == self.end
    }

    pub fn reset(&mut self) {
        self.lc = self.begin;
    }

    pub fn move_right(&mut self) {
        if self.lc == self.end {
            return;
        }
        let line = &self.text[self.lc.line as usize];
        if self.lc.byte as usize == line.len() {
            self.lc.line += 1;
            self.lc.byte = 0;
        } else {
            let step = utf8_char_length(line[self.lc.byte as usize]);
            self.lc.byte = (self.lc.byte + step).min(line.len() as u32);
        }
    }

    pub fn move_left(&mut self) {
        if self.lc == self.begin {
            return;
        }
        if self.lc.byte == 0 {
            self.lc.line -= 1;
            self.lc.byte = self.text[self.lc.line as usize].len() as u32;
        } else {
            let line = &self.text[self.lc.line as usize];
            loop {
                self.lc.byte -= 1;
                if self.lc.byte == 0 || !is_continuation_byte(line[self.lc.byte as usize]) {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_round_trip() {
        let lines = lines_from_str("ab\ncd\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines_to_string(&lines), "ab\ncd\n");
        assert_eq!(lines_to_string(&lines_from_str("")), "");
        assert_eq!(lines_from_str("").len(), 1);
    }

    #[test]
    fn test_iter_skips_continuation_bytes() {
        let lines = lines_from_str("aé€"); // 1 + 2 + 3 bytes
        let end = LineChar::new(0, 6);
        let mut iter = LinesIter::new(&lines, LineChar::default(), LineChar::default(), end);
        iter.move_right();
        assert_eq!(iter.lc(), LineChar::new(0, 1));
        iter.move_right();
        assert_eq!(iter.lc(), LineChar::new(0, 3));
        iter.move_right();
        assert_eq!(iter.lc(), LineChar::new(0, 6));
        iter.move_left();
        assert_eq!(iter.lc(), LineChar::new(0, 3));
        iter.move_left();
        assert_eq!(iter.lc(), LineChar::new(0, 1));
    }
}

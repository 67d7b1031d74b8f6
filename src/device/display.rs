//! Character grid shared by the square keypad and the PDA.

use core::fmt::Write;
use core::ops::Range;

use log::warn;

const UNDERLINE: &str = "\x1b[4m";
const END: &str = "\x1b[0m";
const BLANK: u8 = b' ';

const HIGHLIGHT_START: &str = "<span style=\"background-color: #FFFF00\"><b>";
const HIGHLIGHT_END: &str = "</b></span>";

/// Scroll direction argument of the scroll command.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Scroll {
    /// Rows move down by one, a blank row enters at the top.
    Down,
    /// Rows move up by one, a blank row enters at the bottom.
    Up,
}

impl Scroll {
    pub fn from_byte(direction: u8) -> Option<Self> {
        match direction {
            0x01 => Some(Scroll::Down),
            0xFF => Some(Scroll::Up),
            _ => None,
        }
    }
}

/// Highlighted columns `[start, end)` of one row.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
struct InvertRegion {
    line: usize,
    start: usize,
    end: usize,
}

impl InvertRegion {
    fn columns(&self, width: usize) -> Range<usize> {
        let end = self.end.min(width);
        self.start.min(end)..end
    }
}

/// A fixed grid of `height` rows, each exactly `width` characters wide.
#[derive(Debug, Clone)]
pub struct DisplayBuffer {
    width: usize,
    rows: Vec<Vec<u8>>,
    invert: Option<InvertRegion>,
    dirty: bool,
}

impl DisplayBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            rows: vec![vec![BLANK; width]; height],
            invert: None,
            dirty: true,
        }
    }

    /// The text of row `line`, or None if it is outside the grid.
    pub fn row(&self, line: usize) -> Option<String> {
        self.rows.get(line).map(|row| to_text(row))
    }

    /// Blank every row and drop the inverted region.
    pub fn clear(&mut self) {
        for row in self.rows.iter_mut() {
            row.fill(BLANK);
        }
        self.invert = None;
        self.dirty = true;
    }

    /// Shift rows `[start, end)` one step, blanking the vacated row.
    pub fn scroll(&mut self, start: usize, end: usize, direction: Scroll) {
        let end = end.min(self.rows.len());
        if start >= end {
            return;
        }
        let region = &mut self.rows[start..end];
        match direction {
            Scroll::Up => {
                region.rotate_left(1);
                if let Some(row) = region.last_mut() {
                    row.fill(BLANK);
                }
            }
            Scroll::Down => {
                region.rotate_right(1);
                if let Some(row) = region.first_mut() {
                    row.fill(BLANK);
                }
            }
        }
        self.dirty = true;
    }

    /// Replace row `line` with `text`, padded with blanks or truncated to the width.
    pub fn write_line(&mut self, line: usize, text: &[u8]) {
        let width = self.width;
        match self.rows.get_mut(line) {
            Some(row) => {
                let len = text.len().min(width);
                row[..len].copy_from_slice(&text[..len]);
                row[len..].fill(BLANK);
                self.dirty = true;
            }
            None => warn!("Write to row {} outside of the display", line),
        }
    }

    /// Highlight the whole of row `line`.
    pub fn invert_line(&mut self, line: usize) {
        self.invert_chars(line, 0, self.width);
    }

    /// Highlight columns `[start, end)` of row `line`, replacing any earlier highlight.
    pub fn invert_chars(&mut self, line: usize, start: usize, end: usize) {
        self.invert = Some(InvertRegion { line, start, end });
        self.dirty = true;
    }

    /// Rows separated by newlines.
    pub fn render_text(&self) -> String {
        let mut ret = String::with_capacity((self.width + 1) * self.rows.len());
        for row in self.rows.iter() {
            ret.push_str(&to_text(row));
            ret.push('\n');
        }
        ret
    }

    /// Rows in a `<pre>` element, with the inverted region highlighted.
    pub fn render_html(&self) -> String {
        let mut ret = String::from("<pre>");
        for (line, row) in self.rows.iter().enumerate() {
            match self.invert {
                Some(invert) if invert.line == line => {
                    let cols = invert.columns(self.width);
                    push_escaped(&mut ret, &row[..cols.start]);
                    ret.push_str(HIGHLIGHT_START);
                    push_escaped(&mut ret, &row[cols.clone()]);
                    ret.push_str(HIGHLIGHT_END);
                    push_escaped(&mut ret, &row[cols.end..]);
                }
                _ => push_escaped(&mut ret, row),
            }
            ret.push('\n');
        }
        ret.push_str("</pre>");
        ret
    }

    /// Terminal rendering with the inverted line underlined, followed by a
    /// status line.
    pub fn render_console(&self, status: &str) -> String {
        let mut ret = String::new();
        for (line, row) in self.rows.iter().enumerate() {
            if self.invert.map(|invert| invert.line) == Some(line) {
                ret.push_str(UNDERLINE);
                ret.push_str(&to_text(row));
                ret.push_str(END);
            } else {
                ret.push_str(&to_text(row));
            }
            ret.push('\n');
        }
        let _ = writeln!(ret, "{}", "-".repeat(self.width));
        let _ = writeln!(ret, "STATUS: {}", status);
        ret
    }

    /// Returns true once after each change to the display.
    pub fn take_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.dirty, false)
    }
}

fn to_text(row: &[u8]) -> String {
    row.iter().copied().map(char::from).collect()
}

fn push_escaped(out: &mut String, row: &[u8]) {
    for c in row.iter().copied().map(char::from) {
        push_escaped_char(out, c);
    }
}

/// Append `text` to `out` with HTML markup characters escaped.
pub(crate) fn push_escaped_str(out: &mut String, text: &str) {
    for c in text.chars() {
        push_escaped_char(out, c);
    }
}

fn push_escaped_char(out: &mut String, c: char) {
    match c {
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '&' => out.push_str("&amp;"),
        c => out.push(c),
    }
}

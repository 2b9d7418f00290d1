//! Read-only motion computations.
//!
//! Every function takes the document and a starting position and returns the
//! target, or `None` when the motion cannot move (document start or end,
//! nothing found). Callers decide what a failed motion means.

use super::document::Document;
use super::position::Position;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Blank,
    Word,
    Punct,
}

fn classify(c: char, big: bool) -> CharClass {
    if c.is_whitespace() {
        CharClass::Blank
    } else if big || c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

/// Class at `pos`; the slot one past the end of a line reads as a newline.
fn class_at(doc: &Document, pos: Position, big: bool) -> CharClass {
    match doc.get_line(pos.line).char_at(pos.column) {
        Some(c) => classify(c, big),
        None => CharClass::Blank,
    }
}

fn is_empty_line(doc: &Document, line: usize) -> bool {
    doc.line_len(line) == 0
}

/// Next slot in reading order, visiting each line's end slot.
fn advance(doc: &Document, pos: Position) -> Option<Position> {
    if pos.column < doc.line_len(pos.line) {
        Some(Position::new(pos.line, pos.column + 1))
    } else if pos.line + 1 < doc.line_count() {
        Some(Position::new(pos.line + 1, 0))
    } else {
        None
    }
}

fn retreat(doc: &Document, pos: Position) -> Option<Position> {
    if pos.column > 0 {
        Some(Position::new(pos.line, pos.column - 1))
    } else if pos.line > 0 {
        Some(Position::new(pos.line - 1, doc.line_len(pos.line - 1)))
    } else {
        None
    }
}

/// Start of the next word (`w`, or `W` when `big`). Empty lines are words.
pub fn next_word(doc: &Document, pos: Position, big: bool) -> Option<Position> {
    let start_class = class_at(doc, pos, big);
    let mut p = pos;
    if start_class != CharClass::Blank {
        loop {
            p = advance(doc, p)?;
            if p.line != pos.line || class_at(doc, p, big) != start_class {
                break;
            }
        }
    }
    loop {
        if p != pos && (is_empty_line(doc, p.line) || class_at(doc, p, big) != CharClass::Blank) {
            return Some(p);
        }
        p = advance(doc, p)?;
    }
}

/// Start of the current or previous word (`b`/`B`).
pub fn prev_word(doc: &Document, pos: Position, big: bool) -> Option<Position> {
    let mut p = retreat(doc, pos)?;
    loop {
        if is_empty_line(doc, p.line) {
            return Some(p);
        }
        if class_at(doc, p, big) != CharClass::Blank {
            break;
        }
        p = retreat(doc, p)?;
    }
    let class = class_at(doc, p, big);
    while p.column > 0 {
        let q = Position::new(p.line, p.column - 1);
        if class_at(doc, q, big) != class {
            break;
        }
        p = q;
    }
    Some(p)
}

/// Last character of the current or next word (`e`/`E`).
pub fn end_word(doc: &Document, pos: Position, big: bool) -> Option<Position> {
    let mut p = advance(doc, pos)?;
    while class_at(doc, p, big) == CharClass::Blank {
        p = advance(doc, p)?;
    }
    let class = class_at(doc, p, big);
    loop {
        let q = Position::new(p.line, p.column + 1);
        if q.column >= doc.line_len(p.line) || class_at(doc, q, big) != class {
            return Some(p);
        }
        p = q;
    }
}

fn is_sentence_start(doc: &Document, pos: Position) -> bool {
    let len = doc.line_len(pos.line);
    if len == 0 {
        return pos.line == 0 || !is_empty_line(doc, pos.line - 1);
    }
    match doc.get_line(pos.line).char_at(pos.column) {
        Some(c) if !c.is_whitespace() => {}
        _ => return false,
    }
    let mut q = pos;
    let mut gap = false;
    loop {
        q = match retreat(doc, q) {
            Some(r) => r,
            None => return true,
        };
        if is_empty_line(doc, q.line) {
            return true;
        }
        if class_at(doc, q, false) == CharClass::Blank {
            gap = true;
            continue;
        }
        break;
    }
    if !gap {
        return false;
    }
    let chars = doc.get_line(q.line).chars();
    let mut i = q.column;
    while matches!(chars[i], ')' | ']' | '"' | '\'') {
        if i == 0 {
            return false;
        }
        i -= 1;
    }
    matches!(chars[i], '.' | '!' | '?')
}

pub fn next_sentence(doc: &Document, pos: Position) -> Option<Position> {
    let mut p = pos;
    loop {
        p = advance(doc, p)?;
        if is_sentence_start(doc, p) {
            return Some(p);
        }
    }
}

pub fn prev_sentence(doc: &Document, pos: Position) -> Option<Position> {
    let mut p = pos;
    loop {
        p = retreat(doc, p)?;
        if is_sentence_start(doc, p) {
            return Some(p);
        }
    }
}

/// Next blank line after the current paragraph, or the end of the buffer.
pub fn next_paragraph(doc: &Document, pos: Position) -> Option<Position> {
    let last = doc.line_count() - 1;
    let mut row = pos.line;
    while row < last && is_empty_line(doc, row) {
        row += 1;
    }
    while row < last && !is_empty_line(doc, row) {
        row += 1;
    }
    let target = if is_empty_line(doc, row) {
        Position::new(row, 0)
    } else {
        line_end(doc, row)
    };
    (target != pos).then_some(target)
}

/// Previous blank line before the current paragraph, or the buffer start.
pub fn prev_paragraph(doc: &Document, pos: Position) -> Option<Position> {
    let mut row = pos.line;
    while row > 0 && is_empty_line(doc, row) {
        row -= 1;
    }
    while row > 0 && !is_empty_line(doc, row) {
        row -= 1;
    }
    let target = Position::new(row, 0);
    (target != pos).then_some(target)
}

fn starts_section(doc: &Document, row: usize) -> bool {
    doc.get_line(row).char_at(0) == Some('{')
}

/// Next line starting with `{`, or the end of the buffer.
pub fn next_section(doc: &Document, pos: Position) -> Option<Position> {
    let last = doc.line_count() - 1;
    let target = (pos.line + 1..=last)
        .find(|&row| starts_section(doc, row))
        .map(|row| Position::new(row, 0))
        .unwrap_or_else(|| line_end(doc, last));
    (target != pos).then_some(target)
}

/// Previous line starting with `{`, or the buffer start.
pub fn prev_section(doc: &Document, pos: Position) -> Option<Position> {
    let target = (0..pos.line)
        .rev()
        .find(|&row| starts_section(doc, row))
        .map(|row| Position::new(row, 0))
        .unwrap_or_default();
    (target != pos).then_some(target)
}

/// First character after `pos` that is in `set`. Without `multiline` the
/// scan stays on the starting line.
pub fn find_char_forward(
    doc: &Document,
    pos: Position,
    set: &[char],
    multiline: bool,
) -> Option<Position> {
    let last = if multiline {
        doc.line_count() - 1
    } else {
        pos.line
    };
    for row in pos.line..=last {
        let from = if row == pos.line { pos.column + 1 } else { 0 };
        let chars = doc.get_line(row).chars();
        if let Some(offset) = chars.iter().skip(from).position(|c| set.contains(c)) {
            return Some(Position::new(row, from + offset));
        }
    }
    None
}

pub fn find_char_backward(
    doc: &Document,
    pos: Position,
    set: &[char],
    multiline: bool,
) -> Option<Position> {
    let first = if multiline { 0 } else { pos.line };
    for row in (first..=pos.line).rev() {
        let chars = doc.get_line(row).chars();
        let upto = if row == pos.line {
            pos.column.min(chars.len())
        } else {
            chars.len()
        };
        if let Some(col) = chars[..upto].iter().rposition(|c| set.contains(c)) {
            return Some(Position::new(row, col));
        }
    }
    None
}

/// A regex hit, in character columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub position: Position,
    pub length: usize,
}

fn byte_to_char(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

fn char_to_byte(text: &str, column: usize) -> usize {
    text.char_indices()
        .nth(column)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// First match at or after `start`, scanning rows up to and including
/// `last_row`.
pub fn find_regex_next(
    doc: &Document,
    pattern: &Regex,
    start: Position,
    last_row: usize,
) -> Option<SearchMatch> {
    let last_row = last_row.min(doc.line_count() - 1);
    for row in start.line..=last_row {
        let text = doc.line_text(row);
        let from = if row == start.line {
            if start.column > doc.line_len(row) {
                continue;
            }
            char_to_byte(&text, start.column)
        } else {
            0
        };
        if let Some(m) = pattern.find_at(&text, from) {
            return Some(SearchMatch {
                position: Position::new(row, byte_to_char(&text, m.start())),
                length: m.as_str().chars().count(),
            });
        }
    }
    None
}

/// Last match strictly before `start`, scanning rows down to and including
/// `first_row`.
pub fn find_regex_prev(
    doc: &Document,
    pattern: &Regex,
    start: Position,
    first_row: usize,
) -> Option<SearchMatch> {
    if first_row > start.line {
        return None;
    }
    for row in (first_row..=start.line).rev() {
        let text = doc.line_text(row);
        let limit = if row == start.line {
            start.column
        } else {
            usize::MAX
        };
        let hit = pattern
            .find_iter(&text)
            .map(|m| (byte_to_char(&text, m.start()), m.as_str().chars().count()))
            .take_while(|(col, _)| *col < limit)
            .last();
        if let Some((col, length)) = hit {
            return Some(SearchMatch {
                position: Position::new(row, col),
                length,
            });
        }
    }
    None
}

pub fn first_non_blank(doc: &Document, line: usize) -> Position {
    let l = doc.get_line(line);
    Position::new(line, l.first_non_blank().min(l.len().saturating_sub(1)))
}

/// Last character of `line` (column 0 when empty).
pub fn line_end(doc: &Document, line: usize) -> Position {
    Position::new(line, doc.line_len(line).saturating_sub(1))
}

const BRACKETS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('{', '}')];

/// Partner of the first bracket at or after `pos` on its line (`%`).
pub fn matching_bracket(doc: &Document, pos: Position) -> Option<Position> {
    let chars = doc.get_line(pos.line).chars();
    let (col, ch) = chars
        .iter()
        .enumerate()
        .skip(pos.column)
        .find(|(_, c)| BRACKETS.iter().any(|(o, cl)| *c == o || *c == cl))
        .map(|(i, c)| (i, *c))?;
    let from = Position::new(pos.line, col);
    for &(open, close) in &BRACKETS {
        if ch == open {
            return scan_bracket(doc, from, open, close, true);
        }
        if ch == close {
            return scan_bracket(doc, from, close, open, false);
        }
    }
    None
}

fn scan_bracket(
    doc: &Document,
    from: Position,
    same: char,
    other: char,
    forward: bool,
) -> Option<Position> {
    let mut depth = 0usize;
    let mut p = from;
    loop {
        p = if forward {
            advance(doc, p)?
        } else {
            retreat(doc, p)?
        };
        match doc.get_line(p.line).char_at(p.column) {
            Some(c) if c == same => depth += 1,
            Some(c) if c == other => {
                if depth == 0 {
                    return Some(p);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
}

/// The keyword under or after the cursor on its line (`*`, `#`).
pub fn word_at(doc: &Document, pos: Position) -> Option<(Position, String)> {
    let chars = doc.get_line(pos.line).chars();
    let is_word = |c: &char| c.is_alphanumeric() || *c == '_';
    let mut start = (pos.column..chars.len()).find(|&i| is_word(&chars[i]))?;
    while start > 0 && is_word(&chars[start - 1]) {
        start -= 1;
    }
    let end = (start..chars.len())
        .find(|&i| !is_word(&chars[i]))
        .unwrap_or(chars.len());
    Some((
        Position::new(pos.line, start),
        chars[start..end].iter().collect(),
    ))
}

//! Operators applied to a resolved span, plus put and join.
//!
//! Callers open the undo group. Every operator but `c` and `!` leaves it to
//! the caller to close; `c` hands the open group to insert mode.

use crate::controller::command_types::{Motion, Mode, Operator};
use crate::controller::shared_state::{
    CommandLineKind, CommandLineRequest, ModeTransition, SharedEditorState,
};
use crate::document_model::movement;
use crate::document_model::{
    Document, Position, Register, RegisterAction, RegisterType, SelectionBounds,
};
use crate::error::Result;
use tracing::debug;

/// The span an operator covers when moving from `start` to `target`.
pub fn motion_region(
    doc: &Document,
    start: Position,
    target: Position,
    motion: &Motion,
) -> SelectionBounds {
    let (a, b) = if start <= target {
        (start, target)
    } else {
        (target, start)
    };
    if motion.is_linewise() {
        return SelectionBounds::Lines {
            first: a.line,
            last: b.line,
        };
    }
    if motion.is_inclusive() {
        let end = Position::new(b.line, (b.column + 1).min(doc.line_len(b.line)));
        return SelectionBounds::Chars { start: a, end };
    }
    if b.column == 0 && b.line > a.line {
        // An exclusive span ending at the start of a line stops at the end of
        // the previous one; from a line's indent it covers whole lines.
        if a.column <= doc.get_line(a.line).first_non_blank() {
            return SelectionBounds::Lines {
                first: a.line,
                last: b.line - 1,
            };
        }
        let prev = b.line - 1;
        return SelectionBounds::Chars {
            start: a,
            end: Position::new(prev, doc.line_len(prev)),
        };
    }
    SelectionBounds::Chars { start: a, end: b }
}

/// `(row, start, end)` character spans covered by `bounds`, `end` exclusive.
pub fn spans(doc: &Document, bounds: SelectionBounds) -> Vec<(usize, usize, usize)> {
    match bounds {
        SelectionBounds::Chars { start, end } => (start.line..=end.line)
            .map(|row| {
                let from = if row == start.line { start.column } else { 0 };
                let to = if row == end.line {
                    end.column
                } else {
                    doc.line_len(row)
                };
                (row, from, to.max(from))
            })
            .collect(),
        SelectionBounds::Lines { first, last } => (first..=last)
            .map(|row| (row, 0, doc.line_len(row)))
            .collect(),
        SelectionBounds::Block {
            first,
            last,
            left,
            right,
        } => (first..=last)
            .map(|row| {
                let len = doc.line_len(row);
                (row, left.min(len), (right + 1).min(len))
            })
            .collect(),
    }
}

fn start_position(bounds: SelectionBounds) -> Position {
    match bounds {
        SelectionBounds::Chars { start, .. } => start,
        SelectionBounds::Lines { first, .. } => Position::new(first, 0),
        SelectionBounds::Block { first, left, .. } => Position::new(first, left),
    }
}

/// The register contents `bounds` would yank.
fn capture(doc: &Document, bounds: SelectionBounds) -> Register {
    match bounds {
        SelectionBounds::Chars { start, end } => Register::characters(doc.text_range(start, end)),
        SelectionBounds::Lines { first, last } => {
            Register::lines((first..=last).map(|row| doc.line_text(row)))
        }
        SelectionBounds::Block { .. } => Register::block(
            spans(doc, bounds)
                .into_iter()
                .map(|(row, from, to)| doc.get_line(row).slice(from, to)),
        ),
    }
}

/// Removes the text in `bounds` without touching registers.
fn remove(doc: &mut Document, bounds: SelectionBounds) {
    match bounds {
        SelectionBounds::Chars { start, end } => {
            if start < end {
                doc.delete_range(start, end);
            }
        }
        SelectionBounds::Lines { first, last } => {
            for _ in first..=last {
                doc.delete_line(first);
            }
        }
        SelectionBounds::Block { .. } => {
            for (row, from, to) in spans(doc, bounds) {
                doc.delete_chars(row, from, to - from);
            }
        }
    }
}

fn leading_whitespace(text: &str) -> String {
    text.chars().take_while(|c| *c == ' ' || *c == '\t').collect()
}

/// Applies `op` to `bounds`. `times` repeats shifts (`3>` in visual mode).
pub fn apply_operator(
    shared: &mut SharedEditorState,
    op: Operator,
    bounds: SelectionBounds,
    register: Option<char>,
    times: usize,
) -> Result<ModeTransition> {
    debug!(target: "editor.keys", ?op, ?bounds, "operator");
    match op {
        Operator::Delete => {
            let captured = capture(&shared.document, bounds);
            shared
                .register_manager
                .record(register, RegisterAction::Delete, captured);
            remove(&mut shared.document, bounds);
            match bounds {
                SelectionBounds::Lines { first, .. } => shared.goto_line(first),
                _ => shared.cursor = shared.clamp_position(start_position(bounds)),
            }
            if let SelectionBounds::Lines { first, last } = bounds {
                report_lines(shared, last - first + 1, "fewer");
            }
            shared.mark_change();
            Ok(ModeTransition::Stay)
        }
        Operator::Change => {
            let captured = capture(&shared.document, bounds);
            shared
                .register_manager
                .record(register, RegisterAction::Delete, captured);
            match bounds {
                SelectionBounds::Lines { first, last } => {
                    let indent = if shared.settings.autoindent {
                        leading_whitespace(&shared.document.line_text(first))
                    } else {
                        String::new()
                    };
                    for _ in first..last {
                        shared.document.delete_line(first + 1);
                    }
                    shared.document.set_line(first, &indent);
                    shared.cursor = Position::new(first, indent.chars().count());
                }
                _ => {
                    remove(&mut shared.document, bounds);
                    shared.cursor = shared.clamp_position(start_position(bounds));
                }
            }
            shared.mark_change();
            Ok(ModeTransition::ToMode(Mode::Insert))
        }
        Operator::Yank => {
            let captured = capture(&shared.document, bounds);
            shared
                .register_manager
                .record(register, RegisterAction::Yank, captured);
            match bounds {
                SelectionBounds::Lines { first, last } => {
                    if shared.cursor.line != first {
                        shared.cursor = Position::new(first, shared.cursor.column);
                    }
                    report_lines(shared, last - first + 1, "yanked");
                }
                _ => shared.cursor = start_position(bounds),
            }
            Ok(ModeTransition::Stay)
        }
        Operator::ShiftLeft | Operator::ShiftRight => {
            let (first, last) = row_span(bounds);
            let width = shared.settings.shiftwidth * times.max(1);
            let tab_stop = shared.tab_stop();
            for row in first..=last {
                let text = shared.document.line_text(row);
                if text.is_empty() {
                    continue;
                }
                let indent = leading_whitespace(&text);
                let line = shared.document.get_line(row);
                let current = line.display_column(indent.chars().count(), tab_stop);
                let wanted = if op == Operator::ShiftRight {
                    current + width
                } else {
                    current.saturating_sub(width)
                };
                let replacement = shared.settings.indent_string(wanted);
                if replacement != indent {
                    shared
                        .document
                        .replace_chars(row, 0, indent.chars().count(), &replacement);
                }
            }
            shared.goto_line(first);
            shared.mark_change();
            Ok(ModeTransition::Stay)
        }
        Operator::Filter => {
            let (first, last) = row_span(bounds);
            let text = if first == last {
                ".!".to_string()
            } else {
                format!("{},{}!", first + 1, last + 1)
            };
            shared.cursor = Position::new(first, 0);
            shared.command_line_request = Some(CommandLineRequest {
                kind: CommandLineKind::Ex,
                text,
                operator: None,
            });
            Ok(ModeTransition::ToMode(Mode::CommandLine))
        }
        Operator::ToggleCase | Operator::Lowercase | Operator::Uppercase => {
            for (row, from, to) in spans(&shared.document, bounds) {
                let old = shared.document.get_line(row).slice(from, to);
                let new: String = old.chars().map(|c| convert_case(op, c)).collect();
                if new != old {
                    shared.document.replace_chars(row, from, to, &new);
                }
            }
            shared.cursor = shared.clamp_position(start_position(bounds));
            shared.mark_change();
            Ok(ModeTransition::Stay)
        }
    }
}

fn row_span(bounds: SelectionBounds) -> (usize, usize) {
    match bounds {
        SelectionBounds::Chars { start, end } => (start.line, end.line),
        SelectionBounds::Lines { first, last } | SelectionBounds::Block { first, last, .. } => {
            (first, last)
        }
    }
}

/// Reports large line-count changes the way vi does (`3 fewer lines`).
pub(crate) fn report_lines(shared: &mut SharedEditorState, count: usize, what: &str) {
    if count > 2 {
        let message = match what {
            "yanked" => format!("{count} lines yanked"),
            _ => format!("{count} {what} lines"),
        };
        shared.message(message);
    }
}

pub fn convert_case(op: Operator, c: char) -> char {
    match op {
        Operator::Uppercase => c.to_uppercase().next().unwrap_or(c),
        Operator::Lowercase => c.to_lowercase().next().unwrap_or(c),
        _ if c.is_uppercase() => c.to_lowercase().next().unwrap_or(c),
        _ => c.to_uppercase().next().unwrap_or(c),
    }
}

/// End of the word `cw` changes: the current word only, never the blanks
/// after it.
pub fn change_word_end(doc: &Document, pos: Position, count: usize, big: bool) -> Position {
    let line = doc.get_line(pos.line);
    let class = |c: char| {
        if c.is_whitespace() {
            0
        } else if big || c.is_alphanumeric() || c == '_' {
            1
        } else {
            2
        }
    };
    let at_word_end = match (line.char_at(pos.column), line.char_at(pos.column + 1)) {
        (Some(here), Some(next)) => class(here) != class(next),
        _ => true,
    };
    let mut p = pos;
    for i in 0..count.max(1) {
        if i == 0 && at_word_end {
            continue;
        }
        match movement::end_word(doc, p, big) {
            Some(next) => p = next,
            None => break,
        }
    }
    p
}

/// `p`/`P`: puts `register` `count` times after or before the cursor.
pub fn put(
    shared: &mut SharedEditorState,
    register: Option<char>,
    before: bool,
    count: usize,
) -> Result<()> {
    let reg = shared.register_manager.get(register)?;
    let count = count.max(1);
    let cursor = shared.cursor;
    match reg.kind {
        RegisterType::Line => {
            let lines = reg.as_lines();
            let at = if before { cursor.line } else { cursor.line + 1 };
            let mut row = at;
            for _ in 0..count {
                for text in &lines {
                    shared.document.add_line(row, text);
                    row += 1;
                }
            }
            shared.goto_line(at);
            report_lines(shared, row - at, "more");
        }
        RegisterType::Character => {
            let text = reg.text().repeat(count);
            let len = shared.document.line_len(cursor.line);
            let column = if before || len == 0 {
                cursor.column.min(len)
            } else {
                (cursor.column + 1).min(len)
            };
            let start = Position::new(cursor.line, column);
            let end = shared.document.insert_text(start, &text);
            shared.cursor = if text.contains('\n') {
                start
            } else {
                Position::new(end.line, end.column.saturating_sub(1))
            };
        }
        RegisterType::Block => {
            let len = shared.document.line_len(cursor.line);
            let column = if before || len == 0 {
                cursor.column
            } else {
                cursor.column + 1
            };
            for (i, fragment) in reg.fragments.iter().enumerate() {
                let row = cursor.line + i;
                if row >= shared.document.line_count() {
                    let at = shared.document.line_count();
                    shared.document.add_line(at, "");
                }
                let row_len = shared.document.line_len(row);
                if row_len < column {
                    shared
                        .document
                        .insert_chars(row, row_len, &" ".repeat(column - row_len));
                }
                shared
                    .document
                    .insert_chars(row, column, &fragment.text.repeat(count));
            }
            shared.cursor = Position::new(cursor.line, column);
        }
    }
    shared.mark_change();
    Ok(())
}

/// Joins `count` lines (at least two) starting at `row`. With `spaces`,
/// leading blanks of each joined line collapse into one space. Returns false
/// when `row` is the last line.
pub fn join_lines(shared: &mut SharedEditorState, row: usize, count: usize, spaces: bool) -> bool {
    let last = shared.last_line();
    if row >= last {
        return false;
    }
    let joins = (count.max(2) - 1).min(last - row);
    let mut column = 0;
    for _ in 0..joins {
        let doc = &mut shared.document;
        let len = doc.line_len(row);
        column = len;
        if spaces {
            let next = doc.line_text(row + 1);
            let blanks = next.chars().take_while(|c| c.is_whitespace()).count();
            doc.delete_chars(row + 1, 0, blanks);
            let skip = next
                .char_indices()
                .nth(blanks)
                .map(|(b, _)| b)
                .unwrap_or(next.len());
            let rest = &next[skip..];
            let current = doc.get_line(row);
            let ends_blank = current.chars().last().is_some_and(|c| c.is_whitespace());
            doc.join_line(row);
            if len > 0 && !ends_blank && !rest.is_empty() && !rest.starts_with(')') {
                doc.insert_chars(row, len, " ");
            }
        } else {
            doc.join_line(row);
        }
    }
    shared.cursor = Position::new(row, column);
    shared.mark_change();
    true
}

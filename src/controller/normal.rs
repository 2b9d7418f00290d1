use crate::controller::command_types::{
    Command, InsertKind, Mode, Motion, Operator, PageKind, ScrollKind,
};
use crate::controller::key::KeyEvent;
use crate::controller::key_handler::{KeyHandler, KeyOutcome, ParsedCommand};
use crate::controller::motions;
use crate::controller::operators;
use crate::controller::shared_state::{
    CommandLineKind, CommandLineRequest, InsertRequest, ModeController, ModeTransition,
    PendingOperator, SharedEditorState,
};
use crate::document_model::{Position, Selection, SelectionBounds};
use crate::error::{EditorError, Result};
use crate::ex::{self, ExOutcome};
use tracing::trace;

/// Normal mode: parses keys into commands and executes them.
#[derive(Default)]
pub struct NormalController {
    key_handler: KeyHandler,
}

impl NormalController {
    pub fn new() -> Self {
        Self::default()
    }

    /// No partial command, count or register is waiting.
    pub fn is_idle(&self) -> bool {
        self.key_handler.is_idle()
    }

    pub fn reset(&mut self) {
        self.key_handler.reset();
    }

    fn execute(
        &mut self,
        parsed: ParsedCommand,
        shared: &mut SharedEditorState,
    ) -> Result<ModeTransition> {
        let ParsedCommand {
            command,
            count,
            register,
        } = parsed;
        let n = count.unwrap_or(1).max(1);
        let cursor = shared.cursor;
        let line_len = shared.document.line_len(cursor.line);
        let last = shared.last_line();
        match command {
            Command::Move(motion) => {
                motions::move_cursor(shared, &motion, count)?;
            }
            Command::Operate { op, motion } => return operate(shared, op, &motion, count, register),
            Command::OperateLines(op) => {
                let bounds = SelectionBounds::Lines {
                    first: cursor.line,
                    last: (cursor.line + n - 1).min(last),
                };
                return operators::apply_operator(shared, op, bounds, register, 1);
            }
            Command::OperatorSearch { op, direction } => {
                shared.command_line_request = Some(CommandLineRequest {
                    kind: CommandLineKind::Search(direction),
                    text: String::new(),
                    operator: Some(PendingOperator {
                        op,
                        count,
                        register,
                    }),
                });
                return Ok(ModeTransition::ToMode(Mode::CommandLine));
            }
            Command::DeleteChar if line_len > 0 => {
                let end = Position::new(cursor.line, (cursor.column + n).min(line_len));
                let bounds = SelectionBounds::Chars { start: cursor, end };
                return operators::apply_operator(shared, Operator::Delete, bounds, register, 1);
            }
            Command::DeleteCharBefore if cursor.column > 0 => {
                let start = Position::new(cursor.line, cursor.column.saturating_sub(n));
                let bounds = SelectionBounds::Chars { start, end: cursor };
                return operators::apply_operator(shared, Operator::Delete, bounds, register, 1);
            }
            Command::DeleteChar | Command::DeleteCharBefore => {}
            Command::DeleteToEnd | Command::ChangeToEnd => {
                let row = (cursor.line + n - 1).min(last);
                let end = Position::new(row, shared.document.line_len(row));
                let op = if command == Command::DeleteToEnd {
                    Operator::Delete
                } else {
                    Operator::Change
                };
                if cursor == end && op == Operator::Delete {
                    return Ok(ModeTransition::Stay);
                }
                let bounds = SelectionBounds::Chars { start: cursor, end };
                return operators::apply_operator(shared, op, bounds, register, 1);
            }
            Command::SubstituteChar => {
                let end = Position::new(cursor.line, (cursor.column + n).min(line_len));
                let bounds = SelectionBounds::Chars { start: cursor, end };
                return operators::apply_operator(shared, Operator::Change, bounds, register, 1);
            }
            Command::SubstituteLine | Command::YankLine => {
                let op = if command == Command::YankLine {
                    Operator::Yank
                } else {
                    Operator::Change
                };
                let bounds = SelectionBounds::Lines {
                    first: cursor.line,
                    last: (cursor.line + n - 1).min(last),
                };
                return operators::apply_operator(shared, op, bounds, register, 1);
            }
            Command::Put { before } => operators::put(shared, register, before, n)?,
            Command::Join { spaces } => {
                operators::join_lines(shared, cursor.line, n, spaces);
            }
            Command::ToggleCaseChar if line_len > 0 => {
                let end = (cursor.column + n).min(line_len);
                let bounds = SelectionBounds::Chars {
                    start: cursor,
                    end: Position::new(cursor.line, end),
                };
                operators::apply_operator(shared, Operator::ToggleCase, bounds, register, 1)?;
                shared.cursor = Position::new(cursor.line, end.min(line_len - 1));
            }
            Command::ToggleCaseChar => {}
            Command::ReplaceChar(ch) => {
                if cursor.column + n > line_len {
                    return Ok(ModeTransition::Stay);
                }
                if ch == '\n' {
                    shared.document.delete_chars(cursor.line, cursor.column, n);
                    shared.document.split_line(cursor.line, cursor.column);
                    shared.cursor = Position::new(cursor.line + 1, 0);
                } else {
                    for i in 0..n {
                        shared.document.replace_char(cursor.line, cursor.column + i, ch);
                    }
                    shared.cursor = Position::new(cursor.line, cursor.column + n - 1);
                }
                shared.mark_change();
            }
            Command::EnterReplace => {
                shared.insert_request = Some(InsertRequest {
                    count: n,
                    open_line: false,
                });
                return Ok(ModeTransition::ToMode(Mode::Replace));
            }
            Command::Insert(kind) => {
                start_insert(shared, kind, n);
                return Ok(ModeTransition::ToMode(Mode::Insert));
            }
            Command::Undo | Command::Redo => {
                for _ in 0..n {
                    let restored = if command == Command::Undo {
                        shared.document.undo()
                    } else {
                        shared.document.redo()
                    };
                    match restored {
                        Some(pos) => shared.cursor = shared.clamp_position(pos),
                        None => {
                            shared.message(if command == Command::Undo {
                                "Already at oldest change"
                            } else {
                                "Already at newest change"
                            });
                            break;
                        }
                    }
                }
                shared.desired_column = None;
            }
            Command::RepeatLastChange => shared.repeat_request = Some(count),
            Command::Visual(mode) => {
                shared.selection = Some(Selection::new(cursor, mode));
                shared.interface.selection_changed();
                return Ok(ModeTransition::ToMode(Mode::from_selection(mode)));
            }
            Command::Reselect => {
                if let Some(mut selection) = shared.last_selection {
                    selection.anchor = shared.clamp_position(selection.anchor);
                    selection.head = shared.clamp_position(selection.head);
                    shared.cursor = selection.head;
                    shared.selection = Some(selection);
                    shared.interface.selection_changed();
                    return Ok(ModeTransition::ToMode(Mode::from_selection(selection.mode)));
                }
            }
            Command::CommandLine => {
                let text = match count {
                    Some(1) => ".".to_string(),
                    Some(n) => format!(".,.+{}", n - 1),
                    None => String::new(),
                };
                shared.command_line_request = Some(CommandLineRequest {
                    kind: CommandLineKind::Ex,
                    text,
                    operator: None,
                });
                return Ok(ModeTransition::ToMode(Mode::CommandLine));
            }
            Command::Search(direction) => {
                shared.command_line_request = Some(CommandLineRequest {
                    kind: CommandLineKind::Search(direction),
                    text: String::new(),
                    operator: None,
                });
                return Ok(ModeTransition::ToMode(Mode::CommandLine));
            }
            Command::SetMark(name) => shared.mark_manager.set(name, cursor)?,
            Command::Scroll(kind) => {
                let line = count.map(|c| c.max(1) - 1).unwrap_or(cursor.line).min(last);
                let first_non_blank = match kind {
                    ScrollKind::Top { first_non_blank }
                    | ScrollKind::Middle { first_non_blank }
                    | ScrollKind::Bottom { first_non_blank } => first_non_blank,
                };
                if first_non_blank {
                    shared.goto_line(line);
                } else {
                    shared.cursor.line = line;
                }
                match kind {
                    ScrollKind::Top { .. } => shared.interface.scroll_top(line),
                    ScrollKind::Middle { .. } => shared.interface.scroll_middle(line),
                    ScrollKind::Bottom { .. } => shared.interface.scroll_bottom(line),
                }
            }
            Command::WriteQuit | Command::QuitDiscard => {
                let line = if command == Command::WriteQuit { "x" } else { "q!" };
                if ex::execute(shared, line)? == ExOutcome::Quit {
                    return Ok(ModeTransition::Quit);
                }
            }
            Command::Page(kind) => page(shared, kind, n),
            Command::JumpOlder => {
                for _ in 0..n {
                    match shared.mark_manager.jump_back(shared.cursor) {
                        Some(pos) => shared.cursor = shared.clamp_position(pos),
                        None => break,
                    }
                }
            }
            Command::JumpNewer => {
                for _ in 0..n {
                    match shared.mark_manager.jump_forward() {
                        Some(pos) => shared.cursor = shared.clamp_position(pos),
                        None => break,
                    }
                }
            }
            Command::FileInfo => {
                let info = shared.file_info();
                shared.message(info);
            }
            Command::RepeatSubstitute => {
                ex::execute(shared, "&")?;
            }
            Command::Cancel => {}
        }
        Ok(ModeTransition::Stay)
    }
}

impl ModeController for NormalController {
    fn handle_key(&mut self, key: KeyEvent, shared: &mut SharedEditorState) -> ModeTransition {
        let parsed = match self.key_handler.parse_key(&key) {
            KeyOutcome::Pending => return ModeTransition::Stay,
            KeyOutcome::Unsupported => {
                shared.report_error(&EditorError::UnsupportedKey(key.to_string()));
                return ModeTransition::Stay;
            }
            KeyOutcome::Command(parsed) => parsed,
        };
        trace!(
            target: "editor.keys",
            command = ?parsed.command,
            count = ?parsed.count,
            "normal command"
        );
        let grouped = !matches!(parsed.command, Command::Undo | Command::Redo);
        if grouped {
            shared.begin_edit();
        }
        let result = self.execute(parsed, shared);
        let transition = match result {
            Ok(transition) => transition,
            Err(e) => {
                shared.report_error(&e);
                ModeTransition::Stay
            }
        };
        // Insert and replace sessions keep the group open until <Esc>.
        let keeps_group = matches!(
            transition,
            ModeTransition::ToMode(Mode::Insert) | ModeTransition::ToMode(Mode::Replace)
        );
        if grouped && !keeps_group {
            shared.end_edit();
        }
        transition
    }
}

fn operate(
    shared: &mut SharedEditorState,
    op: Operator,
    motion: &Motion,
    count: Option<usize>,
    register: Option<char>,
) -> Result<ModeTransition> {
    let start = shared.cursor;
    if op == Operator::Change {
        if let Motion::WordForward { big } = motion {
            let on_word = shared
                .document
                .get_line(start.line)
                .char_at(start.column)
                .is_some_and(|c| !c.is_whitespace());
            if on_word {
                let end =
                    operators::change_word_end(&shared.document, start, count.unwrap_or(1), *big);
                let bounds = SelectionBounds::Chars {
                    start,
                    end: Position::new(end.line, end.column + 1),
                };
                return operators::apply_operator(shared, op, bounds, register, 1);
            }
        }
    }
    let Some(target) = motions::resolve_motion(shared, motion, count, true)? else {
        return Ok(ModeTransition::Stay);
    };
    let bounds = operators::motion_region(&shared.document, start, target, motion);
    operators::apply_operator(shared, op, bounds, register, 1)
}

/// Positions the cursor for an insert command and records how to run the
/// session. The caller's undo group stays open for insert mode to close.
fn start_insert(shared: &mut SharedEditorState, kind: InsertKind, count: usize) {
    let cursor = shared.cursor;
    let len = shared.document.line_len(cursor.line);
    let mut open_line = false;
    match kind {
        InsertKind::Before => {}
        InsertKind::After => shared.cursor.column = (cursor.column + 1).min(len),
        InsertKind::LineStart => {
            shared.cursor.column = shared.document.get_line(cursor.line).first_non_blank()
        }
        InsertKind::LineEnd => shared.cursor.column = len,
        InsertKind::OpenBelow | InsertKind::OpenAbove => {
            let indent: String = if shared.settings.autoindent {
                shared
                    .document
                    .line_text(cursor.line)
                    .chars()
                    .take_while(|c| *c == ' ' || *c == '\t')
                    .collect()
            } else {
                String::new()
            };
            let at = if kind == InsertKind::OpenBelow {
                cursor.line + 1
            } else {
                cursor.line
            };
            shared.document.add_line(at, &indent);
            shared.cursor = Position::new(at, indent.chars().count());
            open_line = true;
        }
    }
    shared.insert_request = Some(InsertRequest { count, open_line });
}

fn page(shared: &mut SharedEditorState, kind: PageKind, count: usize) {
    let length = shared.interface.get_page_length().max(1);
    let top = shared.interface.get_page_top();
    let last = shared.last_line();
    let line = shared.cursor.line;
    let amount = match kind {
        PageKind::Down | PageKind::Up => length.saturating_sub(2).max(1) * count,
        PageKind::HalfDown | PageKind::HalfUp => (length / 2).max(1) * count,
    };
    match kind {
        PageKind::Down | PageKind::HalfDown => {
            if line == last {
                return;
            }
            shared.interface.scroll_top((top + amount).min(last));
            shared.goto_line((line + amount).min(last));
        }
        PageKind::Up | PageKind::HalfUp => {
            if line == 0 {
                return;
            }
            shared.interface.scroll_top(top.saturating_sub(amount));
            shared.goto_line(line.saturating_sub(amount));
        }
    }
}

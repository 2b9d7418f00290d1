use crate::controller::command_types::{Command, Mode, Operator};
use crate::controller::key::KeyEvent;
use crate::controller::key_handler::{KeyHandler, KeyOutcome, PendingCommand};
use crate::controller::motions;
use crate::controller::operators;
use crate::controller::shared_state::{
    CommandLineKind, CommandLineRequest, ModeController, ModeTransition, SharedEditorState,
};
use crate::document_model::{
    Position, RegisterType, SelectionBounds, SelectionMode, SpecialMark,
};
use crate::error::{EditorError, Result};
use crossterm::event::KeyCode;
use tracing::trace;

/// Visual char, line and block modes.
///
/// Motion keys go through the same parser as normal mode and move the
/// selection head; operator keys act on the selection and leave visual mode.
#[derive(Default)]
pub struct VisualController {
    key_handler: KeyHandler,
    replace_pending: bool,
}

impl VisualController {
    pub fn new() -> Self {
        Self::default()
    }

    fn mode(shared: &SharedEditorState) -> SelectionMode {
        shared
            .selection
            .map(|s| s.mode)
            .unwrap_or(SelectionMode::Char)
    }

    /// Leaves visual mode, remembering the selection for `gv` and `'<`/`'>`.
    fn exit(&mut self, shared: &mut SharedEditorState) -> ModeTransition {
        self.key_handler.reset();
        self.replace_pending = false;
        if let Some(selection) = shared.selection.take() {
            let (start, end) = selection.ordered();
            shared.mark_manager.set_special(SpecialMark::SelectionStart, start);
            shared.mark_manager.set_special(SpecialMark::SelectionEnd, end);
            shared.last_selection = Some(selection);
            shared.interface.selection_changed();
        }
        ModeTransition::ToMode(Mode::Normal)
    }

    fn bounds(shared: &SharedEditorState, linewise: bool) -> Option<SelectionBounds> {
        let selection = shared.selection?;
        if linewise {
            let (first, last) = selection.rows();
            Some(SelectionBounds::Lines { first, last })
        } else {
            Some(selection.bounds(&shared.document))
        }
    }

    fn operate(
        &mut self,
        shared: &mut SharedEditorState,
        op: Operator,
        linewise: bool,
    ) -> ModeTransition {
        let (count, register) = self.key_handler.take_prefix();
        let Some(bounds) = Self::bounds(shared, linewise) else {
            return self.exit(shared);
        };
        self.exit(shared);
        shared.begin_edit();
        let result = operators::apply_operator(shared, op, bounds, register, count.unwrap_or(1));
        finish_edit(shared, result)
    }

    fn replace_chars(&mut self, shared: &mut SharedEditorState, ch: char) -> ModeTransition {
        let Some(bounds) = Self::bounds(shared, false) else {
            return self.exit(shared);
        };
        self.exit(shared);
        shared.begin_edit();
        for (row, from, to) in operators::spans(&shared.document, bounds) {
            for column in from..to {
                shared.document.replace_char(row, column, ch);
            }
        }
        shared.cursor = match bounds {
            SelectionBounds::Chars { start, .. } => start,
            SelectionBounds::Lines { first, .. } => Position::new(first, 0),
            SelectionBounds::Block { first, left, .. } => Position::new(first, left),
        };
        shared.mark_change();
        shared.end_edit();
        ModeTransition::ToMode(Mode::Normal)
    }

    fn join(&mut self, shared: &mut SharedEditorState) -> ModeTransition {
        let Some(selection) = shared.selection else {
            return self.exit(shared);
        };
        let (first, last) = selection.rows();
        self.exit(shared);
        shared.begin_edit();
        operators::join_lines(shared, first, last - first + 1, true);
        shared.end_edit();
        ModeTransition::ToMode(Mode::Normal)
    }

    /// `p`/`P`: replaces the selection with a register.
    fn put(&mut self, shared: &mut SharedEditorState) -> Result<ModeTransition> {
        let (count, register) = self.key_handler.take_prefix();
        let contents = shared.register_manager.get(register)?;
        let Some(bounds) = Self::bounds(shared, false) else {
            return Ok(self.exit(shared));
        };
        self.exit(shared);
        shared.begin_edit();
        let deleted = operators::apply_operator(shared, Operator::Delete, bounds, None, 1);
        if let Err(e) = deleted {
            shared.end_edit();
            return Err(e);
        }
        let mut before = true;
        if let SelectionBounds::Lines { first, .. } = bounds {
            if first > shared.last_line() {
                before = false;
            } else if contents.kind != RegisterType::Line {
                shared.document.add_line(first, "");
                shared.cursor = Position::new(first, 0);
            }
        } else if contents.kind == RegisterType::Line {
            let line = shared.cursor.line;
            let column = shared.cursor.column;
            shared.document.split_line(line, column.min(shared.document.line_len(line)));
            before = false;
        }
        // The deleted text is only staged until the group closes, so the
        // register still holds what is being put.
        let result = operators::put(shared, register, before, count.unwrap_or(1));
        shared.end_edit();
        result?;
        Ok(ModeTransition::ToMode(Mode::Normal))
    }

    fn switch_mode(
        &mut self,
        shared: &mut SharedEditorState,
        mode: SelectionMode,
    ) -> ModeTransition {
        if Self::mode(shared) == mode {
            return self.exit(shared);
        }
        if let Some(selection) = shared.selection.as_mut() {
            selection.mode = mode;
        }
        shared.interface.selection_changed();
        ModeTransition::ToMode(Mode::from_selection(mode))
    }

    /// Keys that act on the selection rather than move it. Only checked while
    /// no multi-key command is half typed.
    fn handle_action(
        &mut self,
        key: &KeyEvent,
        shared: &mut SharedEditorState,
    ) -> Option<ModeTransition> {
        if key.code == KeyCode::Esc
            || key.ctrl_char() == Some('c')
            || key.ctrl_char() == Some('[')
        {
            return Some(self.exit(shared));
        }
        if key.ctrl_char() == Some('v') {
            return Some(self.switch_mode(shared, SelectionMode::Block));
        }
        if key.code == KeyCode::Delete {
            return Some(self.operate(shared, Operator::Delete, false));
        }
        let block = Self::mode(shared) == SelectionMode::Block;
        let transition = match key.plain_char()? {
            'v' => self.switch_mode(shared, SelectionMode::Char),
            'V' => self.switch_mode(shared, SelectionMode::Line),
            'o' | 'O' => {
                if let Some(selection) = shared.selection.as_mut() {
                    if key.plain_char() == Some('O') && selection.mode == SelectionMode::Block {
                        std::mem::swap(&mut selection.anchor.column, &mut selection.head.column);
                    } else {
                        std::mem::swap(&mut selection.anchor, &mut selection.head);
                    }
                    shared.cursor = selection.head;
                    shared.interface.selection_changed();
                }
                ModeTransition::Stay
            }
            'd' | 'x' => self.operate(shared, Operator::Delete, false),
            'X' | 'D' => self.operate(shared, Operator::Delete, !block),
            'c' | 's' => self.operate(shared, Operator::Change, false),
            'C' | 'S' | 'R' => self.operate(shared, Operator::Change, true),
            'y' => self.operate(shared, Operator::Yank, false),
            'Y' => self.operate(shared, Operator::Yank, !block),
            '>' => self.operate(shared, Operator::ShiftRight, true),
            '<' => self.operate(shared, Operator::ShiftLeft, true),
            '~' => self.operate(shared, Operator::ToggleCase, false),
            'u' => self.operate(shared, Operator::Lowercase, false),
            'U' => self.operate(shared, Operator::Uppercase, false),
            '!' => self.operate(shared, Operator::Filter, true),
            'J' => self.join(shared),
            'r' => {
                self.replace_pending = true;
                ModeTransition::Stay
            }
            'p' | 'P' => match self.put(shared) {
                Ok(transition) => transition,
                Err(e) => {
                    shared.report_error(&e);
                    ModeTransition::ToMode(Mode::Normal)
                }
            },
            ':' => {
                self.exit(shared);
                shared.command_line_request = Some(CommandLineRequest {
                    kind: CommandLineKind::Ex,
                    text: "'<,'>".to_string(),
                    operator: None,
                });
                ModeTransition::ToMode(Mode::CommandLine)
            }
            _ => return None,
        };
        Some(transition)
    }
}

/// Closes the operator's undo group unless it continues into insert mode.
fn finish_edit(shared: &mut SharedEditorState, result: Result<ModeTransition>) -> ModeTransition {
    match result {
        Ok(ModeTransition::ToMode(Mode::Insert)) => ModeTransition::ToMode(Mode::Insert),
        Ok(ModeTransition::ToMode(mode)) => {
            shared.end_edit();
            ModeTransition::ToMode(mode)
        }
        Ok(_) => {
            shared.end_edit();
            ModeTransition::ToMode(Mode::Normal)
        }
        Err(e) => {
            shared.end_edit();
            shared.report_error(&e);
            ModeTransition::ToMode(Mode::Normal)
        }
    }
}

impl ModeController for VisualController {
    fn handle_key(&mut self, key: KeyEvent, shared: &mut SharedEditorState) -> ModeTransition {
        trace!(target: "editor.keys", key = %key, "visual key");
        if shared.selection.is_none() {
            return self.exit(shared);
        }
        if self.replace_pending {
            self.replace_pending = false;
            return match key.text() {
                Some(ch) => self.replace_chars(shared, ch),
                None => ModeTransition::Stay,
            };
        }
        if self.key_handler.pending() == PendingCommand::Idle {
            if let Some(transition) = self.handle_action(&key, shared) {
                return transition;
            }
        }
        match self.key_handler.parse_key(&key) {
            KeyOutcome::Pending => ModeTransition::Stay,
            KeyOutcome::Command(parsed) => match parsed.command {
                Command::Move(motion) => {
                    if let Err(e) = motions::move_cursor(shared, &motion, parsed.count) {
                        shared.report_error(&e);
                    }
                    let head = shared.clamp_position(shared.cursor);
                    if let Some(selection) = shared.selection.as_mut() {
                        selection.range_select(head);
                    }
                    shared.interface.selection_changed();
                    ModeTransition::Stay
                }
                Command::Cancel => self.exit(shared),
                other => {
                    shared.report_error(&EditorError::UnsupportedKey(format!("{other:?}")));
                    ModeTransition::Stay
                }
            },
            KeyOutcome::Unsupported => {
                shared.report_error(&EditorError::UnsupportedKey(key.to_string()));
                ModeTransition::Stay
            }
        }
    }
}

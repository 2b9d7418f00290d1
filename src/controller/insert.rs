use crate::controller::command_types::Mode;
use crate::controller::key::KeyEvent;
use crate::controller::shared_state::{
    InsertRequest, ModeController, ModeTransition, SharedEditorState,
};
use crate::document_model::{Position, SpecialMark};
use crate::error::EditorError;
use crossterm::event::KeyCode;
use tracing::trace;

/// Insert and replace mode.
///
/// One session runs from entering the mode to `<Esc>` inside a single undo
/// group, so it undoes as one step. The text typed is kept so a count
/// (`3ix<Esc>`) can repeat it on exit.
pub struct InsertController {
    overwrite: bool,
    count: usize,
    open_line: bool,
    typed: String,
    /// Characters overwritten in replace mode, `None` where text was appended.
    replaced: Vec<Option<char>>,
    start: Position,
    start_tick: u64,
}

impl Default for InsertController {
    fn default() -> Self {
        Self {
            overwrite: false,
            count: 1,
            open_line: false,
            typed: String::new(),
            replaced: Vec::new(),
            start: Position::default(),
            start_tick: 0,
        }
    }
}

impl InsertController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session at the cursor. The caller has already opened the undo
    /// group the session edits into.
    pub fn begin(&mut self, shared: &mut SharedEditorState, overwrite: bool) {
        let request = shared.insert_request.take().unwrap_or(InsertRequest {
            count: 1,
            open_line: false,
        });
        self.overwrite = overwrite;
        self.count = request.count.max(1);
        self.open_line = request.open_line;
        self.typed.clear();
        self.replaced.clear();
        self.start = shared.cursor;
        self.start_tick = shared.document.change_tick();
        if !shared.document.undo_manager().in_group() {
            shared.begin_edit();
        }
    }

    fn finish(&mut self, shared: &mut SharedEditorState) -> ModeTransition {
        if !self.typed.is_empty() {
            for _ in 1..self.count {
                if self.open_line {
                    let at = shared.cursor.line + 1;
                    shared.document.add_line(at, "");
                    shared.cursor = Position::new(at, 0);
                }
                shared.cursor = shared.document.insert_text(shared.cursor, &self.typed);
            }
        }
        shared.mark_manager.set_special(SpecialMark::LastInsert, shared.cursor);
        if shared.document.change_tick() != self.start_tick {
            shared.mark_change();
        }
        shared.cursor.column = shared.cursor.column.saturating_sub(1);
        shared.end_edit();
        shared.desired_column = None;
        ModeTransition::ToMode(Mode::Normal)
    }

    fn insert_text(&mut self, shared: &mut SharedEditorState, text: &str) {
        for c in text.chars() {
            let Position { line, column } = shared.cursor;
            if self.overwrite && column < shared.document.line_len(line) {
                let old = shared.document.replace_char(line, column, c);
                self.replaced.push(Some(old));
            } else {
                shared.document.insert_chars(line, column, &c.to_string());
                if self.overwrite {
                    self.replaced.push(None);
                }
            }
            shared.cursor.column += 1;
        }
        self.typed.push_str(text);
    }

    fn newline(&mut self, shared: &mut SharedEditorState) {
        let Position { line, column } = shared.cursor;
        let indent: String = if shared.settings.autoindent {
            shared
                .document
                .get_line(line)
                .slice(0, column)
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect()
        } else {
            String::new()
        };
        shared.document.split_line(line, column);
        shared.document.insert_chars(line + 1, 0, &indent);
        shared.cursor = Position::new(line + 1, indent.chars().count());
        self.typed.push('\n');
        self.replaced.clear();
    }

    fn backspace(&mut self, shared: &mut SharedEditorState) {
        let Position { line, column } = shared.cursor;
        if column == 0 {
            if line > 0 && !self.overwrite {
                let len = shared.document.line_len(line - 1);
                shared.document.join_line(line - 1);
                shared.cursor = Position::new(line - 1, len);
                self.typed.pop();
            }
            return;
        }
        if self.overwrite {
            match self.replaced.pop() {
                Some(Some(old)) => {
                    shared.document.replace_char(line, column - 1, old);
                }
                Some(None) => {
                    shared.document.delete_chars(line, column - 1, 1);
                }
                None => {}
            }
        } else {
            shared.document.delete_chars(line, column - 1, 1);
        }
        shared.cursor.column -= 1;
        self.typed.pop();
    }

    /// `<C-w>`: the blanks before the cursor, then the word before them.
    fn delete_word_before(&mut self, shared: &mut SharedEditorState) {
        let Position { line, column } = shared.cursor;
        let chars = shared.document.get_line(line).chars();
        let mut from = column;
        while from > 0 && chars[from - 1].is_whitespace() {
            from -= 1;
        }
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        if from > 0 {
            let word = is_word(chars[from - 1]);
            while from > 0 && !chars[from - 1].is_whitespace() && is_word(chars[from - 1]) == word {
                from -= 1;
            }
        }
        if from < column {
            shared.document.delete_chars(line, from, column - from);
            shared.cursor.column = from;
            self.typed.clear();
        }
    }

    /// Moving the cursor starts a fresh stretch of typed text.
    fn move_to(&mut self, shared: &mut SharedEditorState, pos: Position) {
        shared.cursor = shared.clamp_position(pos);
        self.typed.clear();
        self.replaced.clear();
        self.count = 1;
        self.start = shared.cursor;
    }
}

impl ModeController for InsertController {
    fn handle_key(&mut self, key: KeyEvent, shared: &mut SharedEditorState) -> ModeTransition {
        trace!(target: "editor.keys", key = %key, overwrite = self.overwrite, "insert key");
        let Position { line, column } = shared.cursor;
        if let Some(c) = key.ctrl_char() {
            match c {
                '[' | 'c' => return self.finish(shared),
                'w' => self.delete_word_before(shared),
                'u' => {
                    let from = if self.start.line == line && self.start.column < column {
                        self.start.column
                    } else {
                        0
                    };
                    shared.document.delete_chars(line, from, column - from);
                    shared.cursor.column = from;
                    self.typed.clear();
                }
                'h' => self.backspace(shared),
                'j' | 'm' => self.newline(shared),
                'i' => self.insert_text(shared, "\t"),
                _ => shared.report_error(&EditorError::UnsupportedKey(key.to_string())),
            }
            return ModeTransition::Stay;
        }
        match key.code {
            KeyCode::Esc => return self.finish(shared),
            KeyCode::Enter => self.newline(shared),
            KeyCode::Backspace => self.backspace(shared),
            KeyCode::Delete => {
                if column < shared.document.line_len(line) {
                    shared.document.delete_chars(line, column, 1);
                } else if line < shared.last_line() {
                    shared.document.join_line(line);
                }
            }
            KeyCode::Tab => {
                let text = if shared.settings.expandtab {
                    let tab_stop = shared.tab_stop();
                    let at = shared.document.get_line(line).display_column(column, tab_stop);
                    " ".repeat(tab_stop - at % tab_stop)
                } else {
                    "\t".to_string()
                };
                self.insert_text(shared, &text);
            }
            KeyCode::Left => self.move_to(shared, Position::new(line, column.saturating_sub(1))),
            KeyCode::Right => self.move_to(shared, Position::new(line, column + 1)),
            KeyCode::Up => self.move_to(shared, Position::new(line.saturating_sub(1), column)),
            KeyCode::Down => self.move_to(shared, Position::new(line + 1, column)),
            KeyCode::Home => self.move_to(shared, Position::new(line, 0)),
            KeyCode::End => self.move_to(shared, Position::new(line, usize::MAX)),
            _ => match key.text() {
                Some(c) => self.insert_text(shared, &c.to_string()),
                None => shared.report_error(&EditorError::UnsupportedKey(key.to_string())),
            },
        }
        ModeTransition::Stay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::interface::{NullInterface, ShellRunner};
    use crate::document_model::Document;

    fn session(
        lines: &[&str],
        cursor: Position,
        overwrite: bool,
    ) -> (InsertController, SharedEditorState) {
        let mut shared = SharedEditorState::new(Box::new(NullInterface), Box::new(ShellRunner));
        shared.document = Document::from_lines(lines.iter().map(|s| s.to_string()).collect());
        shared.cursor = cursor;
        let mut insert = InsertController::new();
        insert.begin(&mut shared, overwrite);
        (insert, shared)
    }

    fn type_keys(
        insert: &mut InsertController,
        shared: &mut SharedEditorState,
        keys: &str,
    ) -> ModeTransition {
        let mut last = ModeTransition::Stay;
        for key in KeyEvent::parse_sequence(keys).unwrap() {
            last = insert.handle_key(key, shared);
        }
        last
    }

    #[test]
    fn test_insert_session_is_one_undo_step() {
        let (mut insert, mut shared) = session(&["ac"], Position::new(0, 1), false);
        let t = type_keys(&mut insert, &mut shared, "bb<BS><Esc>");
        assert_eq!(t, ModeTransition::ToMode(Mode::Normal));
        assert_eq!(shared.document.line_text(0), "abc");
        assert_eq!(shared.cursor, Position::new(0, 1));
        assert_eq!(shared.document.undo_manager().undo_depth(), 1);
        shared.document.undo();
        assert_eq!(shared.document.line_text(0), "ac");
    }

    #[test]
    fn test_backspace_joins_at_line_start() {
        let (mut insert, mut shared) = session(&["ab", "cd"], Position::new(1, 0), false);
        type_keys(&mut insert, &mut shared, "<BS>");
        assert_eq!(shared.document.line_text(0), "abcd");
        assert_eq!(shared.cursor, Position::new(0, 2));
    }

    #[test]
    fn test_enter_keeps_indent_with_autoindent() {
        let (mut insert, mut shared) = session(&["  ab"], Position::new(0, 3), false);
        shared.settings.autoindent = true;
        type_keys(&mut insert, &mut shared, "<CR>x");
        assert_eq!(shared.document.line_text(0), "  a");
        assert_eq!(shared.document.line_text(1), "  xb");
    }

    #[test]
    fn test_replace_backspace_restores() {
        let (mut insert, mut shared) = session(&["abc"], Position::new(0, 1), true);
        type_keys(&mut insert, &mut shared, "XYZ");
        assert_eq!(shared.document.line_text(0), "aXYZ");
        type_keys(&mut insert, &mut shared, "<BS><BS><BS>");
        assert_eq!(shared.document.line_text(0), "abc");
    }

    #[test]
    fn test_expandtab() {
        let (mut insert, mut shared) = session(&["ab"], Position::new(0, 2), false);
        shared.settings.expandtab = true;
        shared.settings.tabstop = 4;
        type_keys(&mut insert, &mut shared, "<Tab>");
        assert_eq!(shared.document.line_text(0), "ab  ");
    }

    #[test]
    fn test_count_repeats_typed_text() {
        let (mut insert, mut shared) = session(&[""], Position::new(0, 0), false);
        insert.count = 3;
        type_keys(&mut insert, &mut shared, "ab<Esc>");
        assert_eq!(shared.document.line_text(0), "ababab");
        assert_eq!(shared.cursor, Position::new(0, 5));
    }

    #[test]
    fn test_ctrl_w_and_ctrl_u() {
        let (mut insert, mut shared) = session(&["keep "], Position::new(0, 5), false);
        type_keys(&mut insert, &mut shared, "foo bar<C-w>");
        assert_eq!(shared.document.line_text(0), "keep foo ");
        type_keys(&mut insert, &mut shared, "<C-u>");
        assert_eq!(shared.document.line_text(0), "keep ");
    }
}

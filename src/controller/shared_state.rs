use crate::config::Settings;
use crate::controller::command_types::{FindKind, Mode, Operator};
use crate::controller::interface::{Interface, ProcessRunner};
use crate::controller::key::KeyEvent;
use crate::document_model::{
    Document, LineEvent, MarkManager, Position, RegisterManager, SearchDirection, SearchState,
    Selection, SpecialMark,
};
use crate::error::EditorError;
use crate::ex::{ExInput, Substitution};
use tracing::warn;

/// What the command line is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandLineKind {
    #[default]
    Ex,
    Search(SearchDirection),
    /// Text lines for `:a`, `:i` or `:c`, ended by a lone `.`.
    Input,
}

/// Pending operator for `d/pattern<CR>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperator {
    pub op: Operator,
    pub count: Option<usize>,
    pub register: Option<char>,
}

/// How to open the command line on the next transition into it.
#[derive(Debug, Clone, Default)]
pub struct CommandLineRequest {
    pub kind: CommandLineKind,
    pub text: String,
    pub operator: Option<PendingOperator>,
}

/// How to start the next insert session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertRequest {
    pub count: usize,
    /// `o`/`O`: each repetition starts a new line.
    pub open_line: bool,
}

/// Shared state that all mode controllers need access to
pub struct SharedEditorState {
    pub document: Document,
    pub cursor: Position,
    /// Display column vertical motions try to keep; `usize::MAX` after `$`.
    pub desired_column: Option<usize>,
    pub mark_manager: MarkManager,
    pub register_manager: RegisterManager,
    pub search_state: SearchState,
    pub settings: Settings,
    pub selection: Option<Selection>,
    pub last_selection: Option<Selection>,
    pub last_find: Option<(FindKind, char)>,
    pub last_substitute: Option<Substitution>,
    pub ex_input: Option<ExInput>,
    pub command_line_request: Option<CommandLineRequest>,
    pub insert_request: Option<InsertRequest>,
    /// Set by `.`; the editor replays the last change once the key is done.
    pub repeat_request: Option<Option<usize>>,
    pub output: Vec<String>,
    pub status_message: String,
    pub interface: Box<dyn Interface>,
    pub runner: Box<dyn ProcessRunner>,
    had_error: bool,
}

/// Result of handling a key event in a mode controller
#[derive(Debug, PartialEq)]
pub enum ModeTransition {
    Stay,
    ToMode(Mode),
    Quit,
}

/// Trait that all mode controllers must implement
pub trait ModeController {
    fn handle_key(&mut self, key: KeyEvent, shared: &mut SharedEditorState) -> ModeTransition;
}

impl SharedEditorState {
    pub fn new(interface: Box<dyn Interface>, runner: Box<dyn ProcessRunner>) -> Self {
        let settings = Settings {
            tabstop: interface.get_tab_stop().clamp(1, 32),
            ..Settings::default()
        };
        Self {
            document: Document::new(),
            cursor: Position::default(),
            desired_column: None,
            mark_manager: MarkManager::new(),
            register_manager: RegisterManager::new(),
            search_state: SearchState::new(),
            settings,
            selection: None,
            last_selection: None,
            last_find: None,
            last_substitute: None,
            ex_input: None,
            command_line_request: None,
            insert_request: None,
            repeat_request: None,
            output: Vec::new(),
            status_message: String::new(),
            interface,
            runner,
            had_error: false,
        }
    }

    pub fn last_line(&self) -> usize {
        self.document.line_count() - 1
    }

    /// Opens an undo group at the cursor.
    pub fn begin_edit(&mut self) {
        self.document.start_group(self.cursor);
    }

    /// Closes the group opened by `begin_edit`. Staged register text lands
    /// once the outermost group is closed.
    pub fn end_edit(&mut self) {
        self.document.end_group(self.cursor);
        if !self.document.undo_manager().in_group() {
            if let Err(e) = self.register_manager.commit() {
                self.report_error(&e);
            }
        }
    }

    /// Drains structural events from the document and keeps marks attached
    /// to their lines. The events are returned for callers tracking lines of
    /// their own.
    pub fn sync(&mut self) -> Vec<LineEvent> {
        let events = self.document.take_events();
        for event in &events {
            self.mark_manager.apply_event(*event);
        }
        events
    }

    /// Keeps the cursor inside the buffer. With `extra`, the column may sit one
    /// past the last character.
    pub fn clamp_cursor(&mut self, extra: bool) {
        let line = self.cursor.line.min(self.last_line());
        let len = self.document.line_len(line);
        let max = if extra { len } else { len.saturating_sub(1) };
        self.cursor = Position::new(line, self.cursor.column.min(max));
    }

    pub fn clamp_position(&self, pos: Position) -> Position {
        let line = pos.line.min(self.last_line());
        Position::new(line, pos.column.min(self.document.line_len(line)))
    }

    /// Moves to the first non-blank character of `line`.
    pub fn goto_line(&mut self, line: usize) {
        let line = line.min(self.last_line());
        self.cursor = crate::document_model::movement::first_non_blank(&self.document, line);
        self.desired_column = None;
    }

    pub fn mark_change(&mut self) {
        self.mark_manager.set_special(SpecialMark::LastChange, self.cursor);
    }

    pub fn message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.interface.show_message(&self.status_message);
    }

    pub fn report_error(&mut self, error: &EditorError) {
        warn!(target: "editor.keys", error = %error, "command failed");
        self.status_message = error.to_string();
        self.had_error = true;
        self.interface.show_error(&self.status_message);
    }

    /// Output from `:p`, `:n`, `:l`, `:=` and friends.
    pub fn print(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.interface.show_message(&line);
        self.output.push(line);
    }

    pub(crate) fn take_error_flag(&mut self) -> bool {
        std::mem::take(&mut self.had_error)
    }

    pub fn tab_stop(&self) -> usize {
        self.settings.tabstop
    }

    /// `"name" [Modified] N lines --P%--` for `<C-g>` and `:f`.
    pub fn file_info(&self) -> String {
        let name = self
            .document
            .filename
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "[No Name]".to_string());
        let count = self.document.line_count();
        let percent = (self.cursor.line + 1) * 100 / count;
        let modified = if self.document.is_modified() {
            " [Modified]"
        } else {
            ""
        };
        format!(
            "\"{name}\"{modified} {count} line{} --{percent}%--",
            if count == 1 { "" } else { "s" }
        )
    }
}

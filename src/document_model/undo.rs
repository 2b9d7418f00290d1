use super::document::Document;
use super::position::Position;
use tracing::trace;

/// Which way a recorded command is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Re-apply the original edit.
    Redo,
    /// Apply the inverse of the original edit.
    Undo,
}

/// One reversible edit. Each variant carries enough state to replay itself in
/// either direction; the inverse of every variant is another variant's forward
/// action (e.g. undoing `AddLine` deletes the line it added).
#[derive(Debug, Clone, PartialEq)]
pub enum UndoCommand {
    AddLine {
        at: usize,
        text: String,
    },
    DeleteLine {
        at: usize,
        text: String,
    },
    MoveLine {
        from: usize,
        to: usize,
    },
    ReplaceRange {
        line: usize,
        column: usize,
        old: String,
        new: String,
    },
    InsertChars {
        line: usize,
        column: usize,
        text: String,
    },
    ReplaceChar {
        line: usize,
        column: usize,
        old: char,
        new: char,
    },
    DeleteChars {
        line: usize,
        column: usize,
        text: String,
    },
    SplitLine {
        line: usize,
        column: usize,
    },
    JoinLine {
        line: usize,
        column: usize, // length of `line` before the join
    },
    MoveCursor {
        from: Position,
        to: Position,
    },
}

impl UndoCommand {
    /// Replays the command against `document` and reports where the cursor
    /// belongs afterwards. The caller must hold the document's undo lock so the
    /// replay is not recorded again.
    pub fn apply(&self, document: &mut Document, direction: Direction) -> Position {
        use Direction::{Redo, Undo};
        match (self, direction) {
            (UndoCommand::AddLine { at, text }, Redo) => {
                document.add_line(*at, text);
                Position::new(*at, 0)
            }
            (UndoCommand::AddLine { at, .. }, Undo) => {
                document.delete_line(*at);
                Position::new((*at).min(document.line_count() - 1), 0)
            }
            (UndoCommand::DeleteLine { at, .. }, Redo) => {
                document.delete_line(*at);
                Position::new((*at).min(document.line_count() - 1), 0)
            }
            (UndoCommand::DeleteLine { at, text }, Undo) => {
                document.add_line(*at, text);
                Position::new(*at, 0)
            }
            (UndoCommand::MoveLine { from, to }, Redo) => {
                document.move_line(*from, *to);
                Position::new(*to, 0)
            }
            (UndoCommand::MoveLine { from, to }, Undo) => {
                document.move_line(*to, *from);
                Position::new(*from, 0)
            }
            (
                UndoCommand::ReplaceRange {
                    line,
                    column,
                    old,
                    new,
                },
                dir,
            ) => {
                let (remove, insert) = if dir == Redo { (old, new) } else { (new, old) };
                let end = column + remove.chars().count();
                document.replace_chars(*line, *column, end, insert);
                Position::new(*line, *column)
            }
            (UndoCommand::InsertChars { line, column, text }, Redo)
            | (UndoCommand::DeleteChars { line, column, text }, Undo) => {
                document.insert_chars(*line, *column, text);
                Position::new(*line, *column)
            }
            (UndoCommand::InsertChars { line, column, text }, Undo)
            | (UndoCommand::DeleteChars { line, column, text }, Redo) => {
                document.delete_chars(*line, *column, text.chars().count());
                Position::new(*line, *column)
            }
            (
                UndoCommand::ReplaceChar {
                    line,
                    column,
                    old,
                    new,
                },
                dir,
            ) => {
                let ch = if dir == Redo { *new } else { *old };
                document.replace_char(*line, *column, ch);
                Position::new(*line, *column)
            }
            (UndoCommand::SplitLine { line, column }, Redo)
            | (UndoCommand::JoinLine { line, column }, Undo) => {
                document.split_line(*line, *column);
                Position::new(*line, *column)
            }
            (UndoCommand::SplitLine { line, column }, Undo)
            | (UndoCommand::JoinLine { line, column }, Redo) => {
                document.join_line(*line);
                Position::new(*line, *column)
            }
            (UndoCommand::MoveCursor { from, .. }, Undo) => *from,
            (UndoCommand::MoveCursor { to, .. }, Redo) => *to,
        }
    }

    fn is_cursor_move(&self) -> bool {
        matches!(self, UndoCommand::MoveCursor { .. })
    }
}

/// Lifecycle of a recorded group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Unexecuted,
    Applied,
    Undone,
}

/// Commands that undo and redo as a single step.
#[derive(Debug, Clone)]
pub struct UndoGroup {
    commands: Vec<UndoCommand>,
    state: GroupState,
}

impl UndoGroup {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
            state: GroupState::Unexecuted,
        }
    }

    pub fn commands(&self) -> &[UndoCommand] {
        &self.commands
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    fn has_edits(&self) -> bool {
        self.commands.iter().any(|c| !c.is_cursor_move())
    }

    /// Replays every command in the order the direction requires. A recorded
    /// cursor move decides the final cursor; otherwise the last edit touched
    /// does.
    pub(crate) fn replay(&mut self, document: &mut Document, direction: Direction) -> Position {
        let mut explicit = None;
        let mut implicit = Position::default();
        let mut step = |cmd: &UndoCommand| {
            let pos = cmd.apply(document, direction);
            if cmd.is_cursor_move() {
                explicit = Some(pos);
            } else {
                implicit = pos;
            }
        };
        match direction {
            Direction::Undo => self.commands.iter().rev().for_each(&mut step),
            Direction::Redo => self.commands.iter().for_each(&mut step),
        }
        self.state = match direction {
            Direction::Undo => GroupState::Undone,
            Direction::Redo => GroupState::Applied,
        };
        explicit.unwrap_or(implicit)
    }
}

/// Owns the undo and redo stacks.
///
/// Groups nest: only the outermost `start_group`/`end_group` pair opens and
/// closes a transaction. A command added while no group is open becomes a
/// group of its own.
#[derive(Debug, Clone)]
pub struct UndoManager {
    undo_stack: Vec<UndoGroup>,
    redo_stack: Vec<UndoGroup>,
    current_group: Option<UndoGroup>,
    group_cursor: Position,
    depth: usize,
    max_undo_levels: usize,
}

impl UndoManager {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            current_group: None,
            group_cursor: Position::default(),
            depth: 0,
            max_undo_levels: 1000,
        }
    }

    pub fn start_group(&mut self, cursor: Position) {
        self.depth += 1;
        if self.depth == 1 {
            self.current_group = Some(UndoGroup::new());
            self.group_cursor = cursor;
            trace!(target: "editor.undo", line = cursor.line, column = cursor.column, "group_open");
        }
    }

    pub fn end_group(&mut self, cursor: Position) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth > 0 {
            return;
        }
        if let Some(mut group) = self.current_group.take() {
            if group.has_edits() {
                group.commands.push(UndoCommand::MoveCursor {
                    from: self.group_cursor,
                    to: cursor,
                });
                group.state = GroupState::Applied;
                self.push_undo_group(group);
            }
        }
        trace!(target: "editor.undo", undo_depth = self.undo_stack.len(), "group_close");
    }

    pub fn in_group(&self) -> bool {
        self.depth > 0
    }

    pub fn add(&mut self, command: UndoCommand) {
        match self.current_group.as_mut() {
            Some(group) => group.commands.push(command),
            None => {
                let mut group = UndoGroup::new();
                group.commands.push(command);
                group.state = GroupState::Applied;
                self.push_undo_group(group);
            }
        }
        self.redo_stack.clear();
    }

    fn push_undo_group(&mut self, group: UndoGroup) {
        self.undo_stack.push(group);
        if self.undo_stack.len() > self.max_undo_levels {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Closes any open group, then hands out the most recent group to undo.
    pub(crate) fn take_undo(&mut self) -> Option<UndoGroup> {
        if self.depth > 0 {
            self.depth = 1;
            self.end_group(self.group_cursor);
        }
        self.undo_stack.pop()
    }

    pub(crate) fn take_redo(&mut self) -> Option<UndoGroup> {
        self.redo_stack.pop()
    }

    pub(crate) fn push_undone(&mut self, group: UndoGroup) {
        self.redo_stack.push(group);
    }

    pub(crate) fn push_redone(&mut self, group: UndoGroup) {
        self.undo_stack.push(group);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_group = None;
        self.depth = 0;
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

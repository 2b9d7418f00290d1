use super::document::LineEvent;
use super::position::Position;
use crate::error::{EditorError, Result};
use std::collections::BTreeMap;

const MAX_JUMP_LIST_SIZE: usize = 100;

/// Marks the editor sets itself. Their names are always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialMark {
    /// `.`: where the last change happened.
    LastChange,
    /// `^`: where insert mode was left.
    LastInsert,
    /// `<`: start of the last visual selection.
    SelectionStart,
    /// `>`: end of the last visual selection.
    SelectionEnd,
}

impl SpecialMark {
    pub fn name(self) -> char {
        match self {
            SpecialMark::LastChange => '.',
            SpecialMark::LastInsert => '^',
            SpecialMark::SelectionStart => '<',
            SpecialMark::SelectionEnd => '>',
        }
    }
}

/// Named positions plus the `<C-o>`/`<C-i>` jump list.
///
/// Marks follow the text they were set on: inserting or deleting lines above
/// a mark shifts it, a moved line carries its marks, and deleting a marked
/// line clears the mark.
#[derive(Debug, Clone, Default)]
pub struct MarkManager {
    marks: BTreeMap<char, Position>,
    jump_list: Vec<Position>,
    jump_position: usize,
}

impl MarkManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn canonical(name: char) -> char {
        if name == '`' { '\'' } else { name }
    }

    pub fn is_valid_name(name: char) -> bool {
        name.is_ascii_alphabetic() || matches!(name, '\'' | '`' | '.' | '^' | '<' | '>')
    }

    pub fn set(&mut self, name: char, pos: Position) -> Result<()> {
        if !Self::is_valid_name(name) {
            return Err(EditorError::InvalidMark(name));
        }
        self.marks.insert(Self::canonical(name), pos);
        Ok(())
    }

    pub fn set_special(&mut self, mark: SpecialMark, pos: Position) {
        self.marks.insert(mark.name(), pos);
    }

    pub fn get(&self, name: char) -> Result<Position> {
        if !Self::is_valid_name(name) {
            return Err(EditorError::InvalidMark(name));
        }
        self.marks
            .get(&Self::canonical(name))
            .copied()
            .ok_or(EditorError::MarkNotSet(name))
    }

    pub fn remove(&mut self, name: char) {
        self.marks.remove(&Self::canonical(name));
    }

    pub fn list(&self) -> impl Iterator<Item = (char, Position)> + '_ {
        self.marks.iter().map(|(c, p)| (*c, *p))
    }

    /// Keeps marks and jumps attached to their text after a structural edit.
    pub fn apply_event(&mut self, event: LineEvent) {
        if event == LineEvent::Reset {
            self.marks.clear();
            self.jump_list.clear();
            self.jump_position = 0;
            return;
        }
        self.marks.retain(|_, pos| adjust(pos, event));
        self.jump_list.retain_mut(|pos| adjust(pos, event));
        self.jump_position = self.jump_position.min(self.jump_list.len());
    }

    /// Records the position a significant jump starts from.
    pub fn push_jump(&mut self, pos: Position) {
        self.jump_list.truncate(self.jump_position);
        if self.jump_list.last() != Some(&pos) {
            self.jump_list.push(pos);
        }
        if self.jump_list.len() > MAX_JUMP_LIST_SIZE {
            self.jump_list.remove(0);
        }
        self.jump_position = self.jump_list.len();
        self.marks.insert('\'', pos);
    }

    /// Steps back through the jump list (`<C-o>`). `current` is remembered so
    /// `<C-i>` can return to it.
    pub fn jump_back(&mut self, current: Position) -> Option<Position> {
        if self.jump_position == self.jump_list.len() {
            if self.jump_list.last() != Some(&current) {
                self.jump_list.push(current);
            }
            self.jump_position = self.jump_list.len() - 1;
        }
        if self.jump_position == 0 {
            return None;
        }
        self.jump_position -= 1;
        self.jump_list.get(self.jump_position).copied()
    }

    pub fn jump_forward(&mut self) -> Option<Position> {
        if self.jump_position + 1 < self.jump_list.len() {
            self.jump_position += 1;
            self.jump_list.get(self.jump_position).copied()
        } else {
            None
        }
    }
}

/// Returns false when the position's line no longer exists.
pub(crate) fn adjust(pos: &mut Position, event: LineEvent) -> bool {
    match event {
        LineEvent::Inserted { at } => {
            if pos.line >= at {
                pos.line += 1;
            }
        }
        LineEvent::Deleted { at } => {
            if pos.line == at {
                return false;
            }
            if pos.line > at {
                pos.line -= 1;
            }
        }
        LineEvent::Moved { from, to } => {
            if pos.line == from {
                pos.line = to;
            } else if from < to && pos.line > from && pos.line <= to {
                pos.line -= 1;
            } else if from > to && pos.line >= to && pos.line < from {
                pos.line += 1;
            }
        }
        LineEvent::Joined { at, column } => {
            if pos.line == at + 1 {
                pos.line = at;
                pos.column += column;
            } else if pos.line > at + 1 {
                pos.line -= 1;
            }
        }
        LineEvent::Reset => return false,
    }
    true
}

use super::document::Document;
use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Char,
    Line,
    Block,
}

/// A visual selection. `anchor` stays where visual mode started; `head`
/// follows the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
    pub mode: SelectionMode,
}

/// A selection resolved against the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionBounds {
    /// `end` is exclusive.
    Chars { start: Position, end: Position },
    Lines { first: usize, last: usize },
    /// Inclusive columns on every row in `first..=last`.
    Block {
        first: usize,
        last: usize,
        left: usize,
        right: usize,
    },
}

impl Selection {
    pub fn new(anchor: Position, mode: SelectionMode) -> Self {
        Self {
            anchor,
            head: anchor,
            mode,
        }
    }

    pub fn range_select(&mut self, head: Position) {
        self.head = head;
    }

    /// Anchor and head in document order.
    pub fn ordered(&self) -> (Position, Position) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }

    /// Normalizes the selection for an operator: exact characters (the head
    /// character included), whole lines, or a rectangle.
    pub fn bounds(&self, doc: &Document) -> SelectionBounds {
        let (start, end) = self.ordered();
        match self.mode {
            SelectionMode::Char => {
                let len = doc.line_len(end.line);
                let end = if end.column < len {
                    Position::new(end.line, end.column + 1)
                } else if end.line + 1 < doc.line_count() {
                    Position::new(end.line + 1, 0)
                } else {
                    Position::new(end.line, len)
                };
                let start = Position::new(start.line, start.column.min(doc.line_len(start.line)));
                SelectionBounds::Chars { start, end }
            }
            SelectionMode::Line => SelectionBounds::Lines {
                first: start.line,
                last: end.line,
            },
            SelectionMode::Block => SelectionBounds::Block {
                first: start.line,
                last: end.line,
                left: self.anchor.column.min(self.head.column),
                right: self.anchor.column.max(self.head.column),
            },
        }
    }

    /// First and last rows covered.
    pub fn rows(&self) -> (usize, usize) {
        let (start, end) = self.ordered();
        (start.line, end.line)
    }
}

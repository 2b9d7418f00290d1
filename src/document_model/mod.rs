//! Buffer, history and the stores that hang off it.
//!
//! Everything in here is host-independent: no keys, no modes, no callbacks.

pub mod document;
pub mod line;
pub mod marks;
pub mod movement;
pub mod position;
pub mod registers;
pub mod search_state;
pub mod selection;
pub mod syntax;
pub mod undo;

pub use document::{Document, LineEnding, LineEvent};
pub use line::Line;
pub use marks::{MarkManager, SpecialMark};
pub use movement::SearchMatch;
pub use position::{Position, Range};
pub use registers::{Register, RegisterAction, RegisterManager, RegisterType};
pub use search_state::{SearchDirection, SearchHit, SearchState};
pub use selection::{Selection, SelectionBounds, SelectionMode};
pub use syntax::{SyntaxHighlighter, TokenKind, TokenSink};
pub use undo::{Direction, UndoCommand, UndoManager};

//! An embeddable vi/ex editing engine.
//!
//! The engine owns a buffer and its history, and interprets vi keystrokes
//! and ex command lines against it. Hosts do the drawing: they feed keys to
//! an [`Editor`] and receive callbacks through the [`Interface`] trait.
//!
//! ```
//! use vi_engine::Editor;
//!
//! let mut editor = Editor::new();
//! editor.process_keys("ihello world<Esc>0dw");
//! assert_eq!(editor.lines(), ["world"]);
//! ```

pub mod config;
pub mod controller;
pub mod document_model;
pub mod error;
pub mod ex;

pub use config::{RcLoader, Settings};
pub use controller::{
    Editor, Interface, KeyEvent, Mode, NullInterface, ProcessRunner, ShellRunner,
};
pub use document_model::{Document, Position, SyntaxHighlighter, TokenKind, TokenSink};
pub use error::{EditorError, Result};

/// Controller subsystem - Handles all user input and command execution
///
/// This module contains the mode-specific controllers, the key parser and the
/// `Editor` facade hosts talk to.
pub mod command;
pub mod command_types;
pub mod editor;
pub mod insert;
pub mod interface;
pub mod key;
pub mod key_handler;
pub mod motions;
pub mod normal;
pub mod operators;
pub mod shared_state;
pub mod visual;

// Re-export public interface
pub use command_types::Mode;
pub use editor::Editor;
pub use interface::{Interface, NullInterface, ProcessRunner, ShellRunner};
pub use key::KeyEvent;
pub use shared_state::SharedEditorState;

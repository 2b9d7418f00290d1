use std::path::PathBuf;
use thiserror::Error;

/// Recoverable failures surfaced at the editor boundary.
///
/// Nothing here ever crosses `Editor::process_key` or `Editor::run_ex_command`
/// as a panic; the editor turns each variant into a message on the host's
/// error channel.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Invalid range")]
    InvalidRange,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unterminated pattern: missing closing '{0}'")]
    UnterminatedPattern(char),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Mark not set: {0}")]
    MarkNotSet(char),

    #[error("Invalid mark name: {0}")]
    InvalidMark(char),

    #[error("Invalid register name: {0}")]
    InvalidRegister(char),

    #[error("No previous regular expression")]
    NoPreviousPattern,

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("No previous substitute")]
    NoPreviousSubstitute,

    #[error("Not an editor command: {0}")]
    UnknownCommand(String),

    #[error("Trailing characters: {0}")]
    TrailingCharacters(String),

    #[error("Destination is inside the source range")]
    MoveIntoRange,

    #[error("No file name")]
    NoFileName,

    #[error("\"{}\" is not a regular file", .0.display())]
    NotRegularFile(PathBuf),

    #[error("Can't open file \"{}\"", .0.display())]
    FileNotFound(PathBuf),

    #[error("No write since last change (add ! to override)")]
    Modified,

    #[error("Command failed: {0}")]
    ExternalCommand(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Invalid argument: {0}")]
    InvalidOptionValue(String),

    #[error("Nothing in register {0}")]
    EmptyRegister(char),

    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;

impl From<regex::Error> for EditorError {
    fn from(e: regex::Error) -> Self {
        EditorError::InvalidPattern(e.to_string())
    }
}

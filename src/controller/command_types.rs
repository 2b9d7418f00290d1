use crate::document_model::{SearchDirection, SelectionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Replace, // Insert with overwrite
    VisualChar,
    VisualLine,
    VisualBlock,
    CommandLine,
}

impl Mode {
    pub fn is_visual(&self) -> bool {
        self.selection_mode().is_some()
    }

    pub fn selection_mode(&self) -> Option<SelectionMode> {
        match self {
            Mode::VisualChar => Some(SelectionMode::Char),
            Mode::VisualLine => Some(SelectionMode::Line),
            Mode::VisualBlock => Some(SelectionMode::Block),
            _ => None,
        }
    }

    pub fn from_selection(mode: SelectionMode) -> Self {
        match mode {
            SelectionMode::Char => Mode::VisualChar,
            SelectionMode::Line => Mode::VisualLine,
            SelectionMode::Block => Mode::VisualBlock,
        }
    }

    /// Whether the cursor may sit one past the last character.
    pub fn allows_extra_line_char(&self) -> bool {
        !matches!(self, Mode::Normal | Mode::CommandLine)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Replace => "REPLACE",
            Mode::VisualChar => "VISUAL",
            Mode::VisualLine => "VISUAL LINE",
            Mode::VisualBlock => "VISUAL BLOCK",
            Mode::CommandLine => "COMMAND",
        }
    }
}

/// Commands that act on the text a motion or selection covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Delete,
    Change,
    Yank,
    ShiftLeft,
    ShiftRight,
    Filter,
    ToggleCase,
    Lowercase,
    Uppercase,
}

impl Operator {
    /// The key that, typed again, applies the operator to whole lines.
    pub fn line_key(&self) -> char {
        match self {
            Operator::Delete => 'd',
            Operator::Change => 'c',
            Operator::Yank => 'y',
            Operator::ShiftLeft => '<',
            Operator::ShiftRight => '>',
            Operator::Filter => '!',
            Operator::ToggleCase => '~',
            Operator::Lowercase => 'u',
            Operator::Uppercase => 'U',
        }
    }

    pub fn modifies(&self) -> bool {
        *self != Operator::Yank
    }
}

/// `f`, `t`, `F` and `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindKind {
    To,
    Till,
    ToBackward,
    TillBackward,
}

impl FindKind {
    pub fn reversed(&self) -> Self {
        match self {
            FindKind::To => FindKind::ToBackward,
            FindKind::Till => FindKind::TillBackward,
            FindKind::ToBackward => FindKind::To,
            FindKind::TillBackward => FindKind::Till,
        }
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, FindKind::To | FindKind::Till)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    WordForward { big: bool },
    WordBackward { big: bool },
    WordEnd { big: bool },
    LineStart,
    FirstNonBlank,
    LineEnd,
    Column,
    NextLineStart,
    PrevLineStart,
    CurrentLine,
    GotoLine,
    FileStart,
    SentenceForward,
    SentenceBackward,
    ParagraphForward,
    ParagraphBackward,
    SectionForward,
    SectionBackward,
    FindChar { kind: FindKind, ch: char },
    RepeatFind,
    RepeatFindReverse,
    SearchNext,
    SearchPrev,
    SearchWord { direction: SearchDirection },
    Search { direction: SearchDirection, pattern: String },
    MatchBracket,
    ScreenTop,
    ScreenMiddle,
    ScreenBottom,
    Mark(char),
    MarkLine(char),
}

impl Motion {
    pub fn is_linewise(&self) -> bool {
        matches!(
            self,
            Motion::Up
                | Motion::Down
                | Motion::NextLineStart
                | Motion::PrevLineStart
                | Motion::CurrentLine
                | Motion::GotoLine
                | Motion::FileStart
                | Motion::ScreenTop
                | Motion::ScreenMiddle
                | Motion::ScreenBottom
                | Motion::MarkLine(_)
        )
    }

    /// Inclusive motions cover the character they land on.
    pub fn is_inclusive(&self) -> bool {
        matches!(
            self,
            Motion::WordEnd { .. } | Motion::LineEnd | Motion::MatchBracket
        ) || matches!(self, Motion::FindChar { kind, .. } if kind.is_forward())
    }

    /// Jumps are recorded in the jump list.
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Motion::GotoLine
                | Motion::FileStart
                | Motion::SentenceForward
                | Motion::SentenceBackward
                | Motion::ParagraphForward
                | Motion::ParagraphBackward
                | Motion::SectionForward
                | Motion::SectionBackward
                | Motion::SearchNext
                | Motion::SearchPrev
                | Motion::SearchWord { .. }
                | Motion::Search { .. }
                | Motion::MatchBracket
                | Motion::ScreenTop
                | Motion::ScreenMiddle
                | Motion::ScreenBottom
                | Motion::Mark(_)
                | Motion::MarkLine(_)
        )
    }

    /// Vertical motions keep the remembered display column.
    pub fn keeps_column(&self) -> bool {
        matches!(self, Motion::Up | Motion::Down)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertKind {
    Before,        // i
    After,         // a
    LineStart,     // I
    LineEnd,       // A
    OpenBelow,     // o
    OpenAbove,     // O
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollKind {
    Top { first_non_blank: bool },
    Middle { first_non_blank: bool },
    Bottom { first_non_blank: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Down,
    Up,
    HalfDown,
    HalfUp,
}

/// A fully parsed normal-mode command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(Motion),
    Operate { op: Operator, motion: Motion },
    OperateLines(Operator),
    OperatorSearch { op: Operator, direction: SearchDirection },
    DeleteChar,       // x
    DeleteCharBefore, // X
    DeleteToEnd,      // D
    ChangeToEnd,      // C
    SubstituteChar,   // s
    SubstituteLine,   // S
    YankLine,         // Y
    Put { before: bool },
    Join { spaces: bool },
    ToggleCaseChar,
    ReplaceChar(char),
    EnterReplace,
    Insert(InsertKind),
    Undo,
    Redo,
    RepeatLastChange,
    Visual(crate::document_model::SelectionMode),
    Reselect,
    CommandLine,
    Search(SearchDirection),
    SetMark(char),
    Scroll(ScrollKind),
    WriteQuit,
    QuitDiscard,
    Page(PageKind),
    JumpOlder,
    JumpNewer,
    FileInfo,
    RepeatSubstitute,
    Cancel,
}

impl Command {
    /// Commands whose keys are never recorded for `.`.
    pub fn is_repeatable(&self) -> bool {
        !matches!(
            self,
            Command::Undo
                | Command::Redo
                | Command::RepeatLastChange
                | Command::CommandLine
                | Command::Search(_)
                | Command::Move(_)
                | Command::Cancel
        )
    }
}

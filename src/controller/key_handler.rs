use crate::controller::command_types::{
    Command, FindKind, InsertKind, Motion, Operator, PageKind, ScrollKind,
};
use crate::controller::key::KeyEvent;
use crate::document_model::{RegisterManager, SearchDirection, SelectionMode};
use crossterm::event::KeyCode;

/// Which single-character argument a command is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharArg {
    Find(FindKind),
    Replace,
    SetMark,
    Mark,
    MarkLine,
}

/// Where a multi-key normal-mode command stands between keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingCommand {
    #[default]
    Idle,
    /// After `"`, waiting for the register name.
    Register,
    /// After an operator, waiting for its motion.
    Operator(Operator),
    /// After `g`, `z`, `Z`, `[` or `]`.
    Prefix(char, Option<Operator>),
    CharArg(CharArg, Option<Operator>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: Command,
    pub count: Option<usize>,
    pub register: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Pending,
    Command(ParsedCommand),
    Unsupported,
}

enum Step {
    Wait(PendingCommand),
    Done(Command),
    Invalid,
}

/// Turns normal-mode keystrokes into commands.
///
/// Counts typed before an operator and before its motion multiply (`2d3w`
/// deletes six words). Everything resets once a command resolves or a key is
/// rejected.
#[derive(Debug, Default)]
pub struct KeyHandler {
    pending: PendingCommand,
    count: Option<usize>,
    operator_count: Option<usize>,
    register: Option<char>,
}

impl KeyHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> PendingCommand {
        self.pending
    }

    pub fn is_idle(&self) -> bool {
        self.pending == PendingCommand::Idle
            && self.count.is_none()
            && self.operator_count.is_none()
            && self.register.is_none()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Count and register typed so far, clearing both.
    pub fn take_prefix(&mut self) -> (Option<usize>, Option<char>) {
        let prefix = (self.count.take(), self.register.take());
        self.reset();
        prefix
    }

    pub fn parse_key(&mut self, key: &KeyEvent) -> KeyOutcome {
        let pending = std::mem::take(&mut self.pending);
        if matches!(pending, PendingCommand::Idle | PendingCommand::Operator(_)) {
            if let Some(d) = key.plain_char().and_then(|c| c.to_digit(10)) {
                if d != 0 || self.count.is_some() {
                    let count = self
                        .count
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(d as usize);
                    self.count = Some(count.min(999_999));
                    self.pending = pending;
                    return KeyOutcome::Pending;
                }
            }
        }
        let step = match pending {
            PendingCommand::Idle => self.parse_idle(key),
            PendingCommand::Register => self.parse_register(key),
            PendingCommand::Operator(op) => self.parse_after_operator(op, key),
            PendingCommand::Prefix(prefix, op) => self.parse_prefix(prefix, op, key),
            PendingCommand::CharArg(arg, op) => Self::parse_char_arg(arg, op, key),
        };
        match step {
            Step::Wait(next) => {
                self.pending = next;
                KeyOutcome::Pending
            }
            Step::Done(command) => KeyOutcome::Command(self.finish(command)),
            Step::Invalid => {
                self.reset();
                KeyOutcome::Unsupported
            }
        }
    }

    fn finish(&mut self, command: Command) -> ParsedCommand {
        let count = match (self.operator_count, self.count) {
            (Some(a), Some(b)) => Some(a.saturating_mul(b)),
            (a, b) => a.or(b),
        };
        let register = self.register;
        self.reset();
        ParsedCommand {
            command,
            count,
            register,
        }
    }

    fn begin_operator(&mut self, op: Operator) -> Step {
        self.operator_count = self.count.take();
        Step::Wait(PendingCommand::Operator(op))
    }

    fn parse_idle(&mut self, key: &KeyEvent) -> Step {
        if let Some(c) = key.ctrl_char() {
            return match c {
                'r' => Step::Done(Command::Redo),
                'v' => Step::Done(Command::Visual(SelectionMode::Block)),
                'f' => Step::Done(Command::Page(PageKind::Down)),
                'b' => Step::Done(Command::Page(PageKind::Up)),
                'd' => Step::Done(Command::Page(PageKind::HalfDown)),
                'u' => Step::Done(Command::Page(PageKind::HalfUp)),
                'o' => Step::Done(Command::JumpOlder),
                'i' => Step::Done(Command::JumpNewer),
                'g' => Step::Done(Command::FileInfo),
                'n' | 'j' => Step::Done(Command::Move(Motion::Down)),
                'p' => Step::Done(Command::Move(Motion::Up)),
                'h' => Step::Done(Command::Move(Motion::Left)),
                'm' => Step::Done(Command::Move(Motion::NextLineStart)),
                '[' | 'c' => Step::Done(Command::Cancel),
                _ => Step::Invalid,
            };
        }
        match key.code {
            KeyCode::Esc => Step::Done(Command::Cancel),
            KeyCode::Tab => Step::Done(Command::JumpNewer),
            KeyCode::PageDown => Step::Done(Command::Page(PageKind::Down)),
            KeyCode::PageUp => Step::Done(Command::Page(PageKind::Up)),
            KeyCode::Delete => Step::Done(Command::DeleteChar),
            KeyCode::Insert => Step::Done(Command::Insert(InsertKind::Before)),
            KeyCode::Char(c) if key.modifiers.is_empty() => self.parse_idle_char(c),
            _ => match Self::code_motion(key) {
                Some(motion) => Step::Done(Command::Move(motion)),
                None => Step::Invalid,
            },
        }
    }

    fn parse_idle_char(&mut self, c: char) -> Step {
        if let Some(step) = Self::motion_step(c, None) {
            return step;
        }
        let command = match c {
            '"' => return Step::Wait(PendingCommand::Register),
            'd' => return self.begin_operator(Operator::Delete),
            'c' => return self.begin_operator(Operator::Change),
            'y' => return self.begin_operator(Operator::Yank),
            '<' => return self.begin_operator(Operator::ShiftLeft),
            '>' => return self.begin_operator(Operator::ShiftRight),
            '!' => return self.begin_operator(Operator::Filter),
            'g' | 'z' | 'Z' => return Step::Wait(PendingCommand::Prefix(c, None)),
            'r' => return Step::Wait(PendingCommand::CharArg(CharArg::Replace, None)),
            'm' => return Step::Wait(PendingCommand::CharArg(CharArg::SetMark, None)),
            'x' => Command::DeleteChar,
            'X' => Command::DeleteCharBefore,
            'D' => Command::DeleteToEnd,
            'C' => Command::ChangeToEnd,
            's' => Command::SubstituteChar,
            'S' => Command::SubstituteLine,
            'Y' => Command::YankLine,
            'p' => Command::Put { before: false },
            'P' => Command::Put { before: true },
            'J' => Command::Join { spaces: true },
            '~' => Command::ToggleCaseChar,
            'R' => Command::EnterReplace,
            'i' => Command::Insert(InsertKind::Before),
            'a' => Command::Insert(InsertKind::After),
            'I' => Command::Insert(InsertKind::LineStart),
            'A' => Command::Insert(InsertKind::LineEnd),
            'o' => Command::Insert(InsertKind::OpenBelow),
            'O' => Command::Insert(InsertKind::OpenAbove),
            'u' => Command::Undo,
            '.' => Command::RepeatLastChange,
            'v' => Command::Visual(SelectionMode::Char),
            'V' => Command::Visual(SelectionMode::Line),
            ':' => Command::CommandLine,
            '/' => Command::Search(SearchDirection::Forward),
            '?' => Command::Search(SearchDirection::Backward),
            '&' => Command::RepeatSubstitute,
            _ => return Step::Invalid,
        };
        Step::Done(command)
    }

    fn parse_register(&mut self, key: &KeyEvent) -> Step {
        match key.plain_char() {
            Some(c) if RegisterManager::is_valid_name(c) => {
                self.register = Some(c);
                Step::Wait(PendingCommand::Idle)
            }
            _ => Step::Invalid,
        }
    }

    fn parse_after_operator(&mut self, op: Operator, key: &KeyEvent) -> Step {
        if key.code == KeyCode::Esc {
            return Step::Done(Command::Cancel);
        }
        let Some(c) = key.plain_char() else {
            return match Self::code_motion(key) {
                Some(motion) => Step::Done(Command::Operate { op, motion }),
                None => Step::Invalid,
            };
        };
        if c == op.line_key() {
            return Step::Done(Command::OperateLines(op));
        }
        match c {
            '/' => Step::Done(Command::OperatorSearch {
                op,
                direction: SearchDirection::Forward,
            }),
            '?' => Step::Done(Command::OperatorSearch {
                op,
                direction: SearchDirection::Backward,
            }),
            'g' => Step::Wait(PendingCommand::Prefix('g', Some(op))),
            _ => Self::motion_step(c, Some(op)).unwrap_or(Step::Invalid),
        }
    }

    fn parse_prefix(&mut self, prefix: char, op: Option<Operator>, key: &KeyEvent) -> Step {
        let with_motion = |motion: Motion| match op {
            Some(op) => Step::Done(Command::Operate { op, motion }),
            None => Step::Done(Command::Move(motion)),
        };
        if key.code == KeyCode::Enter && prefix == 'z' {
            return Step::Done(Command::Scroll(ScrollKind::Top {
                first_non_blank: true,
            }));
        }
        let Some(c) = key.plain_char() else {
            return Step::Invalid;
        };
        match (prefix, c, op) {
            ('g', 'g', _) => with_motion(Motion::FileStart),
            ('g', 'v', None) => Step::Done(Command::Reselect),
            ('g', 'J', None) => Step::Done(Command::Join { spaces: false }),
            ('g', '~', None) => self.begin_operator(Operator::ToggleCase),
            ('g', 'u', None) => self.begin_operator(Operator::Lowercase),
            ('g', 'U', None) => self.begin_operator(Operator::Uppercase),
            ('g', c, Some(op)) if c == op.line_key() => Step::Done(Command::OperateLines(op)),
            ('[', '[', _) => with_motion(Motion::SectionBackward),
            (']', ']', _) => with_motion(Motion::SectionForward),
            ('z', c, None) => {
                let kind = match c {
                    't' => ScrollKind::Top {
                        first_non_blank: false,
                    },
                    '.' => ScrollKind::Middle {
                        first_non_blank: true,
                    },
                    'z' => ScrollKind::Middle {
                        first_non_blank: false,
                    },
                    '-' => ScrollKind::Bottom {
                        first_non_blank: true,
                    },
                    'b' => ScrollKind::Bottom {
                        first_non_blank: false,
                    },
                    _ => return Step::Invalid,
                };
                Step::Done(Command::Scroll(kind))
            }
            ('Z', 'Z', None) => Step::Done(Command::WriteQuit),
            ('Z', 'Q', None) => Step::Done(Command::QuitDiscard),
            _ => Step::Invalid,
        }
    }

    fn parse_char_arg(arg: CharArg, op: Option<Operator>, key: &KeyEvent) -> Step {
        if key.code == KeyCode::Esc {
            return Step::Done(Command::Cancel);
        }
        let ch = match (key.text(), key.code, arg) {
            (Some(ch), _, _) => ch,
            (None, KeyCode::Enter, CharArg::Replace) => '\n',
            _ => return Step::Invalid,
        };
        let motion = match arg {
            CharArg::Find(kind) => Motion::FindChar { kind, ch },
            CharArg::Mark => Motion::Mark(ch),
            CharArg::MarkLine => Motion::MarkLine(ch),
            CharArg::Replace => return Step::Done(Command::ReplaceChar(ch)),
            CharArg::SetMark => return Step::Done(Command::SetMark(ch)),
        };
        Step::Done(match op {
            Some(op) => Command::Operate { op, motion },
            None => Command::Move(motion),
        })
    }

    /// Motions bound to non-character keys.
    fn code_motion(key: &KeyEvent) -> Option<Motion> {
        if !key.modifiers.is_empty() {
            return None;
        }
        Some(match key.code {
            KeyCode::Left | KeyCode::Backspace => Motion::Left,
            KeyCode::Right => Motion::Right,
            KeyCode::Up => Motion::Up,
            KeyCode::Down => Motion::Down,
            KeyCode::Home => Motion::LineStart,
            KeyCode::End => Motion::LineEnd,
            KeyCode::Enter => Motion::NextLineStart,
            _ => return None,
        })
    }

    /// A motion key, or the first key of a multi-key motion.
    fn motion_step(c: char, op: Option<Operator>) -> Option<Step> {
        let motion = match c {
            'h' => Motion::Left,
            'l' | ' ' => Motion::Right,
            'j' => Motion::Down,
            'k' => Motion::Up,
            'w' => Motion::WordForward { big: false },
            'W' => Motion::WordForward { big: true },
            'b' => Motion::WordBackward { big: false },
            'B' => Motion::WordBackward { big: true },
            'e' => Motion::WordEnd { big: false },
            'E' => Motion::WordEnd { big: true },
            '0' => Motion::LineStart,
            '^' => Motion::FirstNonBlank,
            '$' => Motion::LineEnd,
            '|' => Motion::Column,
            '+' => Motion::NextLineStart,
            '-' => Motion::PrevLineStart,
            '_' => Motion::CurrentLine,
            'G' => Motion::GotoLine,
            '(' => Motion::SentenceBackward,
            ')' => Motion::SentenceForward,
            '{' => Motion::ParagraphBackward,
            '}' => Motion::ParagraphForward,
            ';' => Motion::RepeatFind,
            ',' => Motion::RepeatFindReverse,
            'n' => Motion::SearchNext,
            'N' => Motion::SearchPrev,
            '*' => Motion::SearchWord {
                direction: SearchDirection::Forward,
            },
            '#' => Motion::SearchWord {
                direction: SearchDirection::Backward,
            },
            '%' => Motion::MatchBracket,
            'H' => Motion::ScreenTop,
            'M' => Motion::ScreenMiddle,
            'L' => Motion::ScreenBottom,
            'f' => {
                return Some(Step::Wait(PendingCommand::CharArg(CharArg::Find(FindKind::To), op)));
            }
            't' => {
                return Some(Step::Wait(PendingCommand::CharArg(
                    CharArg::Find(FindKind::Till),
                    op,
                )));
            }
            'F' => {
                return Some(Step::Wait(PendingCommand::CharArg(
                    CharArg::Find(FindKind::ToBackward),
                    op,
                )));
            }
            'T' => {
                return Some(Step::Wait(PendingCommand::CharArg(
                    CharArg::Find(FindKind::TillBackward),
                    op,
                )));
            }
            '`' => return Some(Step::Wait(PendingCommand::CharArg(CharArg::Mark, op))),
            '\'' => return Some(Step::Wait(PendingCommand::CharArg(CharArg::MarkLine, op))),
            '[' | ']' => return Some(Step::Wait(PendingCommand::Prefix(c, op))),
            _ => return None,
        };
        Some(Step::Done(match op {
            Some(op) => Command::Operate { op, motion },
            None => Command::Move(motion),
        }))
    }
}

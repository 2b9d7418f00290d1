use super::address::{Address, RangeSpec, Scanner, parse_address, parse_range};
use crate::document_model::RegisterManager;
use crate::error::{EditorError, Result};
use std::path::PathBuf;

/// Full command names with the shortest accepted abbreviation. The first
/// entry a word abbreviates wins.
const COMMANDS: &[(&str, usize)] = &[
    ("append", 1),
    ("change", 1),
    ("copy", 2),
    ("delete", 1),
    ("display", 2),
    ("edit", 1),
    ("file", 1),
    ("global", 1),
    ("insert", 1),
    ("join", 1),
    ("k", 1),
    ("list", 1),
    ("move", 1),
    ("mark", 2),
    ("marks", 5),
    ("number", 1),
    ("print", 1),
    ("put", 2),
    ("quit", 1),
    ("read", 1),
    ("redo", 3),
    ("registers", 3),
    ("set", 2),
    ("substitute", 1),
    ("t", 1),
    ("undo", 1),
    ("vglobal", 1),
    ("write", 1),
    ("wq", 2),
    ("xit", 1),
    ("yank", 1),
];

fn lookup(word: &str) -> Option<&'static str> {
    COMMANDS
        .iter()
        .find(|(full, min)| word.len() >= *min && full.starts_with(word))
        .map(|(full, _)| *full)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStyle {
    Plain,
    Numbered,
    /// Tabs as `^I`, control characters as `^X`, `$` at the end.
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Append,
    Insert,
    Change,
}

/// Where `:r`, `:w` and `:e` get or put their text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    /// A file; `None` means the buffer's own name.
    File(Option<PathBuf>),
    /// `!cmd`: a shell command.
    Command(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstituteFlags {
    pub global: bool,
    /// `i` forces ignoring case, `I` forces matching it.
    pub ignore_case: Option<bool>,
    /// `&&`: keep the flags of the substitute being repeated.
    pub keep: bool,
    pub count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExCommand {
    /// A bare address: move to that line.
    Goto,
    Input(InputKind),
    Delete {
        register: Option<char>,
        count: Option<usize>,
    },
    Yank {
        register: Option<char>,
        count: Option<usize>,
    },
    Put {
        register: Option<char>,
    },
    Copy {
        dest: Address,
    },
    Move {
        dest: Address,
    },
    Join {
        count: Option<usize>,
    },
    Mark(char),
    Print {
        style: PrintStyle,
        count: Option<usize>,
    },
    Global {
        pattern: String,
        command: String,
    },
    /// `pattern` is `None` when repeating the last substitute (`&`, `:s`).
    Substitute {
        pattern: Option<(String, String)>,
        flags: SubstituteFlags,
    },
    Shift {
        right: bool,
        depth: usize,
        count: Option<usize>,
    },
    Write {
        target: FileTarget,
        append: bool,
        quit: bool,
    },
    Xit(Option<PathBuf>),
    Read(FileTarget),
    Edit(FileTarget),
    /// `:!cmd`; filters the range through `cmd` when addresses were given.
    Bang(String),
    Undo,
    Redo,
    LineNumber,
    Set(Vec<String>),
    Quit,
    Marks,
    Registers,
    File(Option<PathBuf>),
}

impl ExCommand {
    /// May the command's addresses be line 0?
    pub fn allows_zero(&self) -> bool {
        matches!(
            self,
            ExCommand::Goto
                | ExCommand::Input(InputKind::Append | InputKind::Insert)
                | ExCommand::Read(_)
                | ExCommand::Put { .. }
                | ExCommand::LineNumber
        )
    }

    /// Does the command default to the whole buffer instead of `.`?
    pub fn defaults_to_all(&self) -> bool {
        matches!(
            self,
            ExCommand::Global { .. } | ExCommand::Write { .. } | ExCommand::Xit(_)
        )
    }
}

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub range: RangeSpec,
    pub bang: bool,
    /// `:v` and `:g!` select non-matching lines.
    pub invert: bool,
    pub command: ExCommand,
}

/// Parses a whole command line. Nothing is resolved against the buffer yet,
/// so a failure here never changes anything.
pub fn parse(line: &str) -> Result<ParsedLine> {
    let mut sc = Scanner::new(line);
    let range = parse_range(&mut sc)?;
    sc.skip_blanks();
    let mut parsed = ParsedLine {
        range,
        bang: false,
        invert: false,
        command: ExCommand::Goto,
    };
    let Some(first) = sc.peek() else {
        return Ok(parsed);
    };

    parsed.command = match first {
        '!' => {
            sc.bump();
            let command = sc.take_rest().trim().to_string();
            if command.is_empty() {
                return Err(EditorError::UnknownCommand("!".to_string()));
            }
            ExCommand::Bang(command)
        }
        '=' => {
            sc.bump();
            ExCommand::LineNumber
        }
        '#' => {
            sc.bump();
            print_args(&mut sc, PrintStyle::Numbered)?
        }
        '&' => {
            sc.bump();
            let keep = sc.eat('&');
            let mut flags = substitute_flags(&mut sc)?;
            flags.keep = keep;
            ExCommand::Substitute {
                pattern: None,
                flags,
            }
        }
        '<' | '>' => {
            let mut depth = 0;
            while sc.eat(first) {
                depth += 1;
                sc.skip_blanks();
            }
            ExCommand::Shift {
                right: first == '>',
                depth,
                count: count_arg(&mut sc)?,
            }
        }
        c if c.is_ascii_alphabetic() => named_command(&mut sc, &mut parsed)?,
        _ => return Err(EditorError::UnknownCommand(sc.rest())),
    };

    sc.skip_blanks();
    if !sc.at_end() {
        return Err(EditorError::TrailingCharacters(sc.rest()));
    }
    Ok(parsed)
}

fn named_command(sc: &mut Scanner, parsed: &mut ParsedLine) -> Result<ExCommand> {
    let word = sc.take_while(|c| c.is_ascii_alphabetic());
    let Some(name) = lookup(&word) else {
        // `ka` sets mark a without a space.
        let mut chars = word.chars();
        if let (Some('k'), Some(mark), None) = (chars.next(), chars.next(), chars.next()) {
            return Ok(ExCommand::Mark(mark));
        }
        return Err(EditorError::UnknownCommand(word));
    };
    if matches!(
        name,
        "quit" | "write" | "wq" | "xit" | "edit" | "global" | "join"
    ) {
        parsed.bang = sc.eat('!');
    }

    let command = match name {
        "append" => ExCommand::Input(InputKind::Append),
        "insert" => ExCommand::Input(InputKind::Insert),
        "change" => ExCommand::Input(InputKind::Change),
        "delete" => {
            let register = register_arg(sc);
            ExCommand::Delete {
                register,
                count: count_arg(sc)?,
            }
        }
        "yank" => {
            let register = register_arg(sc);
            ExCommand::Yank {
                register,
                count: count_arg(sc)?,
            }
        }
        "put" => ExCommand::Put {
            register: register_arg(sc),
        },
        "copy" | "t" => ExCommand::Copy {
            dest: destination(sc)?,
        },
        "move" => ExCommand::Move {
            dest: destination(sc)?,
        },
        "join" => ExCommand::Join {
            count: count_arg(sc)?,
        },
        "k" | "mark" => {
            sc.skip_blanks();
            match sc.bump() {
                Some(mark) => ExCommand::Mark(mark),
                None => return Err(EditorError::InvalidMark(' ')),
            }
        }
        "print" => print_args(sc, PrintStyle::Plain)?,
        "number" => print_args(sc, PrintStyle::Numbered)?,
        "list" => print_args(sc, PrintStyle::List)?,
        "global" | "vglobal" => {
            parsed.invert = name == "vglobal" || parsed.bang;
            global_args(sc)?
        }
        "substitute" => substitute_args(sc)?,
        "write" | "wq" => {
            sc.skip_blanks();
            let append = if sc.peek() == Some('>') && sc.peek_at(1) == Some('>') {
                sc.bump();
                sc.bump();
                true
            } else {
                false
            };
            let target = if append {
                FileTarget::File(file_arg(sc))
            } else {
                file_target(sc)
            };
            ExCommand::Write {
                target,
                append,
                quit: name == "wq",
            }
        }
        "xit" => ExCommand::Xit(file_arg(sc)),
        "read" => ExCommand::Read(file_target(sc)),
        "edit" => ExCommand::Edit(file_target(sc)),
        "file" => ExCommand::File(file_arg(sc)),
        "set" => ExCommand::Set(
            sc.take_rest()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        ),
        "undo" => ExCommand::Undo,
        "redo" => ExCommand::Redo,
        "quit" => ExCommand::Quit,
        "marks" => ExCommand::Marks,
        "registers" | "display" => ExCommand::Registers,
        _ => return Err(EditorError::UnknownCommand(word)),
    };
    Ok(command)
}

fn register_arg(sc: &mut Scanner) -> Option<char> {
    sc.skip_blanks();
    match sc.peek() {
        Some(c) if !c.is_ascii_digit() && RegisterManager::is_valid_name(c) => {
            sc.bump();
            Some(c)
        }
        _ => None,
    }
}

fn count_arg(sc: &mut Scanner) -> Result<Option<usize>> {
    sc.skip_blanks();
    match sc.number() {
        Some(0) => Err(EditorError::InvalidAddress("0".to_string())),
        other => Ok(other),
    }
}

fn destination(sc: &mut Scanner) -> Result<Address> {
    parse_address(sc)?.ok_or_else(|| EditorError::InvalidAddress(sc.rest()))
}

fn print_args(sc: &mut Scanner, style: PrintStyle) -> Result<ExCommand> {
    Ok(ExCommand::Print {
        style,
        count: count_arg(sc)?,
    })
}

fn file_arg(sc: &mut Scanner) -> Option<PathBuf> {
    let name = sc.take_rest();
    let name = name.trim();
    (!name.is_empty()).then(|| PathBuf::from(name))
}

fn file_target(sc: &mut Scanner) -> FileTarget {
    sc.skip_blanks();
    if sc.eat('!') {
        FileTarget::Command(sc.take_rest().trim().to_string())
    } else {
        FileTarget::File(file_arg(sc))
    }
}

fn is_delimiter(c: char) -> bool {
    !c.is_alphanumeric() && !matches!(c, ' ' | '\t' | '\\' | '"' | '|')
}

fn global_args(sc: &mut Scanner) -> Result<ExCommand> {
    sc.skip_blanks();
    let delimiter = match sc.bump() {
        Some(c) if is_delimiter(c) => c,
        _ => return Err(EditorError::InvalidPattern("missing delimiter".to_string())),
    };
    let (pattern, terminated) = sc.delimited(delimiter);
    if !terminated {
        return Err(EditorError::UnterminatedPattern(delimiter));
    }
    let command = sc.take_rest().trim().to_string();
    Ok(ExCommand::Global {
        pattern,
        command: if command.is_empty() {
            "p".to_string()
        } else {
            command
        },
    })
}

fn substitute_args(sc: &mut Scanner) -> Result<ExCommand> {
    let delimiter = match sc.peek() {
        Some(c) if is_delimiter(c) && c != '&' => c,
        _ => {
            let keep = sc.eat('&');
            let mut flags = substitute_flags(sc)?;
            flags.keep = keep;
            return Ok(ExCommand::Substitute {
                pattern: None,
                flags,
            });
        }
    };
    sc.bump();
    let (pattern, terminated) = sc.delimited(delimiter);
    if !terminated {
        return Err(EditorError::UnterminatedPattern(delimiter));
    }
    // The closing delimiter of the replacement is optional.
    let (replacement, _) = sc.delimited(delimiter);
    Ok(ExCommand::Substitute {
        pattern: Some((pattern, replacement)),
        flags: substitute_flags(sc)?,
    })
}

fn substitute_flags(sc: &mut Scanner) -> Result<SubstituteFlags> {
    let mut flags = SubstituteFlags::default();
    loop {
        match sc.peek() {
            Some('g') => flags.global = true,
            Some('i') => flags.ignore_case = Some(true),
            Some('I') => flags.ignore_case = Some(false),
            _ => break,
        }
        sc.bump();
    }
    flags.count = count_arg(sc)?;
    Ok(flags)
}

/// Turns a vi replacement into a `regex` template: `&` and `\0` are the
/// whole match, `\1`..`\9` are groups, `\&` is a literal `&`, `\n` a line
/// break. `$` is literal.
pub fn translate_replacement(replacement: &str) -> String {
    let mut out = String::new();
    let mut chars = replacement.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(d @ '0'..='9') => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('n') | Some('r') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '&' => out.push_str("${0}"),
            '$' => out.push_str("$$"),
            _ => out.push(c),
        }
    }
    out
}

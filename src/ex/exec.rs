use super::address::{Address, LineContext, line_position};
use super::parser::{
    self, ExCommand, FileTarget, InputKind, ParsedLine, PrintStyle, SubstituteFlags,
    translate_replacement,
};
use crate::config::SetOutcome;
use crate::controller::command_types::Operator;
use crate::controller::operators;
use crate::controller::shared_state::SharedEditorState;
use crate::document_model::document::split_lines;
use crate::document_model::marks::adjust;
use crate::document_model::{
    Position, Register, RegisterAction, SearchState, SelectionBounds,
};
use crate::error::{EditorError, Result};
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What the host should do after a command line ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExOutcome {
    Continue,
    Quit,
}

/// The last `:s`, replayed by `&`, `:s` and `:&&`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub pattern: String,
    /// Replacement already in `regex` template form.
    pub template: String,
    pub global: bool,
    pub ignore_case: Option<bool>,
}

/// Lines being collected for `:a`, `:i` or `:c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExInput {
    kind: InputKind,
    /// 1-based range the command was given.
    first: usize,
    last: usize,
    lines: Vec<String>,
}

impl ExInput {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Parses and runs one command line. Addresses are resolved in full before
/// anything changes, so a bad line leaves the buffer alone. A command that
/// changes text is a single undo step.
pub fn execute(shared: &mut SharedEditorState, line: &str) -> Result<ExOutcome> {
    run_line(shared, line, false)
}

/// Feeds one line to a pending `:a`, `:i` or `:c`. A lone `.` ends the input
/// and applies it as one undo step. Returns true while more lines are wanted.
pub fn feed_input(shared: &mut SharedEditorState, line: &str) -> Result<bool> {
    let Some(input) = shared.ex_input.as_mut() else {
        return Ok(false);
    };
    if line != "." {
        input.lines.push(line.to_string());
        return Ok(true);
    }
    let Some(input) = shared.ex_input.take() else {
        return Ok(false);
    };
    debug!(target: "editor.ex", kind = ?input.kind, lines = input.lines.len(), "input finished");
    shared.begin_edit();
    apply_input(shared, input);
    shared.end_edit();
    Ok(false)
}

fn run_line(shared: &mut SharedEditorState, line: &str, in_global: bool) -> Result<ExOutcome> {
    let text = line.trim_start_matches(|c: char| c == ':' || c.is_whitespace());
    if text.is_empty() {
        return Ok(ExOutcome::Continue);
    }
    let parsed = parser::parse(text).inspect_err(|e| {
        warn!(target: "editor.ex", line = %text, error = %e, "rejected");
    })?;
    debug!(target: "editor.ex", ?parsed, "parsed");
    if in_global && matches!(parsed.command, ExCommand::Global { .. }) {
        return Err(EditorError::UnknownCommand(
            "global cannot be nested".to_string(),
        ));
    }
    let (first, last) = resolve_range(shared, &parsed)?;

    // These manage history themselves.
    if matches!(
        parsed.command,
        ExCommand::Undo | ExCommand::Redo | ExCommand::Edit(_)
    ) {
        return run(shared, &parsed, first, last, in_global);
    }
    shared.begin_edit();
    let result = run(shared, &parsed, first, last, in_global);
    shared.end_edit();
    result
}

fn resolve_range(shared: &mut SharedEditorState, parsed: &ParsedLine) -> Result<(usize, usize)> {
    let count = shared.document.line_count();
    let current = shared.cursor.line + 1;
    let default = if parsed.command.defaults_to_all() {
        (1, count)
    } else if parsed.command == ExCommand::LineNumber {
        (count, count)
    } else {
        (current, current)
    };
    let mut ctx = line_context(shared);
    let (first, last) = ctx.resolve_range(&parsed.range, default)?;
    if first == 0 && !parsed.command.allows_zero() {
        return Err(EditorError::InvalidRange);
    }
    Ok((first, last))
}

fn line_context(shared: &mut SharedEditorState) -> LineContext<'_> {
    LineContext {
        current: shared.cursor.line + 1,
        document: &shared.document,
        marks: &shared.mark_manager,
        search: &mut shared.search_state,
        ignore_case: shared.settings.ignorecase,
        wrap: shared.settings.wrapscan,
    }
}

fn resolve_destination(shared: &mut SharedEditorState, dest: &Address) -> Result<usize> {
    line_context(shared).resolve(dest)
}

/// A trailing count `N` turns the range into N lines from its last line.
fn with_count(shared: &SharedEditorState, last: usize, count: Option<usize>) -> (usize, usize) {
    let first = last.max(1);
    match count {
        Some(n) => (first, (first + n - 1).min(shared.document.line_count())),
        None => (first, first),
    }
}

fn lines_bounds(first: usize, last: usize) -> SelectionBounds {
    SelectionBounds::Lines {
        first: first - 1,
        last: last - 1,
    }
}

fn run(
    shared: &mut SharedEditorState,
    parsed: &ParsedLine,
    first: usize,
    last: usize,
    in_global: bool,
) -> Result<ExOutcome> {
    let explicit = !parsed.range.is_empty();
    match &parsed.command {
        ExCommand::Goto => {
            shared.mark_manager.push_jump(shared.cursor);
            shared.cursor = line_position(&shared.document, last);
            shared.desired_column = None;
        }
        ExCommand::Input(kind) => {
            shared.ex_input = Some(ExInput {
                kind: *kind,
                first,
                last,
                lines: Vec::new(),
            });
        }
        ExCommand::Delete { register, count } => {
            let (first, last) = count_range(shared, first, last, *count);
            operators::apply_operator(
                shared,
                Operator::Delete,
                lines_bounds(first, last),
                *register,
                1,
            )?;
        }
        ExCommand::Yank { register, count } => {
            let (first, last) = count_range(shared, first, last, *count);
            operators::apply_operator(
                shared,
                Operator::Yank,
                lines_bounds(first, last),
                *register,
                1,
            )?;
        }
        ExCommand::Put { register } => {
            let lines = shared.register_manager.get(*register)?.as_lines();
            insert_after(shared, last, &lines);
        }
        ExCommand::Copy { dest } => {
            let dest = resolve_destination(shared, dest)?;
            let lines: Vec<String> = (first - 1..last)
                .map(|row| shared.document.line_text(row))
                .collect();
            insert_after(shared, dest, &lines);
        }
        ExCommand::Move { dest } => {
            let dest = resolve_destination(shared, dest)?;
            move_lines(shared, first, last, dest)?;
        }
        ExCommand::Join { count } => {
            let (first, last) = match count {
                Some(_) => with_count(shared, last, *count),
                None if first == last => (first, first + 1),
                None => (first, last),
            };
            let last = last.min(shared.document.line_count());
            if last > first {
                operators::join_lines(shared, first - 1, last - first + 1, !parsed.bang);
            }
        }
        ExCommand::Mark(name) => {
            shared.mark_manager.set(*name, Position::new(last - 1, 0))?;
        }
        ExCommand::Print { style, count } => {
            let (first, last) = count_range(shared, first, last, *count);
            print_lines(shared, first, last, *style);
        }
        ExCommand::Global { pattern, command } => {
            return global(shared, first, last, pattern, command, parsed.invert);
        }
        ExCommand::Substitute { pattern, flags } => {
            let (first, last) = match flags.count {
                Some(_) => with_count(shared, last, flags.count),
                None => (first, last),
            };
            substitute(shared, first, last, pattern.as_ref(), *flags, in_global)?;
        }
        ExCommand::Shift {
            right,
            depth,
            count,
        } => {
            let (first, last) = count_range(shared, first, last, *count);
            let op = if *right {
                Operator::ShiftRight
            } else {
                Operator::ShiftLeft
            };
            operators::apply_operator(shared, op, lines_bounds(first, last), None, *depth)?;
            shared.goto_line(last - 1);
        }
        ExCommand::Write {
            target,
            append,
            quit,
        } => {
            let range = explicit.then_some((first - 1, last - 1));
            write(shared, target, range, *append)?;
            if *quit {
                return Ok(ExOutcome::Quit);
            }
        }
        ExCommand::Xit(path) => {
            if shared.document.is_modified() {
                let range = explicit.then_some((first - 1, last - 1));
                write(shared, &FileTarget::File(path.clone()), range, false)?;
            }
            return Ok(ExOutcome::Quit);
        }
        ExCommand::Read(source) => read(shared, last, source)?,
        ExCommand::Edit(source) => edit(shared, source, parsed.bang)?,
        ExCommand::Bang(command) => {
            if explicit {
                filter(shared, first, last, command)?;
            } else {
                let output = shared.runner.run(command, "")?;
                for line in split_lines(&output) {
                    shared.print(line);
                }
            }
        }
        ExCommand::Undo => match shared.document.undo() {
            Some(pos) => shared.cursor = shared.clamp_position(pos),
            None => shared.message("Already at oldest change"),
        },
        ExCommand::Redo => match shared.document.redo() {
            Some(pos) => shared.cursor = shared.clamp_position(pos),
            None => shared.message("Already at newest change"),
        },
        ExCommand::LineNumber => shared.print(last.to_string()),
        ExCommand::Set(args) => set(shared, args)?,
        ExCommand::Quit => {
            if shared.document.is_modified() && !parsed.bang {
                return Err(EditorError::Modified);
            }
            return Ok(ExOutcome::Quit);
        }
        ExCommand::Marks => {
            shared.interface.display_marks();
            let marks: Vec<(char, Position)> = shared.mark_manager.list().collect();
            shared.print("mark line  col text");
            for (name, pos) in marks {
                let text = if pos.line < shared.document.line_count() {
                    shared.document.line_text(pos.line)
                } else {
                    String::new()
                };
                shared.print(format!(" {name} {:>6} {:>4} {text}", pos.line + 1, pos.column));
            }
        }
        ExCommand::Registers => {
            shared.interface.display_registers();
            let registers: Vec<(char, String)> = shared
                .register_manager
                .list()
                .map(|(name, register)| (name, register.text()))
                .collect();
            for (name, text) in registers {
                shared.print(format!("\"{name}   {}", text.replace('\n', "^J")));
            }
        }
        ExCommand::File(name) => {
            if let Some(name) = name {
                shared.document.filename = Some(name.clone());
            }
            let info = shared.file_info();
            shared.message(info);
        }
    }
    Ok(ExOutcome::Continue)
}

fn count_range(
    shared: &SharedEditorState,
    first: usize,
    last: usize,
    count: Option<usize>,
) -> (usize, usize) {
    match count {
        Some(_) => with_count(shared, last, count),
        None => (first, last),
    }
}

/// Adds `lines` after 1-based line `after` (0 puts them first).
fn insert_after(shared: &mut SharedEditorState, after: usize, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    for (i, text) in lines.iter().enumerate() {
        shared.document.add_line(after + i, text);
    }
    shared.goto_line(after + lines.len() - 1);
    shared.mark_change();
    operators::report_lines(shared, lines.len(), "more");
}

/// Moves lines `first..=last` (1-based) after line `dest`.
fn move_lines(
    shared: &mut SharedEditorState,
    first: usize,
    last: usize,
    dest: usize,
) -> Result<()> {
    if dest >= first && dest < last {
        return Err(EditorError::MoveIntoRange);
    }
    let count = last - first + 1;
    let start = first - 1;
    let landing = if dest + 1 == first || dest == last {
        last - 1
    } else if dest < first {
        for i in 0..count {
            shared.document.move_line(start + i, dest + i);
        }
        dest + count - 1
    } else {
        for _ in 0..count {
            shared.document.move_line(start, dest - 1);
        }
        dest - 1
    };
    shared.goto_line(landing);
    shared.mark_change();
    if count > 2 {
        shared.message(format!("{count} lines moved"));
    }
    Ok(())
}

/// Replaces rows `first..=last` (0-based) with `lines`, staging the old text
/// in the default register when `record` is set.
fn replace_lines(
    shared: &mut SharedEditorState,
    first: usize,
    last: usize,
    lines: &[String],
    record: bool,
) {
    if record {
        let old: Vec<String> = (first..=last)
            .map(|row| shared.document.line_text(row))
            .collect();
        shared
            .register_manager
            .record(None, RegisterAction::Delete, Register::lines(old));
    }
    for (i, text) in lines.iter().enumerate() {
        shared.document.add_line(last + 1 + i, text);
    }
    for _ in first..=last {
        shared.document.delete_line(first);
    }
}

fn apply_input(shared: &mut SharedEditorState, input: ExInput) {
    let ExInput {
        kind,
        first,
        last,
        lines,
    } = input;
    match kind {
        InputKind::Change => {
            replace_lines(shared, first - 1, last - 1, &lines, true);
            shared.goto_line(first - 1 + lines.len().saturating_sub(1));
        }
        InputKind::Append | InputKind::Insert => {
            if lines.is_empty() {
                return;
            }
            let at = match kind {
                InputKind::Append => last,
                _ => last.saturating_sub(1),
            };
            // Text typed into an empty buffer replaces its lone blank line.
            let blank = shared.document.line_count() == 1 && shared.document.line_len(0) == 0;
            for (i, text) in lines.iter().enumerate() {
                shared.document.add_line(at + i, text);
            }
            let mut landing = at + lines.len() - 1;
            if blank {
                if at == 0 {
                    shared.document.delete_line(lines.len());
                } else {
                    shared.document.delete_line(0);
                    landing -= 1;
                }
            }
            shared.goto_line(landing);
        }
    }
    shared.mark_change();
}

fn print_lines(shared: &mut SharedEditorState, first: usize, last: usize, style: PrintStyle) {
    for row in first - 1..last {
        let text = shared.document.line_text(row);
        let line = match style {
            PrintStyle::Plain => text,
            PrintStyle::Numbered => format!("{:>6}  {text}", row + 1),
            PrintStyle::List => list_form(&text),
        };
        shared.print(line);
    }
    shared.goto_line(last - 1);
}

/// `:l` rendering: tabs and control characters made visible, `$` at the end.
fn list_form(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        match c {
            '\t' => out.push_str("^I"),
            c if c.is_ascii_control() => {
                out.push('^');
                out.push(char::from((c as u8) ^ 0x40));
            }
            c => out.push(c),
        }
    }
    out.push('$');
    out
}

fn global(
    shared: &mut SharedEditorState,
    first: usize,
    last: usize,
    pattern: &str,
    command: &str,
    invert: bool,
) -> Result<ExOutcome> {
    let pattern = shared.search_state.resolve(pattern)?.to_string();
    shared.search_state.remember(&pattern);
    let regex = SearchState::compile(&pattern, shared.settings.ignorecase)?;
    let mut rows: VecDeque<usize> = (first - 1..last)
        .filter(|row| regex.is_match(&shared.document.line_text(*row)) != invert)
        .collect();
    if rows.is_empty() {
        return Err(EditorError::PatternNotFound(pattern));
    }
    debug!(target: "editor.ex", pattern = %pattern, matches = rows.len(), command, "global");
    let _ = shared.sync();
    while let Some(row) = rows.pop_front() {
        shared.cursor = Position::new(row, 0);
        let outcome = run_line(shared, command, true)?;
        // Keep the remaining rows on their lines as the command edits.
        for event in shared.sync() {
            rows.retain_mut(|row| {
                let mut pos = Position::new(*row, 0);
                let keep = adjust(&mut pos, event);
                *row = pos.line;
                keep
            });
        }
        if outcome == ExOutcome::Quit {
            return Ok(ExOutcome::Quit);
        }
    }
    Ok(ExOutcome::Continue)
}

fn substitute(
    shared: &mut SharedEditorState,
    first: usize,
    last: usize,
    pattern: Option<&(String, String)>,
    flags: SubstituteFlags,
    in_global: bool,
) -> Result<()> {
    let sub = match pattern {
        Some((pattern, replacement)) => Substitution {
            pattern: shared.search_state.resolve(pattern)?.to_string(),
            template: translate_replacement(replacement),
            global: flags.global,
            ignore_case: flags.ignore_case,
        },
        None => {
            let mut sub = shared
                .last_substitute
                .clone()
                .ok_or(EditorError::NoPreviousSubstitute)?;
            if flags.keep {
                sub.global |= flags.global;
                sub.ignore_case = flags.ignore_case.or(sub.ignore_case);
            } else {
                sub.global = flags.global;
                sub.ignore_case = flags.ignore_case;
            }
            sub
        }
    };
    shared.search_state.remember(&sub.pattern);
    shared.last_substitute = Some(sub.clone());
    let regex = SearchState::compile(
        &sub.pattern,
        sub.ignore_case.unwrap_or(shared.settings.ignorecase),
    )?;

    let mut row = first - 1;
    let mut end = last - 1;
    let mut changed_lines = 0;
    let mut replacements = 0;
    let mut last_changed = None;
    while row <= end {
        let text = shared.document.line_text(row);
        let found = regex.find_iter(&text).count();
        if found == 0 {
            row += 1;
            continue;
        }
        let replaced = if sub.global {
            replacements += found;
            regex.replace_all(&text, sub.template.as_str())
        } else {
            replacements += 1;
            regex.replace(&text, sub.template.as_str())
        };
        let mut pieces = replaced.split('\n');
        shared.document.set_line(row, pieces.next().unwrap_or_default());
        for piece in pieces {
            row += 1;
            end += 1;
            shared.document.add_line(row, piece);
        }
        changed_lines += 1;
        last_changed = Some(row);
        row += 1;
    }

    match last_changed {
        Some(row) => {
            shared.goto_line(row);
            shared.mark_change();
            if changed_lines > 2 {
                shared.message(format!(
                    "{replacements} substitutions on {changed_lines} lines"
                ));
            }
            Ok(())
        }
        // Inside `:g`, lines without a match are simply skipped.
        None if in_global => Ok(()),
        None => Err(EditorError::PatternNotFound(sub.pattern)),
    }
}

fn file_or_current(shared: &SharedEditorState, path: &Option<PathBuf>) -> Result<PathBuf> {
    path.clone()
        .or_else(|| shared.document.filename.clone())
        .ok_or(EditorError::NoFileName)
}

fn write(
    shared: &mut SharedEditorState,
    target: &FileTarget,
    range: Option<(usize, usize)>,
    append: bool,
) -> Result<()> {
    match target {
        FileTarget::Command(command) => {
            let (first, last) = range.unwrap_or((0, shared.last_line()));
            let input = shared.document.render_lines(first, last);
            let output = shared.runner.run(command, &input)?;
            for line in split_lines(&output) {
                shared.print(line);
            }
        }
        FileTarget::File(path) => {
            let path = file_or_current(shared, path)?;
            let (lines, bytes) = shared.document.save(&path, range, append)?;
            let verb = if append { "appended" } else { "written" };
            shared.message(format!(
                "\"{}\" {lines}L, {bytes}B {verb}",
                path.display()
            ));
        }
    }
    Ok(())
}

fn read(shared: &mut SharedEditorState, after: usize, source: &FileTarget) -> Result<()> {
    let count = match source {
        FileTarget::File(path) => {
            let path = file_or_current(shared, path)?;
            let count = shared.document.add_file_lines(&path, after)?;
            shared.message(format!("\"{}\" {count} lines", path.display()));
            count
        }
        FileTarget::Command(command) => {
            let output = shared.runner.run(command, "")?;
            let lines = split_lines(&output);
            shared.document.insert_lines(after, &lines);
            lines.len()
        }
    };
    if count > 0 {
        shared.goto_line(after + count - 1);
        shared.mark_change();
    }
    Ok(())
}

fn edit(shared: &mut SharedEditorState, source: &FileTarget, force: bool) -> Result<()> {
    if shared.document.is_modified() && !force {
        return Err(EditorError::Modified);
    }
    match source {
        FileTarget::File(path) => {
            let path = file_or_current(shared, path)?;
            let count = shared.document.load(&path)?;
            shared.message(format!("\"{}\" {count} lines", path.display()));
        }
        FileTarget::Command(command) => {
            let output = shared.runner.run(command, "")?;
            shared.document.replace_all(&split_lines(&output));
        }
    }
    shared.goto_line(0);
    Ok(())
}

fn filter(shared: &mut SharedEditorState, first: usize, last: usize, command: &str) -> Result<()> {
    let input = shared.document.render_lines(first - 1, last - 1);
    let output = shared.runner.run(command, &input)?;
    let lines = split_lines(&output);
    info!(
        target: "editor.process",
        command,
        lines_in = last - first + 1,
        lines_out = lines.len(),
        "filtered"
    );
    replace_lines(shared, first - 1, last - 1, &lines, false);
    shared.goto_line(first - 1);
    shared.mark_change();
    operators::report_lines(shared, lines.len(), "filtered");
    Ok(())
}

fn set(shared: &mut SharedEditorState, args: &[String]) -> Result<()> {
    match args {
        [] => {
            let summary = shared.settings.describe_all().join("  ");
            shared.print(summary);
        }
        [all] if all == "all" => {
            for line in shared.settings.describe_all() {
                shared.print(line);
            }
        }
        _ => {
            for arg in args {
                match shared.settings.apply(arg)? {
                    SetOutcome::Changed(name) => {
                        info!(target: "editor.ex", option = name, "option set");
                        if name == "fileformat" {
                            shared.document.line_ending = shared.settings.fileformat;
                        }
                    }
                    SetOutcome::Query(value) => shared.print(value),
                    SetOutcome::Unknown(_) => {
                        let (name, value) = match arg.split_once('=') {
                            Some((name, value)) => (name, Some(value)),
                            None => (arg.as_str(), None),
                        };
                        if !shared.interface.set_option(name, value) {
                            return Err(EditorError::UnknownOption(name.to_string()));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

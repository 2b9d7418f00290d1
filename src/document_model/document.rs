use super::line::Line;
use super::position::Position;
use super::syntax::{SyntaxHighlighter, TokenKind, TokenSink};
use super::undo::{Direction, UndoCommand, UndoManager};
use crate::error::{EditorError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Unix, // \n (LF)
    Windows, // \r\n (CRLF)
    Mac,     // \r (CR)
}

impl LineEnding {
    pub fn detect(content: &str) -> Self {
        if content.contains("\r\n") {
            LineEnding::Windows
        } else if content.contains('\r') {
            LineEnding::Mac
        } else {
            LineEnding::Unix
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Unix => "\n",
            LineEnding::Windows => "\r\n",
            LineEnding::Mac => "\r",
        }
    }

    /// Name used by the `fileformat` option.
    pub fn name(&self) -> &'static str {
        match self {
            LineEnding::Unix => "unix",
            LineEnding::Windows => "dos",
            LineEnding::Mac => "mac",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "unix" => Some(LineEnding::Unix),
            "dos" => Some(LineEnding::Windows),
            "mac" => Some(LineEnding::Mac),
            _ => None,
        }
    }
}

/// Structural change notifications. The editor drains these after each
/// command to keep marks and tracked line numbers pointing at the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    Inserted { at: usize },
    Deleted { at: usize },
    Moved { from: usize, to: usize },
    /// Line `at + 1` was appended to line `at`, whose old length was `column`.
    Joined { at: usize, column: usize },
    /// The whole buffer was replaced.
    Reset,
}

/// An ordered, never-empty sequence of lines.
///
/// All mutation goes through the methods below, which are also the only place
/// undo commands are recorded. Index arguments are trusted: passing an index
/// outside the buffer is a caller bug and panics.
#[derive(Debug, Clone)]
pub struct Document {
    lines: Vec<Line>,
    pub filename: Option<PathBuf>,
    modified: bool,
    pub line_ending: LineEnding,
    undo_manager: UndoManager,
    undo_locked: bool,
    change_tick: u64,
    events: Vec<LineEvent>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            lines: vec![Line::new()],
            filename: None,
            modified: false,
            line_ending: LineEnding::default(),
            undo_manager: UndoManager::new(),
            undo_locked: false,
            change_tick: 0,
            events: Vec::new(),
        }
    }

    /// Builds a document without recording any history.
    pub fn from_lines(lines: Vec<String>) -> Self {
        let mut doc = Self::new();
        if !lines.is_empty() {
            doc.lines = lines.iter().map(|l| Line::from_text(l)).collect();
        }
        doc
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn get_line(&self, index: usize) -> &Line {
        &self.lines[index]
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Gives the render collaborator access to the changed flags.
    pub fn lines_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.lines.iter_mut()
    }

    pub fn line_text(&self, index: usize) -> String {
        self.lines[index].text()
    }

    pub fn line_len(&self, index: usize) -> usize {
        self.lines[index].len()
    }

    /// Whole buffer joined with `\n`.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text between two positions, `end` exclusive, lines joined with `\n`.
    pub fn text_range(&self, start: Position, end: Position) -> String {
        if start.line == end.line {
            return self.lines[start.line].slice(start.column, end.column);
        }
        let mut out = self.lines[start.line].slice(start.column, usize::MAX);
        for row in start.line + 1..end.line {
            out.push('\n');
            out.push_str(&self.lines[row].text());
        }
        out.push('\n');
        out.push_str(&self.lines[end.line].slice(0, end.column));
        out
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Bumped on every buffer change, including undo and redo.
    pub fn change_tick(&self) -> u64 {
        self.change_tick
    }

    pub fn take_events(&mut self) -> Vec<LineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo_manager
    }

    pub fn undo_manager_mut(&mut self) -> &mut UndoManager {
        &mut self.undo_manager
    }

    pub fn start_group(&mut self, cursor: Position) {
        self.undo_manager.start_group(cursor);
    }

    pub fn end_group(&mut self, cursor: Position) {
        self.undo_manager.end_group(cursor);
    }

    pub(crate) fn lock_undo(&mut self, locked: bool) {
        self.undo_locked = locked;
    }

    /// Reverts the most recent group. Returns the cursor to restore, or `None`
    /// when there was nothing to undo.
    pub fn undo(&mut self) -> Option<Position> {
        let mut group = self.undo_manager.take_undo()?;
        self.lock_undo(true);
        let cursor = group.replay(self, Direction::Undo);
        self.lock_undo(false);
        self.undo_manager.push_undone(group);
        Some(cursor)
    }

    pub fn redo(&mut self) -> Option<Position> {
        let mut group = self.undo_manager.take_redo()?;
        self.lock_undo(true);
        let cursor = group.replay(self, Direction::Redo);
        self.lock_undo(false);
        self.undo_manager.push_redone(group);
        Some(cursor)
    }

    fn record(&mut self, command: UndoCommand) {
        self.modified = true;
        self.change_tick += 1;
        if !self.undo_locked {
            self.undo_manager.add(command);
        }
    }

    fn check_line(&self, index: usize) {
        assert!(
            index < self.lines.len(),
            "line index {index} out of bounds ({} lines)",
            self.lines.len()
        );
    }

    fn check_column(&self, line: usize, column: usize) {
        self.check_line(line);
        assert!(
            column <= self.lines[line].len(),
            "column {column} out of bounds for line {line} (length {})",
            self.lines[line].len()
        );
    }

    pub fn add_line(&mut self, at: usize, text: &str) {
        assert!(
            at <= self.lines.len(),
            "insert index {at} out of bounds ({} lines)",
            self.lines.len()
        );
        let mut line = Line::from_text(text);
        line.touch();
        self.lines.insert(at, line);
        self.events.push(LineEvent::Inserted { at });
        self.record(UndoCommand::AddLine {
            at,
            text: text.to_string(),
        });
    }

    /// Removes a line and returns its text. The last remaining line is emptied
    /// instead of removed.
    pub fn delete_line(&mut self, at: usize) -> String {
        self.check_line(at);
        if self.lines.len() == 1 {
            let len = self.lines[0].len();
            let old = self.replace_chars(0, 0, len, "");
            self.events.push(LineEvent::Deleted { at: 0 });
            self.events.push(LineEvent::Inserted { at: 0 });
            return old;
        }
        let text = self.lines.remove(at).text();
        self.events.push(LineEvent::Deleted { at });
        self.record(UndoCommand::DeleteLine {
            at,
            text: text.clone(),
        });
        text
    }

    /// Moves line `from` so that it ends up at index `to`.
    pub fn move_line(&mut self, from: usize, to: usize) {
        self.check_line(from);
        self.check_line(to);
        let mut line = self.lines.remove(from);
        line.touch();
        self.lines.insert(to, line);
        self.events.push(LineEvent::Moved { from, to });
        self.record(UndoCommand::MoveLine { from, to });
    }

    pub fn split_line(&mut self, at: usize, column: usize) {
        self.check_column(at, column);
        let tail = self.lines[at].split_off(column);
        self.lines.insert(at + 1, tail);
        self.events.push(LineEvent::Inserted { at: at + 1 });
        self.record(UndoCommand::SplitLine { line: at, column });
    }

    /// Appends line `at + 1` to line `at` verbatim.
    pub fn join_line(&mut self, at: usize) {
        self.check_line(at + 1);
        let column = self.lines[at].len();
        let next = self.lines.remove(at + 1);
        self.lines[at].append(next);
        self.events.push(LineEvent::Joined { at, column });
        self.record(UndoCommand::JoinLine { line: at, column });
    }

    pub fn insert_chars(&mut self, line: usize, column: usize, text: &str) {
        self.check_column(line, column);
        assert!(!text.contains('\n'), "insert_chars text spans lines");
        if text.is_empty() {
            return;
        }
        self.lines[line].insert_str(column, text);
        self.record(UndoCommand::InsertChars {
            line,
            column,
            text: text.to_string(),
        });
    }

    pub fn delete_chars(&mut self, line: usize, column: usize, count: usize) -> String {
        self.check_column(line, column + count);
        if count == 0 {
            return String::new();
        }
        let text = self.lines[line].remove_range(column, column + count);
        self.record(UndoCommand::DeleteChars {
            line,
            column,
            text: text.clone(),
        });
        text
    }

    /// Replaces `[column, end)` on one line with `text`, returning the old text.
    pub fn replace_chars(&mut self, line: usize, column: usize, end: usize, text: &str) -> String {
        self.check_column(line, end);
        assert!(column <= end, "replace range {column}..{end} reversed");
        assert!(!text.contains('\n'), "replace_chars text spans lines");
        let old = self.lines[line].remove_range(column, end);
        self.lines[line].insert_str(column, text);
        self.record(UndoCommand::ReplaceRange {
            line,
            column,
            old: old.clone(),
            new: text.to_string(),
        });
        old
    }

    pub fn replace_char(&mut self, line: usize, column: usize, ch: char) -> char {
        self.check_line(line);
        assert!(
            column < self.lines[line].len(),
            "replace_char column {column} out of bounds"
        );
        let old = self.lines[line].replace_char(column, ch);
        self.record(UndoCommand::ReplaceChar {
            line,
            column,
            old,
            new: ch,
        });
        old
    }

    /// Replaces a whole line's content.
    pub fn set_line(&mut self, line: usize, text: &str) -> String {
        let len = self.line_len(line);
        self.replace_chars(line, 0, len, text)
    }

    /// Inserts possibly multi-line text at `pos` and returns the position just
    /// past it.
    pub fn insert_text(&mut self, pos: Position, text: &str) -> Position {
        let mut cursor = pos;
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                self.split_line(cursor.line, cursor.column);
                cursor = Position::new(cursor.line + 1, 0);
            }
            self.insert_chars(cursor.line, cursor.column, piece);
            cursor.column += piece.chars().count();
        }
        cursor
    }

    /// Deletes the text between two positions, `end` exclusive, and returns it.
    pub fn delete_range(&mut self, start: Position, end: Position) -> String {
        if start.line == end.line {
            return self.delete_chars(start.line, start.column, end.column - start.column);
        }
        let removed = self.text_range(start, end);
        let head_len = self.line_len(start.line) - start.column;
        self.delete_chars(start.line, start.column, head_len);
        self.delete_chars(end.line, 0, end.column);
        for _ in start.line + 1..end.line {
            self.delete_line(start.line + 1);
        }
        self.join_line(start.line);
        removed
    }

    /// Clears every annotation, then re-runs `highlighter` over all lines.
    pub fn highlight(&mut self, highlighter: &mut dyn SyntaxHighlighter) {
        for line in &mut self.lines {
            line.clear_styles();
        }
        highlighter.init();
        for row in 0..self.lines.len() {
            let text = self.lines[row].text();
            let mut sink = StyleSink {
                lines: &mut self.lines,
            };
            highlighter.process_line(row, &text, &mut sink);
        }
    }

    /// Replaces the buffer with the contents of `path`, returning the line
    /// count. An empty path starts a new, unnamed buffer without touching the
    /// filesystem.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        if path.as_os_str().is_empty() {
            self.reset(vec![Line::new()]);
            self.filename = None;
            self.line_ending = LineEnding::default();
            return Ok(1);
        }
        let content = read_regular_file(path)?;
        let line_ending = LineEnding::detect(&content);
        let mut lines: Vec<Line> = split_lines(&content)
            .iter()
            .map(|l| Line::from_text(l))
            .collect();
        if lines.is_empty() {
            lines.push(Line::new());
        }
        let count = lines.len();
        self.reset(lines);
        self.filename = Some(path.to_path_buf());
        self.line_ending = line_ending;
        info!(
            target: "editor.io",
            path = %path.display(),
            lines = count,
            bytes = content.len(),
            "loaded"
        );
        Ok(count)
    }

    /// Replaces every line, keeping the file name. History is dropped, as
    /// with `load`, and the buffer counts as modified.
    pub fn replace_all(&mut self, lines: &[String]) {
        let mut lines: Vec<Line> = lines.iter().map(|l| Line::from_text(l)).collect();
        if lines.is_empty() {
            lines.push(Line::new());
        }
        self.reset(lines);
        self.modified = true;
    }

    fn reset(&mut self, lines: Vec<Line>) {
        self.lines = lines;
        for line in &mut self.lines {
            line.touch();
        }
        self.undo_manager.clear();
        self.modified = false;
        self.change_tick += 1;
        self.events.push(LineEvent::Reset);
    }

    /// Writes lines `range` (inclusive, 0-based; whole buffer when `None`) to
    /// `path`, returning `(lines, bytes)` written. A full write clears the
    /// modified flag.
    pub fn save(
        &mut self,
        path: &Path,
        range: Option<(usize, usize)>,
        append: bool,
    ) -> Result<(usize, usize)> {
        if path.exists() && !path.is_file() {
            error!(target: "editor.io", path = %path.display(), "not a regular file");
            return Err(EditorError::NotRegularFile(path.to_path_buf()));
        }
        let (first, last) = range.unwrap_or((0, self.lines.len() - 1));
        let content = self.render_lines(first, last);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        file.write_all(content.as_bytes())?;
        let count = last - first + 1;
        if range.is_none() && !append {
            self.modified = false;
            if self.filename.is_none() {
                self.filename = Some(path.to_path_buf());
            }
        }
        info!(
            target: "editor.io",
            path = %path.display(),
            lines = count,
            bytes = content.len(),
            "saved"
        );
        Ok((count, content.len()))
    }

    /// Lines `[first, last]`, each followed by the document's terminator.
    pub fn render_lines(&self, first: usize, last: usize) -> String {
        let ending = self.line_ending.as_str();
        let mut out = String::new();
        for line in &self.lines[first..=last] {
            out.push_str(&line.text());
            out.push_str(ending);
        }
        out
    }

    /// Inserts the lines of `path` starting at index `at` as one undo step.
    /// Returns the number of lines inserted.
    pub fn add_file_lines(&mut self, path: &Path, at: usize) -> Result<usize> {
        let content = read_regular_file(path)?;
        let lines = split_lines(&content);
        self.insert_lines(at, &lines);
        info!(
            target: "editor.io",
            path = %path.display(),
            lines = lines.len(),
            at,
            "read into buffer"
        );
        Ok(lines.len())
    }

    /// Inserts `lines` starting at index `at` as one undo step.
    pub fn insert_lines(&mut self, at: usize, lines: &[String]) {
        let cursor = Position::new(at.min(self.lines.len() - 1), 0);
        self.start_group(cursor);
        for (i, text) in lines.iter().enumerate() {
            self.add_line(at + i, text);
        }
        let last = (at + lines.len()).saturating_sub(1).min(self.lines.len() - 1);
        self.end_group(Position::new(last, 0));
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

struct StyleSink<'a> {
    lines: &'a mut [Line],
}

impl TokenSink for StyleSink<'_> {
    fn add_token(&mut self, line: usize, col_start: usize, text: &str, kind: TokenKind) {
        if let Some(target) = self.lines.get_mut(line) {
            for col in col_start..col_start + text.chars().count() {
                target.set_style(col, kind);
            }
        }
    }
}

fn read_regular_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(EditorError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(EditorError::NotRegularFile(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Splits file content into lines, dropping CRs and the final terminator.
pub fn split_lines(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let body = normalized.strip_suffix('\n').unwrap_or(&normalized);
    body.split('\n').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_model::syntax::testing::DigitHighlighter;
    use tempfile::tempdir;

    fn doc(lines: &[&str]) -> Document {
        Document::from_lines(lines.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_new_document_has_one_line() {
        let d = Document::new();
        assert_eq!(d.line_count(), 1);
        assert_eq!(d.line_text(0), "");
        assert!(!d.is_modified());
    }

    #[test]
    fn test_deleting_only_line_leaves_empty_line() {
        let mut d = doc(&["only"]);
        assert_eq!(d.delete_line(0), "only");
        assert_eq!(d.line_count(), 1);
        assert_eq!(d.line_text(0), "");
        d.undo();
        assert_eq!(d.text(), "only");
    }

    #[test]
    fn test_insert_then_delete_is_noop() {
        let mut d = doc(&["hello world"]);
        d.insert_chars(0, 5, ", big");
        d.delete_chars(0, 5, 5);
        assert_eq!(d.text(), "hello world");
    }

    #[test]
    fn test_split_and_join() {
        let mut d = doc(&["abcdef"]);
        d.split_line(0, 3);
        assert_eq!(d.text(), "abc\ndef");
        d.join_line(0);
        assert_eq!(d.text(), "abcdef");
        assert_eq!(
            d.take_events(),
            vec![
                LineEvent::Inserted { at: 1 },
                LineEvent::Joined { at: 0, column: 3 }
            ]
        );
    }

    #[test]
    fn test_move_line() {
        let mut d = doc(&["A", "B", "C"]);
        d.move_line(0, 2);
        assert_eq!(d.text(), "B\nC\nA");
        d.undo();
        assert_eq!(d.text(), "A\nB\nC");
    }

    #[test]
    fn test_delete_range_across_lines() {
        let mut d = doc(&["one two", "three", "four five"]);
        d.start_group(Position::new(0, 4));
        let removed = d.delete_range(Position::new(0, 4), Position::new(2, 5));
        d.end_group(Position::new(0, 4));
        assert_eq!(removed, "two\nthree\nfour ");
        assert_eq!(d.text(), "one five");
        d.undo();
        assert_eq!(d.text(), "one two\nthree\nfour five");
    }

    #[test]
    fn test_insert_text_with_newlines() {
        let mut d = doc(&["ad"]);
        let end = d.insert_text(Position::new(0, 1), "b\nc");
        assert_eq!(d.text(), "ab\ncd");
        assert_eq!(end, Position::new(1, 1));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_bad_index_panics() {
        let mut d = doc(&["abc"]);
        d.delete_chars(0, 2, 5);
    }

    #[test]
    fn test_undo_does_not_record() {
        let mut d = doc(&["x"]);
        d.insert_chars(0, 1, "y");
        d.undo();
        assert_eq!(d.undo_manager().undo_depth(), 0);
        assert_eq!(d.undo_manager().redo_depth(), 1);
    }

    #[test]
    fn test_highlight_applies_and_clears_styles() {
        let mut d = doc(&["fn 42", "x"]);
        let mut hl = DigitHighlighter::default();
        d.highlight(&mut hl);
        assert_eq!(hl.inits, 1);
        assert_eq!(d.get_line(0).style_at(0), Some(TokenKind::Keyword));
        assert_eq!(d.get_line(0).style_at(3), Some(TokenKind::Number));
        assert_eq!(d.get_line(0).style_at(2), None);
        d.set_line(0, "none");
        d.highlight(&mut hl);
        assert_eq!(d.get_line(0).styles().count(), 0);
    }

    #[test]
    fn test_load_strips_cr_and_detects_ending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dos.txt");
        fs::write(&path, "one\r\ntwo\r\n").unwrap();
        let mut d = Document::new();
        d.insert_chars(0, 0, "junk");
        assert_eq!(d.load(&path).unwrap(), 2);
        assert_eq!(d.text(), "one\ntwo");
        assert_eq!(d.line_ending, LineEnding::Windows);
        assert!(!d.undo_manager().can_undo());
        assert!(!d.is_modified());
    }

    #[test]
    fn test_load_missing_file_leaves_buffer() {
        let dir = tempdir().unwrap();
        let mut d = doc(&["keep"]);
        let err = d.load(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, EditorError::FileNotFound(_)));
        assert_eq!(d.text(), "keep");
    }

    #[test]
    fn test_load_directory_fails() {
        let dir = tempdir().unwrap();
        let mut d = doc(&["keep"]);
        let err = d.load(dir.path()).unwrap_err();
        assert!(matches!(err, EditorError::NotRegularFile(_)));
        assert_eq!(d.text(), "keep");
        assert!(d.save(dir.path(), None, false).is_err());
    }

    #[test]
    fn test_load_empty_path_starts_new_buffer() {
        let mut d = doc(&["a", "b"]);
        d.insert_chars(0, 0, "z");
        assert_eq!(d.load(Path::new("")).unwrap(), 1);
        assert_eq!(d.line_count(), 1);
        assert_eq!(d.line_text(0), "");
        assert!(d.filename.is_none());
        assert!(!d.undo_manager().can_undo());
    }

    #[test]
    fn test_save_writes_trailing_newlines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut d = doc(&["a", "b"]);
        d.set_modified(true);
        let (lines, bytes) = d.save(&path, None, false).unwrap();
        assert_eq!((lines, bytes), (2, 4));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
        assert!(!d.is_modified());
        d.save(&path, Some((0, 0)), true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\na\n");
    }

    #[test]
    fn test_add_file_lines_is_one_undo_step() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "x\ny\n").unwrap();
        let mut d = doc(&["a", "b"]);
        assert_eq!(d.add_file_lines(&path, 1).unwrap(), 2);
        assert_eq!(d.text(), "a\nx\ny\nb");
        d.undo();
        assert_eq!(d.text(), "a\nb");
    }
}

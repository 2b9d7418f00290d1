use crate::config::Settings;
use crate::controller::command::CommandController;
use crate::controller::command_types::Mode;
use crate::controller::insert::InsertController;
use crate::controller::interface::{Interface, NullInterface, ProcessRunner, ShellRunner};
use crate::controller::key::KeyEvent;
use crate::controller::normal::NormalController;
use crate::controller::shared_state::{ModeController, ModeTransition, SharedEditorState};
use crate::controller::visual::VisualController;
use crate::document_model::{Document, MarkManager, Position, Selection, SyntaxHighlighter};
use crate::ex::{self, ExOutcome};
use std::path::Path;
use tracing::{debug, trace};

/// The modal editing engine.
///
/// Hosts feed keys with [`Editor::process_key`] or ex lines with
/// [`Editor::run_ex_command`]; both run to completion, report failures
/// through the host's error channel and return `false` when something went
/// wrong. Nothing panics across this boundary on bad input.
pub struct Editor {
    shared: SharedEditorState,
    mode: Mode,

    // Mode-specific controllers
    normal: NormalController,
    insert: InsertController,
    visual: VisualController,
    command: CommandController,

    quit: bool,
    /// Keys of the change being typed, from the first key in normal mode.
    recording: Option<Vec<KeyEvent>>,
    record_tick: u64,
    last_change: Vec<KeyEvent>,
    replaying: bool,
}

impl Editor {
    pub fn new() -> Self {
        Self::with_interface(Box::new(NullInterface))
    }

    pub fn with_interface(interface: Box<dyn Interface>) -> Self {
        Self {
            shared: SharedEditorState::new(interface, Box::new(ShellRunner)),
            mode: Mode::Normal,
            normal: NormalController::new(),
            insert: InsertController::new(),
            visual: VisualController::new(),
            command: CommandController::new(),
            quit: false,
            recording: None,
            record_tick: 0,
            last_change: Vec::new(),
            replaying: false,
        }
    }

    /// Replaces the runner used for `!` filters and `:r !cmd`.
    pub fn with_runner(mut self, runner: Box<dyn ProcessRunner>) -> Self {
        self.shared.runner = runner;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.shared.document.line_ending = settings.fileformat;
        self.shared.settings = settings;
        self
    }

    /// Dispatches one key. Returns false if the key was rejected or the
    /// command it completed failed.
    pub fn process_key(&mut self, key: KeyEvent) -> bool {
        trace!(target: "editor.keys", key = %key, mode = self.mode.name(), "key");
        let mode_before = self.mode;
        let cursor_before = self.shared.cursor;
        let tick_before = self.shared.document.change_tick();

        if !self.replaying
            && self.recording.is_none()
            && self.mode == Mode::Normal
            && self.normal.is_idle()
        {
            self.recording = Some(Vec::new());
            self.record_tick = tick_before;
        }
        if let Some(keys) = self.recording.as_mut() {
            keys.push(key);
        }

        let transition = match self.mode {
            Mode::Normal => self.normal.handle_key(key, &mut self.shared),
            Mode::Insert | Mode::Replace => self.insert.handle_key(key, &mut self.shared),
            Mode::VisualChar | Mode::VisualLine | Mode::VisualBlock => {
                self.visual.handle_key(key, &mut self.shared)
            }
            Mode::CommandLine => self.command.handle_key(key, &mut self.shared),
        };
        self.apply_transition(transition);
        self.settle(mode_before, cursor_before, tick_before);

        if self.mode == Mode::Normal && self.normal.is_idle() {
            if let Some(keys) = self.recording.take() {
                if self.shared.document.change_tick() != self.record_tick && is_repeatable(&keys) {
                    debug!(target: "editor.keys", keys = keys.len(), "recorded change for repeat");
                    self.last_change = keys;
                }
            }
        }
        if let Some(count) = self.shared.repeat_request.take() {
            self.repeat_last_change(count);
        }
        !self.shared.take_error_flag()
    }

    /// Feeds a sequence in vi key notation (`"dw"`, `"ihello<Esc>"`). Every
    /// key is processed; returns false if any of them failed.
    pub fn process_keys(&mut self, keys: &str) -> bool {
        let keys = match KeyEvent::parse_sequence(keys) {
            Ok(keys) => keys,
            Err(e) => {
                self.shared.report_error(&e);
                self.shared.take_error_flag();
                return false;
            }
        };
        let mut ok = true;
        for key in keys {
            ok &= self.process_key(key);
        }
        ok
    }

    /// Runs one ex command line. While `:a`, `:i` or `:c` is collecting text,
    /// each call supplies one input line instead.
    pub fn run_ex_command(&mut self, line: &str) -> bool {
        let mode_before = self.mode;
        let cursor_before = self.shared.cursor;
        let tick_before = self.shared.document.change_tick();
        let result = if self.shared.ex_input.is_some() {
            ex::feed_input(&mut self.shared, line).map(|_| ExOutcome::Continue)
        } else {
            ex::execute(&mut self.shared, line)
        };
        match result {
            Ok(ExOutcome::Quit) => self.apply_transition(ModeTransition::Quit),
            Ok(ExOutcome::Continue) => {}
            Err(e) => self.shared.report_error(&e),
        }
        self.settle(mode_before, cursor_before, tick_before);
        !self.shared.take_error_flag()
    }

    /// Replays the last change, with `count` replacing its original count.
    fn repeat_last_change(&mut self, count: Option<usize>) {
        let mut keys = self.last_change.clone();
        if keys.is_empty() {
            return;
        }
        if let Some(count) = count {
            let digits = keys
                .iter()
                .take_while(|k| k.plain_char().is_some_and(|c| c.is_ascii_digit()))
                .count();
            let mut counted: Vec<KeyEvent> =
                count.to_string().chars().map(KeyEvent::char).collect();
            counted.extend_from_slice(&keys[digits..]);
            keys = counted;
        }
        debug!(target: "editor.keys", keys = keys.len(), "repeating last change");
        self.replaying = true;
        for key in keys {
            self.process_key(key);
        }
        self.replaying = false;
    }

    fn apply_transition(&mut self, transition: ModeTransition) {
        match transition {
            ModeTransition::Stay => {}
            ModeTransition::Quit => {
                self.quit = true;
                self.mode = Mode::Normal;
                self.shared.interface.quit();
            }
            ModeTransition::ToMode(mode) => {
                match mode {
                    Mode::Insert => self.insert.begin(&mut self.shared, false),
                    Mode::Replace => self.insert.begin(&mut self.shared, true),
                    Mode::CommandLine => self.command.begin(&mut self.shared),
                    Mode::Normal => self.normal.reset(),
                    Mode::VisualChar | Mode::VisualLine | Mode::VisualBlock => {}
                }
                self.mode = mode;
            }
        }
    }

    /// Post-command bookkeeping: marks follow line changes, the cursor stays
    /// valid for the mode, and the host hears about what changed.
    fn settle(&mut self, mode_before: Mode, cursor_before: Position, tick_before: u64) {
        self.shared.sync();
        self.shared.clamp_cursor(self.mode.allows_extra_line_char());
        if self.mode != mode_before {
            trace!(
                target: "editor.keys",
                from = mode_before.name(),
                to = self.mode.name(),
                "mode change"
            );
            self.shared.interface.state_changed();
        }
        if self.shared.cursor != cursor_before {
            self.shared.interface.position_changed();
        }
        if self.shared.document.change_tick() != tick_before {
            self.shared.interface.update_syntax();
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cursor(&self) -> Position {
        self.shared.cursor
    }

    pub fn set_cursor(&mut self, pos: Position) {
        self.shared.cursor = self.shared.clamp_position(pos);
        self.shared.clamp_cursor(self.mode.allows_extra_line_char());
        self.shared.desired_column = None;
    }

    pub fn document(&self) -> &Document {
        &self.shared.document
    }

    /// Direct buffer access for hosts. Edits made here bypass marks and
    /// dot-repeat.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.shared.document
    }

    /// Buffer contents, one string per line.
    pub fn lines(&self) -> Vec<String> {
        (0..self.shared.document.line_count())
            .map(|i| self.shared.document.line_text(i))
            .collect()
    }

    pub fn text(&self) -> String {
        self.shared.document.text()
    }

    pub fn status_message(&self) -> &str {
        &self.shared.status_message
    }

    /// Lines printed by `:p`, `:n`, `:l`, `:=` and friends since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.shared.output)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.shared.selection
    }

    /// The command line as typed so far, while in command-line mode.
    pub fn command_line(&self) -> Option<String> {
        (self.mode == Mode::CommandLine).then(|| self.command.text())
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.shared.settings
    }

    pub fn marks(&self) -> &MarkManager {
        &self.shared.mark_manager
    }

    /// Text of register `name` (`'"'` for the default one).
    pub fn register_text(&mut self, name: char) -> Option<String> {
        self.shared
            .register_manager
            .get(Some(name))
            .ok()
            .map(|r| r.text())
    }

    pub fn has_quit(&self) -> bool {
        self.quit
    }

    /// Replaces the buffer with `path`. An empty path starts a new buffer.
    pub fn load(&mut self, path: &Path) -> bool {
        match self.shared.document.load(path) {
            Ok(lines) => {
                self.shared.cursor = Position::default();
                self.shared.desired_column = None;
                self.shared.sync();
                if !path.as_os_str().is_empty() {
                    self.shared
                        .message(format!("\"{}\" {lines} lines", path.display()));
                }
                self.shared.interface.state_changed();
                self.shared.interface.update_syntax();
                true
            }
            Err(e) => {
                self.shared.report_error(&e);
                self.shared.take_error_flag();
                false
            }
        }
    }

    pub fn save(&mut self, path: &Path) -> bool {
        match self.shared.document.save(path, None, false) {
            Ok((lines, bytes)) => {
                self.shared
                    .message(format!("\"{}\" {lines}L, {bytes}B written", path.display()));
                true
            }
            Err(e) => {
                self.shared.report_error(&e);
                self.shared.take_error_flag();
                false
            }
        }
    }

    /// Inserts the lines of `path` before line index `at`, as one undo step.
    pub fn add_file_lines(&mut self, path: &Path, at: usize) -> bool {
        let at = at.min(self.shared.document.line_count());
        match self.shared.document.add_file_lines(path, at) {
            Ok(_) => {
                self.shared.sync();
                self.shared.interface.update_syntax();
                true
            }
            Err(e) => {
                self.shared.report_error(&e);
                self.shared.take_error_flag();
                false
            }
        }
    }

    pub fn undo(&mut self) -> bool {
        self.history(true)
    }

    pub fn redo(&mut self) -> bool {
        self.history(false)
    }

    fn history(&mut self, undo: bool) -> bool {
        let restored = if undo {
            self.shared.document.undo()
        } else {
            self.shared.document.redo()
        };
        let Some(pos) = restored else {
            return false;
        };
        self.shared.sync();
        self.shared.cursor = self.shared.clamp_position(pos);
        self.shared.clamp_cursor(self.mode.allows_extra_line_char());
        self.shared.interface.position_changed();
        self.shared.interface.update_syntax();
        true
    }

    /// Recomputes style annotations for the whole buffer.
    pub fn highlight(&mut self, highlighter: &mut dyn SyntaxHighlighter) {
        self.shared.interface.set_ignore_changed(true);
        self.shared.document.highlight(highlighter);
        self.shared.interface.set_ignore_changed(false);
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

/// Changes started from these keys are never repeated by `.`.
fn is_repeatable(keys: &[KeyEvent]) -> bool {
    let mut rest = keys;
    // Skip the count and register prefixes.
    loop {
        match rest.first().and_then(KeyEvent::plain_char) {
            Some(c) if c.is_ascii_digit() => rest = &rest[1..],
            Some('"') => rest = rest.get(2..).unwrap_or(&[]),
            _ => break,
        }
    }
    match rest.first() {
        Some(key) if key.ctrl_char() == Some('r') => false,
        Some(key) => !matches!(key.plain_char(), Some(':' | 'u' | '.' | '/' | '?')),
        None => false,
    }
}

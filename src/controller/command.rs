use crate::controller::command_types::{Mode, Motion};
use crate::controller::key::KeyEvent;
use crate::controller::motions;
use crate::controller::operators;
use crate::controller::shared_state::{
    CommandLineKind, ModeController, ModeTransition, PendingOperator, SharedEditorState,
};
use crate::error::Result;
use crate::ex::{self, ExOutcome};
use crossterm::event::KeyCode;
use tracing::debug;

/// The `:`, `/` and `?` prompt, plus the text-input lines of `:a`/`:i`/`:c`.
#[derive(Default)]
pub struct CommandController {
    kind: CommandLineKind,
    buffer: String,
    operator: Option<PendingOperator>,
}

impl CommandController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, shared: &mut SharedEditorState) {
        let request = shared.command_line_request.take().unwrap_or_default();
        self.kind = if shared.ex_input.is_some() {
            CommandLineKind::Input
        } else {
            request.kind
        };
        self.buffer = request.text;
        self.operator = request.operator;
    }

    /// The prompt as a host would display it.
    pub fn text(&self) -> String {
        let prefix = match self.kind {
            CommandLineKind::Ex => ":".to_string(),
            CommandLineKind::Search(direction) => direction.delimiter().to_string(),
            CommandLineKind::Input => String::new(),
        };
        format!("{prefix}{}", self.buffer)
    }

    fn cancel(&mut self, shared: &mut SharedEditorState) -> ModeTransition {
        self.buffer.clear();
        self.operator = None;
        if self.kind == CommandLineKind::Input {
            // Leaving input mode keeps the lines collected so far.
            if let Err(e) = ex::feed_input(shared, ".") {
                shared.report_error(&e);
            }
        }
        ModeTransition::ToMode(Mode::Normal)
    }

    fn submit(&mut self, shared: &mut SharedEditorState) -> ModeTransition {
        let line = std::mem::take(&mut self.buffer);
        debug!(target: "editor.ex", kind = ?self.kind, line = %line, "command line submitted");
        match self.kind {
            CommandLineKind::Ex => match ex::execute(shared, &line) {
                Ok(ExOutcome::Quit) => ModeTransition::Quit,
                Ok(ExOutcome::Continue) if shared.ex_input.is_some() => {
                    self.kind = CommandLineKind::Input;
                    ModeTransition::Stay
                }
                Ok(ExOutcome::Continue) => ModeTransition::ToMode(Mode::Normal),
                Err(e) => {
                    shared.report_error(&e);
                    ModeTransition::ToMode(Mode::Normal)
                }
            },
            CommandLineKind::Input => match ex::feed_input(shared, &line) {
                Ok(true) => ModeTransition::Stay,
                Ok(false) => ModeTransition::ToMode(Mode::Normal),
                Err(e) => {
                    shared.report_error(&e);
                    ModeTransition::ToMode(Mode::Normal)
                }
            },
            CommandLineKind::Search(direction) => {
                let motion = Motion::Search {
                    direction,
                    pattern: line,
                };
                let result = match self.operator.take() {
                    Some(pending) => search_operator(shared, pending, &motion),
                    None => motions::move_cursor(shared, &motion, None)
                        .map(|_| ModeTransition::ToMode(Mode::Normal)),
                };
                result.unwrap_or_else(|e| {
                    shared.report_error(&e);
                    ModeTransition::ToMode(Mode::Normal)
                })
            }
        }
    }
}

/// `d/pattern<CR>` and friends.
fn search_operator(
    shared: &mut SharedEditorState,
    pending: PendingOperator,
    motion: &Motion,
) -> Result<ModeTransition> {
    let start = shared.cursor;
    let Some(target) = motions::resolve_motion(shared, motion, pending.count, true)? else {
        return Ok(ModeTransition::ToMode(Mode::Normal));
    };
    let bounds = operators::motion_region(&shared.document, start, target, motion);
    shared.begin_edit();
    let result = operators::apply_operator(shared, pending.op, bounds, pending.register, 1);
    match result {
        Ok(ModeTransition::ToMode(Mode::Insert)) => Ok(ModeTransition::ToMode(Mode::Insert)),
        Ok(ModeTransition::ToMode(mode)) => {
            shared.end_edit();
            Ok(ModeTransition::ToMode(mode))
        }
        Ok(_) => {
            shared.end_edit();
            Ok(ModeTransition::ToMode(Mode::Normal))
        }
        Err(e) => {
            shared.end_edit();
            Err(e)
        }
    }
}

impl ModeController for CommandController {
    fn handle_key(&mut self, key: KeyEvent, shared: &mut SharedEditorState) -> ModeTransition {
        if let Some(c) = key.ctrl_char() {
            match c {
                'c' | '[' => return self.cancel(shared),
                'u' => self.buffer.clear(),
                'w' => {
                    let trimmed = self.buffer.trim_end().len();
                    self.buffer.truncate(trimmed);
                    let keep = self
                        .buffer
                        .rfind(|c: char| !(c.is_alphanumeric() || c == '_'))
                        .map(|i| i + self.buffer[i..].chars().next().map_or(1, char::len_utf8))
                        .unwrap_or(0);
                    self.buffer.truncate(keep);
                }
                'h' => return self.handle_key(KeyEvent::code(KeyCode::Backspace), shared),
                'j' | 'm' => return self.submit(shared),
                _ => {}
            }
            return ModeTransition::Stay;
        }
        match key.code {
            KeyCode::Esc => self.cancel(shared),
            KeyCode::Enter => self.submit(shared),
            KeyCode::Backspace => {
                if self.buffer.pop().is_none() && self.kind != CommandLineKind::Input {
                    return self.cancel(shared);
                }
                ModeTransition::Stay
            }
            _ => {
                if let Some(c) = key.text() {
                    self.buffer.push(c);
                }
                ModeTransition::Stay
            }
        }
    }
}

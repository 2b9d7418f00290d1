#![allow(dead_code)] // Each test binary uses a subset of these helpers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use vi_engine::{Document, Editor, EditorError, Interface, ProcessRunner, Result};

/// Everything the engine told the host.
#[derive(Debug, Default)]
pub struct HostLog {
    pub messages: Vec<String>,
    pub errors: Vec<String>,
    pub state_changes: usize,
    pub position_changes: usize,
    pub selection_changes: usize,
    pub syntax_updates: usize,
    pub marks_shown: usize,
    pub registers_shown: usize,
    pub options: Vec<(String, Option<String>)>,
    pub scrolled_to: Vec<usize>,
    pub quit: bool,
}

/// A host that records every callback and accepts the options it is told to.
pub struct RecordingInterface {
    log: Rc<RefCell<HostLog>>,
    accepted_options: Vec<String>,
    page_length: usize,
}

impl RecordingInterface {
    pub fn new() -> (Self, Rc<RefCell<HostLog>>) {
        let log = Rc::new(RefCell::new(HostLog::default()));
        (
            Self {
                log: Rc::clone(&log),
                accepted_options: Vec::new(),
                page_length: 10,
            },
            log,
        )
    }

    pub fn accepting(mut self, option: &str) -> Self {
        self.accepted_options.push(option.to_string());
        self
    }
}

impl Interface for RecordingInterface {
    fn get_page_length(&self) -> usize {
        self.page_length
    }

    fn scroll_top(&mut self, line: usize) {
        self.log.borrow_mut().scrolled_to.push(line);
    }

    fn state_changed(&mut self) {
        self.log.borrow_mut().state_changes += 1;
    }

    fn position_changed(&mut self) {
        self.log.borrow_mut().position_changes += 1;
    }

    fn selection_changed(&mut self) {
        self.log.borrow_mut().selection_changes += 1;
    }

    fn display_marks(&mut self) {
        self.log.borrow_mut().marks_shown += 1;
    }

    fn display_registers(&mut self) {
        self.log.borrow_mut().registers_shown += 1;
    }

    fn update_syntax(&mut self) {
        self.log.borrow_mut().syntax_updates += 1;
    }

    fn quit(&mut self) {
        self.log.borrow_mut().quit = true;
    }

    fn show_message(&mut self, message: &str) {
        self.log.borrow_mut().messages.push(message.to_string());
    }

    fn show_error(&mut self, message: &str) {
        self.log.borrow_mut().errors.push(message.to_string());
    }

    fn set_option(&mut self, name: &str, value: Option<&str>) -> bool {
        if !self.accepted_options.iter().any(|o| o == name) {
            return false;
        }
        self.log
            .borrow_mut()
            .options
            .push((name.to_string(), value.map(str::to_string)));
        true
    }
}

/// Stands in for the shell: answers from a table and records every call.
/// The command `upper` upper-cases its input; `sort` sorts its lines.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    pub calls: Rc<RefCell<Vec<(String, String)>>>,
    replies: HashMap<String, String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, command: &str, output: &str) -> Self {
        self.replies.insert(command.to_string(), output.to_string());
        self
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&mut self, command: &str, input: &str) -> Result<String> {
        self.calls
            .borrow_mut()
            .push((command.to_string(), input.to_string()));
        match command {
            "upper" => Ok(input.to_uppercase()),
            "sort" => {
                let mut lines: Vec<&str> = input.lines().collect();
                lines.sort_unstable();
                Ok(lines.iter().map(|l| format!("{l}\n")).collect())
            }
            _ => self
                .replies
                .get(command)
                .cloned()
                .ok_or_else(|| EditorError::ExternalCommand(format!("{command}: not found"))),
        }
    }
}

pub fn set_lines(editor: &mut Editor, lines: &[&str]) {
    *editor.document_mut() = Document::from_lines(lines.iter().map(|s| s.to_string()).collect());
}

/// An editor on `lines` with a recording host and the scripted runner.
pub fn editor_with(lines: &[&str]) -> (Editor, Rc<RefCell<HostLog>>) {
    let (interface, log) = RecordingInterface::new();
    let mut editor =
        Editor::with_interface(Box::new(interface)).with_runner(Box::new(ScriptedRunner::new()));
    set_lines(&mut editor, lines);
    (editor, log)
}

/// An editor on `lines` with a null host.
pub fn plain_editor(lines: &[&str]) -> Editor {
    let mut editor = Editor::new().with_runner(Box::new(ScriptedRunner::new()));
    set_lines(&mut editor, lines);
    editor
}

use crate::error::{EditorError, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, error};

/// Callbacks the editor makes into its host.
///
/// Every method has a do-nothing default so hosts only implement what they
/// display. Calls happen synchronously from inside `process_key` and
/// `run_ex_command`; implementations must not call back into the editor.
pub trait Interface {
    /// First buffer line visible in the host's window.
    fn get_page_top(&self) -> usize {
        0
    }

    /// Last buffer line visible in the host's window.
    fn get_page_bottom(&self) -> usize {
        self.get_page_top() + self.get_page_length().saturating_sub(1)
    }

    /// Number of lines the window shows.
    fn get_page_length(&self) -> usize {
        24
    }

    /// Scroll so that `line` is at the top, middle or bottom of the window.
    fn scroll_top(&mut self, _line: usize) {}
    fn scroll_middle(&mut self, _line: usize) {}
    fn scroll_bottom(&mut self, _line: usize) {}

    /// Mode or buffer-wide state changed; the host should repaint.
    fn state_changed(&mut self) {}
    fn position_changed(&mut self) {}
    fn selection_changed(&mut self) {}
    fn display_marks(&mut self) {}
    fn display_registers(&mut self) {}

    /// Lines changed; styles need recomputing.
    fn update_syntax(&mut self) {}

    fn set_ignore_changed(&mut self, _ignore: bool) {}
    fn quit(&mut self) {}

    fn get_tab_stop(&self) -> usize {
        8
    }

    fn show_message(&mut self, _message: &str) {}
    fn show_error(&mut self, _message: &str) {}

    /// Offered any `:set` option the engine does not know. Return true to
    /// accept it.
    fn set_option(&mut self, _name: &str, _value: Option<&str>) -> bool {
        false
    }
}

/// A host that ignores every callback.
#[derive(Debug, Default)]
pub struct NullInterface;

impl Interface for NullInterface {}

/// Runs an external command with `input` on stdin and returns its stdout.
pub trait ProcessRunner {
    fn run(&mut self, command: &str, input: &str) -> Result<String>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Default)]
pub struct ShellRunner;

impl ProcessRunner for ShellRunner {
    fn run(&mut self, command: &str, input: &str) -> Result<String> {
        debug!(target: "editor.process", command, input_bytes = input.len(), "spawning");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // A command that exits without reading its input closes the pipe.
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                target: "editor.process",
                command,
                status = ?output.status.code(),
                "command failed"
            );
            return Err(EditorError::ExternalCommand(if stderr.is_empty() {
                format!("{command}: exit status {}", output.status.code().unwrap_or(-1))
            } else {
                stderr
            }));
        }
        debug!(target: "editor.process", command, output_bytes = output.stdout.len(), "finished");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

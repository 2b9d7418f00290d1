use crate::error::{EditorError, Result};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterType {
    Character, // Text within lines
    Line,      // Complete lines
    Block,     // Rectangular block (visual block mode), one fragment per row
}

/// One piece of yanked or deleted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub whole_line: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub fragments: Vec<Fragment>,
    pub kind: RegisterType,
}

impl Register {
    pub fn characters(text: impl Into<String>) -> Self {
        Self {
            fragments: vec![Fragment {
                text: text.into(),
                whole_line: false,
            }],
            kind: RegisterType::Character,
        }
    }

    pub fn lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            fragments: lines
                .into_iter()
                .map(|l| Fragment {
                    text: l.into(),
                    whole_line: true,
                })
                .collect(),
            kind: RegisterType::Line,
        }
    }

    pub fn block<S: Into<String>>(rows: impl IntoIterator<Item = S>) -> Self {
        Self {
            fragments: rows
                .into_iter()
                .map(|r| Fragment {
                    text: r.into(),
                    whole_line: false,
                })
                .collect(),
            kind: RegisterType::Block,
        }
    }

    /// Plain text: linewise and block fragments are joined by newlines,
    /// character fragments are concatenated.
    pub fn text(&self) -> String {
        match self.kind {
            RegisterType::Character => self.fragments.iter().map(|f| f.text.as_str()).collect(),
            RegisterType::Line | RegisterType::Block => self
                .fragments
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// The register as a list of whole lines, as `:put` inserts it.
    pub fn as_lines(&self) -> Vec<String> {
        self.text().split('\n').map(str::to_string).collect()
    }

    /// Deletes of whole lines or spanning lines go to the numbered history.
    fn is_multiline(&self) -> bool {
        self.kind == RegisterType::Line || self.fragments.iter().any(|f| f.text.contains('\n'))
    }

    fn append(&mut self, other: Register) {
        if self.kind != other.kind {
            self.kind = if self.kind == RegisterType::Line || other.kind == RegisterType::Line {
                RegisterType::Line
            } else {
                RegisterType::Character
            };
        }
        self.fragments.extend(other.fragments);
    }
}

/// Whether text entered a register through a yank or a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAction {
    Yank,
    Delete,
}

pub const DEFAULT_REGISTER: char = '\0';

/// The register file: default, `a-z`, `0-9`, `-`, and the clipboard
/// registers `*`/`+`.
///
/// Writes are staged with [`RegisterManager::record`] and land on
/// [`RegisterManager::commit`], which the editor calls when the outermost
/// undo group closes. Every piece of text removed by one command thus ends up
/// in the registers together.
#[derive(Default)]
pub struct RegisterManager {
    registers: BTreeMap<char, Register>,
    pending: Option<(Option<char>, RegisterAction, Register)>,
    clipboard: Option<arboard::Clipboard>,
}

impl RegisterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_name(name: char) -> bool {
        name.is_ascii_alphanumeric()
            || matches!(name, '"' | '-' | '*' | '+' | '_' | DEFAULT_REGISTER)
    }

    /// Stages text for the register `name` (default when `None`).
    pub fn record(&mut self, name: Option<char>, action: RegisterAction, register: Register) {
        match self.pending.as_mut() {
            Some((n, a, existing)) if *n == name && *a == action => existing.append(register),
            _ => {
                if let Err(e) = self.commit() {
                    warn!(target: "editor.keys", error = %e, "register write dropped");
                }
                self.pending = Some((name, action, register));
            }
        }
    }

    /// Flushes staged text into its registers.
    pub fn commit(&mut self) -> Result<()> {
        match self.pending.take() {
            Some((name, action, register)) => self.store(name, action, register),
            None => Ok(()),
        }
    }

    /// Writes `register` immediately, following vi's numbered and small
    /// delete rules.
    pub fn store(
        &mut self,
        name: Option<char>,
        action: RegisterAction,
        register: Register,
    ) -> Result<()> {
        let name = match name {
            Some('"') | Some(DEFAULT_REGISTER) => None,
            other => other,
        };
        match name {
            Some('_') => return Ok(()),
            Some(c @ 'a'..='z') | Some(c @ '0'..='9') | Some(c @ '-') => {
                self.registers.insert(c, register.clone());
            }
            Some(c @ 'A'..='Z') => {
                let lower = c.to_ascii_lowercase();
                match self.registers.get_mut(&lower) {
                    Some(existing) => existing.append(register.clone()),
                    None => {
                        self.registers.insert(lower, register.clone());
                    }
                }
                let combined = self.registers[&lower].clone();
                self.registers.insert(DEFAULT_REGISTER, combined);
                return Ok(());
            }
            Some('*') | Some('+') => {
                self.set_clipboard(&register)?;
            }
            Some(other) => return Err(EditorError::InvalidRegister(other)),
            None => match action {
                RegisterAction::Yank => {
                    self.registers.insert('0', register.clone());
                }
                RegisterAction::Delete if register.is_multiline() => self.shift_numbered(&register),
                RegisterAction::Delete => {
                    self.registers.insert('-', register.clone());
                }
            },
        }
        if name.is_some() && action == RegisterAction::Delete && register.is_multiline() {
            self.shift_numbered(&register);
        }
        self.registers.insert(DEFAULT_REGISTER, register);
        Ok(())
    }

    fn shift_numbered(&mut self, register: &Register) {
        for n in (1..9u8).rev() {
            let from = char::from(b'0' + n);
            if let Some(r) = self.registers.remove(&from) {
                self.registers.insert(char::from(b'0' + n + 1), r);
            }
        }
        self.registers.insert('1', register.clone());
    }

    /// Contents of register `name` (default when `None`).
    pub fn get(&mut self, name: Option<char>) -> Result<Register> {
        let key = match name {
            None | Some('"') => DEFAULT_REGISTER,
            Some(c) if c.is_ascii_uppercase() => c.to_ascii_lowercase(),
            Some(c) => c,
        };
        if !Self::is_valid_name(key) {
            return Err(EditorError::InvalidRegister(key));
        }
        if key == '*' || key == '+' {
            return self.get_clipboard();
        }
        self.registers
            .get(&key)
            .cloned()
            .ok_or(EditorError::EmptyRegister(name.unwrap_or('"')))
    }

    /// Non-empty registers in display order, default first.
    pub fn list(&self) -> impl Iterator<Item = (char, &Register)> {
        self.registers.iter().map(|(c, r)| {
            let shown = if *c == DEFAULT_REGISTER { '"' } else { *c };
            (shown, r)
        })
    }

    fn clipboard(&mut self) -> Result<&mut arboard::Clipboard> {
        if self.clipboard.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| EditorError::Clipboard(e.to_string()))?;
            self.clipboard = Some(clipboard);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| EditorError::Clipboard("not initialized".to_string()))
    }

    fn set_clipboard(&mut self, register: &Register) -> Result<()> {
        let mut text = register.text();
        if register.kind == RegisterType::Line {
            text.push('\n');
        }
        self.clipboard()?
            .set_text(text)
            .map_err(|e| EditorError::Clipboard(e.to_string()))
    }

    fn get_clipboard(&mut self) -> Result<Register> {
        let text = self
            .clipboard()?
            .get_text()
            .map_err(|e| EditorError::Clipboard(e.to_string()))?;
        Ok(match text.strip_suffix('\n') {
            Some(body) => Register::lines(body.split('\n')),
            None => Register::characters(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yank_sets_zero_and_default() {
        let mut regs = RegisterManager::new();
        regs.store(None, RegisterAction::Yank, Register::characters("abc"))
            .unwrap();
        assert_eq!(regs.get(None).unwrap().text(), "abc");
        assert_eq!(regs.get(Some('0')).unwrap().text(), "abc");
        assert_eq!(regs.get(Some('"')).unwrap().text(), "abc");
    }

    #[test]
    fn test_small_delete_and_numbered_shift() {
        let mut regs = RegisterManager::new();
        regs.store(None, RegisterAction::Delete, Register::characters("w"))
            .unwrap();
        assert_eq!(regs.get(Some('-')).unwrap().text(), "w");
        regs.store(None, RegisterAction::Delete, Register::lines(["one"]))
            .unwrap();
        regs.store(None, RegisterAction::Delete, Register::lines(["two"]))
            .unwrap();
        assert_eq!(regs.get(Some('1')).unwrap().text(), "two");
        assert_eq!(regs.get(Some('2')).unwrap().text(), "one");
        assert!(regs.get(Some('3')).is_err());
    }

    #[test]
    fn test_uppercase_appends() {
        let mut regs = RegisterManager::new();
        regs.store(Some('a'), RegisterAction::Yank, Register::lines(["x"]))
            .unwrap();
        regs.store(Some('A'), RegisterAction::Yank, Register::lines(["y"]))
            .unwrap();
        let a = regs.get(Some('a')).unwrap();
        assert_eq!(a.kind, RegisterType::Line);
        assert_eq!(a.as_lines(), vec!["x", "y"]);
        assert_eq!(regs.get(None).unwrap().as_lines(), vec!["x", "y"]);
    }

    #[test]
    fn test_pending_fragments_commit_together() {
        let mut regs = RegisterManager::new();
        regs.record(None, RegisterAction::Delete, Register::lines(["a"]));
        regs.record(None, RegisterAction::Delete, Register::lines(["b"]));
        assert!(regs.get(None).is_err());
        regs.commit().unwrap();
        let r = regs.get(None).unwrap();
        assert_eq!(r.fragments.len(), 2);
        assert_eq!(r.as_lines(), vec!["a", "b"]);
    }

    #[test]
    fn test_black_hole_and_invalid() {
        let mut regs = RegisterManager::new();
        regs.store(Some('_'), RegisterAction::Delete, Register::characters("gone"))
            .unwrap();
        assert!(regs.get(None).is_err());
        assert!(matches!(
            regs.store(Some('%'), RegisterAction::Yank, Register::characters("x")),
            Err(EditorError::InvalidRegister('%'))
        ));
    }

    #[test]
    fn test_block_text_joins_rows() {
        let r = Register::block(["ab", "cd"]);
        assert_eq!(r.text(), "ab\ncd");
        assert_eq!(r.fragments.len(), 2);
    }
}

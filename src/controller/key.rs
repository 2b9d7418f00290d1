use crate::error::{EditorError, Result};
use crossterm::event::{KeyCode, KeyModifiers};
use std::fmt;

/// A single keystroke as the engine sees it.
///
/// Terminal hosts can forward crossterm events directly; other hosts build
/// these from their own toolkit events or from vi key notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        // Shift is already folded into the character for printable keys.
        let mut modifiers = modifiers;
        if let KeyCode::Char(_) = code {
            modifiers.remove(KeyModifiers::SHIFT);
        }
        Self { code, modifiers }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn code(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn shift(&self) -> bool {
        self.modifiers.contains(KeyModifiers::SHIFT)
            || matches!(self.code, KeyCode::Char(c) if c.is_uppercase())
    }

    pub fn control(&self) -> bool {
        self.modifiers.contains(KeyModifiers::CONTROL)
    }

    pub fn alt(&self) -> bool {
        self.modifiers.contains(KeyModifiers::ALT)
    }

    pub fn meta(&self) -> bool {
        self.modifiers.contains(KeyModifiers::META)
    }

    /// The text this key types, if any.
    pub fn text(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if !self.control() && !self.alt() => Some(c),
            KeyCode::Tab if self.modifiers.is_empty() => Some('\t'),
            _ => None,
        }
    }

    /// The key as a plain character, ignoring nothing but Shift.
    pub fn plain_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if self.modifiers.is_empty() => Some(c),
            _ => None,
        }
    }

    pub fn ctrl_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if self.control() => Some(c.to_ascii_lowercase()),
            _ => None,
        }
    }

    /// Parses vi key notation: plain characters plus `<Esc>`, `<CR>`, `<BS>`,
    /// `<Tab>`, `<Del>`, `<Up>`, `<Down>`, `<Left>`, `<Right>`, `<Home>`,
    /// `<End>`, `<PageUp>`, `<PageDown>`, `<lt>` and `<C-x>`.
    pub fn parse_sequence(notation: &str) -> Result<Vec<KeyEvent>> {
        let mut keys = Vec::new();
        let mut rest = notation;
        while let Some(c) = rest.chars().next() {
            if c == '<' {
                if let Some(end) = rest.find('>') {
                    if let Some(key) = Self::parse_named(&rest[1..end]) {
                        keys.push(key);
                        rest = &rest[end + 1..];
                        continue;
                    }
                }
            }
            keys.push(Self::char(c));
            rest = &rest[c.len_utf8()..];
        }
        if keys.is_empty() && !notation.is_empty() {
            return Err(EditorError::UnsupportedKey(notation.to_string()));
        }
        Ok(keys)
    }

    fn parse_named(name: &str) -> Option<KeyEvent> {
        let lower = name.to_ascii_lowercase();
        let code = match lower.as_str() {
            "esc" => KeyCode::Esc,
            "cr" | "enter" | "return" => KeyCode::Enter,
            "bs" | "backspace" => KeyCode::Backspace,
            "tab" => KeyCode::Tab,
            "del" | "delete" => KeyCode::Delete,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" => KeyCode::PageUp,
            "pagedown" => KeyCode::PageDown,
            "lt" => KeyCode::Char('<'),
            "space" => KeyCode::Char(' '),
            _ => {
                let c = lower.strip_prefix("c-")?;
                let mut chars = c.chars();
                let ch = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                return Some(KeyEvent::ctrl(ch));
            }
        };
        Some(KeyEvent::code(code))
    }
}

impl From<crossterm::event::KeyEvent> for KeyEvent {
    fn from(event: crossterm::event::KeyEvent) -> Self {
        KeyEvent::new(event.code, event.modifiers)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(c) = self.ctrl_char() {
            return write!(f, "<C-{c}>");
        }
        match self.code {
            KeyCode::Char('<') => write!(f, "<lt>"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::Esc => write!(f, "<Esc>"),
            KeyCode::Enter => write!(f, "<CR>"),
            KeyCode::Backspace => write!(f, "<BS>"),
            KeyCode::Tab => write!(f, "<Tab>"),
            KeyCode::Delete => write!(f, "<Del>"),
            other => write!(f, "<{other:?}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sequence() {
        let keys = KeyEvent::parse_sequence("dw<Esc>").unwrap();
        assert_eq!(
            keys,
            vec![
                KeyEvent::char('d'),
                KeyEvent::char('w'),
                KeyEvent::code(KeyCode::Esc)
            ]
        );
    }

    #[test]
    fn test_parse_control_and_literal_angle() {
        let keys = KeyEvent::parse_sequence("<C-r><lt>a<b").unwrap();
        assert_eq!(keys[0], KeyEvent::ctrl('r'));
        assert_eq!(keys[1], KeyEvent::char('<'));
        assert_eq!(keys[2], KeyEvent::char('a'));
        assert_eq!(keys[3], KeyEvent::char('<'));
        assert_eq!(keys[4], KeyEvent::char('b'));
    }

    #[test]
    fn test_shift_folded_into_char() {
        let key = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert_eq!(key, KeyEvent::char('A'));
        assert!(key.shift());
        assert_eq!(key.text(), Some('A'));
    }

    #[test]
    fn test_from_crossterm() {
        let ct = crossterm::event::KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        let key: KeyEvent = ct.into();
        assert!(key.control());
        assert_eq!(key.text(), None);
        assert_eq!(key.to_string(), "<C-x>");
    }
}

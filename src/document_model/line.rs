use super::syntax::TokenKind;
use std::collections::BTreeMap;
use unicode_width::UnicodeWidthChar;

/// A single line of text plus the style annotations the syntax pass left on it.
///
/// Styles are sparse: only annotated characters have an entry. Any edit drops
/// the annotations from the edit column onward; the next highlight pass puts
/// them back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    chars: Vec<char>,
    styles: BTreeMap<usize, TokenKind>,
    changed: bool,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            styles: BTreeMap::new(),
            changed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn char_at(&self, column: usize) -> Option<char> {
        self.chars.get(column).copied()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Text in `[start, end)`, clamped to the line.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Index of the first non-blank character, or the line length when blank.
    pub fn first_non_blank(&self) -> usize {
        self.chars
            .iter()
            .position(|c| !c.is_whitespace())
            .unwrap_or(self.chars.len())
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Cleared by the render collaborator once it has repainted the line.
    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub(crate) fn touch(&mut self) {
        self.changed = true;
    }

    pub fn style_at(&self, column: usize) -> Option<TokenKind> {
        self.styles.get(&column).copied()
    }

    pub fn styles(&self) -> impl Iterator<Item = (usize, TokenKind)> + '_ {
        self.styles.iter().map(|(col, kind)| (*col, *kind))
    }

    pub fn set_style(&mut self, column: usize, kind: TokenKind) {
        if column < self.chars.len() {
            self.styles.insert(column, kind);
        }
    }

    pub fn clear_styles(&mut self) {
        self.styles.clear();
    }

    pub(crate) fn insert_str(&mut self, column: usize, text: &str) {
        self.invalidate_styles_from(column);
        let tail = self.chars.split_off(column);
        self.chars.extend(text.chars());
        self.chars.extend(tail);
        self.touch();
    }

    /// Removes `[start, end)` and returns the removed text.
    pub(crate) fn remove_range(&mut self, start: usize, end: usize) -> String {
        self.invalidate_styles_from(start);
        let removed: String = self.chars.drain(start..end).collect();
        self.touch();
        removed
    }

    pub(crate) fn replace_char(&mut self, column: usize, ch: char) -> char {
        let old = std::mem::replace(&mut self.chars[column], ch);
        self.styles.remove(&column);
        self.touch();
        old
    }

    /// Cuts the line at `column`, returning everything after it as a new line.
    pub(crate) fn split_off(&mut self, column: usize) -> Line {
        self.invalidate_styles_from(column);
        let tail = self.chars.split_off(column);
        self.touch();
        Line {
            chars: tail,
            styles: BTreeMap::new(),
            changed: true,
        }
    }

    pub(crate) fn append(&mut self, other: Line) {
        let offset = self.chars.len();
        self.chars.extend(other.chars);
        for (col, kind) in other.styles {
            self.styles.insert(col + offset, kind);
        }
        self.touch();
    }

    fn invalidate_styles_from(&mut self, column: usize) {
        let _ = self.styles.split_off(&column);
    }

    /// Screen column at which character `column` starts, expanding tabs.
    pub fn display_column(&self, column: usize, tab_stop: usize) -> usize {
        let tab_stop = tab_stop.max(1);
        let mut width = 0;
        for &c in self.chars.iter().take(column) {
            width += char_display_width(c, width, tab_stop);
        }
        width
    }

    /// Total screen width of the line.
    pub fn display_width(&self, tab_stop: usize) -> usize {
        self.display_column(self.chars.len(), tab_stop)
    }

    /// Character index covering screen column `target`; the line length when
    /// `target` lies past the end.
    pub fn column_for_display(&self, target: usize, tab_stop: usize) -> usize {
        let tab_stop = tab_stop.max(1);
        let mut width = 0;
        for (idx, &c) in self.chars.iter().enumerate() {
            let w = char_display_width(c, width, tab_stop);
            if target < width + w.max(1) {
                return idx;
            }
            width += w;
        }
        self.chars.len()
    }
}

impl From<&str> for Line {
    fn from(text: &str) -> Self {
        Line::from_text(text)
    }
}

fn char_display_width(c: char, current: usize, tab_stop: usize) -> usize {
    if c == '\t' {
        tab_stop - (current % tab_stop)
    } else {
        c.width().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove() {
        let mut line = Line::from_text("hello");
        line.insert_str(5, " world");
        assert_eq!(line.text(), "hello world");
        let removed = line.remove_range(0, 6);
        assert_eq!(removed, "hello ");
        assert_eq!(line.text(), "world");
        assert!(line.is_changed());
    }

    #[test]
    fn test_edit_drops_styles_after_column() {
        let mut line = Line::from_text("let x = 1;");
        line.set_style(0, TokenKind::Keyword);
        line.set_style(8, TokenKind::Number);
        line.insert_str(4, "mut ");
        assert_eq!(line.style_at(0), Some(TokenKind::Keyword));
        assert_eq!(line.style_at(8), None);
        assert_eq!(line.style_at(12), None);
    }

    #[test]
    fn test_split_and_append() {
        let mut line = Line::from_text("abcdef");
        let tail = line.split_off(2);
        assert_eq!(line.text(), "ab");
        assert_eq!(tail.text(), "cdef");
        line.append(tail);
        assert_eq!(line.text(), "abcdef");
    }

    #[test]
    fn test_display_columns_with_tabs() {
        let line = Line::from_text("\tab");
        assert_eq!(line.display_column(1, 8), 8);
        assert_eq!(line.display_width(4), 6);
        assert_eq!(line.column_for_display(3, 4), 0);
        assert_eq!(line.column_for_display(4, 4), 1);
        assert_eq!(line.column_for_display(20, 4), 3);
    }

    #[test]
    fn test_wide_characters() {
        let line = Line::from_text("日本x");
        assert_eq!(line.display_column(2, 8), 4);
        assert_eq!(line.column_for_display(3, 8), 1);
    }

    #[test]
    fn test_first_non_blank() {
        assert_eq!(Line::from_text("   x").first_non_blank(), 3);
        assert_eq!(Line::from_text("   ").first_non_blank(), 3);
        assert_eq!(Line::new().first_non_blank(), 0);
    }
}

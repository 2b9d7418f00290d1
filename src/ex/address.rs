use crate::document_model::{
    Document, MarkManager, Position, SearchDirection, SearchState, movement,
};
use crate::error::{EditorError, Result};

/// Character cursor over one ex command line.
#[derive(Debug, Clone)]
pub(crate) struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    pub fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.pos += 1;
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn rest(&self) -> String {
        self.chars[self.pos.min(self.chars.len())..].iter().collect()
    }

    /// Consumes everything left on the line.
    pub fn take_rest(&mut self) -> String {
        let rest = self.rest();
        self.pos = self.chars.len();
        rest
    }

    pub fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    pub fn number(&mut self) -> Option<usize> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            None
        } else {
            // Absurdly long numbers saturate and then fail the range check.
            Some(digits.parse().unwrap_or(usize::MAX))
        }
    }

    /// Text up to the next unescaped `delimiter`, which is consumed.
    /// `\delimiter` becomes the bare delimiter; other escapes are kept.
    /// The flag is false when the line ended before the delimiter.
    pub fn delimited(&mut self, delimiter: char) -> (String, bool) {
        let mut out = String::new();
        while let Some(c) = self.bump() {
            if c == delimiter {
                return (out, true);
            }
            if c == '\\' {
                match self.bump() {
                    Some(next) if next == delimiter => out.push(next),
                    Some(next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => out.push('\\'),
                }
            } else {
                out.push(c);
            }
        }
        (out, false)
    }
}

/// Where an address starts before offsets are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressBase {
    /// 1-based line number; `0` means "before the first line".
    Line(usize),
    Current,
    Last,
    Mark(char),
    Search {
        pattern: String,
        direction: SearchDirection,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub base: AddressBase,
    pub offset: isize,
}

/// The addresses in front of a command, unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSpec {
    pub addresses: Vec<Address>,
    /// `;` separated the addresses: the first one becomes the current line
    /// before the second is resolved.
    pub semicolon: bool,
}

impl RangeSpec {
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    fn whole_file() -> Self {
        Self {
            addresses: vec![
                Address {
                    base: AddressBase::Line(1),
                    offset: 0,
                },
                Address {
                    base: AddressBase::Last,
                    offset: 0,
                },
            ],
            semicolon: false,
        }
    }
}

/// Parses an optional address. Offsets without a base apply to `.`.
pub(crate) fn parse_address(sc: &mut Scanner) -> Result<Option<Address>> {
    sc.skip_blanks();
    let base = match sc.peek() {
        Some(c) if c.is_ascii_digit() => sc.number().map(AddressBase::Line),
        Some('.') => {
            sc.bump();
            Some(AddressBase::Current)
        }
        Some('$') => {
            sc.bump();
            Some(AddressBase::Last)
        }
        Some('\'') => {
            sc.bump();
            match sc.bump() {
                Some(name) => Some(AddressBase::Mark(name)),
                None => return Err(EditorError::InvalidAddress("'".to_string())),
            }
        }
        Some(delimiter @ ('/' | '?')) => {
            sc.bump();
            let (pattern, terminated) = sc.delimited(delimiter);
            if !terminated {
                return Err(EditorError::UnterminatedPattern(delimiter));
            }
            let direction = if delimiter == '/' {
                SearchDirection::Forward
            } else {
                SearchDirection::Backward
            };
            Some(AddressBase::Search { pattern, direction })
        }
        _ => None,
    };

    let mut offset: isize = 0;
    let mut has_offset = false;
    loop {
        sc.skip_blanks();
        let sign = match sc.peek() {
            Some('+') => 1,
            Some('-') => -1,
            Some(c) if c.is_ascii_digit() && base.is_some() => {
                // `.5` reads as `.+5`.
                let n = sc.number().unwrap_or(0).min(isize::MAX as usize);
                offset = offset.saturating_add(n as isize);
                has_offset = true;
                continue;
            }
            _ => break,
        };
        sc.bump();
        let amount = sc.number().unwrap_or(1).min(isize::MAX as usize) as isize;
        offset = offset.saturating_add(sign * amount);
        has_offset = true;
    }

    Ok(match (base, has_offset) {
        (Some(base), _) => Some(Address { base, offset }),
        (None, true) => Some(Address {
            base: AddressBase::Current,
            offset,
        }),
        (None, false) => None,
    })
}

/// Parses the address list in front of a command: `%`, `a`, `a,b` or `a;b`.
pub(crate) fn parse_range(sc: &mut Scanner) -> Result<RangeSpec> {
    sc.skip_blanks();
    if sc.eat('%') {
        return Ok(RangeSpec::whole_file());
    }
    let mut spec = RangeSpec::default();
    let first = parse_address(sc)?;
    sc.skip_blanks();
    match sc.peek() {
        Some(sep @ (',' | ';')) => {
            sc.bump();
            spec.semicolon = sep == ';';
            // A missing address on either side is the current line.
            let current = Address {
                base: AddressBase::Current,
                offset: 0,
            };
            let first = first.unwrap_or_else(|| current.clone());
            let second = parse_address(sc)?.unwrap_or(current);
            spec.addresses.push(first);
            spec.addresses.push(second);
        }
        _ => {
            if let Some(first) = first {
                spec.addresses.push(first);
            }
        }
    }
    Ok(spec)
}

/// What address resolution reads from the editor.
pub(crate) struct LineContext<'a> {
    pub document: &'a Document,
    pub marks: &'a MarkManager,
    pub search: &'a mut SearchState,
    pub ignore_case: bool,
    pub wrap: bool,
    /// 1-based current line.
    pub current: usize,
}

impl LineContext<'_> {
    fn line_count(&self) -> usize {
        self.document.line_count()
    }

    /// Resolves `address` to a 1-based line in `0..=line_count`. A base
    /// outside the buffer is an error; offsets clamp to the buffer.
    pub fn resolve(&mut self, address: &Address) -> Result<usize> {
        let count = self.line_count();
        let base = match &address.base {
            AddressBase::Line(n) => {
                if *n > count {
                    return Err(EditorError::InvalidRange);
                }
                *n
            }
            AddressBase::Current => self.current,
            AddressBase::Last => count,
            AddressBase::Mark(name) => {
                let pos = self.marks.get(*name)?;
                if pos.line >= count {
                    return Err(EditorError::MarkNotSet(*name));
                }
                pos.line + 1
            }
            AddressBase::Search { pattern, direction } => self.search_line(pattern, *direction)?,
        };
        if address.offset == 0 {
            return Ok(base);
        }
        let target = (base as isize).saturating_add(address.offset);
        Ok(target.clamp(1, count as isize) as usize)
    }

    /// First line after (or before) the current one that matches `pattern`.
    fn search_line(&mut self, pattern: &str, direction: SearchDirection) -> Result<usize> {
        let pattern = self.search.resolve(pattern)?.to_string();
        self.search.remember(&pattern);
        let regex = SearchState::compile(&pattern, self.ignore_case)?;
        let count = self.line_count();
        let current = self.current.clamp(1, count) - 1;
        let matches = |row: usize| regex.is_match(&self.document.line_text(row));
        let order: Vec<usize> = match direction {
            SearchDirection::Forward => {
                let after = current + 1..count;
                if self.wrap {
                    after.chain(0..=current).collect()
                } else {
                    after.collect()
                }
            }
            SearchDirection::Backward => {
                let before = (0..current).rev();
                if self.wrap {
                    before.chain((current..count).rev()).collect()
                } else {
                    before.collect()
                }
            }
        };
        order
            .into_iter()
            .find(|row| matches(*row))
            .map(|row| row + 1)
            .ok_or(EditorError::PatternNotFound(pattern))
    }

    /// Resolves `spec` into `(first, last)`, 1-based and inclusive. An empty
    /// spec yields `default`. A backwards pair is swapped.
    pub fn resolve_range(
        &mut self,
        spec: &RangeSpec,
        default: (usize, usize),
    ) -> Result<(usize, usize)> {
        match spec.addresses.as_slice() {
            [] => Ok(default),
            [only] => {
                let line = self.resolve(only)?;
                Ok((line, line))
            }
            [first, second, ..] => {
                let a = self.resolve(first)?;
                if spec.semicolon {
                    self.current = a.max(1);
                }
                let b = self.resolve(second)?;
                Ok(if a <= b { (a, b) } else { (b, a) })
            }
        }
    }
}

/// Cursor position for "go to line" results: the first non-blank of a
/// 1-based line, with `0` meaning the first line.
pub(crate) fn line_position(document: &Document, line: usize) -> Position {
    movement::first_non_blank(document, line.saturating_sub(1).min(document.line_count() - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(lines: &[&str]) -> Document {
        Document::from_lines(lines.iter().map(|s| s.to_string()).collect())
    }

    fn resolve_with(
        document: &Document,
        marks: &MarkManager,
        text: &str,
        current: usize,
    ) -> Result<(usize, usize)> {
        let mut search = SearchState::new();
        let mut sc = Scanner::new(text);
        let spec = parse_range(&mut sc)?;
        let mut ctx = LineContext {
            document,
            marks,
            search: &mut search,
            ignore_case: false,
            wrap: true,
            current,
        };
        ctx.resolve_range(&spec, (current, current))
    }

    #[test]
    fn test_numbers_and_symbols() {
        let d = doc(&["a", "b", "c", "d", "e"]);
        let m = MarkManager::new();
        assert_eq!(resolve_with(&d, &m, "2,4", 1).unwrap(), (2, 4));
        assert_eq!(resolve_with(&d, &m, ".,$", 3).unwrap(), (3, 5));
        assert_eq!(resolve_with(&d, &m, "%", 3).unwrap(), (1, 5));
        assert_eq!(resolve_with(&d, &m, "", 2).unwrap(), (2, 2));
    }

    #[test]
    fn test_offsets_clamp() {
        let d = doc(&["a", "b", "c"]);
        let m = MarkManager::new();
        assert_eq!(resolve_with(&d, &m, ".+1", 1).unwrap(), (2, 2));
        assert_eq!(resolve_with(&d, &m, "-", 2).unwrap(), (1, 1));
        assert_eq!(resolve_with(&d, &m, ".+10", 2).unwrap(), (3, 3));
        assert_eq!(resolve_with(&d, &m, ".-10", 2).unwrap(), (1, 1));
        assert_eq!(resolve_with(&d, &m, "$-1", 1).unwrap(), (2, 2));
    }

    #[test]
    fn test_huge_offsets_saturate() {
        let d = doc(&["a", "b", "c"]);
        let m = MarkManager::new();
        assert_eq!(resolve_with(&d, &m, ".+99999999999999999999", 1).unwrap(), (3, 3));
        assert_eq!(resolve_with(&d, &m, ".-99999999999999999999", 3).unwrap(), (1, 1));
        let many = format!("${}", "+9223372036854775807".repeat(3));
        assert_eq!(resolve_with(&d, &m, &many, 1).unwrap(), (3, 3));
    }

    #[test]
    fn test_out_of_range_number_fails() {
        let d = doc(&["a", "b", "c"]);
        let m = MarkManager::new();
        assert!(matches!(
            resolve_with(&d, &m, "1,9", 1),
            Err(EditorError::InvalidRange)
        ));
    }

    #[test]
    fn test_backwards_range_is_swapped() {
        let d = doc(&["a", "b", "c", "d"]);
        let m = MarkManager::new();
        assert_eq!(resolve_with(&d, &m, "4,2", 1).unwrap(), (2, 4));
    }

    #[test]
    fn test_marks() {
        let d = doc(&["a", "b", "c", "d"]);
        let mut m = MarkManager::new();
        m.set('a', Position::new(2, 0)).unwrap();
        assert_eq!(resolve_with(&d, &m, "'a,$", 1).unwrap(), (3, 4));
        assert!(matches!(
            resolve_with(&d, &m, "'b", 1),
            Err(EditorError::MarkNotSet('b'))
        ));
    }

    #[test]
    fn test_search_addresses() {
        let d = doc(&["foo", "bar", "baz", "foo again"]);
        let m = MarkManager::new();
        assert_eq!(resolve_with(&d, &m, "/foo/", 1).unwrap(), (4, 4));
        assert_eq!(resolve_with(&d, &m, "?bar?", 4).unwrap(), (2, 2));
        assert_eq!(resolve_with(&d, &m, "/ba/,/ba/", 1).unwrap(), (2, 2));
        assert_eq!(resolve_with(&d, &m, "/ba/;/ba/", 1).unwrap(), (2, 3));
        assert!(matches!(
            resolve_with(&d, &m, "/foo", 1),
            Err(EditorError::UnterminatedPattern('/'))
        ));
        assert!(matches!(
            resolve_with(&d, &m, "/nope/", 1),
            Err(EditorError::PatternNotFound(_))
        ));
    }

    #[test]
    fn test_escaped_delimiter_in_pattern() {
        let mut sc = Scanner::new("a\\/b/rest");
        assert_eq!(sc.delimited('/'), ("a/b".to_string(), true));
        assert_eq!(sc.rest(), "rest");
    }
}

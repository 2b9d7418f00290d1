use super::document::Document;
use super::movement::{self, SearchMatch};
use super::position::Position;
use crate::error::{EditorError, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

impl SearchDirection {
    pub fn reversed(self) -> Self {
        match self {
            SearchDirection::Forward => SearchDirection::Backward,
            SearchDirection::Backward => SearchDirection::Forward,
        }
    }

    pub fn delimiter(self) -> char {
        match self {
            SearchDirection::Forward => '/',
            SearchDirection::Backward => '?',
        }
    }
}

/// Result of a document search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub found: SearchMatch,
    /// The scan passed the end (or start) of the buffer.
    pub wrapped: bool,
}

/// The last pattern and direction used by `/`, `?`, `*`, `#` and `:s`.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pattern: Option<String>,
    direction: SearchDirection,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pattern(&mut self, pattern: &str, direction: SearchDirection) {
        self.pattern = Some(pattern.to_string());
        self.direction = direction;
    }

    /// Remembers a pattern without changing the search direction.
    pub fn remember(&mut self, pattern: &str) {
        self.pattern = Some(pattern.to_string());
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn direction(&self) -> SearchDirection {
        self.direction
    }

    /// `pattern` when non-empty, otherwise the remembered one.
    pub fn resolve<'a>(&'a self, pattern: &'a str) -> Result<&'a str> {
        if pattern.is_empty() {
            self.pattern().ok_or(EditorError::NoPreviousPattern)
        } else {
            Ok(pattern)
        }
    }

    /// Compiles a vi pattern. `\<` and `\>` become word boundaries; the rest
    /// is regex syntax.
    pub fn compile(pattern: &str, ignore_case: bool) -> Result<Regex> {
        let translated = pattern.replace("\\<", "\\b").replace("\\>", "\\b");
        let source = if ignore_case {
            format!("(?i){translated}")
        } else {
            translated
        };
        Ok(Regex::new(&source)?)
    }

    /// Searches from `from` (exclusive) in `direction` using the remembered
    /// pattern. With `wrap`, a miss continues from the other end of the buffer.
    pub fn search(
        &self,
        document: &Document,
        from: Position,
        direction: SearchDirection,
        wrap: bool,
        ignore_case: bool,
    ) -> Result<SearchHit> {
        let pattern = self.pattern().ok_or(EditorError::NoPreviousPattern)?;
        let regex = Self::compile(pattern, ignore_case)?;
        let last = document.line_count() - 1;
        let (first_try, second_try) = match direction {
            SearchDirection::Forward => (
                movement::find_regex_next(
                    document,
                    &regex,
                    Position::new(from.line, from.column + 1),
                    last,
                ),
                wrap.then(|| {
                    movement::find_regex_next(document, &regex, Position::new(0, 0), from.line)
                })
                .flatten(),
            ),
            SearchDirection::Backward => (
                movement::find_regex_prev(document, &regex, from, 0),
                wrap.then(|| {
                    movement::find_regex_prev(
                        document,
                        &regex,
                        Position::new(last, usize::MAX),
                        from.line,
                    )
                })
                .flatten(),
            ),
        };
        match (first_try, second_try) {
            (Some(found), _) => Ok(SearchHit {
                found,
                wrapped: false,
            }),
            (None, Some(found)) => Ok(SearchHit {
                found,
                wrapped: true,
            }),
            (None, None) => Err(EditorError::PatternNotFound(pattern.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(lines: &[&str]) -> Document {
        Document::from_lines(lines.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_no_previous_pattern() {
        let state = SearchState::new();
        let d = doc(&["x"]);
        let err = state
            .search(&d, Position::default(), SearchDirection::Forward, true, false)
            .unwrap_err();
        assert!(matches!(err, EditorError::NoPreviousPattern));
        assert!(state.resolve("").is_err());
    }

    #[test]
    fn test_forward_wraps() {
        let mut state = SearchState::new();
        state.set_pattern("key", SearchDirection::Forward);
        let d = doc(&["key one", "two", "three"]);
        let hit = state
            .search(&d, Position::new(1, 0), SearchDirection::Forward, true, false)
            .unwrap();
        assert!(hit.wrapped);
        assert_eq!(hit.found.position, Position::new(0, 0));
        let err = state
            .search(&d, Position::new(1, 0), SearchDirection::Forward, false, false)
            .unwrap_err();
        assert!(matches!(err, EditorError::PatternNotFound(_)));
    }

    #[test]
    fn test_backward_wraps() {
        let mut state = SearchState::new();
        state.set_pattern("z", SearchDirection::Backward);
        let d = doc(&["a", "b", "zz"]);
        let hit = state
            .search(&d, Position::new(0, 0), SearchDirection::Backward, true, false)
            .unwrap();
        assert!(hit.wrapped);
        assert_eq!(hit.found.position, Position::new(2, 1));
    }

    #[test]
    fn test_ignore_case_and_word_anchors() {
        let re = SearchState::compile("\\<Foo\\>", true).unwrap();
        assert!(re.is_match("a foo b"));
        assert!(!re.is_match("foobar"));
        assert!(SearchState::compile("(", false).is_err());
    }
}

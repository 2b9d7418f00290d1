//! Resolves parsed motions against the editor state.
//!
//! `Ok(None)` means the motion could not move (buffer edge, character not on
//! the line); callers treat that as a silent no-op. User-facing failures such
//! as an unset mark or a missing pattern come back as errors.

use crate::controller::command_types::{FindKind, Motion};
use crate::controller::shared_state::SharedEditorState;
use crate::document_model::movement;
use crate::document_model::{Document, Position, SearchDirection, SearchState};
use crate::error::{EditorError, Result};
use tracing::trace;

/// Where `motion` lands from the cursor. `operator` selects the variants
/// operators use: `l` may reach the end-of-line slot and `w` stops at the
/// end of the line instead of crossing it.
pub fn resolve_motion(
    shared: &mut SharedEditorState,
    motion: &Motion,
    count: Option<usize>,
    operator: bool,
) -> Result<Option<Position>> {
    let n = count.unwrap_or(1).max(1);
    let pos = shared.cursor;
    let last = shared.last_line();
    let doc = &shared.document;
    let target = match motion {
        Motion::Left => {
            (pos.column > 0).then(|| Position::new(pos.line, pos.column.saturating_sub(n)))
        }
        Motion::Right => {
            let len = doc.line_len(pos.line);
            let max = if operator { len } else { len.saturating_sub(1) };
            (pos.column < max).then(|| Position::new(pos.line, (pos.column + n).min(max)))
        }
        Motion::Up => (pos.line > 0).then(|| vertical_target(shared, pos.line.saturating_sub(n))),
        Motion::Down => {
            (pos.line < last).then(|| vertical_target(shared, (pos.line + n).min(last)))
        }
        Motion::WordForward { big } => word_forward(doc, pos, n, *big, operator),
        Motion::WordBackward { big } => repeat(pos, n, |p| movement::prev_word(doc, p, *big)),
        Motion::WordEnd { big } => repeat(pos, n, |p| movement::end_word(doc, p, *big)),
        Motion::LineStart => Some(Position::new(pos.line, 0)),
        Motion::FirstNonBlank => Some(movement::first_non_blank(doc, pos.line)),
        Motion::LineEnd => {
            let line = pos.line + n - 1;
            (line <= last).then(|| movement::line_end(doc, line))
        }
        Motion::Column => {
            let line = doc.get_line(pos.line);
            let column = line.column_for_display(n - 1, shared.tab_stop());
            Some(Position::new(pos.line, column.min(line.len().saturating_sub(1))))
        }
        Motion::NextLineStart => {
            (pos.line < last).then(|| movement::first_non_blank(doc, (pos.line + n).min(last)))
        }
        Motion::PrevLineStart => {
            (pos.line > 0).then(|| movement::first_non_blank(doc, pos.line.saturating_sub(n)))
        }
        Motion::CurrentLine => Some(movement::first_non_blank(doc, (pos.line + n - 1).min(last))),
        Motion::GotoLine => {
            let line = count.map(|c| c.max(1) - 1).unwrap_or(last).min(last);
            Some(movement::first_non_blank(doc, line))
        }
        Motion::FileStart => {
            let line = count.map(|c| c.max(1) - 1).unwrap_or(0).min(last);
            Some(movement::first_non_blank(doc, line))
        }
        Motion::SentenceForward => repeat(pos, n, |p| movement::next_sentence(doc, p)),
        Motion::SentenceBackward => repeat(pos, n, |p| movement::prev_sentence(doc, p)),
        Motion::ParagraphForward => repeat(pos, n, |p| movement::next_paragraph(doc, p)),
        Motion::ParagraphBackward => repeat(pos, n, |p| movement::prev_paragraph(doc, p)),
        Motion::SectionForward => repeat(pos, n, |p| movement::next_section(doc, p)),
        Motion::SectionBackward => repeat(pos, n, |p| movement::prev_section(doc, p)),
        Motion::FindChar { kind, ch } => {
            shared.last_find = Some((*kind, *ch));
            find_char(&shared.document, pos, *kind, *ch, n, false)
        }
        Motion::RepeatFind | Motion::RepeatFindReverse => match shared.last_find {
            Some((kind, ch)) => {
                let kind = if *motion == Motion::RepeatFindReverse {
                    kind.reversed()
                } else {
                    kind
                };
                find_char(doc, pos, kind, ch, n, true)
            }
            None => None,
        },
        Motion::SearchNext => {
            let direction = shared.search_state.direction();
            Some(search_repeat(shared, direction, n)?)
        }
        Motion::SearchPrev => {
            let direction = shared.search_state.direction().reversed();
            Some(search_repeat(shared, direction, n)?)
        }
        Motion::SearchWord { direction } => {
            let Some((start, word)) = movement::word_at(doc, pos) else {
                return Err(EditorError::PatternNotFound(String::new()));
            };
            let pattern = format!("\\b{}\\b", regex::escape(&word));
            shared.search_state.set_pattern(&pattern, *direction);
            shared.cursor = start;
            let found = search_repeat(shared, *direction, n);
            shared.cursor = pos;
            Some(found?)
        }
        Motion::Search { direction, pattern } => {
            let pattern = shared.search_state.resolve(pattern)?.to_string();
            SearchState::compile(&pattern, shared.settings.ignorecase)?;
            shared.search_state.set_pattern(&pattern, *direction);
            Some(search_repeat(shared, *direction, n)?)
        }
        Motion::MatchBracket => match count {
            Some(percent) if percent <= 100 => {
                let line = (percent * doc.line_count()).div_ceil(100).max(1) - 1;
                Some(movement::first_non_blank(doc, line.min(last)))
            }
            Some(_) => None,
            None => movement::matching_bracket(doc, pos),
        },
        Motion::ScreenTop | Motion::ScreenMiddle | Motion::ScreenBottom => {
            let top = shared.interface.get_page_top().min(last);
            let bottom = shared.interface.get_page_bottom().clamp(top, last);
            let line = match motion {
                Motion::ScreenTop => (top + n - 1).min(bottom),
                Motion::ScreenBottom => bottom.saturating_sub(n - 1).max(top),
                _ => top + (bottom - top) / 2,
            };
            Some(movement::first_non_blank(doc, line))
        }
        Motion::Mark(name) => {
            let mark = shared.mark_manager.get(*name)?;
            Some(shared.clamp_position(mark))
        }
        Motion::MarkLine(name) => {
            let mark = shared.mark_manager.get(*name)?;
            Some(movement::first_non_blank(doc, mark.line.min(last)))
        }
    };
    trace!(target: "editor.keys", ?motion, from = %pos, to = ?target, "motion");
    Ok(target)
}

/// Moves the cursor by `motion`. Returns false when it could not move.
pub fn move_cursor(
    shared: &mut SharedEditorState,
    motion: &Motion,
    count: Option<usize>,
) -> Result<bool> {
    if motion.keeps_column() && shared.desired_column.is_none() {
        shared.desired_column = Some(current_display_column(shared));
    }
    let origin = shared.cursor;
    let Some(target) = resolve_motion(shared, motion, count, false)? else {
        return Ok(false);
    };
    if motion.is_jump() && target.line != origin.line {
        shared.mark_manager.push_jump(origin);
    }
    shared.cursor = target;
    match motion {
        Motion::Up | Motion::Down => {}
        Motion::LineEnd => shared.desired_column = Some(usize::MAX),
        _ => shared.desired_column = None,
    }
    Ok(true)
}

fn current_display_column(shared: &SharedEditorState) -> usize {
    shared
        .document
        .get_line(shared.cursor.line)
        .display_column(shared.cursor.column, shared.tab_stop())
}

fn vertical_target(shared: &SharedEditorState, line: usize) -> Position {
    let wanted = shared
        .desired_column
        .unwrap_or_else(|| current_display_column(shared));
    let text = shared.document.get_line(line);
    let column = text.column_for_display(wanted, shared.tab_stop());
    Position::new(line, column.min(text.len().saturating_sub(1)))
}

/// Applies `step` `n` times. Fails only when the first step fails; later
/// failures stop at the last reachable position.
fn repeat(
    pos: Position,
    n: usize,
    mut step: impl FnMut(Position) -> Option<Position>,
) -> Option<Position> {
    let mut p = step(pos)?;
    for _ in 1..n {
        match step(p) {
            Some(next) => p = next,
            None => break,
        }
    }
    Some(p)
}

fn word_forward(
    doc: &Document,
    pos: Position,
    n: usize,
    big: bool,
    operator: bool,
) -> Option<Position> {
    let mut p = pos;
    for i in 0..n {
        match movement::next_word(doc, p, big) {
            Some(next)
                if operator && i == n - 1 && next.line > p.line && doc.line_len(p.line) > 0 =>
            {
                // The last word of a line ends the operator's span at the line end.
                return Some(Position::new(p.line, doc.line_len(p.line)));
            }
            Some(next) => p = next,
            None if operator => {
                let end = Position::new(p.line, doc.line_len(p.line));
                return (end != pos).then_some(end);
            }
            None if i == 0 => return None,
            None => break,
        }
    }
    Some(p)
}

fn find_char(
    doc: &Document,
    pos: Position,
    kind: FindKind,
    ch: char,
    n: usize,
    repeating: bool,
) -> Option<Position> {
    let forward = kind.is_forward();
    let till = matches!(kind, FindKind::Till | FindKind::TillBackward);
    let mut p = pos;
    // Repeating `t` from right before the target would not move; step over it.
    if repeating && till {
        let adjacent = if forward {
            doc.get_line(pos.line).char_at(pos.column + 1)
        } else {
            pos.column
                .checked_sub(1)
                .and_then(|c| doc.get_line(pos.line).char_at(c))
        };
        if adjacent == Some(ch) {
            p = if forward {
                Position::new(pos.line, pos.column + 1)
            } else {
                Position::new(pos.line, pos.column - 1)
            };
        }
    }
    for _ in 0..n {
        p = if forward {
            movement::find_char_forward(doc, p, &[ch], false)?
        } else {
            movement::find_char_backward(doc, p, &[ch], false)?
        };
    }
    Some(match (till, forward) {
        (true, true) => Position::new(p.line, p.column - 1),
        (true, false) => Position::new(p.line, p.column + 1),
        (false, _) => p,
    })
}

/// Runs the remembered search `n` times from the cursor.
fn search_repeat(
    shared: &mut SharedEditorState,
    direction: SearchDirection,
    n: usize,
) -> Result<Position> {
    let mut from = shared.cursor;
    let mut wrapped = false;
    for _ in 0..n {
        let hit = shared
            .search_state
            .search(
                &shared.document,
                from,
                direction,
                shared.settings.wrapscan,
                shared.settings.ignorecase,
            )?;
        wrapped |= hit.wrapped;
        from = hit.found.position;
    }
    if wrapped {
        shared.message(match direction {
            SearchDirection::Forward => "search hit BOTTOM, continuing at TOP",
            SearchDirection::Backward => "search hit TOP, continuing at BOTTOM",
        });
    }
    Ok(from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::interface::{NullInterface, ShellRunner};

    fn state(lines: &[&str]) -> SharedEditorState {
        let mut shared = SharedEditorState::new(Box::new(NullInterface), Box::new(ShellRunner));
        shared.document = Document::from_lines(lines.iter().map(|s| s.to_string()).collect());
        shared
    }

    #[test]
    fn test_horizontal_motions_saturate() {
        let mut s = state(&["abc"]);
        assert_eq!(resolve_motion(&mut s, &Motion::Left, None, false).unwrap(), None);
        s.cursor = Position::new(0, 2);
        assert_eq!(resolve_motion(&mut s, &Motion::Right, None, false).unwrap(), None);
        assert_eq!(
            resolve_motion(&mut s, &Motion::Right, None, true).unwrap(),
            Some(Position::new(0, 3))
        );
    }

    #[test]
    fn test_sticky_column() {
        let mut s = state(&["abcdef", "ab", "abcdef"]);
        s.cursor = Position::new(0, 4);
        assert!(move_cursor(&mut s, &Motion::Down, None).unwrap());
        assert_eq!(s.cursor, Position::new(1, 1));
        assert!(move_cursor(&mut s, &Motion::Down, None).unwrap());
        assert_eq!(s.cursor, Position::new(2, 4));
        assert!(!move_cursor(&mut s, &Motion::Down, None).unwrap());
    }

    #[test]
    fn test_dollar_sticks_to_line_end() {
        let mut s = state(&["abc", "abcdef"]);
        move_cursor(&mut s, &Motion::LineEnd, None).unwrap();
        move_cursor(&mut s, &Motion::Down, None).unwrap();
        assert_eq!(s.cursor, Position::new(1, 5));
    }

    #[test]
    fn test_operator_word_stops_at_line_end() {
        let mut s = state(&["abc", "def"]);
        assert_eq!(
            resolve_motion(&mut s, &Motion::WordForward { big: false }, None, true).unwrap(),
            Some(Position::new(0, 3))
        );
        assert_eq!(
            resolve_motion(&mut s, &Motion::WordForward { big: false }, None, false).unwrap(),
            Some(Position::new(1, 0))
        );
    }

    #[test]
    fn test_find_and_repeat() {
        let mut s = state(&["a,b,c,d"]);
        let motion = Motion::FindChar {
            kind: FindKind::Till,
            ch: ',',
        };
        assert_eq!(
            resolve_motion(&mut s, &motion, None, false).unwrap(),
            Some(Position::new(0, 0))
        );
        assert_eq!(
            resolve_motion(&mut s, &Motion::RepeatFind, None, false).unwrap(),
            Some(Position::new(0, 2))
        );
        s.cursor = Position::new(0, 6);
        assert_eq!(
            resolve_motion(&mut s, &Motion::RepeatFindReverse, None, false).unwrap(),
            Some(Position::new(0, 4))
        );
    }

    #[test]
    fn test_search_wraps_with_message() {
        let mut s = state(&["foo", "bar", "foo"]);
        s.cursor = Position::new(2, 0);
        let motion = Motion::Search {
            direction: SearchDirection::Forward,
            pattern: "foo".into(),
        };
        assert_eq!(
            resolve_motion(&mut s, &motion, None, false).unwrap(),
            Some(Position::new(0, 0))
        );
        assert_eq!(s.status_message, "search hit BOTTOM, continuing at TOP");
    }

    #[test]
    fn test_search_not_found_without_wrapscan() {
        let mut s = state(&["foo", "bar"]);
        s.settings.wrapscan = false;
        s.cursor = Position::new(1, 0);
        let motion = Motion::Search {
            direction: SearchDirection::Forward,
            pattern: "foo".into(),
        };
        assert!(matches!(
            resolve_motion(&mut s, &motion, None, false),
            Err(EditorError::PatternNotFound(_))
        ));
    }

    #[test]
    fn test_star_searches_whole_word() {
        let mut s = state(&["foo foobar foo"]);
        let motion = Motion::SearchWord {
            direction: SearchDirection::Forward,
        };
        assert_eq!(
            resolve_motion(&mut s, &motion, None, false).unwrap(),
            Some(Position::new(0, 11))
        );
    }

    #[test]
    fn test_unset_mark_is_an_error() {
        let mut s = state(&["x"]);
        assert!(matches!(
            resolve_motion(&mut s, &Motion::Mark('a'), None, false),
            Err(EditorError::MarkNotSet('a'))
        ));
    }

    #[test]
    fn test_goto_line_pushes_jump() {
        let mut s = state(&["a", "b", "c"]);
        move_cursor(&mut s, &Motion::GotoLine, None).unwrap();
        assert_eq!(s.cursor, Position::new(2, 0));
        assert_eq!(s.mark_manager.get('\'').unwrap(), Position::new(0, 0));
    }
}

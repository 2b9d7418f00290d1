mod common;

use common::{editor_with, plain_editor};
use vi_engine::{EditorError, Mode, Position};

#[test]
fn insert_then_undo_and_redo_round_trip() {
    let mut editor = plain_editor(&[""]);
    assert!(editor.process_keys("ihello<Esc>"));
    assert_eq!(editor.lines(), ["hello"]);
    assert_eq!(editor.cursor(), Position::new(0, 4));
    assert_eq!(editor.mode(), Mode::Normal);

    assert!(editor.process_keys("u"));
    assert_eq!(editor.lines(), [""]);
    assert!(editor.process_keys("<C-r>"));
    assert_eq!(editor.lines(), ["hello"]);

    assert!(editor.undo());
    assert_eq!(editor.lines(), [""]);
    assert!(!editor.undo());
    assert!(editor.redo());
    assert_eq!(editor.lines(), ["hello"]);
    assert_eq!(editor.cursor(), Position::new(0, 4));
}

#[test]
fn redo_of_insert_session_restores_escape_cursor() {
    let mut editor = plain_editor(&["abc"]);
    assert!(editor.process_keys("ixy<Esc>"));
    assert_eq!(editor.cursor(), Position::new(0, 1));
    assert!(editor.undo());
    assert_eq!(editor.lines(), ["abc"]);
    assert!(editor.redo());
    assert_eq!(editor.lines(), ["xyabc"]);
    assert_eq!(editor.cursor(), Position::new(0, 1));

    let mut editor = plain_editor(&["abc def"]);
    assert!(editor.process_keys("cwQ<Esc>"));
    assert_eq!(editor.lines(), ["Q def"]);
    let after_change = editor.cursor();
    assert_eq!(after_change, Position::new(0, 0));
    assert!(editor.undo());
    assert_eq!(editor.lines(), ["abc def"]);
    assert!(editor.redo());
    assert_eq!(editor.lines(), ["Q def"]);
    assert_eq!(editor.cursor(), after_change);
}

#[test]
fn delete_word_at_line_end_then_undo() {
    let mut editor = plain_editor(&["abc", "def"]);
    assert!(editor.process_keys("dw"));
    assert_eq!(editor.lines(), ["", "def"]);
    assert_eq!(editor.register_text('"').as_deref(), Some("abc"));
    assert!(editor.process_keys("u"));
    assert_eq!(editor.lines(), ["abc", "def"]);
    assert_eq!(editor.cursor(), Position::new(0, 0));
}

#[test]
fn counted_motions_saturate_at_buffer_edges() {
    let mut editor = plain_editor(&["one", "two", "three"]);
    assert!(editor.process_keys("100j"));
    assert_eq!(editor.cursor().line, 2);
    assert!(editor.process_keys("100k"));
    assert_eq!(editor.cursor().line, 0);
    assert!(editor.process_keys("100l"));
    assert_eq!(editor.cursor(), Position::new(0, 2));
    // Already at the edge: a silent no-op, not an error.
    assert!(editor.process_keys("0h"));
    assert_eq!(editor.cursor(), Position::new(0, 0));
}

#[test]
fn vertical_motion_keeps_desired_column() {
    let mut editor = plain_editor(&["abcdef", "x", "abcdef"]);
    assert!(editor.process_keys("4l"));
    assert!(editor.process_keys("j"));
    assert_eq!(editor.cursor(), Position::new(1, 0));
    assert!(editor.process_keys("j"));
    assert_eq!(editor.cursor(), Position::new(2, 4));
}

#[test]
fn dot_repeats_delete_with_new_count() {
    let mut editor = plain_editor(&["a b c d e"]);
    assert!(editor.process_keys("dw"));
    assert_eq!(editor.lines(), ["b c d e"]);
    assert!(editor.process_keys("."));
    assert_eq!(editor.lines(), ["c d e"]);
    assert!(editor.process_keys("2."));
    assert_eq!(editor.lines(), ["e"]);
}

#[test]
fn dot_repeats_insert_on_another_line() {
    let mut editor = plain_editor(&["a", "b"]);
    assert!(editor.process_keys("A;<Esc>j."));
    assert_eq!(editor.lines(), ["a;", "b;"]);
}

#[test]
fn dot_repeat_is_one_undo_step() {
    let mut editor = plain_editor(&["x1", "x2"]);
    assert!(editor.process_keys("ix<Esc>j0."));
    assert_eq!(editor.lines(), ["xx1", "xx2"]);
    assert!(editor.process_keys("u"));
    assert_eq!(editor.lines(), ["xx1", "x2"]);
}

#[test]
fn counted_line_delete_goes_to_numbered_register() {
    let mut editor = plain_editor(&["1", "2", "3", "4", "5"]);
    assert!(editor.process_keys("j3dd"));
    assert_eq!(editor.lines(), ["1", "5"]);
    assert_eq!(editor.register_text('1').as_deref(), Some("2\n3\n4"));
    assert!(editor.process_keys("\"1P"));
    assert_eq!(editor.lines(), ["1", "2", "3", "4", "5"]);
}

#[test]
fn named_register_yank_and_put() {
    let mut editor = plain_editor(&["x", "y"]);
    assert!(editor.process_keys("\"ayyj\"ap"));
    assert_eq!(editor.lines(), ["x", "y", "x"]);
    assert_eq!(editor.register_text('a').as_deref(), Some("x"));
    assert!(editor.process_keys("\"Ayy"));
    assert_eq!(editor.register_text('a').as_deref(), Some("x\nx"));
}

#[test]
fn change_word_keeps_trailing_space() {
    let mut editor = plain_editor(&["foo bar"]);
    assert!(editor.process_keys("cwbaz<Esc>"));
    assert_eq!(editor.lines(), ["baz bar"]);
}

#[test]
fn replace_and_join() {
    let mut editor = plain_editor(&["abc", "   def"]);
    assert!(editor.process_keys("2rX"));
    assert_eq!(editor.lines(), ["XXc", "   def"]);
    assert!(editor.process_keys("J"));
    assert_eq!(editor.lines(), ["XXc def"]);
}

#[test]
fn marks_shift_with_edits_and_clear_with_their_line() {
    let mut editor = plain_editor(&["1", "2", "3", "4"]);
    assert!(editor.process_keys("jmajjmb"));
    assert!(editor.process_keys("ggdd"));
    assert_eq!(editor.marks().get('a').unwrap(), Position::new(0, 0));
    assert_eq!(editor.marks().get('b').unwrap(), Position::new(2, 0));

    assert!(editor.process_keys("dd"));
    assert!(matches!(
        editor.marks().get('a'),
        Err(EditorError::MarkNotSet('a'))
    ));
    assert_eq!(editor.marks().get('b').unwrap(), Position::new(1, 0));
    assert!(!editor.process_keys("'a"));
    assert!(editor.process_keys("'b"));
    assert_eq!(editor.cursor().line, 1);
}

#[test]
fn search_wraps_and_reports_it() {
    let (mut editor, log) = editor_with(&["alpha", "beta", "alpha2"]);
    assert!(editor.process_keys("/alpha<CR>"));
    assert_eq!(editor.cursor(), Position::new(2, 0));
    assert!(editor.process_keys("n"));
    assert_eq!(editor.cursor(), Position::new(0, 0));
    assert!(log
        .borrow()
        .messages
        .iter()
        .any(|m| m == "search hit BOTTOM, continuing at TOP"));
    assert!(!editor.process_keys("/nothing here<CR>"));
    assert_eq!(editor.cursor(), Position::new(0, 0));
    assert_eq!(editor.mode(), Mode::Normal);
}

#[test]
fn failed_command_reports_error_and_leaves_buffer() {
    let (mut editor, log) = editor_with(&["abc"]);
    assert!(!editor.process_keys("'z"));
    assert_eq!(editor.lines(), ["abc"]);
    assert_eq!(log.borrow().errors.len(), 1);
    assert_eq!(editor.mode(), Mode::Normal);
}

#[test]
fn open_line_with_autoindent() {
    let mut editor = plain_editor(&["    fn main() {"]);
    editor.settings_mut().autoindent = true;
    assert!(editor.process_keys("ox<Esc>"));
    assert_eq!(editor.lines(), ["    fn main() {", "    x"]);
    assert!(editor.process_keys("u"));
    assert_eq!(editor.lines(), ["    fn main() {"]);
}

#[test]
fn write_quit_without_file_name_fails() {
    let (mut editor, log) = editor_with(&["a"]);
    assert!(editor.process_keys("x"));
    assert!(!editor.process_keys("ZZ"));
    assert!(!editor.has_quit());
    assert!(editor.process_keys("ZQ"));
    assert!(editor.has_quit());
    assert!(log.borrow().quit);
}

#[test]
fn filter_lines_through_runner() {
    let mut editor = plain_editor(&["b", "a", "c"]);
    assert!(editor.process_keys("!Gsort<CR>"));
    assert_eq!(editor.lines(), ["a", "b", "c"]);
    assert_eq!(editor.mode(), Mode::Normal);
    assert!(editor.process_keys("!!upper<CR>"));
    assert_eq!(editor.lines(), ["A", "b", "c"]);
}

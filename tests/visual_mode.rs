mod common;

use common::{editor_with, plain_editor};
use vi_engine::{Mode, Position};

#[test]
fn block_delete_normalizes_columns() {
    let mut editor = plain_editor(&["abcd", "efgh", "ijkl"]);
    assert!(editor.process_keys("l<C-v>jl"));
    assert_eq!(editor.mode(), Mode::VisualBlock);
    assert!(editor.process_keys("d"));
    assert_eq!(editor.lines(), ["ad", "eh", "ijkl"]);
    assert_eq!(editor.mode(), Mode::Normal);
}

#[test]
fn block_selected_up_and_left_covers_the_same_cells() {
    let mut editor = plain_editor(&["abcd", "efgh", "ijkl"]);
    editor.set_cursor(Position::new(1, 2));
    assert!(editor.process_keys("<C-v>khd"));
    assert_eq!(editor.lines(), ["ad", "eh", "ijkl"]);
}

#[test]
fn linewise_delete_and_undo() {
    let mut editor = plain_editor(&["one", "two", "three"]);
    assert!(editor.process_keys("Vjd"));
    assert_eq!(editor.lines(), ["three"]);
    assert_eq!(editor.register_text('"').as_deref(), Some("one\ntwo"));
    assert!(editor.process_keys("u"));
    assert_eq!(editor.lines(), ["one", "two", "three"]);
}

#[test]
fn charwise_yank_leaves_buffer_and_sets_marks() {
    let mut editor = plain_editor(&["hello"]);
    assert!(editor.process_keys("vly"));
    assert_eq!(editor.lines(), ["hello"]);
    assert_eq!(editor.register_text('"').as_deref(), Some("he"));
    assert_eq!(editor.marks().get('<').unwrap(), Position::new(0, 0));
    assert_eq!(editor.marks().get('>').unwrap(), Position::new(0, 1));
    assert!(editor.selection().is_none());
}

#[test]
fn put_over_selection_replaces_it() {
    let mut editor = plain_editor(&["foo bar"]);
    assert!(editor.process_keys("yewvep"));
    assert_eq!(editor.lines(), ["foo foo"]);
    // The replaced text becomes the unnamed register.
    assert_eq!(editor.register_text('"').as_deref(), Some("bar"));
}

#[test]
fn colon_prefills_selection_range() {
    let (mut editor, _log) = editor_with(&["a", "b", "c", "d"]);
    assert!(editor.process_keys("jVj:"));
    assert_eq!(editor.command_line().as_deref(), Some(":'<,'>"));
    assert!(editor.process_keys("d<CR>"));
    assert_eq!(editor.lines(), ["a", "d"]);
    assert_eq!(editor.mode(), Mode::Normal);
}

#[test]
fn case_operators_on_selection() {
    let mut editor = plain_editor(&["abc def"]);
    assert!(editor.process_keys("vl~"));
    assert_eq!(editor.lines(), ["ABc def"]);
    assert!(editor.process_keys("VU"));
    assert_eq!(editor.lines(), ["ABC DEF"]);
    assert!(editor.process_keys("Vu"));
    assert_eq!(editor.lines(), ["abc def"]);
}

#[test]
fn shift_selected_lines() {
    let mut editor = plain_editor(&["a", "", "b"]);
    editor.settings_mut().shiftwidth = 4;
    editor.settings_mut().expandtab = true;
    assert!(editor.process_keys("Vjj>"));
    assert_eq!(editor.lines(), ["    a", "", "    b"]);
    assert!(editor.process_keys("Vjj<"));
    assert_eq!(editor.lines(), ["a", "", "b"]);
}

#[test]
fn escape_leaves_visual_mode_without_editing() {
    let (mut editor, log) = editor_with(&["abc"]);
    assert!(editor.process_keys("vl"));
    assert!(editor.selection().is_some());
    assert!(editor.process_keys("<Esc>"));
    assert_eq!(editor.mode(), Mode::Normal);
    assert!(editor.selection().is_none());
    assert_eq!(editor.lines(), ["abc"]);
    assert!(log.borrow().selection_changes >= 2);
}

#[test]
fn reselect_restores_last_selection() {
    let mut editor = plain_editor(&["one", "two", "three"]);
    assert!(editor.process_keys("Vj<Esc>G"));
    assert!(editor.process_keys("gvd"));
    assert_eq!(editor.lines(), ["three"]);
}

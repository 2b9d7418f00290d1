mod common;

use common::{RecordingInterface, ScriptedRunner, editor_with, plain_editor};
use vi_engine::{Editor, Position};

#[test]
fn substitute_over_range() {
    let mut editor = plain_editor(&["aa", "ba", "ca"]);
    assert!(editor.run_ex_command("1,2s/a/X/g"));
    assert_eq!(editor.lines(), ["XX", "bX", "ca"]);
    assert_eq!(editor.cursor().line, 1);
}

#[test]
fn substitute_reports_large_changes() {
    let (mut editor, log) = editor_with(&["a a", "a", "a"]);
    assert!(editor.run_ex_command(":%s/a/b/g"));
    assert_eq!(editor.lines(), ["b b", "b", "b"]);
    assert!(log
        .borrow()
        .messages
        .iter()
        .any(|m| m == "4 substitutions on 3 lines"));
}

#[test]
fn substitute_without_match_is_an_error() {
    let (mut editor, log) = editor_with(&["abc"]);
    assert!(!editor.run_ex_command("s/zzz/y/"));
    assert_eq!(editor.lines(), ["abc"]);
    assert_eq!(log.borrow().errors.len(), 1);
}

#[test]
fn substitute_with_groups_and_repeat() {
    let mut editor = plain_editor(&["key=value", "a=b"]);
    assert!(editor.run_ex_command(r"s/(\w+)=(\w+)/\2=\1/"));
    assert_eq!(editor.lines(), ["value=key", "a=b"]);
    assert!(editor.run_ex_command("2&"));
    assert_eq!(editor.lines(), ["value=key", "b=a"]);
}

#[test]
fn move_lines_to_top() {
    let mut editor = plain_editor(&["A", "B", "C", "D"]);
    assert!(editor.run_ex_command("2,3m0"));
    assert_eq!(editor.lines(), ["B", "C", "A", "D"]);
    assert_eq!(editor.cursor().line, 1);
}

#[test]
fn move_into_own_range_fails() {
    let mut editor = plain_editor(&["A", "B", "C", "D"]);
    assert!(!editor.run_ex_command("1,3m2"));
    assert_eq!(editor.lines(), ["A", "B", "C", "D"]);
}

#[test]
fn copy_lines_to_end() {
    let mut editor = plain_editor(&["a", "b"]);
    assert!(editor.run_ex_command("1t$"));
    assert_eq!(editor.lines(), ["a", "b", "a"]);
    assert!(editor.run_ex_command("1,2co0"));
    assert_eq!(editor.lines(), ["a", "b", "a", "b", "a"]);
}

#[test]
fn out_of_range_address_leaves_buffer_alone() {
    let (mut editor, log) = editor_with(&["1", "2", "3"]);
    assert!(!editor.run_ex_command("5d"));
    assert_eq!(editor.lines(), ["1", "2", "3"]);
    assert_eq!(log.borrow().errors, ["Invalid range"]);
    assert!(!editor.document().is_modified());
}

#[test]
fn marks_as_addresses() {
    let mut editor = plain_editor(&["1", "2", "3", "4"]);
    assert!(editor.run_ex_command("2ka"));
    assert!(editor.run_ex_command("3mark b"));
    assert!(editor.run_ex_command("'a,'bd"));
    assert_eq!(editor.lines(), ["1", "4"]);
}

#[test]
fn search_addresses_and_offsets() {
    let mut editor = plain_editor(&["start", "x", "middle", "y", "end"]);
    assert!(editor.run_ex_command("/middle/+1d"));
    assert_eq!(editor.lines(), ["start", "x", "middle", "end"]);
    assert!(editor.run_ex_command("$-1,$d"));
    assert_eq!(editor.lines(), ["start", "x"]);
}

#[test]
fn global_runs_command_on_matching_lines() {
    let mut editor = plain_editor(&["x1", "y", "x2", "y2"]);
    assert!(editor.run_ex_command("g/x/d"));
    assert_eq!(editor.lines(), ["y", "y2"]);
    // The whole global is one undo step.
    assert!(editor.undo());
    assert_eq!(editor.lines(), ["x1", "y", "x2", "y2"]);
}

#[test]
fn inverted_global() {
    let mut editor = plain_editor(&["x1", "y", "x2", "y2"]);
    assert!(editor.run_ex_command("v/x/d"));
    assert_eq!(editor.lines(), ["x1", "x2"]);
    assert!(editor.run_ex_command("g!/1/s/x/z/"));
    assert_eq!(editor.lines(), ["x1", "z2"]);
}

#[test]
fn global_copy_tracks_shifted_lines() {
    let mut editor = plain_editor(&["a", "b", "a"]);
    assert!(editor.run_ex_command("g/a/t."));
    assert_eq!(editor.lines(), ["a", "a", "b", "a", "a"]);
}

#[test]
fn global_without_match_fails() {
    let mut editor = plain_editor(&["a"]);
    assert!(!editor.run_ex_command("g/zzz/d"));
    assert_eq!(editor.lines(), ["a"]);
}

#[test]
fn append_insert_and_change_collect_lines() {
    let mut editor = plain_editor(&["one", "two", "three"]);
    assert!(editor.run_ex_command("2a"));
    assert!(editor.run_ex_command("after two"));
    assert!(editor.run_ex_command("."));
    assert_eq!(editor.lines(), ["one", "two", "after two", "three"]);

    assert!(editor.run_ex_command("1i"));
    assert!(editor.run_ex_command("zero"));
    assert!(editor.run_ex_command("."));
    assert_eq!(editor.lines()[0], "zero");

    assert!(editor.run_ex_command("2,3c"));
    assert!(editor.run_ex_command("ONE"));
    assert!(editor.run_ex_command("."));
    assert_eq!(editor.lines(), ["zero", "ONE", "after two", "three"]);
    assert_eq!(editor.register_text('"').as_deref(), Some("one\ntwo"));

    assert!(editor.undo());
    assert_eq!(editor.lines(), ["zero", "one", "two", "after two", "three"]);
}

#[test]
fn append_to_empty_buffer_replaces_blank_line() {
    let mut editor = plain_editor(&[""]);
    for line in ["a", "first", "second", "."] {
        assert!(editor.run_ex_command(line));
    }
    assert_eq!(editor.lines(), ["first", "second"]);
}

#[test]
fn filter_whole_buffer_through_runner() {
    let runner = ScriptedRunner::new();
    let calls = runner.calls.clone();
    let (interface, _log) = RecordingInterface::new();
    let mut editor = Editor::with_interface(Box::new(interface)).with_runner(Box::new(runner));
    common::set_lines(&mut editor, &["c", "a", "b"]);

    assert!(editor.run_ex_command("%!sort"));
    assert_eq!(editor.lines(), ["a", "b", "c"]);
    assert_eq!(
        *calls.borrow(),
        [("sort".to_string(), "c\na\nb\n".to_string())]
    );
    assert!(editor.undo());
    assert_eq!(editor.lines(), ["c", "a", "b"]);
}

#[test]
fn failing_filter_keeps_lines() {
    let (mut editor, log) = editor_with(&["a", "b"]);
    assert!(!editor.run_ex_command("%!missing-tool"));
    assert_eq!(editor.lines(), ["a", "b"]);
    assert_eq!(log.borrow().errors, ["Command failed: missing-tool: not found"]);
}

#[test]
fn read_command_output_below_line() {
    let runner = ScriptedRunner::new().reply("date", "Monday\n");
    let calls = runner.calls.clone();
    let mut editor = Editor::new().with_runner(Box::new(runner));
    common::set_lines(&mut editor, &["a", "b"]);
    assert!(editor.run_ex_command("1r !date"));
    assert_eq!(editor.lines(), ["a", "Monday", "b"]);
    assert_eq!(calls.borrow()[0], ("date".to_string(), String::new()));
}

#[test]
fn bang_without_range_prints_output() {
    let runner = ScriptedRunner::new().reply("ls", "one\ntwo\n");
    let mut editor = Editor::new().with_runner(Box::new(runner));
    assert!(editor.run_ex_command("!ls"));
    assert_eq!(editor.take_output(), ["one", "two"]);
    assert_eq!(editor.lines(), [""]);
}

#[test]
fn set_changes_settings_and_forwards_unknown_options() {
    let (interface, log) = RecordingInterface::new();
    let interface = interface.accepting("number");
    let mut editor = Editor::with_interface(Box::new(interface));

    assert!(editor.run_ex_command("set ts=4 ic"));
    assert_eq!(editor.settings().tabstop, 4);
    assert!(editor.settings().ignorecase);
    assert!(editor.run_ex_command("set noic"));
    assert!(!editor.settings().ignorecase);

    assert!(editor.run_ex_command("set number"));
    assert_eq!(log.borrow().options, [("number".to_string(), None)]);

    assert!(!editor.run_ex_command("set bogus"));
    assert_eq!(log.borrow().errors, ["Unknown option: bogus"]);
}

#[test]
fn listing_commands_call_host() {
    let (mut editor, log) = editor_with(&["one", "two"]);
    assert!(editor.process_keys("ma"));
    assert!(editor.process_keys("yy"));
    assert!(editor.run_ex_command("marks"));
    assert!(editor.run_ex_command("reg"));
    assert_eq!(log.borrow().marks_shown, 1);
    assert_eq!(log.borrow().registers_shown, 1);
    let output = editor.take_output();
    assert_eq!(output[0], "mark line  col text");
    assert!(output.iter().any(|l| l.starts_with(" a ") && l.ends_with(" one")));
    assert!(output.iter().any(|l| l.starts_with("\"\"") && l.ends_with("one")));
}

#[test]
fn print_styles_and_line_numbers() {
    let mut editor = plain_editor(&["a\tb", "second", "third"]);
    assert!(editor.run_ex_command("1l"));
    assert!(editor.run_ex_command("2nu"));
    assert!(editor.run_ex_command("="));
    assert!(editor.run_ex_command(".="));
    assert_eq!(editor.take_output(), ["a^Ib$", "     2  second", "3", "2"]);
    assert_eq!(editor.cursor(), Position::new(1, 0));
}

#[test]
fn number_command_accepts_single_letter() {
    let mut editor = plain_editor(&["a", "b"]);
    assert!(editor.run_ex_command("1,2n"));
    assert_eq!(editor.take_output(), ["     1  a", "     2  b"]);
}

#[test]
fn huge_address_offset_clamps_to_last_line() {
    let mut editor = plain_editor(&["abc", "bcd", "cde"]);
    assert!(editor.run_ex_command(".+99999999999999999999p"));
    assert_eq!(editor.take_output(), ["cde"]);
    assert_eq!(editor.cursor().line, 2);
}

#[test]
fn goto_line_by_number() {
    let mut editor = plain_editor(&["a", "  b", "c"]);
    assert!(editor.run_ex_command("2"));
    assert_eq!(editor.cursor(), Position::new(1, 2));
    assert!(editor.run_ex_command("$"));
    assert_eq!(editor.cursor().line, 2);
}

#[test]
fn quit_refuses_modified_buffer() {
    let (mut editor, log) = editor_with(&["a", "b"]);
    assert!(editor.run_ex_command("1d"));
    assert!(!editor.run_ex_command("q"));
    assert!(!editor.has_quit());
    assert_eq!(
        log.borrow().errors,
        ["No write since last change (add ! to override)"]
    );
    assert!(editor.run_ex_command("q!"));
    assert!(editor.has_quit());
    assert!(log.borrow().quit);
}

#[test]
fn ex_command_from_command_line_mode() {
    let mut editor = plain_editor(&["a", "b", "c"]);
    assert!(editor.process_keys(":2,3d<CR>"));
    assert_eq!(editor.lines(), ["a"]);
    assert!(editor.process_keys("u"));
    assert_eq!(editor.lines(), ["a", "b", "c"]);
}

#[test]
fn undo_and_redo_commands() {
    let (mut editor, log) = editor_with(&["a"]);
    assert!(editor.run_ex_command("undo"));
    assert!(log
        .borrow()
        .messages
        .iter()
        .any(|m| m == "Already at oldest change"));
    assert!(editor.run_ex_command("s/a/b/"));
    assert!(editor.run_ex_command("u"));
    assert_eq!(editor.lines(), ["a"]);
    assert!(editor.run_ex_command("red"));
    assert_eq!(editor.lines(), ["b"]);
}

#[test]
fn unknown_command_and_trailing_text() {
    let (mut editor, log) = editor_with(&["a"]);
    assert!(!editor.run_ex_command("frobnicate"));
    assert!(!editor.run_ex_command("1d x y"));
    assert_eq!(editor.lines(), ["a"]);
    assert_eq!(log.borrow().errors.len(), 2);
}

#[test]
fn join_and_shift() {
    let mut editor = plain_editor(&["a", "b", "c"]);
    editor.settings_mut().shiftwidth = 2;
    editor.settings_mut().expandtab = true;
    assert!(editor.run_ex_command("1,2j"));
    assert_eq!(editor.lines(), ["a b", "c"]);
    assert!(editor.run_ex_command("%>"));
    assert_eq!(editor.lines(), ["  a b", "  c"]);
    assert!(editor.run_ex_command("2<"));
    assert_eq!(editor.lines(), ["  a b", "c"]);
}

#[test]
fn yank_and_put_through_named_register() {
    let mut editor = plain_editor(&["a", "b", "c"]);
    assert!(editor.run_ex_command("1,2y x"));
    assert!(editor.run_ex_command("$pu x"));
    assert_eq!(editor.lines(), ["a", "b", "c", "a", "b"]);
    assert!(editor.run_ex_command("0put x"));
    assert_eq!(editor.lines()[..2], ["a", "b"]);
    assert_eq!(editor.lines().len(), 7);
}

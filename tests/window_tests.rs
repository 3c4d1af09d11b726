mod common;

use std::fs;

use common::{ScriptedPrompt, harness};
use cp_workbench::{
    collaborators::{ExecutionFinished, Language},
    companion::{CompanionData, CompanionTest},
    config::Settings,
    document::SaveChoice,
    verdict::Verdict,
};
use tempfile::tempdir;

#[test]
fn construction_clears_stale_executables() {
    let h = harness(Settings::default());
    assert_eq!(h.calls.borrow().removed_executables, 1);
    assert_eq!(h.window.slots().len(), 3);
    assert_eq!(h.window.file_name(), "Unsaved file");
}

#[test]
fn open_reads_source_and_tests() {
    let temp = tempdir().expect("temp dir");
    let source = temp.path().join("sol.cpp");
    fs::write(&source, "int main() {}\n").unwrap();
    fs::write(temp.path().join("sol1.in"), "1\n").unwrap();
    fs::write(temp.path().join("sol1.ans"), "2\n").unwrap();

    let mut h = harness(Settings::default());
    h.window.open(&source);

    assert_eq!(h.window.text(), "int main() {}\n");
    assert_eq!(h.window.file_name(), "sol.cpp");
    assert_eq!(h.window.slots().get(0).unwrap().input, "1\n");
    assert_eq!(h.window.slots().get(0).unwrap().expected, "2\n");
    assert!(!h.window.is_modified());
}

#[test]
fn open_of_unreadable_path_stays_unsaved() {
    let temp = tempdir().expect("temp dir");
    let mut h = harness(Settings::default());
    h.window.open(temp.path().join("missing.cpp"));

    assert!(h.window.document().is_none());
    assert!(h.log.contains(
        "Loader",
        "The file path was not loaded. Read/Write permission missing"
    ));
}

#[test]
fn save_clears_dirty_state_until_next_edit() {
    let temp = tempdir().expect("temp dir");
    let path = temp.path().join("a.cpp");
    let mut h = harness(Settings::default());
    h.window.set_text("int main() { return 0; }");
    assert!(h.window.is_text_changed());

    let mut prompt = ScriptedPrompt::new(Some(&path), SaveChoice::Cancel);
    assert!(h.window.save(&mut prompt));
    assert_eq!(prompt.asked_path, 1);
    assert!(!h.window.is_text_changed());
    assert!(!h.window.is_modified());
    assert!(h.log.contains("Save", &format!("Saved file : {}", path.display())));

    h.window.text_mut().push('\n');
    assert!(h.window.is_text_changed());
    h.window.on_text_changed();
    assert!(h.window.is_modified());

    assert!(h.window.save(&mut ScriptedPrompt::never()));
    assert!(!h.window.is_text_changed());
    assert_eq!(fs::read_to_string(&path).unwrap(), "int main() { return 0; }\n");
}

#[test]
fn dirty_check_follows_disk_not_last_save() {
    let temp = tempdir().expect("temp dir");
    let path = temp.path().join("a.cpp");
    fs::write(&path, "v1").unwrap();
    let mut h = harness(Settings::default());
    h.window.open(&path);
    assert!(!h.window.is_text_changed());

    fs::write(&path, "v2").unwrap();
    assert!(h.window.is_text_changed());
}

#[test]
fn unsaved_buffer_compares_against_template() {
    let temp = tempdir().expect("temp dir");
    let template = temp.path().join("template.cpp");
    fs::write(&template, "#include <bits/stdc++.h>\n").unwrap();

    let mut h = harness(Settings::default());
    assert!(!h.window.is_text_changed());
    h.window.set_text("x");
    assert!(h.window.is_text_changed());

    h.window.set_template_path(Some(template.clone()));
    h.window.set_text("#include <bits/stdc++.h>\n");
    assert!(!h.window.is_text_changed());
    h.window.set_text("");
    assert!(h.window.is_text_changed());

    h.window.set_template_path(Some(temp.path().join("gone.cpp")));
    assert!(!h.window.is_text_changed());
}

#[test]
fn failed_write_leaves_document_detached_and_dirty() {
    let temp = tempdir().expect("temp dir");
    let target = temp.path().join("dir.cpp");
    fs::create_dir(&target).unwrap();

    let mut h = harness(Settings::default());
    h.window.set_text("code");
    assert!(h.window.save(&mut ScriptedPrompt::new(Some(&target), SaveChoice::Cancel)));

    let document = h.window.document().expect("document");
    assert!(!document.open);
    assert_eq!(h.window.file_name(), "Unsaved file");
    assert!(h.window.is_text_changed());
    assert!(h.log.contains("Save", "Cannot save file. Do I have write permission?"));
}

#[test]
fn save_without_destination_fails() {
    let mut h = harness(Settings::default());
    h.window.set_text("code");
    assert!(!h.window.save(&mut ScriptedPrompt::never()));
    assert!(!h.window.save_file(false, "Compiler", &mut ScriptedPrompt::never()));
    assert!(h.window.document().is_none());
}

#[test]
fn save_as_restores_document_when_cancelled() {
    let temp = tempdir().expect("temp dir");
    let path = temp.path().join("a.cpp");
    fs::write(&path, "v1").unwrap();
    let mut h = harness(Settings::default());
    h.window.open(&path);

    assert!(!h.window.save_as(&mut ScriptedPrompt::never()));
    assert_eq!(h.window.document().unwrap().path, path);

    let copy = temp.path().join("b.cpp");
    h.window.slots_mut().get_mut(0).unwrap().input = "7".to_string();
    assert!(h.window.save_as(&mut ScriptedPrompt::new(Some(&copy), SaveChoice::Cancel)));
    assert_eq!(h.window.file_name(), "b.cpp");
    assert_eq!(fs::read_to_string(temp.path().join("b1.in")).unwrap(), "7");
}

#[test]
fn close_confirmation_follows_the_choice() {
    let temp = tempdir().expect("temp dir");
    let path = temp.path().join("a.cpp");

    let mut h = harness(Settings::default());
    let mut untouched = ScriptedPrompt::never();
    assert!(h.window.close_changed_confirm(&mut untouched));
    assert_eq!(untouched.asked_close, 0);

    h.window.set_text("edited");
    let mut cancel = ScriptedPrompt::new(Some(&path), SaveChoice::Cancel);
    assert!(!h.window.close_changed_confirm(&mut cancel));
    assert_eq!(cancel.asked_close, 1);
    assert!(!path.exists());

    assert!(h.window.close_changed_confirm(&mut ScriptedPrompt::new(None, SaveChoice::Discard)));
    assert!(!path.exists());

    assert!(!h.window.close_changed_confirm(&mut ScriptedPrompt::new(None, SaveChoice::Save)));

    let mut save = ScriptedPrompt::new(Some(&path), SaveChoice::Save);
    assert!(h.window.close_changed_confirm(&mut save));
    assert_eq!(fs::read_to_string(&path).unwrap(), "edited");
}

#[test]
fn run_results_produce_verdicts() {
    let mut h = harness(Settings::default());
    h.window.set_text("print(42)");
    for (index, expected) in ["42\n", "42\n", ""].into_iter().enumerate() {
        let slot = h.window.slots_mut().get_mut(index).unwrap();
        slot.input = "in".to_string();
        slot.expected = expected.to_string();
    }

    h.window.run(&mut ScriptedPrompt::never());
    {
        let calls = h.calls.borrow();
        let run = calls.runs.last().expect("run recorded");
        assert_eq!(run.source.as_deref(), Some("print(42)"));
        assert_eq!(run.enabled, vec![true, true, true]);
        assert_eq!(run.inputs.len(), 3);
    }

    h.calls.borrow_mut().pending = vec![
        ExecutionFinished { slot: 2, elapsed_ms: 3, stdout: "7".to_string() },
        ExecutionFinished { slot: 0, elapsed_ms: 12, stdout: "42".to_string() },
        ExecutionFinished { slot: 1, elapsed_ms: 9, stdout: "24".to_string() },
    ];
    assert_eq!(h.window.poll_executions(), 3);

    let verdicts: Vec<_> = h.window.slots().iter().map(|slot| slot.verdict).collect();
    assert_eq!(verdicts, vec![Verdict::Accepted, Verdict::WrongAnswer, Verdict::Unknown]);
    assert_eq!(h.window.slots().get(2).unwrap().output, "7");
    assert!(h.log.contains(
        "Runner[1]",
        "Execution for case #1 completed and took 12 milliseconds."
    ));
}

#[test]
fn run_only_skips_compilation_and_blank_inputs() {
    let mut h = harness(Settings::default());
    h.window.slots_mut().get_mut(1).unwrap().input = "5".to_string();
    h.window.slots_mut().get_mut(0).unwrap().output = "stale".to_string();
    h.window.update_verdict(Verdict::Accepted, 0);

    h.window.run_only(&mut ScriptedPrompt::never());

    let calls = h.calls.borrow();
    let run = calls.runs.last().expect("run recorded");
    assert!(run.source.is_none());
    assert_eq!(run.enabled, vec![false, true, false]);
    assert!(h.window.slots().get(0).unwrap().output.is_empty());
    assert_eq!(h.window.slots().get(0).unwrap().verdict, Verdict::Unknown);
}

#[test]
fn empty_output_keeps_verdict_unknown() {
    let mut h = harness(Settings::default());
    h.window.slots_mut().get_mut(0).unwrap().expected = "1".to_string();
    h.window.execution_finished(0, 5, String::new());
    assert_eq!(h.window.slots().get(0).unwrap().verdict, Verdict::Unknown);

    h.window.execution_finished(9, 5, "1".to_string());
    assert!(h.log.contains("Runner", "Ignoring result for unknown case #10"));
}

#[test]
fn compile_and_detached_use_current_text() {
    let mut settings = Settings::default();
    settings.language = Language::Java;
    let mut h = harness(settings);
    h.window.set_text("class Main {}");

    h.window.compile(&mut ScriptedPrompt::never());
    h.window.detached_execution();
    h.window.kill_processes();

    let calls = h.calls.borrow();
    assert_eq!(calls.compiled, vec![("class Main {}".to_string(), Language::Java)]);
    assert_eq!(calls.detached, vec!["class Main {}".to_string()]);
    assert_eq!(calls.kills, 1);
}

#[test]
fn compile_saves_an_open_document_first() {
    let temp = tempdir().expect("temp dir");
    let path = temp.path().join("a.cpp");
    fs::write(&path, "old").unwrap();
    let mut h = harness(Settings::default());
    h.window.open(&path);
    h.window.set_text("new");

    h.window.compile(&mut ScriptedPrompt::never());
    assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    assert!(h.log.contains("Compiler", &format!("Saved with file name {}", path.display())));
}

#[test]
fn format_replaces_text_or_reports_failure() {
    let mut h = harness(Settings::default());
    h.window.set_text("int  main(){}");
    h.window.format_source();
    assert_eq!(h.window.text(), "int  main(){}");
    assert_eq!(h.log.entries().last().unwrap().category, "Formatter");

    h.calls.borrow_mut().formatted = Some("int main() {}\n".to_string());
    h.window.format_source();
    assert_eq!(h.window.text(), "int main() {}\n");
}

#[test]
fn command_setters_reach_the_toolchain() {
    let mut h = harness(Settings::default());
    h.window.set_format_command("cat");
    h.window.set_compile_command("clang++ -O2");
    h.window.set_run_command("pypy3");
    h.window.set_prepend_run_command("timeout 5");

    let calls = h.calls.borrow();
    assert_eq!(calls.configured.len(), 4);
    let last = calls.configured.last().unwrap();
    assert_eq!(last.format_command, "cat");
    assert_eq!(last.compile_command, "clang++ -O2");
    assert_eq!(last.run_command, "pypy3");
    assert_eq!(last.prepend_run_command, "timeout 5");
    assert_eq!(last, h.window.settings());
}

#[test]
fn companion_fills_slots_and_header() {
    let mut settings = Settings::default();
    settings.language = Language::Python;
    let mut h = harness(settings);
    let data = CompanionData {
        name: "A. Sum".to_string(),
        group: "Round 1".to_string(),
        url: "https://example.com/a".to_string(),
        memory_limit: 256,
        time_limit: 2000,
        tests: (1..=4)
            .map(|n| CompanionTest {
                input: format!("{n}\n"),
                output: format!("{}\n", n * 2),
            })
            .collect(),
    };

    h.window.apply_companion(&data);

    assert!(h.window.text().starts_with("\n# Problem: A. Sum\n# Contest: Round 1\n"));
    assert!(h.window.text().contains("# Powered by cp-workbench\n\n"));
    assert_eq!(h.window.slots().get(2).unwrap().expected, "6\n");
    assert!(h.log.contains(
        "cp-workbench",
        "More than 3 testcases were produced. Only the first 3 will be used"
    ));

    let text = h.window.text().to_string();
    h.window.apply_companion(&CompanionData::default());
    assert_eq!(h.window.text(), text);
    assert!(h.window.slots().iter().all(|slot| slot.input.is_empty()));
}

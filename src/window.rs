//! Per-window state and the operations behind the window's buttons.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    collaborators::{Language, RunRequest, Toolchain},
    companion::CompanionData,
    config::Settings,
    document::{self, OpenDocument, SavePrompt, UNSAVED_FILE_NAME},
    fs::{FileSystem, LocalFs},
    logging::LogSink,
    persistence,
    slots::TestSlots,
    verdict::Verdict,
};

const POWERED_BY: &str = "Powered by cp-workbench";

pub struct Window {
    index: usize,
    text: String,
    slots: TestSlots,
    document: Option<OpenDocument>,
    settings: Settings,
    modified: bool,
    toolchain: Toolchain,
    fs: Box<dyn FileSystem>,
    sink: Arc<dyn LogSink>,
}

impl Window {
    pub fn new(
        index: usize,
        settings: Settings,
        toolchain: Toolchain,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self::with_file_system(index, settings, toolchain, sink, Box::new(LocalFs))
    }

    pub fn with_file_system(
        index: usize,
        settings: Settings,
        mut toolchain: Toolchain,
        sink: Arc<dyn LogSink>,
        fs: Box<dyn FileSystem>,
    ) -> Self {
        toolchain.runner.remove_executable();
        Self {
            index,
            text: String::new(),
            slots: TestSlots::new(settings.slot_count),
            document: None,
            settings,
            modified: false,
            toolchain,
            fs,
            sink,
        }
    }

    /// Loads `path` into the editor and picks up its test files.
    pub fn open(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        match self.fs.read_to_string(&path) {
            Ok(contents) => {
                self.text = contents;
                self.document = Some(OpenDocument::new(path));
            }
            Err(_) => {
                self.sink.warn(
                    "Loader",
                    "The file path was not loaded. Read/Write permission missing",
                );
                self.document = None;
            }
        }
        self.load_tests();
        self.on_text_changed();
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.on_text_changed();
    }

    /// Mutable access for editor widgets; call [`Window::on_text_changed`] after edits.
    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn slots(&self) -> &TestSlots {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut TestSlots {
        &mut self.slots
    }

    pub fn document(&self) -> Option<&OpenDocument> {
        self.document.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    pub fn file_name(&self) -> String {
        match &self.document {
            Some(document) if document.open => document.file_name(),
            _ => UNSAVED_FILE_NAME.to_string(),
        }
    }

    /// Cached result of the last dirty check.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn on_text_changed(&mut self) {
        self.modified = self.is_text_changed();
    }

    pub fn is_text_changed(&self) -> bool {
        document::is_text_changed(
            &self.text,
            self.document.as_ref(),
            self.settings.template_path.as_deref(),
            self.fs.as_ref(),
        )
    }

    pub fn set_compile_command(&mut self, command: impl Into<String>) {
        self.settings.compile_command = command.into();
        self.toolchain.configure(&self.settings);
    }

    pub fn set_run_command(&mut self, command: impl Into<String>) {
        self.settings.run_command = command.into();
        self.toolchain.configure(&self.settings);
    }

    pub fn set_prepend_run_command(&mut self, command: impl Into<String>) {
        self.settings.prepend_run_command = command.into();
        self.toolchain.configure(&self.settings);
    }

    pub fn set_format_command(&mut self, command: impl Into<String>) {
        self.settings.format_command = command.into();
        self.toolchain.configure(&self.settings);
    }

    pub fn set_template_path(&mut self, path: Option<PathBuf>) {
        self.settings.template_path = path;
    }

    pub fn set_save_tests(&mut self, enabled: bool) {
        self.settings.save_tests = enabled;
    }

    pub fn set_language(&mut self, language: Language) {
        self.settings.language = language;
    }

    pub fn clear_tests(&mut self, output_only: bool) {
        self.slots.clear(output_only);
    }

    pub fn update_verdict(&mut self, verdict: Verdict, slot: usize) {
        if let Some(slot) = self.slots.get_mut(slot) {
            slot.verdict = verdict;
        }
    }

    pub fn load_tests(&mut self) {
        persistence::load_tests(
            self.document.as_ref().map(|document| document.path.as_path()),
            self.settings.save_tests,
            &mut self.slots,
            self.fs.as_ref(),
            self.sink.as_ref(),
        );
    }

    pub fn save_tests(&self) {
        persistence::save_tests(
            self.document_path(),
            self.settings.save_tests,
            &self.slots,
            self.fs.as_ref(),
            self.sink.as_ref(),
        );
    }

    fn document_path(&self) -> Option<&Path> {
        self.document.as_ref().map(|document| document.path.as_path())
    }

    /// Fills the slots from a companion payload.
    ///
    /// An untouched unsaved buffer also gets the problem summary as a comment header.
    pub fn apply_companion(&mut self, data: &CompanionData) {
        if self.document.is_none() && !self.is_text_changed() {
            let comment = format!("\n{}", self.settings.language.line_comment());
            let meta = format!("\n{}{POWERED_BY}", data.to_meta_string()).replace('\n', &comment);
            self.text = format!("{meta}\n\n{}", self.text);
        }

        self.clear_tests(false);

        let capacity = self.slots.len();
        if data.tests.len() > capacity {
            self.sink.warn(
                "cp-workbench",
                &format!(
                    "More than {capacity} testcases were produced. Only the first {capacity} will be used"
                ),
            );
        }
        for (slot, test) in self.slots.iter_mut().zip(&data.tests) {
            slot.input = test.input.clone();
            slot.expected = test.output.clone();
        }
        self.on_text_changed();
    }

    /// Writes the editor text to the backing file, asking for one when `force` is set.
    ///
    /// Returns false when there is nowhere to save to.
    pub fn save_file(&mut self, force: bool, head: &str, prompt: &mut dyn SavePrompt) -> bool {
        if let Some(path) = self.document_path().map(Path::to_path_buf) {
            match self.fs.write(&path, &self.text) {
                Ok(()) => {
                    self.sink
                        .info(head, &format!("Saved with file name {}", path.display()));
                    if let Some(document) = self.document.as_mut() {
                        document.open = true;
                    }
                }
                Err(_) => self
                    .sink
                    .error(head, "Cannot save file. Do I have write permission?"),
            }
        } else if force {
            let Some(path) = prompt.save_path(head) else {
                return false;
            };
            match self.fs.write(&path, &self.text) {
                Ok(()) => {
                    self.sink
                        .info(head, &format!("Saved file : {}", path.display()));
                    self.document = Some(OpenDocument::new(path));
                }
                Err(_) => {
                    self.sink
                        .error(head, "Cannot save file. Do I have write permission?");
                    self.document = Some(OpenDocument::detached(path));
                }
            }
        } else {
            return false;
        }
        self.save_tests();
        self.on_text_changed();
        true
    }

    pub fn save(&mut self, prompt: &mut dyn SavePrompt) -> bool {
        self.save_file(true, "Save", prompt)
    }

    /// Saves under a new name, keeping the current document if that fails.
    pub fn save_as(&mut self, prompt: &mut dyn SavePrompt) -> bool {
        let previous = self.document.take();
        let saved = self.save_file(true, "Save as", prompt);
        if !saved {
            self.document = previous;
            self.on_text_changed();
        }
        saved
    }

    /// Whether the window may close. Unsaved changes go through `prompt`.
    pub fn close_changed_confirm(&mut self, prompt: &mut dyn SavePrompt) -> bool {
        let changed = self.is_text_changed();
        let file_name = self.file_name();
        document::close_changed_confirm(changed, &file_name, prompt, |prompt| {
            self.save_file(true, "Save", prompt)
        })
    }

    pub fn compile(&mut self, prompt: &mut dyn SavePrompt) {
        self.sink.clear();
        self.save_file(false, "Compiler", prompt);
        if let Err(error) = self
            .toolchain
            .compiler
            .compile(&self.text, self.settings.language)
        {
            self.sink.error("Compiler", &format!("{error:#}"));
        }
    }

    /// Compiles the current source and runs it on every non-blank input.
    pub fn run(&mut self, prompt: &mut dyn SavePrompt) {
        self.start_run(true, prompt);
    }

    /// Runs the last build on every non-blank input.
    pub fn run_only(&mut self, prompt: &mut dyn SavePrompt) {
        self.start_run(false, prompt);
    }

    fn start_run(&mut self, compile: bool, prompt: &mut dyn SavePrompt) {
        self.sink.clear();
        self.clear_tests(true);
        self.save_file(false, "Compiler", prompt);

        let inputs = match self.toolchain.input_writer.write_inputs(&self.slots.inputs()) {
            Ok(inputs) => inputs,
            Err(error) => {
                self.sink.error("Runner", &format!("{error:#}"));
                return;
            }
        };

        let request = RunRequest {
            source: compile.then_some(self.text.as_str()),
            language: self.settings.language,
            enabled: self.slots.enabled(),
            inputs,
        };
        if let Err(error) = self.toolchain.runner.run(request) {
            self.sink.error("Runner", &format!("{error:#}"));
        }
    }

    pub fn detached_execution(&mut self) {
        self.sink.clear();
        if let Err(error) = self
            .toolchain
            .runner
            .run_detached(&self.text, self.settings.language)
        {
            self.sink.error("Runner", &format!("{error:#}"));
        }
    }

    pub fn format_source(&mut self) {
        match self.toolchain.formatter.format(&self.text) {
            Ok(formatted) => self.set_text(formatted),
            Err(error) => self.sink.error("Formatter", &format!("{error:#}")),
        }
    }

    pub fn kill_processes(&mut self) {
        self.toolchain.runner.kill_all();
    }

    /// Applies one slot's run result. Completions may arrive in any order.
    pub fn execution_finished(&mut self, slot: usize, elapsed_ms: u64, stdout: String) {
        let number = slot + 1;
        let Some(target) = self.slots.get_mut(slot) else {
            self.sink.warn(
                "Runner",
                &format!("Ignoring result for unknown case #{number}"),
            );
            return;
        };
        self.sink.info(
            &format!("Runner[{number}]"),
            &format!("Execution for case #{number} completed and took {elapsed_ms} milliseconds."),
        );
        target.record_output(stdout);
    }

    /// Applies every completion the runner has queued.
    pub fn poll_executions(&mut self) -> usize {
        let finished = self.toolchain.runner.poll_finished();
        let count = finished.len();
        for result in finished {
            self.execution_finished(result.slot, result.elapsed_ms, result.stdout);
        }
        count
    }
}

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use eframe::egui;

use crate::{
    collaborators::Language,
    companion::CompanionData,
    config::Settings,
    document::{SaveChoice, SavePrompt},
    logging::{LogSink, MessageLog, Severity},
    verdict::Verdict,
    watcher::{DocumentEvent, DocumentWatcher},
    window::Window,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Answers save prompts from the path field and the close dialog.
struct FieldPrompt {
    path: String,
    choice: SaveChoice,
}

impl SavePrompt for FieldPrompt {
    fn save_path(&mut self, _title: &str) -> Option<PathBuf> {
        let path = self.path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    fn confirm_close(&mut self, _file_name: &str) -> SaveChoice {
        self.choice
    }
}

enum Action {
    Open,
    Save,
    SaveAs,
    Compile,
    Run,
    RunOnly,
    Detached,
    Format,
    Kill,
    ClearTests,
    ApplyCompanion,
    Language(Language),
    SaveTests(bool),
    Close(SaveChoice),
}

/// What happens once the save/discard dialog lets the current buffer go.
#[derive(Clone, Copy)]
enum Closing {
    Open,
    Quit,
}

/// Runs the save/discard protocol before `closing`. Returns whether to go ahead.
fn confirm_closing(
    window: &mut Window,
    closing: Closing,
    choice: SaveChoice,
    path_field: &str,
) -> bool {
    let path = match closing {
        // The path field names the file to open, not a save target.
        Closing::Open => String::new(),
        Closing::Quit => path_field.to_string(),
    };
    window.close_changed_confirm(&mut FieldPrompt { path, choice })
}

pub struct WorkbenchApp {
    window: Window,
    messages: Arc<MessageLog>,
    settings_path: PathBuf,
    path_field: String,
    companion_json: String,
    closing: Option<Closing>,
    allow_close: bool,
    title: String,
    watcher: Option<DocumentWatcher>,
    disk_changed: Arc<AtomicBool>,
}

impl WorkbenchApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        window: Window,
        messages: Arc<MessageLog>,
        settings_path: PathBuf,
    ) -> Self {
        log::info!("Initializing WorkbenchApp");

        let path_field = window
            .document()
            .map(|document| document.path.display().to_string())
            .unwrap_or_default();
        let mut app = Self {
            window,
            messages,
            settings_path,
            path_field,
            companion_json: String::new(),
            closing: None,
            allow_close: false,
            title: String::new(),
            watcher: None,
            disk_changed: Arc::new(AtomicBool::new(false)),
        };
        app.refresh_watcher();
        app
    }

    fn prompt(&self, choice: SaveChoice) -> FieldPrompt {
        FieldPrompt {
            path: self.path_field.clone(),
            choice,
        }
    }

    fn apply(&mut self, action: Action, ctx: &egui::Context) {
        let mut prompt = self.prompt(SaveChoice::Cancel);
        match action {
            Action::Open => {
                if self.window.is_text_changed() {
                    self.closing = Some(Closing::Open);
                } else {
                    self.open_from_field();
                }
            }
            Action::Save => {
                self.window.save(&mut prompt);
            }
            Action::SaveAs => {
                self.window.save_as(&mut prompt);
            }
            Action::Compile => self.window.compile(&mut prompt),
            Action::Run => self.window.run(&mut prompt),
            Action::RunOnly => self.window.run_only(&mut prompt),
            Action::Detached => self.window.detached_execution(),
            Action::Format => self.window.format_source(),
            Action::Kill => self.window.kill_processes(),
            Action::ClearTests => self.window.clear_tests(false),
            Action::ApplyCompanion => match CompanionData::from_json(&self.companion_json) {
                Ok(data) => self.window.apply_companion(&data),
                Err(error) => self.messages.error("Companion", &format!("{error:#}")),
            },
            Action::Language(language) => {
                self.window.set_language(language);
                self.persist_settings();
            }
            Action::SaveTests(enabled) => {
                self.window.set_save_tests(enabled);
                self.persist_settings();
            }
            Action::Close(choice) => {
                let Some(closing) = self.closing.take() else {
                    return;
                };
                if !confirm_closing(&mut self.window, closing, choice, &self.path_field) {
                    if let (Closing::Open, SaveChoice::Save) = (closing, choice) {
                        self.messages
                            .warn("Loader", "Use Save as to name this file before opening another");
                    }
                    return;
                }
                match closing {
                    Closing::Open => self.open_from_field(),
                    Closing::Quit => {
                        self.window.kill_processes();
                        self.allow_close = true;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                }
            }
        }
        self.refresh_watcher();
    }

    fn open_from_field(&mut self) {
        let path = self.path_field.trim().to_string();
        if !path.is_empty() {
            self.window.clear_tests(false);
            self.window.open(path);
        }
    }

    fn persist_settings(&self) {
        if let Err(error) = Settings::save(self.window.settings(), &self.settings_path) {
            log::error!("Failed to save settings: {error:#}");
        }
    }

    fn refresh_watcher(&mut self) {
        let Some(path) = self.window.document().map(|document| document.path.clone()) else {
            self.watcher = None;
            return;
        };
        if self
            .watcher
            .as_ref()
            .is_some_and(|watcher| watcher.path() == path)
        {
            return;
        }

        let flag = Arc::clone(&self.disk_changed);
        self.watcher = match DocumentWatcher::new(path, move |event| {
            if let DocumentEvent::Changed { .. } = event {
                flag.store(true, Ordering::SeqCst);
            }
        }) {
            Ok(watcher) => Some(watcher),
            Err(error) => {
                log::warn!("Document watcher unavailable: {error:#}");
                None
            }
        };
    }

    fn update_title(&mut self, ctx: &egui::Context) {
        let marker = if self.window.is_modified() { "*" } else { "" };
        let title = format!("{}{marker} - cp-workbench", self.window.file_name());
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        ui.horizontal_wrapped(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.path_field)
                    .hint_text("path/to/solution.cpp")
                    .desired_width(260.0),
            );
            for (label, action) in [
                ("Open", Action::Open),
                ("Save", Action::Save),
                ("Save as", Action::SaveAs),
            ] {
                if ui.button(label).clicked() {
                    actions.push(action);
                }
            }
            ui.separator();
            for (label, action) in [
                ("Compile", Action::Compile),
                ("Compile & Run", Action::Run),
                ("Run", Action::RunOnly),
                ("Detached", Action::Detached),
                ("Kill", Action::Kill),
                ("Format", Action::Format),
            ] {
                if ui.button(label).clicked() {
                    actions.push(action);
                }
            }
            ui.separator();

            let mut language = self.window.settings().language;
            egui::ComboBox::from_id_salt("language")
                .selected_text(language.name())
                .show_ui(ui, |ui| {
                    for option in Language::ALL {
                        ui.selectable_value(&mut language, option, option.name());
                    }
                });
            if language != self.window.settings().language {
                actions.push(Action::Language(language));
            }

            let mut save_tests = self.window.settings().save_tests;
            if ui.checkbox(&mut save_tests, "Save tests").changed() {
                actions.push(Action::SaveTests(save_tests));
            }
        });
    }

    fn tests_panel(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (index, slot) in self.window.slots_mut().iter_mut().enumerate() {
                let number = index + 1;
                ui.group(|ui| {
                    ui.horizontal(|ui| {
                        ui.strong(format!("Case #{number}"));
                        let label = slot.verdict.label();
                        match slot.verdict.color() {
                            Some([r, g, b]) => {
                                ui.colored_label(egui::Color32::from_rgb(r, g, b), label);
                            }
                            None => {
                                ui.label(label);
                            }
                        }
                    });
                    ui.label(format!("Input {number}"));
                    ui.add(
                        egui::TextEdit::multiline(&mut slot.input)
                            .code_editor()
                            .desired_rows(3),
                    );
                    ui.label(format!("Expected {number}"));
                    ui.add(
                        egui::TextEdit::multiline(&mut slot.expected)
                            .code_editor()
                            .desired_rows(3),
                    );
                    ui.label(format!("Output {number}"));
                    ui.add(
                        egui::TextEdit::multiline(&mut slot.output.as_str())
                            .code_editor()
                            .desired_rows(3),
                    );
                    if slot.verdict == Verdict::WrongAnswer {
                        ui.small("Output differs from the expected answer");
                    }
                });
                ui.add_space(8.0);
            }

            if ui.button("Clear tests").clicked() {
                actions.push(Action::ClearTests);
            }

            ui.collapsing("Import problem", |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut self.companion_json)
                        .hint_text("Competitive Companion JSON")
                        .code_editor()
                        .desired_rows(4),
                );
                if ui.button("Apply").clicked() {
                    actions.push(Action::ApplyCompanion);
                }
            });
        });
    }

    fn messages_panel(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for entry in self.messages.entries() {
                    let text = format!("[{}] {}", entry.category, entry.message);
                    match entry.severity {
                        Severity::Info => ui.label(text),
                        Severity::Warn => {
                            ui.colored_label(egui::Color32::from_rgb(200, 140, 0), text)
                        }
                        Severity::Error => {
                            ui.colored_label(egui::Color32::from_rgb(220, 0, 0), text)
                        }
                    };
                }
            });
    }

    fn close_dialog(&self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        egui::Window::new("Save?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "{} has been modified.\nDo you want to save your changes?",
                    self.window.file_name()
                ));
                ui.horizontal(|ui| {
                    for (label, choice) in [
                        ("Save", SaveChoice::Save),
                        ("Discard", SaveChoice::Discard),
                        ("Cancel", SaveChoice::Cancel),
                    ] {
                        if ui.button(label).clicked() {
                            actions.push(Action::Close(choice));
                        }
                    }
                });
            });
    }
}

impl eframe::App for WorkbenchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.window.poll_executions();
        if self.disk_changed.swap(false, Ordering::SeqCst) {
            self.window.on_text_changed();
        }

        if ctx.input(|input| input.viewport().close_requested()) && !self.allow_close {
            if self.window.is_text_changed() {
                ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
                self.closing = Some(Closing::Quit);
            } else {
                self.window.kill_processes();
            }
        }

        let mut actions = Vec::new();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui, &mut actions);
        });

        egui::TopBottomPanel::bottom("messages")
            .resizable(true)
            .default_height(120.0)
            .show(ctx, |ui| {
                self.messages_panel(ui);
            });

        egui::SidePanel::right("tests")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                self.tests_panel(ui, &mut actions);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                let response = ui.add(
                    egui::TextEdit::multiline(self.window.text_mut())
                        .code_editor()
                        .desired_width(f32::INFINITY)
                        .desired_rows(32),
                );
                if response.changed() {
                    self.window.on_text_changed();
                }
            });
        });

        if self.closing.is_some() {
            self.close_dialog(ctx, &mut actions);
        }

        for action in actions {
            self.apply(action, ctx);
        }

        self.update_title(ctx);
        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

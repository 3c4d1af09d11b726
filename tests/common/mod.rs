#![allow(dead_code)]

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
};

use anyhow::{Result, bail};
use cp_workbench::{
    collaborators::{
        Compiler, ExecutionFinished, Formatter, InputWriter, Language, Runner, RunRequest,
        Toolchain,
    },
    config::Settings,
    document::{SaveChoice, SavePrompt},
    logging::{LogSink, MessageLog},
    window::Window,
};

#[derive(Debug, Default)]
pub struct Calls {
    pub compiled: Vec<(String, Language)>,
    pub runs: Vec<RecordedRun>,
    pub detached: Vec<String>,
    pub kills: usize,
    pub removed_executables: usize,
    pub pending: Vec<ExecutionFinished>,
    pub formatted: Option<String>,
    pub configured: Vec<Settings>,
}

#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub source: Option<String>,
    pub language: Language,
    pub enabled: Vec<bool>,
    pub inputs: Vec<PathBuf>,
}

struct FakeCompiler(Rc<RefCell<Calls>>);
struct FakeRunner(Rc<RefCell<Calls>>);
struct FakeFormatter(Rc<RefCell<Calls>>);
struct FakeInputs;

impl Compiler for FakeCompiler {
    fn compile(&mut self, source: &str, language: Language) -> Result<()> {
        self.0.borrow_mut().compiled.push((source.to_string(), language));
        Ok(())
    }
}

impl Runner for FakeRunner {
    fn run(&mut self, request: RunRequest<'_>) -> Result<()> {
        self.0.borrow_mut().runs.push(RecordedRun {
            source: request.source.map(str::to_string),
            language: request.language,
            enabled: request.enabled,
            inputs: request.inputs,
        });
        Ok(())
    }

    fn run_detached(&mut self, source: &str, _language: Language) -> Result<()> {
        self.0.borrow_mut().detached.push(source.to_string());
        Ok(())
    }

    fn kill_all(&mut self) {
        self.0.borrow_mut().kills += 1;
    }

    fn remove_executable(&mut self) {
        self.0.borrow_mut().removed_executables += 1;
    }

    fn poll_finished(&mut self) -> Vec<ExecutionFinished> {
        std::mem::take(&mut self.0.borrow_mut().pending)
    }
}

impl Formatter for FakeFormatter {
    fn format(&mut self, source: &str) -> Result<String> {
        match &self.0.borrow().formatted {
            Some(formatted) => Ok(formatted.clone()),
            None => bail!("formatter missing for {} bytes", source.len()),
        }
    }

    fn configure(&mut self, settings: &Settings) {
        self.0.borrow_mut().configured.push(settings.clone());
    }
}

impl InputWriter for FakeInputs {
    fn write_inputs(&mut self, inputs: &[&str]) -> Result<Vec<PathBuf>> {
        Ok((1..=inputs.len())
            .map(|number| PathBuf::from(format!("input{number}.txt")))
            .collect())
    }
}

pub struct Harness {
    pub window: Window,
    pub calls: Rc<RefCell<Calls>>,
    pub log: Arc<MessageLog>,
}

pub fn harness(settings: Settings) -> Harness {
    let calls = Rc::new(RefCell::new(Calls::default()));
    let log = Arc::new(MessageLog::new());
    let toolchain = Toolchain {
        compiler: Box::new(FakeCompiler(Rc::clone(&calls))),
        runner: Box::new(FakeRunner(Rc::clone(&calls))),
        formatter: Box::new(FakeFormatter(Rc::clone(&calls))),
        input_writer: Box::new(FakeInputs),
    };
    let sink: Arc<dyn LogSink> = log.clone();
    let window = Window::new(0, settings, toolchain, sink);
    Harness { window, calls, log }
}

/// Prompt with a scripted answer for every question.
pub struct ScriptedPrompt {
    pub path: Option<PathBuf>,
    pub choice: SaveChoice,
    pub asked_close: usize,
    pub asked_path: usize,
}

impl ScriptedPrompt {
    pub fn new(path: Option<&Path>, choice: SaveChoice) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            choice,
            asked_close: 0,
            asked_path: 0,
        }
    }

    pub fn never() -> Self {
        Self::new(None, SaveChoice::Cancel)
    }
}

impl SavePrompt for ScriptedPrompt {
    fn save_path(&mut self, _title: &str) -> Option<PathBuf> {
        self.asked_path += 1;
        self.path.clone()
    }

    fn confirm_close(&mut self, _file_name: &str) -> SaveChoice {
        self.asked_close += 1;
        self.choice
    }
}

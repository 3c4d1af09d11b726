//! Interfaces to the components that do the real work behind a window.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::Settings;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    Cpp,
    Java,
    Python,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Cpp, Language::Java, Language::Python];

    pub fn name(self) -> &'static str {
        match self {
            Language::Cpp => "C++",
            Language::Java => "Java",
            Language::Python => "Python",
        }
    }

    pub fn line_comment(self) -> &'static str {
        match self {
            Language::Python => "# ",
            Language::Cpp | Language::Java => "// ",
        }
    }
}

/// Completion report for one slot of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionFinished {
    pub slot: usize,
    pub elapsed_ms: u64,
    pub stdout: String,
}

#[derive(Clone, Debug)]
pub struct RunRequest<'a> {
    /// Source to compile before running. `None` reuses the last build.
    pub source: Option<&'a str>,
    pub language: Language,
    /// One flag per slot; disabled slots are not executed.
    pub enabled: Vec<bool>,
    /// Stdin file per slot, as produced by [`InputWriter::write_inputs`].
    pub inputs: Vec<PathBuf>,
}

pub trait Compiler {
    /// Starts a build. Results are reported through the log sink.
    fn compile(&mut self, source: &str, language: Language) -> Result<()>;

    /// Picks up changed command settings.
    fn configure(&mut self, _settings: &Settings) {}
}

pub trait Runner {
    /// Starts a run, superseding any run still in flight.
    fn run(&mut self, request: RunRequest<'_>) -> Result<()>;

    /// Launches the program outside the workbench, without capturing output.
    fn run_detached(&mut self, source: &str, language: Language) -> Result<()>;

    fn kill_all(&mut self);

    fn remove_executable(&mut self);

    /// Completions that arrived since the last call, in arrival order.
    fn poll_finished(&mut self) -> Vec<ExecutionFinished>;

    fn configure(&mut self, _settings: &Settings) {}
}

pub trait Formatter {
    /// Returns the reformatted source.
    fn format(&mut self, source: &str) -> Result<String>;

    fn configure(&mut self, _settings: &Settings) {}
}

pub trait InputWriter {
    /// Stores each slot input in a file and returns the paths in slot order.
    fn write_inputs(&mut self, inputs: &[&str]) -> Result<Vec<PathBuf>>;
}

/// The set of collaborators one window talks to.
pub struct Toolchain {
    pub compiler: Box<dyn Compiler>,
    pub runner: Box<dyn Runner>,
    pub formatter: Box<dyn Formatter>,
    pub input_writer: Box<dyn InputWriter>,
}

impl Toolchain {
    /// Hands updated command settings to every collaborator.
    pub fn configure(&mut self, settings: &Settings) {
        self.compiler.configure(settings);
        self.runner.configure(settings);
        self.formatter.configure(settings);
    }
}

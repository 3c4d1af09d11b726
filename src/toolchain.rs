//! Collaborators backed by plain external commands.
//!
//! Every window gets its own scratch directory under the system temp dir.
//! Builds and runs happen on worker threads; run completions are queued on a
//! channel and handed to the window by [`Runner::poll_finished`].

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread,
    time::Instant,
};

use anyhow::{Context, Result, anyhow, bail};

use crate::{
    collaborators::{
        Compiler, ExecutionFinished, Formatter, InputWriter, Language, RunRequest, Runner,
        Toolchain,
    },
    config::Settings,
    logging::{self, LogSink},
};

/// Builds the command-backed collaborators for window `index`.
pub fn process_toolchain(index: usize, settings: &Settings, sink: Arc<dyn LogSink>) -> Toolchain {
    let workspace = Arc::new(Workspace::new(index, settings));
    Toolchain {
        compiler: Box::new(ProcessCompiler {
            workspace: Arc::clone(&workspace),
            sink: Arc::clone(&sink),
        }),
        runner: Box::new(ProcessRunner::new(Arc::clone(&workspace), Arc::clone(&sink))),
        formatter: Box::new(ProcessFormatter {
            command: settings.format_command.clone(),
        }),
        input_writer: Box::new(FileInputWriter {
            dir: workspace.dir.join("inputs"),
        }),
    }
}

/// Scratch directory and command lines shared by the compiler and runner.
#[derive(Debug)]
struct Workspace {
    index: usize,
    dir: PathBuf,
    compile_command: String,
    run_command: String,
    prepend_run_command: String,
}

impl Workspace {
    fn new(index: usize, settings: &Settings) -> Self {
        Self {
            index,
            dir: std::env::temp_dir()
                .join("cp-workbench")
                .join(format!("window-{index}")),
            compile_command: settings.compile_command.clone(),
            run_command: settings.run_command.clone(),
            prepend_run_command: settings.prepend_run_command.clone(),
        }
    }

    fn source_path(&self, language: Language) -> PathBuf {
        self.dir.join(match language {
            Language::Cpp => "sol.cpp",
            Language::Java => "Main.java",
            Language::Python => "sol.py",
        })
    }

    fn binary_path(&self) -> PathBuf {
        self.dir.join(if cfg!(windows) { "sol.exe" } else { "sol" })
    }

    fn write_source(&self, source: &str, language: Language) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create work dir {:?}", self.dir))?;
        let path = self.source_path(language);
        fs::write(&path, source).with_context(|| format!("Failed to write source {path:?}"))
    }

    fn build_command(&self, language: Language) -> Option<Vec<String>> {
        let source = self.source_path(language).display().to_string();
        match language {
            Language::Cpp => {
                let mut parts = split_command(&self.compile_command);
                parts.extend([source, "-o".to_string(), self.binary_path().display().to_string()]);
                Some(parts)
            }
            Language::Java => Some(vec!["javac".to_string(), source]),
            Language::Python => None,
        }
    }

    fn run_command(&self, language: Language) -> Vec<String> {
        let mut parts = split_command(&self.prepend_run_command);
        match language {
            Language::Cpp => parts.push(self.binary_path().display().to_string()),
            Language::Java => {
                parts.push(self.interpreter("java"));
                parts.extend([
                    "-cp".to_string(),
                    self.dir.display().to_string(),
                    "Main".to_string(),
                ]);
            }
            Language::Python => {
                parts.push(self.interpreter("python3"));
                parts.push(self.source_path(language).display().to_string());
            }
        }
        parts
    }

    fn interpreter(&self, fallback: &str) -> String {
        if self.run_command.trim().is_empty() {
            fallback.to_string()
        } else {
            self.run_command.trim().to_string()
        }
    }

    /// Writes and compiles `source`, reporting diagnostics under `Compiler`.
    fn build(&self, source: &str, language: Language, sink: &dyn LogSink) -> bool {
        if let Err(error) = self.write_source(source, language) {
            sink.error("Compiler", &format!("{error:#}"));
            return false;
        }
        let Some(parts) = self.build_command(language) else {
            return true;
        };

        let started = Instant::now();
        let output = command(&parts).and_then(|mut cmd| {
            cmd.current_dir(&self.dir)
                .output()
                .with_context(|| format!("Failed to start compiler {:?}", parts[0]))
        });
        match output {
            Ok(output) if output.status.success() => {
                logging::with_workbench_subscriber(|| {
                    tracing::info!(
                        target: "workbench.toolchain",
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Compilation finished"
                    );
                });
                sink.info("Compiler", "Compiled successfully");
                true
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                sink.error("Compiler", stderr.trim_end());
                false
            }
            Err(error) => {
                sink.error("Compiler", &format!("{error:#}"));
                false
            }
        }
    }
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

fn command(parts: &[String]) -> Result<Command> {
    let (program, args) = parts.split_first().ok_or_else(|| anyhow!("Empty command"))?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    Ok(cmd)
}

pub struct ProcessCompiler {
    workspace: Arc<Workspace>,
    sink: Arc<dyn LogSink>,
}

impl Compiler for ProcessCompiler {
    fn configure(&mut self, settings: &Settings) {
        self.workspace = Arc::new(Workspace::new(self.workspace.index, settings));
    }

    fn compile(&mut self, source: &str, language: Language) -> Result<()> {
        let workspace = Arc::clone(&self.workspace);
        let sink = Arc::clone(&self.sink);
        let source = source.to_string();
        thread::Builder::new()
            .name("compiler".to_string())
            .spawn(move || {
                workspace.build(&source, language, sink.as_ref());
            })
            .context("Failed to spawn compiler thread")?;
        Ok(())
    }
}

/// Running children, keyed by the run generation that started them and their slot.
type Children = Arc<Mutex<HashMap<(u64, usize), Child>>>;

/// Runs programs on worker threads. Starting a run or killing supersedes every
/// earlier run: its children are killed and its completions are dropped.
pub struct ProcessRunner {
    workspace: Arc<Workspace>,
    sink: Arc<dyn LogSink>,
    sender: Sender<(u64, ExecutionFinished)>,
    receiver: Receiver<(u64, ExecutionFinished)>,
    children: Children,
    generation: Arc<AtomicU64>,
}

impl ProcessRunner {
    fn new(workspace: Arc<Workspace>, sink: Arc<dyn LogSink>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            workspace,
            sink,
            sender,
            receiver,
            children: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Moves to a new generation and kills every child of the older ones.
    fn supersede(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut children) = self.children.lock() {
            for child in children.values_mut() {
                let _ = child.kill();
            }
        }
        generation
    }
}

impl Runner for ProcessRunner {
    fn configure(&mut self, settings: &Settings) {
        self.workspace = Arc::new(Workspace::new(self.workspace.index, settings));
    }

    fn run(&mut self, request: RunRequest<'_>) -> Result<()> {
        let started_generation = self.supersede();
        let job = RunJob {
            workspace: Arc::clone(&self.workspace),
            sink: Arc::clone(&self.sink),
            sender: self.sender.clone(),
            children: Arc::clone(&self.children),
            generation: Arc::clone(&self.generation),
            started_generation,
            source: request.source.map(str::to_string),
            language: request.language,
            slots: request
                .enabled
                .iter()
                .zip(request.inputs)
                .enumerate()
                .filter(|(_, (enabled, _))| **enabled)
                .map(|(slot, (_, input))| (slot, input))
                .collect(),
        };
        thread::Builder::new()
            .name("runner".to_string())
            .spawn(move || job.execute())
            .context("Failed to spawn runner thread")?;
        Ok(())
    }

    fn run_detached(&mut self, source: &str, language: Language) -> Result<()> {
        let workspace = Arc::clone(&self.workspace);
        let sink = Arc::clone(&self.sink);
        let source = source.to_string();
        thread::Builder::new()
            .name("detached-runner".to_string())
            .spawn(move || {
                if !workspace.build(&source, language, sink.as_ref()) {
                    return;
                }
                let spawned = command(&workspace.run_command(language)).and_then(|mut cmd| {
                    cmd.current_dir(&workspace.dir)
                        .spawn()
                        .context("Failed to launch detached program")
                });
                match spawned {
                    Ok(_) => sink.info("Runner", "Launched detached execution"),
                    Err(error) => sink.error("Runner", &format!("{error:#}")),
                }
            })
            .context("Failed to spawn detached runner thread")?;
        Ok(())
    }

    fn kill_all(&mut self) {
        self.supersede();
        logging::with_workbench_subscriber(|| {
            tracing::info!(target: "workbench.toolchain", "Killed running processes");
        });
    }

    fn remove_executable(&mut self) {
        for path in [
            self.workspace.binary_path(),
            self.workspace.dir.join("Main.class"),
        ] {
            if let Err(error) = fs::remove_file(&path) {
                if error.kind() != ErrorKind::NotFound {
                    logging::with_workbench_subscriber(|| {
                        tracing::warn!(
                            target: "workbench.toolchain",
                            path = %path.display(),
                            %error,
                            "Failed to remove executable"
                        );
                    });
                }
            }
        }
    }

    fn poll_finished(&mut self) -> Vec<ExecutionFinished> {
        let current = self.generation.load(Ordering::SeqCst);
        self.receiver
            .try_iter()
            .filter(|(generation, _)| *generation == current)
            .map(|(_, finished)| finished)
            .collect()
    }
}

struct RunJob {
    workspace: Arc<Workspace>,
    sink: Arc<dyn LogSink>,
    sender: Sender<(u64, ExecutionFinished)>,
    children: Children,
    generation: Arc<AtomicU64>,
    started_generation: u64,
    source: Option<String>,
    language: Language,
    slots: Vec<(usize, PathBuf)>,
}

impl RunJob {
    fn execute(self) {
        if let Some(source) = &self.source {
            if !self.workspace.build(source, self.language, self.sink.as_ref()) {
                return;
            }
        }
        if self.superseded() {
            return;
        }

        let job = Arc::new(self);
        let handles: Vec<_> = job
            .slots
            .iter()
            .cloned()
            .map(|(slot, input)| {
                let job = Arc::clone(&job);
                thread::spawn(move || {
                    if let Err(error) = job.run_slot(slot, &input) {
                        job.sink
                            .error(&format!("Runner[{}]", slot + 1), &format!("{error:#}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    fn superseded(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.started_generation
    }

    fn run_slot(&self, slot: usize, input: &Path) -> Result<()> {
        let stdin = File::open(input).with_context(|| format!("Failed to open input {input:?}"))?;
        let mut cmd = command(&self.workspace.run_command(self.language))?;
        cmd.current_dir(&self.workspace.dir)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let started = Instant::now();
        let mut child = cmd.spawn().context("Failed to start program")?;
        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            bail!("Program output unavailable");
        };
        let key = (self.started_generation, slot);
        if let Ok(mut children) = self.children.lock() {
            // A newer run may have started between spawning and registering.
            if self.superseded() {
                let _ = child.kill();
            }
            children.insert(key, child);
        }

        let stderr_reader = thread::spawn(move || {
            let mut captured = Vec::new();
            let _ = stderr.read_to_end(&mut captured);
            captured
        });
        let mut captured = Vec::new();
        let read = stdout.read_to_end(&mut captured);
        let errors = stderr_reader.join().unwrap_or_default();

        let child = self
            .children
            .lock()
            .ok()
            .and_then(|mut children| children.remove(&key));
        if let Some(mut child) = child {
            if read.is_err() {
                let _ = child.kill();
            }
            child.wait().context("Failed to wait for program")?;
        }
        read.context("Failed to read program output")?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if self.superseded() {
            return Ok(());
        }
        let errors = String::from_utf8_lossy(&errors);
        if !errors.trim().is_empty() {
            self.sink
                .warn(&format!("Runner[{}]", slot + 1), errors.trim_end());
        }
        // The window may already be gone; nothing left to report to then.
        let _ = self.sender.send((
            self.started_generation,
            ExecutionFinished {
                slot,
                elapsed_ms,
                stdout: lossy(captured),
            },
        ));
        Ok(())
    }
}

/// Program output is shown as text even when it is not valid UTF-8.
fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned())
}

/// Pipes the source through an external formatter such as `clang-format`.
pub struct ProcessFormatter {
    command: String,
}

impl Formatter for ProcessFormatter {
    fn configure(&mut self, settings: &Settings) {
        self.command = settings.format_command.clone();
    }

    fn format(&mut self, source: &str) -> Result<String> {
        let parts = split_command(&self.command);
        let mut child = command(&parts)?
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start formatter {:?}", self.command))?;

        let mut stdin = child.stdin.take().context("Formatter stdin unavailable")?;
        let input = source.to_string();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));
        let output = child
            .wait_with_output()
            .context("Failed to wait for formatter")?;
        writer
            .join()
            .map_err(|_| anyhow!("Formatter input writer panicked"))?
            .context("Failed to send source to formatter")?;

        if !output.status.success() {
            bail!(
                "Formatter exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }
        String::from_utf8(output.stdout).context("Formatter produced invalid UTF-8")
    }
}

/// Materializes slot inputs as `input{k}.txt` files.
pub struct FileInputWriter {
    dir: PathBuf,
}

impl FileInputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl InputWriter for FileInputWriter {
    fn write_inputs(&mut self, inputs: &[&str]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create input dir {:?}", self.dir))?;
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let path = self.dir.join(format!("input{}.txt", index + 1));
                fs::write(&path, input).with_context(|| format!("Failed to write {path:?}"))?;
                Ok(path)
            })
            .collect()
    }
}

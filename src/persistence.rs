//! Loading and saving test slots as `<stem>{k}.in` / `<stem>{k}.ans` files
//! next to the open source file.

use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{fs::FileSystem, logging::LogSink, slots::TestSlots};

const CATEGORY: &str = "Tests";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Cannot open {}, do I have read permissions?", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot save {label}, do I have write permission?")]
    Unwritable {
        label: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Test file names derived from a source file path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestFiles {
    prefix: PathBuf,
}

impl TestFiles {
    pub fn for_source(source: &Path) -> Self {
        let dir = source.parent().unwrap_or_else(|| Path::new(""));
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            prefix: dir.join(stem),
        }
    }

    /// Input file for the 0-indexed `slot`.
    pub fn input(&self, slot: usize) -> PathBuf {
        self.with_suffix(slot, "in")
    }

    /// Answer file for the 0-indexed `slot`.
    pub fn answer(&self, slot: usize) -> PathBuf {
        self.with_suffix(slot, "ans")
    }

    fn with_suffix(&self, slot: usize, extension: &str) -> PathBuf {
        let mut name = self.prefix.clone().into_os_string();
        name.push(format!("{}.{extension}", slot + 1));
        PathBuf::from(name)
    }
}

/// Replaces slot contents with whatever test files exist next to `source`.
///
/// Missing files leave the slot as it was. Read failures are logged and skipped.
pub fn load_tests(
    source: Option<&Path>,
    enabled: bool,
    slots: &mut TestSlots,
    fs: &dyn FileSystem,
    sink: &dyn LogSink,
) {
    let Some(source) = source else {
        return;
    };
    if !enabled {
        return;
    }

    let files = TestFiles::for_source(source);
    for (index, slot) in slots.iter_mut().enumerate() {
        let number = index + 1;
        if let Some(input) = read_if_present(&files.input(index), fs, sink) {
            slot.input = input;
            sink.info(CATEGORY, &format!("Input #{number} successfully loaded"));
        }
        if let Some(expected) = read_if_present(&files.answer(index), fs, sink) {
            slot.expected = expected;
            sink.info(CATEGORY, &format!("Expected #{number} successfully loaded"));
        }
    }
}

/// Writes every non-blank input and expected output next to `source`.
///
/// Blank slots are skipped and files left over from earlier saves stay on disk.
pub fn save_tests(
    source: Option<&Path>,
    enabled: bool,
    slots: &TestSlots,
    fs: &dyn FileSystem,
    sink: &dyn LogSink,
) {
    let Some(source) = source else {
        return;
    };
    if !enabled {
        return;
    }

    let files = TestFiles::for_source(source);
    for (index, slot) in slots.iter().enumerate() {
        let number = index + 1;
        if slot.has_input() {
            write_logged(
                &format!("Input #{number}"),
                &files.input(index),
                &slot.input,
                fs,
                sink,
            );
        }
        if slot.has_expected() {
            write_logged(
                &format!("Expected #{number}"),
                &files.answer(index),
                &slot.expected,
                fs,
                sink,
            );
        }
    }
}

fn read_if_present(path: &Path, fs: &dyn FileSystem, sink: &dyn LogSink) -> Option<String> {
    if !fs.exists(path) {
        return None;
    }
    match fs.read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(source) => {
            let error = PersistenceError::Unreadable {
                path: path.to_path_buf(),
                source,
            };
            report(&error, sink);
            None
        }
    }
}

fn write_logged(
    label: &str,
    path: &Path,
    contents: &str,
    fs: &dyn FileSystem,
    sink: &dyn LogSink,
) {
    match fs.write(path, contents) {
        Ok(()) => sink.info(CATEGORY, &format!("{label} successfully saved")),
        Err(source) => {
            let error = PersistenceError::Unwritable {
                label: label.to_string(),
                path: path.to_path_buf(),
                source,
            };
            report(&error, sink);
        }
    }
}

fn report(error: &PersistenceError, sink: &dyn LogSink) {
    crate::logging::with_workbench_subscriber(|| {
        let (path, source) = match error {
            PersistenceError::Unreadable { path, source } => (path, source),
            PersistenceError::Unwritable { path, source, .. } => (path, source),
        };
        tracing::warn!(
            target: "workbench.tests",
            path = %path.display(),
            error = %source,
            "Test file operation failed"
        );
    });
    sink.error(CATEGORY, &error.to_string());
}

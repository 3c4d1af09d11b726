use std::path::{Path, PathBuf};

use crate::fs::FileSystem;

pub const UNSAVED_FILE_NAME: &str = "Unsaved file";

/// The on-disk file behind the editor buffer.
///
/// `open` is false when the path is known but the file could not be opened
/// for reading and writing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OpenDocument {
    pub path: PathBuf,
    pub open: bool,
}

impl OpenDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            open: true,
        }
    }

    pub fn detached(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            open: false,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaveChoice {
    Save,
    Discard,
    Cancel,
}

/// User interaction needed while saving or closing a window.
pub trait SavePrompt {
    /// Picks a destination for an unsaved buffer. `None` when the user backs out.
    fn save_path(&mut self, title: &str) -> Option<PathBuf>;

    /// Asks what to do with unsaved changes in `file_name`.
    fn confirm_close(&mut self, file_name: &str) -> SaveChoice;
}

/// Whether the editor text differs from what would be lost on close.
///
/// Without a document the reference is the template file, if one is
/// configured and present, otherwise an empty buffer. With a document the
/// file is read again on every call.
pub fn is_text_changed(
    text: &str,
    document: Option<&OpenDocument>,
    template: Option<&Path>,
    fs: &dyn FileSystem,
) -> bool {
    match document {
        None => {
            if let Some(template) = template.filter(|path| fs.exists(path)) {
                if let Ok(contents) = fs.read_to_string(template) {
                    return text != contents;
                }
            }
            !text.is_empty()
        }
        Some(document) if document.open => match fs.read_to_string(&document.path) {
            Ok(contents) => contents != text,
            Err(_) => true,
        },
        Some(_) => true,
    }
}

/// Runs the save/discard/cancel protocol. Returns whether closing may proceed.
pub fn close_changed_confirm<S>(
    changed: bool,
    file_name: &str,
    prompt: &mut dyn SavePrompt,
    save: S,
) -> bool
where
    S: FnOnce(&mut dyn SavePrompt) -> bool,
{
    if !changed {
        return true;
    }
    match prompt.confirm_close(file_name) {
        SaveChoice::Save => save(prompt),
        SaveChoice::Discard => true,
        SaveChoice::Cancel => false,
    }
}

pub mod app;
pub mod collaborators;
pub mod companion;
pub mod config;
pub mod document;
pub mod fs;
pub mod logging;
pub mod persistence;
pub mod slots;
pub mod toolchain;
pub mod verdict;
pub mod watcher;
pub mod window;

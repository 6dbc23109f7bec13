//! Note files on disk, as far as the view is concerned.
//!
//! The view only consumes two operations from the note tree: opening an
//! existing note and creating a fresh one. Both hand back a [`CanvasHandle`]
//! ready for [`CanvasView::set_canvas`](crate::view::CanvasView::set_canvas).
//! [`NoteLibrary::entries`] lists a directory for hosts that show a browser.

use crate::engine::{CanvasEngine, CanvasHandle};
use crate::errors::EngineError;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const NOTE_EXTENSION: &str = "note";
const UNTITLED: &str = "Untitled";
const MAX_UNTITLED: usize = 1000;
/// Engine refusals of names that are free on disk before giving up.
const MAX_REFUSALS: usize = 8;

/// A file or directory in the note tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub path: PathBuf,
    pub name: String,
    pub is_directory: bool,
}

impl NoteRecord {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let is_directory = path.is_dir();
        Self { path, name, is_directory }
    }
}

pub struct NoteLibrary {
    engine: Rc<dyn CanvasEngine>,
    root: PathBuf,
}

impl NoteLibrary {
    pub fn new(engine: Rc<dyn CanvasEngine>, root: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            root: root.into(),
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Visible children of `directory`: directories first, then files, each
    /// group sorted by name.
    pub fn entries(&self, directory: &Path) -> std::io::Result<Vec<NoteRecord>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            entries.push(NoteRecord::from_path(entry.path()));
        }

        entries.sort_by(|a, b| b.is_directory.cmp(&a.is_directory).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    pub fn open(&self, path: &Path) -> Result<CanvasHandle, EngineError> {
        CanvasHandle::open(&self.engine, path)
    }

    /// Creates a note under `directory` with the first free name out of
    /// `Untitled.note`, `Untitled 2.note`, `Untitled 3.note`, ...
    ///
    /// A name the engine refuses although nothing is on disk yet is skipped,
    /// but only a few times in a row: an engine that cannot create anything
    /// in `directory` fails fast.
    pub fn create_new(&self, directory: &Path) -> Result<(NoteRecord, CanvasHandle), EngineError> {
        let mut refusals = 0;
        for n in 1..=MAX_UNTITLED {
            let name = match n {
                1 => format!("{UNTITLED}.{NOTE_EXTENSION}"),
                n => format!("{UNTITLED} {n}.{NOTE_EXTENSION}"),
            };
            let path = directory.join(&name);
            if path.exists() {
                continue;
            }

            match CanvasHandle::create(&self.engine, &path) {
                Ok(handle) => {
                    log::info!("created note {}", path.display());
                    let record = NoteRecord {
                        path,
                        name,
                        is_directory: false,
                    };
                    return Ok((record, handle));
                }
                Err(e) => {
                    refusals += 1;
                    log::debug!("{e} ({refusals} refused)");
                    if refusals >= MAX_REFUSALS {
                        log::warn!("giving up on {} after {refusals} refused names", directory.display());
                        return Err(e);
                    }
                }
            }
        }

        Err(EngineError::CreateFailed(
            directory.join(format!("{UNTITLED}.{NOTE_EXTENSION}")),
        ))
    }
}

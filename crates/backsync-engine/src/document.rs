//! Document loading and atomic writes.
//!
//! Reconciliation is pure; the write here is the engine's only side
//! effect. Writes go to a temp sibling first and rename into place, so a
//! failed write leaves the original file intact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// One backlog document: file identity plus its in-memory text.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    text: String,
}

impl Document {
    /// Load an existing document.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let text = fs::read_to_string(&path).map_err(|source| EngineError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, text })
    }

    /// Load a document, treating a missing file as empty text.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Self { path, text }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self {
                path,
                text: String::new(),
            }),
            Err(source) => Err(EngineError::Read { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    /// Persist the current text atomically.
    pub fn save(&self) -> Result<(), EngineError> {
        write_atomic(&self.path, &self.text)
    }
}

/// Write `text` to `path` via a temp sibling plus rename, creating parent
/// directories as needed.
pub fn write_atomic(path: &Path, text: &str) -> Result<(), EngineError> {
    let write_err = |source: io::Error| EngineError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(write_err)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| write_err(io::Error::new(io::ErrorKind::InvalidInput, "no file name")))?;
    let tmp = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

    fs::write(&tmp, text).map_err(write_err)?;
    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(source));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BACKLOG.md");
        fs::write(&path, "hello\n").unwrap();

        let mut doc = Document::load(&path).unwrap();
        assert_eq!(doc.text(), "hello\n");
        doc.set_text("updated\n".into());
        doc.save().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "updated\n");
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Document::load(dir.path().join("absent.md")).unwrap_err();
        assert!(matches!(err, EngineError::Read { .. }));
    }

    #[test]
    fn load_or_empty_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::load_or_empty(dir.path().join("absent.md")).unwrap();
        assert_eq!(doc.text(), "");
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes/daily/briefing.md");
        write_atomic(&path, "content\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "content\n");
    }

    #[test]
    fn write_atomic_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        write_atomic(&path, "one\n").unwrap();
        write_atomic(&path, "two\n").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["doc.md"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "two\n");
    }
}

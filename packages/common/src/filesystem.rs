use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("forbidden path: {0}")]
    OutsideRoot(String),
}

/// Resolve a request-supplied relative path against a root directory.
///
/// `..` components never escape the root and absolute paths are rejected,
/// so a client can only ever address files below its own root. The result
/// is purely lexical: the target does not have to exist yet.
pub fn resolve_under_root(root: &Path, relative: &str) -> Result<PathBuf, PathError> {
    let rel = Path::new(relative);
    if rel.is_absolute() {
        return Err(PathError::OutsideRoot(relative.to_string()));
    }

    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(PathError::OutsideRoot(relative.to_string()));
                }
                resolved.pop();
                depth -= 1;
            }
            _ => return Err(PathError::OutsideRoot(relative.to_string())),
        }
    }
    Ok(resolved)
}

/// File system abstraction for raw reads/writes and testing
pub trait FileSystem: Send + Sync {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Read a whole file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error>;

    /// Write a whole file, creating it if needed
    fn write(&self, path: &Path, content: &str) -> Result<(), std::io::Error>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), std::io::Error> {
        std::fs::write(path, content)
    }
}

/// Mock file system for testing
pub struct MockFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_file(&self, path: PathBuf, content: &str) {
        self.files.lock().unwrap().insert(path, content.to_string());
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"))
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), std::io::Error> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}

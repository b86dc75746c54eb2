// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, bail, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Destinations for which `copy` fails.
    failing_copy_targets: HashSet<PathBuf>,
    copies: usize,
    removals: usize,
}

/// In-memory filesystem with operation counters and failure injection.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.add_dir(".");
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.insert_file(path.as_ref(), content.into());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.ensure_dir(path.as_ref());
    }

    /// Make every later `copy` whose destination is `path` fail.
    pub fn fail_copies_to(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.failing_copy_targets.insert(path.as_ref().to_path_buf());
    }

    /// Contents of a file, or `None` if absent or a directory.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path.as_ref()) {
            Some(MockEntry::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    /// Number of successful `copy` calls so far.
    pub fn copy_count(&self) -> usize {
        self.state.lock().unwrap().copies
    }

    /// Number of successful `remove_file`/`remove_dir_all` calls so far.
    pub fn removal_count(&self) -> usize {
        self.state.lock().unwrap().removals
    }

    /// Sorted list of every file path currently present.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        let mut files: Vec<PathBuf> = state
            .entries
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect();
        files.sort();
        files
    }
}

fn parent_of(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Some(Path::new(".")),
        Some(parent) if parent != path => Some(parent),
        _ => None,
    }
}

fn name_of(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
}

impl MockState {
    fn link_to_parent(&mut self, path: &Path) {
        let (Some(parent), Some(name)) = (parent_of(path), name_of(path)) else {
            return;
        };
        self.ensure_dir(parent);
        if let Some(MockEntry::Dir(children)) = self.entries.get_mut(parent) {
            if !children.contains(&name) {
                children.push(name);
            }
        }
    }

    fn unlink_from_parent(&mut self, path: &Path) {
        let (Some(parent), Some(name)) = (parent_of(path), name_of(path)) else {
            return;
        };
        if let Some(MockEntry::Dir(children)) = self.entries.get_mut(parent) {
            children.retain(|c| c != &name);
        }
    }

    fn ensure_dir(&mut self, path: &Path) {
        if self.entries.contains_key(path) {
            return;
        }
        self.entries
            .insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        self.link_to_parent(path);
    }

    fn insert_file(&mut self, path: &Path, content: Vec<u8>) {
        self.entries
            .insert(path.to_path_buf(), MockEntry::File(content));
        self.link_to_parent(path);
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.state.lock().unwrap().entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_copy_targets.contains(to) {
            bail!("injected copy failure for {:?}", to);
        }
        let content = match state.entries.get(from) {
            Some(MockEntry::File(content)) => content.clone(),
            Some(MockEntry::Dir(_)) => bail!("Is a directory: {:?}", from),
            None => bail!("File not found: {:?}", from),
        };
        match parent_of(to).map(|p| state.entries.get(p)) {
            Some(Some(MockEntry::Dir(_))) | None => {}
            _ => bail!("Parent directory missing for {:?}", to),
        }
        if let Some(MockEntry::Dir(_)) = state.entries.get(to) {
            bail!("Is a directory: {:?}", to);
        }
        state.insert_file(to, content);
        state.copies += 1;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.entries.get(path) {
            Some(MockEntry::File(_)) => {}
            Some(MockEntry::Dir(_)) => bail!("Is a directory: {:?}", path),
            None => bail!("File not found: {:?}", path),
        }
        state.entries.remove(path);
        state.unlink_from_parent(path);
        state.removals += 1;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(MockEntry::File(_)) = state.entries.get(path) {
            bail!("Not a directory: {:?}", path);
        }
        state.ensure_dir(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.entries.get(path) {
            Some(MockEntry::Dir(_)) => {}
            Some(MockEntry::File(_)) => bail!("Not a directory: {:?}", path),
            None => bail!("Directory not found: {:?}", path),
        }
        state.entries.retain(|p, _| !p.starts_with(path));
        state.unlink_from_parent(path);
        state.removals += 1;
        Ok(())
    }
}

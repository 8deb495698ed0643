use super::{is_vacant, subtree, validate_root, KvBackend, KvError};
use dashmap::DashMap;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One JSON file per root key: `<dir>/<root>.json`.
///
/// Writes go to a temporary file first and are renamed into place.
/// A process-wide lock serialises mutations. Parsed roots are kept in
/// memory after the first read, so path reads clone only the subtree they
/// ask for; a write still rewrites its whole root file.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    lock: Mutex<()>,
    cache: DashMap<String, Value>,
}

impl FileBackend {
    /// Open (and create if needed) a data directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, KvError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            cache: DashMap::new(),
        })
    }

    fn path_for(&self, root: &str) -> Result<PathBuf, KvError> {
        validate_root(root)?;
        Ok(self.dir.join(format!("{root}.json")))
    }

    fn read_file(&self, root: &str) -> Result<Option<Value>, KvError> {
        let path = self.path_for(root)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse `root` into the cache unless it is already there.
    /// Callers hold the lock.
    fn load_unlocked(&self, root: &str) -> Result<(), KvError> {
        if !self.cache.contains_key(root) {
            if let Some(tree) = self.read_file(root)? {
                self.cache.insert(root.to_string(), tree);
            }
        }
        Ok(())
    }

    fn load(&self, root: &str) -> Result<(), KvError> {
        validate_root(root)?;
        if self.cache.contains_key(root) {
            return Ok(());
        }
        let _guard = self.guard();
        self.load_unlocked(root)
    }

    fn write_unlocked(&self, root: &str, value: Value) -> Result<(), KvError> {
        let path = self.path_for(root)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&value)?)?;
        fs::rename(&tmp, &path)?;
        self.cache.insert(root.to_string(), value);
        Ok(())
    }

    fn remove_unlocked(&self, root: &str) -> Result<(), KvError> {
        let path = self.path_for(root)?;
        self.cache.remove(root);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock only means a writer panicked; the files are intact.
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvBackend for FileBackend {
    fn read(&self, root: &str) -> Result<Option<Value>, KvError> {
        self.load(root)?;
        Ok(self.cache.get(root).map(|entry| entry.value().clone()))
    }

    fn read_at(&self, root: &str, path: &[String]) -> Result<Option<Value>, KvError> {
        self.load(root)?;
        Ok(self
            .cache
            .get(root)
            .and_then(|entry| subtree(entry.value(), path).cloned()))
    }

    fn contains_at(&self, root: &str, path: &[String]) -> Result<bool, KvError> {
        self.load(root)?;
        Ok(self
            .cache
            .get(root)
            .is_some_and(|entry| subtree(entry.value(), path).is_some()))
    }

    fn write(&self, root: &str, value: Value) -> Result<(), KvError> {
        let _guard = self.guard();
        self.write_unlocked(root, value)
    }

    fn remove(&self, root: &str) -> Result<(), KvError> {
        let _guard = self.guard();
        self.remove_unlocked(root)
    }

    fn roots(&self) -> Result<Vec<String>, KvError> {
        let mut roots = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_root(stem).is_ok() {
                    roots.push(stem.to_string());
                }
            }
        }
        roots.sort();
        Ok(roots)
    }

    // A failed write leaves the root out of the cache, so the next read
    // goes back to the file on disk.
    fn mutate(
        &self,
        root: &str,
        f: Box<dyn FnOnce(&mut Value) + Send + '_>,
    ) -> Result<(), KvError> {
        let _guard = self.guard();
        self.load_unlocked(root)?;
        let mut value = self
            .cache
            .remove(root)
            .map(|(_, tree)| tree)
            .unwrap_or(Value::Null);
        f(&mut value);
        if is_vacant(&value) {
            self.remove_unlocked(root)
        } else {
            self.write_unlocked(root, value)
        }
    }
}

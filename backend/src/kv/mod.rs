//! Key-value backends.
//!
//! A backend stores one JSON tree per top-level key ("root"). Path
//! resolution below the root is the [`Store`](crate::store::Store)'s job;
//! backends only read, replace and remove whole roots.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use serde_json::Value;

/// Backend errors
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid root key: {0}")]
    InvalidKey(String),
}

/// Synchronous storage for top-level JSON trees.
///
/// Calls may block; the store runs them on the blocking pool.
pub trait KvBackend: Send + Sync + 'static {
    /// Tree stored under `root`, if any.
    fn read(&self, root: &str) -> Result<Option<Value>, KvError>;

    /// Subtree at `path` below `root`, if any. Only that subtree is cloned
    /// by backends that keep roots in memory.
    fn read_at(&self, root: &str, path: &[String]) -> Result<Option<Value>, KvError> {
        Ok(self
            .read(root)?
            .and_then(|tree| subtree(&tree, path).cloned()))
    }

    /// Whether anything is stored at `path` below `root`.
    fn contains_at(&self, root: &str, path: &[String]) -> Result<bool, KvError> {
        Ok(self.read_at(root, path)?.is_some())
    }

    /// Replace the tree under `root`.
    fn write(&self, root: &str, value: Value) -> Result<(), KvError>;

    /// Remove `root`. Removing a missing root is not an error.
    fn remove(&self, root: &str) -> Result<(), KvError>;

    /// All stored root keys.
    fn roots(&self) -> Result<Vec<String>, KvError>;

    /// Read-modify-write one root. The closure sees `Null` for a missing
    /// root; leaving `Null` (or an empty object) removes it.
    fn mutate(
        &self,
        root: &str,
        f: Box<dyn FnOnce(&mut Value) + Send + '_>,
    ) -> Result<(), KvError> {
        let mut value = self.read(root)?.unwrap_or(Value::Null);
        f(&mut value);
        if is_vacant(&value) {
            self.remove(root)
        } else {
            self.write(root, value)
        }
    }
}

/// Walk `path` inside `tree`. `null` counts as absent.
pub(crate) fn subtree<'a>(tree: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter()
        .try_fold(tree, |node, seg| node.get(seg.as_str()))
        .filter(|node| !node.is_null())
}

/// `null` and `{}` are not stored.
pub(crate) fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Root keys become file names, so they are restricted.
pub(crate) fn validate_root(root: &str) -> Result<(), KvError> {
    let valid = !root.is_empty()
        && root
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(KvError::InvalidKey(root.to_string()))
    }
}

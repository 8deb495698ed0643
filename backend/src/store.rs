//! Path-addressed store over a key-value backend.
//!
//! Paths are `/`-delimited (`students/<id>`, `branding`). The first segment
//! names a backend root; the rest walks into that root's JSON tree.
//! Writing `null` deletes, and parents left empty by a delete vanish.
//!
//! Operations never fail to the caller: backend errors are logged and
//! surface as `None` / `false`, which callers treat like "absent".

use crate::kv::{is_vacant, KvBackend, KvError};
use portal_core::license::SUPER_ADMIN_ROOT;
use portal_core::Record;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Async adapter over a [`KvBackend`], optionally scoped to a tenant subtree.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KvBackend>,
    /// Segments prepended to every path except those under `superAdmin`.
    prefix: Vec<String>,
}

impl Store {
    /// Unscoped store over a backend
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            prefix: Vec::new(),
        }
    }

    /// Store whose paths resolve under `prefix`, e.g. a tenant's data subtree.
    pub fn scoped(&self, prefix: &str) -> Self {
        Self {
            backend: self.backend.clone(),
            prefix: segments(prefix),
        }
    }

    /// Unscoped view of the same backend.
    pub fn root(&self) -> Self {
        Self::new(self.backend.clone())
    }

    /// Current prefix, if scoped.
    pub fn prefix(&self) -> Option<String> {
        (!self.prefix.is_empty()).then(|| self.prefix.join("/"))
    }

    fn resolve(&self, path: &str) -> Vec<String> {
        let segs = segments(path);
        let exempt = segs.first().map(String::as_str) == Some(SUPER_ADMIN_ROOT);
        if self.prefix.is_empty() || exempt {
            segs
        } else {
            self.prefix.iter().cloned().chain(segs).collect()
        }
    }

    // ==================== Reads ====================

    /// Subtree at `path`, or `None` if absent or on failure.
    pub async fn get(&self, path: &str) -> Option<Value> {
        let segs = self.resolve(path);
        let Some((root, rest)) = segs.split_first() else {
            return Some(self.snapshot().await).filter(|v| !is_vacant(v));
        };

        let backend = self.backend.clone();
        let root = root.clone();
        let rest = rest.to_vec();
        match blocking(move || backend.read_at(&root, &rest)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(path, error = %e, "Store read failed");
                None
            }
        }
    }

    /// Whether anything is stored at `path`, without copying it out.
    pub async fn contains(&self, path: &str) -> bool {
        let segs = self.resolve(path);
        let Some((root, rest)) = segs.split_first() else {
            return false;
        };

        let backend = self.backend.clone();
        let root = root.clone();
        let rest = rest.to_vec();
        match blocking(move || backend.contains_at(&root, &rest)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(path, error = %e, "Store read failed");
                false
            }
        }
    }

    /// Typed read. A record that does not deserialize counts as absent.
    pub async fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let value = self.get(path).await?;
        match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(path, error = %e, "Malformed record");
                None
            }
        }
    }

    /// All records in a collection. Malformed records are skipped.
    pub async fn collection_as<T: DeserializeOwned>(&self, path: &str) -> Vec<Record<T>> {
        let Some(Value::Object(map)) = self.get(path).await else {
            return Vec::new();
        };
        map.into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(item) => Some(Record::new(id, item)),
                Err(e) => {
                    warn!(path, id = %id, error = %e, "Skipping malformed record");
                    None
                }
            })
            .collect()
    }

    /// Number of entries in a collection.
    pub async fn count(&self, path: &str) -> usize {
        match self.get(path).await {
            Some(Value::Object(map)) => map.len(),
            _ => 0,
        }
    }

    // ==================== Writes ====================

    /// Replace the subtree at `path`. `null` deletes.
    pub async fn set(&self, path: &str, value: Value) -> bool {
        self.mutate(path, move |tree, rest| assign(tree, rest, value))
            .await
    }

    /// Typed [`set`](Self::set).
    pub async fn set_as<T: Serialize>(&self, path: &str, item: &T) -> bool {
        match serde_json::to_value(item) {
            Ok(value) => self.set(path, value).await,
            Err(e) => {
                warn!(path, error = %e, "Failed to serialize record");
                false
            }
        }
    }

    /// Add a record to a collection under a fresh time-ordered ID.
    pub async fn push(&self, path: &str, value: Value) -> Option<String> {
        let id = Uuid::now_v7().simple().to_string();
        let target = format!("{}/{}", path.trim_end_matches('/'), id);
        self.set(&target, value).await.then(|| {
            debug!(path, id = %id, "Pushed record");
            id
        })
    }

    /// Typed [`push`](Self::push).
    pub async fn push_as<T: Serialize>(&self, path: &str, item: &T) -> Option<String> {
        match serde_json::to_value(item) {
            Ok(value) => self.push(path, value).await,
            Err(e) => {
                warn!(path, error = %e, "Failed to serialize record");
                None
            }
        }
    }

    /// Shallow-merge `fields` into the object at `path`; `null` fields are
    /// removed and sibling fields are untouched.
    pub async fn update(&self, path: &str, fields: Map<String, Value>) -> bool {
        self.mutate(path, move |tree, rest| merge_at(tree, rest, fields))
            .await
    }

    /// Delete the subtree at `path`.
    pub async fn delete(&self, path: &str) -> bool {
        self.set(path, Value::Null).await
    }

    async fn mutate<F>(&self, path: &str, op: F) -> bool
    where
        F: FnOnce(&mut Value, &[String]) + Send + 'static,
    {
        let segs = self.resolve(path);
        let Some((root, rest)) = segs.split_first() else {
            warn!("Refusing path-level write to the namespace root");
            return false;
        };

        let backend = self.backend.clone();
        let root = root.clone();
        let rest = rest.to_vec();
        let apply = Box::new(move |tree: &mut Value| op(tree, &rest));
        match blocking(move || backend.mutate(&root, apply)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(path, error = %e, "Store write failed");
                false
            }
        }
    }

    // ==================== Whole namespace ====================

    /// Every root as one object.
    pub async fn snapshot(&self) -> Value {
        let backend = self.backend.clone();
        let result = blocking(move || {
            let mut all = Map::new();
            for root in backend.roots()? {
                if let Some(tree) = backend.read(&root)? {
                    all.insert(root, tree);
                }
            }
            Ok(all)
        })
        .await;
        match result {
            Ok(all) => Value::Object(all),
            Err(e) => {
                warn!(error = %e, "Snapshot failed");
                Value::Object(Map::new())
            }
        }
    }

    /// Replace the entire namespace with `data`'s top-level keys.
    pub async fn replace_all(&self, data: Map<String, Value>) -> bool {
        let backend = self.backend.clone();
        let result = blocking(move || {
            for root in backend.roots()? {
                backend.remove(&root)?;
            }
            for (root, tree) in data {
                if !is_vacant(&tree) {
                    backend.write(&root, tree)?;
                }
            }
            Ok(())
        })
        .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Namespace replace failed");
                false
            }
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, KvError>
where
    F: FnOnce() -> Result<T, KvError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|join| Err(KvError::Io(std::io::Error::other(join))))
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn assign(tree: &mut Value, path: &[String], value: Value) {
    if is_vacant(&value) {
        remove_at(tree, path);
        return;
    }
    let mut node = tree;
    for seg in path {
        node = ensure_object(node)
            .entry(seg.clone())
            .or_insert(Value::Null);
    }
    *node = value;
}

fn remove_at(tree: &mut Value, path: &[String]) {
    let Some((head, rest)) = path.split_first() else {
        *tree = Value::Null;
        return;
    };
    let Value::Object(map) = tree else {
        return;
    };
    if rest.is_empty() {
        map.remove(head);
    } else if let Some(child) = map.get_mut(head) {
        remove_at(child, rest);
        if is_vacant(child) {
            map.remove(head);
        }
    }
}

fn merge_at(tree: &mut Value, path: &[String], fields: Map<String, Value>) {
    let mut node = &mut *tree;
    for seg in path {
        node = ensure_object(node)
            .entry(seg.clone())
            .or_insert(Value::Null);
    }
    let map = ensure_object(node);
    for (key, value) in fields {
        if value.is_null() {
            map.remove(&key);
        } else {
            map.insert(key, value);
        }
    }
    let empty = map.is_empty();
    if empty {
        remove_at(tree, path);
    }
}

use super::{is_vacant, subtree, validate_root, KvBackend, KvError};
use dashmap::DashMap;
use serde_json::Value;

/// In-memory backend. Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    roots: DashMap<String, Value>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn read(&self, root: &str) -> Result<Option<Value>, KvError> {
        Ok(self.roots.get(root).map(|entry| entry.value().clone()))
    }

    fn read_at(&self, root: &str, path: &[String]) -> Result<Option<Value>, KvError> {
        Ok(self
            .roots
            .get(root)
            .and_then(|entry| subtree(entry.value(), path).cloned()))
    }

    fn contains_at(&self, root: &str, path: &[String]) -> Result<bool, KvError> {
        Ok(self
            .roots
            .get(root)
            .is_some_and(|entry| subtree(entry.value(), path).is_some()))
    }

    fn write(&self, root: &str, value: Value) -> Result<(), KvError> {
        validate_root(root)?;
        self.roots.insert(root.to_string(), value);
        Ok(())
    }

    fn remove(&self, root: &str) -> Result<(), KvError> {
        self.roots.remove(root);
        Ok(())
    }

    fn roots(&self) -> Result<Vec<String>, KvError> {
        Ok(self.roots.iter().map(|entry| entry.key().clone()).collect())
    }

    // The entry guard makes each mutation atomic per root.
    fn mutate(
        &self,
        root: &str,
        f: Box<dyn FnOnce(&mut Value) + Send + '_>,
    ) -> Result<(), KvError> {
        validate_root(root)?;
        let mut entry = self.roots.entry(root.to_string()).or_insert(Value::Null);
        f(entry.value_mut());
        drop(entry);
        self.roots.remove_if(root, |_, value| is_vacant(value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_read_remove() {
        let kv = MemoryBackend::new();
        kv.write("notes", json!({ "a": { "title": "x" } })).unwrap();
        assert_eq!(kv.read("notes").unwrap(), Some(json!({ "a": { "title": "x" } })));
        assert_eq!(kv.roots().unwrap(), vec!["notes".to_string()]);
        kv.remove("notes").unwrap();
        assert_eq!(kv.read("notes").unwrap(), None);
    }

    #[test]
    fn read_at_leaves_siblings_behind() {
        let kv = MemoryBackend::new();
        kv.write(
            "superAdmin",
            json!({ "licenses": { "A1": { "status": "active", "data": { "videos": { "v": 1 } } } } }),
        )
        .unwrap();
        let path = ["licenses", "A1", "status"].map(String::from);
        assert_eq!(kv.read_at("superAdmin", &path).unwrap(), Some(json!("active")));
        let missing = ["licenses", "B2"].map(String::from);
        assert_eq!(kv.read_at("superAdmin", &missing).unwrap(), None);
        assert_eq!(kv.read_at("nothing", &[]).unwrap(), None);
        assert!(kv.contains_at("superAdmin", &path).unwrap());
        assert!(!kv.contains_at("superAdmin", &missing).unwrap());
    }

    #[test]
    fn mutate_to_empty_removes_root() {
        let kv = MemoryBackend::new();
        kv.mutate("notices", Box::new(|v: &mut Value| *v = json!({ "n": 1 })))
            .unwrap();
        assert!(kv.read("notices").unwrap().is_some());
        kv.mutate("notices", Box::new(|v: &mut Value| *v = json!({}))).unwrap();
        assert_eq!(kv.read("notices").unwrap(), None);
    }
}

// ABOUTME: Storage port for live pipeline state, keyed by typed IDs.
// ABOUTME: Ships with an in-memory implementation; durable backends plug in behind the trait.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

/// Keyed storage for pipeline state.
///
/// Implementations must be safe for concurrent access from multiple
/// tasks; each method is an atomic operation on the underlying store.
/// `put` overwrites silently. Callers needing read-modify-write should
/// go through [`Repository::update`], which runs the closure under the
/// store's own synchronization.
pub trait Repository<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    fn put(&self, key: K, value: V);

    fn delete(&self, key: &K) -> Option<V>;

    fn list(&self) -> Vec<V>;

    /// Atomically mutate the value for `key`, if present. Returns the
    /// value after mutation.
    fn update(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> Option<V>;
}

/// HashMap-backed repository guarded by a `parking_lot::RwLock`.
///
/// This is the only process-local implementation; a restart loses all
/// state. Durable deployments back the same trait with a real store.
#[derive(Debug, Default)]
pub struct InMemoryRepository<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> InMemoryRepository<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Repository<K, V> for InMemoryRepository<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    fn put(&self, key: K, value: V) {
        self.inner.write().insert(key, value);
    }

    fn delete(&self, key: &K) -> Option<V> {
        self.inner.write().remove(key)
    }

    fn list(&self) -> Vec<V> {
        self.inner.read().values().cloned().collect()
    }

    fn update(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> Option<V> {
        let mut guard = self.inner.write();
        let value = guard.get_mut(key)?;
        f(value);
        Some(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let repo = InMemoryRepository::new();
        repo.put("a".to_string(), 1);
        assert_eq!(repo.get(&"a".to_string()), Some(1));
        assert_eq!(repo.get(&"b".to_string()), None);
    }

    #[test]
    fn put_overwrites_existing_value() {
        let repo = InMemoryRepository::new();
        repo.put("a".to_string(), 1);
        repo.put("a".to_string(), 2);
        assert_eq!(repo.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn update_mutates_in_place() {
        let repo = InMemoryRepository::new();
        repo.put("a".to_string(), 1);

        let after = repo.update(&"a".to_string(), &mut |v| *v += 10);
        assert_eq!(after, Some(11));
        assert_eq!(repo.get(&"a".to_string()), Some(11));
    }

    #[test]
    fn update_missing_key_is_none() {
        let repo: InMemoryRepository<String, i32> = InMemoryRepository::new();
        assert_eq!(repo.update(&"nope".to_string(), &mut |v| *v += 1), None);
    }

    #[test]
    fn delete_removes_and_returns() {
        let repo = InMemoryRepository::new();
        repo.put("a".to_string(), 1);
        assert_eq!(repo.delete(&"a".to_string()), Some(1));
        assert!(repo.list().is_empty());
    }
}

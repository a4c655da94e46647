use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use storefront_core::UserId;
use storefront_sales::Cart;

/// Key/value store for disposable per-key state.
pub trait KeyedStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn upsert(&self, key: K, value: V);
    fn remove(&self, key: &K);
    /// Read-modify-write under one lock. A missing entry starts from the
    /// default value.
    fn update(&self, key: K, f: &mut dyn FnMut(&mut V));
}

impl<K, V, S> KeyedStore<K, V> for Arc<S>
where
    S: KeyedStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn upsert(&self, key: K, value: V) {
        (**self).upsert(key, value)
    }

    fn remove(&self, key: &K) {
        (**self).remove(key)
    }

    fn update(&self, key: K, f: &mut dyn FnMut(&mut V)) {
        (**self).update(key, f)
    }
}

/// In-memory keyed store.
#[derive(Debug)]
pub struct InMemoryKeyedStore<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

/// Carts keyed by their owner.
pub type InMemoryCartStore = InMemoryKeyedStore<UserId, Cart>;

impl<K, V> InMemoryKeyedStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    // A panic in one caller must not lock every other key out.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Default for InMemoryKeyedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyedStore<K, V> for InMemoryKeyedStore<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    fn upsert(&self, key: K, value: V) {
        self.write().insert(key, value);
    }

    fn remove(&self, key: &K) {
        self.write().remove(key);
    }

    fn update(&self, key: K, f: &mut dyn FnMut(&mut V)) {
        f(self.write().entry(key).or_default());
    }
}

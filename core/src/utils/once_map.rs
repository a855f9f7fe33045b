use std::hash::Hash;
use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;

/// Map from key to an at-most-once computed value.
///
/// The first requester for a key installs the cell (the in-flight
/// placeholder) and runs the compute closure; requesters that arrive while
/// the computation is still running block on the same cell and observe its
/// single result, however many there are. A closure error removes the
/// still-empty cell before propagating, so later requesters retry instead of
/// hitting a poisoned key.
pub struct OnceMap<K, V> {
  inner: DashMap<K, Arc<OnceCell<V>>, RandomState>,
}

impl<K, V> Default for OnceMap<K, V>
where
  K: Eq + Hash,
{
  fn default() -> Self {
    Self {
      inner: DashMap::default(),
    }
  }
}

impl<K, V> OnceMap<K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  /// Returns the cached value for `key`, computing it with `init` on a miss.
  /// The closure runs outside the map's shard lock so unrelated keys are
  /// never serialized behind it.
  pub fn get_or_try_init<E>(&self, key: &K, init: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
    let cell = Arc::clone(&self.inner.entry(key.clone()).or_default());
    match cell.get_or_try_init(init) {
      Ok(value) => Ok(value.clone()),
      Err(err) => {
        self
          .inner
          .remove_if(key, |_, candidate| {
            Arc::ptr_eq(candidate, &cell) && candidate.get().is_none()
          });
        Err(err)
      }
    }
  }

  /// A realized value, if one is cached. In-flight placeholders read as
  /// absent.
  pub fn get(&self, key: &K) -> Option<V> {
    self.inner.get(key).and_then(|cell| cell.get().cloned())
  }

  pub fn remove(&self, key: &K) {
    self.inner.remove(key);
  }

  pub fn retain(&self, mut keep: impl FnMut(&K) -> bool) {
    self.inner.retain(|key, _| keep(key));
  }

  /// Visits every realized entry. Iteration order is the underlying map's:
  /// stable for a given state, otherwise unspecified.
  pub fn for_each_value(&self, mut f: impl FnMut(&K, &V)) {
    for entry in self.inner.iter() {
      if let Some(value) = entry.value().get() {
        f(entry.key(), value);
      }
    }
  }

  pub fn clear(&self) {
    self.inner.clear();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[test]
  fn computes_once() {
    let map: OnceMap<u32, String> = OnceMap::default();
    let calls = AtomicUsize::new(0);
    let compute = || -> Result<String, ()> {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok("value".to_owned())
    };

    assert_eq!(map.get_or_try_init(&1, compute), Ok("value".to_owned()));
    assert_eq!(
      map.get_or_try_init(&1, || -> Result<String, ()> { panic!("cache hit must not compute") }),
      Ok("value".to_owned())
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(map.get(&1), Some("value".to_owned()));
  }

  #[test]
  fn error_clears_the_placeholder() {
    let map: OnceMap<u32, String> = OnceMap::default();
    assert_eq!(map.get_or_try_init(&1, || Err::<String, &str>("boom")), Err("boom"));
    assert_eq!(map.get(&1), None);
    // the key is retryable after a failure
    assert_eq!(
      map.get_or_try_init(&1, || Ok::<String, &str>("second".to_owned())),
      Ok("second".to_owned())
    );
  }

  #[test]
  fn concurrent_requesters_share_one_computation() {
    let map: OnceMap<u32, usize> = OnceMap::default();
    let calls = AtomicUsize::new(0);

    crossbeam::thread::scope(|scope| {
      for _ in 0..8 {
        scope.spawn(|_| {
          let value = map
            .get_or_try_init(&7, || -> Result<usize, ()> {
              calls.fetch_add(1, Ordering::SeqCst);
              std::thread::sleep(std::time::Duration::from_millis(20));
              Ok(42)
            })
            .unwrap();
          assert_eq!(value, 42);
        });
      }
    })
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}

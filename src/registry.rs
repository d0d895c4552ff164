//! Thread-safe registry of live objects.
//!
//! Owning subsystems (configuration loading, cluster sync) register and
//! unregister objects here; tables snapshot the registry to produce rows.
//! The registry lock only guards membership: it is never held while an
//! object lock is taken.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::RegistryError;
use crate::object::{LiveObject, ObjectId};

/// Recovers the guard of a poisoned registry lock. Membership maps are only
/// mutated after every check has passed, so they are never left half updated.
fn recover<G>(poisoned: PoisonError<G>) -> G {
    poisoned.into_inner()
}

fn normalize_key(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

#[derive(Debug)]
struct RegistryState<T> {
    by_id: HashMap<ObjectId, Arc<LiveObject<T>>>,
    by_name: HashMap<String, ObjectId>,
}

impl<T> Default for RegistryState<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        }
    }
}

/// Registry of live objects of one kind, keyed by id and by name.
///
/// Names are unique within a registry, compared case-insensitively.
#[derive(Debug)]
pub struct ObjectRegistry<T> {
    state: RwLock<RegistryState<T>>,
}

impl<T> Default for ObjectRegistry<T> {
    fn default() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }
}

impl<T> ObjectRegistry<T> {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object, returning the shared handle.
    ///
    /// # Errors
    /// `DuplicateName` if an object with the same name is already registered,
    /// `DuplicateId` if another object already uses this id.
    pub fn register(&self, object: LiveObject<T>) -> Result<Arc<LiveObject<T>>, RegistryError> {
        let mut state = self.state.write().unwrap_or_else(recover);
        let key = normalize_key(object.name());
        if state.by_name.contains_key(&key) {
            return Err(RegistryError::DuplicateName(object.name().to_string()));
        }
        if state.by_id.contains_key(&object.id()) {
            return Err(RegistryError::DuplicateId(object.id()));
        }

        let object = Arc::new(object);
        state.by_name.insert(key, object.id());
        state.by_id.insert(object.id(), Arc::clone(&object));
        tracing::debug!(id = %object.id(), name = %object.name(), "registered live object");
        Ok(object)
    }

    /// Remove an object. Rows already handed out keep it alive until dropped.
    ///
    /// # Errors
    /// `NotFound` if no object has this id.
    pub fn unregister(&self, id: ObjectId) -> Result<Arc<LiveObject<T>>, RegistryError> {
        let mut state = self.state.write().unwrap_or_else(recover);
        let object = state.by_id.remove(&id).ok_or(RegistryError::NotFound(id))?;
        state.by_name.remove(&normalize_key(object.name()));
        tracing::debug!(%id, name = %object.name(), "unregistered live object");
        Ok(object)
    }

    /// Object with `id`, if registered.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<Arc<LiveObject<T>>> {
        let state = self.state.read().unwrap_or_else(recover);
        state.by_id.get(&id).cloned()
    }

    /// Object named `name`, compared case-insensitively.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Arc<LiveObject<T>>> {
        let state = self.state.read().unwrap_or_else(recover);
        let id = state.by_name.get(&normalize_key(name))?;
        state.by_id.get(id).cloned()
    }

    /// Number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(recover).by_id.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles to every registered object, ordered by name.
    ///
    /// Only pointers are copied; object state is not read.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<LiveObject<T>>> {
        let mut objects: Vec<_> = {
            let state = self.state.read().unwrap_or_else(recover);
            state.by_id.values().cloned().collect()
        };
        objects.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        objects
    }
}

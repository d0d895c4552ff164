//! Live object identity.
//!
//! A [`LiveObject`] is the unit of mutual exclusion: its identity (id, name,
//! type) is immutable and readable without locking, while its mutable state
//! sits behind an exclusive lock owned by the object itself. Access to the
//! state is only possible through the guards in [`crate::lock`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique, stable object identifier.
///
/// # Examples
///
/// ```
/// use livestate::ObjectId;
///
/// let id = ObjectId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Creates a new random object ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an object ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Creates a nil object ID (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ObjectId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Classification of live objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Host,
    Service,
    /// A check command or other check-execution entity
    Check,
    /// A custom object type
    Custom(String),
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Service => write!(f, "service"),
            Self::Check => write!(f, "check"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// A live, identity-bearing, mutable domain object.
///
/// The state `T` can only be reached through [`LiveObject::lock`] (or the
/// [`read`](LiveObject::read)/[`update`](LiveObject::update) helpers), so no
/// caller can retain access beyond the lifetime of a guard.
///
/// # Examples
///
/// ```
/// use livestate::{LiveObject, ObjectType};
///
/// let counter = LiveObject::new("requests", ObjectType::Check, 0u64);
/// counter.update(|n| *n += 1);
/// assert_eq!(counter.read(|n| *n), 1);
/// ```
pub struct LiveObject<T> {
    id: ObjectId,
    name: String,
    object_type: ObjectType,
    pub(crate) state: Mutex<T>,
    pub(crate) locked: AtomicBool,
    /// Token of the owning thread, `0` when free.
    pub(crate) owner: AtomicU64,
}

impl<T> LiveObject<T> {
    /// Creates a new object with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, object_type: ObjectType, state: T) -> Self {
        Self::with_id(ObjectId::new(), name, object_type, state)
    }

    /// Creates a new object with a specific id.
    #[must_use]
    pub fn with_id(id: ObjectId, name: impl Into<String>, object_type: ObjectType, state: T) -> Self {
        Self {
            id,
            name: name.into(),
            object_type,
            state: Mutex::new(state),
            locked: AtomicBool::new(false),
            owner: AtomicU64::new(0),
        }
    }

    /// Stable identifier, readable without locking.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Object name, readable without locking.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object kind, readable without locking.
    #[must_use]
    pub const fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    /// Consumes the object and returns its state.
    pub fn into_inner(self) -> T {
        self.state
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for LiveObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("object_type", &self.object_type)
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_creation() {
        let id1 = ObjectId::new();
        let id2 = ObjectId::new();
        assert_ne!(id1, id2);
        assert!(!id1.is_nil());
        assert!(ObjectId::nil().is_nil());
    }

    #[test]
    fn test_object_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = ObjectId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn test_object_type_display() {
        assert_eq!(ObjectType::Host.to_string(), "host");
        assert_eq!(ObjectType::Service.to_string(), "service");
        assert_eq!(
            ObjectType::Custom("endpoint".to_string()).to_string(),
            "custom:endpoint"
        );
    }

    #[test]
    fn test_live_object_identity_is_lock_free() {
        let id = ObjectId::new();
        let obj = LiveObject::with_id(id, "web-01", ObjectType::Host, ());
        let _guard = obj.lock();
        // Identity reads never touch the state lock.
        assert_eq!(obj.id(), id);
        assert_eq!(obj.name(), "web-01");
        assert_eq!(obj.object_type(), &ObjectType::Host);
    }

    #[test]
    fn test_live_object_into_inner() {
        let obj = LiveObject::new("n", ObjectType::Check, vec![1, 2]);
        obj.update(|v| v.push(3));
        assert_eq!(obj.into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn test_live_object_debug_does_not_lock() {
        let obj = LiveObject::new("db", ObjectType::Service, 0);
        let _guard = obj.lock();
        let rendered = format!("{obj:?}");
        assert!(rendered.contains("db"));
    }
}

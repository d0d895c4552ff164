//! Scoped object locks.
//!
//! [`LiveObject::lock`] returns an [`ObjectGuard`] by value: the guard derefs
//! to the object state and releases the lock when dropped, on every exit path
//! including panics and `?` propagation. [`ObjectLock`] wraps an optional
//! guard for call sites that may or may not have an object to lock and that
//! need to release early.
//!
//! # Lock-owner bookkeeping
//!
//! While a guard is alive the object records that it is locked and which
//! thread owns it. Acquiring a lock the current thread already holds would
//! deadlock, so it is rejected with a panic naming the object. Bookkeeping is
//! active in debug builds and with the `lock-tracking` feature; otherwise
//! [`LiveObject::owns_lock`] always reports `false`.
//!
//! The core never holds two object locks at once. Code built on top should
//! follow the same rule or impose its own lock order.

use std::cell::Cell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::MutexGuard;

use crate::object::LiveObject;

/// Whether owner bookkeeping and reentrancy detection are compiled in.
#[inline]
#[must_use]
pub const fn tracking_enabled() -> bool {
    cfg!(any(debug_assertions, feature = "lock-tracking"))
}

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: Cell<u64> = const { Cell::new(0) };
}

/// Non-zero token identifying the calling thread.
///
/// `ThreadId` has no stable integer form, and the owner has to fit in one
/// atomic so that readers never see a torn value.
#[must_use]
pub fn current_thread_token() -> u64 {
    THREAD_TOKEN.with(|token| {
        let current = token.get();
        if current != 0 {
            return current;
        }
        let fresh = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
        token.set(fresh);
        fresh
    })
}

impl<T> LiveObject<T> {
    /// Blocks until the object's lock is acquired and returns the guard.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds this object's lock (when
    /// lock tracking is enabled).
    pub fn lock(&self) -> ObjectGuard<'_, T> {
        if tracking_enabled() {
            assert!(
                !self.owns_lock(),
                "object '{}' ({}) is already locked by the current thread",
                self.name(),
                self.id()
            );
        }

        let inner = self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(
                object = %self.name(),
                id = %self.id(),
                "recovering object lock poisoned by a panicking holder"
            );
            let guard = poisoned.into_inner();
            self.state.clear_poison();
            guard
        });

        if tracking_enabled() {
            self.locked.store(true, Ordering::Release);
            self.owner.store(current_thread_token(), Ordering::Release);
        }

        ObjectGuard {
            object: self,
            inner,
        }
    }

    /// Returns true if the calling thread currently holds this object's lock.
    ///
    /// Always false when lock tracking is disabled.
    #[must_use]
    pub fn owns_lock(&self) -> bool {
        tracking_enabled() && self.owner.load(Ordering::Acquire) == current_thread_token()
    }

    /// Returns true if any thread currently holds this object's lock (lock
    /// tracking only).
    ///
    /// Always false when lock tracking is disabled. Diagnostic only: the
    /// answer may be stale by the time it is used.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Token of the thread holding the lock, if any (lock tracking only).
    #[must_use]
    pub fn lock_owner(&self) -> Option<u64> {
        match self.owner.load(Ordering::Acquire) {
            0 => None,
            token => Some(token),
        }
    }

    /// Runs `f` with shared access to the state under one lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }

    /// Runs `f` with exclusive access to the state under one lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }
}

/// Exclusive access to a locked [`LiveObject`].
///
/// Move-only. The lock is released when the guard is dropped.
#[must_use = "the object is unlocked as soon as the guard is dropped"]
pub struct ObjectGuard<'a, T> {
    object: &'a LiveObject<T>,
    inner: MutexGuard<'a, T>,
}

impl<'a, T> ObjectGuard<'a, T> {
    /// The object this guard holds.
    #[must_use]
    pub const fn object(&self) -> &'a LiveObject<T> {
        self.object
    }
}

impl<T> Deref for ObjectGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for ObjectGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T> Drop for ObjectGuard<'_, T> {
    fn drop(&mut self) {
        // Bookkeeping is cleared while the mutex is still held; `inner` is
        // released after this body returns.
        if tracking_enabled() {
            self.object.owner.store(0, Ordering::Release);
            self.object.locked.store(false, Ordering::Release);
        }
    }
}

impl<T> fmt::Debug for ObjectGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectGuard")
            .field("object", &self.object.name())
            .finish_non_exhaustive()
    }
}

/// A scoped lock bound to at most one object.
///
/// Constructed from `None` it is inert: it holds nothing and every operation
/// is a no-op. [`unlock`](Self::unlock) is idempotent and dropping the lock
/// after an explicit unlock does not release a second time.
///
/// # Examples
///
/// ```
/// use livestate::{LiveObject, ObjectLock, ObjectType};
///
/// let host = LiveObject::new("web-01", ObjectType::Host, 0u32);
///
/// let mut lock = ObjectLock::new(Some(&host));
/// if let Some(state) = lock.get_mut() {
///     *state += 1;
/// }
/// lock.unlock();
/// lock.unlock();
///
/// let mut none = ObjectLock::<u32>::new(None);
/// none.unlock();
/// assert!(!none.is_held());
/// assert_eq!(host.read(|n| *n), 1);
/// ```
#[must_use = "the object is unlocked as soon as the lock is dropped"]
pub struct ObjectLock<'a, T> {
    object: Option<&'a LiveObject<T>>,
    guard: Option<ObjectGuard<'a, T>>,
}

impl<'a, T> ObjectLock<'a, T> {
    /// A lock bound to nothing.
    pub const fn unbound() -> Self {
        Self {
            object: None,
            guard: None,
        }
    }

    /// Binds to `object` and locks it immediately if present.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds the object's lock (when
    /// lock tracking is enabled).
    pub fn new(object: Option<&'a LiveObject<T>>) -> Self {
        Self {
            object,
            guard: object.map(LiveObject::lock),
        }
    }

    /// Re-acquires the bound object after an explicit [`unlock`](Self::unlock).
    ///
    /// No-op for an unbound lock.
    ///
    /// # Panics
    ///
    /// Panics if this lock is already held.
    pub fn lock(&mut self) {
        let Some(object) = self.object else {
            return;
        };
        assert!(
            self.guard.is_none(),
            "object lock for '{}' is already held",
            object.name()
        );
        self.guard = Some(object.lock());
    }

    /// Releases the lock if held. Safe to call any number of times.
    pub fn unlock(&mut self) {
        self.guard = None;
    }

    /// Returns true while the lock is held.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.guard.is_some()
    }

    /// The bound object, if any.
    #[must_use]
    pub const fn object(&self) -> Option<&'a LiveObject<T>> {
        self.object
    }

    /// Shared access to the state while held.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.guard.as_deref()
    }

    /// Exclusive access to the state while held.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.guard.as_deref_mut()
    }
}

impl<T> Default for ObjectLock<'_, T> {
    fn default() -> Self {
        Self::unbound()
    }
}

impl<'a, T> From<&'a LiveObject<T>> for ObjectLock<'a, T> {
    fn from(object: &'a LiveObject<T>) -> Self {
        Self::new(Some(object))
    }
}

impl<T> fmt::Debug for ObjectLock<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectLock")
            .field("object", &self.object.map(LiveObject::name))
            .field("held", &self.is_held())
            .finish()
    }
}

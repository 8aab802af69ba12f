//! Shared, ordered collection of live bodies.
//!
//! Structural changes (append during setup, slot replacement on anchor reset,
//! bulk clear on teardown) take the write lock. Ticks only ever copy out the
//! current member list, so the registry lock is never held while a body lock
//! is acquired.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::SimError;
use crate::simulation::states::{Body, BodyHandle};

#[derive(Debug, Default)]
pub struct Registry {
    bodies: RwLock<Vec<Arc<Body>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Body>>> {
        self.bodies.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<Body>>> {
        self.bodies.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a body built for the next free slot.
    pub fn insert_with<F>(&self, build: F) -> Result<Arc<Body>, SimError>
    where
        F: FnOnce(usize) -> Result<Body, SimError>,
    {
        let mut bodies = self.write();
        let body = Arc::new(build(bodies.len())?);
        bodies.push(Arc::clone(&body));
        Ok(body)
    }

    /// Resolve a handle, failing if its slot no longer holds the same body.
    pub fn get(&self, handle: BodyHandle) -> Result<Arc<Body>, SimError> {
        self.read()
            .get(handle.slot())
            .filter(|b| b.id() == handle.id())
            .cloned()
            .ok_or(SimError::StaleHandle(handle))
    }

    /// Current members in insertion order.
    pub fn members(&self) -> Vec<Arc<Body>> {
        self.read().clone()
    }

    /// Swap the body behind `handle` for one built for the same slot,
    /// returning `(old, new)`. `handle` goes stale.
    pub fn replace_with<F>(&self, handle: BodyHandle, build: F) -> Result<(Arc<Body>, Arc<Body>), SimError>
    where
        F: FnOnce(usize) -> Result<Body, SimError>,
    {
        let mut bodies = self.write();
        let current = bodies
            .get_mut(handle.slot())
            .filter(|b| b.id() == handle.id())
            .ok_or(SimError::StaleHandle(handle))?;
        let body = Arc::new(build(handle.slot())?);
        let old = std::mem::replace(current, Arc::clone(&body));
        Ok((old, body))
    }

    /// Remove every member.
    pub fn clear(&self) -> Vec<Arc<Body>> {
        std::mem::take(&mut *self.write())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

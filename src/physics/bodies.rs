use tracing::trace;

use super::body::Body;
use super::body_description::BodyDescription;
use super::errors::SimulationError;
use super::handles::BodyHandle;
use crate::utilities::memory::IdPool;

/// Stable-index storage for bodies. A handle stays valid until its body is removed; the slot is
/// then recycled for a later body.
#[derive(Debug, Default)]
pub struct Bodies {
    slots: Vec<Option<Body>>,
    handle_pool: IdPool,
    count: usize,
}

impl Bodies {
    pub fn with_capacity(initial_body_capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(initial_body_capacity),
            handle_pool: IdPool::with_capacity(initial_body_capacity),
            count: 0,
        }
    }

    /// Adds a body built from the description and returns its handle.
    pub fn add(&mut self, description: &BodyDescription) -> BodyHandle {
        let handle = BodyHandle(self.handle_pool.take());
        let index = handle.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        debug_assert!(self.slots[index].is_none(), "recycled slot still occupied");
        self.slots[index] = Some(Body::new(description));
        self.count += 1;
        trace!(%handle, mass = description.mass, "added body");
        handle
    }

    /// Removes a body, returning it.
    pub fn remove(&mut self, handle: BodyHandle) -> Result<Body, SimulationError> {
        let body = self
            .slots
            .get_mut(handle.index())
            .and_then(Option::take)
            .ok_or(SimulationError::UnknownBody(handle))?;
        self.handle_pool.return_id(handle.0);
        self.count -= 1;
        Ok(body)
    }

    #[inline(always)]
    pub fn body_exists(&self, handle: BodyHandle) -> bool {
        handle.0 >= 0 && matches!(self.slots.get(handle.index()), Some(Some(_)))
    }

    #[inline(always)]
    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        if handle.0 < 0 {
            return None;
        }
        self.slots.get(handle.index()).and_then(Option::as_ref)
    }

    #[inline(always)]
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        if handle.0 < 0 {
            return None;
        }
        self.slots.get_mut(handle.index()).and_then(Option::as_mut)
    }

    /// Looks up a body, failing with [`SimulationError::UnknownBody`].
    #[inline]
    pub fn try_get(&self, handle: BodyHandle) -> Result<&Body, SimulationError> {
        self.get(handle).ok_or(SimulationError::UnknownBody(handle))
    }

    /// Borrows two distinct bodies mutably at once.
    pub fn get_pair_mut(&mut self, a: BodyHandle, b: BodyHandle) -> Option<(&mut Body, &mut Body)> {
        if a == b || a.0 < 0 || b.0 < 0 {
            return None;
        }
        let (ia, ib) = (a.index(), b.index());
        if ia.max(ib) >= self.slots.len() {
            return None;
        }
        let (low, high) = if ia < ib { (ia, ib) } else { (ib, ia) };
        let (head, tail) = self.slots.split_at_mut(high);
        let low_body = head[low].as_mut()?;
        let high_body = tail[0].as_mut()?;
        if ia < ib {
            Some((low_body, high_body))
        } else {
            Some((high_body, low_body))
        }
    }

    /// Number of live bodies.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Live bodies with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|body| (BodyHandle(i as i32), body)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut Body)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|body| (BodyHandle(i as i32), body)))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.handle_pool.clear();
        self.count = 0;
    }
}

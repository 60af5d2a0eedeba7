//! Capacity-bounded scratch stacks with scoped checkpoints.
//!
//! An arena is sized once and never grows. Transient work opens a region with
//! [`MemoryArena::begin_temporary`]; everything pushed inside that region is discarded when the
//! returned [`TemporaryMemory`] guard drops, so nothing from the region can outlive the call
//! that created it.

use std::ops::{Deref, DerefMut};
use thiserror::Error;
use tracing::warn;

/// Errors raised by arena allocation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ArenaError {
    /// A stack was asked to grow beyond the capacity it was created with.
    #[error("arena stack '{stack}' exhausted: capacity {capacity}")]
    Exhausted {
        /// Name of the stack that ran out of room.
        stack: &'static str,
        /// Capacity the stack was created with.
        capacity: usize,
    },
}

/// Fixed capacity stack of `T`. Never reallocates after creation.
#[derive(Debug, Clone)]
pub struct ArenaStack<T> {
    name: &'static str,
    items: Vec<T>,
    capacity: usize,
}

impl<T> ArenaStack<T> {
    /// Creates a stack able to hold `capacity` items.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes an item, returning its index.
    #[inline]
    pub fn push(&mut self, item: T) -> Result<usize, ArenaError> {
        if self.items.len() >= self.capacity {
            warn!(stack = self.name, capacity = self.capacity, "arena stack exhausted");
            return Err(ArenaError::Exhausted {
                stack: self.name,
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    /// Removes the item at `index`, shifting later items down.
    #[inline]
    pub fn remove(&mut self, index: usize) -> T {
        self.items.remove(index)
    }

    /// Keeps only the items matching the predicate, preserving order.
    #[inline]
    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.items.retain(f);
    }

    /// Like [`ArenaStack::retain`], but leaves the items before `start` untouched.
    #[inline]
    pub fn retain_from(&mut self, start: usize, mut f: impl FnMut(&T) -> bool) {
        let mut index = 0;
        self.items.retain(|item| {
            let keep = index < start || f(item);
            index += 1;
            keep
        });
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every item at or after `len`.
    #[inline(always)]
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    #[inline(always)]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Deref for ArenaStack<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> DerefMut for ArenaStack<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

/// Triangle as three indices into the arena's point stack.
pub type ArenaTriangle = [u32; 3];
/// Edge as two indices into the arena's point stack.
pub type ArenaEdge = [u32; 2];

/// Stack lengths at the moment a temporary region was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    points: usize,
    triangles: usize,
    edges: usize,
}

/// Capacities of the three stacks in an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArenaCapacity {
    pub points: usize,
    pub triangles: usize,
    pub edges: usize,
}

impl Default for ArenaCapacity {
    fn default() -> Self {
        Self {
            points: 256,
            triangles: 512,
            edges: 512,
        }
    }
}

/// Scratch storage for polytope style algorithms: a point stack plus triangle and edge index
/// stacks referring into it.
#[derive(Debug, Clone)]
pub struct MemoryArena<P> {
    pub points: ArenaStack<P>,
    pub triangles: ArenaStack<ArenaTriangle>,
    pub edges: ArenaStack<ArenaEdge>,
}

impl<P> MemoryArena<P> {
    pub fn new(capacity: ArenaCapacity) -> Self {
        Self {
            points: ArenaStack::new("points", capacity.points),
            triangles: ArenaStack::new("triangles", capacity.triangles),
            edges: ArenaStack::new("edges", capacity.edges),
        }
    }

    pub fn capacity(&self) -> ArenaCapacity {
        ArenaCapacity {
            points: self.points.capacity(),
            triangles: self.triangles.capacity(),
            edges: self.edges.capacity(),
        }
    }

    /// Records the current stack lengths.
    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            points: self.points.len(),
            triangles: self.triangles.len(),
            edges: self.edges.len(),
        }
    }

    /// Opens a temporary region. Everything pushed through the returned guard is released when
    /// the guard drops.
    #[inline]
    pub fn begin_temporary(&mut self) -> TemporaryMemory<'_, P> {
        let checkpoint = self.checkpoint();
        TemporaryMemory {
            arena: self,
            checkpoint,
        }
    }

    /// Releases everything pushed since the checkpoint.
    #[inline]
    pub fn end_temporary(&mut self, checkpoint: Checkpoint) {
        debug_assert!(self.points.len() >= checkpoint.points);
        self.points.truncate(checkpoint.points);
        self.triangles.truncate(checkpoint.triangles);
        self.edges.truncate(checkpoint.edges);
    }

    /// Empties every stack.
    pub fn reset(&mut self) {
        self.points.clear();
        self.triangles.clear();
        self.edges.clear();
    }
}

/// Scoped region of a [`MemoryArena`]. Dereferences to the arena; drops back to the checkpoint.
pub struct TemporaryMemory<'a, P> {
    arena: &'a mut MemoryArena<P>,
    checkpoint: Checkpoint,
}

impl<P> TemporaryMemory<'_, P> {
    /// Point index at which this region starts.
    #[inline(always)]
    pub fn first_point(&self) -> usize {
        self.checkpoint.points
    }

    /// Triangle index at which this region starts.
    #[inline(always)]
    pub fn first_triangle(&self) -> usize {
        self.checkpoint.triangles
    }

    /// Edge index at which this region starts.
    #[inline(always)]
    pub fn first_edge(&self) -> usize {
        self.checkpoint.edges
    }
}

impl<P> Deref for TemporaryMemory<'_, P> {
    type Target = MemoryArena<P>;

    fn deref(&self) -> &MemoryArena<P> {
        self.arena
    }
}

impl<P> DerefMut for TemporaryMemory<'_, P> {
    fn deref_mut(&mut self) -> &mut MemoryArena<P> {
        self.arena
    }
}

impl<P> Drop for TemporaryMemory<'_, P> {
    fn drop(&mut self) {
        self.arena.end_temporary(self.checkpoint);
    }
}

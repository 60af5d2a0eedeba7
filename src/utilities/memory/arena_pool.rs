use super::arena::{ArenaCapacity, MemoryArena};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// Thread-safe pool of arenas handed out to workers.
///
/// A worker checks an arena out before starting a job and gives it back when the job completes,
/// so scratch memory is reused across jobs without being shared between concurrent ones.
pub struct ArenaPool<P> {
    capacity: ArenaCapacity,
    free: Mutex<Vec<MemoryArena<P>>>,
}

impl<P> ArenaPool<P> {
    /// Creates a pool whose arenas all share the given capacity.
    pub fn new(capacity: ArenaCapacity) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            free: Mutex::new(Vec::new()),
        })
    }

    /// Takes an idle arena, creating one if every arena is checked out.
    pub fn checkout(&self) -> MemoryArena<P> {
        let recycled = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match recycled {
            Some(arena) => arena,
            None => {
                trace!(capacity = ?self.capacity, "allocating pooled arena");
                MemoryArena::new(self.capacity)
            }
        }
    }

    /// Returns an arena to the pool. Its contents are discarded.
    pub fn give_back(&self, mut arena: MemoryArena<P>) {
        arena.reset();
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(arena);
    }

    /// Number of idle arenas held by the pool.
    pub fn idle_count(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn arena_capacity(&self) -> ArenaCapacity {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_recycles_returned_arenas() {
        let pool = ArenaPool::<u8>::new(ArenaCapacity::default());
        let mut arena = pool.checkout();
        arena.points.push(1).unwrap();
        pool.give_back(arena);
        assert_eq!(pool.idle_count(), 1);
        let arena = pool.checkout();
        assert!(arena.points.is_empty());
        assert_eq!(pool.idle_count(), 0);
    }
}

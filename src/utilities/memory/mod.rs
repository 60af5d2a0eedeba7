//! Memory management utilities.
//!
//! Bounded scratch arenas for per-call transient storage, a pool that lends arenas to worker
//! jobs, and an id pool for stable handle slots.

pub mod arena;
pub mod arena_pool;
pub mod id_pool;

pub use arena::{ArenaCapacity, ArenaEdge, ArenaError, ArenaStack, ArenaTriangle, Checkpoint, MemoryArena, TemporaryMemory};
pub use arena_pool::ArenaPool;
pub use id_pool::IdPool;

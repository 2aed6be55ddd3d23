//! Instance pooling
//!
//! [`InstancePool`] recycles instances of a single template. [`PoolRegistry`]
//! is a keyed directory of pools that also remembers which pool every spawned
//! instance came from, so callers can despawn without knowing the key.
//!
//! Reuse is strictly LIFO: the most recently despawned instance is the next
//! one spawned. Once a pool holds `max_size` idle instances, any further
//! despawned instance is destroyed instead of idled.

mod builders;
mod error;
mod instance_pool;
mod registry;
mod timers;

pub use builders::{RegisterBuilder, RegisterContext, RegisterKind, SpawnBuilder, SpawnContext, SpawnKind};
pub use error::PoolError;
pub use instance_pool::{DespawnOutcome, InstancePool, PoolStats, PoolTick};
pub use registry::PoolRegistry;

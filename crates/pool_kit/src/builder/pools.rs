//! Builder pools keyed by kind

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::base::{Builder, BuilderKind, BuilderPool};

/// One builder pool per builder kind
///
/// Owned by the application instead of living in global state, so separate
/// registries (one per test, say) never share builder slots.
#[derive(Default)]
pub struct BuilderPools {
    pools: HashMap<TypeId, Box<dyn Any>>,
}

impl BuilderPools {
    /// Create an empty set of pools
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool for kind `K`, created on first use
    pub fn pool<K: BuilderKind>(&mut self) -> BuilderPool<K> {
        let entry = self
            .pools
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Box::new(BuilderPool::<K>::new()));

        match entry.downcast_ref::<BuilderPool<K>>() {
            Some(pool) => pool.clone(),
            None => {
                log::error!("Builder pool type mismatch for {}", std::any::type_name::<K>());
                BuilderPool::new()
            }
        }
    }

    /// Take a builder of kind `K` with a default context
    pub fn get<K: BuilderKind>(&mut self) -> Builder<K> {
        self.pool::<K>().get()
    }

    /// Take a builder of kind `K` whose context is a copy of `context`
    pub fn get_with<K: BuilderKind>(&mut self, context: &K::Context) -> Builder<K> {
        self.pool::<K>().get_with(context)
    }

    /// Idle slots held for kind `K`
    pub fn idle_count<K: BuilderKind>(&self) -> usize {
        self.pools
            .get(&TypeId::of::<K>())
            .and_then(|pool| pool.downcast_ref::<BuilderPool<K>>())
            .map_or(0, BuilderPool::idle_count)
    }

    /// Number of kinds with a pool
    pub fn kind_count(&self) -> usize {
        self.pools.len()
    }
}

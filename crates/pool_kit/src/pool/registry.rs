//! Keyed pool registry
//!
//! Maps string keys to [`InstancePool`]s and tracks which pool every spawned
//! instance belongs to, so despawning never needs the key.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use super::builders::RegisterContext;
use super::error::PoolError;
use super::instance_pool::{DespawnOutcome, InstancePool, PoolTick};
use crate::config::PoolManifest;
use crate::host::{InstanceId, Placement, SceneHost, ScopeId};

/// Directory of named instance pools
pub struct PoolRegistry<H: SceneHost> {
    pools: HashMap<String, InstancePool<H>>,
    live: HashMap<InstanceId, String>,
    root: Option<ScopeId>,
}

impl<H: SceneHost> PoolRegistry<H> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            pools: HashMap::new(),
            live: HashMap::new(),
            root: None,
        }
    }

    /// Set the scope under which each new pool gets its own container
    ///
    /// Pools registered before this call keep their current scope.
    pub fn set_pool_root(&mut self, root: Option<ScopeId>) {
        self.root = root;
    }

    /// Scope pool containers are created under
    pub fn pool_root(&self) -> Option<ScopeId> {
        self.root
    }

    /// Register a pool, or return the existing one for `key`
    pub fn register(
        &mut self,
        host: &mut H,
        key: &str,
        template: H::Template,
        prewarm_count: usize,
        max_size: usize,
    ) -> &mut InstancePool<H> {
        self.register_with_parent(host, key, template, None, prewarm_count, max_size)
    }

    /// Register a pool whose idle instances live under `parent`
    ///
    /// Without an explicit parent, a `Pool_<key>` scope is created under the
    /// pool root when one is set. Re-registering an existing key logs a
    /// warning and returns the existing pool unchanged.
    pub fn register_with_parent(
        &mut self,
        host: &mut H,
        key: &str,
        template: H::Template,
        parent: Option<ScopeId>,
        prewarm_count: usize,
        max_size: usize,
    ) -> &mut InstancePool<H> {
        match self.pools.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                log::warn!("Pool '{}' already registered, keeping existing pool", key);
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let scope = match (parent, self.root) {
                    (Some(parent), _) => Some(parent),
                    (None, Some(root)) => Some(host.create_scope(&format!("Pool_{}", key), Some(root))),
                    (None, None) => None,
                };

                let pool = entry.insert(InstancePool::new(template, scope, max_size));
                let created = pool.prewarm(host, prewarm_count);
                log::info!(
                    "Registered pool '{}' (max_size: {}, prewarmed: {})",
                    key,
                    max_size,
                    created
                );
                pool
            }
        }
    }

    /// Register a pool from a register context
    ///
    /// An already registered key wins over a missing template: the existing
    /// pool is returned either way.
    pub fn register_context(
        &mut self,
        host: &mut H,
        context: &RegisterContext<H::Template>,
    ) -> Result<&mut InstancePool<H>, PoolError> {
        if self.pools.contains_key(&context.key) {
            log::warn!("Pool '{}' already registered, keeping existing pool", context.key);
            return self
                .pools
                .get_mut(&context.key)
                .ok_or_else(|| PoolError::PoolNotFound(context.key.clone()));
        }
        let template = context
            .template
            .clone()
            .ok_or_else(|| PoolError::MissingTemplate(context.key.clone()))?;

        Ok(self.register_with_parent(
            host,
            &context.key,
            template,
            context.parent,
            context.prewarm_count,
            context.max_size,
        ))
    }

    /// Register every pool in a manifest
    ///
    /// Entries without a template are skipped with an error log. Keys that are
    /// already registered keep their pool untouched. Returns the number of
    /// pools registered or already present.
    pub fn register_manifest(&mut self, host: &mut H, manifest: &PoolManifest<H::Template>) -> usize {
        let incremental = manifest.settings.incremental_prewarm;
        let batch = manifest.settings.prewarm_batch;
        let mut registered = 0;

        for entry in &manifest.pools {
            let existing = self.has_pool(&entry.key);
            let mut context = entry.clone();
            if incremental {
                context.prewarm_count = 0;
            }
            match self.register_context(host, &context) {
                Ok(pool) => {
                    if incremental && !existing {
                        pool.prewarm_async(entry.prewarm_count, batch);
                    }
                    registered += 1;
                }
                Err(e) => log::error!("Skipping manifest entry: {}", e),
            }
        }

        registered
    }

    /// Look up a pool
    pub fn pool(&self, key: &str) -> Option<&InstancePool<H>> {
        self.pools.get(key)
    }

    /// Look up a pool mutably
    pub fn pool_mut(&mut self, key: &str) -> Option<&mut InstancePool<H>> {
        self.pools.get_mut(key)
    }

    /// Whether a pool is registered under `key`
    pub fn has_pool(&self, key: &str) -> bool {
        self.pools.contains_key(key)
    }

    /// Registered keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    /// Number of registered pools
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Spawn from the pool registered under `key`
    ///
    /// Logs an error and returns `None` for an unknown key.
    pub fn spawn(&mut self, host: &mut H, key: &str, placement: &Placement) -> Option<InstanceId> {
        match self.try_spawn(host, key, placement) {
            Ok(instance) => Some(instance),
            Err(e) => {
                log::error!("Spawn failed: {}", e);
                None
            }
        }
    }

    /// Spawn from the pool registered under `key`
    pub fn try_spawn(&mut self, host: &mut H, key: &str, placement: &Placement) -> Result<InstanceId, PoolError> {
        let pool = self
            .pools
            .get_mut(key)
            .ok_or_else(|| PoolError::PoolNotFound(key.to_string()))?;

        let instance = pool.spawn(host, placement);
        self.live.insert(instance, key.to_string());
        Ok(instance)
    }

    /// Spawn and schedule a despawn after `lifetime`
    pub fn spawn_for(
        &mut self,
        host: &mut H,
        key: &str,
        placement: &Placement,
        lifetime: Duration,
    ) -> Option<InstanceId> {
        let instance = self.spawn(host, key, placement)?;
        self.despawn_after(instance, lifetime);
        Some(instance)
    }

    /// Despawn through an explicit key
    ///
    /// Logs an error for an unknown key and does nothing. An instance the
    /// registry tracks under another key is left alone with a warning.
    pub fn despawn_keyed(&mut self, host: &mut H, key: &str, instance: InstanceId) -> DespawnOutcome {
        let Some(pool) = self.pools.get_mut(key) else {
            log::error!("Despawn failed: {}", PoolError::PoolNotFound(key.to_string()));
            return DespawnOutcome::Ignored;
        };

        if let Some(owner) = self.live.get(&instance) {
            if owner.as_str() != key {
                log::warn!("Despawn ignored: {:?} belongs to pool '{}', not '{}'", instance, owner, key);
                return DespawnOutcome::Ignored;
            }
        }

        self.live.remove(&instance);
        pool.despawn(host, instance)
    }

    /// Despawn an instance spawned through this registry
    ///
    /// Logs a warning for instances the registry is not tracking.
    pub fn despawn(&mut self, host: &mut H, instance: InstanceId) -> DespawnOutcome {
        match self.try_despawn(host, instance) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Despawn ignored: {}", e);
                DespawnOutcome::Ignored
            }
        }
    }

    /// Despawn an instance spawned through this registry
    pub fn try_despawn(&mut self, host: &mut H, instance: InstanceId) -> Result<DespawnOutcome, PoolError> {
        let key = self
            .live
            .remove(&instance)
            .ok_or(PoolError::NotTracked(instance))?;

        match self.pools.get_mut(&key) {
            Some(pool) => Ok(pool.despawn(host, instance)),
            None => Err(PoolError::PoolNotFound(key)),
        }
    }

    /// Despawn every live instance spawned from `key`
    ///
    /// Returns the number of instances that left the active set.
    pub fn despawn_all(&mut self, host: &mut H, key: &str) -> usize {
        let Some(pool) = self.pools.get_mut(key) else {
            log::error!("Despawn failed: {}", PoolError::PoolNotFound(key.to_string()));
            return 0;
        };

        let owned: Vec<InstanceId> = self
            .live
            .iter()
            .filter(|(_, owner)| owner.as_str() == key)
            .map(|(instance, _)| *instance)
            .collect();

        let mut despawned = 0;
        for instance in owned {
            self.live.remove(&instance);
            if pool.despawn(host, instance).is_despawned() {
                despawned += 1;
            }
        }
        despawned
    }

    /// Schedule a despawn of a live instance after `delay`
    pub fn despawn_after(&mut self, instance: InstanceId, delay: Duration) -> bool {
        let Some(key) = self.live.get(&instance) else {
            log::warn!("Despawn ignored: {}", PoolError::NotTracked(instance));
            return false;
        };

        match self.pools.get_mut(key) {
            Some(pool) => pool.despawn_after(instance, delay),
            None => false,
        }
    }

    /// Key of the pool a live instance was spawned from
    pub fn owner_of(&self, instance: InstanceId) -> Option<&str> {
        self.live.get(&instance).map(String::as_str)
    }

    /// Whether the instance is spawned and tracked by the registry
    pub fn is_live(&self, instance: InstanceId) -> bool {
        self.live.contains_key(&instance)
    }

    /// Number of instances spawned through the registry and not yet despawned
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Clear one pool, keeping it registered
    ///
    /// Live instances from the pool are no longer tracked afterwards.
    pub fn clear_pool(&mut self, host: &mut H, key: &str) -> bool {
        let Some(pool) = self.pools.get_mut(key) else {
            log::error!("Clear failed: {}", PoolError::PoolNotFound(key.to_string()));
            return false;
        };

        pool.clear(host);
        self.live.retain(|_, owner| owner.as_str() != key);
        true
    }

    /// Clear every pool, keeping them registered
    pub fn clear_all(&mut self, host: &mut H) {
        for pool in self.pools.values_mut() {
            pool.clear(host);
        }
        self.live.clear();
    }

    /// Clear and remove a pool
    pub fn unregister(&mut self, host: &mut H, key: &str) -> bool {
        let Some(mut pool) = self.pools.remove(key) else {
            log::error!("Unregister failed: {}", PoolError::PoolNotFound(key.to_string()));
            return false;
        };

        pool.clear(host);
        self.live.retain(|_, owner| owner.as_str() != key);
        log::info!("Unregistered pool '{}'", key);
        true
    }

    /// Queue incremental prewarming on a registered pool
    pub fn prewarm_async(&mut self, key: &str, count: usize, batch_size: usize) -> bool {
        match self.pools.get_mut(key) {
            Some(pool) => {
                pool.prewarm_async(count, batch_size);
                true
            }
            None => {
                log::error!("Prewarm failed: {}", PoolError::PoolNotFound(key.to_string()));
                false
            }
        }
    }

    /// Process host destruction reports, prewarm batches and despawn timers
    pub fn tick(&mut self, host: &mut H, delta: Duration) -> PoolTick {
        for instance in host.drain_destroyed() {
            self.handle_destroyed(instance);
        }

        let mut report = PoolTick::default();
        for pool in self.pools.values_mut() {
            report.merge(pool.tick(host, delta));
        }
        for instance in &report.expired {
            self.live.remove(instance);
        }
        report
    }

    /// Forget an instance the host destroyed
    ///
    /// Returns true if any pool was tracking it.
    pub fn handle_destroyed(&mut self, instance: InstanceId) -> bool {
        match self.live.remove(&instance) {
            Some(key) => self
                .pools
                .get_mut(&key)
                .map_or(false, |pool| pool.on_instance_destroyed(instance)),
            None => self
                .pools
                .values_mut()
                .any(|pool| pool.on_instance_destroyed(instance)),
        }
    }
}

impl<H: SceneHost> Default for PoolRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolSettings;
    use crate::host::HeadlessHost;

    type Registry = PoolRegistry<HeadlessHost>;

    fn bullet_registry(host: &mut HeadlessHost) -> Registry {
        let mut registry = Registry::new();
        registry.register(host, "Bullet", "bullet".to_string(), 2, 8);
        registry
    }

    #[test]
    fn test_register_prewarms() {
        let mut host = HeadlessHost::new();
        let registry = bullet_registry(&mut host);

        let pool = registry.pool("Bullet").unwrap();
        assert_eq!(pool.count_inactive(), 2);
        assert_eq!(pool.max_size(), 8);
        assert!(registry.has_pool("Bullet"));
        assert_eq!(registry.pool_count(), 1);
    }

    #[test]
    fn test_duplicate_register_keeps_first() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);

        let pool = registry.register(&mut host, "Bullet", "other".to_string(), 5, 1);
        assert_eq!(pool.template(), "bullet");
        assert_eq!(pool.max_size(), 8);
        assert_eq!(pool.count_inactive(), 2);
    }

    #[test]
    fn test_pool_root_creates_scope_per_pool() {
        let mut host = HeadlessHost::new();
        let root = host.create_scope("Pools", None);
        let mut registry = Registry::new();
        registry.set_pool_root(Some(root));

        registry.register(&mut host, "Bullet", "bullet".to_string(), 1, 8);

        let scope = host.find_scope("Pool_Bullet").unwrap();
        assert_eq!(host.scope(scope).unwrap().parent, Some(root));
        assert_eq!(registry.pool("Bullet").unwrap().scope(), Some(scope));
    }

    #[test]
    fn test_explicit_parent_wins_over_root() {
        let mut host = HeadlessHost::new();
        let root = host.create_scope("Pools", None);
        let level = host.create_scope("Level", None);
        let mut registry = Registry::new();
        registry.set_pool_root(Some(root));

        registry.register_with_parent(&mut host, "Bullet", "bullet".to_string(), Some(level), 0, 8);

        assert_eq!(registry.pool("Bullet").unwrap().scope(), Some(level));
        assert!(host.find_scope("Pool_Bullet").is_none());
    }

    #[test]
    fn test_spawn_and_keyless_despawn() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);

        let instance = registry.spawn(&mut host, "Bullet", &Placement::origin()).unwrap();
        assert_eq!(registry.owner_of(instance), Some("Bullet"));

        assert_eq!(registry.despawn(&mut host, instance), DespawnOutcome::Pooled);
        assert!(!registry.is_live(instance));
        assert_eq!(registry.despawn(&mut host, instance), DespawnOutcome::Ignored);
    }

    #[test]
    fn test_keyed_despawn() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);

        let instance = registry.spawn(&mut host, "Bullet", &Placement::origin()).unwrap();
        assert_eq!(registry.despawn_keyed(&mut host, "Bullet", instance), DespawnOutcome::Pooled);

        assert!(!registry.is_live(instance));
        assert!(!host.is_active(instance));
        assert!(registry.pool("Bullet").unwrap().is_pooled(instance));
        assert_eq!(registry.despawn_keyed(&mut host, "Bullet", instance), DespawnOutcome::Ignored);
    }

    #[test]
    fn test_keyed_despawn_through_wrong_pool_keeps_tracking() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);
        registry.register(&mut host, "Spark", "spark".to_string(), 0, 8);

        let bullet = registry.spawn(&mut host, "Bullet", &Placement::origin()).unwrap();
        assert_eq!(registry.despawn_keyed(&mut host, "Spark", bullet), DespawnOutcome::Ignored);

        assert!(host.is_active(bullet));
        assert_eq!(registry.owner_of(bullet), Some("Bullet"));
        assert_eq!(registry.pool("Bullet").unwrap().count_active(), 1);
        assert_eq!(registry.despawn_all(&mut host, "Bullet"), 1);
        assert!(registry.pool("Bullet").unwrap().is_pooled(bullet));
    }

    #[test]
    fn test_unknown_key() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);

        assert!(registry.spawn(&mut host, "Missile", &Placement::origin()).is_none());
        assert_eq!(
            registry.try_spawn(&mut host, "Missile", &Placement::origin()),
            Err(PoolError::PoolNotFound("Missile".to_string()))
        );

        let instance = registry.spawn(&mut host, "Bullet", &Placement::origin()).unwrap();
        assert_eq!(registry.despawn_keyed(&mut host, "Missile", instance), DespawnOutcome::Ignored);
        assert!(host.is_active(instance));
    }

    #[test]
    fn test_try_despawn_untracked() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);
        let stranger = host.instantiate(&"rock".to_string(), None);

        assert_eq!(
            registry.try_despawn(&mut host, stranger),
            Err(PoolError::NotTracked(stranger))
        );
    }

    #[test]
    fn test_despawn_all() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);
        registry.register(&mut host, "Spark", "spark".to_string(), 0, 8);

        for _ in 0..3 {
            registry.spawn(&mut host, "Bullet", &Placement::origin());
        }
        let spark = registry.spawn(&mut host, "Spark", &Placement::origin()).unwrap();

        assert_eq!(registry.despawn_all(&mut host, "Bullet"), 3);
        assert_eq!(registry.live_count(), 1);
        assert!(registry.is_live(spark));
        assert_eq!(registry.pool("Bullet").unwrap().count_active(), 0);
    }

    #[test]
    fn test_register_context_requires_template() {
        let mut host = HeadlessHost::new();
        let mut registry = Registry::new();

        let result = registry.register_context(&mut host, &RegisterContext::new("Bullet"));
        assert!(matches!(result, Err(PoolError::MissingTemplate(key)) if key == "Bullet"));
        assert!(!registry.has_pool("Bullet"));
    }

    #[test]
    fn test_register_manifest_incremental() {
        let mut host = HeadlessHost::new();
        let mut registry = Registry::new();

        let mut bullet = RegisterContext::new("Bullet");
        bullet.template = Some("bullet".to_string());
        bullet.prewarm_count = 4;
        let manifest = PoolManifest::new()
            .with_pool(bullet)
            .with_pool(RegisterContext::new("Broken"));
        let manifest = PoolManifest {
            settings: PoolSettings::new().with_incremental_prewarm(true, 3),
            ..manifest
        };

        assert_eq!(registry.register_manifest(&mut host, &manifest), 1);
        assert_eq!(registry.pool("Bullet").unwrap().count_inactive(), 0);

        assert_eq!(registry.tick(&mut host, Duration::ZERO).prewarmed, 3);
        assert_eq!(registry.tick(&mut host, Duration::ZERO).prewarmed, 1);
        assert_eq!(registry.pool("Bullet").unwrap().count_inactive(), 4);
    }

    #[test]
    fn test_manifest_leaves_registered_pool_alone() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);

        let mut bullet = RegisterContext::new("Bullet");
        bullet.template = Some("bullet".to_string());
        bullet.prewarm_count = 5;
        let manifest = PoolManifest {
            settings: PoolSettings::new().with_incremental_prewarm(true, 10),
            ..PoolManifest::new().with_pool(bullet)
        };

        assert_eq!(registry.register_manifest(&mut host, &manifest), 1);
        assert!(!registry.pool("Bullet").unwrap().is_prewarming());
        assert_eq!(registry.tick(&mut host, Duration::ZERO).prewarmed, 0);
        assert_eq!(registry.pool("Bullet").unwrap().count_inactive(), 2);
    }

    #[test]
    fn test_tick_handles_external_destruction() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);
        let instance = registry.spawn(&mut host, "Bullet", &Placement::origin()).unwrap();

        host.destroy(instance);
        registry.tick(&mut host, Duration::ZERO);

        assert!(!registry.is_live(instance));
        let pool = registry.pool("Bullet").unwrap();
        assert!(!pool.is_tracked(instance));
        assert_eq!(pool.count_active(), 0);
    }

    #[test]
    fn test_spawn_for_expires() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);
        let instance = registry
            .spawn_for(&mut host, "Bullet", &Placement::origin(), Duration::from_secs(1))
            .unwrap();

        assert!(registry.tick(&mut host, Duration::from_millis(500)).expired.is_empty());
        let report = registry.tick(&mut host, Duration::from_millis(500));

        assert_eq!(report.expired, vec![instance]);
        assert!(!registry.is_live(instance));
        assert!(registry.pool("Bullet").unwrap().is_pooled(instance));
    }

    #[test]
    fn test_clear_and_unregister() {
        let mut host = HeadlessHost::new();
        let mut registry = bullet_registry(&mut host);
        let instance = registry.spawn(&mut host, "Bullet", &Placement::origin()).unwrap();

        assert!(registry.clear_pool(&mut host, "Bullet"));
        assert!(!registry.is_live(instance));
        assert!(host.is_alive(instance));
        assert_eq!(registry.pool("Bullet").unwrap().count_all(), 0);

        assert!(registry.unregister(&mut host, "Bullet"));
        assert!(!registry.has_pool("Bullet"));
        assert!(!registry.unregister(&mut host, "Bullet"));
        assert!(!registry.clear_pool(&mut host, "Bullet"));
    }
}

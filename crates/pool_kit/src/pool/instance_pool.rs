//! Single-template instance pool

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use super::timers::DespawnTimers;
use crate::host::{InstanceId, Placement, Poolable, SceneHost, ScopeId};

/// Bookkeeping for one instance created by a pool
struct PooledRecord {
    spawned: bool,
    spawn_serial: u64,
    listeners: Vec<Box<dyn Poolable>>,
}

/// Incremental prewarm request, advanced one batch per tick
#[derive(Debug, Clone, Copy)]
struct PrewarmJob {
    remaining: usize,
    batch_size: usize,
}

/// What happened to an instance handed to [`InstancePool::despawn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DespawnOutcome {
    /// Deactivated and pushed onto the idle stack
    Pooled,
    /// Destroyed because the idle stack was already full
    Evicted,
    /// Nothing happened (dead, already idle, or not from this pool)
    Ignored,
}

impl DespawnOutcome {
    /// Whether the instance left the active set
    pub fn is_despawned(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Instances created by the pool and not yet destroyed
    pub count_all: usize,
    /// Spawned-out instances
    pub count_active: usize,
    /// Idle instances ready for reuse
    pub count_inactive: usize,
    /// Maximum number of idle instances
    pub max_size: usize,
}

/// Work done by one [`InstancePool::tick`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolTick {
    /// Instances created by incremental prewarming
    pub prewarmed: usize,
    /// Instances despawned by expired timers
    pub expired: Vec<InstanceId>,
}

impl PoolTick {
    pub(crate) fn merge(&mut self, other: Self) {
        self.prewarmed += other.prewarmed;
        self.expired.extend(other.expired);
    }
}

/// Capacity-bounded pool of reusable instances of one template
///
/// Idle instances sit on a LIFO stack mirrored by a set for membership
/// checks; both always hold exactly the same handles. Every instance the pool
/// created and has not seen destroyed has a record, so
/// `count_active == count_all - count_inactive` at all times.
///
/// Instances destroyed behind the pool's back are either reported through
/// [`InstancePool::on_instance_destroyed`] or discovered lazily when
/// [`InstancePool::spawn`] pops them off the idle stack.
///
/// Not thread-safe; drive it from the host loop's thread.
pub struct InstancePool<H: SceneHost> {
    template: H::Template,
    scope: Option<ScopeId>,
    max_size: usize,
    idle: Vec<InstanceId>,
    idle_set: HashSet<InstanceId>,
    records: HashMap<InstanceId, PooledRecord>,
    next_serial: u64,
    prewarm_jobs: VecDeque<PrewarmJob>,
    timers: DespawnTimers,
}

impl<H: SceneHost> InstancePool<H> {
    /// Default maximum number of idle instances
    pub const DEFAULT_MAX_SIZE: usize = 1000;

    /// Create an empty pool
    ///
    /// # Arguments
    /// * `template` - Prototype new instances are created from
    /// * `scope` - Scope idle instances are parented under
    /// * `max_size` - Maximum idle instances; further despawns destroy
    pub fn new(template: H::Template, scope: Option<ScopeId>, max_size: usize) -> Self {
        Self {
            template,
            scope,
            max_size,
            idle: Vec::new(),
            idle_set: HashSet::new(),
            records: HashMap::new(),
            next_serial: 0,
            prewarm_jobs: VecDeque::new(),
            timers: DespawnTimers::default(),
        }
    }

    /// Template instances are created from
    pub fn template(&self) -> &H::Template {
        &self.template
    }

    /// Scope idle instances are parented under
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Maximum number of idle instances
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Idle instances
    pub fn count_inactive(&self) -> usize {
        self.idle.len()
    }

    /// Spawned-out instances
    pub fn count_active(&self) -> usize {
        self.count_all() - self.count_inactive()
    }

    /// Instances created by this pool and not yet destroyed
    pub fn count_all(&self) -> usize {
        self.records.len()
    }

    /// Counter snapshot
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            count_all: self.count_all(),
            count_active: self.count_active(),
            count_inactive: self.count_inactive(),
            max_size: self.max_size,
        }
    }

    /// Whether the instance is idle in this pool
    pub fn is_pooled(&self, instance: InstanceId) -> bool {
        self.idle_set.contains(&instance)
    }

    /// Idle instances, bottom of the stack first
    pub fn idle_handles(&self) -> &[InstanceId] {
        &self.idle
    }

    /// Whether the instance was created by this pool and is still tracked
    pub fn is_tracked(&self, instance: InstanceId) -> bool {
        self.records.contains_key(&instance)
    }

    /// Whether the instance is currently spawned out of this pool
    pub fn is_spawned(&self, instance: InstanceId) -> bool {
        self.records.get(&instance).map_or(false, |record| record.spawned)
    }

    /// Whether incremental prewarming is still in progress
    pub fn is_prewarming(&self) -> bool {
        !self.prewarm_jobs.is_empty()
    }

    /// Number of pending delayed despawns
    pub fn pending_despawns(&self) -> usize {
        self.timers.len()
    }

    /// Take an instance out of the pool, creating one if none is idle
    ///
    /// Stale idle handles (destroyed outside the pool) are skipped and
    /// forgotten. The instance is reparented if the placement names a
    /// parent, placed, activated, and its listeners get `on_spawn`.
    pub fn spawn(&mut self, host: &mut H, placement: &Placement) -> InstanceId {
        let mut reused = None;
        while let Some(candidate) = self.idle.pop() {
            self.idle_set.remove(&candidate);
            if host.is_alive(candidate) {
                reused = Some(candidate);
                break;
            }
            log::trace!("Discarding stale pooled instance {:?}", candidate);
            self.forget(candidate);
        }

        let instance = match reused {
            Some(instance) => instance,
            None => self.create_instance(host),
        };

        if let Some(parent) = placement.parent {
            host.reparent(instance, Some(parent));
        }
        host.apply_placement(instance, placement);
        host.set_active(instance, true);

        self.next_serial += 1;
        if let Some(record) = self.records.get_mut(&instance) {
            record.spawned = true;
            record.spawn_serial = self.next_serial;
            for listener in &mut record.listeners {
                listener.on_spawn(instance);
            }
        }

        instance
    }

    /// Return an instance to the pool
    ///
    /// Idempotent: a dead, already idle or foreign instance is ignored. When
    /// the idle stack is full the instance being returned is destroyed.
    pub fn despawn(&mut self, host: &mut H, instance: InstanceId) -> DespawnOutcome {
        if !host.is_alive(instance) {
            self.forget(instance);
            return DespawnOutcome::Ignored;
        }
        if self.idle_set.contains(&instance) {
            return DespawnOutcome::Ignored;
        }

        let Some(record) = self.records.get_mut(&instance) else {
            log::warn!("Instance {:?} was not created by this pool, ignoring despawn", instance);
            return DespawnOutcome::Ignored;
        };

        record.spawned = false;
        for listener in &mut record.listeners {
            listener.on_despawn(instance);
        }
        self.timers.cancel(instance);

        host.set_active(instance, false);
        host.reparent(instance, self.scope);

        if self.idle.len() < self.max_size {
            self.idle.push(instance);
            self.idle_set.insert(instance);
            DespawnOutcome::Pooled
        } else {
            self.records.remove(&instance);
            host.destroy(instance);
            log::trace!("Pool full ({}), destroyed {:?}", self.max_size, instance);
            DespawnOutcome::Evicted
        }
    }

    /// Create up to `count` idle instances, bounded by capacity
    ///
    /// Returns the number actually created.
    pub fn prewarm(&mut self, host: &mut H, count: usize) -> usize {
        let mut created = 0;
        while created < count && self.idle.len() < self.max_size {
            self.create_idle(host);
            created += 1;
        }
        created
    }

    /// Queue a prewarm that creates at most `batch_size` instances per tick
    ///
    /// Spawning and despawning stay valid while the job runs.
    pub fn prewarm_async(&mut self, count: usize, batch_size: usize) {
        if count == 0 {
            return;
        }
        self.prewarm_jobs.push_back(PrewarmJob {
            remaining: count,
            batch_size: batch_size.max(1),
        });
    }

    /// Despawn a spawned instance after `delay`
    ///
    /// The timer is dropped if the instance is destroyed or despawned before
    /// it fires. Returns false when the instance is not spawned from this pool.
    pub fn despawn_after(&mut self, instance: InstanceId, delay: Duration) -> bool {
        match self.records.get(&instance) {
            Some(record) if record.spawned => {
                self.timers.schedule(instance, record.spawn_serial, delay);
                true
            }
            _ => {
                log::warn!("Instance {:?} is not spawned from this pool, cannot schedule despawn", instance);
                false
            }
        }
    }

    /// Advance incremental prewarming by one batch and fire due timers
    pub fn tick(&mut self, host: &mut H, delta: Duration) -> PoolTick {
        let mut report = PoolTick::default();

        let mut jobs = std::mem::take(&mut self.prewarm_jobs);
        jobs.retain_mut(|job| {
            let created = self.prewarm(host, job.batch_size.min(job.remaining));
            job.remaining -= created;
            report.prewarmed += created;
            job.remaining > 0 && self.idle.len() < self.max_size
        });
        self.prewarm_jobs = jobs;

        for (instance, serial) in self.timers.advance(delta) {
            if !host.is_alive(instance) {
                self.forget(instance);
                continue;
            }
            let current = self
                .records
                .get(&instance)
                .map_or(false, |record| record.spawned && record.spawn_serial == serial);
            if current && self.despawn(host, instance).is_despawned() {
                report.expired.push(instance);
            }
        }

        report
    }

    /// Destroy every idle instance and forget all bookkeeping
    ///
    /// Spawned-out instances are left alone but no longer tracked. Pending
    /// prewarm jobs and timers are dropped.
    pub fn clear(&mut self, host: &mut H) {
        while let Some(instance) = self.idle.pop() {
            if host.is_alive(instance) {
                host.destroy(instance);
            }
        }
        self.idle_set.clear();
        self.records.clear();
        self.prewarm_jobs.clear();
        self.timers.clear();
    }

    /// Drop bookkeeping for an instance the host reports as destroyed
    ///
    /// Returns true if the pool was tracking it.
    pub fn on_instance_destroyed(&mut self, instance: InstanceId) -> bool {
        if self.idle_set.remove(&instance) {
            self.idle.retain(|idle| *idle != instance);
        }
        self.timers.cancel(instance);
        self.records.remove(&instance).is_some()
    }

    fn create_instance(&mut self, host: &mut H) -> InstanceId {
        let instance = host.instantiate(&self.template, self.scope);
        let listeners = host.take_listeners(instance);
        self.records.insert(
            instance,
            PooledRecord {
                spawned: false,
                spawn_serial: 0,
                listeners,
            },
        );
        instance
    }

    fn create_idle(&mut self, host: &mut H) {
        let instance = self.create_instance(host);
        host.set_active(instance, false);
        self.idle.push(instance);
        self.idle_set.insert(instance);
    }

    fn forget(&mut self, instance: InstanceId) {
        if self.idle_set.remove(&instance) {
            self.idle.retain(|idle| *idle != instance);
        }
        self.timers.cancel(instance);
        self.records.remove(&instance);
    }
}

//! Delayed despawn timers
//!
//! Timers count down on [`DespawnTimers::advance`], which the owning pool
//! calls once per tick. Each timer remembers the spawn serial of the instance
//! it was scheduled for, so a timer that outlives that spawn never despawns
//! the instance's next use.

use std::time::Duration;

use crate::host::InstanceId;

#[derive(Debug, Clone)]
struct PendingDespawn {
    instance: InstanceId,
    serial: u64,
    remaining: Duration,
}

/// Countdown list of scheduled despawns
#[derive(Debug, Default)]
pub(crate) struct DespawnTimers {
    pending: Vec<PendingDespawn>,
}

impl DespawnTimers {
    pub(crate) fn schedule(&mut self, instance: InstanceId, serial: u64, delay: Duration) {
        self.pending.push(PendingDespawn {
            instance,
            serial,
            remaining: delay,
        });
    }

    pub(crate) fn cancel(&mut self, instance: InstanceId) {
        self.pending.retain(|timer| timer.instance != instance);
    }

    /// Advance every timer and return the due ones in scheduling order
    pub(crate) fn advance(&mut self, delta: Duration) -> Vec<(InstanceId, u64)> {
        let mut due = Vec::new();
        self.pending.retain_mut(|timer| {
            timer.remaining = timer.remaining.saturating_sub(delta);
            if timer.remaining.is_zero() {
                due.push((timer.instance, timer.serial));
                false
            } else {
                true
            }
        });
        due
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

//! # Pool Kit
//!
//! Object pooling and pooled fluent builders for game runtimes.
//!
//! ## Features
//!
//! - **Instance Pools**: Capacity-bounded LIFO reuse of template instances
//! - **Pool Registry**: Keyed pools with key-less despawn routing
//! - **Pooled Builders**: Fluent construction with hooks and replayable contexts
//! - **Overlays**: Priority-ordered value overrides with change notification
//! - **Host Agnostic**: Engines plug in through the [`host::SceneHost`] trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pool_kit::prelude::*;
//!
//! let mut host = HeadlessHost::new();
//! let mut registry = PoolRegistry::new();
//! registry.register(&mut host, "Bullet", "bullet".to_string(), 8, 64);
//!
//! let bullet = registry
//!     .spawn(&mut host, "Bullet", &Placement::at(Vec3::new(0.0, 1.0, 0.0)))
//!     .expect("pool is registered");
//! registry.despawn(&mut host, bullet);
//!
//! // Once per frame
//! registry.tick(&mut host, std::time::Duration::from_millis(16));
//! ```
//!
//! Everything here is single-threaded. Drive pools and builders from the
//! thread that owns the host.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod host;
pub mod pool;
pub mod builder;
pub mod overlay;

#[cfg(test)]
mod tests;

/// Common imports for pool users
pub mod prelude {
    pub use crate::{
        builder::{
            BuildFailure, Builder, BuilderError, BuilderKind, BuilderPool, BuilderPools, PrefabBuilder,
            PrefabContext, PrefabKind,
        },
        config::{Config, ConfigError, PoolManifest, PoolSettings},
        foundation::{
            math::{Quat, Vec3},
            Token,
        },
        host::{HeadlessHost, InstanceId, Placement, Poolable, PositionMode, SceneHost, ScopeId},
        overlay::OverlayableValue,
        pool::{
            DespawnOutcome, InstancePool, PoolError, PoolRegistry, PoolStats, PoolTick, RegisterBuilder,
            RegisterContext, SpawnBuilder, SpawnContext,
        },
    };
}

//! Host boundary
//!
//! The pool and builder core never touch engine objects directly. Everything
//! it needs from the runtime goes through [`SceneHost`]: creating and
//! destroying instances, placing them, toggling activation, reparenting, and
//! reporting destructions that happened outside the pool's knowledge.
//!
//! Instances and scopes are addressed with generational slot-map keys, so a
//! handle to a destroyed instance stays detectably stale instead of aliasing a
//! newer one.
//!
//! Hosts are driven from a single thread. Nothing here is `Send`.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::foundation::math::{Quat, Vec3};

mod headless;

pub use headless::{HeadlessHost, InstanceRecord, ListenerFactory, ScopeRecord};

new_key_type! {
    /// Handle to an instance created by a host
    pub struct InstanceId;

    /// Handle to a scope container instances can be parented under
    pub struct ScopeId;
}

/// How a placement's position is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionMode {
    /// Leave the position untouched
    #[default]
    None,
    /// Position is relative to the parent scope
    Local,
    /// Position is in world space
    World,
}

/// Position, rotation, scale and optional parent applied at spawn time
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Target position, interpreted according to `mode`
    pub position: Vec3,
    /// Target rotation
    pub rotation: Quat,
    /// Local scale; `None` keeps the current scale
    pub scale: Option<Vec3>,
    /// How `position` is applied
    pub mode: PositionMode,
    /// Scope to parent the instance under before placing it
    pub parent: Option<ScopeId>,
}

impl Placement {
    /// World-space placement at the origin with identity rotation
    pub fn origin() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: None,
            mode: PositionMode::World,
            parent: None,
        }
    }

    /// World-space placement at `position`
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::origin()
        }
    }

    /// Set rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set local scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set position mode
    pub fn with_mode(mut self, mode: PositionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set parent scope
    pub fn with_parent(mut self, parent: ScopeId) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::origin()
    }
}

/// Lifecycle notifications for pooled instances
///
/// A host hands these out per instance through [`SceneHost::take_listeners`].
/// The owning pool calls `on_spawn` every time the instance is spawned and
/// `on_despawn` every time it goes back to the pool.
pub trait Poolable {
    /// Called after the instance has been placed and activated
    fn on_spawn(&mut self, _instance: InstanceId) {}

    /// Called before the instance is deactivated and returned
    fn on_despawn(&mut self, _instance: InstanceId) {}
}

/// Capabilities the pooling core requires from the runtime
pub trait SceneHost {
    /// Prototype instances are created from
    type Template: Clone;

    /// Create a new instance of `template` under `scope`
    ///
    /// Fresh instances start active.
    fn instantiate(&mut self, template: &Self::Template, scope: Option<ScopeId>) -> InstanceId;

    /// Permanently destroy an instance
    ///
    /// The host must later report the instance from [`SceneHost::drain_destroyed`].
    fn destroy(&mut self, instance: InstanceId);

    /// Whether the instance still exists
    fn is_alive(&self, instance: InstanceId) -> bool;

    /// Apply position, rotation and scale
    ///
    /// The parent in `placement` has already been applied by the caller.
    fn apply_placement(&mut self, instance: InstanceId, placement: &Placement);

    /// Activate or deactivate an instance
    fn set_active(&mut self, instance: InstanceId, active: bool);

    /// Move an instance under `scope` (or to the root when `None`)
    fn reparent(&mut self, instance: InstanceId, scope: Option<ScopeId>);

    /// Create a named scope container
    fn create_scope(&mut self, name: &str, parent: Option<ScopeId>) -> ScopeId;

    /// Lifecycle listeners carried by a freshly created instance
    ///
    /// Called once per instance, right after it is created by a pool.
    fn take_listeners(&mut self, _instance: InstanceId) -> Vec<Box<dyn Poolable>> {
        Vec::new()
    }

    /// Instances destroyed since the last call, each reported exactly once
    fn drain_destroyed(&mut self) -> Vec<InstanceId> {
        Vec::new()
    }
}

//! Builder kinds for pool registration and spawning

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::registry::PoolRegistry;
use crate::builder::{BuildFailure, Builder, BuilderError, BuilderKind, BuilderPools};
use crate::foundation::math::{Quat, Vec3};
use crate::host::{InstanceId, Placement, PositionMode, SceneHost, ScopeId};

/// Parameters for registering a pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct RegisterContext<T> {
    /// Registry key
    pub key: String,
    /// Template new instances are created from
    pub template: Option<T>,
    /// Scope idle instances are parented under
    #[serde(skip)]
    pub parent: Option<ScopeId>,
    /// Instances created up front
    pub prewarm_count: usize,
    /// Maximum idle instances
    pub max_size: usize,
}

impl<T> RegisterContext<T> {
    /// Default maximum number of idle instances
    pub const DEFAULT_MAX_SIZE: usize = 1000;

    /// Context for `key` with everything else defaulted
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }
}

impl<T> Default for RegisterContext<T> {
    fn default() -> Self {
        Self {
            key: String::new(),
            template: None,
            parent: None,
            prewarm_count: 0,
            max_size: Self::DEFAULT_MAX_SIZE,
        }
    }
}

/// Builder kind registering a pool; the product is the pool key
pub struct RegisterKind<H>(PhantomData<fn() -> H>);

impl<H> BuilderKind for RegisterKind<H>
where
    H: SceneHost + 'static,
    H::Template: 'static,
{
    type Context = RegisterContext<H::Template>;
    type Product = String;
    type Target<'a> = (&'a mut PoolRegistry<H>, &'a mut H);

    fn build(context: &Self::Context, (registry, host): Self::Target<'_>) -> Result<String, BuildFailure> {
        registry.register_context(host, context)?;
        Ok(context.key.clone())
    }
}

/// Builder registering a pool
pub type RegisterBuilder<H> = Builder<RegisterKind<H>>;

impl<H> Builder<RegisterKind<H>>
where
    H: SceneHost + 'static,
    H::Template: 'static,
{
    /// Set the registry key
    pub fn with_key(&mut self, key: impl Into<String>) -> Result<&mut Self, BuilderError> {
        let key = key.into();
        self.configure(|context| context.key = key)
    }

    /// Set the template
    pub fn with_template(&mut self, template: H::Template) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.template = Some(template))
    }

    /// Set the scope idle instances live under
    pub fn with_parent(&mut self, parent: ScopeId) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.parent = Some(parent))
    }

    /// Set the number of instances created up front
    pub fn with_prewarm(&mut self, count: usize) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.prewarm_count = count)
    }

    /// Set the maximum number of idle instances
    pub fn with_max_size(&mut self, max_size: usize) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.max_size = max_size)
    }
}

/// Parameters for spawning from a registered pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnContext {
    /// Registry key
    pub key: String,
    /// World-space position
    pub position: Vec3,
    /// Rotation
    pub rotation: Quat,
    /// Scope to parent the instance under
    #[serde(skip)]
    pub parent: Option<ScopeId>,
    /// Local scale; `None` keeps the instance's scale
    pub local_scale: Option<Vec3>,
}

impl SpawnContext {
    /// Context for `key` at the origin
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Placement the pool applies on spawn
    pub fn placement(&self) -> Placement {
        Placement {
            position: self.position,
            rotation: self.rotation,
            scale: self.local_scale,
            mode: PositionMode::World,
            parent: self.parent,
        }
    }
}

impl Default for SpawnContext {
    fn default() -> Self {
        Self {
            key: String::new(),
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            parent: None,
            local_scale: None,
        }
    }
}

/// Builder kind spawning from a registry; the product is the instance
pub struct SpawnKind<H>(PhantomData<fn() -> H>);

impl<H> BuilderKind for SpawnKind<H>
where
    H: SceneHost + 'static,
{
    type Context = SpawnContext;
    type Product = InstanceId;
    type Target<'a> = (&'a mut PoolRegistry<H>, &'a mut H);

    fn build(context: &SpawnContext, (registry, host): Self::Target<'_>) -> Result<InstanceId, BuildFailure> {
        Ok(registry.try_spawn(host, &context.key, &context.placement())?)
    }
}

/// Builder spawning from a registry
pub type SpawnBuilder<H> = Builder<SpawnKind<H>>;

impl<H> Builder<SpawnKind<H>>
where
    H: SceneHost + 'static,
{
    /// Set the registry key
    pub fn with_key(&mut self, key: impl Into<String>) -> Result<&mut Self, BuilderError> {
        let key = key.into();
        self.configure(|context| context.key = key)
    }

    /// Set the world-space position
    pub fn with_position(&mut self, position: Vec3) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.position = position)
    }

    /// Set the rotation
    pub fn with_rotation(&mut self, rotation: Quat) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.rotation = rotation)
    }

    /// Set the parent scope
    pub fn with_parent(&mut self, parent: ScopeId) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.parent = Some(parent))
    }

    /// Set the local scale
    pub fn with_local_scale(&mut self, scale: Vec3) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.local_scale = Some(scale))
    }
}

impl BuilderPools {
    /// Builder registering a pool
    pub fn register_builder<H>(&mut self) -> RegisterBuilder<H>
    where
        H: SceneHost + 'static,
        H::Template: 'static,
    {
        self.get::<RegisterKind<H>>()
    }

    /// Builder spawning from the pool registered under `key`
    pub fn spawn_builder<H>(&mut self, key: impl Into<String>) -> SpawnBuilder<H>
    where
        H: SceneHost + 'static,
    {
        self.get_with::<SpawnKind<H>>(&SpawnContext::new(key))
    }
}

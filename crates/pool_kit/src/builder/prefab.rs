//! Unpooled instance builder
//!
//! Instantiates a template directly through the host, bypassing every pool.
//! Useful for one-off objects that are configured the same way pooled spawns
//! are.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::base::{Builder, BuilderKind};
use super::error::{BuildFailure, BuilderError};
use crate::foundation::math::{unit_scale, Quat, Vec3};
use crate::host::{InstanceId, Placement, PositionMode, SceneHost, ScopeId};

/// Produces a template on demand
pub type TemplateLoader<T> = Rc<dyn Fn() -> Option<T>>;

/// Parameters for a prefab build
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct PrefabContext<T> {
    /// Static template
    pub template: Option<T>,
    /// Loader consulted before the static template
    #[serde(skip)]
    pub loader: Option<TemplateLoader<T>>,
    /// Scope to create the instance under
    #[serde(skip)]
    pub parent: Option<ScopeId>,
    /// Position, applied according to `position_mode`
    pub position: Vec3,
    /// Local scale
    pub scale: Vec3,
    /// Rotation
    pub rotation: Quat,
    /// Whether the instance starts active
    pub default_active: bool,
    /// How `position` is applied
    pub position_mode: PositionMode,
}

impl<T> PrefabContext<T> {
    fn placement(&self) -> Placement {
        Placement {
            position: self.position,
            rotation: self.rotation,
            scale: Some(self.scale),
            mode: self.position_mode,
            parent: self.parent,
        }
    }
}

impl<T> Default for PrefabContext<T> {
    fn default() -> Self {
        Self {
            template: None,
            loader: None,
            parent: None,
            position: Vec3::zeros(),
            scale: unit_scale(),
            rotation: Quat::identity(),
            default_active: true,
            position_mode: PositionMode::None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PrefabContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefabContext")
            .field("template", &self.template)
            .field("loader", &self.loader.as_ref().map(|_| "<loader>"))
            .field("parent", &self.parent)
            .field("position", &self.position)
            .field("scale", &self.scale)
            .field("rotation", &self.rotation)
            .field("default_active", &self.default_active)
            .field("position_mode", &self.position_mode)
            .finish()
    }
}

/// Builder kind instantiating templates directly
pub struct PrefabKind<H>(PhantomData<fn() -> H>);

impl<H> BuilderKind for PrefabKind<H>
where
    H: SceneHost + 'static,
    H::Template: 'static,
{
    type Context = PrefabContext<H::Template>;
    type Product = InstanceId;
    type Target<'a> = &'a mut H;

    fn build(context: &Self::Context, host: &mut H) -> Result<InstanceId, BuildFailure> {
        let loaded = context.loader.as_ref().and_then(|loader| loader());
        let template = loaded
            .or_else(|| context.template.clone())
            .ok_or(BuildFailure::MissingTemplate)?;

        let instance = host.instantiate(&template, context.parent);
        host.apply_placement(instance, &context.placement());
        host.set_active(instance, context.default_active);
        Ok(instance)
    }
}

/// Builder for unpooled instances
pub type PrefabBuilder<H> = Builder<PrefabKind<H>>;

impl<H> Builder<PrefabKind<H>>
where
    H: SceneHost + 'static,
    H::Template: 'static,
{
    /// Set the static template
    pub fn set_template(&mut self, template: H::Template) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.template = Some(template))
    }

    /// Set a loader that takes precedence over the static template
    pub fn set_loader(
        &mut self,
        loader: impl Fn() -> Option<H::Template> + 'static,
    ) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.loader = Some(Rc::new(loader)))
    }

    /// Set the parent scope
    pub fn set_parent(&mut self, parent: ScopeId) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.parent = Some(parent))
    }

    /// Set the position and how it is applied
    pub fn set_position(&mut self, position: Vec3, mode: PositionMode) -> Result<&mut Self, BuilderError> {
        self.configure(|context| {
            context.position = position;
            context.position_mode = mode;
        })
    }

    /// Set the rotation
    pub fn set_rotation(&mut self, rotation: Quat) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.rotation = rotation)
    }

    /// Set the local scale
    pub fn set_scale(&mut self, scale: Vec3) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.scale = scale)
    }

    /// Set whether the instance starts active
    pub fn set_default_active(&mut self, active: bool) -> Result<&mut Self, BuilderError> {
        self.configure(|context| context.default_active = active)
    }
}

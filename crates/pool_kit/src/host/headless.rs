//! In-memory host
//!
//! A [`SceneHost`] with no engine behind it. Instances are plain records in a
//! slot map, templates are names, and lifecycle listeners come from factories
//! registered per template name. Used by the test suite and the demo binary.

use std::collections::HashMap;

use slotmap::{SecondaryMap, SlotMap};

use super::{InstanceId, Placement, Poolable, PositionMode, SceneHost, ScopeId};
use crate::foundation::math::{unit_scale, Quat, Vec3};

/// Builds the lifecycle listeners attached to each new instance of a template
pub type ListenerFactory = Box<dyn Fn(InstanceId) -> Box<dyn Poolable>>;

/// State of one headless instance
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    /// Template the instance was created from
    pub template: String,
    /// Activation flag
    pub active: bool,
    /// Current parent scope
    pub scope: Option<ScopeId>,
    /// Last applied position
    pub position: Vec3,
    /// Space `position` was last applied in
    pub position_space: PositionMode,
    /// Current rotation
    pub rotation: Quat,
    /// Current local scale
    pub scale: Vec3,
}

/// A named scope container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRecord {
    /// Scope name
    pub name: String,
    /// Parent scope
    pub parent: Option<ScopeId>,
}

/// Host keeping every instance in memory
#[derive(Default)]
pub struct HeadlessHost {
    instances: SlotMap<InstanceId, InstanceRecord>,
    scopes: SlotMap<ScopeId, ScopeRecord>,
    listener_factories: HashMap<String, Vec<ListenerFactory>>,
    pending_listeners: SecondaryMap<InstanceId, Vec<Box<dyn Poolable>>>,
    destroyed: Vec<InstanceId>,
    instantiated_total: usize,
    destroyed_total: usize,
}

impl HeadlessHost {
    /// Create an empty host
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener factory to every future instance of `template`
    pub fn register_listener(
        &mut self,
        template: impl Into<String>,
        factory: impl Fn(InstanceId) -> Box<dyn Poolable> + 'static,
    ) {
        self.listener_factories
            .entry(template.into())
            .or_default()
            .push(Box::new(factory));
    }

    /// Look up an instance
    pub fn instance(&self, instance: InstanceId) -> Option<&InstanceRecord> {
        self.instances.get(instance)
    }

    /// Look up a scope
    pub fn scope(&self, scope: ScopeId) -> Option<&ScopeRecord> {
        self.scopes.get(scope)
    }

    /// Find a scope by name
    pub fn find_scope(&self, name: &str) -> Option<ScopeId> {
        self.scopes
            .iter()
            .find(|(_, record)| record.name == name)
            .map(|(id, _)| id)
    }

    /// Whether the instance exists and is active
    pub fn is_active(&self, instance: InstanceId) -> bool {
        self.instances.get(instance).map_or(false, |record| record.active)
    }

    /// Number of instances currently alive
    pub fn live_count(&self) -> usize {
        self.instances.len()
    }

    /// Number of alive instances created from `template`
    pub fn live_count_of(&self, template: &str) -> usize {
        self.instances
            .values()
            .filter(|record| record.template == template)
            .count()
    }

    /// Instances ever created
    pub fn instantiated_total(&self) -> usize {
        self.instantiated_total
    }

    /// Instances ever destroyed
    pub fn destroyed_total(&self) -> usize {
        self.destroyed_total
    }
}

impl SceneHost for HeadlessHost {
    type Template = String;

    fn instantiate(&mut self, template: &String, scope: Option<ScopeId>) -> InstanceId {
        let instance = self.instances.insert(InstanceRecord {
            template: template.clone(),
            active: true,
            scope,
            position: Vec3::zeros(),
            position_space: PositionMode::World,
            rotation: Quat::identity(),
            scale: unit_scale(),
        });
        self.instantiated_total += 1;

        if let Some(factories) = self.listener_factories.get(template) {
            let listeners = factories.iter().map(|factory| factory(instance)).collect();
            self.pending_listeners.insert(instance, listeners);
        }

        log::trace!("Instantiated '{}' as {:?}", template, instance);
        instance
    }

    fn destroy(&mut self, instance: InstanceId) {
        if self.instances.remove(instance).is_some() {
            self.pending_listeners.remove(instance);
            self.destroyed.push(instance);
            self.destroyed_total += 1;
            log::trace!("Destroyed {:?}", instance);
        }
    }

    fn is_alive(&self, instance: InstanceId) -> bool {
        self.instances.contains_key(instance)
    }

    fn apply_placement(&mut self, instance: InstanceId, placement: &Placement) {
        let Some(record) = self.instances.get_mut(instance) else {
            return;
        };

        match placement.mode {
            PositionMode::None => {}
            PositionMode::Local | PositionMode::World => {
                record.position = placement.position;
                record.position_space = placement.mode;
            }
        }
        record.rotation = placement.rotation;
        if let Some(scale) = placement.scale {
            record.scale = scale;
        }
    }

    fn set_active(&mut self, instance: InstanceId, active: bool) {
        if let Some(record) = self.instances.get_mut(instance) {
            record.active = active;
        }
    }

    fn reparent(&mut self, instance: InstanceId, scope: Option<ScopeId>) {
        if let Some(record) = self.instances.get_mut(instance) {
            record.scope = scope;
        }
    }

    fn create_scope(&mut self, name: &str, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.insert(ScopeRecord {
            name: name.to_string(),
            parent,
        })
    }

    fn take_listeners(&mut self, instance: InstanceId) -> Vec<Box<dyn Poolable>> {
        self.pending_listeners.remove(instance).unwrap_or_default()
    }

    fn drain_destroyed(&mut self) -> Vec<InstanceId> {
        std::mem::take(&mut self.destroyed)
    }
}

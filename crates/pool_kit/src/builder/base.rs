//! Pooled builder handle
//!
//! A [`Builder`] owns one [`BuilderSlot`] borrowed from its kind's
//! [`BuilderPool`]. Setters mutate the slot's context, `build` runs hooks and
//! the kind's build step, and disposal resets the slot and pushes it back onto
//! the pool's free list. The handle that remains afterwards is an empty shell
//! that rejects every further call with [`BuilderError::Disposed`].

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::error::{BuildFailure, BuilderError};

/// One kind of buildable artifact
///
/// A kind ties together the context type setters write into, the product a
/// build yields, and whatever the build step needs to borrow to do its work.
pub trait BuilderKind: Sized + 'static {
    /// Construction parameters; the default must be buildable without panicking
    type Context: Clone + Default + 'static;

    /// Artifact produced by a build
    type Product: 'static;

    /// State the build step operates on
    type Target<'a>;

    /// Produce the artifact described by `context`
    fn build(context: &Self::Context, target: Self::Target<'_>) -> Result<Self::Product, BuildFailure>;

    /// Reset a context before its slot is reused
    fn reset(context: &mut Self::Context) {
        *context = Self::Context::default();
    }
}

/// Hook run before the build step; may adjust the context
pub type PreBuildHook<K> = Box<dyn FnMut(&mut <K as BuilderKind>::Context) -> Result<(), BuildFailure>>;

/// Hook run after a successful build step
pub type PostBuildHook<K> =
    Box<dyn FnMut(&<K as BuilderKind>::Context, &<K as BuilderKind>::Product) -> Result<(), BuildFailure>>;

/// Reusable state behind a builder handle
pub struct BuilderSlot<K: BuilderKind> {
    context: K::Context,
    pre_build: Vec<PreBuildHook<K>>,
    post_build: Vec<PostBuildHook<K>>,
}

impl<K: BuilderKind> BuilderSlot<K> {
    fn new() -> Self {
        Self {
            context: K::Context::default(),
            pre_build: Vec::new(),
            post_build: Vec::new(),
        }
    }

    fn reset(&mut self) {
        K::reset(&mut self.context);
        self.pre_build.clear();
        self.post_build.clear();
    }

    fn run(&mut self, target: K::Target<'_>) -> BuildOutcome<K::Product> {
        for hook in &mut self.pre_build {
            if let Err(error) = hook(&mut self.context) {
                return BuildOutcome::Failed { product: None, error };
            }
        }

        let product = match K::build(&self.context, target) {
            Ok(product) => product,
            Err(error) => return BuildOutcome::Failed { product: None, error },
        };

        for hook in &mut self.post_build {
            if let Err(error) = hook(&self.context, &product) {
                return BuildOutcome::Failed {
                    product: Some(product),
                    error,
                };
            }
        }

        BuildOutcome::Built(product)
    }
}

/// Result of running hooks and the build step
enum BuildOutcome<P> {
    Built(P),
    Failed { product: Option<P>, error: BuildFailure },
}

impl<P> BuildOutcome<P> {
    fn into_product<K: BuilderKind>(self) -> Option<P> {
        match self {
            Self::Built(product) => Some(product),
            Self::Failed { product, error } => {
                log::error!("Build of {} failed: {}", type_name::<K>(), error);
                product
            }
        }
    }
}

/// Free list of idle builder slots for one kind
///
/// Cloning shares the same free list.
pub struct BuilderPool<K: BuilderKind> {
    idle: Rc<RefCell<Vec<BuilderSlot<K>>>>,
}

impl<K: BuilderKind> BuilderPool<K> {
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            idle: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Take a builder with a default context
    pub fn get(&self) -> Builder<K> {
        let slot = self.idle.borrow_mut().pop().unwrap_or_else(BuilderSlot::new);
        Builder {
            slot: Some(slot),
            home: self.clone(),
        }
    }

    /// Take a builder whose context is a copy of `context`
    pub fn get_with(&self, context: &K::Context) -> Builder<K> {
        let mut builder = self.get();
        if let Some(slot) = builder.slot.as_mut() {
            slot.context = context.clone();
        }
        builder
    }

    /// Number of slots waiting for reuse
    pub fn idle_count(&self) -> usize {
        self.idle.borrow().len()
    }

    fn release(&self, mut slot: BuilderSlot<K>) {
        slot.reset();
        self.idle.borrow_mut().push(slot);
    }
}

impl<K: BuilderKind> Clone for BuilderPool<K> {
    fn clone(&self) -> Self {
        Self {
            idle: Rc::clone(&self.idle),
        }
    }
}

impl<K: BuilderKind> Default for BuilderPool<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder handle borrowed from a [`BuilderPool`]
///
/// Dropping an undisposed builder returns its slot to the pool as well.
pub struct Builder<K: BuilderKind> {
    slot: Option<BuilderSlot<K>>,
    home: BuilderPool<K>,
}

impl<K: BuilderKind> Builder<K> {
    /// Whether the builder has been disposed
    pub fn is_disposed(&self) -> bool {
        self.slot.is_none()
    }

    /// Current context
    pub fn context(&self) -> Result<&K::Context, BuilderError> {
        self.slot.as_ref().map(|slot| &slot.context).ok_or(BuilderError::Disposed)
    }

    /// Current context, mutable
    pub fn context_mut(&mut self) -> Result<&mut K::Context, BuilderError> {
        self.slot.as_mut().map(|slot| &mut slot.context).ok_or(BuilderError::Disposed)
    }

    /// Apply a change to the context and keep chaining
    ///
    /// Kind-specific setters are thin wrappers over this.
    pub fn configure(&mut self, change: impl FnOnce(&mut K::Context)) -> Result<&mut Self, BuilderError> {
        change(self.context_mut()?);
        Ok(self)
    }

    /// Register a hook that runs before every build
    pub fn on_pre_build(
        &mut self,
        hook: impl FnMut(&mut K::Context) -> Result<(), BuildFailure> + 'static,
    ) -> Result<&mut Self, BuilderError> {
        self.slot_mut()?.pre_build.push(Box::new(hook));
        Ok(self)
    }

    /// Register a hook that runs after every successful build step
    pub fn on_post_build(
        &mut self,
        hook: impl FnMut(&K::Context, &K::Product) -> Result<(), BuildFailure> + 'static,
    ) -> Result<&mut Self, BuilderError> {
        self.slot_mut()?.post_build.push(Box::new(hook));
        Ok(self)
    }

    /// Export a copy of the context and dispose the builder
    pub fn build_context(&mut self) -> Result<K::Context, BuilderError> {
        let context = self.build_context_retained()?;
        self.dispose()?;
        Ok(context)
    }

    /// Export a copy of the context, keeping the builder usable
    pub fn build_context_retained(&self) -> Result<K::Context, BuilderError> {
        self.context().cloned()
    }

    /// Build and dispose
    ///
    /// Hook and build-step failures are logged, not returned: the result is
    /// `Ok(None)` when nothing was produced. Only a disposed builder is an
    /// error.
    pub fn build(&mut self, target: K::Target<'_>) -> Result<Option<K::Product>, BuilderError> {
        let product = self.build_retained(target)?;
        self.dispose()?;
        Ok(product)
    }

    /// Build without disposing, so the same configuration can build again
    pub fn build_retained(&mut self, target: K::Target<'_>) -> Result<Option<K::Product>, BuilderError> {
        let outcome = self.slot_mut()?.run(target);
        Ok(outcome.into_product::<K>())
    }

    /// Reset the builder and return its slot to the pool
    pub fn dispose(&mut self) -> Result<(), BuilderError> {
        let slot = self.slot.take().ok_or(BuilderError::Disposed)?;
        self.home.release(slot);
        Ok(())
    }

    fn slot_mut(&mut self) -> Result<&mut BuilderSlot<K>, BuilderError> {
        self.slot.as_mut().ok_or(BuilderError::Disposed)
    }
}

impl<K: BuilderKind> Drop for Builder<K> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.home.release(slot);
        }
    }
}

impl<K: BuilderKind> fmt::Debug for Builder<K>
where
    K::Context: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("kind", &type_name::<K>())
            .field("context", &self.slot.as_ref().map(|slot| &slot.context))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct LabelContext {
        text: String,
        repeat: usize,
        fail: bool,
    }

    struct LabelKind;

    impl BuilderKind for LabelKind {
        type Context = LabelContext;
        type Product = String;
        type Target<'a> = &'a mut Vec<String>;

        fn build(context: &LabelContext, target: &mut Vec<String>) -> Result<String, BuildFailure> {
            if context.fail {
                return Err(BuildFailure::hook("asked to fail"));
            }
            let label = context.text.repeat(context.repeat);
            target.push(label.clone());
            Ok(label)
        }
    }

    impl Builder<LabelKind> {
        fn text(&mut self, text: &str) -> Result<&mut Self, BuilderError> {
            let text = text.to_string();
            self.configure(|context| context.text = text)
        }

        fn repeat(&mut self, repeat: usize) -> Result<&mut Self, BuilderError> {
            self.configure(|context| context.repeat = repeat)
        }
    }

    #[test]
    fn test_build_runs_and_disposes() {
        let pool = BuilderPool::<LabelKind>::new();
        let mut out = Vec::new();

        let mut builder = pool.get();
        builder.text("ab").unwrap().repeat(2).unwrap();
        let product = builder.build(&mut out).unwrap();

        assert_eq!(product.as_deref(), Some("abab"));
        assert_eq!(out, vec!["abab".to_string()]);
        assert!(builder.is_disposed());
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_reused_slot_starts_from_default() {
        let pool = BuilderPool::<LabelKind>::new();
        let mut builder = pool.get();
        builder.text("x").unwrap().on_pre_build(|_| Ok(())).unwrap();
        builder.dispose().unwrap();

        let again = pool.get();
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(again.context().unwrap(), &LabelContext::default());
        assert!(again.slot.as_ref().unwrap().pre_build.is_empty());
    }

    #[test]
    fn test_disposed_builder_rejects_everything() {
        let pool = BuilderPool::<LabelKind>::new();
        let mut out = Vec::new();
        let mut builder = pool.get();
        builder.dispose().unwrap();

        assert_eq!(builder.dispose(), Err(BuilderError::Disposed));
        assert_eq!(builder.text("x").err(), Some(BuilderError::Disposed));
        assert_eq!(builder.on_post_build(|_, _| Ok(())).err(), Some(BuilderError::Disposed));
        assert_eq!(builder.build(&mut out).err(), Some(BuilderError::Disposed));
        assert_eq!(builder.build_context().err(), Some(BuilderError::Disposed));

        // The disposed shell never pushes a second slot
        assert_eq!(pool.idle_count(), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_get_with_copies_context() {
        let pool = BuilderPool::<LabelKind>::new();
        let original = LabelContext {
            text: "hi".to_string(),
            repeat: 1,
            fail: false,
        };

        let mut builder = pool.get_with(&original);
        builder.text("changed").unwrap();

        assert_eq!(original.text, "hi");
        assert_eq!(builder.context().unwrap().text, "changed");
    }

    #[test]
    fn test_build_context_exports_copy() {
        let pool = BuilderPool::<LabelKind>::new();
        let mut builder = pool.get();
        builder.text("a").unwrap().repeat(3).unwrap();

        let retained = builder.build_context_retained().unwrap();
        assert!(!builder.is_disposed());

        let exported = builder.build_context().unwrap();
        assert!(builder.is_disposed());
        assert_eq!(retained, exported);
        assert_eq!(exported.repeat, 3);
    }

    #[test]
    fn test_hooks_fire_in_order() {
        let pool = BuilderPool::<LabelKind>::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut out = Vec::new();

        let (a, b, c) = (order.clone(), order.clone(), order.clone());
        let mut builder = pool.get();
        builder
            .text("z")
            .unwrap()
            .repeat(1)
            .unwrap()
            .on_pre_build(move |context| {
                a.borrow_mut().push("pre1");
                context.repeat = 2;
                Ok(())
            })
            .unwrap()
            .on_pre_build(move |_| {
                b.borrow_mut().push("pre2");
                Ok(())
            })
            .unwrap()
            .on_post_build(move |_, product| {
                c.borrow_mut().push("post");
                assert_eq!(product, "zz");
                Ok(())
            })
            .unwrap();

        let product = builder.build(&mut out).unwrap();
        assert_eq!(product.as_deref(), Some("zz"));
        assert_eq!(*order.borrow(), vec!["pre1", "pre2", "post"]);
    }

    #[test]
    fn test_failures_are_swallowed() {
        let pool = BuilderPool::<LabelKind>::new();
        let mut out = Vec::new();

        // Build step failure: no product, still disposed
        let mut builder = pool.get();
        builder.configure(|context| context.fail = true).unwrap();
        assert_eq!(builder.build(&mut out), Ok(None));
        assert!(builder.is_disposed());

        // Pre-build failure skips the build step
        let mut builder = pool.get();
        builder
            .text("a")
            .unwrap()
            .repeat(1)
            .unwrap()
            .on_pre_build(|_| Err(BuildFailure::hook("no")))
            .unwrap();
        assert_eq!(builder.build(&mut out), Ok(None));
        assert!(out.is_empty());

        // Post-build failure keeps the product
        let mut builder = pool.get();
        builder
            .text("b")
            .unwrap()
            .repeat(1)
            .unwrap()
            .on_post_build(|_, _| Err(BuildFailure::hook("late")))
            .unwrap();
        assert_eq!(builder.build(&mut out), Ok(Some("b".to_string())));
        assert_eq!(out, vec!["b".to_string()]);
    }

    #[test]
    fn test_build_retained_reuses_hooks() {
        let pool = BuilderPool::<LabelKind>::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut out = Vec::new();

        let mut builder = pool.get();
        builder
            .text("q")
            .unwrap()
            .repeat(1)
            .unwrap()
            .on_post_build(move |_, _| {
                counter.set(counter.get() + 1);
                Ok(())
            })
            .unwrap();

        builder.build_retained(&mut out).unwrap();
        builder.build(&mut out).unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_drop_returns_slot() {
        let pool = BuilderPool::<LabelKind>::new();
        {
            let mut builder = pool.get();
            builder.text("dropped").unwrap();
        }
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.get().context().unwrap().text, "");
    }
}

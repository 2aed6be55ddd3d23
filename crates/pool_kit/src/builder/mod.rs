//! Pooled fluent builders
//!
//! A builder kind ([`BuilderKind`]) describes a context type, a product type
//! and the build step joining them. Builders for a kind are handed out by a
//! [`BuilderPool`], configured through chained setters that write into the
//! context, and built. Building (or disposing) resets the builder and returns
//! its slot to the pool.
//!
//! Contexts are plain cloneable data. Exporting one with
//! [`Builder::build_context`] and feeding it back through
//! [`BuilderPool::get_with`] builds exactly what the original setter chain
//! would have built.
//!
//! ```ignore
//! let mut pools = BuilderPools::new();
//! let mut builder = pools.get::<PrefabKind<HeadlessHost>>();
//! builder
//!     .set_template("crate".to_string())?
//!     .set_position(Vec3::new(0.0, 1.0, 0.0), PositionMode::World)?;
//! let instance = builder.build(&mut host)?;
//! ```

mod base;
mod error;
mod pools;
mod prefab;

pub use base::{Builder, BuilderKind, BuilderPool, BuilderSlot, PostBuildHook, PreBuildHook};
pub use error::{BuildFailure, BuilderError};
pub use pools::BuilderPools;
pub use prefab::{PrefabBuilder, PrefabContext, PrefabKind, TemplateLoader};

//! Math aliases used by placements and build contexts

pub use nalgebra::{Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Unit scale on every axis
pub fn unit_scale() -> Vec3 {
    Vec3::new(1.0, 1.0, 1.0)
}

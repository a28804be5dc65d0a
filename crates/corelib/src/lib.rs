//! Core types: math re-exports, transforms, camera + orbit controls, a tiny
//! ECS world and the scene settings shared by renderer and platform.

pub use glam::{Mat4, Quat, Vec3, vec3};

pub mod camera;
pub mod ecs;
pub mod scene;
pub mod transform;

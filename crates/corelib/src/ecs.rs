//! Tiny ECS: World, Entity, components: Transform + Renderable.

use crate::transform::Transform;

/// Entity id (dense, index into component arrays).
pub type Entity = u32;

/// Procedural meshes the renderer knows how to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshKind {
    Sphere,
}

#[derive(Clone, Copy, Debug)]
pub struct Renderable {
    pub mesh: MeshKind,
}

/// Very small ECS world with dense parallel arrays.
#[derive(Default)]
pub struct World {
    transforms: Vec<Transform>,
    renderables: Vec<Option<Renderable>>,
    alive: Vec<bool>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn entity with Transform and optional Renderable.
    pub fn spawn(&mut self, t: Transform, r: Option<Renderable>) -> Entity {
        let id = self.transforms.len() as Entity;
        self.transforms.push(t);
        self.renderables.push(r);
        self.alive.push(true);
        id
    }

    pub fn despawn(&mut self, e: Entity) -> bool {
        match self.alive.get_mut(e as usize) {
            Some(alive) if *alive => {
                *alive = false;
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn is_alive(&self, e: Entity) -> bool {
        self.alive.get(e as usize).copied().unwrap_or(false)
    }

    #[inline]
    pub fn transform_mut(&mut self, e: Entity) -> Option<&mut Transform> {
        if self.is_alive(e) {
            self.transforms.get_mut(e as usize)
        } else {
            None
        }
    }

    /// Live (Transform, Renderable) pairs in spawn order.
    pub fn iter_renderables(&self) -> impl Iterator<Item = (&Transform, &Renderable)> {
        self.transforms
            .iter()
            .zip(&self.renderables)
            .zip(&self.alive)
            .filter_map(|((t, r), alive)| if *alive { r.as_ref().map(|r| (t, r)) } else { None })
    }

    /// Model matrices of every live renderable using `mesh`.
    pub fn instances_of(&self, mesh: MeshKind) -> Vec<[[f32; 4]; 4]> {
        self.iter_renderables()
            .filter(|(_, r)| r.mesh == mesh)
            .map(|(t, _)| t.matrix().to_cols_array_2d())
            .collect()
    }
}

//! Static world geometry
//!
//! Buildings and trees are created once from the layout and never move. The
//! ground has no collider; contact is a height threshold inside the play-area
//! rectangle.

use glam::{Vec2, Vec3};

use super::body::Transform;
use super::collider::{Collider, ColliderTag, WorldCollider};
use super::state::EntityRef;
use crate::consts::{BUILDING_GRID, GROUND_LEVEL, TREE_SEGMENTS};
use crate::tuning::{BuildingSpec, TreeSpec, WorldLayout};

/// A solid block approximated by a dense grid of spheres
#[derive(Debug, Clone)]
pub struct Building {
    pub transform: Transform,
    pub size: Vec3,
    pub colliders: Vec<Collider>,
}

impl Building {
    pub fn new(spec: &BuildingSpec) -> Self {
        let n = BUILDING_GRID;
        let step = spec.size / n as f32;
        // Spheres touch their face neighbours
        let radius = step.max_element() * 0.5;
        let half = Vec3::new(spec.size.x * 0.5, spec.size.y * 0.5, 0.0);

        let mut colliders = Vec::with_capacity(n * n * n);
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    let cell = Vec3::new(i as f32 + 0.5, j as f32 + 0.5, k as f32 + 0.5);
                    colliders.push(Collider::new(
                        cell * step - half,
                        ColliderTag::Building,
                        radius,
                    ));
                }
            }
        }

        Self {
            transform: Transform {
                scale: spec.size,
                ..Transform::at(spec.position)
            },
            size: spec.size,
            colliders,
        }
    }

    /// Height of the roof
    #[inline]
    pub fn top(&self) -> f32 {
        self.transform.position.z + self.size.z
    }

    pub fn world_colliders(&self, index: usize) -> impl Iterator<Item = WorldCollider> + '_ {
        let top = self.top();
        self.colliders
            .iter()
            .map(move |c| c.resolve(EntityRef::Building(index), self.transform.position, top))
    }
}

/// Trunk plus canopy as stacked spheres
#[derive(Debug, Clone)]
pub struct Tree {
    pub transform: Transform,
    pub height: f32,
    pub colliders: Vec<Collider>,
}

impl Tree {
    pub fn new(spec: &TreeSpec) -> Self {
        let segment = spec.height / TREE_SEGMENTS as f32;
        let colliders = (0..TREE_SEGMENTS)
            .map(|i| {
                // Trunk is thin, canopy is wide
                let radius = if i == 0 { segment * 0.3 } else { segment * 0.5 };
                Collider::new(
                    Vec3::new(0.0, 0.0, (i as f32 + 0.5) * segment),
                    ColliderTag::Tree,
                    radius,
                )
            })
            .collect();

        Self {
            transform: Transform::at(spec.position),
            height: spec.height,
            colliders,
        }
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.transform.position.z + self.height
    }

    pub fn world_colliders(&self, index: usize) -> impl Iterator<Item = WorldCollider> + '_ {
        let top = self.top();
        self.colliders
            .iter()
            .map(move |c| c.resolve(EntityRef::Tree(index), self.transform.position, top))
    }
}

/// The drivable ground rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ground {
    pub min: Vec2,
    pub max: Vec2,
    pub height: f32,
}

impl Ground {
    pub fn from_layout(layout: &WorldLayout) -> Self {
        Self {
            min: layout.bounds_min,
            max: layout.bounds_max,
            height: GROUND_LEVEL,
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Everything that never moves
#[derive(Debug, Clone)]
pub struct StaticWorld {
    pub ground: Ground,
    pub buildings: Vec<Building>,
    pub trees: Vec<Tree>,
}

impl StaticWorld {
    pub fn from_layout(layout: &WorldLayout) -> Self {
        let world = Self {
            ground: Ground::from_layout(layout),
            buildings: layout.buildings.iter().map(Building::new).collect(),
            trees: layout.trees.iter().map(Tree::new).collect(),
        };
        log::debug!(
            "Static world: {} buildings, {} trees, {} colliders",
            world.buildings.len(),
            world.trees.len(),
            world.collider_count()
        );
        world
    }

    pub fn collider_count(&self) -> usize {
        self.buildings.iter().map(|b| b.colliders.len()).sum::<usize>()
            + self.trees.iter().map(|t| t.colliders.len()).sum::<usize>()
    }

    /// All static colliders in world space
    pub fn world_colliders(&self) -> impl Iterator<Item = WorldCollider> + '_ {
        let buildings = self
            .buildings
            .iter()
            .enumerate()
            .flat_map(|(i, b)| b.world_colliders(i));
        let trees = self
            .trees
            .iter()
            .enumerate()
            .flat_map(|(i, t)| t.world_colliders(i));
        buildings.chain(trees)
    }
}

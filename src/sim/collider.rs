//! Sphere colliders and overlap tests
//!
//! Every solid thing in the world is approximated by spheres. Each tick the
//! simulation flattens all live colliders into a `ColliderSnapshot` with
//! world-space centroids; entities then test their own spheres against it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::EntityRef;

/// Collision category, decides how the player responds to a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderTag {
    Player,
    Building,
    Tree,
    Medal,
    Meteor,
    Flame,
    Spring,
}

impl ColliderTag {
    /// Solid obstacles push the player back and stop meteors
    #[inline]
    pub fn is_obstacle(self) -> bool {
        matches!(self, ColliderTag::Building | ColliderTag::Tree)
    }
}

/// A sphere attached to a body. The body owns the collider, not the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    /// Offset from the owning body's position
    pub offset: Vec3,
    pub tag: ColliderTag,
    pub radius: f32,
}

impl Collider {
    pub fn new(offset: Vec3, tag: ColliderTag, radius: f32) -> Self {
        Self {
            offset,
            tag,
            radius,
        }
    }

    /// World-space center given the owner's position
    #[inline]
    pub fn centroid(&self, owner_position: Vec3) -> Vec3 {
        owner_position + self.offset
    }

    /// Resolve against the owner to get a snapshot entry
    pub fn resolve(&self, owner: EntityRef, owner_position: Vec3, top: f32) -> WorldCollider {
        WorldCollider {
            centroid: self.centroid(owner_position),
            radius: self.radius,
            tag: self.tag,
            owner,
            top,
        }
    }
}

/// A collider resolved to world space for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldCollider {
    pub centroid: Vec3,
    pub radius: f32,
    pub tag: ColliderTag,
    pub owner: EntityRef,
    /// Height of the owning object's top surface
    pub top: f32,
}

/// True iff two spheres overlap (strictly closer than the sum of radii)
#[inline]
pub fn spheres_overlap(a: Vec3, ra: f32, b: Vec3, rb: f32) -> bool {
    let reach = ra + rb;
    (a - b).length_squared() < reach * reach
}

/// Overlap test between two world colliders. Symmetric.
#[inline]
pub fn test(a: &WorldCollider, b: &WorldCollider) -> bool {
    spheres_overlap(a.centroid, a.radius, b.centroid, b.radius)
}

/// Result of a sphere-sphere contact query
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Unit normal pointing from the obstacle toward the querying sphere
    pub normal: Vec3,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec3::ZERO,
            penetration: 0.0,
        }
    }
}

/// Contact between a querying sphere `a` and an obstacle sphere `b`
///
/// Coincident centers have no defined direction; they resolve upward.
pub fn sphere_contact(a: Vec3, ra: f32, b: Vec3, rb: f32) -> CollisionResult {
    if !spheres_overlap(a, ra, b, rb) {
        return CollisionResult::miss();
    }

    let delta = a - b;
    let dist = delta.length();
    let normal = if dist > f32::EPSILON {
        delta / dist
    } else {
        Vec3::Z
    };

    CollisionResult {
        hit: true,
        normal,
        penetration: ra + rb - dist,
    }
}

/// Like [`sphere_contact`], but resolved in the horizontal plane only.
///
/// The penetration is the horizontal distance that separates the spheres
/// at their current heights. Centers stacked vertically have no horizontal
/// direction and fall back to the full 3D contact.
pub fn lateral_contact(a: Vec3, ra: f32, b: Vec3, rb: f32) -> CollisionResult {
    if !spheres_overlap(a, ra, b, rb) {
        return CollisionResult::miss();
    }

    let delta = a - b;
    let lat = delta.truncate();
    let dist = lat.length();
    if dist <= f32::EPSILON {
        return sphere_contact(a, ra, b, rb);
    }

    let reach = ra + rb;
    let needed = (reach * reach - delta.z * delta.z).max(0.0).sqrt();
    CollisionResult {
        hit: true,
        normal: (lat / dist).extend(0.0),
        penetration: needed - dist,
    }
}

/// All colliders in the world as of the start of the tick
#[derive(Debug, Clone, Default)]
pub struct ColliderSnapshot {
    colliders: Vec<WorldCollider>,
}

impl ColliderSnapshot {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            colliders: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, collider: WorldCollider) {
        self.colliders.push(collider);
    }

    pub fn extend(&mut self, colliders: impl IntoIterator<Item = WorldCollider>) {
        self.colliders.extend(colliders);
    }

    pub fn clear(&mut self) {
        self.colliders.clear();
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldCollider> {
        self.colliders.iter()
    }

    /// Colliders overlapping the given sphere
    pub fn overlapping(&self, center: Vec3, radius: f32) -> impl Iterator<Item = &WorldCollider> {
        self.colliders
            .iter()
            .filter(move |c| spheres_overlap(center, radius, c.centroid, c.radius))
    }

    /// Whether any collider with a matching tag overlaps the sphere
    pub fn any_overlap(&self, center: Vec3, radius: f32, tag: impl Fn(ColliderTag) -> bool) -> bool {
        self.overlapping(center, radius).any(|c| tag(c.tag))
    }
}

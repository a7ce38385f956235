//! Minimal geometry for ACL domains.

use serde::{Deserialize, Serialize};

/// A point in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3(pub f64, pub f64, pub f64);

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(x, y, z)
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3(self.0 + other.0, self.1 + other.1, self.2 + other.2)
    }
}

/// Axis-aligned box, `min` inclusive and `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box anchored at `position` extending by `size`.
    pub fn from_position_size(position: Vec3, size: Vec3) -> Self {
        Self::new(position, position.add(size))
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.0 >= self.min.0
            && p.0 < self.max.0
            && p.1 >= self.min.1
            && p.1 < self.max.1
            && p.2 >= self.min.2
            && p.2 < self.max.2
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.0 < other.max.0
            && other.min.0 < self.max.0
            && self.min.1 < other.max.1
            && other.min.1 < self.max.1
            && self.min.2 < other.max.2
            && other.min.2 < self.max.2
    }
}

/// The region of the world an access check applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AclDomain {
    Point { point: Vec3 },
    Points { points: Vec<Vec3> },
    Aabb { aabb: Aabb },
}

impl AclDomain {
    pub fn point(point: Vec3) -> Self {
        AclDomain::Point { point }
    }

    pub fn points(points: Vec<Vec3>) -> Self {
        AclDomain::Points { points }
    }

    pub fn aabb(aabb: Aabb) -> Self {
        AclDomain::Aabb { aabb }
    }

    /// Returns true if a box overlaps any part of this domain.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        match self {
            AclDomain::Point { point } => other.contains(*point),
            AclDomain::Points { points } => points.iter().any(|p| other.contains(*p)),
            AclDomain::Aabb { aabb } => aabb.intersects(other),
        }
    }

    /// Returns true if every point lies inside this domain.
    pub fn contains_points(&self, points: &[Vec3]) -> bool {
        match self {
            AclDomain::Point { point } => points.len() == 1 && points[0] == *point,
            AclDomain::Points { points: domain } => points.iter().all(|p| domain.contains(p)),
            AclDomain::Aabb { aabb } => points.iter().all(|p| aabb.contains(*p)),
        }
    }
}

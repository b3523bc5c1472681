//! Surface interface consumed by region evaluation.
//!
//! The region kernel is agnostic about surface families. It needs exactly
//! two operations: a sense test (which half-space is this point in?) and
//! a ray distance. Production surface libraries implement [`Surface`];
//! [`XPlane`] and [`Sphere`] are built-in reference implementations used
//! by the tests, benches and doc examples.

use glam::DVec3;
use indexmap::IndexMap;

use crate::constants::{FP_COINCIDENT, INFTY};
use crate::error::GeometryError;

/// An oriented surface dividing space into a positive and a negative
/// half-space.
pub trait Surface: Send + Sync {
    /// User-facing surface id (nonzero).
    fn id(&self) -> i32;

    /// True when `r` lies in the positive half-space. For points
    /// numerically on the surface, the travel direction `u` breaks the
    /// tie: the particle is placed on the side it is moving into.
    fn sense(&self, r: DVec3, u: DVec3) -> bool;

    /// Distance along `u` from `r` to the surface, or [`INFTY`] when the
    /// ray never crosses it. `coincident` marks a particle known to sit
    /// on this surface, whose current crossing must not be re-reported.
    fn distance(&self, r: DVec3, u: DVec3, coincident: bool) -> f64;
}

/// Registry of surfaces in insertion order with user-id lookup.
#[derive(Default)]
pub struct SurfaceTable {
    surfaces: IndexMap<i32, Box<dyn Surface>>,
}

impl SurfaceTable {
    pub fn new() -> SurfaceTable {
        SurfaceTable::default()
    }

    /// Register a surface under its user id. Ids must be nonzero and
    /// unique.
    pub fn add(&mut self, surface: Box<dyn Surface>) -> Result<usize, GeometryError> {
        let id = surface.id();
        if id == 0 {
            return Err(GeometryError::InvalidSurfaceId);
        }
        if self.surfaces.contains_key(&id) {
            return Err(GeometryError::DuplicateSurfaceId(id));
        }
        let index = self.surfaces.len();
        self.surfaces.insert(id, surface);
        Ok(index)
    }

    /// Dense index of the surface with the given user id.
    pub fn index_of(&self, id: i32) -> Option<usize> {
        self.surfaces.get_index_of(&id)
    }

    /// Surface at a dense index. Bound region operands are always valid
    /// indices, so this panics only on indices from outside the binder.
    pub fn get(&self, index: usize) -> &dyn Surface {
        &*self.surfaces[index]
    }

    /// User id of the surface at a dense index.
    pub fn id_of(&self, index: usize) -> Option<i32> {
        self.surfaces.get_index(index).map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

/// Plane perpendicular to the x axis: x = x0. Positive half-space is
/// x > x0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XPlane {
    id: i32,
    x0: f64,
}

impl XPlane {
    pub fn new(id: i32, x0: f64) -> XPlane {
        XPlane { id, x0 }
    }
}

impl Surface for XPlane {
    fn id(&self) -> i32 {
        self.id
    }

    fn sense(&self, r: DVec3, u: DVec3) -> bool {
        let f = r.x - self.x0;
        if f.abs() < FP_COINCIDENT {
            u.x > 0.0
        } else {
            f > 0.0
        }
    }

    fn distance(&self, r: DVec3, u: DVec3, coincident: bool) -> f64 {
        let f = self.x0 - r.x;
        if coincident || f.abs() < FP_COINCIDENT || u.x == 0.0 {
            return INFTY;
        }
        let d = f / u.x;
        if d < 0.0 {
            INFTY
        } else {
            d
        }
    }
}

/// Sphere of a given center and radius. Positive half-space is the
/// outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    id: i32,
    center: DVec3,
    radius: f64,
}

impl Sphere {
    pub fn new(id: i32, center: DVec3, radius: f64) -> Sphere {
        Sphere { id, center, radius }
    }
}

impl Surface for Sphere {
    fn id(&self) -> i32 {
        self.id
    }

    fn sense(&self, r: DVec3, u: DVec3) -> bool {
        let oc = r - self.center;
        let f = oc.length_squared() - self.radius * self.radius;
        if f.abs() < FP_COINCIDENT {
            oc.dot(u) > 0.0
        } else {
            f > 0.0
        }
    }

    fn distance(&self, r: DVec3, u: DVec3, coincident: bool) -> f64 {
        let oc = r - self.center;
        let b = oc.dot(u);
        let c = oc.length_squared() - self.radius * self.radius;
        if coincident || c.abs() < FP_COINCIDENT {
            // On the surface: the only crossing ahead is the far side.
            return if b >= 0.0 {
                INFTY
            } else {
                -b + (b * b - c).max(0.0).sqrt()
            };
        }
        let disc = b * b - c;
        if disc < 0.0 {
            return INFTY;
        }
        let sqrt_disc = disc.sqrt();
        if c < 0.0 {
            // Inside: exit through the far intersection.
            -b + sqrt_disc
        } else {
            // Outside: the near intersection, if it lies ahead.
            let d = -b - sqrt_disc;
            if d < 0.0 {
                INFTY
            } else {
                d
            }
        }
    }
}

//! Region-expression geometry kernel for Monte Carlo particle transport.
//!
//! A cell's extent is a boolean *region* over oriented half-spaces,
//! written with signed surface ids: `"1 -2"` is the intersection of the
//! positive side of surface 1 with the negative side of surface 2, `|`
//! is union, `~` complement, and parentheses group. Regions compile once
//! (tokenize, bind ids to dense surface indices, translate to postfix),
//! and the transport loop then asks two questions per step, billions of
//! times per run:
//!
//! - **containment**: is this position, moving this way, inside cell C?
//! - **boundary distance**: how far to C's nearest bounding surface, and
//!   which surface is it?
//!
//! Pure intersections of half-spaces (the overwhelmingly common case)
//! take a fast scan that never touches a stack; everything else runs on
//! a small boolean stack machine. Both honor the *on-surface override*:
//! a particle known to sit exactly on an oriented surface bypasses that
//! surface's numerical sense test, which is the only coincidence
//! handling in the kernel.
//!
//! Construction is single-threaded; after that, cells and tables are
//! immutable and the query surface is freely shared across threads.
//!
//! # Example
//!
//! ```
//! use glam::DVec3;
//! use regio_core::{CellConfig, Geometry, MaterialEntry, Sphere, XPlane};
//!
//! let mut geometry = Geometry::new();
//! geometry.surfaces.add(Box::new(XPlane::new(1, -1.0)))?;
//! geometry.surfaces.add(Box::new(Sphere::new(2, DVec3::ZERO, 2.0)))?;
//! geometry.add_material(10)?;
//!
//! // Right of the plane and inside the sphere.
//! let index = geometry.add_cell(CellConfig {
//!     id: Some(1),
//!     material: Some(vec![MaterialEntry::Id(10)]),
//!     region: "1 -2".to_string(),
//!     ..CellConfig::default()
//! })?;
//!
//! let cell = &geometry.cells()[index];
//! let r = DVec3::new(0.5, 0.0, 0.0);
//! let u = DVec3::X;
//! assert!(cell.contains(&geometry.surfaces, r, u, 0));
//!
//! let boundary = cell.distance(&geometry.surfaces, r, u, 0);
//! assert!((boundary.distance - 1.5).abs() < 1e-12);
//! assert_eq!(boundary.surface, 2); // leaving through the sphere
//! # Ok::<(), regio_core::GeometryError>(())
//! ```

pub mod cell;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod region;
pub mod rpn;
pub mod surface;
pub mod token;
pub mod tokenize;

pub use cell::{Cell, CellConfig, Fill, FillKind, MaterialEntry, MaterialRef, Rotation};
pub use error::{AdminError, GeometryError};
pub use geometry::{FillSpec, Geometry, Universe};
pub use region::{Boundary, Region};
pub use surface::{Sphere, Surface, SurfaceTable, XPlane};
pub use token::{Operator, Token};
pub use tokenize::tokenize;

//! Compiled region expressions and their evaluation.
//!
//! A region is a boolean combination of oriented half-spaces. It is
//! compiled once (tokenize, bind surface ids to dense indices, translate
//! to postfix) and then queried read-only from any number of threads.
//! Containment picks one of two evaluators: a fast scan for pure
//! intersections and a general stack machine for everything else.

use glam::DVec3;

use crate::constants::{FP_PRECISION, INFTY, SURFACE_NONE};
use crate::error::GeometryError;
use crate::rpn::generate_rpn;
use crate::surface::SurfaceTable;
use crate::token::{Operator, Token};
use crate::tokenize::tokenize;

/// Result of a boundary search: the distance to the nearest surface of a
/// region and a signed reference to it. The sign of `surface` encodes the
/// orientation being exited (the negation of the crossed operand).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub distance: f64,
    pub surface: i32,
}

impl Boundary {
    /// No bounded crossing along the ray.
    pub const NONE: Boundary = Boundary {
        distance: INFTY,
        surface: SURFACE_NONE,
    };
}

/// A compiled region expression.
///
/// Both token forms hold *bound* surface references: the magnitude is a
/// dense surface-table index plus one, the sign the orientation. The +1
/// offset keeps zero out of the operand space so negation stays meaningful
/// and so `on_surface == 0` can mean "not on any surface".
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Infix form, kept for round-trip serialization.
    infix: Vec<Token>,
    /// Postfix form consumed by the evaluators.
    rpn: Vec<Token>,
    /// True when the postfix is a pure intersection of half-spaces.
    simple: bool,
}

impl Region {
    /// Compile a region specification against the surface table.
    ///
    /// The empty (or all-whitespace) specification compiles to the
    /// unconstrained region, which contains every point. Errors name the
    /// owning cell.
    pub fn from_spec(
        cell_id: i32,
        spec: &str,
        surfaces: &SurfaceTable,
    ) -> Result<Region, GeometryError> {
        let mut infix = tokenize(cell_id, spec)?;
        bind_surfaces(cell_id, &mut infix, surfaces)?;
        let rpn = generate_rpn(cell_id, &infix)?;
        let simple = !rpn
            .iter()
            .any(|t| matches!(t, Token::Op(Operator::Union | Operator::Complement)));
        Ok(Region { infix, rpn, simple })
    }

    /// True when the region is a pure intersection of half-spaces (no
    /// union, no complement), eligible for the fast containment scan.
    pub fn is_simple(&self) -> bool {
        self.simple
    }

    /// True when no region was specified: the cell is everywhere.
    pub fn is_empty(&self) -> bool {
        self.rpn.is_empty()
    }

    /// The bound postfix form.
    pub fn postfix(&self) -> &[Token] {
        &self.rpn
    }

    /// Containment test honoring the on-surface override.
    ///
    /// `on_surface` is a signed bound surface reference the particle is
    /// known to sit on, with zero meaning "not on any surface". For that
    /// one surface the override decides the half-space in either
    /// orientation; every other operand consults the surface's own sense
    /// test. This override is the only coincidence handling performed
    /// here: the surface library is otherwise trusted.
    pub fn contains(&self, surfaces: &SurfaceTable, r: DVec3, u: DVec3, on_surface: i32) -> bool {
        if self.simple {
            self.contains_simple(surfaces, r, u, on_surface)
        } else {
            self.contains_complex(surfaces, r, u, on_surface)
        }
    }

    /// Fast path: every operand must be satisfied, operators are all
    /// intersections and can be skipped.
    fn contains_simple(&self, surfaces: &SurfaceTable, r: DVec3, u: DVec3, on_surface: i32) -> bool {
        for token in &self.rpn {
            if let Token::Surface(s) = token {
                if !operand_decision(surfaces, *s, r, u, on_surface) {
                    return false;
                }
            }
        }
        true
    }

    /// General path: evaluate the postfix with a boolean stack. The
    /// postfix length bounds the stack depth.
    fn contains_complex(&self, surfaces: &SurfaceTable, r: DVec3, u: DVec3, on_surface: i32) -> bool {
        let mut stack = vec![false; self.rpn.len()];
        let mut top: usize = 0;

        for token in &self.rpn {
            match token {
                Token::Surface(s) => {
                    stack[top] = operand_decision(surfaces, *s, r, u, on_surface);
                    top += 1;
                }
                Token::Op(Operator::Complement) => stack[top - 1] = !stack[top - 1],
                Token::Op(Operator::Union) => {
                    stack[top - 2] = stack[top - 2] || stack[top - 1];
                    top -= 1;
                }
                Token::Op(Operator::Intersection) => {
                    stack[top - 2] = stack[top - 2] && stack[top - 1];
                    top -= 1;
                }
                // Parentheses never survive compilation.
                Token::Op(_) => {}
            }
        }

        if top == 0 {
            // No region specified: the cell is everywhere.
            true
        } else {
            stack[top - 1]
        }
    }

    /// Distance to the nearest surface of the region along `u`.
    ///
    /// Every operand in the postfix is a candidate; operators are
    /// skipped. A shorter candidate displaces the running minimum only
    /// when it is shorter by more than the relative tolerance
    /// `FP_PRECISION`: among numerically indistinguishable distances the
    /// operand seen first in postfix order wins, keeping the selected
    /// surface stable for downstream ray tracing.
    pub fn distance(&self, surfaces: &SurfaceTable, r: DVec3, u: DVec3, on_surface: i32) -> Boundary {
        let mut min = Boundary::NONE;
        for token in &self.rpn {
            if let Token::Surface(s) = token {
                let coincident = *s == on_surface;
                let d = surfaces
                    .get(s.unsigned_abs() as usize - 1)
                    .distance(r, u, coincident);
                if d < min.distance && (d - min.distance).abs() / min.distance >= FP_PRECISION {
                    min = Boundary {
                        distance: d,
                        surface: -*s,
                    };
                }
            }
        }
        min
    }

    /// Reconstruct the user-facing specification from the bound infix
    /// form. Intersection is implicit in the written grammar and is
    /// elided; dense indices are mapped back to user surface ids.
    pub fn to_spec(&self, surfaces: &SurfaceTable) -> String {
        let mut out = String::new();
        for token in &self.infix {
            let piece = match token {
                Token::Op(Operator::Intersection) => continue,
                Token::Op(Operator::LeftParen) => "(".to_string(),
                Token::Op(Operator::RightParen) => ")".to_string(),
                Token::Op(Operator::Complement) => "~".to_string(),
                Token::Op(Operator::Union) => "|".to_string(),
                Token::Surface(s) => {
                    let id = surfaces.id_of(s.unsigned_abs() as usize - 1).unwrap_or(0);
                    if *s < 0 { -id } else { id }.to_string()
                }
            };
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&piece);
        }
        out
    }
}

/// Decision for one oriented half-space: the on-surface override wins in
/// either orientation, otherwise the surface's sense test decides.
fn operand_decision(surfaces: &SurfaceTable, token: i32, r: DVec3, u: DVec3, on_surface: i32) -> bool {
    if token == on_surface {
        true
    } else if -token == on_surface {
        false
    } else {
        let sense = surfaces.get(token.unsigned_abs() as usize - 1).sense(r, u);
        sense == (token > 0)
    }
}

/// Rewrite user surface ids into dense indices, preserving orientation:
/// `r := sign(r) * (index_of(|r|) + 1)`. References to ids absent from
/// the table (including the illegal id zero) fail construction.
fn bind_surfaces(
    cell_id: i32,
    tokens: &mut [Token],
    surfaces: &SurfaceTable,
) -> Result<(), GeometryError> {
    for token in tokens {
        if let Token::Surface(r) = token {
            let index = r
                .checked_abs()
                .and_then(|id| surfaces.index_of(id))
                .ok_or(GeometryError::UnknownSurface {
                    cell: cell_id,
                    surface: *r,
                })?;
            let bound = index as i32 + 1;
            *r = if *r < 0 { -bound } else { bound };
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::XPlane;

    /// Planes at x = 1, 2, 3 with user ids 10, 20, 30, so bound indices
    /// differ visibly from user ids.
    fn planes() -> SurfaceTable {
        let mut table = SurfaceTable::new();
        table.add(Box::new(XPlane::new(10, 1.0))).unwrap();
        table.add(Box::new(XPlane::new(20, 2.0))).unwrap();
        table.add(Box::new(XPlane::new(30, 3.0))).unwrap();
        table
    }

    fn surf(r: i32) -> Token {
        Token::Surface(r)
    }

    fn op(o: Operator) -> Token {
        Token::Op(o)
    }

    #[test]
    fn test_binding_rewrites_ids_and_keeps_sign() {
        let table = planes();
        let region = Region::from_spec(1, "10 -30", &table).unwrap();
        assert_eq!(
            region.postfix(),
            &[surf(1), surf(-3), op(Operator::Intersection)]
        );
    }

    #[test]
    fn test_unknown_surface_fails() {
        let table = planes();
        let err = Region::from_spec(5, "10 -99", &table).unwrap_err();
        assert_eq!(
            err,
            GeometryError::UnknownSurface {
                cell: 5,
                surface: -99
            }
        );
    }

    #[test]
    fn test_zero_is_never_a_surface() {
        let table = planes();
        let err = Region::from_spec(5, "0", &table).unwrap_err();
        assert_eq!(
            err,
            GeometryError::UnknownSurface {
                cell: 5,
                surface: 0
            }
        );
    }

    #[test]
    fn test_simple_flag() {
        let table = planes();
        assert!(Region::from_spec(1, "10 -20 30", &table).unwrap().is_simple());
        assert!(Region::from_spec(1, "(10 -20) 30", &table).unwrap().is_simple());
        assert!(!Region::from_spec(1, "10 | 20", &table).unwrap().is_simple());
        assert!(!Region::from_spec(1, "~10", &table).unwrap().is_simple());
        assert!(Region::from_spec(1, "", &table).unwrap().is_simple());
    }

    #[test]
    fn test_contains_intersection() {
        let table = planes();
        // Between the planes at x = 1 and x = 2.
        let region = Region::from_spec(1, "10 -20", &table).unwrap();
        let u = DVec3::X;
        assert!(region.contains(&table, DVec3::new(1.5, 0.0, 0.0), u, 0));
        assert!(!region.contains(&table, DVec3::new(0.5, 0.0, 0.0), u, 0));
        assert!(!region.contains(&table, DVec3::new(2.5, 0.0, 0.0), u, 0));
    }

    #[test]
    fn test_contains_union_and_complement() {
        let table = planes();
        // Left of plane 10 or right of plane 30.
        let region = Region::from_spec(1, "-10 | 30", &table).unwrap();
        let u = DVec3::X;
        assert!(region.contains(&table, DVec3::new(0.0, 0.0, 0.0), u, 0));
        assert!(region.contains(&table, DVec3::new(4.0, 0.0, 0.0), u, 0));
        assert!(!region.contains(&table, DVec3::new(2.0, 0.0, 0.0), u, 0));

        // The complement is the slab between them.
        let slab = Region::from_spec(1, "~(-10 | 30)", &table).unwrap();
        assert!(!slab.contains(&table, DVec3::new(0.0, 0.0, 0.0), u, 0));
        assert!(slab.contains(&table, DVec3::new(2.0, 0.0, 0.0), u, 0));
    }

    #[test]
    fn test_double_complement_cancels() {
        let table = planes();
        let plain = Region::from_spec(1, "10", &table).unwrap();
        let doubled = Region::from_spec(1, "~ ~ 10", &table).unwrap();
        let u = DVec3::X;
        for x in [0.0, 0.5, 1.5, 2.5, 4.0] {
            let r = DVec3::new(x, 0.0, 0.0);
            assert_eq!(plain.contains(&table, r, u, 0), doubled.contains(&table, r, u, 0));
        }
    }

    #[test]
    fn test_empty_region_contains_everything() {
        let table = planes();
        let region = Region::from_spec(1, "", &table).unwrap();
        assert!(region.is_empty());
        assert!(region.contains(&table, DVec3::new(-1e30, 0.0, 0.0), DVec3::X, 0));
        assert_eq!(region.distance(&table, DVec3::ZERO, DVec3::X, 0), Boundary::NONE);
    }

    #[test]
    fn test_on_surface_override() {
        let table = planes();
        let region = Region::from_spec(1, "10", &table).unwrap();
        // Point well inside the negative half-space of surface 10
        // (bound reference +1): the override still claims containment.
        let r = DVec3::new(0.0, 0.0, 0.0);
        let u = DVec3::X;
        assert!(!region.contains(&table, r, u, 0));
        assert!(region.contains(&table, r, u, 1));
        // Opposite orientation forces "outside" even where sense agrees.
        let inside = DVec3::new(5.0, 0.0, 0.0);
        assert!(region.contains(&table, inside, u, 0));
        assert!(!region.contains(&table, inside, u, -1));
    }

    #[test]
    fn test_distance_takes_nearest_operand() {
        let table = planes();
        let region = Region::from_spec(1, "10 -20 -30", &table).unwrap();
        let boundary = region.distance(&table, DVec3::new(1.5, 0.0, 0.0), DVec3::X, 0);
        // Nearest ahead is the plane at x = 2, bound reference -2.
        assert!((boundary.distance - 0.5).abs() < 1e-12);
        assert_eq!(boundary.surface, 2);
    }

    #[test]
    fn test_distance_ignores_coincident_surface() {
        let table = planes();
        let region = Region::from_spec(1, "10 -20", &table).unwrap();
        // Sitting on the plane at x = 2 (bound reference -2, exiting):
        // its own crossing is suppressed, leaving no surface ahead.
        let boundary = region.distance(&table, DVec3::new(2.0, 0.0, 0.0), DVec3::X, -2);
        assert_eq!(boundary, Boundary::NONE);
    }

    #[test]
    fn test_spec_round_trip() {
        let table = planes();
        for spec in ["10 -20 30", "(10 20) | -30", "~(10 | 20)", ""] {
            let region = Region::from_spec(1, spec, &table).unwrap();
            let written = region.to_spec(&table);
            let reparsed = Region::from_spec(1, &written, &table).unwrap();
            assert_eq!(region.postfix(), reparsed.postfix(), "spec {spec:?} -> {written:?}");
        }
    }
}

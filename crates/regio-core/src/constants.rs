//! Process-wide numeric policy for the geometry kernel.

/// Relative tolerance used when comparing candidate boundary distances.
///
/// Two distances within this relative spread are treated as the same
/// crossing; the candidate seen first keeps the minimum.
pub const FP_PRECISION: f64 = 1e-14;

/// Absolute tolerance below which a surface equation evaluates to "on the
/// surface" and the travel direction breaks the tie.
pub const FP_COINCIDENT: f64 = 1e-12;

/// Boltzmann constant in MeV/K. Cell temperatures are stored as
/// sqrt(k*T) so the transport core never takes a square root per lookup.
pub const K_BOLTZMANN: f64 = 8.617_330_3e-11;

/// Distance reported when a ray never crosses a surface.
///
/// The largest finite f64 rather than IEEE infinity: the relative
/// comparison in the boundary search must stay well-defined when the
/// running minimum is still the initial value.
pub const INFTY: f64 = f64::MAX;

/// Surface index reported when no boundary is crossed.
pub const SURFACE_NONE: i32 = i32::MAX;

/// Material entry denoting a void region at the administrative and
/// serialization boundaries. Inside the crate void is a tagged variant;
/// the sentinel exists only where lists of plain integers are exchanged.
pub const MATERIAL_VOID: i32 = -1;

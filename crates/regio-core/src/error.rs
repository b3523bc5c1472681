//! Error types for geometry construction and the administrative API.

use thiserror::Error;

/// Fatal errors raised while building a geometry.
///
/// Any of these leaves the geometry unusable; loading halts. Messages
/// name the offending cell wherever one exists.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// Cell description without an id.
    #[error("must specify an id for every cell in the geometry")]
    MissingId,

    /// Neither a material nor a fill was given.
    #[error("neither material nor fill was specified for cell {0}")]
    MissingFillOrMaterial(i32),

    /// Both a material and a fill were given.
    #[error("cell {0} has both a material and a fill specified; only one can be specified per cell")]
    ConflictingFillAndMaterial(i32),

    /// A material list with zero entries.
    #[error("an empty material list was specified for cell {0}")]
    EmptyMaterial(i32),

    /// Temperatures are only meaningful on material-filled cells.
    #[error("cell {0} was specified with a temperature but no material; temperature specification is only valid for cells filled with a material")]
    TemperatureWithoutMaterial(i32),

    /// Temperatures must be non-negative.
    #[error("cell {0} was specified with a negative temperature")]
    NegativeTemperature(i32),

    /// Temperature and material lists must have matching lengths.
    #[error("cell {0} was specified with a temperature list whose length does not match its material list")]
    TemperatureArity(i32),

    /// Translation and rotation vectors must have three components.
    #[error("non-3D {what} vector applied to cell {cell}")]
    BadVectorArity { cell: i32, what: &'static str },

    /// Translation/rotation require a universe or lattice fill.
    #[error("cannot apply a {what} to cell {cell} because it is not filled with another universe")]
    TransformOnMaterialCell { cell: i32, what: &'static str },

    /// The region specification contains a character outside the grammar.
    #[error("region specification for cell {cell} contains an invalid character, \"{character}\"")]
    InvalidCharacter { cell: i32, character: char },

    /// Unbalanced parentheses in the region specification.
    #[error("mismatched parentheses in region specification for cell {0}")]
    MismatchedParentheses(i32),

    /// The region references a surface id absent from the surface table.
    #[error("region specification for cell {cell} references undefined surface {surface}")]
    UnknownSurface { cell: i32, surface: i32 },

    /// The region compiles but does not reduce to a single expression
    /// (for example `"1 |"` or `"()"`).
    #[error("region specification for cell {0} does not reduce to a single expression")]
    MalformedRegion(i32),

    /// A material entry that is neither an id in the material table nor
    /// the literal "void".
    #[error("unknown material \"{material}\" specified for cell {cell}")]
    UnknownMaterial { cell: i32, material: String },

    /// User-facing cell ids must be unique.
    #[error("two or more cells use id {0}")]
    DuplicateCellId(i32),

    /// User-facing surface ids must be unique.
    #[error("two or more surfaces use id {0}")]
    DuplicateSurfaceId(i32),

    /// Zero can never name a surface; its sign would be meaningless.
    #[error("surface id must be a nonzero integer")]
    InvalidSurfaceId,

    /// User-facing material ids must be unique.
    #[error("two or more materials use id {0}")]
    DuplicateMaterialId(i32),

    /// A geometry with no cells at all cannot transport anything.
    #[error("no cells found in the geometry description")]
    NoCells,
}

/// Recoverable errors returned by the administrative API.
///
/// Administrative operations never partially modify a cell: on error the
/// cell is exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdminError {
    /// Cell index outside 1..=n_cells.
    #[error("index {0} in cells array is out of bounds")]
    CellIndexOutOfBounds(i32),

    /// Material index outside 1..=n_materials (and not the void marker).
    #[error("index {0} in materials array is out of bounds")]
    MaterialIndexOutOfBounds(i32),

    /// Distributed-cell instance outside the cell's temperature list.
    #[error("distribcell instance {0} is out of bounds")]
    InstanceOutOfBounds(usize),

    /// Stored temperatures are sqrt(k*T); a negative input has no
    /// representation.
    #[error("cell temperature must be non-negative, got {0}")]
    NegativeTemperature(f64),
}

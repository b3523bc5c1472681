//! Cells: compiled descriptions of regions of space and what fills them.

use glam::{DMat3, DVec3};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::constants::K_BOLTZMANN;
use crate::error::GeometryError;
use crate::region::{Boundary, Region};
use crate::surface::SurfaceTable;

/// Fill kind discriminant, as exchanged across the administrative
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillKind {
    Material,
    Universe,
    Lattice,
}

/// One entry of a material-filled cell's material list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialRef {
    /// Void region: particles stream through without colliding.
    Void,
    /// Dense index into the material table.
    Material(usize),
}

/// What a cell is filled with.
///
/// Exactly one of material or fill target is specified at construction.
/// Universe and lattice targets are stored as user ids; resolving them to
/// table indices is the geometry linking pass's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fill {
    /// One material, or several distributed across instances.
    Material(Vec<MaterialRef>),
    /// Filled with the named universe.
    Universe(i32),
    /// Filled with the named lattice.
    Lattice(i32),
}

impl Fill {
    pub fn kind(&self) -> FillKind {
        match self {
            Fill::Material(_) => FillKind::Material,
            Fill::Universe(_) => FillKind::Universe,
            Fill::Lattice(_) => FillKind::Lattice,
        }
    }
}

/// Material list entry as written in the problem definition: a material
/// id, or the literal `"void"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialEntry {
    Id(i32),
    Keyword(String),
}

impl From<i32> for MaterialEntry {
    fn from(id: i32) -> MaterialEntry {
        MaterialEntry::Id(id)
    }
}

/// Rotation of a fill universe's coordinate frame: the three input Euler
/// angles and the matrix they produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Rotation {
    /// Input angles in degrees (phi, theta, psi).
    pub angles: [f64; 3],
    /// Matrix applied to coordinates entering the fill.
    pub matrix: DMat3,
}

impl Rotation {
    /// Compose the inverse of an extrinsic Z-Y-X Euler rotation from the
    /// negated input angles.
    pub fn from_degrees(angles: [f64; 3]) -> Rotation {
        let phi = -angles[0].to_radians();
        let theta = -angles[1].to_radians();
        let psi = -angles[2].to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_psi, cos_psi) = psi.sin_cos();

        let row_x = DVec3::new(
            cos_theta * cos_psi,
            -cos_phi * sin_psi + sin_phi * sin_theta * cos_psi,
            sin_phi * sin_psi + cos_phi * sin_theta * cos_psi,
        );
        let row_y = DVec3::new(
            cos_theta * sin_psi,
            cos_phi * cos_psi + sin_phi * sin_theta * sin_psi,
            -sin_phi * cos_psi + cos_phi * sin_theta * sin_psi,
        );
        let row_z = DVec3::new(-sin_theta, sin_phi * cos_theta, cos_phi * cos_theta);

        Rotation {
            angles,
            matrix: DMat3::from_cols(row_x, row_y, row_z).transpose(),
        }
    }

    /// Matrix entries in row-major order, the layout used on file.
    pub fn to_row_major(&self) -> [f64; 9] {
        self.matrix.transpose().to_cols_array()
    }
}

/// Plain-data description of one cell as supplied by the problem
/// definition. Every field except `id` is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    /// Unique user-facing cell id. Required.
    pub id: Option<i32>,
    /// Free-text name.
    pub name: String,
    /// Id of the universe this cell belongs to (0 when omitted).
    pub universe: i32,
    /// Id of the universe or lattice filling this cell. Mutually
    /// exclusive with `material`.
    pub fill: Option<i32>,
    /// Materials filling this cell; more than one entry distributes
    /// materials across instances.
    pub material: Option<Vec<MaterialEntry>>,
    /// Temperatures in Kelvin, one per material entry.
    pub temperature: Option<Vec<f64>>,
    /// Region specification over signed surface ids.
    pub region: String,
    /// Translation of the fill universe. Requires `fill`.
    pub translation: Option<Vec<f64>>,
    /// Euler angles in degrees (phi, theta, psi). Requires `fill`.
    pub rotation: Option<Vec<f64>>,
}

/// The compiled description of one region of space.
#[derive(Debug, Clone)]
pub struct Cell {
    /// User-facing cell id, unique across the geometry.
    pub id: i32,
    /// Free-text name.
    pub name: String,
    /// User id of the universe this cell belongs to.
    pub universe_id: i32,
    /// What the cell is filled with.
    pub fill: Fill,
    /// Per-instance temperatures stored as sqrt(k*T).
    pub sqrt_kt: Vec<f64>,
    /// Translation of the fill universe's coordinate frame.
    pub translation: Option<DVec3>,
    /// Rotation of the fill universe's coordinate frame.
    pub rotation: Option<Rotation>,
    /// Compiled region expression.
    pub region: Region,
    /// Instance count, populated by the distribcell mapping pass.
    pub n_instances: i32,
    /// Index in the distribcell arrays, populated externally.
    pub distribcell_index: i32,
    /// Per-map instance offsets, populated externally.
    pub offset: Vec<i32>,
}

impl Cell {
    /// Validate a cell description and compile its region.
    ///
    /// `materials` is the set of registered material user ids, in
    /// registration order; material references are rewritten to dense
    /// indices here.
    pub fn from_config(
        config: CellConfig,
        surfaces: &SurfaceTable,
        materials: &IndexSet<i32>,
    ) -> Result<Cell, GeometryError> {
        let id = config.id.ok_or(GeometryError::MissingId)?;

        // Exactly one of material or fill.
        match (&config.fill, &config.material) {
            (None, None) => return Err(GeometryError::MissingFillOrMaterial(id)),
            (Some(_), Some(_)) => return Err(GeometryError::ConflictingFillAndMaterial(id)),
            _ => {}
        }

        let fill = if let Some(target) = config.fill {
            // Whether the target is really a lattice is decided by the
            // linking pass or the administrative API.
            Fill::Universe(target)
        } else {
            let entries = config.material.unwrap_or_default();
            if entries.is_empty() {
                return Err(GeometryError::EmptyMaterial(id));
            }
            let mut list = Vec::with_capacity(entries.len());
            for entry in &entries {
                list.push(resolve_material(id, entry, materials)?);
            }
            Fill::Material(list)
        };

        // Temperatures are only valid on material cells, must be
        // non-negative, and must pair up with the material list. They
        // are stored as sqrt(k*T).
        let mut sqrt_kt = Vec::new();
        if let Some(temperatures) = config.temperature {
            let n_materials = match &fill {
                Fill::Material(list) => list.len(),
                _ => return Err(GeometryError::TemperatureWithoutMaterial(id)),
            };
            if temperatures.iter().any(|&t| t < 0.0) {
                return Err(GeometryError::NegativeTemperature(id));
            }
            if temperatures.len() != n_materials {
                return Err(GeometryError::TemperatureArity(id));
            }
            sqrt_kt = temperatures
                .iter()
                .map(|&t| (K_BOLTZMANN * t).sqrt())
                .collect();
        }

        let region = Region::from_spec(id, &config.region, surfaces)?;

        let translation = match config.translation {
            Some(xyz) => {
                if fill.kind() == FillKind::Material {
                    return Err(GeometryError::TransformOnMaterialCell {
                        cell: id,
                        what: "translation",
                    });
                }
                if xyz.len() != 3 {
                    return Err(GeometryError::BadVectorArity {
                        cell: id,
                        what: "translation",
                    });
                }
                Some(DVec3::new(xyz[0], xyz[1], xyz[2]))
            }
            None => None,
        };

        let rotation = match config.rotation {
            Some(angles) => {
                if fill.kind() == FillKind::Material {
                    return Err(GeometryError::TransformOnMaterialCell {
                        cell: id,
                        what: "rotation",
                    });
                }
                if angles.len() != 3 {
                    return Err(GeometryError::BadVectorArity {
                        cell: id,
                        what: "rotation",
                    });
                }
                Some(Rotation::from_degrees([angles[0], angles[1], angles[2]]))
            }
            None => None,
        };

        Ok(Cell {
            id,
            name: config.name,
            universe_id: config.universe,
            fill,
            sqrt_kt,
            translation,
            rotation,
            region,
            n_instances: 0,
            distribcell_index: 0,
            offset: Vec::new(),
        })
    }

    /// True when the particle at `r` travelling along `u` is inside this
    /// cell's region. See [`Region::contains`] for the `on_surface`
    /// contract.
    pub fn contains(&self, surfaces: &SurfaceTable, r: DVec3, u: DVec3, on_surface: i32) -> bool {
        self.region.contains(surfaces, r, u, on_surface)
    }

    /// Distance to the nearest bounding surface of this cell's region.
    pub fn distance(&self, surfaces: &SurfaceTable, r: DVec3, u: DVec3, on_surface: i32) -> Boundary {
        self.region.distance(surfaces, r, u, on_surface)
    }

    pub fn fill_kind(&self) -> FillKind {
        self.fill.kind()
    }
}

fn resolve_material(
    cell_id: i32,
    entry: &MaterialEntry,
    materials: &IndexSet<i32>,
) -> Result<MaterialRef, GeometryError> {
    match entry {
        MaterialEntry::Keyword(word) if word == "void" => Ok(MaterialRef::Void),
        MaterialEntry::Keyword(word) => Err(GeometryError::UnknownMaterial {
            cell: cell_id,
            material: word.clone(),
        }),
        MaterialEntry::Id(mat_id) => {
            materials
                .get_index_of(mat_id)
                .map(MaterialRef::Material)
                .ok_or(GeometryError::UnknownMaterial {
                    cell: cell_id,
                    material: mat_id.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::XPlane;

    fn surfaces() -> SurfaceTable {
        let mut table = SurfaceTable::new();
        table.add(Box::new(XPlane::new(1, 0.0))).unwrap();
        table.add(Box::new(XPlane::new(2, 1.0))).unwrap();
        table
    }

    fn materials() -> IndexSet<i32> {
        [40, 41].into_iter().collect()
    }

    fn material_cell() -> CellConfig {
        CellConfig {
            id: Some(1),
            material: Some(vec![MaterialEntry::Id(40)]),
            region: "1 -2".to_string(),
            ..CellConfig::default()
        }
    }

    #[test]
    fn test_minimal_material_cell() {
        let cell = Cell::from_config(material_cell(), &surfaces(), &materials()).unwrap();
        assert_eq!(cell.id, 1);
        assert_eq!(cell.universe_id, 0);
        assert_eq!(cell.fill, Fill::Material(vec![MaterialRef::Material(0)]));
        assert!(cell.region.is_simple());
        assert!(cell.sqrt_kt.is_empty());
    }

    #[test]
    fn test_missing_id() {
        let config = CellConfig {
            id: None,
            ..material_cell()
        };
        assert_eq!(
            Cell::from_config(config, &surfaces(), &materials()).unwrap_err(),
            GeometryError::MissingId
        );
    }

    #[test]
    fn test_fill_material_exclusivity() {
        let neither = CellConfig {
            id: Some(2),
            ..CellConfig::default()
        };
        assert_eq!(
            Cell::from_config(neither, &surfaces(), &materials()).unwrap_err(),
            GeometryError::MissingFillOrMaterial(2)
        );

        let both = CellConfig {
            fill: Some(5),
            ..material_cell()
        };
        assert_eq!(
            Cell::from_config(both, &surfaces(), &materials()).unwrap_err(),
            GeometryError::ConflictingFillAndMaterial(1)
        );
    }

    #[test]
    fn test_void_and_distributed_materials() {
        let config = CellConfig {
            material: Some(vec![
                MaterialEntry::Id(41),
                MaterialEntry::Keyword("void".to_string()),
                MaterialEntry::Id(40),
            ]),
            ..material_cell()
        };
        let cell = Cell::from_config(config, &surfaces(), &materials()).unwrap();
        assert_eq!(
            cell.fill,
            Fill::Material(vec![
                MaterialRef::Material(1),
                MaterialRef::Void,
                MaterialRef::Material(0),
            ])
        );
    }

    #[test]
    fn test_empty_material_list() {
        let config = CellConfig {
            material: Some(vec![]),
            ..material_cell()
        };
        assert_eq!(
            Cell::from_config(config, &surfaces(), &materials()).unwrap_err(),
            GeometryError::EmptyMaterial(1)
        );
    }

    #[test]
    fn test_unknown_material() {
        let config = CellConfig {
            material: Some(vec![MaterialEntry::Id(99)]),
            ..material_cell()
        };
        assert!(matches!(
            Cell::from_config(config, &surfaces(), &materials()).unwrap_err(),
            GeometryError::UnknownMaterial { cell: 1, .. }
        ));

        let config = CellConfig {
            material: Some(vec![MaterialEntry::Keyword("vacuum".to_string())]),
            ..material_cell()
        };
        assert!(matches!(
            Cell::from_config(config, &surfaces(), &materials()).unwrap_err(),
            GeometryError::UnknownMaterial { cell: 1, .. }
        ));
    }

    #[test]
    fn test_temperature_stored_as_sqrt_kt() {
        let config = CellConfig {
            temperature: Some(vec![600.0]),
            ..material_cell()
        };
        let cell = Cell::from_config(config, &surfaces(), &materials()).unwrap();
        assert_eq!(cell.sqrt_kt.len(), 1);
        assert!((cell.sqrt_kt[0] - (K_BOLTZMANN * 600.0).sqrt()).abs() < 1e-18);
    }

    #[test]
    fn test_temperature_validation() {
        let on_fill = CellConfig {
            id: Some(3),
            fill: Some(7),
            temperature: Some(vec![300.0]),
            ..CellConfig::default()
        };
        assert_eq!(
            Cell::from_config(on_fill, &surfaces(), &materials()).unwrap_err(),
            GeometryError::TemperatureWithoutMaterial(3)
        );

        let negative = CellConfig {
            temperature: Some(vec![-1.0]),
            ..material_cell()
        };
        assert_eq!(
            Cell::from_config(negative, &surfaces(), &materials()).unwrap_err(),
            GeometryError::NegativeTemperature(1)
        );

        let mismatched = CellConfig {
            temperature: Some(vec![300.0, 400.0]),
            ..material_cell()
        };
        assert_eq!(
            Cell::from_config(mismatched, &surfaces(), &materials()).unwrap_err(),
            GeometryError::TemperatureArity(1)
        );
    }

    #[test]
    fn test_transforms_require_fill() {
        let translated = CellConfig {
            translation: Some(vec![1.0, 0.0, 0.0]),
            ..material_cell()
        };
        assert_eq!(
            Cell::from_config(translated, &surfaces(), &materials()).unwrap_err(),
            GeometryError::TransformOnMaterialCell {
                cell: 1,
                what: "translation"
            }
        );

        let rotated = CellConfig {
            rotation: Some(vec![0.0, 0.0, 90.0]),
            ..material_cell()
        };
        assert_eq!(
            Cell::from_config(rotated, &surfaces(), &materials()).unwrap_err(),
            GeometryError::TransformOnMaterialCell {
                cell: 1,
                what: "rotation"
            }
        );
    }

    #[test]
    fn test_transform_arity() {
        let config = CellConfig {
            id: Some(4),
            fill: Some(7),
            translation: Some(vec![1.0, 2.0]),
            ..CellConfig::default()
        };
        assert_eq!(
            Cell::from_config(config, &surfaces(), &materials()).unwrap_err(),
            GeometryError::BadVectorArity {
                cell: 4,
                what: "translation"
            }
        );
    }

    #[test]
    fn test_fill_cell_with_transforms() {
        let config = CellConfig {
            id: Some(4),
            fill: Some(7),
            translation: Some(vec![1.0, 2.0, 3.0]),
            rotation: Some(vec![0.0, 0.0, 90.0]),
            ..CellConfig::default()
        };
        let cell = Cell::from_config(config, &surfaces(), &materials()).unwrap();
        assert_eq!(cell.fill, Fill::Universe(7));
        assert_eq!(cell.translation, Some(DVec3::new(1.0, 2.0, 3.0)));
        let rotation = cell.rotation.unwrap();
        assert_eq!(rotation.angles, [0.0, 0.0, 90.0]);
    }

    #[test]
    fn test_rotation_matrix_z_quarter_turn() {
        // psi = 90 degrees about z, negated by convention: x maps to -y.
        let rotation = Rotation::from_degrees([0.0, 0.0, 90.0]);
        let mapped = rotation.matrix * DVec3::X;
        assert!((mapped - DVec3::new(0.0, -1.0, 0.0)).length() < 1e-12);

        let row_major = rotation.to_row_major();
        // Row 0 is (cos psi', -sin psi'... ) with psi' = -90 degrees.
        assert!((row_major[0] - 0.0).abs() < 1e-12);
        assert!((row_major[1] - 1.0).abs() < 1e-12);
        assert!((row_major[3] - (-1.0)).abs() < 1e-12);
        assert!((row_major[4] - 0.0).abs() < 1e-12);
        assert!((row_major[8] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_identity() {
        let rotation = Rotation::from_degrees([0.0, 0.0, 0.0]);
        let row_major = rotation.to_row_major();
        let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        for (a, b) in row_major.iter().zip(identity.iter()) {
            assert!((a - b).abs() < 1e-15);
        }
    }
}

//! The geometry registry: cells, universes and the tables they reference.
//!
//! A `Geometry` is populated once, single-threaded, before transport
//! begins; after that the query surface is read-only and freely shared
//! across worker threads. The administrative operations mutate cells and
//! are not safe to interleave with ongoing queries; embedders exposing
//! them at runtime must quiesce queries first. No locks are taken.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use crate::cell::{Cell, CellConfig, Fill, FillKind, MaterialRef};
use crate::constants::{K_BOLTZMANN, MATERIAL_VOID};
use crate::error::{AdminError, GeometryError};
use crate::surface::SurfaceTable;

/// A named collection of cells. Universes are derived from the cells
/// that declare membership in them, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    /// User-facing universe id.
    pub id: i32,
    /// Dense indices of member cells, in insertion order.
    pub cells: Vec<usize>,
}

/// Fill assignment accepted by the administrative API.
///
/// The whole assignment is carried in one value so a cell can never be
/// observed between "old fill cleared" and "new fill set". `Material`
/// entries are 1-based material indices or [`MATERIAL_VOID`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillSpec {
    Material(Vec<i32>),
    Universe(i32),
    Lattice(i32),
}

/// Owns every table the cell subsystem reads: surfaces, materials, cells
/// and the derived universes.
#[derive(Default)]
pub struct Geometry {
    /// The surface table region operands bind against.
    pub surfaces: SurfaceTable,
    materials: IndexSet<i32>,
    cells: Vec<Cell>,
    cell_map: IndexMap<i32, usize>,
    universes: Vec<Universe>,
    universe_map: IndexMap<i32, usize>,
}

impl Geometry {
    pub fn new() -> Geometry {
        Geometry::default()
    }

    /// Register a material user id. Returns its dense index.
    pub fn add_material(&mut self, id: i32) -> Result<usize, GeometryError> {
        let (index, fresh) = self.materials.insert_full(id);
        if fresh {
            Ok(index)
        } else {
            Err(GeometryError::DuplicateMaterialId(id))
        }
    }

    /// User id of the material at a dense index.
    pub fn material_id(&self, index: usize) -> Option<i32> {
        self.materials.get_index(index).copied()
    }

    pub fn n_materials(&self) -> usize {
        self.materials.len()
    }

    /// Validate and append one cell, then rebuild the universe table.
    pub fn add_cell(&mut self, config: CellConfig) -> Result<usize, GeometryError> {
        let cell = Cell::from_config(config, &self.surfaces, &self.materials)?;
        if self.cell_map.contains_key(&cell.id) {
            return Err(GeometryError::DuplicateCellId(cell.id));
        }
        let index = self.cells.len();
        debug!(cell = cell.id, index, simple = cell.region.is_simple(), "registered cell");
        self.cell_map.insert(cell.id, index);
        self.cells.push(cell);
        self.rebuild_universes();
        Ok(index)
    }

    /// Load a whole problem's cells. A description with zero cells is an
    /// error: nothing could be transported in it.
    pub fn add_cells<I>(&mut self, configs: I) -> Result<(), GeometryError>
    where
        I: IntoIterator<Item = CellConfig>,
    {
        let mut count = 0usize;
        for config in configs {
            self.add_cell(config)?;
            count += 1;
        }
        if count == 0 {
            return Err(GeometryError::NoCells);
        }
        info!(
            cells = count,
            universes = self.universes.len(),
            "geometry cells loaded"
        );
        Ok(())
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Dense index of the cell with the given user id.
    pub fn cell_index(&self, id: i32) -> Option<usize> {
        self.cell_map.get(&id).copied()
    }

    pub fn universes(&self) -> &[Universe] {
        &self.universes
    }

    /// Dense index of the universe with the given user id.
    pub fn universe_index(&self, id: i32) -> Option<usize> {
        self.universe_map.get(&id).copied()
    }

    /// Rebuild the universe table from the cell list, preserving
    /// first-seen universe order.
    fn rebuild_universes(&mut self) {
        self.universes.clear();
        self.universe_map.clear();
        for (index, cell) in self.cells.iter().enumerate() {
            match self.universe_map.get(&cell.universe_id) {
                Some(&u) => self.universes[u].cells.push(index),
                None => {
                    self.universe_map
                        .insert(cell.universe_id, self.universes.len());
                    self.universes.push(Universe {
                        id: cell.universe_id,
                        cells: vec![index],
                    });
                }
            }
        }
    }

    /// Fill kind and payload of a cell.
    ///
    /// `index` is 1-based, the external convention of this boundary.
    /// Material cells return 1-based material indices with
    /// [`MATERIAL_VOID`] marking void entries; fill cells return the
    /// singleton target id.
    pub fn cell_fill(&self, index: i32) -> Result<(FillKind, Vec<i32>), AdminError> {
        let cell = self.cell_1based(index)?;
        let payload = match &cell.fill {
            Fill::Material(list) => list
                .iter()
                .map(|entry| match entry {
                    MaterialRef::Void => MATERIAL_VOID,
                    MaterialRef::Material(i) => *i as i32 + 1,
                })
                .collect(),
            Fill::Universe(target) => vec![*target],
            Fill::Lattice(target) => vec![*target],
        };
        Ok((cell.fill.kind(), payload))
    }

    /// Atomically reassign what a cell is filled with.
    ///
    /// The new assignment is validated in full before the cell is
    /// touched; on error the cell is unchanged. Assigning a non-material
    /// fill drops the previous material list.
    pub fn set_cell_fill(&mut self, index: i32, spec: FillSpec) -> Result<(), AdminError> {
        if index < 1 || index as usize > self.cells.len() {
            return Err(AdminError::CellIndexOutOfBounds(index));
        }
        let fill = match spec {
            FillSpec::Material(entries) => {
                let mut list = Vec::with_capacity(entries.len());
                for entry in entries {
                    if entry == MATERIAL_VOID {
                        list.push(MaterialRef::Void);
                    } else if entry >= 1 && entry as usize <= self.materials.len() {
                        list.push(MaterialRef::Material(entry as usize - 1));
                    } else {
                        return Err(AdminError::MaterialIndexOutOfBounds(entry));
                    }
                }
                Fill::Material(list)
            }
            FillSpec::Universe(target) => Fill::Universe(target),
            FillSpec::Lattice(target) => Fill::Lattice(target),
        };
        self.cells[index as usize - 1].fill = fill;
        Ok(())
    }

    /// Set the temperature of one instance, or of every instance when
    /// `instance` is `None`. Stored as sqrt(k*T).
    pub fn set_cell_temperature(
        &mut self,
        index: i32,
        temperature: f64,
        instance: Option<usize>,
    ) -> Result<(), AdminError> {
        if index < 1 || index as usize > self.cells.len() {
            return Err(AdminError::CellIndexOutOfBounds(index));
        }
        if temperature < 0.0 {
            return Err(AdminError::NegativeTemperature(temperature));
        }
        let sqrt_kt = (K_BOLTZMANN * temperature).sqrt();
        let cell = &mut self.cells[index as usize - 1];
        match instance {
            Some(i) => match cell.sqrt_kt.get_mut(i) {
                Some(slot) => *slot = sqrt_kt,
                None => return Err(AdminError::InstanceOutOfBounds(i)),
            },
            None => {
                for slot in &mut cell.sqrt_kt {
                    *slot = sqrt_kt;
                }
            }
        }
        Ok(())
    }

    fn cell_1based(&self, index: i32) -> Result<&Cell, AdminError> {
        if index >= 1 && index as usize <= self.cells.len() {
            Ok(&self.cells[index as usize - 1])
        } else {
            Err(AdminError::CellIndexOutOfBounds(index))
        }
    }
}

//! Group-layout serialization for regio geometries.
//!
//! Cells and universes serialize into named groups (`"cell 7"`,
//! `"universe 0"`) mirroring the statepoint file layout. This crate
//! realizes that layout as JSON values and leaves the container format
//! to the embedder. It also reads and writes [`CellConfig`] lists, the
//! plain-data input model for geometry construction.

use regio_core::constants::{K_BOLTZMANN, MATERIAL_VOID};
use regio_core::{Cell, CellConfig, Fill, Geometry, MaterialRef, Universe};
use serde_json::{json, Map, Value};

/// Serialize one cell into its group value.
///
/// The region is written back in the input grammar: intersection is
/// implicit and elided, surface indices are mapped to user ids. Material
/// fills write the material user ids (a bare scalar when there is a
/// single entry), with [`MATERIAL_VOID`] marking void, and temperatures
/// converted back to Kelvin from their sqrt(k*T) form. Universe fills
/// write the target id plus any translation and the three raw rotation
/// angles; lattice fills write the lattice id.
pub fn cell_to_value(geometry: &Geometry, cell: &Cell) -> Value {
    let mut group = Map::new();

    if !cell.name.is_empty() {
        group.insert("name".to_string(), json!(cell.name));
    }
    group.insert("universe".to_string(), json!(cell.universe_id));

    let region = cell.region.to_spec(&geometry.surfaces);
    if !region.is_empty() {
        group.insert("region".to_string(), json!(region));
    }

    match &cell.fill {
        Fill::Material(list) => {
            group.insert("fill_type".to_string(), json!("material"));
            let ids: Vec<i32> = list
                .iter()
                .map(|entry| match entry {
                    MaterialRef::Void => MATERIAL_VOID,
                    MaterialRef::Material(index) => {
                        geometry.material_id(*index).unwrap_or(MATERIAL_VOID)
                    }
                })
                .collect();
            if ids.len() == 1 {
                group.insert("material".to_string(), json!(ids[0]));
            } else {
                group.insert("material".to_string(), json!(ids));
            }

            let temperatures: Vec<f64> = cell
                .sqrt_kt
                .iter()
                .map(|sqrt_kt| sqrt_kt * sqrt_kt / K_BOLTZMANN)
                .collect();
            group.insert("temperature".to_string(), json!(temperatures));
        }
        Fill::Universe(target) => {
            group.insert("fill_type".to_string(), json!("universe"));
            group.insert("fill".to_string(), json!(target));
            if let Some(translation) = cell.translation {
                group.insert(
                    "translation".to_string(),
                    json!([translation.x, translation.y, translation.z]),
                );
            }
            if let Some(rotation) = &cell.rotation {
                group.insert("rotation".to_string(), json!(rotation.angles));
            }
        }
        Fill::Lattice(target) => {
            group.insert("fill_type".to_string(), json!("lattice"));
            group.insert("lattice".to_string(), json!(target));
        }
    }

    Value::Object(group)
}

/// Serialize one universe into its group value: the user ids of its
/// member cells, when it has any.
pub fn universe_to_value(geometry: &Geometry, universe: &Universe) -> Value {
    let mut group = Map::new();
    if !universe.cells.is_empty() {
        let ids: Vec<i32> = universe
            .cells
            .iter()
            .map(|&index| geometry.cells()[index].id)
            .collect();
        group.insert("cells".to_string(), json!(ids));
    }
    Value::Object(group)
}

/// Serialize the whole geometry: every cell under `cells/"cell <id>"`,
/// every universe under `universes/"universe <id>"`.
pub fn geometry_to_value(geometry: &Geometry) -> Value {
    let mut cells = Map::new();
    for cell in geometry.cells() {
        cells.insert(format!("cell {}", cell.id), cell_to_value(geometry, cell));
    }

    let mut universes = Map::new();
    for universe in geometry.universes() {
        universes.insert(
            format!("universe {}", universe.id),
            universe_to_value(geometry, universe),
        );
    }

    json!({ "cells": cells, "universes": universes })
}

/// Read a list of cell descriptions from JSON.
pub fn cells_from_json(text: &str) -> Result<Vec<CellConfig>, serde_json::Error> {
    serde_json::from_str(text)
}

/// Write a list of cell descriptions as JSON.
pub fn cells_to_json(configs: &[CellConfig]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(configs)
}

//! JSON plan files: dose grid, transform graph and structure set.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{DvhError, DvhResult};
use crate::io::open_maybe_gz;
use crate::math::affine;
use crate::model::grid::identity_directions;
use crate::model::{Color, DoseGrid, GridGeometry, Structure, StructureGeometry, StructureSet};
use crate::transform::TransformTree;

#[derive(Debug, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub transforms: Vec<TransformDef>,
    pub dose: DoseDef,
    pub structure_set: StructureSetDef,
}

#[derive(Debug, Deserialize)]
pub struct TransformDef {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Row-major node-to-parent matrix.
    pub matrix: [[f64; 4]; 4],
}

#[derive(Debug, Deserialize)]
pub struct DoseDef {
    pub id: String,
    pub dims: [usize; 3],
    pub spacing: [f64; 3],
    #[serde(default)]
    pub origin: [f64; 3],
    #[serde(default = "identity_directions")]
    pub directions: [[f64; 3]; 3],
    #[serde(default)]
    pub dose_unit_value: Option<f64>,
    #[serde(default)]
    pub dose_unit_name: Option<String>,
    #[serde(default)]
    pub parent_transform: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<f32>>,
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureSetDef {
    Single { structure: StructureDef },
    Group {
        name: String,
        children: Vec<StructureDef>,
    },
}

#[derive(Debug, Deserialize)]
pub struct StructureDef {
    pub name: String,
    #[serde(default)]
    pub color: Option<[f64; 3]>,
    #[serde(default)]
    pub parent_transform: Option<String>,
    pub geometry: GeometryDef,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryDef {
    Mask {
        dims: [usize; 3],
        spacing: [f64; 3],
        #[serde(default)]
        origin: [f64; 3],
        #[serde(default = "identity_directions")]
        directions: [[f64; 3]; 3],
        labels: Vec<u8>,
    },
    Surface {
        vertices: Vec<[f64; 3]>,
        triangles: Vec<[usize; 3]>,
    },
}

#[derive(Debug)]
pub struct LoadedPlan {
    pub dose: DoseGrid,
    pub transforms: TransformTree,
    pub structures: StructureSet,
}

pub fn load_plan(path: &Path) -> DvhResult<LoadedPlan> {
    let text = std::fs::read_to_string(path).map_err(|e| DvhError::io(path, e))?;
    let plan: PlanFile = serde_json::from_str(&text).map_err(|e| {
        DvhError::InvalidInput(format!("failed to parse plan {}: {}", path.display(), e))
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let loaded = resolve_plan(plan, base)?;
    info!(
        plan = %path.display(),
        dose = %loaded.dose.id,
        transforms = loaded.transforms.len(),
        structure_set = %loaded.structures.name(),
        "plan_loaded"
    );
    Ok(loaded)
}

/// Converts a parsed plan into model objects; relative data files resolve
/// against `base`.
pub fn resolve_plan(plan: PlanFile, base: &Path) -> DvhResult<LoadedPlan> {
    let mut transforms = TransformTree::new();
    for t in plan.transforms {
        transforms.insert(t.id, t.parent, affine::from_rows(&t.matrix))?;
    }

    let dose = build_dose(plan.dose, base)?;

    let structures = match plan.structure_set {
        StructureSetDef::Single { structure } => StructureSet::Single(build_structure(structure)?),
        StructureSetDef::Group { name, children } if children.is_empty() => {
            return Err(DvhError::InvalidInput(format!(
                "structure group '{}' has no structures",
                name
            )));
        }
        StructureSetDef::Group { name, children } => StructureSet::Group {
            name,
            children: children
                .into_iter()
                .map(build_structure)
                .collect::<DvhResult<Vec<_>>>()?,
        },
    };

    Ok(LoadedPlan {
        dose,
        transforms,
        structures,
    })
}

fn build_dose(def: DoseDef, base: &Path) -> DvhResult<DoseGrid> {
    let geometry = GridGeometry {
        dims: def.dims,
        spacing: def.spacing,
        origin: def.origin,
        directions: def.directions,
    };
    let values = match (def.values, def.data_file) {
        (Some(values), None) => values,
        (None, Some(file)) => read_raw_f32(&base.join(file))?,
        (Some(_), Some(_)) => {
            return Err(DvhError::InvalidInput(format!(
                "dose '{}' sets both values and data_file",
                def.id
            )));
        }
        (None, None) => {
            return Err(DvhError::InvalidInput(format!(
                "dose '{}' has neither values nor data_file",
                def.id
            )));
        }
    };
    let grid = DoseGrid {
        id: def.id,
        geometry,
        values,
        dose_unit_value: def.dose_unit_value,
        dose_unit_name: def.dose_unit_name,
        parent_transform: def.parent_transform,
    };
    grid.validate()?;
    Ok(grid)
}

fn build_structure(def: StructureDef) -> DvhResult<Structure> {
    let geometry = match def.geometry {
        GeometryDef::Mask {
            dims,
            spacing,
            origin,
            directions,
            labels,
        } => StructureGeometry::Mask {
            geometry: GridGeometry {
                dims,
                spacing,
                origin,
                directions,
            },
            labels,
        },
        GeometryDef::Surface {
            vertices,
            triangles,
        } => StructureGeometry::Surface {
            vertices,
            triangles,
        },
    };
    let color = def
        .color
        .map(|[r, g, b]| Color::new(r, g, b))
        .unwrap_or_default();
    Ok(Structure {
        name: def.name,
        color,
        parent_transform: def.parent_transform,
        geometry,
    })
}

/// Little-endian f32 samples, optionally gzip-compressed.
pub fn read_raw_f32(path: &Path) -> DvhResult<Vec<f32>> {
    let mut reader = open_maybe_gz(path)?;
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| DvhError::io(path, e))?;
    if bytes.len() % 4 != 0 {
        return Err(DvhError::InvalidInput(format!(
            "{} length {} is not a multiple of 4",
            path.display(),
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

use crate::error::{DvhError, DvhResult};
use crate::model::grid::GridGeometry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`, each component scaled to 0-255 and rounded.
    pub fn to_hex(&self) -> String {
        format!(
            "#{:02X}{:02X}{:02X}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

fn channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

impl Default for Color {
    fn default() -> Self {
        Self::new(0.5, 0.5, 0.5)
    }
}

/// Structure geometry in the structure's local frame.
#[derive(Debug, Clone)]
pub enum StructureGeometry {
    Mask {
        geometry: GridGeometry,
        labels: Vec<u8>,
    },
    Surface {
        vertices: Vec<[f64; 3]>,
        triangles: Vec<[usize; 3]>,
    },
}

impl StructureGeometry {
    pub fn validate(&self, name: &str) -> DvhResult<()> {
        match self {
            Self::Mask { geometry, labels } => {
                geometry.validate(&format!("mask of '{}'", name))?;
                if labels.len() != geometry.voxel_count() {
                    return Err(DvhError::InvalidInput(format!(
                        "mask of '{}' has {} labels, expected {}",
                        name,
                        labels.len(),
                        geometry.voxel_count()
                    )));
                }
            }
            Self::Surface {
                vertices,
                triangles,
            } => {
                if triangles.is_empty() {
                    return Err(DvhError::InvalidInput(format!(
                        "surface of '{}' has no triangles",
                        name
                    )));
                }
                for tri in triangles {
                    if tri.iter().any(|&v| v >= vertices.len()) {
                        return Err(DvhError::InvalidInput(format!(
                            "surface of '{}' references vertex out of range: {:?}",
                            name, tri
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Structure {
    pub name: String,
    pub color: Color,
    pub parent_transform: Option<String>,
    pub geometry: StructureGeometry,
}

/// Structures are identified by name plus position; names may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructureKey {
    pub name: String,
    pub index: usize,
}

impl std::fmt::Display for StructureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.index)
    }
}

#[derive(Debug, Clone)]
pub enum StructureSet {
    Single(Structure),
    Group {
        name: String,
        children: Vec<Structure>,
    },
}

impl StructureSet {
    pub fn name(&self) -> &str {
        match self {
            Self::Single(s) => &s.name,
            Self::Group { name, .. } => name,
        }
    }

    /// Flattens the set into keyed structures, in declaration order.
    pub fn collect(&self) -> DvhResult<Vec<(StructureKey, &Structure)>> {
        let members: Vec<&Structure> = match self {
            Self::Single(s) => vec![s],
            Self::Group { name, children } => {
                if children.is_empty() {
                    return Err(DvhError::InvalidInput(format!(
                        "structure group '{}' has no structures",
                        name
                    )));
                }
                children.iter().collect()
            }
        };
        Ok(members
            .into_iter()
            .enumerate()
            .map(|(index, s)| {
                (
                    StructureKey {
                        name: s.name.clone(),
                        index,
                    },
                    s,
                )
            })
            .collect())
    }
}

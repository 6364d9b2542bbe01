//! Parent-linked transform graph and the structure-to-dose-index resolver.
//!
//! Every node stores its node-to-parent matrix. A node without a parent is
//! expressed in world coordinates. Objects (dose grids, structures) reference
//! at most one node as their parent transform.

use std::collections::{HashMap, HashSet};

use nalgebra::Matrix4;
use tracing::debug;

use crate::error::{DvhError, DvhResult};
use crate::math::affine;
use crate::model::{DoseGrid, Structure};

#[derive(Debug, Clone)]
pub struct TransformNode {
    pub id: String,
    pub parent: Option<String>,
    pub to_parent: Matrix4<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TransformTree {
    nodes: HashMap<String, TransformNode>,
}

impl TransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        id: impl Into<String>,
        parent: Option<String>,
        to_parent: Matrix4<f64>,
    ) -> DvhResult<()> {
        let id = id.into();
        if !affine::is_affine(&to_parent) {
            return Err(DvhError::InvalidInput(format!(
                "transform '{}' is not affine",
                id
            )));
        }
        if self.nodes.contains_key(&id) {
            return Err(DvhError::InvalidInput(format!(
                "duplicate transform id '{}'",
                id
            )));
        }
        self.nodes.insert(
            id.clone(),
            TransformNode {
                id,
                parent,
                to_parent,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids from `id` up to its root, `id` first.
    fn chain(&self, id: &str) -> DvhResult<Vec<&TransformNode>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            if !seen.insert(cur) {
                return Err(DvhError::TransformResolution(format!(
                    "cycle through transform '{}'",
                    cur
                )));
            }
            let node = self.nodes.get(cur).ok_or_else(|| {
                DvhError::TransformResolution(format!("transform '{}' is not in the graph", cur))
            })?;
            out.push(node);
            current = node.parent.as_deref();
        }
        Ok(out)
    }

    pub fn transform_to_world(&self, id: &str) -> DvhResult<Matrix4<f64>> {
        let mut m = Matrix4::identity();
        for node in self.chain(id)? {
            m = node.to_parent * m;
        }
        Ok(m)
    }

    /// Maps coordinates of `from`'s frame into `to`'s frame through their
    /// lowest common ancestor, so the shared part of both chains never enters
    /// the product.
    pub fn transform_to_node(&self, from: &str, to: &str) -> DvhResult<Matrix4<f64>> {
        let from_chain = self.chain(from)?;
        let to_chain = self.chain(to)?;
        let to_ids: HashSet<&str> = to_chain.iter().map(|n| n.id.as_str()).collect();

        let mut from_to_common = Matrix4::identity();
        let mut common: Option<&str> = None;
        for node in &from_chain {
            if to_ids.contains(node.id.as_str()) {
                common = Some(node.id.as_str());
                break;
            }
            from_to_common = node.to_parent * from_to_common;
        }

        let mut to_to_common = Matrix4::identity();
        for node in &to_chain {
            if Some(node.id.as_str()) == common {
                break;
            }
            to_to_common = node.to_parent * to_to_common;
        }

        debug!(from, to, common = ?common, "transform_to_node");
        let common_to_to = affine::invert(&to_to_common, "target transform chain")?;
        Ok(common_to_to * from_to_common)
    }
}

/// Composes the structure-local to dose-index transform (four cases by which
/// of the two objects has a parent transform).
pub fn resolve_structure_to_dose_ijk(
    tree: &TransformTree,
    structure: &Structure,
    dose: &DoseGrid,
) -> DvhResult<Matrix4<f64>> {
    let local_to_dose_physical = match (
        structure.parent_transform.as_deref(),
        dose.parent_transform.as_deref(),
    ) {
        (None, None) => Matrix4::identity(),
        (None, Some(dose_tf)) => {
            let dose_to_world = tree.transform_to_world(dose_tf)?;
            affine::invert(&dose_to_world, "dose transform to world")?
        }
        (Some(structure_tf), None) => tree.transform_to_world(structure_tf)?,
        (Some(structure_tf), Some(dose_tf)) => tree.transform_to_node(structure_tf, dose_tf)?,
    };
    let physical_to_ijk = dose.geometry.physical_to_ijk()?;
    Ok(physical_to_ijk * local_to_dose_physical)
}

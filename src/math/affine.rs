//! Homogeneous 4x4 affine helpers for grid placement and frame changes.

use nalgebra::{Matrix4, Point3};

use crate::error::{DvhError, DvhResult};

/// Index-to-physical matrix: columns are the axis directions scaled by
/// spacing, translation is the origin.
pub fn ijk_to_physical(
    directions: &[[f64; 3]; 3],
    spacing: &[f64; 3],
    origin: &[f64; 3],
) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    for axis in 0..3 {
        for row in 0..3 {
            m[(row, axis)] = directions[axis][row] * spacing[axis];
        }
        m[(axis, 3)] = origin[axis];
    }
    m
}

pub fn from_rows(rows: &[[f64; 4]; 4]) -> Matrix4<f64> {
    Matrix4::from_fn(|r, c| rows[r][c])
}

pub fn invert(m: &Matrix4<f64>, what: &str) -> DvhResult<Matrix4<f64>> {
    m.try_inverse()
        .ok_or_else(|| DvhError::TransformResolution(format!("{} is singular", what)))
}

#[inline]
pub fn apply(m: &Matrix4<f64>, p: [f64; 3]) -> [f64; 3] {
    let q = m.transform_point(&Point3::new(p[0], p[1], p[2]));
    [q.x, q.y, q.z]
}

pub fn is_affine(m: &Matrix4<f64>) -> bool {
    let eps = 1e-12;
    m[(3, 0)].abs() < eps
        && m[(3, 1)].abs() < eps
        && m[(3, 2)].abs() < eps
        && (m[(3, 3)] - 1.0).abs() < eps
}

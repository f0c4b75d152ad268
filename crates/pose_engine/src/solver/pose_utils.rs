//! Pose helpers shared by the PnP solvers.
//!
//! All image coordinates here are normalized camera coordinates (`z = 1`).

use nalgebra::{
    Isometry3, Matrix2x3, Matrix3, Matrix3x6, Matrix6, Point3, Rotation3, Translation3,
    UnitQuaternion, Vector2, Vector3, Vector6,
};

use super::PnpError;

/// Recover the world-to-camera transform from matched world and camera-frame
/// points (Kabsch).
pub(super) fn pose_from_points(
    world: &[Vector3<f64>],
    camera: &[Vector3<f64>],
) -> Result<Isometry3<f64>, PnpError> {
    if world.len() != camera.len() || world.len() < 3 {
        return Err(PnpError::Degenerate);
    }

    let n = world.len() as f64;
    let c_w = world.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;
    let c_c = camera.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;

    let mut h = Matrix3::zeros();
    for (pw, pc) in world.iter().zip(camera) {
        h += (pc - c_c) * (pw - c_w).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(PnpError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(PnpError::SvdFailed)?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_fix = u;
        u_fix.column_mut(2).neg_mut();
        r = u_fix * v_t;
    }

    let t = c_c - r * c_w;
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
    Ok(Isometry3::from_parts(Translation3::from(t), rot))
}

/// Normalized projection, `None` behind the camera
pub(super) fn project(pose: &Isometry3<f64>, p: &Vector3<f64>) -> Option<Vector2<f64>> {
    let pc = pose * Point3::from(*p);
    (pc.z > f64::EPSILON).then(|| Vector2::new(pc.x / pc.z, pc.y / pc.z))
}

/// Mean reprojection distance; points behind the camera count as infinite
pub(super) fn mean_reprojection_error(
    pose: &Isometry3<f64>,
    world: &[Vector3<f64>],
    image: &[Vector2<f64>],
) -> f64 {
    let total: f64 = world
        .iter()
        .zip(image)
        .map(|(p, uv)| project(pose, p).map_or(f64::INFINITY, |proj| (proj - uv).norm()))
        .sum();
    total / world.len().max(1) as f64
}

fn squared_cost(pose: &Isometry3<f64>, world: &[Vector3<f64>], image: &[Vector2<f64>]) -> f64 {
    world
        .iter()
        .zip(image)
        .map(|(p, uv)| project(pose, p).map_or(f64::INFINITY, |proj| (proj - uv).norm_squared()))
        .sum()
}

/// Levenberg-Marquardt polish of `pose` on reprojection error.
///
/// The update is a left perturbation: `R <- exp(w) R`, `t <- t + dt`.
pub(super) fn refine_pose(
    pose: &Isometry3<f64>,
    world: &[Vector3<f64>],
    image: &[Vector2<f64>],
    max_iters: usize,
) -> Isometry3<f64> {
    let mut current = *pose;
    let mut cost = squared_cost(&current, world, image);
    if !cost.is_finite() {
        return current;
    }
    let mut lambda = 1e-3;

    for _ in 0..max_iters {
        let mut jtj = Matrix6::<f64>::zeros();
        let mut jtr = Vector6::<f64>::zeros();
        for (p, uv) in world.iter().zip(image) {
            let rp = current.rotation * p;
            let pc = rp + current.translation.vector;
            let inv_z = 1.0 / pc.z;
            let residual = Vector2::new(pc.x * inv_z, pc.y * inv_z) - uv;

            let d_proj = Matrix2x3::new(
                inv_z,
                0.0,
                -pc.x * inv_z * inv_z,
                0.0,
                inv_z,
                -pc.y * inv_z * inv_z,
            );
            let mut d_point = Matrix3x6::<f64>::zeros();
            d_point
                .fixed_view_mut::<3, 3>(0, 0)
                .copy_from(&(-rp.cross_matrix()));
            d_point
                .fixed_view_mut::<3, 3>(0, 3)
                .copy_from(&Matrix3::identity());

            let j = d_proj * d_point;
            jtj += j.transpose() * j;
            jtr += j.transpose() * residual;
        }

        let mut damped = jtj;
        for i in 0..6 {
            damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
        }
        let Some(chol) = damped.cholesky() else {
            break;
        };
        let delta = chol.solve(&(-jtr));

        let candidate = Isometry3::from_parts(
            Translation3::from(current.translation.vector + delta.fixed_rows::<3>(3)),
            UnitQuaternion::from_scaled_axis(delta.fixed_rows::<3>(0).into_owned())
                * current.rotation,
        );
        let candidate_cost = squared_cost(&candidate, world, image);

        if candidate_cost < cost {
            let improvement = cost - candidate_cost;
            current = candidate;
            cost = candidate_cost;
            lambda = (lambda * 0.1).max(1e-12);
            if improvement <= 1e-15 * cost.max(1e-30) || delta.norm() < 1e-12 {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e8 {
                break;
            }
        }
    }

    current
}

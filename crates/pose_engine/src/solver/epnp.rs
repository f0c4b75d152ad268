//! EPnP (Efficient Perspective-n-Point) for 4+ non-coplanar points.
//!
//! Lepetit's control-point formulation. The world points are expressed as
//! barycentric combinations of four control points derived from their
//! covariance; the camera-frame control points lie in the span of the four
//! smallest eigenvectors of `MᵀM`. The combination weights (betas) are
//! estimated three ways, each polished by Gauss-Newton, and the candidate
//! with the lowest reprojection error wins.
//!
//! Image points are normalized camera coordinates (`z = 1`).

use nalgebra::{
    DMatrix, DVector, Isometry3, Matrix3, SMatrix, SVector, SymmetricEigen, Vector2, Vector3,
};

use super::pose_utils::{mean_reprojection_error, pose_from_points};
use super::PnpError;

/// Control-point index pairs, one distance constraint each
const PAIRS: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];

const GAUSS_NEWTON_ITERS: usize = 5;

type L6x10 = SMatrix<f64, 6, 10>;
type Rho = SVector<f64, 6>;
type Betas = [f64; 4];

/// Estimate the world-to-camera transform from 4+ correspondences.
pub fn epnp(world: &[Vector3<f64>], image: &[Vector2<f64>]) -> Result<Isometry3<f64>, PnpError> {
    let n = world.len();
    if n < 4 || image.len() != n {
        return Err(PnpError::NotEnoughPoints {
            found: n.min(image.len()),
            required: 4,
        });
    }

    let control_w = control_points(world)?;
    let alphas = barycentric(world, &control_w)?;

    let m = build_m(&alphas, image);
    let mtm = m.transpose() * &m;
    let eig = SymmetricEigen::new(mtm);
    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));
    let kernel: [DVector<f64>; 4] =
        std::array::from_fn(|k| eig.eigenvectors.column(order[k]).into_owned());

    let l = compute_l(&kernel);
    let rho = compute_rho(&control_w);

    let candidates = [
        approx_betas_n4(&l, &rho),
        approx_betas_n2(&l, &rho),
        approx_betas_n3(&l, &rho),
    ];

    let mut best: Option<(f64, Isometry3<f64>)> = None;
    for betas in candidates.into_iter().flatten() {
        let betas = gauss_newton(&l, &rho, betas);
        let Ok(pose) = compute_pose(&kernel, &betas, &alphas, world) else {
            continue;
        };
        let err = mean_reprojection_error(&pose, world, image);
        if best.as_ref().is_none_or(|(e, _)| err < *e) {
            best = Some((err, pose));
        }
    }

    best.map(|(_, pose)| pose).ok_or(PnpError::Degenerate)
}

/// Centroid plus the three principal axes scaled by their spread
fn control_points(world: &[Vector3<f64>]) -> Result<[Vector3<f64>; 4], PnpError> {
    let n = world.len() as f64;
    let centroid = world.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;

    let mut cov = Matrix3::zeros();
    for p in world {
        let d = p - centroid;
        cov += d * d.transpose();
    }
    cov /= n;

    let eig = SymmetricEigen::new(cov);
    let mut control = [centroid; 4];
    for i in 0..3 {
        let scale = eig.eigenvalues[i].abs().sqrt();
        if scale <= 1e-9 {
            return Err(PnpError::Degenerate);
        }
        control[i + 1] = centroid + eig.eigenvectors.column(i).into_owned() * scale;
    }
    Ok(control)
}

fn barycentric(
    world: &[Vector3<f64>],
    control: &[Vector3<f64>; 4],
) -> Result<Vec<[f64; 4]>, PnpError> {
    let basis = Matrix3::from_columns(&[
        control[1] - control[0],
        control[2] - control[0],
        control[3] - control[0],
    ]);
    let basis_inv = basis.try_inverse().ok_or(PnpError::Degenerate)?;

    Ok(world
        .iter()
        .map(|p| {
            let c = basis_inv * (p - control[0]);
            [1.0 - c.x - c.y - c.z, c.x, c.y, c.z]
        })
        .collect())
}

/// 2n x 12 projection constraint matrix
fn build_m(alphas: &[[f64; 4]], image: &[Vector2<f64>]) -> DMatrix<f64> {
    let mut m = DMatrix::<f64>::zeros(2 * alphas.len(), 12);
    for (i, (a, uv)) in alphas.iter().zip(image).enumerate() {
        for (j, &alpha) in a.iter().enumerate() {
            let c = 3 * j;
            m[(2 * i, c)] = alpha;
            m[(2 * i, c + 2)] = -uv.x * alpha;
            m[(2 * i + 1, c + 1)] = alpha;
            m[(2 * i + 1, c + 2)] = -uv.y * alpha;
        }
    }
    m
}

fn block(v: &DVector<f64>, j: usize) -> Vector3<f64> {
    Vector3::new(v[3 * j], v[3 * j + 1], v[3 * j + 2])
}

/// Quadratic forms of the kernel vectors over control-point differences.
///
/// Column order: b00 b01 b11 b02 b12 b22 b03 b13 b23 b33.
fn compute_l(kernel: &[DVector<f64>; 4]) -> L6x10 {
    let mut l = L6x10::zeros();
    for (row, &(a, b)) in PAIRS.iter().enumerate() {
        let dv: [Vector3<f64>; 4] = std::array::from_fn(|k| block(&kernel[k], a) - block(&kernel[k], b));
        l[(row, 0)] = dv[0].dot(&dv[0]);
        l[(row, 1)] = 2.0 * dv[0].dot(&dv[1]);
        l[(row, 2)] = dv[1].dot(&dv[1]);
        l[(row, 3)] = 2.0 * dv[0].dot(&dv[2]);
        l[(row, 4)] = 2.0 * dv[1].dot(&dv[2]);
        l[(row, 5)] = dv[2].dot(&dv[2]);
        l[(row, 6)] = 2.0 * dv[0].dot(&dv[3]);
        l[(row, 7)] = 2.0 * dv[1].dot(&dv[3]);
        l[(row, 8)] = 2.0 * dv[2].dot(&dv[3]);
        l[(row, 9)] = dv[3].dot(&dv[3]);
    }
    l
}

/// Squared world distances between control points
fn compute_rho(control: &[Vector3<f64>; 4]) -> Rho {
    Rho::from_fn(|row, _| {
        let (a, b) = PAIRS[row];
        (control[a] - control[b]).norm_squared()
    })
}

/// Least-squares solve of `L[:, cols] x = rho`
fn solve_columns(l: &L6x10, rho: &Rho, cols: &[usize]) -> Option<DVector<f64>> {
    let a = DMatrix::from_fn(6, cols.len(), |r, c| l[(r, cols[c])]);
    let b = DVector::from_column_slice(rho.as_slice());
    a.svd(true, true).solve(&b, 1e-12).ok()
}

/// Four betas from b00 b01 b02 b03
fn approx_betas_n4(l: &L6x10, rho: &Rho) -> Option<Betas> {
    let b = solve_columns(l, rho, &[0, 1, 3, 6])?;
    let sign = if b[0] < 0.0 { -1.0 } else { 1.0 };
    let b0 = (sign * b[0]).sqrt();
    if b0 <= f64::EPSILON {
        return None;
    }
    Some([b0, sign * b[1] / b0, sign * b[2] / b0, sign * b[3] / b0])
}

/// Two betas from b00 b01 b11
fn approx_betas_n2(l: &L6x10, rho: &Rho) -> Option<Betas> {
    let b = solve_columns(l, rho, &[0, 1, 2])?;
    let (b0, b1) = leading_pair(&b);
    if b0.abs() <= f64::EPSILON {
        return None;
    }
    Some([b0, b1, 0.0, 0.0])
}

/// Three betas from b00 b01 b11 b02 b12
fn approx_betas_n3(l: &L6x10, rho: &Rho) -> Option<Betas> {
    let b = solve_columns(l, rho, &[0, 1, 2, 3, 4])?;
    let (b0, b1) = leading_pair(&b);
    if b0.abs() <= f64::EPSILON {
        return None;
    }
    Some([b0, b1, b[3] / b0, 0.0])
}

/// Recover (beta0, beta1) from (b00, b01, b11)
fn leading_pair(b: &DVector<f64>) -> (f64, f64) {
    let (mut b0, b1) = if b[0] < 0.0 {
        ((-b[0]).sqrt(), if b[2] < 0.0 { (-b[2]).sqrt() } else { 0.0 })
    } else {
        (b[0].sqrt(), if b[2] > 0.0 { b[2].sqrt() } else { 0.0 })
    };
    if b[1] < 0.0 {
        b0 = -b0;
    }
    (b0, b1)
}

/// Refine betas so control-point distances match the world ones
fn gauss_newton(l: &L6x10, rho: &Rho, mut betas: Betas) -> Betas {
    for _ in 0..GAUSS_NEWTON_ITERS {
        let [b0, b1, b2, b3] = betas;
        let quad = [
            b0 * b0,
            b0 * b1,
            b1 * b1,
            b0 * b2,
            b1 * b2,
            b2 * b2,
            b0 * b3,
            b1 * b3,
            b2 * b3,
            b3 * b3,
        ];

        let mut jac = SMatrix::<f64, 6, 4>::zeros();
        let mut residual = SVector::<f64, 6>::zeros();
        for row in 0..6 {
            let r = |c: usize| l[(row, c)];
            jac[(row, 0)] = 2.0 * r(0) * b0 + r(1) * b1 + r(3) * b2 + r(6) * b3;
            jac[(row, 1)] = r(1) * b0 + 2.0 * r(2) * b1 + r(4) * b2 + r(7) * b3;
            jac[(row, 2)] = r(3) * b0 + r(4) * b1 + 2.0 * r(5) * b2 + r(8) * b3;
            jac[(row, 3)] = r(6) * b0 + r(7) * b1 + r(8) * b2 + 2.0 * r(9) * b3;
            let predicted: f64 = (0..10).map(|c| r(c) * quad[c]).sum();
            residual[row] = rho[row] - predicted;
        }

        let Ok(delta) = jac.svd(true, true).solve(&residual, 1e-12) else {
            break;
        };
        for (beta, d) in betas.iter_mut().zip(delta.iter()) {
            *beta += d;
        }
    }
    betas
}

fn compute_pose(
    kernel: &[DVector<f64>; 4],
    betas: &Betas,
    alphas: &[[f64; 4]],
    world: &[Vector3<f64>],
) -> Result<Isometry3<f64>, PnpError> {
    let control_c: [Vector3<f64>; 4] = std::array::from_fn(|j| {
        kernel
            .iter()
            .zip(betas)
            .fold(Vector3::zeros(), |acc, (v, beta)| acc + block(v, j) * *beta)
    });

    let mut camera: Vec<Vector3<f64>> = alphas
        .iter()
        .map(|a| {
            a.iter()
                .zip(&control_c)
                .fold(Vector3::zeros(), |acc, (alpha, c)| acc + c * *alpha)
        })
        .collect();

    // The kernel is sign-ambiguous; the object is in front of the camera
    let mean_z = camera.iter().map(|p| p.z).sum::<f64>() / camera.len() as f64;
    if mean_z < 0.0 {
        for p in &mut camera {
            *p = -*p;
        }
    }

    pose_from_points(world, &camera)
}

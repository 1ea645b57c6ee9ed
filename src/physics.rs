//! Stateless physics reducers shared by every kernel and the driver: center
//! of mass, kinetic/potential/total energy, and angular momentum.
//!
//! These are pure functions of raw position/velocity/mass slices and scalar
//! parameters, so kernels (and the octree's internal per-node aggregates)
//! can call them without going through `Space`.

use lin_alg::f64::Vec3;

/// Mass-weighted average position: `Σ m_i r_i / Σ m_i`.
///
/// Undefined (returns the zero vector) if total mass is zero; callers must
/// not invoke this on an empty or zero-mass system.
pub fn center_of_mass(r: &[Vec3], m: &[f64]) -> Vec3 {
    let mut total_mass = 0.;
    let mut weighted = Vec3::new_zero();
    for (&ri, &mi) in r.iter().zip(m) {
        total_mass += mi;
        weighted += ri * mi;
    }
    if total_mass.abs() > f64::EPSILON {
        weighted / total_mass
    } else {
        Vec3::new_zero()
    }
}

/// `KE = ½ Σ m_i |v_i|²`.
pub fn kinetic_energy(v: &[Vec3], m: &[f64]) -> f64 {
    v.iter()
        .zip(m)
        .map(|(&vi, &mi)| 0.5 * mi * vi.magnitude().powi(2))
        .sum()
}

/// `PE = -G Σ_{i<j} m_i m_j / sqrt(|r_i - r_j|² + ε²)`.
///
/// The `i < j` restriction avoids double-counting each pair. `ε` must be the
/// same softening value used to compute the corresponding force (see
/// DESIGN.md).
pub fn potential_energy(r: &[Vec3], m: &[f64], g: f64, eps: f64) -> f64 {
    let eps_sq = eps * eps;
    let n = r.len();
    let mut pe = 0.;
    for i in 0..n {
        for j in (i + 1)..n {
            let dist_sq = (r[i] - r[j]).magnitude().powi(2);
            pe -= g * m[i] * m[j] / (dist_sq + eps_sq).sqrt();
        }
    }
    pe
}

/// `TE = KE + PE`, evaluated from r, v, m, G, ε.
pub fn total_energy(r: &[Vec3], v: &[Vec3], m: &[f64], g: f64, eps: f64) -> f64 {
    kinetic_energy(v, m) + potential_energy(r, m, g, eps)
}

/// Angular momentum about the origin: `L = Σ m_i (r_i × v_i)`.
pub fn angular_momentum(r: &[Vec3], v: &[Vec3], m: &[f64]) -> Vec3 {
    let mut l = Vec3::new_zero();
    for ((&ri, &vi), &mi) in r.iter().zip(v).zip(m) {
        l += ri.cross(vi) * mi;
    }
    l
}

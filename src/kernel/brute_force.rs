//! The exact, all-pairs ("brute force") acceleration kernel (C3).

use lin_alg::f64::Vec3;
use rayon::prelude::*;

use super::{check_finite, AccelKernel};
use crate::error::{Error, Result};

/// Exact O(N²) pairwise acceleration:
///
/// ```text
/// a_i = G Σ_{j≠i} m_j (r_j - r_i) / (|r_j - r_i|² + ε²)^(3/2)
/// ```
///
/// The outer loop over `i` is parallelized with `rayon`; the inner loop is
/// sequential. `ε == 0.` is permitted provided no two particles coincide.
pub fn acc_bf(r: &[Vec3], m: &[f64], g: f64, eps: f64) -> Result<Vec<Vec3>> {
    if r.len() != m.len() {
        return Err(Error::InvalidInput(format!(
            "r and m must have equal length, got {} and {}",
            r.len(),
            m.len()
        )));
    }
    if eps < 0. {
        return Err(Error::InvalidInput(format!(
            "softening epsilon must be non-negative, got {eps}"
        )));
    }

    let eps_sq = eps * eps;
    let acc: Vec<Vec3> = r
        .par_iter()
        .enumerate()
        .map(|(i, &ri)| {
            let mut a = Vec3::new_zero();
            for (j, &rj) in r.iter().enumerate() {
                if i == j {
                    continue;
                }
                let diff = rj - ri;
                let dist_sq = diff.magnitude().powi(2);
                let denom = (dist_sq + eps_sq).powf(1.5);
                a += diff * (g * m[j] / denom);
            }
            a
        })
        .collect();

    Ok(acc)
}

/// An [`AccelKernel`] wrapping [`acc_bf`], bound to G, ε, and whether to
/// check the result for non-finite components.
pub struct BruteForceKernel {
    pub g: f64,
    pub eps: f64,
    pub detect_nonfinite: bool,
}

impl BruteForceKernel {
    pub fn new(g: f64, eps: f64) -> Self {
        Self {
            g,
            eps,
            detect_nonfinite: true,
        }
    }
}

impl AccelKernel for BruteForceKernel {
    fn compute(&self, r: &[Vec3], m: &[f64]) -> Result<Vec<Vec3>> {
        let acc = acc_bf(r, m, self.g, self.eps)?;
        if self.detect_nonfinite {
            check_finite(&acc)?;
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn single_body_has_zero_field() {
        let r = vec![Vec3::new_zero()];
        let m = vec![1.0];
        let a = acc_bf(&r, &m, 1.0, 0.).unwrap();
        assert_relative_eq!(a[0].magnitude(), 0., epsilon = 1e-12);
    }

    #[test]
    fn unit_pair_pulls_together() {
        let r = vec![Vec3::new_zero(), Vec3::new(1., 0., 0.)];
        let m = vec![1.0, 1.0];
        let a = acc_bf(&r, &m, 1.0, 0.).unwrap();
        assert_relative_eq!(a[0].x, 1., epsilon = 1e-12);
        assert_relative_eq!(a[1].x, -1., epsilon = 1e-12);
    }

    #[test]
    fn far_field_decouples() {
        let r = vec![Vec3::new_zero(), Vec3::new(1e10, 1e15, 1e15)];
        let m = vec![1.0, 1.0];
        let a = acc_bf(&r, &m, 1.0, 0.).unwrap();
        assert!(a[0].magnitude() < 1e-20);
        assert!(a[1].magnitude() < 1e-20);
    }

    #[test]
    fn zero_mass_bodies_exert_no_force() {
        let r = vec![Vec3::new_zero(), Vec3::new(1., 0., 0.)];
        let m = vec![0.0, 0.0];
        let a = acc_bf(&r, &m, 1.0, 0.).unwrap();
        assert_relative_eq!(a[0].magnitude(), 0., epsilon = 1e-12);
        assert_relative_eq!(a[1].magnitude(), 0., epsilon = 1e-12);
    }

    #[test]
    fn pairwise_forces_are_symmetric() {
        // m_i a_i^(j) + m_j a_j^(i) = 0 for every pair; aggregate momentum
        // change is zero.
        let r = vec![
            Vec3::new(0., 0., 0.),
            Vec3::new(2., 0., 0.),
            Vec3::new(0., 3., 1.),
            Vec3::new(-1., -1., 2.),
        ];
        let m = vec![1.0, 2.5, 0.7, 4.2];
        let a = acc_bf(&r, &m, 1.0, 0.).unwrap();

        let mut total = Vec3::new_zero();
        for (ai, &mi) in a.iter().zip(&m) {
            total += *ai * mi;
        }
        assert_relative_eq!(total.magnitude(), 0., epsilon = 1e-9);
    }

    #[test]
    fn rejects_negative_softening() {
        let r = vec![Vec3::new_zero()];
        let m = vec![1.0];
        assert!(acc_bf(&r, &m, 1.0, -1.0).is_err());
    }
}

//! Acceleration kernels: the interchangeable providers the leapfrog
//! integrator drives.
//!
//! Both kernels are exposed two ways: as a free function (`acc_bf`, `acc_bh`)
//! and as a small struct implementing [`AccelKernel`], which is what the
//! integrator and driver actually hold. The struct is a thin closure over G,
//! ε, and (for the tree kernel) θ and the root cube.

pub mod brute_force;
pub mod octree;

pub use brute_force::{acc_bf, BruteForceKernel};
pub use octree::{acc_bh, BarnesHutKernel, BhConfig, Cube};

use lin_alg::f64::Vec3;

use crate::error::Result;

/// A capability that computes per-body accelerations from positions and
/// masses. The integrator depends only on this trait; it does not know or
/// care which kernel produced the accelerations.
pub trait AccelKernel: Send + Sync {
    fn compute(&self, r: &[Vec3], m: &[f64]) -> Result<Vec<Vec3>>;
}

/// Scans a freshly computed acceleration buffer for NaN/infinity. Used by
/// both kernels when `detect_nonfinite` is enabled.
pub(crate) fn check_finite(a: &[Vec3]) -> Result<()> {
    for acc in a {
        if !acc.x.is_finite() || !acc.y.is_finite() || !acc.z.is_finite() {
            return Err(crate::error::Error::Numerical(
                "kernel produced a non-finite acceleration".to_string(),
            ));
        }
    }
    Ok(())
}

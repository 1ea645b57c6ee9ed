//! The particle store (`Space`): owns the parallel position, velocity, and
//! mass arrays for all bodies in a run.

use lin_alg::f64::Vec3;

use crate::error::{Error, Result};

/// An ordered collection of point bodies.
///
/// `r`, `v`, and `m` always share a leading dimension. A body's index is
/// assigned at insertion (the old length of the store) and stays stable
/// across every operation except [`Space::clear`]. There is no removal of
/// individual bodies; `append_one`/`append_bulk` are the only growth
/// operations.
#[derive(Debug, Default, Clone)]
pub struct Space {
    r: Vec<Vec3>,
    v: Vec<Vec3>,
    m: Vec<f64>,
}

impl Space {
    /// Constructs an empty space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single body, returning its stable index (the prior length).
    pub fn append_one(&mut self, r: Vec3, v: Vec3, m: f64) -> Result<usize> {
        if m < 0. {
            return Err(Error::InvalidInput(format!(
                "mass must be non-negative, got {m}"
            )));
        }
        let id = self.r.len();
        self.r.push(r);
        self.v.push(v);
        self.m.push(m);
        Ok(id)
    }

    /// Appends `K` bodies at once. `r`, `v`, and `m` must share length `K`.
    pub fn append_bulk(&mut self, r: &[Vec3], v: &[Vec3], m: &[f64]) -> Result<()> {
        if r.len() != v.len() || r.len() != m.len() {
            return Err(Error::InvalidInput(format!(
                "mismatched bulk-append shapes: r={}, v={}, m={}",
                r.len(),
                v.len(),
                m.len()
            )));
        }
        if let Some(bad) = m.iter().find(|&&mass| mass < 0.) {
            return Err(Error::InvalidInput(format!(
                "mass must be non-negative, got {bad}"
            )));
        }
        self.r.extend_from_slice(r);
        self.v.extend_from_slice(v);
        self.m.extend_from_slice(m);
        Ok(())
    }

    /// Resets the store to empty. Stable indices are not preserved across a
    /// clear.
    pub fn clear(&mut self) {
        self.r.clear();
        self.v.clear();
        self.m.clear();
    }

    /// Number of bodies currently in the store.
    pub fn len(&self) -> usize {
        self.m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.m.is_empty()
    }

    /// Raw contiguous view of positions, for kernels to consume without
    /// copying.
    pub fn positions(&self) -> &[Vec3] {
        &self.r
    }

    /// Raw contiguous view of velocities.
    pub fn velocities(&self) -> &[Vec3] {
        &self.v
    }

    /// Raw contiguous view of masses.
    pub fn masses(&self) -> &[f64] {
        &self.m
    }

    /// Mutable view of positions, used by the integrator's drift step.
    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.r
    }

    /// Mutable view of velocities, used by the integrator's kick step.
    pub fn velocities_mut(&mut self) -> &mut [Vec3] {
        &mut self.v
    }

    /// Disjoint mutable-positions/read-only-velocities view for the
    /// integrator's drift step, which needs both at once.
    pub fn drift_views(&mut self) -> (&mut [Vec3], &[Vec3]) {
        (&mut self.r, &self.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_one_assigns_stable_indices() {
        let mut space = Space::new();
        let id0 = space.append_one(Vec3::new_zero(), Vec3::new_zero(), 1.).unwrap();
        let id1 = space.append_one(Vec3::new(1., 0., 0.), Vec3::new_zero(), 2.).unwrap();
        assert_eq!(id0, 0);
        assert_eq!(id1, 1);
        assert_eq!(space.len(), 2);
    }

    #[test]
    fn append_one_rejects_negative_mass() {
        let mut space = Space::new();
        let err = space.append_one(Vec3::new_zero(), Vec3::new_zero(), -1.);
        assert!(err.is_err());
    }

    #[test]
    fn append_bulk_rejects_mismatched_shapes() {
        let mut space = Space::new();
        let r = vec![Vec3::new_zero(); 2];
        let v = vec![Vec3::new_zero(); 2];
        let m = vec![1.0; 3];
        assert!(space.append_bulk(&r, &v, &m).is_err());
    }

    #[test]
    fn clear_resets_len() {
        let mut space = Space::new();
        space.append_one(Vec3::new_zero(), Vec3::new_zero(), 1.).unwrap();
        space.clear();
        assert_eq!(space.len(), 0);
        assert!(space.is_empty());
    }
}

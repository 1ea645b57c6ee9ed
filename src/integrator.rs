//! The leapfrog (kick-drift-kick, velocity-Verlet) time integrator (C5).
//!
//! The integrator holds only the previous acceleration buffer and drives
//! whichever [`AccelKernel`] it is handed; it never constructs one itself.

use lin_alg::f64::Vec3;

use crate::error::Result;
use crate::kernel::AccelKernel;
use crate::space::Space;

/// Symplectic leapfrog stepper. Carries the acceleration from the previous
/// step so each call to [`Leapfrog::step`] needs only one new kernel
/// evaluation.
pub struct Leapfrog {
    a_prev: Vec<Vec3>,
}

impl Leapfrog {
    /// Primes the integrator by evaluating the kernel once at the system's
    /// initial state.
    pub fn new(r: &[Vec3], m: &[f64], kernel: &dyn AccelKernel) -> Result<Self> {
        let a_prev = kernel.compute(r, m)?;
        Ok(Self { a_prev })
    }

    /// Advances `space` by one step of size `dt`:
    ///
    /// ```text
    /// r(t+dt) = r(t) + v(t) dt + ½ a(t) dt²
    /// a(t+dt) = kernel(r(t+dt))
    /// v(t+dt) = v(t) + ½ (a(t) + a(t+dt)) dt
    /// ```
    pub fn step(&mut self, space: &mut Space, dt: f64, kernel: &dyn AccelKernel) -> Result<()> {
        {
            let (r, v) = space.drift_views();
            for i in 0..r.len() {
                r[i] += v[i] * dt + self.a_prev[i] * (0.5 * dt * dt);
            }
        }

        let a_new = kernel.compute(space.positions(), space.masses())?;

        {
            let v = space.velocities_mut();
            for i in 0..v.len() {
                v[i] += (self.a_prev[i] + a_new[i]) * (0.5 * dt);
            }
        }

        self.a_prev = a_new;
        Ok(())
    }

    /// The acceleration buffer computed by the most recent step (or the
    /// priming call), exposed for recorded-quantity dispatch that wants it
    /// without an extra kernel evaluation.
    pub fn last_acceleration(&self) -> &[Vec3] {
        &self.a_prev
    }
}

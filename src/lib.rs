//! Gravitational N-body engine.
//!
//! Two interchangeable acceleration kernels, an exact all-pairs kernel
//! ([`kernel::BruteForceKernel`]) and an approximate Barnes-Hut octree
//! ([`kernel::BarnesHutKernel`]), drive a symplectic leapfrog integrator
//! ([`integrator::Leapfrog`]). [`driver::Driver`] orchestrates a full run:
//! initial acceleration, the step loop, and periodic emission of recorded
//! quantities to an HDF5 file.
//!
//! ```text
//! Space --(r, v, m)--> Leapfrog --(kernel: BruteForce | BarnesHut)--> Driver --> HDF5
//! ```

pub mod driver;
pub mod error;
pub mod integrator;
pub mod kernel;
pub mod physics;
pub mod result;
pub mod space;

pub use driver::{Driver, RecordedQuantity, SimConfig, SimKind};
pub use error::{Error, Result};
pub use integrator::Leapfrog;
pub use kernel::{acc_bf, acc_bh, AccelKernel, BarnesHutKernel, BhConfig, BruteForceKernel, Cube};
pub use result::ResultReader;
pub use space::Space;

//! Crate-wide error taxonomy.
//!
//! Every kernel, reducer, and the driver itself reports failures through this
//! single type. Nothing is recovered silently: a kernel failure aborts the
//! run that invoked it (see [`crate::driver`]).

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Mismatched array shapes, negative mass, negative θ or ε, non-positive
    /// `n_steps`/`Δt`, or an unrecognized recorded-quantity name.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A particle lies outside the octree's root cube, or two particles are
    /// coincident in a way the tree kernel was not told to tolerate.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// The output sink could not be opened or written, or an input file is
    /// not a recognized result file.
    #[error("I/O error: {0}")]
    Io(String),

    /// A kernel produced a non-finite acceleration (NaN or infinity).
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<hdf5::Error> for Error {
    fn from(err: hdf5::Error) -> Self {
        Self::Io(err.to_string())
    }
}

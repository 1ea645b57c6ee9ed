//! The simulation driver (C6): orchestrates one run end to end.
//!
//! A recorded-quantity registry is built at construction time, datasets are
//! allocated up front, and the step loop writes rows on a per-quantity
//! period. Lifecycle events are logged via `log::info!`.

use std::time::Instant;

use lin_alg::f64::Vec3;

use crate::error::{Error, Result};
use crate::integrator::Leapfrog;
use crate::kernel::{AccelKernel, BarnesHutKernel, BruteForceKernel, Cube};
use crate::physics::{angular_momentum, total_energy};
use crate::result::{ResultDesc, ResultWriter, RunMetadata};
use crate::space::Space;

/// Which acceleration kernel backs a run, with its bound parameters. One
/// driver parameterized by the provider, not a class hierarchy per kernel.
#[derive(Clone, Debug)]
pub enum SimKind {
    BruteForce,
    BarnesHut {
        root_center: Vec3,
        root_width: f64,
        theta: f64,
    },
}

/// One of the four quantities a run can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordedQuantity {
    Position,
    Velocity,
    Energy,
    AngularMomentum,
}

impl RecordedQuantity {
    fn default_frequency(self) -> u32 {
        match self {
            RecordedQuantity::Position | RecordedQuantity::Velocity => 1,
            RecordedQuantity::Energy | RecordedQuantity::AngularMomentum => 0,
        }
    }
}

/// Driver configuration, fixed for the lifetime of a run.
pub struct SimConfig {
    pub kind: SimKind,
    pub g: f64,
    pub eps: f64,
    pub output_path: String,
    /// Emission period per quantity; entries absent here keep their default
    /// (position/velocity = 1, energy/angular_momentum = 0).
    pub frequencies: Vec<(RecordedQuantity, u32)>,
}

impl SimConfig {
    fn frequency_of(&self, q: RecordedQuantity) -> u32 {
        self.frequencies
            .iter()
            .find(|(rq, _)| *rq == q)
            .map(|(_, f)| *f)
            .unwrap_or_else(|| q.default_frequency())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Configured,
    Running,
    Completed,
    Failed,
}

/// Orchestrates one simulation run. Owns the [`Space`] exclusively for the
/// run's duration.
pub struct Driver {
    config: SimConfig,
    space: Space,
    state: State,
}

impl Driver {
    pub fn new(config: SimConfig, space: Space) -> Result<Self> {
        if config.g.is_nan() {
            return Err(Error::InvalidInput("G must not be NaN".to_string()));
        }
        if config.eps < 0. {
            return Err(Error::InvalidInput(format!(
                "softening epsilon must be non-negative, got {}",
                config.eps
            )));
        }
        if let SimKind::BarnesHut { theta, .. } = &config.kind {
            if *theta < 0. {
                return Err(Error::InvalidInput(format!(
                    "opening angle theta must be non-negative, got {theta}"
                )));
            }
        }
        Ok(Self {
            config,
            space,
            state: State::Configured,
        })
    }

    fn build_kernel(&self) -> Box<dyn AccelKernel> {
        match &self.config.kind {
            SimKind::BruteForce => {
                Box::new(BruteForceKernel::new(self.config.g, self.config.eps))
            }
            SimKind::BarnesHut {
                root_center,
                root_width,
                theta,
            } => {
                let root = Cube::new(*root_center, *root_width);
                Box::new(BarnesHutKernel::new(root, self.config.g, self.config.eps, *theta))
            }
        }
    }

    /// Runs the simulation for `n_steps` of size `dt`, writing recorded
    /// quantities to the configured output sink. May be called only once per
    /// driver instance.
    pub fn run(&mut self, n_steps: u64, dt: f64) -> Result<()> {
        if self.state != State::Configured {
            return Err(Error::InvalidInput(
                "run() may only be called once per driver instance".to_string(),
            ));
        }
        if n_steps == 0 {
            return Err(Error::InvalidInput("n_steps must be positive".to_string()));
        }
        if dt <= 0. {
            return Err(Error::InvalidInput(format!(
                "time step must be positive, got {dt}"
            )));
        }

        self.state = State::Running;
        let start = Instant::now();
        let n = self.space.len();

        log::info!(
            "simulation - type={}, n_particles={}, n_steps={}",
            self.config.kind.type_name(),
            n,
            n_steps
        );

        let quantities = [
            RecordedQuantity::Position,
            RecordedQuantity::Velocity,
            RecordedQuantity::Energy,
            RecordedQuantity::AngularMomentum,
        ];
        let descs: Vec<ResultDesc> = quantities
            .iter()
            .map(|&q| ResultDesc {
                name: q.name(),
                row_shape: q.row_shape(n),
                frequency: self.config.frequency_of(q),
            })
            .collect();

        log::info!("creating datasets");
        let metadata = RunMetadata {
            number_of_steps: n_steps,
            time_step_size: dt,
            g: self.config.g,
            epsilon: self.config.eps,
            number_of_particles: n as u64,
            simulation_type: self.config.kind.type_name(),
            start_time: unix_time_secs(),
        };
        let writer = match ResultWriter::create(&self.config.output_path, n_steps as usize, descs, &metadata) {
            Ok(w) => w,
            Err(e) => {
                self.state = State::Failed;
                return Err(e);
            }
        };

        let run_result = self.run_inner(n_steps, dt, &writer);
        match run_result {
            Ok(()) => {
                let total = start.elapsed().as_secs_f64();
                writer.finalize(unix_time_secs(), total)?;
                log::info!("end simulation, elapsed={total:.3}s");
                self.state = State::Completed;
                Ok(())
            }
            Err(e) => {
                log::info!("simulation aborted: {e}");
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    fn run_inner(&mut self, n_steps: u64, dt: f64, writer: &ResultWriter) -> Result<()> {
        log::info!("writing initial data");
        self.write_results(writer, 0)?;

        log::info!("calculating initial accelerations");
        let kernel = self.build_kernel();
        let mut leapfrog = Leapfrog::new(self.space.positions(), self.space.masses(), kernel.as_ref())?;

        log::info!("start simulation");
        for step in 1..=n_steps {
            leapfrog.step(&mut self.space, dt, kernel.as_ref())?;
            self.write_results(writer, step)?;
        }

        Ok(())
    }

    fn write_results(&self, writer: &ResultWriter, step_num: u64) -> Result<()> {
        for desc in writer.descs() {
            if desc.frequency == 0 {
                continue;
            }
            if step_num % desc.frequency as u64 != 0 {
                continue;
            }
            let row = (step_num / desc.frequency as u64) as usize;
            match desc.name {
                "position" => writer.write_vec3_rows("position", row, self.space.positions())?,
                "velocity" => writer.write_vec3_rows("velocity", row, self.space.velocities())?,
                "energy" => {
                    let e = total_energy(
                        self.space.positions(),
                        self.space.velocities(),
                        self.space.masses(),
                        self.config.g,
                        self.config.eps,
                    );
                    writer.write_scalar_row("energy", row, e)?;
                }
                "angular_momentum" => {
                    let l = angular_momentum(
                        self.space.positions(),
                        self.space.velocities(),
                        self.space.masses(),
                    );
                    writer.write_row_1d("angular_momentum", row, &[l.x, l.y, l.z])?;
                }
                other => {
                    return Err(Error::InvalidInput(format!(
                        "unrecognized recorded quantity {other:?}"
                    )))
                }
            }
        }
        Ok(())
    }
}

fn unix_time_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultReader;
    use tempfile::tempdir;

    #[test]
    fn brute_force_run_round_trips_through_hdf5() {
        use crate::kernel::BruteForceKernel;
        use crate::physics::{angular_momentum, total_energy};

        let g = 1.0;
        let eps = 1e-3;
        let dt = 1e-3;
        let n_steps = 10;

        let r0 = vec![Vec3::new_zero(), Vec3::new(1., 0., 0.)];
        let v0 = vec![Vec3::new_zero(), Vec3::new(0., 0.5, 0.)];
        let m = vec![1.0, 1.0];

        let mut space = Space::new();
        space.append_bulk(&r0, &v0, &m).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("run.h5");
        let path_str = path.to_str().unwrap().to_string();

        let config = SimConfig {
            kind: SimKind::BruteForce,
            g,
            eps,
            output_path: path_str.clone(),
            frequencies: vec![
                (RecordedQuantity::Energy, 1),
                (RecordedQuantity::AngularMomentum, 1),
            ],
        };
        let mut driver = Driver::new(config, space).unwrap();
        driver.run(n_steps, dt).unwrap();

        // Independently replay the same steps to get the expected final
        // state, so the round-trip check compares against more than row 0.
        let mut expected_space = Space::new();
        expected_space.append_bulk(&r0, &v0, &m).unwrap();
        let kernel = BruteForceKernel::new(g, eps);
        let mut leapfrog =
            Leapfrog::new(expected_space.positions(), expected_space.masses(), &kernel).unwrap();
        for _ in 0..n_steps {
            leapfrog.step(&mut expected_space, dt, &kernel).unwrap();
        }
        let expected_final_r = expected_space.positions().to_vec();
        let expected_final_v = expected_space.velocities().to_vec();
        let expected_final_e = total_energy(
            expected_space.positions(),
            expected_space.velocities(),
            expected_space.masses(),
            g,
            eps,
        );
        let expected_final_l = angular_momentum(
            expected_space.positions(),
            expected_space.velocities(),
            expected_space.masses(),
        );

        let reader = ResultReader::open(&path_str).unwrap();
        assert_eq!(reader.number_of_steps().unwrap(), n_steps);
        assert_eq!(reader.number_of_particles().unwrap(), 2);
        assert_eq!(reader.simulation_type().unwrap(), "Brute force");
        assert_eq!(reader.time_step_size().unwrap(), dt);

        let names = reader.result_names().unwrap();
        assert!(names.contains(&"position".to_string()));
        assert!(names.contains(&"velocity".to_string()));
        assert!(names.contains(&"energy".to_string()));
        assert!(names.contains(&"angular_momentum".to_string()));

        let row0 = reader.get_positions("position", 0).unwrap();
        assert_eq!(row0, r0);

        let last_row = (n_steps) as usize;
        let final_r = reader.get_positions("position", last_row).unwrap();
        let final_v = reader.get_positions("velocity", last_row).unwrap();
        assert_eq!(final_r, expected_final_r);
        assert_eq!(final_v, expected_final_v);

        let final_e = reader.get_scalar("energy", last_row).unwrap();
        let final_l = reader.get_vec3("angular_momentum", last_row).unwrap();
        assert_eq!(final_e, expected_final_e);
        assert_eq!(final_l, expected_final_l);
    }

    #[test]
    fn rejects_zero_steps() {
        let mut space = Space::new();
        space.append_one(Vec3::new_zero(), Vec3::new_zero(), 1.0).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.h5");
        let config = SimConfig {
            kind: SimKind::BruteForce,
            g: 1.0,
            eps: 1e-3,
            output_path: path.to_str().unwrap().to_string(),
            frequencies: vec![],
        };
        let mut driver = Driver::new(config, space).unwrap();
        assert!(driver.run(0, 1e-3).is_err());
    }
}

//! Result persistence: the on-disk hierarchical dataset format, implemented
//! as a real HDF5 file rather than a hand-rolled binary layout.
//!
//! `info` and `results` top-level groups, per-dataset `frequency`
//! attributes, and a `ResultReader` exposing the list of recorded names, a
//! metadata accessor, and per-row getters.

use hdf5::types::VarLenUnicode;
use hdf5::{File, Group};
use ndarray::Array2;

use crate::driver::{RecordedQuantity, SimKind};
use crate::error::{Error, Result};

/// Describes one recorded quantity's row shape and emission period.
pub(crate) struct ResultDesc {
    pub name: &'static str,
    pub row_shape: Vec<usize>,
    pub frequency: u32,
}

impl RecordedQuantity {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            RecordedQuantity::Position => "position",
            RecordedQuantity::Velocity => "velocity",
            RecordedQuantity::Energy => "energy",
            RecordedQuantity::AngularMomentum => "angular_momentum",
        }
    }

    pub(crate) fn row_shape(&self, n: usize) -> Vec<usize> {
        match self {
            RecordedQuantity::Position | RecordedQuantity::Velocity => vec![n, 3],
            RecordedQuantity::Energy => vec![1],
            RecordedQuantity::AngularMomentum => vec![3],
        }
    }
}

/// Per-run metadata recorded in the `info` group.
pub(crate) struct RunMetadata {
    pub number_of_steps: u64,
    pub time_step_size: f64,
    pub g: f64,
    pub epsilon: f64,
    pub number_of_particles: u64,
    pub simulation_type: &'static str,
    pub start_time: f64,
}

impl SimKind {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            SimKind::BruteForce => "Brute force",
            SimKind::BarnesHut { .. } => "Barnes-Hut",
        }
    }
}

/// Internal writer the driver uses during a run. Owns the open HDF5 file for
/// the run's lifetime.
pub(crate) struct ResultWriter {
    file: File,
    descs: Vec<ResultDesc>,
}

impl ResultWriter {
    pub(crate) fn create(
        path: &str,
        n: usize,
        descs: Vec<ResultDesc>,
        metadata: &RunMetadata,
    ) -> Result<Self> {
        let file = File::create(path)?;

        let info = file.create_group("info")?;
        write_int_attr(&info, "number_of_steps", metadata.number_of_steps)?;
        write_scalar_attr(&info, "time_step_size", metadata.time_step_size)?;
        write_scalar_attr(&info, "G", metadata.g)?;
        write_scalar_attr(&info, "epsilon", metadata.epsilon)?;
        write_int_attr(&info, "number_of_particles", metadata.number_of_particles)?;
        write_str_attr(&info, "simulation_type", metadata.simulation_type)?;
        write_scalar_attr(&info, "start_time", metadata.start_time)?;

        let results = file.create_group("results")?;
        for desc in &descs {
            if desc.frequency == 0 {
                continue;
            }
            let n_rows = n / desc.frequency as usize + 1;
            let mut shape = vec![n_rows];
            shape.extend_from_slice(&desc.row_shape);
            let dataset = results
                .new_dataset::<f64>()
                .shape(shape)
                .create(desc.name)?;
            dataset
                .new_attr::<u32>()
                .create("frequency")?
                .write_scalar(&desc.frequency)?;
        }

        Ok(Self { file, descs })
    }

    fn dataset(&self, name: &str) -> Result<hdf5::Dataset> {
        self.file
            .group("results")?
            .dataset(name)
            .map_err(|e| Error::Io(e.to_string()))
    }

    pub(crate) fn write_row_1d(&self, name: &str, row: usize, values: &[f64]) -> Result<()> {
        let ds = self.dataset(name)?;
        ds.write_slice(values, (row, ..))?;
        Ok(())
    }

    pub(crate) fn write_scalar_row(&self, name: &str, row: usize, value: f64) -> Result<()> {
        let ds = self.dataset(name)?;
        ds.write_slice(&[value], (row, ..))?;
        Ok(())
    }

    pub(crate) fn write_vec3_rows(
        &self,
        name: &str,
        row: usize,
        values: &[lin_alg::f64::Vec3],
    ) -> Result<()> {
        let ds = self.dataset(name)?;
        let mut arr = Array2::<f64>::zeros((values.len(), 3));
        for (i, v) in values.iter().enumerate() {
            arr[[i, 0]] = v.x;
            arr[[i, 1]] = v.y;
            arr[[i, 2]] = v.z;
        }
        ds.write_slice(&arr, (row, .., ..))?;
        Ok(())
    }

    pub(crate) fn finalize(&self, end_time: f64, total_time: f64) -> Result<()> {
        let info = self.file.group("info")?;
        write_scalar_attr(&info, "end_time", end_time)?;
        write_scalar_attr(&info, "total_time", total_time)?;
        Ok(())
    }

    pub(crate) fn descs(&self) -> &[ResultDesc] {
        &self.descs
    }
}

fn write_scalar_attr(group: &Group, name: &str, value: f64) -> Result<()> {
    group.new_attr::<f64>().create(name)?.write_scalar(&value)?;
    Ok(())
}

fn write_int_attr(group: &Group, name: &str, value: u64) -> Result<()> {
    group.new_attr::<u64>().create(name)?.write_scalar(&value)?;
    Ok(())
}

fn write_str_attr(group: &Group, name: &str, value: &str) -> Result<()> {
    let v: VarLenUnicode = value.parse().map_err(|_| {
        Error::InvalidInput(format!("could not encode attribute string {value:?}"))
    })?;
    group
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&v)?;
    Ok(())
}

/// Read-only handle to a persisted run.
pub struct ResultReader {
    file: File,
}

impl ResultReader {
    /// Opens `path` for reading. Fails with [`Error::Io`] if `path` is not an
    /// HDF5 file or lacks the `info`/`results` groups.
    pub fn open(path: &str) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Io(format!("not a recognized result file: {e}")))?;
        if file.group("info").is_err() || file.group("results").is_err() {
            return Err(Error::Io(format!(
                "{path} is not a recognized result file: missing info/results groups"
            )));
        }
        Ok(Self { file })
    }

    pub fn result_names(&self) -> Result<Vec<String>> {
        Ok(self.file.group("results")?.member_names()?)
    }

    pub fn num_rows(&self, name: &str) -> Result<usize> {
        let ds = self.file.group("results")?.dataset(name)?;
        Ok(ds.shape()[0])
    }

    pub fn frequency(&self, name: &str) -> Result<u32> {
        let ds = self.file.group("results")?.dataset(name)?;
        Ok(ds.attr("frequency")?.read_scalar()?)
    }

    pub fn get_scalar(&self, name: &str, step_num: usize) -> Result<f64> {
        let ds = self.file.group("results")?.dataset(name)?;
        let row: Vec<f64> = ds.read_slice_1d((step_num, ..))?.to_vec();
        Ok(row[0])
    }

    pub fn get_vec3(&self, name: &str, step_num: usize) -> Result<lin_alg::f64::Vec3> {
        let ds = self.file.group("results")?.dataset(name)?;
        let row: Vec<f64> = ds.read_slice_1d((step_num, ..))?.to_vec();
        Ok(lin_alg::f64::Vec3::new(row[0], row[1], row[2]))
    }

    pub fn get_positions(&self, name: &str, step_num: usize) -> Result<Vec<lin_alg::f64::Vec3>> {
        let ds = self.file.group("results")?.dataset(name)?;
        let arr: Array2<f64> = ds.read_slice_2d((step_num, .., ..))?;
        Ok(arr
            .rows()
            .into_iter()
            .map(|row| lin_alg::f64::Vec3::new(row[0], row[1], row[2]))
            .collect())
    }

    pub fn number_of_steps(&self) -> Result<u64> {
        Ok(self.file.group("info")?.attr("number_of_steps")?.read_scalar()?)
    }

    pub fn time_step_size(&self) -> Result<f64> {
        Ok(self.file.group("info")?.attr("time_step_size")?.read_scalar()?)
    }

    pub fn number_of_particles(&self) -> Result<u64> {
        Ok(self
            .file
            .group("info")?
            .attr("number_of_particles")?
            .read_scalar()?)
    }

    pub fn simulation_type(&self) -> Result<String> {
        let v: VarLenUnicode = self.file.group("info")?.attr("simulation_type")?.read_scalar()?;
        Ok(v.to_string())
    }
}

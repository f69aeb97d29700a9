use crate::Utils::logger::{save_matrix_to_csv, save_matrix_to_file};
use crate::Utils::plots::{phase_portrait, plots};
use crate::numerical::ode_error::OdeError;
use nalgebra::{DMatrix, DVector};
use std::path::Path;

/// accepted point of the solution
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub y: DVector<f64>,
}

/// Ordered accepted samples of one run. Read-only once handed off by the recorder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

impl Trajectory {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// dimension of the state, 0 for an empty trajectory
    pub fn dim(&self) -> usize {
        self.samples.first().map_or(0, |s| s.y.len())
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.t).collect()
    }

    /// values of variable `index` over time, `None` if the index is out of range
    pub fn component(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.dim() {
            return None;
        }
        Some(self.samples.iter().map(|s| s.y[index]).collect())
    }

    /// time column and a (samples x variables) matrix
    pub fn to_matrices(&self) -> (DVector<f64>, DMatrix<f64>) {
        let rows = self.samples.len();
        let cols = self.dim();
        let t_res = DVector::from_iterator(rows, self.samples.iter().map(|s| s.t));
        let mut flat_vec: Vec<f64> = Vec::with_capacity(rows * cols);
        for sample in self.samples.iter() {
            flat_vec.extend(sample.y.iter());
        }
        let y_res = DMatrix::from_row_slice(rows, cols, &flat_vec);
        (t_res, y_res)
    }

    /// default column names x_0 .. x_{n-1}
    pub fn variable_names(&self) -> Vec<String> {
        (0..self.dim()).map(|i| format!("x_{}", i)).collect()
    }

    /// CSV with a `Time` column followed by one column per variable
    pub fn save_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), OdeError> {
        let (t_res, y_res) = self.to_matrices();
        save_matrix_to_csv(&y_res, &self.variable_names(), path, &t_res, "Time")
    }

    /// tab separated text table with the same layout as the CSV export
    pub fn save_to_txt<P: AsRef<Path>>(&self, path: P) -> Result<(), OdeError> {
        let (t_res, y_res) = self.to_matrices();
        save_matrix_to_file(&y_res, &self.variable_names(), path, &t_res, "Time")
    }

    /// one PNG per variable plus a phase portrait when there are at least two variables
    pub fn plot<P: AsRef<Path>>(&self, dir: P, title: &str) -> Result<(), OdeError> {
        let (t_res, y_res) = self.to_matrices();
        if t_res.is_empty() {
            return Ok(());
        }
        plots(dir.as_ref(), "Time", &self.variable_names(), &t_res, &y_res, title)?;
        if y_res.ncols() >= 2 {
            phase_portrait(dir.as_ref(), &y_res, title)?;
        }
        Ok(())
    }
}

/// Append-only collector of accepted samples.
#[derive(Debug, Default)]
pub struct TrajectoryRecorder {
    trajectory: Trajectory,
}

impl TrajectoryRecorder {
    pub fn new() -> TrajectoryRecorder {
        TrajectoryRecorder::default()
    }

    pub fn with_capacity(capacity: usize) -> TrajectoryRecorder {
        TrajectoryRecorder {
            trajectory: Trajectory {
                samples: Vec::with_capacity(capacity),
            },
        }
    }

    pub fn record(&mut self, t: f64, y: DVector<f64>) {
        debug_assert!(
            self.trajectory.last().is_none_or(|s| t > s.t),
            "samples must grow in t"
        );
        self.trajectory.samples.push(Sample { t, y });
    }

    pub fn samples(&self) -> &[Sample] {
        self.trajectory.samples()
    }

    pub fn len(&self) -> usize {
        self.trajectory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty()
    }

    pub fn finish(self) -> Trajectory {
        self.trajectory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded() -> Trajectory {
        let mut recorder = TrajectoryRecorder::new();
        recorder.record(0.0, DVector::from_vec(vec![1.0, 0.0]));
        recorder.record(0.5, DVector::from_vec(vec![0.5, -1.0]));
        recorder.record(1.0, DVector::from_vec(vec![0.0, -2.0]));
        recorder.finish()
    }

    #[test]
    fn test_projection() {
        let trajectory = recorded();
        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory.dim(), 2);
        assert_eq!(trajectory.times(), vec![0.0, 0.5, 1.0]);
        assert_eq!(trajectory.component(1).unwrap(), vec![0.0, -1.0, -2.0]);
        assert!(trajectory.component(2).is_none());
    }

    #[test]
    fn test_to_matrices_layout() {
        let (t, y) = recorded().to_matrices();
        assert_eq!(t.len(), 3);
        assert_eq!(y.shape(), (3, 2));
        assert_eq!(y[(1, 0)], 0.5);
        assert_eq!(y[(2, 1)], -2.0);
    }

    #[test]
    fn test_empty_trajectory() {
        let trajectory = TrajectoryRecorder::new().finish();
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.dim(), 0);
        assert!(trajectory.component(0).is_none());
        let (t, y) = trajectory.to_matrices();
        assert_eq!(t.len(), 0);
        assert_eq!(y.shape(), (0, 0));
    }

    #[test]
    fn test_save_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trajectory.csv");
        recorded().save_to_csv(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), "Time,x_0,x_1");
        assert_eq!(lines.next().unwrap(), "0,1,0");
        assert_eq!(content.lines().count(), 4);
    }
}

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use cdt_core::TimeValue;
use cdt_foliation::Geometry3;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// State of the chain after one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Pass number, starting at 1.
    pub pass: usize,
    /// Simplex counts after the pass.
    pub geometry: Geometry3,
    /// Bulk action after the pass.
    pub action: f64,
    /// Proposals accepted during the pass.
    pub accepted: u64,
    /// Proposals made during the pass.
    pub attempted: u64,
    /// Spacelike triangles on each timeslice after the pass.
    #[serde(default)]
    pub volume_per_timeslice: BTreeMap<TimeValue, usize>,
}

/// How much of configuration space the chain visited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    /// Number of distinct simplex count vectors seen.
    pub unique_geometries: usize,
    /// Mean cell count.
    pub mean_n3: f64,
    /// Variance of the cell count.
    pub n3_variance: f64,
    /// Mean bulk action.
    pub mean_action: f64,
    /// Variance of the bulk action.
    pub action_variance: f64,
}

impl CoverageMetrics {
    /// Returns an empty coverage descriptor.
    pub fn empty() -> Self {
        Self {
            unique_geometries: 0,
            mean_n3: 0.0,
            n3_variance: 0.0,
            mean_action: 0.0,
            action_variance: 0.0,
        }
    }
}

/// Collects per-pass samples.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    samples: Vec<MetricSample>,
    geometries: IndexSet<Geometry3>,
}

impl MetricsRecorder {
    /// Creates a new recorder instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sample.
    pub fn push_sample(&mut self, sample: MetricSample) {
        self.geometries.insert(sample.geometry);
        self.samples.push(sample);
    }

    /// Returns an immutable view over the recorded samples.
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Computes coverage metrics from the recorded data.
    pub fn coverage(&self) -> CoverageMetrics {
        if self.samples.is_empty() {
            return CoverageMetrics::empty();
        }
        let volumes: Vec<f64> = self
            .samples
            .iter()
            .map(|sample| sample.geometry.n3 as f64)
            .collect();
        let actions: Vec<f64> = self.samples.iter().map(|sample| sample.action).collect();
        let (mean_n3, n3_variance) = mean_and_variance(&volumes);
        let (mean_action, action_variance) = mean_and_variance(&actions);
        CoverageMetrics {
            unique_geometries: self.geometries.len(),
            mean_n3,
            n3_variance,
            mean_action,
            action_variance,
        }
    }

    /// Writes the recorded samples to a CSV file.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        writeln!(
            file,
            "pass,n3,n3_31,n3_13,n3_22,n2,n1,n1_tl,n1_sl,n0,action,accepted,attempted,volume_per_timeslice"
        )?;
        for sample in &self.samples {
            let g = &sample.geometry;
            writeln!(
                file,
                "{},{},{},{},{},{},{},{},{},{},{:.6},{},{},{}",
                sample.pass,
                g.n3,
                g.n3_31,
                g.n3_13,
                g.n3_22,
                g.n2,
                g.n1,
                g.n1_tl,
                g.n1_sl,
                g.n0,
                sample.action,
                sample.accepted,
                sample.attempted,
                format_volumes(&sample.volume_per_timeslice)
            )?;
        }
        Ok(())
    }
}

/// `t:count` pairs joined by `;`, in timeslice order.
fn format_volumes(volumes: &BTreeMap<TimeValue, usize>) -> String {
    volumes
        .iter()
        .map(|(time, count)| format!("{time}:{count}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = if values.len() > 1 {
        let mean_sq = values.iter().map(|&v| v * v).sum::<f64>() / values.len() as f64;
        (mean_sq - mean * mean).max(0.0)
    } else {
        0.0
    };
    (mean, variance)
}

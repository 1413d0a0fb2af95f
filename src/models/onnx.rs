//! ONNX Runtime classifier

use super::Classifier;
use crate::error::{ShieldError, ShieldResult};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// Classifier backed by an ONNX Runtime session.
///
/// The exported graph must produce a float probability tensor of shape
/// `[n, 2]` (class 1 is fraud) or `[n, 1]`.
pub struct OnnxClassifier {
    /// ONNX Runtime session; `run` needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    width: usize,
}

impl OnnxClassifier {
    /// Load an ONNX model expecting `width` input columns
    pub fn load<P: AsRef<Path>>(path: P, width: usize, threads: usize) -> ShieldResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ShieldError::artifact(format!(
                "model not found: {}",
                path.display()
            )));
        }

        info!(path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| load_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(path, e))?
            .with_intra_threads(threads)
            .map_err(|e| load_error(path, e))?
            .commit_from_file(path)
            .map_err(|e| load_error(path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            input = %input_name,
            output = %output_name,
            width = width,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            width,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn input_width(&self) -> usize {
        self.width
    }

    fn fraud_probabilities(&self, rows: &[Vec<f64>]) -> ShieldResult<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut data = Vec::with_capacity(rows.len() * self.width);
        for row in rows {
            if row.len() != self.width {
                return Err(ShieldError::invalid(format!(
                    "row has {} features, model expects {}",
                    row.len(),
                    self.width
                )));
            }
            for &v in row {
                let narrowed = v as f32;
                if !narrowed.is_finite() {
                    return Err(ShieldError::invalid(format!(
                        "value {} is outside the model's float32 input range",
                        v
                    )));
                }
                data.push(narrowed);
            }
        }

        // Shape [batch, num_features]
        let shape = vec![rows.len() as i64, self.width as i64];
        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| ShieldError::prediction(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| ShieldError::prediction(e.to_string()))?;

        let output = outputs.get(&self.output_name).ok_or_else(|| {
            ShieldError::prediction(format!("model produced no output named {}", self.output_name))
        })?;

        let (shape, probs) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ShieldError::prediction(e.to_string()))?;
        let dims: Vec<i64> = shape.iter().copied().collect();
        debug!(dims = ?dims, rows = rows.len(), "ONNX inference complete");

        let fraud = extract_fraud_column(&dims, probs, rows.len())?;
        if let Some(row) = fraud.iter().position(|p| p.is_nan()) {
            // inputs are finite, so NaN comes from float32 overflow inside the graph
            return Err(ShieldError::invalid(format!(
                "row {}: feature magnitudes overflow the model's float32 arithmetic",
                row + 1
            )));
        }
        Ok(fraud)
    }
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> ShieldError {
    ShieldError::artifact(format!("failed to load ONNX model {}: {}", path.display(), e))
}

/// Pull the fraud-class column out of a flat probability tensor
fn extract_fraud_column(dims: &[i64], data: &[f32], n: usize) -> ShieldResult<Vec<f64>> {
    let expected: i64 = dims.iter().product();
    if expected < 0 || data.len() < expected as usize {
        return Err(ShieldError::prediction(format!(
            "probability tensor holds {} values, shape {:?} needs {}",
            data.len(),
            dims,
            expected
        )));
    }

    match dims {
        [rows, classes] if *rows as usize == n && *classes >= 2 => {
            let c = *classes as usize;
            Ok((0..n).map(|i| data[i * c + 1] as f64).collect())
        }
        [rows, 1] if *rows as usize == n => Ok(data[..n].iter().map(|&p| p as f64).collect()),
        [rows] if *rows as usize == n => Ok(data[..n].iter().map(|&p| p as f64).collect()),
        _ => Err(ShieldError::prediction(format!(
            "unexpected probability tensor shape {:?} for {} rows",
            dims, n
        ))),
    }
}

pub use crate::domain::model::{ModelLoadOptions, DEFAULT_OUTPUT_LAYER};
use crate::domain::model::{FeatureVector, OutputVector};
use crate::domain::ports::ForwardModel;
use crate::utils::error::{ReconError, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Persisted weight blob
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    /// Element count implied by `shape`; `None` when it overflows `usize`.
    pub fn numel(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Identity,
}

impl Activation {
    fn apply(self, v: f32) -> f32 {
        match self {
            Activation::Relu => v.max(0.0),
            Activation::Tanh => v.tanh(),
            Activation::Identity => v,
        }
    }
}

/// Decoded weight blob: named tensors in state-dict layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    #[serde(default)]
    pub activation: Activation,
    #[serde(default)]
    pub layers: Option<Vec<String>>,
    pub tensors: BTreeMap<String, Tensor>,
}

impl ModelWeights {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReconError::model_load(format!(
                "Model file not found: {}",
                path.display()
            )));
        }
        let bytes = std::fs::read(path)
            .map_err(|e| ReconError::model_load(format!("reading {}: {}", path.display(), e)))?;
        Self::decode(&bytes)
    }

    /// Accepts both a bare blob and a `{"state_dict": {...}}` checkpoint.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut root: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| ReconError::model_load(format!("corrupt weight blob: {}", e)))?;
        if let Some(inner) = root.get_mut("state_dict") {
            root = inner.take();
        }
        serde_json::from_value(root)
            .map_err(|e| ReconError::model_load(format!("unexpected weight blob layout: {}", e)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// `[rows, cols]` of `<layer>.weight`, if present.
    pub fn weight_shape(&self, layer: &str) -> Option<&[usize]> {
        self.tensors
            .get(&format!("{}.weight", layer))
            .map(|t| t.shape.as_slice())
    }

    /// Forward order of layer prefixes; the output layer always comes last.
    fn layer_order(&self, output_layer: &str) -> Vec<String> {
        if let Some(layers) = &self.layers {
            return layers.clone();
        }
        let mut prefixes: Vec<String> = self
            .tensors
            .keys()
            .filter_map(|k| k.strip_suffix(".weight"))
            .filter(|p| *p != output_layer)
            .map(str::to_string)
            .collect();
        prefixes.sort_by(|a, b| natural_cmp(a, b));
        if self.weight_shape(output_layer).is_some() {
            prefixes.push(output_layer.to_string());
        }
        prefixes
    }
}

/// Compare dotted names with numeric segments ordered numerically (`layers.2 < layers.10`).
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dense forward model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct DenseLayer {
    name: String,
    rows: usize,
    cols: usize,
    weight: Vec<f32>,
    bias: Vec<f32>,
}

impl DenseLayer {
    fn from_tensors(name: &str, weights: &ModelWeights) -> Result<Self> {
        let weight = weights
            .tensors
            .get(&format!("{}.weight", name))
            .ok_or_else(|| ReconError::model_load(format!("missing tensor {}.weight", name)))?;
        if weight.shape.len() != 2 {
            return Err(ReconError::model_load(format!(
                "{}.weight must be 2-D, got shape {:?}",
                name, weight.shape
            )));
        }
        if weight.numel() != Some(weight.data.len()) {
            return Err(ReconError::model_load(format!(
                "{}.weight has {} values for shape {:?}",
                name,
                weight.data.len(),
                weight.shape
            )));
        }
        let (rows, cols) = (weight.shape[0], weight.shape[1]);
        if rows == 0 || cols == 0 {
            return Err(ReconError::model_load(format!(
                "{}.weight has an empty dimension {:?}",
                name, weight.shape
            )));
        }

        let bias = match weights.tensors.get(&format!("{}.bias", name)) {
            Some(b) if b.shape.as_slice() == [rows] && b.data.len() == rows => b.data.clone(),
            Some(b) => {
                return Err(ReconError::model_load(format!(
                    "{}.bias shape {:?} does not match {} output rows",
                    name, b.shape, rows
                )))
            }
            None => vec![0.0; rows],
        };

        Ok(Self {
            name: name.to_string(),
            rows,
            cols,
            weight: weight.data.clone(),
            bias,
        })
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weight
            .chunks_exact(self.cols)
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }
}

/// Chain of dense layers with an activation between consecutive layers.
#[derive(Debug, Clone)]
pub struct DenseModel {
    layers: Vec<DenseLayer>,
    activation: Activation,
}

impl DenseModel {
    pub fn load(path: &Path, options: &ModelLoadOptions) -> Result<Self> {
        let weights = ModelWeights::from_file(path)?;
        let model = Self::from_weights(&weights, options)?;
        tracing::info!(
            "Loaded model from {} (input {}, output {}, {} layers)",
            path.display(),
            model.input_dim(),
            model.output_dim(),
            model.layers.len()
        );
        Ok(model)
    }

    pub fn from_weights(weights: &ModelWeights, options: &ModelLoadOptions) -> Result<Self> {
        let output_dim = match weights.weight_shape(&options.output_layer) {
            Some(shape) if !shape.is_empty() => shape[0],
            _ => match options.fallback_output_dim {
                Some(dim) => {
                    tracing::warn!(
                        "{}.weight not found in weight blob, assuming output dimension {}",
                        options.output_layer,
                        dim
                    );
                    dim
                }
                None => {
                    return Err(ReconError::model_load(format!(
                        "{}.weight not found in weight blob; cannot determine output dimension",
                        options.output_layer
                    )))
                }
            },
        };

        let order = weights.layer_order(&options.output_layer);
        if order.is_empty() {
            return Err(ReconError::model_load("weight blob contains no layers"));
        }
        let layers = order
            .iter()
            .map(|name| DenseLayer::from_tensors(name, weights))
            .collect::<Result<Vec<_>>>()?;

        if layers[0].cols != options.input_dim {
            return Err(ReconError::dimension(
                format!("model input ({}.weight)", layers[0].name),
                options.input_dim,
                layers[0].cols,
            ));
        }
        for pair in layers.windows(2) {
            if pair[1].cols != pair[0].rows {
                return Err(ReconError::model_load(format!(
                    "{} expects {} inputs but {} produces {}",
                    pair[1].name, pair[1].cols, pair[0].name, pair[0].rows
                )));
            }
        }
        let last = &layers[layers.len() - 1];
        if last.rows != output_dim {
            return Err(ReconError::model_load(format!(
                "final layer {} produces {} values, expected output dimension {}",
                last.name, last.rows, output_dim
            )));
        }

        Ok(Self {
            layers,
            activation: weights.activation,
        })
    }
}

impl ForwardModel for DenseModel {
    fn input_dim(&self) -> usize {
        self.layers[0].cols
    }

    fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].rows
    }

    fn forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_dim() {
            return Err(ReconError::dimension("model input", self.input_dim(), input.len()));
        }
        let last = self.layers.len() - 1;
        let mut x = input.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x);
            if i < last {
                x.iter_mut().for_each(|v| *v = self.activation.apply(*v));
            }
        }
        Ok(x)
    }
}

// ---------------------------------------------------------------------------
// Engine: load once, infer many
// ---------------------------------------------------------------------------

/// Holds the loaded model. `infer` before a successful `load` is a runtime error.
#[derive(Default)]
pub struct InferenceEngine {
    model: OnceCell<Box<dyn ForwardModel>>,
}

impl InferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an already constructed model (any forward-pass implementation).
    pub fn with_model(model: Box<dyn ForwardModel>) -> Self {
        Self {
            model: OnceCell::with_value(model),
        }
    }

    /// Load the weight blob once; later calls reuse the first successful load.
    pub fn load(&self, path: &Path, options: &ModelLoadOptions) -> Result<&dyn ForwardModel> {
        let model = self.model.get_or_try_init(|| {
            DenseModel::load(path, options).map(|m| Box::new(m) as Box<dyn ForwardModel>)
        })?;
        Ok(model.as_ref())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    pub fn model(&self) -> Option<&dyn ForwardModel> {
        self.model.get().map(|m| m.as_ref())
    }

    pub fn infer(&self, normalized: &FeatureVector) -> Result<OutputVector> {
        let model = self
            .model()
            .ok_or_else(|| ReconError::runtime("Model not loaded. Call load() first."))?;
        infer(model, normalized)
    }
}

/// Run one forward pass and check the output shape.
pub fn infer(model: &dyn ForwardModel, normalized: &FeatureVector) -> Result<OutputVector> {
    if normalized.len() != model.input_dim() {
        return Err(ReconError::dimension(
            "inference input",
            model.input_dim(),
            normalized.len(),
        ));
    }
    let output = model.forward(normalized.as_slice())?;
    if output.len() != model.output_dim() {
        return Err(ReconError::runtime(format!(
            "model returned {} values, expected {}",
            output.len(),
            model.output_dim()
        )));
    }
    if output.is_empty() {
        return Err(ReconError::runtime("Model returned empty intensities"));
    }
    if output.iter().any(|v| !v.is_finite()) {
        return Err(ReconError::runtime("model produced non-finite values"));
    }
    Ok(OutputVector::new(output))
}

use crate::core::inference::ModelWeights;
use crate::core::normalize::load_vector;
use crate::domain::ports::AssetProvider;
use serde::Serialize;

const MAX_LISTED_KEYS: usize = 10;

/// What the `check` command reports about the persisted model assets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetReport {
    pub mean_len: Option<usize>,
    pub std_len: Option<usize>,
    pub output_weight_shape: Option<Vec<usize>>,
    pub tensor_keys: Vec<String>,
    pub errors: Vec<String>,
    pub ok: bool,
}

/// Try to load every model asset and collect what went wrong. Never fails.
pub fn check_assets(provider: &dyn AssetProvider) -> AssetReport {
    let mut report = AssetReport::default();

    match load_vector(&provider.mean_path()) {
        Ok(mean) => report.mean_len = Some(mean.len()),
        Err(e) => report.errors.push(format!("mean: {}", e)),
    }
    match load_vector(&provider.std_path()) {
        Ok(std) => report.std_len = Some(std.len()),
        Err(e) => report.errors.push(format!("std: {}", e)),
    }

    match ModelWeights::from_file(&provider.weights_path()) {
        Ok(weights) => {
            report.output_weight_shape = weights
                .weight_shape(provider.output_layer())
                .map(<[usize]>::to_vec);
            report.tensor_keys = weights
                .keys()
                .take(MAX_LISTED_KEYS)
                .map(str::to_string)
                .collect();
        }
        Err(e) => report.errors.push(format!("model: {}", e)),
    }

    report.ok = report.mean_len.is_some()
        && report.std_len.is_some()
        && (!report.tensor_keys.is_empty() || report.output_weight_shape.is_some());

    for error in &report.errors {
        tracing::warn!("Asset check: {}", error);
    }
    report
}

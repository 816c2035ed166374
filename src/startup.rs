use std::sync::Arc;

use anyhow::{Context, Result};
use emotune_vision::{classifier, CascadeLocator, ClassifierRuntime, Pipeline};
use log::info;

use crate::config::Config;

/// Load the classifier artifacts and publish them as the process-wide
/// runtime.
pub fn load_runtime(cfg: &Config) -> Result<Arc<ClassifierRuntime>> {
    info!("Loading classifier: {}", cfg.model_path.display());
    let runtime = ClassifierRuntime::load(&cfg.model_path, &cfg.labels_path, cfg.input_size)
        .context("Failed to load emotion classifier")?
        .with_activation(cfg.activation);
    classifier::install(runtime).context("Failed to install classifier runtime")
}

pub fn build_pipeline(cfg: &Config) -> Result<Pipeline> {
    load_runtime(cfg)?;

    info!("Loading face cascade: {}", cfg.cascade_path.display());
    let locator = CascadeLocator::load(&cfg.cascade_path, cfg.detector)
        .context("Failed to load face cascade")?;

    let pipeline = Pipeline::from_global(Box::new(locator), cfg.smoothing_window)?;
    Ok(match cfg.min_confidence {
        Some(threshold) => pipeline.with_min_confidence(threshold),
        None => pipeline,
    })
}

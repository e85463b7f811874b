use burn::prelude::*;

use crate::{data::WineSample, model::WineModel, Error, Result};

/// Classification outcome over a set of labeled wines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
}

impl Evaluation {
    /// Percentage of correctly classified samples, in `[0, 100]`.
    pub fn accuracy(&self) -> f64 {
        self.correct as f64 / self.total as f64 * 100.0
    }
}

/// Runs inference on every sample and compares the arg-max of the logits with
/// the arg-max of the one-hot label.
pub fn evaluate<B: Backend>(
    model: &WineModel<B>,
    samples: &[WineSample],
    device: &B::Device,
) -> Result<Evaluation> {
    if samples.is_empty() {
        return Err(Error::EmptyDataset);
    }

    let correct = samples
        .iter()
        .filter(|sample| model.predict(&sample.features, device) == sample.class_index())
        .count();

    Ok(Evaluation {
        correct,
        total: samples.len(),
    })
}

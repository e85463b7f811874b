use std::{path::Path, slice::Chunks};

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLoss,
    optim::{GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
    LearningRate,
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    data::{WineBatch, WineBatcher, WineDataset, WineSample},
    evaluation::{evaluate, Evaluation},
    model::{WineModel, WineModelConfig},
    Error,
};

#[derive(Config)]
pub struct WineTrainingConfig {
    pub model: WineModelConfig,
    pub optimizer: SgdConfig,
    #[config(default = 500)]
    pub num_epochs: usize,
    #[config(default = 64)]
    pub batch_size: usize,
    #[config(default = 1e-2)]
    pub learning_rate: f64,
    #[config(default = 42)]
    pub seed: u64,
    /// Fraction of the samples kept aside for evaluation. When unset the
    /// model is evaluated on the samples it was trained on.
    #[config(default = "None")]
    pub holdout_ratio: Option<f64>,
}

// `SgdConfig` does not implement `Debug`, so render through the `Display`
// impl generated by `Config`.
impl core::fmt::Debug for WineTrainingConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

impl WineTrainingConfig {
    /// Checks the invariants a training run relies on.
    pub fn validate(&self) -> crate::Result<()> {
        let model = &self.model;

        if model.num_features == 0 || model.num_classes == 0 || model.hidden_size == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dimensions must be non-zero, got {}x{}x{}",
                model.num_features, model.hidden_size, model.num_classes
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be at least 1".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if let Some(ratio) = self.holdout_ratio {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "holdout ratio must be in (0, 1), got {ratio}"
                )));
            }
        }

        Ok(())
    }
}

/// Mean cross-entropy between `softmax(logits)` and one-hot `targets`.
///
/// # Shapes
///   - Logits [batch_size, num_classes]
///   - Targets [batch_size, num_classes]
///   - Output [1]
pub fn cross_entropy_with_softmax<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let targets = targets.argmax(1).squeeze::<1>(1);

    CrossEntropyLoss::new(None, &logits.device()).forward(logits, targets)
}

/// A uniformly random ordering of `samples`.
pub fn shuffled<'a, R: Rng + ?Sized>(
    samples: &'a [WineSample],
    rng: &mut R,
) -> Vec<&'a WineSample> {
    let mut order: Vec<&WineSample> = samples.iter().collect();
    order.shuffle(rng);

    order
}

/// Contiguous minibatches of `batch_size` items, the last one may be shorter.
///
/// # Panics
///
/// Panics if `batch_size` is 0.
pub fn minibatches<T>(items: &[T], batch_size: usize) -> Chunks<'_, T> {
    items.chunks(batch_size)
}

/// Owns everything a training run needs: the model, the optimizer state, the
/// device and the shuffling RNG.
pub struct WineTrainer<B: AutodiffBackend, O> {
    model: WineModel<B>,
    optim: O,
    batcher: WineBatcher<B>,
    rng: StdRng,
    num_epochs: usize,
    batch_size: usize,
    lr: LearningRate,
    iteration: usize,
}

impl<B, O> WineTrainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<WineModel<B>, B>,
{
    pub fn new(
        model: WineModel<B>,
        optim: O,
        config: &WineTrainingConfig,
        device: B::Device,
    ) -> crate::Result<Self> {
        config.validate()?;

        Ok(Self {
            model,
            optim,
            batcher: WineBatcher::new(device),
            rng: StdRng::seed_from_u64(config.seed),
            num_epochs: config.num_epochs,
            batch_size: config.batch_size,
            lr: config.learning_rate,
            iteration: 0,
        })
    }

    /// Trains for the configured number of epochs, there is no early stopping.
    pub fn fit(&mut self, dataset: &WineDataset) -> crate::Result<()> {
        if dataset.samples().is_empty() {
            return Err(Error::EmptyDataset);
        }

        log::info!(
            "Training on {} samples for {} epochs with batch size {}",
            dataset.samples().len(),
            self.num_epochs,
            self.batch_size
        );

        for epoch in 1..=self.num_epochs {
            log::debug!("Executing training step for epoch {}", epoch);

            let order = shuffled(dataset.samples(), &mut self.rng);
            for items in minibatches(&order, self.batch_size) {
                let batch = self.batcher.stack(items.iter().copied());
                self.step(batch);
            }
        }

        log::info!("Training finished after {} iterations", self.iteration);

        Ok(())
    }

    /// One SGD update on a single minibatch.
    fn step(&mut self, batch: WineBatch<B>) {
        let model = self.model.clone();

        let logits = model.forward(batch.features);
        let loss = cross_entropy_with_softmax(logits, batch.labels);

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        self.model = self.optim.step(self.lr, model, grads);
        self.iteration += 1;
    }

    /// Number of minibatch updates applied so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn model(&self) -> &WineModel<B> {
        &self.model
    }

    /// Ends the run, dropping the optimizer state.
    pub fn into_model(self) -> WineModel<B> {
        self.model
    }
}

/// Outcome of [run].
#[derive(Clone, Copy, Debug)]
pub struct TrainingReport {
    pub evaluation: Evaluation,
    /// Whether the evaluated samples are the training samples.
    pub evaluated_on_training_set: bool,
}

/// Load, build, train, evaluate.
pub fn run<B: AutodiffBackend>(
    data_path: impl AsRef<Path>,
    config: &WineTrainingConfig,
    device: B::Device,
) -> crate::Result<TrainingReport> {
    config.validate()?;
    B::seed(config.seed);

    let dataset = WineDataset::from_csv(
        data_path.as_ref(),
        config.model.num_features,
        config.model.num_classes,
    )?;
    println!("data loaded");
    log::info!(
        "Loaded {} samples from {}",
        dataset.samples().len(),
        data_path.as_ref().display()
    );

    let (dataset_train, dataset_test) = match config.holdout_ratio {
        Some(ratio) => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let (train, test) = dataset.split(ratio, &mut rng);
            log::info!(
                "Holding out {} samples for evaluation",
                test.samples().len()
            );
            (train, Some(test))
        }
        None => {
            log::warn!("No holdout ratio configured, evaluating on the training set");
            (dataset, None)
        }
    };

    let model = config.model.init::<B>(&device);
    let optim = config.optimizer.init::<B, WineModel<B>>();
    let mut trainer = WineTrainer::new(model, optim, config, device.clone())?;

    println!("training");
    trainer.fit(&dataset_train)?;
    let model = trainer.into_model().valid();

    println!("evaluating");
    let samples = dataset_test.as_ref().unwrap_or(&dataset_train).samples();
    let evaluation = evaluate(&model, samples, &device)?;
    log::info!(
        "Classified {} of {} samples correctly",
        evaluation.correct,
        evaluation.total
    );
    println!("done");

    Ok(TrainingReport {
        evaluation,
        evaluated_on_training_set: dataset_test.is_none(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TestAutodiffBackend, TestBackend};
    use burn::data::dataset::Dataset;

    fn config() -> WineTrainingConfig {
        WineTrainingConfig::new(
            WineModelConfig::new()
                .with_num_features(2)
                .with_num_classes(3)
                .with_hidden_size(8),
            SgdConfig::new(),
        )
    }

    /// Three well separated clusters.
    fn toy_dataset(num_samples: usize) -> WineDataset {
        let samples = (0..num_samples)
            .map(|i| {
                let class = i % 3;
                let offset = (i / 3) as f32 * 0.01;
                let features = match class {
                    0 => vec![1.0 + offset, 0.0],
                    1 => vec![0.0, 1.0 + offset],
                    _ => vec![-1.0 - offset, -1.0],
                };
                WineSample::new(features, class, 3)
            })
            .collect();

        WineDataset::new(samples)
    }

    type TestModel = WineModel<TestAutodiffBackend>;

    fn trainer(
        config: &WineTrainingConfig,
    ) -> WineTrainer<TestAutodiffBackend, impl Optimizer<TestModel, TestAutodiffBackend>> {
        let device = Default::default();
        TestAutodiffBackend::seed(config.seed);
        let model = config.model.init::<TestAutodiffBackend>(&device);
        let optim = config
            .optimizer
            .init::<TestAutodiffBackend, TestModel>();

        WineTrainer::new(model, optim, config, device).unwrap()
    }

    fn loss(model: &TestModel, dataset: &WineDataset) -> f32 {
        let device = Default::default();
        let batch = WineBatcher::<TestBackend>::new(device).stack(dataset.samples());
        let logits = model.valid().forward(batch.features);

        cross_entropy_with_softmax(logits, batch.labels).into_scalar()
    }

    #[test]
    fn uniform_logits_give_log_num_classes() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::zeros([2, 10], &device);
        let targets = Tensor::<TestBackend, 2>::from_floats(
            [
                [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            ],
            &device,
        );

        let loss = cross_entropy_with_softmax(logits, targets).into_scalar();

        assert!((loss - 10f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn confident_correct_logits_give_small_loss() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[10.0, -10.0], [-10.0, 10.0]], &device);
        let targets = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [0.0, 1.0]], &device);

        let loss = cross_entropy_with_softmax(logits, targets).into_scalar();

        assert!(loss < 1e-4);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let dataset = toy_dataset(20);
        let mut rng = StdRng::seed_from_u64(3);

        let order = shuffled(dataset.samples(), &mut rng);

        assert_eq!(order.len(), dataset.len());
        assert_ne!(
            order.iter().copied().cloned().collect::<Vec<_>>(),
            dataset.samples().to_vec()
        );
        for sample in dataset.samples() {
            let expected = dataset.samples().iter().filter(|s| *s == sample).count();
            let found = order.iter().filter(|s| **s == sample).count();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn minibatches_cover_all_items() {
        let items = (0..10).collect::<Vec<_>>();

        let sizes = minibatches(&items, 4).map(|b| b.len()).collect::<Vec<_>>();
        assert_eq!(sizes, vec![4, 4, 2]);

        let sizes = minibatches(&items[..8], 4).map(|b| b.len()).collect::<Vec<_>>();
        assert_eq!(sizes, vec![4, 4]);

        let sizes = minibatches(&items[..3], 64).map(|b| b.len()).collect::<Vec<_>>();
        assert_eq!(sizes, vec![3]);

        let flattened = minibatches(&items, 3).flatten().copied().collect::<Vec<_>>();
        assert_eq!(flattened, items);
    }

    #[test]
    fn runs_every_minibatch_of_every_epoch() {
        let config = config().with_num_epochs(3).with_batch_size(4);
        let mut trainer = trainer(&config);

        trainer.fit(&toy_dataset(10)).unwrap();

        assert_eq!(trainer.iteration(), 9);
    }

    #[test]
    fn step_updates_parameters() {
        let device = Default::default();
        let config = config().with_num_epochs(1).with_batch_size(16);
        let mut trainer = trainer(&config);
        let input = Tensor::<TestBackend, 2>::from_floats([[0.5, -0.5]], &device);
        let before = trainer.model().valid().forward(input.clone());

        trainer.fit(&toy_dataset(12)).unwrap();

        let after = trainer.model().valid().forward(input);
        let change = (after - before).abs().sum().into_scalar();
        assert!(change > 0.0);
    }

    #[test]
    fn full_batch_training_reduces_loss() {
        let dataset = toy_dataset(12);
        let config = config().with_num_epochs(50).with_batch_size(12);
        let mut trainer = trainer(&config);
        let initial = loss(trainer.model(), &dataset);

        trainer.fit(&dataset).unwrap();

        let trained = loss(trainer.model(), &dataset);
        assert!(trained < initial, "{trained} >= {initial}");
    }

    #[test]
    fn fit_rejects_empty_dataset() {
        let config = config();
        let mut trainer = trainer(&config);

        let err = trainer.fit(&WineDataset::default()).unwrap_err();

        assert!(matches!(err, Error::EmptyDataset));
        assert_eq!(trainer.iteration(), 0);
    }

    #[test]
    fn default_config_matches_reference_hyperparameters() {
        let config = WineTrainingConfig::new(WineModelConfig::new(), SgdConfig::new());

        assert_eq!(config.model.num_features, 11);
        assert_eq!(config.model.num_classes, 10);
        assert_eq!(config.model.hidden_size, 50);
        assert_eq!(config.num_epochs, 500);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.learning_rate, 0.01);
        assert_eq!(config.holdout_ratio, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_invalid_values() {
        let cases = [
            config().with_batch_size(0),
            config().with_learning_rate(0.0),
            config().with_learning_rate(f64::NAN),
            config().with_holdout_ratio(Some(1.0)),
            config().with_holdout_ratio(Some(0.0)),
            WineTrainingConfig::new(
                WineModelConfig::new().with_hidden_size(0),
                SgdConfig::new(),
            ),
        ];

        for case in cases {
            assert!(matches!(case.validate(), Err(Error::InvalidConfig(_))));
        }
    }
}

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use super::WineSample;

/// Stacks wine samples into feature and one-hot label tensors.
#[derive(Clone, Debug)]
pub struct WineBatcher<B: Backend> {
    device: B::Device,
}

#[derive(Clone, Debug)]
pub struct WineBatch<B: Backend> {
    /// Features with shape `[batch_size, num_features]`.
    pub features: Tensor<B, 2>,
    /// One-hot labels with shape `[batch_size, num_classes]`.
    pub labels: Tensor<B, 2>,
}

impl<B: Backend> WineBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Stacks borrowed samples without cloning them first.
    ///
    /// # Panics
    ///
    /// Panics if `items` is empty.
    pub fn stack<'a, I>(&self, items: I) -> WineBatch<B>
    where
        I: IntoIterator<Item = &'a WineSample>,
    {
        let mut num_items = 0;
        let mut num_features = 0;
        let mut num_classes = 0;
        let mut features = Vec::new();
        let mut labels = Vec::new();

        for item in items {
            num_items += 1;
            num_features = item.features.len();
            num_classes = item.label.len();
            features.extend_from_slice(&item.features);
            labels.extend_from_slice(&item.label);
        }
        assert!(num_items > 0, "Cannot batch zero wine samples");

        let features = Tensor::from_data(
            TensorData::new(features, [num_items, num_features]),
            &self.device,
        );
        let labels = Tensor::from_data(
            TensorData::new(labels, [num_items, num_classes]),
            &self.device,
        );

        WineBatch { features, labels }
    }
}

impl<B: Backend> Batcher<WineSample, WineBatch<B>> for WineBatcher<B> {
    fn batch(&self, items: Vec<WineSample>) -> WineBatch<B> {
        self.stack(items.iter())
    }
}

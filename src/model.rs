use burn::{
    module::Ignored,
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation,
};

/// Non-linearity applied to the hidden layer.
#[derive(Config, Debug, PartialEq)]
pub enum Activation {
    /// Rectified linear unit.
    Relu,
    /// Logistic sigmoid.
    Sigmoid,
    /// No activation.
    Identity,
}

impl Activation {
    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Self::Relu => activation::relu(input),
            Self::Sigmoid => activation::sigmoid(input),
            Self::Identity => input,
        }
    }
}

#[derive(Config, Debug)]
pub struct WineModelConfig {
    #[config(default = 11)]
    pub num_features: usize,
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 50)]
    pub hidden_size: usize,
    #[config(default = "Activation::Relu")]
    pub activation: Activation,
}

/// Two fully connected layers producing class logits.
#[derive(Module, Debug)]
pub struct WineModel<B: Backend> {
    hidden: Linear<B>,
    output: Linear<B>,
    activation: Ignored<Activation>,
}

impl WineModelConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> WineModel<B> {
        WineModel {
            hidden: dense(self.num_features, self.hidden_size, device),
            output: dense(self.hidden_size, self.num_classes, device),
            activation: Ignored(self.activation.clone()),
        }
    }
}

/// A linear layer with Glorot uniform weights and zero biases.
fn dense<B: Backend>(d_input: usize, d_output: usize, device: &B::Device) -> Linear<B> {
    let mut linear = LinearConfig::new(d_input, d_output)
        .with_initializer(Initializer::XavierUniform { gain: 1.0 })
        .init(device);
    linear.bias = Some(Initializer::Zeros.init([d_output], device));

    linear
}

impl<B: Backend> WineModel<B> {
    /// # Shapes
    ///   - Features [batch_size, num_features]
    ///   - Logits [batch_size, num_classes]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.hidden.forward(features);
        let x = self.activation.forward(x);

        self.output.forward(x)
    }

    /// Predicts the class of a single wine.
    pub fn predict(&self, features: &[f32], device: &B::Device) -> usize {
        let input = Tensor::from_data(
            TensorData::new(features.to_vec(), [1, features.len()]),
            device,
        );
        let predicted = self.forward(input).argmax(1).flatten::<1>(0, 1).into_scalar();

        predicted.elem::<i64>() as usize
    }
}

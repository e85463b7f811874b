//! Wine quality classification on top of Burn.
//!
//! The crate loads the semicolon separated wine quality dataset, trains a
//! two-layer dense network with minibatch SGD and reports the classification
//! accuracy of the trained model.

pub mod data;
pub mod evaluation;
pub mod logger;
pub mod model;
pub mod training;

mod error;

pub use error::{Error, Result};

/// Backend for test cases
#[cfg(test)]
pub type TestBackend = burn::backend::NdArray<f32>;

/// Backend for autodiff test cases
#[cfg(test)]
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

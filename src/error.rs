/// Error type for loading, training and evaluating the wine classifier.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}, column {column}: invalid number {value:?}")]
    InvalidNumber {
        line: u64,
        column: usize,
        value: String,
    },

    #[error("line {line}: class label {value} is not an integer in [0, {num_classes})")]
    InvalidLabel {
        line: u64,
        value: f32,
        num_classes: usize,
    },

    #[error("the dataset is empty")]
    EmptyDataset,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config error: {0}")]
    Config(#[from] burn::config::ConfigError),
}

pub type Result<T> = core::result::Result<T, Error>;

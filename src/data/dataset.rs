use std::{fs::File, io::Read, path::Path};

use burn::data::dataset::Dataset;
use rand::{seq::SliceRandom, Rng};

use crate::{Error, Result};

/// Number of physicochemical measurements per wine.
pub const NUM_FEATURES: usize = 11;

/// Number of quality classes, quality scores go from 0 to 9.
pub const NUM_CLASSES: usize = 10;

/// A single wine: its measurements and its one-hot encoded quality.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WineSample {
    /// Fixed acidity, volatile acidity, citric acid, residual sugar, chlorides,
    /// free sulfur dioxide, total sulfur dioxide, density, pH, sulphates, alcohol.
    pub features: Vec<f32>,

    /// One-hot quality label, `1.0` at the class index and `0.0` elsewhere.
    pub label: Vec<f32>,
}

impl WineSample {
    /// Creates a sample with a one-hot label of length `num_classes` set at `class`.
    ///
    /// # Panics
    ///
    /// Panics if `class >= num_classes`.
    pub fn new(features: Vec<f32>, class: usize, num_classes: usize) -> Self {
        assert!(
            class < num_classes,
            "class {class} out of range for {num_classes} classes"
        );
        let mut label = vec![0.0; num_classes];
        label[class] = 1.0;

        Self { features, label }
    }

    /// The class index, i.e. the arg-max of the one-hot label.
    pub fn class_index(&self) -> usize {
        argmax(&self.label)
    }
}

/// Index of the first largest value.
pub(crate) fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (index, &value)| {
            if value > max {
                (index, value)
            } else {
                (best, max)
            }
        })
        .0
}

/// The wine quality dataset.
///
/// The data is parsed eagerly from a single csv file with `;` as the delimiter
/// and a header row. Each record holds the feature columns followed by the
/// integer quality class.
#[derive(Clone, Debug, Default)]
pub struct WineDataset {
    samples: Vec<WineSample>,
}

impl WineDataset {
    /// Creates a dataset from already parsed samples.
    pub fn new(samples: Vec<WineSample>) -> Self {
        Self { samples }
    }

    /// Loads the dataset from the csv file at `path`.
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        num_features: usize,
        num_classes: usize,
    ) -> Result<Self> {
        let file = File::open(path)?;

        Self::from_reader(file, num_features, num_classes)
    }

    /// Loads the dataset from any csv source.
    ///
    /// Loading is strict: a wrong number of fields, a field that is not a
    /// number, or a class index outside `[0, num_classes)` fails the whole load.
    pub fn from_reader<R: Read>(
        reader: R,
        num_features: usize,
        num_classes: usize,
    ) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut samples = Vec::new();
        // The header occupies line 1.
        let mut previous_line = 1;

        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();

            // The csv reader drops empty lines, an empty data row is malformed.
            if line > previous_line + 1 {
                return Err(Error::FieldCount {
                    line: previous_line + 1,
                    expected: num_features + 1,
                    found: 0,
                });
            }
            previous_line = line;

            if record.len() != num_features + 1 {
                return Err(Error::FieldCount {
                    line,
                    expected: num_features + 1,
                    found: record.len(),
                });
            }

            let values = record
                .iter()
                .enumerate()
                .map(|(column, field)| {
                    field.parse::<f32>().map_err(|_| Error::InvalidNumber {
                        line,
                        column: column + 1,
                        value: field.to_string(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let (features, class) = values.split_at(num_features);
            let class = class_index(class[0], num_classes).ok_or(Error::InvalidLabel {
                line,
                value: class[0],
                num_classes,
            })?;

            samples.push(WineSample::new(features.to_vec(), class, num_classes));
        }

        log::debug!("Parsed {} wine samples", samples.len());

        Ok(Self { samples })
    }

    /// All samples in file order.
    pub fn samples(&self) -> &[WineSample] {
        &self.samples
    }

    /// Splits the dataset into a training part and a held-out part.
    ///
    /// Samples are shuffled with `rng` before the split; the held-out part
    /// receives `holdout_ratio` of the samples, rounded, but at least one.
    pub fn split<R: Rng>(self, holdout_ratio: f64, rng: &mut R) -> (Self, Self) {
        let mut samples = self.samples;
        samples.shuffle(rng);

        let num_holdout = ((samples.len() as f64 * holdout_ratio).round() as usize)
            .clamp(1usize.min(samples.len()), samples.len());
        let holdout = samples.split_off(samples.len() - num_holdout);

        (Self { samples }, Self { samples: holdout })
    }
}

/// Converts the parsed last column to a class index.
fn class_index(value: f32, num_classes: usize) -> Option<usize> {
    if value.fract() != 0.0 || value < 0.0 || value >= num_classes as f32 {
        return None;
    }

    Some(value as usize)
}

impl Dataset<WineSample> for WineDataset {
    fn get(&self, index: usize) -> Option<WineSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PostaError, Result};

/// Sparse feature vector: feature key to activation.
///
/// An ordered map keeps the summation order of scores fixed, so prediction
/// is reproducible across runs.
pub type Features = BTreeMap<String, f64>;

/// Exported form of the weight table: feature key to label to weight.
pub type WeightTable = BTreeMap<String, BTreeMap<String, f64>>;

/// A single (feature, label) weight together with its averaging accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Weight {
    value: f64,
    /// Sum of `value` over every step before `stamp`.
    total: f64,
    /// Step at which `value` last changed.
    stamp: u64,
}

impl Weight {
    fn add(&mut self, delta: f64, step: u64) {
        self.total += (step - self.stamp) as f64 * self.value;
        self.stamp = step;
        self.value += delta;
    }

    fn average(&mut self, steps: u64) {
        self.total += (steps - self.stamp) as f64 * self.value;
        self.value = self.total / steps as f64;
        self.total = 0.0;
        self.stamp = 0;
    }
}

/// On-disk representation of a [`Perceptron`].
#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    labels: Vec<String>,
    weights: WeightTable,
}

/// Averaged perceptron for multiclass classification.
///
/// The label set is fixed at construction and its order is the tie-break
/// order of [`Perceptron::predict`]. Every feature row in the weight table
/// holds one weight per label, created at zero the first time the feature is
/// updated.
///
/// # Example
/// ```
/// use posta::perceptron::{Features, Perceptron};
///
/// let mut model = Perceptron::new(vec!["DET".to_string(), "NOUN".to_string()]).unwrap();
/// let mut features = Features::new();
/// features.insert("W0:dog".to_string(), 1.0);
///
/// assert_eq!(model.predict(&features), "DET");
/// model.update("DET", &features, "NOUN").unwrap();
/// assert_eq!(model.predict(&features), "NOUN");
/// ```
#[derive(Debug, Clone)]
pub struct Perceptron {
    labels: Vec<String>,
    weights: HashMap<String, Vec<Weight>>,
    /// Number of `update` calls since construction or the last averaging.
    steps: u64,
}

impl Perceptron {
    /// Creates a new instance of [`Perceptron`] with an empty weight table.
    ///
    /// # Arguments
    /// * `labels` - The ordered label set. It must be non-empty and free of duplicates.
    ///
    /// # Errors
    /// Returns [`PostaError::EmptyLabelSet`] or [`PostaError::DuplicateLabel`]
    /// if the label set is invalid.
    pub fn new(labels: Vec<String>) -> Result<Self> {
        validate_labels(&labels)?;
        Ok(Perceptron {
            labels,
            weights: HashMap::new(),
            steps: 0,
        })
    }

    /// Creates a [`Perceptron`] from an exported weight table.
    ///
    /// Labels missing from a row are filled with zero.
    ///
    /// # Errors
    /// Returns an error if the label set is invalid or a row names a label
    /// outside of it.
    pub fn from_weight_table(labels: Vec<String>, table: WeightTable) -> Result<Self> {
        let mut model = Self::new(labels)?;
        let num_labels = model.labels.len();
        for (feature, row) in table {
            let mut weights = vec![Weight::default(); num_labels];
            for (label, value) in row {
                let idx = model.label_index(&label).ok_or_else(|| {
                    PostaError::invalid_model(format!(
                        "feature {} has a weight for unknown label {}",
                        feature, label
                    ))
                })?;
                weights[idx].value = value;
            }
            model.weights.insert(feature, weights);
        }
        Ok(model)
    }

    /// Returns the label set in tie-break order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the position of `label` in the label set.
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Number of feature keys in the weight table.
    pub fn num_features(&self) -> usize {
        self.weights.len()
    }

    pub fn contains_feature(&self, feature: &str) -> bool {
        self.weights.contains_key(feature)
    }

    /// Returns the weight of a (feature, label) pair, or `None` if either is unknown.
    pub fn weight(&self, feature: &str, label: &str) -> Option<f64> {
        let idx = self.label_index(label)?;
        self.weights.get(feature).map(|row| row[idx].value)
    }

    /// Exports the weight table in a form keyed by label names.
    pub fn weight_table(&self) -> WeightTable {
        self.weights
            .iter()
            .map(|(feature, row)| {
                let row: BTreeMap<String, f64> = self
                    .labels
                    .iter()
                    .zip(row)
                    .map(|(label, w)| (label.clone(), w.value))
                    .collect();
                (feature.clone(), row)
            })
            .collect()
    }

    /// Computes the score of every label, in label-set order.
    ///
    /// Features with a zero activation and features absent from the weight
    /// table contribute nothing.
    pub fn scores(&self, features: &Features) -> Vec<f64> {
        let mut scores = vec![0.0; self.labels.len()];
        for (feature, &value) in features {
            if value == 0.0 {
                continue;
            }
            let Some(row) = self.weights.get(feature) else {
                continue;
            };
            for (score, w) in scores.iter_mut().zip(row) {
                *score += value * w.value;
            }
        }
        scores
    }

    /// Predicts the label for a given feature vector.
    ///
    /// # Arguments
    /// * `features` - The sparse feature vector to score.
    ///
    /// # Returns
    /// The label with the highest score. When several labels share the
    /// highest score, the first of them in label-set order is returned, so an
    /// empty feature vector yields the first label.
    pub fn predict(&self, features: &Features) -> &str {
        &self.labels[self.predict_index(features)]
    }

    fn predict_index(&self, features: &Features) -> usize {
        let scores = self.scores(features);
        let mut best = 0;
        for (idx, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = idx;
            }
        }
        best
    }

    /// Applies the perceptron correction for one prediction.
    ///
    /// If `predicted` differs from `truth`, every feature with a nonzero
    /// activation `v` gains `v` on `truth` and loses `v` on `predicted`.
    /// Unseen features are first added with a zero weight for every label.
    /// Each call advances the averaging clock by one step, including calls
    /// where the prediction was correct.
    ///
    /// # Errors
    /// Returns [`PostaError::UnknownLabel`] if either label is outside the
    /// label set. The weight table is left untouched in that case.
    pub fn update(&mut self, predicted: &str, features: &Features, truth: &str) -> Result<()> {
        let pred = self.require_label(predicted)?;
        let gold = self.require_label(truth)?;

        self.steps += 1;
        if pred == gold {
            return Ok(());
        }

        let step = self.steps;
        let num_labels = self.labels.len();
        for (feature, &value) in features {
            if value == 0.0 {
                continue;
            }
            let row = self
                .weights
                .entry(feature.clone())
                .or_insert_with(|| vec![Weight::default(); num_labels]);
            row[gold].add(value, step);
            row[pred].add(-value, step);
        }
        Ok(())
    }

    /// Replaces every weight with its average over all update steps since the
    /// last averaging.
    ///
    /// Averaging resets the clock, so calling this again without further
    /// updates leaves the weights as they are.
    pub fn average(&mut self) {
        if self.steps == 0 {
            return;
        }
        let steps = self.steps;
        for row in self.weights.values_mut() {
            for w in row.iter_mut() {
                w.average(steps);
            }
        }
        tracing::debug!(
            steps,
            features = self.weights.len(),
            "averaged perceptron weights"
        );
        self.steps = 0;
    }

    /// Saves the model as JSON.
    ///
    /// # Arguments
    /// * `filename` - The path to the file where the model will be saved.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written to.
    pub fn save_model(&self, filename: &Path) -> Result<()> {
        let model = ModelFile {
            labels: self.labels.clone(),
            weights: self.weight_table(),
        };
        let mut writer = BufWriter::new(File::create(filename)?);
        serde_json::to_writer(&mut writer, &model)?;
        writer.flush()?;
        tracing::info!(
            path = %filename.display(),
            features = model.weights.len(),
            "saved model"
        );
        Ok(())
    }

    /// Loads a model saved by [`Perceptron::save_model`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not describe a
    /// valid model.
    pub fn load_model(filename: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(filename)?);
        let model: ModelFile = serde_json::from_reader(reader)?;
        let perceptron = Self::from_weight_table(model.labels, model.weights)?;
        tracing::info!(
            path = %filename.display(),
            labels = perceptron.labels.len(),
            features = perceptron.weights.len(),
            "loaded model"
        );
        Ok(perceptron)
    }

    fn require_label(&self, label: &str) -> Result<usize> {
        self.label_index(label)
            .ok_or_else(|| PostaError::UnknownLabel(label.to_string()))
    }
}

fn validate_labels(labels: &[String]) -> Result<()> {
    if labels.is_empty() {
        return Err(PostaError::EmptyLabelSet);
    }
    for (i, label) in labels.iter().enumerate() {
        if labels[..i].contains(label) {
            return Err(PostaError::DuplicateLabel(label.clone()));
        }
    }
    Ok(())
}

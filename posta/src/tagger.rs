use std::mem;
use std::path::Path;

use crate::error::{PostaError, Result};
use crate::features::{padded_context, FeatureTemplate, Features, START, START2};
use crate::perceptron::Perceptron;

/// Token-level accuracy of a tagging run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub correct: usize,
    pub total: usize,
    /// Percentage of correctly tagged tokens.
    pub accuracy: f64,
}

impl Metrics {
    fn new(correct: usize, total: usize) -> Self {
        let accuracy = if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64 * 100.0
        };
        Metrics {
            correct,
            total,
            accuracy,
        }
    }
}

/// State of the greedy decoder over one sentence.
///
/// The state is the rolling history of the last two predicted tags. Tagging
/// and training both drive the decoder through [`Decoder::advance`], so the
/// history is always built from predictions, never from gold tags.
struct Decoder<'a> {
    context: Vec<&'a str>,
    /// Index into `context` of the token being tagged.
    position: usize,
    last: String,
    second_last: String,
    tags: Vec<String>,
}

impl<'a> Decoder<'a> {
    fn new(sentence: &'a [String]) -> Self {
        Decoder {
            context: padded_context(sentence),
            position: 2,
            last: START2.to_string(),
            second_last: START.to_string(),
            tags: Vec::with_capacity(sentence.len()),
        }
    }

    /// Features of the current token, or `None` once the sentence is done.
    fn features(&self, template: &FeatureTemplate) -> Option<Features> {
        if self.position + 2 >= self.context.len() {
            return None;
        }
        Some(template.extract(self.position, &self.context, &self.last, &self.second_last))
    }

    /// Index of the current token in the unpadded sentence.
    fn token_index(&self) -> usize {
        self.position - 2
    }

    fn advance(&mut self, predicted: &str) {
        self.second_last = mem::replace(&mut self.last, predicted.to_string());
        self.tags.push(predicted.to_string());
        self.position += 1;
    }

    fn into_tags(self) -> Vec<String> {
        self.tags
    }
}

/// Greedy left-to-right sequence tagger backed by an averaged [`Perceptron`].
///
/// # Example
/// ```
/// use posta::tagger::Tagger;
///
/// let labels = vec!["DET".to_string(), "NOUN".to_string()];
/// let mut tagger = Tagger::new(labels).unwrap();
///
/// let sentences = vec![vec!["the".to_string(), "dog".to_string()]];
/// let tags = vec![vec!["DET".to_string(), "NOUN".to_string()]];
/// tagger.train(5, &sentences, &tags).unwrap();
///
/// assert_eq!(tagger.tag(&sentences), tags);
/// ```
#[derive(Clone)]
pub struct Tagger {
    template: FeatureTemplate,
    model: Perceptron,
}

impl Tagger {
    /// Creates a new instance of [`Tagger`] with an untrained model.
    ///
    /// # Arguments
    /// * `labels` - The ordered label set the tagger predicts from.
    ///
    /// # Errors
    /// Returns an error if the label set is empty or contains duplicates.
    pub fn new(labels: Vec<String>) -> Result<Self> {
        Ok(Self::from_model(Perceptron::new(labels)?))
    }

    /// Creates a [`Tagger`] around an existing model.
    pub fn from_model(model: Perceptron) -> Self {
        Tagger {
            template: FeatureTemplate::new(),
            model,
        }
    }

    /// Loads a tagger from a model file written by [`Tagger::save_model`].
    pub fn load_model(model_path: &Path) -> Result<Self> {
        Ok(Self::from_model(Perceptron::load_model(model_path)?))
    }

    pub fn save_model(&self, model_path: &Path) -> Result<()> {
        self.model.save_model(model_path)
    }

    pub fn labels(&self) -> &[String] {
        self.model.labels()
    }

    pub fn model(&self) -> &Perceptron {
        &self.model
    }

    /// Tags every sentence independently.
    ///
    /// # Returns
    /// One tag sequence per sentence, each as long as its sentence.
    pub fn tag(&self, sentences: &[Vec<String>]) -> Vec<Vec<String>> {
        sentences
            .iter()
            .map(|sentence| self.tag_sentence(sentence))
            .collect()
    }

    /// Tags a single sentence.
    pub fn tag_sentence(&self, sentence: &[String]) -> Vec<String> {
        self.decode(sentence, |_, _| {})
    }

    fn decode<F>(&self, sentence: &[String], mut observe: F) -> Vec<String>
    where
        F: FnMut(&Features, &str),
    {
        let mut decoder = Decoder::new(sentence);
        while let Some(features) = decoder.features(&self.template) {
            let predicted = self.model.predict(&features);
            observe(&features, predicted);
            decoder.advance(predicted);
        }
        decoder.into_tags()
    }

    /// Trains the model on labeled sentences.
    ///
    /// Runs `iterations` passes over the sentences in order, updating the
    /// model after every token, and averages the weights once at the end.
    ///
    /// # Arguments
    /// * `iterations` - The number of passes. Must be at least 1.
    /// * `sentences` - The tokenized training sentences.
    /// * `tags` - The gold tags, one sequence per sentence.
    ///
    /// # Errors
    /// The input is validated before any weight changes. An error is
    /// returned if `iterations` is 0, if sentences and tags are not paired
    /// token for token, or if a gold tag is outside the label set.
    pub fn train(
        &mut self,
        iterations: usize,
        sentences: &[Vec<String>],
        tags: &[Vec<String>],
    ) -> Result<()> {
        if iterations == 0 {
            return Err(PostaError::invalid_argument("iterations", "must be at least 1"));
        }
        self.validate_training_data(sentences, tags)?;

        for epoch in 0..iterations {
            let metrics = self.run_epoch(sentences, tags)?;
            tracing::info!(
                epoch = epoch + 1,
                iterations,
                accuracy = metrics.accuracy,
                "finished training epoch"
            );
        }
        self.average();
        Ok(())
    }

    /// Runs a single training pass without averaging.
    ///
    /// # Returns
    /// The accuracy of the predictions made during the pass.
    pub fn train_epoch(
        &mut self,
        sentences: &[Vec<String>],
        tags: &[Vec<String>],
    ) -> Result<Metrics> {
        self.validate_training_data(sentences, tags)?;
        self.run_epoch(sentences, tags)
    }

    /// Averages the model weights. See [`Perceptron::average`].
    pub fn average(&mut self) {
        self.model.average();
    }

    fn run_epoch(&mut self, sentences: &[Vec<String>], tags: &[Vec<String>]) -> Result<Metrics> {
        let mut correct = 0;
        let mut total = 0;

        for (sentence, gold) in sentences.iter().zip(tags) {
            let mut decoder = Decoder::new(sentence);
            while let Some(features) = decoder.features(&self.template) {
                let predicted = self.model.predict(&features).to_string();
                let truth = &gold[decoder.token_index()];
                self.model.update(&predicted, &features, truth)?;

                if predicted == *truth {
                    correct += 1;
                }
                total += 1;
                decoder.advance(&predicted);
            }
        }

        Ok(Metrics::new(correct, total))
    }

    /// Tags the sentences and compares the result with gold tags.
    ///
    /// # Errors
    /// Returns an error if sentences and tags are not paired token for token.
    pub fn evaluate(&self, sentences: &[Vec<String>], tags: &[Vec<String>]) -> Result<Metrics> {
        check_pairing(sentences, tags)?;

        let mut correct = 0;
        let mut total = 0;
        for (sentence, gold) in sentences.iter().zip(tags) {
            let predicted = self.tag_sentence(sentence);
            correct += predicted.iter().zip(gold).filter(|(p, g)| p == g).count();
            total += gold.len();
        }
        Ok(Metrics::new(correct, total))
    }

    fn validate_training_data(
        &self,
        sentences: &[Vec<String>],
        tags: &[Vec<String>],
    ) -> Result<()> {
        check_pairing(sentences, tags)?;
        for tag in tags.iter().flatten() {
            if self.model.label_index(tag).is_none() {
                return Err(PostaError::UnknownLabel(tag.clone()));
            }
        }
        Ok(())
    }
}

fn check_pairing(sentences: &[Vec<String>], tags: &[Vec<String>]) -> Result<()> {
    if sentences.len() != tags.len() {
        return Err(PostaError::SentenceCountMismatch {
            sentences: sentences.len(),
            tags: tags.len(),
        });
    }
    for (index, (sentence, gold)) in sentences.iter().zip(tags).enumerate() {
        if sentence.len() != gold.len() {
            return Err(PostaError::LengthMismatch {
                index,
                tokens: sentence.len(),
                tags: gold.len(),
            });
        }
    }
    Ok(())
}

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::corpus::Corpus;
use crate::error::{PostaError, Result};
use crate::tagger::{Metrics, Tagger};

/// Trainer struct for managing the perceptron training process.
/// It loads the training corpus, optionally resumes from a saved model,
/// and provides a method to train the tagger and save the trained model.
pub struct Trainer {
    tagger: Tagger,
    corpus: Corpus,
    num_iterations: usize,
}

impl Trainer {
    /// Creates a new instance of [`Trainer`].
    ///
    /// # Arguments
    /// * `num_iterations` - The number of passes over the corpus.
    /// * `corpus_path` - The path to the tagged corpus file.
    ///
    /// # Returns
    /// Returns a new instance of `Trainer` with an untrained tagger over the
    /// labels found in the corpus.
    ///
    /// # Errors
    /// Returns an error if `num_iterations` is 0, the corpus cannot be loaded,
    /// or it contains no labels.
    pub fn new(num_iterations: usize, corpus_path: &Path) -> Result<Self> {
        if num_iterations == 0 {
            return Err(PostaError::invalid_argument(
                "num_iterations",
                "must be at least 1",
            ));
        }
        let corpus = Corpus::load(corpus_path)?;
        let tagger = Tagger::new(corpus.labels())?;

        Ok(Trainer {
            tagger,
            corpus,
            num_iterations,
        })
    }

    /// Load Model from a file to continue training it.
    ///
    /// # Arguments
    /// * `model_path` - The path to the model file to load.
    ///
    /// # Errors
    /// Returns an error if the model cannot be loaded or lacks a label used
    /// by the corpus.
    pub fn load_model(&mut self, model_path: &Path) -> Result<()> {
        let tagger = Tagger::load_model(model_path)?;
        for label in self.corpus.labels() {
            if !tagger.labels().contains(&label) {
                return Err(PostaError::UnknownLabel(label));
            }
        }
        self.tagger = tagger;
        Ok(())
    }

    /// Train the tagger.
    ///
    /// # Arguments
    /// * `running` - Cleared to stop training after the current epoch.
    /// * `model_path` - The path to save the trained model.
    ///
    /// # Returns
    /// The accuracy of the averaged model on the training corpus.
    ///
    /// # Errors
    /// Returns an error if training fails or the model cannot be saved.
    pub fn train(&mut self, running: Arc<AtomicBool>, model_path: &Path) -> Result<Metrics> {
        let sentences = self.corpus.sentences();
        let tags = self.corpus.tags();

        for epoch in 0..self.num_iterations {
            if !running.load(Ordering::SeqCst) {
                tracing::warn!(epoch, "training interrupted");
                break;
            }
            let metrics = self.tagger.train_epoch(sentences, tags)?;
            tracing::info!(
                epoch = epoch + 1,
                iterations = self.num_iterations,
                accuracy = metrics.accuracy,
                "finished training epoch"
            );
        }
        self.tagger.average();

        self.tagger.save_model(model_path)?;

        self.tagger.evaluate(sentences, tags)
    }

    pub fn tagger(&self) -> &Tagger {
        &self.tagger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    fn create_corpus_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file for corpus");
        writeln!(file, "the/DET dog/NOUN barks/VERB").expect("Failed to write corpus");
        writeln!(file, "a/DET cat/NOUN sleeps/VERB").expect("Failed to write corpus");
        writeln!(file, "the/DET cat/NOUN barks/VERB").expect("Failed to write corpus");
        writeln!(file, "a/DET dog/NOUN sleeps/VERB").expect("Failed to write corpus");
        file
    }

    #[test]
    fn test_new() -> Result<()> {
        let corpus_file = create_corpus_file();
        let trainer = Trainer::new(5, corpus_file.path())?;
        assert_eq!(trainer.tagger().labels(), ["DET", "NOUN", "VERB"]);
        Ok(())
    }

    #[test]
    fn test_new_rejects_zero_iterations() {
        let corpus_file = create_corpus_file();
        let result = Trainer::new(0, corpus_file.path());
        assert!(matches!(result, Err(PostaError::InvalidArgument { .. })));
    }

    #[test]
    fn test_new_rejects_empty_corpus() -> Result<()> {
        let corpus_file = NamedTempFile::new()?;
        let result = Trainer::new(5, corpus_file.path());
        assert!(matches!(result, Err(PostaError::EmptyLabelSet)));
        Ok(())
    }

    #[test]
    fn test_train() -> Result<()> {
        let corpus_file = create_corpus_file();
        let mut trainer = Trainer::new(10, corpus_file.path())?;
        let model_out = NamedTempFile::new()?;

        let running = Arc::new(AtomicBool::new(true));
        let metrics = trainer.train(running, model_out.path())?;

        assert_eq!(metrics.total, 12);
        assert_eq!(metrics.correct, 12);

        let loaded = Tagger::load_model(model_out.path())?;
        assert_eq!(
            loaded.model().weight_table(),
            trainer.tagger().model().weight_table()
        );
        Ok(())
    }

    #[test]
    fn test_train_interrupted() -> Result<()> {
        let corpus_file = create_corpus_file();
        let mut trainer = Trainer::new(10, corpus_file.path())?;
        let model_out = NamedTempFile::new()?;

        // Set AtomicBool to false and immediately exit the training loop
        let running = Arc::new(AtomicBool::new(false));
        let metrics = trainer.train(running, model_out.path())?;

        assert_eq!(trainer.tagger().model().num_features(), 0);
        assert_eq!(metrics.total, 12);
        assert!(model_out.path().exists());
        Ok(())
    }

    #[test]
    fn test_load_model() -> Result<()> {
        let corpus_file = create_corpus_file();
        let mut trainer = Trainer::new(2, corpus_file.path())?;
        let model_out = NamedTempFile::new()?;
        trainer.train(Arc::new(AtomicBool::new(true)), model_out.path())?;

        let mut resumed = Trainer::new(2, corpus_file.path())?;
        resumed.load_model(model_out.path())?;
        assert_eq!(
            resumed.tagger().model().weight_table(),
            trainer.tagger().model().weight_table()
        );
        Ok(())
    }

    #[test]
    fn test_load_model_missing_label() -> Result<()> {
        let model_file = NamedTempFile::new()?;
        Tagger::new(vec!["DET".to_string(), "NOUN".to_string()])?.save_model(model_file.path())?;

        let corpus_file = create_corpus_file();
        let mut trainer = Trainer::new(2, corpus_file.path())?;
        let result = trainer.load_model(model_file.path());

        assert!(matches!(result, Err(PostaError::UnknownLabel(l)) if l == "VERB"));
        Ok(())
    }
}

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{PostaError, Result};

/// A tagged corpus: tokenized sentences paired with their gold tags.
///
/// The text format has one sentence per line. Tokens are separated by
/// whitespace and written as `word/TAG`. The word and tag are split at the
/// last `/`, so a word may itself contain slashes. Blank lines are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    sentences: Vec<Vec<String>>,
    tags: Vec<Vec<String>>,
}

impl Corpus {
    /// Reads a corpus from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a token is malformed.
    pub fn load(corpus_path: &Path) -> Result<Self> {
        let corpus = Self::from_reader(BufReader::new(File::open(corpus_path)?))?;
        tracing::info!(
            path = %corpus_path.display(),
            sentences = corpus.len(),
            tokens = corpus.num_tokens(),
            "loaded corpus"
        );
        Ok(corpus)
    }

    /// Reads a corpus from any buffered reader.
    ///
    /// # Example
    /// ```
    /// use posta::corpus::Corpus;
    ///
    /// let corpus = Corpus::from_reader("the/DET dog/NOUN\n\n1/2/NUM\n".as_bytes()).unwrap();
    /// assert_eq!(corpus.len(), 2);
    /// assert_eq!(corpus.sentences()[1], vec!["1/2"]);
    /// assert_eq!(corpus.labels(), vec!["DET", "NOUN", "NUM"]);
    /// ```
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut corpus = Corpus::default();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut words = Vec::new();
            let mut tags = Vec::new();
            for token in line.split_whitespace() {
                let (word, tag) = split_token(token).ok_or_else(|| PostaError::InvalidCorpus {
                    line: i + 1,
                    msg: format!("expected word/TAG, got {:?}", token),
                })?;
                words.push(word.to_string());
                tags.push(tag.to_string());
            }
            corpus.push(words, tags)?;
        }

        Ok(corpus)
    }

    /// Appends a sentence with its gold tags.
    ///
    /// # Errors
    /// Returns [`PostaError::LengthMismatch`] if the lengths differ.
    pub fn push(&mut self, sentence: Vec<String>, tags: Vec<String>) -> Result<()> {
        if sentence.len() != tags.len() {
            return Err(PostaError::LengthMismatch {
                index: self.sentences.len(),
                tokens: sentence.len(),
                tags: tags.len(),
            });
        }
        self.sentences.push(sentence);
        self.tags.push(tags);
        Ok(())
    }

    pub fn sentences(&self) -> &[Vec<String>] {
        &self.sentences
    }

    pub fn tags(&self) -> &[Vec<String>] {
        &self.tags
    }

    /// Number of sentences.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn num_tokens(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }

    /// Distinct tags in order of first appearance.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for tag in self.tags.iter().flatten() {
            if !labels.contains(tag) {
                labels.push(tag.clone());
            }
        }
        labels
    }
}

fn split_token(token: &str) -> Option<(&str, &str)> {
    let (word, tag) = token.rsplit_once('/')?;
    if word.is_empty() || tag.is_empty() {
        return None;
    }
    Some((word, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn test_from_reader() {
        let text = "The/DET cat/NOUN sat/VERB\n  \nA/DET well-known/ADJ fact/NOUN\n";
        let corpus = Corpus::from_reader(text.as_bytes()).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.num_tokens(), 6);
        assert_eq!(corpus.sentences()[0], vec!["The", "cat", "sat"]);
        assert_eq!(corpus.tags()[1], vec!["DET", "ADJ", "NOUN"]);
        assert_eq!(corpus.labels(), vec!["DET", "NOUN", "VERB", "ADJ"]);
    }

    #[test]
    fn test_from_reader_splits_at_last_slash() {
        let corpus = Corpus::from_reader("and/or/CONJ".as_bytes()).unwrap();
        assert_eq!(corpus.sentences()[0], vec!["and/or"]);
        assert_eq!(corpus.tags()[0], vec!["CONJ"]);
    }

    #[test]
    fn test_from_reader_invalid_token() {
        let text = "The/DET cat/NOUN\nsat VERB\n";
        let result = Corpus::from_reader(text.as_bytes());
        assert!(matches!(result, Err(PostaError::InvalidCorpus { line: 2, .. })));

        for text in ["cat/", "/NOUN"] {
            let result = Corpus::from_reader(text.as_bytes());
            assert!(matches!(result, Err(PostaError::InvalidCorpus { line: 1, .. })));
        }
    }

    #[test]
    fn test_push_length_mismatch() {
        let mut corpus = Corpus::default();
        let result = corpus.push(vec!["a".to_string()], vec![]);
        assert!(matches!(result, Err(PostaError::LengthMismatch { .. })));
        assert!(corpus.is_empty());
    }

    #[test]
    fn test_load() -> Result<()> {
        let mut corpus_file = NamedTempFile::new()?;
        writeln!(corpus_file, "これ/PRON は/ADP テスト/NOUN")?;
        writeln!(corpus_file, "です/AUX 。/PUNCT")?;
        corpus_file.as_file().sync_all()?;

        let corpus = Corpus::load(corpus_file.path())?;

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.sentences()[1], vec!["です", "。"]);
        assert_eq!(corpus.labels().len(), 5);
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let result = Corpus::load(Path::new("/nonexistent/corpus.txt"));
        assert!(matches!(result, Err(PostaError::Io(_))));
    }
}

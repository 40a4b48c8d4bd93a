use regex::Regex;

pub use crate::perceptron::Features;

/// Boundary tokens padding every sentence, two on each side.
pub const START: &str = "START";
pub const START2: &str = "START2";
pub const END: &str = "END";
pub const END2: &str = "END2";

const AFFIX_LEN: usize = 3;

/// Builds the padded context of a sentence.
///
/// # Example
/// ```
/// use posta::features::padded_context;
///
/// let sentence = vec!["a".to_string(), "dog".to_string()];
/// assert_eq!(
///     padded_context(&sentence),
///     vec!["START", "START2", "a", "dog", "END", "END2"]
/// );
/// ```
pub fn padded_context(sentence: &[String]) -> Vec<&str> {
    let mut context = Vec::with_capacity(sentence.len() + 4);
    context.extend([START, START2]);
    context.extend(sentence.iter().map(String::as_str));
    context.extend([END, END2]);
    context
}

/// The fixed feature template evaluated at every token position.
#[derive(Clone)]
pub struct FeatureTemplate {
    digit: Regex,
}

impl Default for FeatureTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureTemplate {
    pub fn new() -> Self {
        FeatureTemplate {
            digit: Regex::new(r"[0-9]").unwrap(),
        }
    }

    /// Extracts the features of the token at `i`.
    ///
    /// # Arguments
    /// * `i` - Index into `context`. Two tokens on either side must exist.
    /// * `context` - The padded context built by [`padded_context`].
    /// * `last` - The tag predicted for the previous token.
    /// * `second_last` - The tag predicted two tokens back.
    ///
    /// # Returns
    /// The feature vector. Every key carries a slot prefix, so the same word
    /// in different slots yields different keys. `HYPHEN` and `DIGIT` are
    /// always present, with a value of 0 when they do not fire.
    ///
    /// # Example
    /// ```
    /// use posta::features::{padded_context, FeatureTemplate};
    ///
    /// let sentence = vec!["well-known".to_string(), "fact".to_string()];
    /// let context = padded_context(&sentence);
    /// let features = FeatureTemplate::new().extract(2, &context, "START2", "START");
    ///
    /// assert_eq!(features["W0:well-known"], 1.0);
    /// assert_eq!(features["W+1:fact"], 1.0);
    /// assert_eq!(features["HYPHEN"], 1.0);
    /// assert_eq!(features["DIGIT"], 0.0);
    /// ```
    pub fn extract(&self, i: usize, context: &[&str], last: &str, second_last: &str) -> Features {
        let word = context[i];
        let indicator = |fires: bool| if fires { 1.0 } else { 0.0 };

        [
            (format!("W0:{}", word), 1.0),
            (format!("W-1:{}", context[i - 1]), 1.0),
            (format!("W-2:{}", context[i - 2]), 1.0),
            (format!("W+1:{}", context[i + 1]), 1.0),
            (format!("W+2:{}", context[i + 2]), 1.0),
            (format!("T-1:{}", last), 1.0),
            (format!("T-2:{}", second_last), 1.0),
            (format!("T-1,T-2:{} {}", last, second_last), 1.0),
            (format!("PRE:{}", prefix(word)), 1.0),
            (format!("SUF:{}", suffix(word)), 1.0),
            ("HYPHEN".to_string(), indicator(word.contains('-'))),
            ("DIGIT".to_string(), indicator(self.digit.is_match(word))),
        ]
        .into_iter()
        .collect()
    }
}

/// First three characters of `word`, or the whole word if it is shorter.
fn prefix(word: &str) -> &str {
    match word.char_indices().nth(AFFIX_LEN) {
        Some((end, _)) => &word[..end],
        None => word,
    }
}

/// Last three characters of `word`, or the whole word if it is shorter.
fn suffix(word: &str) -> &str {
    match word.char_indices().rev().nth(AFFIX_LEN - 1) {
        Some((start, _)) => &word[start..],
        None => word,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Vec<&'static str> {
        vec![
            START,
            START2,
            "word",
            "word2",
            "hyphen-word",
            "lastword",
            END,
            END2,
        ]
    }

    #[test]
    fn test_padded_context() {
        let sentence = vec!["x".to_string()];
        assert_eq!(padded_context(&sentence), vec![START, START2, "x", END, END2]);

        assert_eq!(padded_context(&[]), vec![START, START2, END, END2]);
    }

    #[test]
    fn test_extract() {
        let template = FeatureTemplate::new();
        let features = template.extract(3, &context(), "last_tag", "secondlast_tag");

        assert_eq!(features.get("W0:word2"), Some(&1.0));
        assert_eq!(features.get("W-1:word"), Some(&1.0));
        assert_eq!(features.get("W-2:START2"), Some(&1.0));
        assert_eq!(features.get("W+1:hyphen-word"), Some(&1.0));
        assert_eq!(features.get("W+2:lastword"), Some(&1.0));
        assert_eq!(features.get("T-1:last_tag"), Some(&1.0));
        assert_eq!(features.get("T-2:secondlast_tag"), Some(&1.0));
        assert_eq!(
            features.get("T-1,T-2:last_tag secondlast_tag"),
            Some(&1.0)
        );
        assert_eq!(features.get("PRE:wor"), Some(&1.0));
        assert_eq!(features.get("SUF:rd2"), Some(&1.0));
        assert_eq!(features.get("HYPHEN"), Some(&0.0));
        assert_eq!(features.get("DIGIT"), Some(&1.0));
        assert_eq!(features.len(), 12);
    }

    #[test]
    fn test_extract_hyphen() {
        let template = FeatureTemplate::new();
        let features = template.extract(4, &context(), "B", "A");

        assert_eq!(features.get("HYPHEN"), Some(&1.0));
        assert_eq!(features.get("DIGIT"), Some(&0.0));
    }

    #[test]
    fn test_extract_sentinels_are_words() {
        let template = FeatureTemplate::new();
        let features = template.extract(5, &context(), "B", "A");

        assert_eq!(features.get("W+1:END"), Some(&1.0));
        assert_eq!(features.get("W+2:END2"), Some(&1.0));
    }

    #[test]
    fn test_slots_do_not_collide() {
        let context = vec![START, START2, "x", "x", "x", END, END2];
        let template = FeatureTemplate::new();
        let features = template.extract(3, &context, "x", "x");

        assert_eq!(features.len(), 12);
    }

    #[test]
    fn test_affixes() {
        assert_eq!(prefix("tagging"), "tag");
        assert_eq!(suffix("tagging"), "ing");
        assert_eq!(prefix("abc"), "abc");
        assert_eq!(suffix("abc"), "abc");
        assert_eq!(prefix("at"), "at");
        assert_eq!(suffix("at"), "at");
        assert_eq!(prefix(""), "");
        assert_eq!(suffix(""), "");
        assert_eq!(prefix("café-au-lait"), "caf");
        assert_eq!(suffix("naïveté"), "eté");
    }
}

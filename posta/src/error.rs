//! Definition of errors.

use thiserror::Error;

pub type Result<T, E = PostaError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PostaError {
    /// The classifier was constructed without any label.
    #[error("label set must not be empty")]
    EmptyLabelSet,

    /// The same label was given twice.
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    /// A label that is not part of the fixed label set.
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    #[error("invalid argument `{arg}`: {msg}")]
    InvalidArgument { arg: &'static str, msg: String },

    /// Sentences and gold tag sequences are not paired 1:1.
    #[error("got {sentences} sentences but {tags} tag sequences")]
    SentenceCountMismatch { sentences: usize, tags: usize },

    /// A sentence and its gold tags differ in length.
    #[error("sentence {index} has {tokens} tokens but {tags} tags")]
    LengthMismatch {
        index: usize,
        tokens: usize,
        tags: usize,
    },

    #[error("invalid corpus at line {line}: {msg}")]
    InvalidCorpus { line: usize, msg: String },

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PostaError {
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument {
            arg,
            msg: msg.into(),
        }
    }

    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(msg.into())
    }
}

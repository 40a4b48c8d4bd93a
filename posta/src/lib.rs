pub mod corpus;
pub mod error;
pub mod features;
pub mod perceptron;
pub mod tagger;
pub mod trainer;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version() -> &'static str {
    VERSION
}

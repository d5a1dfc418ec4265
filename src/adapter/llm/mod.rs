//! Chat-completion adapters.

mod openai;

pub use openai::OpenAiCompatible;

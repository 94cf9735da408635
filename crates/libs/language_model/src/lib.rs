#![deny(clippy::unwrap_used)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

mod error;
mod evaluator;
mod ollama;
mod openai;

pub use error::*;
pub use evaluator::*;
pub use ollama::*;
pub use openai::*;

#![deny(clippy::unwrap_used)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

mod image_prep;
mod orchestrator;
mod response_parser;
mod rubric;

pub use image_prep::*;
pub use orchestrator::*;
pub use response_parser::*;
pub use rubric::*;

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]
mod backend;
mod evaluation;
mod image_record;
mod judgement;

pub use backend::*;
pub use evaluation::*;
pub use image_record::*;
pub use judgement::*;

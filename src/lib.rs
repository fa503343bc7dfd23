pub mod consolidate;
pub mod error;
pub mod parse;
pub mod pipeline;
pub mod write;

pub use error::ExtractError;
pub use pipeline::{process_kml_file, Outputs};

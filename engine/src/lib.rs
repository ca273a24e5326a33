// Engine library root
// Reference sheet normalization: reading, header detection, column mapping,
// coercion, sinks and the operations the binary exposes.

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod services;
pub mod sinks;

pub use error::EngineError;

//! Use-case layer: the admission pipeline

pub mod authorize;
pub mod pipeline;

pub use pipeline::{Admission, AdmissionPipeline};

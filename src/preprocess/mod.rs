use crate::error::PipelineError;

mod enricher;
mod naturalizer;
mod normalizer;

pub use enricher::{Enricher, TechniqueContext, TechniqueReference};
pub use naturalizer::{Naturalizer, Section};
pub use normalizer::ReportNormalizer;

pub trait Preprocessor {
    type Input;
    type Output;

    fn process(&self, input: Self::Input) -> Result<Self::Output, PipelineError>;
}

//! Rendering a cleaned record into a document, and writing it out.

pub mod builder;
pub mod converter;
pub mod generator;
pub mod style_provider;

pub use builder::ResumeBuilder;
pub use converter::{
    ConversionOutcome, ConvertError, FixedLayoutConverter, NoConverter, SerializedConverter,
    SofficeConverter,
};
pub use generator::{GenerationOutput, ResumeGenerator};
pub use style_provider::{StyleProvider, TextRole};

//! Template analysis and reapplication: extract a styling signature from an
//! existing document, keep it in a template library, then render new content
//! in the same style.

pub mod analyzer;
pub mod applier;
pub mod library;
pub mod signature;

pub use analyzer::{analyze, analyze_document, load_signature, save_analysis};
pub use applier::{SizeContext, StyleApplier};
pub use library::TemplateLibrary;
pub use signature::{dominant, PointSize, StylingSignature};

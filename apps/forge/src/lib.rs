//! Resume document generation: a resume record in, a styled `.docx` (and a
//! PDF when a converter is available) out, optionally in the style of an
//! analyzed template.

pub mod batch;
pub mod config;
pub mod docx;
pub mod errors;
pub mod intake;
pub mod models;
pub mod render;
pub mod template;
